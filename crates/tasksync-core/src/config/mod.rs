//! Sync configuration.
//!
//! `SyncSettings` is built once at the edge (CLI, tests) and handed to the
//! sync engine; the core never reads the environment on its own.

use std::env;
use std::num::NonZeroUsize;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000/api";
pub const DEFAULT_BATCH_SIZE: usize = 10;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const MAX_TIMEOUT_SECS: u64 = 600;

/// Remote endpoint and batching parameters for the sync engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Base address of the remote API; `/batch` and `/health` hang off it
    pub api_base_url: String,
    /// Maximum outbox entries per batch
    pub batch_size: NonZeroUsize,
    /// Per-request (and per-batch) timeout
    pub request_timeout: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            batch_size: NonZeroUsize::new(DEFAULT_BATCH_SIZE).unwrap_or(NonZeroUsize::MIN),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl SyncSettings {
    /// Settings pointing at `api_base_url` with default batching.
    pub fn new(api_base_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            api_base_url: normalize_base_url(api_base_url.into())?,
            ..Self::default()
        })
    }

    /// Override the batch size
    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: NonZeroUsize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Override the request timeout
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Read `API_BASE_URL`, `SYNC_BATCH_SIZE` and `SYNC_TIMEOUT_SECS`.
    ///
    /// Other variables are never read, so unrelated non-UTF-8 entries in the
    /// environment are harmless.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build settings from an arbitrary key lookup; unset keys use defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_base_url = non_blank(lookup("API_BASE_URL"))
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let api_base_url = normalize_base_url(api_base_url)?;

        let batch_size = match non_blank(lookup("SYNC_BATCH_SIZE")) {
            Some(raw) => raw
                .parse::<NonZeroUsize>()
                .map_err(|_| Error::Config("SYNC_BATCH_SIZE must be an integer >= 1".to_string()))?,
            None => Self::default().batch_size,
        };

        let timeout_secs = match non_blank(lookup("SYNC_TIMEOUT_SECS")) {
            Some(raw) => raw.parse::<u64>().map_err(|_| {
                Error::Config(format!(
                    "SYNC_TIMEOUT_SECS must be an integer in [1, {MAX_TIMEOUT_SECS}]"
                ))
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };
        if !(1..=MAX_TIMEOUT_SECS).contains(&timeout_secs) {
            return Err(Error::Config(format!(
                "SYNC_TIMEOUT_SECS must be in [1, {MAX_TIMEOUT_SECS}]"
            )));
        }

        Ok(Self {
            api_base_url,
            batch_size,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// `POST` target for batches
    pub fn batch_url(&self) -> String {
        format!("{}/batch", self.api_base_url)
    }

    /// `GET` target for the connectivity check
    pub fn health_url(&self) -> String {
        format!("{}/health", self.api_base_url)
    }
}

/// Whether `url` uses the `http` or `https` scheme.
pub(crate) fn has_http_scheme(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn normalize_base_url(raw: String) -> Result<String> {
    let url = non_blank(Some(raw))
        .ok_or_else(|| Error::Config("API base URL must not be empty".to_string()))?;
    if !has_http_scheme(&url) {
        return Err(Error::Config(
            "API base URL must include http:// or https://".to_string(),
        ));
    }
    Ok(url.trim_end_matches('/').to_string())
}
