//! Outbox partitioning.

use std::num::NonZeroUsize;

/// Split ordered `entries` into consecutive groups of at most `batch_size`.
///
/// Order is preserved within and across groups; empty input yields no groups.
pub fn partition<T>(entries: Vec<T>, batch_size: NonZeroUsize) -> Vec<Vec<T>> {
    let size = batch_size.get();
    let mut batches = Vec::with_capacity(entries.len().div_ceil(size));
    let mut iter = entries.into_iter().peekable();
    while iter.peek().is_some() {
        batches.push(iter.by_ref().take(size).collect());
    }
    batches
}
