//! HTTP sync against a local stand-in for the remote batch endpoint.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use pretty_assertions::assert_eq;
use serde_json::json;

use tasksync_core::models::NewTask;
use tasksync_core::sync::protocol::{self, BatchRequest, CHECKSUM_HEADER};
use tasksync_core::sync::{HttpSyncClient, ItemOutcome, RemoteSync, TransportError};
use tasksync_core::{
    OutboxEntry, SyncError, SyncOperation, SyncSettings, SyncStatus, Task, TaskService,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Accept,
    ServerError,
    DropLast,
}

#[derive(Clone)]
struct StandIn {
    healthy: Arc<AtomicBool>,
    mode: Arc<Mutex<Mode>>,
    received: Arc<Mutex<Vec<(Option<String>, BatchRequest)>>>,
}

impl StandIn {
    fn new() -> Self {
        Self {
            healthy: Arc::new(AtomicBool::new(true)),
            mode: Arc::new(Mutex::new(Mode::Accept)),
            received: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn set_mode(&self, mode: Mode) {
        *self.mode.lock().unwrap() = mode;
    }

    fn received(&self) -> Vec<(Option<String>, BatchRequest)> {
        self.received.lock().unwrap().clone()
    }
}

async fn health(State(state): State<StandIn>) -> StatusCode {
    if state.healthy.load(Ordering::SeqCst) {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn batch(
    State(state): State<StandIn>,
    headers: HeaderMap,
    Json(request): Json<BatchRequest>,
) -> Response {
    let checksum = headers
        .get(CHECKSUM_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    state
        .received
        .lock()
        .unwrap()
        .push((checksum, request.clone()));

    let mode = *state.mode.lock().unwrap();
    if mode == Mode::ServerError {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "database unavailable" })),
        )
            .into_response();
    }

    let mut items = request.items;
    if mode == Mode::DropLast {
        items.pop();
    }

    let processed: Vec<_> = items
        .iter()
        .map(|item| {
            if item.data["title"] == "reject me" {
                json!({ "client_id": item.client_id, "status": "error", "error": "title rejected" })
            } else {
                json!({
                    "client_id": item.client_id,
                    "status": "success",
                    "server_id": format!("srv-{}", item.task_id),
                })
            }
        })
        .collect();

    Json(json!({ "processed_items": processed })).into_response()
}

async fn spawn_stand_in() -> (StandIn, SyncSettings) {
    let state = StandIn::new();
    let router = Router::new()
        .route("/api/health", get(health))
        .route("/api/batch", post(batch))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    let settings = SyncSettings::new(format!("http://{addr}/api")).unwrap();
    (state, settings)
}

fn entry(title: &str) -> OutboxEntry {
    let task = Task::new(NewTask::new(title)).unwrap();
    OutboxEntry::for_task(&task, SyncOperation::Create).unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn connectivity_follows_health_endpoint() {
    let (stand_in, settings) = spawn_stand_in().await;
    let client = HttpSyncClient::new(&settings).unwrap();

    assert!(client.check_connectivity().await);
    stand_in.healthy.store(false, Ordering::SeqCst);
    assert!(!client.check_connectivity().await);
}

#[tokio::test(flavor = "multi_thread")]
async fn batch_carries_checksum_and_maps_outcomes() {
    let (stand_in, settings) = spawn_stand_in().await;
    let client = HttpSyncClient::new(&settings).unwrap();
    let batch = vec![entry("ship it"), entry("reject me")];

    let outcomes = client.send_batch(&batch).await.unwrap();

    assert_eq!(
        outcomes,
        vec![
            ItemOutcome::Synced {
                entry_id: batch[0].id.clone(),
                server_id: Some(format!("srv-{}", batch[0].task_id)),
            },
            ItemOutcome::Failed {
                entry_id: batch[1].id.clone(),
                error: "title rejected".to_string(),
            },
        ]
    );

    let received = stand_in.received();
    assert_eq!(received.len(), 1);
    let (header, request) = &received[0];
    assert_eq!(header.as_deref(), Some(protocol::checksum(&request.items).unwrap().as_str()));
    let client_ids: Vec<_> = request.items.iter().map(|item| item.client_id.clone()).collect();
    assert_eq!(client_ids, vec![batch[0].id.clone(), batch[1].id.clone()]);
    assert_eq!(request.items[0].data["title"], "ship it");
}

#[tokio::test(flavor = "multi_thread")]
async fn server_error_fails_whole_batch() {
    let (stand_in, settings) = spawn_stand_in().await;
    stand_in.set_mode(Mode::ServerError);
    let client = HttpSyncClient::new(&settings).unwrap();

    let error = client.send_batch(&[entry("a")]).await.unwrap_err();

    match error {
        TransportError::Api(message) => assert_eq!(message, "database unavailable (500)"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn service_sync_reconciles_remote_outcomes() {
    let (stand_in, settings) = spawn_stand_in().await;
    let remote = HttpSyncClient::new(&settings).unwrap();
    let service = TaskService::open_in_memory(remote, &settings).await.unwrap();

    let good = service.create_task(NewTask::new("buy milk")).await.unwrap();
    let bad = service.create_task(NewTask::new("reject me")).await.unwrap();

    let report = service.sync().await.unwrap();

    assert!(!report.success);
    assert_eq!(report.synced_items, 1);
    assert_eq!(report.failed_items, 1);
    assert_eq!(report.errors[0].task_id, bad.id);
    assert_eq!(report.errors[0].error, "title rejected");

    let good = service.get_task(&good.id).await.unwrap().unwrap();
    assert_eq!(good.sync_status, SyncStatus::Synced);
    assert_eq!(good.server_id, Some(format!("srv-{}", good.id)));
    let bad = service.get_task(&bad.id).await.unwrap().unwrap();
    assert_eq!(bad.sync_status, SyncStatus::Error);

    let status = service.sync_status().await.unwrap();
    assert_eq!(status.pending_count, 1);
    assert!(status.online);
    assert!(status.last_synced_at.is_some());
    assert_eq!(stand_in.received().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn items_missing_from_response_stay_queued() {
    let (stand_in, settings) = spawn_stand_in().await;
    stand_in.set_mode(Mode::DropLast);
    let remote = HttpSyncClient::new(&settings).unwrap();
    let service = TaskService::open_in_memory(remote, &settings).await.unwrap();

    service.create_task(NewTask::new("first")).await.unwrap();
    let second = service.create_task(NewTask::new("second")).await.unwrap();

    let report = service.sync().await.unwrap();

    assert_eq!(report.synced_items, 1);
    assert_eq!(report.failed_items, 1);
    assert_eq!(report.errors[0].task_id, second.id);
    assert!(report.errors[0].error.starts_with("no outcome returned for item"));
    assert_eq!(service.sync_status().await.unwrap().pending_count, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn unhealthy_remote_leaves_outbox_alone() {
    let (stand_in, settings) = spawn_stand_in().await;
    stand_in.healthy.store(false, Ordering::SeqCst);
    let remote = HttpSyncClient::new(&settings).unwrap();
    let service = TaskService::open_in_memory(remote, &settings).await.unwrap();
    service.create_task(NewTask::new("offline")).await.unwrap();

    let result = service.sync().await;

    assert!(matches!(result, Err(SyncError::Unreachable)));
    assert!(stand_in.received().is_empty());
    let status = service.sync_status().await.unwrap();
    assert_eq!(status.pending_count, 1);
    assert!(!status.online);
}

#[tokio::test(flavor = "multi_thread")]
async fn batches_are_sent_in_order() {
    let (stand_in, settings) = spawn_stand_in().await;
    let settings = settings.with_batch_size(std::num::NonZeroUsize::new(2).unwrap());
    let remote = HttpSyncClient::new(&settings).unwrap();
    let service = TaskService::open_in_memory(remote, &settings).await.unwrap();
    for n in 0..5 {
        service.create_task(NewTask::new(format!("task {n}"))).await.unwrap();
    }

    let report = service.sync().await.unwrap();

    assert_eq!(report.synced_items, 5);
    let titles: Vec<Vec<String>> = stand_in
        .received()
        .into_iter()
        .map(|(_, request)| {
            request
                .items
                .iter()
                .map(|item| item.data["title"].as_str().unwrap_or_default().to_string())
                .collect()
        })
        .collect();
    assert_eq!(
        titles,
        vec![
            vec!["task 0".to_string(), "task 1".to_string()],
            vec!["task 2".to_string(), "task 3".to_string()],
            vec!["task 4".to_string()],
        ]
    );
}
