//! The REST client against an in-process coordinator.
//!
//! The coordinator speaks just enough of `/v1/statement` to exercise paging,
//! truncation and cancellation, and counts the requests it sees.

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use mcp_trino::Toolkit;
use mcp_trino::db::{ConnectionManager, Executor, TrinoClient, with_deadline};
use mcp_trino::error::TrinoError;
use mcp_trino::models::{ConnectionConfig, ManagerConfig, QueryOptions};
use mcp_trino::tools::ToolName;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_test::{assert_err, assert_ok};

#[derive(Clone, Copy)]
enum Behavior {
    /// Every page points at another one and carries no rows.
    Endless,
    /// The first page holds three rows and a `nextUri`.
    ThreeRowsThenMore,
    /// Columns first, rows on the second and final page.
    TwoPages,
    /// The first page reports a failed statement.
    Failing,
}

struct Coordinator {
    base: String,
    behavior: Behavior,
    gets: AtomicUsize,
    deletes: AtomicUsize,
    users: Mutex<Vec<String>>,
}

impl Coordinator {
    fn next_uri(&self, token: u64) -> String {
        format!("{}/v1/statement/executing/q1/{}", self.base, token)
    }

    fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }
}

async fn submit(
    State(state): State<Arc<Coordinator>>,
    headers: HeaderMap,
    _sql: String,
) -> Json<Value> {
    if let Some(user) = headers.get("x-trino-user").and_then(|v| v.to_str().ok()) {
        state.users.lock().unwrap().push(user.to_string());
    }
    let columns = json!([{"name": "id", "type": "bigint"}]);
    Json(match state.behavior {
        Behavior::Endless => json!({"id": "q1", "nextUri": state.next_uri(1)}),
        Behavior::ThreeRowsThenMore => json!({
            "id": "q1",
            "nextUri": state.next_uri(1),
            "columns": columns,
            "data": [[1], [2], [3]]
        }),
        Behavior::TwoPages => json!({
            "id": "q1",
            "nextUri": state.next_uri(1),
            "columns": columns
        }),
        Behavior::Failing => json!({
            "id": "q1",
            "error": {
                "message": "line 1:15: Table 'hive.s.missing' does not exist",
                "errorName": "TABLE_NOT_FOUND"
            }
        }),
    })
}

async fn advance(
    State(state): State<Arc<Coordinator>>,
    Path((_id, token)): Path<(String, u64)>,
) -> Json<Value> {
    state.gets.fetch_add(1, Ordering::SeqCst);
    match state.behavior {
        Behavior::TwoPages => Json(json!({"id": "q1", "data": [[10], [20]]})),
        _ => {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Json(json!({"id": "q1", "nextUri": state.next_uri(token + 1)}))
        }
    }
}

async fn cancel(
    State(state): State<Arc<Coordinator>>,
    Path((_id, _token)): Path<(String, u64)>,
) -> StatusCode {
    state.deletes.fetch_add(1, Ordering::SeqCst);
    StatusCode::NO_CONTENT
}

async fn start_coordinator(behavior: Behavior) -> (Arc<Coordinator>, ConnectionConfig) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = Arc::new(Coordinator {
        base: format!("http://{}", addr),
        behavior,
        gets: AtomicUsize::new(0),
        deletes: AtomicUsize::new(0),
        users: Mutex::new(Vec::new()),
    });

    let app = Router::new()
        .route("/v1/statement", post(submit))
        .route(
            "/v1/statement/executing/{id}/{token}",
            get(advance).delete(cancel),
        )
        .with_state(Arc::clone(&state));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let mut config = ConnectionConfig::new("127.0.0.1", "tester");
    config.port = addr.port() as u32;
    (state, config)
}

/// The cancellation of a dropped statement runs on a spawned task.
async fn wait_for_deletes(coordinator: &Coordinator, expected: usize) {
    for _ in 0..100 {
        if coordinator.deletes() >= expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

fn options(limit: usize) -> QueryOptions {
    QueryOptions {
        limit,
        timeout: Duration::from_secs(5),
    }
}

#[tokio::test]
async fn test_pages_are_followed_to_completion() {
    let (coordinator, config) = start_coordinator(Behavior::TwoPages).await;
    let client = TrinoClient::new("default", &config).unwrap();

    let result = assert_ok!(client.query("SELECT id FROM t", options(10)).await);

    assert_eq!(result.columns[0].type_name, "bigint");
    assert_eq!(result.stats.row_count, 2);
    assert!(!result.stats.truncated);
    assert_eq!(coordinator.gets.load(Ordering::SeqCst), 1);
    assert_eq!(coordinator.deletes(), 0);
    assert_eq!(*coordinator.users.lock().unwrap(), vec!["tester".to_string()]);
}

#[tokio::test]
async fn test_rows_past_limit_cancel_the_statement() {
    let (coordinator, config) = start_coordinator(Behavior::ThreeRowsThenMore).await;
    let client = TrinoClient::new("default", &config).unwrap();

    let result = assert_ok!(client.query("SELECT id FROM big", options(2)).await);

    assert_eq!(result.stats.row_count, 2);
    assert!(result.stats.truncated);
    // The remainder is cancelled before the call returns, without fetching it.
    assert_eq!(coordinator.deletes(), 1);
    assert_eq!(coordinator.gets.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_failed_statement_is_not_cancelled() {
    let (coordinator, config) = start_coordinator(Behavior::Failing).await;
    let client = TrinoClient::new("default", &config).unwrap();

    let err = assert_err!(client.query("SELECT * FROM hive.s.missing", options(10)).await);
    assert!(matches!(err, TrinoError::Query { ref error_name, .. }
        if error_name.as_deref() == Some("TABLE_NOT_FOUND")));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(coordinator.deletes(), 0);
}

#[tokio::test]
async fn test_expired_deadline_cancels_running_statement() {
    let (coordinator, config) = start_coordinator(Behavior::Endless).await;
    let client = TrinoClient::new("default", &config).unwrap();

    let err = assert_err!(
        with_deadline(
            "query",
            Duration::from_millis(150),
            client.query("SELECT * FROM big", options(10)),
        )
        .await
    );
    assert_eq!(err.to_string(), "Timeout: query exceeded 150ms");

    wait_for_deletes(&coordinator, 1).await;
    assert_eq!(coordinator.deletes(), 1);
}

#[tokio::test]
async fn test_dropped_call_cancels_running_statement() {
    let (coordinator, config) = start_coordinator(Behavior::Endless).await;
    let client = TrinoClient::new("default", &config).unwrap();

    tokio::select! {
        _ = client.list_catalogs() => panic!("endless statement finished"),
        _ = tokio::time::sleep(Duration::from_millis(100)) => {}
    }

    wait_for_deletes(&coordinator, 1).await;
    assert_eq!(coordinator.deletes(), 1);
}

#[tokio::test]
async fn test_query_tool_timeout_cancels_on_coordinator() {
    let (coordinator, config) = start_coordinator(Behavior::Endless).await;
    let manager = ConnectionManager::new(ManagerConfig::new(config)).unwrap();
    let mut toolkit = Toolkit::builder(Arc::new(manager)).build();
    toolkit.register_all();

    let result = toolkit
        .call(
            ToolName::Query,
            json!({"sql": "SELECT * FROM big", "timeout_seconds": 1}),
            None,
        )
        .await;

    assert!(result.is_error);
    assert_eq!(result.text(), "Query failed: Timeout: query exceeded 1000ms");
    wait_for_deletes(&coordinator, 1).await;
    assert_eq!(coordinator.deletes(), 1);
}
