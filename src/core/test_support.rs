// src/core/test_support.rs
//
// A fake device API served over real HTTP on 127.0.0.1, for tests.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

#[derive(Debug)]
struct MockState {
    hostname: Mutex<String>,
    state: Mutex<String>,
    fail_info: AtomicBool,
    fail_query: AtomicBool,
    command_status: AtomicU16,
    info_hits: AtomicUsize,
    query_hits: AtomicUsize,
    commands: Mutex<Vec<String>>,
}

pub struct MockDevice {
    pub port: u16,
    shared: Arc<MockState>,
    server: JoinHandle<()>,
}

impl MockDevice {
    pub async fn start(hostname: &str, state: &str) -> Self {
        let shared = Arc::new(MockState {
            hostname: Mutex::new(hostname.to_string()),
            state: Mutex::new(state.to_string()),
            fail_info: AtomicBool::new(false),
            fail_query: AtomicBool::new(false),
            command_status: AtomicU16::new(200),
            info_hits: AtomicUsize::new(0),
            query_hits: AtomicUsize::new(0),
            commands: Mutex::new(Vec::new()),
        });

        let router = Router::new()
            .route("/printer/info", get(info))
            .route("/printer/objects/query", post(query))
            .route("/printer/print/{action}", post(print_action))
            .route("/printer/emergency_stop", post(emergency_stop))
            .with_state(Arc::clone(&shared));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Self { port, shared, server }
    }

    /// A port with nothing listening on it.
    pub async fn unused_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    }

    pub fn fail_info(&self) {
        self.shared.fail_info.store(true, Ordering::SeqCst);
    }

    pub fn fail_query(&self) {
        self.shared.fail_query.store(true, Ordering::SeqCst);
    }

    pub fn respond_to_commands_with(&self, status: u16) {
        self.shared.command_status.store(status, Ordering::SeqCst);
    }

    pub fn info_hits(&self) -> usize {
        self.shared.info_hits.load(Ordering::SeqCst)
    }

    pub fn query_hits(&self) -> usize {
        self.shared.query_hits.load(Ordering::SeqCst)
    }

    pub fn commands(&self) -> Vec<String> {
        self.shared.commands.lock().unwrap().clone()
    }
}

impl Drop for MockDevice {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn info(State(shared): State<Arc<MockState>>) -> (StatusCode, Json<Value>) {
    shared.info_hits.fetch_add(1, Ordering::SeqCst);
    if shared.fail_info.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": "boom" })));
    }
    let hostname = shared.hostname.lock().unwrap().clone();
    (StatusCode::OK, Json(json!({ "result": { "hostname": hostname } })))
}

// `Json` rejects requests without `Content-Type: application/json`.
async fn query(State(shared): State<Arc<MockState>>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    shared.query_hits.fetch_add(1, Ordering::SeqCst);
    if shared.fail_query.load(Ordering::SeqCst) {
        return (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "error": "klippy not ready" })));
    }
    if body.pointer("/objects/print_stats").is_none() {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": "missing objects" })));
    }
    let state = shared.state.lock().unwrap().clone();
    (
        StatusCode::OK,
        Json(json!({ "result": { "status": { "print_stats": { "state": state } } } })),
    )
}

async fn print_action(State(shared): State<Arc<MockState>>, Path(action): Path<String>) -> (StatusCode, Json<Value>) {
    record_command(&shared, action)
}

async fn emergency_stop(State(shared): State<Arc<MockState>>) -> (StatusCode, Json<Value>) {
    record_command(&shared, "emergency_stop".to_string())
}

fn record_command(shared: &MockState, command: String) -> (StatusCode, Json<Value>) {
    shared.commands.lock().unwrap().push(command);
    let status = StatusCode::from_u16(shared.command_status.load(Ordering::SeqCst))
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(json!({ "result": "ok" })))
}
