//! In-process mock of the TradeMicro API for tests

use crate::api::ApiClient;
use crate::config::{ClientConfig, StoreBackend};
use crate::notify::{Notice, Notifier};
use crate::store::MemoryStore;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

pub const USERNAME: &str = "admin";
pub const PASSWORD: &str = "secret";
pub const VALID_TOKEN: &str = "tok-valid-0123456789";

/// One request as seen by the mock
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub request_id: Option<String>,
    pub body: Option<Value>,
}

struct MockState {
    hits: AtomicUsize,
    accepted_token: Mutex<Option<String>>,
    issued_token: Mutex<String>,
    delays: Mutex<HashMap<String, Duration>>,
    overrides: Mutex<HashMap<String, (u16, Value)>>,
    requests: Mutex<Vec<RecordedRequest>>,
    collections: Mutex<HashMap<String, Vec<Value>>>,
    next_id: AtomicU64,
}

impl MockState {
    fn seeded() -> Self {
        let collections = HashMap::from([
            (
                "symbols".to_string(),
                vec![
                    json!("NIFTY"),
                    json!({"id": 1, "name": "RELIANCE", "exchange": "NSE", "type": "EQ"}),
                ],
            ),
            (
                "trades".to_string(),
                vec![json!({
                    "id": 1,
                    "symbol": "RELIANCE",
                    "type": "BUY",
                    "status": "FILLED",
                    "quantity": 10,
                    "created_at": "2024-01-15T10:00:00Z"
                })],
            ),
            (
                "broker-tokens".to_string(),
                vec![json!({
                    "id": 1,
                    "broker": "dhan",
                    "token": "eyJhbGciOiJIUzI1NiJ9",
                    "created_at": "2024-01-15T10:00:00Z"
                })],
            ),
            (
                "tasks".to_string(),
                vec![
                    json!({
                        "id": "task-1",
                        "name": "symbol sync",
                        "type": "symbol_sync",
                        "status": "PENDING",
                        "created_at": "2024-01-15T10:00:00Z"
                    }),
                    json!({
                        "id": "task-2",
                        "name": "daily report",
                        "type": "report",
                        "status": "COMPLETED",
                        "created_at": "2024-01-14T10:00:00Z"
                    }),
                ],
            ),
            (
                "family-members".to_string(),
                vec![json!({
                    "id": 1,
                    "name": "Asha",
                    "email": "asha@example.com",
                    "phone": "9999999999"
                })],
            ),
        ]);

        Self {
            hits: AtomicUsize::new(0),
            accepted_token: Mutex::new(None),
            issued_token: Mutex::new(VALID_TOKEN.to_string()),
            delays: Mutex::new(HashMap::new()),
            overrides: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            collections: Mutex::new(collections),
            next_id: AtomicU64::new(100),
        }
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        let presented = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));

        match (presented, self.accepted_token.lock().as_deref()) {
            (Some(presented), Some(accepted)) => presented == accepted,
            _ => false,
        }
    }

    fn login(&self, body: Option<Value>) -> Response {
        let body = body.unwrap_or(Value::Null);
        if body["username"] == USERNAME && body["password"] == PASSWORD {
            let token = self.issued_token.lock().clone();
            *self.accepted_token.lock() = Some(token.clone());
            reply(200, json!({ "token": token }))
        } else {
            reply(401, json!({ "detail": "Invalid credentials" }))
        }
    }

    fn list(&self, collection: &str, count_only: bool) -> Response {
        let collections = self.collections.lock();
        match collections.get(collection) {
            Some(records) if count_only => reply(200, json!({ "count": records.len() })),
            Some(records) => reply(200, Value::Array(records.clone())),
            None => not_found(),
        }
    }

    fn find(&self, collection: &str, id: &str) -> Response {
        let collections = self.collections.lock();
        collections
            .get(collection)
            .and_then(|records| records.iter().find(|r| has_id(r, id)))
            .map(|record| reply(200, record.clone()))
            .unwrap_or_else(not_found)
    }

    fn create(&self, collection: &str, body: Option<Value>) -> Response {
        let Some(Value::Object(mut record)) = body else {
            return reply(400, json!({ "detail": "Invalid request body" }));
        };

        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        if collection == "tasks" {
            record.insert("id".to_string(), json!(format!("task-{}", n)));
            record.insert("status".to_string(), json!("PENDING"));
        } else {
            record.insert("id".to_string(), json!(n));
        }
        record
            .entry("created_at")
            .or_insert_with(|| json!("2024-06-01T09:00:00Z"));

        let mut collections = self.collections.lock();
        match collections.get_mut(collection) {
            Some(records) => {
                records.push(Value::Object(record.clone()));
                reply(201, Value::Object(record))
            }
            None => not_found(),
        }
    }

    fn update(&self, collection: &str, id: &str, body: Option<Value>) -> Response {
        let Some(Value::Object(changes)) = body else {
            return reply(400, json!({ "detail": "Invalid request body" }));
        };

        self.modify(collection, id, |record| {
            record.extend(changes);
            Ok(())
        })
    }

    fn remove(&self, collection: &str, id: &str) -> Response {
        let mut collections = self.collections.lock();
        let Some(records) = collections.get_mut(collection) else {
            return not_found();
        };

        let before = records.len();
        records.retain(|r| !has_id(r, id));
        if records.len() < before {
            reply(204, Value::Null)
        } else {
            not_found()
        }
    }

    fn set_task_status(&self, id: &str, status: &str, only_from: &[&str]) -> Response {
        self.modify("tasks", id, |record| {
            let current = record.get("status").and_then(Value::as_str).unwrap_or("");
            if !only_from.is_empty() && !only_from.contains(&current) {
                return Err(format!("task {} is {}", id, current));
            }
            record.insert("status".to_string(), json!(status));
            Ok(())
        })
    }

    fn task_logs(&self, id: &str) -> Response {
        let collections = self.collections.lock();
        match collections
            .get("tasks")
            .and_then(|tasks| tasks.iter().find(|t| has_id(t, id)))
        {
            Some(task) => reply(
                200,
                json!({
                    "task": task,
                    "stdout": format!("running {}\ndone\n", id),
                    "stderr": ""
                }),
            ),
            None => not_found(),
        }
    }

    fn modify<F>(&self, collection: &str, id: &str, change: F) -> Response
    where
        F: FnOnce(&mut serde_json::Map<String, Value>) -> Result<(), String>,
    {
        let mut collections = self.collections.lock();
        let record = collections
            .get_mut(collection)
            .and_then(|records| records.iter_mut().find(|r| has_id(r, id)))
            .and_then(Value::as_object_mut);

        match record {
            Some(record) => match change(record) {
                Ok(()) => reply(200, Value::Object(record.clone())),
                Err(message) => reply(500, json!({ "detail": message })),
            },
            None => not_found(),
        }
    }
}

fn has_id(record: &Value, id: &str) -> bool {
    match record.get("id") {
        Some(Value::String(s)) => s == id,
        Some(Value::Number(n)) => n.to_string() == id,
        _ => false,
    }
}

fn reply(status: u16, body: Value) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status == StatusCode::NO_CONTENT {
        return status.into_response();
    }
    (status, Json(body)).into_response()
}

fn not_found() -> Response {
    reply(404, json!({ "detail": "Not found" }))
}

async fn handle(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);

    let body: Option<Value> = serde_json::from_slice(&body).ok();
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    state.requests.lock().push(RecordedRequest {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        authorization: header("authorization"),
        request_id: header("x-request-id"),
        body: body.clone(),
    });

    let route = uri.path().trim_start_matches("/api/").trim_matches('/');
    let delay = state.delays.lock().get(route).copied();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    if let Some((status, payload)) = state.overrides.lock().get(route).cloned() {
        return reply(status, payload);
    }
    let segments: Vec<&str> = route.split('/').filter(|s| !s.is_empty()).collect();

    match (method.as_str(), segments.as_slice()) {
        ("POST", ["login"]) => return state.login(body),
        ("GET", ["health"]) => {
            return reply(
                200,
                json!({
                    "status": "ok",
                    "version": "1.0.0",
                    "timestamp": "2024-01-15T10:00:00Z"
                }),
            )
        }
        _ => {}
    }

    if !state.authorized(&headers) {
        return reply(401, json!({ "detail": "Invalid or expired token" }));
    }

    let count_only = uri
        .query()
        .map(|q| q.split('&').any(|pair| pair == "count=true"))
        .unwrap_or(false);

    match (method.as_str(), segments.as_slice()) {
        ("GET", ["user"]) => reply(200, json!({ "username": USERNAME, "role": "admin" })),
        ("GET", [collection]) => state.list(collection, count_only),
        ("GET", [collection, id]) => state.find(collection, id),
        ("POST", [collection]) => state.create(collection, body),
        ("PUT", [collection, id]) => state.update(collection, id, body),
        ("DELETE", [collection, id]) => state.remove(collection, id),
        ("POST", ["tasks", id, "start"]) => state.set_task_status(id, "RUNNING", &[]),
        ("POST", ["tasks", id, "cancel"]) => {
            state.set_task_status(id, "CANCELLED", &["PENDING", "RUNNING"])
        }
        ("GET", ["tasks", id, "logs"]) => state.task_logs(id),
        _ => not_found(),
    }
}

/// Mock API bound to an ephemeral local port
pub struct MockServer {
    pub base_url: String,
    state: Arc<MockState>,
}

impl MockServer {
    pub async fn start() -> Self {
        let state = Arc::new(MockState::seeded());
        let app = Router::new().fallback(handle).with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{}/api", addr),
            state,
        }
    }

    /// Requests received so far, any route
    pub fn hits(&self) -> usize {
        self.state.hits.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().clone()
    }

    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.state.requests.lock().last().cloned()
    }

    /// Accept `token` as if it had been issued by an earlier login
    pub fn accept_token(&self, token: &str) {
        *self.state.accepted_token.lock() = Some(token.to_string());
    }

    /// Token handed out by subsequent logins
    pub fn issue_token(&self, token: &str) {
        *self.state.issued_token.lock() = token.to_string();
    }

    /// Reject every token until the next successful login
    pub fn revoke_tokens(&self) {
        *self.state.accepted_token.lock() = None;
    }

    /// Answer `route` (relative to `/api/`) with a fixed response
    pub fn respond_with(&self, route: &str, status: u16, body: Value) {
        self.state
            .overrides
            .lock()
            .insert(route.to_string(), (status, body));
    }

    /// Hold requests to `route` before they are answered
    pub fn delay(&self, route: &str, delay: Duration) {
        self.state
            .delays
            .lock()
            .insert(route.to_string(), delay);
    }

    pub fn fail(&self, route: &str, status: u16) {
        self.respond_with(route, status, json!({ "detail": "Injected failure" }));
    }

    pub fn collection(&self, name: &str) -> Vec<Value> {
        self.state
            .collections
            .lock()
            .get(name)
            .cloned()
            .unwrap_or_default()
    }
}

pub fn config(server: &MockServer) -> ClientConfig {
    ClientConfig {
        base_url: server.base_url.clone(),
        store: StoreBackend::Memory,
        data_dir: std::env::temp_dir(),
        timeout_secs: Some(10),
        no_proxy: true,
    }
}

/// Logged-out client plus the store it persists to
pub fn client(server: &MockServer) -> (ApiClient, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let client = ApiClient::new(&config(server), store.clone()).unwrap();
    (client, store)
}

pub async fn logged_in_client(server: &MockServer) -> ApiClient {
    let (client, _store) = client(server);
    client.login(USERNAME, PASSWORD).await.unwrap();
    client
}

/// Notifier that keeps every notice
#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: &Notice) {
        self.notices.lock().push(notice.clone());
    }
}
