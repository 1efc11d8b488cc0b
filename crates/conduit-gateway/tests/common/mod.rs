//! Shared helpers for gateway integration tests: local mock upstreams bound to
//! `127.0.0.1:0` and a config pointing the gateway at them.

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::IntoResponse,
    Json, Router,
};
use serde_json::{json, Value};

use conduit_gateway::config::{self, GatewayConfig};

/// Serve `app` on an ephemeral local port and return its base URL.
pub async fn spawn_mock(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock server");
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// One request as seen by a mock backend.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub body: Option<Value>,
}

#[derive(Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<Recorded>>>);

impl Recorder {
    pub fn calls(&self) -> Vec<Recorded> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.0.lock().unwrap().len()
    }
}

/// Tabular backend stand-in. Echoes the first record's fields back under a
/// fixed record id; any path ending in `/fail` answers 422 with a backend
/// error document.
pub async fn spawn_table_backend() -> (String, Recorder) {
    let recorder = Recorder::default();
    let app = Router::new()
        .fallback(table_handler)
        .with_state(recorder.clone());
    (spawn_mock(app).await, recorder)
}

async fn table_handler(
    State(rec): State<Recorder>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let body: Option<Value> = serde_json::from_slice(&body).ok();
    rec.0.lock().unwrap().push(Recorded {
        method: method.clone(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        authorization: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: body.clone(),
    });

    if uri.path().ends_with("/fail") {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"error": {"type": "INVALID_VALUE_FOR_COLUMN"}})),
        );
    }

    let fields = body
        .as_ref()
        .and_then(|b| b.pointer("/records/0/fields"))
        .cloned()
        .unwrap_or_else(|| json!({}));
    (
        StatusCode::OK,
        Json(json!({"records": [{"id": "rec1", "fields": fields}]})),
    )
}

pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// Gateway config wired to local mocks.
pub fn gateway_config(resource_url: &str, backend_url: &str, token_uri: &str) -> GatewayConfig {
    let yaml = format!(
        r#"
version: 1
gateway:
  listen: "127.0.0.1:0"
  log_errors: true
routing:
  refresh_interval_ms: 1000
  operator_credential: operator
resource:
  base_url: "{resource_url}"
  timeout_ms: 2000
backends:
  timeout_ms: 2000
  airtable:
    base_url: "{backend_url}"
  google_sheets:
    base_url: "{backend_url}"
    token_uri: "{token_uri}"
vault_dir: "{vault}"
credentials:
  operator:
    email: "ops@example.com"
    password: "hunter2"
  airtable-main:
    api_key: "pat-123"
"#,
        vault = fixtures_dir().display()
    );
    config::load_from_str(&yaml).expect("test config must load")
}
