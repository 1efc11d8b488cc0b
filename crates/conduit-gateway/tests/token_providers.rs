#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Form, Json, Router,
};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::Client;
use serde_json::{json, Value};

use conduit_core::model::{CredentialRef, ServiceType};
use conduit_gateway::config::CredentialEntry;
use conduit_gateway::token::providers::signed_assertion::{AssertionClaims, JWT_BEARER_GRANT};
use conduit_gateway::token::providers::{InternalAuthProvider, SignedAssertionProvider};
use conduit_gateway::token::{CredentialStore, SystemClock, TokenService};
use conduit_gateway::upstream::ResourceClient;

use common::{fixtures_dir, spawn_mock};

const SA_EMAIL: &str = "sheets-bot@conduit-test.iam.example";

// --------------------
// Resource service login
// --------------------

#[derive(Clone, Default)]
struct LoginCounter(Arc<AtomicUsize>);

async fn login(
    State(counter): State<LoginCounter>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    counter.0.fetch_add(1, Ordering::SeqCst);
    if body["password"] == "forever" {
        return (
            StatusCode::OK,
            Json(json!({"user": {"id": "u-42"}, "token": "sess-forever", "expiresIn": u64::MAX})),
        );
    }
    if body["email"] == "ops@example.com" && body["password"] == "hunter2" {
        (
            StatusCode::OK,
            Json(json!({"user": {"id": "u-42", "email": "ops@example.com"}, "token": "sess-1", "expiresIn": 600})),
        )
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "bad credentials"})),
        )
    }
}

fn store(password: &str) -> Arc<CredentialStore> {
    let mut entries = HashMap::new();
    entries.insert(
        "operator".to_string(),
        CredentialEntry {
            email: Some("ops@example.com".into()),
            password: Some(password.into()),
            api_key: None,
        },
    );
    Arc::new(CredentialStore::new(entries))
}

async fn internal_service(password: &str) -> (LoginCounter, TokenService) {
    let counter = LoginCounter::default();
    let base = spawn_mock(
        Router::new()
            .route("/auth/login", post(login))
            .with_state(counter.clone()),
    )
    .await;

    let clock = Arc::new(SystemClock);
    let client = Arc::new(ResourceClient::new(base, Duration::from_secs(2)).unwrap());
    let svc = TokenService::new(clock.clone());
    svc.register(Arc::new(InternalAuthProvider::new(
        client,
        store(password),
        clock,
        3600,
    )));
    (counter, svc)
}

#[tokio::test]
async fn internal_login_token_is_cached() {
    let (counter, svc) = internal_service("hunter2").await;
    let cred = CredentialRef::new("operator");

    let a = svc.get_access_token(ServiceType::Internal, &cred).await.unwrap();
    let b = svc.get_access_token(ServiceType::Internal, &cred).await.unwrap();

    assert_eq!(a.token_value, "sess-1");
    assert_eq!(a.principal.as_deref(), Some("u-42"));
    assert_eq!(b.token_value, a.token_value);
    assert_eq!(counter.0.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn rejected_login_is_relayed_and_not_cached() {
    let (counter, svc) = internal_service("wrong").await;
    let cred = CredentialRef::new("operator");

    let err = svc
        .get_access_token(ServiceType::Internal, &cred)
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 401);
    assert_eq!(err.client_code().as_str(), "UPSTREAM");

    svc.get_access_token(ServiceType::Internal, &cred)
        .await
        .unwrap_err();
    assert_eq!(counter.0.load(Ordering::SeqCst), 2);
    assert_eq!(svc.cached_len(), 0);
}

#[tokio::test]
async fn oversized_lifetime_saturates() {
    let (_counter, svc) = internal_service("forever").await;
    let token = svc
        .get_access_token(ServiceType::Internal, &CredentialRef::new("operator"))
        .await
        .unwrap();
    assert_eq!(token.token_value, "sess-forever");
    assert_eq!(token.expires_at, u64::MAX);
}

#[tokio::test]
async fn unknown_credential_is_invalid_credentials() {
    let (counter, svc) = internal_service("hunter2").await;
    let err = svc
        .get_access_token(ServiceType::Internal, &CredentialRef::new("nobody"))
        .await
        .unwrap_err();
    assert_eq!(err.client_code().as_str(), "INVALID_CREDENTIALS");
    assert_eq!(counter.0.load(Ordering::SeqCst), 0);
}

// --------------------
// Signed assertion exchange
// --------------------

#[derive(Clone)]
struct TokenEndpoint {
    public_pem: Arc<Vec<u8>>,
    audience: Arc<std::sync::Mutex<String>>,
}

async fn exchange(
    State(ep): State<TokenEndpoint>,
    Form(form): Form<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    if form.get("grant_type").map(String::as_str) != Some(JWT_BEARER_GRANT) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "unsupported_grant_type"})),
        );
    }
    let assertion = form.get("assertion").cloned().unwrap_or_default();

    let header = decode_header(&assertion).unwrap();
    assert_eq!(header.alg, Algorithm::RS256);
    assert_eq!(header.kid.as_deref(), Some("kid-test-1"));

    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_audience(&[ep.audience.lock().unwrap().as_str()]);
    let key = DecodingKey::from_rsa_pem(&ep.public_pem).unwrap();
    match decode::<AssertionClaims>(&assertion, &key, &validation) {
        Ok(data) if data.claims.iss == SA_EMAIL => (
            StatusCode::OK,
            Json(json!({
                "access_token": format!("ya29.{}", data.claims.scope),
                "token_type": "Bearer",
                "expires_in": 3599
            })),
        ),
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid_grant"})),
        ),
    }
}

async fn token_endpoint() -> String {
    let public_pem = std::fs::read(fixtures_dir().join("sa_public.pem")).unwrap();
    let ep = TokenEndpoint {
        public_pem: Arc::new(public_pem),
        audience: Arc::new(std::sync::Mutex::new(String::new())),
    };
    let base = spawn_mock(
        Router::new()
            .route("/token", post(exchange))
            .with_state(ep.clone()),
    )
    .await;
    let uri = format!("{base}/token");
    *ep.audience.lock().unwrap() = uri.clone();
    uri
}

fn assertion_service(token_uri: &str) -> TokenService {
    let clock = Arc::new(SystemClock);
    let svc = TokenService::new(clock.clone());
    svc.register(Arc::new(SignedAssertionProvider::new(
        ServiceType::GoogleSheets,
        fixtures_dir(),
        token_uri,
        "spreadsheets",
        Client::new(),
        clock,
    )));
    svc
}

#[tokio::test]
async fn signed_assertion_is_exchanged_for_bearer_token() {
    let uri = token_endpoint().await;
    let svc = assertion_service(&uri);

    let token = svc
        .get_access_token(ServiceType::GoogleSheets, &CredentialRef::new("sheets-sa"))
        .await
        .unwrap();

    assert_eq!(token.token_value, "ya29.spreadsheets");
    assert_eq!(token.authorization(), "Bearer ya29.spreadsheets");
    assert_eq!(token.principal.as_deref(), Some(SA_EMAIL));
    assert_eq!(token.credential_key, "google_sheets:sheets-sa");
}

#[tokio::test]
async fn token_endpoint_rejection_is_relayed() {
    let uri = token_endpoint().await;
    // Wrong audience: the endpoint refuses the grant.
    let svc = assertion_service(&format!("{uri}?aud=other"));

    let err = svc
        .get_access_token(ServiceType::GoogleSheets, &CredentialRef::new("sheets-sa"))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 400);
    match err {
        conduit_core::ConduitError::Upstream { payload, .. } => {
            assert_eq!(payload["error"], "invalid_grant")
        }
        other => panic!("expected upstream error, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_key_file_is_invalid_credentials() {
    let svc = assertion_service("http://127.0.0.1:9/token");
    let err = svc
        .get_access_token(ServiceType::GoogleSheets, &CredentialRef::new("absent"))
        .await
        .unwrap_err();
    assert_eq!(err.client_code().as_str(), "INVALID_CREDENTIALS");
}

// --------------------
// Spreadsheet dispatch end to end
// --------------------

async fn sheet_values(
    Path((_id, range)): Path<(String, String)>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if auth != "Bearer ya29.spreadsheets" {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": {"code": 401}})));
    }
    (
        StatusCode::OK,
        Json(json!({
            "range": range,
            "values": [["Name", "Email"], ["Ada", "ada@example.com"]]
        })),
    )
}

#[tokio::test]
async fn sheet_reads_come_back_as_records() {
    use axum::{body::Body, extract::connect_info::MockConnectInfo, http::Request};
    use conduit_gateway::{app_state::AppState, router};
    use tower::ServiceExt;

    let token_uri = token_endpoint().await;
    let sheets = spawn_mock(Router::new().route(
        "/v4/spreadsheets/:id/values/:range",
        get(sheet_values),
    ))
    .await;

    let state = AppState::new(common::gateway_config(
        "http://127.0.0.1:9",
        &sheets,
        &token_uri,
    ))
    .unwrap();
    state.routes().replace_all(vec![serde_json::from_value(json!({
        "id": "c-sheet",
        "hostIdentifier": "sheet.example.com",
        "backendType": "GOOGLE_SHEETS",
        "credentialRef": "sheets-sa",
        "containerKey": "sheet123/Leads",
        "allowedMethods": ["GET"],
        "status": "ACTIVE"
    }))
    .unwrap()]);

    let app = router::build_router(state)
        .layer(MockConnectInfo(std::net::SocketAddr::from(([127, 0, 0, 1], 1))));
    let resp = app
        .oneshot(
            Request::builder()
                .uri("/")
                .header("host", "sheet.example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(
        body,
        json!({"records": [{"id": "2", "fields": {"Name": "Ada", "Email": "ada@example.com"}}]})
    );
}
