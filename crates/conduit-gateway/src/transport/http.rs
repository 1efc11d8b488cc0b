use std::net::{IpAddr, SocketAddr};

use axum::{
    extract::{ConnectInfo, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde_json::{json, Value};

use conduit_core::error::ConduitError;

use crate::app_state::AppState;
use crate::context::InboundRequest;
use crate::policy::PolicyDecision;

const FORWARDED_FOR: &str = "x-forwarded-for";

/// Catch-all conduit handler. Routing is by `Host`, never by path.
pub async fn handle(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let log_errors = state.cfg().gateway.log_errors;

    let req = inbound(&state, peer, &method, &uri, &headers, &body);

    match state.pipeline().evaluate(req) {
        PolicyDecision::Absorb { conduit_id } => {
            tracing::debug!(conduit = %conduit_id, "absorbed");
            (StatusCode::OK, Json(json!({}))).into_response()
        }
        PolicyDecision::Reject(e) => error_response(e, log_errors),
        PolicyDecision::Dispatch(ctx) => match state.dispatcher().dispatch(ctx).await {
            Ok(out) => {
                let status = StatusCode::from_u16(out.status).unwrap_or(StatusCode::BAD_GATEWAY);
                (status, Json(out.data)).into_response()
            }
            Err(e) => error_response(e, log_errors),
        },
    }
}

fn inbound(
    state: &AppState,
    peer: SocketAddr,
    method: &Method,
    uri: &Uri,
    headers: &HeaderMap,
    body: &Bytes,
) -> InboundRequest {
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| uri.host().map(str::to_string))
        .unwrap_or_default();

    let query = match uri.query() {
        Some(raw) => serde_urlencoded::from_str::<Vec<(String, String)>>(raw).unwrap_or_else(|e| {
            tracing::debug!(error = %e, "ignoring undecodable query string");
            Vec::new()
        }),
        None => Vec::new(),
    };

    // Judged by the body stage so routing and access checks answer first.
    let (body, malformed_body) = if body.is_empty() {
        (None, None)
    } else {
        match serde_json::from_slice::<Value>(body) {
            Ok(v) => (Some(v), None),
            Err(e) => (None, Some(e.to_string())),
        }
    };

    InboundRequest {
        host,
        method: method.as_str().to_string(),
        path: uri.path().to_string(),
        query,
        client_ip: client_ip(state.cfg().gateway.trust_forwarded_for, peer, headers),
        body,
        malformed_body,
    }
}

/// Caller address: the first `X-Forwarded-For` hop when trusted, else the
/// socket peer.
pub fn client_ip(trust_forwarded_for: bool, peer: SocketAddr, headers: &HeaderMap) -> IpAddr {
    if trust_forwarded_for {
        let forwarded = headers
            .get(FORWARDED_FOR)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|first| first.trim().parse::<IpAddr>().ok());
        if let Some(ip) = forwarded {
            return ip;
        }
    }
    peer.ip()
}

/// Uniform error body: `{"errors": {"code", "message"}}`, or the upstream
/// payload untouched for relayed backend errors.
pub fn error_response(err: ConduitError, log_errors: bool) -> Response {
    if log_errors {
        tracing::error!(code = err.client_code().as_str(), error = %err, "request failed");
    }

    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = match err {
        ConduitError::Upstream { payload, .. } => json!({ "errors": payload }),
        other => json!({
            "errors": {
                "code": other.client_code().as_str(),
                "message": other.to_string(),
            }
        }),
    };
    (status, Json(body)).into_response()
}
