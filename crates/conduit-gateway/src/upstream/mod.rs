//! Outbound HTTP helpers shared by the resource client, token providers, and
//! integration adapters.

pub mod resource;

use std::time::Duration;

use reqwest::Client;
use serde_json::{json, Value};

use conduit_core::error::{ConduitError, Result};

pub use resource::{LoginResponse, OperatorConduitSource, ResourceClient, ResourceUser};

/// Build a client with a bounded per-request timeout.
pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ConduitError::Internal(format!("failed to build HTTP client: {e}")))
}

/// Wrap a transport failure, keeping the underlying cause.
pub fn transport_error(context: &str, err: reqwest::Error) -> ConduitError {
    if err.is_timeout() {
        ConduitError::Internal(format!("{context}: request timed out: {err}"))
    } else {
        ConduitError::Internal(format!("{context}: {err}"))
    }
}

/// Read a response body as JSON, falling back to `{"body": "<text>"}`.
pub async fn read_body(resp: reqwest::Response) -> Value {
    let text = resp.text().await.unwrap_or_default();
    if text.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(&text).unwrap_or_else(|_| json!({ "body": text }))
}

/// Turn a non-2xx response into `ConduitError::Upstream`, payload untouched.
pub async fn ensure_success(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let payload = read_body(resp).await;
    Err(ConduitError::Upstream {
        status: status.as_u16(),
        payload,
    })
}

/// Join a base URL and a path without doubling or dropping slashes.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Append path segments to `base`, percent-encoding each one.
pub fn segment_url(base: &str, segments: &[&str]) -> Result<reqwest::Url> {
    let mut url = reqwest::Url::parse(base)
        .map_err(|e| ConduitError::Internal(format!("invalid base url {base}: {e}")))?;
    url.path_segments_mut()
        .map_err(|_| ConduitError::Internal(format!("base url cannot be a base: {base}")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn join_url_normalizes_slashes() {
        assert_eq!(join_url("http://h/", "/auth/login"), "http://h/auth/login");
        assert_eq!(join_url("http://h", "auth/login"), "http://h/auth/login");
    }

    #[test]
    fn segment_url_encodes_each_segment() {
        let url = segment_url("http://h/api/", &["users", "a/b c?", "conduits"]).unwrap();
        assert_eq!(url.as_str(), "http://h/api/users/a%2Fb%20c%3F/conduits");
    }
}
