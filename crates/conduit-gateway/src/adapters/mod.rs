//! Integration adapters: one per backend service.
//!
//! Every adapter speaks the same three-step protocol:
//! - `map_in`: canonical request -> backend-specific call (URL, headers, body)
//! - `transmit`: perform the call, returning raw status and data
//! - `map_out`: backend response -> canonical `{status, data}`
//!
//! The dispatcher only ever sees this trait.

pub mod airtable;
pub mod google_sheets;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use conduit_core::error::{ConduitError, Result};
use conduit_core::model::{AccessToken, BackendType, HttpMethod};

use crate::upstream::{read_body, transport_error};

pub use airtable::AirtableAdapter;
pub use google_sheets::GoogleSheetsAdapter;

/// Canonical inbound envelope handed to `map_in`.
#[derive(Debug, Clone)]
pub struct AdapterRequest {
    pub container_key: String,
    pub token: AccessToken,
    pub method: HttpMethod,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

/// Fully-resolved outbound call.
#[derive(Debug, Clone)]
pub struct BackendCall {
    pub method: HttpMethod,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Inbound method this call was mapped from.
    pub origin: HttpMethod,
    /// Conduit container the call targets.
    pub container_key: String,
}

/// Raw backend answer, before `map_out`.
#[derive(Debug, Clone)]
pub struct BackendResponse {
    pub status: u16,
    pub data: Value,
    pub origin: HttpMethod,
}

/// What the gateway writes back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayResponse {
    pub status: u16,
    pub data: Value,
}

#[async_trait]
pub trait IntegrationAdapter: Send + Sync {
    fn backend(&self) -> BackendType;

    async fn map_in(&self, req: AdapterRequest) -> Result<BackendCall>;

    async fn transmit(&self, call: BackendCall) -> Result<BackendResponse>;

    /// Pass-through unless the backend needs its shape normalized.
    async fn map_out(&self, resp: BackendResponse) -> Result<GatewayResponse> {
        Ok(GatewayResponse {
            status: resp.status,
            data: resp.data,
        })
    }
}

/// Shared `transmit` body: send the call and capture status + JSON data.
/// Non-2xx answers are returned, not raised; only transport failures error.
pub async fn send_call(http: &Client, call: BackendCall) -> Result<BackendResponse> {
    let method = match call.method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Delete => reqwest::Method::DELETE,
    };

    let mut request = http.request(method, &call.url);
    if !call.query.is_empty() {
        request = request.query(&call.query);
    }
    for (name, value) in &call.headers {
        request = request.header(name.as_str(), value.as_str());
    }
    if let Some(body) = &call.body {
        request = request.json(body);
    }

    let resp = request
        .send()
        .await
        .map_err(|e| transport_error("backend transmit", e))?;
    let status = resp.status().as_u16();
    let data = read_body(resp).await;

    Ok(BackendResponse {
        status,
        data,
        origin: call.origin,
    })
}

/// Record ids for a bulk delete, taken from `records` / `records[]` query
/// parameters (repeated or comma-separated). Other parameters are returned
/// untouched.
pub fn split_record_ids(query: &[(String, String)]) -> (Vec<String>, Vec<(String, String)>) {
    let mut ids = Vec::new();
    let mut rest = Vec::new();
    for (k, v) in query {
        if k == "records" || k == "records[]" {
            ids.extend(
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
            );
        } else {
            rest.push((k.clone(), v.clone()));
        }
    }
    (ids, rest)
}

pub(crate) fn bearer_headers(token: &AccessToken, with_body: bool) -> Vec<(String, String)> {
    let mut headers = vec![("Authorization".to_string(), token.authorization())];
    if with_body {
        headers.push(("Content-Type".to_string(), "application/json".to_string()));
    }
    headers
}

pub(crate) fn parse_base(base_url: &str) -> Result<reqwest::Url> {
    reqwest::Url::parse(base_url)
        .map_err(|e| ConduitError::Internal(format!("invalid backend base url {base_url}: {e}")))
}
