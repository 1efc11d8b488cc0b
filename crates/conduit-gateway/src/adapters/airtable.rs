//! Tabular REST backend (`/v0/{base}/{table}`).
//!
//! Bodies and query strings pass through unchanged. Bulk deletes are sent as
//! repeated `records[]` query parameters because the API takes no DELETE body.

use async_trait::async_trait;
use reqwest::Client;

use conduit_core::error::{ConduitError, Result};
use conduit_core::model::{BackendType, HttpMethod};

use super::{
    bearer_headers, parse_base, send_call, split_record_ids, AdapterRequest, BackendCall,
    BackendResponse, IntegrationAdapter,
};

pub struct AirtableAdapter {
    base_url: String,
    http: Client,
}

impl AirtableAdapter {
    pub fn new(base_url: impl Into<String>, http: Client) -> Self {
        Self {
            base_url: base_url.into(),
            http,
        }
    }

    fn record_url(&self, container_key: &str, path: &str) -> Result<String> {
        let mut url = parse_base(&self.base_url)?;
        {
            let mut segs = url.path_segments_mut().map_err(|_| {
                ConduitError::Internal(format!("backend base url cannot be a base: {}", self.base_url))
            })?;
            segs.pop_if_empty().push("v0");
            for part in container_key.split('/').filter(|s| !s.is_empty()) {
                segs.push(part);
            }
        }
        // Inbound path is already percent-encoded.
        let extra = path.trim_matches('/');
        if !extra.is_empty() {
            let joined = format!("{}/{}", url.path(), extra);
            url.set_path(&joined);
        }
        Ok(url.to_string())
    }
}

#[async_trait]
impl IntegrationAdapter for AirtableAdapter {
    fn backend(&self) -> BackendType {
        BackendType::Airtable
    }

    async fn map_in(&self, req: AdapterRequest) -> Result<BackendCall> {
        let url = self.record_url(&req.container_key, &req.path)?;

        let query = if req.method == HttpMethod::Delete {
            let (ids, mut rest) = split_record_ids(&req.query);
            rest.extend(ids.into_iter().map(|id| ("records[]".to_string(), id)));
            rest
        } else {
            req.query
        };

        let body = if req.method.carries_body() { req.body } else { None };

        Ok(BackendCall {
            method: req.method,
            url,
            query,
            headers: bearer_headers(&req.token, body.is_some()),
            body,
            origin: req.method,
            container_key: req.container_key,
        })
    }

    async fn transmit(&self, call: BackendCall) -> Result<BackendResponse> {
        send_call(&self.http, call).await
    }
}
