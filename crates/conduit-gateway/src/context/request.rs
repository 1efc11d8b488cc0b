use std::net::IpAddr;
use std::sync::Arc;

use serde_json::Value;

use conduit_core::model::{Conduit, HttpMethod};

/// Transport-neutral view of an inbound HTTP request.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    /// Raw `Host` header value.
    pub host: String,
    /// Raw method token; parsed by the method stage.
    pub method: String,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub client_ip: IpAddr,
    /// Parsed JSON body, if any was sent.
    pub body: Option<Value>,
    /// Parse error for a body that was sent but is not JSON. Reported by the
    /// body stage, after routing and access checks.
    pub malformed_body: Option<String>,
}

/// Resolved request flowing through the policy stages and into dispatch.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub conduit: Arc<Conduit>,
    pub method: Option<HttpMethod>,
    pub raw_method: String,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub client_ip: IpAddr,
    pub body: Option<Value>,
    pub malformed_body: Option<String>,
}

impl RequestContext {
    pub fn new(conduit: Arc<Conduit>, req: InboundRequest) -> Self {
        Self {
            conduit,
            method: req.method.parse().ok(),
            raw_method: req.method,
            path: req.path,
            query: req.query,
            client_ip: req.client_ip,
            body: req.body,
            malformed_body: req.malformed_body,
        }
    }

    /// Mutable `fields` map of the first record, when the body has one.
    pub fn first_fields_mut(&mut self) -> Option<&mut serde_json::Map<String, Value>> {
        self.body
            .as_mut()?
            .get_mut("records")?
            .as_array_mut()?
            .first_mut()?
            .get_mut("fields")?
            .as_object_mut()
    }
}
