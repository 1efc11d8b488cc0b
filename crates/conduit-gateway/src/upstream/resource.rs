//! Client for the resource-management service that owns conduit records.
//!
//! The gateway only needs two calls: log in, and list the conduits owned by
//! the operator account.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use conduit_core::error::{ConduitError, Result};
use conduit_core::model::{AccessToken, CredentialRef, ServiceType};

use super::{build_client, ensure_success, join_url, segment_url, transport_error};
use crate::routing::ConduitSource;
use crate::token::TokenService;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: ResourceUser,
    pub token: String,
    /// Token lifetime in seconds, when the service reports one.
    #[serde(default)]
    pub expires_in: Option<u64>,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Conduit list is served either bare or wrapped.
#[derive(Deserialize)]
#[serde(untagged)]
enum ConduitList {
    Bare(Vec<Value>),
    Wrapped { conduits: Vec<Value> },
}

pub struct ResourceClient {
    base_url: String,
    http: Client,
}

impl ResourceClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            base_url: base_url.into(),
            http: build_client(timeout)?,
        })
    }

    /// `POST /auth/login`
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse> {
        let resp = self
            .http
            .post(join_url(&self.base_url, "/auth/login"))
            .json(&LoginRequest { email, password })
            .send()
            .await
            .map_err(|e| transport_error("resource login", e))?;

        ensure_success(resp)
            .await?
            .json::<LoginResponse>()
            .await
            .map_err(|e| ConduitError::Internal(format!("resource login: bad response: {e}")))
    }

    /// `GET /users/{user_id}/conduits`
    pub async fn list_conduits_for_user(
        &self,
        token: &AccessToken,
        user_id: &str,
    ) -> Result<Vec<Value>> {
        let url = segment_url(&self.base_url, &["users", user_id, "conduits"])?;
        let resp = self
            .http
            .get(url)
            .header(reqwest::header::AUTHORIZATION, token.authorization())
            .send()
            .await
            .map_err(|e| transport_error("list conduits", e))?;

        let list = ensure_success(resp)
            .await?
            .json::<ConduitList>()
            .await
            .map_err(|e| ConduitError::Internal(format!("list conduits: bad response: {e}")))?;

        Ok(match list {
            ConduitList::Bare(v) => v,
            ConduitList::Wrapped { conduits } => conduits,
        })
    }
}

/// Conduit source backed by the resource service, authenticated as the
/// operator account through the token service like any other credential.
pub struct OperatorConduitSource {
    client: Arc<ResourceClient>,
    tokens: Arc<TokenService>,
    credential: CredentialRef,
}

impl OperatorConduitSource {
    pub fn new(client: Arc<ResourceClient>, tokens: Arc<TokenService>, credential: CredentialRef) -> Self {
        Self {
            client,
            tokens,
            credential,
        }
    }
}

#[async_trait]
impl ConduitSource for OperatorConduitSource {
    async fn fetch_conduits(&self) -> Result<Vec<Value>> {
        let token = self
            .tokens
            .get_access_token(ServiceType::Internal, &self.credential)
            .await?;
        let user_id = token.principal.clone().ok_or_else(|| {
            ConduitError::Internal("operator login did not report a user id".into())
        })?;
        let listed = self.client.list_conduits_for_user(&token, &user_id).await;
        if let Err(ConduitError::Upstream { status: 401, .. }) = &listed {
            // Revoked session: log in again on the next cycle.
            tracing::info!(credential = %self.credential, "operator token rejected; dropping it");
            self.tokens.invalidate(ServiceType::Internal, &self.credential);
        }
        listed
    }
}
