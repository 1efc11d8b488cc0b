//! Shared error type across conduit crates.

use serde_json::Value;
use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Unknown host or resource.
    NotFound,
    /// Caller rejected by the conduit allow list.
    Forbidden,
    /// HTTP method not enabled on the conduit.
    MethodNotAllowed,
    /// Request body does not have the required shape.
    UnprocessableEntity,
    /// Credential material missing or unusable.
    InvalidCredentials,
    /// Error payload relayed from an upstream service.
    Upstream,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::NotFound => "NOT_FOUND",
            ClientCode::Forbidden => "FORBIDDEN",
            ClientCode::MethodNotAllowed => "METHOD_NOT_ALLOWED",
            ClientCode::UnprocessableEntity => "UNPROCESSABLE_ENTITY",
            ClientCode::InvalidCredentials => "INVALID_CREDENTIALS",
            ClientCode::Upstream => "UPSTREAM",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, ConduitError>;

/// Unified error type used by core and gateway.
#[derive(Debug, Error)]
pub enum ConduitError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("method not allowed: {0}")]
    MethodNotAllowed(String),
    #[error("unprocessable entity: {0}")]
    UnprocessableEntity(String),
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),
    /// Non-2xx answer from an upstream service, relayed without translation.
    #[error("upstream responded with status {status}")]
    Upstream { status: u16, payload: Value },
    #[error("internal: {0}")]
    Internal(String),
}

impl ConduitError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            ConduitError::NotFound(_) => ClientCode::NotFound,
            ConduitError::Forbidden(_) => ClientCode::Forbidden,
            ConduitError::MethodNotAllowed(_) => ClientCode::MethodNotAllowed,
            ConduitError::UnprocessableEntity(_) => ClientCode::UnprocessableEntity,
            ConduitError::InvalidCredentials(_) => ClientCode::InvalidCredentials,
            ConduitError::Upstream { .. } => ClientCode::Upstream,
            ConduitError::Internal(_) => ClientCode::Internal,
        }
    }

    /// HTTP status the error is reported with.
    pub fn status_code(&self) -> u16 {
        match self {
            ConduitError::NotFound(_) => 404,
            ConduitError::Forbidden(_) => 403,
            ConduitError::MethodNotAllowed(_) => 405,
            ConduitError::UnprocessableEntity(_) | ConduitError::InvalidCredentials(_) => 422,
            // An upstream status outside the error range is still an error for us.
            ConduitError::Upstream { status, .. } if (400..600).contains(status) => *status,
            ConduitError::Upstream { .. } => 502,
            ConduitError::Internal(_) => 500,
        }
    }

    /// 422 naming the body element that is missing.
    pub fn missing_body_part(part: &str) -> Self {
        ConduitError::UnprocessableEntity(format!("request body is missing `{part}`"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(ConduitError::NotFound("h".into()).status_code(), 404);
        assert_eq!(ConduitError::Forbidden("ip".into()).status_code(), 403);
        assert_eq!(ConduitError::MethodNotAllowed("PUT".into()).status_code(), 405);
        assert_eq!(ConduitError::missing_body_part("records").status_code(), 422);
        assert_eq!(ConduitError::InvalidCredentials("x".into()).status_code(), 422);
        assert_eq!(ConduitError::Internal("boom".into()).status_code(), 500);
    }

    #[test]
    fn upstream_status_is_relayed() {
        let err = ConduitError::Upstream {
            status: 401,
            payload: json!({"error": "invalid_grant"}),
        };
        assert_eq!(err.status_code(), 401);
        assert_eq!(err.client_code().as_str(), "UPSTREAM");

        let odd = ConduitError::Upstream {
            status: 302,
            payload: json!(null),
        };
        assert_eq!(odd.status_code(), 502);
    }

    #[test]
    fn missing_part_names_the_part() {
        let err = ConduitError::missing_body_part("fields");
        assert!(err.to_string().contains("`fields`"));
        assert_eq!(err.client_code(), ClientCode::UnprocessableEntity);
    }
}
