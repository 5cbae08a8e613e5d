//! Error redaction: turning a [`PolicyError`] into a caller-safe response.
//!
//! Client errors get their terse message and reason code. Server errors get
//! a fixed message and a fresh correlation id; the full error is logged at
//! `error` level under that id. Only development mode adds a `detail` field.

use std::fmt;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::audit::{AuditEvent, AuditEventKind, AuditOutcome};
use crate::config::Environment;
use crate::{PolicyError, PolicyErrorKind};

/// Fixed message for every 5xx body.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Random id linking a redacted response to its server-side log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    /// Generates a fresh v4 id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Serialize)]
struct ClientErrorBody<'a> {
    error: &'a str,
    code: &'static str,
}

#[derive(Debug, Serialize)]
struct ServerErrorBody {
    error: &'static str,
    correlation_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

/// Renders errors for one deployment mode.
#[derive(Debug, Clone, Copy)]
pub struct Redactor {
    environment: Environment,
}

impl Redactor {
    /// Creates a redactor. Only [`Environment::Development`] exposes detail.
    pub fn new(environment: Environment) -> Self {
        Self { environment }
    }

    /// Builds the response for `error` and records it.
    ///
    /// `request_id` and `endpoint` go to the log and audit trail, never to
    /// the body.
    pub fn render(&self, error: &PolicyError, request_id: &str, endpoint: &str) -> Response {
        let kind = error.kind();
        let status =
            StatusCode::from_u16(kind.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        match error.public_message() {
            Some(message) if kind.is_client_error() => {
                tracing::info!(
                    request_id,
                    endpoint,
                    code = kind.code(),
                    "request rejected"
                );
                AuditEvent::new(request_id, audit_kind(kind), AuditOutcome::Denied)
                    .with_endpoint(endpoint)
                    .with_code(kind)
                    .emit();

                let body = ClientErrorBody {
                    error: message,
                    code: kind.code(),
                };
                (status, Json(body)).into_response()
            }
            _ => {
                let correlation_id = CorrelationId::new();
                tracing::error!(
                    request_id,
                    endpoint,
                    %correlation_id,
                    code = kind.code(),
                    error = %error,
                    "request failed"
                );
                AuditEvent::new(
                    request_id,
                    AuditEventKind::InfrastructureFailure,
                    AuditOutcome::Error,
                )
                .with_endpoint(endpoint)
                .with_code(kind)
                .with_correlation_id(correlation_id.to_string())
                .emit();

                let body = ServerErrorBody {
                    error: INTERNAL_ERROR_MESSAGE,
                    correlation_id: correlation_id.to_string(),
                    detail: self
                        .environment
                        .is_development()
                        .then(|| error.to_string()),
                };
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        }
    }
}

fn audit_kind(kind: PolicyErrorKind) -> AuditEventKind {
    match kind {
        PolicyErrorKind::InvalidCredentials => AuditEventKind::Authentication,
        PolicyErrorKind::RateLimited => AuditEventKind::RateLimited,
        _ => AuditEventKind::InputRejected,
    }
}

/// Handlers return `PolicyError` directly. The response carries the error in
/// its extensions with an empty body; the redaction middleware replaces it
/// with the rendered body once the request id and mode are known.
impl IntoResponse for PolicyError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.kind().status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = status.into_response();
        response.extensions_mut().insert(Arc::new(self));
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;
    use crate::{SanitizationError, SanitizationErrorKind};
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn client_error_has_message_and_code() {
        let err: PolicyError =
            SanitizationError::new(SanitizationErrorKind::InvalidFormat, "id must be an integer")
                .into();
        let response = Redactor::new(Environment::Production).render(&err, "req-1", "/user");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "id must be an integer");
        assert_eq!(body["code"], "InvalidFormat");
    }

    #[tokio::test]
    async fn server_error_is_generic_in_production() {
        let err = PolicyError::Storage(StoreError::Closed);
        let response = Redactor::new(Environment::Production).render(&err, "req-2", "/user");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], INTERNAL_ERROR_MESSAGE);
        assert!(Uuid::parse_str(body["correlation_id"].as_str().unwrap()).is_ok());
        assert!(body.get("detail").is_none());
        assert!(!body.to_string().contains("closed"));
    }

    #[tokio::test]
    async fn development_adds_detail() {
        let err = PolicyError::Storage(StoreError::Closed);
        let response = Redactor::new(Environment::Development).render(&err, "req-3", "/user");

        let body = body_json(response).await;
        assert_eq!(body["error"], INTERNAL_ERROR_MESSAGE);
        assert!(body["detail"].as_str().unwrap().contains("store is closed"));
    }

    #[test]
    fn into_response_stashes_error() {
        let response = PolicyError::RateLimited.into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let stashed = response.extensions().get::<Arc<PolicyError>>().unwrap();
        assert_eq!(stashed.kind(), PolicyErrorKind::RateLimited);
    }

    #[test]
    fn correlation_ids_are_unique() {
        assert_ne!(CorrelationId::new(), CorrelationId::new());
    }
}
