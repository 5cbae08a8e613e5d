//! Request-scoped layers: request ids, security headers, error redaction,
//! rate limiting, and panic capture.
//!
//! Outermost to innermost: [`request_id`], [`security_headers`],
//! [`redact_errors`], [`rate_limit`], [`catch_panic`], then the handler.

use std::any::Any;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::extract::{ConnectInfo, MatchedPath, Request, State};
use axum::http::header::{
    CACHE_CONTROL, CONTENT_SECURITY_POLICY, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS,
    X_FRAME_OPTIONS,
};
use axum::http::{HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use futures::FutureExt;
use tracing::Instrument;
use uuid::Uuid;

use super::AppState;
use crate::PolicyError;

/// Response header echoing the request id.
pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Response header carrying the client's remaining allowance.
pub const RATE_LIMIT_REMAINING_HEADER: HeaderName = HeaderName::from_static("ratelimit-remaining");

/// Server-generated id for one request. Client-supplied ids are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(String);

impl RequestId {
    fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The id as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

const UNKNOWN_REQUEST: &str = "unknown";
const UNMATCHED_ROUTE: &str = "<unmatched>";

fn request_id_of(req: &Request) -> String {
    req.extensions()
        .get::<RequestId>()
        .map_or_else(|| UNKNOWN_REQUEST.to_string(), |id| id.0.clone())
}

fn endpoint_of(req: &Request) -> String {
    req.extensions()
        .get::<MatchedPath>()
        .map_or_else(|| UNMATCHED_ROUTE.to_string(), |path| path.as_str().to_string())
}

/// Assigns a request id, opens a span for it, and echoes it in `x-request-id`.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = RequestId::generate();
    let span = tracing::info_span!(
        "request",
        request_id = %id.as_str(),
        method = %req.method(),
        path = %req.uri().path(),
    );
    req.extensions_mut().insert(id.clone());

    let mut response = next.run(req).instrument(span.clone()).await;
    span.in_scope(|| tracing::debug!(status = response.status().as_u16(), "request finished"));

    if let Ok(value) = HeaderValue::from_str(id.as_str()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Adds browser hardening headers to every response.
pub async fn security_headers(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        CONTENT_SECURITY_POLICY,
        HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
    );
    headers.insert(REFERRER_POLICY, HeaderValue::from_static("no-referrer"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

/// Replaces any response carrying a [`PolicyError`] with its redacted rendering.
pub async fn redact_errors(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let request_id = request_id_of(&req);
    let endpoint = endpoint_of(&req);

    let mut response = next.run(req).await;
    match response.extensions_mut().remove::<Arc<PolicyError>>() {
        Some(error) => state.redactor().render(&error, &request_id, &endpoint),
        None => response,
    }
}

/// Rejects clients over their allowance before any handler runs and reports
/// the remaining allowance in `ratelimit-remaining`.
///
/// Requests without connection info share one bucket.
pub async fn rate_limit(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let client = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED), |info| info.0.ip());

    let limiter = state.limiter();
    let mut response = if limiter.try_acquire(client) {
        next.run(req).await
    } else {
        PolicyError::RateLimited.into_response()
    };

    if let Some(remaining) = limiter.remaining(client) {
        response
            .headers_mut()
            .insert(RATE_LIMIT_REMAINING_HEADER, HeaderValue::from(remaining));
    }
    response
}

/// Converts a panicking handler into a redacted 500.
pub async fn catch_panic(req: Request, next: Next) -> Response {
    match AssertUnwindSafe(next.run(req)).catch_unwind().await {
        Ok(response) => response,
        Err(payload) => PolicyError::Panic(panic_message(payload.as_ref())).into_response(),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
