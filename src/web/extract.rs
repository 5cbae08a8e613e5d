//! Extractors that introduce taint at the HTTP boundary.
//!
//! Handlers never see raw query values or body fields: everything arrives
//! wrapped in [`Tainted`] and must pass a sanitizer before use.

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::request::Parts;
use axum::http::StatusCode;
use serde::de::DeserializeOwned;

use crate::{PolicyError, SanitizationError, SanitizationErrorKind, Tainted};

fn malformed(message: &'static str) -> PolicyError {
    SanitizationError::new(SanitizationErrorKind::InvalidFormat, message).into()
}

/// All query parameters, each tainted.
///
/// A repeated parameter keeps its last value.
#[derive(Debug, Default)]
pub struct TaintedQuery {
    params: HashMap<String, Tainted<String>>,
}

impl TaintedQuery {
    /// Removes and returns a parameter, if present.
    pub fn take(&mut self, name: &str) -> Option<Tainted<String>> {
        self.params.remove(name)
    }

    /// Removes and returns a parameter that the endpoint cannot do without.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidFormat` rejection naming the parameter.
    pub fn require(&mut self, name: &'static str) -> Result<Tainted<String>, PolicyError> {
        self.take(name)
            .ok_or_else(|| PolicyError::missing_parameter(name))
    }
}

impl<S> FromRequestParts<S> for TaintedQuery
where
    S: Send + Sync,
{
    type Rejection = PolicyError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Query(raw) = Query::<Vec<(String, String)>>::try_from_uri(&parts.uri)
            .map_err(|_| malformed("malformed query string"))?;

        Ok(Self {
            params: raw
                .into_iter()
                .map(|(name, value)| (name, Tainted::new(value)))
                .collect(),
        })
    }
}

/// A JSON body deserialized into a closed request struct, still tainted.
///
/// The content type is not checked. A body over the router's size limit is
/// `PayloadTooLarge`. A body that is not JSON, has the wrong shape, or carries
/// unknown fields is rejected as `InvalidFormat`.
#[derive(Debug)]
pub struct TaintedJson<T>(pub Tainted<T>);

impl<S, T> FromRequest<S> for TaintedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = PolicyError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| match rejection.status() {
                StatusCode::PAYLOAD_TOO_LARGE => PolicyError::PayloadTooLarge,
                _ => malformed("request body could not be read"),
            })?;

        let value = serde_json::from_slice::<T>(&body)
            .map_err(|_| malformed("request body does not match the expected fields"))?;

        Ok(Self(Tainted::new(value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PolicyErrorKind;
    use axum::http::Request as HttpRequest;
    use serde::Deserialize;

    async fn query(uri: &str) -> Result<TaintedQuery, PolicyError> {
        let (mut parts, _) = HttpRequest::get(uri).body(()).unwrap().into_parts();
        TaintedQuery::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn query_values_are_tainted() {
        let mut q = query("/user?id=1%20OR%201%3D1&x=2").await.unwrap();

        let id = q.require("id").unwrap();
        assert_eq!(id.len(), "1 OR 1=1".len());
        assert!(q.take("id").is_none());
        assert!(q.take("x").is_some());
    }

    #[tokio::test]
    async fn missing_required_parameter() {
        let mut q = query("/user").await.unwrap();
        let err = q.require("id").unwrap_err();
        assert_eq!(err.kind(), PolicyErrorKind::InvalidFormat);
    }

    #[derive(Debug, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct Body {
        #[allow(dead_code)]
        data: String,
    }

    async fn json(body: &'static str) -> Result<TaintedJson<Body>, PolicyError> {
        let req = HttpRequest::post("/load").body(axum::body::Body::from(body)).unwrap();
        TaintedJson::<Body>::from_request(req, &()).await
    }

    #[tokio::test]
    async fn oversized_body_is_payload_too_large() {
        use axum::extract::DefaultBodyLimit;
        use axum::routing::post;
        use axum::Router;
        use std::sync::Arc;
        use tower::ServiceExt;

        let app = Router::new()
            .route("/load", post(|TaintedJson(_): TaintedJson<Body>| async { "ok" }))
            .layer(DefaultBodyLimit::max(16));

        let response = app
            .oneshot(
                HttpRequest::post("/load")
                    .body(axum::body::Body::from(r#"{"data":"well over sixteen bytes"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let err = response.extensions().get::<Arc<PolicyError>>().unwrap();
        assert_eq!(err.kind(), PolicyErrorKind::PayloadTooLarge);
    }

    #[tokio::test]
    async fn json_body_shape_is_enforced() {
        assert!(json(r#"{"data":"x"}"#).await.is_ok());

        for bad in ["", "not json", r#"{"data":1}"#, r#"{"data":"x","extra":true}"#] {
            let err = json(bad).await.unwrap_err();
            assert_eq!(err.kind(), PolicyErrorKind::InvalidFormat, "{bad}");
        }
    }
}
