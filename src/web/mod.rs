//! HTTP surface.
//!
//! The router binds each endpoint to one handler, and the handler to one
//! sanitization pipeline. Request data crosses the boundary only through the
//! [`TaintedQuery`] and [`TaintedJson`] extractors, so a handler cannot reach
//! a raw value without going through a [`Sanitizer`](crate::Sanitizer).
//!
//! | Route | Pipeline |
//! |---|---|
//! | `GET /user` | identifier → parameterized query |
//! | `GET /ping` | host → argument-vector `ping` |
//! | `GET /file` | filename → canonical path inside the upload root |
//! | `POST /calculate` | always refused |
//! | `POST /load` | structural JSON sanitizer |
//! | `POST /register` | registration → salted digest → insert |
//! | `POST /login` | credentials → digest check → signed token |
//! | `GET /encrypt` | bounded text → SHA-256 |
//!
//! Every response passes through the layers in [`middleware`].

use std::io;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{middleware as axum_middleware, Router};

use crate::config::AppConfig;
use crate::hashing::PasswordHasher;
use crate::redact::Redactor;
use crate::sanitizer::FilenameSanitizer;
use crate::store::UserStore;
use crate::token::TokenSigner;

mod extract;
mod handlers;
pub mod middleware;
mod rate_limit;

pub use extract::{TaintedJson, TaintedQuery};
pub use middleware::{RequestId, RATE_LIMIT_REMAINING_HEADER, REQUEST_ID_HEADER};
pub use rate_limit::RateLimiter;

/// Request bodies larger than this are refused before parsing.
pub const MAX_BODY_BYTES: usize = 128 * 1024;

/// Shared, read-only handler state.
#[derive(Clone)]
pub struct AppState {
    config: Arc<AppConfig>,
    store: UserStore,
    files: Arc<FilenameSanitizer>,
    tokens: Arc<TokenSigner>,
    limiter: Arc<RateLimiter>,
    redactor: Redactor,
    hasher: PasswordHasher,
}

impl AppState {
    /// Builds state from configuration and an open store.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the upload root cannot be canonicalized.
    pub fn new(config: Arc<AppConfig>, store: UserStore) -> io::Result<Self> {
        let files = FilenameSanitizer::new(config.uploads_dir())?;
        Ok(Self {
            files: Arc::new(files),
            tokens: Arc::new(TokenSigner::new(config.jwt_secret())),
            limiter: Arc::new(RateLimiter::per_minute(config.rate_limit_per_minute())),
            redactor: Redactor::new(config.environment()),
            hasher: PasswordHasher::new(),
            store,
            config,
        })
    }

    /// Service configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// User store.
    pub fn store(&self) -> &UserStore {
        &self.store
    }

    pub(crate) fn files(&self) -> &FilenameSanitizer {
        &self.files
    }

    pub(crate) fn tokens(&self) -> &TokenSigner {
        &self.tokens
    }

    pub(crate) fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub(crate) fn redactor(&self) -> &Redactor {
        &self.redactor
    }

    pub(crate) fn hasher(&self) -> &PasswordHasher {
        &self.hasher
    }
}

/// Builds the application router with all layers applied.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::config))
        .route("/login", post(handlers::login))
        .route("/user", get(handlers::user))
        .route("/ping", get(handlers::ping))
        .route("/file", get(handlers::file))
        .route("/calculate", post(handlers::calculate))
        .route("/load", post(handlers::load))
        .route("/register", post(handlers::register))
        .route("/encrypt", get(handlers::encrypt))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(axum_middleware::from_fn(middleware::catch_panic))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::redact_errors,
        ))
        .layer(axum_middleware::from_fn(middleware::security_headers))
        .layer(axum_middleware::from_fn(middleware::request_id))
        .with_state(state)
}
