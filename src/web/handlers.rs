//! Endpoint handlers. Each one runs a single pipeline:
//! extract tainted input, sanitize, call the sink, respond.

use axum::extract::{Request, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::extract::{TaintedJson, TaintedQuery};
use super::middleware::RequestId;
use super::AppState;
use crate::audit::{AuditEvent, AuditEventKind, AuditOutcome};
use crate::config::{ConfiguredSecrets, SecretName};
use crate::hashing::{sha256_hex, PasswordDigest, PasswordHasher};
use crate::process::{self, CommandSpec};
use crate::sanitizer::{
    CredentialsSanitizer, HostSanitizer, IdentifierSanitizer, JsonSanitizer, LoginRequest,
    RegisterRequest, RegistrationSanitizer, SafeObject, TextSanitizer,
};
use crate::store::UserRecord;
use crate::{
    ExpressionPolicy, PolicyError, RequestLog, SanitizationError, SanitizationErrorKind, Sanitizer,
    Secret, Tainted,
};

const DEFAULT_PING_HOST: &str = "localhost";
const DEFAULT_ENCRYPT_TEXT: &str = "secret";
const FALLBACK_DOWNLOAD_NAME: &str = "download";

type HandlerResult<T> = Result<T, PolicyError>;

pub(super) async fn index(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "message": "Hello DevSecOps!",
        "status": "running",
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.config().environment(),
    }))
}

pub(super) async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let database = if state.config().is_configured(SecretName::DbPassword) {
        "configured"
    } else {
        "not configured"
    };
    Json(json!({
        "status": "healthy",
        "database": database,
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }))
}

#[derive(Debug, Serialize)]
pub(super) struct ConfigReport {
    node_env: &'static str,
    port: u16,
    #[serde(flatten)]
    secrets: ConfiguredSecrets,
}

pub(super) async fn config(State(state): State<AppState>) -> Json<ConfigReport> {
    let config = state.config();
    Json(ConfigReport {
        node_env: config.environment().as_str(),
        port: config.port(),
        secrets: config.configured_secrets(),
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct LoginResponse {
    token: String,
    message: &'static str,
    expires_in: &'static str,
}

pub(super) async fn login(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    TaintedJson(body): TaintedJson<LoginRequest>,
) -> HandlerResult<Json<LoginResponse>> {
    let log = RequestLog::new(request_id.as_str());
    log.info(format_args!("login attempt received"));

    let credentials = CredentialsSanitizer.sanitize(body)?.into_inner();
    let found = state
        .store()
        .find_credentials_by_email(&credentials.email)
        .await?;

    let user = authenticate(state.hasher(), found, &credentials.password)
        .ok_or(PolicyError::InvalidCredentials)?;

    let token = state.tokens().sign(user.id, Utc::now())?;
    AuditEvent::new(
        request_id.as_str(),
        AuditEventKind::Authentication,
        AuditOutcome::Success,
    )
    .with_endpoint("/login")
    .with_subject_id(user.id)
    .emit();

    Ok(Json(LoginResponse {
        token,
        message: "Logged in successfully",
        expires_in: "1 hour",
    }))
}

/// Checks a password against a looked-up row.
///
/// Every path hashes the password exactly once, so unknown emails,
/// password-less rows, and wrong passwords take the same time.
fn authenticate(
    hasher: &PasswordHasher,
    found: Option<(UserRecord, Option<PasswordDigest>)>,
    password: &Secret<String>,
) -> Option<UserRecord> {
    match found {
        Some((user, Some(digest))) => hasher.verify(password, &digest).then_some(user),
        Some((_, None)) | None => {
            let _ = hasher.hash(password);
            None
        }
    }
}

pub(super) async fn user(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    mut query: TaintedQuery,
) -> HandlerResult<Json<Vec<UserRecord>>> {
    let id = IdentifierSanitizer.sanitize(query.require("id")?)?;
    let rows = state.store().find_by_id(&id).await?;

    AuditEvent::new(
        request_id.as_str(),
        AuditEventKind::ResourceAccess,
        AuditOutcome::Success,
    )
    .with_endpoint("/user")
    .with_subject_id(id.as_ref().get())
    .emit();

    Ok(Json(rows))
}

pub(super) async fn ping(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    mut query: TaintedQuery,
) -> HandlerResult<String> {
    let raw = query
        .take("host")
        .unwrap_or_else(|| Tainted::new(DEFAULT_PING_HOST.to_string()));
    let input_len = raw.len();
    let host = HostSanitizer.sanitize(raw)?;

    let spec = CommandSpec::ping(&host, state.config().ping_timeout());
    let output = process::run(&spec).await?;

    AuditEvent::new(
        request_id.as_str(),
        AuditEventKind::ProcessExecution,
        AuditOutcome::Success,
    )
    .with_endpoint("/ping")
    .with_input_len(input_len)
    .emit();

    Ok(output)
}

fn attachment_header(file_name: &str) -> HeaderValue {
    let safe: String = file_name
        .chars()
        .filter(|c| (c.is_ascii_graphic() || *c == ' ') && !matches!(c, '"' | '\\' | ';'))
        .collect();
    let safe = if safe.trim().is_empty() {
        FALLBACK_DOWNLOAD_NAME
    } else {
        safe.as_str()
    };
    HeaderValue::from_str(&format!("attachment; filename=\"{safe}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

pub(super) async fn file(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    mut query: TaintedQuery,
) -> HandlerResult<Response> {
    let path = state.files().sanitize(query.require("name")?)?;
    let bytes = tokio::fs::read(path.as_ref().path()).await?;

    AuditEvent::new(
        request_id.as_str(),
        AuditEventKind::ResourceAccess,
        AuditOutcome::Success,
    )
    .with_endpoint("/file")
    .emit();

    Ok((
        [
            (CONTENT_TYPE, HeaderValue::from_static("application/octet-stream")),
            (CONTENT_DISPOSITION, attachment_header(path.as_ref().file_name())),
        ],
        bytes,
    )
        .into_response())
}

/// The body is never read.
pub(super) async fn calculate(request: Request) -> HandlerResult<Response> {
    let never = ExpressionPolicy.evaluate(Tainted::new(request.into_body()))?;
    match never {}
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct LoadRequest {
    data: String,
}

pub(super) async fn load(TaintedJson(body): TaintedJson<LoadRequest>) -> HandlerResult<Json<SafeObject>> {
    let data = body.map(|request| request.data);
    let object = JsonSanitizer.sanitize(data)?;
    Ok(Json(object.into_inner()))
}

pub(super) async fn register(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    TaintedJson(body): TaintedJson<RegisterRequest>,
) -> HandlerResult<Response> {
    let registration = RegistrationSanitizer.sanitize(body)?;
    let digest = state.hasher().hash(&registration.as_ref().password);

    let user = match state.store().insert(registration, digest).await {
        Ok(user) => user,
        Err(err) if err.is_unique_violation() => {
            return Err(SanitizationError::new(
                SanitizationErrorKind::InvalidFormat,
                "email is already registered",
            )
            .into())
        }
        Err(err) => return Err(err.into()),
    };

    AuditEvent::new(
        request_id.as_str(),
        AuditEventKind::StateChange,
        AuditOutcome::Success,
    )
    .with_endpoint("/register")
    .with_subject_id(user.id)
    .emit();

    let body = json!({ "message": "User registered successfully", "user": user });
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

pub(super) async fn encrypt(mut query: TaintedQuery) -> HandlerResult<Json<serde_json::Value>> {
    let text = query
        .take("text")
        .unwrap_or_else(|| Tainted::new(DEFAULT_ENCRYPT_TEXT.to_string()));
    let text = TextSanitizer::default().sanitize(text)?;

    Ok(Json(json!({
        "algorithm": "sha256",
        "encrypted": sha256_hex(text.as_ref()),
    })))
}
