use std::fmt;

use crate::config::ConfigError;
use crate::process::ExecError;
use crate::store::StoreError;
use crate::token::TokenError;
use crate::{SanitizationError, SanitizationErrorKind};

/// Every failure a request can end in.
///
/// Client-caused variants carry a terse, caller-safe message. Infrastructure
/// variants carry their source for the server-side log only; the
/// [`Redactor`](crate::redact::Redactor) never puts that source in a response
/// body outside development mode.
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    /// A sanitizer rejected request input.
    #[error(transparent)]
    Rejected(#[from] SanitizationError),
    /// The endpoint refuses the operation for every input.
    #[error("{operation} is not supported")]
    Unsupported {
        /// Operation name, for logs.
        operation: &'static str,
    },
    /// Email and password did not match a stored user.
    #[error("invalid credentials")]
    InvalidCredentials,
    /// The client exceeded its request allowance.
    #[error("rate limit exceeded")]
    RateLimited,
    /// The request body is over the configured size limit.
    #[error("request body exceeds the size limit")]
    PayloadTooLarge,
    /// The user store failed.
    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
    /// An external program failed.
    #[error("execution failure: {0}")]
    Execution(#[from] ExecError),
    /// A token could not be issued.
    #[error("token failure: {0}")]
    Token(#[from] TokenError),
    /// Required configuration is absent or malformed.
    #[error("configuration failure: {0}")]
    Configuration(#[from] ConfigError),
    /// A filesystem operation failed after validation.
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
    /// A handler panicked; the payload text is kept for the log.
    #[error("handler panicked: {0}")]
    Panic(String),
}

impl PolicyError {
    /// Classifies the error for status mapping and the response `code` field.
    pub fn kind(&self) -> PolicyErrorKind {
        match self {
            Self::Rejected(err) => match err.kind() {
                SanitizationErrorKind::InvalidFormat => PolicyErrorKind::InvalidFormat,
                SanitizationErrorKind::InvalidHost => PolicyErrorKind::InvalidHost,
                SanitizationErrorKind::PathEscape => PolicyErrorKind::PathEscape,
                SanitizationErrorKind::InvalidJson => PolicyErrorKind::InvalidJson,
            },
            Self::Unsupported { .. } => PolicyErrorKind::UnsupportedOperation,
            Self::InvalidCredentials => PolicyErrorKind::InvalidCredentials,
            Self::RateLimited => PolicyErrorKind::RateLimited,
            Self::PayloadTooLarge => PolicyErrorKind::PayloadTooLarge,
            Self::Storage(_) => PolicyErrorKind::StorageError,
            Self::Execution(_) => PolicyErrorKind::ExecutionFailed,
            Self::Configuration(_) => PolicyErrorKind::ConfigurationMissing,
            Self::Token(_) | Self::Io(_) | Self::Panic(_) => PolicyErrorKind::Internal,
        }
    }

    /// The message a caller may see, or `None` for infrastructure failures.
    pub fn public_message(&self) -> Option<&str> {
        match self {
            Self::Rejected(err) => Some(err.message()),
            Self::Unsupported { .. } => Some("operation not supported"),
            Self::InvalidCredentials => Some("invalid email or password"),
            Self::RateLimited => Some("too many requests"),
            Self::PayloadTooLarge => Some("request body is too large"),
            _ => None,
        }
    }

    /// Builds the rejection for a required query parameter that was not sent.
    pub(crate) fn missing_parameter(name: &'static str) -> Self {
        Self::Rejected(SanitizationError::new(
            SanitizationErrorKind::InvalidFormat,
            format!("missing parameter `{name}`"),
        ))
    }
}

/// Reason codes surfaced in response bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyErrorKind {
    /// Malformed identifier or form field.
    InvalidFormat,
    /// Not a hostname or IP literal.
    InvalidHost,
    /// File outside the upload root, or not there at all.
    PathEscape,
    /// Unacceptable JSON payload.
    InvalidJson,
    /// The endpoint never performs this operation.
    UnsupportedOperation,
    /// Bad login.
    InvalidCredentials,
    /// Too many requests from one client.
    RateLimited,
    /// Request body over the size limit.
    PayloadTooLarge,
    /// Database failure.
    StorageError,
    /// Subprocess failure or timeout.
    ExecutionFailed,
    /// A required secret is absent. Fatal at startup.
    ConfigurationMissing,
    /// Any other server-side failure.
    Internal,
}

impl PolicyErrorKind {
    /// Stable machine-readable code.
    pub fn code(self) -> &'static str {
        match self {
            Self::InvalidFormat => "InvalidFormat",
            Self::InvalidHost => "InvalidHost",
            Self::PathEscape => "PathEscape",
            Self::InvalidJson => "InvalidJson",
            Self::UnsupportedOperation => "UnsupportedOperation",
            Self::InvalidCredentials => "InvalidCredentials",
            Self::RateLimited => "RateLimited",
            Self::PayloadTooLarge => "PayloadTooLarge",
            Self::StorageError => "StorageError",
            Self::ExecutionFailed => "ExecutionFailed",
            Self::ConfigurationMissing => "ConfigurationMissing",
            Self::Internal => "Internal",
        }
    }

    /// HTTP status for this kind.
    pub fn status_code(self) -> u16 {
        match self {
            Self::InvalidFormat
            | Self::InvalidHost
            | Self::PathEscape
            | Self::InvalidJson
            | Self::UnsupportedOperation => 400,
            Self::InvalidCredentials => 401,
            Self::RateLimited => 429,
            Self::PayloadTooLarge => 413,
            Self::StorageError
            | Self::ExecutionFailed
            | Self::ConfigurationMissing
            | Self::Internal => 500,
        }
    }

    /// `true` when the caller caused the failure.
    pub fn is_client_error(self) -> bool {
        self.status_code() < 500
    }
}

impl fmt::Display for PolicyErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
