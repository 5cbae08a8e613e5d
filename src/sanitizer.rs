//! Input-validation policies.
//!
//! Each policy is a [`Sanitizer`] that turns one class of [`Tainted`] request
//! input into a [`Verified`] value, or rejects it with a [`SanitizationError`]
//! whose kind names the vulnerability class it defends against.
//!
//! | Sanitizer | Input | Output | Rejection |
//! |---|---|---|---|
//! | [`IdentifierSanitizer`] | `?id=` | [`UserId`] | `InvalidFormat` |
//! | [`HostSanitizer`] | `?host=` | [`Host`] | `InvalidHost` |
//! | [`FilenameSanitizer`] | `?name=` | [`UploadPath`] | `PathEscape` |
//! | [`JsonSanitizer`] | `/load` data | [`SafeObject`] | `InvalidJson` |
//! | [`RegistrationSanitizer`] | `/register` body | [`Registration`] | `InvalidFormat` |
//! | [`CredentialsSanitizer`] | `/login` body | [`Credentials`] | `InvalidFormat` |
//! | [`TextSanitizer`] | `?text=` | `String` | `InvalidFormat` |
//!
//! A value either passes a policy completely or is rejected before the next
//! pipeline stage runs; there are no partially validated values.

use std::fmt;

use crate::{Tainted, Verified};

mod filename;
mod host;
mod identifier;
mod json;
mod registration;
mod text;

pub use filename::{FilenameSanitizer, UploadPath};
pub use host::{Host, HostSanitizer};
pub use identifier::{IdentifierSanitizer, UserId};
pub use json::{JsonSanitizer, SafeObject, RESERVED_KEYS};
pub use registration::{
    Credentials, CredentialsSanitizer, LoginRequest, RegisterRequest, Registration,
    RegistrationSanitizer, MAX_PASSWORD_LEN, MIN_PASSWORD_LEN,
};
pub use text::{TextSanitizer, MAX_TEXT_BYTES};

/// Outcome of a policy check: `Ok` holds the accepted value, `Err` the reason code.
pub type ValidationResult<T> = Result<Verified<T>, SanitizationError>;

/// Error returned when a policy rejects its input.
///
/// The message is terse and never echoes the rejected input, so it is safe
/// to return to the caller verbatim.
///
/// # Examples
///
/// ```
/// use hardened_demo::{SanitizationError, SanitizationErrorKind};
///
/// let error = SanitizationError::new(SanitizationErrorKind::InvalidHost, "not a hostname");
/// assert_eq!(error.kind(), SanitizationErrorKind::InvalidHost);
/// assert_eq!(error.kind().code(), "InvalidHost");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizationError {
    kind: SanitizationErrorKind,
    message: String,
}

impl SanitizationError {
    /// Creates a new sanitization error.
    pub fn new(kind: SanitizationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Returns the error kind.
    pub fn kind(&self) -> SanitizationErrorKind {
        self.kind
    }

    /// Returns the caller-safe message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for SanitizationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for SanitizationError {}

/// Vulnerability-class reason codes for rejected input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanitizationErrorKind {
    /// Input does not match the expected format (identifiers, form fields).
    InvalidFormat,
    /// Input is not a hostname or IP literal.
    InvalidHost,
    /// Filename resolves outside the upload root or does not exist.
    PathEscape,
    /// Payload is not acceptable JSON.
    InvalidJson,
}

impl SanitizationErrorKind {
    /// Stable machine-readable code used in response bodies.
    pub fn code(self) -> &'static str {
        match self {
            Self::InvalidFormat => "InvalidFormat",
            Self::InvalidHost => "InvalidHost",
            Self::PathEscape => "PathEscape",
            Self::InvalidJson => "InvalidJson",
        }
    }
}

impl fmt::Display for SanitizationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFormat => write!(f, "invalid format"),
            Self::InvalidHost => write!(f, "invalid host"),
            Self::PathEscape => write!(f, "path escape"),
            Self::InvalidJson => write!(f, "invalid json"),
        }
    }
}

/// Promotes tainted input to verified output according to one policy.
///
/// # Invariants
///
/// Implementations must:
/// - run every check before calling `Verified::new_unchecked`
/// - return `Err` for anything they cannot prove safe (fail closed)
/// - keep the rejected input out of the error message
pub trait Sanitizer<T> {
    /// The verified type produced on success.
    type Output;

    /// Validates `input`.
    ///
    /// # Errors
    ///
    /// Returns [`SanitizationError`] when the input violates the policy.
    fn sanitize(&self, input: Tainted<T>) -> ValidationResult<Self::Output>;
}
