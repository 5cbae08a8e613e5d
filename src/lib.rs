//! Hardened workshop service: request-sanitization policies behind a small
//! HTTP API.
//!
//! Every class of untrusted input is bound to one policy that neutralizes one
//! vulnerability class:
//! - **Taint tracking**: request data enters as [`Tainted<T>`] and only a
//!   [`Sanitizer`] can turn it into a [`Verified<T>`]
//! - **Sinks take verified values**: the user store binds parameters, the
//!   process invoker builds argument vectors, the file endpoint reads
//!   canonical paths
//! - **Secrets stay secret**: [`Secret<T>`] redacts itself in logs and the
//!   [`redact::Redactor`] keeps internal detail out of responses
//!
//! # Core Types
//!
//! - [`Tainted<T>`]: untrusted input awaiting validation
//! - [`Verified<T>`]: input that passed a policy
//! - [`Sanitizer`]: the policy trait; implementations live in [`sanitizer`]
//! - [`Secret<T>`]: configuration values that must never be printed
//! - [`PolicyError`]: every way a request can fail
//!
//! # Examples
//!
//! ```
//! use hardened_demo::{Sanitizer, SanitizationErrorKind, Secret, Tainted};
//! use hardened_demo::sanitizer::HostSanitizer;
//!
//! // Secrets are redacted
//! let key = Secret::new("sk-live-1234".to_string());
//! assert_eq!(format!("{:?}", key), "[REDACTED]");
//!
//! // Shell metacharacters never reach a process
//! let err = HostSanitizer
//!     .sanitize(Tainted::new("localhost; rm -rf /".to_string()))
//!     .unwrap_err();
//! assert_eq!(err.kind(), SanitizationErrorKind::InvalidHost);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod audit;
pub mod config;
mod error;
pub mod hashing;
mod logging;
mod policy;
pub mod process;
pub mod redact;
pub mod sanitizer;
mod secret;
pub mod store;
mod tainted;
pub mod token;
mod verified;
pub mod web;

pub use error::{PolicyError, PolicyErrorKind};
pub use logging::{init_tracing, RequestLog};
pub use policy::ExpressionPolicy;
pub use sanitizer::{SanitizationError, SanitizationErrorKind, Sanitizer, ValidationResult};
pub use secret::Secret;
pub use tainted::Tainted;
pub use verified::Verified;
