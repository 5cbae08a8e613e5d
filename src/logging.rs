use std::fmt;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt as tfmt, EnvFilter};

use crate::config::Environment;

const DEFAULT_FILTER: &str = "info";

/// Installs the global subscriber.
///
/// `RUST_LOG` overrides the default `info` filter. Production writes JSON
/// lines, other modes write human-readable lines; both go to stderr. Calling
/// this twice is harmless: the second install is ignored.
pub fn init_tracing(environment: Environment) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let installed = match environment {
        Environment::Production => tracing_subscriber::registry()
            .with(env_filter)
            .with(tfmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        Environment::Development | Environment::Test => tracing_subscriber::registry()
            .with(env_filter)
            .with(tfmt::layer().with_writer(std::io::stderr))
            .try_init(),
    };

    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// A request-scoped logger.
///
/// Every line carries the request id, so a caller-visible `x-request-id`
/// can be matched to server-side detail. [`Secret`](crate::Secret) and
/// [`Tainted`](crate::Tainted) values format as placeholders, so passing
/// them here cannot leak their contents.
#[derive(Debug, Clone, Copy)]
pub struct RequestLog<'a> {
    request_id: &'a str,
}

impl<'a> RequestLog<'a> {
    /// Creates a logger for one request.
    pub fn new(request_id: &'a str) -> Self {
        Self { request_id }
    }

    /// Returns the request ID associated with this logger.
    pub fn request_id(&self) -> &str {
        self.request_id
    }

    /// Logs an info-level message with request ID.
    ///
    /// ```no_run
    /// # use hardened_demo::{RequestLog, Secret};
    /// let log = RequestLog::new("req-1");
    /// let key = Secret::new("password".to_string());
    /// log.info(format_args!("using key {:?}", key)); // using key [REDACTED]
    /// ```
    pub fn info(&self, args: fmt::Arguments<'_>) {
        tracing::info!(request_id = %self.request_id, "{}", args);
    }

    /// Logs a warning-level message with request ID.
    pub fn warn(&self, args: fmt::Arguments<'_>) {
        tracing::warn!(request_id = %self.request_id, "{}", args);
    }

    /// Logs an error-level message with request ID.
    pub fn error(&self, args: fmt::Arguments<'_>) {
        tracing::error!(request_id = %self.request_id, "{}", args);
    }

    /// Logs a debug-level message with request ID.
    pub fn debug(&self, args: fmt::Arguments<'_>) {
        tracing::debug!(request_id = %self.request_id, "{}", args);
    }
}
