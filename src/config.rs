//! Process configuration, read once from the environment at startup.
//!
//! [`AppConfig`] is immutable after construction and shared behind an `Arc`.
//! Nothing reads the environment after startup. Secret values are held in
//! [`Secret`] and never appear in `Debug` output, logs, or responses.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;

use crate::Secret;

/// Errors raised while building [`AppConfig`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// One or more required secrets are unset or empty. Holds names only.
    #[error("missing required environment variables: {}", .0.join(", "))]
    MissingSecrets(Vec<&'static str>),
    /// A non-secret variable is set but does not parse.
    #[error("invalid value for {name}: {reason}")]
    Invalid {
        /// Variable name.
        name: &'static str,
        /// What was expected.
        reason: &'static str,
    },
}

/// The secrets the service knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecretName {
    /// `API_KEY`
    ApiKey,
    /// `DB_PASSWORD`
    DbPassword,
    /// `JWT_SECRET`
    JwtSecret,
    /// `STRIPE_SECRET_KEY`
    StripeSecretKey,
}

impl SecretName {
    /// Secrets without which the process refuses to start, in reporting order.
    pub const REQUIRED: [SecretName; 3] = [Self::ApiKey, Self::JwtSecret, Self::DbPassword];

    /// Environment variable holding the value.
    pub fn env_var(self) -> &'static str {
        match self {
            Self::ApiKey => "API_KEY",
            Self::DbPassword => "DB_PASSWORD",
            Self::JwtSecret => "JWT_SECRET",
            Self::StripeSecretKey => "STRIPE_SECRET_KEY",
        }
    }

    /// Whether startup fails without this secret.
    pub fn is_required(self) -> bool {
        Self::REQUIRED.contains(&self)
    }
}

impl fmt::Display for SecretName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.env_var())
    }
}

/// Deployment mode from `NODE_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Verbose errors, human-readable logs. Only an explicit
    /// `NODE_ENV=development` selects it.
    Development,
    /// Generic errors, JSON logs. Unset, empty, and unrecognized modes land here.
    Production,
    /// Test runs.
    Test,
}

impl Environment {
    fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("development") => Self::Development,
            Some("test") => Self::Test,
            _ => Self::Production,
        }
    }

    /// Lowercase mode name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Test => "test",
        }
    }

    /// `true` only in development mode.
    pub fn is_development(self) -> bool {
        self == Self::Development
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Database connection settings.
///
/// Host, user, name, and port describe the deployment's database server and
/// are reported but not dialed; the demo store is SQLite at `path`, or in
/// memory when `path` is unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSettings {
    /// `DB_HOST`
    pub host: String,
    /// `DB_USER`
    pub user: String,
    /// `DB_NAME`
    pub name: String,
    /// `DB_PORT`
    pub port: u16,
    /// `DATABASE_PATH`
    pub path: Option<PathBuf>,
}

struct Secrets {
    api_key: Secret<String>,
    db_password: Secret<String>,
    jwt_secret: Secret<String>,
    stripe_secret_key: Option<Secret<String>>,
}

/// Which secrets are present, as reported by `GET /config`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConfiguredSecrets {
    /// `API_KEY` is set.
    pub api_key_configured: bool,
    /// `DB_PASSWORD` is set.
    pub database_configured: bool,
    /// `JWT_SECRET` is set.
    pub jwt_configured: bool,
    /// `STRIPE_SECRET_KEY` is set.
    pub stripe_configured: bool,
}

/// Immutable service configuration.
pub struct AppConfig {
    environment: Environment,
    bind_addr: IpAddr,
    port: u16,
    uploads_dir: PathBuf,
    ping_timeout: Duration,
    rate_limit_per_minute: u32,
    database: DatabaseSettings,
    secrets: Secrets,
}

impl AppConfig {
    /// Reads the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingSecrets`] naming every absent required
    /// secret, or [`ConfigError::Invalid`] for a malformed numeric or address
    /// value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    ///
    /// Empty values count as unset.
    ///
    /// # Errors
    ///
    /// Same as [`AppConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.is_empty());
        let secret = |name: SecretName| get(name.env_var()).map(Secret::new);

        let missing: Vec<&'static str> = SecretName::REQUIRED
            .iter()
            .filter(|name| get(name.env_var()).is_none())
            .map(|name| name.env_var())
            .collect();

        let (Some(api_key), Some(db_password), Some(jwt_secret)) = (
            secret(SecretName::ApiKey),
            secret(SecretName::DbPassword),
            secret(SecretName::JwtSecret),
        ) else {
            return Err(ConfigError::MissingSecrets(missing));
        };

        let bind_addr = match get("BIND_ADDR") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                name: "BIND_ADDR",
                reason: "expected an IP address",
            })?,
            None => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        };

        Ok(Self {
            environment: Environment::parse(get("NODE_ENV").as_deref()),
            bind_addr,
            port: parse_or(&get, "PORT", 3000)?,
            uploads_dir: get("UPLOADS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("uploads")),
            ping_timeout: Duration::from_secs(parse_or(&get, "PING_TIMEOUT_SECS", 5)?),
            rate_limit_per_minute: parse_or(&get, "RATE_LIMIT_PER_MINUTE", 100)?,
            database: DatabaseSettings {
                host: get("DB_HOST").unwrap_or_else(|| "localhost".to_string()),
                user: get("DB_USER").unwrap_or_else(|| "root".to_string()),
                name: get("DB_NAME").unwrap_or_else(|| "workshop".to_string()),
                port: parse_or(&get, "DB_PORT", 3306)?,
                path: get("DATABASE_PATH").map(PathBuf::from),
            },
            secrets: Secrets {
                api_key,
                db_password,
                jwt_secret,
                stripe_secret_key: secret(SecretName::StripeSecretKey),
            },
        })
    }

    /// Deployment mode.
    pub fn environment(&self) -> Environment {
        self.environment
    }

    /// Listening port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Listening address.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }

    /// Root of the file-download sandbox.
    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    /// Wall-clock bound for `ping`.
    pub fn ping_timeout(&self) -> Duration {
        self.ping_timeout
    }

    /// Requests allowed per client per minute. Zero disables limiting.
    pub fn rate_limit_per_minute(&self) -> u32 {
        self.rate_limit_per_minute
    }

    /// Database settings.
    pub fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    /// Token signing key.
    pub fn jwt_secret(&self) -> &Secret<String> {
        &self.secrets.jwt_secret
    }

    /// Whether a secret holds a value.
    pub fn is_configured(&self, name: SecretName) -> bool {
        let secret = match name {
            SecretName::ApiKey => Some(&self.secrets.api_key),
            SecretName::DbPassword => Some(&self.secrets.db_password),
            SecretName::JwtSecret => Some(&self.secrets.jwt_secret),
            SecretName::StripeSecretKey => self.secrets.stripe_secret_key.as_ref(),
        };
        secret.is_some_and(|s| !s.expose_secret().is_empty())
    }

    /// Presence flags for every known secret. Never carries a value.
    pub fn configured_secrets(&self) -> ConfiguredSecrets {
        ConfiguredSecrets {
            api_key_configured: self.is_configured(SecretName::ApiKey),
            database_configured: self.is_configured(SecretName::DbPassword),
            jwt_configured: self.is_configured(SecretName::JwtSecret),
            stripe_configured: self.is_configured(SecretName::StripeSecretKey),
        }
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("environment", &self.environment)
            .field("socket_addr", &self.socket_addr())
            .field("uploads_dir", &self.uploads_dir)
            .field("ping_timeout", &self.ping_timeout)
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .field("database", &self.database)
            .field("secrets", &self.configured_secrets())
            .finish()
    }
}

fn parse_or<T, G>(get: &G, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            reason: "expected a non-negative integer",
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("API_KEY", "api-key-value"),
        ("DB_PASSWORD", "db-password-value"),
        ("JWT_SECRET", "jwt-secret-value"),
    ];

    #[test]
    fn defaults_apply() {
        let config = AppConfig::from_lookup(lookup(&REQUIRED)).unwrap();

        assert_eq!(config.environment(), Environment::Production);
        assert_eq!(config.port(), 3000);
        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:3000");
        assert_eq!(config.uploads_dir(), Path::new("uploads"));
        assert_eq!(config.ping_timeout(), Duration::from_secs(5));
        assert_eq!(config.rate_limit_per_minute(), 100);
        assert_eq!(config.database().host, "localhost");
        assert_eq!(config.database().user, "root");
        assert_eq!(config.database().name, "workshop");
        assert_eq!(config.database().port, 3306);
        assert!(config.database().path.is_none());
    }

    #[test]
    fn missing_secrets_are_all_named() {
        let err = AppConfig::from_lookup(lookup(&[("DB_PASSWORD", "x")])).unwrap_err();
        assert_eq!(err, ConfigError::MissingSecrets(vec!["API_KEY", "JWT_SECRET"]));
        assert_eq!(
            err.to_string(),
            "missing required environment variables: API_KEY, JWT_SECRET"
        );
    }

    #[test]
    fn empty_value_counts_as_missing() {
        let err = AppConfig::from_lookup(lookup(&[
            ("API_KEY", ""),
            ("DB_PASSWORD", "x"),
            ("JWT_SECRET", "y"),
        ]))
        .unwrap_err();
        assert_eq!(err, ConfigError::MissingSecrets(vec!["API_KEY"]));
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("PORT", "eighty"));
        let err = AppConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PORT", .. }));

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("BIND_ADDR", "not-an-ip"));
        assert!(AppConfig::from_lookup(lookup(&pairs)).is_err());
    }

    #[test]
    fn environment_modes() {
        assert_eq!(Environment::parse(Some("production")), Environment::Production);
        assert_eq!(Environment::parse(Some("test")), Environment::Test);
        assert_eq!(Environment::parse(Some("staging")), Environment::Production);
        assert_eq!(Environment::parse(Some("development")), Environment::Development);
        assert!(Environment::Development.is_development());
    }

    #[test]
    fn verbose_errors_need_explicit_development() {
        assert_eq!(Environment::parse(None), Environment::Production);
        assert_eq!(Environment::parse(Some("")), Environment::Production);
        assert_eq!(Environment::parse(Some("  ")), Environment::Production);
        assert_eq!(Environment::parse(Some("Development")), Environment::Production);
        assert!(!Environment::parse(None).is_development());

        let config = AppConfig::from_lookup(lookup(&REQUIRED)).unwrap();
        assert!(!config.environment().is_development());
    }

    #[test]
    fn configured_flags_and_debug_never_leak_values() {
        let config = AppConfig::from_lookup(lookup(&REQUIRED)).unwrap();
        let flags = config.configured_secrets();

        assert!(flags.api_key_configured);
        assert!(flags.database_configured);
        assert!(flags.jwt_configured);
        assert!(!flags.stripe_configured);

        let debug = format!("{:?}", config);
        for (_, value) in REQUIRED {
            assert!(!debug.contains(value));
        }
        assert_eq!(format!("{:?}", config.jwt_secret()), "[REDACTED]");
    }

    #[test]
    fn required_names() {
        assert!(SecretName::JwtSecret.is_required());
        assert!(!SecretName::StripeSecretKey.is_required());
        assert_eq!(SecretName::DbPassword.to_string(), "DB_PASSWORD");
    }
}
