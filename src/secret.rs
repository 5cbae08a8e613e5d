use std::fmt;

/// A configuration value that must never reach a response body or a log line.
///
/// API keys, the database password, and the token signing key are loaded once
/// at startup into `Secret<String>`. Plaintext passwords from request bodies
/// are moved into a `Secret<String>` as soon as they are validated, so they
/// cannot be formatted by accident on the way to the hasher.
///
/// # Security Properties
///
/// - No `Clone`, `Copy`, `Default`, `Deref`, `AsRef`, or `Borrow`
/// - `Debug` and `Display` print `[REDACTED]` without type information
/// - Reading the value requires [`expose_secret`](Self::expose_secret)
///
/// # Examples
///
/// ```
/// use hardened_demo::Secret;
///
/// let key = Secret::new("sk-live-1234".to_string());
/// assert_eq!(format!("{:?}", key), "[REDACTED]");
/// assert_eq!(format!("{}", key), "[REDACTED]");
/// assert_eq!(key.expose_secret(), "sk-live-1234");
/// ```
// Do not derive Clone or Default: copies of secret material must be explicit.
pub struct Secret<T> {
    // Must stay private (CWE-532).
    inner: T,
}

impl<T> Secret<T> {
    /// Wraps a sensitive value.
    pub fn new(value: T) -> Self {
        Self { inner: value }
    }

    /// Returns the secret value.
    ///
    /// The caller is responsible for not logging or serializing the result.
    pub fn expose_secret(&self) -> &T {
        &self.inner
    }
}

impl<T> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl<T> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}
