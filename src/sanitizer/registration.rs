use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use super::{SanitizationError, SanitizationErrorKind, Sanitizer, ValidationResult};
use crate::{Secret, Tainted, Verified};

/// Minimum accepted password length in characters.
pub const MIN_PASSWORD_LEN: usize = 8;
/// Maximum accepted password length in characters.
pub const MAX_PASSWORD_LEN: usize = 128;
const MAX_EMAIL_LEN: usize = 254;

static USERNAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]{3,30}$").expect("static pattern compiles"));
static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$")
        .expect("static pattern compiles")
});

/// Body of `POST /register`. Unknown fields are rejected during parsing.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    /// Requested display name.
    pub username: String,
    /// Contact address, unique per user.
    pub email: String,
    /// Plaintext password, hashed before storage.
    pub password: String,
}

/// Body of `POST /login`. Unknown fields are rejected during parsing.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    /// Address the account was registered with.
    pub email: String,
    /// Plaintext password.
    pub password: String,
}

/// A registration whose fields all passed validation.
#[derive(Debug)]
pub struct Registration {
    /// Validated username.
    pub username: String,
    /// Validated, lowercased email.
    pub email: String,
    /// Plaintext password, held only until it is hashed.
    pub password: Secret<String>,
}

/// Login credentials whose shape passed validation.
#[derive(Debug)]
pub struct Credentials {
    /// Validated, lowercased email.
    pub email: String,
    /// Plaintext password, held only until it is checked.
    pub password: Secret<String>,
}

fn invalid(message: &'static str) -> SanitizationError {
    SanitizationError::new(SanitizationErrorKind::InvalidFormat, message)
}

fn check_email(raw: &str) -> Result<String, SanitizationError> {
    let email = raw.trim();
    if email.len() > MAX_EMAIL_LEN || !EMAIL.is_match(email) {
        return Err(invalid("email is not a valid address"));
    }
    Ok(email.to_ascii_lowercase())
}

fn check_password(raw: String) -> Result<Secret<String>, SanitizationError> {
    let chars = raw.chars().count();
    if !(MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&chars) {
        return Err(invalid("password must be between 8 and 128 characters"));
    }
    if raw.chars().any(char::is_control) {
        return Err(invalid("password contains control characters"));
    }
    Ok(Secret::new(raw))
}

/// Validates every field of a registration before anything is hashed or stored.
///
/// - username: 3-30 ASCII letters, digits, or underscores
/// - email: conventional `local@domain.tld` shape, at most 254 bytes, lowercased
/// - password: 8-128 characters, no control characters
#[derive(Debug, Clone, Copy, Default)]
pub struct RegistrationSanitizer;

impl Sanitizer<RegisterRequest> for RegistrationSanitizer {
    type Output = Registration;

    fn sanitize(&self, input: Tainted<RegisterRequest>) -> ValidationResult<Registration> {
        let request = input.into_inner();

        if !USERNAME.is_match(&request.username) {
            return Err(invalid(
                "username must be 3-30 letters, digits, or underscores",
            ));
        }
        let email = check_email(&request.email)?;
        let password = check_password(request.password)?;

        Ok(Verified::new_unchecked(Registration {
            username: request.username,
            email,
            password,
        }))
    }
}

/// Validates the shape of login credentials. Does not check them against the store.
#[derive(Debug, Clone, Copy, Default)]
pub struct CredentialsSanitizer;

impl Sanitizer<LoginRequest> for CredentialsSanitizer {
    type Output = Credentials;

    fn sanitize(&self, input: Tainted<LoginRequest>) -> ValidationResult<Credentials> {
        let request = input.into_inner();

        let email = check_email(&request.email)?;
        let password = check_password(request.password)?;

        Ok(Verified::new_unchecked(Credentials { email, password }))
    }
}
