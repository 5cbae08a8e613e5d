use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use super::{SanitizationError, SanitizationErrorKind, Sanitizer, ValidationResult};
use crate::{Tainted, Verified};

// ASCII digits only: `\d` would also match other Unicode decimal digits.
static INTEGER_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?[0-9]+$").expect("static pattern compiles"));

/// A row identifier that passed [`IdentifierSanitizer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UserId(i64);

impl UserId {
    /// Returns the numeric identifier.
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Accepts optionally signed integer literals and nothing else.
///
/// There is no trimming: `" 1"` and `"1 "` are rejected just like
/// `"1 OR 1=1"`. Literals that do not fit in an `i64` are rejected too.
///
/// # Examples
///
/// ```
/// use hardened_demo::{Sanitizer, Tainted};
/// use hardened_demo::sanitizer::IdentifierSanitizer;
///
/// assert!(IdentifierSanitizer.sanitize(Tainted::new("-17".to_string())).is_ok());
/// assert!(IdentifierSanitizer.sanitize(Tainted::new("1 OR 1=1".to_string())).is_err());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentifierSanitizer;

impl Sanitizer<String> for IdentifierSanitizer {
    type Output = UserId;

    fn sanitize(&self, input: Tainted<String>) -> ValidationResult<UserId> {
        let raw = input.into_inner();

        if !INTEGER_LITERAL.is_match(&raw) {
            return Err(SanitizationError::new(
                SanitizationErrorKind::InvalidFormat,
                "id must be an integer",
            ));
        }

        let value = raw.parse::<i64>().map_err(|_| {
            SanitizationError::new(SanitizationErrorKind::InvalidFormat, "id is out of range")
        })?;

        Ok(Verified::new_unchecked(UserId(value)))
    }
}
