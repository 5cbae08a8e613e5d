use super::{SanitizationError, SanitizationErrorKind, Sanitizer, ValidationResult};
use crate::{Tainted, Verified};

/// Default cap for free text, in bytes.
pub const MAX_TEXT_BYTES: usize = 4096;

/// Bounds free text headed for a digest.
///
/// Hashing accepts any bytes, so the only check is length.
#[derive(Debug, Clone, Copy)]
pub struct TextSanitizer {
    max_bytes: usize,
}

impl TextSanitizer {
    /// Creates a sanitizer accepting at most `max_bytes`.
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }
}

impl Default for TextSanitizer {
    fn default() -> Self {
        Self::new(MAX_TEXT_BYTES)
    }
}

impl Sanitizer<String> for TextSanitizer {
    type Output = String;

    fn sanitize(&self, input: Tainted<String>) -> ValidationResult<String> {
        if input.len() > self.max_bytes {
            return Err(SanitizationError::new(
                SanitizationErrorKind::InvalidFormat,
                "text is too long",
            ));
        }
        Ok(Verified::new_unchecked(input.into_inner()))
    }
}
