use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use super::{SanitizationError, SanitizationErrorKind, Sanitizer, ValidationResult};
use crate::{Tainted, Verified};

/// Top-level keys that reject the whole payload.
pub const RESERVED_KEYS: [&str; 3] = ["__proto__", "constructor", "prototype"];

const MARKER: &str = "__";
const MAX_PAYLOAD_BYTES: usize = 64 * 1024;

/// A freshly built JSON object holding only keys that cannot alter prototype
/// linkage in a consumer that merges it into other objects.
///
/// Keys containing `__` are absent at every depth.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SafeObject(BTreeMap<String, Value>);

impl SafeObject {
    /// Looks up a top-level value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Number of top-level keys.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no keys survived sanitization.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over top-level keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// Parses untrusted JSON text into a [`SafeObject`].
///
/// 1. Parse with `serde_json`; malformed text or a non-object top level is
///    `InvalidJson`.
/// 2. A top-level own key in [`RESERVED_KEYS`] rejects the whole payload.
/// 3. Copy the remaining entries into a new map, dropping every key that
///    contains `__`, recursing into nested objects and arrays.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSanitizer;

impl JsonSanitizer {
    fn invalid(message: &'static str) -> SanitizationError {
        SanitizationError::new(SanitizationErrorKind::InvalidJson, message)
    }

    fn scrub(value: Value) -> Value {
        match value {
            Value::Object(map) => Value::Object(Self::scrub_map(map)),
            Value::Array(items) => Value::Array(items.into_iter().map(Self::scrub).collect()),
            scalar => scalar,
        }
    }

    fn scrub_map(map: Map<String, Value>) -> Map<String, Value> {
        map.into_iter()
            .filter(|(key, _)| !key.contains(MARKER))
            .map(|(key, value)| (key, Self::scrub(value)))
            .collect()
    }
}

impl Sanitizer<String> for JsonSanitizer {
    type Output = SafeObject;

    fn sanitize(&self, input: Tainted<String>) -> ValidationResult<SafeObject> {
        if input.len() > MAX_PAYLOAD_BYTES {
            return Err(Self::invalid("payload too large"));
        }
        let raw = input.into_inner();

        let parsed: Value =
            serde_json::from_str(&raw).map_err(|_| Self::invalid("payload is not valid JSON"))?;

        let Value::Object(top) = parsed else {
            return Err(Self::invalid("payload must be a JSON object"));
        };

        if top.keys().any(|key| RESERVED_KEYS.contains(&key.as_str())) {
            return Err(Self::invalid("payload declares a reserved key"));
        }

        let safe = Self::scrub_map(top).into_iter().collect();
        Ok(Verified::new_unchecked(SafeObject(safe)))
    }
}
