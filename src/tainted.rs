use std::fmt;

/// A wrapper for request data that has not passed through a sanitizer yet.
///
/// Every query parameter and body field the web layer extracts is wrapped in
/// `Tainted<T>` at the boundary. The raw value is only reachable from inside
/// the crate, so the only way for a handler to use it is to hand it to a
/// [`Sanitizer`](crate::Sanitizer) and receive a [`Verified<T>`](crate::Verified).
///
/// # Security Properties
///
/// - No `Deref`, `AsRef`, `Borrow`, or `Into<T>`
/// - `Debug` never prints the payload, so tainted values are safe to log
///   even when they carry passwords or log-injection sequences
///
/// # Examples
///
/// ```
/// use hardened_demo::Tainted;
///
/// let id = Tainted::new("1 OR 1=1".to_string());
/// assert_eq!(format!("{:?}", id), "Tainted(..)");
///
/// // Not usable as a string:
/// // let sql = format!("SELECT * FROM users WHERE id = {}", id); // Won't compile!
/// ```
// Clone is needed so one extracted value can be tried against several policies in tests.
#[derive(Clone)]
pub struct Tainted<T> {
    // Must stay private: a public field bypasses the sanitizer bottleneck.
    inner: T,
}

impl<T> Tainted<T> {
    /// Marks a value as untrusted.
    pub fn new(value: T) -> Self {
        Self { inner: value }
    }

    /// Hands the raw value to a sanitizer.
    ///
    /// `pub(crate)` on purpose: only sanitizer implementations in this crate
    /// may look inside, and they must validate before producing `Verified<T>`.
    pub(crate) fn into_inner(self) -> T {
        self.inner
    }

    /// Projects the untrusted value; the result is still tainted.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Tainted<U> {
        Tainted::new(f(self.inner))
    }
}

impl Tainted<String> {
    /// Returns the length in bytes of the untrusted string.
    ///
    /// Length is safe metadata; handlers use it for audit records.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if the untrusted string is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<T> fmt::Debug for Tainted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Tainted(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_hides_payload() {
        let tainted = Tainted::new("hunter2-password".to_string());
        let out = format!("{:?}", tainted);

        assert_eq!(out, "Tainted(..)");
        assert!(!out.contains("hunter2"));
    }

    #[test]
    fn length_is_observable() {
        let tainted = Tainted::new("abc".to_string());
        assert_eq!(tainted.len(), 3);
        assert!(!tainted.is_empty());
        assert!(Tainted::new(String::new()).is_empty());
    }

    #[test]
    fn map_stays_tainted() {
        let body = Tainted::new(("data".to_string(), 7u32));
        let field: Tainted<String> = body.map(|(data, _)| data);
        assert_eq!(format!("{:?}", field), "Tainted(..)");
        assert_eq!(field.len(), 4);
    }

    #[test]
    fn into_inner_returns_original() {
        let tainted = Tainted::new(vec![1u8, 2, 3]);
        assert_eq!(tainted.into_inner(), vec![1, 2, 3]);
    }

    mod proptests {
        use super::*;
        use crate::sanitizer::IdentifierSanitizer;
        use crate::Sanitizer;
        use proptest::prelude::*;

        proptest! {
            /// Cloned tainted values sanitize to the same outcome.
            #[test]
            fn proptest_clone_preserves_outcome(input in "-?[0-9]{1,12}|[a-z ;'=]{1,12}") {
                let first = Tainted::new(input.clone());
                let second = first.clone();

                let a = IdentifierSanitizer.sanitize(first).map(|v| *v.as_ref());
                let b = IdentifierSanitizer.sanitize(second).map(|v| *v.as_ref());

                prop_assert_eq!(a.is_ok(), b.is_ok());
                if let (Ok(a), Ok(b)) = (a, b) {
                    prop_assert_eq!(a, b);
                }
            }
        }
    }
}
