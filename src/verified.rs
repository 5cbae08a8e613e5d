/// A value that has passed a sanitization policy.
///
/// `Verified<T>` is the only input type accepted by the crate's sinks: the
/// user store binds `Verified<UserId>`, the process invoker builds its argument
/// vector from `Verified<Host>`, and the file endpoint reads `Verified<UploadPath>`.
///
/// # Construction
///
/// There is no public constructor and no `From<T>`. Values are created by
/// [`Sanitizer`](crate::Sanitizer) implementations inside this crate after
/// their checks succeed.
///
/// ```compile_fail
/// use hardened_demo::Verified;
///
/// let id = Verified::new_unchecked(1_i64); // private to the crate
/// ```
///
/// Access is ordinary once a value is verified:
///
/// ```
/// use hardened_demo::{Sanitizer, Tainted};
/// use hardened_demo::sanitizer::IdentifierSanitizer;
///
/// let id = IdentifierSanitizer.sanitize(Tainted::new("42".to_string())).unwrap();
/// assert_eq!(id.as_ref().get(), 42);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verified<T> {
    inner: T,
}

impl<T> Verified<T> {
    /// Wraps a value that the caller has already validated.
    ///
    /// Restricted to the crate. Call sites are sanitizers and unit tests.
    pub(crate) fn new_unchecked(value: T) -> Self {
        Self { inner: value }
    }

    /// Consumes the wrapper and returns the validated value.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T> AsRef<T> for Verified<T> {
    fn as_ref(&self) -> &T {
        &self.inner
    }
}
