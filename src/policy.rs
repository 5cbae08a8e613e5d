//! Expression policy for `POST /calculate`.
//!
//! There is no evaluator in this crate. Every request body is refused,
//! including empty and non-JSON bodies, so no arithmetic, code, or template
//! text supplied by a client is ever interpreted.

use std::convert::Infallible;

use crate::{PolicyError, Tainted};

/// Refuses every expression.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpressionPolicy;

impl ExpressionPolicy {
    /// Always returns [`PolicyError::Unsupported`].
    ///
    /// The `Ok` type is uninhabited: no code path can produce an evaluated
    /// result.
    ///
    /// # Examples
    ///
    /// ```
    /// use hardened_demo::{ExpressionPolicy, PolicyErrorKind, Tainted};
    ///
    /// let err = ExpressionPolicy
    ///     .evaluate(Tainted::new("2 + 2".to_string()))
    ///     .unwrap_err();
    /// assert_eq!(err.kind(), PolicyErrorKind::UnsupportedOperation);
    /// ```
    pub fn evaluate<T>(&self, expression: Tainted<T>) -> Result<Infallible, PolicyError> {
        drop(expression);
        Err(PolicyError::Unsupported {
            operation: "expression evaluation",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PolicyErrorKind;
    use proptest::prelude::*;

    #[test]
    fn refuses_empty_and_structured_input() {
        for body in ["", "{}", r#"{"expression":"2+2"}"#, "process.exit(1)"] {
            let err = ExpressionPolicy
                .evaluate(Tainted::new(body.to_string()))
                .unwrap_err();
            assert_eq!(err.kind(), PolicyErrorKind::UnsupportedOperation);
        }
    }

    proptest! {
        #[test]
        fn proptest_refuses_arbitrary_bytes(body in prop::collection::vec(any::<u8>(), 0..256)) {
            prop_assert!(ExpressionPolicy.evaluate(Tainted::new(body)).is_err());
        }
    }
}
