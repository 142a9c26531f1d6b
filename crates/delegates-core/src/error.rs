//! Error types for delegate operations
//!
//! Most misuse of a delegate is either fatal (executing an unbound delegate)
//! or deliberately silent (removing a subscription that is already gone).
//! `DelegateError` backs the `try_*` mirrors of those operations for callers
//! that prefer a `Result` over a panic or a `false`.

use core::fmt;

/// Result type for fallible delegate operations
pub type DelegateResult<T> = Result<T, DelegateError>;

/// Errors reported by the `try_*` delegate and registry operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelegateError {
    /// Delegate has no callable bound
    NotBound,

    /// Handle is the invalid sentinel and can never name a subscription
    InvalidHandle,
}

impl fmt::Display for DelegateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DelegateError::NotBound => write!(f, "delegate is not bound"),
            DelegateError::InvalidHandle => write!(f, "invalid delegate handle"),
        }
    }
}

impl std::error::Error for DelegateError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            format!("{}", DelegateError::NotBound),
            "delegate is not bound"
        );
        assert_eq!(
            format!("{}", DelegateError::InvalidHandle),
            "invalid delegate handle"
        );
    }

    #[test]
    fn test_error_is_std_error() {
        fn assert_error<E: std::error::Error>(_: &E) {}
        assert_error(&DelegateError::NotBound);

        let boxed: Box<dyn std::error::Error> = Box::new(DelegateError::InvalidHandle);
        assert_eq!(boxed.to_string(), "invalid delegate handle");
    }
}
