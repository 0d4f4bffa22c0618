//! Errors raised by expression evaluation.

use thiserror::Error;

/// Failure while evaluating a symbolic expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EvalError {
    /// A denominator factor evaluated to exactly zero.
    #[error("division by zero in expression term")]
    DivisionByZero,
}
