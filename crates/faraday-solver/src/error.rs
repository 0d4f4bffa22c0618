//! Error types for the numerical backends.

use thiserror::Error;

/// Errors reported by the linear solver and the ODE driver.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Sparse LU factorization failed (structurally or numerically singular
    /// matrix, or a sparsity pattern the cached structure cannot host).
    #[error("sparse LU factorization failed: {0}")]
    Factorization(String),

    /// The factorized system produced no usable solution.
    #[error("sparse LU solve failed: {0}")]
    Solve(String),

    /// Vector or matrix dimensions do not agree.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The ODE driver could not be constructed from the given parameters.
    #[error("ODE driver allocation failed: {0}")]
    DriverAllocation(String),

    /// The stepper was driven inconsistently with its allocation.
    #[error("stepper internal fault: {0}")]
    StepperInternal(String),
}

/// Result type for solver operations.
pub type Result<T> = std::result::Result<T, Error>;
