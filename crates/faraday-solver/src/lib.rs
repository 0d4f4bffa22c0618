//! Numerical backends for the Faraday circuit simulation engine.
//!
//! Two independent pieces live here:
//!
//! - [`linear`] — a sparse LU solver over faer whose symbolic factorization
//!   (elimination tree, fill-in pattern) is computed once per sparsity
//!   pattern and reused across the numeric re-factorizations of every time
//!   step.
//! - [`ode`] — an adaptive embedded Runge-Kutta driver (RKF45 by default)
//!   exposing single step applications, so a caller can interleave its own
//!   event handling between steps instead of surrendering control to a
//!   closed integration loop.

pub mod error;
pub mod linear;
pub mod ode;

pub use error::{Error, Result};
pub use linear::CachedSparseLu;
pub use ode::{Adjustment, OdeDriver, StepStatus, StepperKind, System};
