//! Core types for the Faraday circuit simulation engine.
//!
//! This crate defines the symbolic expression algebra that component models
//! use to describe their contributions to the circuit equations, the compact
//! handle types that tie every piece of state to its owning circuit, and the
//! [`Modulator`] contract for time-varying parameter drivers.
//!
//! Expressions are built once per circuit topology and hold [`Ref`] handles
//! rather than values; each evaluation resolves the handles against a
//! [`Bindings`] view of live simulator state, so re-evaluating a whole matrix
//! of expressions after a parameter or step-size change costs only a walk
//! over stable storage.

pub mod eps;
pub mod error;
pub mod expr;
pub mod ids;
pub mod mode;
pub mod modulator;

pub use eps::{EPSILON, epsilon_equals, epsilon_floor};
pub use error::EvalError;
pub use expr::{Bindings, Expression, Ref, Term, ValueFn};
pub use ids::{CircuitId, ComponentId, ModulatorId, NodeId};
pub use mode::AnalysisMode;
pub use modulator::{ModFlags, Modulator, Targets};
