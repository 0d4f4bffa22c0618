//! Public error surface of the simulation engine.

use faraday_core::EvalError;
use thiserror::Error;

/// Errors surfaced by the public circuit API.
#[derive(Debug, Error)]
pub enum Error {
    /// Matrix build attempted while a component is missing a terminal.
    #[error("component not fully connected")]
    NotConnected,

    /// Expression evaluation failed.
    #[error(transparent)]
    Eval(#[from] EvalError),

    /// The linear solver or ODE driver failed.
    #[error(transparent)]
    Solver(#[from] faraday_solver::Error),

    /// The step size would have to fall below `h_min` to honor the error
    /// tolerances.
    #[error("step size fell below the minimum of {h_min:.3e} without meeting error bounds")]
    NonConvergence { h_min: f64 },

    /// Raw `set_value` on a parameter owned by a modulator.
    #[error("value is controlled by a modulator")]
    ModulatedValue,

    /// A node or component handle from a different circuit was wired in.
    #[error("node or component belongs to a different circuit")]
    WrongCircuit,

    /// Attempt to reconnect an already-bound terminal.
    #[error("terminal is already connected")]
    DoubleConnection,

    /// Both terminals of a component bound to the same node.
    #[error("both terminals connected to the same node")]
    SelfConnection,
}

/// Result type for circuit operations.
pub type Result<T> = std::result::Result<T, Error>;
