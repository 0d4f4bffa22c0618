//! Faraday: a symbolic-MNA circuit simulation engine.
//!
//! A [`Circuit`] owns nodes, two-terminal components and value modulators,
//! assembles Kirchhoff's Current Law plus voltage-source branch equations
//! into a *symbolic* sparse system once per topology, and then re-evaluates
//! and solves that system cheaply as values, integrator state and the
//! adaptive step size change.
//!
//! Simulation runs in two phases. A DC solve establishes the steady state
//! (and latches unspecified initial conditions of capacitors and
//! inductors); the transient phase then advances the energy-storing
//! components with an adaptive embedded Runge-Kutta integrator, snapping
//! steps onto modulator edges and save points.
//!
//! ```no_run
//! use faraday::Circuit;
//!
//! let mut c = Circuit::new();
//! let gnd = c.gnd();
//! let n = c.add_node();
//! let vs = c.add_voltage_source(5.0);
//! let r1 = c.add_resistor(100.0);
//! c.chain(n).to(vs)?.end_at(gnd)?;
//! c.chain(n).to(r1)?.end_at(gnd)?;
//! c.sim_to_time(0.0)?;
//! assert!((c.node_voltage(n) - 5.0).abs() < 1e-9);
//! # Ok::<(), faraday::Error>(())
//! ```

pub mod circuit;
mod component;
pub mod error;
mod matrix;
mod node;
mod sim;
pub mod wiring;

pub use circuit::{Circuit, Tunables};
pub use error::{Error, Result};
pub use wiring::Chain;

pub use faraday_core::{
    AnalysisMode, CircuitId, ComponentId, EPSILON, EvalError, Expression, ModFlags, Modulator,
    ModulatorId, NodeId, Ref, Targets, Term, epsilon_equals, epsilon_floor,
};
pub use faraday_devices::{Device, Pwm, Reactive, Sine, StateQuantity};
pub use faraday_solver::StepperKind;
