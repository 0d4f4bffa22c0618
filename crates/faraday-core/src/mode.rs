//! Simulation analysis mode.

/// Which analysis the circuit equations are currently formulated for.
///
/// Component models produce different expressions per mode: energy-storing
/// components look like opens/shorts (or sources of their initial condition)
/// in DC, and like step-size-parameterized Norton companions in transient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnalysisMode {
    /// Steady-state solve used to establish initial conditions.
    #[default]
    Dc,
    /// Time-domain simulation driven by the ODE integrator.
    Transient,
}
