//! Two-terminal device models.
//!
//! Every model publishes up to four expression producers: a DC pair used
//! for the steady-state solve and a transient pair used once the ODE driver
//! runs. An empty expression means the device does not define that quantity;
//! a device with a non-empty voltage expression is voltage-defined and gets
//! an extra MNA branch-current variable. For the non-reactive kinds the
//! transient producers fall back to the DC ones.
//!
//! Sign convention: `i_expr` is the current flowing from the `top` terminal
//! to the `bot` terminal, and voltages are `V_top - V_bot`.

use faraday_core::{AnalysisMode, ComponentId, Expression, NodeId, Ref, Term};

/// Initial-condition bookkeeping of an energy-storing device.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reactive {
    /// Stored voltage (capacitor) or current (inductor) at t = 0.
    pub initial_cond: f64,
    /// True when the user pinned the initial condition; false means the DC
    /// solve latches it.
    pub specified: bool,
}

/// Which solved quantity seeds an unspecified initial condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateQuantity {
    /// Latch the component's DC voltage (capacitor).
    Voltage,
    /// Latch the component's DC current (inductor).
    Current,
}

/// Terminal and identity handles a device needs to build its expressions.
#[derive(Debug, Clone, Copy)]
pub struct Pins {
    /// The component the expressions belong to.
    pub id: ComponentId,
    /// Top terminal node.
    pub top: NodeId,
    /// Bottom terminal node.
    pub bot: NodeId,
}

/// The supported two-terminal device kinds.
#[derive(Debug, Clone)]
pub enum Device {
    /// Ohmic resistor; `value` is the resistance in ohms.
    Resistor,
    /// Ideal voltage source; `value` is the source voltage in volts.
    VoltageSource,
    /// Ideal current source; `value` is the source current in amperes.
    CurrentSource,
    /// Capacitor; `value` is the capacitance in farads.
    Capacitor(Reactive),
    /// Inductor; `value` is the inductance in henries.
    Inductor(Reactive),
}

impl Device {
    /// Whether this device integrates a state variable.
    pub fn is_integrating(&self) -> bool {
        matches!(self, Device::Capacitor(_) | Device::Inductor(_))
    }

    /// Initial-condition bookkeeping, for integrating devices.
    pub fn reactive(&self) -> Option<&Reactive> {
        match self {
            Device::Capacitor(r) | Device::Inductor(r) => Some(r),
            _ => None,
        }
    }

    /// Mutable initial-condition bookkeeping, for integrating devices.
    pub fn reactive_mut(&mut self) -> Option<&mut Reactive> {
        match self {
            Device::Capacitor(r) | Device::Inductor(r) => Some(r),
            _ => None,
        }
    }

    /// Which DC quantity seeds an unspecified initial condition.
    pub fn state_quantity(&self) -> Option<StateQuantity> {
        match self {
            Device::Capacitor(_) => Some(StateQuantity::Voltage),
            Device::Inductor(_) => Some(StateQuantity::Current),
            _ => None,
        }
    }

    /// Voltage expression for the given analysis mode.
    pub fn v_expr(&self, pins: Pins, mode: AnalysisMode) -> Expression {
        match mode {
            AnalysisMode::Dc => self.dc_v_expr(pins),
            AnalysisMode::Transient => self.tran_v_expr(pins),
        }
    }

    /// Current expression for the given analysis mode.
    pub fn i_expr(&self, pins: Pins, mode: AnalysisMode) -> Expression {
        match mode {
            AnalysisMode::Dc => self.dc_i_expr(pins),
            AnalysisMode::Transient => self.tran_i_expr(pins),
        }
    }

    /// Voltage expression for the DC steady-state solve.
    pub fn dc_v_expr(&self, pins: Pins) -> Expression {
        match self {
            Device::VoltageSource => vec![Term::from(Ref::Value(pins.id))].into(),
            // A capacitor with a pinned initial condition holds that
            // voltage through the DC solve; otherwise it is an open.
            Device::Capacitor(r) if r.specified => {
                vec![Term::from(Ref::InitialCond(pins.id))].into()
            }
            // An inductor without a pinned initial condition is a short:
            // a zero-volt source with its own branch current.
            Device::Inductor(r) if !r.specified => vec![Term::constant(0.0)].into(),
            _ => Expression::empty(),
        }
    }

    /// Current expression for the DC steady-state solve.
    pub fn dc_i_expr(&self, pins: Pins) -> Expression {
        match self {
            // I = (V_top - V_bot) / R
            Device::Resistor => vec![
                Term::new(1.0, vec![Ref::NodeVoltage(pins.top)], vec![Ref::Value(pins.id)]),
                Term::new(-1.0, vec![Ref::NodeVoltage(pins.bot)], vec![Ref::Value(pins.id)]),
            ]
            .into(),
            Device::CurrentSource => vec![Term::from(Ref::Value(pins.id))].into(),
            // A pinned inductor carries its initial current as a source.
            Device::Inductor(r) if r.specified => {
                vec![Term::from(Ref::InitialCond(pins.id))].into()
            }
            _ => Expression::empty(),
        }
    }

    /// Voltage expression for transient analysis.
    pub fn tran_v_expr(&self, pins: Pins) -> Expression {
        match self {
            // Reactive devices are never voltage-defined in transient; the
            // companion model in `tran_i_expr` carries them.
            Device::Capacitor(_) | Device::Inductor(_) => Expression::empty(),
            _ => self.dc_v_expr(pins),
        }
    }

    /// Current expression for transient analysis.
    pub fn tran_i_expr(&self, pins: Pins) -> Expression {
        match self {
            // Norton companion of the backward difference: the capacitor is
            // a voltage source of the stored voltage behind R = dt/C, so
            // I = (C/dt) * (V_top - V_bot - v_state).
            Device::Capacitor(_) => vec![
                Term::new(
                    -1.0,
                    vec![Ref::State(pins.id), Ref::Value(pins.id)],
                    vec![Ref::StepSize],
                ),
                Term::new(
                    1.0,
                    vec![Ref::NodeVoltage(pins.top), Ref::Value(pins.id)],
                    vec![Ref::StepSize],
                ),
                Term::new(
                    -1.0,
                    vec![Ref::NodeVoltage(pins.bot), Ref::Value(pins.id)],
                    vec![Ref::StepSize],
                ),
            ]
            .into(),
            // Norton companion of the inductor: the stored current in
            // parallel with R = L/dt, so I = i_state + (dt/L)(V_top - V_bot).
            Device::Inductor(_) => vec![
                Term::from(Ref::State(pins.id)),
                Term::new(
                    1.0,
                    vec![Ref::NodeVoltage(pins.top), Ref::StepSize],
                    vec![Ref::Value(pins.id)],
                ),
                Term::new(
                    -1.0,
                    vec![Ref::NodeVoltage(pins.bot), Ref::StepSize],
                    vec![Ref::Value(pins.id)],
                ),
            ]
            .into(),
            _ => self.dc_i_expr(pins),
        }
    }

    /// Time derivative of the device's state variable.
    pub fn dydt_expr(&self, pins: Pins) -> Expression {
        match self {
            // dV/dt = I/C: the companion current with the capacitance
            // factor cancelled.
            Device::Capacitor(_) => vec![
                Term::new(-1.0, vec![Ref::State(pins.id)], vec![Ref::StepSize]),
                Term::new(1.0, vec![Ref::NodeVoltage(pins.top)], vec![Ref::StepSize]),
                Term::new(-1.0, vec![Ref::NodeVoltage(pins.bot)], vec![Ref::StepSize]),
            ]
            .into(),
            // dI/dt = V/L
            Device::Inductor(_) => vec![
                Term::new(1.0, vec![Ref::NodeVoltage(pins.top)], vec![Ref::Value(pins.id)]),
                Term::new(-1.0, vec![Ref::NodeVoltage(pins.bot)], vec![Ref::Value(pins.id)]),
            ]
            .into(),
            _ => Expression::empty(),
        }
    }
}
