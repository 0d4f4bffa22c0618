//! Arena entry for a two-terminal component.

use faraday_core::{ComponentId, Expression, ModulatorId, NodeId};
use faraday_devices::{Device, Pins};

/// A component instance: its device model plus wiring, value and history.
///
/// The `circuit_v`/`circuit_i` expressions are published by the matrix
/// builder: voltage is always the top-minus-bot node difference, current is
/// either the device's own current expression or, for voltage-defined
/// components, a reference to the MNA branch-current slot.
#[derive(Debug)]
pub(crate) struct Component {
    pub(crate) device: Device,
    pub(crate) top: Option<NodeId>,
    pub(crate) bot: Option<NodeId>,
    /// Primary value: resistance, capacitance, inductance or source
    /// magnitude. Modulators write here.
    pub(crate) value: f64,
    pub(crate) modulator: Option<ModulatorId>,
    pub(crate) auto_save: bool,
    pub(crate) v_hist: Vec<f64>,
    pub(crate) i_hist: Vec<f64>,
    pub(crate) circuit_v: Expression,
    pub(crate) circuit_i: Expression,
    /// MNA branch-current slot, when voltage-defined in the current mode.
    pub(crate) branch_slot: Option<usize>,
    /// ODE state slot, for integrating devices after a transient build.
    pub(crate) state_slot: Option<usize>,
}

impl Component {
    pub(crate) fn new(device: Device, value: f64) -> Self {
        Component {
            device,
            top: None,
            bot: None,
            value,
            modulator: None,
            auto_save: false,
            v_hist: Vec::new(),
            i_hist: Vec::new(),
            circuit_v: Expression::empty(),
            circuit_i: Expression::empty(),
            branch_slot: None,
            state_slot: None,
        }
    }

    pub(crate) fn fully_connected(&self) -> bool {
        self.top.is_some() && self.bot.is_some()
    }

    /// Terminal handles for expression building. Only valid once the
    /// component is fully connected.
    pub(crate) fn pins(&self, id: ComponentId) -> Pins {
        Pins {
            id,
            top: self.top.expect("component fully connected"),
            bot: self.bot.expect("component fully connected"),
        }
    }
}
