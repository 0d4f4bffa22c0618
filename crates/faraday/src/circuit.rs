//! The circuit: arenas, tunables, factories and the observation API.

use indexmap::IndexMap;
use nalgebra::DVector;

use faraday_core::{
    AnalysisMode, CircuitId, ComponentId, Expression, ModFlags, Modulator, ModulatorId, NodeId,
};
use faraday_devices::{Device, Reactive};
use faraday_solver::{CachedSparseLu, OdeDriver, StepperKind};

use crate::component::Component;
use crate::error::{Error, Result};
use crate::node::Node;

/// Simulator tunables: step-size limits, error tolerances and the stepper
/// algorithm used for transient analysis.
#[derive(Debug, Clone, Copy)]
pub struct Tunables {
    /// Minimum transient step size (s).
    pub h_min: f64,
    /// Maximum transient step size (s).
    pub h_max: f64,
    /// Absolute error tolerance of the integrator.
    pub e_abs: f64,
    /// Relative error tolerance of the integrator.
    pub e_rel: f64,
    /// Embedded Runge-Kutta method.
    pub stepper: StepperKind,
}

impl Default for Tunables {
    fn default() -> Self {
        Tunables {
            h_min: 1e-15,
            h_max: 1e-6,
            e_abs: 1e-12,
            e_rel: 1e-3,
            stepper: StepperKind::default(),
        }
    }
}

/// A registered modulator and the values it controls.
pub(crate) struct ModulatorSlot {
    pub(crate) driver: Box<dyn Modulator>,
    pub(crate) controlled: Vec<(ComponentId, ModFlags)>,
}

/// A circuit: topology, simulator state and history.
///
/// Non-copyable; every handle it returns is valid only against this
/// instance. Components drop before nodes, nodes before the solver state.
pub struct Circuit {
    pub(crate) components: Vec<Component>,
    pub(crate) nodes: Vec<Node>,
    pub(crate) modulators: Vec<ModulatorSlot>,

    pub(crate) id: CircuitId,
    pub(crate) tunables: Tunables,
    pub(crate) save_period: f64,
    pub(crate) mode: AnalysisMode,
    pub(crate) rebuild_pending: bool,

    /// Simulated time.
    pub(crate) t: f64,
    /// Live step size, mirrored from the ODE driver while one is allocated.
    pub(crate) dt: Option<f64>,

    // Symbolic circuit representation.
    pub(crate) expr_mat: IndexMap<(usize, usize), Expression>,
    pub(crate) expr_vec: Vec<Expression>,
    pub(crate) n_vars: usize,

    // Numeric representation; triplet positions mirror `expr_mat`.
    pub(crate) triplets: Vec<(usize, usize, f64)>,
    pub(crate) lu: Option<CachedSparseLu>,
    pub(crate) eval_vec: DVector<f64>,
    pub(crate) solved_vec: DVector<f64>,

    // ODE coupling.
    pub(crate) ode: Option<OdeDriver>,
    pub(crate) deq_state: Vec<f64>,
    pub(crate) dydt_exprs: Vec<Expression>,
    pub(crate) state_save: Vec<f64>,
    pub(crate) step_y: Vec<f64>,

    pub(crate) save_times: Vec<f64>,
}

impl Default for Circuit {
    fn default() -> Self {
        Circuit::new()
    }
}

impl Circuit {
    /// Circuit with default tunables (h in [1e-15, 1e-6], e_abs 1e-12,
    /// e_rel 1e-3, RKF45).
    pub fn new() -> Self {
        Circuit::with_tunables(Tunables::default())
    }

    /// Circuit with explicit tunables.
    pub fn with_tunables(tunables: Tunables) -> Self {
        Circuit {
            components: Vec::new(),
            nodes: Vec::new(),
            modulators: Vec::new(),
            id: CircuitId::fresh(),
            tunables,
            save_period: 0.0,
            mode: AnalysisMode::Dc,
            rebuild_pending: true,
            t: 0.0,
            dt: None,
            expr_mat: IndexMap::new(),
            expr_vec: Vec::new(),
            n_vars: 0,
            triplets: Vec::new(),
            lu: None,
            eval_vec: DVector::zeros(0),
            solved_vec: DVector::zeros(0),
            ode: None,
            deq_state: Vec::new(),
            dydt_exprs: Vec::new(),
            state_save: Vec::new(),
            step_y: Vec::new(),
            save_times: Vec::new(),
        }
    }

    // ---- arena access -------------------------------------------------

    pub(crate) fn comp(&self, id: ComponentId) -> &Component {
        assert_eq!(id.circuit(), self.id, "component handle from a different circuit");
        &self.components[id.index()]
    }

    pub(crate) fn comp_mut(&mut self, id: ComponentId) -> &mut Component {
        assert_eq!(id.circuit(), self.id, "component handle from a different circuit");
        &mut self.components[id.index()]
    }

    pub(crate) fn node(&self, id: NodeId) -> &Node {
        assert_eq!(id.circuit(), self.id, "node handle from a different circuit");
        &self.nodes[id.index()]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        assert_eq!(id.circuit(), self.id, "node handle from a different circuit");
        &mut self.nodes[id.index()]
    }

    /// Mark the symbolic matrix stale; the next simulation entry rebuilds
    /// it and restarts from a DC solve.
    pub(crate) fn topology_changed(&mut self) {
        self.rebuild_pending = true;
        self.mode = AnalysisMode::Dc;
    }

    // ---- topology factories -------------------------------------------

    /// New free node.
    pub fn add_node(&mut self) -> NodeId {
        self.topology_changed();
        let id = NodeId::new(self.id, self.nodes.len());
        self.nodes.push(Node::free());
        id
    }

    /// New fixed-voltage node. Zero volts returns the shared ground node.
    pub fn add_fixed_node(&mut self, voltage: f64) -> NodeId {
        if voltage == 0.0 {
            return self.gnd();
        }
        self.topology_changed();
        let id = NodeId::new(self.id, self.nodes.len());
        self.nodes.push(Node::fixed(voltage));
        id
    }

    /// The ground node, created on first use.
    pub fn gnd(&mut self) -> NodeId {
        for (i, n) in self.nodes.iter().enumerate() {
            if n.fixed && n.fixed_voltage == 0.0 {
                return NodeId::new(self.id, i);
            }
        }
        self.topology_changed();
        let id = NodeId::new(self.id, self.nodes.len());
        self.nodes.push(Node::fixed(0.0));
        id
    }

    /// New component from an explicit device model and value.
    pub fn add_component(&mut self, device: Device, value: f64) -> ComponentId {
        self.topology_changed();
        let id = ComponentId::new(self.id, self.components.len());
        self.components.push(Component::new(device, value));
        id
    }

    /// New resistor (ohms).
    pub fn add_resistor(&mut self, resistance: f64) -> ComponentId {
        self.add_component(Device::Resistor, resistance)
    }

    /// New ideal voltage source (volts).
    pub fn add_voltage_source(&mut self, voltage: f64) -> ComponentId {
        self.add_component(Device::VoltageSource, voltage)
    }

    /// New ideal current source (amperes).
    pub fn add_current_source(&mut self, current: f64) -> ComponentId {
        self.add_component(Device::CurrentSource, current)
    }

    /// New capacitor (farads); the initial voltage is latched from the DC
    /// solve.
    pub fn add_capacitor(&mut self, capacitance: f64) -> ComponentId {
        self.add_component(Device::Capacitor(Reactive::default()), capacitance)
    }

    /// New capacitor with a pinned initial voltage.
    pub fn add_capacitor_with_ic(&mut self, capacitance: f64, v0: f64) -> ComponentId {
        self.add_component(
            Device::Capacitor(Reactive {
                initial_cond: v0,
                specified: true,
            }),
            capacitance,
        )
    }

    /// New inductor (henries); the initial current is latched from the DC
    /// solve.
    pub fn add_inductor(&mut self, inductance: f64) -> ComponentId {
        self.add_component(Device::Inductor(Reactive::default()), inductance)
    }

    /// New inductor with a pinned initial current.
    pub fn add_inductor_with_ic(&mut self, inductance: f64, i0: f64) -> ComponentId {
        self.add_component(
            Device::Inductor(Reactive {
                initial_cond: i0,
                specified: true,
            }),
            inductance,
        )
    }

    /// Register a modulator.
    pub fn add_modulator<M: Modulator + 'static>(&mut self, modulator: M) -> ModulatorId {
        let id = ModulatorId::new(self.id, self.modulators.len());
        self.modulators.push(ModulatorSlot {
            driver: Box::new(modulator),
            controlled: Vec::new(),
        });
        id
    }

    // ---- parameters ---------------------------------------------------

    /// Current value of a component (resistance, capacitance, source
    /// magnitude, ...).
    pub fn value(&self, comp: ComponentId) -> f64 {
        self.comp(comp).value
    }

    /// Overwrite a component's value. Fails when a modulator owns it.
    pub fn set_value(&mut self, comp: ComponentId, value: f64) -> Result<()> {
        let c = self.comp_mut(comp);
        if c.modulator.is_some() {
            return Err(Error::ModulatedValue);
        }
        c.value = value;
        Ok(())
    }

    /// Hand a component's value to a modulator, replacing any previous
    /// binding.
    pub fn modulate(
        &mut self,
        comp: ComponentId,
        modulator: ModulatorId,
        flags: ModFlags,
    ) -> Result<()> {
        if comp.circuit() != self.id || modulator.circuit() != self.id {
            return Err(Error::WrongCircuit);
        }
        self.remove_modulator(comp);
        self.modulators[modulator.index()].controlled.push((comp, flags));
        self.components[comp.index()].modulator = Some(modulator);
        Ok(())
    }

    /// Release a component's value from its modulator, if any.
    pub fn remove_modulator(&mut self, comp: ComponentId) {
        if let Some(m) = self.comp(comp).modulator {
            self.modulators[m.index()].controlled.retain(|&(c, _)| c != comp);
            self.comp_mut(comp).modulator = None;
        }
    }

    /// Pin an integrating component's initial condition (capacitor voltage
    /// or inductor current). Takes effect at the next matrix build; the DC
    /// solve will not overwrite a pinned value.
    ///
    /// # Panics
    ///
    /// Panics when `comp` is not a capacitor or inductor.
    pub fn set_initial_cond(&mut self, comp: ComponentId, value: f64) {
        let r = self
            .comp_mut(comp)
            .device
            .reactive_mut()
            .expect("initial conditions only apply to integrating components");
        r.initial_cond = value;
        r.specified = true;
    }

    // ---- saving & observation -----------------------------------------

    /// How often state is saved, in seconds; zero saves at every computed
    /// step.
    pub fn save_period(&self) -> f64 {
        self.save_period
    }

    /// Change the save period.
    pub fn set_save_period(&mut self, period: f64) {
        self.save_period = period;
    }

    /// Enable history saving for every node and component. A non-negative
    /// `period` also becomes the save period.
    pub fn save_all(&mut self, period: f64) {
        if period >= 0.0 {
            self.save_period = period;
        }
        for c in &mut self.components {
            c.auto_save = true;
        }
        for n in &mut self.nodes {
            n.auto_save = true;
        }
    }

    /// Enable or disable history saving for one node.
    pub fn set_node_auto_save(&mut self, node: NodeId, enabled: bool) {
        self.node_mut(node).auto_save = enabled;
    }

    /// Enable or disable history saving for one component.
    pub fn set_component_auto_save(&mut self, comp: ComponentId, enabled: bool) {
        self.comp_mut(comp).auto_save = enabled;
    }

    /// Times at which a snapshot was recorded.
    pub fn save_times(&self) -> &[f64] {
        &self.save_times
    }

    /// Current simulated time.
    pub fn time(&self) -> f64 {
        self.t
    }

    /// Current analysis mode.
    pub fn mode(&self) -> AnalysisMode {
        self.mode
    }

    /// Current integrator step size, when a transient driver is live.
    pub fn step_size(&self) -> Option<f64> {
        self.dt
    }

    /// Current voltage of a node. Free nodes read the solved vector (zero
    /// before the first solve); fixed nodes their own voltage.
    pub fn node_voltage(&self, node: NodeId) -> f64 {
        let n = self.node(node);
        if n.fixed {
            return n.fixed_voltage;
        }
        match n.slot {
            Some(slot) if slot < self.solved_vec.len() => self.solved_vec[slot],
            _ => 0.0,
        }
    }

    /// Saved voltage history of a node.
    pub fn node_v_hist(&self, node: NodeId) -> &[f64] {
        &self.node(node).v_hist
    }

    /// Voltage across a component (top minus bot).
    pub fn voltage(&self, comp: ComponentId) -> Result<f64> {
        Ok(self.comp(comp).circuit_v.eval(&self.bindings())?)
    }

    /// Current through a component (top towards bot).
    pub fn current(&self, comp: ComponentId) -> Result<f64> {
        Ok(self.comp(comp).circuit_i.eval(&self.bindings())?)
    }

    /// Instantaneous power; positive when dissipating.
    pub fn power(&self, comp: ComponentId) -> Result<f64> {
        Ok(self.voltage(comp)? * self.current(comp)?)
    }

    /// Saved voltage history of a component.
    pub fn v_hist(&self, comp: ComponentId) -> &[f64] {
        &self.comp(comp).v_hist
    }

    /// Saved current history of a component.
    pub fn i_hist(&self, comp: ComponentId) -> &[f64] {
        &self.comp(comp).i_hist
    }

    /// Forget all history and simulation progress: time returns to zero,
    /// histories and save times empty, modulators reset, and the matrix is
    /// rebuilt (from a fresh DC solve) on the next simulation entry.
    pub fn reset(&mut self) {
        self.rebuild_pending = true;
        self.mode = AnalysisMode::Dc;
        self.t = 0.0;

        for c in &mut self.components {
            c.v_hist.clear();
            c.i_hist.clear();
        }
        for n in &mut self.nodes {
            n.v_hist.clear();
        }
        self.save_times.clear();

        self.reset_modulators();
    }
}
