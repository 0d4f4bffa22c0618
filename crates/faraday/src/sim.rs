//! DC priming, ODE coupling and the transient simulation loop.

use faraday_core::{AnalysisMode, ComponentId, EPSILON, NodeId, Targets, epsilon_equals, epsilon_floor};
use faraday_devices::StateQuantity;
use faraday_solver::{StepStatus, System};

use crate::circuit::{Circuit, ModulatorSlot};
use crate::error::{Error, Result};

/// What one transient step attempt did.
enum StepOutcome {
    /// State and time advanced by the attempted step.
    Committed,
    /// The step was rejected; retry with the halved step size.
    Retry,
}

impl Circuit {
    // ---- modulator plumbing -------------------------------------------

    /// Run `apply` for all modulators at the current time.
    pub(crate) fn apply_modulators(&mut self) {
        let t = self.t;
        let components = &mut self.components;
        for slot in &mut self.modulators {
            let ModulatorSlot { driver, controlled } = slot;
            let mut sink = |comp: ComponentId, v: f64| components[comp.index()].value = v;
            driver.apply(t, Targets::new(controlled, &mut sink));
        }
    }

    /// Run `apply` for continuous modulators only; used inside the RK
    /// derivative callback where `t` is a sub-step time.
    fn apply_continuous_modulators(&mut self) {
        let t = self.t;
        let components = &mut self.components;
        for slot in &mut self.modulators {
            let ModulatorSlot { driver, controlled } = slot;
            if !driver.continuous() {
                continue;
            }
            let mut sink = |comp: ComponentId, v: f64| components[comp.index()].value = v;
            driver.apply(t, Targets::new(controlled, &mut sink));
        }
    }

    /// Restore every modulator to its pre-simulation state.
    pub(crate) fn reset_modulators(&mut self) {
        let t = self.t;
        let components = &mut self.components;
        for slot in &mut self.modulators {
            let ModulatorSlot { driver, controlled } = slot;
            let mut sink = |comp: ComponentId, v: f64| components[comp.index()].value = v;
            driver.reset(t, Targets::new(controlled, &mut sink));
        }
    }

    // ---- event scheduling ---------------------------------------------

    /// Next scheduled save point, or `f64::MAX` when saving is unbounded
    /// (save period of zero saves at every computed step).
    pub fn next_save_time(&self) -> f64 {
        if self.save_period > 0.0 {
            (epsilon_floor(self.t / self.save_period) + 1) as f64 * self.save_period
        } else {
            f64::MAX
        }
    }

    /// Earliest upcoming modulator discontinuity.
    pub fn next_modulator_time(&mut self) -> f64 {
        let t = self.t;
        let mut earliest = f64::MAX;
        for slot in &mut self.modulators {
            let change = slot.driver.next_change_time(t);
            if change < earliest {
                earliest = change;
            }
        }
        earliest
    }

    /// Length of the next step the loop would take: the driver's step size
    /// clamped by the tunables and the next save/modulator event.
    pub fn next_step_duration(&mut self) -> f64 {
        let h = self.dt.unwrap_or(self.tunables.h_max);
        let until_save = self.next_save_time() - self.t;
        let until_mod = self.next_modulator_time() - self.t;
        self.tunables
            .h_min
            .max(self.tunables.h_max.min(h).min(until_save).min(until_mod))
    }

    /// Time the next step would land on.
    pub fn next_step_time(&mut self) -> f64 {
        self.t + self.next_step_duration()
    }

    /// Record histories for every auto-saved node and component; the save
    /// time is noted when anything was recorded.
    pub(crate) fn save_states(&mut self) -> Result<()> {
        let mut any_saved = false;

        for i in 0..self.nodes.len() {
            if !self.nodes[i].auto_save {
                continue;
            }
            any_saved = true;
            let v = self.node_voltage(NodeId::new(self.id, i));
            self.nodes[i].v_hist.push(v);
        }

        for i in 0..self.components.len() {
            if !self.components[i].auto_save {
                continue;
            }
            any_saved = true;
            let bindings = self.bindings();
            let v = self.components[i].circuit_v.eval(&bindings)?;
            let cur = self.components[i].circuit_i.eval(&bindings)?;
            let c = &mut self.components[i];
            c.v_hist.push(v);
            c.i_hist.push(cur);
        }

        if any_saved {
            self.save_times.push(self.t);
        }
        Ok(())
    }

    // ---- DC priming ---------------------------------------------------

    /// One steady-state solve with modulators applied at the current time;
    /// integrating components without a pinned initial condition latch it
    /// from the solution.
    pub(crate) fn compute_dc_solution(&mut self) -> Result<()> {
        if self.rebuild_pending {
            self.gen_matrix()?;
        }

        self.apply_modulators();
        self.solve_matrix()?;

        for i in 0..self.components.len() {
            let id = ComponentId::new(self.id, i);
            let quantity = match (
                self.components[i].device.reactive(),
                self.components[i].device.state_quantity(),
            ) {
                (Some(r), Some(q)) if !r.specified => q,
                _ => continue,
            };
            let value = match quantity {
                StateQuantity::Voltage => self.voltage(id)?,
                StateQuantity::Current => self.current(id)?,
            };
            self.components[i]
                .device
                .reactive_mut()
                .expect("integrating device")
                .initial_cond = value;
        }

        self.save_states()?;
        Ok(())
    }

    // ---- transient stepping -------------------------------------------

    /// One stepper application of `step` seconds on a working copy of the
    /// state. On success the state and time commit and the controller
    /// retunes the step size for the next round.
    fn advance_state(&mut self, step: f64) -> Result<StepOutcome> {
        self.dt = Some(step);

        let mut y = std::mem::take(&mut self.step_y);
        y.clear();
        y.extend_from_slice(&self.deq_state);

        let mut driver = self.ode.take().expect("ODE driver allocated at matrix build");
        driver.h = step;
        let status = driver.step_apply(self.t, &mut y, self);

        let outcome = match status {
            Ok(StepStatus::Success) => {
                self.deq_state.copy_from_slice(&y);
                self.t += step;
                let mut next_h = step;
                driver.hadjust(&y, &mut next_h);
                self.dt = Some(next_h);
                Ok(StepOutcome::Committed)
            }
            Ok(StepStatus::Failed) => {
                if step <= self.tunables.h_min {
                    Err(Error::NonConvergence {
                        h_min: self.tunables.h_min,
                    })
                } else {
                    self.dt = Some(step / 2.0);
                    Ok(StepOutcome::Retry)
                }
            }
            Err(e) => Err(e),
        };

        self.step_y = y;
        self.ode = Some(driver);
        outcome
    }

    // ---- simulation entry points --------------------------------------

    /// Simulate until `t` reaches `stop`.
    pub fn sim_to_time(&mut self, stop: f64) -> Result<()> {
        self.run_to_time(stop, false)
    }

    /// Take a single step: the DC solve on the first call, one transient
    /// step afterwards, bounded by `max_dt` when given.
    pub fn sim_single_step(&mut self, max_dt: Option<f64>) -> Result<()> {
        match max_dt {
            Some(d) => {
                let stop = self.t + d;
                self.run_to_time(stop, true)
            }
            None => self.run_to_time(f64::MAX, true),
        }
    }

    fn run_to_time(&mut self, stop: f64, single_step: bool) -> Result<()> {
        if self.mode == AnalysisMode::Dc {
            self.compute_dc_solution()?;

            // Event clocks restart for the transient phase.
            self.reset_modulators();

            self.mode = AnalysisMode::Transient;
            self.rebuild_pending = true;

            if single_step {
                return Ok(());
            }
        }

        if self.rebuild_pending {
            self.gen_matrix()?;
            self.apply_modulators();
        }

        let mut step = self.dt.unwrap_or(self.tunables.h_max);
        let mut ran_step = false;

        while self.t + EPSILON < stop && !(single_step && ran_step) {
            ran_step = true;

            let save_time = self.next_save_time();
            let event_time = save_time.min(self.next_modulator_time());
            step = self.next_step_duration();
            if self.t + step > stop {
                step = stop - self.t;
            }

            if self.ode.is_some() {
                match self.advance_state(step)? {
                    StepOutcome::Committed => {}
                    StepOutcome::Retry => continue,
                }
            } else {
                // No state variables: solve and jump straight to the next
                // interesting time.
                self.t = event_time;
                self.solve_matrix()?;
            }

            // When no save schedule is set, save whatever happens.
            if epsilon_equals(self.t, save_time) || save_time == f64::MAX {
                self.save_states()?;
            }

            self.apply_modulators();
        }

        // The last executed step seeds the next call.
        if let Some(driver) = self.ode.as_mut() {
            driver.h = step;
            self.dt = Some(step);
        }
        Ok(())
    }
}

/// Derivative callback of the circuit's state variables.
///
/// The save/restore bracket makes the callback observably pure: the stepper
/// probes interior `(t, y)` points that are not the step's final result, so
/// the circuit's own time and state are reinstated before returning, even
/// on the error path. The solved vector deliberately keeps the values of
/// the most recent probe; the driver's final end-point evaluation leaves it
/// consistent with the committed step.
impl System for Circuit {
    type Error = Error;

    fn eval(&mut self, t: f64, y: &[f64], dydt: &mut [f64]) -> Result<()> {
        let saved_t = self.t;
        let mut saved_state = std::mem::take(&mut self.state_save);
        saved_state.clear();
        saved_state.extend_from_slice(&self.deq_state);

        self.deq_state.copy_from_slice(y);
        self.t = t;

        let result = self.eval_dydt(dydt);

        self.t = saved_t;
        self.deq_state.copy_from_slice(&saved_state);
        self.state_save = saved_state;

        result
    }
}

impl Circuit {
    fn eval_dydt(&mut self, dydt: &mut [f64]) -> Result<()> {
        self.apply_continuous_modulators();
        self.solve_matrix()?;
        for i in 0..dydt.len() {
            dydt[i] = self.dydt_exprs[i].eval(&self.bindings())?;
        }
        Ok(())
    }
}
