//! Symbolic matrix assembly and the numeric evaluate/factorize/solve path.
//!
//! `gen_matrix` walks the topology once and emits, per matrix cell, an
//! [`Expression`] over live references; `update_matrix` re-evaluates those
//! expressions into a triplet buffer whose positions never move, so the
//! sparse LU keeps its symbolic factorization until the next topology
//! change.

use nalgebra::DVector;

use faraday_core::{AnalysisMode, Bindings, ComponentId, NodeId, Ref, Term};
use faraday_solver::CachedSparseLu;

use crate::circuit::Circuit;
use crate::component::Component;
use crate::error::{Error, Result};
use crate::node::Node;

/// Evaluation view over the circuit state backing expression references.
pub(crate) struct EvalBindings<'a> {
    pub(crate) nodes: &'a [Node],
    pub(crate) components: &'a [Component],
    pub(crate) solved: &'a DVector<f64>,
    pub(crate) state: &'a [f64],
    pub(crate) dt: f64,
}

impl Bindings for EvalBindings<'_> {
    fn node_voltage(&self, node: NodeId) -> f64 {
        let n = &self.nodes[node.index()];
        if n.fixed {
            n.fixed_voltage
        } else {
            let slot = n.slot.expect("free node voltage bound at matrix build");
            self.solved[slot]
        }
    }

    fn component_value(&self, comp: ComponentId) -> f64 {
        self.components[comp.index()].value
    }

    fn initial_cond(&self, comp: ComponentId) -> f64 {
        self.components[comp.index()]
            .device
            .reactive()
            .map(|r| r.initial_cond)
            .unwrap_or(0.0)
    }

    fn state(&self, comp: ComponentId) -> f64 {
        let slot = self.components[comp.index()]
            .state_slot
            .expect("state slot bound at matrix build");
        self.state[slot]
    }

    fn branch_current(&self, comp: ComponentId) -> f64 {
        let slot = self.components[comp.index()]
            .branch_slot
            .expect("branch slot assigned at matrix build");
        self.solved[slot]
    }

    fn step_size(&self) -> f64 {
        self.dt
    }
}

impl Circuit {
    /// Evaluation view over the current circuit state.
    pub(crate) fn bindings(&self) -> EvalBindings<'_> {
        EvalBindings {
            nodes: &self.nodes,
            components: &self.components,
            solved: &self.solved_vec,
            state: &self.deq_state,
            dt: self.dt.unwrap_or(self.tunables.h_max),
        }
    }

    /// Rebuild the symbolic matrix from the topology.
    pub(crate) fn gen_matrix(&mut self) -> Result<()> {
        for c in &self.components {
            if !c.fully_connected() {
                return Err(Error::NotConnected);
            }
        }

        // Count variables: one per node, plus one branch current per
        // component that is voltage-defined in the current mode.
        let n_nodes = self.nodes.len();
        let mut n_vars = n_nodes;
        let mut n_state = 0;
        let mut vsources: Vec<ComponentId> = Vec::new();

        for i in 0..self.components.len() {
            let id = ComponentId::new(self.id, i);
            let pins = self.components[i].pins(id);
            let voltage_defined = !self.components[i].device.v_expr(pins, self.mode).is_empty();

            let c = &mut self.components[i];
            c.branch_slot = None;
            c.state_slot = None;
            if voltage_defined {
                c.branch_slot = Some(n_vars);
                vsources.push(id);
                n_vars += 1;
            }
            if c.device.is_integrating() {
                n_state += 1;
            }
        }
        self.n_vars = n_vars;

        log::debug!(
            "building MNA system: {} nodes, {} branch currents, {} state variables ({:?})",
            n_nodes,
            n_vars - n_nodes,
            n_state,
            self.mode
        );

        // Reset containers. Numeric vectors keep their contents when the
        // size is unchanged, so the DC solution survives the transient
        // rebuild.
        self.expr_mat.clear();
        self.expr_vec.clear();
        self.expr_vec.resize(n_vars, Default::default());
        if self.eval_vec.len() != n_vars {
            self.eval_vec = DVector::zeros(n_vars);
        }
        if self.solved_vec.len() != n_vars {
            self.solved_vec = DVector::zeros(n_vars);
        }
        self.deq_state.resize(n_state, 0.0);
        self.state_save.resize(n_state, 0.0);
        self.step_y.resize(n_state, 0.0);
        self.dydt_exprs.clear();
        self.dydt_exprs.resize(n_state, Default::default());
        self.ode = None;
        self.dt = None;

        // Bind node voltages to their solved-vector slots; fixed nodes keep
        // resolving to their own voltage.
        for (i, n) in self.nodes.iter_mut().enumerate() {
            n.slot = Some(i);
        }

        // Transient analysis with state variables needs the ODE driver.
        if self.mode == AnalysisMode::Transient && n_state > 0 {
            let mut driver = faraday_solver::OdeDriver::new(
                self.tunables.stepper,
                n_state,
                self.tunables.h_max,
                self.tunables.e_abs,
                self.tunables.e_rel,
            )?;
            driver.set_hmin(self.tunables.h_min);
            driver.set_hmax(self.tunables.h_max);
            self.dt = Some(driver.h);

            let mut slot = 0;
            for i in 0..self.components.len() {
                if !self.components[i].device.is_integrating() {
                    continue;
                }
                let id = ComponentId::new(self.id, i);
                let pins = self.components[i].pins(id);
                let dydt = self.components[i].device.dydt_expr(pins);
                let c = &mut self.components[i];
                c.state_slot = Some(slot);
                self.deq_state[slot] = c.device.reactive().expect("integrating device").initial_cond;
                self.dydt_exprs[slot] = dydt;
                slot += 1;
            }
            self.ode = Some(driver);
        }

        // Publish each component's voltage and current views.
        for i in 0..self.components.len() {
            let id = ComponentId::new(self.id, i);
            let pins = self.components[i].pins(id);
            let mode = self.mode;
            let circuit_i = if self.components[i].branch_slot.is_some() {
                vec![Term::from(Ref::BranchCurrent(id))].into()
            } else {
                self.components[i].device.i_expr(pins, mode)
            };
            let c = &mut self.components[i];
            c.circuit_v = vec![
                Term::from(Ref::NodeVoltage(pins.top)),
                Term::new(-1.0, vec![Ref::NodeVoltage(pins.bot)], Vec::new()),
            ]
            .into();
            c.circuit_i = circuit_i;
        }

        // Node rows.
        for row in 0..n_nodes {
            if self.nodes[row].fixed {
                // 1 * node voltage = fixed value
                let v = self.nodes[row].fixed_voltage;
                self.expr_mat
                    .entry((row, row))
                    .or_default()
                    .push(Term::constant(1.0));
                self.expr_vec[row].push(Term::from(Ref::Literal(v)));
                continue;
            }

            // KCL: sum the currents of every connected component.
            for ci in 0..self.nodes[row].connections.len() {
                let (comp, entering) = self.nodes[row].connections[ci];
                let c = &self.components[comp.index()];
                let pins = c.pins(comp);
                let mut ie = c.device.i_expr(pins, self.mode);

                // Current leaving the node inverts every term.
                if !entering {
                    for term in &mut ie.terms {
                        term.coeff = -term.coeff;
                    }
                }

                for mut term in ie.terms {
                    // The first node-voltage factor decides the column; the
                    // matrix multiplication reintroduces it.
                    let hit = term.num.iter().position(|r| matches!(r, Ref::NodeVoltage(_)));
                    match hit {
                        Some(pos) => {
                            let col = match term.num.remove(pos) {
                                Ref::NodeVoltage(n) => n.index(),
                                _ => unreachable!("position matched a node voltage"),
                            };
                            self.expr_mat.entry((row, col)).or_default().push(term);
                        }
                        None => {
                            // Constant contribution moves to the opposite
                            // side of the equation.
                            term.coeff = -term.coeff;
                            self.expr_vec[row].push(term);
                        }
                    }
                }
            }
        }

        // Rows and columns of the voltage-defined components.
        for id in vsources {
            let c = &self.components[id.index()];
            let e = c.branch_slot.expect("assigned while counting variables");
            let pins = c.pins(id);
            let v_expr = c.device.v_expr(pins, self.mode);
            let top = pins.top.index();
            let bot = pins.bot.index();

            // Branch current enters the KCL of both terminals, except at
            // fixed nodes whose rows are no longer KCL equations.
            if !self.nodes[top].fixed {
                self.expr_mat
                    .entry((top, e))
                    .or_default()
                    .push(Term::constant(-1.0));
            }
            if !self.nodes[bot].fixed {
                self.expr_mat
                    .entry((bot, e))
                    .or_default()
                    .push(Term::constant(1.0));
            }

            // The extra equation pins the voltage difference.
            self.expr_mat
                .entry((e, top))
                .or_default()
                .push(Term::constant(1.0));
            self.expr_mat
                .entry((e, bot))
                .or_default()
                .push(Term::constant(-1.0));
            self.expr_vec[e] = v_expr;
        }

        self.rebuild_pending = false;

        // The numeric pattern mirrors the symbolic one; later updates only
        // overwrite values in place.
        self.triplets = self.expr_mat.keys().map(|&(r, c)| (r, c, 0.0)).collect();
        self.lu = None;
        Ok(())
    }

    /// Re-evaluate every symbolic entry into the numeric buffers and make
    /// sure a factorization structure exists.
    pub(crate) fn update_matrix(&mut self) -> Result<()> {
        if self.n_vars == 0 {
            return Ok(());
        }

        let bindings = EvalBindings {
            nodes: &self.nodes,
            components: &self.components,
            solved: &self.solved_vec,
            state: &self.deq_state,
            dt: self.dt.unwrap_or(self.tunables.h_max),
        };

        for (i, expr) in self.expr_mat.values().enumerate() {
            self.triplets[i].2 = expr.eval(&bindings)?;
        }
        for (row, expr) in self.expr_vec.iter().enumerate() {
            self.eval_vec[row] = expr.eval(&bindings)?;
        }

        if self.lu.is_none() {
            self.lu = Some(CachedSparseLu::new(self.n_vars, &self.triplets)?);
        }
        Ok(())
    }

    /// Evaluate, factorize and solve; the solved vector then backs every
    /// free node voltage and branch current.
    pub(crate) fn solve_matrix(&mut self) -> Result<()> {
        self.update_matrix()?;
        if self.n_vars == 0 {
            return Ok(());
        }
        let lu = self.lu.as_ref().expect("factorization prepared in update_matrix");
        self.solved_vec = lu.solve(&self.triplets, &self.eval_vec)?;
        Ok(())
    }
}
