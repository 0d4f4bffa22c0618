//! Node/component wiring and chain construction.
//!
//! A component's `top` terminal is wired *from* a node (conventional
//! current leaves the node into the component) and its `bot` terminal is
//! wired *to* a node (current enters that node). [`Circuit::chain`] strings
//! nodes and components together the way netlists read, inventing internal
//! nodes between consecutive components.

use faraday_core::{ComponentId, NodeId};

use crate::circuit::Circuit;
use crate::error::{Error, Result};

impl Circuit {
    /// Wire `comp`'s top terminal to `node`.
    pub fn wire_from(&mut self, node: NodeId, comp: ComponentId) -> Result<()> {
        if node.circuit() != self.id || comp.circuit() != self.id {
            return Err(Error::WrongCircuit);
        }
        if self.components[comp.index()].top.is_some() {
            return Err(Error::DoubleConnection);
        }
        self.topology_changed();
        self.components[comp.index()].top = Some(node);
        // Current through the component leaves this node.
        self.nodes[node.index()].connections.push((comp, false));
        Ok(())
    }

    /// Wire `comp`'s bottom terminal to `node`.
    pub fn wire_to(&mut self, comp: ComponentId, node: NodeId) -> Result<()> {
        if node.circuit() != self.id || comp.circuit() != self.id {
            return Err(Error::WrongCircuit);
        }
        if self.components[comp.index()].top == Some(node) {
            return Err(Error::SelfConnection);
        }
        if self.components[comp.index()].bot.is_some() {
            return Err(Error::DoubleConnection);
        }
        self.topology_changed();
        self.components[comp.index()].bot = Some(node);
        // Current through the component enters this node.
        self.nodes[node.index()].connections.push((comp, true));
        Ok(())
    }

    /// Swap a component's terminals, negating every direction bit it
    /// contributes. Applying `flip` twice restores the original wiring.
    pub fn flip(&mut self, comp: ComponentId) {
        assert_eq!(comp.circuit(), self.id, "component handle from a different circuit");
        self.topology_changed();

        let c = &mut self.components[comp.index()];
        std::mem::swap(&mut c.top, &mut c.bot);
        let (top, bot) = (c.top, c.bot);

        for node in [top, bot].into_iter().flatten() {
            for entry in &mut self.nodes[node.index()].connections {
                if entry.0 == comp {
                    entry.1 = !entry.1;
                }
            }
        }
    }

    /// Start a wiring chain at `node`.
    pub fn chain(&mut self, start: NodeId) -> Chain<'_> {
        Chain {
            circuit: self,
            at: Point::Node(start),
        }
    }
}

enum Point {
    Node(NodeId),
    Comp(ComponentId),
}

/// In-progress wiring chain; see [`Circuit::chain`].
pub struct Chain<'a> {
    circuit: &'a mut Circuit,
    at: Point,
}

impl<'a> Chain<'a> {
    /// Continue the chain through `comp`. Coming from a component, a fresh
    /// internal node is inserted between the two.
    pub fn to(self, comp: ComponentId) -> Result<Chain<'a>> {
        let Chain { circuit, at } = self;
        match at {
            Point::Node(node) => circuit.wire_from(node, comp)?,
            Point::Comp(prev) => {
                let node = circuit.add_node();
                circuit.wire_to(prev, node)?;
                circuit.wire_from(node, comp)?;
            }
        }
        Ok(Chain {
            circuit,
            at: Point::Comp(comp),
        })
    }

    /// Route the chain through an existing node.
    ///
    /// # Panics
    ///
    /// Panics when the chain is already positioned at a node.
    pub fn via(self, node: NodeId) -> Result<Chain<'a>> {
        let Chain { circuit, at } = self;
        match at {
            Point::Comp(comp) => circuit.wire_to(comp, node)?,
            Point::Node(_) => panic!("chain is already at a node; route through a component first"),
        }
        Ok(Chain {
            circuit,
            at: Point::Node(node),
        })
    }

    /// Terminate the chain at `node`.
    ///
    /// # Panics
    ///
    /// Panics when the chain is positioned at a node rather than a
    /// component.
    pub fn end_at(self, node: NodeId) -> Result<()> {
        let Chain { circuit, at } = self;
        match at {
            Point::Comp(comp) => circuit.wire_to(comp, node),
            Point::Node(_) => panic!("chain is already at a node; route through a component first"),
        }
    }
}
