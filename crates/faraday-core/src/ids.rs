//! Compact handles into a circuit's arenas.
//!
//! Every handle embeds the id of the circuit that minted it, so passing a
//! node or component from one circuit into another is detectable instead of
//! silently aliasing an unrelated arena slot.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-unique identity of a circuit instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CircuitId(u64);

static NEXT_CIRCUIT_ID: AtomicU64 = AtomicU64::new(0);

impl CircuitId {
    /// Mint a fresh circuit identity.
    pub fn fresh() -> Self {
        CircuitId(NEXT_CIRCUIT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

macro_rules! handle_type {
    ($(#[$doc:meta])* $name:ident, $tag:literal) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name {
            circuit: CircuitId,
            index: usize,
        }

        impl $name {
            /// Build a handle for slot `index` of circuit `circuit`.
            pub fn new(circuit: CircuitId, index: usize) -> Self {
                Self { circuit, index }
            }

            /// The circuit this handle belongs to.
            pub fn circuit(&self) -> CircuitId {
                self.circuit
            }

            /// Arena slot index.
            pub fn index(&self) -> usize {
                self.index
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($tag, "{}@{}"), self.index, self.circuit.0)
            }
        }
    };
}

handle_type!(
    /// Handle to a node in a circuit.
    NodeId,
    "n"
);
handle_type!(
    /// Handle to a component in a circuit.
    ComponentId,
    "c"
);
handle_type!(
    /// Handle to a modulator in a circuit.
    ModulatorId,
    "m"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circuit_ids_are_unique() {
        let a = CircuitId::fresh();
        let b = CircuitId::fresh();
        assert_ne!(a, b);
    }

    #[test]
    fn handles_compare_by_circuit_and_index() {
        let c = CircuitId::fresh();
        let other = CircuitId::fresh();
        assert_eq!(NodeId::new(c, 3), NodeId::new(c, 3));
        assert_ne!(NodeId::new(c, 3), NodeId::new(c, 4));
        assert_ne!(NodeId::new(c, 3), NodeId::new(other, 3));
    }
}
