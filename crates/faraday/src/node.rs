//! Circuit junctions.

use faraday_core::ComponentId;

/// A junction between component terminals.
///
/// A free node's voltage lives in the solved vector once the matrix has
/// been built; a fixed node owns its voltage outright and is excluded from
/// KCL. The adjacency list records, per connected component, whether
/// conventional current through that component *enters* this node.
#[derive(Debug, Default)]
pub(crate) struct Node {
    pub(crate) fixed: bool,
    pub(crate) fixed_voltage: f64,
    /// Connected components and their direction bits (true = entering).
    pub(crate) connections: Vec<(ComponentId, bool)>,
    pub(crate) auto_save: bool,
    pub(crate) v_hist: Vec<f64>,
    /// Slot in the solved vector; bound by the matrix build.
    pub(crate) slot: Option<usize>,
}

impl Node {
    /// Free (KCL-solved) node.
    pub(crate) fn free() -> Self {
        Node::default()
    }

    /// Node pinned to a constant voltage.
    pub(crate) fn fixed(voltage: f64) -> Self {
        Node {
            fixed: true,
            fixed_voltage: voltage,
            ..Node::default()
        }
    }
}
