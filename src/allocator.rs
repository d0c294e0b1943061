//! Node allocation policy for new dimension values.
//!
//! Allocation is one decision behind one trait: given the hive and a
//! dimension, pick the node id a fresh value lands on. The default is
//! uniform random over the dimension's registered nodes; load-aware or
//! weighted policies replace the picker without touching the router.

use crate::error::{Error, Result};
use crate::hive::{Dimension, Hive};
use rand::seq::SliceRandom;

/// Chooses a node for a value that has no assignment yet.
///
/// Called from inside the directory's assignment transaction, so a
/// picker must not open its own transaction against the directory.
pub trait NodePicker {
    /// Pick a node id from the nodes registered under `dimension`.
    ///
    /// # Errors
    ///
    /// [`Error::NoNodesForDimension`] when the pool is empty.
    fn pick_node(&self, hive: &Hive, dimension: &Dimension) -> Result<i64>;
}

/// Uniform random choice over the dimension's nodes. Stateless.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomPicker;

impl NodePicker for RandomPicker {
    fn pick_node(&self, hive: &Hive, dimension: &Dimension) -> Result<i64> {
        let ids = hive.node_ids(dimension.id)?;
        ids.choose(&mut rand::thread_rng())
            .copied()
            .ok_or_else(|| Error::NoNodesForDimension(dimension.name.clone()))
    }
}
