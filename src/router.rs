//! The routing API: administrative mutations plus value-to-node
//! resolution.
//!
//! Everything here composes the hive store, the directory store and
//! the allocator. Handles are passed in explicitly; the router keeps
//! no state of its own.
//!
//! Resolution comes in two shapes:
//!
//! - [`get_engine`]: read-only. Dimension lookup, directory probe,
//!   node lookup, connect. No write, no lock, no side effect on
//!   failure.
//! - [`assign_node`]: get-or-insert. The directory probe and the
//!   insert happen inside one write transaction on the directory
//!   database, so concurrent callers for the same value agree on a
//!   single winner and every caller returns the same node.

use crate::allocator::{NodePicker, RandomPicker};
use crate::directory::Directory;
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::hive::Hive;
use crate::schema::{DbType, Value};
use tracing::debug;

/// Create (or re-open) the hive at `hive_uri`, installing the
/// metadata tables if they are missing.
///
/// # Errors
///
/// URI or driver errors pass through.
pub fn create_hive(hive_uri: &str) -> Result<Hive> {
    Hive::create(hive_uri)
}

/// Create (or re-open) the directory database at `directory_uri` and
/// materialise the primary-index table for `dimension_name`, its `id`
/// column typed per `db_type`. Idempotent.
///
/// # Errors
///
/// URI or driver errors pass through.
pub fn create_primary_index(
    directory_uri: &str,
    dimension_name: &str,
    db_type: DbType,
) -> Result<Directory> {
    Directory::create_primary_index(directory_uri, dimension_name, db_type)
}

/// Register a dimension in the hive, returning its id.
///
/// Does not materialise the directory table; call
/// [`create_primary_index`] for that.
///
/// # Errors
///
/// [`Error::DimensionExists`] if the name is taken.
pub fn create_dimension(
    hive: &Hive,
    dimension_name: &str,
    directory_uri: &str,
    db_type: DbType,
) -> Result<i64> {
    hive.insert_dimension(dimension_name, directory_uri, db_type)
}

/// Register a node under a dimension, returning its id.
///
/// Takes the dimension id; resolving a dimension name is the
/// caller's job (the CLI does it via [`Hive::dimension`]).
///
/// # Errors
///
/// [`Error::NodeExists`] if the `(dimension, name)` pair is taken.
pub fn create_node(hive: &Hive, dimension_id: i64, node_name: &str, node_uri: &str) -> Result<i64> {
    hive.insert_node(dimension_id, node_name, node_uri)
}

/// Resolve `value` to an engine connected to its assigned node.
///
/// # Errors
///
/// [`Error::NoSuchDimension`] for an unregistered dimension,
/// [`Error::NoSuchId`] for an unassigned value,
/// [`Error::NoSuchNode`] when the directory points at a node missing
/// from the hive catalog.
pub fn get_engine(hive: &Hive, dimension_name: &str, value: &Value) -> Result<Engine> {
    let dimension = hive.dimension(dimension_name)?;
    let directory = Directory::open(&dimension.index_uri)?;
    let node_id = directory
        .node_for(&dimension.name, value)?
        .ok_or_else(|| Error::NoSuchId {
            dimension: dimension.name.clone(),
            value: value.clone(),
        })?;
    let node_uri = hive.node_uri(&dimension, node_id)?;
    debug!(dimension = %dimension.name, %value, node_id, "routed");
    Engine::open(&node_uri)
}

/// Resolve `value` to an engine, assigning it to a node first if it
/// has none, using uniform random allocation.
///
/// # Errors
///
/// [`Error::NoSuchDimension`] for an unregistered dimension,
/// [`Error::NoNodesForDimension`] when allocation finds no nodes.
pub fn assign_node(hive: &Hive, dimension_name: &str, value: &Value) -> Result<Engine> {
    assign_node_with(hive, dimension_name, value, &RandomPicker)
}

/// [`assign_node`] with an explicit allocation policy.
///
/// The picker runs inside the directory's assignment transaction and
/// only for values that are not yet assigned.
///
/// # Errors
///
/// As [`assign_node`], plus whatever the picker returns.
pub fn assign_node_with(
    hive: &Hive,
    dimension_name: &str,
    value: &Value,
    picker: &dyn NodePicker,
) -> Result<Engine> {
    let dimension = hive.dimension(dimension_name)?;
    let directory = Directory::open(&dimension.index_uri)?;
    let node_id = directory.assign(&dimension.name, value, || {
        picker.pick_node(hive, &dimension)
    })?;
    // The node was present when the picker chose it (or when the row
    // was first inserted). Its disappearance here means an admin
    // deleted it mid-flight; that is a catalog inconsistency, not a
    // routing miss.
    let node_uri = hive.node_uri(&dimension, node_id).map_err(|err| match err {
        Error::NoSuchNode { dimension, node_id } => Error::InternalInconsistency(format!(
            "node {node_id} vanished from dimension '{dimension}' during assignment"
        )),
        other => other,
    })?;
    Engine::open(&node_uri)
}

/// Remove the assignment of `value` to the node named `node_name`.
///
/// Touches only the directory row; data already written to the node
/// stays where it is.
///
/// # Errors
///
/// [`Error::NoSuchDimension`] for an unregistered dimension,
/// [`Error::NoNodesForDimension`] if no node with that name exists
/// under the dimension,
/// [`Error::NoSuchNodeForDimensionValue`] if there was no matching
/// assignment to delete.
pub fn unassign_node(
    hive: &Hive,
    dimension_name: &str,
    value: &Value,
    node_name: &str,
) -> Result<()> {
    let dimension = hive.dimension(dimension_name)?;
    let node_id = hive.node_id_by_name(&dimension, node_name)?;
    let directory = Directory::open(&dimension.index_uri)?;
    if directory.unassign(&dimension.name, value, node_id)? {
        debug!(dimension = %dimension.name, %value, node = node_name, "unassigned");
        Ok(())
    } else {
        Err(Error::NoSuchNodeForDimensionValue {
            dimension: dimension.name.clone(),
            value: value.clone(),
            node_name: node_name.to_string(),
        })
    }
}
