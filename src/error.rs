//! Error types for the hivedir routing core.
//!
//! The routing failures form a closed set: callers are expected to
//! match on the variant, and the string form of each variant is part
//! of the interface (operator tooling greps for it). Driver errors
//! from SQLite and the connection pool are never swallowed; they pass
//! through as [`Error::Database`] and [`Error::Pool`]. The only
//! translation the core performs is uniqueness violations on the
//! catalog inserts, which become [`Error::DimensionExists`] and
//! [`Error::NodeExists`].

use crate::schema::Value;
use thiserror::Error;

/// Result type alias for hivedir operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the directory and routing core.
#[derive(Error, Debug)]
pub enum Error {
    /// The named dimension is not registered in the hive.
    #[error("No such dimension: '{0}'")]
    NoSuchDimension(String),

    /// The dimension exists but the value was never assigned to a node.
    #[error("No such id: dimension '{dimension}', dimension_value {value}")]
    NoSuchId { dimension: String, value: Value },

    /// A directory row points at a node id that is missing from
    /// `node_metadata` for this dimension. The catalog is inconsistent;
    /// the core reports it and repairs nothing.
    #[error("No such node: dimension '{dimension}', node_id {node_id}")]
    NoSuchNode { dimension: String, node_id: i64 },

    /// The dimension has no registered nodes, or a lookup by node name
    /// found none under the dimension.
    #[error("No nodes found for dimension: '{0}'")]
    NoNodesForDimension(String),

    /// An unassign found no directory row matching both the value and
    /// the named node.
    #[error(
        "Node not found for dimension value: dimension '{dimension}' value {value}, node name '{node_name}'"
    )]
    NoSuchNodeForDimensionValue {
        dimension: String,
        value: Value,
        node_name: String,
    },

    /// A dimension with this name is already registered.
    #[error("Dimension exists already: '{0}'")]
    DimensionExists(String),

    /// A node with this name is already registered under the dimension.
    #[error("Node exists already: '{0}'")]
    NodeExists(String),

    /// The catalog changed underneath an operation in a way that cannot
    /// happen in quiescent operation (e.g. a node row vanished between
    /// allocation and URI lookup).
    #[error("Internal inconsistency: {0}")]
    InternalInconsistency(String),

    /// A `db_type` string outside the closed enumeration.
    #[error("Unknown db_type: '{0}'")]
    UnknownDbType(String),

    /// A database URI the driver adapter cannot handle.
    #[error("Invalid database URI: '{0}'")]
    Uri(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
}

impl Error {
    /// Whether this is one of the closed-set routing failures, as
    /// opposed to a passed-through driver or pool error.
    #[must_use]
    pub const fn is_domain(&self) -> bool {
        !matches!(self, Self::Database(_) | Self::Pool(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_error_strings_are_stable() {
        assert_eq!(
            Error::NoSuchDimension("frob".into()).to_string(),
            "No such dimension: 'frob'"
        );
        assert_eq!(
            Error::NoSuchId {
                dimension: "frob".into(),
                value: Value::Int(2),
            }
            .to_string(),
            "No such id: dimension 'frob', dimension_value 2"
        );
        assert_eq!(
            Error::NoSuchNode {
                dimension: "frob".into(),
                node_id: 34,
            }
            .to_string(),
            "No such node: dimension 'frob', node_id 34"
        );
        assert_eq!(
            Error::NoNodesForDimension("frob".into()).to_string(),
            "No nodes found for dimension: 'frob'"
        );
        assert_eq!(
            Error::NoSuchNodeForDimensionValue {
                dimension: "frob".into(),
                value: Value::Int(1),
                node_name: "node42".into(),
            }
            .to_string(),
            "Node not found for dimension value: dimension 'frob' value 1, node name 'node42'"
        );
        assert_eq!(
            Error::DimensionExists("frob".into()).to_string(),
            "Dimension exists already: 'frob'"
        );
        assert_eq!(
            Error::NodeExists("node1".into()).to_string(),
            "Node exists already: 'node1'"
        );
    }

    #[test]
    fn string_values_render_quoted() {
        let err = Error::NoSuchId {
            dimension: "ProductType".into(),
            value: Value::Text("knife".into()),
        };
        assert_eq!(
            err.to_string(),
            "No such id: dimension 'ProductType', dimension_value 'knife'"
        );
    }

    #[test]
    fn driver_errors_are_not_domain() {
        let err = Error::Database(rusqlite::Error::QueryReturnedNoRows);
        assert!(!err.is_domain());
        assert!(Error::NoSuchDimension("x".into()).is_domain());
    }
}
