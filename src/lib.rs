//! hivedir - directory and routing layer for horizontally partitioned
//! ("sharded") relational databases.
//!
//! A *hive* is a catalog database that knows, for each partitioning
//! axis (*dimension*), which back-end databases (*nodes*) exist and
//! where the *directory* lives: one table per dimension mapping each
//! dimension value to the node that stores its rows. Given a value,
//! the router resolves (or allocates) its node and hands back a
//! pooled connection; what the caller runs on the node is their own
//! business.
//!
//! # Architecture
//!
//! - [`engine`] - pooled SQL engine, the driver adapter
//! - [`schema`] - declarative catalog: hive tables and the per-dimension
//!   primary-index template
//! - [`hive`] - hive store (dimension and node metadata)
//! - [`directory`] - directory store (primary-index tables, locked
//!   get-or-insert assignment)
//! - [`allocator`] - node allocation policy
//! - [`router`] - the public routing and admin operations
//! - [`cli`] - command-line front-end (`create-hive`,
//!   `create-dimension`, `create-node`)
//! - [`error`] - the closed error taxonomy
//!
//! # Example
//!
//! ```no_run
//! use hivedir::{DbType, Value};
//!
//! # fn main() -> hivedir::Result<()> {
//! let hive = hivedir::create_hive("sqlite:///tmp/hive.db")?;
//! hivedir::create_primary_index("sqlite:///tmp/hive.db", "frob", DbType::Integer)?;
//! let dim = hivedir::create_dimension(&hive, "frob", "sqlite:///tmp/hive.db", DbType::Integer)?;
//! hivedir::create_node(&hive, dim, "node1", "sqlite:///tmp/node1.db")?;
//!
//! // First touch allocates, later touches route.
//! let node = hivedir::assign_node(&hive, "frob", &Value::Int(1))?;
//! assert_eq!(node.url(), hivedir::get_engine(&hive, "frob", &Value::Int(1))?.url());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod allocator;
pub mod cli;
pub mod directory;
pub mod engine;
pub mod error;
pub mod hive;
pub mod router;
pub mod schema;

pub use directory::Directory;
pub use engine::Engine;
pub use error::{Error, Result};
pub use hive::{Dimension, Hive};
pub use router::{
    assign_node, assign_node_with, create_dimension, create_hive, create_node,
    create_primary_index, get_engine, unassign_node,
};
pub use schema::{DbType, Value};
