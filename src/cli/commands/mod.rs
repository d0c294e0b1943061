//! Command handlers, one module per sub-command.

pub mod create_dimension;
pub mod create_hive;
pub mod create_node;
