//! CLI definitions using clap.

use crate::schema::DbType;
use clap::{Parser, Subcommand};

pub mod commands;

/// hivedir - directory and routing for partitioned databases
#[derive(Parser, Debug)]
#[command(name = "hivedir", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install the hive metadata schema
    CreateHive {
        /// URI of the hive database
        hive_uri: String,
    },

    /// Register a dimension and materialise its primary index table
    CreateDimension {
        /// URI of the hive database
        hive_uri: String,

        /// Name of the new dimension
        dimension_name: String,

        /// Key column type of the dimension's primary index
        #[arg(value_parser = parse_db_type)]
        db_type: DbType,

        /// URI of the directory database (defaults to HIVE_URI)
        directory_uri: Option<String>,
    },

    /// Register a node under an existing dimension
    CreateNode {
        /// URI of the hive database
        hive_uri: String,

        /// Dimension the node stores values for
        dimension_name: String,

        /// Name of the new node
        node_name: String,

        /// URI of the node database
        node_uri: String,
    },
}

/// Parse a `db_type` argument against the closed enumeration
/// (case-sensitive), so a bad value fails argument parsing rather
/// than surfacing later as a runtime error.
fn parse_db_type(s: &str) -> Result<DbType, String> {
    s.parse().map_err(|_| {
        let expected: Vec<&str> = DbType::ALL.iter().map(|t| t.as_str()).collect();
        format!("must be one of: {}", expected.join(", "))
    })
}
