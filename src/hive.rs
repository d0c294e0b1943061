//! Hive store: typed access to the hive metadata tables.
//!
//! A [`Hive`] wraps one engine bound to the hive database and exposes
//! the catalog reads the routing path needs (dimension by name, node
//! by id or name, node list) plus the catalog inserts behind
//! [`create_dimension`](crate::router::create_dimension) and
//! [`create_node`](crate::router::create_node).

use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::schema::{hive_tables, DbType};
use rusqlite::OptionalExtension;
use tracing::{debug, info};

/// One registered dimension, as read back from the hive.
#[derive(Debug, Clone)]
pub struct Dimension {
    /// Surrogate key in `partition_dimension_metadata`.
    pub id: i64,
    /// Dimension name; unique within a hive.
    pub name: String,
    /// URI of the directory database holding `hive_primary_<name>`.
    pub index_uri: String,
    /// Key column type of the dimension's directory table.
    pub db_type: DbType,
}

/// Handle to a hive database.
///
/// Shareable across threads; every operation checks its connection
/// out of the engine's pool.
#[derive(Debug, Clone)]
pub struct Hive {
    engine: Engine,
}

impl Hive {
    /// Attach to the hive at `uri` without creating anything.
    ///
    /// # Errors
    ///
    /// Fails only if the URI is invalid or unreachable.
    pub fn open(uri: &str) -> Result<Self> {
        Ok(Self {
            engine: Engine::open(uri)?,
        })
    }

    /// Attach to the hive at `uri` and install the metadata tables.
    ///
    /// Idempotent: re-creating an existing hive succeeds and leaves
    /// its contents untouched.
    ///
    /// # Errors
    ///
    /// URI or driver errors pass through.
    pub fn create(uri: &str) -> Result<Self> {
        let hive = Self::open(uri)?;
        hive.engine.create_all_tables(&hive_tables())?;
        info!(url = uri, "hive schema installed");
        Ok(hive)
    }

    /// The engine bound to the hive database.
    #[must_use]
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// The hive URI.
    #[must_use]
    pub fn url(&self) -> &str {
        self.engine.url()
    }

    /// Look up a dimension by name.
    ///
    /// # Errors
    ///
    /// [`Error::NoSuchDimension`] if the name is not registered;
    /// [`Error::InternalInconsistency`] if the stored `db_type` falls
    /// outside the closed enumeration.
    pub fn dimension(&self, name: &str) -> Result<Dimension> {
        let conn = self.engine.conn()?;
        let row = conn
            .query_row(
                "SELECT id, name, index_uri, db_type
                 FROM partition_dimension_metadata
                 WHERE name = ?1
                 LIMIT 1",
                [name],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;
        let (id, name, index_uri, db_type) =
            row.ok_or_else(|| Error::NoSuchDimension(name.to_string()))?;
        let db_type = db_type.parse::<DbType>().map_err(|_| {
            Error::InternalInconsistency(format!(
                "dimension '{name}' has unknown db_type '{db_type}'"
            ))
        })?;
        Ok(Dimension {
            id,
            name,
            index_uri,
            db_type,
        })
    }

    /// URI of a node, matched on both node id and owning dimension.
    ///
    /// # Errors
    ///
    /// [`Error::NoSuchNode`] if no node row matches both.
    pub fn node_uri(&self, dimension: &Dimension, node_id: i64) -> Result<String> {
        let conn = self.engine.conn()?;
        let uri = conn
            .query_row(
                "SELECT uri FROM node_metadata
                 WHERE id = ?1 AND partition_dimension_id = ?2
                 LIMIT 1",
                rusqlite::params![node_id, dimension.id],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        uri.ok_or_else(|| Error::NoSuchNode {
            dimension: dimension.name.clone(),
            node_id,
        })
    }

    /// Ids of every node registered under a dimension. An empty list
    /// is a valid result; callers decide whether that is an error.
    ///
    /// # Errors
    ///
    /// Driver errors pass through.
    pub fn node_ids(&self, dimension_id: i64) -> Result<Vec<i64>> {
        let conn = self.engine.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id FROM node_metadata WHERE partition_dimension_id = ?1 ORDER BY id",
        )?;
        let ids = stmt
            .query_map([dimension_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(ids)
    }

    /// Id of the node registered under `dimension` with `node_name`.
    ///
    /// # Errors
    ///
    /// [`Error::NoNodesForDimension`] if no node with that name exists
    /// under the dimension.
    pub fn node_id_by_name(&self, dimension: &Dimension, node_name: &str) -> Result<i64> {
        let conn = self.engine.conn()?;
        let id = conn
            .query_row(
                "SELECT id FROM node_metadata
                 WHERE partition_dimension_id = ?1 AND name = ?2
                 LIMIT 1",
                rusqlite::params![dimension.id, node_name],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        id.ok_or_else(|| Error::NoNodesForDimension(dimension.name.clone()))
    }

    /// Register a dimension. Does not materialise its directory table.
    ///
    /// # Errors
    ///
    /// [`Error::DimensionExists`] on a name collision.
    pub fn insert_dimension(&self, name: &str, index_uri: &str, db_type: DbType) -> Result<i64> {
        let conn = self.engine.conn()?;
        let result = conn.execute(
            "INSERT INTO partition_dimension_metadata (name, index_uri, db_type)
             VALUES (?1, ?2, ?3)",
            rusqlite::params![name, index_uri, db_type.as_str()],
        );
        match result {
            Ok(_) => {
                let id = conn.last_insert_rowid();
                debug!(dimension = name, id, index_uri, "dimension registered");
                Ok(id)
            }
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(Error::DimensionExists(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Register a node under a dimension, writable by default.
    ///
    /// # Errors
    ///
    /// [`Error::NodeExists`] on a `(dimension, name)` collision.
    pub fn insert_node(&self, dimension_id: i64, node_name: &str, node_uri: &str) -> Result<i64> {
        let conn = self.engine.conn()?;
        let result = conn.execute(
            "INSERT INTO node_metadata (partition_dimension_id, name, uri, read_only)
             VALUES (?1, ?2, ?3, 0)",
            rusqlite::params![dimension_id, node_name, node_uri],
        );
        match result {
            Ok(_) => {
                let id = conn.last_insert_rowid();
                debug!(node = node_name, id, dimension_id, uri = node_uri, "node registered");
                Ok(id)
            }
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(Error::NodeExists(node_name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
