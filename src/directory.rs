//! Directory store: the per-dimension primary-index tables.
//!
//! A [`Directory`] wraps one engine bound to a directory database and
//! operates on the `hive_primary_<dimension>` tables inside it:
//! materialising them, probing them, and running the locked
//! get-or-insert that makes node assignment race-free.

use crate::engine::Engine;
use crate::error::Result;
use crate::schema::{primary_index_table, primary_table_name, quote_ident, DbType, TableDef, Value};
use rusqlite::OptionalExtension;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// Handle to a directory database.
#[derive(Debug)]
pub struct Directory {
    engine: Engine,
    /// Materialised table definitions, cached per handle so repeated
    /// materialisation returns the existing definition.
    tables: Mutex<HashMap<String, TableDef>>,
}

impl Directory {
    /// Attach to the directory database at `uri`.
    ///
    /// # Errors
    ///
    /// Fails only if the URI is invalid or unreachable.
    pub fn open(uri: &str) -> Result<Self> {
        Ok(Self {
            engine: Engine::open(uri)?,
            tables: Mutex::new(HashMap::new()),
        })
    }

    /// Attach to (creating if needed) the directory database at `uri`
    /// and materialise the primary-index table for `dimension_name`.
    ///
    /// Idempotent: repeating the call with the same arguments leaves
    /// an existing table and its rows untouched.
    ///
    /// # Errors
    ///
    /// URI or driver errors pass through.
    pub fn create_primary_index(uri: &str, dimension_name: &str, db_type: DbType) -> Result<Self> {
        let directory = Self::open(uri)?;
        directory.materialize(dimension_name, db_type)?;
        Ok(directory)
    }

    /// The engine bound to the directory database.
    #[must_use]
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Materialise (and cache) the primary-index table definition for
    /// a dimension, creating the table if it is missing.
    ///
    /// A second call with the same dimension name returns the cached
    /// definition without touching the database again.
    ///
    /// # Errors
    ///
    /// Driver errors pass through.
    pub fn materialize(&self, dimension_name: &str, db_type: DbType) -> Result<TableDef> {
        let mut tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        let name = primary_table_name(dimension_name);
        if let Some(existing) = tables.get(&name) {
            return Ok(existing.clone());
        }
        let table = primary_index_table(dimension_name, db_type);
        self.engine.create_all_tables(std::slice::from_ref(&table))?;
        debug!(table = %name, db_type = %db_type, "primary index materialised");
        tables.insert(name, table.clone());
        Ok(table)
    }

    /// Node id assigned to `value`, if any. No lock, no side effect.
    ///
    /// # Errors
    ///
    /// Driver errors pass through (including a missing table).
    pub fn node_for(&self, dimension_name: &str, value: &Value) -> Result<Option<i64>> {
        let table = quote_ident(&primary_table_name(dimension_name));
        let node = self
            .engine
            .conn()?
            .query_row(
                &format!("SELECT node FROM {table} WHERE id = ?1 LIMIT 1"),
                [value],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(node)
    }

    /// Get-or-insert the assignment for `value`, the critical section
    /// of node allocation.
    ///
    /// Runs inside a write transaction: probe for an existing row and
    /// return its node if present; otherwise call `pick` for a node
    /// id, insert the row, and commit. Because the transaction holds
    /// the write lock across probe and insert, concurrent callers for
    /// the same value serialise: exactly one inserts, the rest
    /// observe its row. An `Err` from `pick` aborts and rolls back.
    ///
    /// # Errors
    ///
    /// Whatever `pick` returns, or driver errors.
    pub fn assign<F>(&self, dimension_name: &str, value: &Value, pick: F) -> Result<i64>
    where
        F: FnOnce() -> Result<i64>,
    {
        let table = quote_ident(&primary_table_name(dimension_name));
        self.engine.with_transaction(|tx| {
            let existing = tx
                .query_row(
                    &format!("SELECT node FROM {table} WHERE id = ?1 LIMIT 1"),
                    [value],
                    |row| row.get::<_, i64>(0),
                )
                .optional()?;
            if let Some(node) = existing {
                debug!(dimension = dimension_name, %value, node, "already assigned");
                return Ok(node);
            }
            let node = pick()?;
            tx.execute(
                &format!(
                    "INSERT INTO {table} (id, node, secondary_index_count, last_updated, read_only)
                     VALUES (?1, ?2, 0, ?3, 0)"
                ),
                rusqlite::params![value, node, chrono::Utc::now().naive_utc()],
            )?;
            debug!(dimension = dimension_name, %value, node, "assigned");
            Ok(node)
        })
    }

    /// Delete the assignment row matching both `value` and `node_id`.
    /// Returns whether a row was deleted.
    ///
    /// # Errors
    ///
    /// Driver errors pass through.
    pub fn unassign(&self, dimension_name: &str, value: &Value, node_id: i64) -> Result<bool> {
        let table = quote_ident(&primary_table_name(dimension_name));
        let deleted = self.engine.execute(
            &format!("DELETE FROM {table} WHERE id = ?1 AND node = ?2"),
            rusqlite::params![value, node_id],
        )?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn dir_uri(dir: &TempDir) -> String {
        format!("sqlite://{}", dir.path().join("directory.db").display())
    }

    #[test]
    fn create_primary_index_creates_the_table() {
        let tmp = TempDir::new().unwrap();
        let dir = Directory::create_primary_index(&dir_uri(&tmp), "frob", DbType::Integer).unwrap();
        let tables: Vec<String> = {
            let conn = dir.engine().conn().unwrap();
            let mut stmt = conn
                .prepare("SELECT name FROM sqlite_master WHERE type = 'table'")
                .unwrap();
            let rows = stmt
                .query_map([], |row| row.get(0))
                .unwrap()
                .collect::<rusqlite::Result<_>>()
                .unwrap();
            rows
        };
        assert_eq!(tables, vec!["hive_primary_frob".to_string()]);
    }

    #[test]
    fn create_primary_index_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let uri = dir_uri(&tmp);
        let dir = Directory::create_primary_index(&uri, "frob", DbType::Integer).unwrap();
        dir.assign("frob", &Value::Int(7), || Ok(3)).unwrap();
        drop(dir);

        let dir = Directory::create_primary_index(&uri, "frob", DbType::Integer).unwrap();
        assert_eq!(dir.node_for("frob", &Value::Int(7)).unwrap(), Some(3));
    }

    #[test]
    fn materialize_returns_cached_definition() {
        let tmp = TempDir::new().unwrap();
        let dir = Directory::open(&dir_uri(&tmp)).unwrap();
        let first = dir.materialize("frob", DbType::Integer).unwrap();
        // Second call hits the cache; the key type of the first call wins.
        let second = dir.materialize("frob", DbType::Varchar).unwrap();
        assert_eq!(first.name(), second.name());
        assert_eq!(second.column_type("id").as_deref(), Some("INTEGER"));
    }

    #[test]
    fn assign_inserts_row_with_template_defaults() {
        let tmp = TempDir::new().unwrap();
        let dir = Directory::create_primary_index(&dir_uri(&tmp), "frob", DbType::Integer).unwrap();
        let node = dir.assign("frob", &Value::Int(1), || Ok(42)).unwrap();
        assert_eq!(node, 42);

        let (count, read_only, last_updated): (i64, bool, String) = dir
            .engine()
            .conn()
            .unwrap()
            .query_row(
                "SELECT secondary_index_count, read_only, last_updated
                 FROM hive_primary_frob WHERE id = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!(count, 0);
        assert!(!read_only);
        assert!(!last_updated.is_empty());
    }

    #[test]
    fn assign_existing_value_skips_the_picker() {
        let tmp = TempDir::new().unwrap();
        let dir = Directory::create_primary_index(&dir_uri(&tmp), "frob", DbType::Integer).unwrap();
        dir.assign("frob", &Value::Int(1), || Ok(42)).unwrap();
        let node = dir
            .assign("frob", &Value::Int(1), || {
                panic!("picker must not run for an assigned value")
            })
            .unwrap();
        assert_eq!(node, 42);

        let rows: i64 = dir
            .engine()
            .conn()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM hive_primary_frob", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn failed_pick_rolls_back_the_transaction() {
        let tmp = TempDir::new().unwrap();
        let dir = Directory::create_primary_index(&dir_uri(&tmp), "frob", DbType::Integer).unwrap();
        let err = dir
            .assign("frob", &Value::Int(1), || {
                Err(crate::error::Error::NoNodesForDimension("frob".into()))
            })
            .unwrap_err();
        assert_eq!(err.to_string(), "No nodes found for dimension: 'frob'");
        assert_eq!(dir.node_for("frob", &Value::Int(1)).unwrap(), None);
    }

    #[test]
    fn string_keys_work_end_to_end() {
        let tmp = TempDir::new().unwrap();
        let dir =
            Directory::create_primary_index(&dir_uri(&tmp), "ProductType", DbType::Char).unwrap();
        let key = Value::Text("Cutlery".into());
        dir.assign("ProductType", &key, || Ok(5)).unwrap();
        assert_eq!(dir.node_for("ProductType", &key).unwrap(), Some(5));
        assert_eq!(
            dir.node_for("ProductType", &Value::Text("Toys".into()))
                .unwrap(),
            None
        );
    }

    #[test]
    fn unassign_matches_value_and_node() {
        let tmp = TempDir::new().unwrap();
        let dir = Directory::create_primary_index(&dir_uri(&tmp), "frob", DbType::Integer).unwrap();
        dir.assign("frob", &Value::Int(1), || Ok(42)).unwrap();

        // Wrong node id deletes nothing.
        assert!(!dir.unassign("frob", &Value::Int(1), 7).unwrap());
        assert_eq!(dir.node_for("frob", &Value::Int(1)).unwrap(), Some(42));

        assert!(dir.unassign("frob", &Value::Int(1), 42).unwrap());
        assert_eq!(dir.node_for("frob", &Value::Int(1)).unwrap(), None);

        // Already gone.
        assert!(!dir.unassign("frob", &Value::Int(1), 42).unwrap());
    }
}
