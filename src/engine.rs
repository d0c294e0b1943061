//! Pooled database engine, the narrow adapter over the SQL driver.
//!
//! Every database the core touches (hive, directory, node) is reached
//! through an [`Engine`]: a clonable handle over an r2d2 connection
//! pool addressed by URI. The rest of the crate only needs four things
//! from the driver: checked-out connections, statement execution,
//! transactions that serialise concurrent writers, and idempotent
//! schema application. Anything beyond that stays behind this module
//! so a second back-end can slot in without touching the stores.

use crate::error::{Error, Result};
use crate::schema::TableDef;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::TransactionBehavior;
use std::fmt;
use std::path::PathBuf;
use tracing::debug;

/// Where a database URI points.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Backend {
    /// `sqlite:///path/to/file.db`
    SqliteFile(PathBuf),
    /// `sqlite://` with no path.
    SqliteMemory,
}

fn parse_uri(uri: &str) -> Result<Backend> {
    let Some(rest) = uri.strip_prefix("sqlite://") else {
        return Err(Error::Uri(uri.to_string()));
    };
    if rest.is_empty() {
        Ok(Backend::SqliteMemory)
    } else {
        Ok(Backend::SqliteFile(PathBuf::from(rest)))
    }
}

/// A pooled connection handle to one database.
///
/// Cheap to clone (clones share the pool). Dropping the last clone
/// closes the pool and its connections; there is no separate dispose
/// step.
#[derive(Clone)]
pub struct Engine {
    url: String,
    pool: Pool<SqliteConnectionManager>,
}

impl Engine {
    /// Connect to the database at `uri`.
    ///
    /// An initial connection is established eagerly, so an unreachable
    /// URI fails here rather than on first use.
    ///
    /// # Errors
    ///
    /// [`Error::Uri`] for a URI this adapter cannot parse,
    /// [`Error::Pool`] if the database cannot be reached.
    pub fn open(uri: &str) -> Result<Self> {
        let backend = parse_uri(uri)?;
        // Probe with a single direct connection first: an unreachable
        // path fails here immediately instead of stalling the pool
        // through its connection timeout.
        if let Backend::SqliteFile(path) = &backend {
            rusqlite::Connection::open(path)?;
        }
        // An in-memory SQLite database exists per connection, so the
        // pool must never hand out a second one.
        let max_size = match backend {
            Backend::SqliteFile(_) => 8,
            Backend::SqliteMemory => 1,
        };
        let manager = match backend {
            Backend::SqliteFile(path) => SqliteConnectionManager::file(path),
            Backend::SqliteMemory => SqliteConnectionManager::memory(),
        }
        .with_init(|conn| {
            // Foreign keys stay unenforced: the catalog tolerates
            // dangling rows (a node registered under a dimension id
            // that never existed, a directory row whose node was
            // deleted) and the routing errors report them.
            conn.pragma_update(None, "foreign_keys", "OFF")?;
            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.busy_timeout(std::time::Duration::from_secs(5))?;
            Ok(())
        });
        let pool = Pool::builder()
            .max_size(max_size)
            .min_idle(Some(1))
            .build(manager)?;
        debug!(url = uri, "engine opened");
        Ok(Self {
            url: uri.to_string(),
            pool,
        })
    }

    /// The URI this engine was opened with.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Check a connection out of the pool.
    ///
    /// # Errors
    ///
    /// [`Error::Pool`] if the pool is exhausted past its timeout.
    pub fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    /// Execute a single parameterised statement, returning the number
    /// of affected rows.
    ///
    /// # Errors
    ///
    /// Driver errors pass through unchanged.
    pub fn execute<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<usize> {
        Ok(self.conn()?.execute(sql, params)?)
    }

    /// Run `f` inside a transaction: commit on `Ok`, roll back on `Err`.
    ///
    /// SQLite has no `SELECT ... FOR UPDATE`, so the transaction is
    /// opened `IMMEDIATE`: the write lock is taken up front and
    /// concurrent writers queue behind it, which gives the same
    /// at-most-one-winner guarantee a row lock would.
    ///
    /// # Errors
    ///
    /// Whatever `f` returns, or the driver error from begin/commit.
    pub fn with_transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&rusqlite::Transaction<'_>) -> Result<T>,
    {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }

    /// Apply every table definition, creating tables and indexes that
    /// are missing. All DDL is `IF NOT EXISTS`; re-applying a schema
    /// to a populated database leaves its data untouched.
    ///
    /// # Errors
    ///
    /// Driver errors pass through unchanged.
    pub fn create_all_tables(&self, tables: &[TableDef]) -> Result<()> {
        let conn = self.conn()?;
        for table in tables {
            debug!(table = table.name(), url = %self.url, "ensuring table");
            for statement in table.ddl() {
                conn.execute(&statement, [])?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::hive_tables;
    use tempfile::TempDir;

    fn file_uri(dir: &TempDir, name: &str) -> String {
        format!("sqlite://{}", dir.path().join(name).display())
    }

    #[test]
    fn parse_accepts_sqlite_uris_only() {
        assert_eq!(
            parse_uri("sqlite:///tmp/hive.db").unwrap(),
            Backend::SqliteFile(PathBuf::from("/tmp/hive.db"))
        );
        assert_eq!(parse_uri("sqlite://").unwrap(), Backend::SqliteMemory);
        assert!(matches!(
            parse_uri("postgres://localhost/hive"),
            Err(Error::Uri(_))
        ));
        assert!(matches!(parse_uri("fake"), Err(Error::Uri(_))));
    }

    #[test]
    fn open_remembers_the_url() {
        let tmp = TempDir::new().unwrap();
        let uri = file_uri(&tmp, "a.db");
        let engine = Engine::open(&uri).unwrap();
        assert_eq!(engine.url(), uri);
    }

    #[test]
    fn open_fails_for_unreachable_uri() {
        let tmp = TempDir::new().unwrap();
        let uri = format!(
            "sqlite://{}",
            tmp.path().join("no-such-dir").join("a.db").display()
        );
        assert!(Engine::open(&uri).is_err());
    }

    #[test]
    fn execute_and_query_round_trip() {
        let engine = Engine::open("sqlite://").unwrap();
        engine
            .execute("CREATE TABLE t (id INTEGER PRIMARY KEY, v TEXT)", [])
            .unwrap();
        let n = engine
            .execute("INSERT INTO t (v) VALUES (?1)", ["hello"])
            .unwrap();
        assert_eq!(n, 1);
        let got: String = engine
            .conn()
            .unwrap()
            .query_row("SELECT v FROM t WHERE id = 1", [], |row| row.get(0))
            .unwrap();
        assert_eq!(got, "hello");
    }

    #[test]
    fn transaction_commits_on_ok() {
        let engine = Engine::open("sqlite://").unwrap();
        engine.execute("CREATE TABLE t (v INTEGER)", []).unwrap();
        engine
            .with_transaction(|tx| {
                tx.execute("INSERT INTO t (v) VALUES (1)", [])?;
                Ok(())
            })
            .unwrap();
        let count: i64 = engine
            .conn()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM t", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn transaction_rolls_back_on_err() {
        let engine = Engine::open("sqlite://").unwrap();
        engine.execute("CREATE TABLE t (v INTEGER)", []).unwrap();
        let result: Result<()> = engine.with_transaction(|tx| {
            tx.execute("INSERT INTO t (v) VALUES (1)", [])?;
            Err(Error::InternalInconsistency("boom".into()))
        });
        assert!(result.is_err());
        let count: i64 = engine
            .conn()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM t", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn create_all_tables_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let engine = Engine::open(&file_uri(&tmp, "hive.db")).unwrap();
        let tables = hive_tables();
        engine.create_all_tables(&tables).unwrap();
        engine
            .execute(
                "INSERT INTO partition_dimension_metadata (name, index_uri, db_type)
                 VALUES ('frob', 'sqlite://', 'INTEGER')",
                [],
            )
            .unwrap();
        engine.create_all_tables(&tables).unwrap();
        let count: i64 = engine
            .conn()
            .unwrap()
            .query_row(
                "SELECT COUNT(*) FROM partition_dimension_metadata",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }
}
