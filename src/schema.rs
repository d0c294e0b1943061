//! Declarative schema catalog for the hive and directory databases.
//!
//! The hive metadata tables are fixed; the directory tables are a
//! template stamped out per dimension (`hive_primary_<dimension>`),
//! with the key column type chosen by the dimension's [`DbType`].
//! Table definitions here are data, not SQL strings, so the same
//! definition can be rendered, cached, and compared; rendering happens
//! in [`TableDef::ddl`] and execution in
//! [`Engine::create_all_tables`](crate::engine::Engine::create_all_tables).

use crate::error::{Error, Result};
use chrono::NaiveDateTime;
use rusqlite::types::ToSqlOutput;
use rusqlite::ToSql;
use std::fmt;
use std::str::FromStr;

/// The closed set of key column types a dimension can declare.
///
/// Stored verbatim (case-sensitive) in
/// `partition_dimension_metadata.db_type` and mapped onto a concrete
/// SQL column type by [`DbType::key_type`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DbType {
    Bigint,
    Char,
    Date,
    Double,
    Float,
    Integer,
    Smallint,
    Timestamp,
    Tinyint,
    Varchar,
}

impl DbType {
    /// All members, in catalog order. Used by the CLI for help text
    /// and validation messages.
    pub const ALL: [Self; 10] = [
        Self::Bigint,
        Self::Char,
        Self::Date,
        Self::Double,
        Self::Float,
        Self::Integer,
        Self::Smallint,
        Self::Timestamp,
        Self::Tinyint,
        Self::Varchar,
    ];

    /// The stored (and parsed) string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bigint => "BIGINT",
            Self::Char => "CHAR",
            Self::Date => "DATE",
            Self::Double => "DOUBLE",
            Self::Float => "FLOAT",
            Self::Integer => "INTEGER",
            Self::Smallint => "SMALLINT",
            Self::Timestamp => "TIMESTAMP",
            Self::Tinyint => "TINYINT",
            Self::Varchar => "VARCHAR",
        }
    }

    /// SQL type of the directory `id` column for this key type.
    ///
    /// `DOUBLE` maps to an integer column, not a float one. Existing
    /// hives were materialised with that mapping, so it stays.
    #[must_use]
    pub(crate) const fn key_type(self) -> SqlType {
        match self {
            Self::Bigint | Self::Double | Self::Integer => SqlType::Integer,
            Self::Char | Self::Varchar => SqlType::Text(255),
            Self::Date | Self::Timestamp => SqlType::DateTime,
            Self::Float => SqlType::Float,
            Self::Smallint | Self::Tinyint => SqlType::SmallInt,
        }
    }
}

impl FromStr for DbType {
    type Err = Error;

    /// Case-sensitive: `INTEGER` parses, `integer` does not.
    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::UnknownDbType(s.to_string()))
    }
}

impl fmt::Display for DbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dimension value: the partitioning key of one row.
///
/// The concrete type of a dimension's keys is fixed at runtime by its
/// [`DbType`], so the key is a variant over the supported SQL scalars
/// rather than a compile-time type parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
    DateTime(NaiveDateTime),
}

impl fmt::Display for Value {
    /// Renders the way the value appears in error messages: strings
    /// and datetimes single-quoted, numbers bare.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "'{v}'"),
            Self::DateTime(v) => write!(f, "'{v}'"),
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            Self::Int(v) => v.to_sql(),
            Self::Float(v) => v.to_sql(),
            Self::Text(v) => v.to_sql(),
            Self::DateTime(v) => v.to_sql(),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Self::DateTime(v)
    }
}

/// Concrete SQL column types the catalog renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SqlType {
    Integer,
    SmallInt,
    Float,
    /// VARCHAR with a length.
    Text(u16),
    DateTime,
    Boolean,
}

impl SqlType {
    fn ddl(self) -> String {
        match self {
            Self::Integer => "INTEGER".to_string(),
            Self::SmallInt => "SMALLINT".to_string(),
            Self::Float => "FLOAT".to_string(),
            Self::Text(n) => format!("VARCHAR({n})"),
            Self::DateTime => "TIMESTAMP".to_string(),
            Self::Boolean => "BOOLEAN".to_string(),
        }
    }
}

/// One column of a [`TableDef`].
#[derive(Debug, Clone)]
pub(crate) struct Column {
    name: &'static str,
    ty: SqlType,
    nullable: bool,
    primary_key: bool,
    indexed: bool,
    default_sql: Option<&'static str>,
    references: Option<(&'static str, &'static str)>,
}

impl Column {
    const fn new(name: &'static str, ty: SqlType) -> Self {
        Self {
            name,
            ty,
            nullable: true,
            primary_key: false,
            indexed: false,
            default_sql: None,
            references: None,
        }
    }

    /// Auto-incrementing integer surrogate key.
    const fn primary_key(name: &'static str) -> Self {
        let mut c = Self::new(name, SqlType::Integer);
        c.primary_key = true;
        c.nullable = false;
        c
    }

    const fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    const fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    const fn default_sql(mut self, sql: &'static str) -> Self {
        self.default_sql = Some(sql);
        self
    }

    const fn references(mut self, table: &'static str, column: &'static str) -> Self {
        self.references = Some((table, column));
        self
    }

    fn ddl(&self) -> String {
        if self.primary_key {
            return format!("{} INTEGER PRIMARY KEY", quote_ident(self.name));
        }
        let mut out = format!("{} {}", quote_ident(self.name), self.ty.ddl());
        if !self.nullable {
            out.push_str(" NOT NULL");
        }
        if let Some(default) = self.default_sql {
            out.push_str(" DEFAULT ");
            out.push_str(default);
        }
        out
    }
}

/// A concrete table definition, renderable as idempotent DDL.
#[derive(Debug, Clone)]
pub struct TableDef {
    name: String,
    columns: Vec<Column>,
    uniques: Vec<&'static [&'static str]>,
}

impl TableDef {
    pub(crate) fn new(
        name: impl Into<String>,
        columns: Vec<Column>,
        uniques: Vec<&'static [&'static str]>,
    ) -> Self {
        Self {
            name: name.into(),
            columns,
            uniques,
        }
    }

    /// Table name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// SQL type of the named column, if the table has it.
    #[must_use]
    pub fn column_type(&self, column: &str) -> Option<String> {
        self.columns
            .iter()
            .find(|c| c.name == column)
            .map(|c| c.ty.ddl())
    }

    /// DDL statements creating this table and its indexes. Every
    /// statement is `IF NOT EXISTS`, so applying the definition to a
    /// database that already has it is a no-op.
    #[must_use]
    pub fn ddl(&self) -> Vec<String> {
        let mut body: Vec<String> = self
            .columns
            .iter()
            .map(|c| format!("    {}", c.ddl()))
            .collect();
        for unique in &self.uniques {
            let cols: Vec<String> = unique.iter().map(|c| quote_ident(c)).collect();
            body.push(format!("    UNIQUE ({})", cols.join(", ")));
        }
        for column in &self.columns {
            if let Some((table, col)) = column.references {
                body.push(format!(
                    "    FOREIGN KEY ({}) REFERENCES {} ({})",
                    quote_ident(column.name),
                    quote_ident(table),
                    quote_ident(col)
                ));
            }
        }
        let mut statements = vec![format!(
            "CREATE TABLE IF NOT EXISTS {} (\n{}\n)",
            quote_ident(&self.name),
            body.join(",\n")
        )];
        for column in self.columns.iter().filter(|c| c.indexed) {
            statements.push(format!(
                "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
                quote_ident(&format!("ix_{}_{}", self.name, column.name)),
                quote_ident(&self.name),
                quote_ident(column.name)
            ));
        }
        statements
    }
}

/// Quote an SQL identifier. Dimension names flow into directory table
/// names, so identifiers cannot be assumed to be bare-word safe.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Name of the primary-index table for a dimension.
#[must_use]
pub fn primary_table_name(dimension_name: &str) -> String {
    format!("hive_primary_{dimension_name}")
}

/// The five hive metadata tables.
///
/// `resource_metadata`, `secondary_index_metadata` and
/// `semaphore_metadata` are created but no routing operation touches
/// them; they exist so the on-disk schema matches deployed hives.
#[must_use]
pub fn hive_tables() -> Vec<TableDef> {
    vec![
        TableDef::new(
            "partition_dimension_metadata",
            vec![
                Column::primary_key("id"),
                Column::new("name", SqlType::Text(64)).not_null(),
                Column::new("index_uri", SqlType::Text(255)).not_null(),
                Column::new("db_type", SqlType::Text(64)).not_null(),
            ],
            vec![&["name"]],
        ),
        TableDef::new(
            "node_metadata",
            vec![
                Column::primary_key("id"),
                Column::new("partition_dimension_id", SqlType::Integer)
                    .not_null()
                    .references("partition_dimension_metadata", "id"),
                Column::new("name", SqlType::Text(255)).not_null(),
                Column::new("uri", SqlType::Text(255)).not_null(),
                Column::new("read_only", SqlType::Boolean),
            ],
            vec![&["partition_dimension_id", "name"]],
        ),
        TableDef::new(
            "resource_metadata",
            vec![
                Column::primary_key("id"),
                Column::new("dimension_id", SqlType::Integer)
                    .not_null()
                    .references("partition_dimension_metadata", "id"),
                Column::new("name", SqlType::Text(128)).not_null(),
                Column::new("db_type", SqlType::Text(64)).not_null(),
                Column::new("is_partitioning_resource", SqlType::Boolean).not_null(),
            ],
            vec![],
        ),
        TableDef::new(
            "secondary_index_metadata",
            vec![
                Column::primary_key("id"),
                Column::new("resource_id", SqlType::Integer)
                    .not_null()
                    .references("resource_metadata", "id"),
                Column::new("column_name", SqlType::Text(64)).not_null(),
                Column::new("db_type", SqlType::Text(64)).not_null(),
            ],
            vec![],
        ),
        TableDef::new(
            "semaphore_metadata",
            vec![
                Column::new("read_only", SqlType::Boolean).not_null(),
                Column::new("revision", SqlType::Integer).not_null(),
            ],
            vec![],
        ),
    ]
}

/// Materialise the primary-index table definition for a dimension.
///
/// The `id` column takes its SQL type from `db_type`; the rest of the
/// template is fixed. `UNIQUE (id, node)` matches the layout of
/// already-deployed directory tables.
#[must_use]
pub fn primary_index_table(dimension_name: &str, db_type: DbType) -> TableDef {
    TableDef::new(
        primary_table_name(dimension_name),
        vec![
            Column::new("id", db_type.key_type()).not_null(),
            Column::new("node", SqlType::SmallInt).not_null().indexed(),
            Column::new("secondary_index_count", SqlType::Integer).not_null(),
            Column::new("last_updated", SqlType::DateTime)
                .not_null()
                .indexed(),
            Column::new("read_only", SqlType::Boolean)
                .not_null()
                .default_sql("0"),
        ],
        vec![&["id", "node"]],
    )
}
