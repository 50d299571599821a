//! Source adapter contract, polymorphic over MySQL and SQLite.
//!
//! Every dialect divergence (metadata source, identifier quoting, value
//! representation, snapshot capability, worker cap) is queryable through
//! [`SourceAdapter`]; the orchestrator never branches on the dialect itself.

pub mod mysql;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Connection, MySqlConnection, SqliteConnection};

use crate::config::{Config, SourceType, TypeMappingConfig};
use crate::core::schema::{Column, Schema, SourceObjects};
use crate::core::value::SqlValue;
use crate::error::Result;

pub use mysql::MySqlSource;
pub use sqlite::SqliteSource;

/// A live connection to the source database.
///
/// Single-connection by design: introspection uses one, and each streaming
/// task opens its own.
pub enum SourceConnection {
    MySql(MySqlConnection),
    Sqlite(SqliteConnection),
}

impl SourceConnection {
    /// Run a query returning a single i64 (row counts).
    pub async fn fetch_count(&mut self, sql: &str) -> Result<i64> {
        match self {
            SourceConnection::MySql(conn) => {
                let (n,): (i64,) = sqlx::query_as(sql).fetch_one(conn).await?;
                Ok(n)
            }
            SourceConnection::Sqlite(conn) => {
                let (n,): (i64,) = sqlx::query_as(sql).fetch_one(conn).await?;
                Ok(n)
            }
        }
    }

    /// Execute a statement, discarding the result.
    pub async fn execute(&mut self, sql: &str) -> Result<()> {
        match self {
            SourceConnection::MySql(conn) => {
                sqlx::query(sql).execute(conn).await?;
            }
            SourceConnection::Sqlite(conn) => {
                sqlx::query(sql).execute(conn).await?;
            }
        }
        Ok(())
    }

    /// Close the connection cleanly.
    pub async fn close(self) -> Result<()> {
        match self {
            SourceConnection::MySql(conn) => conn.close().await?,
            SourceConnection::Sqlite(conn) => conn.close().await?,
        }
        Ok(())
    }
}

/// Capability set over source dialects.
///
/// Implementations are stateless apart from configuration resolved at load
/// time (identifier folding mode, connection charset), so a single adapter
/// is shared across all streaming tasks behind an [`Arc`].
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Human label for logging ("MySQL", "SQLite").
    fn display_name(&self) -> &'static str;

    /// Open a single connection configured for read-only access where the
    /// dialect supports it.
    async fn open(&self, dsn: &str) -> Result<SourceConnection>;

    /// Logical database name for logging and metadata queries.
    fn extract_db_name(&self, dsn: &str) -> Result<String>;

    /// Produce the full in-memory schema model.
    async fn introspect_schema(
        &self,
        conn: &mut SourceConnection,
        db_name: &str,
    ) -> Result<Schema>;

    /// Discover views/routines/triggers that require manual migration.
    async fn introspect_source_objects(
        &self,
        conn: &mut SourceConnection,
        db_name: &str,
    ) -> Result<SourceObjects>;

    /// PostgreSQL type for a source column.
    fn map_type(&self, col: &Column, type_map: &TypeMappingConfig) -> Result<String>;

    /// PostgreSQL DEFAULT expression for a source column, `None` to omit.
    fn map_default(
        &self,
        col: &Column,
        pg_type: &str,
        type_map: &TypeMappingConfig,
    ) -> Result<Option<String>>;

    /// Convert one row value to its target representation.
    fn transform_value(
        &self,
        val: SqlValue,
        col: &Column,
        type_map: &TypeMappingConfig,
    ) -> Result<SqlValue>;

    /// Quote a source identifier for use in source-side queries.
    fn quote_source_ident(&self, name: &str) -> String;

    /// Whether `source_snapshot_mode = "single_tx"` is supported.
    fn supports_single_tx_snapshot(&self) -> bool;

    /// Maximum parallel workers; 0 means uncapped.
    fn max_workers(&self) -> usize;

    /// Reject type-mapping options that do not apply to this dialect.
    fn validate_type_mapping(&self, type_map: &TypeMappingConfig) -> Result<()>;
}

/// Resolve the source adapter for the configured dialect.
pub fn new_source_db(config: &Config) -> Arc<dyn SourceAdapter> {
    match config.source.r#type {
        SourceType::Mysql => Arc::new(MySqlSource::new(
            config.snake_case_identifiers,
            config.source.charset.clone(),
        )),
        SourceType::Sqlite => Arc::new(SqliteSource::new(config.snake_case_identifiers)),
    }
}

/// Single-quote a string as a PostgreSQL literal.
pub(crate) fn pg_literal(v: &str) -> String {
    format!("'{}'", v.replace('\'', "''"))
}

/// Whether a PostgreSQL type accepts an unquoted numeric default.
pub(crate) fn is_numeric_pg_type(pg_type: &str) -> bool {
    matches!(
        pg_type,
        "smallint" | "integer" | "bigint" | "real" | "double precision" | "numeric"
    ) || pg_type.starts_with("numeric(")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pg_literal_escapes_quotes() {
        assert_eq!(pg_literal("plain"), "'plain'");
        assert_eq!(pg_literal("O'Brien"), "'O''Brien'");
    }

    #[test]
    fn test_is_numeric_pg_type() {
        assert!(is_numeric_pg_type("integer"));
        assert!(is_numeric_pg_type("numeric(20)"));
        assert!(is_numeric_pg_type("numeric(10,2)"));
        assert!(is_numeric_pg_type("double precision"));
        assert!(!is_numeric_pg_type("text"));
        assert!(!is_numeric_pg_type("bytea"));
    }
}
