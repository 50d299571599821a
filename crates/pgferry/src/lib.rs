//! # pgferry
//!
//! MySQL/SQLite to PostgreSQL migration library.
//!
//! pgferry is a one-shot migration tool: it introspects a source database,
//! reproduces an equivalent schema in PostgreSQL, bulk-loads every table
//! through the COPY binary protocol, and installs constraints, indexes,
//! sequences, and triggers in a post-load phase. Features:
//!
//! - **Bulk transfers** using the PostgreSQL COPY binary protocol
//! - **Parallel per-table streaming** with a bounded worker pool
//! - **Single-transaction snapshots** (`source_snapshot_mode = "single_tx"`, MySQL)
//! - **Load-then-constrain sequencing**: PKs, indexes, and FKs after the data
//! - **Orphan cleanup** before FK creation for sources that tolerated violations
//! - **SQL hooks** at four named phases with `{{schema}}` templating
//!
//! ## Example
//!
//! ```rust,no_run
//! use pgferry::{Config, Migrator};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), pgferry::MigrateError> {
//!     let config = Config::load("migration.toml")?;
//!     let migrator = Migrator::new(config)?;
//!     migrator.run(CancellationToken::new()).await
//! }
//! ```

pub mod compat;
pub mod config;
pub mod core;
pub mod error;
pub mod hooks;
pub mod orchestrator;
pub mod source;
pub mod stream;
pub mod target;

// Re-exports for convenient access
pub use crate::config::{
    Config, EnumMode, OnSchemaExists, SetMode, SnapshotMode, SourceType, TypeMappingConfig,
};
pub use crate::core::schema::{Column, ForeignKey, Index, Schema, SourceObjects, Table};
pub use crate::core::value::SqlValue;
pub use crate::error::{MigrateError, Result};
pub use crate::orchestrator::Migrator;
pub use crate::source::{new_source_db, SourceAdapter, SourceConnection};
