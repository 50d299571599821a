//! Configuration validation.

use super::{Config, SnapshotMode};
use crate::error::{MigrateError, Result};

/// Validate the configuration.
///
/// Dialect-specific checks (MySQL-only type mapping flags, snapshot support,
/// worker caps) live on the source adapter; this covers everything that can
/// be decided from the config alone.
pub fn validate(config: &Config) -> Result<()> {
    if config.schema.trim().is_empty() {
        return Err(MigrateError::Config("schema is required".into()));
    }

    if config.schema_only && config.data_only {
        return Err(MigrateError::Config(
            "schema_only and data_only are mutually exclusive".into(),
        ));
    }

    if config.source.dsn.is_empty() {
        return Err(MigrateError::Config("source.dsn is required".into()));
    }
    if config.target.dsn.is_empty() {
        return Err(MigrateError::Config("target.dsn is required".into()));
    }

    if config.source_snapshot_mode == SnapshotMode::SingleTx && config.schema_only {
        return Err(MigrateError::Config(
            "source_snapshot_mode = \"single_tx\" has no effect with schema_only".into(),
        ));
    }

    Ok(())
}
