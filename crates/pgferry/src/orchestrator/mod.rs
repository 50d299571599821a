//! Pipeline orchestrator.
//!
//! Wires the phases in order: introspect, report, create tables, hooks,
//! stream data, post-load. The only branching is on the run mode
//! (full / schema_only / data_only); every dialect difference is behind the
//! source adapter.

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::compat;
use crate::config::{Config, SnapshotMode};
use crate::core::schema::Schema;
use crate::error::{MigrateError, Result};
use crate::hooks;
use crate::source::{new_source_db, SourceAdapter};
use crate::stream;
use crate::target::{ddl, post, PgPool};

/// One-shot migration runner.
pub struct Migrator {
    config: Arc<Config>,
}

impl Migrator {
    /// Create a migrator from a validated configuration.
    pub fn new(config: Config) -> Result<Self> {
        Ok(Self {
            config: Arc::new(config),
        })
    }

    /// Run the migration to completion or first error.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        let start = Instant::now();
        let config = &self.config;

        let adapter = new_source_db(config);
        adapter.validate_type_mapping(&config.type_mapping)?;

        if config.source_snapshot_mode == SnapshotMode::SingleTx
            && !adapter.supports_single_tx_snapshot()
        {
            return Err(MigrateError::Config(format!(
                "source_snapshot_mode = \"single_tx\" is not supported for {} sources",
                adapter.display_name()
            )));
        }

        let workers = effective_workers(config.workers, &*adapter);

        info!("pgferry — {} to PostgreSQL migration", adapter.display_name());
        info!(
            "config: workers={} schema={} on_schema_exists={:?} schema_only={} data_only={} \
             snapshot_mode={:?} unlogged_tables={} preserve_defaults={} add_unsigned_checks={} \
             clean_orphans={} replicate_on_update_current_timestamp={}",
            workers,
            config.schema,
            config.on_schema_exists,
            config.schema_only,
            config.data_only,
            config.source_snapshot_mode,
            config.unlogged_tables,
            config.preserve_defaults,
            config.add_unsigned_checks,
            config.clean_orphans,
            config.replicate_on_update_current_timestamp,
        );

        // 1. Introspect the source.
        let db_name = adapter.extract_db_name(&config.source.dsn)?;
        info!("connecting to {}...", adapter.display_name());
        let mut conn = adapter.open(&config.source.dsn).await?;

        info!(
            "introspecting {} schema '{}'...",
            adapter.display_name(),
            db_name
        );
        let schema = adapter.introspect_schema(&mut conn, &db_name).await?;
        info!("found {} tables", schema.tables.len());
        for table in &schema.tables {
            info!(
                "  {} -> {} ({} cols, {} indexes, {} fks)",
                table.source_name,
                table.target_name,
                table.columns.len(),
                table.indexes.len(),
                table.foreign_keys.len()
            );
        }

        let objects = adapter
            .introspect_source_objects(&mut conn, &db_name)
            .await?;

        // Introspection connection is done; the data phase opens its own.
        conn.close().await?;

        // 2. Compatibility report.
        report_warnings(&schema, config, &objects);

        // 3. Whole-schema type check before any target write.
        let type_errors =
            compat::collect_unsupported_type_errors(&schema, &*adapter, &config.type_mapping);
        if !type_errors.is_empty() {
            return Err(MigrateError::UnsupportedTypes(type_errors));
        }

        if cancel.is_cancelled() {
            return Err(MigrateError::Cancelled);
        }

        // 4. Connect the target.
        info!("connecting to PostgreSQL...");
        let pool = Arc::new(PgPool::connect(&config.target.dsn, workers + 4).await?);
        let schema = Arc::new(schema);

        // 5. Schema DDL.
        if !config.data_only {
            info!("preparing schema '{}'...", config.schema);
            pool.prepare_schema(&config.schema, config.on_schema_exists)
                .await?;

            if config.type_mapping.ci_as_citext {
                pool.install_citext().await?;
            }

            info!("creating tables...");
            for table in &schema.tables {
                let sql = ddl::create_table_sql(
                    &*adapter,
                    table,
                    &config.schema,
                    config.unlogged_tables && !config.schema_only,
                    config.preserve_defaults,
                    &config.type_mapping,
                )?;
                info!("  creating {}.{}", config.schema, table.target_name);
                pool.execute(&sql).await.map_err(|e| {
                    MigrateError::post_load("create table", table.target_name.clone(), e, sql.clone())
                })?;
            }
        }

        // 6. Data phase. FK enforcement is suspended for data_only loads so
        // parallel COPY cannot trip over insertion order.
        if config.data_only {
            post::set_all_triggers(&pool, &schema, &config.schema, false).await?;
        }

        if !config.schema_only {
            hooks::run_hook_files(&pool, config, &config.hooks.before_data, "before_data").await?;

            info!("migrating data with {} workers...", workers);
            stream::migrate_data(
                Arc::clone(&adapter),
                Arc::clone(&self.config),
                Arc::clone(&schema),
                Arc::clone(&pool),
                workers,
                cancel.clone(),
            )
            .await?;

            hooks::run_hook_files(&pool, config, &config.hooks.after_data, "after_data").await?;
        }

        // 7. Post-load: constraints, indexes, sequences, triggers, hooks.
        info!("running post-migration steps...");
        post::post_migrate(&pool, &schema, config, &cancel).await?;

        if config.data_only {
            post::set_all_triggers(&pool, &schema, &config.schema, true).await?;
        }

        info!("migration completed in {:.2?}", start.elapsed());
        Ok(())
    }
}

/// Cap the configured worker count to the adapter's maximum (0 = uncapped).
fn effective_workers(configured: usize, adapter: &dyn SourceAdapter) -> usize {
    let configured = configured.max(1);
    match adapter.max_workers() {
        0 => configured,
        cap => configured.min(cap),
    }
}

fn report_warnings(schema: &Schema, config: &Config, objects: &crate::core::schema::SourceObjects) {
    let index_warnings = compat::collect_index_warnings(schema);
    if !index_warnings.is_empty() {
        info!(
            "index compatibility report: {} index(es) may require manual handling",
            index_warnings.len()
        );
        for w in &index_warnings {
            warn!("  {}", w);
        }
    }

    for w in compat::collect_generated_column_warnings(schema) {
        warn!("  {}", w);
    }

    for w in compat::collect_collation_warnings(schema, &config.type_mapping) {
        warn!("  {}", w);
    }

    for w in compat::source_object_warnings(objects) {
        warn!("  {}", w);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{MySqlSource, SqliteSource};

    #[test]
    fn test_effective_workers_uncapped_for_mysql() {
        let adapter = MySqlSource::new(true, "utf8mb4".to_string());
        assert_eq!(effective_workers(6, &adapter), 6);
        assert_eq!(effective_workers(0, &adapter), 1);
    }

    #[test]
    fn test_effective_workers_capped_for_sqlite() {
        let adapter = SqliteSource::new(true);
        assert_eq!(effective_workers(8, &adapter), 1);
        assert_eq!(effective_workers(1, &adapter), 1);
    }
}
