//! Data phase: pumps every table's rows from the source into the target
//! via COPY.
//!
//! Two modes. Parallel (the default) spawns one task per table bounded by a
//! semaphore; each task owns its source connection. Single-transaction
//! (MySQL only) copies every table sequentially inside one REPEATABLE READ
//! read-only transaction for a consistent cross-table snapshot.

use std::sync::Arc;

use futures::TryStreamExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::{Config, SnapshotMode, TypeMappingConfig};
use crate::core::schema::{Column, Schema, Table};
use crate::core::value::SqlValue;
use crate::error::{MigrateError, Result};
use crate::source::{mysql, sqlite, SourceAdapter, SourceConnection};
use crate::target::copy::CopyWriter;
use crate::target::PgPool;

/// Copy every table's rows from source to target.
pub async fn migrate_data(
    adapter: Arc<dyn SourceAdapter>,
    config: Arc<Config>,
    schema: Arc<Schema>,
    pool: Arc<PgPool>,
    workers: usize,
    cancel: CancellationToken,
) -> Result<()> {
    match config.source_snapshot_mode {
        SnapshotMode::SingleTx => migrate_single_tx(adapter, config, schema, pool, cancel).await,
        SnapshotMode::None => migrate_parallel(adapter, config, schema, pool, workers, cancel).await,
    }
}

async fn migrate_parallel(
    adapter: Arc<dyn SourceAdapter>,
    config: Arc<Config>,
    schema: Arc<Schema>,
    pool: Arc<PgPool>,
    workers: usize,
    cancel: CancellationToken,
) -> Result<()> {
    let sem = Arc::new(Semaphore::new(workers.max(1)));
    let mut tasks = JoinSet::new();

    for table_idx in 0..schema.tables.len() {
        let adapter = Arc::clone(&adapter);
        let config = Arc::clone(&config);
        let schema = Arc::clone(&schema);
        let pool = Arc::clone(&pool);
        let sem = Arc::clone(&sem);
        let cancel = cancel.clone();

        tasks.spawn(async move {
            let table = &schema.tables[table_idx];
            let _permit = match sem.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return (table.source_name.clone(), Err(MigrateError::Cancelled)),
            };
            if cancel.is_cancelled() {
                return (table.source_name.clone(), Err(MigrateError::Cancelled));
            }
            let result = copy_table(&*adapter, &config, &pool, table, &cancel).await;
            (table.source_name.clone(), result)
        });
    }

    let mut failed = 0usize;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((_, Ok(_))) => {}
            Ok((table, Err(e))) => {
                error!("table {}: {}", table, e);
                failed += 1;
            }
            Err(e) => {
                error!("streaming task panicked: {}", e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(MigrateError::DataLoadSummary(failed));
    }
    Ok(())
}

async fn migrate_single_tx(
    adapter: Arc<dyn SourceAdapter>,
    config: Arc<Config>,
    schema: Arc<Schema>,
    pool: Arc<PgPool>,
    cancel: CancellationToken,
) -> Result<()> {
    let mut conn = adapter.open(&config.source.dsn).await?;

    conn.execute("SET SESSION TRANSACTION ISOLATION LEVEL REPEATABLE READ")
        .await?;
    conn.execute("START TRANSACTION READ ONLY").await?;
    info!("source snapshot enabled: single_tx (sequential table copy)");

    for table in &schema.tables {
        if let Err(e) = copy_table_from(&*adapter, &config, &pool, &mut conn, table, &cancel).await
        {
            let _ = conn.execute("ROLLBACK").await;
            let _ = conn.close().await;
            return Err(e);
        }
    }

    conn.execute("COMMIT").await?;
    conn.close().await?;
    Ok(())
}

/// Copy one table on its own source connection.
async fn copy_table(
    adapter: &dyn SourceAdapter,
    config: &Config,
    pool: &PgPool,
    table: &Table,
    cancel: &CancellationToken,
) -> Result<u64> {
    let mut conn = adapter.open(&config.source.dsn).await?;
    let result = copy_table_from(adapter, config, pool, &mut conn, table, cancel).await;
    let _ = conn.close().await;
    result
}

/// Copy one table's rows over an already-open source connection.
async fn copy_table_from(
    adapter: &dyn SourceAdapter,
    config: &Config,
    pool: &PgPool,
    conn: &mut SourceConnection,
    table: &Table,
    cancel: &CancellationToken,
) -> Result<u64> {
    let quoted = adapter.quote_source_ident(&table.source_name);

    let total = conn
        .fetch_count(&format!("SELECT COUNT(*) FROM {}", quoted))
        .await
        .map_err(|e| MigrateError::data_load(&table.source_name, e))?;
    info!("  [{}] {} rows to migrate", table.source_name, total);

    if total == 0 {
        info!("  [{}] done (empty)", table.source_name);
        return Ok(0);
    }

    let client = pool.get().await?;
    let target_columns: Vec<String> = table
        .columns
        .iter()
        .map(|c| c.target_name.clone())
        .collect();
    let mut writer = CopyWriter::start(
        &client,
        &config.schema,
        &table.target_name,
        &target_columns,
        total,
        &table.source_name,
    )
    .await?;

    // Column order of SELECT * matches the model: introspection orders by
    // ordinal position.
    let select_sql = format!("SELECT * FROM {}", quoted);

    match conn {
        SourceConnection::MySql(c) => {
            let rows = sqlx::query(&select_sql).fetch(&mut *c);
            pump_rows(
                rows,
                mysql::row_to_values,
                adapter,
                table,
                &config.type_mapping,
                &mut writer,
                cancel,
            )
            .await?;
        }
        SourceConnection::Sqlite(c) => {
            let rows = sqlx::query(&select_sql).fetch(&mut *c);
            pump_rows(
                rows,
                sqlite::row_to_values,
                adapter,
                table,
                &config.type_mapping,
                &mut writer,
                cancel,
            )
            .await?;
        }
    }

    let count = writer.finish().await?;
    info!("  [{}] done ({} rows copied)", table.source_name, count);
    Ok(count)
}

/// Drive one row stream through transform and COPY encoding.
async fn pump_rows<R, S, F>(
    mut rows: S,
    convert: F,
    adapter: &dyn SourceAdapter,
    table: &Table,
    type_map: &TypeMappingConfig,
    writer: &mut CopyWriter,
    cancel: &CancellationToken,
) -> Result<()>
where
    S: futures::Stream<Item = sqlx::Result<R>> + Unpin,
    F: Fn(&R, &[Column]) -> Vec<SqlValue>,
{
    while let Some(row) = rows
        .try_next()
        .await
        .map_err(|e| MigrateError::data_load(&table.source_name, e))?
    {
        if cancel.is_cancelled() {
            return Err(MigrateError::Cancelled);
        }

        let raw = convert(&row, &table.columns);
        let mut values = Vec::with_capacity(raw.len());
        for (val, col) in raw.into_iter().zip(&table.columns) {
            let transformed = adapter.transform_value(val, col, type_map).map_err(|e| {
                MigrateError::data_load(
                    &table.source_name,
                    format!("column {}: {}", col.source_name, e),
                )
            })?;
            values.push(transformed);
        }

        writer.write_row(&values).await?;
    }
    Ok(())
}
