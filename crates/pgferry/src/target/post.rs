//! Post-load installation: constraints, indexes, sequences, and triggers.
//!
//! Runs after the data phase in a fixed order. Each sub-step is gated by the
//! run mode; SQL text generation is kept in pure functions so the emitted
//! statements are testable without a database.

use std::collections::HashSet;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::compat::index_unsupported_reason;
use crate::config::Config;
use crate::core::ident::{qualify, quote};
use crate::core::schema::{Column, ForeignKey, Index, Schema, Table};
use crate::error::{MigrateError, Result};
use crate::hooks;
use crate::target::PgPool;

/// Run every post-load step for the configured mode.
///
/// Order: SET LOGGED, primary keys, indexes, before_fk hooks, orphan
/// cleanup, foreign keys, sequences, unsigned checks, triggers, after_all
/// hooks. In data_only mode only sequences and after_all hooks run.
pub async fn post_migrate(
    pool: &PgPool,
    schema: &Schema,
    config: &Config,
    cancel: &CancellationToken,
) -> Result<()> {
    let pg_schema = config.schema.as_str();

    if config.data_only {
        info!("  sequences...");
        reset_sequences(pool, schema, pg_schema, cancel).await?;
        hooks::run_hook_files(pool, config, &config.hooks.after_all, "after_all").await?;
        return Ok(());
    }

    if !config.schema_only && config.unlogged_tables {
        info!("  SET LOGGED...");
        set_logged(pool, schema, pg_schema, cancel).await?;
    }

    info!("  primary keys...");
    add_primary_keys(pool, schema, pg_schema, cancel).await?;

    info!("  indexes...");
    add_indexes(pool, schema, pg_schema, cancel).await?;

    hooks::run_hook_files(pool, config, &config.hooks.before_fk, "before_fk").await?;

    if !config.schema_only {
        if config.clean_orphans {
            info!("  orphan cleanup...");
            clean_orphans(pool, schema, pg_schema, cancel).await?;
        } else {
            info!("  orphan cleanup skipped (clean_orphans=false)");
        }
    }

    info!("  foreign keys...");
    add_foreign_keys(pool, schema, pg_schema, cancel).await?;

    info!("  sequences...");
    reset_sequences(pool, schema, pg_schema, cancel).await?;

    if config.add_unsigned_checks {
        info!("  unsigned checks...");
        add_unsigned_checks(pool, schema, pg_schema, config, cancel).await?;
    } else {
        info!("  unsigned checks skipped (add_unsigned_checks=false)");
    }

    if config.replicate_on_update_current_timestamp {
        info!("  triggers...");
        create_on_update_triggers(pool, schema, pg_schema, cancel).await?;
    } else {
        info!("  triggers skipped (replicate_on_update_current_timestamp=false)");
    }

    hooks::run_hook_files(pool, config, &config.hooks.after_all, "after_all").await?;

    Ok(())
}

/// Enable or disable all triggers on every table. Disabling suspends FK
/// enforcement so data_only loads can run in parallel.
pub async fn set_all_triggers(
    pool: &PgPool,
    schema: &Schema,
    pg_schema: &str,
    enable: bool,
) -> Result<()> {
    let action = if enable { "ENABLE" } else { "DISABLE" };
    for table in &schema.tables {
        let sql = format!(
            "ALTER TABLE {} {} TRIGGER ALL",
            qualify(pg_schema, &table.target_name),
            action
        );
        exec(pool, "triggers", &table.target_name, &sql).await?;
    }
    Ok(())
}

async fn set_logged(
    pool: &PgPool,
    schema: &Schema,
    pg_schema: &str,
    cancel: &CancellationToken,
) -> Result<()> {
    for table in &schema.tables {
        check_cancelled(cancel)?;
        let sql = format!(
            "ALTER TABLE {} SET LOGGED",
            qualify(pg_schema, &table.target_name)
        );
        exec(pool, "set logged", &table.target_name, &sql).await?;
    }
    Ok(())
}

async fn add_primary_keys(
    pool: &PgPool,
    schema: &Schema,
    pg_schema: &str,
    cancel: &CancellationToken,
) -> Result<()> {
    for table in &schema.tables {
        check_cancelled(cancel)?;
        let Some(pk) = &table.primary_key else {
            continue;
        };
        let sql = add_primary_key_sql(pg_schema, table, pk);
        exec(pool, "primary keys", &table.target_name, &sql).await?;
        info!(
            "    pk ({}) on {}.{}",
            pk.columns.join(", "),
            pg_schema,
            table.target_name
        );
    }
    Ok(())
}

async fn add_indexes(
    pool: &PgPool,
    schema: &Schema,
    pg_schema: &str,
    cancel: &CancellationToken,
) -> Result<()> {
    for table in &schema.tables {
        for idx in &table.indexes {
            check_cancelled(cancel)?;
            if let Some(reason) = index_unsupported_reason(idx) {
                info!(
                    "    skipping index {} on {}.{}: {}",
                    idx.source_name, pg_schema, table.target_name, reason
                );
                continue;
            }

            let (name, sql) = create_index_sql(pg_schema, table, idx);
            exec(pool, "indexes", &name, &sql).await?;
            info!("    index {} on {}.{}", name, pg_schema, table.target_name);
        }
    }
    Ok(())
}

async fn clean_orphans(
    pool: &PgPool,
    schema: &Schema,
    pg_schema: &str,
    cancel: &CancellationToken,
) -> Result<()> {
    for table in &schema.tables {
        for fk in &table.foreign_keys {
            check_cancelled(cancel)?;
            let sql = orphan_cleanup_sql(pg_schema, table, fk);
            let affected = pool.execute(&sql).await.map_err(|e| {
                MigrateError::post_load("orphan cleanup", fk.name.clone(), e, sql.clone())
            })?;
            if affected > 0 {
                let action = if fk.delete_rule.eq_ignore_ascii_case("SET NULL") {
                    "nullified"
                } else {
                    "deleted"
                };
                info!(
                    "    {} {} orphaned rows in {}.{} (fk: {} -> {})",
                    action, affected, pg_schema, table.target_name, fk.name, fk.ref_target_table
                );
            }
        }
    }
    Ok(())
}

async fn add_foreign_keys(
    pool: &PgPool,
    schema: &Schema,
    pg_schema: &str,
    cancel: &CancellationToken,
) -> Result<()> {
    for table in &schema.tables {
        for fk in &table.foreign_keys {
            check_cancelled(cancel)?;
            let sql = add_foreign_key_sql(pg_schema, table, fk);
            exec(pool, "foreign keys", &fk.name, &sql).await?;
            info!(
                "    fk {} on {}.{} -> {}",
                fk.name, pg_schema, table.target_name, fk.ref_target_table
            );
        }
    }
    Ok(())
}

async fn reset_sequences(
    pool: &PgPool,
    schema: &Schema,
    pg_schema: &str,
    cancel: &CancellationToken,
) -> Result<()> {
    for table in &schema.tables {
        for col in &table.columns {
            if !col.extra.to_lowercase().contains("auto_increment") {
                continue;
            }
            check_cancelled(cancel)?;
            let seq_name = format!("{}_{}_seq", table.target_name, col.target_name);
            for sql in sequence_stmts(pg_schema, table, col, &seq_name) {
                exec(pool, "sequences", &seq_name, &sql).await?;
            }
            info!("    sequence {}.{} reset", pg_schema, seq_name);
        }
    }
    Ok(())
}

async fn add_unsigned_checks(
    pool: &PgPool,
    schema: &Schema,
    pg_schema: &str,
    config: &Config,
    cancel: &CancellationToken,
) -> Result<()> {
    for table in &schema.tables {
        for col in &table.columns {
            let Some(expr) = unsigned_check_expr(col, config.type_mapping.tinyint1_as_boolean)
            else {
                continue;
            };
            check_cancelled(cancel)?;

            let name = unsigned_constraint_name(&table.target_name, &col.target_name);
            let add_sql = format!(
                "ALTER TABLE {} ADD CONSTRAINT {} CHECK ({}) NOT VALID",
                qualify(pg_schema, &table.target_name),
                quote(&name),
                expr
            );
            exec(pool, "unsigned checks", &name, &add_sql).await?;

            let validate_sql = format!(
                "ALTER TABLE {} VALIDATE CONSTRAINT {}",
                qualify(pg_schema, &table.target_name),
                quote(&name)
            );
            exec(pool, "unsigned checks", &name, &validate_sql).await?;

            info!("    constraint {} on {}.{}", name, pg_schema, table.target_name);
        }
    }
    Ok(())
}

async fn create_on_update_triggers(
    pool: &PgPool,
    schema: &Schema,
    pg_schema: &str,
    cancel: &CancellationToken,
) -> Result<()> {
    let mut created_funcs: HashSet<String> = HashSet::new();

    for table in &schema.tables {
        for col in &table.columns {
            if !col
                .extra
                .to_lowercase()
                .contains("on update current_timestamp")
            {
                continue;
            }
            check_cancelled(cancel)?;

            let func_name = format!("set_{}", col.target_name);
            if created_funcs.insert(func_name.clone()) {
                let sql = trigger_function_sql(pg_schema, &func_name, &col.target_name);
                exec(pool, "triggers", &func_name, &sql).await?;
            }

            let trig_name = format!("trg_{}_{}", table.target_name, col.target_name);
            let sql = trigger_sql(pg_schema, &trig_name, &table.target_name, &func_name);
            exec(pool, "triggers", &trig_name, &sql).await?;
            info!("    trigger {} on {}.{}", trig_name, pg_schema, table.target_name);
        }
    }
    Ok(())
}

// --- SQL builders ---

fn add_primary_key_sql(pg_schema: &str, table: &Table, pk: &Index) -> String {
    format!(
        "ALTER TABLE {} ADD PRIMARY KEY ({})",
        qualify(pg_schema, &table.target_name),
        quoted_column_list(&pk.columns)
    )
}

fn create_index_sql(pg_schema: &str, table: &Table, idx: &Index) -> (String, String) {
    let name = format!("{}_{}", table.target_name, idx.name);
    let unique = if idx.unique { "UNIQUE " } else { "" };
    let sql = format!(
        "CREATE {}INDEX {} ON {} ({})",
        unique,
        quote(&name),
        qualify(pg_schema, &table.target_name),
        quoted_ordered_column_list(&idx.columns, &idx.column_orders)
    );
    (name, sql)
}

/// UPDATE ... SET NULL or DELETE for rows whose parent is missing, mirroring
/// the FK's ON DELETE rule. The source may have tolerated these rows (e.g.
/// FOREIGN_KEY_CHECKS=0); the target would reject them at FK creation.
fn orphan_cleanup_sql(pg_schema: &str, table: &Table, fk: &ForeignKey) -> String {
    let child = qualify(pg_schema, &table.target_name);
    let parent = qualify(pg_schema, &fk.ref_target_table);

    let join_conds: Vec<String> = fk
        .columns
        .iter()
        .zip(&fk.ref_columns)
        .map(|(col, ref_col)| format!("p.{} = c.{}", quote(ref_col), quote(col)))
        .collect();
    let not_exists = format!(
        "NOT EXISTS (SELECT 1 FROM {} p WHERE {})",
        parent,
        join_conds.join(" AND ")
    );

    let not_nulls: Vec<String> = fk
        .columns
        .iter()
        .map(|col| format!("c.{} IS NOT NULL", quote(col)))
        .collect();
    let where_not_null = not_nulls.join(" OR ");

    if fk.delete_rule.eq_ignore_ascii_case("SET NULL") {
        let set_clauses: Vec<String> = fk
            .columns
            .iter()
            .map(|col| format!("{} = NULL", quote(col)))
            .collect();
        format!(
            "UPDATE {} c SET {} WHERE ({}) AND {}",
            child,
            set_clauses.join(", "),
            where_not_null,
            not_exists
        )
    } else {
        format!(
            "DELETE FROM {} c WHERE ({}) AND {}",
            child, where_not_null, not_exists
        )
    }
}

fn add_foreign_key_sql(pg_schema: &str, table: &Table, fk: &ForeignKey) -> String {
    format!(
        "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {}({}) ON UPDATE {} ON DELETE {}",
        qualify(pg_schema, &table.target_name),
        quote(&fk.name),
        quoted_column_list(&fk.columns),
        qualify(pg_schema, &fk.ref_target_table),
        quoted_column_list(&fk.ref_columns),
        fk.update_rule,
        fk.delete_rule
    )
}

fn sequence_stmts(pg_schema: &str, table: &Table, col: &Column, seq_name: &str) -> [String; 3] {
    [
        format!(
            "CREATE SEQUENCE IF NOT EXISTS {}.{}",
            quote(pg_schema),
            quote(seq_name)
        ),
        format!(
            "SELECT setval('{}.{}', COALESCE((SELECT MAX({}) FROM {}), 0) + 1, false)",
            pg_schema,
            seq_name,
            quote(&col.target_name),
            qualify(pg_schema, &table.target_name)
        ),
        format!(
            "ALTER TABLE {} ALTER COLUMN {} SET DEFAULT nextval('{}.{}')",
            qualify(pg_schema, &table.target_name),
            quote(&col.target_name),
            pg_schema,
            seq_name
        ),
    ]
}

/// Range check expression for an unsigned source column, or `None` when the
/// column needs no check (signed, boolean-coerced tinyint(1), or a type
/// without an unsigned range).
fn unsigned_check_expr(col: &Column, tinyint1_as_boolean: bool) -> Option<String> {
    if !col.is_unsigned() {
        return None;
    }
    if col.data_type == "tinyint"
        && crate::source::mysql::is_tinyint1_column(col)
        && tinyint1_as_boolean
    {
        return None;
    }

    let ident = quote(&col.target_name);
    let expr = match col.data_type.as_str() {
        "tinyint" => format!("{} >= 0 AND {} <= 255", ident, ident),
        "smallint" => format!("{} >= 0 AND {} <= 65535", ident, ident),
        "mediumint" => format!("{} >= 0 AND {} <= 16777215", ident, ident),
        "int" => format!("{} >= 0 AND {} <= 4294967295", ident, ident),
        "bigint" => format!("{} >= 0 AND {} <= 18446744073709551615", ident, ident),
        "decimal" | "float" | "double" => format!("{} >= 0", ident),
        _ => return None,
    };
    Some(expr)
}

/// `ck_<table>_<column>_unsigned`, truncated with an FNV-1a-32 suffix when
/// it would exceed PostgreSQL's 63-character identifier limit.
fn unsigned_constraint_name(table: &str, col: &str) -> String {
    let base = format!("ck_{}_{}", table, col);
    let suffix = "_unsigned";
    let full = format!("{}{}", base, suffix);
    if full.len() <= 63 {
        return full;
    }

    let hash_suffix = format!("_{:08x}", fnv32a(full.as_bytes()));
    let max_base = 63usize
        .saturating_sub(suffix.len())
        .saturating_sub(hash_suffix.len())
        .max(1);
    format!("{}{}{}", &base[..max_base], suffix, hash_suffix)
}

fn fnv32a(data: &[u8]) -> u32 {
    let mut hash: u32 = 0x811c9dc5;
    for &b in data {
        hash ^= u32::from(b);
        hash = hash.wrapping_mul(0x01000193);
    }
    hash
}

fn trigger_function_sql(pg_schema: &str, func_name: &str, col: &str) -> String {
    format!(
        "CREATE OR REPLACE FUNCTION {}.{}() RETURNS TRIGGER AS $fn$ BEGIN NEW.{} = CURRENT_TIMESTAMP; RETURN NEW; END; $fn$ LANGUAGE plpgsql",
        quote(pg_schema),
        quote(func_name),
        quote(col)
    )
}

fn trigger_sql(pg_schema: &str, trig_name: &str, table: &str, func_name: &str) -> String {
    format!(
        "CREATE TRIGGER {} BEFORE UPDATE ON {} FOR EACH ROW EXECUTE FUNCTION {}.{}()",
        quote(trig_name),
        qualify(pg_schema, table),
        quote(pg_schema),
        quote(func_name)
    )
}

fn quoted_column_list(cols: &[String]) -> String {
    cols.iter()
        .map(|c| quote(c))
        .collect::<Vec<_>>()
        .join(", ")
}

fn quoted_ordered_column_list(cols: &[String], orders: &[String]) -> String {
    cols.iter()
        .enumerate()
        .map(|(i, c)| {
            let desc = orders
                .get(i)
                .is_some_and(|o| o.eq_ignore_ascii_case("DESC"));
            if desc {
                format!("{} DESC", quote(c))
            } else {
                quote(c)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

async fn exec(pool: &PgPool, phase: &str, object: &str, sql: &str) -> Result<()> {
    pool.execute(sql)
        .await
        .map_err(|e| MigrateError::post_load(phase, object, e, sql))?;
    Ok(())
}

fn check_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(MigrateError::Cancelled);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_with_fk(delete_rule: &str) -> (Table, ForeignKey) {
        let fk = ForeignKey {
            name: "comments_post_id_fk".to_string(),
            columns: vec!["post_id".to_string()],
            ref_source_table: "Posts".to_string(),
            ref_target_table: "posts".to_string(),
            ref_columns: vec!["id".to_string()],
            update_rule: "CASCADE".to_string(),
            delete_rule: delete_rule.to_string(),
        };
        let table = Table {
            source_name: "Comments".to_string(),
            target_name: "comments".to_string(),
            foreign_keys: vec![fk.clone()],
            ..Default::default()
        };
        (table, fk)
    }

    #[test]
    fn test_add_primary_key_sql() {
        let table = Table {
            target_name: "users".to_string(),
            ..Default::default()
        };
        let pk = Index {
            columns: vec!["id".to_string()],
            is_primary: true,
            ..Default::default()
        };
        assert_eq!(
            add_primary_key_sql("app", &table, &pk),
            "ALTER TABLE app.users ADD PRIMARY KEY (id)"
        );
    }

    #[test]
    fn test_create_index_sql() {
        let table = Table {
            target_name: "posts".to_string(),
            ..Default::default()
        };
        let idx = Index {
            name: "idx_created".to_string(),
            columns: vec!["created_at".to_string(), "id".to_string()],
            column_orders: vec!["DESC".to_string(), "ASC".to_string()],
            unique: false,
            kind: "BTREE".to_string(),
            ..Default::default()
        };
        let (name, sql) = create_index_sql("app", &table, &idx);
        assert_eq!(name, "posts_idx_created");
        assert_eq!(
            sql,
            "CREATE INDEX posts_idx_created ON app.posts (created_at DESC, id)"
        );

        let mut uniq = idx.clone();
        uniq.unique = true;
        let (_, sql) = create_index_sql("app", &table, &uniq);
        assert!(sql.starts_with("CREATE UNIQUE INDEX"));
    }

    #[test]
    fn test_orphan_cleanup_delete() {
        let (table, fk) = table_with_fk("RESTRICT");
        let sql = orphan_cleanup_sql("app", &table, &fk);
        assert_eq!(
            sql,
            "DELETE FROM app.comments c WHERE (c.post_id IS NOT NULL) AND \
             NOT EXISTS (SELECT 1 FROM app.posts p WHERE p.id = c.post_id)"
        );
    }

    #[test]
    fn test_orphan_cleanup_set_null() {
        let (table, fk) = table_with_fk("SET NULL");
        let sql = orphan_cleanup_sql("app", &table, &fk);
        assert_eq!(
            sql,
            "UPDATE app.comments c SET post_id = NULL WHERE (c.post_id IS NOT NULL) AND \
             NOT EXISTS (SELECT 1 FROM app.posts p WHERE p.id = c.post_id)"
        );
    }

    #[test]
    fn test_orphan_cleanup_composite_fk() {
        let fk = ForeignKey {
            name: "fk_multi".to_string(),
            columns: vec!["a".to_string(), "b".to_string()],
            ref_target_table: "parent".to_string(),
            ref_columns: vec!["x".to_string(), "y".to_string()],
            delete_rule: "CASCADE".to_string(),
            ..Default::default()
        };
        let table = Table {
            target_name: "child".to_string(),
            ..Default::default()
        };
        let sql = orphan_cleanup_sql("app", &table, &fk);
        assert!(sql.contains("c.a IS NOT NULL OR c.b IS NOT NULL"));
        assert!(sql.contains("p.x = c.a AND p.y = c.b"));
    }

    #[test]
    fn test_add_foreign_key_sql() {
        let (table, fk) = table_with_fk("SET NULL");
        assert_eq!(
            add_foreign_key_sql("app", &table, &fk),
            "ALTER TABLE app.comments ADD CONSTRAINT comments_post_id_fk FOREIGN KEY (post_id) \
             REFERENCES app.posts(id) ON UPDATE CASCADE ON DELETE SET NULL"
        );
    }

    #[test]
    fn test_sequence_stmts() {
        let table = Table {
            target_name: "users".to_string(),
            ..Default::default()
        };
        let col = Column {
            target_name: "id".to_string(),
            extra: "auto_increment".to_string(),
            ..Default::default()
        };
        let stmts = sequence_stmts("app", &table, &col, "users_id_seq");
        assert_eq!(stmts[0], "CREATE SEQUENCE IF NOT EXISTS app.users_id_seq");
        assert_eq!(
            stmts[1],
            "SELECT setval('app.users_id_seq', COALESCE((SELECT MAX(id) FROM app.users), 0) + 1, false)"
        );
        assert_eq!(
            stmts[2],
            "ALTER TABLE app.users ALTER COLUMN id SET DEFAULT nextval('app.users_id_seq')"
        );
    }

    #[test]
    fn test_unsigned_check_expr() {
        let mk = |data_type: &str, column_type: &str| Column {
            target_name: "n".to_string(),
            data_type: data_type.to_string(),
            column_type: column_type.to_string(),
            ..Default::default()
        };

        assert!(unsigned_check_expr(&mk("int", "int(11)"), false).is_none());
        assert_eq!(
            unsigned_check_expr(&mk("int", "int(10) unsigned"), false).unwrap(),
            "n >= 0 AND n <= 4294967295"
        );
        assert_eq!(
            unsigned_check_expr(&mk("tinyint", "tinyint(3) unsigned"), false).unwrap(),
            "n >= 0 AND n <= 255"
        );
        assert_eq!(
            unsigned_check_expr(&mk("bigint", "bigint(20) unsigned"), false).unwrap(),
            "n >= 0 AND n <= 18446744073709551615"
        );
        assert_eq!(
            unsigned_check_expr(&mk("decimal", "decimal(10,2) unsigned"), false).unwrap(),
            "n >= 0"
        );

        // Boolean-coerced tinyint(1) gets no range check.
        assert!(unsigned_check_expr(&mk("tinyint", "tinyint(1) unsigned"), true).is_none());
        assert!(unsigned_check_expr(&mk("tinyint", "tinyint(1) unsigned"), false).is_some());

        // Types without an unsigned range.
        assert!(unsigned_check_expr(&mk("varchar", "varchar(10) unsigned"), false).is_none());
    }

    #[test]
    fn test_unsigned_constraint_name_short() {
        assert_eq!(
            unsigned_constraint_name("users", "age"),
            "ck_users_age_unsigned"
        );
    }

    #[test]
    fn test_unsigned_constraint_name_truncated() {
        let table = "a".repeat(40);
        let col = "b".repeat(40);
        let name = unsigned_constraint_name(&table, &col);
        assert_eq!(name.len(), 63);
        assert!(name.contains("_unsigned_"));
        assert!(name.starts_with("ck_aaaa"));

        // Deterministic.
        assert_eq!(name, unsigned_constraint_name(&table, &col));

        // Different inputs produce different hashes.
        let other = unsigned_constraint_name(&table, &"c".repeat(40));
        assert_ne!(name, other);
    }

    #[test]
    fn test_fnv32a_known_vector() {
        // FNV-1a test vectors.
        assert_eq!(fnv32a(b""), 0x811c9dc5);
        assert_eq!(fnv32a(b"a"), 0xe40c292c);
    }

    #[test]
    fn test_trigger_sql() {
        assert_eq!(
            trigger_function_sql("app", "set_updated_at", "updated_at"),
            "CREATE OR REPLACE FUNCTION app.set_updated_at() RETURNS TRIGGER AS $fn$ BEGIN \
             NEW.updated_at = CURRENT_TIMESTAMP; RETURN NEW; END; $fn$ LANGUAGE plpgsql"
        );
        assert_eq!(
            trigger_sql("app", "trg_posts_updated_at", "posts", "set_updated_at"),
            "CREATE TRIGGER trg_posts_updated_at BEFORE UPDATE ON app.posts FOR EACH ROW \
             EXECUTE FUNCTION app.set_updated_at()"
        );
    }

    #[test]
    fn test_quoted_ordered_column_list() {
        let cols = vec!["a".to_string(), "order".to_string()];
        let orders = vec!["ASC".to_string(), "DESC".to_string()];
        assert_eq!(
            quoted_ordered_column_list(&cols, &orders),
            "a, \"order\" DESC"
        );
    }
}
