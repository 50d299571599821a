//! CREATE TABLE generation.
//!
//! Tables are created bare: no PKs, FKs, or indexes. Those are installed by
//! the post-load phase so the bulk load runs unconstrained.

use std::fmt::Write;

use crate::compat::{is_ci_collation, is_text_like_pg_type, pg_collation_clause};
use crate::config::{EnumMode, TypeMappingConfig};
use crate::core::ident::quote;
use crate::core::schema::Table;
use crate::error::{MigrateError, Result};
use crate::source::mysql::parse_enum_set_values;
use crate::source::{pg_literal, SourceAdapter};

/// Generate the CREATE TABLE statement for one table.
pub fn create_table_sql(
    adapter: &dyn SourceAdapter,
    table: &Table,
    pg_schema: &str,
    unlogged: bool,
    preserve_defaults: bool,
    type_map: &TypeMappingConfig,
) -> Result<String> {
    let mut sql = String::new();
    let kind = if unlogged { "UNLOGGED TABLE" } else { "TABLE" };
    let _ = write!(
        sql,
        "CREATE {} {}.{} (\n",
        kind,
        quote(pg_schema),
        quote(&table.target_name)
    );

    let last = table.columns.len().saturating_sub(1);
    for (i, col) in table.columns.iter().enumerate() {
        let mut pg_type = adapter
            .map_type(col, type_map)
            .map_err(|e| MigrateError::UnsupportedType(format!("column {}: {}", col.target_name, e)))?;

        // A _ci collation on a text-like column becomes citext unless the
        // operator mapped that collation explicitly.
        let mut collate = String::new();
        if type_map.ci_as_citext
            && is_ci_collation(&col.collation)
            && is_text_like_pg_type(&pg_type)
            && !type_map.collation_map.contains_key(&col.collation)
        {
            pg_type = "citext".to_string();
        } else {
            collate = pg_collation_clause(col, type_map);
        }

        let _ = write!(sql, "  {} {}{}", quote(&col.target_name), pg_type, collate);

        if preserve_defaults && col.default.is_some() {
            let default = adapter
                .map_default(col, &pg_type, type_map)
                .map_err(|e| match e {
                    MigrateError::UnsupportedDefault(msg) => MigrateError::UnsupportedDefault(
                        format!("column {}: {}", col.target_name, msg),
                    ),
                    other => other,
                })?;
            if let Some(expr) = default {
                let _ = write!(sql, " DEFAULT {}", expr);
            }
        }

        if col.data_type == "enum" && type_map.enum_mode == EnumMode::Check {
            let values = parse_enum_set_values(&col.column_type)?;
            let literals: Vec<String> = values.iter().map(|v| pg_literal(v)).collect();
            let _ = write!(
                sql,
                " CHECK ({} IN ({}))",
                quote(&col.target_name),
                literals.join(", ")
            );
        }

        if !col.nullable {
            sql.push_str(" NOT NULL");
        }

        if i < last {
            sql.push(',');
        }
        sql.push('\n');
    }

    sql.push(')');
    Ok(sql)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CollationMode;
    use crate::core::schema::Column;
    use crate::source::MySqlSource;

    fn adapter() -> MySqlSource {
        MySqlSource::new(true, "utf8mb4".to_string())
    }

    fn table(columns: Vec<Column>) -> Table {
        Table {
            source_name: "Users".to_string(),
            target_name: "users".to_string(),
            columns,
            ..Default::default()
        }
    }

    fn int_col(name: &str) -> Column {
        Column {
            source_name: name.to_string(),
            target_name: name.to_string(),
            data_type: "int".to_string(),
            column_type: "int(11)".to_string(),
            nullable: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_basic_create_table() {
        let mut id = int_col("id");
        id.nullable = false;
        let t = table(vec![id, int_col("age")]);
        let sql = create_table_sql(
            &adapter(),
            &t,
            "app",
            false,
            true,
            &TypeMappingConfig::default(),
        )
        .unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE app.users (\n  id integer NOT NULL,\n  age integer\n)"
        );
    }

    #[test]
    fn test_unlogged_and_reserved_identifiers() {
        let mut c = int_col("order");
        c.nullable = false;
        let mut t = table(vec![c]);
        t.target_name = "user".to_string();
        let sql = create_table_sql(
            &adapter(),
            &t,
            "app",
            true,
            true,
            &TypeMappingConfig::default(),
        )
        .unwrap();
        assert_eq!(
            sql,
            "CREATE UNLOGGED TABLE app.\"user\" (\n  \"order\" integer NOT NULL\n)"
        );
    }

    #[test]
    fn test_defaults_emitted_and_suppressed() {
        let mut c = int_col("retries");
        c.default = Some("3".to_string());
        let t = table(vec![c]);

        let sql = create_table_sql(
            &adapter(),
            &t,
            "app",
            false,
            true,
            &TypeMappingConfig::default(),
        )
        .unwrap();
        assert!(sql.contains("retries integer DEFAULT 3"));

        let sql = create_table_sql(
            &adapter(),
            &t,
            "app",
            false,
            false,
            &TypeMappingConfig::default(),
        )
        .unwrap();
        assert!(!sql.contains("DEFAULT"));
    }

    #[test]
    fn test_enum_check_clause() {
        let c = Column {
            source_name: "rating".to_string(),
            target_name: "rating".to_string(),
            data_type: "enum".to_string(),
            column_type: "enum('g','pg','pg-13','r','nc-17')".to_string(),
            nullable: true,
            ..Default::default()
        };
        let t = table(vec![c]);

        let tm = TypeMappingConfig {
            enum_mode: EnumMode::Check,
            ..Default::default()
        };
        let sql = create_table_sql(&adapter(), &t, "app", false, true, &tm).unwrap();
        assert!(sql.contains("rating text CHECK (rating IN ('g', 'pg', 'pg-13', 'r', 'nc-17'))"));

        // Default enum mode: plain text, no CHECK.
        let sql = create_table_sql(&adapter(), &t, "app", false, true, &TypeMappingConfig::default())
            .unwrap();
        assert!(!sql.contains("CHECK"));
    }

    #[test]
    fn test_citext_override() {
        let c = Column {
            source_name: "email".to_string(),
            target_name: "email".to_string(),
            data_type: "varchar".to_string(),
            column_type: "varchar(255)".to_string(),
            char_max_len: 255,
            nullable: true,
            collation: "utf8mb4_general_ci".to_string(),
            ..Default::default()
        };
        let t = table(vec![c]);

        let tm = TypeMappingConfig {
            ci_as_citext: true,
            ..Default::default()
        };
        let sql = create_table_sql(&adapter(), &t, "app", false, true, &tm).unwrap();
        assert!(sql.contains("email citext"));

        // An explicit collation_map entry keeps the original type.
        let mut tm = TypeMappingConfig {
            ci_as_citext: true,
            collation_mode: CollationMode::Auto,
            ..Default::default()
        };
        tm.collation_map
            .insert("utf8mb4_general_ci".to_string(), "und-x-icu".to_string());
        let sql = create_table_sql(&adapter(), &t, "app", false, true, &tm).unwrap();
        assert!(sql.contains("email varchar(255) COLLATE \"und-x-icu\""));
    }

    #[test]
    fn test_bin_collation_clause() {
        let c = Column {
            source_name: "token".to_string(),
            target_name: "token".to_string(),
            data_type: "varchar".to_string(),
            column_type: "varchar(64)".to_string(),
            char_max_len: 64,
            nullable: true,
            collation: "utf8mb4_bin".to_string(),
            ..Default::default()
        };
        let t = table(vec![c]);

        let tm = TypeMappingConfig {
            collation_mode: CollationMode::Auto,
            ..Default::default()
        };
        let sql = create_table_sql(&adapter(), &t, "app", false, true, &tm).unwrap();
        assert!(sql.contains("token varchar(64) COLLATE \"C\""));
    }

    #[test]
    fn test_unsupported_type_propagates() {
        let c = Column {
            source_name: "geo".to_string(),
            target_name: "geo".to_string(),
            data_type: "geometry".to_string(),
            column_type: "geometry".to_string(),
            nullable: true,
            ..Default::default()
        };
        let t = table(vec![c]);
        let err = create_table_sql(
            &adapter(),
            &t,
            "app",
            false,
            true,
            &TypeMappingConfig::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("geo"));
    }
}
