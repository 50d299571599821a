//! Compatibility reporting: everything the migration cannot translate
//! losslessly is collected here and surfaced to the operator before or
//! during the run, never silently dropped.

use std::collections::BTreeMap;

use crate::config::{CollationMode, TypeMappingConfig};
use crate::core::schema::{Column, Index, Schema, SourceObjects};
use crate::source::SourceAdapter;

/// Collect type-mapping failures across the whole schema so the operator
/// sees the complete list in one shot.
pub fn collect_unsupported_type_errors(
    schema: &Schema,
    adapter: &dyn SourceAdapter,
    type_map: &TypeMappingConfig,
) -> Vec<String> {
    let mut errs = Vec::new();
    for table in &schema.tables {
        for col in &table.columns {
            if let Err(e) = adapter.map_type(col, type_map) {
                errs.push(format!(
                    "{}.{} ({}): {}",
                    table.source_name, col.source_name, col.column_type, e
                ));
            }
        }
    }
    errs
}

/// Why an index cannot be recreated on the target, if it cannot.
pub fn index_unsupported_reason(idx: &Index) -> Option<String> {
    if idx.has_expression {
        return Some("expression index key-parts are not currently supported".to_string());
    }
    if idx.has_prefix {
        return Some("prefix indexes (SUB_PART) are not currently supported".to_string());
    }
    if !idx.kind.is_empty() && idx.kind != "BTREE" {
        return Some(format!("index type {:?} is not supported", idx.kind));
    }
    if idx.columns.is_empty() {
        return Some("index has no plain column key-parts".to_string());
    }
    None
}

/// Indexes that will be skipped, with reasons.
pub fn collect_index_warnings(schema: &Schema) -> Vec<String> {
    let mut warnings = Vec::new();
    for table in &schema.tables {
        for idx in &table.indexes {
            if let Some(reason) = index_unsupported_reason(idx) {
                warnings.push(format!(
                    "{}.{} ({}): {}",
                    table.source_name, idx.source_name, idx.name, reason
                ));
            }
        }
    }
    warnings
}

/// Generated column detection from the Extra marker.
pub fn is_generated_column(col: &Column) -> bool {
    let extra = col.extra.to_lowercase();
    extra.contains("virtual generated") || extra.contains("stored generated")
}

/// Generated columns get materialized as plain data; the expressions are lost.
pub fn collect_generated_column_warnings(schema: &Schema) -> Vec<String> {
    let mut warnings = Vec::new();
    for table in &schema.tables {
        for col in &table.columns {
            if is_generated_column(col) {
                warnings.push(format!(
                    "generated column {}.{} ({}) will be materialized as plain data; generation expression is not recreated",
                    table.source_name, col.source_name, col.extra
                ));
            }
        }
    }
    warnings
}

/// Case-insensitive source collation (`_ci` suffix).
pub fn is_ci_collation(collation: &str) -> bool {
    collation.to_lowercase().ends_with("_ci")
}

/// Whether a PostgreSQL type is text-like and can accept a COLLATE clause
/// (or a citext substitution).
pub fn is_text_like_pg_type(pg_type: &str) -> bool {
    let lower = pg_type.to_lowercase();
    lower == "text" || lower.starts_with("varchar") || lower.starts_with("char")
}

/// COLLATE clause for a column under `collation_mode = "auto"`, empty when
/// no clause should be emitted.
pub fn pg_collation_clause(col: &Column, type_map: &TypeMappingConfig) -> String {
    if type_map.collation_mode != CollationMode::Auto {
        return String::new();
    }
    if col.collation.is_empty() {
        return String::new();
    }

    // Operator-provided mapping takes precedence.
    if let Some(mapped) = type_map.collation_map.get(&col.collation) {
        return format!(" COLLATE \"{}\"", mapped);
    }

    if col.collation.to_lowercase().ends_with("_bin") {
        return " COLLATE \"C\"".to_string();
    }

    // Other collations (including _ci) get no clause; the warning system
    // notifies the operator about the semantic difference.
    String::new()
}

/// Charset/collation report: distinct charsets and collations, `_ci`
/// columns that will become case-sensitive, and unique indexes whose
/// uniqueness semantics may change.
pub fn collect_collation_warnings(schema: &Schema, type_map: &TypeMappingConfig) -> Vec<String> {
    let mut charsets: BTreeMap<String, ()> = BTreeMap::new();
    let mut collations: BTreeMap<String, ()> = BTreeMap::new();
    let mut ci_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut ci_unique_refs: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for table in &schema.tables {
        let mut unique_cols: Vec<&str> = Vec::new();
        if let Some(pk) = &table.primary_key {
            unique_cols.extend(pk.columns.iter().map(String::as_str));
        }
        for idx in &table.indexes {
            if idx.unique {
                unique_cols.extend(idx.columns.iter().map(String::as_str));
            }
        }

        for col in &table.columns {
            if !col.charset.is_empty() {
                charsets.insert(col.charset.clone(), ());
            }
            if col.collation.is_empty() {
                continue;
            }
            collations.insert(col.collation.clone(), ());
            if is_ci_collation(&col.collation) {
                *ci_counts.entry(col.collation.clone()).or_default() += 1;
                if unique_cols.contains(&col.target_name.as_str())
                    && !type_map.collation_map.contains_key(&col.collation)
                {
                    ci_unique_refs
                        .entry(col.collation.clone())
                        .or_default()
                        .push(format!("{}.{}", table.target_name, col.target_name));
                }
            }
        }
    }

    let mut warnings = Vec::new();

    if !charsets.is_empty() {
        let names: Vec<&str> = charsets.keys().map(String::as_str).collect();
        warnings.push(format!("source charsets found: {}", names.join(", ")));
    }
    if !collations.is_empty() {
        let names: Vec<&str> = collations.keys().map(String::as_str).collect();
        warnings.push(format!("source collations found: {}", names.join(", ")));
    }

    for (coll, count) in &ci_counts {
        if type_map.collation_map.contains_key(coll) {
            continue;
        }
        // ci_as_citext rewrites these columns; no warning needed then.
        if type_map.ci_as_citext {
            continue;
        }
        warnings.push(format!(
            "{} column(s) use {} (case-insensitive); PostgreSQL text comparisons are case-sensitive by default",
            count, coll
        ));
    }

    for (coll, refs) in &ci_unique_refs {
        if type_map.ci_as_citext {
            continue;
        }
        warnings.push(format!(
            "unique index/PK on {} column(s) — uniqueness semantics may differ: {}",
            coll,
            refs.join(", ")
        ));
    }

    warnings
}

/// Non-table objects that require manual migration.
pub fn source_object_warnings(objs: &SourceObjects) -> Vec<String> {
    if objs.is_empty() {
        return Vec::new();
    }

    let mut warnings = vec![format!(
        "source contains non-table objects not migrated automatically ({} views, {} routines, {} triggers)",
        objs.views.len(),
        objs.routines.len(),
        objs.triggers.len()
    )];
    for v in &objs.views {
        warnings.push(format!("view: {}", v));
    }
    for r in &objs.routines {
        warnings.push(format!("routine: {}", r));
    }
    for t in &objs.triggers {
        warnings.push(format!("trigger: {}", t));
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::Table;

    fn idx(kind: &str) -> Index {
        Index {
            name: "i".to_string(),
            source_name: "i".to_string(),
            columns: vec!["a".to_string()],
            column_orders: vec!["ASC".to_string()],
            kind: kind.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_index_unsupported_reason() {
        assert!(index_unsupported_reason(&idx("BTREE")).is_none());

        let mut i = idx("BTREE");
        i.has_expression = true;
        assert!(index_unsupported_reason(&i).unwrap().contains("expression"));

        let mut i = idx("BTREE");
        i.has_prefix = true;
        assert!(index_unsupported_reason(&i).unwrap().contains("prefix"));

        assert!(index_unsupported_reason(&idx("FULLTEXT")).unwrap().contains("FULLTEXT"));
        assert!(index_unsupported_reason(&idx("SPATIAL")).is_some());
        assert!(index_unsupported_reason(&idx("HASH")).is_some());

        let mut i = idx("BTREE");
        i.columns.clear();
        assert!(index_unsupported_reason(&i).unwrap().contains("no plain column"));
    }

    #[test]
    fn test_is_generated_column() {
        let mut col = Column::default();
        assert!(!is_generated_column(&col));
        col.extra = "VIRTUAL GENERATED".to_string();
        assert!(is_generated_column(&col));
        col.extra = "stored generated".to_string();
        assert!(is_generated_column(&col));
        col.extra = "auto_increment".to_string();
        assert!(!is_generated_column(&col));
    }

    #[test]
    fn test_is_ci_collation() {
        assert!(is_ci_collation("utf8mb4_general_ci"));
        assert!(is_ci_collation("UTF8MB4_0900_AI_CI"));
        assert!(!is_ci_collation("utf8mb4_bin"));
        assert!(!is_ci_collation(""));
    }

    #[test]
    fn test_is_text_like_pg_type() {
        assert!(is_text_like_pg_type("text"));
        assert!(is_text_like_pg_type("varchar(30)"));
        assert!(is_text_like_pg_type("char(2)"));
        assert!(!is_text_like_pg_type("bytea"));
        assert!(!is_text_like_pg_type("integer"));
    }

    #[test]
    fn test_pg_collation_clause() {
        let mut tm = TypeMappingConfig::default();
        let mut col = Column {
            collation: "utf8mb4_bin".to_string(),
            ..Default::default()
        };

        // collation_mode defaults to none: never emit.
        assert_eq!(pg_collation_clause(&col, &tm), "");

        tm.collation_mode = CollationMode::Auto;
        assert_eq!(pg_collation_clause(&col, &tm), " COLLATE \"C\"");

        col.collation = "utf8mb4_general_ci".to_string();
        assert_eq!(pg_collation_clause(&col, &tm), "");

        tm.collation_map
            .insert("utf8mb4_general_ci".to_string(), "und-x-icu".to_string());
        assert_eq!(pg_collation_clause(&col, &tm), " COLLATE \"und-x-icu\"");

        col.collation = String::new();
        assert_eq!(pg_collation_clause(&col, &tm), "");
    }

    #[test]
    fn test_collation_warnings() {
        let schema = Schema {
            tables: vec![Table {
                source_name: "Users".to_string(),
                target_name: "users".to_string(),
                columns: vec![
                    Column {
                        source_name: "email".to_string(),
                        target_name: "email".to_string(),
                        charset: "utf8mb4".to_string(),
                        collation: "utf8mb4_general_ci".to_string(),
                        ..Default::default()
                    },
                    Column {
                        source_name: "token".to_string(),
                        target_name: "token".to_string(),
                        charset: "utf8mb4".to_string(),
                        collation: "utf8mb4_bin".to_string(),
                        ..Default::default()
                    },
                ],
                indexes: vec![Index {
                    name: "uq_email".to_string(),
                    source_name: "uq_email".to_string(),
                    columns: vec!["email".to_string()],
                    unique: true,
                    kind: "BTREE".to_string(),
                    ..Default::default()
                }],
                ..Default::default()
            }],
        };

        let tm = TypeMappingConfig::default();
        let warnings = collect_collation_warnings(&schema, &tm);
        assert!(warnings.iter().any(|w| w.contains("source charsets found: utf8mb4")));
        assert!(warnings
            .iter()
            .any(|w| w.contains("utf8mb4_bin") && w.contains("utf8mb4_general_ci")));
        assert!(warnings.iter().any(|w| w.contains("case-insensitive")));
        assert!(warnings.iter().any(|w| w.contains("uniqueness semantics")
            && w.contains("users.email")));

        // A mapping entry suppresses the per-collation warnings.
        let mut tm = TypeMappingConfig::default();
        tm.collation_map
            .insert("utf8mb4_general_ci".to_string(), "und-x-icu".to_string());
        let warnings = collect_collation_warnings(&schema, &tm);
        assert!(!warnings.iter().any(|w| w.contains("case-insensitive")));
    }

    #[test]
    fn test_source_object_warnings() {
        assert!(source_object_warnings(&SourceObjects::default()).is_empty());

        let objs = SourceObjects {
            views: vec!["v_active".to_string()],
            routines: vec!["PROCEDURE cleanup".to_string()],
            triggers: vec!["trg_audit".to_string()],
        };
        let warnings = source_object_warnings(&objs);
        assert_eq!(warnings.len(), 4);
        assert!(warnings[0].contains("1 views, 1 routines, 1 triggers"));
        assert!(warnings.iter().any(|w| w == "view: v_active"));
    }

    #[test]
    fn test_generated_column_warnings() {
        let schema = Schema {
            tables: vec![Table {
                source_name: "t".to_string(),
                target_name: "t".to_string(),
                columns: vec![Column {
                    source_name: "full_name".to_string(),
                    target_name: "full_name".to_string(),
                    extra: "STORED GENERATED".to_string(),
                    ..Default::default()
                }],
                ..Default::default()
            }],
        };
        let warnings = collect_generated_column_warnings(&schema);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("t.full_name"));
        assert!(warnings[0].contains("materialized"));
    }
}
