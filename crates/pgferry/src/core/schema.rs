//! Introspected schema model.
//!
//! These types are assembled once by source introspection and are read-only
//! afterwards; every downstream component receives a shared reference.

use serde::Serialize;

/// All introspected tables of a source database, in name order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Schema {
    pub tables: Vec<Table>,
}

/// Full introspected definition of one source table.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Table {
    /// Original identifier in the source.
    pub source_name: String,

    /// Identifier after snake_case-or-lowercase folding.
    pub target_name: String,

    /// Column definitions, ordered by ordinal position.
    pub columns: Vec<Column>,

    /// Primary key, if any (`is_primary = true`).
    pub primary_key: Option<Index>,

    /// Non-primary indexes.
    pub indexes: Vec<Index>,

    /// Foreign key constraints.
    pub foreign_keys: Vec<ForeignKey>,
}

/// One column of a source table.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Column {
    pub source_name: String,
    pub target_name: String,

    /// Normalised base type token, lowercase (e.g. "int", "varchar", "enum").
    pub data_type: String,

    /// Full declared type, lowercase (e.g. "tinyint(1) unsigned", "enum('a','b')").
    pub column_type: String,

    pub char_max_len: i64,
    pub precision: i64,
    pub scale: i64,
    pub nullable: bool,

    /// Source default expression as literal text, if any.
    pub default: Option<String>,

    /// Free-form markers: "auto_increment", "on update current_timestamp",
    /// "virtual generated", "stored generated".
    pub extra: String,

    /// 1-based ordinal position.
    pub ordinal_pos: i64,

    /// Character set (MySQL only; empty for SQLite).
    pub charset: String,

    /// Collation (MySQL only; empty for SQLite).
    pub collation: String,
}

impl Column {
    /// Whether the declared type carries an `unsigned` marker.
    pub fn is_unsigned(&self) -> bool {
        self.column_type.contains("unsigned")
    }
}

/// A source index, possibly spanning multiple columns.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Index {
    /// Target name after folding.
    pub name: String,
    pub source_name: String,

    /// Target column names, in declared key order.
    pub columns: Vec<String>,

    /// ASC/DESC per column, parallel to `columns`.
    pub column_orders: Vec<String>,

    pub unique: bool,
    pub is_primary: bool,

    /// Index kind, uppercase: BTREE, FULLTEXT, SPATIAL, HASH.
    pub kind: String,

    /// Key-part with a length prefix (MySQL SUB_PART); not translatable.
    pub has_prefix: bool,

    /// Expression key-part or partial index; not translatable.
    pub has_expression: bool,
}

/// A source foreign key constraint.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ForeignKey {
    /// Target constraint name after folding.
    pub name: String,

    /// Local target column names.
    pub columns: Vec<String>,

    /// Referenced table, original source identifier.
    pub ref_source_table: String,

    /// Referenced table, target identifier.
    pub ref_target_table: String,

    /// Referenced target column names, parallel to `columns`.
    pub ref_columns: Vec<String>,

    /// CASCADE, SET NULL, SET DEFAULT, RESTRICT, NO ACTION.
    pub update_rule: String,
    pub delete_rule: String,
}

/// Non-table source objects that require manual migration.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SourceObjects {
    pub views: Vec<String>,
    pub routines: Vec<String>,
    pub triggers: Vec<String>,
}

impl SourceObjects {
    pub fn is_empty(&self) -> bool {
        self.views.is_empty() && self.routines.is_empty() && self.triggers.is_empty()
    }
}
