//! SQLite source adapter.
//!
//! SQLite exposes its catalog through PRAGMAs rather than an information
//! schema, and its flexible typing means the declared column type only
//! determines an affinity. The declared form is kept in `column_type`; the
//! affinity token lands in `data_type`.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use async_trait::async_trait;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqliteRow};
use sqlx::{ConnectOptions, Row, ValueRef};
use tracing::warn;

use crate::config::{CollationMode, EnumMode, SetMode, TypeMappingConfig};
use crate::core::ident::fold;
use crate::core::schema::{Column, ForeignKey, Index, Schema, SourceObjects, Table};
use crate::core::value::SqlValue;
use crate::error::{MigrateError, Result};
use crate::source::{pg_literal, SourceAdapter, SourceConnection};

/// SQLite source adapter.
pub struct SqliteSource {
    snake_case: bool,
}

impl SqliteSource {
    pub fn new(snake_case: bool) -> Self {
        Self { snake_case }
    }

    fn fold(&self, name: &str) -> String {
        fold(name, self.snake_case)
    }
}

#[async_trait]
impl SourceAdapter for SqliteSource {
    fn display_name(&self) -> &'static str {
        "SQLite"
    }

    async fn open(&self, dsn: &str) -> Result<SourceConnection> {
        let path = sqlite_file_path(dsn)?;

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .read_only(true);

        let conn = options
            .connect()
            .await
            .map_err(|e| MigrateError::pool(e, "opening SQLite source connection"))?;

        Ok(SourceConnection::Sqlite(conn))
    }

    fn extract_db_name(&self, dsn: &str) -> Result<String> {
        let path = sqlite_file_path(dsn)?;
        let stem = Path::new(&path)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("");
        if stem.is_empty() {
            return Ok("sqlite".to_string());
        }
        Ok(stem.to_string())
    }

    async fn introspect_schema(
        &self,
        conn: &mut SourceConnection,
        _db_name: &str,
    ) -> Result<Schema> {
        let conn = sqlite_conn(conn)?;

        let mut tables = self.introspect_tables(&mut *conn).await?;
        for table in &mut tables {
            let (columns, pk, auto_incr) = self
                .introspect_columns(&mut *conn, &table.source_name)
                .await
                .map_err(|e| {
                    MigrateError::introspect(format!("columns for {}", table.source_name), e)
                })?;
            table.columns = columns;
            table.primary_key = pk;

            for col in &mut table.columns {
                if auto_incr.contains(&col.source_name) {
                    col.extra = "auto_increment".to_string();
                }
            }

            table.indexes = self
                .introspect_indexes(&mut *conn, &table.source_name)
                .await
                .map_err(|e| {
                    MigrateError::introspect(format!("indexes for {}", table.source_name), e)
                })?;

            table.foreign_keys = self
                .introspect_foreign_keys(&mut *conn, &table.source_name)
                .await
                .map_err(|e| {
                    MigrateError::introspect(format!("foreign keys for {}", table.source_name), e)
                })?;
        }

        Ok(Schema { tables })
    }

    async fn introspect_source_objects(
        &self,
        conn: &mut SourceConnection,
        _db_name: &str,
    ) -> Result<SourceObjects> {
        let conn = sqlite_conn(conn)?;
        let mut objs = SourceObjects::default();

        let rows: Vec<SqliteRow> =
            sqlx::query("SELECT name FROM sqlite_master WHERE type='view' ORDER BY name")
                .fetch_all(&mut *conn)
                .await
                .map_err(|e| MigrateError::introspect("views", e))?;
        for row in rows {
            objs.views.push(row.get::<String, _>("name"));
        }

        let rows: Vec<SqliteRow> =
            sqlx::query("SELECT name FROM sqlite_master WHERE type='trigger' ORDER BY name")
                .fetch_all(&mut *conn)
                .await
                .map_err(|e| MigrateError::introspect("triggers", e))?;
        for row in rows {
            objs.triggers.push(row.get::<String, _>("name"));
        }

        // SQLite has no stored routines.
        Ok(objs)
    }

    fn map_type(&self, col: &Column, type_map: &TypeMappingConfig) -> Result<String> {
        let affinity = normalize_affinity(&col.column_type).to_uppercase();

        let pg_type = match affinity.as_str() {
            "INTEGER" | "INT" | "SMALLINT" | "TINYINT" | "MEDIUMINT" | "BIGINT" => {
                "bigint".to_string()
            }
            "REAL" | "DOUBLE" | "FLOAT" => "double precision".to_string(),
            "TEXT" | "VARCHAR" | "CHAR" | "CLOB" => "text".to_string(),
            "BLOB" => "bytea".to_string(),
            "NUMERIC" | "DECIMAL" => {
                if col.precision > 0 {
                    if col.scale > 0 {
                        format!("numeric({},{})", col.precision, col.scale)
                    } else {
                        format!("numeric({})", col.precision)
                    }
                } else {
                    "numeric".to_string()
                }
            }
            "BOOLEAN" | "BOOL" => "boolean".to_string(),
            "DATETIME" | "TIMESTAMP" => "timestamp".to_string(),
            "DATE" => "date".to_string(),
            "TIME" => "time".to_string(),
            "JSON" => {
                if type_map.json_as_jsonb {
                    "jsonb".to_string()
                } else {
                    "json".to_string()
                }
            }
            _ => {
                if type_map.unknown_as_text {
                    "text".to_string()
                } else {
                    return Err(MigrateError::UnsupportedType(format!(
                        "unsupported SQLite type {:?}",
                        col.column_type
                    )));
                }
            }
        };

        Ok(pg_type)
    }

    fn map_default(
        &self,
        col: &Column,
        pg_type: &str,
        _type_map: &TypeMappingConfig,
    ) -> Result<Option<String>> {
        let Some(raw) = col.default.as_deref() else {
            return Ok(None);
        };
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("null") {
            return Ok(None);
        }

        match raw.to_uppercase().as_str() {
            "CURRENT_TIMESTAMP" | "CURRENT_DATE" | "CURRENT_TIME" => {
                return Ok(Some(raw.to_uppercase()))
            }
            "TRUE" => return Ok(Some("TRUE".to_string())),
            "FALSE" => return Ok(Some("FALSE".to_string())),
            _ => {}
        }

        if is_numeric_literal(raw) {
            if pg_type == "boolean" {
                match raw {
                    "0" => return Ok(Some("FALSE".to_string())),
                    "1" => return Ok(Some("TRUE".to_string())),
                    _ => {}
                }
            }
            return Ok(Some(raw.to_string()));
        }

        let bytes = raw.as_bytes();
        if bytes.len() >= 2 && bytes[0] == b'\'' && bytes[bytes.len() - 1] == b'\'' {
            let inner = raw[1..raw.len() - 1].replace("''", "'");
            return Ok(Some(pg_literal(&inner)));
        }

        // Expression defaults are opaque; skip with a warning.
        warn!(
            "skipping expression default {:?} for column {}",
            raw, col.source_name
        );
        Ok(None)
    }

    fn transform_value(
        &self,
        val: SqlValue,
        _col: &Column,
        _type_map: &TypeMappingConfig,
    ) -> Result<SqlValue> {
        if val.is_null() {
            return Ok(SqlValue::Null);
        }
        // PostgreSQL rejects NUL bytes in text regardless of the source.
        if let SqlValue::Text(s) = &val {
            if s.contains('\0') {
                return Ok(SqlValue::Text(s.replace('\0', "")));
            }
        }
        Ok(val)
    }

    fn quote_source_ident(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn supports_single_tx_snapshot(&self) -> bool {
        false
    }

    fn max_workers(&self) -> usize {
        1
    }

    fn validate_type_mapping(&self, type_map: &TypeMappingConfig) -> Result<()> {
        let mut errs: Vec<String> = Vec::new();
        if type_map.tinyint1_as_boolean {
            errs.push("tinyint1_as_boolean is a MySQL-only option".to_string());
        }
        if type_map.binary16_as_uuid {
            errs.push("binary16_as_uuid is a MySQL-only option".to_string());
        }
        if type_map.datetime_as_timestamptz {
            errs.push("datetime_as_timestamptz is a MySQL-only option".to_string());
        }
        if type_map.varchar_as_text {
            errs.push("varchar_as_text is a MySQL-only option".to_string());
        }
        if type_map.enum_mode != EnumMode::Text {
            errs.push("enum_mode=\"check\" is a MySQL-only option".to_string());
        }
        if type_map.set_mode != SetMode::Text {
            errs.push("set_mode=\"text_array\" is a MySQL-only option".to_string());
        }
        if type_map.ci_as_citext {
            errs.push("ci_as_citext is a MySQL-only option".to_string());
        }
        if type_map.collation_mode != CollationMode::None || !type_map.collation_map.is_empty() {
            errs.push("collation options are MySQL-only".to_string());
        }
        if errs.is_empty() {
            Ok(())
        } else {
            Err(MigrateError::Config(format!(
                "invalid type_mapping for SQLite source: {}",
                errs.join("; ")
            )))
        }
    }
}

impl SqliteSource {
    async fn introspect_tables(&self, conn: &mut sqlx::SqliteConnection) -> Result<Vec<Table>> {
        let rows: Vec<SqliteRow> = sqlx::query(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(conn)
        .await
        .map_err(|e| MigrateError::introspect("tables", e))?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let name: String = row.get("name");
                Table {
                    target_name: self.fold(&name),
                    source_name: name,
                    ..Default::default()
                }
            })
            .collect())
    }

    /// Columns, reconstructed primary key, and the set of auto-increment
    /// column names for one table.
    async fn introspect_columns(
        &self,
        conn: &mut sqlx::SqliteConnection,
        table_name: &str,
    ) -> Result<(Vec<Column>, Option<Index>, HashSet<String>)> {
        let sql = format!("PRAGMA table_xinfo({})", quote_sqlite(table_name));
        let rows: Vec<SqliteRow> = sqlx::query(&sql).fetch_all(&mut *conn).await?;

        let mut cols = Vec::with_capacity(rows.len());
        let mut pk_cols: Vec<(i64, String)> = Vec::new();

        for row in rows {
            let cid: i64 = row.get("cid");
            let name: String = row.get("name");
            let decl_type: String = row.get("type");
            let notnull: i64 = row.get("notnull");
            let default: Option<String> = row.get("dflt_value");
            let pk: i64 = row.get("pk");
            let hidden: i64 = row.get("hidden");

            let mut col = Column {
                target_name: self.fold(&name),
                source_name: name.clone(),
                data_type: normalize_affinity(&decl_type).to_lowercase(),
                column_type: decl_type.to_lowercase(),
                nullable: notnull == 0,
                default,
                ordinal_pos: cid + 1,
                ..Default::default()
            };

            // hidden: 0=normal, 1=hidden, 2=generated stored, 3=generated virtual
            match hidden {
                2 => col.extra = "stored generated".to_string(),
                3 => col.extra = "virtual generated".to_string(),
                _ => {}
            }

            parse_type_params(&mut col, &decl_type);

            if pk > 0 {
                pk_cols.push((pk, name));
            }
            cols.push(col);
        }

        let primary_key = if pk_cols.is_empty() {
            None
        } else {
            pk_cols.sort_by_key(|(pos, _)| *pos);
            let mut idx = Index {
                name: "PRIMARY".to_string(),
                source_name: "PRIMARY".to_string(),
                unique: true,
                is_primary: true,
                kind: "BTREE".to_string(),
                ..Default::default()
            };
            for (_, name) in &pk_cols {
                idx.columns.push(self.fold(name));
                idx.column_orders.push("ASC".to_string());
            }
            Some(idx)
        };

        // AUTOINCREMENT is only visible in the stored CREATE TABLE text.
        let create_sql: Option<String> =
            sqlx::query("SELECT sql FROM sqlite_master WHERE type='table' AND name = ?")
                .bind(table_name)
                .fetch_optional(&mut *conn)
                .await?
                .and_then(|row| row.get::<Option<String>, _>("sql"));

        let mut auto_incr: HashSet<String> = create_sql
            .as_deref()
            .map(detect_autoincrement_columns)
            .unwrap_or_default();

        // A single-column PK declared as INTEGER is a rowid alias and behaves
        // as auto-increment even without the keyword.
        if pk_cols.len() == 1 {
            let (_, pk_name) = &pk_cols[0];
            if let Some(col) = cols.iter().find(|c| &c.source_name == pk_name) {
                if col.column_type == "integer" {
                    auto_incr.insert(pk_name.clone());
                }
            }
        }

        Ok((cols, primary_key, auto_incr))
    }

    async fn introspect_indexes(
        &self,
        conn: &mut sqlx::SqliteConnection,
        table_name: &str,
    ) -> Result<Vec<Index>> {
        let sql = format!("PRAGMA index_list({})", quote_sqlite(table_name));
        let rows: Vec<SqliteRow> = sqlx::query(&sql).fetch_all(&mut *conn).await?;

        let mut indexes = Vec::new();
        for row in rows {
            let name: String = row.get("name");
            let unique: i64 = row.get("unique");
            let origin: String = row.get("origin");
            let partial: i64 = row.get("partial");

            // PK index rows are reconstructed from table_xinfo instead.
            if origin == "pk" {
                continue;
            }

            let mut idx = Index {
                name: self.fold(&name),
                source_name: name.clone(),
                unique: unique == 1,
                is_primary: false,
                kind: "BTREE".to_string(),
                ..Default::default()
            };

            if partial == 1 {
                idx.has_expression = true;
                warn!(
                    "partial index {:?} on {} will be skipped (WHERE clause not migrated)",
                    name, table_name
                );
            }

            let info_sql = format!("PRAGMA index_info({})", quote_sqlite(&name));
            let col_rows: Vec<SqliteRow> = sqlx::query(&info_sql).fetch_all(&mut *conn).await?;
            for col_row in col_rows {
                let col_name: Option<String> = col_row.get("name");
                match col_name {
                    Some(col_name) => {
                        idx.columns.push(self.fold(&col_name));
                        idx.column_orders.push("ASC".to_string());
                    }
                    // NULL name means an expression key-part.
                    None => idx.has_expression = true,
                }
            }

            indexes.push(idx);
        }

        Ok(indexes)
    }

    async fn introspect_foreign_keys(
        &self,
        conn: &mut sqlx::SqliteConnection,
        table_name: &str,
    ) -> Result<Vec<ForeignKey>> {
        let sql = format!("PRAGMA foreign_key_list({})", quote_sqlite(table_name));
        let rows: Vec<SqliteRow> = sqlx::query(&sql).fetch_all(&mut *conn).await?;

        let mut fks: Vec<ForeignKey> = Vec::new();
        let mut by_id: HashMap<i64, usize> = HashMap::new();

        for row in rows {
            let id: i64 = row.get("id");
            let ref_table: String = row.get("table");
            let from: String = row.get("from");
            let to: String = row.get("to");
            let on_update: String = row.get("on_update");
            let on_delete: String = row.get("on_delete");

            let pos = *by_id.entry(id).or_insert_with(|| {
                fks.push(ForeignKey {
                    name: format!("fk_{}_{}", self.fold(table_name), id),
                    ref_target_table: self.fold(&ref_table),
                    ref_source_table: ref_table,
                    update_rule: normalize_fk_rule(&on_update),
                    delete_rule: normalize_fk_rule(&on_delete),
                    ..Default::default()
                });
                fks.len() - 1
            });
            let fk = &mut fks[pos];
            fk.columns.push(self.fold(&from));
            fk.ref_columns.push(self.fold(&to));
        }

        Ok(fks)
    }
}

/// Decode one SQLite row into pre-transform values, ordinal by ordinal.
pub(crate) fn row_to_values(row: &SqliteRow, columns: &[Column]) -> Vec<SqlValue> {
    columns
        .iter()
        .enumerate()
        .map(|(i, col)| row_value(row, i, col))
        .collect()
}

fn row_value(row: &SqliteRow, i: usize, col: &Column) -> SqlValue {
    let is_null = row.try_get_raw(i).map(|r| r.is_null()).unwrap_or(true);
    if is_null {
        return SqlValue::Null;
    }

    match col.data_type.as_str() {
        "integer" | "int" | "smallint" | "tinyint" | "mediumint" | "bigint" => row
            .try_get::<i64, _>(i)
            .map(SqlValue::I64)
            .unwrap_or(SqlValue::Null),
        "real" | "double" | "float" => row
            .try_get::<f64, _>(i)
            .map(SqlValue::F64)
            .unwrap_or(SqlValue::Null),
        "text" | "varchar" | "char" | "clob" | "json" => row
            .try_get::<String, _>(i)
            .map(SqlValue::Text)
            .unwrap_or(SqlValue::Null),
        "blob" => row
            .try_get::<Vec<u8>, _>(i)
            .map(SqlValue::Bytes)
            .unwrap_or(SqlValue::Null),
        "numeric" | "decimal" => {
            if let Ok(v) = row.try_get::<i64, _>(i) {
                SqlValue::Decimal(Decimal::from(v))
            } else if let Ok(v) = row.try_get::<f64, _>(i) {
                Decimal::from_f64(v).map(SqlValue::Decimal).unwrap_or(SqlValue::Null)
            } else {
                row.try_get::<String, _>(i)
                    .ok()
                    .and_then(|s| s.parse::<Decimal>().ok())
                    .map(SqlValue::Decimal)
                    .unwrap_or(SqlValue::Null)
            }
        }
        "boolean" | "bool" => row
            .try_get::<bool, _>(i)
            .map(SqlValue::Bool)
            .unwrap_or(SqlValue::Null),
        "datetime" | "timestamp" => row
            .try_get::<chrono::NaiveDateTime, _>(i)
            .map(SqlValue::DateTime)
            .unwrap_or(SqlValue::Null),
        "date" => row
            .try_get::<chrono::NaiveDate, _>(i)
            .map(SqlValue::Date)
            .unwrap_or(SqlValue::Null),
        "time" => row
            .try_get::<chrono::NaiveTime, _>(i)
            .map(SqlValue::Time)
            .unwrap_or(SqlValue::Null),
        _ => row
            .try_get::<String, _>(i)
            .map(SqlValue::Text)
            .or_else(|_| row.try_get::<Vec<u8>, _>(i).map(SqlValue::Bytes))
            .or_else(|_| row.try_get::<i64, _>(i).map(SqlValue::I64))
            .unwrap_or(SqlValue::Null),
    }
}

/// Resolve a SQLite DSN to a plain file path, rejecting in-memory databases
/// (each connection would see a different empty database).
pub(crate) fn sqlite_file_path(dsn: &str) -> Result<String> {
    if dsn == ":memory:" || dsn == "file::memory:" || dsn.contains("mode=memory") {
        return Err(MigrateError::Dsn(
            "in-memory SQLite databases are not supported".to_string(),
        ));
    }

    let mut path = dsn;
    if let Some(rest) = path.strip_prefix("file:") {
        path = rest;
        if let Some(q) = path.find('?') {
            path = &path[..q];
        }
        path = path.strip_prefix("//").unwrap_or(path);
    }
    if path.is_empty() {
        return Err(MigrateError::Dsn("empty SQLite path".to_string()));
    }
    Ok(path.to_string())
}

fn sqlite_conn<'a>(conn: &'a mut SourceConnection) -> Result<&'a mut sqlx::SqliteConnection> {
    match conn {
        SourceConnection::Sqlite(c) => Ok(c),
        SourceConnection::MySql(_) => Err(MigrateError::introspect(
            "connection",
            "expected a SQLite connection",
        )),
    }
}

/// Quote an identifier for use inside a PRAGMA (no parameter binding there).
fn quote_sqlite(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Extract the base type token for SQLite's flexible type system.
/// An empty declared type means BLOB affinity.
pub(crate) fn normalize_affinity(declared: &str) -> String {
    let dt = declared.trim();
    if dt.is_empty() {
        return "blob".to_string();
    }
    let base = match dt.find('(') {
        Some(i) => &dt[..i],
        None => dt,
    };
    base.trim().to_string()
}

/// Parse `(precision[, scale])` out of a declared type.
fn parse_type_params(col: &mut Column, declared: &str) {
    let Some(open) = declared.find('(') else {
        return;
    };
    let Some(close) = declared.rfind(')').filter(|&c| c > open) else {
        return;
    };
    let params = &declared[open + 1..close];
    let mut parts = params.split(',');
    if let Some(p) = parts.next().and_then(|p| p.trim().parse::<i64>().ok()) {
        col.precision = p;
        col.char_max_len = p;
    }
    if let Some(s) = parts.next().and_then(|p| p.trim().parse::<i64>().ok()) {
        col.scale = s;
    }
}

fn normalize_fk_rule(rule: &str) -> String {
    let rule = rule.trim().to_uppercase();
    if rule.is_empty() {
        return "NO ACTION".to_string();
    }
    rule
}

/// Best-effort detection of AUTOINCREMENT columns from the stored
/// CREATE TABLE text. The scan walks backwards from the keyword past
/// `INTEGER PRIMARY KEY` to the column name; unusual quoting or comments
/// inside the definition can defeat it.
pub(crate) fn detect_autoincrement_columns(create_sql: &str) -> HashSet<String> {
    let mut result = HashSet::new();
    let upper = create_sql.to_uppercase();
    let Some(idx) = upper.find("AUTOINCREMENT") else {
        return result;
    };

    let prefix = create_sql[..idx].trim_end();
    let mut tokens: Vec<&str> = prefix.split_whitespace().collect();
    while let Some(tok) = tokens.last() {
        let upper_tok = tok.to_uppercase();
        if upper_tok == "INTEGER" || upper_tok == "PRIMARY" || upper_tok == "KEY" {
            tokens.pop();
            continue;
        }
        let col_name = tok.trim_matches(|c: char| matches!(c, ',' | '(' | ')' | '"' | '\n' | '\r' | '\t' | ' '));
        if !col_name.is_empty() {
            result.insert(col_name.to_string());
        }
        break;
    }
    result
}

fn is_numeric_literal(s: &str) -> bool {
    if s.is_empty() {
        return false;
    }
    let bytes = s.as_bytes();
    let start = if bytes[0] == b'-' || bytes[0] == b'+' { 1 } else { 0 };
    if start >= bytes.len() {
        return false;
    }
    let mut has_dot = false;
    for &b in &bytes[start..] {
        if b == b'.' {
            if has_dot {
                return false;
            }
            has_dot = true;
            continue;
        }
        if !b.is_ascii_digit() {
            return false;
        }
    }
    true
}
