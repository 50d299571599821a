//! Configuration type definitions.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use sysinfo::System;

/// Root configuration structure, parsed from the migration TOML file.
///
/// Unknown keys at any level are rejected so a typo never silently changes
/// migration behavior.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Target schema name (required).
    pub schema: String,

    /// What to do when the target schema already exists.
    #[serde(default)]
    pub on_schema_exists: OnSchemaExists,

    /// DDL + constraints only, no data.
    #[serde(default)]
    pub schema_only: bool,

    /// Data + sequences only; mutually exclusive with `schema_only`.
    #[serde(default)]
    pub data_only: bool,

    /// Cross-table snapshot consistency for the data phase.
    #[serde(default)]
    pub source_snapshot_mode: SnapshotMode,

    /// snake_case identifier folding (vs plain lowercase).
    #[serde(default = "default_true")]
    pub snake_case_identifiers: bool,

    /// Create tables UNLOGGED, then SET LOGGED after the data phase.
    #[serde(default)]
    pub unlogged_tables: bool,

    /// Emit column DEFAULT clauses.
    #[serde(default = "default_true")]
    pub preserve_defaults: bool,

    /// Add CHECK constraints covering unsigned source ranges.
    #[serde(default)]
    pub add_unsigned_checks: bool,

    /// Scrub referentially-invalid rows before FK creation.
    #[serde(default = "default_true")]
    pub clean_orphans: bool,

    /// Emulate MySQL ON UPDATE CURRENT_TIMESTAMP with triggers.
    #[serde(default)]
    pub replicate_on_update_current_timestamp: bool,

    /// Parallel table workers. 0 means auto (min(CPU count, 8)).
    #[serde(default)]
    pub workers: usize,

    /// Source database settings.
    pub source: SourceConfig,

    /// Target database settings.
    pub target: TargetConfig,

    /// Opt-in type coercions.
    #[serde(default)]
    pub type_mapping: TypeMappingConfig,

    /// SQL hook files per phase, relative paths resolved against the
    /// config file directory.
    #[serde(default)]
    pub hooks: HooksConfig,

    /// Directory containing the config file, for resolving relative hook paths.
    #[serde(skip)]
    pub config_dir: PathBuf,
}

impl Config {
    /// Resolve a hook path relative to the config file directory.
    pub fn resolve_path(&self, p: &str) -> PathBuf {
        let path = Path::new(p);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.config_dir.join(path)
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("schema", &self.schema)
            .field("on_schema_exists", &self.on_schema_exists)
            .field("schema_only", &self.schema_only)
            .field("data_only", &self.data_only)
            .field("source_snapshot_mode", &self.source_snapshot_mode)
            .field("snake_case_identifiers", &self.snake_case_identifiers)
            .field("unlogged_tables", &self.unlogged_tables)
            .field("preserve_defaults", &self.preserve_defaults)
            .field("add_unsigned_checks", &self.add_unsigned_checks)
            .field("clean_orphans", &self.clean_orphans)
            .field(
                "replicate_on_update_current_timestamp",
                &self.replicate_on_update_current_timestamp,
            )
            .field("workers", &self.workers)
            .field("source", &self.source)
            .field("target", &self.target)
            .field("type_mapping", &self.type_mapping)
            .field("hooks", &self.hooks)
            .finish()
    }
}

/// Behavior when the target schema already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnSchemaExists {
    /// Fail before any DDL is issued.
    #[default]
    Error,

    /// DROP SCHEMA ... CASCADE, then recreate.
    Recreate,
}

/// Snapshot consistency mode for the data phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotMode {
    /// Independent per-table connections, parallel streaming.
    #[default]
    None,

    /// One REPEATABLE READ read-only transaction, sequential copy (MySQL only).
    SingleTx,
}

/// Source database type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Mysql,
    Sqlite,
}

/// Source database settings.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    /// Source dialect.
    pub r#type: SourceType,

    /// Dialect-specific DSN.
    pub dsn: String,

    /// Connection character set (MySQL only).
    #[serde(default = "default_charset")]
    pub charset: String,
}

impl fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // DSNs embed credentials.
        f.debug_struct("SourceConfig")
            .field("type", &self.r#type)
            .field("dsn", &"[REDACTED]")
            .field("charset", &self.charset)
            .finish()
    }
}

/// Target database settings.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    /// PostgreSQL connection string (URL or key=value form).
    pub dsn: String,
}

impl fmt::Debug for TargetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetConfig")
            .field("dsn", &"[REDACTED]")
            .finish()
    }
}

/// How enum columns are rendered on the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumMode {
    /// Plain text column.
    #[default]
    Text,

    /// Text column plus an inline CHECK over the enum's value list.
    Check,
}

/// How set columns are rendered on the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetMode {
    /// Comma-joined text, as stored by the source.
    #[default]
    Text,

    /// `text[]` with the members split out.
    TextArray,
}

/// Collation clause emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollationMode {
    /// Never emit COLLATE clauses.
    #[default]
    None,

    /// Emit COLLATE from `collation_map`, or `COLLATE "C"` for `_bin` collations.
    Auto,
}

/// Controls non-lossless type coercions.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct TypeMappingConfig {
    /// MySQL tinyint(1) → boolean.
    pub tinyint1_as_boolean: bool,

    /// MySQL binary(16) → uuid.
    pub binary16_as_uuid: bool,

    /// MySQL datetime → timestamptz (timestamp always maps to timestamptz).
    pub datetime_as_timestamptz: bool,

    /// json → jsonb.
    pub json_as_jsonb: bool,

    /// Strip NUL bytes from json values during transfer.
    pub sanitize_json_null_bytes: bool,

    /// Map unknown source types to text instead of failing.
    pub unknown_as_text: bool,

    /// MySQL varchar(n)/char(n) → text.
    pub varchar_as_text: bool,

    /// MySQL enum rendering.
    pub enum_mode: EnumMode,

    /// MySQL set rendering.
    pub set_mode: SetMode,

    /// Replace `_ci`-collated text columns with citext (MySQL only).
    pub ci_as_citext: bool,

    /// COLLATE clause emission (MySQL only).
    pub collation_mode: CollationMode,

    /// Source collation → target collation overrides.
    pub collation_map: BTreeMap<String, String>,
}

impl Default for TypeMappingConfig {
    fn default() -> Self {
        Self {
            tinyint1_as_boolean: false,
            binary16_as_uuid: false,
            datetime_as_timestamptz: false,
            json_as_jsonb: false,
            sanitize_json_null_bytes: true,
            unknown_as_text: false,
            varchar_as_text: false,
            enum_mode: EnumMode::default(),
            set_mode: SetMode::default(),
            ci_as_citext: false,
            collation_mode: CollationMode::default(),
            collation_map: BTreeMap::new(),
        }
    }
}

/// SQL hook files per named phase.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HooksConfig {
    #[serde(default)]
    pub before_data: Vec<String>,

    #[serde(default)]
    pub after_data: Vec<String>,

    #[serde(default)]
    pub before_fk: Vec<String>,

    #[serde(default)]
    pub after_all: Vec<String>,
}

/// Default worker count: one per CPU core, capped at 8.
pub fn default_workers() -> usize {
    let mut sys = System::new();
    sys.refresh_cpu_all();
    sys.cpus().len().clamp(1, 8)
}

fn default_true() -> bool {
    true
}

fn default_charset() -> String {
    "utf8mb4".to_string()
}
