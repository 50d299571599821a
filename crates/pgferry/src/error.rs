//! Error types for the migration library.

use thiserror::Error;

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (invalid TOML, missing keys, conflicting flags).
    #[error("Configuration error: {0}")]
    Config(String),

    /// DSN cannot be parsed or points at an unusable database.
    #[error("Invalid DSN: {0}")]
    Dsn(String),

    /// Target schema already exists and `on_schema_exists = "error"`.
    #[error("schema {0:?} already exists in target database (on_schema_exists=error)")]
    SchemaConflict(String),

    /// A source introspection query failed.
    #[error("Introspection failed ({context}): {message}")]
    Introspect { context: String, message: String },

    /// A single column's source type has no PostgreSQL mapping.
    #[error("unsupported source type: {0}")]
    UnsupportedType(String),

    /// Unsupported types collected across the whole schema.
    #[error("{} column(s) have unsupported types:\n  {}", .0.len(), .0.join("\n  "))]
    UnsupportedTypes(Vec<String>),

    /// A source column default cannot be expressed in PostgreSQL.
    #[error("unsupported default: {0}")]
    UnsupportedDefault(String),

    /// A row value could not be coerced to its target representation.
    #[error("value coercion failed: {0}")]
    ValueCoercion(String),

    /// A single table's data stream failed.
    #[error("data load failed for table {table}: {message}")]
    DataLoad { table: String, message: String },

    /// One or more tables failed during parallel streaming.
    #[error("{0} table(s) failed migration")]
    DataLoadSummary(usize),

    /// A DDL or post-load statement failed.
    #[error("{phase} failed for {object}: {message}\nSQL: {sql}")]
    PostLoad {
        phase: String,
        object: String,
        message: String,
        sql: String,
    },

    /// A hook file could not be read or one of its statements failed.
    #[error("hook {phase}: {file}: {message}")]
    Hook {
        phase: String,
        file: String,
        message: String,
    },

    /// Source database connection or query error.
    #[error("Source database error: {0}")]
    Source(#[from] sqlx::Error),

    /// Target database connection or query error.
    #[error("Target database error: {0}")]
    Target(#[from] tokio_postgres::Error),

    /// Connection pool error with context.
    #[error("Pool error: {message}\n  Context: {context}")]
    Pool { message: String, context: String },

    /// IO error (config and hook file reads).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Migration was cancelled (SIGINT, etc.)
    #[error("Migration cancelled")]
    Cancelled,
}

impl MigrateError {
    /// Create a Pool error with context about where it occurred.
    pub fn pool(message: impl ToString, context: impl Into<String>) -> Self {
        MigrateError::Pool {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Create a DataLoad error for a specific table.
    pub fn data_load(table: impl ToString, message: impl ToString) -> Self {
        MigrateError::DataLoad {
            table: table.to_string(),
            message: message.to_string(),
        }
    }

    /// Create a PostLoad error wrapping the failing statement.
    pub fn post_load(
        phase: impl Into<String>,
        object: impl Into<String>,
        message: impl ToString,
        sql: impl Into<String>,
    ) -> Self {
        MigrateError::PostLoad {
            phase: phase.into(),
            object: object.into(),
            message: message.to_string(),
            sql: sql.into(),
        }
    }

    /// Create a Hook error.
    pub fn hook(
        phase: impl Into<String>,
        file: impl Into<String>,
        message: impl ToString,
    ) -> Self {
        MigrateError::Hook {
            phase: phase.into(),
            file: file.into(),
            message: message.to_string(),
        }
    }

    /// Create an Introspect error.
    pub fn introspect(context: impl Into<String>, message: impl ToString) -> Self {
        MigrateError::Introspect {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Format error with full details including the error chain.
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_types_message_lists_all() {
        let err = MigrateError::UnsupportedTypes(vec![
            "t1.geo (geometry): unsupported MySQL type \"geometry\"".to_string(),
            "t2.pt (point): unsupported MySQL type \"point\"".to_string(),
        ]);
        let msg = err.to_string();
        assert!(msg.contains("2 column(s)"));
        assert!(msg.contains("t1.geo"));
        assert!(msg.contains("t2.pt"));
    }

    #[test]
    fn test_post_load_includes_sql() {
        let err = MigrateError::post_load("indexes", "users_idx_email", "boom", "CREATE INDEX ...");
        let msg = err.to_string();
        assert!(msg.contains("indexes"));
        assert!(msg.contains("CREATE INDEX"));
    }

    #[test]
    fn test_format_detailed_single_level() {
        let err = MigrateError::Config("schema is required".to_string());
        assert!(err.format_detailed().starts_with("Error: Configuration error"));
    }
}
