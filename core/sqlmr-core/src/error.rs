//! Error types for the sqlmr query engine.
//!
//! All public APIs return `SqlmrResult<T>`; no panics in library code.

use thiserror::Error;

/// Unified error type for all sqlmr operations.
#[derive(Debug, Error)]
pub enum SqlmrError {
    /// Malformed SQL structure (clause boundaries, literals, parentheses, joins)
    #[error("SQL parse error: {message}\nSQL: {sql}")]
    SqlParse { message: String, sql: String },

    /// Syntactically valid query that references undefined tables, misses
    /// GROUP BY columns or sorts by a position outside the SELECT list
    #[error("SQL validation error: {message}\nSQL: {sql}")]
    SqlValidation { message: String, sql: String },

    /// Unsupported SQL feature
    #[error("SQL feature not supported: {feature}\nHint: {hint}")]
    SqlNotSupported { feature: String, hint: String },

    /// A record was addressed beyond its field count
    #[error("column index {index} out of range for record with {len} fields: '{record}'")]
    ColumnIndexOutOfRange {
        index: usize,
        len: usize,
        record: String,
    },

    /// Aggregate input that is not a number
    #[error("cannot parse '{value}' as a number for {function}\nRecord: {record}")]
    NumericParse {
        value: String,
        function: String,
        record: String,
    },

    /// Table directory missing or empty
    #[error("table '{table}' not found: {reason}")]
    TableNotFound { table: String, reason: String },

    /// Broadcast table was not shipped to the task
    #[error("join table '{0}' is not loaded in this task")]
    JoinTableMissing(String),

    /// Invalid engine or job configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Task failure inside the map/reduce substrate
    #[error("task '{task}' failed: {message}")]
    Task { task: String, message: String },

    /// Apache Arrow error (result batches)
    #[error("arrow error: {source}")]
    Arrow {
        #[from]
        source: arrow::error::ArrowError,
    },

    /// Standard I/O error
    #[error("io error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for all sqlmr operations.
pub type SqlmrResult<T> = Result<T, SqlmrError>;

impl SqlmrError {
    pub(crate) fn parse(message: impl Into<String>, sql: &str) -> Self {
        SqlmrError::SqlParse {
            message: message.into(),
            sql: sql.to_string(),
        }
    }

    pub(crate) fn validation(message: impl Into<String>, sql: &str) -> Self {
        SqlmrError::SqlValidation {
            message: message.into(),
            sql: sql.to_string(),
        }
    }

    /// True for errors raised while compiling SQL, before any job is submitted.
    pub fn is_compile_error(&self) -> bool {
        matches!(
            self,
            SqlmrError::SqlParse { .. }
                | SqlmrError::SqlValidation { .. }
                | SqlmrError::SqlNotSupported { .. }
        )
    }
}

// From 구현들
impl From<serde_json::Error> for SqlmrError {
    fn from(err: serde_json::Error) -> Self {
        SqlmrError::Serialization(err.to_string())
    }
}
