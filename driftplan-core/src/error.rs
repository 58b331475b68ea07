//! Error types for driftplan operations.

use thiserror::Error;

/// Extract the full error message from a tokio_postgres::Error,
/// including the underlying DbError details that Display hides.
pub fn format_db_error(e: &tokio_postgres::Error) -> String {
    if let Some(db_err) = e.as_db_error() {
        let mut msg = db_err.message().to_string();
        if let Some(detail) = db_err.detail() {
            msg.push_str(&format!("\n  Detail: {}", detail));
        }
        if let Some(hint) = db_err.hint() {
            msg.push_str(&format!("\n  Hint: {}", hint));
        }
        return msg;
    }
    // Fallback: walk the source chain
    let mut msg = e.to_string();
    let mut source = std::error::Error::source(e);
    while let Some(s) = source {
        msg.push_str(&format!(": {}", s));
        source = s.source();
    }
    if e.is_closed() {
        msg.push_str("\n  Note: The database connection was closed unexpectedly.");
    }
    msg
}

/// Which side of a comparison an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Source,
    Target,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Source => write!(f, "source"),
            Side::Target => write!(f, "target"),
        }
    }
}

/// All fatal error types that driftplan operations can produce.
///
/// Parse and tokenize problems are not represented here: they degrade to
/// `RawUnparsed` objects and warnings instead of aborting a run.
#[derive(Error, Debug)]
pub enum DriftplanError {
    /// Invalid or missing configuration (TOML parse errors, bad values, etc.).
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The requested dialect tag is not one of the supported dialects.
    #[error("Unsupported dialect '{name}'. Supported: postgres, mysql, sqlite, db2")]
    UnsupportedDialect { name: String },

    /// A filesystem I/O operation failed.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// A source path given on the command line does not exist.
    #[error("{side} path '{path}' does not exist")]
    SourceNotFound { side: Side, path: String },

    /// A directory source contained no `*.sql` files.
    #[error("{side} directory '{path}' contains no .sql files")]
    NoSqlFiles { side: Side, path: String },

    /// A catalog query failed on an established connection.
    #[error("Database error: {}", format_db_error(.0))]
    DatabaseError(#[from] tokio_postgres::Error),

    /// The live database for one side could not be reached or timed out.
    #[error("Connection error ({side}): {reason}")]
    ConnectionError { side: Side, reason: String },

    /// Live introspection is not implemented for this dialect.
    #[error("Live introspection is not available for dialect '{dialect}'")]
    IntrospectionUnsupported { dialect: String },
}

/// Convenience type alias for `Result<T, DriftplanError>`.
pub type Result<T> = std::result::Result<T, DriftplanError>;

/// A statement the tokenizer could not delimit.
///
/// Localized: the normalizer records it as a warning and keeps the snippet as
/// a `RawUnparsed` object, then continues with the next statement.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason} at line {line} (offset {offset}): {snippet}")]
pub struct TokenizeError {
    /// What was left open (quote, comment, block).
    pub reason: String,
    /// Byte offset of the statement start.
    pub offset: usize,
    /// 1-based line of the statement start.
    pub line: usize,
    /// Offending statement text.
    pub snippet: String,
}

impl TokenizeError {
    /// Snippet shortened for log output.
    pub fn preview(&self) -> String {
        let preview: String = self.snippet.chars().take(60).collect();
        if self.snippet.chars().count() > 60 {
            format!("{}...", preview)
        } else {
            preview
        }
    }
}
