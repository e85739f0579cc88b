//! Error types for kiln-sql

use kiln_core::CoreError;
use thiserror::Error;

/// SQL parsing and analysis errors
#[derive(Error, Debug)]
pub enum SqlError {
    /// SQL parse error (S001)
    #[error("[S001] SQL parse error at line {line}, column {column}: {message}")]
    ParseError {
        message: String,
        line: usize,
        column: usize,
    },

    /// Empty SQL (S002)
    #[error("[S002] SQL is empty")]
    EmptySql,

    /// Unsupported SQL statement (S003)
    #[error("[S003] Unsupported SQL statement: {0}")]
    UnsupportedStatement(String),

    /// A model file does not hold exactly one statement (S004)
    #[error("[S004] Expected exactly one statement in {path}, found {count}")]
    StatementCount { path: String, count: usize },

    /// Neither the AST nor the fallback recognized a function definition (S005)
    #[error("[S005] Could not parse a CREATE FUNCTION or CREATE MACRO statement in {path}")]
    FunctionSqlParsing { path: String },

    /// Function metadata failed to merge or validate (S006)
    #[error("[S006] Invalid metadata for function '{function}': {source}")]
    FunctionMetadata {
        function: String,
        #[source]
        source: CoreError,
    },

    /// Model metadata failed to merge or validate (S007)
    #[error("[S007] Invalid metadata for model {path}: {source}")]
    ModelMetadata {
        path: String,
        #[source]
        source: CoreError,
    },

    /// Companion metadata could not be read (S008)
    #[error("[S008] Failed to read metadata '{path}': {source}")]
    MetadataRead {
        path: String,
        source: std::io::Error,
    },

    /// Dialect name not recognized (S009)
    #[error("[S009] Unknown SQL dialect: {0}")]
    UnknownDialect(String),

    /// Core library error
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl SqlError {
    /// Wrap a parse error with the file it came from
    pub fn in_file(self, path: &str) -> Self {
        match self {
            SqlError::ParseError {
                message,
                line,
                column,
            } => SqlError::ParseError {
                message: format!("{}: {}", path, message),
                line,
                column,
            },
            other => other,
        }
    }
}

/// Result type alias for SqlError
pub type SqlResult<T> = Result<T, SqlError>;
