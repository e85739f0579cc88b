//! Error types for kiln-compile

use kiln_core::CoreError;
use kiln_ots::OtsError;
use kiln_sql::SqlError;
use thiserror::Error;

/// Compilation errors
#[derive(Error, Debug)]
pub enum CompileError {
    /// K001: Object manifest could not be read or parsed
    #[error("[K001] Failed to load object manifest {path}: {details}")]
    ManifestLoad { path: String, details: String },

    /// K002: Manifest entry cannot become a record
    #[error("[K002] Invalid manifest entry '{name}' ({path}): {source}")]
    ManifestEntry {
        name: String,
        path: String,
        source: CoreError,
    },

    /// Core library error (conflicts, cycles, metadata)
    #[error(transparent)]
    Core(#[from] CoreError),

    /// SQL parsing error
    #[error(transparent)]
    Sql(#[from] SqlError),

    /// OTS conversion error
    #[error(transparent)]
    Ots(#[from] OtsError),
}

impl CompileError {
    /// Whether the error aborts the whole compilation rather than one object
    pub fn is_fatal(&self) -> bool {
        match self {
            CompileError::Core(e) => {
                e.is_conflict() || matches!(e, CoreError::CircularDependency { .. })
            }
            _ => false,
        }
    }
}

/// Result type alias for CompileError
pub type CompileResult<T> = Result<T, CompileError>;
