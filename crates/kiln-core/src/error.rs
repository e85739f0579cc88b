//! Error types for kiln-core

use thiserror::Error;

/// Core error type for Kiln
#[derive(Error, Debug)]
pub enum CoreError {
    /// E001: Configuration file not found
    #[error("[E001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// E002: Failed to parse configuration file
    #[error("[E002] Failed to parse config: {message}")]
    ConfigParseError { message: String },

    /// E003: Invalid configuration value
    #[error("[E003] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// E007: Circular dependency detected
    #[error("[E007] Circular dependency detected: {cycle}")]
    CircularDependency { cycle: String },

    /// E008: A required name is missing or blank
    #[error("[E008] '{field}' is required for {context}")]
    EmptyName { field: String, context: String },

    /// M001: Structurally invalid metadata
    #[error("[M001] Invalid metadata for {context}: {message}")]
    MetadataValidation { context: String, message: String },

    /// M002: Unknown materialization
    #[error("[M002] Invalid materialization '{value}' for {context}: expected one of table, view, incremental, scd2")]
    InvalidMaterialization { context: String, value: String },

    /// M003: Invalid incremental configuration
    #[error("[M003] Invalid incremental config for {context}: {message}")]
    InvalidIncremental { context: String, message: String },

    /// M004: Unknown test name
    #[error("[M004] Unknown {level} test '{name}' for {context}")]
    InvalidTest {
        context: String,
        level: &'static str,
        name: String,
    },

    /// M005: SQL-derived and declared metadata disagree
    #[error("[M005] Metadata conflict: {message}")]
    MetadataConflict { message: String },

    /// M006: Companion metadata could not be parsed
    #[error("[M006] Failed to parse metadata {path}: {details}")]
    MetadataParseError { path: String, details: String },

    /// C001: Two source files define the same table
    #[error("[C001] Model '{name}' is defined in both {existing_path} and {new_path}")]
    ModelConflict {
        name: String,
        existing_path: String,
        new_path: String,
    },

    /// C002: Two source files define the same function
    #[error("[C002] Function '{name}' is defined in both {existing_path} and {new_path}")]
    FunctionConflict {
        name: String,
        existing_path: String,
        new_path: String,
    },

    /// E014: IO error
    #[error("[E014] IO error: {0}")]
    Io(#[from] std::io::Error),

    /// E016: IO error with file path context
    #[error("[E016] Failed to read '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },

    /// E015: YAML parse error
    #[error("[E015] YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Whether this error belongs to the metadata family (validation or merge).
    ///
    /// Metadata errors are fatal to the object being parsed but never to its
    /// siblings in a batch.
    pub fn is_metadata_error(&self) -> bool {
        matches!(
            self,
            CoreError::MetadataValidation { .. }
                | CoreError::EmptyName { .. }
                | CoreError::InvalidMaterialization { .. }
                | CoreError::InvalidIncremental { .. }
                | CoreError::InvalidTest { .. }
                | CoreError::MetadataConflict { .. }
                | CoreError::MetadataParseError { .. }
        )
    }

    /// Whether this error is a registry identity conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            CoreError::ModelConflict { .. } | CoreError::FunctionConflict { .. }
        )
    }
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
