//! Error types for kiln-ots

use kiln_core::CoreError;
use thiserror::Error;

/// OTS conversion and loading errors
#[derive(Error, Debug)]
pub enum OtsError {
    /// SQL transformation without code (OTS001)
    #[error("[OTS001] Transformation '{transformation_id}' has no SQL code")]
    MissingSql { transformation_id: String },

    /// Transformation type other than SQL (OTS002)
    #[error("[OTS002] Transformation '{transformation_id}' has unsupported type '{kind}'")]
    UnsupportedTransformation {
        transformation_id: String,
        kind: String,
    },

    /// Transformation or function metadata cannot be mapped (OTS003)
    #[error("[OTS003] Invalid metadata for '{transformation_id}': {message}")]
    InvalidMetadata {
        transformation_id: String,
        message: String,
    },

    /// Module document could not be read or parsed (OTS004)
    #[error("[OTS004] Failed to load OTS module {path}: {details}")]
    Load { path: String, details: String },

    /// Core library error
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl OtsError {
    /// Id of the transformation or function the error belongs to, if any
    pub fn transformation_id(&self) -> Option<&str> {
        match self {
            OtsError::MissingSql { transformation_id }
            | OtsError::UnsupportedTransformation {
                transformation_id, ..
            }
            | OtsError::InvalidMetadata {
                transformation_id, ..
            } => Some(transformation_id),
            _ => None,
        }
    }
}

/// Result type alias for OtsError
pub type OtsResult<T> = Result<T, OtsError>;
