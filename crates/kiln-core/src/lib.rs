//! kiln-core - Core library for Kiln
//!
//! This crate provides the metadata schema and validator, dialect inference,
//! the metadata merge engine, canonical model/function records, the project
//! registries, and the dependency DAG shared by every Kiln component.

pub mod checksum;
pub mod config;
pub mod dag;
pub mod dialect;
pub mod error;
pub mod function_name;
pub mod merge;
pub mod metadata;
pub mod model_name;
mod newtype_string;
pub mod record;
pub mod registry;
pub mod sql_utils;

pub use checksum::compute_checksum;
pub use config::{Config, ConnectionConfig};
pub use dag::{DagNode, ProjectDag};
pub use dialect::{infer_dialect, infer_dialect_with_source, Dialect, DialectSource};
pub use error::{CoreError, CoreResult};
pub use function_name::FunctionName;
pub use merge::merge_metadata;
pub use metadata::{
    validate_function_metadata, validate_metadata, validate_model_metadata, ColumnDefinition,
    ColumnType, FunctionMetadata, FunctionParameter, FunctionType, IncrementalConfig,
    IncrementalStrategy, Materialization, ModelMetadata, ParameterMode, RawMetadata, TestRef,
};
pub use model_name::ModelName;
pub use record::{CanonicalFunction, CanonicalModel, CodeEnvelope, FunctionKey, OperationType, SqlCode};
pub use registry::{FunctionRegistry, ModelRegistry, ProjectContext, Registry};
