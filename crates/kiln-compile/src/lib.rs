//! kiln-compile - Project compilation for Kiln
//!
//! Turns SQL files, OTS modules, and declared non-SQL objects into
//! registered canonical records and a deterministic execution order.

pub mod compile;
pub mod error;
pub mod manifest;

pub use compile::{
    compile_project, infer_kind, CompileOutcome, CompiledProject, Compiler, ObjectFailure,
    ProjectFile, ProjectInputs,
};
pub use error::{CompileError, CompileResult};
pub use manifest::{ManifestEntry, ObjectKind, ObjectManifest};
