//! kiln-ots - Open Transformation Specification exchange for Kiln
//!
//! Reads OTS modules from JSON or YAML, converts their transformations and
//! functions into canonical records, and exports a project back into a
//! module.

pub mod error;
pub mod export;
pub mod import;
pub mod module;

pub use error::{OtsError, OtsResult};
pub use export::export_module;
pub use import::{convert_module, convert_module_from, ConvertedModule};
pub use module::{OtsFunction, OtsModule, OtsTarget, OtsTransformation};
