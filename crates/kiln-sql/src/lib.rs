//! kiln-sql - SQL parsing layer for Kiln
//!
//! This crate provides SQL parsing using sqlparser-rs with dialect support,
//! lexical and AST-based reference extraction, the function and model
//! parsers, companion metadata resolution, and resolved-SQL qualification.

pub mod cache;
pub mod dialect;
pub mod error;
pub mod extractor;
pub mod function;
pub mod inline;
pub mod model;
pub mod params;
pub mod parser;
pub mod qualify;
pub mod references;
pub mod resolver;
pub mod strategy;
pub mod text;

pub use error::{SqlError, SqlResult};
pub use extractor::extract_dependencies;
pub use function::FunctionParser;
pub use inline::extract_inline_metadata;
pub use model::ModelParser;
pub use parser::SqlParser;
pub use qualify::qualify_table_references;
pub use references::{extract_references, References};
pub use resolver::{
    CompanionMetadata, FsMetadataResolver, InMemoryMetadataResolver, MetadataResolver,
};
pub use strategy::{AstStrategy, FallbackStrategy, FunctionDefinition, FunctionStrategy};
