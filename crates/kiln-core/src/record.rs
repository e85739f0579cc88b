//! Canonical model and function records
//!
//! A record bundles the parsed code envelope, the validated metadata, and a
//! content hash. Records are produced once per parse by `build()`; the only
//! later changes allowed are attaching a resolved SQL rewrite or an
//! evaluation error.

use crate::checksum::compute_checksum;
use crate::dialect::Dialect;
use crate::function_name::FunctionName;
use crate::metadata::{FunctionMetadata, FunctionType, ModelMetadata};
use crate::model_name::ModelName;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// Kind of top-level SQL statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    #[default]
    Select,
    Insert,
    Update,
    Delete,
    Merge,
    CreateTable,
    CreateView,
    CreateFunction,
    CreateMacro,
    Other,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Select => "select",
            OperationType::Insert => "insert",
            OperationType::Update => "update",
            OperationType::Delete => "delete",
            OperationType::Merge => "merge",
            OperationType::CreateTable => "create_table",
            OperationType::CreateView => "create_view",
            OperationType::CreateFunction => "create_function",
            OperationType::CreateMacro => "create_macro",
            OperationType::Other => "other",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SQL text and the references recovered from it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SqlCode {
    /// SQL exactly as read from the source
    pub original_sql: String,

    /// SQL with unqualified table references schema-qualified
    pub resolved_sql: String,

    /// Kind of the top-level statement
    pub operation_type: OperationType,

    /// Tables read by the statement
    pub source_tables: BTreeSet<String>,

    /// User-defined functions called by the statement
    pub source_functions: BTreeSet<String>,
}

impl SqlCode {
    /// Code envelope whose resolved SQL equals the original
    pub fn new(sql: impl Into<String>, operation_type: OperationType) -> Self {
        let sql = sql.into();
        Self {
            resolved_sql: sql.clone(),
            original_sql: sql,
            operation_type,
            source_tables: BTreeSet::new(),
            source_functions: BTreeSet::new(),
        }
    }
}

/// `{"sql": {...}}` wrapper carried by every code-backed record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeEnvelope {
    pub sql: SqlCode,
}

impl From<SqlCode> for CodeEnvelope {
    fn from(sql: SqlCode) -> Self {
        Self { sql }
    }
}

/// Canonical representation of a model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalModel {
    code: Option<CodeEnvelope>,
    model_metadata: ModelMetadata,
    content_hash: String,
    needs_evaluation: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    evaluation_error: Option<String>,
}

impl CanonicalModel {
    /// Assemble a model record and stamp its content hash.
    ///
    /// Code-backed models hash their resolved SQL. Models without code are
    /// marked `needs_evaluation` and hash their metadata instead.
    pub fn build(
        metadata: ModelMetadata,
        code: Option<CodeEnvelope>,
        file_path: Option<PathBuf>,
    ) -> Self {
        let content_hash = match &code {
            Some(code) => compute_checksum(&code.sql.resolved_sql),
            None => metadata_hash(&metadata),
        };
        Self {
            needs_evaluation: code.is_none(),
            code,
            model_metadata: metadata,
            content_hash,
            file_path,
            evaluation_error: None,
        }
    }

    /// Model identity (the target table)
    pub fn name(&self) -> &ModelName {
        &self.model_metadata.table_name
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.model_metadata
    }

    pub fn code(&self) -> Option<&CodeEnvelope> {
        self.code.as_ref()
    }

    /// SQL block of the code envelope, if any
    pub fn sql(&self) -> Option<&SqlCode> {
        self.code.as_ref().map(|c| &c.sql)
    }

    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    pub fn needs_evaluation(&self) -> bool {
        self.needs_evaluation
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    pub fn evaluation_error(&self) -> Option<&str> {
        self.evaluation_error.as_deref()
    }

    /// Tables this model reads (empty for models without code)
    pub fn source_tables(&self) -> impl Iterator<Item = &str> {
        self.sql()
            .into_iter()
            .flat_map(|s| s.source_tables.iter().map(String::as_str))
    }

    /// Functions this model calls (empty for models without code)
    pub fn source_functions(&self) -> impl Iterator<Item = &str> {
        self.sql()
            .into_iter()
            .flat_map(|s| s.source_functions.iter().map(String::as_str))
    }

    /// Attach a resolved SQL rewrite; the hash follows the new text.
    pub fn set_resolved_sql(&mut self, resolved_sql: impl Into<String>) {
        if let Some(code) = self.code.as_mut() {
            code.sql.resolved_sql = resolved_sql.into();
            self.content_hash = compute_checksum(&code.sql.resolved_sql);
        }
    }

    /// Record why evaluating this model failed
    pub fn set_evaluation_error(&mut self, error: impl Into<String>) {
        self.evaluation_error = Some(error.into());
    }
}

/// Registry identity of a function: qualified name plus parameter types
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FunctionKey {
    pub name: FunctionName,
    pub signature: Vec<String>,
}

impl fmt::Display for FunctionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.signature.join(", "))
    }
}

/// Canonical representation of a user-defined function or macro
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalFunction {
    code: Option<CodeEnvelope>,
    function_metadata: FunctionMetadata,
    content_hash: String,
    needs_evaluation: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    evaluation_error: Option<String>,
}

impl CanonicalFunction {
    /// Assemble a function record and stamp its content hash.
    ///
    /// Code-backed functions hash the raw definition text.
    pub fn build(
        metadata: FunctionMetadata,
        code: Option<CodeEnvelope>,
        file_path: Option<PathBuf>,
    ) -> Self {
        let content_hash = match &code {
            Some(code) => compute_checksum(&code.sql.original_sql),
            None => function_metadata_hash(&metadata),
        };
        Self {
            needs_evaluation: code.is_none(),
            code,
            function_metadata: metadata,
            content_hash,
            file_path,
            evaluation_error: None,
        }
    }

    /// Function name as declared
    pub fn name(&self) -> &FunctionName {
        &self.function_metadata.function_name
    }

    /// Name qualified with the metadata schema when one is known
    pub fn qualified_name(&self) -> FunctionName {
        self.function_metadata.qualified_name()
    }

    /// Registry key: qualified name and uppercased parameter types
    pub fn key(&self) -> FunctionKey {
        FunctionKey {
            name: self.qualified_name(),
            signature: self.function_metadata.parameter_types(),
        }
    }

    pub fn metadata(&self) -> &FunctionMetadata {
        &self.function_metadata
    }

    pub fn code(&self) -> Option<&CodeEnvelope> {
        self.code.as_ref()
    }

    pub fn sql(&self) -> Option<&SqlCode> {
        self.code.as_ref().map(|c| &c.sql)
    }

    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    pub fn needs_evaluation(&self) -> bool {
        self.needs_evaluation
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    pub fn evaluation_error(&self) -> Option<&str> {
        self.evaluation_error.as_deref()
    }

    /// Tables read by the function body
    pub fn source_tables(&self) -> impl Iterator<Item = &str> {
        self.sql()
            .into_iter()
            .flat_map(|s| s.source_tables.iter().map(String::as_str))
    }

    /// Other user functions called by the body
    pub fn source_functions(&self) -> impl Iterator<Item = &str> {
        self.sql()
            .into_iter()
            .flat_map(|s| s.source_functions.iter().map(String::as_str))
    }

    /// Attach a resolved SQL rewrite. The hash stays on the raw definition.
    pub fn set_resolved_sql(&mut self, resolved_sql: impl Into<String>) {
        if let Some(code) = self.code.as_mut() {
            code.sql.resolved_sql = resolved_sql.into();
        }
    }

    pub fn set_evaluation_error(&mut self, error: impl Into<String>) {
        self.evaluation_error = Some(error.into());
    }

    /// `DROP` statement for this function in the given dialect.
    ///
    /// DuckDB definitions are macros; engines that overload by signature get
    /// the parameter types.
    pub fn drop_statement(&self, dialect: Dialect) -> String {
        let name = self.qualified_name();
        match dialect {
            Dialect::DuckDb => match self.function_metadata.function_type {
                FunctionType::Table => format!("DROP MACRO TABLE IF EXISTS {}", name),
                _ => format!("DROP MACRO IF EXISTS {}", name),
            },
            Dialect::MySql | Dialect::BigQuery | Dialect::Sqlite | Dialect::Spark => {
                format!("DROP FUNCTION IF EXISTS {}", name)
            }
            _ => format!(
                "DROP FUNCTION IF EXISTS {}({})",
                name,
                self.function_metadata.parameter_types().join(", ")
            ),
        }
    }
}

fn metadata_hash(metadata: &ModelMetadata) -> String {
    compute_checksum(&serde_json::to_string(metadata).unwrap_or_default())
}

fn function_metadata_hash(metadata: &FunctionMetadata) -> String {
    compute_checksum(&serde_json::to_string(metadata).unwrap_or_default())
}

#[cfg(test)]
#[path = "record_test.rs"]
mod tests;
