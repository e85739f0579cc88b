//! Canonical metadata envelopes for models and functions
//!
//! Raw metadata arrives as a JSON-shaped map, either from a companion
//! declarative file (`orders.yml`, `orders.json`) or from an inline
//! `-- metadata: {...}` SQL comment. [`validate`] checks and normalizes it into
//! [`ModelMetadata`] / [`FunctionMetadata`].

pub mod incremental;
pub mod testing;
pub mod validate;

pub use incremental::{
    AppendConfig, DeleteInsertConfig, IncrementalConfig, IncrementalStrategy, MergeConfig,
};
pub use testing::{TestRef, TestSeverity, TestSpec, COLUMN_TESTS, MODEL_TESTS};
pub use validate::{validate_function_metadata, validate_metadata, validate_model_metadata};

use crate::error::{CoreError, CoreResult};
use crate::function_name::FunctionName;
use crate::model_name::ModelName;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// Untyped metadata dictionary as declared or derived
pub type RawMetadata = serde_json::Map<String, Value>;

/// Logical column data type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    String,
    Number,
    Integer,
    Float,
    Boolean,
    Timestamp,
    Date,
    Time,
    Json,
    Array,
    Object,
}

impl ColumnType {
    /// All accepted datatype names
    pub const NAMES: &'static [&'static str] = &[
        "string",
        "number",
        "integer",
        "float",
        "boolean",
        "timestamp",
        "date",
        "time",
        "json",
        "array",
        "object",
    ];

    /// Lowercase datatype name
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::String => "string",
            ColumnType::Number => "number",
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::Boolean => "boolean",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Date => "date",
            ColumnType::Time => "time",
            ColumnType::Json => "json",
            ColumnType::Array => "array",
            ColumnType::Object => "object",
        }
    }

    /// Parse a datatype name, case-insensitively
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "string" => Some(ColumnType::String),
            "number" => Some(ColumnType::Number),
            "integer" => Some(ColumnType::Integer),
            "float" => Some(ColumnType::Float),
            "boolean" => Some(ColumnType::Boolean),
            "timestamp" => Some(ColumnType::Timestamp),
            "date" => Some(ColumnType::Date),
            "time" => Some(ColumnType::Time),
            "json" => Some(ColumnType::Json),
            "array" => Some(ColumnType::Array),
            "object" => Some(ColumnType::Object),
            _ => None,
        }
    }
}

/// A column declared in a model's schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    /// Column name
    pub name: String,

    /// Logical data type
    pub datatype: ColumnType,

    /// Column description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Column-level tests
    #[serde(default)]
    pub tests: Vec<TestRef>,
}

/// How a model is materialized in the target database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Materialization {
    /// CREATE TABLE AS
    Table,
    /// CREATE VIEW
    View,
    /// Incremental table, see [`IncrementalConfig`]
    Incremental,
    /// Slowly changing dimension, type 2
    Scd2,
}

impl Materialization {
    /// All accepted materialization names
    pub const NAMES: &'static [&'static str] = &["table", "view", "incremental", "scd2"];

    /// Lowercase materialization name
    pub fn as_str(&self) -> &'static str {
        match self {
            Materialization::Table => "table",
            Materialization::View => "view",
            Materialization::Incremental => "incremental",
            Materialization::Scd2 => "scd2",
        }
    }

    /// Parse a materialization name, case-insensitively
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "table" => Some(Materialization::Table),
            "view" => Some(Materialization::View),
            "incremental" => Some(Materialization::Incremental),
            "scd2" => Some(Materialization::Scd2),
            _ => None,
        }
    }
}

/// Whether a function returns a value, a table, or aggregates rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FunctionType {
    /// Returns a single value
    #[default]
    Scalar,
    /// Returns a set of rows
    Table,
    /// Aggregate function
    Aggregate,
}

impl std::fmt::Display for FunctionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FunctionType::Scalar => write!(f, "scalar"),
            FunctionType::Table => write!(f, "table"),
            FunctionType::Aggregate => write!(f, "aggregate"),
        }
    }
}

impl FunctionType {
    /// Parse a function type name, case-insensitively
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "scalar" => Some(FunctionType::Scalar),
            "table" => Some(FunctionType::Table),
            "aggregate" => Some(FunctionType::Aggregate),
            _ => None,
        }
    }
}

/// Parameter passing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterMode {
    #[serde(rename = "IN", alias = "in")]
    In,
    #[serde(rename = "OUT", alias = "out")]
    Out,
    #[serde(rename = "INOUT", alias = "inout")]
    InOut,
}

impl ParameterMode {
    /// Parse a mode keyword, case-insensitively
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word.to_ascii_uppercase().as_str() {
            "IN" => Some(ParameterMode::In),
            "OUT" => Some(ParameterMode::Out),
            "INOUT" => Some(ParameterMode::InOut),
            _ => None,
        }
    }
}

/// A single function parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionParameter {
    /// Parameter name
    pub name: String,

    /// SQL data type as written; empty for untyped macro parameters
    #[serde(rename = "type", default)]
    pub data_type: String,

    /// Description of the parameter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Default value expression
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    /// Passing mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<ParameterMode>,
}

impl FunctionParameter {
    /// Typed parameter without default or mode
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            description: None,
            default: None,
            mode: None,
        }
    }
}

/// Validated metadata envelope of a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Target table, optionally schema-qualified; the model's identity
    pub table_name: ModelName,

    /// Model description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Declared output columns
    #[serde(default, alias = "columns")]
    pub schema: Vec<ColumnDefinition>,

    /// Materialization strategy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub materialization: Option<Materialization>,

    /// Incremental configuration (required when materialization is incremental)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incremental: Option<IncrementalConfig>,

    /// Model-level tests
    #[serde(default)]
    pub tests: Vec<TestRef>,

    /// Partition columns
    #[serde(default)]
    pub partitions: Vec<String>,

    /// Free-form tags
    #[serde(default)]
    pub tags: Vec<String>,

    /// Key/value tags attached to the database object
    #[serde(default)]
    pub object_tags: BTreeMap<String, String>,

    /// Any other declared keys, carried through untouched
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ModelMetadata {
    /// Minimal metadata for a table with every optional field defaulted
    pub fn new(table_name: ModelName) -> Self {
        Self {
            table_name,
            description: None,
            schema: Vec::new(),
            materialization: None,
            incremental: None,
            tests: Vec::new(),
            partitions: Vec::new(),
            tags: Vec::new(),
            object_tags: BTreeMap::new(),
            extra: BTreeMap::new(),
        }
    }

    /// Look up a declared column by name (case-insensitive)
    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.schema
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

/// Validated metadata envelope of a function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionMetadata {
    /// Function name as declared, optionally schema-qualified
    pub function_name: FunctionName,

    /// Database schema the function is deployed into
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Description of the function
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Scalar, table, or aggregate
    #[serde(default)]
    pub function_type: FunctionType,

    /// Implementation language (`sql`, `plpgsql`, `javascript`, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// Ordered parameter list
    #[serde(default)]
    pub parameters: Vec<FunctionParameter>,

    /// Return type phrase as written (`DOUBLE`, `TABLE(id INT)`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,

    /// Dialect the definition was parsed with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialect: Option<String>,

    /// Whether the function always returns the same result for the same input
    #[serde(default)]
    pub deterministic: bool,

    /// Free-form tags
    #[serde(default)]
    pub tags: Vec<String>,

    /// Key/value tags attached to the database object
    #[serde(default)]
    pub object_tags: BTreeMap<String, String>,

    /// Declared tests
    #[serde(default)]
    pub tests: Vec<TestRef>,

    /// Any other declared keys, carried through untouched
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl FunctionMetadata {
    /// Minimal metadata for a function with every optional field defaulted
    pub fn new(function_name: FunctionName) -> Self {
        Self {
            function_name,
            schema: None,
            description: None,
            function_type: FunctionType::Scalar,
            language: None,
            parameters: Vec::new(),
            return_type: None,
            dialect: None,
            deterministic: false,
            tags: Vec::new(),
            object_tags: BTreeMap::new(),
            tests: Vec::new(),
            extra: BTreeMap::new(),
        }
    }

    /// Schema-qualified name when a schema is known.
    ///
    /// A name that already carries a prefix is returned unchanged.
    pub fn qualified_name(&self) -> FunctionName {
        match &self.schema {
            Some(schema) => self.function_name.qualified_with(schema),
            None => self.function_name.clone(),
        }
    }

    /// Parameter data types in declaration order
    pub fn parameter_types(&self) -> Vec<String> {
        self.parameters
            .iter()
            .map(|p| p.data_type.to_ascii_uppercase())
            .collect()
    }
}

/// Parse a companion metadata document.
///
/// `.json` files are read as JSON, everything else as YAML (a JSON superset).
/// The document must be a mapping; a single top-level `metadata:` key wrapping
/// the mapping is unwrapped.
pub fn parse_metadata_document(content: &str, path: &Path) -> CoreResult<RawMetadata> {
    let is_json = path
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    let value: Value = if is_json {
        serde_json::from_str(content).map_err(|e| CoreError::MetadataParseError {
            path: path.display().to_string(),
            details: e.to_string(),
        })?
    } else {
        serde_yaml::from_str(content).map_err(|e| CoreError::MetadataParseError {
            path: path.display().to_string(),
            details: e.to_string(),
        })?
    };

    match value {
        Value::Object(mut map) => {
            if map.len() == 1 {
                if let Some(Value::Object(inner)) = map.remove("metadata") {
                    return Ok(inner);
                }
            }
            Ok(map)
        }
        Value::Null => Ok(RawMetadata::new()),
        other => Err(CoreError::MetadataParseError {
            path: path.display().to_string(),
            details: format!("expected a mapping at the top level, found {}", json_kind(&other)),
        }),
    }
}

/// Human-readable JSON value kind for error messages
pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_parse_yaml_document() {
        let raw = parse_metadata_document(
            "table_name: a.b\ntags: [x]\n",
            &PathBuf::from("models/b.yml"),
        )
        .unwrap();
        assert_eq!(raw.get("table_name").unwrap(), "a.b");
    }

    #[test]
    fn test_parse_json_document() {
        let raw = parse_metadata_document(
            r#"{"function_name": "f", "deterministic": true}"#,
            &PathBuf::from("functions/f.json"),
        )
        .unwrap();
        assert_eq!(raw.get("deterministic").unwrap(), &Value::Bool(true));
    }

    #[test]
    fn test_parse_wrapped_document() {
        let raw = parse_metadata_document(
            "metadata:\n  table_name: t\n",
            &PathBuf::from("t.yml"),
        )
        .unwrap();
        assert_eq!(raw.get("table_name").unwrap(), "t");
    }

    #[test]
    fn test_parse_non_mapping_rejected() {
        let err = parse_metadata_document("- a\n- b\n", &PathBuf::from("t.yml"))
            .unwrap_err()
            .to_string();
        assert!(err.contains("M006"), "got: {}", err);
        assert!(err.contains("t.yml"), "got: {}", err);
    }

    #[test]
    fn test_parse_empty_document() {
        let raw = parse_metadata_document("", &PathBuf::from("t.yml")).unwrap();
        assert!(raw.is_empty());
    }

    #[test]
    fn test_function_qualified_name() {
        let mut meta = FunctionMetadata::new(FunctionName::try_new("f").unwrap());
        assert_eq!(meta.qualified_name(), "f");
        meta.schema = Some("utils".into());
        assert_eq!(meta.qualified_name(), "utils.f");
    }

    #[test]
    fn test_model_metadata_columns_alias() {
        let meta: ModelMetadata = serde_json::from_value(serde_json::json!({
            "table_name": "t",
            "columns": [{"name": "id", "datatype": "integer"}],
            "owner": "data-team"
        }))
        .unwrap();
        assert_eq!(meta.schema.len(), 1);
        assert_eq!(meta.column("ID").unwrap().datatype, ColumnType::Integer);
        assert_eq!(meta.extra.get("owner").unwrap(), "data-team");
    }
}
