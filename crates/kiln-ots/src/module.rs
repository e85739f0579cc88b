//! OTS module document types
//!
//! An OTS module is a portable description of a set of transformations and
//! functions targeting one schema. Documents are read from and written to
//! JSON or YAML with serde.

use crate::error::{OtsError, OtsResult};
use kiln_core::{Dialect, TestRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// OTS version written by the exporter
pub const OTS_VERSION: &str = "0.1.0";

fn default_ots_version() -> String {
    OTS_VERSION.to_string()
}

fn default_transformation_type() -> String {
    "sql".to_string()
}

fn default_function_type() -> String {
    "scalar".to_string()
}

fn default_materialization_type() -> String {
    "table".to_string()
}

/// Top-level OTS module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtsModule {
    #[serde(default = "default_ots_version")]
    pub ots_version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,

    pub module_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_description: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(default)]
    pub target: OtsTarget,

    #[serde(default)]
    pub transformations: Vec<OtsTransformation>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub functions: Vec<OtsFunction>,
}

/// Where the module's objects are deployed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OtsTarget {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql_dialect: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_profile: Option<String>,
}

/// A single transformation (model)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtsTransformation {
    /// Fully qualified target name; transformations without one are skipped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transformation_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default = "default_transformation_type")]
    pub transformation_type: String,

    #[serde(default)]
    pub code: OtsCode,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<OtsSchema>,

    #[serde(default)]
    pub materialization: OtsMaterialization,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tests: Option<OtsTests>,

    #[serde(default)]
    pub metadata: OtsObjectMetadata,
}

/// Code block of a transformation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OtsCode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql: Option<OtsSql>,
}

/// SQL text and the references recorded with it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OtsSql {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_sql: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_sql: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_tables: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_functions: Vec<String>,
}

impl OtsSql {
    /// Resolved SQL when present, else the original
    pub fn text(&self) -> Option<&str> {
        self.resolved_sql
            .as_deref()
            .or(self.original_sql.as_deref())
            .filter(|s| !s.trim().is_empty())
    }
}

/// Output schema of a transformation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OtsSchema {
    #[serde(default)]
    pub columns: Vec<OtsColumn>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub partitioning: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtsColumn {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datatype: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Materialization directive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtsMaterialization {
    #[serde(rename = "type", default = "default_materialization_type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incremental_details: Option<OtsIncrementalDetails>,
}

impl Default for OtsMaterialization {
    fn default() -> Self {
        Self {
            kind: default_materialization_type(),
            incremental_details: None,
        }
    }
}

/// Portable incremental settings.
///
/// The condition fields are free text; only `merge_key` and
/// `delete_condition` map onto typed fields when importing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtsIncrementalDetails {
    pub strategy: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_condition: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_condition: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub merge_key: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub update_columns: Vec<String>,
}

/// Declared tests, per column and per table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OtsTests {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub columns: BTreeMap<String, Vec<TestRef>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub table: Vec<TestRef>,
}

/// Ownership and tagging information
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OtsObjectMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub object_tags: BTreeMap<String, String>,
}

/// A user-defined function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtsFunction {
    /// Function name, optionally schema-qualified
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default = "default_function_type")]
    pub function_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<OtsParameter>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,

    #[serde(default)]
    pub deterministic: bool,

    #[serde(default)]
    pub code: OtsFunctionCode,

    #[serde(default)]
    pub dependencies: OtsDependencies,

    #[serde(default)]
    pub metadata: OtsObjectMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtsParameter {
    pub name: String,

    #[serde(rename = "type", default)]
    pub data_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

/// Function definition text, generic and per database
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OtsFunctionCode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generic_sql: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub database_specific: BTreeMap<String, String>,
}

impl OtsFunctionCode {
    /// Definition for `dialect`, falling back to the generic text
    pub fn for_dialect(&self, dialect: Option<&str>) -> Option<&str> {
        dialect
            .and_then(|d| {
                self.database_specific
                    .iter()
                    .find(|(db, _)| same_dialect(db, d))
                    .map(|(_, sql)| sql.as_str())
            })
            .or(self.generic_sql.as_deref())
            .filter(|s| !s.trim().is_empty())
    }
}

/// Database names match case-insensitively or through their dialect alias
/// (`postgresql` and `postgres`).
fn same_dialect(a: &str, b: &str) -> bool {
    if a.eq_ignore_ascii_case(b) {
        return true;
    }
    match (a.parse::<Dialect>(), b.parse::<Dialect>()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OtsDependencies {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub functions: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tables: Vec<String>,
}

impl OtsModule {
    /// Empty module for a target
    pub fn new(module_name: impl Into<String>, target: OtsTarget) -> Self {
        Self {
            ots_version: default_ots_version(),
            project_name: None,
            module_name: module_name.into(),
            module_description: None,
            tags: Vec::new(),
            target,
            transformations: Vec::new(),
            functions: Vec::new(),
        }
    }

    pub fn from_json_str(content: &str) -> OtsResult<Self> {
        serde_json::from_str(content).map_err(|e| OtsError::Load {
            path: "<json>".to_string(),
            details: e.to_string(),
        })
    }

    pub fn from_yaml_str(content: &str) -> OtsResult<Self> {
        serde_yaml::from_str(content).map_err(|e| OtsError::Load {
            path: "<yaml>".to_string(),
            details: e.to_string(),
        })
    }

    /// Load a module file, choosing the format by extension
    /// (`.json`, else YAML)
    pub fn load(path: &Path) -> OtsResult<Self> {
        let load_err = |details: String| OtsError::Load {
            path: path.display().to_string(),
            details,
        };
        let content = std::fs::read_to_string(path).map_err(|e| load_err(e.to_string()))?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if is_json {
            serde_json::from_str(&content).map_err(|e| load_err(e.to_string()))
        } else {
            serde_yaml::from_str(&content).map_err(|e| load_err(e.to_string()))
        }
    }

    pub fn to_json_string(&self) -> OtsResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| OtsError::Load {
            path: self.module_name.clone(),
            details: e.to_string(),
        })
    }

    pub fn to_yaml_string(&self) -> OtsResult<String> {
        serde_yaml::to_string(self).map_err(|e| OtsError::Load {
            path: self.module_name.clone(),
            details: e.to_string(),
        })
    }
}
