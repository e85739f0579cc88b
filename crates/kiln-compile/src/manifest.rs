//! Declarative object manifest
//!
//! Objects implemented outside SQL (a Python transformation, a remote UDF)
//! are declared as manifest entries. They carry metadata but no code, so the
//! records built from them are marked `needs_evaluation`.
//!
//! ```yaml
//! objects:
//!   - kind: model
//!     name: ml.churn_scores
//!     source_file: models/churn.py
//!     entry_point: score
//!     metadata:
//!       materialization: table
//! ```

use crate::error::{CompileError, CompileResult};
use kiln_core::{
    merge_metadata, validate_function_metadata, validate_model_metadata, CanonicalFunction,
    CanonicalModel, RawMetadata,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// What a source object defines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Model,
    Function,
}

/// One declared object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub kind: ObjectKind,

    /// Table name for models, function name for functions
    pub name: String,

    /// File implementing the object; also its registry source path
    pub source_file: PathBuf,

    /// Callable inside `source_file`
    #[serde(default)]
    pub entry_point: Option<String>,

    /// Declared metadata, validated like a companion file
    #[serde(default)]
    pub metadata: RawMetadata,
}

/// A list of declared objects
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectManifest {
    #[serde(default)]
    pub objects: Vec<ManifestEntry>,
}

impl ObjectManifest {
    pub fn from_yaml_str(content: &str) -> CompileResult<Self> {
        serde_yaml::from_str(content).map_err(|e| CompileError::ManifestLoad {
            path: "<yaml>".to_string(),
            details: e.to_string(),
        })
    }

    pub fn load(path: &Path) -> CompileResult<Self> {
        let load_err = |details: String| CompileError::ManifestLoad {
            path: path.display().to_string(),
            details,
        };
        let content = std::fs::read_to_string(path).map_err(|e| load_err(e.to_string()))?;
        serde_yaml::from_str(&content).map_err(|e| load_err(e.to_string()))
    }
}

impl ManifestEntry {
    fn entry_error(&self, source: kiln_core::CoreError) -> CompileError {
        CompileError::ManifestEntry {
            name: self.name.clone(),
            path: self.source_file.display().to_string(),
            source,
        }
    }

    /// Merge the entry's own name and location into its declared metadata
    fn merged(&self, name_key: &str, name: String) -> CompileResult<RawMetadata> {
        let mut derived = RawMetadata::new();
        derived.insert(name_key.to_string(), Value::String(name));
        derived.insert(
            "source_file".to_string(),
            Value::String(self.source_file.display().to_string()),
        );
        if let Some(entry_point) = &self.entry_point {
            derived.insert(
                "entry_point".to_string(),
                Value::String(entry_point.clone()),
            );
        }
        merge_metadata(&derived, &self.metadata).map_err(|e| self.entry_error(e))
    }

    /// Model record without code.
    ///
    /// An unqualified name gets `default_schema`; a name declared in the
    /// metadata must agree with the entry's.
    pub fn to_model(&self, default_schema: Option<&str>) -> CompileResult<CanonicalModel> {
        let mut merged = self.merged("table_name", self.name.clone())?;
        if let (Some(schema), Some(Value::String(name))) =
            (default_schema, merged.get("table_name").cloned())
        {
            if !name.contains('.') && !schema.is_empty() {
                merged.insert(
                    "table_name".to_string(),
                    Value::String(format!("{}.{}", schema, name)),
                );
            }
        }
        let metadata = validate_model_metadata(&merged).map_err(|e| self.entry_error(e))?;
        Ok(CanonicalModel::build(
            metadata,
            None,
            Some(self.source_file.clone()),
        ))
    }

    /// Function record without code
    pub fn to_function(&self) -> CompileResult<CanonicalFunction> {
        let merged = self.merged("function_name", self.name.clone())?;
        let metadata = validate_function_metadata(&merged).map_err(|e| self.entry_error(e))?;
        Ok(CanonicalFunction::build(
            metadata,
            None,
            Some(self.source_file.clone()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"
objects:
  - kind: model
    name: churn_scores
    source_file: models/churn.py
    entry_point: score
    metadata:
      materialization: table
      tags: [ml]
  - kind: function
    name: sentiment
    source_file: functions/sentiment.py
    metadata:
      return_type: DOUBLE
      parameters:
        - name: text
          type: VARCHAR
"#;

    #[test]
    fn test_parse_manifest() {
        let manifest = ObjectManifest::from_yaml_str(MANIFEST).unwrap();
        assert_eq!(manifest.objects.len(), 2);
        assert_eq!(manifest.objects[0].kind, ObjectKind::Model);
        assert_eq!(manifest.objects[1].entry_point, None);
    }

    #[test]
    fn test_model_entry_needs_evaluation() {
        let manifest = ObjectManifest::from_yaml_str(MANIFEST).unwrap();
        let model = manifest.objects[0].to_model(Some("ml")).unwrap();
        assert_eq!(model.name(), "ml.churn_scores");
        assert!(model.needs_evaluation());
        assert!(model.code().is_none());
        assert_eq!(model.file_path(), Some(Path::new("models/churn.py")));
        assert_eq!(
            model.metadata().extra.get("entry_point"),
            Some(&Value::String("score".into()))
        );
        assert_eq!(model.metadata().tags, vec!["ml".to_string()]);
    }

    #[test]
    fn test_function_entry() {
        let manifest = ObjectManifest::from_yaml_str(MANIFEST).unwrap();
        let func = manifest.objects[1].to_function().unwrap();
        assert_eq!(func.key().to_string(), "sentiment(VARCHAR)");
        assert!(func.needs_evaluation());
    }

    #[test]
    fn test_entry_name_conflict() {
        let entry = ManifestEntry {
            kind: ObjectKind::Model,
            name: "a".into(),
            source_file: PathBuf::from("a.py"),
            entry_point: None,
            metadata: serde_json::json!({"table_name": "b"})
                .as_object()
                .cloned()
                .unwrap(),
        };
        let err = entry.to_model(None).unwrap_err();
        assert!(matches!(err, CompileError::ManifestEntry { .. }));
        assert!(err.to_string().contains("a.py"), "got: {}", err);
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let err = ObjectManifest::from_yaml_str(
            "objects:\n  - kind: view\n    name: v\n    source_file: v.py\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("K001"), "got: {}", err);
    }
}
