//! Integration tests for loading OTS modules from disk

use kiln_ots::{convert_module_from, OtsError, OtsModule};
use std::fs;
use tempfile::TempDir;

const MODULE_JSON: &str = r#"{
  "ots_version": "0.1.0",
  "module_name": "analytics",
  "target": {"schema": "analytics", "sql_dialect": "postgres"},
  "transformations": [
    {
      "transformation_id": "analytics.daily_revenue",
      "code": {"sql": {"original_sql": "SELECT day, sum(amount) AS revenue FROM payments GROUP BY day"}},
      "materialization": {"type": "view"}
    }
  ]
}"#;

#[test]
fn test_load_json_by_extension() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("analytics.json");
    fs::write(&path, MODULE_JSON).unwrap();

    let module = OtsModule::load(&path).unwrap();
    assert_eq!(module.module_name, "analytics");

    let converted = convert_module_from(&module, Some(&path)).into_result().unwrap();
    let model = &converted.models["analytics.daily_revenue"];
    assert_eq!(model.file_path(), Some(path.as_path()));
    assert_eq!(model.source_tables().collect::<Vec<_>>(), vec!["payments"]);
}

#[test]
fn test_load_yaml_and_write_back() {
    let dir = TempDir::new().unwrap();
    let json_module = OtsModule::from_json_str(MODULE_JSON).unwrap();
    let path = dir.path().join("analytics.ots.yml");
    fs::write(&path, json_module.to_yaml_string().unwrap()).unwrap();

    let module = OtsModule::load(&path).unwrap();
    assert_eq!(module, json_module);
}

#[test]
fn test_load_errors_name_the_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.yaml");
    fs::write(&path, "module_name: [unclosed").unwrap();

    let err = OtsModule::load(&path).unwrap_err();
    assert!(matches!(err, OtsError::Load { .. }));
    assert!(err.to_string().contains("broken.yaml"), "got: {}", err);

    let missing = OtsModule::load(&dir.path().join("absent.json")).unwrap_err();
    assert!(missing.to_string().contains("absent.json"), "got: {}", missing);
}
