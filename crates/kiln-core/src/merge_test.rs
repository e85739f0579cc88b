use super::*;
use serde_json::json;

fn raw(value: Value) -> RawMetadata {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {}", other),
    }
}

fn calc_derived() -> RawMetadata {
    raw(json!({
        "function_name": "calculate_percentage",
        "parameters": [
            {"name": "numerator", "type": "DOUBLE"},
            {"name": "denominator", "type": "DOUBLE"}
        ],
        "return_type": "DOUBLE"
    }))
}

#[test]
fn test_parameter_name_conflict_at_position_one() {
    let declared = raw(json!({
        "parameters": [
            {"name": "top", "type": "DOUBLE"},
            {"name": "denominator", "type": "DOUBLE"}
        ]
    }));
    let err = merge_metadata(&calc_derived(), &declared).unwrap_err();
    assert!(matches!(err, CoreError::MetadataConflict { .. }));
    let msg = err.to_string();
    assert!(msg.contains("parameter 1"), "got: {}", msg);
    assert!(msg.contains("numerator"), "got: {}", msg);
    assert!(msg.contains("top"), "got: {}", msg);
}

#[test]
fn test_parameter_count_conflict() {
    let declared = raw(json!({
        "parameters": [{"name": "numerator", "type": "DOUBLE"}]
    }));
    let err = merge_metadata(&calc_derived(), &declared).unwrap_err();
    assert!(err.to_string().contains("2 parameter(s) in SQL but 1"), "got: {}", err);
}

#[test]
fn test_function_name_conflict() {
    let declared = raw(json!({"function_name": "calc_pct"}));
    let err = merge_metadata(&calc_derived(), &declared).unwrap_err();
    assert!(err.to_string().contains("calc_pct"), "got: {}", err);
}

#[test]
fn test_unqualified_name_agrees_with_qualified() {
    let declared = raw(json!({"function_name": "utils.calculate_percentage"}));
    let merged = merge_metadata(&calc_derived(), &declared).unwrap();
    assert_eq!(merged["function_name"], "utils.calculate_percentage");
}

#[test]
fn test_table_name_conflict() {
    let derived = raw(json!({"table_name": "orders"}));
    let declared = raw(json!({"table_name": "customers"}));
    assert!(merge_metadata(&derived, &declared).is_err());
}

#[test]
fn test_return_type_mismatch_declared_wins() {
    let declared = raw(json!({"return_type": "NUMERIC(10, 2)"}));
    let merged = merge_metadata(&calc_derived(), &declared).unwrap();
    assert_eq!(merged["return_type"], "NUMERIC(10, 2)");
}

#[test]
fn test_return_type_case_insensitive() {
    let declared = raw(json!({"return_type": "double"}));
    let merged = merge_metadata(&calc_derived(), &declared).unwrap();
    assert_eq!(merged["return_type"], "double");
}

#[test]
fn test_declared_parameter_fields_overlay_derived() {
    let declared = raw(json!({
        "parameters": [
            {"name": "numerator", "description": "part"},
            {"name": "denominator", "description": "whole"}
        ]
    }));
    let merged = merge_metadata(&calc_derived(), &declared).unwrap();
    assert_eq!(merged["parameters"][0]["type"], "DOUBLE");
    assert_eq!(merged["parameters"][0]["description"], "part");
    assert_eq!(merged["parameters"][1]["description"], "whole");
}

#[test]
fn test_empty_declared_values_do_not_override() {
    let derived = raw(json!({
        "table_name": "orders",
        "tags": ["core"],
        "description": "from sql"
    }));
    let declared = raw(json!({
        "tags": [],
        "description": null,
        "materialization": "table"
    }));
    let merged = merge_metadata(&derived, &declared).unwrap();
    assert_eq!(merged["tags"], json!(["core"]));
    assert_eq!(merged["description"], "from sql");
    assert_eq!(merged["materialization"], "table");
    assert_eq!(merged["table_name"], "orders");
}

#[test]
fn test_declared_empty_string_overrides_scalar() {
    let derived = raw(json!({
        "function_name": "f",
        "return_type": "INT",
        "language": "sql",
        "description": "from sql"
    }));
    let declared = raw(json!({
        "function_name": "",
        "description": "",
        "language": null
    }));
    let merged = merge_metadata(&derived, &declared).unwrap();
    assert_eq!(merged["description"], "");
    assert_eq!(merged["language"], "sql");
    assert_eq!(merged["function_name"], "f");
    assert_eq!(merged["return_type"], "INT");
}

#[test]
fn test_empty_declared_parameters_keep_derived() {
    let declared = raw(json!({"parameters": [], "deterministic": true}));
    let merged = merge_metadata(&calc_derived(), &declared).unwrap();
    assert_eq!(merged["parameters"].as_array().unwrap().len(), 2);
    assert_eq!(merged["deterministic"], true);
}
