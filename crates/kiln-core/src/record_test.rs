use super::*;
use crate::metadata::FunctionParameter;

fn model_meta(name: &str) -> ModelMetadata {
    ModelMetadata::new(ModelName::try_new(name).unwrap())
}

fn calc_meta() -> FunctionMetadata {
    let mut meta = FunctionMetadata::new(FunctionName::try_new("calculate_percentage").unwrap());
    meta.parameters = vec![
        FunctionParameter::new("numerator", "double"),
        FunctionParameter::new("denominator", "DOUBLE"),
    ];
    meta.return_type = Some("DOUBLE".into());
    meta
}

#[test]
fn test_model_hash_follows_resolved_sql() {
    let mut sql = SqlCode::new("SELECT * FROM orders", OperationType::Select);
    sql.resolved_sql = "SELECT * FROM analytics.orders".into();
    let model = CanonicalModel::build(model_meta("analytics.result"), Some(sql.into()), None);

    assert_eq!(
        model.content_hash(),
        compute_checksum("SELECT * FROM analytics.orders")
    );
    assert!(!model.needs_evaluation());
}

#[test]
fn test_model_set_resolved_sql_rehashes() {
    let sql = SqlCode::new("SELECT 1", OperationType::Select);
    let mut model = CanonicalModel::build(model_meta("t"), Some(sql.into()), None);
    let before = model.content_hash().to_string();

    model.set_resolved_sql("SELECT 2");
    assert_ne!(model.content_hash(), before);
    assert_eq!(model.sql().unwrap().original_sql, "SELECT 1");
    assert_eq!(model.sql().unwrap().resolved_sql, "SELECT 2");
}

#[test]
fn test_model_without_code_needs_evaluation() {
    let mut model = CanonicalModel::build(model_meta("py_model"), None, None);
    assert!(model.needs_evaluation());
    assert!(model.code().is_none());
    assert_eq!(model.source_tables().count(), 0);
    assert_eq!(model.content_hash().len(), 64);

    model.set_evaluation_error("entry point not found");
    assert_eq!(model.evaluation_error(), Some("entry point not found"));
}

#[test]
fn test_function_hash_uses_original_sql() {
    let raw = "CREATE FUNCTION calculate_percentage(numerator DOUBLE, denominator DOUBLE) RETURNS DOUBLE AS $$ SELECT 1 $$";
    let mut sql = SqlCode::new(raw, OperationType::CreateFunction);
    sql.resolved_sql = "something else".into();
    let mut func = CanonicalFunction::build(calc_meta(), Some(sql.into()), None);

    assert_eq!(func.content_hash(), compute_checksum(raw));
    func.set_resolved_sql("rewritten");
    assert_eq!(func.content_hash(), compute_checksum(raw));
}

#[test]
fn test_function_key_includes_signature() {
    let func = CanonicalFunction::build(calc_meta(), None, None);
    let key = func.key();
    assert_eq!(key.name, "calculate_percentage");
    assert_eq!(key.signature, vec!["DOUBLE".to_string(), "DOUBLE".to_string()]);
    assert_eq!(key.to_string(), "calculate_percentage(DOUBLE, DOUBLE)");
}

#[test]
fn test_function_drop_statement_per_dialect() {
    let mut meta = calc_meta();
    meta.schema = Some("utils".into());
    let func = CanonicalFunction::build(meta, None, None);

    assert_eq!(
        func.drop_statement(Dialect::Postgres),
        "DROP FUNCTION IF EXISTS utils.calculate_percentage(DOUBLE, DOUBLE)"
    );
    assert_eq!(
        func.drop_statement(Dialect::DuckDb),
        "DROP MACRO IF EXISTS utils.calculate_percentage"
    );
    assert_eq!(
        func.drop_statement(Dialect::BigQuery),
        "DROP FUNCTION IF EXISTS utils.calculate_percentage"
    );
}

#[test]
fn test_table_macro_drop_statement() {
    let mut meta = FunctionMetadata::new(FunctionName::try_new("recent_orders").unwrap());
    meta.function_type = FunctionType::Table;
    let func = CanonicalFunction::build(meta, None, None);
    assert_eq!(
        func.drop_statement(Dialect::DuckDb),
        "DROP MACRO TABLE IF EXISTS recent_orders"
    );
}

#[test]
fn test_record_serializes_code_envelope() {
    let mut sql = SqlCode::new("SELECT * FROM a", OperationType::Select);
    sql.source_tables.insert("a".into());
    let model = CanonicalModel::build(model_meta("b"), Some(sql.into()), None);

    let value = serde_json::to_value(&model).unwrap();
    assert_eq!(value["code"]["sql"]["operation_type"], "select");
    assert_eq!(value["code"]["sql"]["source_tables"][0], "a");
    assert_eq!(value["model_metadata"]["table_name"], "b");
    assert_eq!(value["needs_evaluation"], false);
}
