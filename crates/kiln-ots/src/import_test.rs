use super::*;
use kiln_core::OperationType;

fn module(yaml: &str) -> OtsModule {
    OtsModule::from_yaml_str(yaml).unwrap()
}

#[test]
fn test_partial_success_accumulates_errors() {
    let converted = convert_module(&module(
        r#"
module_name: sales
transformations:
  - description: no id, skipped
    code:
      sql:
        original_sql: SELECT 1
  - transformation_id: sales.broken
  - transformation_id: sales.orders
    code:
      sql:
        original_sql: SELECT id, amount FROM raw_orders
"#,
    ));

    assert_eq!(converted.models.len(), 1);
    assert_eq!(converted.errors.len(), 1);
    assert!(matches!(
        &converted.errors[0],
        OtsError::MissingSql { transformation_id } if transformation_id == "sales.broken"
    ));
    assert!(!converted.is_complete());

    let orders = &converted.models["sales.orders"];
    assert_eq!(orders.name(), "sales.orders");
    assert_eq!(orders.source_tables().collect::<Vec<_>>(), vec!["raw_orders"]);
    assert_eq!(orders.sql().unwrap().operation_type, OperationType::Select);
    assert!(!orders.needs_evaluation());
}

#[test]
fn test_into_result_surfaces_first_error() {
    let converted = convert_module(&module(
        "module_name: m\ntransformations:\n  - transformation_id: a\n",
    ));
    let err = converted.into_result().unwrap_err();
    assert!(err.to_string().contains("OTS001"), "got: {}", err);
    assert!(err.to_string().contains("'a'"), "got: {}", err);
    assert_eq!(err.transformation_id(), Some("a"));
}

#[test]
fn test_unsupported_transformation_type() {
    let converted = convert_module(&module(
        r#"
module_name: m
transformations:
  - transformation_id: m.py_model
    transformation_type: python
    code:
      sql:
        original_sql: SELECT 1
"#,
    ));
    assert!(converted.models.is_empty());
    assert!(matches!(
        converted.errors[0],
        OtsError::UnsupportedTransformation { .. }
    ));
}

#[test]
fn test_target_schema_qualifies_bare_ids() {
    let converted = convert_module(&module(
        r#"
module_name: m
target:
  schema: mart
transformations:
  - transformation_id: daily
    code:
      sql:
        original_sql: SELECT 1 AS x
"#,
    ));
    assert_eq!(converted.models["daily"].name(), "mart.daily");
}

#[test]
fn test_merge_expansion_keeps_placeholder_time_column() {
    let converted = convert_module(&module(
        r#"
module_name: m
transformations:
  - transformation_id: m.orders
    code:
      sql:
        original_sql: SELECT * FROM raw_orders
    materialization:
      type: incremental
      incremental_details:
        strategy: merge
        merge_key: [order_id]
        filter_condition: updated_at > '2024-01-01'
"#,
    ));
    let meta = converted.models["m.orders"].metadata();
    assert_eq!(meta.materialization, Some(Materialization::Incremental));
    match meta.incremental.as_ref().unwrap() {
        IncrementalConfig::Merge(merge) => {
            assert_eq!(merge.unique_key, vec!["order_id".to_string()]);
            assert_eq!(merge.time_column, "");
        }
        other => panic!("expected merge, got {:?}", other),
    }
}

#[test]
fn test_delete_insert_and_append_expansion() {
    let converted = convert_module(&module(
        r#"
module_name: m
transformations:
  - transformation_id: m.daily
    code:
      sql:
        original_sql: SELECT * FROM events
    materialization:
      type: incremental
      incremental_details:
        strategy: delete_insert
        delete_condition: day = current_date
  - transformation_id: m.log
    code:
      sql:
        original_sql: SELECT * FROM events
    materialization:
      type: incremental
      incremental_details:
        strategy: append
"#,
    ));
    assert!(converted.is_complete(), "{:?}", converted.errors);

    match converted.models["m.daily"].metadata().incremental.as_ref().unwrap() {
        IncrementalConfig::DeleteInsert(di) => {
            assert_eq!(di.where_condition, "day = current_date");
            assert_eq!(di.time_column, "");
        }
        other => panic!("expected delete_insert, got {:?}", other),
    }
    let append = converted.models["m.log"].metadata().incremental.as_ref().unwrap();
    assert_eq!(append.strategy(), IncrementalStrategy::Append);
    assert_eq!(append.time_column(), "");
}

#[test]
fn test_unknown_strategy_is_invalid_metadata() {
    let converted = convert_module(&module(
        r#"
module_name: m
transformations:
  - transformation_id: m.t
    code:
      sql:
        original_sql: SELECT 1
    materialization:
      type: incremental
      incremental_details:
        strategy: upsert
"#,
    ));
    assert!(matches!(converted.errors[0], OtsError::InvalidMetadata { .. }));
    assert!(converted.errors[0].to_string().contains("upsert"));
}

#[test]
fn test_column_tests_attach_by_name() {
    let converted = convert_module(&module(
        r#"
module_name: m
transformations:
  - transformation_id: m.customers
    code:
      sql:
        original_sql: SELECT id, email FROM raw_customers
    schema:
      columns:
        - name: id
          datatype: integer
        - name: email
          datatype: string
      partitioning: [region]
    tests:
      columns:
        ID: [not_null, unique]
        missing_column: [not_null]
      table: [row_count_gt_0]
"#,
    ));
    let meta = converted.models["m.customers"].metadata();
    assert_eq!(meta.schema.len(), 2);
    assert_eq!(meta.schema[0].tests.len(), 2);
    assert!(meta.schema[1].tests.is_empty());
    assert_eq!(meta.tests.len(), 1);
    assert_eq!(meta.partitions, vec!["region".to_string()]);
}

#[test]
fn test_unknown_datatype_fails_transformation() {
    let converted = convert_module(&module(
        r#"
module_name: m
transformations:
  - transformation_id: m.t
    code:
      sql:
        original_sql: SELECT 1 AS x
    schema:
      columns:
        - name: x
          datatype: varchar
"#,
    ));
    assert!(converted.models.is_empty());
    let msg = converted.errors[0].to_string();
    assert!(msg.contains("OTS003") && msg.contains("varchar"), "got: {}", msg);
}

#[test]
fn test_declared_source_tables_win() {
    let converted = convert_module(&module(
        r#"
module_name: m
transformations:
  - transformation_id: m.t
    code:
      sql:
        original_sql: SELECT * FROM a
        resolved_sql: SELECT * FROM m.a
        source_tables: [m.a]
"#,
    ));
    let model = &converted.models["m.t"];
    assert_eq!(model.source_tables().collect::<Vec<_>>(), vec!["m.a"]);
    let sql = model.sql().unwrap();
    assert_eq!(sql.original_sql, "SELECT * FROM a");
    assert_eq!(sql.resolved_sql, "SELECT * FROM m.a");
    assert_eq!(model.content_hash(), kiln_core::compute_checksum("SELECT * FROM m.a"));
}

#[test]
fn test_function_recovers_signature_from_sql() {
    let converted = convert_module(&module(
        r#"
module_name: m
target:
  sql_dialect: postgresql
functions:
  - function_id: utils.safe_divide
    description: Division that returns NULL on zero
    deterministic: true
    code:
      generic_sql: >-
        CREATE FUNCTION utils.safe_divide(a DOUBLE, b DOUBLE) RETURNS DOUBLE
        AS $$ SELECT a / NULLIF(b, 0) $$ LANGUAGE sql
"#,
    ));
    assert!(converted.is_complete(), "{:?}", converted.errors);
    let func = &converted.functions["utils.safe_divide"];
    assert_eq!(func.key().to_string(), "utils.safe_divide(DOUBLE, DOUBLE)");
    assert_eq!(func.metadata().return_type.as_deref(), Some("DOUBLE"));
    assert_eq!(func.metadata().dialect.as_deref(), Some("postgres"));
    assert!(func.metadata().deterministic);
    assert_eq!(func.source_functions().count(), 0);
}

#[test]
fn test_function_database_specific_macro() {
    let converted = convert_module(&module(
        r#"
module_name: m
target:
  schema: utils
  sql_dialect: duckdb
functions:
  - function_id: add_one
    code:
      generic_sql: CREATE FUNCTION add_one(x INT) RETURNS INT AS $$ SELECT x + 1 $$
      database_specific:
        duckdb: CREATE MACRO add_one(x) AS x + 1
    dependencies:
      tables: [lookup]
"#,
    ));
    let func = &converted.functions["add_one"];
    assert_eq!(func.qualified_name(), "utils.add_one");
    assert_eq!(func.sql().unwrap().operation_type, OperationType::CreateMacro);
    assert_eq!(func.metadata().parameters.len(), 1);
    assert_eq!(func.source_tables().collect::<Vec<_>>(), vec!["lookup"]);
}

#[test]
fn test_function_without_code_is_missing_sql() {
    let converted = convert_module(&module(
        "module_name: m\nfunctions:\n  - function_id: f\n",
    ));
    assert!(matches!(converted.errors[0], OtsError::MissingSql { .. }));
}

#[test]
fn test_source_path_used_when_metadata_has_none() {
    let module = module(
        r#"
module_name: m
transformations:
  - transformation_id: m.a
    code:
      sql:
        original_sql: SELECT 1
  - transformation_id: m.b
    code:
      sql:
        original_sql: SELECT 1
    metadata:
      file_path: models/b.sql
"#,
    );
    let converted = convert_module_from(&module, Some(Path::new("ots/m.yml")));
    assert_eq!(
        converted.models["m.a"].file_path(),
        Some(Path::new("ots/m.yml"))
    );
    assert_eq!(
        converted.models["m.b"].file_path(),
        Some(Path::new("models/b.sql"))
    );
}
