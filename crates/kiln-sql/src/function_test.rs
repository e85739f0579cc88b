use super::*;
use crate::resolver::InMemoryMetadataResolver;
use kiln_core::{compute_checksum, FunctionType};
use std::path::PathBuf;

const CALC: &str = "CREATE OR REPLACE FUNCTION calculate_percentage(numerator DOUBLE, denominator DOUBLE) \
RETURNS DOUBLE AS $$ SELECT CASE WHEN denominator = 0 OR denominator IS NULL THEN NULL \
ELSE (numerator/denominator)*100.0 END $$ LANGUAGE sql;";

fn parser() -> FunctionParser {
    FunctionParser::new().with_resolver(InMemoryMetadataResolver::new())
}

fn parser_with(path: &str, companion: &str) -> FunctionParser {
    FunctionParser::new().with_resolver(InMemoryMetadataResolver::new().with(path, companion))
}

#[test]
fn test_calculate_percentage_round_trip() {
    let mut parser = parser();
    let func = parser
        .parse(CALC, Path::new("functions/calculate_percentage.sql"), None)
        .unwrap();

    let meta = func.metadata();
    assert_eq!(meta.function_name, "calculate_percentage");
    assert_eq!(meta.parameters.len(), 2);
    assert_eq!(meta.parameters[0].name, "numerator");
    assert_eq!(meta.parameters[0].data_type, "DOUBLE");
    assert_eq!(meta.parameters[1].name, "denominator");
    assert_eq!(meta.parameters[1].data_type, "DOUBLE");
    assert_eq!(meta.return_type.as_deref(), Some("DOUBLE"));
    assert_eq!(meta.function_type, FunctionType::Scalar);
    assert_eq!(meta.dialect.as_deref(), Some("postgres"));

    assert_eq!(func.content_hash(), compute_checksum(CALC));
    assert_eq!(func.sql().unwrap().operation_type, OperationType::CreateFunction);
    assert_eq!(func.source_functions().count(), 0);
    assert!(!func.needs_evaluation());
}

#[test]
fn test_repeat_parse_returns_same_record() {
    let mut parser = parser();
    let path = Path::new("functions/calc.sql");
    let first = parser.parse(CALC, path, None).unwrap();
    let second = parser.parse(CALC, path, None).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(parser.cached(), 1);

    let other = parser.parse(CALC, Path::new("functions/other.sql"), None).unwrap();
    assert!(!Arc::ptr_eq(&first, &other));
}

#[test]
fn test_returns_table_any_case_is_table() {
    let mut parser = parser();
    let sql = "create or replace function recent(n int) Returns Table (id int) as $$ select id from orders limit n $$ language sql";
    let func = parser.parse(sql, Path::new("recent.sql"), None).unwrap();
    assert_eq!(func.metadata().function_type, FunctionType::Table);
    assert_eq!(func.source_tables().collect::<Vec<_>>(), vec!["orders"]);
}

#[test]
fn test_filename_dialect_beats_connection() {
    let mut parser = parser().with_connection(Some(ConnectionConfig::of_type("duckdb")));
    let func = parser.parse(CALC, Path::new("f.postgresql.sql"), None).unwrap();
    assert_eq!(func.metadata().dialect.as_deref(), Some("postgres"));
}

#[test]
fn test_explicit_dialect_wins() {
    let mut parser = parser().with_connection(Some(ConnectionConfig::of_type("duckdb")));
    let func = parser
        .parse(CALC, Path::new("f.postgresql.sql"), Some("snowflake"))
        .unwrap();
    assert_eq!(func.metadata().dialect.as_deref(), Some("snowflake"));
    assert_eq!(func.metadata().parameters.len(), 2);
}

#[test]
fn test_connection_dialect_used_last() {
    let mut parser = parser().with_connection(Some(ConnectionConfig::of_type("duckdb")));
    let func = parser
        .parse("CREATE MACRO add_one(x) AS x + 1;", Path::new("add_one.sql"), None)
        .unwrap();
    assert_eq!(func.metadata().dialect.as_deref(), Some("duckdb"));
    assert_eq!(func.sql().unwrap().operation_type, OperationType::CreateMacro);
}

#[test]
fn test_metadata_dialect_beats_filename() {
    let mut parser = parser_with("f/calc.yml", "dialect: snowflake\n");
    let func = parser.parse(CALC, Path::new("f/calc.postgresql.sql"), None).unwrap();
    assert_eq!(func.metadata().dialect.as_deref(), Some("snowflake"));
}

#[test]
fn test_companion_metadata_merged() {
    let mut parser = parser_with(
        "f/calculate_percentage.yml",
        r#"
function_name: calculate_percentage
schema: utils
description: Ratio as a percentage
deterministic: true
tags: [math]
parameters:
  - name: numerator
    description: Top
  - name: denominator
"#,
    );
    let func = parser
        .parse(CALC, Path::new("f/calculate_percentage.sql"), None)
        .unwrap();
    let meta = func.metadata();
    assert_eq!(meta.description.as_deref(), Some("Ratio as a percentage"));
    assert!(meta.deterministic);
    assert_eq!(meta.tags, vec!["math".to_string()]);
    assert_eq!(meta.parameters[0].description.as_deref(), Some("Top"));
    assert_eq!(meta.parameters[0].data_type, "DOUBLE");
    assert_eq!(func.qualified_name(), "utils.calculate_percentage");
}

#[test]
fn test_parameter_name_conflict_names_function() {
    let mut parser = parser_with(
        "f/calc.yml",
        "parameters:\n  - name: top\n  - name: denominator\n",
    );
    let err = parser.parse(CALC, Path::new("f/calc.sql"), None).unwrap_err();
    assert!(matches!(err, SqlError::FunctionMetadata { .. }), "got: {}", err);
    let msg = err.to_string();
    assert!(msg.contains("calculate_percentage"), "got: {}", msg);
    assert!(msg.contains("parameter 1"), "got: {}", msg);
}

#[test]
fn test_parameter_count_conflict() {
    let mut parser = parser_with("f/calc.json", r#"{"parameters": [{"name": "numerator"}]}"#);
    let err = parser.parse(CALC, Path::new("f/calc.sql"), None).unwrap_err();
    assert!(err.to_string().contains("2 parameter(s)"), "got: {}", err);
}

#[test]
fn test_inline_metadata_used_without_companion() {
    let mut parser = parser();
    let sql = format!("-- metadata: {{\"description\": \"inline\", \"tags\": [\"x\"]}}\n{}", CALC);
    let func = parser.parse(&sql, Path::new("calc.sql"), None).unwrap();
    assert_eq!(func.metadata().description.as_deref(), Some("inline"));
}

#[test]
fn test_unrecognized_definition_fails_with_path() {
    let mut parser = parser();
    let err = parser
        .parse("SELECT 1", Path::new("functions/broken.sql"), None)
        .unwrap_err();
    assert!(matches!(err, SqlError::FunctionSqlParsing { .. }));
    assert!(err.to_string().contains("functions/broken.sql"));
}

#[test]
fn test_dependencies_exclude_self() {
    let mut parser = parser();
    let sql = "CREATE FUNCTION utils.fib(n INT) RETURNS INT AS $$ \
               SELECT CASE WHEN n < 2 THEN n ELSE fib(n - 1) + utils.fib(n - 2) END \
               + lookup_bonus(n) FROM bonus_table $$ LANGUAGE sql";
    let func = parser.parse(sql, Path::new("fib.sql"), None).unwrap();
    assert_eq!(func.source_functions().collect::<Vec<_>>(), vec!["lookup_bonus"]);
    assert_eq!(func.source_tables().collect::<Vec<_>>(), vec!["bonus_table"]);
    assert_eq!(func.metadata().schema.as_deref(), Some("utils"));
}

#[test]
fn test_companion_change_invalidates_cache() {
    let dir = tempfile::tempdir().unwrap();
    let sql_path: PathBuf = dir.path().join("calc.sql");
    let yml_path = dir.path().join("calc.yml");
    std::fs::write(&yml_path, "description: first\n").unwrap();

    let mut parser = FunctionParser::new();
    let first = parser.parse(CALC, &sql_path, None).unwrap();
    assert_eq!(first.metadata().description.as_deref(), Some("first"));

    std::fs::write(&yml_path, "description: second\n").unwrap();
    let second = parser.parse(CALC, &sql_path, None).unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(second.metadata().description.as_deref(), Some("second"));
}

#[test]
fn test_self_reference_helper() {
    assert!(is_self_reference("utils.f", "f"));
    assert!(is_self_reference("f", "utils.f"));
    assert!(is_self_reference("F", "f"));
    assert!(!is_self_reference("utils.f", "other.f"));
    assert!(!is_self_reference("f", "g"));
}

#[test]
fn test_empty_strategy_chain_recognizes_nothing() {
    let mut parser = parser().with_strategies(Vec::new());
    let err = parser.parse(CALC, Path::new("calc.sql"), None).unwrap_err();
    assert!(matches!(err, SqlError::FunctionSqlParsing { .. }));
}

#[test]
fn test_fallback_only_chain() {
    let mut parser = parser().with_strategies(vec![Box::new(crate::strategy::FallbackStrategy)]);
    let func = parser.parse(CALC, Path::new("calc.sql"), None).unwrap();
    let meta = func.metadata();
    assert_eq!(meta.parameters.len(), 2);
    assert_eq!(meta.return_type.as_deref(), Some("DOUBLE"));
    assert_eq!(meta.language.as_deref(), Some("sql"));
}
