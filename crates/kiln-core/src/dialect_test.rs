use super::*;
use serde_json::json;

fn meta(value: serde_json::Value) -> RawMetadata {
    value.as_object().cloned().unwrap()
}

#[test]
fn test_filename_beats_connection() {
    let conn = ConnectionConfig::of_type("duckdb");
    let dialect = infer_dialect(None, None, Path::new("f.postgresql.sql"), Some(&conn));
    assert_eq!(dialect, Dialect::Postgres);
}

#[test]
fn test_explicit_wins_over_everything() {
    let conn = ConnectionConfig::of_type("duckdb");
    let m = meta(json!({"dialect": "mysql"}));
    let dialect = infer_dialect(
        Some("snowflake"),
        Some(&m),
        Path::new("f.postgresql.sql"),
        Some(&conn),
    );
    assert_eq!(dialect, Dialect::Snowflake);
}

#[test]
fn test_metadata_beats_filename() {
    let m = meta(json!({"dialect": "bigquery"}));
    let (dialect, source) = infer_dialect_with_source(
        None,
        Some(&m),
        Path::new("f.snowflake.sql"),
        None,
        None,
    );
    assert_eq!(dialect, Dialect::BigQuery);
    assert_eq!(source, DialectSource::Metadata);
}

#[test]
fn test_unknown_explicit_falls_through() {
    let conn = ConnectionConfig::of_type("snowflake");
    let (dialect, source) = infer_dialect_with_source(
        Some("klingon"),
        None,
        Path::new("f.sql"),
        None,
        Some(&conn),
    );
    assert_eq!(dialect, Dialect::Snowflake);
    assert_eq!(source, DialectSource::Connection);
}

#[test]
fn test_project_default_between_filename_and_connection() {
    let conn = ConnectionConfig::of_type("duckdb");
    let (dialect, source) = infer_dialect_with_source(
        None,
        None,
        Path::new("f.sql"),
        Some(Dialect::Snowflake),
        Some(&conn),
    );
    assert_eq!(dialect, Dialect::Snowflake);
    assert_eq!(source, DialectSource::Project);

    let (dialect, _) = infer_dialect_with_source(
        None,
        None,
        Path::new("f.duckdb.sql"),
        Some(Dialect::Snowflake),
        Some(&conn),
    );
    assert_eq!(dialect, Dialect::DuckDb);
}

#[test]
fn test_connection_mapping() {
    let cases = [
        ("duckdb", Dialect::DuckDb),
        ("postgresql", Dialect::Postgres),
        ("postgres", Dialect::Postgres),
        ("snowflake", Dialect::Snowflake),
        ("mysql", Dialect::MySql),
        ("bigquery", Dialect::BigQuery),
        ("spark", Dialect::Spark),
        ("oracle", Dialect::Postgres),
    ];
    for (db_type, expected) in cases {
        let conn = ConnectionConfig::of_type(db_type);
        assert_eq!(
            dialect_from_connection(Some(&conn)),
            expected,
            "connection type {}",
            db_type
        );
    }
    assert_eq!(dialect_from_connection(None), Dialect::Postgres);
}

#[test]
fn test_filename_without_database_suffix() {
    assert_eq!(dialect_from_filename(Path::new("calc.sql")), None);
    assert_eq!(dialect_from_filename(Path::new("calc.v2.sql")), None);
    assert_eq!(
        dialect_from_filename(Path::new("dir/calc.Snowflake.sql")),
        Some(Dialect::Snowflake)
    );
}

#[test]
fn test_base_stem() {
    assert_eq!(base_stem("calc.snowflake"), "calc");
    assert_eq!(base_stem("calc.v2"), "calc.v2");
    assert_eq!(base_stem("calc"), "calc");
}

#[test]
fn test_dialect_parse_aliases() {
    assert_eq!("PostgreSQL".parse::<Dialect>().unwrap(), Dialect::Postgres);
    assert_eq!("ansi".parse::<Dialect>().unwrap(), Dialect::Generic);
    assert!("nope".parse::<Dialect>().is_err());
    assert_eq!(Dialect::DuckDb.to_string(), "duckdb");
}
