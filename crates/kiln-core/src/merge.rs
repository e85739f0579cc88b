//! Reconciliation of SQL-derived metadata with declared companion metadata
//!
//! Derived metadata is what the parser recovered from the SQL text (name,
//! parameters, return type). Declared metadata comes from the companion file
//! or the inline comment. The two must agree on identity and parameter shape;
//! otherwise the declared side wins field by field.

use crate::error::{CoreError, CoreResult};
use crate::metadata::RawMetadata;
use crate::sql_utils::{normalize_whitespace, split_qualified_name};
use serde_json::Value;

/// Identity keys that must agree when both sides carry them
const IDENTITY_KEYS: &[&str] = &["function_name", "table_name"];

/// Merge derived and declared metadata into one dictionary.
///
/// Fails with `MetadataConflict` when both sides name a different object,
/// when both declare parameter lists of different lengths, or when parameter
/// names differ at the same position. A differing return type only warns.
pub fn merge_metadata(derived: &RawMetadata, declared: &RawMetadata) -> CoreResult<RawMetadata> {
    for key in IDENTITY_KEYS {
        check_identity(key, derived.get(*key), declared.get(*key))?;
    }

    check_parameters(derived, declared)?;
    check_return_type(derived, declared);

    let mut merged = overlay(derived, declared);

    // Same-shape parameter lists merge per position so a declared description
    // does not drop the type recovered from SQL.
    if let (Some(Value::Array(sql_params)), Some(Value::Array(meta_params))) =
        (derived.get("parameters"), declared.get("parameters"))
    {
        if sql_params.len() == meta_params.len() {
            let params = sql_params
                .iter()
                .zip(meta_params)
                .map(|(sql, meta)| match (sql, meta) {
                    (Value::Object(sql), Value::Object(meta)) => Value::Object(overlay(sql, meta)),
                    _ => meta.clone(),
                })
                .collect();
            merged.insert("parameters".to_string(), Value::Array(params));
        }
    }

    Ok(merged)
}

/// Declared values replace derived ones.
///
/// A null scalar, an empty list or an empty map keeps the derived value. Any
/// other scalar wins, empty strings included, except a blank identity name.
fn overlay(derived: &RawMetadata, declared: &RawMetadata) -> RawMetadata {
    let mut merged = derived.clone();
    for (key, declared_value) in declared {
        let keep_derived =
            !overrides(key, declared_value) && derived.get(key).is_some_and(|v| !v.is_null());
        if !keep_derived {
            merged.insert(key.clone(), declared_value.clone());
        }
    }
    merged
}

/// Whether a declared value overrides the derived one
fn overrides(key: &str, value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::String(s) if IDENTITY_KEYS.contains(&key) => !s.trim().is_empty(),
        Value::String(_) | Value::Bool(_) | Value::Number(_) => true,
    }
}

fn check_identity(key: &str, derived: Option<&Value>, declared: Option<&Value>) -> CoreResult<()> {
    let (Some(derived), Some(declared)) = (
        derived.and_then(Value::as_str).filter(|s| !s.trim().is_empty()),
        declared.and_then(Value::as_str).filter(|s| !s.trim().is_empty()),
    ) else {
        return Ok(());
    };

    if names_agree(derived, declared) {
        return Ok(());
    }

    Err(CoreError::MetadataConflict {
        message: format!(
            "{} '{}' in SQL does not match '{}' in declared metadata",
            key, derived, declared
        ),
    })
}

/// Names agree when equal ignoring case, or when one side is unqualified and
/// matches the object part of the other.
fn names_agree(a: &str, b: &str) -> bool {
    if a.eq_ignore_ascii_case(b) {
        return true;
    }
    let (a_schema, a_object) = split_qualified_name(a);
    let (b_schema, b_object) = split_qualified_name(b);
    (a_schema.is_none() || b_schema.is_none()) && a_object.eq_ignore_ascii_case(b_object)
}

fn check_parameters(derived: &RawMetadata, declared: &RawMetadata) -> CoreResult<()> {
    let (Some(Value::Array(derived_params)), Some(Value::Array(declared_params))) =
        (derived.get("parameters"), declared.get("parameters"))
    else {
        return Ok(());
    };

    if derived_params.is_empty() || declared_params.is_empty() {
        return Ok(());
    }

    let function = derived
        .get("function_name")
        .or_else(|| declared.get("function_name"))
        .and_then(Value::as_str)
        .unwrap_or("function");

    if derived_params.len() != declared_params.len() {
        return Err(CoreError::MetadataConflict {
            message: format!(
                "'{}' declares {} parameter(s) in SQL but {} in metadata",
                function,
                derived_params.len(),
                declared_params.len()
            ),
        });
    }

    let param_name = |p: &Value| p.get("name").and_then(Value::as_str).map(str::to_string);

    for (idx, (sql_param, meta_param)) in derived_params.iter().zip(declared_params).enumerate() {
        let (Some(sql_name), Some(meta_name)) = (param_name(sql_param), param_name(meta_param))
        else {
            continue;
        };
        if !sql_name.eq_ignore_ascii_case(&meta_name) {
            return Err(CoreError::MetadataConflict {
                message: format!(
                    "'{}' parameter {} is named '{}' in SQL but '{}' in metadata",
                    function,
                    idx + 1,
                    sql_name,
                    meta_name
                ),
            });
        }
    }

    Ok(())
}

fn check_return_type(derived: &RawMetadata, declared: &RawMetadata) {
    let (Some(sql_type), Some(meta_type)) = (
        derived.get("return_type").and_then(Value::as_str),
        declared.get("return_type").and_then(Value::as_str),
    ) else {
        return;
    };

    let normalize = |s: &str| normalize_whitespace(s).to_ascii_uppercase();
    if normalize(sql_type) != normalize(meta_type) {
        log::warn!(
            "Return type '{}' in SQL differs from '{}' in metadata; using the declared type",
            sql_type,
            meta_type
        );
    }
}

#[cfg(test)]
#[path = "merge_test.rs"]
mod tests;
