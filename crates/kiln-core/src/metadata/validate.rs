//! Structural validation and normalization of raw metadata

use super::incremental::IncrementalStrategy;
use super::testing::{COLUMN_TESTS, MODEL_TESTS};
use super::{json_kind, ColumnType, FunctionMetadata, Materialization, ModelMetadata, RawMetadata};
use crate::error::{CoreError, CoreResult};
use serde_json::Value;

/// Which test vocabulary applies to a `tests` list
#[derive(Debug, Clone, Copy)]
enum TestLevel {
    Column,
    Model,
    /// Function tests are always custom; only their shape is checked
    Function,
}

impl TestLevel {
    fn vocabulary(self) -> Option<&'static [&'static str]> {
        match self {
            TestLevel::Column => Some(COLUMN_TESTS),
            TestLevel::Model => Some(MODEL_TESTS),
            TestLevel::Function => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            TestLevel::Column => "column",
            TestLevel::Model => "model",
            TestLevel::Function => "function",
        }
    }
}

/// Validate and normalize a raw model metadata dictionary.
///
/// Checks columns, materialization, the incremental block, and test names,
/// then fills `tests` and `partitions` with empty lists when absent. The
/// returned map is the input with defaults applied and datatypes lowercased.
/// Identity fields are not required here.
pub fn validate_metadata(raw: &RawMetadata) -> CoreResult<RawMetadata> {
    let context = context_name(raw);
    let mut normalized = raw.clone();

    for key in ["schema", "columns"] {
        if let Some(Value::Array(columns)) = normalized.get_mut(key) {
            for (idx, column) in columns.iter_mut().enumerate() {
                validate_column(column, idx, &context)?;
            }
        }
    }

    validate_materialization(&normalized, &context)?;
    validate_incremental(&normalized, &context)?;
    normalize_tests(&mut normalized, TestLevel::Model, &context)?;
    normalize_string_list(&mut normalized, "partitions", &context)?;

    Ok(normalized)
}

/// Validate raw metadata into a typed [`ModelMetadata`].
pub fn validate_model_metadata(raw: &RawMetadata) -> CoreResult<ModelMetadata> {
    let normalized = validate_metadata(raw)?;
    let context = context_name(&normalized);

    require_name(&normalized, "table_name", &context)?;

    serde_json::from_value(Value::Object(normalized)).map_err(|e| CoreError::MetadataValidation {
        context,
        message: e.to_string(),
    })
}

/// Validate raw metadata into a typed [`FunctionMetadata`].
///
/// Parameters without a name are dropped rather than rejected.
pub fn validate_function_metadata(raw: &RawMetadata) -> CoreResult<FunctionMetadata> {
    let context = context_name(raw);
    let mut normalized = raw.clone();

    require_name(&normalized, "function_name", &context)?;

    if let Some(params) = normalized.get_mut("parameters") {
        match params {
            Value::Null => *params = Value::Array(Vec::new()),
            Value::Array(list) => {
                list.retain(|p| {
                    let named = p
                        .get("name")
                        .and_then(Value::as_str)
                        .is_some_and(|n| !n.trim().is_empty());
                    if !named {
                        log::debug!("Dropping unnamed parameter of {}: {}", context, p);
                    }
                    named
                });
                for param in list.iter() {
                    if !param.is_object() {
                        return Err(CoreError::MetadataValidation {
                            context: context.clone(),
                            message: format!("parameter must be a mapping, found {}", json_kind(param)),
                        });
                    }
                }
            }
            other => {
                return Err(CoreError::MetadataValidation {
                    context,
                    message: format!("'parameters' must be a list, found {}", json_kind(other)),
                })
            }
        }
    }

    normalize_tests(&mut normalized, TestLevel::Function, &context)?;

    serde_json::from_value(Value::Object(normalized)).map_err(|e| CoreError::MetadataValidation {
        context,
        message: e.to_string(),
    })
}

/// Name of the object being validated, for error messages
fn context_name(raw: &RawMetadata) -> String {
    ["table_name", "function_name"]
        .iter()
        .find_map(|key| raw.get(*key).and_then(Value::as_str))
        .filter(|name| !name.trim().is_empty())
        .map(|name| format!("'{}'", name))
        .unwrap_or_else(|| "unnamed object".to_string())
}

fn require_name(raw: &RawMetadata, key: &str, context: &str) -> CoreResult<()> {
    match raw.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(()),
        Some(other) if !other.is_null() && !other.is_string() => {
            Err(CoreError::MetadataValidation {
                context: context.to_string(),
                message: format!("'{}' must be a string, found {}", key, json_kind(other)),
            })
        }
        _ => Err(CoreError::EmptyName {
            field: key.to_string(),
            context: context.to_string(),
        }),
    }
}

fn validate_column(column: &mut Value, idx: usize, context: &str) -> CoreResult<()> {
    let map = match column {
        Value::Object(map) => map,
        other => {
            return Err(CoreError::MetadataValidation {
                context: context.to_string(),
                message: format!("column #{} must be a mapping, found {}", idx + 1, json_kind(other)),
            })
        }
    };

    let name = match map.get("name").and_then(Value::as_str) {
        Some(n) if !n.trim().is_empty() => n.to_string(),
        _ => {
            return Err(CoreError::MetadataValidation {
                context: context.to_string(),
                message: format!("column #{} requires a non-empty 'name'", idx + 1),
            })
        }
    };

    let datatype = match map.get("datatype").and_then(Value::as_str) {
        Some(d) if !d.trim().is_empty() => d.trim().to_ascii_lowercase(),
        _ => {
            return Err(CoreError::MetadataValidation {
                context: context.to_string(),
                message: format!("column '{}' requires a non-empty 'datatype'", name),
            })
        }
    };
    if !ColumnType::NAMES.contains(&datatype.as_str()) {
        return Err(CoreError::MetadataValidation {
            context: context.to_string(),
            message: format!(
                "column '{}' has unknown datatype '{}' (expected one of {})",
                name,
                datatype,
                ColumnType::NAMES.join(", ")
            ),
        });
    }
    map.insert("datatype".to_string(), Value::String(datatype));

    let column_context = format!("{} column '{}'", context, name);
    normalize_tests(map, TestLevel::Column, &column_context)
}

fn validate_materialization(raw: &RawMetadata, context: &str) -> CoreResult<()> {
    match raw.get("materialization") {
        None | Some(Value::Null) => Ok(()),
        Some(Value::String(m)) if Materialization::NAMES.contains(&m.as_str()) => Ok(()),
        Some(other) => Err(CoreError::InvalidMaterialization {
            context: context.to_string(),
            value: other.as_str().map(str::to_string).unwrap_or_else(|| other.to_string()),
        }),
    }
}

fn validate_incremental(raw: &RawMetadata, context: &str) -> CoreResult<()> {
    let invalid = |message: String| CoreError::InvalidIncremental {
        context: context.to_string(),
        message,
    };

    let incremental = match raw.get("incremental") {
        None | Some(Value::Null) => {
            if raw.get("materialization").and_then(Value::as_str) == Some("incremental") {
                return Err(invalid(
                    "materialization 'incremental' requires an 'incremental' block".into(),
                ));
            }
            return Ok(());
        }
        Some(Value::Object(map)) => map,
        Some(other) => {
            return Err(invalid(format!(
                "'incremental' must be a mapping, found {}",
                json_kind(other)
            )))
        }
    };

    let strategy_name = match incremental.get("strategy") {
        Some(Value::String(s)) => s.as_str(),
        Some(Value::Null) | None => return Err(invalid("'strategy' is required".into())),
        Some(other) => {
            return Err(invalid(format!(
                "'strategy' must be a string, found {}",
                json_kind(other)
            )))
        }
    };

    let strategy = IncrementalStrategy::from_name(strategy_name).ok_or_else(|| {
        invalid(format!(
            "unknown strategy '{}' (expected one of {})",
            strategy_name,
            IncrementalStrategy::NAMES.join(", ")
        ))
    })?;

    let block = match incremental.get(strategy.as_str()) {
        Some(Value::Object(block)) => block,
        _ => {
            return Err(invalid(format!(
                "strategy '{}' requires a '{}' block",
                strategy, strategy
            )))
        }
    };

    for field in strategy.required_fields() {
        let value = block.get(*field).unwrap_or(&Value::Null);
        if *field == "unique_key" {
            let columns_listed = match value {
                Value::Array(items) => {
                    !items.is_empty()
                        && items
                            .iter()
                            .all(|i| i.as_str().is_some_and(|s| !s.trim().is_empty()))
                }
                _ => false,
            };
            if !columns_listed {
                return Err(invalid(format!(
                    "'{}.unique_key' is required and must be a non-empty list of column names",
                    strategy
                )));
            }
            continue;
        }
        match value {
            Value::String(s) if !s.trim().is_empty() => {}
            Value::String(_) | Value::Null => {
                return Err(invalid(format!("'{}.{}' is required", strategy, field)))
            }
            other => {
                return Err(invalid(format!(
                    "'{}.{}' must be a string, found {}",
                    strategy,
                    field,
                    json_kind(other)
                )))
            }
        }
    }

    Ok(())
}

fn normalize_tests(raw: &mut RawMetadata, level: TestLevel, context: &str) -> CoreResult<()> {
    let tests = raw
        .entry("tests")
        .or_insert_with(|| Value::Array(Vec::new()));

    if tests.is_null() {
        *tests = Value::Array(Vec::new());
    }

    let items = match tests {
        Value::Array(items) => items,
        other => {
            return Err(CoreError::MetadataValidation {
                context: context.to_string(),
                message: format!("'tests' must be a list, found {}", json_kind(other)),
            })
        }
    };

    for item in items.iter() {
        match item {
            Value::String(name) => {
                if let Some(vocabulary) = level.vocabulary() {
                    if !vocabulary.contains(&name.as_str()) {
                        return Err(CoreError::InvalidTest {
                            context: context.to_string(),
                            level: level.label(),
                            name: name.clone(),
                        });
                    }
                }
            }
            Value::Object(spec) => {
                let named = spec
                    .get("name")
                    .and_then(Value::as_str)
                    .is_some_and(|n| !n.trim().is_empty());
                if !named {
                    return Err(CoreError::MetadataValidation {
                        context: context.to_string(),
                        message: "structured test requires a non-empty 'name'".into(),
                    });
                }
            }
            other => {
                return Err(CoreError::MetadataValidation {
                    context: context.to_string(),
                    message: format!("test must be a name or mapping, found {}", json_kind(other)),
                })
            }
        }
    }

    Ok(())
}

fn normalize_string_list(raw: &mut RawMetadata, key: &str, context: &str) -> CoreResult<()> {
    let value = raw
        .entry(key)
        .or_insert_with(|| Value::Array(Vec::new()));
    if value.is_null() {
        *value = Value::Array(Vec::new());
    }
    match value {
        Value::Array(items) if items.iter().all(Value::is_string) => Ok(()),
        other => Err(CoreError::MetadataValidation {
            context: context.to_string(),
            message: format!("'{}' must be a list of strings, found {}", key, json_kind(other)),
        }),
    }
}

#[cfg(test)]
#[path = "validate_test.rs"]
mod tests;
