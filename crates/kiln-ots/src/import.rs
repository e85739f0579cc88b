//! OTS module → canonical records
//!
//! Conversion is partial-success: a transformation that cannot be converted
//! records an error and its siblings still convert. The portable incremental
//! fields are free text, so typed fields that cannot be recovered are left as
//! empty placeholders and logged.

use crate::error::{OtsError, OtsResult};
use crate::module::{
    OtsFunction, OtsIncrementalDetails, OtsModule, OtsTarget, OtsTests, OtsTransformation,
};
use kiln_core::metadata::{AppendConfig, DeleteInsertConfig, MergeConfig};
use kiln_core::{
    CanonicalFunction, CanonicalModel, ColumnDefinition, ColumnType, Dialect, FunctionMetadata,
    FunctionName, FunctionParameter, FunctionType, IncrementalConfig, IncrementalStrategy,
    Materialization, ModelMetadata, ModelName, OperationType, ParameterMode, SqlCode,
};
use kiln_sql::strategy::{default_strategies, FunctionDefinition};
use kiln_sql::{extract_dependencies, extract_references, SqlParser};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Result of converting one module
#[derive(Debug, Default)]
pub struct ConvertedModule {
    /// Models by transformation id
    pub models: BTreeMap<String, CanonicalModel>,
    /// Functions by function id
    pub functions: BTreeMap<String, CanonicalFunction>,
    /// Per-object failures, in module order
    pub errors: Vec<OtsError>,
}

impl ConvertedModule {
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    /// Fail with the first recorded error, if any
    pub fn into_result(mut self) -> OtsResult<Self> {
        if self.errors.is_empty() {
            Ok(self)
        } else {
            Err(self.errors.remove(0))
        }
    }
}

/// Convert every transformation and function of a module.
pub fn convert_module(module: &OtsModule) -> ConvertedModule {
    convert_module_from(module, None)
}

/// Convert a module read from `source`.
///
/// Records without their own `metadata.file_path` take `source` as their
/// file path, so registering two modules that define the same object
/// surfaces as a conflict.
pub fn convert_module_from(module: &OtsModule, source: Option<&Path>) -> ConvertedModule {
    let mut converted = ConvertedModule::default();
    let dialect = target_dialect(&module.target);

    for transformation in &module.transformations {
        let Some(id) = transformation
            .transformation_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
        else {
            log::warn!(
                "Skipping transformation without transformation_id in module '{}'",
                module.module_name
            );
            continue;
        };
        match convert_transformation(id, transformation, &module.target, dialect, source) {
            Ok(model) => {
                converted.models.insert(id.to_string(), model);
            }
            Err(e) => {
                log::debug!("Transformation '{}' failed to convert: {}", id, e);
                converted.errors.push(e);
            }
        }
    }

    for function in &module.functions {
        let Some(id) = function
            .function_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
        else {
            log::warn!(
                "Skipping function without function_id in module '{}'",
                module.module_name
            );
            continue;
        };
        match convert_function(id, function, &module.target, dialect, source) {
            Ok(func) => {
                converted.functions.insert(id.to_string(), func);
            }
            Err(e) => converted.errors.push(e),
        }
    }

    converted
}

fn target_dialect(target: &OtsTarget) -> Option<Dialect> {
    let name = target.sql_dialect.as_deref()?;
    match name.parse() {
        Ok(dialect) => Some(dialect),
        Err(_) => {
            log::warn!("Unknown OTS sql_dialect '{}', using generic parsing", name);
            None
        }
    }
}

fn invalid(id: &str, message: impl Into<String>) -> OtsError {
    OtsError::InvalidMetadata {
        transformation_id: id.to_string(),
        message: message.into(),
    }
}

fn record_path(metadata_path: Option<&str>, source: Option<&Path>) -> Option<PathBuf> {
    metadata_path
        .map(PathBuf::from)
        .or_else(|| source.map(Path::to_path_buf))
}

fn convert_transformation(
    id: &str,
    t: &OtsTransformation,
    target: &OtsTarget,
    dialect: Option<Dialect>,
    source: Option<&Path>,
) -> OtsResult<CanonicalModel> {
    if !t.transformation_type.eq_ignore_ascii_case("sql") {
        return Err(OtsError::UnsupportedTransformation {
            transformation_id: id.to_string(),
            kind: t.transformation_type.clone(),
        });
    }
    let sql = t.code.sql.as_ref();
    let Some(text) = sql.and_then(|s| s.text()) else {
        return Err(OtsError::MissingSql {
            transformation_id: id.to_string(),
        });
    };

    let mut table_name =
        ModelName::try_new(id).ok_or_else(|| invalid(id, "transformation_id is empty"))?;
    if let Some(schema) = target.schema.as_deref().filter(|s| !s.trim().is_empty()) {
        table_name = table_name.qualified_with(schema);
    }

    let mut metadata = ModelMetadata::new(table_name);
    metadata.description = t.description.clone();
    metadata.tags = t.metadata.tags.clone();
    metadata.object_tags = t.metadata.object_tags.clone();
    if let Some(owner) = &t.metadata.owner {
        metadata
            .extra
            .insert("owner".to_string(), Value::String(owner.clone()));
    }
    if let Some(schema) = &t.schema {
        metadata.partitions = schema.partitioning.clone();
        for column in &schema.columns {
            let datatype = column
                .datatype
                .as_deref()
                .ok_or_else(|| invalid(id, format!("column '{}' has no datatype", column.name)))?;
            let datatype = ColumnType::from_name(datatype).ok_or_else(|| {
                invalid(
                    id,
                    format!(
                        "column '{}' has unknown datatype '{}', expected one of {}",
                        column.name,
                        datatype,
                        ColumnType::NAMES.join(", ")
                    ),
                )
            })?;
            metadata.schema.push(ColumnDefinition {
                name: column.name.clone(),
                datatype,
                description: column.description.clone(),
                tests: Vec::new(),
            });
        }
    }
    if let Some(tests) = &t.tests {
        attach_tests(id, &mut metadata, tests);
    }

    let materialization = Materialization::from_name(&t.materialization.kind).ok_or_else(|| {
        invalid(
            id,
            format!(
                "unknown materialization '{}', expected one of {}",
                t.materialization.kind,
                Materialization::NAMES.join(", ")
            ),
        )
    })?;
    metadata.materialization = Some(materialization);
    if materialization == Materialization::Incremental {
        let details = t
            .materialization
            .incremental_details
            .as_ref()
            .ok_or_else(|| invalid(id, "incremental materialization without incremental_details"))?;
        metadata.incremental = Some(expand_incremental(id, details)?);
    }

    let code = sql_code(text, sql, dialect);
    Ok(CanonicalModel::build(
        metadata,
        Some(code.into()),
        record_path(t.metadata.file_path.as_deref(), source),
    ))
}

/// Build the code envelope, recovering references the document left out.
fn sql_code(text: &str, sql: Option<&crate::module::OtsSql>, dialect: Option<Dialect>) -> SqlCode {
    let original = sql
        .and_then(|s| s.original_sql.clone())
        .unwrap_or_else(|| text.to_string());
    let parser = SqlParser::new(dialect.unwrap_or(Dialect::Generic));

    let (operation_type, derived) = match parser.parse_single(text, "<ots>") {
        Ok(statement) => {
            let refs = extract_dependencies(&statement);
            (kiln_sql::model::operation_type(&statement), refs)
        }
        Err(e) => {
            log::debug!("OTS SQL did not parse ({}), scanning lexically", e);
            (OperationType::Other, extract_references(text))
        }
    };

    let mut code = SqlCode::new(original, operation_type);
    code.resolved_sql = text.to_string();
    let declared_tables: BTreeSet<String> = sql
        .map(|s| s.source_tables.iter().cloned().collect())
        .unwrap_or_default();
    let declared_functions: BTreeSet<String> = sql
        .map(|s| s.source_functions.iter().cloned().collect())
        .unwrap_or_default();
    code.source_tables = if declared_tables.is_empty() {
        derived.tables
    } else {
        declared_tables
    };
    code.source_functions = if declared_functions.is_empty() {
        derived.functions
    } else {
        declared_functions
    };
    code
}

fn attach_tests(id: &str, metadata: &mut ModelMetadata, tests: &OtsTests) {
    metadata.tests = tests.table.clone();
    for (column_name, column_tests) in &tests.columns {
        match metadata
            .schema
            .iter_mut()
            .find(|c| c.name.eq_ignore_ascii_case(column_name))
        {
            Some(column) => column.tests.extend(column_tests.iter().cloned()),
            None => log::debug!(
                "Dropping tests for column '{}' not in the schema of '{}'",
                column_name,
                id
            ),
        }
    }
}

/// Map portable incremental details onto the typed configuration.
///
/// `time_column` has no portable counterpart and is always an empty
/// placeholder.
fn expand_incremental(id: &str, details: &OtsIncrementalDetails) -> OtsResult<IncrementalConfig> {
    let strategy = IncrementalStrategy::from_name(&details.strategy).ok_or_else(|| {
        invalid(
            id,
            format!(
                "unknown incremental strategy '{}', expected one of {}",
                details.strategy,
                IncrementalStrategy::NAMES.join(", ")
            ),
        )
    })?;
    log::warn!(
        "Transformation '{}': time_column cannot be recovered from OTS, left empty",
        id
    );

    let config = match strategy {
        IncrementalStrategy::Append => IncrementalConfig::Append(AppendConfig {
            time_column: String::new(),
            start_date: None,
            lookback: None,
        }),
        IncrementalStrategy::Merge => {
            if details.merge_key.is_empty() {
                log::warn!("Transformation '{}': merge strategy without merge_key", id);
            }
            IncrementalConfig::Merge(MergeConfig {
                unique_key: details.merge_key.clone(),
                time_column: String::new(),
                start_date: None,
                lookback: None,
            })
        }
        IncrementalStrategy::DeleteInsert => {
            let where_condition = details.delete_condition.clone().unwrap_or_default();
            if where_condition.is_empty() {
                log::warn!(
                    "Transformation '{}': delete_insert strategy without delete_condition",
                    id
                );
            }
            IncrementalConfig::DeleteInsert(DeleteInsertConfig {
                where_condition,
                time_column: String::new(),
                start_date: None,
            })
        }
    };
    Ok(config)
}

fn convert_function(
    id: &str,
    f: &OtsFunction,
    target: &OtsTarget,
    dialect: Option<Dialect>,
    source: Option<&Path>,
) -> OtsResult<CanonicalFunction> {
    let Some(sql) = f.code.for_dialect(target.sql_dialect.as_deref()) else {
        return Err(OtsError::MissingSql {
            transformation_id: id.to_string(),
        });
    };
    let name = FunctionName::try_new(id).ok_or_else(|| invalid(id, "function_id is empty"))?;
    let function_type = FunctionType::from_name(&f.function_type)
        .ok_or_else(|| invalid(id, format!("unknown function_type '{}'", f.function_type)))?;

    let definition = recover_definition(sql, dialect.unwrap_or(Dialect::Postgres));

    let mut metadata = FunctionMetadata::new(name.clone());
    metadata.schema = name
        .schema()
        .map(str::to_string)
        .or_else(|| target.schema.clone());
    metadata.description = f.description.clone();
    metadata.function_type = function_type;
    metadata.deterministic = f.deterministic;
    metadata.tags = f.metadata.tags.clone();
    metadata.object_tags = f.metadata.object_tags.clone();
    metadata.dialect = dialect.map(|d| d.as_str().to_string());
    metadata.language = f
        .language
        .clone()
        .or_else(|| definition.as_ref().and_then(|d| d.language.clone()));
    metadata.return_type = f
        .return_type
        .clone()
        .or_else(|| definition.as_ref().and_then(|d| d.return_type.clone()));
    metadata.parameters = if f.parameters.is_empty() {
        definition
            .as_ref()
            .map(|d| d.parameters.clone())
            .unwrap_or_default()
    } else {
        f.parameters
            .iter()
            .map(|p| {
                let mut param = FunctionParameter::new(p.name.clone(), p.data_type.clone());
                param.description = p.description.clone();
                param.default = p.default.clone();
                param.mode = p.mode.as_deref().and_then(ParameterMode::from_keyword);
                param
            })
            .collect()
    };

    let is_macro = definition.as_ref().is_some_and(|d| d.is_macro);
    let operation = if is_macro {
        OperationType::CreateMacro
    } else {
        OperationType::CreateFunction
    };
    let mut code = SqlCode::new(sql, operation);
    if f.dependencies.tables.is_empty() && f.dependencies.functions.is_empty() {
        let refs = extract_references(definition.as_ref().map_or(sql, |d| d.body.as_str()));
        code.source_tables = refs.tables;
        code.source_functions = refs
            .functions
            .into_iter()
            .filter(|r| !name.matches_reference(r))
            .collect();
    } else {
        code.source_tables = f.dependencies.tables.iter().cloned().collect();
        code.source_functions = f.dependencies.functions.iter().cloned().collect();
    }

    Ok(CanonicalFunction::build(
        metadata,
        Some(code.into()),
        record_path(f.metadata.file_path.as_deref(), source),
    ))
}

fn recover_definition(sql: &str, dialect: Dialect) -> Option<FunctionDefinition> {
    default_strategies()
        .iter()
        .find_map(|strategy| strategy.extract(sql, dialect))
}

#[cfg(test)]
#[path = "import_test.rs"]
mod tests;
