//! Canonical records → OTS module

use crate::module::{
    OtsCode, OtsColumn, OtsDependencies, OtsFunction, OtsFunctionCode, OtsIncrementalDetails,
    OtsMaterialization, OtsModule, OtsObjectMetadata, OtsParameter, OtsSchema, OtsSql,
    OtsTarget, OtsTests, OtsTransformation,
};
use kiln_core::{
    CanonicalFunction, CanonicalModel, IncrementalConfig, Materialization, ParameterMode,
    ProjectContext,
};
use serde_json::Value;
use std::collections::BTreeMap;

/// Placeholder the exported `filter_condition` compares the time column with
pub const START_DATE_PLACEHOLDER: &str = "@start_date";

/// Export every code-backed record of a project as one module.
///
/// Models without code (declared in a manifest, pending evaluation) have no
/// portable form and are skipped.
pub fn export_module(ctx: &ProjectContext, target: OtsTarget) -> OtsModule {
    let module_name = target
        .schema
        .clone()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "default".to_string());
    let mut module = OtsModule::new(module_name, target);

    for model in ctx.models.values() {
        match export_model(model) {
            Some(t) => module.transformations.push(t),
            None => log::warn!("Model '{}' has no SQL code, not exported", model.name()),
        }
    }
    for function in ctx.functions.values() {
        match export_function(function) {
            Some(f) => module.functions.push(f),
            None => log::warn!(
                "Function '{}' has no SQL code, not exported",
                function.qualified_name()
            ),
        }
    }
    module
}

/// Portable form of one model
pub fn export_model(model: &CanonicalModel) -> Option<OtsTransformation> {
    let sql = model.sql()?;
    let meta = model.metadata();

    let columns: Vec<OtsColumn> = meta
        .schema
        .iter()
        .map(|c| OtsColumn {
            name: c.name.clone(),
            datatype: Some(c.datatype.as_str().to_string()),
            description: c.description.clone(),
        })
        .collect();
    let schema = (!columns.is_empty() || !meta.partitions.is_empty()).then(|| OtsSchema {
        columns,
        partitioning: meta.partitions.clone(),
    });

    let column_tests: BTreeMap<String, Vec<_>> = meta
        .schema
        .iter()
        .filter(|c| !c.tests.is_empty())
        .map(|c| (c.name.clone(), c.tests.clone()))
        .collect();
    let tests = (!column_tests.is_empty() || !meta.tests.is_empty()).then(|| OtsTests {
        columns: column_tests,
        table: meta.tests.clone(),
    });

    let materialization = OtsMaterialization {
        kind: meta
            .materialization
            .unwrap_or(Materialization::Table)
            .as_str()
            .to_string(),
        incremental_details: meta.incremental.as_ref().map(incremental_details),
    };

    Some(OtsTransformation {
        transformation_id: Some(model.name().to_string()),
        description: meta.description.clone(),
        transformation_type: "sql".to_string(),
        code: OtsCode {
            sql: Some(OtsSql {
                original_sql: Some(sql.original_sql.clone()),
                resolved_sql: Some(sql.resolved_sql.clone()),
                source_tables: sql.source_tables.iter().cloned().collect(),
                source_functions: sql.source_functions.iter().cloned().collect(),
            }),
        },
        schema,
        materialization,
        tests,
        metadata: OtsObjectMetadata {
            file_path: model.file_path().map(|p| p.display().to_string()),
            owner: meta.extra.get("owner").and_then(Value::as_str).map(str::to_string),
            tags: meta.tags.clone(),
            object_tags: meta.object_tags.clone(),
        },
    })
}

fn incremental_details(config: &IncrementalConfig) -> OtsIncrementalDetails {
    let filter_condition = Some(config.time_column())
        .filter(|c| !c.is_empty())
        .map(|c| format!("{} > {}", c, START_DATE_PLACEHOLDER));
    let mut details = OtsIncrementalDetails {
        strategy: config.strategy().as_str().to_string(),
        filter_condition,
        delete_condition: None,
        merge_key: Vec::new(),
        update_columns: Vec::new(),
    };
    match config {
        IncrementalConfig::Append(_) => {}
        IncrementalConfig::Merge(merge) => details.merge_key = merge.unique_key.clone(),
        IncrementalConfig::DeleteInsert(di) => {
            details.delete_condition = Some(di.where_condition.clone())
        }
    }
    details
}

/// Portable form of one function
pub fn export_function(function: &CanonicalFunction) -> Option<OtsFunction> {
    let sql = function.sql()?;
    let meta = function.metadata();

    let mut database_specific = BTreeMap::new();
    if let Some(dialect) = &meta.dialect {
        database_specific.insert(dialect.clone(), sql.original_sql.clone());
    }

    Some(OtsFunction {
        function_id: Some(function.qualified_name().to_string()),
        description: meta.description.clone(),
        function_type: meta.function_type.to_string(),
        language: meta.language.clone(),
        parameters: meta
            .parameters
            .iter()
            .map(|p| OtsParameter {
                name: p.name.clone(),
                data_type: p.data_type.clone(),
                description: p.description.clone(),
                default: p.default.clone(),
                mode: p.mode.map(|m| mode_keyword(m).to_string()),
            })
            .collect(),
        return_type: meta.return_type.clone(),
        deterministic: meta.deterministic,
        code: OtsFunctionCode {
            generic_sql: Some(sql.original_sql.clone()),
            database_specific,
        },
        dependencies: OtsDependencies {
            functions: sql.source_functions.iter().cloned().collect(),
            tables: sql.source_tables.iter().cloned().collect(),
        },
        metadata: OtsObjectMetadata {
            file_path: function.file_path().map(|p| p.display().to_string()),
            owner: None,
            tags: meta.tags.clone(),
            object_tags: meta.object_tags.clone(),
        },
    })
}

fn mode_keyword(mode: ParameterMode) -> &'static str {
    match mode {
        ParameterMode::In => "IN",
        ParameterMode::Out => "OUT",
        ParameterMode::InOut => "INOUT",
    }
}

#[cfg(test)]
#[path = "export_test.rs"]
mod tests;
