//! Model (query) parser
//!
//! Parses one SQL model into a [`CanonicalModel`]: exactly one statement,
//! tables and function calls from a full AST walk, a schema-qualified
//! `resolved_sql`, and metadata merged from the companion file or the
//! inline `-- metadata:` comment.

use crate::cache::{CacheKey, ParseCache};
use crate::error::{SqlError, SqlResult};
use crate::extractor::extract_dependencies;
use crate::inline::extract_inline_metadata;
use crate::parser::SqlParser;
use crate::qualify::qualify_table_references;
use crate::resolver::{FsMetadataResolver, MetadataResolver};
use kiln_core::dialect::base_stem;
use kiln_core::metadata::parse_metadata_document;
use kiln_core::sql_utils::split_qualified_name;
use kiln_core::{
    merge_metadata, validate_model_metadata, CanonicalModel, Config, CoreError, Dialect,
    ModelName, OperationType, RawMetadata, SqlCode,
};
use serde_json::Value;
use sqlparser::ast::Statement;
use std::path::Path;
use std::sync::Arc;

/// Relative length change of resolved SQL that triggers a warning
const RESOLVE_DRIFT_WARN_RATIO: f64 = 0.20;

const UNNAMED_PATH: &str = "<inline>";

/// Parser for SQL model files
#[derive(Debug)]
pub struct ModelParser {
    parser: SqlParser,
    resolver: Box<dyn MetadataResolver>,
    default_schema: Option<String>,
    cache: ParseCache<CanonicalModel>,
}

impl Default for ModelParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelParser {
    /// Parser using the generic dialect and companion files on disk
    pub fn new() -> Self {
        Self {
            parser: SqlParser::generic(),
            resolver: Box::new(FsMetadataResolver),
            default_schema: None,
            cache: ParseCache::new(),
        }
    }

    /// Parser using the query dialect and default schema from `config`
    pub fn from_config(config: &Config) -> Self {
        Self::new()
            .with_dialect(config.query_dialect())
            .with_default_schema(config.default_schema.clone())
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.parser = SqlParser::new(dialect);
        self.cache.clear();
        self
    }

    pub fn with_resolver(mut self, resolver: impl MetadataResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    /// Schema prefixed to table names that carry none
    pub fn with_default_schema(mut self, schema: Option<String>) -> Self {
        self.default_schema = schema.filter(|s| !s.trim().is_empty());
        self
    }

    pub fn dialect(&self) -> Dialect {
        self.parser.dialect()
    }

    /// Number of cached parse results
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Parse a model.
    ///
    /// The table name comes from `table_name`, else the metadata, else the
    /// file stem. Parsing the same inputs again returns the cached record.
    pub fn parse(
        &mut self,
        content: &str,
        file_path: Option<&Path>,
        table_name: Option<&str>,
    ) -> SqlResult<Arc<CanonicalModel>> {
        let path_str = file_path
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| UNNAMED_PATH.to_string());

        let companion = match file_path {
            Some(path) => self.resolver.resolve(path)?,
            None => None,
        };
        let key = CacheKey::new(
            file_path.unwrap_or_else(|| Path::new(UNNAMED_PATH)),
            content,
            companion.as_ref().map(|c| c.content.as_str()),
        )
        .with_variant(table_name);
        if let Some(hit) = self.cache.get(&key) {
            log::debug!("Model cache hit: {}", path_str);
            return Ok(hit);
        }

        let statement = self
            .parser
            .parse_single(content, &path_str)
            .map_err(|e| e.in_file(&path_str))?;
        check_statement(&statement, &path_str)?;

        let declared = match &companion {
            Some(doc) => Some(parse_metadata_document(&doc.content, &doc.path)?),
            None => extract_inline_metadata(content, &path_str)?,
        };

        let wrap = |source: CoreError| SqlError::ModelMetadata {
            path: path_str.clone(),
            source,
        };

        let declared_name = declared
            .as_ref()
            .and_then(|d| d.get("table_name"))
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string);
        let derived_name = match (table_name, &declared_name) {
            (Some(name), _) => Some(name.to_string()),
            (None, Some(_)) => None,
            (None, None) => file_path.and_then(stem_table_name),
        };

        let mut derived = RawMetadata::new();
        if let Some(name) = &derived_name {
            derived.insert("table_name".to_string(), Value::String(name.clone()));
        }
        let mut merged = match &declared {
            Some(declared) => merge_metadata(&derived, declared).map_err(wrap)?,
            None => derived,
        };

        let final_name = table_name
            .map(str::to_string)
            .or_else(|| merged.get("table_name").and_then(Value::as_str).map(str::to_string))
            .and_then(ModelName::try_new)
            .map(|name| match &self.default_schema {
                Some(schema) => name.qualified_with(schema),
                None => name,
            });
        let Some(final_name) = final_name else {
            return Err(wrap(CoreError::EmptyName {
                field: "table_name".to_string(),
                context: format!("model {}", path_str),
            }));
        };
        merged.insert(
            "table_name".to_string(),
            Value::String(final_name.as_str().to_string()),
        );
        let metadata = validate_model_metadata(&merged).map_err(wrap)?;

        let refs = extract_dependencies(&statement);
        let own_name = metadata.table_name.clone();
        let source_tables = refs
            .tables
            .into_iter()
            .filter(|t| !is_own_table(&own_name, t))
            .collect();

        let resolved_sql = match own_name.schema() {
            Some(schema) => qualify_table_references(content, schema, &source_tables),
            None => content.to_string(),
        };
        warn_on_drift(content, &resolved_sql, &path_str);

        let mut code = SqlCode::new(content, operation_type(&statement));
        code.resolved_sql = resolved_sql;
        code.source_tables = source_tables;
        code.source_functions = refs.functions;

        let record = CanonicalModel::build(
            metadata,
            Some(code.into()),
            file_path.map(Path::to_path_buf),
        );
        Ok(self.cache.insert(key, record))
    }
}

/// Table name implied by a model file name (`orders.duckdb.sql` → `orders`)
fn stem_table_name(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    Some(base_stem(stem).to_string())
}

/// Whether a referenced table is the model's own target
fn is_own_table(own: &ModelName, reference: &str) -> bool {
    if own.as_str().eq_ignore_ascii_case(reference) {
        return true;
    }
    let (ref_schema, ref_object) = split_qualified_name(reference);
    ref_schema.is_none() && own.object_name().eq_ignore_ascii_case(ref_object)
}

fn check_statement(statement: &Statement, path: &str) -> SqlResult<()> {
    match statement {
        Statement::Drop { .. } => Err(SqlError::UnsupportedStatement(format!(
            "DROP statements are not allowed in models ({})",
            path
        ))),
        Statement::Truncate { .. } => Err(SqlError::UnsupportedStatement(format!(
            "TRUNCATE statements are not allowed in models ({})",
            path
        ))),
        _ => Ok(()),
    }
}

/// Operation kind of the top-level statement
pub fn operation_type(statement: &Statement) -> OperationType {
    match statement {
        Statement::Query(_) => OperationType::Select,
        Statement::Insert(_) => OperationType::Insert,
        Statement::Update { .. } => OperationType::Update,
        Statement::Delete(_) => OperationType::Delete,
        Statement::Merge { .. } => OperationType::Merge,
        Statement::CreateTable(_) => OperationType::CreateTable,
        Statement::CreateView { .. } => OperationType::CreateView,
        Statement::CreateFunction(_) => OperationType::CreateFunction,
        Statement::CreateMacro { .. } => OperationType::CreateMacro,
        _ => OperationType::Other,
    }
}

fn warn_on_drift(original: &str, resolved: &str, path: &str) {
    if original.is_empty() {
        return;
    }
    let delta = (resolved.len() as f64 - original.len() as f64).abs() / original.len() as f64;
    if delta > RESOLVE_DRIFT_WARN_RATIO {
        log::warn!(
            "Resolved SQL for {} differs in length from the original by {:.0}%",
            path,
            delta * 100.0
        );
    }
}

#[cfg(test)]
#[path = "model_test.rs"]
mod tests;
