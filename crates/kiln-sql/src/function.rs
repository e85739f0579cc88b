//! Function definition parser
//!
//! Turns one `CREATE FUNCTION` / `CREATE MACRO` file into a
//! [`CanonicalFunction`]: companion metadata is located, the dialect is
//! inferred, the definition is recovered by the first strategy that
//! recognizes it, and derived and declared metadata are merged and validated.

use crate::cache::{CacheKey, ParseCache};
use crate::error::{SqlError, SqlResult};
use crate::inline::extract_inline_metadata;
use crate::references::{extract_references, References};
use crate::resolver::{CompanionMetadata, FsMetadataResolver, MetadataResolver};
use crate::strategy::{default_strategies, FunctionDefinition, FunctionStrategy};
use kiln_core::metadata::parse_metadata_document;
use kiln_core::sql_utils::split_qualified_name;
use kiln_core::{
    infer_dialect_with_source, merge_metadata, validate_function_metadata, CanonicalFunction,
    Config, ConnectionConfig, CoreError, Dialect, OperationType, RawMetadata, SqlCode,
};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

/// Parser for function and macro definition files
#[derive(Debug)]
pub struct FunctionParser {
    resolver: Box<dyn MetadataResolver>,
    strategies: Vec<Box<dyn FunctionStrategy>>,
    project_dialect: Option<Dialect>,
    connection: Option<ConnectionConfig>,
    cache: ParseCache<CanonicalFunction>,
}

impl Default for FunctionParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FunctionParser {
    /// Parser reading companion files from disk, with no project settings
    pub fn new() -> Self {
        Self {
            resolver: Box::new(FsMetadataResolver),
            strategies: default_strategies(),
            project_dialect: None,
            connection: None,
            cache: ParseCache::new(),
        }
    }

    /// Parser using the project dialect and connection from `config`
    pub fn from_config(config: &Config) -> Self {
        Self::new()
            .with_project_dialect(config.project_dialect())
            .with_connection(Some(config.connection.clone()))
    }

    pub fn with_resolver(mut self, resolver: impl MetadataResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    /// Replace the strategy chain (tried in order)
    pub fn with_strategies(mut self, strategies: Vec<Box<dyn FunctionStrategy>>) -> Self {
        self.strategies = strategies;
        self
    }

    pub fn with_project_dialect(mut self, dialect: Option<Dialect>) -> Self {
        self.project_dialect = dialect;
        self
    }

    pub fn with_connection(mut self, connection: Option<ConnectionConfig>) -> Self {
        self.connection = connection;
        self
    }

    /// Number of cached parse results
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Parse a function definition file.
    ///
    /// `dialect` overrides every other dialect source. Parsing the same
    /// inputs again returns the cached record.
    pub fn parse(
        &mut self,
        content: &str,
        file_path: &Path,
        dialect: Option<&str>,
    ) -> SqlResult<Arc<CanonicalFunction>> {
        let companion = self.resolver.resolve(file_path)?;
        let key = CacheKey::new(
            file_path,
            content,
            companion.as_ref().map(|c| c.content.as_str()),
        )
        .with_variant(dialect);
        if let Some(hit) = self.cache.get(&key) {
            log::debug!("Function cache hit: {}", file_path.display());
            return Ok(hit);
        }

        let path_str = file_path.display().to_string();
        let declared = declared_metadata(companion.as_ref(), content, &path_str)?;

        let (resolved, source) = infer_dialect_with_source(
            dialect,
            declared.as_ref(),
            file_path,
            self.project_dialect,
            self.connection.as_ref(),
        );
        log::debug!(
            "Dialect for {}: {} (from {:?})",
            file_path.display(),
            resolved,
            source
        );

        let definition = self.extract(content, resolved, file_path)?;
        let metadata = self.build_metadata(&definition, declared.as_ref(), resolved)?;

        let mut code = SqlCode::new(
            content,
            if definition.is_macro {
                OperationType::CreateMacro
            } else {
                OperationType::CreateFunction
            },
        );
        let References { tables, functions } = extract_references(&definition.body);
        code.source_tables = tables;
        code.source_functions = functions
            .into_iter()
            .filter(|f| !is_self_reference(&definition.name, f))
            .collect();

        let record =
            CanonicalFunction::build(metadata, Some(code.into()), Some(file_path.to_path_buf()));
        Ok(self.cache.insert(key, record))
    }

    fn extract(
        &self,
        content: &str,
        dialect: Dialect,
        file_path: &Path,
    ) -> SqlResult<FunctionDefinition> {
        for strategy in &self.strategies {
            if let Some(definition) = strategy.extract(content, dialect) {
                log::debug!(
                    "Parsed {} with the {} strategy",
                    file_path.display(),
                    strategy.name()
                );
                return Ok(definition);
            }
        }
        Err(SqlError::FunctionSqlParsing {
            path: file_path.display().to_string(),
        })
    }

    fn build_metadata(
        &self,
        definition: &FunctionDefinition,
        declared: Option<&RawMetadata>,
        dialect: Dialect,
    ) -> SqlResult<kiln_core::FunctionMetadata> {
        let wrap = |source: CoreError| SqlError::FunctionMetadata {
            function: definition.name.clone(),
            source,
        };

        let derived = derived_metadata(definition).map_err(wrap)?;
        let mut merged = match declared {
            Some(declared) => merge_metadata(&derived, declared).map_err(wrap)?,
            None => derived,
        };
        merged.insert(
            "dialect".to_string(),
            Value::String(dialect.as_str().to_string()),
        );

        validate_function_metadata(&merged).map_err(wrap)
    }
}

/// Declared metadata: the companion document, else the inline comment
fn declared_metadata(
    companion: Option<&CompanionMetadata>,
    content: &str,
    path: &str,
) -> SqlResult<Option<RawMetadata>> {
    match companion {
        Some(doc) => Ok(Some(parse_metadata_document(&doc.content, &doc.path)?)),
        None => Ok(extract_inline_metadata(content, path)?),
    }
}

/// Metadata recovered from the SQL text alone
fn derived_metadata(definition: &FunctionDefinition) -> Result<RawMetadata, CoreError> {
    let mut raw = RawMetadata::new();
    raw.insert(
        "function_name".to_string(),
        Value::String(definition.name.clone()),
    );
    if let (Some(schema), _) = split_qualified_name(&definition.name) {
        raw.insert("schema".to_string(), Value::String(schema.to_string()));
    }
    raw.insert(
        "function_type".to_string(),
        Value::String(if definition.is_table { "table" } else { "scalar" }.to_string()),
    );
    raw.insert(
        "parameters".to_string(),
        serde_json::to_value(&definition.parameters)?,
    );
    if let Some(return_type) = &definition.return_type {
        raw.insert("return_type".to_string(), Value::String(return_type.clone()));
    }
    if let Some(language) = &definition.language {
        raw.insert("language".to_string(), Value::String(language.clone()));
    }
    Ok(raw)
}

/// Whether a call found in the body is the function calling itself
fn is_self_reference(name: &str, reference: &str) -> bool {
    if name.eq_ignore_ascii_case(reference) {
        return true;
    }
    let (name_schema, name_object) = split_qualified_name(name);
    let (ref_schema, ref_object) = split_qualified_name(reference);
    name_object.eq_ignore_ascii_case(ref_object) && (name_schema.is_none() || ref_schema.is_none())
}

#[cfg(test)]
#[path = "function_test.rs"]
mod tests;
