//! Project compilation
//!
//! Parses every input into canonical records, registers them in a
//! caller-owned [`ProjectContext`], builds the dependency graph, and
//! produces the execution order. One object failing to parse does not stop
//! its siblings; registry conflicts and dependency cycles abort.
//!
//! Compiling into a context that already holds records first retires
//! everything a source file produced last time, so an edited file never
//! leaves a stale signature or table name behind.

use crate::error::{CompileError, CompileResult};
use crate::manifest::{ManifestEntry, ObjectKind};
use kiln_core::{Config, DagNode, ProjectContext, ProjectDag};
use kiln_ots::{convert_module_from, OtsModule};
use kiln_sql::text::mask_comments_and_literals;
use kiln_sql::{FunctionParser, ModelParser};
use regex::Regex;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

static FUNCTION_HEADER_RE: OnceLock<Regex> = OnceLock::new();

fn function_header_regex() -> &'static Regex {
    FUNCTION_HEADER_RE.get_or_init(|| {
        Regex::new(
            r"(?i)^\s*CREATE\s+(?:OR\s+REPLACE\s+)?(?:(?:TEMP|TEMPORARY)\s+)?(?:FUNCTION|MACRO)\b",
        )
        .expect("valid regex")
    })
}

/// A SQL source file and its text
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectFile {
    pub path: PathBuf,
    pub content: String,
    /// Inferred from the statement when unset
    pub kind: Option<ObjectKind>,
    /// Table name override for models
    pub table_name: Option<String>,
}

impl ProjectFile {
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            kind: None,
            table_name: None,
        }
    }

    pub fn with_kind(mut self, kind: ObjectKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = Some(table_name.into());
        self
    }

    /// Declared kind, else `function` for a `CREATE FUNCTION|MACRO`
    /// statement (leading comments ignored), else `model`
    pub fn resolved_kind(&self) -> ObjectKind {
        self.kind.unwrap_or_else(|| infer_kind(&self.content))
    }
}

/// Kind of object a SQL text defines
pub fn infer_kind(sql: &str) -> ObjectKind {
    if function_header_regex().is_match(&mask_comments_and_literals(sql)) {
        ObjectKind::Function
    } else {
        ObjectKind::Model
    }
}

/// Everything a project compiles from
#[derive(Debug, Clone, Default)]
pub struct ProjectInputs {
    pub files: Vec<ProjectFile>,
    /// OTS modules with the path they were read from, if any
    pub ots_modules: Vec<(Option<PathBuf>, OtsModule)>,
    pub manifest: Vec<ManifestEntry>,
}

impl ProjectInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, file: ProjectFile) -> Self {
        self.files.push(file);
        self
    }

    pub fn with_ots_module(mut self, path: Option<PathBuf>, module: OtsModule) -> Self {
        self.ots_modules.push((path, module));
        self
    }

    pub fn with_manifest_entry(mut self, entry: ManifestEntry) -> Self {
        self.manifest.push(entry);
        self
    }
}

/// An object that failed to compile
#[derive(Debug)]
pub struct ObjectFailure {
    /// File or module the object came from
    pub source: String,
    pub error: CompileError,
}

impl fmt::Display for ObjectFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source, self.error)
    }
}

/// Outcome of compiling into a context
#[derive(Debug)]
pub struct CompileOutcome {
    /// Execution order, dependencies first
    pub order: Vec<DagNode>,
    pub dag: ProjectDag,
    pub failures: Vec<ObjectFailure>,
}

/// A compiled project with its own context
#[derive(Debug)]
pub struct CompiledProject {
    pub context: ProjectContext,
    pub order: Vec<DagNode>,
    pub dag: ProjectDag,
    pub failures: Vec<ObjectFailure>,
}

impl CompiledProject {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Drives the function and model parsers over a batch of inputs.
///
/// Parsers and their caches live as long as the compiler, so compiling an
/// unchanged file again reuses its record.
#[derive(Debug)]
pub struct Compiler {
    functions: FunctionParser,
    models: ModelParser,
    default_schema: Option<String>,
}

impl Compiler {
    pub fn new(config: &Config) -> Self {
        Self {
            functions: FunctionParser::from_config(config),
            models: ModelParser::from_config(config),
            default_schema: config.default_schema.clone(),
        }
    }

    /// Replace the parsers, e.g. to resolve companion metadata in memory
    pub fn with_parsers(mut self, functions: FunctionParser, models: ModelParser) -> Self {
        self.functions = functions;
        self.models = models;
        self
    }

    /// Compile `inputs` into `ctx`.
    ///
    /// Returns `Err` only for conflicts and cycles; per-object failures are
    /// listed in the outcome.
    pub fn compile(
        &mut self,
        ctx: &mut ProjectContext,
        inputs: &ProjectInputs,
    ) -> CompileResult<CompileOutcome> {
        let mut failures = Vec::new();
        let mut retired = BTreeSet::new();

        for file in &inputs.files {
            let source = file.path.display().to_string();
            retire_once(ctx, &mut retired, &file.path);
            if let Err(error) = self.compile_file(ctx, file) {
                collect(&mut failures, source, error)?;
            }
        }

        for (path, module) in &inputs.ots_modules {
            let source = path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| format!("<ots module {}>", module.module_name));
            if let Some(path) = path {
                retire_once(ctx, &mut retired, path);
            }
            let module = self.with_default_target_schema(module);
            let converted = convert_module_from(&module, path.as_deref());
            for error in converted.errors {
                collect(&mut failures, source.clone(), error.into())?;
            }
            for model in converted.models.into_values() {
                if let Some(path) = model.file_path() {
                    retire_once(ctx, &mut retired, path);
                }
                ctx.register_model(Arc::new(model))?;
            }
            for function in converted.functions.into_values() {
                if let Some(path) = function.file_path() {
                    retire_once(ctx, &mut retired, path);
                }
                ctx.register_function(Arc::new(function))?;
            }
        }

        for entry in &inputs.manifest {
            let source = entry.source_file.display().to_string();
            retire_once(ctx, &mut retired, &entry.source_file);
            let registered = match entry.kind {
                ObjectKind::Model => entry
                    .to_model(self.default_schema.as_deref())
                    .and_then(|m| ctx.register_model(Arc::new(m)).map_err(Into::into)),
                ObjectKind::Function => entry
                    .to_function()
                    .and_then(|f| ctx.register_function(Arc::new(f)).map_err(Into::into)),
            };
            if let Err(error) = registered {
                collect(&mut failures, source, error)?;
            }
        }

        let dag = ProjectDag::build(ctx)?;
        let order = dag.execution_order()?;
        log::debug!(
            "Compiled {} models and {} functions, {} failed",
            ctx.models.len(),
            ctx.functions.len(),
            failures.len()
        );

        Ok(CompileOutcome {
            order,
            dag,
            failures,
        })
    }

    fn compile_file(&mut self, ctx: &mut ProjectContext, file: &ProjectFile) -> CompileResult<()> {
        match file.resolved_kind() {
            ObjectKind::Function => {
                let function = self.functions.parse(&file.content, &file.path, None)?;
                ctx.register_function(function)?;
            }
            ObjectKind::Model => {
                let model =
                    self.models
                        .parse(&file.content, Some(&file.path), file.table_name.as_deref())?;
                ctx.register_model(model)?;
            }
        }
        Ok(())
    }

    fn with_default_target_schema(&self, module: &OtsModule) -> OtsModule {
        let mut module = module.clone();
        if module.target.schema.is_none() {
            module.target.schema = self.default_schema.clone();
        }
        module
    }
}

/// Retire what `path` produced in an earlier run, the first time this run
/// sees the path
fn retire_once(ctx: &mut ProjectContext, retired: &mut BTreeSet<PathBuf>, path: &Path) {
    if retired.insert(path.to_path_buf()) {
        ctx.retire_source(path);
    }
}

/// Record a per-object failure, or propagate a fatal one
fn collect(
    failures: &mut Vec<ObjectFailure>,
    source: String,
    error: CompileError,
) -> CompileResult<()> {
    if error.is_fatal() {
        return Err(error);
    }
    log::warn!("Skipping {}: {}", source, error);
    failures.push(ObjectFailure { source, error });
    Ok(())
}

/// Compile a project into a fresh context
pub fn compile_project(config: &Config, inputs: &ProjectInputs) -> CompileResult<CompiledProject> {
    let mut context = ProjectContext::new();
    let outcome = Compiler::new(config).compile(&mut context, inputs)?;
    Ok(CompiledProject {
        context,
        order: outcome.order,
        dag: outcome.dag,
        failures: outcome.failures,
    })
}

#[cfg(test)]
#[path = "compile_test.rs"]
mod tests;
