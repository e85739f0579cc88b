//! Companion metadata resolution
//!
//! A SQL file `models/orders.sql` may be paired with `models/orders.yml`,
//! `models/orders.yaml`, or `models/orders.json`. Dialect override files
//! (`calc.snowflake.sql`) also fall back to the base stem (`calc.yml`).

use crate::error::{SqlError, SqlResult};
use kiln_core::dialect::base_stem;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Extensions tried for companion metadata, in priority order
pub const METADATA_EXTENSIONS: &[&str] = &["yml", "yaml", "json"];

/// A companion metadata document located for a SQL file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanionMetadata {
    /// Where the document lives
    pub path: PathBuf,
    /// Raw document text
    pub content: String,
}

/// Seam for locating companion metadata of a SQL file.
pub trait MetadataResolver: std::fmt::Debug {
    /// Find the companion document for `sql_path`, if one exists
    fn resolve(&self, sql_path: &Path) -> SqlResult<Option<CompanionMetadata>>;
}

/// Candidate companion paths for a SQL file, most specific first
pub fn candidate_paths(sql_path: &Path) -> Vec<PathBuf> {
    let Some(stem) = sql_path.file_stem().and_then(|s| s.to_str()) else {
        return Vec::new();
    };
    let dir = sql_path.parent().unwrap_or_else(|| Path::new(""));

    let mut stems = vec![stem];
    let base = base_stem(stem);
    if base != stem {
        stems.push(base);
    }

    stems
        .into_iter()
        .flat_map(|s| {
            METADATA_EXTENSIONS
                .iter()
                .map(move |ext| dir.join(format!("{}.{}", s, ext)))
        })
        .collect()
}

/// Reads companion documents from the filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FsMetadataResolver;

impl MetadataResolver for FsMetadataResolver {
    fn resolve(&self, sql_path: &Path) -> SqlResult<Option<CompanionMetadata>> {
        for path in candidate_paths(sql_path) {
            if !path.is_file() {
                continue;
            }
            let content =
                std::fs::read_to_string(&path).map_err(|source| SqlError::MetadataRead {
                    path: path.display().to_string(),
                    source,
                })?;
            log::debug!(
                "Companion metadata for {}: {}",
                sql_path.display(),
                path.display()
            );
            return Ok(Some(CompanionMetadata { path, content }));
        }
        Ok(None)
    }
}

/// Serves companion documents from memory, keyed by document path
#[derive(Debug, Clone, Default)]
pub struct InMemoryMetadataResolver {
    documents: HashMap<PathBuf, String>,
}

impl InMemoryMetadataResolver {
    /// Create an empty resolver
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document at `path` (e.g. `models/orders.yml`)
    pub fn insert(&mut self, path: impl Into<PathBuf>, content: impl Into<String>) {
        self.documents.insert(path.into(), content.into());
    }

    /// Builder form of [`insert`](Self::insert)
    pub fn with(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.insert(path, content);
        self
    }
}

impl MetadataResolver for InMemoryMetadataResolver {
    fn resolve(&self, sql_path: &Path) -> SqlResult<Option<CompanionMetadata>> {
        Ok(candidate_paths(sql_path).into_iter().find_map(|path| {
            self.documents.get(&path).map(|content| CompanionMetadata {
                content: content.clone(),
                path,
            })
        }))
    }
}
