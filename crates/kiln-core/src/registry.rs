//! Model and function registries owned by a [`ProjectContext`]
//!
//! Every parsed record is registered under its identity. Registering the same
//! identity again from the same source file replaces the entry; registering it
//! from a different file is a conflict. Records are also indexed by source
//! file so a re-parsed file can retire whatever it produced before.

use crate::error::{CoreError, CoreResult};
use crate::record::{CanonicalFunction, CanonicalModel, FunctionKey};
use crate::model_name::ModelName;
use crate::sql_utils::split_qualified_name;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A record that can live in a [`Registry`]
pub trait Registered {
    /// Identity key
    type Key: Ord + Clone + fmt::Display;

    fn registry_key(&self) -> Self::Key;

    /// Source file that produced the record
    fn source_path(&self) -> Option<&Path>;

    /// Conflict error for two files defining the same identity
    fn conflict(key: &Self::Key, existing_path: String, new_path: String) -> CoreError;
}

impl Registered for CanonicalModel {
    type Key = ModelName;

    fn registry_key(&self) -> ModelName {
        self.name().clone()
    }

    fn source_path(&self) -> Option<&Path> {
        self.file_path()
    }

    fn conflict(key: &ModelName, existing_path: String, new_path: String) -> CoreError {
        CoreError::ModelConflict {
            name: key.to_string(),
            existing_path,
            new_path,
        }
    }
}

impl Registered for CanonicalFunction {
    type Key = FunctionKey;

    fn registry_key(&self) -> FunctionKey {
        self.key()
    }

    fn source_path(&self) -> Option<&Path> {
        self.file_path()
    }

    fn conflict(key: &FunctionKey, existing_path: String, new_path: String) -> CoreError {
        CoreError::FunctionConflict {
            name: key.to_string(),
            existing_path,
            new_path,
        }
    }
}

/// Ordered map of records by identity
#[derive(Debug)]
pub struct Registry<T: Registered> {
    entries: BTreeMap<T::Key, Arc<T>>,
    by_source: BTreeMap<PathBuf, BTreeSet<T::Key>>,
}

impl<T: Registered> Default for Registry<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            by_source: BTreeMap::new(),
        }
    }
}

impl<T: Registered> Registry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a record, replacing an entry from the same source file.
    pub fn register(&mut self, record: Arc<T>) -> CoreResult<()> {
        let key = record.registry_key();
        if let Some(existing) = self.entries.get(&key) {
            if existing.source_path() != record.source_path() {
                return Err(T::conflict(
                    &key,
                    display_path(existing.source_path()),
                    display_path(record.source_path()),
                ));
            }
            log::debug!("Replacing '{}' from the same source file", key);
        }
        if let Some(path) = record.source_path() {
            self.by_source
                .entry(path.to_path_buf())
                .or_default()
                .insert(key.clone());
        }
        self.entries.insert(key, record);
        Ok(())
    }

    /// Remove every record registered from `path`, returning them in key order
    pub fn retire_source(&mut self, path: &Path) -> Vec<Arc<T>> {
        let Some(keys) = self.by_source.remove(path) else {
            return Vec::new();
        };
        keys.iter()
            .filter_map(|key| self.entries.remove(key))
            .collect()
    }

    pub fn get(&self, key: &T::Key) -> Option<&Arc<T>> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &T::Key) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&mut self, key: &T::Key) -> Option<Arc<T>> {
        let record = self.entries.remove(key)?;
        if let Some(path) = record.source_path() {
            if let Some(keys) = self.by_source.get_mut(path) {
                keys.remove(key);
                if keys.is_empty() {
                    self.by_source.remove(path);
                }
            }
        }
        Some(record)
    }

    /// Records in identity order
    pub fn iter(&self) -> impl Iterator<Item = (&T::Key, &Arc<T>)> {
        self.entries.iter()
    }

    pub fn values(&self) -> impl Iterator<Item = &Arc<T>> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn display_path(path: Option<&Path>) -> String {
    path.map(|p| p.display().to_string())
        .unwrap_or_else(|| "<unknown>".to_string())
}

/// Registry of canonical models keyed by table name
pub type ModelRegistry = Registry<CanonicalModel>;

/// Registry of canonical functions keyed by name and signature
pub type FunctionRegistry = Registry<CanonicalFunction>;

impl Registry<CanonicalModel> {
    /// Models a table reference from SQL text can point at.
    ///
    /// Exact (case-insensitive) matches win; otherwise an unqualified reference
    /// matches every model with that object name.
    pub fn find(&self, reference: &str) -> Vec<&Arc<CanonicalModel>> {
        let exact: Vec<_> = self
            .entries
            .iter()
            .filter(|(name, _)| name.as_str().eq_ignore_ascii_case(reference))
            .map(|(_, m)| m)
            .collect();
        if !exact.is_empty() || reference.contains('.') {
            return exact;
        }
        self.entries
            .iter()
            .filter(|(name, _)| name.object_name().eq_ignore_ascii_case(reference))
            .map(|(_, m)| m)
            .collect()
    }

    /// The single model a reference resolves to, if unambiguous
    pub fn lookup(&self, reference: &str) -> Option<&Arc<CanonicalModel>> {
        let mut found = self.find(reference);
        if found.len() == 1 {
            found.pop()
        } else {
            None
        }
    }
}

impl Registry<CanonicalFunction> {
    /// Every overload a function reference from SQL text can point at.
    pub fn overloads(&self, reference: &str) -> Vec<&Arc<CanonicalFunction>> {
        let (schema, _) = split_qualified_name(reference);
        let exact: Vec<_> = self
            .entries
            .iter()
            .filter(|(key, _)| key.name.as_str().eq_ignore_ascii_case(reference))
            .map(|(_, f)| f)
            .collect();
        if !exact.is_empty() || schema.is_some() {
            return exact;
        }
        self.entries
            .iter()
            .filter(|(key, _)| key.name.matches_reference(reference))
            .map(|(_, f)| f)
            .collect()
    }
}

/// All registered records of one project
///
/// Owned explicitly by the caller; independent projects never share state.
#[derive(Debug, Default)]
pub struct ProjectContext {
    pub models: ModelRegistry,
    pub functions: FunctionRegistry,
}

impl ProjectContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_model(&mut self, model: Arc<CanonicalModel>) -> CoreResult<()> {
        self.models.register(model)
    }

    pub fn register_function(&mut self, function: Arc<CanonicalFunction>) -> CoreResult<()> {
        self.functions.register(function)
    }

    /// Drop every model and function that came from `path`.
    ///
    /// Returns how many records were removed.
    pub fn retire_source(&mut self, path: &Path) -> usize {
        let removed =
            self.models.retire_source(path).len() + self.functions.retire_source(path).len();
        if removed > 0 {
            log::debug!("Retired {} records from {}", removed, path.display());
        }
        removed
    }

    /// Number of registered records
    pub fn len(&self) -> usize {
        self.models.len() + self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty() && self.functions.is_empty()
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
