//! Incremental materialization configuration
//!
//! Serialized as a strategy tag plus a sub-object named after the strategy:
//!
//! ```yaml
//! incremental:
//!   strategy: merge
//!   merge:
//!     unique_key: [id]
//!     time_column: updated_at
//! ```

use serde::{Deserialize, Serialize};

/// Incremental strategy tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncrementalStrategy {
    /// INSERT rows newer than the last run
    Append,
    /// UPSERT on `unique_key`
    Merge,
    /// DELETE rows matching `where_condition`, then INSERT
    DeleteInsert,
}

impl IncrementalStrategy {
    /// All accepted strategy names
    pub const NAMES: &'static [&'static str] = &["append", "merge", "delete_insert"];

    /// Strategy name, also the key of its sub-object
    pub fn as_str(&self) -> &'static str {
        match self {
            IncrementalStrategy::Append => "append",
            IncrementalStrategy::Merge => "merge",
            IncrementalStrategy::DeleteInsert => "delete_insert",
        }
    }

    /// Parse a strategy name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "append" => Some(IncrementalStrategy::Append),
            "merge" => Some(IncrementalStrategy::Merge),
            "delete_insert" => Some(IncrementalStrategy::DeleteInsert),
            _ => None,
        }
    }

    /// Fields the strategy's sub-object must carry
    pub fn required_fields(&self) -> &'static [&'static str] {
        match self {
            IncrementalStrategy::Append => &["time_column"],
            IncrementalStrategy::Merge => &["unique_key", "time_column"],
            IncrementalStrategy::DeleteInsert => &["where_condition", "time_column"],
        }
    }
}

impl std::fmt::Display for IncrementalStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `append` strategy settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppendConfig {
    /// Column compared against the high-water mark
    pub time_column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookback: Option<String>,
}

/// `merge` strategy settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Columns identifying a row
    pub unique_key: Vec<String>,
    /// Column compared against the high-water mark
    pub time_column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookback: Option<String>,
}

/// `delete_insert` strategy settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteInsertConfig {
    /// Predicate selecting the rows to replace
    pub where_condition: String,
    /// Column compared against the high-water mark
    pub time_column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
}

/// Incremental configuration, one variant per strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "IncrementalRepr", into = "IncrementalRepr")]
pub enum IncrementalConfig {
    Append(AppendConfig),
    Merge(MergeConfig),
    DeleteInsert(DeleteInsertConfig),
}

impl IncrementalConfig {
    /// Strategy tag of this configuration
    pub fn strategy(&self) -> IncrementalStrategy {
        match self {
            IncrementalConfig::Append(_) => IncrementalStrategy::Append,
            IncrementalConfig::Merge(_) => IncrementalStrategy::Merge,
            IncrementalConfig::DeleteInsert(_) => IncrementalStrategy::DeleteInsert,
        }
    }

    /// Time column shared by every strategy
    pub fn time_column(&self) -> &str {
        match self {
            IncrementalConfig::Append(c) => &c.time_column,
            IncrementalConfig::Merge(c) => &c.time_column,
            IncrementalConfig::DeleteInsert(c) => &c.time_column,
        }
    }
}

/// Wire shape: `{strategy, append?, merge?, delete_insert?}`
#[derive(Serialize, Deserialize)]
struct IncrementalRepr {
    strategy: IncrementalStrategy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    append: Option<AppendConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    merge: Option<MergeConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    delete_insert: Option<DeleteInsertConfig>,
}

impl TryFrom<IncrementalRepr> for IncrementalConfig {
    type Error = String;

    fn try_from(repr: IncrementalRepr) -> Result<Self, Self::Error> {
        let missing = || {
            format!(
                "strategy '{}' requires a '{}' block",
                repr.strategy, repr.strategy
            )
        };
        match repr.strategy {
            IncrementalStrategy::Append => repr
                .append
                .clone()
                .map(IncrementalConfig::Append)
                .ok_or_else(missing),
            IncrementalStrategy::Merge => repr
                .merge
                .clone()
                .map(IncrementalConfig::Merge)
                .ok_or_else(missing),
            IncrementalStrategy::DeleteInsert => repr
                .delete_insert
                .clone()
                .map(IncrementalConfig::DeleteInsert)
                .ok_or_else(missing),
        }
    }
}

impl From<IncrementalConfig> for IncrementalRepr {
    fn from(config: IncrementalConfig) -> Self {
        let mut repr = IncrementalRepr {
            strategy: config.strategy(),
            append: None,
            merge: None,
            delete_insert: None,
        };
        match config {
            IncrementalConfig::Append(c) => repr.append = Some(c),
            IncrementalConfig::Merge(c) => repr.merge = Some(c),
            IncrementalConfig::DeleteInsert(c) => repr.delete_insert = Some(c),
        }
        repr
    }
}
