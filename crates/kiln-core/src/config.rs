//! Configuration types and parsing for kiln.yml

use crate::dialect::Dialect;
use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Main project configuration from kiln.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Project name
    pub name: String,

    /// Project version
    #[serde(default = "default_version")]
    pub version: String,

    /// Schema prefixed to models whose table name is unqualified
    #[serde(default)]
    pub default_schema: Option<String>,

    /// Project-wide dialect for function DDL, consulted after filename
    /// overrides and before the connection type
    #[serde(default)]
    pub dialect: Option<String>,

    /// Dialect used to parse model queries (generic when unset)
    #[serde(default)]
    pub query_dialect: Option<String>,

    /// Target connection description
    #[serde(default)]
    pub connection: ConnectionConfig,
}

/// Target connection description.
///
/// Only `type` is interpreted by the compiler; everything else is carried
/// through for the executing adapter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Database type (`duckdb`, `postgresql`, `snowflake`, ...)
    #[serde(rename = "type", default)]
    pub db_type: Option<String>,

    /// Adapter-specific settings (host, path, warehouse, ...)
    #[serde(flatten)]
    pub settings: BTreeMap<String, serde_yaml::Value>,
}

impl ConnectionConfig {
    /// Connection with only a database type set
    pub fn of_type(db_type: impl Into<String>) -> Self {
        Self {
            db_type: Some(db_type.into()),
            settings: BTreeMap::new(),
        }
    }
}

fn default_version() -> String {
    "1.0.0".to_string()
}

impl Config {
    /// Minimal configuration with defaults for everything but the name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: default_version(),
            default_schema: None,
            dialect: None,
            query_dialect: None,
            connection: ConnectionConfig::default(),
        }
    }

    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_yaml_str(&content)
    }

    /// Parse and validate configuration from YAML text
    pub fn from_yaml_str(content: &str) -> CoreResult<Self> {
        let config: Config =
            serde_yaml::from_str(content).map_err(|e| CoreError::ConfigParseError {
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a project directory
    /// Looks for kiln.yml or kiln.yaml
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        let yml_path = dir.join("kiln.yml");
        let yaml_path = dir.join("kiln.yaml");

        if yml_path.exists() {
            Self::load(&yml_path)
        } else if yaml_path.exists() {
            Self::load(&yaml_path)
        } else {
            Err(CoreError::ConfigNotFound {
                path: yml_path.display().to_string(),
            })
        }
    }

    /// Validate the configuration
    fn validate(&self) -> CoreResult<()> {
        if self.name.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "Project name cannot be empty".to_string(),
            });
        }

        if let Some(schema) = &self.default_schema {
            if schema.trim().is_empty() || schema.contains(char::is_whitespace) {
                return Err(CoreError::ConfigInvalid {
                    message: format!("default_schema '{}' is not a valid schema name", schema),
                });
            }
        }

        for (field, value) in [("dialect", &self.dialect), ("query_dialect", &self.query_dialect)]
        {
            if let Some(name) = value {
                if name.parse::<Dialect>().is_err() {
                    return Err(CoreError::ConfigInvalid {
                        message: format!("Unknown {} '{}'", field, name),
                    });
                }
            }
        }

        Ok(())
    }

    /// Project-wide function dialect, if configured and recognized
    pub fn project_dialect(&self) -> Option<Dialect> {
        self.dialect.as_deref().and_then(|d| d.parse().ok())
    }

    /// Dialect for model queries (generic when unset)
    pub fn query_dialect(&self) -> Dialect {
        self.query_dialect
            .as_deref()
            .and_then(|d| d.parse().ok())
            .unwrap_or(Dialect::Generic)
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
