//! SQL dialect names and dialect inference for function DDL
//!
//! The dialect used to parse a function definition is chosen by a strict
//! priority chain, first match wins:
//!
//! 1. an explicit dialect passed by the caller
//! 2. `dialect` in the companion metadata
//! 3. a `{base}.{database}.sql` filename override
//! 4. the project-wide `dialect` setting
//! 5. the connection type, falling back to PostgreSQL

use crate::config::ConnectionConfig;
use crate::metadata::RawMetadata;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// A SQL dialect understood by the parsing layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// PostgreSQL (default for `CREATE FUNCTION`)
    #[default]
    Postgres,
    /// DuckDB
    DuckDb,
    /// Snowflake
    Snowflake,
    /// MySQL
    MySql,
    /// Google BigQuery
    BigQuery,
    /// Apache Spark SQL
    Spark,
    /// SQLite
    Sqlite,
    /// Amazon Redshift
    Redshift,
    /// Microsoft SQL Server
    MsSql,
    /// ANSI-leaning generic dialect (default for model queries)
    Generic,
}

impl Dialect {
    /// Canonical lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
            Dialect::DuckDb => "duckdb",
            Dialect::Snowflake => "snowflake",
            Dialect::MySql => "mysql",
            Dialect::BigQuery => "bigquery",
            Dialect::Spark => "spark",
            Dialect::Sqlite => "sqlite",
            Dialect::Redshift => "redshift",
            Dialect::MsSql => "mssql",
            Dialect::Generic => "generic",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a dialect name is not recognized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownDialect(pub String);

impl fmt::Display for UnknownDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown SQL dialect '{}'", self.0)
    }
}

impl std::error::Error for UnknownDialect {}

impl FromStr for Dialect {
    type Err = UnknownDialect;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            "duckdb" => Ok(Dialect::DuckDb),
            "snowflake" => Ok(Dialect::Snowflake),
            "mysql" => Ok(Dialect::MySql),
            "bigquery" => Ok(Dialect::BigQuery),
            "spark" | "databricks" => Ok(Dialect::Spark),
            "sqlite" => Ok(Dialect::Sqlite),
            "redshift" => Ok(Dialect::Redshift),
            "mssql" | "tsql" | "sqlserver" => Ok(Dialect::MsSql),
            "generic" | "ansi" => Ok(Dialect::Generic),
            _ => Err(UnknownDialect(s.to_string())),
        }
    }
}

/// Database names recognized as a `{base}.{database}.{ext}` filename override
const FILENAME_DATABASES: &[&str] = &[
    "postgresql",
    "postgres",
    "duckdb",
    "snowflake",
    "mysql",
    "bigquery",
    "spark",
    "sqlite",
    "redshift",
    "mssql",
];

/// Where the inferred dialect came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialectSource {
    /// Passed explicitly by the caller
    Explicit,
    /// `dialect` key of the companion metadata
    Metadata,
    /// `{base}.{database}.{ext}` filename convention
    Filename,
    /// Project-wide configuration
    Project,
    /// Connection type (or the PostgreSQL fallback)
    Connection,
}

/// Resolve the dialect for a function definition (no project default).
pub fn infer_dialect(
    explicit: Option<&str>,
    metadata: Option<&RawMetadata>,
    file_path: &Path,
    connection: Option<&ConnectionConfig>,
) -> Dialect {
    infer_dialect_with_source(explicit, metadata, file_path, None, connection).0
}

/// Resolve the dialect and report which rule of the priority chain decided it.
pub fn infer_dialect_with_source(
    explicit: Option<&str>,
    metadata: Option<&RawMetadata>,
    file_path: &Path,
    project: Option<Dialect>,
    connection: Option<&ConnectionConfig>,
) -> (Dialect, DialectSource) {
    if let Some(name) = explicit {
        match name.parse::<Dialect>() {
            Ok(d) => return (d, DialectSource::Explicit),
            Err(e) => log::warn!("Ignoring explicit dialect for {}: {}", file_path.display(), e),
        }
    }

    if let Some(name) = metadata
        .and_then(|m| m.get("dialect"))
        .and_then(|v| v.as_str())
    {
        match name.parse::<Dialect>() {
            Ok(d) => return (d, DialectSource::Metadata),
            Err(e) => log::warn!("Ignoring metadata dialect for {}: {}", file_path.display(), e),
        }
    }

    if let Some(d) = dialect_from_filename(file_path) {
        return (d, DialectSource::Filename);
    }

    if let Some(d) = project {
        return (d, DialectSource::Project);
    }

    (dialect_from_connection(connection), DialectSource::Connection)
}

/// Extract a dialect override from a `{base}.{database}.{ext}` file name.
///
/// Returns `None` when the stem has no trailing segment or the segment is not
/// a recognized database name.
pub fn dialect_from_filename(file_path: &Path) -> Option<Dialect> {
    let stem = file_path.file_stem()?.to_str()?;
    let (_, suffix) = stem.rsplit_once('.')?;
    let suffix = suffix.to_ascii_lowercase();
    if !FILENAME_DATABASES.contains(&suffix.as_str()) {
        return None;
    }
    Some(suffix.parse().unwrap_or(Dialect::Postgres))
}

/// Map a connection type to a dialect; unrecognized or absent types fall back
/// to PostgreSQL, the most standards-compliant `CREATE FUNCTION` syntax.
pub fn dialect_from_connection(connection: Option<&ConnectionConfig>) -> Dialect {
    let db_type = connection
        .and_then(|c| c.db_type.as_deref())
        .map(|t| t.trim().to_ascii_lowercase());

    match db_type.as_deref() {
        Some("duckdb") => Dialect::DuckDb,
        Some("postgresql") | Some("postgres") => Dialect::Postgres,
        Some("snowflake") => Dialect::Snowflake,
        Some("mysql") => Dialect::MySql,
        Some("bigquery") => Dialect::BigQuery,
        Some("spark") => Dialect::Spark,
        _ => Dialect::Postgres,
    }
}

/// Strip a recognized `.{database}` suffix from a file stem.
///
/// `calc.snowflake` becomes `calc`; stems without a recognized suffix are
/// returned unchanged.
pub fn base_stem(stem: &str) -> &str {
    match stem.rsplit_once('.') {
        Some((base, suffix))
            if FILENAME_DATABASES.contains(&suffix.to_ascii_lowercase().as_str()) =>
        {
            base
        }
        _ => stem,
    }
}

#[cfg(test)]
#[path = "dialect_test.rs"]
mod tests;
