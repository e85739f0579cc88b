//! Mapping from Kiln dialects to sqlparser dialects

use kiln_core::Dialect;
use sqlparser::ast::Statement;
use sqlparser::dialect::{
    BigQueryDialect, DatabricksDialect, Dialect as ParserDialect, DuckDbDialect, GenericDialect,
    MsSqlDialect, MySqlDialect, PostgreSqlDialect, RedshiftSqlDialect, SQLiteDialect,
    SnowflakeDialect,
};
use sqlparser::parser::Parser;

use crate::error::{SqlError, SqlResult};

/// The sqlparser dialect used to parse text of the given dialect
pub fn parser_dialect(dialect: Dialect) -> Box<dyn ParserDialect> {
    match dialect {
        Dialect::Postgres => Box::new(PostgreSqlDialect {}),
        Dialect::DuckDb => Box::new(DuckDbDialect {}),
        Dialect::Snowflake => Box::new(SnowflakeDialect {}),
        Dialect::MySql => Box::new(MySqlDialect {}),
        Dialect::BigQuery => Box::new(BigQueryDialect {}),
        Dialect::Spark => Box::new(DatabricksDialect {}),
        Dialect::Sqlite => Box::new(SQLiteDialect {}),
        Dialect::Redshift => Box::new(RedshiftSqlDialect {}),
        Dialect::MsSql => Box::new(MsSqlDialect {}),
        Dialect::Generic => Box::new(GenericDialect {}),
    }
}

/// Quote an identifier the way the dialect expects
pub fn quote_ident(dialect: Dialect, ident: &str) -> String {
    match dialect {
        Dialect::MySql | Dialect::BigQuery | Dialect::Spark => {
            format!("`{}`", ident.replace('`', "``"))
        }
        Dialect::MsSql => format!("[{}]", ident.replace(']', "]]")),
        _ => format!("\"{}\"", ident.replace('"', "\"\"")),
    }
}

/// Parse SQL into AST statements with the given sqlparser dialect
pub(crate) fn parse_statements(dialect: &dyn ParserDialect, sql: &str) -> SqlResult<Vec<Statement>> {
    Parser::parse_sql(dialect, sql).map_err(|e| {
        let msg = e.to_string();
        // Extract line/column from error message (format: "... at Line: X, Column: Y")
        let (line, column) = parse_location_from_error(&msg);
        SqlError::ParseError {
            message: msg,
            line,
            column,
        }
    })
}

/// Parse line and column from sqlparser error message.
///
/// sqlparser's `ParserError` carries no structured location data, so the
/// "Line: N, Column: M" suffix is read back out of the message text.
fn parse_location_from_error(msg: &str) -> (usize, usize) {
    let Some(line_idx) = msg.find("Line: ") else {
        return (0, 0);
    };
    let line_start = line_idx + 6;
    let Some(comma_idx) = msg[line_start..].find(',') else {
        return (0, 0);
    };
    let Ok(line) = msg[line_start..line_start + comma_idx]
        .trim()
        .parse::<usize>()
    else {
        return (0, 0);
    };
    let Some(col_idx) = msg.find("Column: ") else {
        return (0, 0);
    };
    let col_start = col_idx + 8;
    let col_end = msg[col_start..]
        .find(|c: char| !c.is_ascii_digit())
        .map(|i| col_start + i)
        .unwrap_or(msg.len());
    let Ok(column) = msg[col_start..col_end].trim().parse::<usize>() else {
        return (0, 0);
    };
    (line, column)
}

#[cfg(test)]
#[path = "dialect_test.rs"]
mod tests;
