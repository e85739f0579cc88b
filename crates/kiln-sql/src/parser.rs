//! SQL parser wrapper

use crate::dialect::{parse_statements, parser_dialect, quote_ident};
use crate::error::{SqlError, SqlResult};
use kiln_core::Dialect;
use sqlparser::ast::Statement;
use sqlparser::dialect::Dialect as ParserDialect;

/// SQL parser that wraps sqlparser-rs with dialect support
#[derive(Debug)]
pub struct SqlParser {
    dialect: Dialect,
    inner: Box<dyn ParserDialect>,
}

impl SqlParser {
    /// Create a parser for a dialect
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            inner: parser_dialect(dialect),
        }
    }

    /// Create a parser with the generic (ANSI-leaning) dialect
    pub fn generic() -> Self {
        Self::new(Dialect::Generic)
    }

    /// Create a parser from dialect name
    pub fn from_dialect_name(name: &str) -> SqlResult<Self> {
        name.parse::<Dialect>()
            .map(Self::new)
            .map_err(|_| SqlError::UnknownDialect(name.to_string()))
    }

    /// Parse SQL into AST statements
    pub fn parse(&self, sql: &str) -> SqlResult<Vec<Statement>> {
        let sql = sql.trim();
        if sql.is_empty() {
            return Err(SqlError::EmptySql);
        }

        parse_statements(self.inner.as_ref(), sql)
    }

    /// Parse SQL that must hold exactly one statement
    pub fn parse_single(&self, sql: &str, path: &str) -> SqlResult<Statement> {
        let mut stmts = self.parse(sql)?;
        if stmts.len() != 1 {
            return Err(SqlError::StatementCount {
                path: path.to_string(),
                count: stmts.len(),
            });
        }
        stmts.pop().ok_or(SqlError::EmptySql)
    }

    /// Get the dialect
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Quote an identifier for the current dialect
    pub fn quote_ident(&self, ident: &str) -> String {
        quote_ident(self.dialect, ident)
    }
}

impl Default for SqlParser {
    fn default() -> Self {
        Self::generic()
    }
}
