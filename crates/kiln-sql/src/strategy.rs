//! Function definition extraction strategies
//!
//! [`AstStrategy`] parses the statement with sqlparser and reads the
//! `CREATE FUNCTION` node. [`FallbackStrategy`] recovers the same shape with
//! patterns over the text, for macros and dialect DDL the AST cannot model.
//! Neither ever fails: an unrecognized statement yields `None`.

use crate::dialect::{parse_statements, parser_dialect};
use crate::extractor::object_name_to_string;
use crate::params::parse_parameter_list;
use crate::references::{clean_name, IDENT};
use crate::text::{dollar_tag, mask_comments_and_literals};
use kiln_core::metadata::{FunctionParameter, ParameterMode};
use kiln_core::sql_utils::normalize_whitespace;
use kiln_core::Dialect;
use regex::Regex;
use sqlparser::ast::Statement;
use std::sync::OnceLock;

/// A function or macro definition recovered from SQL text
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDefinition {
    /// Name as written, unquoted, optionally schema-qualified
    pub name: String,
    pub parameters: Vec<FunctionParameter>,
    /// Return type phrase (`DOUBLE`, `TABLE(id INT)`)
    pub return_type: Option<String>,
    /// Implementation language, lowercased
    pub language: Option<String>,
    /// Text of the body, used for dependency extraction
    pub body: String,
    /// Declared with `MACRO` rather than `FUNCTION`
    pub is_macro: bool,
    /// `RETURNS TABLE` appears in the definition
    pub is_table: bool,
}

/// One way of recognizing a function definition.
pub trait FunctionStrategy: std::fmt::Debug {
    /// Short name used in debug logs
    fn name(&self) -> &'static str;

    /// Recover the definition, or `None` if this strategy does not recognize it
    fn extract(&self, sql: &str, dialect: Dialect) -> Option<FunctionDefinition>;
}

static HEADER_RE: OnceLock<Regex> = OnceLock::new();
static RETURNS_RE: OnceLock<Regex> = OnceLock::new();
static RETURNS_TABLE_RE: OnceLock<Regex> = OnceLock::new();
static RETURN_STOP_RE: OnceLock<Regex> = OnceLock::new();
static LANGUAGE_RE: OnceLock<Regex> = OnceLock::new();
static AS_RE: OnceLock<Regex> = OnceLock::new();
static BODY_STOP_RE: OnceLock<Regex> = OnceLock::new();

fn header_regex() -> &'static Regex {
    HEADER_RE.get_or_init(|| {
        Regex::new(&format!(
            r"(?i)\bCREATE\s+(?:OR\s+REPLACE\s+)?(?:(?:TEMP|TEMPORARY)\s+)?(FUNCTION|MACRO)\s+(?:IF\s+NOT\s+EXISTS\s+)?({id}(?:\s*\.\s*{id})*)\s*\(",
            id = IDENT
        ))
        .expect("valid regex")
    })
}

fn returns_regex() -> &'static Regex {
    RETURNS_RE.get_or_init(|| Regex::new(r"(?i)\bRETURNS\s+").expect("valid regex"))
}

fn returns_table_regex() -> &'static Regex {
    RETURNS_TABLE_RE.get_or_init(|| Regex::new(r"(?i)\bRETURNS\s+TABLE\b").expect("valid regex"))
}

fn return_stop_regex() -> &'static Regex {
    RETURN_STOP_RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:AS|LANGUAGE|IMMUTABLE|STABLE|VOLATILE|STRICT)\b|;")
            .expect("valid regex")
    })
}

fn language_regex() -> &'static Regex {
    LANGUAGE_RE.get_or_init(|| Regex::new(r"(?i)\bLANGUAGE\s+").expect("valid regex"))
}

fn as_regex() -> &'static Regex {
    AS_RE.get_or_init(|| Regex::new(r"(?i)\bAS\b").expect("valid regex"))
}

fn body_stop_regex() -> &'static Regex {
    BODY_STOP_RE.get_or_init(|| Regex::new(r"(?i)\bLANGUAGE\b|;").expect("valid regex"))
}

/// Whether `RETURNS TABLE` appears anywhere in the text (any case)
pub fn returns_table(sql: &str) -> bool {
    returns_table_regex().is_match(sql)
}

/// Location of a definition header in the text
#[derive(Debug, Clone)]
struct Signature {
    is_macro: bool,
    name: String,
    /// Byte range of the text between the signature parentheses
    params: (usize, usize),
    /// Byte offset just past the closing parenthesis
    tail_start: usize,
}

fn locate_signature(sql: &str, masked: &str) -> Option<Signature> {
    let caps = header_regex().captures(masked)?;
    let whole = caps.get(0)?;
    let kind = caps.get(1)?;
    let name = caps.get(2)?;

    let open = whole.end() - 1;
    let close = matching_paren(masked, open)?;

    Some(Signature {
        is_macro: kind.as_str().eq_ignore_ascii_case("macro"),
        name: clean_name(&sql[name.start()..name.end()]),
        params: (open + 1, close),
        tail_start: close + 1,
    })
}

/// Index of the `)` closing the `(` at `open`, skipping quoted identifiers
fn matching_paren(masked: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_ident = false;
    for (i, c) in masked[open..].char_indices() {
        match c {
            '"' => in_ident = !in_ident,
            _ if in_ident => {}
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Return type phrase after `RETURNS`, stopping before `AS`/`LANGUAGE`/`;`/end
fn extract_return_type(sql: &str, masked: &str, from: usize) -> (Option<String>, usize) {
    let Some(m) = returns_regex().find(&masked[from..]) else {
        return (None, from);
    };
    let start = from + m.end();
    let stop = return_stop_regex()
        .find(&masked[start..])
        .map(|s| start + s.start())
        .unwrap_or(masked.len());
    let phrase = normalize_whitespace(&sql[start..stop]);
    ((!phrase.is_empty()).then_some(phrase), stop)
}

fn extract_language(sql: &str, masked: &str, from: usize) -> Option<String> {
    let m = language_regex().find(&masked[from..])?;
    let rest = &sql[from + m.end()..];
    let word = match rest.strip_prefix('\'') {
        Some(quoted) => quoted.split('\'').next().unwrap_or_default(),
        None => {
            let end = rest
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(rest.len());
            &rest[..end]
        }
    };
    (!word.is_empty()).then(|| word.to_ascii_lowercase())
}

/// Body after `AS`: dollar-quoted, single-quoted, or up to `LANGUAGE`/`;`/end
fn extract_body(sql: &str, masked: &str, from: usize) -> String {
    let Some(m) = as_regex().find(&masked[from..]) else {
        return String::new();
    };
    let after = from + m.end();
    let rest = sql[after..].trim_start();
    let start = sql.len() - rest.len();

    if let Some(tag) = dollar_tag(rest) {
        let inner = &rest[tag.len()..];
        let end = inner.find(tag).unwrap_or(inner.len());
        return inner[..end].trim().to_string();
    }

    if let Some(quoted) = rest.strip_prefix('\'') {
        let mut body = String::new();
        let mut chars = quoted.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '\'' {
                if chars.peek() == Some(&'\'') {
                    chars.next();
                    body.push('\'');
                    continue;
                }
                break;
            }
            body.push(c);
        }
        return body.trim().to_string();
    }

    let stop = body_stop_regex()
        .find(&masked[start..])
        .map(|s| start + s.start())
        .unwrap_or(sql.len());
    sql[start..stop].trim().to_string()
}

/// Primary path: sqlparser `CREATE FUNCTION`
#[derive(Debug, Clone, Copy, Default)]
pub struct AstStrategy;

impl FunctionStrategy for AstStrategy {
    fn name(&self) -> &'static str {
        "ast"
    }

    fn extract(&self, sql: &str, dialect: Dialect) -> Option<FunctionDefinition> {
        // DuckDB definitions are macros, which the AST does not model as functions
        if dialect == Dialect::DuckDb {
            return None;
        }

        let parser = parser_dialect(dialect);
        let statements = match parse_statements(parser.as_ref(), sql) {
            Ok(statements) => statements,
            Err(e) => {
                log::debug!("AST path declined ({}): {}", dialect, e);
                return None;
            }
        };
        let [Statement::CreateFunction(func)] = statements.as_slice() else {
            return None;
        };

        let parameters = func
            .args
            .iter()
            .flatten()
            .filter_map(|arg| {
                let name = arg.name.as_ref()?.value.clone();
                Some(FunctionParameter {
                    name,
                    data_type: arg.data_type.to_string(),
                    description: None,
                    default: arg.default_expr.as_ref().map(|e| e.to_string()),
                    mode: arg
                        .mode
                        .as_ref()
                        .and_then(|m| ParameterMode::from_keyword(&m.to_string())),
                })
            })
            .collect();

        let masked = mask_comments_and_literals(sql);
        let body = locate_signature(sql, &masked)
            .map(|sig| extract_body(sql, &masked, sig.tail_start))
            .unwrap_or_default();

        Some(FunctionDefinition {
            name: object_name_to_string(&func.name),
            parameters,
            return_type: func.return_type.as_ref().map(|t| t.to_string()),
            language: func.language.as_ref().map(|l| l.value.to_ascii_lowercase()),
            body,
            is_macro: false,
            is_table: returns_table(sql),
        })
    }
}

/// Pattern-based path for `CREATE [OR REPLACE] FUNCTION|MACRO`
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackStrategy;

impl FunctionStrategy for FallbackStrategy {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn extract(&self, sql: &str, _dialect: Dialect) -> Option<FunctionDefinition> {
        let masked = mask_comments_and_literals(sql);
        let sig = locate_signature(sql, &masked)?;

        let (params_start, params_end) = sig.params;
        let parameters = parse_parameter_list(&normalize_whitespace(&sql[params_start..params_end]));
        let (return_type, after_returns) = extract_return_type(sql, &masked, sig.tail_start);
        let language = extract_language(sql, &masked, sig.tail_start);
        let body = extract_body(sql, &masked, after_returns);

        Some(FunctionDefinition {
            name: sig.name,
            parameters,
            return_type,
            language,
            body,
            is_macro: sig.is_macro,
            is_table: returns_table(sql),
        })
    }
}

/// The default strategy chain: AST first, then the fallback
pub fn default_strategies() -> Vec<Box<dyn FunctionStrategy>> {
    vec![Box::new(AstStrategy), Box::new(FallbackStrategy)]
}

#[cfg(test)]
#[path = "strategy_test.rs"]
mod tests;
