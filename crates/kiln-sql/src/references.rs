//! Lexical extraction of table and function references
//!
//! Works on raw text, so it applies to bodies the AST path cannot parse
//! (macros, procedural languages, dialect-specific DDL). Comments and string
//! literals are blanked first; the result is best effort and never fails.

use crate::text::mask_comments_and_literals;
use kiln_core::sql_utils::unquote_qualified;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// Table and function names referenced by a SQL body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct References {
    /// Tables read after `FROM` / `JOIN`
    pub tables: BTreeSet<String>,
    /// Non-built-in functions called
    pub functions: BTreeSet<String>,
}

/// Functions every supported engine provides; calls to these are not
/// dependencies.
const BUILTIN_FUNCTIONS: &[&str] = &[
    "abs", "acos", "age", "any_value", "approx_count_distinct", "array", "array_agg",
    "array_length", "asin", "atan", "atan2", "avg", "bool_and", "bool_or", "cast", "cbrt",
    "ceil", "ceiling", "char_length", "coalesce", "concat", "concat_ws", "contains", "cos",
    "count", "count_if", "cume_dist", "current_date", "current_time", "current_timestamp",
    "date", "date_add", "date_diff", "date_part", "date_sub", "date_trunc", "dateadd",
    "datediff", "day", "dayofweek", "decode", "degrees", "dense_rank", "ends_with", "epoch",
    "exp", "extract", "first", "first_value", "floor", "format", "generate_series",
    "greatest", "hash", "hour", "if", "iff", "ifnull", "initcap", "instr", "isnull",
    "json_extract", "json_extract_string", "json_object", "lag", "last", "last_day",
    "last_value", "lead", "least", "left", "len", "length", "list", "list_value", "listagg",
    "ln", "log", "log10", "log2", "lower", "lpad", "ltrim", "make_date", "max", "md5",
    "median", "min", "minute", "mod", "mode", "month", "now", "nth_value", "ntile", "nullif",
    "nvl", "nvl2", "overlay", "percent_rank", "percentile_cont", "percentile_disc", "pi",
    "position", "pow", "power", "quarter", "radians", "random", "range", "rank",
    "regexp_extract", "regexp_like", "regexp_matches", "regexp_replace", "regexp_substr",
    "repeat", "replace", "reverse", "right", "round", "row", "row_number", "rpad", "rtrim",
    "second", "sha1", "sha256", "sign", "sin", "split", "split_part", "sqrt", "starts_with",
    "stddev", "stddev_pop", "stddev_samp", "strftime", "string_agg", "strpos", "strptime",
    "struct", "struct_pack", "substr", "substring", "sum", "tan", "to_char", "to_date",
    "to_json", "to_number", "to_timestamp", "trim", "trunc", "try_cast", "typeof", "unnest",
    "upper", "uuid", "var_pop", "var_samp", "variance", "week", "year",
];

/// Keywords and type names that may be followed by `(` without being calls
const NON_FUNCTION_WORDS: &[&str] = &[
    "all", "and", "any", "as", "between", "bigint", "binary", "bit", "by", "case", "char",
    "character", "check", "cube", "decimal", "double", "else", "exists", "filter", "float",
    "for", "from", "function", "group", "grouping", "having", "in", "int", "integer",
    "interval", "into", "is", "join", "key", "lateral", "like", "limit", "macro", "map", "not",
    "number", "numeric", "nvarchar", "on", "or", "order", "over", "partition", "primary",
    "references", "return", "returns", "rollup", "select", "set", "sets", "table", "text",
    "then", "time", "timestamp", "union", "using", "values", "varbinary", "varchar", "when",
    "where", "window", "with", "within",
];

/// Words after FROM/JOIN that are never table names
const NON_TABLE_WORDS: &[&str] = &["lateral", "unnest", "table", "values", "select", "only"];

/// Calls whose arguments use `FROM` without naming a table
const FROM_SYNTAX_CALLS: &[&str] = &["extract", "trim", "substring", "overlay", "position"];

pub(crate) const IDENT: &str = r#"(?:"[^"]+"|`[^`]+`|\[[^\]]+\]|[A-Za-z_][A-Za-z0-9_$]*)"#;

static TABLE_RE: OnceLock<Regex> = OnceLock::new();
static CALL_RE: OnceLock<Regex> = OnceLock::new();

pub(crate) fn table_regex() -> &'static Regex {
    TABLE_RE.get_or_init(|| {
        Regex::new(&format!(
            r"(?i)\b(?:FROM|JOIN)\s+({id}(?:\s*\.\s*{id})*)",
            id = IDENT
        ))
        .expect("valid regex")
    })
}

fn call_regex() -> &'static Regex {
    CALL_RE.get_or_init(|| {
        Regex::new(&format!(r"({id}(?:\s*\.\s*{id})?)\s*\(", id = IDENT)).expect("valid regex")
    })
}

/// Whether a (case-insensitive) function name is a built-in
pub fn is_builtin_function(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    BUILTIN_FUNCTIONS.binary_search(&lower.as_str()).is_ok()
        || NON_FUNCTION_WORDS.contains(&lower.as_str())
}

/// Extract referenced tables and user function calls from SQL text.
pub fn extract_references(sql: &str) -> References {
    let masked = mask_comments_and_literals(sql);
    let mut refs = References::default();

    for caps in table_regex().captures_iter(&masked) {
        let Some(m) = caps.get(1) else { continue };
        if !is_table_position(&masked, m.start(), m.end()) {
            continue;
        }
        refs.tables.insert(clean_name(m.as_str()));
    }

    for caps in call_regex().captures_iter(&masked) {
        let Some(m) = caps.get(1) else { continue };
        if preceded_by_dot(&masked, m.start()) {
            continue;
        }
        let name = clean_name(m.as_str());
        let object = name.rsplit('.').next().unwrap_or_default();
        if !name.contains('.') && is_builtin_function(object) {
            continue;
        }
        if NON_FUNCTION_WORDS.contains(&object.to_ascii_lowercase().as_str()) {
            continue;
        }
        refs.functions.insert(name);
    }

    refs
}

/// Remove identifier quoting and the whitespace around dots
pub(crate) fn clean_name(raw: &str) -> String {
    let compact: String = raw
        .split('.')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join(".");
    unquote_qualified(&compact)
}

/// Whether the FROM/JOIN operand at `start..end` of masked text names a table
pub(crate) fn is_table_position(masked: &str, start: usize, end: usize) -> bool {
    let name = clean_name(&masked[start..end]);
    let first_word = name.split('.').next().unwrap_or_default().to_ascii_lowercase();
    if NON_TABLE_WORDS.contains(&first_word.as_str()) {
        return false;
    }
    if inside_from_syntax_call(masked, start) {
        return false;
    }
    // Table function calls are picked up by the call scan
    !masked[end..].trim_start().starts_with('(')
}

fn preceded_by_dot(text: &str, pos: usize) -> bool {
    text[..pos].trim_end().ends_with('.')
}

/// Whether `pos` sits inside the parentheses of `EXTRACT(... FROM ...)` and friends
fn inside_from_syntax_call(text: &str, pos: usize) -> bool {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut i = pos;
    while i > 0 {
        i -= 1;
        match bytes[i] {
            b')' => depth += 1,
            b'(' if depth > 0 => depth -= 1,
            b'(' => {
                let word: String = text[..i]
                    .trim_end()
                    .chars()
                    .rev()
                    .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
                    .collect();
                let word: String = word.chars().rev().collect();
                return FROM_SYNTAX_CALLS.contains(&word.to_ascii_lowercase().as_str());
            }
            _ => {}
        }
    }
    false
}

#[cfg(test)]
#[path = "references_test.rs"]
mod tests;
