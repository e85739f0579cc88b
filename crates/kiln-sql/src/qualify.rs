//! Table reference qualification for resolved SQL
//!
//! Rewrites bare table references to `schema.table` in place, preserving the
//! original formatting. Candidates come from the AST walk; a candidate is
//! only rewritten where it appears directly after `FROM`/`JOIN` in the text
//! with comments and literals blanked. Already-qualified references, CTE
//! names, and anything outside the candidate set are left unchanged.

use crate::references::{clean_name, is_table_position, table_regex};
use crate::text::mask_comments_and_literals;
use std::collections::{BTreeSet, HashSet};

/// Qualify bare references to `tables` with `schema`.
///
/// `schema` may itself be dotted (`warehouse.analytics`). An empty schema
/// returns `sql` unchanged.
pub fn qualify_table_references(sql: &str, schema: &str, tables: &BTreeSet<String>) -> String {
    let schema = schema.trim();
    if schema.is_empty() || tables.is_empty() {
        return sql.to_string();
    }

    let bare: HashSet<String> = tables
        .iter()
        .filter(|t| !t.contains('.'))
        .map(|t| t.to_lowercase())
        .collect();
    if bare.is_empty() {
        return sql.to_string();
    }

    // Masking keeps byte offsets, so positions map straight back onto `sql`
    let masked = mask_comments_and_literals(sql);
    let mut out = String::with_capacity(sql.len() + schema.len() * 4);
    let mut cursor = 0;

    for caps in table_regex().captures_iter(&masked) {
        let Some(m) = caps.get(1) else { continue };
        if !is_table_position(&masked, m.start(), m.end()) {
            continue;
        }
        let name = clean_name(m.as_str());
        if name.contains('.') || !bare.contains(&name.to_lowercase()) {
            continue;
        }
        out.push_str(&sql[cursor..m.start()]);
        out.push_str(schema);
        out.push('.');
        cursor = m.start();
    }
    out.push_str(&sql[cursor..]);
    out
}

#[cfg(test)]
#[path = "qualify_test.rs"]
mod tests;
