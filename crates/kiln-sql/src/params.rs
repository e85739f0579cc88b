//! Function parameter list parsing
//!
//! Shared by both function strategies: the fallback path feeds it the raw
//! text between the signature parentheses, the AST path only uses it for
//! macro-style lists the AST does not model.

use crate::text::mask_comments_and_literals;
use kiln_core::metadata::{FunctionParameter, ParameterMode};
use kiln_core::sql_utils::unquote_qualified;

/// Byte offsets in `masked` where depth is zero and no identifier quote is open
fn top_level_positions(masked: &str) -> Vec<(usize, char)> {
    let mut depth = 0usize;
    let mut in_ident = false;
    let mut out = Vec::new();
    for (i, c) in masked.char_indices() {
        match c {
            '"' => in_ident = !in_ident,
            _ if in_ident => {}
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push((i, c)),
            _ => {}
        }
    }
    out
}

/// Split on commas outside parentheses, brackets, quotes, and comments.
///
/// Empty segments are dropped.
pub fn split_top_level(text: &str) -> Vec<&str> {
    let masked = mask_comments_and_literals(text);
    let mut parts = Vec::new();
    let mut start = 0;
    for (i, c) in top_level_positions(&masked) {
        if c == ',' {
            parts.push(&text[start..i]);
            start = i + 1;
        }
    }
    parts.push(&text[start..]);
    parts
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

/// Position and length of the default-value delimiter (`DEFAULT`, `:=`, `=`)
fn default_delimiter(text: &str) -> Option<(usize, usize)> {
    let masked = mask_comments_and_literals(text);
    let positions = top_level_positions(&masked);
    for (i, c) in positions {
        let rest = &masked[i..];
        if rest.starts_with(":=") {
            return Some((i, 2));
        }
        if c == '=' {
            return Some((i, 1));
        }
        let at_word_start = i > 0
            && masked[..i]
                .chars()
                .next_back()
                .is_some_and(char::is_whitespace);
        if at_word_start
            && rest.get(..7).is_some_and(|w| w.eq_ignore_ascii_case("default"))
            && rest[7..].chars().next().map_or(true, char::is_whitespace)
        {
            return Some((i, 7));
        }
    }
    None
}

/// Parse one parameter: `[IN|OUT|INOUT] name [type] [DEFAULT expr | = expr | := expr]`.
///
/// The type is empty for untyped macro parameters. Returns `None` for blank input.
pub fn parse_parameter(text: &str) -> Option<FunctionParameter> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let (decl, default) = match default_delimiter(text) {
        Some((pos, len)) => {
            let value = text[pos + len..].trim();
            (
                text[..pos].trim(),
                (!value.is_empty()).then(|| value.to_string()),
            )
        }
        None => (text, None),
    };

    let mut rest = decl;
    let mut mode = None;
    if let Some((first, tail)) = rest.split_once(char::is_whitespace) {
        if let Some(m) = ParameterMode::from_keyword(first) {
            mode = Some(m);
            rest = tail.trim_start();
        }
    }

    let (name, data_type) = split_name(rest);
    if name.is_empty() {
        return None;
    }

    Some(FunctionParameter {
        name: unquote_qualified(name),
        data_type: data_type.trim().to_string(),
        description: None,
        default,
        mode,
    })
}

/// Split a declaration into its (possibly quoted) name and the remaining type
fn split_name(decl: &str) -> (&str, &str) {
    if decl.starts_with('"') {
        if let Some(close) = decl[1..].find('"') {
            let end = close + 2;
            return (&decl[..end], &decl[end..]);
        }
    }
    match decl.split_once(char::is_whitespace) {
        Some((name, ty)) => (name, ty),
        None => (decl, ""),
    }
}

/// Parse the text between a signature's parentheses into parameters
pub fn parse_parameter_list(text: &str) -> Vec<FunctionParameter> {
    split_top_level(text)
        .into_iter()
        .filter_map(parse_parameter)
        .collect()
}

#[cfg(test)]
#[path = "params_test.rs"]
mod tests;
