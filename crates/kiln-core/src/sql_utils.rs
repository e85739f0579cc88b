//! SQL identifier helpers shared by DDL generation and name resolution.

/// Quote a SQL identifier.
///
/// Wraps the identifier in double quotes and doubles any embedded double quotes.
///
/// # Examples
/// ```
/// use kiln_core::sql_utils::quote_ident;
/// assert_eq!(quote_ident("users"), r#""users""#);
/// assert_eq!(quote_ident(r#"my"table"#), r#""my""table""#);
/// ```
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Strip one layer of identifier quoting (`"x"`, `` `x` ``, `[x]`) from each
/// dot-separated part of a name.
///
/// # Examples
/// ```
/// use kiln_core::sql_utils::unquote_qualified;
/// assert_eq!(unquote_qualified(r#""analytics"."orders""#), "analytics.orders");
/// assert_eq!(unquote_qualified("`a`.b"), "a.b");
/// ```
pub fn unquote_qualified(name: &str) -> String {
    name.split('.')
        .map(|part| {
            let part = part.trim();
            let quoted = (part.starts_with('"') && part.ends_with('"'))
                || (part.starts_with('`') && part.ends_with('`'))
                || (part.starts_with('[') && part.ends_with(']'));
            if quoted && part.len() >= 2 {
                &part[1..part.len() - 1]
            } else {
                part
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// Split a potentially schema-qualified name into (schema, object).
///
/// Uses the last `.` as the separator.
///
/// # Examples
/// ```
/// use kiln_core::sql_utils::split_qualified_name;
/// assert_eq!(split_qualified_name("users"), (None, "users"));
/// assert_eq!(split_qualified_name("staging.orders"), (Some("staging"), "orders"));
/// assert_eq!(split_qualified_name("catalog.schema.table"), (Some("catalog.schema"), "table"));
/// ```
pub fn split_qualified_name(name: &str) -> (Option<&str>, &str) {
    if let Some(pos) = name.rfind('.') {
        (Some(&name[..pos]), &name[pos + 1..])
    } else {
        (None, name)
    }
}

/// Collapse every run of whitespace to a single space and trim the ends.
pub fn normalize_whitespace(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}
