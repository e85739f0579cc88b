//! Inline metadata comments
//!
//! A SQL file may carry its metadata in a line comment instead of a companion
//! file:
//!
//! ```sql
//! -- metadata: {"table_name": "analytics.orders",
//! --   "materialization": "table"}
//! SELECT * FROM raw_orders
//! ```
//!
//! The JSON object starts after `metadata:` and may continue over the
//! following `--` lines until it parses.

use kiln_core::{CoreError, CoreResult, RawMetadata};
use serde_json::Value;

const MARKER: &str = "metadata:";

/// Body of a `--` line comment, if the line is one
fn comment_body(line: &str) -> Option<&str> {
    line.trim_start().strip_prefix("--").map(str::trim)
}

fn marker_payload(line: &str) -> Option<&str> {
    let body = comment_body(line)?;
    let head = body.get(..MARKER.len())?;
    if head.eq_ignore_ascii_case(MARKER) {
        Some(body[MARKER.len()..].trim())
    } else {
        None
    }
}

/// Extract the metadata object declared in a `-- metadata:` comment.
///
/// Returns `Ok(None)` when the SQL has no such comment. A comment whose JSON
/// never completes, or that holds something other than an object, is a
/// [`CoreError::MetadataParseError`] naming `path`.
pub fn extract_inline_metadata(sql: &str, path: &str) -> CoreResult<Option<RawMetadata>> {
    let lines: Vec<&str> = sql.lines().collect();
    let Some(start) = lines.iter().position(|l| marker_payload(l).is_some()) else {
        return Ok(None);
    };

    let mut text = marker_payload(lines[start]).unwrap_or_default().to_string();
    let mut next = start + 1;
    loop {
        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => return Ok(Some(map)),
            Ok(_) => {
                return Err(CoreError::MetadataParseError {
                    path: path.to_string(),
                    details: "inline metadata must be a JSON object".to_string(),
                })
            }
            Err(e) => {
                let continuation = lines.get(next).and_then(|l| comment_body(l));
                match continuation {
                    Some(more) if e.is_eof() => {
                        text.push('\n');
                        text.push_str(more);
                        next += 1;
                    }
                    _ => {
                        return Err(CoreError::MetadataParseError {
                            path: path.to_string(),
                            details: format!("invalid inline metadata JSON: {}", e),
                        })
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "inline_test.rs"]
mod tests;
