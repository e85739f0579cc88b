//! Lexical helpers over raw SQL text

/// Blank out comments and string literals, keeping every byte offset.
///
/// Masked characters become spaces (one per byte) and newlines are kept, so
/// positions found in the masked text index the original text directly.
/// Quoted identifiers are left intact. Dollar-quoted bodies (`$$...$$`,
/// `$tag$...$tag$`) are masked like string literals.
pub fn mask_comments_and_literals(sql: &str) -> String {
    let bytes = sql.as_bytes();
    let mut out = String::with_capacity(sql.len());
    let mut i = 0;

    let mask = |out: &mut String, s: &str| {
        for c in s.chars() {
            if c == '\n' {
                out.push('\n');
            } else {
                out.extend(std::iter::repeat(' ').take(c.len_utf8()));
            }
        }
    };

    while i < bytes.len() {
        let rest = &sql[i..];
        if rest.starts_with("--") {
            let end = rest.find('\n').unwrap_or(rest.len());
            mask(&mut out, &rest[..end]);
            i += end;
        } else if rest.starts_with("/*") {
            let end = block_comment_end(rest);
            mask(&mut out, &rest[..end]);
            i += end;
        } else if rest.starts_with('\'') {
            let end = single_quote_end(rest);
            mask(&mut out, &rest[..end]);
            i += end;
        } else if rest.starts_with('"') {
            let end = rest[1..].find('"').map(|p| p + 2).unwrap_or(rest.len());
            out.push_str(&rest[..end]);
            i += end;
        } else if let Some(tag) = dollar_tag(rest) {
            let body_start = tag.len();
            let end = rest[body_start..]
                .find(tag)
                .map(|p| body_start + p + tag.len())
                .unwrap_or(rest.len());
            mask(&mut out, &rest[..end]);
            i += end;
        } else {
            // Advance one whole character
            let c = rest.chars().next().unwrap_or(' ');
            out.push(c);
            i += c.len_utf8().max(1);
        }
    }

    out
}

/// Length of a (possibly nested) block comment at the start of `s`
fn block_comment_end(s: &str) -> usize {
    let mut depth = 0usize;
    let mut i = 0;
    while i < s.len() {
        let rest = &s[i..];
        if rest.starts_with("/*") {
            depth += 1;
            i += 2;
        } else if rest.starts_with("*/") {
            depth = depth.saturating_sub(1);
            i += 2;
            if depth == 0 {
                return i;
            }
        } else {
            i += rest.chars().next().map(char::len_utf8).unwrap_or(1);
        }
    }
    s.len()
}

/// Length of a single-quoted literal at the start of `s`, honoring `''`
fn single_quote_end(s: &str) -> usize {
    let bytes = s.as_bytes();
    let mut i = 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' if bytes.get(i + 1) == Some(&b'\'') => i += 2,
            b'\'' => return i + 1,
            b'\\' if i + 1 < bytes.len() => i += 2,
            _ => i += 1,
        }
    }
    s.len()
}

/// A dollar-quote opening tag (`$$` or `$name$`) at the start of `s`
pub(crate) fn dollar_tag(s: &str) -> Option<&str> {
    let rest = s.strip_prefix('$')?;
    let close = rest.find('$')?;
    let tag = &rest[..close];
    let valid = tag
        .chars()
        .next()
        .map_or(true, |c| c.is_ascii_alphabetic() || c == '_')
        && tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Some(&s[..close + 2])
    } else {
        None
    }
}
