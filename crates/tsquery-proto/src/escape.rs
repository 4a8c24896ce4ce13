//! ServerQuery value escaping.
//!
//! Parameter values travel as a single whitespace-free token, so spaces,
//! pipes, slashes and control characters are replaced by backslash
//! sequences.
//!
//! | Char | Escaped |
//! |------|---------|
//! | `\`  | `\\`    |
//! | `/`  | `\/`    |
//! | ` `  | `\s`    |
//! | `\|` | `\p`    |
//! | BEL  | `\a`    |
//! | BS   | `\b`    |
//! | FF   | `\f`    |
//! | LF   | `\n`    |
//! | CR   | `\r`    |
//! | TAB  | `\t`    |
//! | VT   | `\v`    |

use std::borrow::Cow;

/// Escape a value for use in a ServerQuery command or response.
///
/// Returns the input unchanged (borrowed) when nothing needs escaping.
///
/// # Examples
///
/// ```
/// use tsquery_proto::escape;
///
/// assert_eq!(escape("Lobby"), "Lobby");
/// assert_eq!(escape("Team A|B"), "Team\\sA\\pB");
/// ```
pub fn escape(value: &str) -> Cow<'_, str> {
    if !value.chars().any(needs_escape) {
        return Cow::Borrowed(value);
    }

    let mut out = String::with_capacity(value.len() + 8);
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '/' => out.push_str("\\/"),
            ' ' => out.push_str("\\s"),
            '|' => out.push_str("\\p"),
            '\x07' => out.push_str("\\a"),
            '\x08' => out.push_str("\\b"),
            '\x0C' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\x0B' => out.push_str("\\v"),
            other => out.push(other),
        }
    }
    Cow::Owned(out)
}

/// Reverse [`escape`].
///
/// Unknown escape sequences keep the escaped character; a trailing lone
/// backslash is kept as-is.
///
/// # Examples
///
/// ```
/// use tsquery_proto::unescape;
///
/// assert_eq!(unescape("Team\\sA\\pB"), "Team A|B");
/// ```
pub fn unescape(value: &str) -> Cow<'_, str> {
    if !value.contains('\\') {
        return Cow::Borrowed(value);
    }

    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('s') => out.push(' '),
            Some('p') => out.push('|'),
            Some('a') => out.push('\x07'),
            Some('b') => out.push('\x08'),
            Some('f') => out.push('\x0C'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('v') => out.push('\x0B'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    Cow::Owned(out)
}

#[inline]
fn needs_escape(ch: char) -> bool {
    matches!(
        ch,
        '\\' | '/' | ' ' | '|' | '\x07' | '\x08' | '\x0C' | '\n' | '\r' | '\t' | '\x0B'
    )
}
