//! Artist key extraction from the free-text `artists` column
//!
//! Track files without an `artist_id` column reference artists by name, often
//! as a serialized list such as `['Artist A', 'Artist B']`. The key used for
//! the join is:
//!
//! 1. Text containing `['` or `["`: parsed as a list literal, first element
//! 2. Otherwise, text containing a comma: first segment, trimmed
//! 3. Otherwise: the text as-is
//!
//! A list that fails to parse passes the original text through unchanged. A
//! list that parses empty falls through to rules 2 and 3.

/// Result of resolving an artist key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtistKey {
    /// Key taken from a list element or a comma-separated segment
    Parsed(String),
    /// Key is the input text unchanged
    Passthrough(String),
}

impl ArtistKey {
    pub fn as_str(&self) -> &str {
        match self {
            ArtistKey::Parsed(key) | ArtistKey::Passthrough(key) => key,
        }
    }

    pub fn into_key(self) -> String {
        match self {
            ArtistKey::Parsed(key) | ArtistKey::Passthrough(key) => key,
        }
    }
}

/// Resolve the join key for one `artists` cell
pub fn extract_artist_key(value: &str) -> ArtistKey {
    if value.contains("['") || value.contains("[\"") {
        match parse_list_literal(value) {
            Some(items) => {
                if let Some(first) = items.into_iter().next() {
                    return ArtistKey::Parsed(first);
                }
            }
            None => return ArtistKey::Passthrough(value.to_string()),
        }
    }

    if value.contains(',') {
        let first = value.split(',').next().unwrap_or_default();
        return ArtistKey::Parsed(first.trim().to_string());
    }

    ArtistKey::Passthrough(value.to_string())
}

/// Parse a list of quoted string literals, e.g. `['a', "b\'s"]`
///
/// Returns `None` for anything that is not exactly such a list.
pub fn parse_list_literal(text: &str) -> Option<Vec<String>> {
    let mut chars = text.trim().chars().peekable();
    if chars.next()? != '[' {
        return None;
    }

    let mut items = Vec::new();
    loop {
        skip_whitespace(&mut chars);
        match chars.peek()? {
            ']' => {
                chars.next();
                break;
            }
            '\'' | '"' => {
                items.push(parse_string_literal(&mut chars)?);
                skip_whitespace(&mut chars);
                match chars.next()? {
                    ',' => continue,
                    ']' => break,
                    _ => return None,
                }
            }
            _ => return None,
        }
    }

    // Nothing may follow the closing bracket
    if chars.next().is_some() {
        return None;
    }
    Some(items)
}

fn skip_whitespace(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) {
    while chars.peek().is_some_and(|c| c.is_whitespace()) {
        chars.next();
    }
}

fn parse_string_literal(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<String> {
    let quote = chars.next()?;
    let mut out = String::new();
    loop {
        match chars.next()? {
            c if c == quote => return Some(out),
            '\\' => match chars.next()? {
                'n' => out.push('\n'),
                't' => out.push('\t'),
                'r' => out.push('\r'),
                '\\' => out.push('\\'),
                '\'' => out.push('\''),
                '"' => out.push('"'),
                other => {
                    out.push('\\');
                    out.push(other);
                }
            },
            c => out.push(c),
        }
    }
}
