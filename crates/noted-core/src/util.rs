//! Small text helpers shared by the services.

use crate::error::{NotedError, Result};

/// Turn a display name into a URL slug.
///
/// Trims, lowercases, collapses whitespace runs into `_` and drops every
/// character outside `[a-z0-9_]`.  A name that leaves nothing behind is
/// rejected.
pub fn make_slug(name: &str) -> Result<String> {
    let mut slug = String::with_capacity(name.len());
    let mut in_space = false;
    for ch in name.trim().to_lowercase().chars() {
        if ch.is_whitespace() {
            if !in_space {
                slug.push('_');
            }
            in_space = true;
            continue;
        }
        in_space = false;
        if ch.is_ascii_alphanumeric() || ch == '_' {
            slug.push(ch);
        }
    }

    if slug.is_empty() {
        return Err(NotedError::Validation(format!(
            "name '{name}' does not produce a usable slug"
        )));
    }
    Ok(slug)
}

/// First `max_chars` characters of `text`, never splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn slug_collapses_whitespace_and_strips_symbols() {
        assert_eq!(make_slug("  My  Big\tProject! ").unwrap(), "my_big_project");
        assert_eq!(make_slug("Q3 road-map (draft)").unwrap(), "q3_roadmap_draft");
        assert_eq!(make_slug("already_snake").unwrap(), "already_snake");
    }

    #[test]
    fn slug_rejects_names_without_usable_characters() {
        assert!(matches!(make_slug("   "), Err(NotedError::Validation(_))));
        assert!(matches!(make_slug("!!!"), Err(NotedError::Validation(_))));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo wörld", 7), "héllo w");
        assert_eq!(truncate_chars("short", 50), "short");
    }
}
