use std::collections::{BTreeSet, HashSet};

use log::trace;

use crate::Note;

/// Number of plain-text characters shown in a note preview.
pub const SNIPPET_CHARS: usize = 100;

// Helper method for parsing tags
pub fn parse_tags(tags: Option<String>) -> Vec<String> {
    tags.map(|t| {
        t.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

/// Trims and lowercases a single tag.
pub fn normalize_tag(tag: &str) -> String {
    tag.trim().to_lowercase()
}

/// Normalizes every tag, dropping empty entries and later duplicates.
pub fn normalize_tags<S: AsRef<str>>(tags: &[S]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(tags.len());
    tags.iter()
        .map(|t| normalize_tag(t.as_ref()))
        .filter(|t| !t.is_empty() && seen.insert(t.clone()))
        .collect()
}

/// Sorted, de-duplicated list of every tag used across the given notes.
pub fn all_tags(notes: &[Note]) -> Vec<String> {
    notes
        .iter()
        .flat_map(|note| note.tags.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Removes all markup tags from an HTML fragment and returns its text.
///
/// Best effort: a `<` that cannot open a tag is kept as text, quoted
/// attribute values may contain `>`, and an unterminated tag swallows the
/// rest of the input.
pub fn strip_markup(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut chars = html.chars().peekable();
    let mut in_tag = false;
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        if in_tag {
            match (quote, c) {
                (Some(q), c) if c == q => quote = None,
                (Some(_), _) => {}
                (None, '"' | '\'') => quote = Some(c),
                (None, '>') => in_tag = false,
                _ => {}
            }
            continue;
        }

        if c == '<'
            && chars
                .peek()
                .is_some_and(|next| next.is_ascii_alphabetic() || matches!(next, '/' | '!' | '?'))
        {
            in_tag = true;
            continue;
        }

        text.push(c);
    }

    if in_tag {
        trace!("Unterminated tag while stripping markup");
    }

    decode_basic_html_entities(&text)
}

fn decode_basic_html_entities(raw: &str) -> String {
    raw.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Short plain-text preview of a note's content.
pub fn snippet(note: &Note) -> String {
    let plain = strip_markup(&note.content);
    if plain.chars().count() > SNIPPET_CHARS {
        let head: String = plain.chars().take(SNIPPET_CHARS).collect();
        format!("{}...", head)
    } else {
        plain
    }
}
