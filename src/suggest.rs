//! Seam for the external tag-suggestion service.
use std::future::Future;

use crate::{normalize_tags, Result};

/// A service that proposes tags for a piece of plain text.
///
/// Implementations own their transport; the store only sees the returned
/// tag strings.
pub trait TagSuggester {
    fn suggest(&self, plain_text: &str) -> impl Future<Output = Result<Vec<String>>> + Send;
}

/// Tags from `suggested` that are not already in `existing`, normalized and
/// de-duplicated, in suggestion order.
pub fn merge_suggested_tags<S: AsRef<str>>(existing: &[String], suggested: &[S]) -> Vec<String> {
    normalize_tags(suggested)
        .into_iter()
        .filter(|tag| !existing.contains(tag))
        .collect()
}
