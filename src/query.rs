//! Filtered and sorted views over a note collection.
//!
//! Everything here is a pure function of its inputs: the collection is only
//! borrowed, and the returned view owns clones of the matching notes.
use std::cmp::Ordering;

use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use log::debug;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use crate::{normalize_tag, strip_markup, Note, NoteFilters, SortKey};

/// Produces the ordered view of `notes` selected by `filters` and `sort`.
///
/// Predicates are AND-combined. The sort is stable, so notes that compare
/// equal keep their relative order from `notes`.
pub fn apply(notes: &[Note], filters: &NoteFilters, sort: SortKey) -> Vec<Note> {
    apply_in(notes, filters, sort, &Local)
}

/// Same as [`apply`], resolving the end of `date_to`'s day in `tz`.
pub fn apply_in<Tz: TimeZone>(
    notes: &[Note],
    filters: &NoteFilters,
    sort: SortKey,
    tz: &Tz,
) -> Vec<Note> {
    let search = filters
        .search_term
        .as_deref()
        .filter(|term| !term.is_empty())
        .map(str::to_lowercase);
    let required_tags: Vec<String> = filters.tags.iter().map(|t| normalize_tag(t)).collect();
    let upper_bound = filters.date_to.map(|to| end_of_day_in(to, tz));

    let mut view: Vec<Note> = notes
        .iter()
        .filter(|note| search.as_deref().map_or(true, |term| matches_search(note, term)))
        .filter(|note| required_tags.iter().all(|tag| note.has_tag(tag)))
        .filter(|note| filters.date_from.map_or(true, |from| note.created_at >= from))
        .filter(|note| upper_bound.map_or(true, |to| note.created_at <= to))
        .cloned()
        .collect();

    sort_notes(&mut view, sort);

    debug!(
        "Query kept {} of {} notes, sorted by {}",
        view.len(),
        notes.len(),
        sort
    );
    view
}

/// `term` must already be lowercased.
fn matches_search(note: &Note, term: &str) -> bool {
    note.title.to_lowercase().contains(term)
        || strip_markup(&note.content).to_lowercase().contains(term)
}

/// Stable in-place sort by `key`.
pub fn sort_notes(notes: &mut [Note], key: SortKey) {
    match key {
        SortKey::CreatedAtAsc => notes.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        SortKey::CreatedAtDesc => notes.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortKey::UpdatedAtDesc => notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at)),
        SortKey::TitleAsc => notes.sort_by(|a, b| compare_titles(&a.title, &b.title)),
        SortKey::TitleDesc => notes.sort_by(|a, b| compare_titles(&b.title, &a.title)),
    }
}

/// Dictionary-style title comparison.
///
/// Three levels, each only consulted on a tie of the previous one: base
/// letters with accents and case ignored, then accents, then case with the
/// lowercase form first. `Éclair` therefore sorts between `apple` and `Zebra`.
pub fn compare_titles(a: &str, b: &str) -> Ordering {
    folded(a, true)
        .cmp(folded(b, true))
        .then_with(|| folded(a, false).cmp(folded(b, false)))
        .then_with(|| b.cmp(a))
}

/// Lowercased canonical decomposition of `title`, optionally without its
/// combining marks.
fn folded(title: &str, strip_marks: bool) -> impl Iterator<Item = char> + '_ {
    title
        .nfd()
        .filter(move |c| !(strip_marks && is_combining_mark(*c)))
        .flat_map(char::to_lowercase)
}

/// Last millisecond of the calendar day containing `instant` in `tz`.
pub fn end_of_day_in<Tz: TimeZone>(instant: DateTime<Utc>, tz: &Tz) -> DateTime<Utc> {
    let day = instant.with_timezone(tz).date_naive();
    let Some(last_moment) = day.and_hms_milli_opt(23, 59, 59, 999) else {
        return instant;
    };

    tz.from_local_datetime(&last_moment)
        .latest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&last_moment))
}

/// Local midnight at the start of `date`, as a UTC instant.
pub fn start_of_day(date: NaiveDate) -> Option<DateTime<Utc>> {
    let midnight = date.and_hms_opt(0, 0, 0)?;
    Local
        .from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}
