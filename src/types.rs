//! Shared types for the quillnotes application.
//!
//! This module contains the query inputs (filters and sort keys), the load
//! report returned by the store lifecycle, and the CLI subcommands.
use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use clap::Subcommand;
use serde::{Deserialize, Serialize};

use crate::NoteError;

/// A specialized Result type for quillnotes operations.
pub type Result<T> = std::result::Result<T, NoteError>;

/// Criteria used to narrow a view. Unset fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteFilters {
    /// Case-insensitive substring matched against title or plain-text content
    pub search_term: Option<String>,
    /// Every listed tag must be present on the note
    #[serde(default)]
    pub tags: Vec<String>,
    /// Inclusive lower bound on creation time
    pub date_from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on creation time, extended to the end of its local day
    pub date_to: Option<DateTime<Utc>>,
}

impl NoteFilters {
    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search_term = Some(term.into());
        self
    }

    pub fn tagged<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn created_from(mut self, from: DateTime<Utc>) -> Self {
        self.date_from = Some(from);
        self
    }

    pub fn created_to(mut self, to: DateTime<Utc>) -> Self {
        self.date_to = Some(to);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.search_term.as_deref().map_or(true, str::is_empty)
            && self.tags.is_empty()
            && self.date_from.is_none()
            && self.date_to.is_none()
    }
}

/// Ordering criterion for a view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortKey {
    #[serde(rename = "createdAt_asc")]
    CreatedAtAsc,
    #[serde(rename = "createdAt_desc")]
    CreatedAtDesc,
    #[default]
    #[serde(rename = "updatedAt_desc")]
    UpdatedAtDesc,
    #[serde(rename = "title_asc")]
    TitleAsc,
    #[serde(rename = "title_desc")]
    TitleDesc,
}

impl SortKey {
    pub const ALL: [SortKey; 5] = [
        SortKey::CreatedAtAsc,
        SortKey::CreatedAtDesc,
        SortKey::UpdatedAtDesc,
        SortKey::TitleAsc,
        SortKey::TitleDesc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::CreatedAtAsc => "createdAt_asc",
            SortKey::CreatedAtDesc => "createdAt_desc",
            SortKey::UpdatedAtDesc => "updatedAt_desc",
            SortKey::TitleAsc => "title_asc",
            SortKey::TitleDesc => "title_desc",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        SortKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| {
                let valid: Vec<&str> = SortKey::ALL.iter().map(SortKey::as_str).collect();
                format!("unknown sort key '{}', expected one of: {}", s, valid.join(", "))
            })
    }
}

/// Outcome of the initial load of persisted notes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Number of notes available after loading
    pub notes_loaded: usize,
    /// Records dropped because their id was already present
    pub duplicates_dropped: usize,
    /// Set when the stored blob was unreadable and an empty collection was used
    pub corruption: Option<String>,
}

/// Available subcommands for the quillnotes application
#[derive(Subcommand)]
pub enum Commands {
    /// Create a new note
    Create {
        /// Title of the note
        #[clap(short = 'T', long)]
        title: String,

        /// Content of the note, as HTML
        #[clap(short, long)]
        content: String,

        /// Tags to associate with the note (comma-separated)
        #[clap(short = 't', long)]
        tags: Option<String>,

        /// CSS font-family value for the note
        #[clap(short, long)]
        font: Option<String>,

        /// URL of a background image
        #[clap(short, long)]
        background: Option<String>,
    },

    /// View a note by ID
    View {
        /// ID of the note to view
        id: String,

        /// Format output as raw JSON
        #[clap(short, long)]
        json: bool,
    },

    /// List notes with optional filtering and sorting
    List {
        /// Only notes whose title or text contains this term
        #[clap(short, long)]
        search: Option<String>,

        /// Only notes carrying all of these tags (comma-separated)
        #[clap(short, long)]
        tags: Option<String>,

        /// Only notes created on or after this day (YYYY-MM-DD)
        #[clap(long)]
        from: Option<NaiveDate>,

        /// Only notes created on or before this day (YYYY-MM-DD)
        #[clap(long)]
        to: Option<NaiveDate>,

        /// Sort order: createdAt_asc, createdAt_desc, updatedAt_desc, title_asc, title_desc
        #[clap(long, default_value_t = SortKey::UpdatedAtDesc)]
        sort: SortKey,

        /// Limit the number of notes returned (0 for no limit)
        #[clap(short = 'n', long, default_value_t = 0)]
        limit: usize,

        /// Format output as JSON
        #[clap(short, long)]
        json: bool,

        /// Only show note IDs and titles
        #[clap(short, long)]
        brief: bool,
    },

    /// Edit an existing note
    Edit {
        /// ID of the note to edit
        id: String,

        /// New title for the note
        #[clap(short = 'T', long)]
        title: Option<String>,

        /// New content for the note
        #[clap(short, long)]
        content: Option<String>,

        /// Replace the note's tags (comma-separated)
        #[clap(short = 't', long)]
        tags: Option<String>,

        /// New CSS font-family value
        #[clap(short, long)]
        font: Option<String>,

        /// New background image URL (empty to clear)
        #[clap(short, long)]
        background: Option<String>,
    },

    /// Delete a note by ID
    Delete {
        /// ID of the note to delete
        id: String,
    },

    /// Tag operations (add, remove, list)
    Tag {
        /// ID of the note to modify
        id: String,

        /// Tags to add (comma-separated)
        #[clap(short, long)]
        add: Option<String>,

        /// Tags to remove (comma-separated)
        #[clap(short, long)]
        remove: Option<String>,

        /// List all tags for the note
        #[clap(short, long)]
        list: bool,
    },

    /// List every tag in use
    Tags,

    /// List the available note fonts
    Fonts,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_key_parses_its_own_display_form() {
        for key in SortKey::ALL {
            assert_eq!(key.to_string().parse::<SortKey>(), Ok(key));
        }
    }

    #[test]
    fn sort_key_rejects_unknown_names() {
        let err = "updatedAt_asc".parse::<SortKey>().unwrap_err();
        assert!(err.contains("updatedAt_desc"));
    }

    #[test]
    fn sort_key_serde_matches_display() {
        let json = serde_json::to_string(&SortKey::TitleDesc).unwrap();
        assert_eq!(json, "\"title_desc\"");
    }

    #[test]
    fn empty_filters() {
        assert!(NoteFilters::default().is_empty());
        assert!(NoteFilters::default().search("").is_empty());
        assert!(!NoteFilters::default().tagged(["work"]).is_empty());
    }
}
