//! Core data structures for the quillnotes application.
//!
//! This module contains the persisted `Note` record, the `NoteDraft` used to
//! create one, and the field rules every stored note must satisfy.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{normalize_tags, ValidationRule};

/// Maximum title length, counted in characters.
pub const MAX_TITLE_CHARS: usize = 100;

/// A selectable note font: a display name and the CSS font-family value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontOption {
    pub name: &'static str,
    pub value: &'static str,
}

/// Fonts offered by the editor. The first entry is the default.
pub const FONT_OPTIONS: &[FontOption] = &[
    FontOption { name: "Default Sans", value: "var(--font-geist-sans)" },
    FontOption { name: "Default Mono", value: "var(--font-geist-mono)" },
    FontOption { name: "Arial", value: "Arial, sans-serif" },
    FontOption { name: "Verdana", value: "Verdana, sans-serif" },
    FontOption { name: "Georgia", value: "Georgia, serif" },
    FontOption { name: "Times New Roman", value: "\"Times New Roman\", Times, serif" },
    FontOption { name: "Courier New", value: "\"Courier New\", Courier, monospace" },
];

/// The font used when a note does not carry one.
pub fn default_font() -> &'static str {
    FONT_OPTIONS[0].value
}

/// Represents a single note in our system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Unique identifier for the note
    pub id: String,
    /// Note title
    pub title: String,
    /// Note content as HTML produced by the rich-text editor
    pub content: String,
    /// Lowercase tags, in the order they were added
    #[serde(default)]
    pub tags: Vec<String>,
    /// When the note was created
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
    /// CSS font-family value, if the user picked one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,
    /// Background image URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_image: Option<String>,
}

/// Note data supplied for creation. Identity and timestamps are assigned by
/// the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub font: Option<String>,
    #[serde(default)]
    pub background_image: Option<String>,
}

impl NoteDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        NoteDraft {
            title: title.into(),
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_font(mut self, font: impl Into<String>) -> Self {
        self.font = Some(font.into());
        self
    }

    pub fn with_background_image(mut self, url: impl Into<String>) -> Self {
        self.background_image = Some(url.into());
        self
    }

    /// Normalizes tags and blank optional fields, then checks the field rules.
    pub(crate) fn prepare(mut self) -> Result<Self, ValidationRule> {
        self.tags = normalize_tags(&self.tags);
        self.font = non_blank(self.font);
        self.background_image = non_blank(self.background_image);
        validate_fields(&self.title, &self.content, self.background_image.as_deref())?;
        Ok(self)
    }
}

impl Note {
    /// Builds a note from a prepared draft.
    pub(crate) fn from_draft(draft: NoteDraft, id: String, now: DateTime<Utc>) -> Self {
        Note {
            id,
            title: draft.title,
            content: draft.content,
            tags: draft.tags,
            created_at: now,
            updated_at: now,
            font: draft.font,
            background_image: draft.background_image,
        }
    }

    /// Checks the title, content and background image rules.
    pub fn validate(&self) -> Result<(), ValidationRule> {
        validate_fields(&self.title, &self.content, self.background_image.as_deref())
    }

    /// The note's font, or the catalog default when none is set.
    pub fn font_or_default(&self) -> &str {
        self.font.as_deref().unwrap_or(default_font())
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn validate_fields(
    title: &str,
    content: &str,
    background_image: Option<&str>,
) -> Result<(), ValidationRule> {
    if title.trim().is_empty() {
        return Err(ValidationRule::EmptyTitle);
    }

    let len = title.chars().count();
    if len > MAX_TITLE_CHARS {
        return Err(ValidationRule::TitleTooLong {
            len,
            max: MAX_TITLE_CHARS,
        });
    }

    if content.trim().is_empty() {
        return Err(ValidationRule::EmptyContent);
    }

    if let Some(url) = background_image {
        if Url::parse(url).is_err() {
            return Err(ValidationRule::InvalidBackgroundImage {
                url: url.to_string(),
            });
        }
    }

    Ok(())
}
