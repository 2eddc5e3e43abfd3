//! Error types for the quillnotes application.
//!
//! This module defines the error taxonomy shared by the note store, the
//! persistence adapter and the access facade.

use std::io;

use thiserror::Error;

/// The main error type for the quillnotes application.
#[derive(Error, Debug)]
pub enum NoteError {
    /// Errors related to file I/O operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Errors related to serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A draft or note violates a data-model rule and was rejected.
    #[error("Invalid note: {rule}")]
    Validation { rule: ValidationRule },

    /// Note was not found when performing an update.
    #[error("Note not found: {id}")]
    NotFound { id: String },

    /// The persisted blob could not be read back as a note collection.
    #[error("Stored notes under '{key}' are unreadable: {message}")]
    Corruption { key: String, message: String },

    /// The durable slot rejected a write. In-memory state is kept.
    #[error("Could not save notes under '{key}': {message}")]
    Persistence { key: String, message: String },

    /// The store was used before its initial load completed.
    #[error("Notes are still loading")]
    NotReady,

    /// Errors related to configuration.
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Generic application error with a custom message.
    #[error("{message}")]
    ApplicationError { message: String },

    /// for mutex lock acquisition issues
    #[error("{message}")]
    LockAcquisitionFailed { message: String },

    /// The tag-suggestion collaborator failed or timed out.
    #[error("Tag suggestion failed: {message}")]
    Suggestion { message: String },
}

/// The specific data-model rule a rejected note violated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationRule {
    #[error("title is required")]
    EmptyTitle,

    #[error("title must be {max} characters or less (got {len})")]
    TitleTooLong { len: usize, max: usize },

    #[error("content cannot be empty")]
    EmptyContent,

    #[error("background image must be a valid URL: {url}")]
    InvalidBackgroundImage { url: String },
}

impl From<ValidationRule> for NoteError {
    fn from(rule: ValidationRule) -> Self {
        NoteError::Validation { rule }
    }
}
