//! The single access point consumers use to read and mutate notes.
//!
//! `NoteContext` is a cheap, cloneable handle around one [`NoteStore`]. It
//! starts in a loading state; [`NoteContext::init`] performs the initial load
//! and every other operation fails with [`NoteError::NotReady`] until then.
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use log::{debug, info, warn};
use tokio::{sync::Mutex, time};

use crate::{
    all_tags, apply, strip_markup, LoadReport, Note, NoteDraft, NoteError, NoteFilters,
    NoteStore, PersistenceAdapter, Result, SortKey, TagSuggester, ValidationRule,
};

/// Default upper bound on a tag-suggestion round trip.
pub const DEFAULT_SUGGESTION_TIMEOUT: Duration = Duration::from_secs(30);

enum State {
    Loading(Option<PersistenceAdapter>),
    Ready(NoteStore),
}

/// Shared handle to the note store with a loading/ready lifecycle.
#[derive(Clone)]
pub struct NoteContext {
    state: Arc<Mutex<State>>,
    loading: Arc<AtomicBool>,
    suggestion_timeout: Duration,
}

impl NoteContext {
    pub fn new(adapter: PersistenceAdapter) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::Loading(Some(adapter)))),
            loading: Arc::new(AtomicBool::new(true)),
            suggestion_timeout: DEFAULT_SUGGESTION_TIMEOUT,
        }
    }

    pub fn with_suggestion_timeout(mut self, timeout: Duration) -> Self {
        self.suggestion_timeout = timeout;
        self
    }

    /// True until [`init`](Self::init) has completed.
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    /// Loads persisted notes and marks the context ready.
    ///
    /// Never fails on unreadable storage: the report's `corruption` field is
    /// set instead. Calling it again is a no-op that reports the current size.
    pub async fn init(&self) -> Result<LoadReport> {
        let mut state = self.state.lock().await;

        let adapter = match &mut *state {
            State::Ready(store) => {
                debug!("Note context already initialized");
                return Ok(LoadReport {
                    notes_loaded: store.len(),
                    ..Default::default()
                });
            }
            State::Loading(adapter) => adapter.take().ok_or_else(|| {
                NoteError::LockAcquisitionFailed {
                    message: "Note context lost its storage during initialization".to_string(),
                }
            })?,
        };

        let (store, report) = NoteStore::open(adapter);
        if let Some(message) = &report.corruption {
            warn!("Stored notes were unreadable, starting empty: {}", message);
        }

        *state = State::Ready(store);
        self.loading.store(false, Ordering::Release);
        info!("Note context ready with {} notes", report.notes_loaded);

        Ok(report)
    }

    pub async fn create(&self, draft: NoteDraft) -> Result<Note> {
        self.with_store(|store| store.create(draft)).await
    }

    pub async fn update(&self, note: Note) -> Result<Note> {
        self.with_store(|store| store.update(note)).await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.with_store(|store| store.delete(id)).await
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<Note>> {
        self.with_store(|store| Ok(store.get_by_id(id).cloned())).await
    }

    /// Snapshot of the full collection, most recently created first.
    pub async fn list(&self) -> Result<Vec<Note>> {
        self.with_store(|store| Ok(store.list().to_vec())).await
    }

    /// Filtered, sorted view of the current collection.
    pub async fn apply(&self, filters: &NoteFilters, sort: SortKey) -> Result<Vec<Note>> {
        self.with_store(|store| Ok(apply(store.list(), filters, sort)))
            .await
    }

    /// Every tag in use, sorted.
    pub async fn all_tags(&self) -> Result<Vec<String>> {
        self.with_store(|store| Ok(all_tags(store.list()))).await
    }

    pub async fn add_tags<S: AsRef<str>>(&self, id: &str, tags: &[S]) -> Result<Vec<String>> {
        self.with_store(|store| store.merge_tags(id, tags)).await
    }

    pub async fn remove_tags<S: AsRef<str>>(
        &self,
        id: &str,
        tags: &[S],
    ) -> Result<Vec<String>> {
        self.with_store(|store| store.remove_tags(id, tags)).await
    }

    /// Rewrites the whole collection to storage.
    pub async fn retry_save(&self) -> Result<()> {
        self.with_store(|store| store.persist()).await
    }

    /// Asks `suggester` for tags based on the note's plain text and merges
    /// the new ones into the note. Returns the tags that were added.
    ///
    /// The store is not locked while the suggester runs. A suggester that
    /// errors or exceeds the configured timeout leaves the note unchanged.
    pub async fn suggest_tags<T: TagSuggester>(&self, id: &str, suggester: &T) -> Result<Vec<String>> {
        let note = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| NoteError::NotFound { id: id.to_string() })?;

        let plain_text = strip_markup(&note.content);
        if plain_text.trim().is_empty() {
            return Err(ValidationRule::EmptyContent.into());
        }

        let suggested = match time::timeout(self.suggestion_timeout, suggester.suggest(&plain_text)).await {
            Ok(Ok(tags)) => tags,
            Ok(Err(e)) => {
                warn!("Tag suggestion for {} failed: {}", id, e);
                return Err(NoteError::Suggestion {
                    message: e.to_string(),
                });
            }
            Err(_) => {
                warn!("Tag suggestion for {} timed out", id);
                return Err(NoteError::Suggestion {
                    message: format!("no response within {:?}", self.suggestion_timeout),
                });
            }
        };

        let added = self.add_tags(id, suggested.as_slice()).await?;
        info!("Suggested {} new tag(s) for note {}", added.len(), id);
        Ok(added)
    }

    async fn with_store<T>(&self, f: impl FnOnce(&mut NoteStore) -> Result<T>) -> Result<T> {
        let mut state = self.state.lock().await;
        match &mut *state {
            State::Ready(store) => f(store),
            State::Loading(_) => Err(NoteError::NotReady),
        }
    }
}
