//! The authoritative in-memory note collection.
//!
//! `NoteStore` owns the canonical `Vec<Note>`, assigns ids and timestamps,
//! and rewrites the whole collection through its [`PersistenceAdapter`]
//! after every mutation. The in-memory change is always applied first; a
//! failed write is reported but never rolled back.
use std::collections::HashSet;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use log::{debug, error, info, trace, warn};
use uuid::Uuid;

use crate::{
    merge_suggested_tags, normalize_tags, LoadReport, Note, NoteDraft, NoteError,
    PersistenceAdapter, Result,
};

/// Manages the note collection and keeps it in sync with durable storage.
pub struct NoteStore {
    /// Notes, most recently created first
    notes: Vec<Note>,

    /// Durable whole-collection storage
    adapter: PersistenceAdapter,

    /// Last timestamp handed out, used to keep stamps strictly increasing
    last_stamp: Option<DateTime<Utc>>,
}

impl NoteStore {
    /// Creates an empty store without reading from storage.
    pub fn new(adapter: PersistenceAdapter) -> Self {
        Self {
            notes: Vec::new(),
            adapter,
            last_stamp: None,
        }
    }

    /// Opens a store, loading the persisted collection.
    ///
    /// An unreadable blob is not fatal: the store starts empty and the
    /// returned report carries the corruption message so it can be surfaced
    /// once. Records repeating an earlier id are dropped.
    pub fn open(adapter: PersistenceAdapter) -> (Self, LoadReport) {
        let mut report = LoadReport::default();

        let loaded = match adapter.load() {
            Ok(notes) => notes,
            Err(e) => {
                warn!("Starting with an empty collection: {}", e);
                report.corruption = Some(e.to_string());
                Vec::new()
            }
        };

        let mut seen = HashSet::with_capacity(loaded.len());
        let mut notes = Vec::with_capacity(loaded.len());
        for note in loaded {
            if seen.insert(note.id.clone()) {
                if let Err(rule) = note.validate() {
                    warn!("Keeping stored note {} that breaks a field rule: {}", note.id, rule);
                }
                notes.push(note);
            } else {
                warn!("Dropping stored note with duplicate id: {}", note.id);
                report.duplicates_dropped += 1;
            }
        }

        report.notes_loaded = notes.len();
        info!(
            "Note store opened from '{}' with {} notes",
            adapter.key(),
            notes.len()
        );

        let store = Self {
            notes,
            adapter,
            last_stamp: None,
        };
        (store, report)
    }

    /// Creates a note from `draft`, inserts it at the head of the collection
    /// and persists.
    ///
    /// On a [`NoteError::Persistence`] failure the note stays in memory.
    pub fn create(&mut self, draft: NoteDraft) -> Result<Note> {
        let draft = draft.prepare().map_err(|rule| {
            debug!("Rejected draft: {}", rule);
            NoteError::from(rule)
        })?;

        let now = self.next_timestamp();
        let note = Note::from_draft(draft, self.fresh_id(), now);
        info!("Creating note: {}", note.id);

        self.notes.insert(0, note.clone());
        self.persist()?;

        Ok(note)
    }

    /// Replaces the mutable fields of the stored note with the same id.
    ///
    /// `created_at` and `updated_at` from `note` are ignored: the stored
    /// creation time is kept and the update time is refreshed.
    pub fn update(&mut self, note: Note) -> Result<Note> {
        let index = self.position(&note.id).ok_or_else(|| {
            error!("Cannot update note {}: Note not found", note.id);
            NoteError::NotFound {
                id: note.id.clone(),
            }
        })?;

        let draft = NoteDraft {
            title: note.title,
            content: note.content,
            tags: note.tags,
            font: note.font,
            background_image: note.background_image,
        }
        .prepare()
        .map_err(|rule| {
            debug!("Rejected update of {}: {}", note.id, rule);
            NoteError::from(rule)
        })?;

        let stamp = self.next_timestamp_after(self.notes[index].updated_at);

        let stored = &mut self.notes[index];
        stored.title = draft.title;
        stored.content = draft.content;
        stored.tags = draft.tags;
        stored.font = draft.font;
        stored.background_image = draft.background_image;
        stored.updated_at = stamp;
        let updated = stored.clone();

        info!("Updating note: {}", updated.id);
        self.persist()?;

        Ok(updated)
    }

    /// Removes the note with `id`. Deleting an unknown id is a no-op.
    pub fn delete(&mut self, id: &str) -> Result<()> {
        let Some(index) = self.position(id) else {
            debug!("Delete of unknown note {} ignored", id);
            return Ok(());
        };

        self.notes.remove(index);
        info!("Deleted note: {}", id);
        self.persist()
    }

    pub fn get_by_id(&self, id: &str) -> Option<&Note> {
        self.notes.iter().find(|note| note.id == id)
    }

    /// The full collection, most recently created first.
    pub fn list(&self) -> &[Note] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Adds tags to a note through the normal update path.
    ///
    /// Tags are normalized and compared against the note's existing tags;
    /// returns only the tags that were actually added. Nothing is written
    /// when every tag is already present.
    pub fn merge_tags<S: AsRef<str>>(&mut self, id: &str, tags: &[S]) -> Result<Vec<String>> {
        let mut note = self
            .get_by_id(id)
            .cloned()
            .ok_or_else(|| NoteError::NotFound { id: id.to_string() })?;

        let added = merge_suggested_tags(&note.tags, tags);

        if added.is_empty() {
            debug!("No new tags for note {}", id);
            return Ok(added);
        }

        note.tags.extend(added.iter().cloned());
        self.update(note)?;
        Ok(added)
    }

    /// Removes tags from a note through the normal update path.
    ///
    /// Returns the tags that were actually removed. Nothing is written when
    /// the note carries none of them.
    pub fn remove_tags<S: AsRef<str>>(&mut self, id: &str, tags: &[S]) -> Result<Vec<String>> {
        let mut note = self
            .get_by_id(id)
            .cloned()
            .ok_or_else(|| NoteError::NotFound { id: id.to_string() })?;

        let removed: Vec<String> = normalize_tags(tags)
            .into_iter()
            .filter(|tag| note.has_tag(tag))
            .collect();

        if removed.is_empty() {
            debug!("None of the tags are on note {}", id);
            return Ok(removed);
        }

        note.tags.retain(|tag| !removed.contains(tag));
        self.update(note)?;
        Ok(removed)
    }

    /// Writes the current collection, e.g. to retry after a failed save.
    pub fn persist(&self) -> Result<()> {
        trace!("Persisting {} notes", self.notes.len());
        self.adapter.save(&self.notes)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.notes.iter().position(|note| note.id == id)
    }

    fn fresh_id(&self) -> String {
        loop {
            let id = Uuid::new_v4().to_string();
            if self.position(&id).is_none() {
                return id;
            }
        }
    }

    /// Current time at millisecond precision, strictly after every stamp
    /// this store has handed out before.
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now().trunc_subsecs(3);
        let stamp = match self.last_stamp {
            Some(last) if now <= last => last + Duration::milliseconds(1),
            _ => now,
        };
        self.last_stamp = Some(stamp);
        stamp
    }

    fn next_timestamp_after(&mut self, floor: DateTime<Utc>) -> DateTime<Utc> {
        let stamp = self.next_timestamp();
        if stamp > floor {
            return stamp;
        }
        let bumped = floor + Duration::milliseconds(1);
        self.last_stamp = Some(bumped);
        bumped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemorySlot, ValidationRule};

    const KEY: &str = "notes";

    fn store() -> (MemorySlot, NoteStore) {
        let slot = MemorySlot::new();
        let store = NoteStore::new(PersistenceAdapter::new(slot.clone(), KEY));
        (slot, store)
    }

    fn reload(slot: &MemorySlot) -> Vec<Note> {
        PersistenceAdapter::new(slot.clone(), KEY).load().unwrap()
    }

    #[test]
    fn create_assigns_unique_id_and_equal_timestamps() {
        let (_slot, mut store) = store();
        let mut ids = HashSet::new();

        for i in 0..20 {
            let note = store
                .create(NoteDraft::new(format!("Note {}", i), "<p>body</p>"))
                .unwrap();
            assert_eq!(note.created_at, note.updated_at);
            assert!(ids.insert(note.id));
        }
        assert_eq!(store.len(), 20);
    }

    #[test]
    fn create_inserts_at_head_and_persists() {
        let (slot, mut store) = store();
        let first = store.create(NoteDraft::new("First", "a")).unwrap();
        let second = store.create(NoteDraft::new("Second", "b")).unwrap();

        assert_eq!(store.list()[0].id, second.id);
        assert_eq!(store.list()[1].id, first.id);
        assert_eq!(reload(&slot), store.list());
    }

    #[test]
    fn create_rejects_empty_title_without_changing_the_store() {
        let (slot, mut store) = store();
        store.create(NoteDraft::new("Keep", "x")).unwrap();

        let err = store.create(NoteDraft::new("", "x")).unwrap_err();
        assert!(matches!(
            err,
            NoteError::Validation {
                rule: ValidationRule::EmptyTitle
            }
        ));
        assert_eq!(store.len(), 1);
        assert_eq!(reload(&slot).len(), 1);
    }

    #[test]
    fn update_keeps_identity_and_advances_updated_at() {
        let (slot, mut store) = store();
        let original = store.create(NoteDraft::new("Draft", "v1")).unwrap();

        let mut edit = original.clone();
        edit.content = "v2".to_string();
        edit.created_at = edit.created_at - Duration::days(3);
        let updated = store.update(edit).unwrap();

        assert_eq!(updated.id, original.id);
        assert_eq!(updated.created_at, original.created_at);
        assert!(updated.updated_at > original.updated_at);
        assert_eq!(updated.content, "v2");
        assert_eq!(reload(&slot)[0], updated);
    }

    #[test]
    fn repeated_updates_strictly_increase_updated_at() {
        let (_slot, mut store) = store();
        let mut note = store.create(NoteDraft::new("Counter", "0")).unwrap();

        for i in 1..10 {
            let previous = note.updated_at;
            note.content = i.to_string();
            note = store.update(note).unwrap();
            assert!(note.updated_at > previous);
        }
    }

    #[test]
    fn update_keeps_collection_position() {
        let (_slot, mut store) = store();
        let older = store.create(NoteDraft::new("Older", "a")).unwrap();
        store.create(NoteDraft::new("Newer", "b")).unwrap();

        store.update(older.clone()).unwrap();
        assert_eq!(store.list()[1].id, older.id);
    }

    #[test]
    fn update_of_unknown_id_is_not_found() {
        let (_slot, mut store) = store();
        let mut ghost = store.create(NoteDraft::new("Ghost", "x")).unwrap();
        ghost.id = "missing".to_string();

        let err = store.update(ghost).unwrap_err();
        assert!(matches!(err, NoteError::NotFound { id } if id == "missing"));
    }

    #[test]
    fn update_rejects_invalid_fields() {
        let (_slot, mut store) = store();
        let mut note = store.create(NoteDraft::new("Title", "x")).unwrap();
        note.content = "   ".to_string();

        let err = store.update(note.clone()).unwrap_err();
        assert!(matches!(err, NoteError::Validation { .. }));
        assert_eq!(store.get_by_id(&note.id).unwrap().content, "x");
    }

    #[test]
    fn delete_is_idempotent() {
        let (slot, mut store) = store();
        let note = store.create(NoteDraft::new("Gone", "x")).unwrap();

        store.delete(&note.id).unwrap();
        assert!(store.get_by_id(&note.id).is_none());
        assert!(reload(&slot).is_empty());

        store.delete(&note.id).unwrap();
        store.delete("never-existed").unwrap();
        assert!(store.get_by_id("never-existed").is_none());
    }

    #[test]
    fn failed_write_keeps_in_memory_state() {
        let (slot, mut store) = store();
        store.create(NoteDraft::new("Saved", "x")).unwrap();

        slot.set_quota(Some(0));
        let err = store.create(NoteDraft::new("Unsaved", "y")).unwrap_err();

        assert!(matches!(err, NoteError::Persistence { .. }));
        assert_eq!(store.len(), 2);
        assert_eq!(store.list()[0].title, "Unsaved");
        assert_eq!(reload(&slot).len(), 1);
    }

    #[test]
    fn persist_retries_after_failure() {
        let (slot, mut store) = store();
        slot.set_quota(Some(0));
        assert!(store.create(NoteDraft::new("Later", "x")).is_err());
        assert!(reload(&slot).is_empty());

        slot.set_quota(None);
        store.persist().unwrap();
        assert_eq!(reload(&slot), store.list());
    }

    #[test]
    fn merge_tags_adds_only_new_normalized_tags() {
        let (slot, mut store) = store();
        let note = store
            .create(NoteDraft::new("Trip", "x").with_tags(["travel"]))
            .unwrap();

        let added = store
            .merge_tags(&note.id, &["Travel", " Japan ", "food", "japan"])
            .unwrap();

        assert_eq!(added, vec!["japan", "food"]);
        let stored = store.get_by_id(&note.id).unwrap();
        assert_eq!(stored.tags, vec!["travel", "japan", "food"]);
        assert!(stored.updated_at > note.updated_at);
        assert_eq!(reload(&slot)[0].tags, stored.tags);
    }

    #[test]
    fn merge_tags_without_new_tags_does_not_touch_the_note() {
        let (_slot, mut store) = store();
        let note = store
            .create(NoteDraft::new("Trip", "x").with_tags(["travel"]))
            .unwrap();

        assert!(store.merge_tags(&note.id, &["TRAVEL"]).unwrap().is_empty());
        assert_eq!(store.get_by_id(&note.id).unwrap().updated_at, note.updated_at);
    }

    #[test]
    fn remove_tags_refreshes_updated_at() {
        let (_slot, mut store) = store();
        let note = store
            .create(NoteDraft::new("Trip", "x").with_tags(["travel", "food"]))
            .unwrap();

        let removed = store.remove_tags(&note.id, &["Food", "work"]).unwrap();
        assert_eq!(removed, vec!["food"]);

        let updated = store.get_by_id(&note.id).unwrap();
        assert_eq!(updated.tags, vec!["travel"]);
        assert!(updated.updated_at > note.updated_at);
    }

    #[test]
    fn remove_tags_not_on_note_writes_nothing() {
        let (slot, mut store) = store();
        let note = store
            .create(NoteDraft::new("Trip", "x").with_tags(["travel"]))
            .unwrap();
        // Any write from here on would fail.
        slot.set_quota(Some(0));

        assert!(store.remove_tags(&note.id, &["work", "FOOD"]).unwrap().is_empty());
        assert_eq!(store.get_by_id(&note.id).unwrap().updated_at, note.updated_at);
    }

    #[test]
    fn open_falls_back_to_empty_on_corruption() {
        let slot = MemorySlot::new();
        slot.insert_raw(KEY, "[{broken").unwrap();

        let (store, report) = NoteStore::open(PersistenceAdapter::new(slot, KEY));
        assert!(store.is_empty());
        assert!(report.corruption.is_some());
        assert_eq!(report.notes_loaded, 0);
    }

    #[test]
    fn open_drops_duplicate_ids() {
        let slot = MemorySlot::new();
        let mut writer = NoteStore::new(PersistenceAdapter::new(slot.clone(), KEY));
        let note = writer.create(NoteDraft::new("Dup", "x")).unwrap();
        let blob = serde_json::to_string(&vec![note.clone(), note]).unwrap();
        slot.insert_raw(KEY, &blob).unwrap();

        let (store, report) = NoteStore::open(PersistenceAdapter::new(slot, KEY));
        assert_eq!(store.len(), 1);
        assert_eq!(report.duplicates_dropped, 1);
        assert_eq!(report.notes_loaded, 1);
    }

    #[test]
    fn open_keeps_stored_notes_that_break_field_rules() {
        let slot = MemorySlot::new();
        let mut writer = NoteStore::new(PersistenceAdapter::new(slot.clone(), KEY));
        let mut note = writer.create(NoteDraft::new("Old", "x")).unwrap();
        note.title = "t".repeat(150);
        slot.insert_raw(KEY, &serde_json::to_string(&vec![note.clone()]).unwrap())
            .unwrap();

        let (store, report) = NoteStore::open(PersistenceAdapter::new(slot, KEY));
        assert_eq!(report.notes_loaded, 1);
        assert_eq!(store.get_by_id(&note.id).unwrap().title, note.title);
    }

    #[test]
    fn update_after_reload_stays_after_stored_timestamp() {
        let slot = MemorySlot::new();
        let mut first = NoteStore::new(PersistenceAdapter::new(slot.clone(), KEY));
        let note = first.create(NoteDraft::new("Future", "x")).unwrap();

        let mut future = note.clone();
        future.updated_at = note.updated_at + Duration::days(1);
        slot.insert_raw(KEY, &serde_json::to_string(&vec![future.clone()]).unwrap())
            .unwrap();

        let (mut reopened, _) = NoteStore::open(PersistenceAdapter::new(slot, KEY));
        let updated = reopened.update(future.clone()).unwrap();
        assert!(updated.updated_at > future.updated_at);
    }
}
