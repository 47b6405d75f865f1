//! Session-local cache of the signed-in user's verse annotations.
//!
//! The server owns the data; the cache only mirrors it for rendering.
//! Every mutation goes to the server first and the local maps are
//! updated on success only, so a failed call leaves the cache exactly
//! where it was.

use std::collections::{HashMap, HashSet};

use lectio_core::{HighlightColor, VerseId};

use crate::api::{AnnotationApi, ApiError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteEntry {
    pub id: i64,
    pub content: String,
}

#[derive(Debug, Default)]
pub struct AnnotationCache {
    highlights: HashMap<VerseId, HighlightColor>,
    notes: HashMap<VerseId, NoteEntry>,
    bookmarks: HashSet<VerseId>,
    loaded: bool,
}

impl AnnotationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn highlight(&self, verse: VerseId) -> Option<HighlightColor> {
        self.highlights.get(&verse).copied()
    }

    pub fn note(&self, verse: VerseId) -> Option<&NoteEntry> {
        self.notes.get(&verse)
    }

    pub fn is_bookmarked(&self, verse: VerseId) -> bool {
        self.bookmarks.contains(&verse)
    }

    /// Fills the cache with the user's full annotation state. Called
    /// once per session after sign-in; subsequent calls are no-ops.
    pub fn load_session(&mut self, api: &dyn AnnotationApi) -> Result<(), ApiError> {
        if self.loaded {
            return Ok(());
        }
        let highlights = api.list_highlights()?;
        let notes = api.list_notes()?;
        let bookmarks = api.list_bookmarks()?;

        self.highlights = highlights
            .into_iter()
            .map(|h| (h.verse_id, h.color))
            .collect();
        self.notes = notes
            .into_iter()
            .map(|n| (n.verse_id, NoteEntry { id: n.id, content: n.content }))
            .collect();
        self.bookmarks = bookmarks.into_iter().collect();
        self.loaded = true;
        Ok(())
    }

    /// Sets or replaces the highlight on a verse. Re-selecting the same
    /// color is still a server round trip; the server upserts.
    pub fn add_highlight(
        &mut self,
        api: &dyn AnnotationApi,
        verse: VerseId,
        color: HighlightColor,
    ) -> Result<(), ApiError> {
        api.add_highlight(verse, color)?;
        self.highlights.insert(verse, color);
        Ok(())
    }

    pub fn remove_highlight(
        &mut self,
        api: &dyn AnnotationApi,
        verse: VerseId,
    ) -> Result<(), ApiError> {
        api.remove_highlight(verse)?;
        self.highlights.remove(&verse);
        Ok(())
    }

    /// Saves a note: update when the verse already has one, create
    /// otherwise. The server assigns ids on create.
    pub fn save_note(
        &mut self,
        api: &dyn AnnotationApi,
        verse: VerseId,
        content: &str,
    ) -> Result<(), ApiError> {
        match self.notes.get(&verse) {
            Some(existing) => {
                api.update_note(existing.id, content)?;
                let id = existing.id;
                self.notes.insert(verse, NoteEntry { id, content: content.to_string() });
            }
            None => {
                let record = api.create_note(verse, content)?;
                self.notes.insert(
                    verse,
                    NoteEntry { id: record.id, content: record.content },
                );
            }
        }
        Ok(())
    }

    /// Deletes the note on a verse. A verse with no note is a no-op
    /// without a server call.
    pub fn delete_note(&mut self, api: &dyn AnnotationApi, verse: VerseId) -> Result<(), ApiError> {
        let Some(existing) = self.notes.get(&verse) else {
            return Ok(());
        };
        api.delete_note(existing.id)?;
        self.notes.remove(&verse);
        Ok(())
    }

    /// Flips the verse bookmark and returns the new state.
    pub fn toggle_bookmark(
        &mut self,
        api: &dyn AnnotationApi,
        verse: VerseId,
    ) -> Result<bool, ApiError> {
        if self.bookmarks.contains(&verse) {
            api.remove_bookmark(verse)?;
            self.bookmarks.remove(&verse);
            Ok(false)
        } else {
            api.add_bookmark(verse)?;
            self.bookmarks.insert(verse);
            Ok(true)
        }
    }
}
