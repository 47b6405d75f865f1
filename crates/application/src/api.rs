//! Contracts for the remote collaborators.
//!
//! The passage, catalog and annotation endpoints live behind traits so
//! the orchestration layer can be exercised against in-memory fakes.
//! Every call is a single attempt; retries are never issued here or by
//! implementors.

use lectio_core::{BookCatalogEntry, HighlightColor, PassageData, VerseId};

/// Failure of a collaborator call, split the way the UI reacts to it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a response (DNS, refused, timeout).
    #[error("network failure: {0}")]
    Network(String),
    /// The server answered with a non-success status. `message` carries
    /// the server-provided error text when present.
    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
}

impl ApiError {
    pub fn is_auth_required(&self) -> bool {
        matches!(self, ApiError::Rejected { status: 401, .. })
    }

    /// Text suitable for a user-facing notification.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Network(msg) => format!("Network error: {msg}"),
            ApiError::Rejected { message, .. } => message.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightRecord {
    pub verse_id: VerseId,
    pub color: HighlightColor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteRecord {
    pub id: i64,
    pub verse_id: VerseId,
    pub content: String,
}

/// Verse lookup for a translation/book/chapter triple.
pub trait PassageSource: Send {
    fn fetch_passage(
        &self,
        translation: &str,
        book_abbr: &str,
        chapter: u32,
    ) -> Result<PassageData, ApiError>;
}

/// One-shot book catalog fetch.
pub trait CatalogSource {
    fn fetch_books(&self) -> Result<Vec<BookCatalogEntry>, ApiError>;
}

/// Verse-scoped annotation CRUD for the signed-in user.
pub trait AnnotationApi {
    fn list_highlights(&self) -> Result<Vec<HighlightRecord>, ApiError>;
    fn list_notes(&self) -> Result<Vec<NoteRecord>, ApiError>;
    fn list_bookmarks(&self) -> Result<Vec<VerseId>, ApiError>;

    fn add_highlight(&self, verse: VerseId, color: HighlightColor) -> Result<(), ApiError>;
    fn remove_highlight(&self, verse: VerseId) -> Result<(), ApiError>;

    /// Creates a note and returns the server-assigned record.
    fn create_note(&self, verse: VerseId, content: &str) -> Result<NoteRecord, ApiError>;
    fn update_note(&self, note_id: i64, content: &str) -> Result<(), ApiError>;
    fn delete_note(&self, note_id: i64) -> Result<(), ApiError>;

    fn add_bookmark(&self, verse: VerseId) -> Result<(), ApiError>;
    fn remove_bookmark(&self, verse: VerseId) -> Result<(), ApiError>;
}
