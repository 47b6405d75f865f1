//! Blocking HTTP client for the passage and annotation server.
//!
//! All calls are single attempts against a JSON API; transport
//! failures and non-success statuses are folded into [`ApiError`]. The
//! server reports errors as `{"error": "..."}` bodies.

use std::str::FromStr as _;
use std::time::Duration;

use serde::Deserialize;

use application::api::{
    AnnotationApi, ApiError, CatalogSource, HighlightRecord, NoteRecord, PassageSource,
};
use lectio_core::{BookCatalogEntry, HighlightColor, PassageData, VerseId};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const USER_HEADER: &str = "x-lectio-user";

#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::blocking::Client,
    base_url: String,
    user: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

// The server wraps every response in a single-key envelope; list rows
// use snake_case `verse_id` while request bodies take `verseId`.

#[derive(Debug, Deserialize)]
struct BooksEnvelope {
    books: Vec<BookCatalogEntry>,
}

#[derive(Debug, Deserialize)]
struct HighlightsEnvelope {
    highlights: Vec<WireHighlight>,
}

#[derive(Debug, Deserialize)]
struct NotesEnvelope {
    notes: Vec<WireNote>,
}

#[derive(Debug, Deserialize)]
struct NoteEnvelope {
    note: WireNote,
}

#[derive(Debug, Deserialize)]
struct BookmarksEnvelope {
    bookmarks: Vec<WireBookmark>,
}

#[derive(Debug, Deserialize)]
struct WireHighlight {
    verse_id: VerseId,
    color: String,
}

#[derive(Debug, Deserialize)]
struct WireNote {
    id: i64,
    verse_id: VerseId,
    content: String,
}

#[derive(Debug, Deserialize)]
struct WireBookmark {
    verse_id: VerseId,
}

impl Client {
    pub fn new(base_url: impl Into<String>, user: Option<String>) -> Result<Self, ApiError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Ok(Self { http, base_url, user })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn request(
        &self,
        method: reqwest::Method,
        path: &str,
    ) -> reqwest::blocking::RequestBuilder {
        let mut builder = self.http.request(method, self.url(path));
        if let Some(user) = &self.user {
            builder = builder.header(USER_HEADER, user);
        }
        builder
    }

    /// Sends the request and maps the response envelope: transport
    /// failures to `Network`, non-2xx to `Rejected` with the server's
    /// error text when the body carries one.
    fn send(
        &self,
        builder: reqwest::blocking::RequestBuilder,
    ) -> Result<reqwest::blocking::Response, ApiError> {
        let response = builder.send().map_err(|e| ApiError::Network(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response
            .json::<ErrorBody>()
            .map(|body| body.error)
            .unwrap_or_else(|_| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });
        log::debug!("server rejected request ({status}): {message}");
        Err(ApiError::Rejected { status: status.as_u16(), message })
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(self.request(reqwest::Method::GET, path))?
            .json()
            .map_err(|e| ApiError::Network(e.to_string()))
    }

    fn post_json(&self, path: &str, body: serde_json::Value) -> Result<(), ApiError> {
        self.send(self.request(reqwest::Method::POST, path).json(&body))?;
        Ok(())
    }

    fn delete_json(&self, path: &str, body: serde_json::Value) -> Result<(), ApiError> {
        self.send(self.request(reqwest::Method::DELETE, path).json(&body))?;
        Ok(())
    }
}

impl PassageSource for Client {
    fn fetch_passage(
        &self,
        translation: &str,
        book_abbr: &str,
        chapter: u32,
    ) -> Result<PassageData, ApiError> {
        let path =
            format!("/passages?translation={translation}&book={book_abbr}&chapter={chapter}");
        self.get_json(&path)
    }
}

impl CatalogSource for Client {
    fn fetch_books(&self) -> Result<Vec<BookCatalogEntry>, ApiError> {
        let envelope: BooksEnvelope = self.get_json("/books")?;
        Ok(envelope.books)
    }
}

impl AnnotationApi for Client {
    fn list_highlights(&self) -> Result<Vec<HighlightRecord>, ApiError> {
        let envelope: HighlightsEnvelope = self.get_json("/highlights")?;
        // Unknown color names fall back to yellow, the server-side
        // default, rather than dropping the record.
        Ok(envelope
            .highlights
            .into_iter()
            .map(|h| HighlightRecord {
                verse_id: h.verse_id,
                color: HighlightColor::from_str(&h.color).unwrap_or(HighlightColor::Yellow),
            })
            .collect())
    }

    fn list_notes(&self) -> Result<Vec<NoteRecord>, ApiError> {
        let envelope: NotesEnvelope = self.get_json("/notes")?;
        Ok(envelope
            .notes
            .into_iter()
            .map(|n| NoteRecord { id: n.id, verse_id: n.verse_id, content: n.content })
            .collect())
    }

    fn list_bookmarks(&self) -> Result<Vec<VerseId>, ApiError> {
        let envelope: BookmarksEnvelope = self.get_json("/bookmarks")?;
        Ok(envelope.bookmarks.into_iter().map(|b| b.verse_id).collect())
    }

    fn add_highlight(&self, verse: VerseId, color: HighlightColor) -> Result<(), ApiError> {
        self.post_json(
            "/highlights",
            serde_json::json!({ "verseId": verse, "color": color.as_str() }),
        )
    }

    fn remove_highlight(&self, verse: VerseId) -> Result<(), ApiError> {
        self.delete_json("/highlights", serde_json::json!({ "verseId": verse }))
    }

    fn create_note(&self, verse: VerseId, content: &str) -> Result<NoteRecord, ApiError> {
        let body = serde_json::json!({ "verseId": verse, "content": content });
        let envelope: NoteEnvelope = self
            .send(self.request(reqwest::Method::POST, "/notes").json(&body))?
            .json()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let note = envelope.note;
        Ok(NoteRecord { id: note.id, verse_id: note.verse_id, content: note.content })
    }

    fn update_note(&self, note_id: i64, content: &str) -> Result<(), ApiError> {
        let body = serde_json::json!({ "content": content });
        self.send(
            self.request(reqwest::Method::PUT, &format!("/notes/{note_id}"))
                .json(&body),
        )?;
        Ok(())
    }

    fn delete_note(&self, note_id: i64) -> Result<(), ApiError> {
        self.send(self.request(reqwest::Method::DELETE, &format!("/notes/{note_id}")))?;
        Ok(())
    }

    fn add_bookmark(&self, verse: VerseId) -> Result<(), ApiError> {
        self.post_json("/bookmarks", serde_json::json!({ "verseId": verse }))
    }

    fn remove_bookmark(&self, verse: VerseId) -> Result<(), ApiError> {
        self.delete_json("/bookmarks", serde_json::json!({ "verseId": verse }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slashes_are_trimmed() {
        let client = Client::new("http://localhost:3000/api/v1//", None).unwrap();
        assert_eq!(client.url("/books"), "http://localhost:3000/api/v1/books");
    }

    #[test]
    fn passage_path_carries_the_triple() {
        let client = Client::new("http://localhost:3000/api/v1", None).unwrap();
        let path = format!(
            "/passages?translation={}&book={}&chapter={}",
            "korHRV", "Gen", 1
        );
        assert_eq!(
            client.url(&path),
            "http://localhost:3000/api/v1/passages?translation=korHRV&book=Gen&chapter=1"
        );
    }

    #[test]
    fn books_response_unwraps_the_envelope() {
        let body = r#"{"books":[{
            "id": 1,
            "abbr_eng": "Gen",
            "testament": "OT",
            "book_order": 1,
            "chapters": 50,
            "name": "창세기",
            "book_names": [{"id": 9, "book_id": 1, "language": "ko", "name": "창세기", "abbr": "창"}]
        }]}"#;
        let envelope: BooksEnvelope = serde_json::from_str(body).unwrap();
        assert_eq!(envelope.books.len(), 1);
        assert_eq!(envelope.books[0].abbr, "Gen");
        assert_eq!(envelope.books[0].name, "창세기");
        assert_eq!(envelope.books[0].chapters, 50);
    }

    #[test]
    fn highlight_list_rows_use_snake_case_verse_id() {
        let body = r#"{"highlights":[
            {"id": 3, "color": "green", "verse_id": 42,
             "verses": {"book": "Gen", "chapter": 1, "verse": 1}},
            {"id": 4, "color": "chartreuse", "verse_id": 43,
             "verses": {"book": "Gen", "chapter": 1, "verse": 2}}
        ]}"#;
        let envelope: HighlightsEnvelope = serde_json::from_str(body).unwrap();
        assert_eq!(envelope.highlights[0].verse_id, VerseId(42));
        assert_eq!(envelope.highlights[0].color, "green");
        // Unknown color falls back to the server default at mapping time.
        assert_eq!(
            HighlightColor::from_str(&envelope.highlights[1].color)
                .unwrap_or(HighlightColor::Yellow),
            HighlightColor::Yellow
        );
    }

    #[test]
    fn note_and_bookmark_envelopes_decode() {
        let body = r#"{"notes":[{"id": 7, "content": "selah", "verse_id": 42,
            "verses": {"book": "Gen", "chapter": 1, "verse": 1},
            "updated_at": "2024-01-01T00:00:00Z"}]}"#;
        let notes: NotesEnvelope = serde_json::from_str(body).unwrap();
        assert_eq!(notes.notes[0].id, 7);
        assert_eq!(notes.notes[0].verse_id, VerseId(42));

        let body = r#"{"bookmarks":[{"id": 2, "verse_id": 42,
            "verses": {"book": "Gen", "chapter": 1, "verse": 1},
            "created_at": "2024-01-01T00:00:00Z"}]}"#;
        let bookmarks: BookmarksEnvelope = serde_json::from_str(body).unwrap();
        assert_eq!(bookmarks.bookmarks[0].verse_id, VerseId(42));
    }

    #[test]
    fn note_create_response_is_a_single_note_envelope() {
        let body = r#"{"note":{"id": 11, "user_id": "u1", "verse_id": 42,
            "content": "remember", "updated_at": "2024-01-01T00:00:00Z"}}"#;
        let envelope: NoteEnvelope = serde_json::from_str(body).unwrap();
        assert_eq!(envelope.note.id, 11);
        assert_eq!(envelope.note.content, "remember");
    }

    #[test]
    fn error_body_carries_the_server_message() {
        let body: ErrorBody = serde_json::from_str(r#"{"error": "Unauthorized"}"#).unwrap();
        assert_eq!(body.error, "Unauthorized");
    }
}
