//! Orchestration layer: owns the whole page state and drives the
//! panel, annotation and popup machines in response to user intents.
//! Terminal concerns stay out; the ui crate renders this state and
//! feeds intents back in.

pub mod annotations;
pub mod api;
pub mod menu;
pub mod panels;

pub use annotations::{AnnotationCache, NoteEntry};
pub use api::{AnnotationApi, ApiError, CatalogSource, HighlightRecord, NoteRecord, PassageSource};
pub use menu::{Anchor, ContextMenuState, NoteModalState};
pub use panels::{Effect, FetchOutcome, FetchSpec, PanelSet, RouteChange};

use lectio_core::{BookCatalog, HighlightColor, Preferences, VerseId, chapter_key};

/// Who is signed in, if anyone. Annotation features require a user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub user: Option<String>,
}

impl Session {
    pub fn signed_in(user: impl Into<String>) -> Self {
        Self { user: Some(user.into()) }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

/// Transient user-facing message, rendered as a dismissable popup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Error(String),
    /// Annotation attempted without a session.
    ConfirmLogin,
}

/// The single owned state object behind the whole screen.
#[derive(Debug)]
pub struct AppContext {
    pub catalog: BookCatalog,
    pub session: Session,
    pub panels: PanelSet,
    pub annotations: AnnotationCache,
    pub context_menu: ContextMenuState,
    pub note_modal: NoteModalState,
    pub prefs: Preferences,
    pub chapter_bookmarks: Vec<String>,
    pub notice: Option<Notice>,
}

impl AppContext {
    pub fn new(catalog: BookCatalog, panels: PanelSet) -> Self {
        Self {
            catalog,
            session: Session::default(),
            panels,
            annotations: AnnotationCache::new(),
            context_menu: ContextMenuState::default(),
            note_modal: NoteModalState::default(),
            prefs: Preferences::default(),
            chapter_bookmarks: Vec::new(),
            notice: None,
        }
    }

    pub fn with_session(mut self, session: Session) -> Self {
        self.session = session;
        self
    }

    pub fn with_prefs(mut self, prefs: Preferences) -> Self {
        self.prefs = prefs;
        self
    }

    pub fn with_chapter_bookmarks(mut self, bookmarks: Vec<String>) -> Self {
        self.chapter_bookmarks = bookmarks;
        self
    }

    fn report(&mut self, err: ApiError) {
        self.notice = if err.is_auth_required() {
            Some(Notice::ConfirmLogin)
        } else {
            Some(Notice::Error(err.user_message()))
        };
    }

    /// Entry point for verse interaction. Unauthenticated users get the
    /// sign-in prompt and the menu never opens.
    pub fn verse_clicked(&mut self, verse: VerseId, anchor: Anchor) {
        if !self.session.is_authenticated() {
            self.notice = Some(Notice::ConfirmLogin);
            return;
        }
        self.context_menu.open_at(verse, anchor);
    }

    pub fn select_highlight_color(&mut self, api: &dyn AnnotationApi, color: HighlightColor) {
        let Some(verse) = self.context_menu.verse() else {
            return;
        };
        if let Err(err) = self.annotations.add_highlight(api, verse, color) {
            self.report(err);
        }
        self.context_menu.close();
    }

    pub fn remove_highlight_clicked(&mut self, api: &dyn AnnotationApi) {
        let Some(verse) = self.context_menu.verse() else {
            return;
        };
        if let Err(err) = self.annotations.remove_highlight(api, verse) {
            self.report(err);
        }
        self.context_menu.close();
    }

    /// Hands off from the context menu to the note modal.
    pub fn open_note_modal(&mut self) {
        let Some(verse) = self.context_menu.verse() else {
            return;
        };
        self.context_menu.close();
        let existing = self.annotations.note(verse).map(|n| n.content.clone());
        self.note_modal.open(verse, existing.as_deref());
    }

    /// Commits the modal's draft and closes it on success. Failure
    /// keeps the modal (and the draft) open.
    pub fn save_note(&mut self, api: &dyn AnnotationApi) {
        let Some(verse) = self.note_modal.verse() else {
            return;
        };
        let Some(draft) = self.note_modal.draft_mut().map(|d| d.clone()) else {
            return;
        };
        match self.annotations.save_note(api, verse, &draft) {
            Ok(()) => self.note_modal.close(),
            Err(err) => self.report(err),
        }
    }

    pub fn delete_note(&mut self, api: &dyn AnnotationApi) {
        let Some(verse) = self.note_modal.verse() else {
            return;
        };
        match self.annotations.delete_note(api, verse) {
            Ok(()) => self.note_modal.close(),
            Err(err) => self.report(err),
        }
    }

    pub fn toggle_verse_bookmark(&mut self, api: &dyn AnnotationApi) {
        let Some(verse) = self.context_menu.verse() else {
            return;
        };
        if let Err(err) = self.annotations.toggle_bookmark(api, verse) {
            self.report(err);
        }
        self.context_menu.close();
    }

    /// Chapter bookmarks are device-local; no session required. Returns
    /// the new state for the primary panel's chapter.
    pub fn toggle_chapter_bookmark(&mut self) -> bool {
        let primary = self.panels.primary();
        let key = chapter_key(&primary.book_abbr, primary.chapter);
        if let Some(pos) = self.chapter_bookmarks.iter().position(|k| *k == key) {
            self.chapter_bookmarks.remove(pos);
            false
        } else {
            self.chapter_bookmarks.push(key);
            true
        }
    }

    pub fn is_chapter_bookmarked(&self, abbr: &str, chapter: u32) -> bool {
        let key = chapter_key(abbr, chapter);
        self.chapter_bookmarks.iter().any(|k| *k == key)
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }
}
