//! Core domain types for Lectio.

use serde::{Deserialize, Serialize};

pub mod nav;

/// Database id of a single verse, shared between the annotation store
/// and the passage endpoint.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct VerseId(pub i64);

impl std::fmt::Display for VerseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verse {
    pub id: VerseId,
    pub chapter: u32,
    pub verse: u32,
    pub text: String,
}

/// Body of a successful passage lookup. `book` is the English
/// abbreviation, `book_name` the localized display name; the chapter is
/// implied by the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassageData {
    pub book: String,
    pub book_name: String,
    pub verses: Vec<Verse>,
}

/// Identity of a reading pane. `Panel1` is the primary panel: bound to
/// the route, interactive for annotation, never removable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PanelId {
    #[default]
    Panel1,
    Panel2,
    Panel3,
}

impl PanelId {
    pub const ALL: [PanelId; 3] = [PanelId::Panel1, PanelId::Panel2, PanelId::Panel3];

    pub fn as_str(&self) -> &'static str {
        match self {
            PanelId::Panel1 => "panel-1",
            PanelId::Panel2 => "panel-2",
            PanelId::Panel3 => "panel-3",
        }
    }

    pub fn is_primary(&self) -> bool {
        matches!(self, PanelId::Panel1)
    }

    pub fn index(&self) -> usize {
        match self {
            PanelId::Panel1 => 0,
            PanelId::Panel2 => 1,
            PanelId::Panel3 => 2,
        }
    }
}

impl std::fmt::Display for PanelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PanelId {
    type Err = &'static str;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "panel-1" => Ok(PanelId::Panel1),
            "panel-2" => Ok(PanelId::Panel2),
            "panel-3" => Ok(PanelId::Panel3),
            _ => Err("unknown panel id"),
        }
    }
}

/// One reading pane: a translation plus a book/chapter position and the
/// verses loaded for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub id: PanelId,
    pub translation: String,
    pub book_abbr: String,
    pub book_name: String,
    pub chapter: u32,
    pub verses: Vec<Verse>,
    pub loading: bool,
    pub error: Option<String>,
}

impl Panel {
    pub fn snapshot(&self) -> PanelSnapshot {
        PanelSnapshot {
            translation: self.translation.clone(),
            book_abbr: self.book_abbr.clone(),
            book_name: self.book_name.clone(),
            chapter: self.chapter,
        }
    }
}

/// The persisted shape of a secondary panel. Field names match the
/// stored JSON (`biblePanels` key); verse text is never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelSnapshot {
    pub translation: String,
    #[serde(rename = "bookAbbrEng")]
    pub book_abbr: String,
    #[serde(rename = "bookName")]
    pub book_name: String,
    pub chapter: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Translation {
    pub code: &'static str,
    pub name: &'static str,
    pub available: bool,
}

pub const TRANSLATIONS: &[Translation] = &[
    Translation { code: "korHRV", name: "Revised Korean", available: true },
    Translation { code: "korRV", name: "Old Korean Revised", available: false },
    Translation { code: "korNRSV", name: "New Korean Standard", available: false },
    Translation { code: "NIV", name: "NIV 2011", available: true },
];

pub const DEFAULT_TRANSLATION: &str = "korHRV";

pub fn translation_name(code: &str) -> &str {
    TRANSLATIONS
        .iter()
        .find(|t| t.code == code)
        .map(|t| t.name)
        .unwrap_or(code)
}

/// Default translation for a freshly added secondary panel: the first
/// available translation that differs from `current`.
pub fn alternate_translation(current: &str) -> &'static str {
    TRANSLATIONS
        .iter()
        .find(|t| t.available && t.code != current)
        .map(|t| t.code)
        .unwrap_or(DEFAULT_TRANSLATION)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Testament {
    Ot,
    Nt,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookCatalogEntry {
    #[serde(rename = "abbr_eng")]
    pub abbr: String,
    pub name: String,
    pub testament: Testament,
    pub chapters: u32,
}

/// Read-only list of books, fetched once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookCatalog {
    pub books: Vec<BookCatalogEntry>,
}

impl BookCatalog {
    pub fn new(books: Vec<BookCatalogEntry>) -> Self {
        Self { books }
    }

    pub fn by_abbr(&self, abbr: &str) -> Option<&BookCatalogEntry> {
        self.books.iter().find(|b| b.abbr.eq_ignore_ascii_case(abbr))
    }

    pub fn by_name(&self, name: &str) -> Option<&BookCatalogEntry> {
        self.books.iter().find(|b| b.name == name)
    }

    pub fn chapter_count(&self, abbr: &str) -> Option<u32> {
        self.by_abbr(abbr).map(|b| b.chapters)
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    Normal,
    Bold,
}

impl FontWeight {
    pub fn as_str(&self) -> &'static str {
        match self {
            FontWeight::Normal => "normal",
            FontWeight::Bold => "bold",
        }
    }
}

impl std::fmt::Display for FontWeight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FontWeight {
    type Err = &'static str;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(FontWeight::Normal),
            "bold" => Ok(FontWeight::Bold),
            _ => Err("unknown font weight"),
        }
    }
}

/// Reader display preferences, persisted under the `fontSize` and
/// `fontWeight` keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preferences {
    pub font_size: u8,
    pub font_weight: FontWeight,
}

impl Default for Preferences {
    fn default() -> Self {
        Self { font_size: 3, font_weight: FontWeight::Normal }
    }
}

impl Preferences {
    pub fn normalize(&mut self) {
        self.font_size = self.font_size.clamp(1, 5);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HighlightColor {
    Yellow,
    Green,
    Blue,
    Pink,
    Purple,
    Orange,
}

impl HighlightColor {
    pub const ALL: [HighlightColor; 6] = [
        HighlightColor::Yellow,
        HighlightColor::Green,
        HighlightColor::Blue,
        HighlightColor::Pink,
        HighlightColor::Purple,
        HighlightColor::Orange,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HighlightColor::Yellow => "yellow",
            HighlightColor::Green => "green",
            HighlightColor::Blue => "blue",
            HighlightColor::Pink => "pink",
            HighlightColor::Purple => "purple",
            HighlightColor::Orange => "orange",
        }
    }
}

impl std::fmt::Display for HighlightColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HighlightColor {
    type Err = &'static str;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "yellow" => Ok(HighlightColor::Yellow),
            "green" => Ok(HighlightColor::Green),
            "blue" => Ok(HighlightColor::Blue),
            "pink" => Ok(HighlightColor::Pink),
            "purple" => Ok(HighlightColor::Purple),
            "orange" => Ok(HighlightColor::Orange),
            _ => Err("unknown highlight color"),
        }
    }
}

/// Key for a saved reading position, e.g. `"Gen-1"`.
pub fn chapter_key(abbr: &str, chapter: u32) -> String {
    format!("{abbr}-{chapter}")
}

fn is_book_abbr(value: &str) -> bool {
    (2..=4).contains(&value.len()) && value.chars().all(|c| c.is_ascii_alphabetic())
}

/// Parses a current-shape chapter bookmark key. Returns `None` for
/// legacy keys whose book part is a localized display name.
pub fn parse_chapter_key(key: &str) -> Option<(&str, u32)> {
    let (abbr, chapter) = key.split_once('-')?;
    if !is_book_abbr(abbr) {
        return None;
    }
    let chapter: u32 = chapter.parse().ok()?;
    if chapter == 0 {
        return None;
    }
    Some((abbr, chapter))
}

/// Splits any `"{book}-{chapter}"` key regardless of shape, for legacy
/// migration. The book part may contain hyphens; the chapter is the
/// final numeric segment.
pub fn split_bookmark_key(key: &str) -> Option<(&str, u32)> {
    let (book, chapter) = key.rsplit_once('-')?;
    let chapter: u32 = chapter.parse().ok()?;
    if book.is_empty() || chapter == 0 {
        return None;
    }
    Some((book, chapter))
}
