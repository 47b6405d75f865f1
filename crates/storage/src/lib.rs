//! Sqlite-backed key-value persistence.
//!
//! The store mirrors the original client-side storage: string keys,
//! string values, JSON for structured shapes. Typed readers are
//! lenient — a value that fails to parse is treated as absent and the
//! offending key is dropped.

use std::path::Path;

use anyhow::Context as _;
use lectio_core::{FontWeight, PanelSnapshot, Preferences};
use rusqlite::{Connection, OptionalExtension as _};

pub mod migrate;

pub const KEY_FONT_SIZE: &str = "fontSize";
pub const KEY_FONT_WEIGHT: &str = "fontWeight";
pub const KEY_CHAPTER_BOOKMARKS: &str = "chapterBookmarks";
pub const KEY_PANELS: &str = "biblePanels";
pub const KEY_LEGACY_PARALLEL: &str = "isParallelView";
pub const KEY_LEGACY_SECOND_TRANSLATION: &str = "secondTranslation";

#[derive(Debug)]
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let conn = Connection::open(path.as_ref())
            .with_context(|| format!("open sqlite db at {}", path.as_ref().display()))?;
        let store = Self { conn };
        store.bootstrap()?;
        Ok(store)
    }

    pub fn open_in_memory() -> anyhow::Result<Self> {
        let store = Self { conn: Connection::open_in_memory()? };
        store.bootstrap()?;
        Ok(store)
    }

    fn bootstrap(&self) -> anyhow::Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    pub fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO kv (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
            (key, value),
        )?;
        Ok(())
    }

    pub fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.conn.execute("DELETE FROM kv WHERE key = ?", [key])?;
        Ok(())
    }

    pub fn contains(&self, key: &str) -> anyhow::Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    pub fn load_preferences(&self) -> anyhow::Result<Preferences> {
        let mut prefs = Preferences::default();

        if let Some(raw) = self.get(KEY_FONT_SIZE)? {
            match raw.trim().parse::<u8>() {
                Ok(size) => prefs.font_size = size,
                Err(_) => self.drop_unparseable(KEY_FONT_SIZE, &raw)?,
            }
        }
        if let Some(raw) = self.get(KEY_FONT_WEIGHT)? {
            match raw.parse::<FontWeight>() {
                Ok(weight) => prefs.font_weight = weight,
                Err(_) => self.drop_unparseable(KEY_FONT_WEIGHT, &raw)?,
            }
        }

        prefs.normalize();
        Ok(prefs)
    }

    pub fn save_preferences(&self, prefs: &Preferences) -> anyhow::Result<()> {
        let mut prefs = *prefs;
        prefs.normalize();
        self.set(KEY_FONT_SIZE, &prefs.font_size.to_string())?;
        self.set(KEY_FONT_WEIGHT, prefs.font_weight.as_str())?;
        Ok(())
    }

    pub fn load_chapter_bookmarks(&self) -> anyhow::Result<Vec<String>> {
        self.load_json(KEY_CHAPTER_BOOKMARKS)
    }

    pub fn save_chapter_bookmarks(&self, bookmarks: &[String]) -> anyhow::Result<()> {
        self.set(KEY_CHAPTER_BOOKMARKS, &serde_json::to_string(bookmarks)?)
    }

    pub fn load_panel_snapshots(&self) -> anyhow::Result<Vec<PanelSnapshot>> {
        self.load_json(KEY_PANELS)
    }

    pub fn save_panel_snapshots(&self, snapshots: &[PanelSnapshot]) -> anyhow::Result<()> {
        self.set(KEY_PANELS, &serde_json::to_string(snapshots)?)
    }

    fn load_json<T: serde::de::DeserializeOwned + Default>(&self, key: &str) -> anyhow::Result<T> {
        let Some(raw) = self.get(key)? else {
            return Ok(T::default());
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(value),
            Err(_) => {
                self.drop_unparseable(key, &raw)?;
                Ok(T::default())
            }
        }
    }

    fn drop_unparseable(&self, key: &str, raw: &str) -> anyhow::Result<()> {
        log::warn!("dropping unparseable value for key {key:?}: {raw:?}");
        self.remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectio_core::FontWeight;

    #[test]
    fn kv_roundtrip() -> anyhow::Result<()> {
        let store = Store::open_in_memory()?;
        assert_eq!(store.get("missing")?, None);
        store.set("fontSize", "4")?;
        assert_eq!(store.get("fontSize")?.as_deref(), Some("4"));
        store.set("fontSize", "2")?;
        assert_eq!(store.get("fontSize")?.as_deref(), Some("2"));
        store.remove("fontSize")?;
        assert_eq!(store.get("fontSize")?, None);
        Ok(())
    }

    #[test]
    fn preferences_roundtrip() -> anyhow::Result<()> {
        let store = Store::open_in_memory()?;
        let prefs = Preferences { font_size: 5, font_weight: FontWeight::Bold };
        store.save_preferences(&prefs)?;
        assert_eq!(store.get(KEY_FONT_SIZE)?.as_deref(), Some("5"));
        assert_eq!(store.get(KEY_FONT_WEIGHT)?.as_deref(), Some("bold"));
        assert_eq!(store.load_preferences()?, prefs);
        Ok(())
    }

    #[test]
    fn unparseable_font_size_falls_back_and_drops_key() -> anyhow::Result<()> {
        let store = Store::open_in_memory()?;
        store.set(KEY_FONT_SIZE, "huge")?;
        let prefs = store.load_preferences()?;
        assert_eq!(prefs.font_size, Preferences::default().font_size);
        assert_eq!(store.get(KEY_FONT_SIZE)?, None);
        Ok(())
    }

    #[test]
    fn out_of_range_font_size_is_clamped_on_load() -> anyhow::Result<()> {
        let store = Store::open_in_memory()?;
        store.set(KEY_FONT_SIZE, "9")?;
        assert_eq!(store.load_preferences()?.font_size, 5);
        Ok(())
    }

    #[test]
    fn panel_snapshots_roundtrip_with_stored_field_names() -> anyhow::Result<()> {
        let store = Store::open_in_memory()?;
        let snapshots = vec![PanelSnapshot {
            translation: "NIV".to_string(),
            book_abbr: "Gen".to_string(),
            book_name: "Genesis".to_string(),
            chapter: 3,
        }];
        store.save_panel_snapshots(&snapshots)?;
        let raw = store.get(KEY_PANELS)?.unwrap();
        assert!(raw.contains("\"bookAbbrEng\":\"Gen\""), "raw: {raw}");
        assert_eq!(store.load_panel_snapshots()?, snapshots);
        Ok(())
    }

    #[test]
    fn corrupt_bookmarks_value_resets_to_empty() -> anyhow::Result<()> {
        let store = Store::open_in_memory()?;
        store.set(KEY_CHAPTER_BOOKMARKS, "{not json")?;
        assert!(store.load_chapter_bookmarks()?.is_empty());
        assert_eq!(store.get(KEY_CHAPTER_BOOKMARKS)?, None);
        Ok(())
    }
}
