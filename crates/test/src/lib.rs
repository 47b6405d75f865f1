//! Test helpers and fixtures.

use lectio_core::{
    BookCatalog, BookCatalogEntry, Panel, PanelId, PanelSnapshot, PassageData, Testament, Verse,
    VerseId,
};

/// A small catalog with one book from each testament.
pub fn make_catalog() -> BookCatalog {
    BookCatalog::new(vec![
        BookCatalogEntry {
            abbr: "Gen".to_string(),
            name: "Genesis".to_string(),
            testament: Testament::Ot,
            chapters: 50,
        },
        BookCatalogEntry {
            abbr: "Matt".to_string(),
            name: "Matthew".to_string(),
            testament: Testament::Nt,
            chapters: 28,
        },
    ])
}

pub fn make_primary(translation: &str, abbr: &str, name: &str, chapter: u32) -> Panel {
    Panel {
        id: PanelId::Panel1,
        translation: translation.to_string(),
        book_abbr: abbr.to_string(),
        book_name: name.to_string(),
        chapter,
        verses: Vec::new(),
        loading: false,
        error: None,
    }
}

pub fn make_snapshot(translation: &str, abbr: &str, name: &str, chapter: u32) -> PanelSnapshot {
    PanelSnapshot {
        translation: translation.to_string(),
        book_abbr: abbr.to_string(),
        book_name: name.to_string(),
        chapter,
    }
}

/// Passage whose verse ids encode chapter and verse, so tests can tell
/// responses apart.
pub fn make_passage(abbr: &str, name: &str, chapter: u32, verse_count: u32) -> PassageData {
    PassageData {
        book: abbr.to_string(),
        book_name: name.to_string(),
        verses: (1..=verse_count)
            .map(|v| Verse {
                id: VerseId((chapter as i64) * 1000 + v as i64),
                chapter,
                verse: v,
                text: format!("{name} {chapter}:{v}"),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use application::{Effect, FetchOutcome, PanelSet, RouteChange};
    use lectio_core::chapter_key;
    use lectio_storage::Store;
    use lectio_storage::migrate::{PrimaryContext, run_startup_migrations};

    #[test]
    fn builds_distinct_verse_ids() {
        let passage = make_passage("Gen", "Genesis", 3, 2);
        assert_eq!(passage.verses[0].id, VerseId(3001));
        assert_eq!(passage.verses[1].id, VerseId(3002));
    }

    /// A fresh install with legacy keys comes up migrated, restores its
    /// secondary panel, and survives fetches resolving out of order.
    #[test]
    fn startup_migration_restore_and_fetch_pipeline() -> anyhow::Result<()> {
        let store = Store::open_in_memory()?;
        store.set("isParallelView", "true")?;
        store.set("secondTranslation", "NIV")?;
        store.save_chapter_bookmarks(&["Genesis-2".to_string(), "Gen-7".to_string()])?;

        let primary = PrimaryContext {
            book_abbr: "Gen".to_string(),
            book_name: "Genesis".to_string(),
            chapter: 2,
        };
        run_startup_migrations(&store, &primary)?;

        // Both legacy shapes are gone.
        assert_eq!(store.get("isParallelView")?, None);
        assert_eq!(
            store.load_chapter_bookmarks()?,
            vec![chapter_key("Gen", 2), chapter_key("Gen", 7)]
        );

        // The migrated snapshot restores as a loading secondary panel.
        let snapshots = store.load_panel_snapshots()?;
        let mut panels = PanelSet::new(make_primary("korHRV", "Gen", "Genesis", 2));
        let specs = panels.restore_snapshots(&snapshots);
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].translation, "NIV");
        assert_eq!(specs[0].chapter, 2);

        // Navigate the secondary twice; the first response arrives last
        // and is discarded.
        let catalog = make_catalog();
        let panel = specs[0].panel;
        let Effect::Fetch(first) = panels.navigate(panel, &catalog, "Gen", 3) else {
            panic!("expected fetch");
        };
        let Effect::Fetch(second) = panels.navigate(panel, &catalog, "Gen", 4) else {
            panic!("expected fetch");
        };
        panels.apply_fetch(FetchOutcome {
            panel,
            generation: second.generation,
            result: Ok(make_passage("Gen", "Genesis", 4, 3)),
        });
        panels.apply_fetch(FetchOutcome {
            panel,
            generation: first.generation,
            result: Ok(make_passage("Gen", "Genesis", 3, 3)),
        });

        let secondary = panels.get(panel).expect("panel exists");
        assert_eq!(secondary.chapter, 4);
        assert_eq!(secondary.verses[0].id, VerseId(4001));

        // What gets persisted is exactly the secondary slice.
        store.save_panel_snapshots(&panels.snapshots())?;
        let saved = store.load_panel_snapshots()?;
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].chapter, 4);
        Ok(())
    }

    /// A primary route change rebuilds the panel through the fetch path
    /// rather than mutating verses in place.
    #[test]
    fn route_change_round_trip() {
        let mut panels = PanelSet::new(make_primary("korHRV", "Gen", "Genesis", 1));
        let spec = panels.apply_route(&RouteChange {
            translation: "NIV".to_string(),
            book_abbr: "Matt".to_string(),
            book_name: "Matthew".to_string(),
            chapter: 5,
        });
        assert!(panels.primary().loading);

        panels.apply_fetch(FetchOutcome {
            panel: spec.panel,
            generation: spec.generation,
            result: Ok(make_passage("Matt", "Matthew", 5, 48)),
        });
        let primary = panels.primary();
        assert!(!primary.loading);
        assert_eq!(primary.book_name, "Matthew");
        assert_eq!(primary.verses.len(), 48);
    }
}
