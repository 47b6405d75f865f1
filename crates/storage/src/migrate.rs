//! One-time upgrades of legacy persisted shapes, run at startup once
//! the primary panel's book context is known.
//!
//! Both migrations are idempotent: the legacy-shape detectors do not
//! match already-migrated data.

use anyhow::Context as _;
use lectio_core::{PanelSnapshot, chapter_key, parse_chapter_key, split_bookmark_key};

use crate::{
    KEY_CHAPTER_BOOKMARKS, KEY_LEGACY_PARALLEL, KEY_LEGACY_SECOND_TRANSLATION, KEY_PANELS, Store,
};

/// Book position of the primary panel at startup; legacy values carry
/// no book context of their own, so they inherit this one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryContext {
    pub book_abbr: String,
    pub book_name: String,
    pub chapter: u32,
}

/// Versioned shapes of the persisted panel configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelsSchema {
    /// Single boolean "parallel view" flag plus one translation code.
    V1(LegacyParallel),
    /// The current `biblePanels` snapshot list.
    V2(Vec<PanelSnapshot>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyParallel {
    pub enabled: bool,
    pub second_translation: String,
}

/// Upgrades the legacy parallel-view pair to snapshot form. Pure and
/// total: a disabled flag yields no panels.
pub fn upgrade_parallel(legacy: &LegacyParallel, primary: &PrimaryContext) -> Vec<PanelSnapshot> {
    if !legacy.enabled {
        return Vec::new();
    }
    vec![PanelSnapshot {
        translation: legacy.second_translation.clone(),
        book_abbr: primary.book_abbr.clone(),
        book_name: primary.book_name.clone(),
        chapter: primary.chapter,
    }]
}

fn detect_panels_schema(store: &Store) -> anyhow::Result<Option<PanelsSchema>> {
    if store.contains(KEY_PANELS)? {
        return Ok(Some(PanelsSchema::V2(store.load_panel_snapshots()?)));
    }
    let Some(flag) = store.get(KEY_LEGACY_PARALLEL)? else {
        return Ok(None);
    };
    let second = store
        .get(KEY_LEGACY_SECOND_TRANSLATION)?
        .unwrap_or_else(|| "NIV".to_string());
    Ok(Some(PanelsSchema::V1(LegacyParallel {
        enabled: flag.trim() == "true",
        second_translation: second,
    })))
}

/// Upgrades the legacy parallel-view keys into `biblePanels`, consuming
/// both legacy keys. Returns whether anything changed.
pub fn migrate_panel_schema(store: &Store, primary: &PrimaryContext) -> anyhow::Result<bool> {
    match detect_panels_schema(store)? {
        Some(PanelsSchema::V1(legacy)) => {
            let snapshots = upgrade_parallel(&legacy, primary);
            store
                .save_panel_snapshots(&snapshots)
                .context("write migrated panel snapshots")?;
            store.remove(KEY_LEGACY_PARALLEL)?;
            store.remove(KEY_LEGACY_SECOND_TRANSLATION)?;
            log::info!(
                "migrated legacy parallel view (enabled={}) to {} panel snapshot(s)",
                legacy.enabled,
                snapshots.len()
            );
            Ok(true)
        }
        Some(PanelsSchema::V2(_)) | None => Ok(false),
    }
}

/// Rewrites legacy chapter bookmark entries (`"{displayName}-{chapter}"`)
/// to the current `"{abbrev}-{chapter}"` shape. Entries whose display
/// name does not match the current book cannot be resolved and are
/// dropped. Returns the number of entries rewritten or dropped.
pub fn migrate_bookmark_keys(store: &Store, primary: &PrimaryContext) -> anyhow::Result<usize> {
    let bookmarks = store.load_chapter_bookmarks()?;
    let mut migrated = Vec::with_capacity(bookmarks.len());
    let mut touched = 0usize;

    for entry in &bookmarks {
        if parse_chapter_key(entry).is_some() {
            migrated.push(entry.clone());
            continue;
        }
        touched += 1;
        match split_bookmark_key(entry) {
            Some((name, chapter)) if name == primary.book_name => {
                migrated.push(chapter_key(&primary.book_abbr, chapter));
            }
            _ => {
                // Lossy: no book context to resolve the name against.
                log::warn!("dropping unresolvable legacy chapter bookmark {entry:?}");
            }
        }
    }

    if touched > 0 {
        store.save_chapter_bookmarks(&migrated)?;
    }
    Ok(touched)
}

/// Runs every startup migration exactly once per legacy key.
pub fn run_startup_migrations(store: &Store, primary: &PrimaryContext) -> anyhow::Result<()> {
    migrate_panel_schema(store, primary).context("migrate panel schema")?;
    migrate_bookmark_keys(store, primary).context("migrate chapter bookmark keys")?;
    Ok(())
}
