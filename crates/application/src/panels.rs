//! The panel set: up to three reading panes, primary first.
//!
//! Transitions are pure; network and navigation side effects are
//! returned as [`Effect`] values for the caller to perform. Each panel
//! carries a monotonically increasing request generation; a fetch
//! outcome whose generation no longer matches the panel's current one
//! is stale and is discarded on arrival, as is an outcome for a panel
//! that has been removed.

use lectio_core::{
    BookCatalog, Panel, PanelId, PanelSnapshot, PassageData, alternate_translation, nav,
};

use crate::api::ApiError;

pub const MAX_PANELS: usize = 3;

/// A verse fetch the caller must issue for a secondary (or reloading
/// primary) panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSpec {
    pub panel: PanelId,
    pub generation: u64,
    pub translation: String,
    pub book_abbr: String,
    pub chapter: u32,
}

/// Resolution of a previously issued [`FetchSpec`].
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome {
    pub panel: PanelId,
    pub generation: u64,
    pub result: Result<PassageData, ApiError>,
}

/// A primary-panel navigation; the whole page state is rebuilt from the
/// new route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteChange {
    pub translation: String,
    pub book_abbr: String,
    pub book_name: String,
    pub chapter: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    None,
    Fetch(FetchSpec),
    Route(RouteChange),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PanelSet {
    panels: Vec<Panel>,
    generations: [u64; MAX_PANELS],
}

impl PanelSet {
    /// Builds the set around the route-derived primary panel.
    pub fn new(primary: Panel) -> Self {
        debug_assert!(primary.id.is_primary());
        Self { panels: vec![primary], generations: [0; MAX_PANELS] }
    }

    pub fn panels(&self) -> &[Panel] {
        &self.panels
    }

    /// Always at least 1; the primary panel is never removed.
    pub fn len(&self) -> usize {
        self.panels.len()
    }

    pub fn primary(&self) -> &Panel {
        &self.panels[0]
    }

    pub fn get(&self, id: PanelId) -> Option<&Panel> {
        self.panels.iter().find(|p| p.id == id)
    }

    fn get_mut(&mut self, id: PanelId) -> Option<&mut Panel> {
        self.panels.iter_mut().find(|p| p.id == id)
    }

    fn next_free_id(&self) -> Option<PanelId> {
        PanelId::ALL
            .into_iter()
            .find(|id| self.get(*id).is_none())
    }

    fn bump_generation(&mut self, id: PanelId) -> u64 {
        let slot = &mut self.generations[id.index()];
        *slot += 1;
        *slot
    }

    pub fn generation(&self, id: PanelId) -> u64 {
        self.generations[id.index()]
    }

    fn fetch_spec(&mut self, id: PanelId) -> Option<FetchSpec> {
        let panel = self.get(id)?;
        let (translation, book_abbr, chapter) =
            (panel.translation.clone(), panel.book_abbr.clone(), panel.chapter);
        let generation = self.bump_generation(id);
        Some(FetchSpec { panel: id, generation, translation, book_abbr, chapter })
    }

    /// Appends a secondary panel seeded from the primary's position and
    /// an alternate translation. No-op at the three-panel cap.
    pub fn add_panel(&mut self) -> Option<FetchSpec> {
        if self.panels.len() >= MAX_PANELS {
            return None;
        }
        let id = self.next_free_id()?;
        let primary = self.primary();
        let panel = Panel {
            id,
            translation: alternate_translation(&primary.translation).to_string(),
            book_abbr: primary.book_abbr.clone(),
            book_name: primary.book_name.clone(),
            chapter: primary.chapter,
            verses: Vec::new(),
            loading: true,
            error: None,
        };
        self.panels.push(panel);
        self.panels.sort_by_key(|p| p.id.index());
        self.fetch_spec(id)
    }

    /// Recreates secondary panels from persisted snapshots at startup.
    pub fn restore_snapshots(&mut self, snapshots: &[PanelSnapshot]) -> Vec<FetchSpec> {
        let mut specs = Vec::new();
        for snapshot in snapshots.iter().take(MAX_PANELS - 1) {
            let Some(id) = self.next_free_id() else { break };
            self.panels.push(Panel {
                id,
                translation: snapshot.translation.clone(),
                book_abbr: snapshot.book_abbr.clone(),
                book_name: snapshot.book_name.clone(),
                chapter: snapshot.chapter,
                verses: Vec::new(),
                loading: true,
                error: None,
            });
            if let Some(spec) = self.fetch_spec(id) {
                specs.push(spec);
            }
        }
        self.panels.sort_by_key(|p| p.id.index());
        specs
    }

    /// Removes a secondary panel. The primary and the last remaining
    /// panel are never removed.
    pub fn remove_panel(&mut self, id: PanelId) -> bool {
        if id.is_primary() || self.panels.len() <= 1 {
            return false;
        }
        let before = self.panels.len();
        self.panels.retain(|p| p.id != id);
        self.panels.len() != before
    }

    /// Switches a panel's translation at its current position. Primary
    /// panels route; secondary panels re-fetch in place.
    pub fn set_translation(&mut self, id: PanelId, translation: &str) -> Effect {
        if id.is_primary() {
            let primary = self.primary();
            return Effect::Route(RouteChange {
                translation: translation.to_string(),
                book_abbr: primary.book_abbr.clone(),
                book_name: primary.book_name.clone(),
                chapter: primary.chapter,
            });
        }
        let Some(panel) = self.get_mut(id) else {
            return Effect::None;
        };
        panel.translation = translation.to_string();
        panel.loading = true;
        panel.error = None;
        match self.fetch_spec(id) {
            Some(spec) => Effect::Fetch(spec),
            None => Effect::None,
        }
    }

    /// Moves a panel to a book/chapter. The chapter guard rejects the
    /// whole operation before any state changes.
    pub fn navigate(
        &mut self,
        id: PanelId,
        catalog: &BookCatalog,
        book_abbr: &str,
        chapter: u32,
    ) -> Effect {
        if !nav::chapter_in_range(catalog, book_abbr, chapter) {
            return Effect::None;
        }
        let book_name = nav::display_name_or_abbr(catalog, book_abbr).to_string();
        if id.is_primary() {
            let primary = self.primary();
            return Effect::Route(RouteChange {
                translation: primary.translation.clone(),
                book_abbr: book_abbr.to_string(),
                book_name,
                chapter,
            });
        }
        let Some(panel) = self.get_mut(id) else {
            return Effect::None;
        };
        panel.book_abbr = book_abbr.to_string();
        panel.book_name = book_name;
        panel.chapter = chapter;
        panel.loading = true;
        panel.error = None;
        match self.fetch_spec(id) {
            Some(spec) => Effect::Fetch(spec),
            None => Effect::None,
        }
    }

    pub fn step_back(&mut self, id: PanelId, catalog: &BookCatalog) -> Effect {
        let Some(panel) = self.get(id) else { return Effect::None };
        if !nav::can_step_back(panel.chapter) {
            return Effect::None;
        }
        let (abbr, chapter) = (panel.book_abbr.clone(), panel.chapter - 1);
        self.navigate(id, catalog, &abbr, chapter)
    }

    pub fn step_forward(&mut self, id: PanelId, catalog: &BookCatalog) -> Effect {
        let Some(panel) = self.get(id) else { return Effect::None };
        if !nav::can_step_forward(catalog, &panel.book_abbr, panel.chapter) {
            return Effect::None;
        }
        let (abbr, chapter) = (panel.book_abbr.clone(), panel.chapter + 1);
        self.navigate(id, catalog, &abbr, chapter)
    }

    /// Applies a route change to the primary panel and returns the
    /// fetch that rebuilds it. This is the in-process half of the route
    /// collaborator: the primary's verses are always re-derived, never
    /// mutated locally.
    pub fn apply_route(&mut self, route: &RouteChange) -> FetchSpec {
        let primary = &mut self.panels[0];
        primary.translation = route.translation.clone();
        primary.book_abbr = route.book_abbr.clone();
        primary.book_name = route.book_name.clone();
        primary.chapter = route.chapter;
        primary.verses.clear();
        primary.loading = true;
        primary.error = None;
        let generation = self.bump_generation(PanelId::Panel1);
        FetchSpec {
            panel: PanelId::Panel1,
            generation,
            translation: route.translation.clone(),
            book_abbr: route.book_abbr.clone(),
            chapter: route.chapter,
        }
    }

    /// Applies a resolved fetch. Outcomes for removed panels and stale
    /// generations are discarded.
    pub fn apply_fetch(&mut self, outcome: FetchOutcome) {
        if self.generations[outcome.panel.index()] != outcome.generation {
            return;
        }
        let Some(panel) = self.get_mut(outcome.panel) else {
            return;
        };
        panel.loading = false;
        match outcome.result {
            Ok(data) => {
                panel.book_abbr = data.book;
                panel.book_name = data.book_name;
                panel.verses = data.verses;
                panel.error = None;
            }
            Err(err) => {
                panel.error = Some(err.user_message());
            }
        }
    }

    /// Persisted view of the secondary slice; the primary is always
    /// reconstructable from the route and never stored.
    pub fn snapshots(&self) -> Vec<PanelSnapshot> {
        self.panels.iter().skip(1).map(Panel::snapshot).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectio_core::{BookCatalogEntry, Testament, Verse, VerseId};

    fn catalog() -> BookCatalog {
        BookCatalog::new(vec![
            BookCatalogEntry {
                abbr: "Gen".to_string(),
                name: "Genesis".to_string(),
                testament: Testament::Ot,
                chapters: 50,
            },
            BookCatalogEntry {
                abbr: "Exo".to_string(),
                name: "Exodus".to_string(),
                testament: Testament::Ot,
                chapters: 40,
            },
        ])
    }

    fn primary() -> Panel {
        Panel {
            id: PanelId::Panel1,
            translation: "korHRV".to_string(),
            book_abbr: "Gen".to_string(),
            book_name: "Genesis".to_string(),
            chapter: 1,
            verses: Vec::new(),
            loading: false,
            error: None,
        }
    }

    fn verses_for(chapter: u32) -> Vec<Verse> {
        vec![Verse {
            id: VerseId(chapter as i64 * 100),
            chapter,
            verse: 1,
            text: format!("chapter {chapter} verse 1"),
        }]
    }

    fn data_for(chapter: u32) -> PassageData {
        PassageData {
            book: "Gen".to_string(),
            book_name: "Genesis".to_string(),
            verses: verses_for(chapter),
        }
    }

    #[test]
    fn panel_count_stays_within_bounds() {
        let mut set = PanelSet::new(primary());
        assert!(set.add_panel().is_some());
        assert!(set.add_panel().is_some());
        assert!(set.add_panel().is_none());
        assert_eq!(set.len(), 3);

        assert!(set.remove_panel(PanelId::Panel2));
        assert!(set.remove_panel(PanelId::Panel3));
        assert!(!set.remove_panel(PanelId::Panel2));
        assert_eq!(set.len(), 1);
        // Arbitrary further removes never empty the set.
        assert!(!set.remove_panel(PanelId::Panel1));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn primary_is_never_removed_and_stays_first() {
        let mut set = PanelSet::new(primary());
        set.add_panel();
        let len = set.len();
        assert!(!set.remove_panel(PanelId::Panel1));
        assert_eq!(set.len(), len);
        assert_eq!(set.panels()[0].id, PanelId::Panel1);
    }

    #[test]
    fn added_panel_inherits_primary_position_with_alternate_translation() {
        let mut set = PanelSet::new(primary());
        let spec = set.add_panel().unwrap();
        assert_eq!(spec.panel, PanelId::Panel2);
        assert_eq!(spec.translation, "NIV");
        assert_eq!(spec.book_abbr, "Gen");
        assert_eq!(spec.chapter, 1);

        let panel = set.get(PanelId::Panel2).unwrap();
        assert!(panel.loading);
        assert!(panel.verses.is_empty());
    }

    #[test]
    fn readding_after_remove_reuses_the_free_slot_in_order() {
        let mut set = PanelSet::new(primary());
        set.add_panel();
        set.add_panel();
        set.remove_panel(PanelId::Panel2);
        let spec = set.add_panel().unwrap();
        assert_eq!(spec.panel, PanelId::Panel2);
        let ids: Vec<_> = set.panels().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![PanelId::Panel1, PanelId::Panel2, PanelId::Panel3]);
    }

    #[test]
    fn primary_navigation_routes_instead_of_fetching() {
        let mut set = PanelSet::new(primary());
        let catalog = catalog();
        let effect = set.navigate(PanelId::Panel1, &catalog, "Exo", 3);
        match effect {
            Effect::Route(route) => {
                assert_eq!(route.book_abbr, "Exo");
                assert_eq!(route.book_name, "Exodus");
                assert_eq!(route.chapter, 3);
                assert_eq!(route.translation, "korHRV");
            }
            other => panic!("expected route, got {other:?}"),
        }
        // The panel itself is untouched until the route is applied.
        assert_eq!(set.primary().book_abbr, "Gen");
    }

    #[test]
    fn out_of_range_chapter_is_rejected_before_any_mutation() {
        let mut set = PanelSet::new(primary());
        let catalog = catalog();
        set.add_panel();
        let before = set.clone();

        assert_eq!(set.navigate(PanelId::Panel2, &catalog, "Gen", 0), Effect::None);
        assert_eq!(set.navigate(PanelId::Panel2, &catalog, "Gen", 51), Effect::None);
        assert_eq!(set.navigate(PanelId::Panel2, &catalog, "Nope", 1), Effect::None);
        assert_eq!(set, before);
    }

    #[test]
    fn secondary_translation_change_refetches_in_place() {
        let mut set = PanelSet::new(primary());
        set.add_panel();
        let effect = set.set_translation(PanelId::Panel2, "korHRV");
        match effect {
            Effect::Fetch(spec) => {
                assert_eq!(spec.translation, "korHRV");
                assert_eq!(spec.book_abbr, "Gen");
            }
            other => panic!("expected fetch, got {other:?}"),
        }
        assert!(set.get(PanelId::Panel2).unwrap().loading);
    }

    #[test]
    fn chapter_stepping_respects_bounds() {
        let mut set = PanelSet::new(primary());
        let catalog = catalog();
        assert_eq!(set.step_back(PanelId::Panel1, &catalog), Effect::None);
        match set.step_forward(PanelId::Panel1, &catalog) {
            Effect::Route(route) => assert_eq!(route.chapter, 2),
            other => panic!("expected route, got {other:?}"),
        }
    }

    #[test]
    fn stale_fetch_is_discarded_by_generation_guard() {
        let mut set = PanelSet::new(primary());
        let catalog = catalog();
        set.add_panel();

        // Navigate to chapter 3, then chapter 4 before the first fetch
        // resolves.
        let Effect::Fetch(spec3) = set.navigate(PanelId::Panel2, &catalog, "Gen", 3) else {
            panic!("expected fetch");
        };
        let Effect::Fetch(spec4) = set.navigate(PanelId::Panel2, &catalog, "Gen", 4) else {
            panic!("expected fetch");
        };

        // Chapter 4 resolves first, chapter 3 arrives late.
        set.apply_fetch(FetchOutcome {
            panel: spec4.panel,
            generation: spec4.generation,
            result: Ok(data_for(4)),
        });
        set.apply_fetch(FetchOutcome {
            panel: spec3.panel,
            generation: spec3.generation,
            result: Ok(data_for(3)),
        });

        let panel = set.get(PanelId::Panel2).unwrap();
        assert_eq!(panel.verses, verses_for(4));
        assert!(!panel.loading);
    }

    #[test]
    fn fetch_for_removed_panel_is_discarded_harmlessly() {
        let mut set = PanelSet::new(primary());
        let spec = set.add_panel().unwrap();
        set.remove_panel(PanelId::Panel2);
        set.apply_fetch(FetchOutcome {
            panel: spec.panel,
            generation: spec.generation,
            result: Ok(data_for(1)),
        });
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn failed_fetch_surfaces_on_the_panel() {
        let mut set = PanelSet::new(primary());
        let spec = set.add_panel().unwrap();
        set.apply_fetch(FetchOutcome {
            panel: spec.panel,
            generation: spec.generation,
            result: Err(ApiError::Network("connection refused".to_string())),
        });
        let panel = set.get(PanelId::Panel2).unwrap();
        assert!(!panel.loading);
        assert!(panel.error.as_deref().unwrap().contains("connection refused"));
    }

    #[test]
    fn snapshots_cover_exactly_the_secondary_slice() {
        let mut set = PanelSet::new(primary());
        assert!(set.snapshots().is_empty());
        set.add_panel();
        set.add_panel();
        let snapshots = set.snapshots();
        assert_eq!(snapshots.len(), set.len() - 1);
        assert_eq!(snapshots[0].book_abbr, "Gen");
    }

    #[test]
    fn restore_snapshots_caps_at_two_secondaries() {
        let mut set = PanelSet::new(primary());
        let snapshot = PanelSnapshot {
            translation: "NIV".to_string(),
            book_abbr: "Exo".to_string(),
            book_name: "Exodus".to_string(),
            chapter: 2,
        };
        let specs = set.restore_snapshots(&[snapshot.clone(), snapshot.clone(), snapshot]);
        assert_eq!(specs.len(), 2);
        assert_eq!(set.len(), 3);
        assert_eq!(set.get(PanelId::Panel2).unwrap().chapter, 2);
    }

    #[test]
    fn apply_route_rebuilds_primary_and_returns_fetch() {
        let mut set = PanelSet::new(primary());
        let route = RouteChange {
            translation: "NIV".to_string(),
            book_abbr: "Exo".to_string(),
            book_name: "Exodus".to_string(),
            chapter: 3,
        };
        let spec = set.apply_route(&route);
        assert_eq!(spec.panel, PanelId::Panel1);
        assert_eq!(spec.translation, "NIV");
        let primary = set.primary();
        assert_eq!(primary.book_abbr, "Exo");
        assert!(primary.loading);
        assert!(primary.verses.is_empty());
    }
}
