//! Popup state machines for the per-verse context menu and the note
//! modal. Both are plain value types; opening one from the other is the
//! orchestration layer's job.

use lectio_core::VerseId;

/// Screen cell the context menu is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    pub x: u16,
    pub y: u16,
}

/// The verse context menu. The color picker is a sub-state of an open
/// menu, never a free-standing popup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContextMenuState {
    #[default]
    Closed,
    Open { verse: VerseId, anchor: Anchor },
    ColorPicker { verse: VerseId, anchor: Anchor },
}

impl ContextMenuState {
    pub fn open_at(&mut self, verse: VerseId, anchor: Anchor) {
        *self = ContextMenuState::Open { verse, anchor };
    }

    /// Flips between the action list and the color swatch row, keeping
    /// the verse and anchor. No-op while closed.
    pub fn toggle_color_picker(&mut self) {
        *self = match *self {
            ContextMenuState::Open { verse, anchor } => {
                ContextMenuState::ColorPicker { verse, anchor }
            }
            ContextMenuState::ColorPicker { verse, anchor } => {
                ContextMenuState::Open { verse, anchor }
            }
            ContextMenuState::Closed => ContextMenuState::Closed,
        };
    }

    pub fn close(&mut self) {
        *self = ContextMenuState::Closed;
    }

    pub fn is_open(&self) -> bool {
        !matches!(self, ContextMenuState::Closed)
    }

    pub fn verse(&self) -> Option<VerseId> {
        match self {
            ContextMenuState::Closed => None,
            ContextMenuState::Open { verse, .. } | ContextMenuState::ColorPicker { verse, .. } => {
                Some(*verse)
            }
        }
    }
}

/// The note modal: read-only view for an existing note, free-text edit
/// otherwise (or after entering edit from view).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NoteModalState {
    #[default]
    Closed,
    Viewing { verse: VerseId, content: String },
    Editing { verse: VerseId, draft: String },
}

impl NoteModalState {
    /// Opens the modal for a verse: viewing when a note exists, a blank
    /// editor otherwise.
    pub fn open(&mut self, verse: VerseId, existing: Option<&str>) {
        *self = match existing {
            Some(content) => NoteModalState::Viewing { verse, content: content.to_string() },
            None => NoteModalState::Editing { verse, draft: String::new() },
        };
    }

    /// Switches from viewing to editing, seeding the draft with the
    /// current content. No-op in any other state.
    pub fn edit(&mut self) {
        if let NoteModalState::Viewing { verse, content } = self {
            *self = NoteModalState::Editing { verse: *verse, draft: std::mem::take(content) };
        }
    }

    pub fn close(&mut self) {
        *self = NoteModalState::Closed;
    }

    pub fn is_open(&self) -> bool {
        !matches!(self, NoteModalState::Closed)
    }

    pub fn verse(&self) -> Option<VerseId> {
        match self {
            NoteModalState::Closed => None,
            NoteModalState::Viewing { verse, .. } | NoteModalState::Editing { verse, .. } => {
                Some(*verse)
            }
        }
    }

    pub fn draft_mut(&mut self) -> Option<&mut String> {
        match self {
            NoteModalState::Editing { draft, .. } => Some(draft),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const V: VerseId = VerseId(42);
    const AT: Anchor = Anchor { x: 10, y: 4 };

    #[test]
    fn menu_opens_anchored_to_the_clicked_cell() {
        let mut menu = ContextMenuState::default();
        assert!(!menu.is_open());
        menu.open_at(V, AT);
        assert_eq!(menu, ContextMenuState::Open { verse: V, anchor: AT });
        assert_eq!(menu.verse(), Some(V));
    }

    #[test]
    fn double_toggle_returns_to_the_action_list() {
        let mut menu = ContextMenuState::default();
        menu.open_at(V, AT);
        menu.toggle_color_picker();
        assert_eq!(menu, ContextMenuState::ColorPicker { verse: V, anchor: AT });
        menu.toggle_color_picker();
        assert_eq!(menu, ContextMenuState::Open { verse: V, anchor: AT });
    }

    #[test]
    fn toggling_a_closed_menu_stays_closed() {
        let mut menu = ContextMenuState::default();
        menu.toggle_color_picker();
        assert_eq!(menu, ContextMenuState::Closed);
    }

    #[test]
    fn modal_opens_viewing_when_a_note_exists() {
        let mut modal = NoteModalState::default();
        modal.open(V, Some("amen"));
        assert_eq!(
            modal,
            NoteModalState::Viewing { verse: V, content: "amen".to_string() }
        );
        assert!(modal.draft_mut().is_none());
    }

    #[test]
    fn modal_opens_blank_editor_without_a_note() {
        let mut modal = NoteModalState::default();
        modal.open(V, None);
        assert_eq!(modal, NoteModalState::Editing { verse: V, draft: String::new() });
        modal.draft_mut().unwrap().push_str("new thought");
        assert_eq!(
            modal,
            NoteModalState::Editing { verse: V, draft: "new thought".to_string() }
        );
    }

    #[test]
    fn edit_seeds_draft_from_viewed_content() {
        let mut modal = NoteModalState::default();
        modal.open(V, Some("amen"));
        modal.edit();
        assert_eq!(modal, NoteModalState::Editing { verse: V, draft: "amen".to_string() });
        // Editing again is a no-op.
        modal.edit();
        assert_eq!(modal.draft_mut().map(|d| d.clone()), Some("amen".to_string()));
    }

    #[test]
    fn close_always_resets() {
        let mut modal = NoteModalState::default();
        modal.open(V, None);
        modal.close();
        assert_eq!(modal, NoteModalState::Closed);
        assert_eq!(modal.verse(), None);
    }
}
