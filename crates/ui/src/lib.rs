//! ratatui-based UI.

use std::io::{self, Stdout};
use std::sync::mpsc::{Receiver, Sender};
use std::time::Duration;

use anyhow::Context as _;
use application::{
    Anchor, AnnotationApi, AppContext, ContextMenuState, Effect, FetchOutcome, FetchSpec,
    NoteModalState, Notice,
};
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{event, terminal};
use lectio_core::{
    FontWeight, HighlightColor, PanelId, TRANSLATIONS, VerseId, translation_name,
};
use lectio_storage::Store;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{
    Block, Borders, Clear, HighlightSpacing, List, ListItem, ListState, Paragraph, Wrap,
};
use unicode_width::UnicodeWidthStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiExit {
    Quit,
}

pub struct Ui {
    ctx: AppContext,
    store: Store,
    annotation_api: Box<dyn AnnotationApi>,
    fetch_tx: Sender<FetchSpec>,
    outcome_rx: Receiver<FetchOutcome>,
    focus: PanelId,
    cursor: usize,
    scroll: usize,
    primary_area: Rect,
    picker_panel: PickerPanel,
    translation_panel: TranslationPanel,
    font_panel: FontPanel,
    menu_selected: usize,
    color_selected: usize,
}

impl Ui {
    pub fn new(
        ctx: AppContext,
        store: Store,
        annotation_api: Box<dyn AnnotationApi>,
        fetch_tx: Sender<FetchSpec>,
        outcome_rx: Receiver<FetchOutcome>,
    ) -> Self {
        let mut ctx = ctx;
        ctx.prefs.normalize();
        Self {
            ctx,
            store,
            annotation_api,
            fetch_tx,
            outcome_rx,
            focus: PanelId::Panel1,
            cursor: 0,
            scroll: 0,
            primary_area: Rect::default(),
            picker_panel: PickerPanel::default(),
            translation_panel: TranslationPanel::default(),
            font_panel: FontPanel::default(),
            menu_selected: 0,
            color_selected: 0,
        }
    }

    pub fn run(&mut self) -> anyhow::Result<UiExit> {
        let mut terminal = setup_terminal()?;
        terminal.clear().ok();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.event_loop(&mut terminal)
        }));
        let restore_result = restore_terminal(&mut terminal);

        match (result, restore_result) {
            (Ok(Ok(exit)), Ok(())) => Ok(exit),
            (Ok(Ok(_)), Err(err)) => Err(err),
            (Ok(Err(err)), _) => Err(err),
            (Err(panic), Ok(())) => Err(anyhow::anyhow!(panic_to_string(panic))),
            (Err(panic), Err(err)) => Err(anyhow::anyhow!(
                "{}\n(additionally failed to restore terminal: {err})",
                panic_to_string(panic)
            )),
        }
    }

    fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    ) -> anyhow::Result<UiExit> {
        let tick_rate = Duration::from_millis(250);
        let mut needs_redraw = true;

        loop {
            if self.drain_fetch_outcomes() {
                needs_redraw = true;
            }

            if needs_redraw {
                terminal.draw(|frame| self.draw(frame.area(), frame))?;
                needs_redraw = false;
            }

            if !event::poll(tick_rate)? {
                continue;
            }

            match event::read()? {
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                Event::Key(key) => {
                    if key.kind == KeyEventKind::Release {
                        continue;
                    }

                    needs_redraw = true;

                    if self.ctx.notice.is_some() {
                        self.handle_notice_key(key);
                    } else if self.ctx.note_modal.is_open() {
                        self.handle_note_modal_key(key);
                    } else if self.ctx.context_menu.is_open() {
                        self.handle_context_menu_key(key);
                    } else if self.picker_panel.open {
                        self.handle_picker_key(key)?;
                    } else if self.translation_panel.open {
                        self.handle_translation_key(key)?;
                    } else if self.font_panel.open {
                        self.handle_font_key(key)?;
                    } else if let Some(exit) = self.handle_main_key(key)? {
                        return Ok(exit);
                    }
                }
                _ => {}
            }
        }
    }

    /// Applies every resolved fetch waiting on the channel. Stale and
    /// orphaned outcomes are discarded inside `apply_fetch`. A resolved
    /// secondary fetch can change snapshot content (the server's book
    /// fields), so the snapshots are re-persisted afterwards.
    fn drain_fetch_outcomes(&mut self) -> bool {
        let mut any = false;
        let mut secondary = false;
        while let Ok(outcome) = self.outcome_rx.try_recv() {
            if !outcome.panel.is_primary() {
                secondary = true;
            }
            self.ctx.panels.apply_fetch(outcome);
            any = true;
        }
        if any {
            self.clamp_cursor();
        }
        if secondary {
            self.persist_panels();
        }
        any
    }

    fn handle_main_key(&mut self, key: KeyEvent) -> anyhow::Result<Option<UiExit>> {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => return Ok(Some(UiExit::Quit)),
            KeyCode::Tab => self.cycle_focus(),
            KeyCode::Up => self.move_cursor(-1),
            KeyCode::Down => self.move_cursor(1),
            KeyCode::Left => {
                let effect = self.ctx.panels.step_back(self.focus, &self.ctx.catalog);
                self.run_effect(effect)?;
            }
            KeyCode::Right => {
                let effect = self.ctx.panels.step_forward(self.focus, &self.ctx.catalog);
                self.run_effect(effect)?;
            }
            KeyCode::Enter => self.open_context_menu(),
            KeyCode::Char('p') => {
                if let Some(spec) = self.ctx.panels.add_panel() {
                    self.send_fetch(spec)?;
                    self.persist_panels();
                }
            }
            KeyCode::Char('x') => {
                if self.ctx.panels.remove_panel(self.focus) {
                    self.focus = PanelId::Panel1;
                    self.persist_panels();
                }
            }
            KeyCode::Char('t') => {
                self.translation_panel.open_for(self.focus, self.focused_translation());
            }
            KeyCode::Char('g') => {
                self.picker_panel.open_for(self.focus);
            }
            KeyCode::Char('b') => {
                self.ctx.toggle_chapter_bookmark();
                self.persist_chapter_bookmarks();
            }
            KeyCode::Char('f') => {
                self.font_panel.open = true;
                self.font_panel.selected = 0;
            }
            _ => {}
        }
        Ok(None)
    }

    fn handle_notice_key(&mut self, key: KeyEvent) {
        if matches!(key.code, KeyCode::Esc | KeyCode::Enter) {
            self.ctx.dismiss_notice();
        }
    }

    fn handle_context_menu_key(&mut self, key: KeyEvent) {
        match self.ctx.context_menu {
            ContextMenuState::Open { verse, .. } => match key.code {
                KeyCode::Esc => self.ctx.context_menu.close(),
                KeyCode::Up => {
                    self.menu_selected = self.menu_selected.saturating_sub(1);
                }
                KeyCode::Down => {
                    self.menu_selected = (self.menu_selected + 1).min(MENU_ITEMS.len() - 1);
                }
                KeyCode::Enter => self.run_menu_action(verse),
                _ => {}
            },
            ContextMenuState::ColorPicker { .. } => match key.code {
                KeyCode::Esc => self.ctx.context_menu.toggle_color_picker(),
                KeyCode::Left => {
                    self.color_selected = self.color_selected.saturating_sub(1);
                }
                KeyCode::Right => {
                    self.color_selected =
                        (self.color_selected + 1).min(HighlightColor::ALL.len() - 1);
                }
                KeyCode::Enter => {
                    let color = HighlightColor::ALL[self.color_selected];
                    self.ctx.select_highlight_color(self.annotation_api.as_ref(), color);
                }
                _ => {}
            },
            ContextMenuState::Closed => {}
        }
    }

    fn run_menu_action(&mut self, verse: VerseId) {
        match MENU_ITEMS[self.menu_selected] {
            MenuItem::Highlight => {
                self.color_selected = self
                    .ctx
                    .annotations
                    .highlight(verse)
                    .and_then(|c| HighlightColor::ALL.iter().position(|x| *x == c))
                    .unwrap_or(0);
                self.ctx.context_menu.toggle_color_picker();
            }
            MenuItem::RemoveHighlight => {
                self.ctx.remove_highlight_clicked(self.annotation_api.as_ref());
            }
            MenuItem::Note => self.ctx.open_note_modal(),
            MenuItem::Bookmark => {
                self.ctx.toggle_verse_bookmark(self.annotation_api.as_ref());
            }
        }
    }

    fn handle_note_modal_key(&mut self, key: KeyEvent) {
        match &mut self.ctx.note_modal {
            NoteModalState::Viewing { .. } => match key.code {
                KeyCode::Esc => self.ctx.note_modal.close(),
                KeyCode::Char('e') => self.ctx.note_modal.edit(),
                KeyCode::Char('d') => self.ctx.delete_note(self.annotation_api.as_ref()),
                _ => {}
            },
            NoteModalState::Editing { draft, .. } => match key.code {
                KeyCode::Esc => self.ctx.note_modal.close(),
                KeyCode::Enter => self.ctx.save_note(self.annotation_api.as_ref()),
                KeyCode::Backspace => {
                    draft.pop();
                }
                KeyCode::Char(c) => draft.push(c),
                _ => {}
            },
            NoteModalState::Closed => {}
        }
    }

    fn handle_picker_key(&mut self, key: KeyEvent) -> anyhow::Result<()> {
        let books = self.ctx.catalog.books.len();
        match self.picker_panel.stage {
            PickerStage::Book => match key.code {
                KeyCode::Esc => self.picker_panel.open = false,
                KeyCode::Up => {
                    self.picker_panel.book_selected =
                        self.picker_panel.book_selected.saturating_sub(1);
                }
                KeyCode::Down => {
                    if books > 0 {
                        self.picker_panel.book_selected =
                            (self.picker_panel.book_selected + 1).min(books - 1);
                    }
                }
                KeyCode::Enter => {
                    if books > 0 {
                        self.picker_panel.stage = PickerStage::Chapter;
                        self.picker_panel.chapter_selected = 0;
                    }
                }
                _ => {}
            },
            PickerStage::Chapter => {
                let chapters = self
                    .ctx
                    .catalog
                    .books
                    .get(self.picker_panel.book_selected)
                    .map(|b| b.chapters as usize)
                    .unwrap_or(0);
                match key.code {
                    KeyCode::Esc => self.picker_panel.stage = PickerStage::Book,
                    KeyCode::Up => {
                        self.picker_panel.chapter_selected =
                            self.picker_panel.chapter_selected.saturating_sub(1);
                    }
                    KeyCode::Down => {
                        if chapters > 0 {
                            self.picker_panel.chapter_selected =
                                (self.picker_panel.chapter_selected + 1).min(chapters - 1);
                        }
                    }
                    KeyCode::Enter => {
                        let target = self.picker_panel.target;
                        let abbr = self
                            .ctx
                            .catalog
                            .books
                            .get(self.picker_panel.book_selected)
                            .map(|b| b.abbr.clone());
                        if let Some(abbr) = abbr {
                            let chapter = self.picker_panel.chapter_selected as u32 + 1;
                            self.picker_panel.open = false;
                            let effect =
                                self.ctx.panels.navigate(target, &self.ctx.catalog, &abbr, chapter);
                            self.run_effect(effect)?;
                        }
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    fn handle_translation_key(&mut self, key: KeyEvent) -> anyhow::Result<()> {
        match key.code {
            KeyCode::Esc => self.translation_panel.open = false,
            KeyCode::Up => {
                self.translation_panel.selected =
                    self.translation_panel.selected.saturating_sub(1);
            }
            KeyCode::Down => {
                self.translation_panel.selected =
                    (self.translation_panel.selected + 1).min(TRANSLATIONS.len() - 1);
            }
            KeyCode::Enter => {
                let entry = TRANSLATIONS[self.translation_panel.selected];
                // Unavailable translations are listed but not selectable.
                if entry.available {
                    let target = self.translation_panel.target;
                    self.translation_panel.open = false;
                    let effect = self.ctx.panels.set_translation(target, entry.code);
                    self.run_effect(effect)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_font_key(&mut self, key: KeyEvent) -> anyhow::Result<()> {
        match key.code {
            KeyCode::Esc | KeyCode::Char('f') => self.font_panel.open = false,
            KeyCode::Up => self.font_panel.selected = 0,
            KeyCode::Down => self.font_panel.selected = 1,
            KeyCode::Left | KeyCode::Right => {
                if self.font_panel.selected == 0 {
                    let delta: i16 = if key.code == KeyCode::Left { -1 } else { 1 };
                    let size = self.ctx.prefs.font_size as i16 + delta;
                    self.ctx.prefs.font_size = size.clamp(1, 5) as u8;
                } else {
                    self.ctx.prefs.font_weight = match self.ctx.prefs.font_weight {
                        FontWeight::Normal => FontWeight::Bold,
                        FontWeight::Bold => FontWeight::Normal,
                    };
                }
                self.ctx.prefs.normalize();
                if let Err(err) = self.store.save_preferences(&self.ctx.prefs) {
                    log::warn!("failed to persist preferences: {err:#}");
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Performs a transition's side effect: primary route changes loop
    /// back through `apply_route`, fetches go to the worker.
    fn run_effect(&mut self, effect: Effect) -> anyhow::Result<()> {
        match effect {
            Effect::None => {}
            Effect::Fetch(spec) => {
                self.send_fetch(spec)?;
                self.persist_panels();
            }
            Effect::Route(route) => {
                let spec = self.ctx.panels.apply_route(&route);
                self.cursor = 0;
                self.scroll = 0;
                self.send_fetch(spec)?;
            }
        }
        Ok(())
    }

    fn send_fetch(&self, spec: FetchSpec) -> anyhow::Result<()> {
        self.fetch_tx.send(spec).context("fetch worker is gone")
    }

    fn persist_panels(&self) {
        if let Err(err) = self.store.save_panel_snapshots(&self.ctx.panels.snapshots()) {
            log::warn!("failed to persist panel snapshots: {err:#}");
        }
    }

    fn persist_chapter_bookmarks(&self) {
        if let Err(err) = self.store.save_chapter_bookmarks(&self.ctx.chapter_bookmarks) {
            log::warn!("failed to persist chapter bookmarks: {err:#}");
        }
    }

    fn cycle_focus(&mut self) {
        let panels = self.ctx.panels.panels();
        let current = panels.iter().position(|p| p.id == self.focus).unwrap_or(0);
        self.focus = panels[(current + 1) % panels.len()].id;
    }

    fn focused_translation(&self) -> String {
        self.ctx
            .panels
            .get(self.focus)
            .map(|p| p.translation.clone())
            .unwrap_or_default()
    }

    /// The verse cursor lives on the primary panel only; that is where
    /// annotation interaction happens.
    fn move_cursor(&mut self, delta: i32) {
        if self.focus != PanelId::Panel1 {
            return;
        }
        let count = self.ctx.panels.primary().verses.len();
        if count == 0 {
            return;
        }
        let next = self.cursor as i32 + delta;
        self.cursor = next.clamp(0, count as i32 - 1) as usize;
        let viewport = self.primary_area.height.saturating_sub(2) as usize;
        self.scroll = scroll_to_cursor(self.cursor, self.scroll, viewport);
    }

    fn clamp_cursor(&mut self) {
        let count = self.ctx.panels.primary().verses.len();
        if count == 0 {
            self.cursor = 0;
            self.scroll = 0;
        } else if self.cursor >= count {
            self.cursor = count - 1;
        }
    }

    fn open_context_menu(&mut self) {
        if self.focus != PanelId::Panel1 {
            return;
        }
        let Some(verse) = self.ctx.panels.primary().verses.get(self.cursor) else {
            return;
        };
        let verse = verse.id;
        let anchor = cursor_anchor(self.primary_area, self.cursor, self.scroll);
        self.menu_selected = 0;
        self.ctx.verse_clicked(verse, anchor);
    }

    fn draw(&mut self, area: Rect, frame: &mut ratatui::Frame) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(0), Constraint::Length(1)])
            .split(area);

        self.draw_header(rows[0], frame);
        self.draw_panels(rows[1], frame);
        self.draw_footer(rows[2], frame);

        if self.picker_panel.open {
            self.draw_picker_panel(area, frame);
        }
        if self.translation_panel.open {
            self.draw_translation_panel(area, frame);
        }
        if self.font_panel.open {
            self.draw_font_panel(area, frame);
        }
        match self.ctx.context_menu {
            ContextMenuState::Open { anchor, .. } => self.draw_context_menu(area, anchor, frame),
            ContextMenuState::ColorPicker { anchor, .. } => {
                self.draw_color_picker(area, anchor, frame)
            }
            ContextMenuState::Closed => {}
        }
        if self.ctx.note_modal.is_open() {
            self.draw_note_modal(area, frame);
        }
        if self.ctx.notice.is_some() {
            self.draw_notice(area, frame);
        }
    }

    fn draw_header(&self, area: Rect, frame: &mut ratatui::Frame) {
        let primary = self.ctx.panels.primary();
        let mut spans = vec![
            Span::styled(
                format!("{} {}", primary.book_name, primary.chapter),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::raw(translation_name(&primary.translation).to_string()),
        ];
        if self.ctx.is_chapter_bookmarked(&primary.book_abbr, primary.chapter) {
            spans.push(Span::raw("  "));
            spans.push(Span::styled("⚑", Style::default().fg(Color::Yellow)));
        }
        if let Some(user) = &self.ctx.session.user {
            spans.push(Span::raw("  "));
            spans.push(Span::styled(
                user.clone(),
                Style::default().add_modifier(Modifier::DIM),
            ));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn draw_footer(&self, area: Rect, frame: &mut ratatui::Frame) {
        let help = Line::from(vec![
            Span::styled("↑↓", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" verse  "),
            Span::styled("←→", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" chapter  "),
            Span::styled("Enter", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" actions  "),
            Span::styled("Tab", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" focus  "),
            Span::styled("p", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" panel  "),
            Span::styled("x", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" close  "),
            Span::styled("t", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" translation  "),
            Span::styled("g", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" go  "),
            Span::styled("b", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" bookmark  "),
            Span::styled("f", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" fonts  "),
            Span::styled("Esc", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" quit"),
        ]);
        frame.render_widget(Paragraph::new(help).alignment(Alignment::Center), area);
    }

    fn draw_panels(&mut self, area: Rect, frame: &mut ratatui::Frame) {
        let count = self.ctx.panels.len() as u32;
        let constraints: Vec<Constraint> =
            (0..count).map(|_| Constraint::Ratio(1, count)).collect();
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(constraints)
            .split(area);

        let panels: Vec<_> = self.ctx.panels.panels().to_vec();
        for (panel, column) in panels.iter().zip(columns.iter()) {
            if panel.id == PanelId::Panel1 {
                self.primary_area = *column;
            }
            self.draw_panel(panel, *column, frame);
        }
    }

    fn draw_panel(&self, panel: &lectio_core::Panel, area: Rect, frame: &mut ratatui::Frame) {
        let focused = panel.id == self.focus;
        let border_style = if focused {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default()
        };
        let title = format!(
            " {} {} · {} ",
            panel.book_name,
            panel.chapter,
            translation_name(&panel.translation)
        );
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(Span::styled(title, Style::default().add_modifier(Modifier::BOLD)));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if panel.loading {
            frame.render_widget(Paragraph::new(Line::raw("Loading…")), inner);
            return;
        }
        if let Some(error) = &panel.error {
            let text = Paragraph::new(Line::styled(
                error.clone(),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ))
            .wrap(Wrap { trim: true });
            frame.render_widget(text, inner);
            return;
        }
        if panel.verses.is_empty() {
            frame.render_widget(Paragraph::new(Line::raw("(no verses)")), inner);
            return;
        }

        let text_width = inner.width.saturating_sub(5) as usize;
        let base_style = match self.ctx.prefs.font_weight {
            FontWeight::Bold => Style::default().add_modifier(Modifier::BOLD),
            FontWeight::Normal => Style::default(),
        };

        let items: Vec<ListItem> = panel
            .verses
            .iter()
            .map(|verse| {
                let mut style = base_style;
                let mut markers = String::new();
                if panel.id == PanelId::Panel1 {
                    if let Some(color) = self.ctx.annotations.highlight(verse.id) {
                        style = style.bg(highlight_bg(color)).fg(Color::Black);
                    }
                    if self.ctx.annotations.note(verse.id).is_some() {
                        markers.push('✎');
                    }
                    if self.ctx.annotations.is_bookmarked(verse.id) {
                        markers.push('⚑');
                    }
                }
                let mut lines = Vec::new();
                for (i, row) in wrap_text(&verse.text, text_width).into_iter().enumerate() {
                    let prefix = if i == 0 {
                        format!("{:>3} ", verse.verse)
                    } else {
                        "    ".to_string()
                    };
                    let mut spans = vec![
                        Span::styled(prefix, Style::default().add_modifier(Modifier::DIM)),
                        Span::styled(row, style),
                    ];
                    if i == 0 && !markers.is_empty() {
                        spans.push(Span::styled(
                            format!(" {markers}"),
                            Style::default().fg(Color::Yellow),
                        ));
                    }
                    lines.push(Line::from(spans));
                }
                ListItem::new(Text::from(lines))
            })
            .collect();

        let mut list = List::new(items);
        if panel.id == PanelId::Panel1 {
            list = list
                .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
                .highlight_symbol("")
                .highlight_spacing(HighlightSpacing::Never);
            let mut state = ListState::default();
            state.select(Some(self.cursor.min(panel.verses.len() - 1)));
            *state.offset_mut() = self.scroll;
            frame.render_stateful_widget(list, inner, &mut state);
        } else {
            frame.render_widget(list, inner);
        }
    }

    fn draw_context_menu(&self, area: Rect, anchor: Anchor, frame: &mut ratatui::Frame) {
        let popup = anchored_rect(area, anchor, 22, MENU_ITEMS.len() as u16 + 2);
        frame.render_widget(Clear, popup);
        let block = Block::default()
            .borders(Borders::ALL)
            .title(Span::styled("Verse", Style::default().add_modifier(Modifier::BOLD)));
        let inner = block.inner(popup);
        frame.render_widget(block, popup);

        let items: Vec<ListItem> = MENU_ITEMS
            .iter()
            .map(|item| ListItem::new(Line::raw(item.label())))
            .collect();
        let list = List::new(items)
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol("> ")
            .highlight_spacing(HighlightSpacing::Always);
        let mut state = ListState::default();
        state.select(Some(self.menu_selected));
        frame.render_stateful_widget(list, inner, &mut state);
    }

    fn draw_color_picker(&self, area: Rect, anchor: Anchor, frame: &mut ratatui::Frame) {
        let width = HighlightColor::ALL.len() as u16 * 3 + 2;
        let popup = anchored_rect(area, anchor, width, 3);
        frame.render_widget(Clear, popup);
        let block = Block::default()
            .borders(Borders::ALL)
            .title(Span::styled("Color", Style::default().add_modifier(Modifier::BOLD)));
        let inner = block.inner(popup);
        frame.render_widget(block, popup);

        let mut spans = Vec::new();
        for (i, color) in HighlightColor::ALL.iter().enumerate() {
            let mut style = Style::default().bg(highlight_bg(*color)).fg(Color::Black);
            if i == self.color_selected {
                style = style.add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
            }
            spans.push(Span::styled(" ● ", style));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), inner);
    }

    fn draw_note_modal(&self, area: Rect, frame: &mut ratatui::Frame) {
        let popup = centered_rect(60, 50, area);
        frame.render_widget(Clear, popup);

        let (title, body, footer) = match &self.ctx.note_modal {
            NoteModalState::Viewing { content, .. } => (
                "Note",
                content.clone(),
                vec![
                    Span::styled("e", Style::default().add_modifier(Modifier::BOLD)),
                    Span::raw(" edit  "),
                    Span::styled("d", Style::default().add_modifier(Modifier::BOLD)),
                    Span::raw(" delete  "),
                    Span::styled("Esc", Style::default().add_modifier(Modifier::BOLD)),
                    Span::raw(" close"),
                ],
            ),
            NoteModalState::Editing { draft, .. } => (
                "Note — Edit",
                format!("{draft}▌"),
                vec![
                    Span::styled("Enter", Style::default().add_modifier(Modifier::BOLD)),
                    Span::raw(" save  "),
                    Span::styled("Esc", Style::default().add_modifier(Modifier::BOLD)),
                    Span::raw(" cancel"),
                ],
            ),
            NoteModalState::Closed => return,
        };

        let block = Block::default().borders(Borders::ALL).title(Span::styled(
            title,
            Style::default().add_modifier(Modifier::BOLD),
        ));
        let inner = block.inner(popup);
        frame.render_widget(block, popup);

        let sections = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(inner);

        let body = Paragraph::new(Text::raw(body)).wrap(Wrap { trim: false });
        frame.render_widget(body, sections[0]);
        let footer = Paragraph::new(Line::from(footer)).alignment(Alignment::Center);
        frame.render_widget(footer, sections[1]);
    }

    fn draw_picker_panel(&self, area: Rect, frame: &mut ratatui::Frame) {
        let popup = centered_rect(40, 70, area);
        frame.render_widget(Clear, popup);

        let (title, items, selected) = match self.picker_panel.stage {
            PickerStage::Book => (
                "Book",
                self.ctx
                    .catalog
                    .books
                    .iter()
                    .map(|b| ListItem::new(Line::raw(b.name.clone())))
                    .collect::<Vec<_>>(),
                self.picker_panel.book_selected,
            ),
            PickerStage::Chapter => {
                let chapters = self
                    .ctx
                    .catalog
                    .books
                    .get(self.picker_panel.book_selected)
                    .map(|b| b.chapters)
                    .unwrap_or(0);
                (
                    "Chapter",
                    (1..=chapters)
                        .map(|c| ListItem::new(Line::raw(c.to_string())))
                        .collect(),
                    self.picker_panel.chapter_selected,
                )
            }
        };

        let block = Block::default().borders(Borders::ALL).title(Span::styled(
            title,
            Style::default().add_modifier(Modifier::BOLD),
        ));
        let inner = block.inner(popup);
        frame.render_widget(block, popup);

        let list = List::new(items)
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol("> ")
            .highlight_spacing(HighlightSpacing::Always);
        let mut state = ListState::default();
        state.select(Some(selected));
        frame.render_stateful_widget(list, inner, &mut state);
    }

    fn draw_translation_panel(&self, area: Rect, frame: &mut ratatui::Frame) {
        let popup = centered_rect(40, 40, area);
        frame.render_widget(Clear, popup);

        let block = Block::default().borders(Borders::ALL).title(Span::styled(
            "Translation",
            Style::default().add_modifier(Modifier::BOLD),
        ));
        let inner = block.inner(popup);
        frame.render_widget(block, popup);

        let items: Vec<ListItem> = TRANSLATIONS
            .iter()
            .map(|t| {
                let label = if t.available {
                    Line::raw(t.name)
                } else {
                    Line::styled(
                        format!("{} (unavailable)", t.name),
                        Style::default().add_modifier(Modifier::DIM),
                    )
                };
                ListItem::new(label)
            })
            .collect();
        let list = List::new(items)
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol("> ")
            .highlight_spacing(HighlightSpacing::Always);
        let mut state = ListState::default();
        state.select(Some(self.translation_panel.selected));
        frame.render_stateful_widget(list, inner, &mut state);
    }

    fn draw_font_panel(&self, area: Rect, frame: &mut ratatui::Frame) {
        let popup = centered_rect(40, 25, area);
        frame.render_widget(Clear, popup);

        let block = Block::default().borders(Borders::ALL).title(Span::styled(
            "Display",
            Style::default().add_modifier(Modifier::BOLD),
        ));
        let inner = block.inner(popup);
        frame.render_widget(block, popup);

        let row = |label: &str, value: String, selected: bool| {
            let mut style = Style::default();
            if selected {
                style = style.add_modifier(Modifier::REVERSED);
            }
            Line::from(vec![
                Span::styled(format!("{label}: "), Style::default().add_modifier(Modifier::BOLD)),
                Span::styled(format!("◂ {value} ▸"), style),
            ])
        };
        let lines = vec![
            row(
                "Size",
                self.ctx.prefs.font_size.to_string(),
                self.font_panel.selected == 0,
            ),
            row(
                "Weight",
                self.ctx.prefs.font_weight.to_string(),
                self.font_panel.selected == 1,
            ),
        ];
        frame.render_widget(Paragraph::new(Text::from(lines)), inner);
    }

    fn draw_notice(&self, area: Rect, frame: &mut ratatui::Frame) {
        let Some(notice) = &self.ctx.notice else { return };
        let popup = centered_rect(50, 25, area);
        frame.render_widget(Clear, popup);

        let (title, body, style) = match notice {
            Notice::Info(msg) => ("Info", msg.clone(), Style::default()),
            Notice::Error(msg) => ("Error", msg.clone(), Style::default().fg(Color::Red)),
            Notice::ConfirmLogin => (
                "Sign in required",
                "Highlights, notes and verse bookmarks need a signed-in session. Set LECTIO_USER and restart.".to_string(),
                Style::default().fg(Color::Yellow),
            ),
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .title(Span::styled(title, style.add_modifier(Modifier::BOLD)));
        let inner = block.inner(popup);
        frame.render_widget(block, popup);

        let sections = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(inner);
        frame.render_widget(
            Paragraph::new(Text::raw(body)).wrap(Wrap { trim: true }),
            sections[0],
        );
        let footer = Line::from(vec![
            Span::styled("Esc", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" dismiss"),
        ]);
        frame.render_widget(
            Paragraph::new(footer).alignment(Alignment::Center),
            sections[1],
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuItem {
    Highlight,
    RemoveHighlight,
    Note,
    Bookmark,
}

impl MenuItem {
    fn label(&self) -> &'static str {
        match self {
            MenuItem::Highlight => "Highlight…",
            MenuItem::RemoveHighlight => "Remove highlight",
            MenuItem::Note => "Note",
            MenuItem::Bookmark => "Bookmark verse",
        }
    }
}

const MENU_ITEMS: [MenuItem; 4] = [
    MenuItem::Highlight,
    MenuItem::RemoveHighlight,
    MenuItem::Note,
    MenuItem::Bookmark,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum PickerStage {
    #[default]
    Book,
    Chapter,
}

#[derive(Debug, Default)]
struct PickerPanel {
    open: bool,
    stage: PickerStage,
    target: PanelId,
    book_selected: usize,
    chapter_selected: usize,
}

impl PickerPanel {
    fn open_for(&mut self, target: PanelId) {
        self.open = true;
        self.stage = PickerStage::Book;
        self.target = target;
        self.book_selected = 0;
        self.chapter_selected = 0;
    }
}

#[derive(Debug, Default)]
struct TranslationPanel {
    open: bool,
    target: PanelId,
    selected: usize,
}

impl TranslationPanel {
    fn open_for(&mut self, target: PanelId, current: String) {
        self.open = true;
        self.target = target;
        self.selected = TRANSLATIONS
            .iter()
            .position(|t| t.code == current)
            .unwrap_or(0);
    }
}

#[derive(Debug, Default)]
struct FontPanel {
    open: bool,
    selected: usize,
}

fn highlight_bg(color: HighlightColor) -> Color {
    match color {
        HighlightColor::Yellow => Color::Yellow,
        HighlightColor::Green => Color::Green,
        HighlightColor::Blue => Color::Blue,
        HighlightColor::Pink => Color::LightMagenta,
        HighlightColor::Purple => Color::Magenta,
        HighlightColor::Orange => Color::LightRed,
    }
}

/// Keeps the cursor inside a viewport of `height` rows, scrolling the
/// minimum amount.
fn scroll_to_cursor(cursor: usize, scroll: usize, height: usize) -> usize {
    if height == 0 {
        return scroll;
    }
    if cursor < scroll {
        cursor
    } else if cursor >= scroll + height {
        cursor + 1 - height
    } else {
        scroll
    }
}

/// Screen cell of the cursor row inside the primary panel, where the
/// context menu anchors.
fn cursor_anchor(panel_area: Rect, cursor: usize, scroll: usize) -> Anchor {
    let row = cursor.saturating_sub(scroll) as u16;
    Anchor {
        x: panel_area.x.saturating_add(4),
        y: panel_area.y.saturating_add(1).saturating_add(row),
    }
}

/// Places a popup at an anchor, shifted back inside `area` when it
/// would overflow.
fn anchored_rect(area: Rect, anchor: Anchor, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let max_x = area.x + area.width - width;
    let max_y = area.y + area.height - height;
    Rect {
        x: anchor.x.clamp(area.x, max_x),
        y: anchor.y.clamp(area.y, max_y),
        width,
        height,
    }
}

fn setup_terminal() -> anyhow::Result<Terminal<CrosstermBackend<Stdout>>> {
    terminal::enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    crossterm::execute!(stdout, EnterAlternateScreen).context("enter alt screen")?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).context("create terminal")
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> anyhow::Result<()> {
    terminal::disable_raw_mode().context("disable raw mode")?;
    crossterm::execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("leave alt screen")?;
    Ok(())
}

fn panic_to_string(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panic: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panic: {s}")
    } else {
        "panic: (unknown payload)".to_string()
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    if max_width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_width = 0usize;

    for word in text.split_whitespace() {
        let word_width = UnicodeWidthStr::width(word);
        let sep_width = if current.is_empty() { 0 } else { 1 };

        if current_width + sep_width + word_width <= max_width {
            if !current.is_empty() {
                current.push(' ');
                current_width += 1;
            }
            current.push_str(word);
            current_width += word_width;
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
            current_width = 0;
        }

        if word_width <= max_width {
            current.push_str(word);
            current_width = word_width;
        } else {
            // A single overlong word gets its own line unbroken.
            lines.push(word.to_string());
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
