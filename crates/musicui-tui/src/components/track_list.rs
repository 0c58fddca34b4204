//! TrackList component: left pane: view header, search bar, the loaded
//! tracks and the pagination row.

use std::time::Instant;

use ratatui::crossterm::event::{
    KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::{
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, ListState, Paragraph},
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use musicui_core::playback::PlayerPhase;
use musicui_core::track::{ResultSet, Track, TrackId};

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    theme::{
        style_muted, C_ACCENT, C_ARTIST, C_MUTED, C_PAGE_ACTIVE_BG, C_PAUSED, C_PLAYING,
        C_PRIMARY, C_SECONDARY, C_SELECTION_BG, C_TOP_TRACK,
    },
    widgets::{
        filter_input::{FilterAction, FilterInput},
        pane_chrome::{pane_chrome, Badge},
        scrollable_list::ScrollableList,
    },
};

const DOUBLE_CLICK_MS: u128 = 400;
const PAGES_PREFIX: &str = " pages ";

pub struct TrackList {
    pub list: ScrollableList<Track>,
    pub filter_input: FilterInput,
    list_state: ListState,
    /// Last click (row index, time) for double-click detection.
    last_click: Option<(usize, Instant)>,
    /// Rects from the last frame, for mouse hit-testing.
    rows_area: Rect,
    pages_area: Rect,
}

impl TrackList {
    pub fn new() -> Self {
        Self {
            list: ScrollableList::new(),
            filter_input: FilterInput::new("search by name…"),
            list_state: ListState::default(),
            last_click: None,
            rows_area: Rect::default(),
            pages_area: Rect::default(),
        }
    }

    /// Load a freshly applied result set. The cursor lands on the selected
    /// track when it is part of the new results.
    pub fn sync_results(&mut self, results: &ResultSet, selected: Option<&TrackId>) {
        self.list.set_items(results.as_slice().to_vec());
        if let Some(idx) = selected.and_then(|id| results.position(id)) {
            self.list.select_index(idx);
        }
    }

    /// Move the cursor onto `id` if it is in the list.
    pub fn follow(&mut self, id: &TrackId) {
        if let Some(idx) = self.list.items.iter().position(|t| &t.id == id) {
            self.list.select_index(idx);
        }
    }

    fn render_item<'a>(&self, track: &'a Track, is_cursor: bool, state: &AppState, name_w: usize) -> ListItem<'a> {
        let is_current = state.is_selected(&track.id);

        let (icon, icon_color) = if is_current {
            match state.playback.phase {
                PlayerPhase::Playing => ("▶", C_PLAYING),
                PlayerPhase::Paused => ("⏸", C_PAUSED),
                PlayerPhase::Idle => (" ", C_MUTED),
            }
        } else {
            (" ", C_MUTED)
        };

        let name_color = if is_current {
            C_PLAYING
        } else if is_cursor {
            C_PRIMARY
        } else {
            C_SECONDARY
        };
        let mut name_style = Style::default().fg(name_color);
        if is_current || is_cursor {
            name_style = name_style.add_modifier(Modifier::BOLD);
        }

        let mut spans = vec![
            Span::styled(format!(" {} ", icon), Style::default().fg(icon_color)),
            Span::styled(pad_to_width(&track.name, name_w), name_style),
            Span::raw("  "),
            Span::styled(track.artist.clone(), Style::default().fg(C_ARTIST)),
        ];
        if track.top_track {
            spans.push(Span::styled("  ★", Style::default().fg(C_TOP_TRACK)));
        }
        if let Some(date) = track.created_label() {
            spans.push(Span::styled(format!("  {}", date), style_muted()));
        }

        let bg = if is_cursor {
            Style::default().bg(C_SELECTION_BG)
        } else {
            Style::default()
        };
        ListItem::new(Line::from(spans)).style(bg)
    }

    fn header_line(&self, state: &AppState) -> Line<'static> {
        let (mode, other) = if state.view.top_tracks() {
            ("Top Tracks", "All Tracks")
        } else {
            ("For you", "Top Tracks")
        };
        Line::from(vec![
            Span::styled(
                format!(" {}", mode),
                Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!("   t: ⇄ {}", other), style_muted()),
            Span::styled(
                format!("   {} tracks", self.list.len()),
                Style::default().fg(C_SECONDARY),
            ),
        ])
    }

    fn draw_pagination(frame: &mut Frame, area: Rect, state: &AppState) {
        let current = state.view.current_page();
        let mut spans = vec![Span::styled(PAGES_PREFIX, style_muted())];
        for (page, label) in page_labels(state.page_buttons()) {
            let style = if page == current {
                Style::default()
                    .fg(C_PRIMARY)
                    .bg(C_PAGE_ACTIVE_BG)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(C_SECONDARY)
            };
            spans.push(Span::styled(label, style));
        }
        if state.can_advance_page() {
            spans.push(Span::styled(" ›", style_muted()));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }
}

impl Default for TrackList {
    fn default() -> Self {
        Self::new()
    }
}

/// `(page, " N ")` for every page button.
fn page_labels(count: usize) -> Vec<(usize, String)> {
    (1..=count).map(|p| (p, format!(" {} ", p))).collect()
}

/// Page button under column `col` of the pagination row.
fn page_at_column(count: usize, col: usize) -> Option<usize> {
    let mut x = PAGES_PREFIX.width();
    for (page, label) in page_labels(count) {
        let w = label.width();
        if col >= x && col < x + w {
            return Some(page);
        }
        x += w;
    }
    None
}

/// Truncate or pad `s` to exactly `width` terminal columns.
fn pad_to_width(s: &str, width: usize) -> String {
    if s.width() <= width {
        return format!("{}{}", s, " ".repeat(width - s.width()));
    }
    let budget = width.saturating_sub(1);
    let mut out = String::new();
    let mut used = 0;
    for ch in s.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        out.push(ch);
        used += w;
    }
    if width > 0 {
        out.push('…');
        used += 1;
    }
    out.push_str(&" ".repeat(width.saturating_sub(used)));
    out
}

impl Component for TrackList {
    fn id(&self) -> ComponentId {
        ComponentId::TrackList
    }

    fn handle_key(&mut self, key: KeyEvent, _state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }

        if self.filter_input.is_active() {
            match key.code {
                KeyCode::Up => {
                    self.list.select_up(1);
                    return vec![];
                }
                KeyCode::Down => {
                    self.list.select_down(1);
                    return vec![];
                }
                _ => {}
            }
            return match self.filter_input.handle_key(key) {
                FilterAction::Changed(q) => vec![Action::SetSearch(q)],
                FilterAction::Confirmed | FilterAction::Cancelled => vec![Action::CloseFilter],
                FilterAction::None => vec![],
            };
        }

        let step = if key.modifiers.contains(KeyModifiers::SHIFT) {
            5
        } else {
            1
        };
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.list.select_up(step),
            KeyCode::Down | KeyCode::Char('j') => self.list.select_down(step),
            KeyCode::PageUp => self.list.select_up(10),
            KeyCode::PageDown => self.list.select_down(10),
            KeyCode::Home | KeyCode::Char('g') => self.list.select_first(),
            KeyCode::End | KeyCode::Char('G') => self.list.select_last(),

            KeyCode::Enter => {
                if let Some(track) = self.list.selected_item() {
                    return vec![Action::Select(track.clone())];
                }
            }

            KeyCode::Char('/') => {
                self.filter_input.activate();
                return vec![Action::OpenFilter];
            }

            KeyCode::Char('y') => {
                if let Some(track) = self.list.selected_item() {
                    return vec![Action::CopyToClipboard(track.url.clone())];
                }
            }

            _ => {}
        }

        vec![]
    }

    fn handle_mouse(&mut self, event: MouseEvent, _area: Rect, state: &AppState) -> Vec<Action> {
        let pos = Position::new(event.column, event.row);
        match event.kind {
            MouseEventKind::ScrollUp => self.list.select_up(1),
            MouseEventKind::ScrollDown => self.list.select_down(1),
            MouseEventKind::Down(MouseButton::Left) if self.pages_area.contains(pos) => {
                let col = (event.column - self.pages_area.x) as usize;
                if let Some(page) = page_at_column(state.page_buttons(), col) {
                    return vec![Action::SetPage(page)];
                }
            }
            MouseEventKind::Down(MouseButton::Left) if self.rows_area.contains(pos) => {
                let rel_row = (event.row - self.rows_area.y) as usize;
                let is_double = self
                    .last_click
                    .map(|(row, t)| row == rel_row && t.elapsed().as_millis() < DOUBLE_CLICK_MS)
                    .unwrap_or(false);

                if self.list.handle_click(rel_row) && is_double {
                    self.last_click = None;
                    if let Some(track) = self.list.selected_item() {
                        return vec![Action::Select(track.clone())];
                    }
                } else {
                    self.last_click = Some((rel_row, Instant::now()));
                }
            }
            _ => {}
        }
        vec![]
    }

    fn on_action(&mut self, action: &Action, _state: &AppState) -> Vec<Action> {
        if let Action::CloseFilter = action {
            self.filter_input.deactivate();
        }
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let badge = if state.loading {
            Some(Badge {
                text: "loading…",
                color: C_PAUSED,
            })
        } else if state.view.top_tracks() {
            Some(Badge {
                text: "TOP",
                color: C_TOP_TRACK,
            })
        } else {
            None
        };
        let block = pane_chrome("tracks", Some('1'), focused, badge);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let show_pages = state.view.pagination_visible();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(1),
                Constraint::Length(if show_pages { 1 } else { 0 }),
            ])
            .split(inner);

        frame.render_widget(Paragraph::new(self.header_line(state)), chunks[0]);
        self.filter_input.draw(frame, chunks[1]);

        self.rows_area = chunks[2];
        self.pages_area = if show_pages { chunks[3] } else { Rect::default() };
        if show_pages {
            Self::draw_pagination(frame, chunks[3], state);
        }

        if self.list.is_empty() {
            let msg = if state.loading {
                "  loading…"
            } else if !self.filter_input.text().is_empty() {
                "  no tracks match this search"
            } else {
                "  no tracks"
            };
            let color = if state.loading { C_MUTED } else { C_ACCENT };
            frame.render_widget(
                Paragraph::new(Span::styled(msg, Style::default().fg(color))),
                chunks[2],
            );
            return;
        }

        let content_h = chunks[2].height as usize;
        self.list.ensure_visible(content_h);
        let cursor = self.list.selected;
        let name_w = (chunks[2].width as usize / 2).clamp(8, 40);

        let items: Vec<ListItem> = self
            .list
            .visible_items(content_h)
            .into_iter()
            .map(|(idx, track)| self.render_item(track, idx == cursor, state, name_w))
            .collect();

        let list = List::new(items)
            .highlight_style(Style::default())
            .highlight_symbol("");
        self.list_state
            .select(Some(cursor.saturating_sub(self.list.scroll_offset)));
        frame.render_stateful_widget(list, chunks[2], &mut self.list_state);
    }
}
