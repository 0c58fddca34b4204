//! Status bar: bottom lines with the mode label, key hints and last log line.

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::theme::{
    C_ACCENT, C_MODE_FILTER, C_MODE_NORMAL, C_MUTED, C_PLAYING, C_SECONDARY, C_SEPARATOR,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputMode {
    Normal,
    Filter,
}

impl InputMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Filter => "SEARCH",
        }
    }

    pub fn color(self) -> Color {
        match self {
            Self::Normal => C_MODE_NORMAL,
            Self::Filter => C_MODE_FILTER,
        }
    }
}

/// Last log line, prefixed with a dot that is green while mpv is running.
pub fn draw_log_bar(frame: &mut Frame, area: Rect, last_log: Option<&str>, mpv_ok: bool) {
    let dot = if mpv_ok {
        Span::styled("●", Style::default().fg(C_PLAYING))
    } else {
        Span::styled("○", Style::default().fg(C_ACCENT))
    };
    let log_span = Span::styled(last_log.unwrap_or(""), Style::default().fg(C_SECONDARY));
    frame.render_widget(
        Paragraph::new(Line::from(vec![dot, Span::raw(" "), log_span])),
        area,
    );
}

pub fn draw_separator(frame: &mut Frame, area: Rect) {
    let line = Line::from(Span::styled(
        "─".repeat(area.width as usize),
        Style::default().fg(C_SEPARATOR),
    ));
    frame.render_widget(Paragraph::new(line), area);
}

/// Key hints for the mode the UI is in.
pub fn key_hints(mode: InputMode) -> &'static str {
    match mode {
        InputMode::Normal => {
            " ↑↓/jk move  Enter select  Space play/pause  n/p next/prev  t top tracks  [/] page  / search  y copy url  Tab pane  q quit"
        }
        InputMode::Filter => " type to search  Enter keep  Esc clear, then close  Tab next pane",
    }
}

pub fn draw_keys_bar(frame: &mut Frame, area: Rect, mode: InputMode, view_label: &str) {
    let spans = vec![
        Span::styled(
            format!(" {} ", mode.label()),
            Style::default()
                .fg(mode.color())
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(view_label.to_string(), Style::default().fg(C_SECONDARY)),
        Span::raw(" "),
        Span::styled(key_hints(mode), Style::default().fg(C_MUTED)),
    ];
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
