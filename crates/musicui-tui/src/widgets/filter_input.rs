//! FilterInput: wraps tui-input for the search bar.

use ratatui::crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use tui_input::{backend::crossterm::EventHandler, Input};

use crate::theme::{C_FILTER_BG, C_FILTER_FG, C_MUTED, C_SECONDARY};

#[derive(Debug, PartialEq)]
pub enum FilterAction {
    Changed(String),
    Confirmed,
    Cancelled,
    None,
}

pub struct FilterInput {
    input: Input,
    active: bool,
    placeholder: String,
}

impl FilterInput {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            input: Input::default(),
            active: false,
            placeholder: placeholder.into(),
        }
    }

    pub fn activate(&mut self) {
        self.active = true;
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    pub fn text(&self) -> &str {
        self.input.value()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Esc clears non-empty text first (`Changed("")`), and closes the bar
    /// (`Cancelled`) once it is empty. Enter keeps the text and closes.
    pub fn handle_key(&mut self, key: KeyEvent) -> FilterAction {
        match key.code {
            KeyCode::Esc => {
                if !self.input.value().is_empty() {
                    self.input = Input::default();
                    FilterAction::Changed(String::new())
                } else {
                    self.deactivate();
                    FilterAction::Cancelled
                }
            }
            KeyCode::Enter => {
                self.deactivate();
                FilterAction::Confirmed
            }
            _ => {
                let before = self.input.value().to_string();
                self.input
                    .handle_event(&ratatui::crossterm::event::Event::Key(key));
                if self.input.value() == before {
                    FilterAction::None
                } else {
                    FilterAction::Changed(self.input.value().to_string())
                }
            }
        }
    }

    pub fn draw(&self, frame: &mut Frame, area: Rect) {
        let scroll = self
            .input
            .visual_scroll(area.width.saturating_sub(4) as usize);
        let value = self.input.value();
        let display = if value.is_empty() {
            Span::styled(
                format!("/ {}", self.placeholder),
                Style::default().fg(C_MUTED),
            )
        } else {
            let color = if self.active { C_FILTER_FG } else { C_SECONDARY };
            let visible: String = value.chars().skip(scroll).collect();
            Span::styled(format!("/ {}", visible), Style::default().fg(color))
        };

        let paragraph =
            Paragraph::new(Line::from(vec![display])).style(Style::default().bg(C_FILTER_BG));
        frame.render_widget(paragraph, area);

        if self.active && area.width > 0 {
            let cursor_x = area.x + 2 + (self.input.visual_cursor().saturating_sub(scroll)) as u16;
            frame.set_cursor_position((cursor_x.min(area.x + area.width - 1), area.y));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_typing_reports_text() {
        let mut f = FilterInput::new("search");
        f.activate();
        assert_eq!(f.handle_key(key(KeyCode::Char('a'))), FilterAction::Changed("a".into()));
        assert_eq!(f.handle_key(key(KeyCode::Char('b'))), FilterAction::Changed("ab".into()));
        assert_eq!(f.text(), "ab");
    }

    #[test]
    fn test_esc_clears_then_closes() {
        let mut f = FilterInput::new("search");
        f.activate();
        f.handle_key(key(KeyCode::Char('x')));
        assert_eq!(f.handle_key(key(KeyCode::Esc)), FilterAction::Changed(String::new()));
        assert!(f.is_active());
        assert_eq!(f.handle_key(key(KeyCode::Esc)), FilterAction::Cancelled);
        assert!(!f.is_active());
    }

    #[test]
    fn test_enter_keeps_text() {
        let mut f = FilterInput::new("search");
        f.activate();
        f.handle_key(key(KeyCode::Char('q')));
        assert_eq!(f.handle_key(key(KeyCode::Enter)), FilterAction::Confirmed);
        assert_eq!(f.text(), "q");
        assert!(!f.is_active());
    }

    #[test]
    fn test_cursor_motion_is_not_a_change() {
        let mut f = FilterInput::new("search");
        f.activate();
        f.handle_key(key(KeyCode::Char('z')));
        assert_eq!(f.handle_key(key(KeyCode::Left)), FilterAction::None);
    }
}
