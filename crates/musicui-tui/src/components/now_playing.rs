//! NowPlaying component: the selected track, transport controls and progress.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind};
use ratatui::{
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use musicui_core::playback::PlayerPhase;

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    core::MpvHealth,
    theme::{style_muted, C_ACCENT, C_ARTIST, C_MUTED, C_PAUSED, C_PLAYING, C_PRIMARY, C_SECONDARY, C_TOP_TRACK},
    widgets::{
        pane_chrome::{pane_chrome, Badge},
        progress_bar::draw_progress,
    },
};

const TRANSPORT: &str = " ⏮ p    ⏯ Space    ⏭ n";

pub struct NowPlaying {
    transport_area: Rect,
}

impl NowPlaying {
    pub fn new() -> Self {
        Self {
            transport_area: Rect::default(),
        }
    }
}

impl Default for NowPlaying {
    fn default() -> Self {
        Self::new()
    }
}

/// Transport button under column `col` of a row `width` columns wide:
/// previous, play/pause and next each take a third.
fn transport_action(col: u16, width: u16) -> Option<Action> {
    if width == 0 || col >= width {
        return None;
    }
    let third = (width / 3).max(1);
    Some(match col / third {
        0 => Action::Prev,
        1 => Action::TogglePause,
        _ => Action::Next,
    })
}

fn phase_label(phase: PlayerPhase) -> (&'static str, ratatui::style::Color) {
    match phase {
        PlayerPhase::Playing => ("▶ playing", C_PLAYING),
        PlayerPhase::Paused => ("⏸ paused", C_PAUSED),
        PlayerPhase::Idle => ("■ nothing selected", C_MUTED),
    }
}

impl Component for NowPlaying {
    fn id(&self) -> ComponentId {
        ComponentId::NowPlaying
    }

    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        match key.code {
            KeyCode::Enter => vec![Action::TogglePause],
            KeyCode::Left => vec![Action::Prev],
            KeyCode::Right => vec![Action::Next],
            KeyCode::Char('y') => state
                .playback
                .track
                .as_ref()
                .map(|t| vec![Action::CopyToClipboard(t.url.clone())])
                .unwrap_or_default(),
            _ => vec![],
        }
    }

    fn handle_mouse(&mut self, event: MouseEvent, _area: Rect, _state: &AppState) -> Vec<Action> {
        if event.kind != MouseEventKind::Down(MouseButton::Left) {
            return vec![];
        }
        if !self.transport_area.contains(Position::new(event.column, event.row)) {
            return vec![];
        }
        let col = event.column - self.transport_area.x;
        transport_action(col, self.transport_area.width)
            .map(|a| vec![a])
            .unwrap_or_default()
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let snap = &state.playback;
        let badge = match snap.mpv_health {
            MpvHealth::Dead => Some(Badge {
                text: snap.mpv_health.label(),
                color: C_ACCENT,
            }),
            MpvHealth::Starting => Some(Badge {
                text: snap.mpv_health.label(),
                color: C_PAUSED,
            }),
            MpvHealth::Running | MpvHealth::Absent => None,
        };
        let block = pane_chrome("now playing", Some('2'), focused, badge);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // name
                Constraint::Length(1), // artist
                Constraint::Length(1), // date / top
                Constraint::Length(1), // cover
                Constraint::Length(1),
                Constraint::Length(1), // phase
                Constraint::Length(1), // progress
                Constraint::Length(1),
                Constraint::Length(1), // transport
                Constraint::Min(0),
            ])
            .split(inner);

        let Some(track) = snap.track.as_ref() else {
            frame.render_widget(
                Paragraph::new(Span::styled(
                    " Select a track and press Enter",
                    style_muted(),
                )),
                chunks[0],
            );
            self.transport_area = Rect::default();
            return;
        };

        frame.render_widget(
            Paragraph::new(Span::styled(
                format!(" {}", track.name),
                Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
            )),
            chunks[0],
        );
        frame.render_widget(
            Paragraph::new(Span::styled(
                format!(" {}", track.artist),
                Style::default().fg(C_ARTIST),
            )),
            chunks[1],
        );

        let mut meta = vec![Span::styled(
            format!(" {}", track.created_label().unwrap_or_default()),
            Style::default().fg(C_SECONDARY),
        )];
        if track.top_track {
            meta.push(Span::styled("  ★ top track", Style::default().fg(C_TOP_TRACK)));
        }
        frame.render_widget(Paragraph::new(Line::from(meta)), chunks[2]);

        if let Some(cover) = track.cover_url(&state.asset_base) {
            frame.render_widget(
                Paragraph::new(Span::styled(format!(" cover {}", cover), style_muted())),
                chunks[3],
            );
        }

        let (label, color) = phase_label(snap.phase);
        frame.render_widget(
            Paragraph::new(Span::styled(
                format!(" {}", label),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            )),
            chunks[5],
        );

        let bar_area = Rect {
            x: chunks[6].x + 1,
            width: chunks[6].width.saturating_sub(2),
            ..chunks[6]
        };
        draw_progress(
            frame,
            bar_area,
            snap.state.progress_percent,
            snap.elapsed_secs,
            snap.duration_secs,
        );

        self.transport_area = chunks[8];
        frame.render_widget(
            Paragraph::new(Span::styled(TRANSPORT, Style::default().fg(C_SECONDARY))),
            chunks[8],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PlaybackSnapshot;
    use musicui_core::track::Track;
    use ratatui::crossterm::event::KeyModifiers;

    fn state_with_track() -> AppState {
        let track: Track = serde_json::from_value(serde_json::json!({
            "id": 7,
            "name": "Seven",
            "url": "https://cdn.example.com/7.mp3",
        }))
        .unwrap();
        let mut state = AppState::new(String::new());
        state.playback = PlaybackSnapshot {
            track: Some(track),
            phase: PlayerPhase::Paused,
            ..Default::default()
        };
        state
    }

    #[test]
    fn test_transport_thirds() {
        assert!(matches!(transport_action(0, 30), Some(Action::Prev)));
        assert!(matches!(transport_action(12, 30), Some(Action::TogglePause)));
        assert!(matches!(transport_action(29, 30), Some(Action::Next)));
        assert!(transport_action(30, 30).is_none());
        assert!(transport_action(0, 0).is_none());
    }

    #[test]
    fn test_keys() {
        let mut np = NowPlaying::new();
        let state = state_with_track();
        let key = |c| KeyEvent::new(c, KeyModifiers::NONE);

        assert!(matches!(
            np.handle_key(key(KeyCode::Enter), &state).as_slice(),
            [Action::TogglePause]
        ));
        assert!(matches!(
            np.handle_key(key(KeyCode::Right), &state).as_slice(),
            [Action::Next]
        ));
        match np.handle_key(key(KeyCode::Char('y')), &state).as_slice() {
            [Action::CopyToClipboard(url)] => assert_eq!(url, "https://cdn.example.com/7.mp3"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_copy_without_track_does_nothing() {
        let mut np = NowPlaying::new();
        let state = AppState::new(String::new());
        let key = KeyEvent::new(KeyCode::Char('y'), KeyModifiers::NONE);
        assert!(np.handle_key(key, &state).is_empty());
    }
}
