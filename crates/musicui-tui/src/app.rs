//! App: component-based event loop.
//!
//! Architecture:
//! - `App` owns both panes and `AppState` (shared read-only data for components).
//! - A `tokio::mpsc` channel carries `AppMessage` events in from background tasks.
//! - The event loop draws each frame, then awaits the next message.
//! - Components return `Vec<Action>`; App dispatches each Action.
//! - Playback intents flow out to the PlayerCore through `player_tx`.
//! - Catalog reads run as spawned tasks tagged by a `FetchSequencer`, so only
//!   the newest response is applied.

use std::io;

use ratatui::crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    Terminal,
};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use musicui_core::catalog::{CatalogClient, FetchSequencer};
use musicui_core::track::ResultSet;

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    components::{now_playing::NowPlaying, track_list::TrackList},
    core::{MpvHealth, PlaybackSnapshot, PlayerEvent},
    focus::FocusRing,
    widgets::status_bar::{self, InputMode},
    BroadcastMessage,
};

/// Everything the event loop reacts to.
#[derive(Debug)]
pub enum AppMessage {
    Event(Event),
    /// Catalog read `seq` finished.
    CatalogLoaded(u64, ResultSet),
    CatalogFailed(u64, String),
    PlayerUpdated(PlaybackSnapshot),
    Log(String),
}

/// Rects from the last frame, for mouse routing.
#[derive(Debug, Clone, Default)]
struct PaneAreas {
    track_list: Rect,
    now_playing: Rect,
}

pub struct App {
    state: AppState,
    track_list: TrackList,
    now_playing: NowPlaying,
    focus: FocusRing,
    catalog: CatalogClient,
    sequencer: FetchSequencer,
    player_tx: mpsc::Sender<PlayerEvent>,
    /// Set in `run()`; fetch tasks report back through it.
    app_tx: Option<mpsc::Sender<AppMessage>>,
    pane_areas: PaneAreas,
    should_quit: bool,
}

impl App {
    pub fn new(
        catalog: CatalogClient,
        asset_base: String,
        player_tx: mpsc::Sender<PlayerEvent>,
    ) -> Self {
        Self {
            state: AppState::new(asset_base),
            track_list: TrackList::new(),
            now_playing: NowPlaying::new(),
            focus: FocusRing::new(vec![ComponentId::TrackList, ComponentId::NowPlaying]),
            catalog,
            sequencer: FetchSequencer::new(),
            player_tx,
            app_tx: None,
            pane_areas: PaneAreas::default(),
            should_quit: false,
        }
    }

    // ── Main run loop ─────────────────────────────────────────────────────────

    pub async fn run(
        mut self,
        mut broadcast_rx: broadcast::Receiver<BroadcastMessage>,
    ) -> anyhow::Result<()> {
        debug!("run(): enabling raw mode");
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        debug!("run(): terminal created, size={:?}", terminal.size());

        let (tx, mut rx) = mpsc::channel::<AppMessage>(1024);
        self.app_tx = Some(tx.clone());
        self.push_log("musicui started".to_string());

        // ── Background task: keyboard/mouse events ────────────────────────────
        let event_tx = tx.clone();
        tokio::task::spawn_blocking(move || loop {
            match event::read() {
                Ok(ev) => {
                    if event_tx.blocking_send(AppMessage::Event(ev)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        });

        // ── Background task: broadcast receiver (PlayerCore → AppMessage) ─────
        let bc_tx = tx.clone();
        tokio::spawn(async move {
            loop {
                match broadcast_rx.recv().await {
                    Ok(msg) => {
                        let app_msg = match msg {
                            BroadcastMessage::StateUpdated(snap) => AppMessage::PlayerUpdated(snap),
                            BroadcastMessage::Log(s) => AppMessage::Log(s),
                        };
                        if bc_tx.send(app_msg).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("broadcast receiver lagged by {} messages", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        // initial read for the default view
        self.spawn_fetch();

        // ── Main loop ─────────────────────────────────────────────────────────
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal.draw(|f| self.draw(f))?;
            }
            needs_redraw = false;

            if self.should_quit {
                break;
            }

            tokio::select! {
                Some(msg) = rx.recv() => {
                    const MAX_DRAIN: usize = 256;
                    let mut redraw = self.handle_message(msg).await;
                    let mut drained = 0usize;
                    while drained < MAX_DRAIN {
                        let Ok(next) = rx.try_recv() else { break };
                        drained += 1;
                        redraw |= self.handle_message(next).await;
                    }
                    needs_redraw = redraw;
                }
                else => break,
            }
        }

        // ── Teardown ──────────────────────────────────────────────────────────
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;

        Ok(())
    }

    /// Returns `true` when a redraw is needed.
    async fn handle_message(&mut self, msg: AppMessage) -> bool {
        match msg {
            AppMessage::Event(ev) => match ev {
                Event::Key(key) => {
                    if key.kind == KeyEventKind::Release {
                        return false;
                    }
                    for action in self.handle_key(key) {
                        self.dispatch(action).await;
                    }
                    true
                }
                Event::Mouse(m) => {
                    let actions = self.handle_mouse(m);
                    let redraw = !actions.is_empty()
                        || matches!(m.kind, MouseEventKind::ScrollUp | MouseEventKind::ScrollDown)
                        || matches!(m.kind, MouseEventKind::Down(_));
                    for action in actions {
                        self.dispatch(action).await;
                    }
                    redraw
                }
                Event::Resize(w, h) => {
                    self.dispatch(Action::Resize(w, h)).await;
                    true
                }
                _ => false,
            },

            AppMessage::CatalogLoaded(seq, results) => {
                if !self.sequencer.accept(seq) {
                    debug!("catalog: dropping stale response #{}", seq);
                    return false;
                }
                info!("catalog: applied #{} ({} tracks)", seq, results.len());
                self.track_list
                    .sync_results(&results, self.state.selected_id());
                self.send_player(PlayerEvent::ResultsChanged(results.clone()))
                    .await;
                self.state.results = results;
                self.state.loading = self.sequencer.in_flight();
                true
            }

            AppMessage::CatalogFailed(seq, err) => {
                warn!("catalog: request #{} failed: {}", seq, err);
                self.sequencer.settle(seq);
                self.state.loading = self.sequencer.in_flight();
                self.push_log(format!("catalog error: {}", err));
                true
            }

            AppMessage::PlayerUpdated(snap) => {
                let moved = snap.state.selected.as_ref() != self.state.selected_id();
                if moved {
                    if let Some(id) = snap.state.selected.as_ref() {
                        self.track_list.follow(id);
                    }
                }
                self.state.playback = snap;
                true
            }

            AppMessage::Log(line) => {
                self.push_log(line);
                true
            }
        }
    }

    // ── Input routing ─────────────────────────────────────────────────────────

    fn handle_key(&mut self, key: KeyEvent) -> Vec<Action> {
        // Global keys, active regardless of focus/mode
        match key.code {
            KeyCode::Char('q') if key.modifiers == KeyModifiers::NONE => {
                if self.state.input_mode == InputMode::Normal {
                    return vec![Action::Quit];
                }
            }
            KeyCode::Char('c') if key.modifiers == KeyModifiers::CONTROL => {
                return vec![Action::Quit];
            }
            KeyCode::Tab => {
                if self.state.input_mode == InputMode::Filter {
                    return vec![Action::CloseFilter, Action::FocusNext];
                }
                return vec![Action::FocusNext];
            }
            KeyCode::BackTab => {
                if self.state.input_mode == InputMode::Filter {
                    return vec![Action::CloseFilter, Action::FocusPrev];
                }
                return vec![Action::FocusPrev];
            }
            _ => {}
        }

        if self.state.input_mode == InputMode::Normal {
            match key.code {
                KeyCode::Char(' ') => return vec![Action::TogglePause],
                KeyCode::Char('n') => return vec![Action::Next],
                KeyCode::Char('p') => return vec![Action::Prev],
                KeyCode::Char('t') => return vec![Action::ToggleTopTracks],
                KeyCode::Char(']') | KeyCode::Char('l') => return vec![Action::NextPage],
                KeyCode::Char('[') | KeyCode::Char('h') => return vec![Action::PrevPage],
                KeyCode::Char('1') => return vec![Action::FocusPane(ComponentId::TrackList)],
                KeyCode::Char('2') => return vec![Action::FocusPane(ComponentId::NowPlaying)],
                _ => {}
            }
        }

        let s = &self.state;
        match self.focus.current() {
            Some(ComponentId::TrackList) => self.track_list.handle_key(key, s),
            Some(ComponentId::NowPlaying) => self.now_playing.handle_key(key, s),
            None => vec![],
        }
    }

    fn handle_mouse(&mut self, event: MouseEvent) -> Vec<Action> {
        let is_click = matches!(
            event.kind,
            MouseEventKind::Down(_) | MouseEventKind::ScrollUp | MouseEventKind::ScrollDown
        );
        if !is_click {
            return vec![];
        }

        let col = event.column;
        let row = event.row;

        fn hit(r: Rect, col: u16, row: u16) -> bool {
            r.width > 0
                && r.height > 0
                && col >= r.x
                && col < r.x + r.width
                && row >= r.y
                && row < r.y + r.height
        }

        let areas = self.pane_areas.clone();
        let s = &self.state;

        let (id, mut actions) = if hit(areas.track_list, col, row) {
            (
                ComponentId::TrackList,
                self.track_list.handle_mouse(event, areas.track_list, s),
            )
        } else if hit(areas.now_playing, col, row) {
            (
                ComponentId::NowPlaying,
                self.now_playing.handle_mouse(event, areas.now_playing, s),
            )
        } else {
            return vec![];
        };

        // focus follows the click
        if self.focus.current() != Some(id) {
            actions.insert(0, Action::FocusPane(id));
        }
        actions
    }

    // ── Action dispatcher ─────────────────────────────────────────────────────

    async fn dispatch(&mut self, action: Action) {
        let secondary: Vec<Action> = {
            let s = &self.state;
            let mut out = Vec::new();
            out.extend(self.track_list.on_action(&action, s));
            out.extend(self.now_playing.on_action(&action, s));
            out
        };

        self.apply_action(action).await;

        for a in secondary {
            self.apply_action(a).await;
        }
    }

    async fn apply_action(&mut self, action: Action) {
        debug!("apply_action: {:?}", action);
        match action {
            // ── Playback ──────────────────────────────────────────────────────
            Action::Select(track) => self.send_player(PlayerEvent::Select(track)).await,
            Action::TogglePause => self.send_player(PlayerEvent::TogglePause).await,
            Action::Next => self.send_player(PlayerEvent::Next).await,
            Action::Prev => self.send_player(PlayerEvent::Previous).await,

            // ── Catalog view ──────────────────────────────────────────────────
            Action::SetSearch(text) => {
                if text != self.state.view.search_text() {
                    self.state.view.set_search_text(text);
                    self.spawn_fetch();
                }
            }
            Action::ToggleTopTracks => {
                self.state.view.toggle_top_tracks();
                let label = if self.state.view.top_tracks() {
                    "showing top tracks"
                } else {
                    "showing all tracks"
                };
                self.push_log(label.to_string());
                self.spawn_fetch();
            }
            Action::SetPage(page) => {
                if page != self.state.view.current_page() {
                    self.state.view.set_page(page);
                    self.spawn_fetch();
                }
            }
            Action::NextPage => {
                if self.state.can_advance_page() {
                    let page = self.state.view.current_page() + 1;
                    self.state.view.set_page(page);
                    self.spawn_fetch();
                }
            }
            Action::PrevPage => {
                if self.state.can_retreat_page() {
                    let page = self.state.view.current_page() - 1;
                    self.state.view.set_page(page);
                    self.spawn_fetch();
                }
            }

            // ── Navigation ────────────────────────────────────────────────────
            Action::FocusNext => {
                self.focus.next();
            }
            Action::FocusPrev => {
                self.focus.prev();
            }
            Action::FocusPane(id) => self.focus.set(id),

            // ── Filter/search ─────────────────────────────────────────────────
            Action::OpenFilter => {
                self.state.input_mode = InputMode::Filter;
                self.focus.set(ComponentId::TrackList);
            }
            Action::CloseFilter => self.state.input_mode = InputMode::Normal,

            // ── System ────────────────────────────────────────────────────────
            Action::CopyToClipboard(text) => {
                match arboard::Clipboard::new().and_then(|mut cb| cb.set_text(text.clone())) {
                    Ok(()) => {
                        let display = if text.chars().count() > 40 {
                            format!("{}…", text.chars().take(40).collect::<String>())
                        } else {
                            text
                        };
                        self.push_log(format!("copied: {}", display));
                    }
                    Err(e) => {
                        warn!("clipboard error: {}", e);
                        self.push_log(format!("clipboard error: {}", e));
                    }
                }
            }
            Action::Quit => self.should_quit = true,
            Action::Resize(_, _) => {}
        }
    }

    /// Issue a read for the current view. The response comes back as
    /// `CatalogLoaded`/`CatalogFailed` tagged with its sequence number.
    fn spawn_fetch(&mut self) {
        let Some(tx) = self.app_tx.clone() else {
            return;
        };
        let seq = self.sequencer.issue();
        let query = self.state.view.compute_query();
        let catalog = self.catalog.clone();
        self.state.loading = true;
        debug!("catalog: issuing #{} for {}", seq, query.label());

        tokio::spawn(async move {
            let msg = match catalog.fetch(&query).await {
                Ok(results) => AppMessage::CatalogLoaded(seq, results),
                Err(e) => AppMessage::CatalogFailed(seq, e.to_string()),
            };
            let _ = tx.send(msg).await;
        });
    }

    async fn send_player(&self, evt: PlayerEvent) {
        if self.player_tx.send(evt).await.is_err() {
            warn!("player core is gone");
        }
    }

    fn push_log(&mut self, msg: String) {
        self.state.logs.push(msg);
        if self.state.logs.len() > 500 {
            self.state.logs.remove(0);
        }
    }

    // ── Drawing ───────────────────────────────────────────────────────────────

    fn draw(&mut self, frame: &mut ratatui::Frame) {
        let area = frame.area();

        let outer = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(0),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(area);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(outer[0]);

        self.pane_areas.track_list = body[0];
        self.pane_areas.now_playing = body[1];

        let tl_focused = self.focus.is_focused(ComponentId::TrackList);
        self.track_list.draw(frame, body[0], tl_focused, &self.state);
        let np_focused = self.focus.is_focused(ComponentId::NowPlaying);
        self.now_playing.draw(frame, body[1], np_focused, &self.state);

        status_bar::draw_separator(frame, outer[1]);
        status_bar::draw_keys_bar(
            frame,
            outer[2],
            self.state.input_mode,
            &self.state.view.compute_query().label(),
        );
        status_bar::draw_log_bar(
            frame,
            outer[3],
            self.state.last_log(),
            self.state.playback.mpv_health == MpvHealth::Running,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use musicui_core::config::CatalogConfig;
    use musicui_core::track::Track;
    use serde_json::json;

    fn results(ids: &[&str]) -> ResultSet {
        ResultSet::new(
            ids.iter()
                .map(|id| -> Track {
                    serde_json::from_value(json!({
                        "id": id,
                        "name": format!("Song {}", id),
                        "url": format!("https://cdn.example.com/{}.mp3", id),
                    }))
                    .unwrap()
                })
                .collect(),
        )
    }

    fn app() -> (App, mpsc::Receiver<PlayerEvent>) {
        let (player_tx, player_rx) = mpsc::channel(16);
        let catalog = CatalogClient::new(&CatalogConfig::default()).unwrap();
        (App::new(catalog, String::new(), player_tx), player_rx)
    }

    fn results_changed(rx: &mut mpsc::Receiver<PlayerEvent>) -> Vec<ResultSet> {
        let mut seen = Vec::new();
        while let Ok(evt) = rx.try_recv() {
            if let PlayerEvent::ResultsChanged(r) = evt {
                seen.push(r);
            }
        }
        seen
    }

    #[tokio::test]
    async fn test_stale_catalog_response_dropped() {
        let (mut app, mut player_rx) = app();
        let first = app.sequencer.issue();
        let second = app.sequencer.issue();

        assert!(app
            .handle_message(AppMessage::CatalogLoaded(second, results(&["b"])))
            .await);
        assert!(!app
            .handle_message(AppMessage::CatalogLoaded(first, results(&["a"])))
            .await);

        assert_eq!(app.state.results, results(&["b"]));
        assert!(!app.state.loading);
        assert_eq!(results_changed(&mut player_rx), vec![results(&["b"])]);
    }

    #[tokio::test]
    async fn test_failed_catalog_response_keeps_results() {
        let (mut app, mut player_rx) = app();
        let first = app.sequencer.issue();
        app.handle_message(AppMessage::CatalogLoaded(first, results(&["a", "b"])))
            .await;
        assert_eq!(results_changed(&mut player_rx).len(), 1);

        let second = app.sequencer.issue();
        app.state.loading = true;
        assert!(app
            .handle_message(AppMessage::CatalogFailed(second, "status 503".into()))
            .await);

        assert_eq!(app.state.results, results(&["a", "b"]));
        assert!(!app.state.loading);
        assert!(app.state.logs.iter().any(|l| l.contains("status 503")));
        assert!(results_changed(&mut player_rx).is_empty());
    }

    #[tokio::test]
    async fn test_results_applied_when_player_core_is_gone() {
        let (mut app, player_rx) = app();
        drop(player_rx);
        let seq = app.sequencer.issue();
        assert!(app
            .handle_message(AppMessage::CatalogLoaded(seq, results(&["a"])))
            .await);
        assert_eq!(app.state.results, results(&["a"]));
    }
}
