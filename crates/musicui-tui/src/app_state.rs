//! AppState: shared read-only data passed to all components during render/event.
//!
//! Components read this but never mutate it. The App event-loop is the only
//! writer.

use musicui_core::track::{ResultSet, TrackId};
use musicui_core::view::{CatalogView, PAGE_SIZE};

use crate::core::PlaybackSnapshot;
use crate::widgets::status_bar::InputMode;

pub struct AppState {
    // ── Catalog ─────────────────────────────────────────────────────────────
    pub view: CatalogView,
    pub results: ResultSet,
    /// A fetch for the current view is in flight.
    pub loading: bool,
    /// Base URL cover identifiers resolve against.
    pub asset_base: String,

    // ── Playback (mirrored from PlayerCore broadcasts) ──────────────────────
    pub playback: PlaybackSnapshot,

    // ── UI mode ─────────────────────────────────────────────────────────────
    pub input_mode: InputMode,

    /// Recent user-facing log lines, newest last.
    pub logs: Vec<String>,
}

impl AppState {
    pub fn new(asset_base: String) -> Self {
        Self {
            view: CatalogView::new(),
            results: ResultSet::default(),
            loading: false,
            asset_base,
            playback: PlaybackSnapshot::default(),
            input_mode: InputMode::Normal,
            logs: Vec::new(),
        }
    }

    pub fn selected_id(&self) -> Option<&TrackId> {
        self.playback.state.selected.as_ref()
    }

    pub fn is_selected(&self, id: &TrackId) -> bool {
        self.selected_id() == Some(id)
    }

    /// Page buttons to show. Never fewer than the current page, so the
    /// active button is always present.
    pub fn page_buttons(&self) -> usize {
        self.view
            .page_count(self.results.len())
            .max(self.view.current_page())
    }

    /// `]` moves on only when another page can exist: a full page in paged
    /// mode, or a higher button in top-tracks mode.
    pub fn can_advance_page(&self) -> bool {
        if !self.view.pagination_visible() {
            return false;
        }
        if self.view.top_tracks() {
            self.view.current_page() < self.view.page_count(self.results.len())
        } else {
            self.results.len() >= PAGE_SIZE
        }
    }

    pub fn can_retreat_page(&self) -> bool {
        self.view.pagination_visible() && self.view.current_page() > 1
    }

    pub fn last_log(&self) -> Option<&str> {
        self.logs.last().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use musicui_core::track::Track;

    fn tracks(n: usize) -> ResultSet {
        ResultSet::new(
            (0..n)
                .map(|i| {
                    serde_json::from_value::<Track>(serde_json::json!({ "id": i }))
                        .unwrap()
                })
                .collect(),
        )
    }

    #[test]
    fn test_advance_in_paged_mode_needs_full_page() {
        let mut s = AppState::new(String::new());
        s.results = tracks(10);
        assert!(s.can_advance_page());
        s.results = tracks(4);
        assert!(!s.can_advance_page());
        assert!(!s.can_retreat_page());
    }

    #[test]
    fn test_top_tracks_pages_from_result_len() {
        let mut s = AppState::new(String::new());
        s.view.toggle_top_tracks();
        s.results = tracks(23);
        assert_eq!(s.page_buttons(), 3);
        assert!(s.can_advance_page());
        s.view.set_page(3);
        assert!(!s.can_advance_page());
        assert!(s.can_retreat_page());
    }

    #[test]
    fn test_no_paging_while_searching() {
        let mut s = AppState::new(String::new());
        s.view.set_page(2);
        s.results = tracks(10);
        s.view.set_search_text("x");
        assert!(!s.can_advance_page());
        assert!(!s.can_retreat_page());
    }

    #[test]
    fn test_page_buttons_cover_current_page() {
        let mut s = AppState::new(String::new());
        s.results = tracks(10);
        s.view.set_page(4);
        assert_eq!(s.page_buttons(), 4);
    }
}
