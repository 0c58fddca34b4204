//! Action enum: all user-initiated intents.

use musicui_core::track::Track;

/// Unique identifier for a focusable component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentId {
    TrackList,
    NowPlaying,
}

/// All actions that can flow through the system.
/// Components produce Actions; the App dispatches them.
#[derive(Debug, Clone)]
pub enum Action {
    // ── Playback ─────────────────────────────────────────────────────────────
    Select(Track),
    TogglePause,
    Next,
    Prev,

    // ── Catalog view ─────────────────────────────────────────────────────────
    SetSearch(String),
    ToggleTopTracks,
    SetPage(usize),
    NextPage,
    PrevPage,

    // ── Navigation ───────────────────────────────────────────────────────────
    FocusNext,
    FocusPrev,
    FocusPane(ComponentId),

    // ── Filter/search ────────────────────────────────────────────────────────
    OpenFilter,
    CloseFilter,

    // ── System ───────────────────────────────────────────────────────────────
    CopyToClipboard(String),
    Quit,
    Resize(u16, u16),
}
