//! Playback controller: selection, play/pause and progress.
//!
//! The controller never talks to the audio player itself. Each transition
//! returns the [`AudioCommand`]s the caller must forward, in order, to the
//! one native player instance. Progress arrives through a subscription that
//! is acquired on every selection and released before the next one, so a
//! signal from a previous source can never move the progress bar.

use serde::Serialize;
use tracing::debug;

use crate::error::StateError;
use crate::track::{ResultSet, Track, TrackId};

/// Identifies one progress subscription on the native player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SubscriptionId(pub u64);

/// Instructions for the native audio player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioCommand {
    /// Replace the current source; the new source starts paused.
    Load { url: String },
    Play,
    Pause,
    /// Start delivering position/duration signals tagged with this id.
    Subscribe(SubscriptionId),
    /// Stop delivering signals for this id.
    Unsubscribe(SubscriptionId),
}

/// What the transport is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum PlayerPhase {
    #[default]
    Idle,
    Paused,
    Playing,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PlaybackState {
    pub selected: Option<TrackId>,
    pub is_playing: bool,
    /// 0.0..=100.0
    pub progress_percent: f64,
}

#[derive(Debug, Default)]
pub struct PlaybackController {
    state: PlaybackState,
    results: ResultSet,
    /// The selected track itself; the id alone cannot resolve it once the
    /// results have moved on to another page.
    current: Option<Track>,
    subscription: Option<SubscriptionId>,
    next_subscription: u64,
}

impl PlaybackController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn phase(&self) -> PlayerPhase {
        match (&self.state.selected, self.state.is_playing) {
            (None, _) => PlayerPhase::Idle,
            (Some(_), false) => PlayerPhase::Paused,
            (Some(_), true) => PlayerPhase::Playing,
        }
    }

    pub fn selected_track(&self) -> Option<&Track> {
        self.current.as_ref()
    }

    pub fn results(&self) -> &ResultSet {
        &self.results
    }

    pub fn subscription(&self) -> Option<SubscriptionId> {
        self.subscription
    }

    /// Swap in a freshly fetched result set for next/previous navigation.
    /// The selection is kept even when the new set no longer contains it.
    pub fn set_results(&mut self, results: ResultSet) {
        self.results = results;
    }

    /// Any state → Paused on `track`, progress back to zero.
    pub fn select(&mut self, track: Track) -> Vec<AudioCommand> {
        let mut cmds = Vec::with_capacity(3);
        if let Some(old) = self.subscription.take() {
            cmds.push(AudioCommand::Unsubscribe(old));
        }

        debug!("playback: select {} ({})", track.id, track.name);
        self.state = PlaybackState {
            selected: Some(track.id.clone()),
            is_playing: false,
            progress_percent: 0.0,
        };
        cmds.push(AudioCommand::Load {
            url: track.url.clone(),
        });
        self.current = Some(track);

        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        self.subscription = Some(id);
        cmds.push(AudioCommand::Subscribe(id));
        cmds
    }

    /// Paused ↔ Playing. Nothing happens while idle.
    pub fn toggle_play_pause(&mut self) -> Option<AudioCommand> {
        match self.phase() {
            PlayerPhase::Idle => None,
            PlayerPhase::Paused => {
                self.state.is_playing = true;
                Some(AudioCommand::Play)
            }
            PlayerPhase::Playing => {
                self.state.is_playing = false;
                Some(AudioCommand::Pause)
            }
        }
    }

    /// The native player could not start the source; Playing falls back to
    /// Paused so the transport never claims audio that is not there.
    pub fn abort_play(&mut self) {
        if self.phase() == PlayerPhase::Playing {
            debug!("playback: play failed, back to paused");
            self.state.is_playing = false;
        }
    }

    /// Select the track after the current one, wrapping at the end.
    pub fn try_next(&mut self) -> Result<Vec<AudioCommand>, StateError> {
        let (idx, len) = self.current_position()?;
        self.select_index((idx + 1) % len)
    }

    /// Select the track before the current one, wrapping at the start.
    pub fn try_previous(&mut self) -> Result<Vec<AudioCommand>, StateError> {
        let (idx, len) = self.current_position()?;
        self.select_index((idx + len - 1) % len)
    }

    /// Like [`try_next`](Self::try_next) but an invalid state is a no-op.
    pub fn next(&mut self) -> Vec<AudioCommand> {
        self.try_next().unwrap_or_else(|e| {
            debug!("playback: next ignored: {}", e);
            Vec::new()
        })
    }

    pub fn previous(&mut self) -> Vec<AudioCommand> {
        self.try_previous().unwrap_or_else(|e| {
            debug!("playback: previous ignored: {}", e);
            Vec::new()
        })
    }

    /// Position signal from the native player. Signals from any subscription
    /// other than the live one are dropped.
    pub fn on_progress_signal(
        &mut self,
        subscription: SubscriptionId,
        current_time: f64,
        duration: f64,
    ) -> bool {
        if self.subscription != Some(subscription) {
            debug!("playback: stale progress signal from {:?}", subscription);
            return false;
        }
        let pct = progress_percent(current_time, duration).unwrap_or(0.0);
        if pct == self.state.progress_percent {
            return false;
        }
        self.state.progress_percent = pct;
        true
    }

    /// The native player reached the end of the current source.
    pub fn on_track_ended(&mut self) {
        if self.state.selected.is_some() {
            self.state.is_playing = false;
            self.state.progress_percent = 100.0;
        }
    }

    /// Release the live subscription. Called when the player goes away.
    pub fn teardown(&mut self) -> Vec<AudioCommand> {
        let mut cmds = Vec::new();
        if let Some(id) = self.subscription.take() {
            cmds.push(AudioCommand::Unsubscribe(id));
        }
        if self.state.is_playing {
            self.state.is_playing = false;
            cmds.push(AudioCommand::Pause);
        }
        cmds
    }

    fn current_position(&self) -> Result<(usize, usize), StateError> {
        let id = self
            .state
            .selected
            .as_ref()
            .ok_or(StateError::InvalidState("no track selected"))?;
        if self.results.is_empty() {
            return Err(StateError::InvalidState("result set is empty"));
        }
        let idx = self
            .results
            .position(id)
            .ok_or(StateError::InvalidState("selection not in current results"))?;
        Ok((idx, self.results.len()))
    }

    fn select_index(&mut self, idx: usize) -> Result<Vec<AudioCommand>, StateError> {
        let track = self
            .results
            .get(idx)
            .cloned()
            .ok_or(StateError::InvalidState("index out of range"))?;
        Ok(self.select(track))
    }
}

/// `current / duration * 100`, clamped to 0..=100.
pub fn progress_percent(current_time: f64, duration: f64) -> Result<f64, StateError> {
    if !duration.is_finite() || duration <= 0.0 || !current_time.is_finite() {
        return Err(StateError::DivisionUndefined);
    }
    Ok((current_time / duration * 100.0).clamp(0.0, 100.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::sample_track;

    fn abc() -> ResultSet {
        ResultSet::new(vec![sample_track("a"), sample_track("b"), sample_track("c")])
    }

    fn selected(ctl: &PlaybackController) -> Option<&str> {
        ctl.state().selected.as_ref().map(|id| id.as_str())
    }

    #[test]
    fn test_select_resets_transport() {
        let mut ctl = PlaybackController::new();
        ctl.set_results(abc());
        ctl.select(sample_track("a"));
        ctl.toggle_play_pause();
        let sub = ctl.subscription().unwrap();
        ctl.on_progress_signal(sub, 30.0, 60.0);
        assert!(ctl.state().is_playing);
        assert_eq!(ctl.state().progress_percent, 50.0);

        ctl.select(sample_track("b"));
        assert!(!ctl.state().is_playing);
        assert_eq!(ctl.state().progress_percent, 0.0);
        assert_eq!(ctl.phase(), PlayerPhase::Paused);
    }

    #[test]
    fn test_select_commands_release_before_acquire() {
        let mut ctl = PlaybackController::new();
        let first = ctl.select(sample_track("a"));
        assert_eq!(
            first,
            vec![
                AudioCommand::Load {
                    url: "https://cdn.example.com/a.mp3".into()
                },
                AudioCommand::Subscribe(SubscriptionId(1)),
            ]
        );
        let second = ctl.select(sample_track("b"));
        assert_eq!(second[0], AudioCommand::Unsubscribe(SubscriptionId(1)));
        assert_eq!(second[2], AudioCommand::Subscribe(SubscriptionId(2)));
    }

    #[test]
    fn test_toggle() {
        let mut ctl = PlaybackController::new();
        assert_eq!(ctl.toggle_play_pause(), None);
        assert_eq!(ctl.phase(), PlayerPhase::Idle);

        ctl.select(sample_track("a"));
        assert_eq!(ctl.toggle_play_pause(), Some(AudioCommand::Play));
        assert_eq!(ctl.phase(), PlayerPhase::Playing);
        assert_eq!(ctl.toggle_play_pause(), Some(AudioCommand::Pause));
        assert_eq!(ctl.phase(), PlayerPhase::Paused);
    }

    #[test]
    fn test_next_previous_wrap() {
        let mut ctl = PlaybackController::new();
        ctl.set_results(abc());
        ctl.select(sample_track("b"));

        ctl.next();
        assert_eq!(selected(&ctl), Some("c"));
        ctl.next();
        assert_eq!(selected(&ctl), Some("a"));
        ctl.previous();
        assert_eq!(selected(&ctl), Some("c"));
    }

    #[test]
    fn test_cyclic_closure() {
        let mut ctl = PlaybackController::new();
        ctl.set_results(abc());
        ctl.select(sample_track("b"));
        for _ in 0..3 {
            ctl.next();
        }
        assert_eq!(selected(&ctl), Some("b"));
        for _ in 0..3 {
            ctl.previous();
        }
        assert_eq!(selected(&ctl), Some("b"));
    }

    #[test]
    fn test_next_resets_playing() {
        let mut ctl = PlaybackController::new();
        ctl.set_results(abc());
        ctl.select(sample_track("a"));
        ctl.toggle_play_pause();
        let cmds = ctl.next();
        assert!(cmds.contains(&AudioCommand::Load {
            url: "https://cdn.example.com/b.mp3".into()
        }));
        assert!(!ctl.state().is_playing);
    }

    #[test]
    fn test_next_invalid_states() {
        let mut ctl = PlaybackController::new();
        assert_eq!(
            ctl.try_next(),
            Err(StateError::InvalidState("no track selected"))
        );

        ctl.select(sample_track("a"));
        assert!(matches!(ctl.try_next(), Err(StateError::InvalidState(_))));
        assert!(ctl.next().is_empty());

        // selection is gone from a newly fetched page
        ctl.set_results(ResultSet::new(vec![sample_track("x"), sample_track("y")]));
        assert!(ctl.previous().is_empty());
        assert_eq!(selected(&ctl), Some("a"));
        assert_eq!(ctl.selected_track().map(|t| t.name.as_str()), Some("Song a"));
    }

    #[test]
    fn test_progress_signal() {
        let mut ctl = PlaybackController::new();
        ctl.select(sample_track("a"));
        let sub = ctl.subscription().unwrap();

        assert!(ctl.on_progress_signal(sub, 50.0, 200.0));
        assert_eq!(ctl.state().progress_percent, 25.0);

        ctl.on_progress_signal(sub, 10.0, 0.0);
        assert_eq!(ctl.state().progress_percent, 0.0);

        ctl.on_progress_signal(sub, 10.0, f64::NAN);
        assert!(!ctl.state().progress_percent.is_nan());

        ctl.on_progress_signal(sub, 201.0, 200.0);
        assert_eq!(ctl.state().progress_percent, 100.0);
    }

    #[test]
    fn test_stale_subscription_ignored() {
        let mut ctl = PlaybackController::new();
        ctl.select(sample_track("a"));
        let old = ctl.subscription().unwrap();
        ctl.select(sample_track("b"));

        assert!(!ctl.on_progress_signal(old, 90.0, 100.0));
        assert_eq!(ctl.state().progress_percent, 0.0);
    }

    #[test]
    fn test_teardown_releases_subscription() {
        let mut ctl = PlaybackController::new();
        assert!(ctl.teardown().is_empty());

        ctl.select(sample_track("a"));
        ctl.toggle_play_pause();
        let sub = ctl.subscription().unwrap();
        let cmds = ctl.teardown();
        assert_eq!(cmds, vec![AudioCommand::Unsubscribe(sub), AudioCommand::Pause]);
        assert!(ctl.subscription().is_none());
        assert!(!ctl.on_progress_signal(sub, 1.0, 2.0));
    }

    #[test]
    fn test_track_ended() {
        let mut ctl = PlaybackController::new();
        ctl.on_track_ended();
        assert_eq!(ctl.state().progress_percent, 0.0);

        ctl.select(sample_track("a"));
        ctl.toggle_play_pause();
        ctl.on_track_ended();
        assert_eq!(ctl.phase(), PlayerPhase::Paused);
        assert_eq!(ctl.state().progress_percent, 100.0);
    }

    #[test]
    fn test_abort_play_reverts_to_paused() {
        let mut ctl = PlaybackController::new();
        ctl.abort_play();
        assert_eq!(ctl.phase(), PlayerPhase::Idle);

        ctl.select(sample_track("a"));
        assert_eq!(ctl.toggle_play_pause(), Some(AudioCommand::Play));
        ctl.abort_play();
        assert_eq!(ctl.phase(), PlayerPhase::Paused);
        assert_eq!(ctl.selected_track().map(|t| t.id.clone()), Some(TrackId::from("a")));
        assert_eq!(ctl.toggle_play_pause(), Some(AudioCommand::Play));
    }

    #[test]
    fn test_progress_percent_fn() {
        assert_eq!(progress_percent(50.0, 200.0), Ok(25.0));
        assert_eq!(progress_percent(1.0, 0.0), Err(StateError::DivisionUndefined));
        assert_eq!(progress_percent(-3.0, 10.0), Ok(0.0));
    }
}
