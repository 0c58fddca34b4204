/// PlayerCore: single-owner event loop for playback.
///
/// Owns the `PlaybackController`, the `MpvDriver` and the live `MpvHandle`.
/// The App sends `PlayerEvent`s in; every transition that changes what the
/// user sees is broadcast back as `BroadcastMessage::StateUpdated` carrying a
/// `PlaybackSnapshot`.
///
/// The controller decides, mpv executes: each controller transition yields
/// `AudioCommand`s which are forwarded to mpv in order. Progress arrives via
/// `observe_property` ids that encode the subscription they belong to, so a
/// late `time-pos` from a released subscription is recognised and dropped.
use musicui_core::config::Config;
use musicui_core::playback::{AudioCommand, PlaybackController, PlaybackState, PlayerPhase};
use musicui_core::track::{ResultSet, Track};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use crate::mpv::{decode_progress_obs, MpvDriver, MpvEvent, MpvHandle, ProgressProperty};
use crate::BroadcastMessage;

// ── PlayerEvent ───────────────────────────────────────────────────────────────

/// All inputs into the PlayerCore loop.
#[derive(Debug)]
pub enum PlayerEvent {
    Select(Track),
    TogglePause,
    Next,
    Previous,
    /// A new result set was applied by the view; next/previous walk it.
    ResultsChanged(ResultSet),
    /// Raw mpv unsolicited event (forwarded from reader task).
    Mpv(MpvEvent),
    /// Heartbeat: check process liveness.
    HeartbeatTick,
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MpvHealth {
    #[default]
    Absent,
    Starting,
    Running,
    Dead,
}

impl MpvHealth {
    pub fn label(self) -> &'static str {
        match self {
            Self::Absent => "idle",
            Self::Starting => "starting",
            Self::Running => "mpv",
            Self::Dead => "mpv down",
        }
    }
}

/// What the UI needs to render the now-playing pane.
#[derive(Debug, Clone, Default)]
pub struct PlaybackSnapshot {
    pub state: PlaybackState,
    pub phase: PlayerPhase,
    pub track: Option<Track>,
    pub elapsed_secs: Option<f64>,
    pub duration_secs: Option<f64>,
    pub mpv_health: MpvHealth,
}

// ── PlayerCore ────────────────────────────────────────────────────────────────

pub struct PlayerCore {
    controller: PlaybackController,
    mpv_driver: MpvDriver,
    mpv_handle: Option<MpvHandle>,
    mpv_health: MpvHealth,
    volume: f32,
    /// Loop-back sender so mpv events and heartbeats land in our own queue.
    event_tx: mpsc::Sender<PlayerEvent>,
    broadcast_tx: broadcast::Sender<BroadcastMessage>,
    /// Latest values observed for the live subscription.
    obs_time_pos: Option<f64>,
    obs_duration: Option<f64>,
    /// mpv reached end-of-file for the current source; resuming reloads it.
    source_ended: bool,
    /// A `loadfile` was sent and mpv has not reported `start-file` for it yet.
    /// Any end-file seen meanwhile belongs to the previous source.
    awaiting_start: bool,
}

impl PlayerCore {
    pub fn new(
        config: &Config,
        broadcast_tx: broadcast::Sender<BroadcastMessage>,
        event_tx: mpsc::Sender<PlayerEvent>,
    ) -> Self {
        let volume = config.mpv.default_volume.clamp(0.0, 1.0);
        Self {
            controller: PlaybackController::new(),
            mpv_driver: MpvDriver::new(volume),
            mpv_handle: None,
            mpv_health: MpvHealth::Absent,
            volume,
            event_tx,
            broadcast_tx,
            obs_time_pos: None,
            obs_duration: None,
            source_ended: false,
            awaiting_start: false,
        }
    }

    /// Run the core event loop. Returns on `Shutdown` or when every sender
    /// has gone away (App exited).
    pub async fn run(mut self, mut event_rx: mpsc::Receiver<PlayerEvent>) -> anyhow::Result<()> {
        info!("PlayerCore: starting event loop");

        let heartbeat_tx = self.event_tx.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(tokio::time::Duration::from_secs(10)).await;
                if heartbeat_tx.send(PlayerEvent::HeartbeatTick).await.is_err() {
                    break;
                }
            }
        });

        loop {
            match event_rx.recv().await {
                None => {
                    info!("PlayerCore: event channel closed, shutting down");
                    break;
                }
                Some(PlayerEvent::Shutdown) => {
                    info!("PlayerCore: shutdown requested");
                    break;
                }
                Some(evt) => self.handle_event(evt).await,
            }
        }

        self.cleanup().await;
        Ok(())
    }

    async fn handle_event(&mut self, evt: PlayerEvent) {
        match evt {
            PlayerEvent::Select(track) => {
                info!("PlayerCore: select '{}' by {}", track.name, track.artist);
                let cmds = self.controller.select(track);
                self.execute(cmds).await;
                self.publish();
            }
            PlayerEvent::TogglePause => {
                if let Some(cmd) = self.controller.toggle_play_pause() {
                    self.execute(vec![cmd]).await;
                    self.publish();
                }
            }
            PlayerEvent::Next => {
                let cmds = self.controller.next();
                if !cmds.is_empty() {
                    self.execute(cmds).await;
                    self.publish();
                }
            }
            PlayerEvent::Previous => {
                let cmds = self.controller.previous();
                if !cmds.is_empty() {
                    self.execute(cmds).await;
                    self.publish();
                }
            }
            PlayerEvent::ResultsChanged(results) => {
                debug!("PlayerCore: results changed ({} tracks)", results.len());
                self.controller.set_results(results);
            }
            PlayerEvent::Mpv(evt) => {
                if self.handle_mpv_event(&evt) {
                    self.publish();
                }
            }
            PlayerEvent::HeartbeatTick => {
                if self.mpv_handle.is_some() && !self.mpv_driver.process_alive() {
                    warn!("PlayerCore: heartbeat: mpv process died");
                    self.mpv_handle = None;
                    self.set_mpv_health(MpvHealth::Dead);
                    self.log("mpv exited; it restarts on the next play or selection");
                }
            }
            PlayerEvent::Shutdown => {}
        }
    }

    // ── mpv event handler ─────────────────────────────────────────────────────

    /// Returns `true` when the snapshot changed.
    fn handle_mpv_event(&mut self, evt: &MpvEvent) -> bool {
        if let Some((obs_id, data)) = evt.as_property_change() {
            let Some((sub, prop)) = decode_progress_obs(obs_id) else {
                return false;
            };
            if self.controller.subscription() != Some(sub) {
                debug!("mpv: dropping progress for released {:?}", sub);
                return false;
            }
            // idle mpv unsets time-pos/duration after eof; the track stays at its end
            if self.source_ended && data.is_null() {
                return false;
            }
            let val = data.as_f64();
            match prop {
                ProgressProperty::TimePos => self.obs_time_pos = val,
                ProgressProperty::Duration => self.obs_duration = val,
            }
            // a missing duration is the undefined division case and reads as 0
            self.controller.on_progress_signal(
                sub,
                self.obs_time_pos.unwrap_or(0.0),
                self.obs_duration.unwrap_or(0.0),
            );
            return true;
        }

        if evt.event_name() == Some("start-file") {
            self.awaiting_start = false;
            return false;
        }

        let reason = evt.end_file_reason();
        if reason.is_some() && self.awaiting_start {
            debug!("mpv: end-file for the previous source ignored");
            return false;
        }
        match reason {
            Some("eof") => {
                info!("mpv: end-file reason=eof");
                self.source_ended = true;
                self.controller.on_track_ended();
                true
            }
            Some("error") => {
                warn!("mpv: end-file reason=error");
                self.log("could not play the selected track");
                false
            }
            Some(reason) => {
                debug!("mpv: end-file reason={}", reason);
                false
            }
            None => false,
        }
    }

    // ── command execution ─────────────────────────────────────────────────────

    async fn execute(&mut self, cmds: Vec<AudioCommand>) {
        for cmd in cmds {
            if let Err(e) = self.execute_one(&cmd).await {
                warn!("PlayerCore: {:?} failed: {}", cmd, e);
                if cmd == AudioCommand::Play {
                    self.controller.abort_play();
                    self.log("could not resume playback");
                }
            }
        }
    }

    async fn execute_one(&mut self, cmd: &AudioCommand) -> anyhow::Result<()> {
        match cmd {
            AudioCommand::Load { url } => {
                self.obs_time_pos = None;
                self.obs_duration = None;
                self.source_ended = false;
                let Some((handle, _)) = self.ensure_mpv_handle().await else {
                    self.log("mpv unavailable; cannot load track");
                    return Ok(());
                };
                self.load_source(&handle, url).await?;
            }
            AudioCommand::Play => {
                let Some((handle, spawned)) = self.ensure_mpv_handle().await else {
                    self.controller.abort_play();
                    self.log("mpv unavailable; cannot play track");
                    return Ok(());
                };
                // a fresh mpv is idle, and so is one that reached eof
                if spawned || self.source_ended {
                    if let Some(url) = self.controller.selected_track().map(|t| t.url.clone()) {
                        self.load_source(&handle, &url).await?;
                    }
                    self.source_ended = false;
                }
                if spawned {
                    if let Some(sub) = self.controller.subscription() {
                        handle.observe_progress(sub).await?;
                    }
                }
                handle.set_pause(false).await?;
            }
            AudioCommand::Pause => {
                if let Some(handle) = self.mpv_handle.as_ref() {
                    handle.set_pause(true).await?;
                }
            }
            AudioCommand::Subscribe(sub) => {
                if let Some(handle) = self.mpv_handle.as_ref() {
                    handle.observe_progress(*sub).await?;
                }
            }
            AudioCommand::Unsubscribe(sub) => {
                if let Some(handle) = self.mpv_handle.as_ref() {
                    handle.unobserve_progress(*sub).await?;
                }
            }
        }
        Ok(())
    }

    // ── mpv handle management ─────────────────────────────────────────────────

    fn set_mpv_health(&mut self, health: MpvHealth) {
        if self.mpv_health != health {
            info!(
                "PlayerCore: mpv health {:?} → {:?}",
                self.mpv_health, health
            );
            self.mpv_health = health;
            self.publish();
        }
    }

    async fn load_source(&mut self, handle: &MpvHandle, url: &str) -> anyhow::Result<()> {
        self.obs_time_pos = None;
        self.obs_duration = None;
        self.awaiting_start = true;
        handle.load_paused(url).await
    }

    /// The live mpv handle, spawning mpv when it is missing or dead. The flag
    /// is set when this call started a new process.
    async fn ensure_mpv_handle(&mut self) -> Option<(MpvHandle, bool)> {
        if self.mpv_handle.is_some() && !self.mpv_driver.process_alive() {
            warn!("PlayerCore: mpv process died, dropping handle");
            self.mpv_handle = None;
            self.set_mpv_health(MpvHealth::Dead);
        }

        let mut spawned = false;
        if self.mpv_handle.is_none() {
            // one forwarder per connection: mpv events → our own queue
            let (mpv_tx, mut mpv_rx) = mpsc::channel::<MpvEvent>(64);
            let core_tx = self.event_tx.clone();
            tokio::spawn(async move {
                while let Some(evt) = mpv_rx.recv().await {
                    if core_tx.send(PlayerEvent::Mpv(evt)).await.is_err() {
                        break;
                    }
                }
            });

            self.set_mpv_health(MpvHealth::Starting);
            let handle = match self.mpv_driver.spawn_and_connect(mpv_tx).await {
                Ok(h) => h,
                Err(e) => {
                    warn!("PlayerCore: failed to start mpv: {}", e);
                    self.set_mpv_health(MpvHealth::Dead);
                    return None;
                }
            };
            if let Err(e) = handle.set_volume(self.volume).await {
                debug!("PlayerCore: initial volume not applied: {}", e);
            }
            self.mpv_handle = Some(handle);
            self.set_mpv_health(MpvHealth::Running);
            spawned = true;
        }

        self.mpv_handle.clone().map(|h| (h, spawned))
    }

    // ── broadcast ─────────────────────────────────────────────────────────────

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            state: self.controller.state().clone(),
            phase: self.controller.phase(),
            track: self.controller.selected_track().cloned(),
            elapsed_secs: self.obs_time_pos,
            duration_secs: self.obs_duration,
            mpv_health: self.mpv_health,
        }
    }

    fn publish(&self) {
        let _ = self
            .broadcast_tx
            .send(BroadcastMessage::StateUpdated(self.snapshot()));
    }

    fn log(&self, msg: &str) {
        let _ = self.broadcast_tx.send(BroadcastMessage::Log(msg.to_string()));
    }

    async fn cleanup(&mut self) {
        info!("PlayerCore: cleanup, releasing subscription and killing mpv");
        let cmds = self.controller.teardown();
        for cmd in &cmds {
            if let Err(e) = self.execute_one(cmd).await {
                debug!("PlayerCore: teardown {:?}: {}", cmd, e);
            }
        }
        if let Some(handle) = self.mpv_handle.take() {
            if let Err(e) = handle.stop().await {
                error!("PlayerCore: mpv stop failed: {}", e);
            }
        }
        self.mpv_driver.kill().await;
    }
}
