/// mpv IPC driver with separated reader/writer tasks.
///
/// ```text
///   MpvDriver::spawn_and_connect()
///         │
///         ├── writer_task   ← receives MpvRequest via mpsc, serialises → socket
///         └── reader_task   ← reads JSON lines from socket
///                                ├── response (has request_id) → matched oneshot::Sender
///                                └── event / property-change   → event_tx channel
/// ```
///
/// `MpvHandle` is cheaply cloneable; `send(cmd)` resolves with mpv's reply.
/// `MpvDriver` owns the child process.
///
/// Platform notes:
/// - Unix:   Unix domain sockets
/// - Windows: Named pipes  \\.\pipe\<name>
use musicui_core::playback::SubscriptionId;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, info, warn};

#[cfg(unix)]
use tokio::net::UnixStream;

#[cfg(windows)]
use tokio::net::windows::named_pipe::ClientOptions;

static NEXT_REQ_ID: AtomicU64 = AtomicU64::new(1);

// ── observation property IDs ──────────────────────────────────────────────────

/// Progress observations are allocated per subscription above this base:
/// `base + 2n` is `time-pos` and `base + 2n + 1` is `duration` for
/// subscription `n`. Unobserving one subscription therefore never touches
/// another.
pub const OBS_PROGRESS_BASE: u64 = 100;

/// Which progress property a property-change event carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressProperty {
    TimePos,
    Duration,
}

pub fn progress_obs_ids(sub: SubscriptionId) -> (u64, u64) {
    let time_pos = OBS_PROGRESS_BASE + sub.0 * 2;
    (time_pos, time_pos + 1)
}

/// Map an observation id back to its subscription and property.
pub fn decode_progress_obs(id: u64) -> Option<(SubscriptionId, ProgressProperty)> {
    let offset = id.checked_sub(OBS_PROGRESS_BASE)?;
    let prop = if offset % 2 == 0 {
        ProgressProperty::TimePos
    } else {
        ProgressProperty::Duration
    };
    Some((SubscriptionId(offset / 2), prop))
}

// ── internal channel types ────────────────────────────────────────────────────

struct PendingRequest {
    req_id: u64,
    payload: String, // serialised JSON line (already has '\n')
    reply: oneshot::Sender<anyhow::Result<Value>>,
}

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<anyhow::Result<Value>>>>>;

/// An mpv event / property-change that arrived unsolicited (no request_id).
#[derive(Debug, Clone)]
pub struct MpvEvent {
    pub raw: Value,
}

impl MpvEvent {
    /// Returns `Some((obs_id, data))` if this is a property-change event.
    pub fn as_property_change(&self) -> Option<(u64, &Value)> {
        if self.raw.get("event")?.as_str()? == "property-change" {
            let id = self.raw.get("id")?.as_u64()?;
            let data = self.raw.get("data").unwrap_or(&Value::Null);
            Some((id, data))
        } else {
            None
        }
    }

    /// Returns the event name, e.g. "end-file", "start-file", "file-loaded".
    pub fn event_name(&self) -> Option<&str> {
        self.raw.get("event")?.as_str()
    }

    /// `reason` of an `end-file` event ("eof", "stop", "error", ...).
    pub fn end_file_reason(&self) -> Option<&str> {
        if self.event_name()? != "end-file" {
            return None;
        }
        self.raw.get("reason")?.as_str()
    }
}

// ── public handle ─────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MpvHandle {
    tx: mpsc::Sender<PendingRequest>,
}

impl MpvHandle {
    pub async fn send(&self, command: Value) -> anyhow::Result<Value> {
        let req_id = NEXT_REQ_ID.fetch_add(1, Ordering::Relaxed);
        let msg = json!({ "command": command, "request_id": req_id });
        let mut raw = serde_json::to_string(&msg)?;
        raw.push('\n');

        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(PendingRequest {
                req_id,
                payload: raw,
                reply: reply_tx,
            })
            .await
            .map_err(|_| anyhow::anyhow!("mpv writer task gone"))?;

        tokio::time::timeout(tokio::time::Duration::from_secs(5), reply_rx)
            .await
            .map_err(|_| anyhow::anyhow!("mpv IPC timeout for req={}", req_id))?
            .map_err(|_| anyhow::anyhow!("mpv reply channel dropped req={}", req_id))?
    }
}

// ── driver ────────────────────────────────────────────────────────────────────

/// Owns the mpv child process.
pub struct MpvDriver {
    pub socket_name: String,
    process: Option<tokio::process::Child>,
    binary: Option<std::path::PathBuf>,
    pub last_volume: f32,
}

impl MpvDriver {
    pub fn new(volume: f32) -> Self {
        Self::with_binary(volume, musicui_core::platform::find_mpv_binary())
    }

    /// A driver bound to an explicit mpv binary; `None` means mpv is not installed.
    pub fn with_binary(volume: f32, binary: Option<std::path::PathBuf>) -> Self {
        Self {
            socket_name: musicui_core::platform::mpv_socket_name(),
            process: None,
            binary,
            last_volume: volume,
        }
    }

    fn binary(&self) -> anyhow::Result<&std::path::Path> {
        self.binary
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("mpv binary not found"))
    }

    pub fn process_alive(&mut self) -> bool {
        if let Some(ref mut child) = self.process {
            match child.try_wait() {
                Ok(None) => true,
                Ok(Some(status)) => {
                    if let Some(code) = status.code() {
                        warn!("mpv process exited with code: {}", code);
                    } else {
                        warn!("mpv process terminated by signal");
                    }
                    false
                }
                Err(e) => {
                    warn!("mpv process_alive check failed: {}", e);
                    false
                }
            }
        } else {
            false
        }
    }

    pub async fn kill(&mut self) {
        if let Some(mut p) = self.process.take() {
            let _ = p.kill().await;
        }
    }

    /// `mpv` in idle mode, audio only, with the IPC server at our socket name.
    fn command(&self, stderr: std::process::Stdio) -> anyhow::Result<tokio::process::Command> {
        let binary = self.binary()?;
        let volume = (self.last_volume * 100.0).clamp(0.0, 100.0).round() as i64;

        let mut cmd = tokio::process::Command::new(binary);
        cmd.args(["--no-video", "--idle=yes", "--quiet"])
            .arg(musicui_core::platform::mpv_socket_arg())
            .arg(format!("--volume={}", volume))
            .stdout(std::process::Stdio::null())
            .stderr(stderr)
            .kill_on_drop(true);
        Ok(cmd)
    }

    async fn respawn(&mut self, stderr: std::process::Stdio) -> anyhow::Result<()> {
        self.kill().await;
        let child = self.command(stderr)?.spawn()?;
        info!("mpv: spawned pid {:?}", child.id());
        self.process = Some(child);
        Ok(())
    }

    #[cfg(unix)]
    pub async fn spawn_and_connect(
        &mut self,
        event_tx: mpsc::Sender<MpvEvent>,
    ) -> anyhow::Result<MpvHandle> {
        self.binary()?;
        let socket_path = std::path::PathBuf::from(&self.socket_name);
        let _ = tokio::fs::remove_file(&socket_path).await;

        let stderr_path = musicui_core::platform::data_dir().join("mpv-stderr.log");
        let stderr_file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&stderr_path)?;
        debug!("mpv: stderr → {}", stderr_path.display());
        self.respawn(stderr_file.into()).await?;

        // the socket shows up once mpv has parsed its options
        for _ in 0..50 {
            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
            if let Ok(stream) = UnixStream::connect(&socket_path).await {
                info!("mpv: connected to {}", socket_path.display());
                let (read_half, write_half) = stream.into_split();
                return Ok(start_io_tasks(read_half, write_half, event_tx));
            }
        }
        anyhow::bail!("mpv IPC socket {} did not appear", socket_path.display())
    }

    #[cfg(windows)]
    pub async fn spawn_and_connect(
        &mut self,
        event_tx: mpsc::Sender<MpvEvent>,
    ) -> anyhow::Result<MpvHandle> {
        self.respawn(std::process::Stdio::null()).await?;

        let pipe_path = format!(r"\\.\pipe\{}", self.socket_name);
        for _ in 0..50 {
            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
            if let Ok(client) = ClientOptions::new().open(&pipe_path) {
                info!("mpv: connected to {}", pipe_path);
                let (read_half, write_half) = tokio::io::split(client);
                return Ok(start_io_tasks(read_half, write_half, event_tx));
            }
        }
        anyhow::bail!("mpv named pipe {} did not appear", pipe_path)
    }
}

fn start_io_tasks<R, W>(read_half: R, write_half: W, event_tx: mpsc::Sender<MpvEvent>) -> MpvHandle
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
    W: tokio::io::AsyncWrite + Unpin + Send + 'static,
{
    let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
    let (cmd_tx, cmd_rx) = mpsc::channel::<PendingRequest>(64);

    tokio::spawn(writer_task(write_half, cmd_rx, pending.clone()));
    tokio::spawn(reader_task(BufReader::new(read_half), pending, event_tx));

    MpvHandle { tx: cmd_tx }
}

// ── reader task ───────────────────────────────────────────────────────────────

/// One line from the socket: either the reply to a request or an event.
enum Incoming {
    Reply(u64, anyhow::Result<Value>),
    Event(MpvEvent),
}

fn classify(line: &str) -> Option<Incoming> {
    let val: Value = serde_json::from_str(line).ok()?;
    let Some(req_id) = val.get("request_id").and_then(Value::as_u64) else {
        return Some(Incoming::Event(MpvEvent { raw: val }));
    };
    let result = match val.get("error").and_then(Value::as_str) {
        Some("success") => Ok(val),
        Some(err) => Err(anyhow::anyhow!("mpv error: {}", err)),
        None => Err(anyhow::anyhow!("mpv reply without status")),
    };
    Some(Incoming::Reply(req_id, result))
}

async fn fail_pending(pending: &PendingMap, reason: &str) {
    let mut map = pending.lock().await;
    for (_, tx) in map.drain() {
        let _ = tx.send(Err(anyhow::anyhow!("mpv IPC {}", reason)));
    }
}

async fn reader_task<R>(mut reader: BufReader<R>, pending: PendingMap, event_tx: mpsc::Sender<MpvEvent>)
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                debug!("mpv reader: connection closed");
                fail_pending(&pending, "connection closed").await;
                break;
            }
            Ok(_) => match classify(line.trim()) {
                Some(Incoming::Reply(req_id, result)) => {
                    if let Err(e) = &result {
                        debug!("mpv reader: req={} {}", req_id, e);
                    }
                    match pending.lock().await.remove(&req_id) {
                        Some(tx) => {
                            let _ = tx.send(result);
                        }
                        None => debug!("mpv reader: reply for unknown req={}", req_id),
                    }
                }
                Some(Incoming::Event(evt)) => {
                    if event_tx.send(evt).await.is_err() {
                        debug!("mpv reader: event receiver gone");
                    }
                }
                None if line.trim().is_empty() => {}
                None => debug!("mpv reader: unparseable line {:?}", line.trim()),
            },
            Err(e) => {
                warn!("mpv reader: read error: {}", e);
                fail_pending(&pending, "read error").await;
                break;
            }
        }
    }
}

// ── writer task ───────────────────────────────────────────────────────────────

async fn writer_task<W>(mut writer: W, mut rx: mpsc::Receiver<PendingRequest>, pending: PendingMap)
where
    W: tokio::io::AsyncWrite + Unpin,
{
    while let Some(req) = rx.recv().await {
        // register before writing so the reader can match the reply
        {
            let mut map = pending.lock().await;
            map.insert(req.req_id, req.reply);
        }
        debug!(
            "mpv writer: send req={} payload={}",
            req.req_id,
            req.payload.trim()
        );
        if let Err(e) = writer.write_all(req.payload.as_bytes()).await {
            warn!("mpv writer: write error: {}", e);
            let mut map = pending.lock().await;
            if let Some(tx) = map.remove(&req.req_id) {
                let _ = tx.send(Err(anyhow::anyhow!("mpv write error: {}", e)));
            }
            break;
        }
    }
    debug!("mpv writer: task exiting");
}

// ── convenience wrappers (used by PlayerCore) ─────────────────────────────────

impl MpvHandle {
    /// Replace the current source. The new file starts paused.
    pub async fn load_paused(&self, url: &str) -> anyhow::Result<()> {
        debug!("mpv: loadfile url={}", url);
        // pause is a global property and carries over into the next file
        self.set_pause(true).await?;
        self.send(json!(["loadfile", url, "replace"])).await?;
        Ok(())
    }

    pub async fn set_pause(&self, paused: bool) -> anyhow::Result<()> {
        self.send(json!(["set_property", "pause", paused])).await?;
        Ok(())
    }

    pub async fn set_volume(&self, vol: f32) -> anyhow::Result<()> {
        let vol_pct = (vol * 100.0).clamp(0.0, 100.0);
        self.send(json!(["set_property", "volume", vol_pct]))
            .await?;
        Ok(())
    }

    pub async fn stop(&self) -> anyhow::Result<()> {
        let _ = self.send(json!(["stop"])).await;
        Ok(())
    }

    /// Start pushing `time-pos`/`duration` changes tagged for `sub`.
    pub async fn observe_progress(&self, sub: SubscriptionId) -> anyhow::Result<()> {
        let (time_id, dur_id) = progress_obs_ids(sub);
        self.send(json!(["observe_property", time_id, "time-pos"]))
            .await?;
        self.send(json!(["observe_property", dur_id, "duration"]))
            .await?;
        debug!("mpv: observing progress for {:?}", sub);
        Ok(())
    }

    pub async fn unobserve_progress(&self, sub: SubscriptionId) -> anyhow::Result<()> {
        let (time_id, dur_id) = progress_obs_ids(sub);
        self.send(json!(["unobserve_property", time_id])).await?;
        self.send(json!(["unobserve_property", dur_id])).await?;
        debug!("mpv: released progress for {:?}", sub);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_ids_roundtrip() {
        let sub = SubscriptionId(7);
        let (t, d) = progress_obs_ids(sub);
        assert_eq!(decode_progress_obs(t), Some((sub, ProgressProperty::TimePos)));
        assert_eq!(decode_progress_obs(d), Some((sub, ProgressProperty::Duration)));
    }

    #[test]
    fn test_progress_ids_do_not_overlap() {
        let (a_t, a_d) = progress_obs_ids(SubscriptionId(1));
        let (b_t, _) = progress_obs_ids(SubscriptionId(2));
        assert!(a_t < a_d && a_d < b_t);
        assert_eq!(decode_progress_obs(OBS_PROGRESS_BASE - 1), None);
    }

    #[test]
    fn test_property_change() {
        let evt = MpvEvent {
            raw: json!({"event": "property-change", "id": 102, "name": "time-pos", "data": 12.5}),
        };
        let (id, data) = evt.as_property_change().unwrap();
        assert_eq!(id, 102);
        assert_eq!(data.as_f64(), Some(12.5));
        assert_eq!(evt.end_file_reason(), None);
    }

    #[test]
    fn test_property_change_without_data() {
        let evt = MpvEvent {
            raw: json!({"event": "property-change", "id": 103, "name": "duration"}),
        };
        let (_, data) = evt.as_property_change().unwrap();
        assert!(data.is_null());
    }

    #[test]
    fn test_classify_replies_and_events() {
        match classify(r#"{"request_id": 4, "error": "success", "data": null}"#) {
            Some(Incoming::Reply(4, Ok(_))) => {}
            _ => panic!("expected a successful reply"),
        }
        match classify(r#"{"request_id": 5, "error": "property unavailable"}"#) {
            Some(Incoming::Reply(5, Err(e))) => assert!(e.to_string().contains("unavailable")),
            _ => panic!("expected a failed reply"),
        }
        assert!(matches!(
            classify(r#"{"event": "idle"}"#),
            Some(Incoming::Event(_))
        ));
        assert!(classify("not json").is_none());
    }

    #[test]
    fn test_end_file_reason() {
        let evt = MpvEvent {
            raw: json!({"event": "end-file", "reason": "eof", "playlist_entry_id": 1}),
        };
        assert_eq!(evt.event_name(), Some("end-file"));
        assert_eq!(evt.end_file_reason(), Some("eof"));
        assert!(evt.as_property_change().is_none());
    }
}
