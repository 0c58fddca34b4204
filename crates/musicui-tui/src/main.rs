mod action;
mod app;
mod app_state;
mod component;
mod components;
mod core;
mod focus;
mod mpv;
mod theme;
mod widgets;

use anyhow::Context;
use tokio::sync::{broadcast, mpsc};

/// What the PlayerCore broadcasts.
#[derive(Debug, Clone)]
pub enum BroadcastMessage {
    /// Playback state changed; carries the full snapshot.
    StateUpdated(core::PlaybackSnapshot),
    /// A user-facing log line from the core event loop.
    Log(String),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let data_dir = musicui_core::platform::data_dir();
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating data dir {}", data_dir.display()))?;

    let log_path = data_dir.join("musicui.log");
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("opening log file {}", log_path.display()))?;

    // RUST_LOG overrides; keep HTTP client internals quiet by default
    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "debug,hyper_util=warn,reqwest=warn,hyper=warn".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    eprintln!("musicui log: {}", log_path.display());
    tracing::info!("musicui starting…");

    // ── Load config ──────────────────────────────────────────────────────────
    let config = match musicui_core::config::Config::load() {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("config: {}, using defaults", e);
            musicui_core::config::Config::default()
        }
    };
    let catalog = musicui_core::catalog::CatalogClient::new(&config.catalog)
        .context("building catalog HTTP client")?;
    tracing::info!("catalog endpoint: {}", catalog.endpoint());

    // ── PlayerCore → TUI ─────────────────────────────────────────────────────
    let (broadcast_tx, broadcast_rx) = broadcast::channel::<BroadcastMessage>(1024);

    // ── TUI → PlayerCore ─────────────────────────────────────────────────────
    let (event_tx, event_rx) = mpsc::channel::<core::PlayerEvent>(1024);

    let player = core::PlayerCore::new(&config, broadcast_tx.clone(), event_tx.clone());
    let player_task = tokio::spawn(async move {
        if let Err(e) = player.run(event_rx).await {
            tracing::error!("PlayerCore exited with error: {}", e);
        }
    });

    // ── Run TUI ──────────────────────────────────────────────────────────────
    let app = app::App::new(catalog, config.catalog.asset_base.clone(), event_tx.clone());
    let result = app.run(broadcast_rx).await;

    // let the core release its subscription and kill mpv before exiting
    let _ = event_tx.send(core::PlayerEvent::Shutdown).await;
    let _ = tokio::time::timeout(std::time::Duration::from_secs(3), player_task).await;
    tracing::info!("musicui exiting");

    result
}
