//! Clipferry agent — clipboard and file relay client
//!
//! Keeps the clipboard synchronized across the devices of a room:
//! connects to the signaling server, serves pending transfers to
//! co-local peers over the LAN, and falls back to the cloud relay when
//! the LAN path does not work out.

#![forbid(unsafe_code)]

mod cli;
mod logging;
mod ports;
mod sync;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use clipferry_net::lan::{LanPaths, LanServer, LanState};
use clipferry_net::signaling::{JoinContext, SignalingClient, SignalingConfig};
use clipferry_net::HttpClient;
use clipferry_store::{paths, ConfigHandle};

use cli::{Cli, Commands};
use ports::clipboard::SystemClipboard;
use ports::hotkey::HotkeySpec;
use ports::notify::DesktopNotifier;
use ports::{ClipboardPort, NotificationPort};
use sync::{EngineParams, SyncEngine};

/// Grace period after a cloud upload before the staged envelope is removed
const UPLOAD_GRACE: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        None | Some(Commands::Run) => run_agent(cli.config).await,
        Some(Commands::Push) => push_once(cli.config).await,
        Some(Commands::Regen) => regenerate(cli.config),
        Some(Commands::ShowConfig) => show_config(cli.config),
    };

    if let Err(e) = result {
        tracing::error!("{:#}", e);
        std::process::exit(1);
    }
}

fn open_config(path_override: Option<PathBuf>) -> anyhow::Result<ConfigHandle> {
    let path = match path_override {
        Some(path) => path,
        None => clipferry_store::config::config_path()?,
    };
    Ok(ConfigHandle::open(path)?)
}

/// Regenerate room credentials and print the new room id
fn regenerate(path_override: Option<PathBuf>) -> anyhow::Result<()> {
    let config = open_config(path_override)?;
    let updated = config.regenerate_credentials()?;
    println!("New room: {}", updated.room_id);
    println!("Peers using the old credentials are cut off.");
    Ok(())
}

/// Print the effective configuration with the key redacted
fn show_config(path_override: Option<PathBuf>) -> anyhow::Result<()> {
    let config = open_config(path_override)?;
    let mut snapshot = config.snapshot();
    if !snapshot.room_key.is_empty() {
        snapshot.room_key = "<redacted>".to_string();
    }
    println!("# {}", config.path().display());
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

/// One-shot push of the current clipboard text over the relay
async fn push_once(path_override: Option<PathBuf>) -> anyhow::Result<()> {
    let config = open_config(path_override)?;
    let clipboard = SystemClipboard::new();

    let content = tokio::task::spawn_blocking(move || clipboard.get()).await?;
    let text = match content {
        ports::ClipboardContent::Text(text) if !text.is_empty() => text,
        ports::ClipboardContent::None => anyhow::bail!("clipboard is empty"),
        _ => anyhow::bail!("one-shot push handles text only; run the agent for files and images"),
    };

    // Text pushes are plain HTTP; no signaling session needed
    let snapshot = config.snapshot();
    let key = clipferry_crypto::decode_key(&snapshot.room_key)?;
    let envelope = clipferry_crypto::encrypt(&key, text.as_bytes())?;
    let message = serde_json::json!({
        "room": snapshot.room_id,
        "event": "clipboard_sync",
        "sender_id": snapshot.device_id,
        "data": {
            "room": snapshot.room_id,
            "content": clipferry_crypto::to_base64(&envelope),
            "encrypted": true,
            "timestamp": chrono::Local::now().format("%H:%M:%S").to_string(),
            "source": snapshot.device_id,
        },
    });

    let http = HttpClient::new()?;
    let url = format!("{}/api/relay", snapshot.relay_base());
    let response = http.post_json(&url, &message).await?;
    anyhow::ensure!(
        response.is_success(),
        "relay rejected the push: {}",
        response.status
    );
    println!("Pushed {} characters to room {}", text.len(), snapshot.room_id);
    Ok(())
}

/// Guard against a second agent sharing the same app directory
struct InstanceLock {
    path: PathBuf,
}

impl InstanceLock {
    fn acquire(dir: &Path) -> anyhow::Result<Self> {
        let path = dir.join("clipferry.lock");
        if let Ok(contents) = fs::read_to_string(&path) {
            if let Ok(pid) = contents.trim().parse::<u32>() {
                if process_alive(pid) {
                    anyhow::bail!("another clipferry agent (pid {}) is already running", pid);
                }
            }
            debug!("removing stale instance lock");
        }
        fs::write(&path, std::process::id().to_string())?;
        Ok(Self { path })
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

#[cfg(unix)]
fn process_alive(pid: u32) -> bool {
    Path::new(&format!("/proc/{}", pid)).exists()
}

#[cfg(not(unix))]
fn process_alive(_pid: u32) -> bool {
    // No cheap liveness check; assume the lock is stale
    false
}

/// Run the sync agent until interrupted
async fn run_agent(path_override: Option<PathBuf>) -> anyhow::Result<()> {
    let config = open_config(path_override)?;
    let snapshot = config.snapshot();
    info!(
        room = %snapshot.room_id,
        device = %snapshot.device_id,
        "starting clipferry agent"
    );
    if snapshot.auto_start || snapshot.start_minimized {
        debug!("auto_start/start_minimized are inert on this platform");
    }

    let app_dir = paths::app_dir()?;
    let _lock = InstanceLock::acquire(&app_dir)?;

    // Leftover envelopes from a previous run are useless
    paths::clean_temp_dir()?;
    let temp_dir = paths::temp_dir()?;

    // LAN server
    let (upload_tx, mut upload_rx) = mpsc::channel(16);
    let lan_state = Arc::new(LanState {
        room_id: std::sync::RwLock::new(snapshot.room_id.clone()),
        paths: LanPaths {
            download_dir: snapshot.download_path.clone(),
            temp_dir: temp_dir.clone(),
        },
        inbound: upload_tx,
    });
    let lan = LanServer::spawn(Arc::clone(&lan_state))
        .await
        .context("start LAN server")?;

    // Signaling
    let (signaling, events) = SignalingClient::spawn(SignalingConfig {
        server_url: snapshot.relay_server_url.clone(),
        join: JoinContext {
            room: snapshot.room_id.clone(),
            client_id: snapshot.device_id.clone(),
            client_type: "pc".to_string(),
            probe_port: lan.port,
        },
    });
    signaling.connect().await?;

    // Engine
    let clipboard: Arc<dyn ClipboardPort> = Arc::new(SystemClipboard::new());
    let notifier: Arc<dyn NotificationPort> = Arc::new(DesktopNotifier::new());
    let engine = SyncEngine::new(EngineParams {
        config: config.clone(),
        http: HttpClient::new()?,
        signaling: signaling.clone(),
        clipboard: Arc::clone(&clipboard),
        notifier,
        lan_port: lan.port,
        temp_dir,
        upload_grace: UPLOAD_GRACE,
    });

    // Signaling event dispatch
    tokio::spawn(engine.clone().run_events(events));

    // LAN upload pipeline
    {
        let engine = engine.clone();
        tokio::spawn(async move {
            while let Some(upload) = upload_rx.recv().await {
                engine.handle_lan_upload(upload).await;
            }
        });
    }

    // Clipboard change monitor feeding the auto-push gate
    let cancel = CancellationToken::new();
    let (change_tx, mut change_rx) = mpsc::channel(16);
    tokio::spawn(ports::monitor::run_monitor(
        Arc::clone(&clipboard),
        change_tx,
        cancel.clone(),
    ));
    {
        let engine = engine.clone();
        tokio::spawn(async move {
            while let Some(content) = change_rx.recv().await {
                engine.auto_push(content).await;
            }
        });
    }

    // Push hotkey; the listener must stay alive for the agent lifetime
    let (press_tx, mut press_rx) = mpsc::channel(4);
    #[cfg(feature = "hotkey")]
    let mut _hotkey_listener = None;
    match HotkeySpec::parse(&snapshot.push_hotkey) {
        Ok(spec) => {
            #[cfg(feature = "hotkey")]
            match ports::hotkey::HotkeyListener::register(spec, press_tx) {
                Ok(listener) => _hotkey_listener = Some(listener),
                Err(e) => warn!("hotkey unavailable: {:#}", e),
            }
            #[cfg(not(feature = "hotkey"))]
            {
                let _ = (spec, press_tx);
                debug!("built without hotkey support");
            }
        }
        Err(e) => warn!("hotkey '{}' not registered: {}", snapshot.push_hotkey, e),
    }
    {
        let engine = engine.clone();
        tokio::spawn(async move {
            while press_rx.recv().await.is_some() {
                info!("push hotkey pressed");
                engine.manual_push().await;
            }
        });
    }

    info!(port = lan.port, "agent up, press Ctrl-C to stop");
    wait_for_shutdown(&config, &lan_state, &signaling, lan.port).await?;

    info!("shutting down");
    cancel.cancel();
    let _ = signaling.shutdown().await;
    lan.shutdown();
    Ok(())
}

/// Block until Ctrl-C; on SIGHUP, reload the config and rejoin
///
/// `clipferry regen` rewrites the credentials from another process; a
/// SIGHUP makes the running agent pick them up, rotate the LAN server's
/// room id, and rejoin with the fresh room. Peers on the old key are
/// cut off at that moment.
async fn wait_for_shutdown(
    config: &ConfigHandle,
    lan_state: &Arc<LanState>,
    signaling: &SignalingClient,
    lan_port: u16,
) -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        let mut hangup =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::hangup())
                .context("install SIGHUP handler")?;
        loop {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    result.context("wait for Ctrl-C")?;
                    return Ok(());
                }
                _ = hangup.recv() => {
                    info!("SIGHUP: reloading configuration");
                    let fresh = config.reload()?;
                    lan_state.set_room_id(fresh.room_id.clone());
                    signaling
                        .set_config(SignalingConfig {
                            server_url: fresh.relay_server_url.clone(),
                            join: JoinContext {
                                room: fresh.room_id.clone(),
                                client_id: fresh.device_id.clone(),
                                client_type: "pc".to_string(),
                                probe_port: lan_port,
                            },
                        })
                        .await?;
                    signaling.reconnect().await?;
                }
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = (config, lan_state, signaling, lan_port);
        tokio::signal::ctrl_c().await.context("wait for Ctrl-C")?;
        Ok(())
    }
}
