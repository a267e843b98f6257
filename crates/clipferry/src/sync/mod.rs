//! Sync engine
//!
//! Owns the shared state of the relay client: configuration, the HTTP
//! client, the signaling handle, the pending-transfer registry, the peer
//! count, and the clipboard suppression latch. [`outbound`] holds the
//! push pipelines, [`inbound`] the receive pipelines; this module wires
//! the signaling event stream into both.

pub mod inbound;
pub mod outbound;
pub mod registry;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use clipferry_net::signaling::{SignalingClient, SignalingEvent, TransferSignal};
use clipferry_net::HttpClient;
use clipferry_protocol::events::PeerEntry;
use clipferry_store::ConfigHandle;

use crate::ports::{ClipboardPort, NotificationPort, NotificationStyle};
use registry::TransferRegistry;

/// How long the remote-install latch suppresses the change monitor
const SUPPRESS_WINDOW: Duration = Duration::from_millis(500);

/// Latch that hides self-inflicted clipboard changes from the monitor
///
/// Installing remote content into the clipboard provokes a change event;
/// the latch swallows it and clears itself after [`SUPPRESS_WINDOW`].
/// A generation counter keeps overlapping engagements from clearing
/// each other early.
#[derive(Clone, Default)]
pub struct SuppressLatch {
    state: Arc<LatchState>,
}

#[derive(Default)]
struct LatchState {
    engaged: AtomicBool,
    generation: AtomicU64,
}

impl SuppressLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engage and auto-clear after the suppression window
    pub fn engage(&self) {
        let generation = self.state.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.engaged.store(true, Ordering::SeqCst);
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            tokio::time::sleep(SUPPRESS_WINDOW).await;
            if state.generation.load(Ordering::SeqCst) == generation {
                state.engaged.store(false, Ordering::SeqCst);
            }
        });
    }

    pub fn engaged(&self) -> bool {
        self.state.engaged.load(Ordering::SeqCst)
    }
}

/// Everything the engine needs at construction
pub struct EngineParams {
    pub config: ConfigHandle,
    pub http: HttpClient,
    pub signaling: SignalingClient,
    pub clipboard: Arc<dyn ClipboardPort>,
    pub notifier: Arc<dyn NotificationPort>,
    /// LAN server port, used in announce URLs
    pub lan_port: u16,
    /// Where outbound envelopes are staged
    pub temp_dir: PathBuf,
    /// Grace period after a cloud upload before temp cleanup
    pub upload_grace: Duration,
}

struct EngineInner {
    config: ConfigHandle,
    http: HttpClient,
    signaling: SignalingClient,
    registry: TransferRegistry,
    clipboard: Arc<dyn ClipboardPort>,
    notifier: Arc<dyn NotificationPort>,
    lan_port: u16,
    temp_dir: PathBuf,
    upload_grace: Duration,
    peer_count: AtomicUsize,
    suppress: SuppressLatch,
}

/// Shared handle to the sync engine
#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<EngineInner>,
}

impl SyncEngine {
    pub fn new(params: EngineParams) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                config: params.config,
                http: params.http,
                signaling: params.signaling,
                registry: TransferRegistry::new(),
                clipboard: params.clipboard,
                notifier: params.notifier,
                lan_port: params.lan_port,
                temp_dir: params.temp_dir,
                upload_grace: params.upload_grace,
                peer_count: AtomicUsize::new(0),
                suppress: SuppressLatch::new(),
            }),
        }
    }

    pub fn config(&self) -> &ConfigHandle {
        &self.inner.config
    }

    pub fn registry(&self) -> &TransferRegistry {
        &self.inner.registry
    }

    pub fn suppress(&self) -> &SuppressLatch {
        &self.inner.suppress
    }

    pub fn peer_count(&self) -> usize {
        self.inner.peer_count.load(Ordering::SeqCst)
    }

    pub(crate) fn http(&self) -> &HttpClient {
        &self.inner.http
    }

    pub(crate) fn signaling(&self) -> &SignalingClient {
        &self.inner.signaling
    }

    pub(crate) fn clipboard(&self) -> Arc<dyn ClipboardPort> {
        Arc::clone(&self.inner.clipboard)
    }

    pub(crate) fn lan_port(&self) -> u16 {
        self.inner.lan_port
    }

    pub(crate) fn temp_dir(&self) -> &PathBuf {
        &self.inner.temp_dir
    }

    pub(crate) fn upload_grace(&self) -> Duration {
        self.inner.upload_grace
    }

    /// Decode the room key from the current config
    pub(crate) fn room_key(&self) -> anyhow::Result<clipferry_crypto::RoomKey> {
        let key = self.inner.config.snapshot().room_key;
        Ok(clipferry_crypto::RoomKey::from_base64(&key)?)
    }

    /// Show a toast unless notifications are disabled in the config
    pub(crate) fn notify(&self, title: &str, body: &str, style: NotificationStyle) {
        if self.inner.config.snapshot().show_notifications {
            self.inner.notifier.show(title, body, style);
        }
    }

    /// Consume the signaling event stream until it ends
    pub async fn run_events(self, mut events: mpsc::Receiver<SignalingEvent>) {
        while let Some(event) = events.recv().await {
            match event {
                SignalingEvent::Status(status) => {
                    info!(?status, "signaling status");
                }
                SignalingEvent::Countdown(secs) => {
                    info!("reconnecting in {}s", secs);
                }
                SignalingEvent::Clipboard(data) => {
                    let engine = self.clone();
                    tokio::spawn(async move { engine.handle_clipboard_sync(data).await });
                }
                SignalingEvent::FileSync(data) => {
                    let engine = self.clone();
                    tokio::spawn(async move { engine.handle_cloud_file(data).await });
                }
                SignalingEvent::FileAvailable(announce) => {
                    if announce.sender_client_id == self.inner.config.snapshot().device_id {
                        continue;
                    }
                    let engine = self.clone();
                    tokio::spawn(async move { engine.handle_lan_announce(announce).await });
                }
                SignalingEvent::Transfer {
                    transfer_id,
                    room,
                    signal,
                } => self.handle_transfer_signal(&transfer_id, &room, signal),
                SignalingEvent::Roster(peers) => self.update_roster(peers),
                SignalingEvent::PeerEvicted => {
                    warn!("evicted from room, rejoining");
                    let _ = self.inner.signaling.reconnect().await;
                }
            }
        }
        debug!("signaling event stream ended");
    }

    /// Drive an outbound pending transfer from a signaling event
    ///
    /// Matching is strict: the transfer id must be registered *and* the
    /// event's room must equal the transfer's room.
    pub fn handle_transfer_signal(&self, transfer_id: &str, room: &str, signal: TransferSignal) {
        let Some(pending) = self.inner.registry.get(transfer_id) else {
            debug!(transfer_id, "signal for unknown transfer dropped");
            return;
        };
        if pending.room != room {
            debug!(transfer_id, "signal with mismatched room dropped");
            return;
        }

        match signal {
            TransferSignal::Completed => {
                info!(transfer_id, "peer confirmed LAN receipt");
                pending.mark_completed();
            }
            TransferSignal::NeedRelay => {
                info!(transfer_id, "peer requested cloud relay");
                pending.mark_need_relay();
            }
            TransferSignal::Command(command) => {
                info!(
                    transfer_id,
                    action = %command.action,
                    reason = command.reason.as_deref().unwrap_or("none"),
                    "transfer command"
                );
                match command.action.as_str() {
                    "finish" => pending.mark_completed(),
                    "upload_relay" => pending.mark_upload_requested(),
                    other => debug!(transfer_id, "unknown transfer action '{}'", other),
                }
            }
        }
    }

    /// Rebuild the peer roster, excluding ourselves
    pub fn update_roster(&self, peers: Vec<PeerEntry>) {
        let device_id = self.inner.config.snapshot().device_id;
        let others: Vec<PeerEntry> = peers
            .into_iter()
            .filter(|peer| peer.client_id != device_id)
            .collect();

        let names: Vec<&str> = others.iter().map(PeerEntry::display_name).collect();
        info!(count = others.len(), peers = ?names, "room roster updated");
        self.inner.peer_count.store(others.len(), Ordering::SeqCst);
    }
}

/// Milliseconds since the Unix epoch
pub(crate) fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Wall-clock timestamp for relay payloads
pub(crate) fn clock_stamp() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}
