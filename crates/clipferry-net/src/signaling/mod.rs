//! Signaling client and reconnect supervisor
//!
//! One owned supervisor task per client runs the whole lifecycle:
//! connect, drive the socket.io session, and on loss count down five
//! seconds and try again. A 10-second watchdog inside the connected
//! loop forces a reconnect when the link has been silent for more than
//! 45 seconds: on dead links (sleeping laptop, silent NAT drop) the
//! read side never errors, so silence is the only reliable signal.
//!
//! Consumers talk to the supervisor through [`SignalingClient`] and
//! receive everything (status transitions, retry countdown ticks, and
//! routed server events) on a single tagged [`SignalingEvent`] stream.

pub mod session;

use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use clipferry_protocol::events::{
    ClipboardSyncData, FileAvailable, FileSyncData, PeerEntry, TransferCommand,
};
use clipferry_protocol::frame;

use self::session::{Action, Session};
use crate::ws::{self, WsEvent};
use crate::{NetworkError, Result};

/// Seconds counted down before a reconnect attempt
const RECONNECT_COUNTDOWN_SECS: u8 = 5;

/// Watchdog wake-up period
const WATCHDOG_PERIOD: Duration = Duration::from_secs(10);

/// Inbound silence tolerated while connected
const ACTIVITY_TIMEOUT: Duration = Duration::from_secs(45);

/// Signaling connection state, published on every transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    /// Connected with no peers in the room
    ConnectedLonely,
    /// Connected with at least one peer
    ConnectedSynced,
    /// Counting down to a reconnect attempt
    Retrying,
}

/// State-machine input for an outbound pending transfer
#[derive(Debug, Clone)]
pub enum TransferSignal {
    /// Peer acknowledged receipt (`file_sync_completed`)
    Completed,
    /// Peer cannot pull via LAN (`file_need_relay`)
    NeedRelay,
    /// Server directive (`transfer_command`)
    Command(TransferCommand),
}

/// Everything the signaling layer reports, on one stream
#[derive(Debug, Clone)]
pub enum SignalingEvent {
    Status(ConnectionStatus),
    /// Seconds left before the next reconnect attempt
    Countdown(u8),
    Clipboard(ClipboardSyncData),
    FileSync(FileSyncData),
    FileAvailable(FileAvailable),
    Transfer {
        transfer_id: String,
        room: String,
        signal: TransferSignal,
    },
    Roster(Vec<PeerEntry>),
    PeerEvicted,
}

/// Identity and placement data sent with the room join
#[derive(Debug, Clone)]
pub struct JoinContext {
    pub room: String,
    pub client_id: String,
    pub client_type: String,
    /// LAN server port, advertised in the probe URL
    pub probe_port: u16,
}

/// Connection parameters; replaced wholesale on credential changes
#[derive(Debug, Clone)]
pub struct SignalingConfig {
    /// Relay base URL (`http[s]`), converted to `ws[s]` for the upgrade
    pub server_url: String,
    pub join: JoinContext,
}

enum Command {
    Connect,
    Disconnect,
    Reconnect,
    Emit { name: String, data: Value },
    SetConfig(SignalingConfig),
    Shutdown,
}

/// Handle to the signaling supervisor task
#[derive(Clone)]
pub struct SignalingClient {
    cmd_tx: mpsc::Sender<Command>,
}

impl SignalingClient {
    /// Spawn the supervisor; events arrive on the returned receiver
    pub fn spawn(config: SignalingConfig) -> (Self, mpsc::Receiver<SignalingEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        let (event_tx, event_rx) = mpsc::channel(256);
        let supervisor = Supervisor {
            config,
            events: event_tx,
        };
        tokio::spawn(supervisor.run(cmd_rx));
        (Self { cmd_tx }, event_rx)
    }

    /// Connect (or resume after a manual disconnect)
    pub async fn connect(&self) -> Result<()> {
        self.send(Command::Connect).await
    }

    /// Disconnect and suppress reconnects until the next `connect`
    pub async fn disconnect(&self) -> Result<()> {
        self.send(Command::Disconnect).await
    }

    /// Drop the current connection and dial again immediately
    pub async fn reconnect(&self) -> Result<()> {
        self.send(Command::Reconnect).await
    }

    /// Emit `42["name",data]`; dropped with a log when not connected
    pub async fn emit(&self, name: &str, data: Value) -> Result<()> {
        self.send(Command::Emit {
            name: name.to_string(),
            data,
        })
        .await
    }

    /// Swap connection parameters (after credential regeneration)
    pub async fn set_config(&self, config: SignalingConfig) -> Result<()> {
        self.send(Command::SetConfig(config)).await
    }

    /// Terminate the supervisor task
    pub async fn shutdown(&self) -> Result<()> {
        self.send(Command::Shutdown).await
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.cmd_tx
            .send(command)
            .await
            .map_err(|_| NetworkError::ConnectionFailed("signaling supervisor gone".to_string()))
    }
}

/// What the run loop does after leaving a state
enum Next {
    /// Wait for an explicit connect command
    Idle,
    /// Dial immediately
    ConnectNow,
    /// Count down, then dial
    RetryAfterCountdown,
    /// Terminate the task
    Shutdown,
}

struct Supervisor {
    config: SignalingConfig,
    events: mpsc::Sender<SignalingEvent>,
}

impl Supervisor {
    async fn run(mut self, mut cmd_rx: mpsc::Receiver<Command>) {
        let mut next = Next::Idle;
        loop {
            next = match next {
                Next::Idle => self.idle(&mut cmd_rx).await,
                Next::ConnectNow => self.connect_once(&mut cmd_rx).await,
                Next::RetryAfterCountdown => self.countdown(&mut cmd_rx).await,
                Next::Shutdown => break,
            };
        }
        debug!("signaling supervisor terminated");
    }

    async fn set_status(&self, status: ConnectionStatus) {
        let _ = self.events.send(SignalingEvent::Status(status)).await;
    }

    /// Wait for a connect command; nothing reconnects from here
    async fn idle(&mut self, cmd_rx: &mut mpsc::Receiver<Command>) -> Next {
        loop {
            match cmd_rx.recv().await {
                None | Some(Command::Shutdown) => return Next::Shutdown,
                Some(Command::Connect | Command::Reconnect) => return Next::ConnectNow,
                Some(Command::Disconnect) => {}
                Some(Command::SetConfig(config)) => self.config = config,
                Some(Command::Emit { name, .. }) => {
                    debug!("emit '{}' while disconnected dropped", name);
                }
            }
        }
    }

    async fn connect_once(&mut self, cmd_rx: &mut mpsc::Receiver<Command>) -> Next {
        self.set_status(ConnectionStatus::Connecting).await;

        let url = match socketio_ws_url(&self.config.server_url) {
            Ok(url) => url,
            Err(e) => {
                warn!("bad signaling URL: {}", e);
                self.set_status(ConnectionStatus::Disconnected).await;
                return Next::RetryAfterCountdown;
            }
        };

        info!(url = %url, "connecting to signaling server");
        match ws::connect(&url).await {
            Ok((conn, mut ws_events)) => self.drive(conn, &mut ws_events, cmd_rx).await,
            Err(e) => {
                warn!("signaling connect failed: {}", e);
                self.set_status(ConnectionStatus::Disconnected).await;
                Next::RetryAfterCountdown
            }
        }
    }

    /// Drive one live connection until it ends
    async fn drive(
        &mut self,
        conn: ws::WsConnection,
        ws_events: &mut mpsc::Receiver<WsEvent>,
        cmd_rx: &mut mpsc::Receiver<Command>,
    ) -> Next {
        let mut session = Session::new(self.config.join.clone());
        let mut last_activity = Instant::now();
        let mut watchdog = tokio::time::interval(WATCHDOG_PERIOD);
        watchdog.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                command = cmd_rx.recv() => match command {
                    None | Some(Command::Shutdown) => {
                        conn.close();
                        return Next::Shutdown;
                    }
                    Some(Command::Disconnect) => {
                        conn.close();
                        self.set_status(ConnectionStatus::Disconnected).await;
                        return Next::Idle;
                    }
                    Some(Command::Connect | Command::Reconnect) => {
                        conn.close();
                        return Next::ConnectNow;
                    }
                    Some(Command::SetConfig(config)) => self.config = config,
                    Some(Command::Emit { name, data }) => {
                        let packet = frame::encode_event(&name, &data);
                        if conn.send(packet).await.is_err() {
                            self.set_status(ConnectionStatus::Disconnected).await;
                            return Next::RetryAfterCountdown;
                        }
                    }
                },
                event = ws_events.recv() => match event {
                    Some(WsEvent::Open) => {
                        last_activity = Instant::now();
                        // Socket.IO namespace connect
                        if conn.send(frame::CONNECT.to_string()).await.is_err() {
                            self.set_status(ConnectionStatus::Disconnected).await;
                            return Next::RetryAfterCountdown;
                        }
                    }
                    Some(WsEvent::Message(text)) => {
                        last_activity = Instant::now();
                        for action in session.handle_text(&text) {
                            match action {
                                Action::Send(packet) => {
                                    let _ = conn.send(packet).await;
                                }
                                Action::Status(status) => self.set_status(status).await,
                                Action::Event(event) => {
                                    let _ = self.events.send(event).await;
                                }
                            }
                        }
                    }
                    Some(WsEvent::Closed) | None => {
                        info!("signaling connection closed");
                        self.set_status(ConnectionStatus::Disconnected).await;
                        return Next::RetryAfterCountdown;
                    }
                    Some(WsEvent::Error(e)) => {
                        warn!("signaling socket error: {}", e);
                        self.set_status(ConnectionStatus::Disconnected).await;
                        return Next::RetryAfterCountdown;
                    }
                },
                _ = watchdog.tick() => {
                    if session.is_connected() && watchdog_expired(last_activity, Instant::now()) {
                        warn!(
                            silent_secs = last_activity.elapsed().as_secs(),
                            "watchdog: dead link, forcing reconnect"
                        );
                        conn.close();
                        self.set_status(ConnectionStatus::Disconnected).await;
                        return Next::RetryAfterCountdown;
                    }
                }
            }
        }
    }

    /// Five-second countdown with per-second ticks before redialing
    async fn countdown(&mut self, cmd_rx: &mut mpsc::Receiver<Command>) -> Next {
        self.set_status(ConnectionStatus::Retrying).await;
        for remaining in (1..=RECONNECT_COUNTDOWN_SECS).rev() {
            let _ = self.events.send(SignalingEvent::Countdown(remaining)).await;
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(1)) => {}
                command = cmd_rx.recv() => match command {
                    None | Some(Command::Shutdown) => return Next::Shutdown,
                    Some(Command::Disconnect) => {
                        self.set_status(ConnectionStatus::Disconnected).await;
                        return Next::Idle;
                    }
                    Some(Command::Connect | Command::Reconnect) => return Next::ConnectNow,
                    Some(Command::SetConfig(config)) => self.config = config,
                    Some(Command::Emit { name, .. }) => {
                        debug!("emit '{}' while retrying dropped", name);
                    }
                }
            }
        }
        Next::ConnectNow
    }
}

/// Whether the watchdog must force a reconnect
fn watchdog_expired(last_activity: Instant, now: Instant) -> bool {
    now.duration_since(last_activity) > ACTIVITY_TIMEOUT
}

/// Build the Socket.IO WebSocket URL from the relay base URL
///
/// `http[s]` becomes `ws[s]`; the Engine.IO path and query are appended.
pub fn socketio_ws_url(base: &str) -> Result<String> {
    let trimmed = base.trim_end_matches('/');
    let converted = if let Some(rest) = trimmed.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = trimmed.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else if trimmed.starts_with("ws://") || trimmed.starts_with("wss://") {
        trimmed.to_string()
    } else {
        return Err(NetworkError::InvalidUrl(base.to_string()));
    };
    Ok(format!("{}/socket.io/?EIO=4&transport=websocket", converted))
}
