//! Socket.IO session state machine
//!
//! Pure packet handling: inbound text goes in, a list of [`Action`]s
//! comes out (packets to send back, status transitions, events for the
//! engine). The supervisor in [`super`] owns the socket and the timers;
//! keeping this layer free of I/O makes the protocol behavior testable
//! frame by frame.

use serde_json::Value;
use tracing::{debug, info, warn};

use clipferry_protocol::events::{
    parse_roster, ClipboardSyncData, FileAvailable, FileSyncData, JoinPayload, NetworkInfo,
    ProbeInfo, RoomStats, TransferCommand,
};
use clipferry_protocol::frame::{self, Packet};
use clipferry_protocol::PROTOCOL_VERSION;

use super::{ConnectionStatus, JoinContext, SignalingEvent, TransferSignal};
use crate::netinfo;

/// TTL the server is told for our probe URL
const PROBE_TTL_MS: u64 = 30_000;

/// What the supervisor should do in response to an inbound frame
#[derive(Debug)]
pub enum Action {
    /// Send a raw packet back over the socket
    Send(String),
    /// Publish a status transition
    Status(ConnectionStatus),
    /// Publish an event to the engine
    Event(SignalingEvent),
}

/// Per-connection protocol state
pub struct Session {
    join: JoinContext,
    connected: bool,
}

impl Session {
    pub fn new(join: JoinContext) -> Self {
        Self {
            join,
            connected: false,
        }
    }

    /// Whether the namespace connect was acknowledged on this connection
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Process one inbound text frame
    pub fn handle_text(&mut self, text: &str) -> Vec<Action> {
        let packet = match frame::parse(text) {
            Ok(packet) => packet,
            Err(e) => {
                warn!("dropping invalid signaling frame: {}", e);
                return Vec::new();
            }
        };

        match packet {
            Packet::Ping => vec![Action::Send(frame::PONG.to_string())],
            Packet::Open(_) | Packet::Pong | Packet::Other => Vec::new(),
            Packet::ConnectAck => {
                self.connected = true;
                info!(room = %self.join.room, "signaling connected, joining room");
                vec![
                    Action::Status(ConnectionStatus::ConnectedLonely),
                    Action::Send(frame::encode_event("join", &self.join_payload())),
                ]
            }
            Packet::Event { name, data } => self.handle_event(&name, data),
        }
    }

    fn handle_event(&mut self, name: &str, data: Value) -> Vec<Action> {
        match name {
            "clipboard_sync" => {
                // Someone synced to us, so we are definitely not alone
                let parsed: ClipboardSyncData =
                    serde_json::from_value(data).unwrap_or_default();
                vec![
                    Action::Status(ConnectionStatus::ConnectedSynced),
                    Action::Event(SignalingEvent::Clipboard(parsed)),
                ]
            }
            "file_sync" => {
                let parsed: FileSyncData = serde_json::from_value(data).unwrap_or_default();
                vec![
                    Action::Status(ConnectionStatus::ConnectedSynced),
                    Action::Event(SignalingEvent::FileSync(parsed)),
                ]
            }
            "room_stats" => {
                let stats: RoomStats =
                    serde_json::from_value(data).unwrap_or(RoomStats { count: 1 });
                let status = if stats.count > 1 {
                    ConnectionStatus::ConnectedSynced
                } else {
                    ConnectionStatus::ConnectedLonely
                };
                vec![Action::Status(status)]
            }
            "room_state_changed" | "client_list_update" => {
                vec![Action::Event(SignalingEvent::Roster(parse_roster(&data)))]
            }
            "peer_evicted" => vec![Action::Event(SignalingEvent::PeerEvicted)],
            "file_available" => match serde_json::from_value::<FileAvailable>(data) {
                Ok(announce) => vec![Action::Event(SignalingEvent::FileAvailable(announce))],
                Err(e) => {
                    warn!("malformed file_available: {}", e);
                    Vec::new()
                }
            },
            "transfer_command" => {
                let command: TransferCommand =
                    serde_json::from_value(data.clone()).unwrap_or_default();
                self.transfer_event(&data, TransferSignal::Command(command))
            }
            "file_sync_completed" => self.transfer_event(&data, TransferSignal::Completed),
            "file_need_relay" => self.transfer_event(&data, TransferSignal::NeedRelay),
            other => {
                debug!("ignoring signaling event '{}'", other);
                Vec::new()
            }
        }
    }

    fn transfer_event(&self, data: &Value, signal: TransferSignal) -> Vec<Action> {
        // transfer_id with file_id as a legacy fallback
        let transfer_id = data
            .get("transfer_id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .or_else(|| data.get("file_id").and_then(Value::as_str))
            .unwrap_or_default()
            .to_string();
        if transfer_id.is_empty() {
            debug!("transfer event without an id dropped");
            return Vec::new();
        }
        let room = data
            .get("room")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        vec![Action::Event(SignalingEvent::Transfer {
            transfer_id,
            room,
            signal,
        })]
    }

    fn join_payload(&self) -> Value {
        let net = netinfo::collect();
        let payload = JoinPayload {
            protocol_version: PROTOCOL_VERSION.to_string(),
            room: self.join.room.clone(),
            client_id: self.join.client_id.clone(),
            client_type: self.join.client_type.clone(),
            joined_at_ms: now_ms(),
            probe: ProbeInfo {
                probe_url: format!("http://{}:{}/probe", net.private_ip, self.join.probe_port),
                probe_ttl_ms: PROBE_TTL_MS,
            },
            network: NetworkInfo {
                private_ip: net.private_ip,
                cidr: net.cidr,
                network_id_hash: net.network_id_hash,
                network_epoch: net.network_epoch,
            },
        };
        serde_json::to_value(payload).unwrap_or_default()
    }
}

/// Milliseconds since the Unix epoch
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(JoinContext {
            room: "room_1".to_string(),
            client_id: "pc_u_1".to_string(),
            client_type: "pc".to_string(),
            probe_port: 51234,
        })
    }

    #[test]
    fn test_ping_answered_with_pong() {
        let mut s = session();
        let actions = s.handle_text("2");
        assert_eq!(actions.len(), 1);
        match &actions[0] {
            Action::Send(packet) => assert_eq!(packet, "3"),
            other => panic!("expected Send, got {:?}", other),
        }
    }

    #[test]
    fn test_connect_ack_goes_lonely_and_joins() {
        let mut s = session();
        assert!(!s.is_connected());

        let actions = s.handle_text("40");
        assert!(s.is_connected());
        assert!(matches!(
            actions[0],
            Action::Status(ConnectionStatus::ConnectedLonely)
        ));
        match &actions[1] {
            Action::Send(packet) => {
                assert!(packet.starts_with("42[\"join\""));
                assert!(packet.contains("\"room\":\"room_1\""));
                assert!(packet.contains("\"protocol_version\":\"4.0\""));
                assert!(packet.contains(":51234/probe"));
            }
            other => panic!("expected join Send, got {:?}", other),
        }
    }

    #[test]
    fn test_clipboard_sync_sets_synced_and_delivers() {
        let mut s = session();
        let actions =
            s.handle_text(r#"42["clipboard_sync",{"content":"b64data","encrypted":true}]"#);
        assert!(matches!(
            actions[0],
            Action::Status(ConnectionStatus::ConnectedSynced)
        ));
        match &actions[1] {
            Action::Event(SignalingEvent::Clipboard(data)) => {
                assert_eq!(data.content, "b64data");
                assert!(data.encrypted);
            }
            other => panic!("expected Clipboard event, got {:?}", other),
        }
    }

    #[test]
    fn test_room_stats_count_drives_status() {
        let mut s = session();
        let lonely = s.handle_text(r#"42["room_stats",{"count":1}]"#);
        assert!(matches!(
            lonely[0],
            Action::Status(ConnectionStatus::ConnectedLonely)
        ));

        let synced = s.handle_text(r#"42["room_stats",{"count":3}]"#);
        assert!(matches!(
            synced[0],
            Action::Status(ConnectionStatus::ConnectedSynced)
        ));
    }

    #[test]
    fn test_malformed_frames_dropped_silently() {
        let mut s = session();
        assert!(s.handle_text("").is_empty());
        assert!(s.handle_text("42{broken").is_empty());
        assert!(s.handle_text("9").is_empty());
        assert!(s.handle_text(r#"42[42,{}]"#).is_empty());
    }

    #[test]
    fn test_transfer_signals_carry_id_and_room() {
        let mut s = session();
        let actions = s.handle_text(
            r#"42["file_sync_completed",{"transfer_id":"tr_1","room":"room_1"}]"#,
        );
        match &actions[0] {
            Action::Event(SignalingEvent::Transfer {
                transfer_id,
                room,
                signal: TransferSignal::Completed,
            }) => {
                assert_eq!(transfer_id, "tr_1");
                assert_eq!(room, "room_1");
            }
            other => panic!("expected Transfer event, got {:?}", other),
        }
    }

    #[test]
    fn test_transfer_falls_back_to_file_id() {
        let mut s = session();
        let actions = s.handle_text(r#"42["file_need_relay",{"file_id":"f_7","room":"r"}]"#);
        match &actions[0] {
            Action::Event(SignalingEvent::Transfer { transfer_id, .. }) => {
                assert_eq!(transfer_id, "f_7")
            }
            other => panic!("expected Transfer event, got {:?}", other),
        }
    }

    #[test]
    fn test_transfer_without_any_id_dropped() {
        let mut s = session();
        assert!(s
            .handle_text(r#"42["transfer_command",{"action":"finish"}]"#)
            .is_empty());
    }

    #[test]
    fn test_transfer_command_action_parsed() {
        let mut s = session();
        let actions = s.handle_text(
            r#"42["transfer_command",{"transfer_id":"tr_2","room":"r","action":"upload_relay"}]"#,
        );
        match &actions[0] {
            Action::Event(SignalingEvent::Transfer {
                signal: TransferSignal::Command(command),
                ..
            }) => assert_eq!(command.action, "upload_relay"),
            other => panic!("expected Command signal, got {:?}", other),
        }
    }

    #[test]
    fn test_roster_events_parsed_from_both_shapes() {
        let mut s = session();
        let from_state = s.handle_text(
            r#"42["room_state_changed",{"peers":[{"client_id":"a","device_name":"A"}]}]"#,
        );
        match &from_state[0] {
            Action::Event(SignalingEvent::Roster(peers)) => assert_eq!(peers.len(), 1),
            other => panic!("expected Roster, got {:?}", other),
        }

        let from_list = s.handle_text(r#"42["client_list_update",[{"client_id":"b"}]]"#);
        match &from_list[0] {
            Action::Event(SignalingEvent::Roster(peers)) => assert_eq!(peers[0].client_id, "b"),
            other => panic!("expected Roster, got {:?}", other),
        }
    }

    #[test]
    fn test_peer_evicted_forwarded() {
        let mut s = session();
        let actions = s.handle_text(r#"42["peer_evicted",{}]"#);
        assert!(matches!(
            actions[0],
            Action::Event(SignalingEvent::PeerEvicted)
        ));
    }

    #[test]
    fn test_unknown_event_ignored() {
        let mut s = session();
        assert!(s.handle_text(r#"42["totally_new_event",{"x":1}]"#).is_empty());
    }

    #[test]
    fn test_open_packet_is_activity_only() {
        let mut s = session();
        assert!(s.handle_text(r#"0{"sid":"abc"}"#).is_empty());
    }
}
