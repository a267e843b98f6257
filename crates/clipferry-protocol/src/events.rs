//! Typed payloads for signaling events and relay HTTP bodies
//!
//! Field names match the wire exactly; `type` is a reserved word in Rust
//! so those fields are `kind` with a serde rename. Inbound parsers are
//! lenient (`default` on everything optional) because remote input is
//! untrusted.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Network placement metadata sent with the room join
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NetworkInfo {
    pub private_ip: String,
    pub cidr: String,
    pub network_id_hash: String,
    pub network_epoch: u32,
}

/// Reachability probe advertised to the server on join
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeInfo {
    pub probe_url: String,
    pub probe_ttl_ms: u64,
}

/// `join` event payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinPayload {
    pub protocol_version: String,
    pub room: String,
    pub client_id: String,
    pub client_type: String,
    pub joined_at_ms: u64,
    pub network: NetworkInfo,
    pub probe: ProbeInfo,
}

/// Inbound `clipboard_sync` event data
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ClipboardSyncData {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub encrypted: bool,
}

/// Inbound `file_sync` event data (cloud download announcement)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileSyncData {
    #[serde(default)]
    pub download_url: String,
    #[serde(default = "default_filename")]
    pub filename: String,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
}

/// Inbound `room_stats` event data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomStats {
    #[serde(default = "default_count")]
    pub count: u32,
}

fn default_count() -> u32 {
    1
}

fn default_filename() -> String {
    "received_file".to_string()
}

fn default_kind() -> String {
    "file".to_string()
}

/// One peer in the room roster
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct PeerEntry {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub device_name: String,
}

impl PeerEntry {
    /// UI display name: trimmed device name, client id as fallback
    pub fn display_name(&self) -> &str {
        let trimmed = self.device_name.trim();
        if trimmed.is_empty() {
            &self.client_id
        } else {
            trimmed
        }
    }
}

/// `file_available` announcement (outbound and inbound)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileAvailable {
    #[serde(default)]
    pub protocol_version: String,
    #[serde(default)]
    pub room: String,
    #[serde(default)]
    pub transfer_id: String,
    #[serde(default)]
    pub file_id: String,
    #[serde(default = "default_filename")]
    pub filename: String,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    #[serde(default)]
    pub size_bytes: u64,
    #[serde(default)]
    pub sender_client_id: String,
    #[serde(default)]
    pub local_url: String,
    #[serde(default)]
    pub sent_at_ms: u64,
}

/// `file_sync_completed` acknowledgement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSyncCompleted {
    pub protocol_version: String,
    pub room: String,
    pub transfer_id: String,
    pub file_id: String,
    pub method: String,
    pub received_at_ms: u64,
}

/// `file_need_relay` fallback request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileNeedRelay {
    pub protocol_version: String,
    pub room: String,
    pub transfer_id: String,
    pub file_id: String,
    pub reason: String,
    pub reported_at_ms: u64,
}

/// Server directive for an outbound pending transfer
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TransferCommand {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Body of `POST /api/relay`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayMessage {
    pub room: String,
    pub event: String,
    pub sender_id: String,
    pub data: Value,
}

/// `clipboard_sync` relay data (outbound)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipboardPayload {
    pub room: String,
    pub content: String,
    pub encrypted: bool,
    pub timestamp: String,
    pub source: String,
}

/// `file_sync` relay data (outbound, after a cloud upload)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSyncPayload {
    pub room: String,
    pub download_url: String,
    pub filename: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub timestamp: String,
}

/// Body of `POST /api/file/upload_auth`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadAuthRequest {
    pub filename: String,
    pub size: u64,
    pub content_type: String,
}

/// Response of `POST /api/file/upload_auth`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UploadAuthResponse {
    #[serde(default)]
    pub upload_url: String,
    #[serde(default)]
    pub download_url: String,
}

/// Parse a roster payload from either roster event shape
///
/// `room_state_changed` carries `{peers: [...]}`; `client_list_update`
/// carries the bare array. Entries without a client id are dropped.
pub fn parse_roster(data: &Value) -> Vec<PeerEntry> {
    let array = if let Some(peers) = data.get("peers").and_then(Value::as_array) {
        peers
    } else if let Some(list) = data.as_array() {
        list
    } else {
        return Vec::new();
    };

    array
        .iter()
        .filter_map(|entry| serde_json::from_value::<PeerEntry>(entry.clone()).ok())
        .filter(|peer| !peer.client_id.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_file_available_kind_renamed_to_type() {
        let announce = FileAvailable {
            protocol_version: crate::PROTOCOL_VERSION.to_string(),
            room: "r1".to_string(),
            transfer_id: "tr_1".to_string(),
            file_id: "f_1".to_string(),
            filename: "img.png".to_string(),
            kind: "image".to_string(),
            size_bytes: 42,
            sender_client_id: "pc_a".to_string(),
            local_url: "http://192.168.1.2:51000/files/img.png".to_string(),
            sent_at_ms: 1,
        };
        let value = serde_json::to_value(&announce).unwrap();
        assert_eq!(value["type"], "image");
        assert!(value.get("kind").is_none());
    }

    #[test]
    fn test_file_available_lenient_parse() {
        let parsed: FileAvailable =
            serde_json::from_value(json!({"transfer_id": "tr_9", "local_url": "http://x/f"}))
                .unwrap();
        assert_eq!(parsed.transfer_id, "tr_9");
        assert_eq!(parsed.filename, "received_file");
        assert_eq!(parsed.kind, "file");
    }

    #[test]
    fn test_room_stats_default_count() {
        let parsed: RoomStats = serde_json::from_value(json!({})).unwrap();
        assert_eq!(parsed.count, 1);
    }

    #[test]
    fn test_peer_display_name_fallback() {
        let named = PeerEntry {
            client_id: "pc_a".to_string(),
            device_name: "  Study PC  ".to_string(),
        };
        assert_eq!(named.display_name(), "Study PC");

        let unnamed = PeerEntry {
            client_id: "pc_b".to_string(),
            device_name: "   ".to_string(),
        };
        assert_eq!(unnamed.display_name(), "pc_b");
    }

    #[test]
    fn test_parse_roster_room_state_changed_shape() {
        let data = json!({"peers": [
            {"client_id": "pc_a", "device_name": "A"},
            {"client_id": "pc_b"},
            {"device_name": "no id"},
        ]});
        let roster = parse_roster(&data);
        assert_eq!(roster.len(), 2);
        assert_eq!(roster[0].client_id, "pc_a");
        assert_eq!(roster[1].device_name, "");
    }

    #[test]
    fn test_parse_roster_client_list_update_shape() {
        let data = json!([{"client_id": "phone_1", "device_name": "Phone"}]);
        let roster = parse_roster(&data);
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].display_name(), "Phone");
    }

    #[test]
    fn test_parse_roster_garbage_is_empty() {
        assert!(parse_roster(&json!("nope")).is_empty());
        assert!(parse_roster(&json!({"peers": "nope"})).is_empty());
        assert!(parse_roster(&Value::Null).is_empty());
    }

    #[test]
    fn test_join_payload_shape() {
        let join = JoinPayload {
            protocol_version: crate::PROTOCOL_VERSION.to_string(),
            room: "room_1".to_string(),
            client_id: "pc_u_1".to_string(),
            client_type: "pc".to_string(),
            joined_at_ms: 7,
            network: NetworkInfo {
                private_ip: "192.168.1.2".to_string(),
                cidr: "192.168.1.2/24".to_string(),
                network_id_hash: "abcd".to_string(),
                network_epoch: 0,
            },
            probe: ProbeInfo {
                probe_url: "http://192.168.1.2:51000/probe".to_string(),
                probe_ttl_ms: 30_000,
            },
        };
        let value = serde_json::to_value(&join).unwrap();
        assert_eq!(value["protocol_version"], "4.0");
        assert_eq!(value["network"]["network_epoch"], 0);
        assert_eq!(value["probe"]["probe_ttl_ms"], 30_000);
    }

    #[test]
    fn test_transfer_command_lenient() {
        let parsed: TransferCommand =
            serde_json::from_value(json!({"action": "upload_relay"})).unwrap();
        assert_eq!(parsed.action, "upload_relay");
        assert!(parsed.reason.is_none());
    }
}
