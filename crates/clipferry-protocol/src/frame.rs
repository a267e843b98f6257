//! Engine.IO v4 / Socket.IO v4 text-packet codec
//!
//! The first character is the Engine.IO packet type; a `4` (message)
//! wraps a Socket.IO packet whose own first character selects connect
//! ack (`0`) or event (`2`). Events carry a JSON array of
//! `[event_name, event_data]`.
//!
//! The parser is defensive: anything that is not well-formed comes back
//! as [`ProtocolError::InvalidFrame`] so the caller can log and drop it,
//! and packet types this client has no use for parse to [`Packet::Other`].

use serde_json::Value;

use crate::error::ProtocolError;
use crate::Result;

/// Socket.IO connect request packet (sent after the WS opens)
pub const CONNECT: &str = "40";

/// Engine.IO pong packet (reply to every inbound ping)
pub const PONG: &str = "3";

/// A parsed inbound signaling packet
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    /// Engine.IO `0` — transport open, carries session JSON
    Open(Value),
    /// Engine.IO `2` — heartbeat ping, must be answered with `3`
    Ping,
    /// Engine.IO `3` — heartbeat pong
    Pong,
    /// Socket.IO `40` — namespace connect acknowledged
    ConnectAck,
    /// Socket.IO `42[...]` — named event with JSON data
    Event {
        /// Event name (first array element)
        name: String,
        /// Event data (second array element, `Null` when absent)
        data: Value,
    },
    /// Well-formed packet of a type this client ignores
    Other,
}

/// Parse one inbound text frame
pub fn parse(text: &str) -> Result<Packet> {
    let mut chars = text.chars();
    let engine_type = chars
        .next()
        .ok_or_else(|| ProtocolError::InvalidFrame("empty frame".to_string()))?;
    let rest = chars.as_str();

    match engine_type {
        '0' => {
            let session = if rest.is_empty() {
                Value::Null
            } else {
                serde_json::from_str(rest)
                    .map_err(|e| ProtocolError::InvalidFrame(format!("open payload: {}", e)))?
            };
            Ok(Packet::Open(session))
        }
        '2' => Ok(Packet::Ping),
        '3' => Ok(Packet::Pong),
        '4' => parse_socket_packet(rest),
        // Engine.IO close/upgrade/noop — nothing for us to do
        '1' | '5' | '6' => Ok(Packet::Other),
        other => Err(ProtocolError::InvalidFrame(format!(
            "unknown engine packet type '{}'",
            other
        ))),
    }
}

fn parse_socket_packet(packet: &str) -> Result<Packet> {
    let mut chars = packet.chars();
    let socket_type = chars
        .next()
        .ok_or_else(|| ProtocolError::InvalidFrame("empty socket packet".to_string()))?;
    let rest = chars.as_str();

    match socket_type {
        '0' => Ok(Packet::ConnectAck),
        '2' => {
            let array: Value = serde_json::from_str(rest)
                .map_err(|e| ProtocolError::InvalidFrame(format!("event payload: {}", e)))?;
            let items = array.as_array().ok_or_else(|| {
                ProtocolError::InvalidFrame("event payload is not an array".to_string())
            })?;
            let name = items
                .first()
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    ProtocolError::InvalidFrame("event name missing or not a string".to_string())
                })?
                .to_string();
            let data = items.get(1).cloned().unwrap_or(Value::Null);
            Ok(Packet::Event { name, data })
        }
        // Disconnect, acks, binary events — not part of this protocol
        _ => Ok(Packet::Other),
    }
}

/// Encode an outbound event as `42["name",data]`
pub fn encode_event(name: &str, data: &Value) -> String {
    let array = Value::Array(vec![Value::String(name.to_string()), data.clone()]);
    format!("42{}", array)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_ping() {
        assert_eq!(parse("2").unwrap(), Packet::Ping);
    }

    #[test]
    fn test_parse_pong() {
        assert_eq!(parse("3").unwrap(), Packet::Pong);
    }

    #[test]
    fn test_parse_open_with_session() {
        let packet = parse(r#"0{"sid":"abc","pingInterval":25000}"#).unwrap();
        match packet {
            Packet::Open(session) => assert_eq!(session["sid"], "abc"),
            other => panic!("expected Open, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_connect_ack() {
        assert_eq!(parse("40").unwrap(), Packet::ConnectAck);
        // Connect ack with payload (sid object) still parses as ack
        assert_eq!(parse(r#"40{"sid":"xyz"}"#).unwrap(), Packet::ConnectAck);
    }

    #[test]
    fn test_parse_event() {
        let packet = parse(r#"42["room_stats",{"count":2}]"#).unwrap();
        match packet {
            Packet::Event { name, data } => {
                assert_eq!(name, "room_stats");
                assert_eq!(data["count"], 2);
            }
            other => panic!("expected Event, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_event_without_data() {
        let packet = parse(r#"42["peer_evicted"]"#).unwrap();
        match packet {
            Packet::Event { name, data } => {
                assert_eq!(name, "peer_evicted");
                assert_eq!(data, Value::Null);
            }
            other => panic!("expected Event, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_frames_are_errors_not_panics() {
        for bad in ["", "9", "42", "42{not json", "42{}", "42[1,2]", "4"] {
            assert!(parse(bad).is_err(), "{:?} should fail", bad);
        }
    }

    #[test]
    fn test_ignored_packet_types() {
        assert_eq!(parse("1").unwrap(), Packet::Other); // engine close
        assert_eq!(parse("6").unwrap(), Packet::Other); // engine noop
        assert_eq!(parse("41").unwrap(), Packet::Other); // socket disconnect
    }

    #[test]
    fn test_encode_event_framing() {
        let encoded = encode_event("join", &json!({"room": "r1"}));
        assert!(encoded.starts_with("42["));
        // Must parse back to the same event
        match parse(&encoded).unwrap() {
            Packet::Event { name, data } => {
                assert_eq!(name, "join");
                assert_eq!(data["room"], "r1");
            }
            other => panic!("expected Event, got {:?}", other),
        }
    }

    #[test]
    fn test_encode_event_with_null_data() {
        assert_eq!(encode_event("ack", &Value::Null), "42[\"ack\",null]");
    }
}
