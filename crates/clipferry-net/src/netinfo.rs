//! Local network metadata for the signaling join
//!
//! The server compares `network_id_hash` between peers to decide whether
//! they share an L2 network and can use the LAN path. The best private
//! IPv4 is chosen by address-family preference: home/office ranges first,
//! CGNAT-ish ranges last.

use std::net::{IpAddr, Ipv4Addr};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Snapshot of the local network placement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSnapshot {
    pub private_ip: String,
    pub cidr: String,
    pub network_id_hash: String,
    pub network_epoch: u32,
}

impl Default for NetworkSnapshot {
    fn default() -> Self {
        Self {
            private_ip: "127.0.0.1".to_string(),
            cidr: "127.0.0.1/32".to_string(),
            network_id_hash: String::new(),
            network_epoch: 0,
        }
    }
}

/// Collect the current network snapshot
///
/// Falls back to loopback when no interface qualifies, so the caller can
/// always send a join payload.
pub fn collect() -> NetworkSnapshot {
    let interfaces = match local_ip_address::list_afinet_netifas() {
        Ok(list) => list,
        Err(e) => {
            debug!("interface enumeration failed: {}", e);
            return NetworkSnapshot::default();
        }
    };

    let candidates: Vec<(String, Ipv4Addr)> = interfaces
        .into_iter()
        .filter_map(|(name, addr)| match addr {
            IpAddr::V4(v4) => Some((name, v4)),
            IpAddr::V6(_) => None,
        })
        .collect();

    match best_ipv4(&candidates) {
        Some((name, ip)) => {
            // The enumeration API does not expose the on-link prefix
            // length; /24 is assumed for the advertised CIDR.
            let cidr = format!("{}/24", ip);
            NetworkSnapshot {
                private_ip: ip.to_string(),
                cidr,
                network_id_hash: network_id_hash(&name, &ip),
                network_epoch: 0,
            }
        }
        None => NetworkSnapshot::default(),
    }
}

/// Best local IPv4 for the LAN path, if any interface qualifies
pub fn best_ipv4(candidates: &[(String, Ipv4Addr)]) -> Option<(String, Ipv4Addr)> {
    candidates
        .iter()
        .filter(|(_, ip)| !ip.is_loopback())
        .max_by_key(|(_, ip)| score(ip))
        .filter(|(_, ip)| score(ip) > 0)
        .cloned()
}

/// Preference score for a local address
///
/// 192.168/16 beats 10/8 beats 172.16/12; 10.100/16 and 100.64/10
/// (CGNAT) rank below everything routable.
fn score(ip: &Ipv4Addr) -> i32 {
    let octets = ip.octets();
    match octets {
        [192, 168, ..] => 100,
        [10, 100, ..] => 10,
        [10, ..] => 90,
        [172, b, ..] if (16..32).contains(&b) => 80,
        [100, b, ..] if (64..128).contains(&b) => 10,
        [127, ..] => 0,
        _ => 50,
    }
}

/// Stable identifier for the current L2 network
///
/// BLAKE3 over the interface name and the /24 prefix, hex-truncated.
/// Two hosts on the same subnet with differently named interfaces will
/// not match each other, but the same host always reports the same hash
/// for the same network, which is what the server's co-location check
/// keys on.
fn network_id_hash(interface: &str, ip: &Ipv4Addr) -> String {
    let octets = ip.octets();
    let material = format!("{}|{}.{}.{}", interface, octets[0], octets[1], octets[2]);
    let hash = blake3::hash(material.as_bytes());
    hash.to_hex()[..16].to_string()
}
