//! Default configuration values

use chrono::Utc;

/// Fixed deployment relay, overridable in the config file
pub fn relay_server_url() -> String {
    "https://relay.clipferry.net:12505/".to_string()
}

/// Default manual-push hotkey
pub fn push_hotkey() -> String {
    "Ctrl+F6".to_string()
}

/// Default LAN arbitration window in seconds
pub fn lan_timeout() -> u64 {
    10
}

/// Stable-ish device identity: `pc_<user>_<suffix>`
///
/// The suffix is seconds-mod-10000 so a regenerated identity is distinct
/// from the previous one without leaking anything.
pub fn device_id() -> String {
    let user = username();
    let suffix = (Utc::now().timestamp().max(0) as u64) % 10_000;
    format!("pc_{}_{}", user, suffix)
}

/// Fresh room identifier
pub fn fresh_room_id() -> String {
    format!("room_{}", Utc::now().timestamp())
}

fn username() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "user".to_string())
}
