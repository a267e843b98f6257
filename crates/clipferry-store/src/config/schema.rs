//! Configuration schema

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::defaults;

/// Main Clipferry configuration
///
/// Every field has a serde default so a config written by an older build
/// (or edited by hand) still loads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL for HTTP relay calls and the WebSocket upgrade
    pub relay_server_url: String,
    /// Where received files are saved
    pub download_path: PathBuf,
    /// Stable identity in signaling (`pc_<user>_<suffix>`)
    pub device_id: String,
    /// Room identifier
    pub room_id: String,
    /// Base64-encoded 32-byte AEAD room key
    pub room_key: String,
    /// Hotkey string for the manual push (`Ctrl+F6` style)
    pub push_hotkey: String,
    /// Copy inbound images to the clipboard
    pub auto_copy_image: bool,
    /// Copy inbound files to the clipboard
    pub auto_copy_file: bool,
    /// Push on local text change
    pub auto_push_text: bool,
    /// Push on local image change
    pub auto_push_image: bool,
    /// Push on local file change
    pub auto_push_file: bool,
    /// Register OS autostart
    pub auto_start: bool,
    /// Do not show the main surface on launch
    pub start_minimized: bool,
    /// Enable toast notifications
    pub show_notifications: bool,
    /// Seconds to wait for LAN arbitration before the cloud fallback
    pub lan_timeout: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            relay_server_url: defaults::relay_server_url(),
            download_path: crate::paths::default_download_dir(),
            device_id: defaults::device_id(),
            room_id: String::new(),
            room_key: String::new(),
            push_hotkey: defaults::push_hotkey(),
            auto_copy_image: true,
            auto_copy_file: true,
            auto_push_text: false,
            auto_push_image: false,
            auto_push_file: false,
            auto_start: false,
            start_minimized: false,
            show_notifications: true,
            lan_timeout: defaults::lan_timeout(),
        }
    }
}

impl Config {
    /// Fill in anything a fresh or hand-edited config is missing
    pub fn ensure_complete(&mut self) {
        if self.device_id.is_empty() {
            self.device_id = defaults::device_id();
        }
        if self.room_id.is_empty() || self.room_key.is_empty() {
            tracing::info!("room credentials missing, generating a new room");
            if self.room_id.is_empty() {
                self.room_id = defaults::fresh_room_id();
            }
            if self.room_key.is_empty() {
                self.room_key = clipferry_crypto::generate_key_base64();
            }
        }
    }

    /// Replace the room credentials and device-id suffix
    pub fn regenerate_credentials(&mut self) {
        self.room_id = defaults::fresh_room_id();
        self.room_key = clipferry_crypto::generate_key_base64();
        self.device_id = defaults::device_id();
        tracing::info!(room = %self.room_id, "room credentials reset");
    }

    /// Relay base URL without a trailing slash
    pub fn relay_base(&self) -> &str {
        self.relay_server_url.trim_end_matches('/')
    }
}
