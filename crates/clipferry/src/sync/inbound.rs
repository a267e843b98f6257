//! Inbound pipelines
//!
//! Three ways content arrives: a `clipboard_sync` text envelope, a
//! `file_available` announcement we pull over the LAN, and a
//! `file_sync` cloud URL. All three decrypt, save collision-safe, and
//! install into the clipboard behind the suppression latch. A LAN pull
//! that cannot produce plaintext reports `file_need_relay` so the
//! sender falls back to the cloud path.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use clipferry_net::lan::LanUpload;
use clipferry_protocol::events::{
    ClipboardSyncData, FileAvailable, FileNeedRelay, FileSyncCompleted, FileSyncData,
};
use clipferry_protocol::{filename, PROTOCOL_VERSION};
use clipferry_store::paths::save_unique;

use super::{now_ms, SyncEngine};
use crate::ports::NotificationStyle;

impl SyncEngine {
    /// Install a relayed clipboard text
    pub async fn handle_clipboard_sync(&self, data: ClipboardSyncData) {
        if data.content.is_empty() {
            return;
        }

        let text = if data.encrypted {
            let plain = self
                .room_key()
                .and_then(|key| {
                    let envelope = clipferry_crypto::from_base64(&data.content)?;
                    Ok(clipferry_crypto::decrypt(key.as_bytes(), &envelope)?)
                })
                .and_then(|bytes| Ok(String::from_utf8(bytes)?));
            match plain {
                Ok(text) => text,
                Err(e) => {
                    warn!("dropping undecryptable clipboard sync: {}", e);
                    return;
                }
            }
        } else {
            data.content
        };

        self.suppress().engage();
        let clipboard = self.clipboard();
        let install = text.clone();
        let result =
            tokio::task::spawn_blocking(move || clipboard.set_text(&install)).await;
        match result {
            Ok(Ok(())) => {
                info!(len = text.len(), "clipboard text received");
                self.notify(
                    "Clipboard Received",
                    &preview(&text),
                    NotificationStyle::Inbound,
                );
            }
            Ok(Err(e)) => warn!("clipboard install failed: {}", e),
            Err(e) => warn!("clipboard install task failed: {}", e),
        }
    }

    /// A peer announced a file we should pull over the LAN
    pub async fn handle_lan_announce(&self, announce: FileAvailable) {
        if announce.local_url.is_empty() || announce.transfer_id.is_empty() {
            return;
        }
        info!(
            transfer_id = %announce.transfer_id,
            url = %announce.local_url,
            "peer announced file, attempting LAN pull"
        );

        let config = self.config().snapshot();
        let response = self
            .http()
            .get(&announce.local_url, &[("X-Room-ID", config.room_id.as_str())])
            .await;

        let envelope = match response {
            Ok(r) if r.is_success() && !r.body.is_empty() => r.body,
            Ok(r) => {
                warn!(status = r.status, "LAN pull returned nothing, requesting relay");
                self.emit_need_relay(&announce, "lan_unreachable").await;
                return;
            }
            Err(e) => {
                warn!("LAN pull failed ({}), requesting relay", e);
                self.emit_need_relay(&announce, "lan_unreachable").await;
                return;
            }
        };

        let plain = match self
            .room_key()
            .and_then(|key| Ok(clipferry_crypto::decrypt(key.as_bytes(), &envelope)?))
        {
            Ok(plain) if !plain.is_empty() => plain,
            Ok(_) => {
                warn!("LAN pull produced an empty payload, requesting relay");
                self.emit_need_relay(&announce, "lan_unreachable").await;
                return;
            }
            Err(e) => {
                warn!("LAN payload failed to decrypt ({}), requesting relay", e);
                self.emit_need_relay(&announce, "lan_unreachable").await;
                return;
            }
        };

        let saved = match self.save_received(&announce.filename, &plain).await {
            Ok(path) => path,
            Err(e) => {
                warn!("saving LAN file failed: {}", e);
                return;
            }
        };
        self.process_received_file(&saved, &announce.filename, &announce.kind)
            .await;

        let ack = FileSyncCompleted {
            protocol_version: PROTOCOL_VERSION.to_string(),
            room: config.room_id,
            transfer_id: announce.transfer_id.clone(),
            file_id: announce.file_id.clone(),
            method: "lan".to_string(),
            received_at_ms: now_ms(),
        };
        if let Ok(value) = serde_json::to_value(&ack) {
            if self.signaling().emit("file_sync_completed", value).await.is_ok() {
                info!(transfer_id = %announce.transfer_id, "tx file_sync_completed");
            }
        }
    }

    async fn emit_need_relay(&self, announce: &FileAvailable, reason: &str) {
        let request = FileNeedRelay {
            protocol_version: PROTOCOL_VERSION.to_string(),
            room: self.config().snapshot().room_id,
            transfer_id: announce.transfer_id.clone(),
            file_id: announce.file_id.clone(),
            reason: reason.to_string(),
            reported_at_ms: now_ms(),
        };
        if let Ok(value) = serde_json::to_value(&request) {
            let _ = self.signaling().emit("file_need_relay", value).await;
        }
    }

    /// Download a cloud-relayed file
    pub async fn handle_cloud_file(&self, data: FileSyncData) {
        if data.download_url.is_empty() {
            return;
        }
        info!(filename = %data.filename, "downloading relayed file");

        let response = match self.http().get(&data.download_url, &[]).await {
            Ok(r) if r.is_success() => r,
            Ok(r) => {
                warn!(status = r.status, "cloud download rejected");
                return;
            }
            Err(e) => {
                warn!("cloud download failed: {}", e);
                return;
            }
        };

        let plain = match self
            .room_key()
            .and_then(|key| Ok(clipferry_crypto::decrypt(key.as_bytes(), &response.body)?))
        {
            Ok(plain) => plain,
            Err(e) => {
                warn!("cloud payload failed to decrypt: {}", e);
                return;
            }
        };

        match self.save_received(&data.filename, &plain).await {
            Ok(path) => {
                self.process_received_file(&path, &data.filename, &data.kind)
                    .await
            }
            Err(e) => warn!("saving relayed file failed: {}", e),
        }
    }

    /// A peer pushed a file straight to our LAN server
    pub async fn handle_lan_upload(&self, upload: LanUpload) {
        match self.save_received(&upload.filename, &upload.bytes).await {
            Ok(path) => {
                self.process_received_file(&path, &upload.filename, &upload.kind)
                    .await
            }
            Err(e) => warn!("saving LAN upload failed: {}", e),
        }
    }

    /// Collision-safe save into the configured download directory
    async fn save_received(&self, name: &str, bytes: &[u8]) -> anyhow::Result<PathBuf> {
        filename::sanitize(name)?;
        let dir = self.config().snapshot().download_path;
        let bytes = bytes.to_vec();
        let name = name.to_string();
        let path =
            tokio::task::spawn_blocking(move || save_unique(&dir, &name, &bytes)).await??;
        Ok(path)
    }

    /// Notify and auto-copy a received file per configuration
    pub(crate) async fn process_received_file(&self, path: &Path, name: &str, kind: &str) {
        info!(file = %path.display(), "received file processed");
        self.notify("File Received", name, NotificationStyle::Inbound);

        let config = self.config().snapshot();
        let clipboard = self.clipboard();
        let path = path.to_path_buf();

        // The install provokes a clipboard-change event; hide it
        self.suppress().engage();
        let is_image = kind == "image";
        let result = tokio::task::spawn_blocking(move || {
            if is_image && config.auto_copy_image {
                clipboard.set_image_from_file(&path)
            } else if config.auto_copy_file {
                clipboard.set_files(&[path])
            } else {
                Ok(())
            }
        })
        .await;
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("auto-copy failed: {}", e),
            Err(e) => warn!("auto-copy task failed: {}", e),
        }
    }
}

/// First 30 characters, ellipsized, for the toast body
fn preview(text: &str) -> String {
    let mut shortened: String = text.chars().take(30).collect();
    if text.chars().count() > 30 {
        shortened.push('…');
    }
    shortened
}
