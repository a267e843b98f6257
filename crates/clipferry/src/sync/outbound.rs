//! Outbound pipelines
//!
//! Text goes straight to the relay: encrypt, base64, one POST. Binary
//! objects run the dual-path state machine: stage the envelope for the
//! LAN server, announce via signaling, arbitrate for up to
//! `lan_timeout` seconds, and fall back to the cloud path when a peer
//! or the server asks for it, or when nobody answers.

use std::path::Path;

use anyhow::{bail, Context};
use rand::Rng;
use tracing::{info, warn};

use clipferry_net::netinfo;
use clipferry_protocol::events::{
    ClipboardPayload, FileAvailable, FileSyncPayload, RelayMessage, UploadAuthRequest,
    UploadAuthResponse,
};
use clipferry_protocol::PROTOCOL_VERSION;
use clipferry_store::config::Config;

use super::registry::{Decision, PendingTransfer};
use super::{clock_stamp, now_ms, SyncEngine};
use crate::ports::{ClipboardContent, NotificationStyle};

impl SyncEngine {
    /// Encrypt and relay a clipboard text
    pub async fn push_text(&self, text: &str) -> anyhow::Result<()> {
        let config = self.config().snapshot();
        if config.room_key.is_empty() {
            bail!("no room key configured");
        }

        let key = self.room_key()?;
        let envelope = clipferry_crypto::encrypt(key.as_bytes(), text.as_bytes())?;
        let content = clipferry_crypto::to_base64(&envelope);

        let message = RelayMessage {
            room: config.room_id.clone(),
            event: "clipboard_sync".to_string(),
            sender_id: config.device_id.clone(),
            data: serde_json::to_value(ClipboardPayload {
                room: config.room_id.clone(),
                content,
                encrypted: true,
                timestamp: clock_stamp(),
                source: config.device_id.clone(),
            })?,
        };

        let url = format!("{}/api/relay", config.relay_base());
        let response = self.http().post_json(&url, &message).await?;
        if !response.is_success() {
            bail!("relay rejected clipboard push: {}", response.status);
        }
        info!(len = text.len(), "clipboard text pushed");
        Ok(())
    }

    /// Push a clipboard image as `img_<secs>.png`
    pub async fn push_image(&self, png: Vec<u8>) -> anyhow::Result<String> {
        let filename = format!("img_{}.png", now_ms() / 1000);
        self.push_file_bytes(png, filename, "image".to_string())
            .await
    }

    /// Push a file from disk
    pub async fn push_file_path(&self, path: &Path) -> anyhow::Result<String> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("read {}", path.display()))?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("pushed_file")
            .to_string();
        let kind = clipferry_net::lan::detect_kind(&filename);
        self.push_file_bytes(bytes, filename, kind).await
    }

    /// Run the binary send state machine; returns the transfer id
    ///
    /// The staged temp file holds the *envelope*, so the LAN server
    /// serves ciphertext and receivers always decrypt.
    pub async fn push_file_bytes(
        &self,
        bytes: Vec<u8>,
        filename: String,
        kind: String,
    ) -> anyhow::Result<String> {
        let config = self.config().snapshot();
        if config.room_key.is_empty() {
            bail!("no room key configured");
        }
        clipferry_protocol::filename::sanitize(&filename)?;

        let key = self.room_key()?;
        let envelope = clipferry_crypto::encrypt(key.as_bytes(), &bytes)?;

        // Ids are stable for the whole transfer lifetime
        let ms = now_ms();
        let file_id = format!("f_{}", ms);
        let transfer_id = format!("tr_{}_{}", ms, rand::thread_rng().gen_range(0..100));

        // Stage the envelope where the LAN server can serve it
        let temp_path = self.temp_dir().join(&filename);
        tokio::fs::create_dir_all(self.temp_dir()).await?;
        tokio::fs::write(&temp_path, &envelope)
            .await
            .context("stage envelope for LAN transfer")?;

        let pending = PendingTransfer::new(
            config.room_id.clone(),
            transfer_id.clone(),
            file_id.clone(),
            filename.clone(),
            kind.clone(),
            envelope,
            temp_path,
        );
        self.registry().insert(pending.clone());

        let announce = FileAvailable {
            protocol_version: PROTOCOL_VERSION.to_string(),
            room: config.room_id.clone(),
            transfer_id: transfer_id.clone(),
            file_id,
            filename: filename.clone(),
            kind,
            size_bytes: bytes.len() as u64,
            sender_client_id: config.device_id.clone(),
            local_url: format!(
                "http://{}:{}/files/{}",
                netinfo::collect().private_ip,
                self.lan_port(),
                filename
            ),
            sent_at_ms: ms,
        };
        if let Err(e) = self
            .signaling()
            .emit("file_available", serde_json::to_value(&announce)?)
            .await
        {
            // The cloud fallback still runs over plain HTTP, so the
            // transfer proceeds to arbitration either way
            warn!(transfer_id = %transfer_id, "file_available announce failed: {}", e);
        } else {
            info!(transfer_id = %transfer_id, room = %config.room_id, "tx file_available");
        }

        let engine = self.clone();
        let lan_timeout = std::time::Duration::from_secs(config.lan_timeout);
        tokio::spawn(async move { engine.arbitrate(pending, lan_timeout).await });

        Ok(transfer_id)
    }

    /// Wait out the arbitration window and run the terminal transition
    async fn arbitrate(
        &self,
        pending: std::sync::Arc<PendingTransfer>,
        lan_timeout: std::time::Duration,
    ) {
        match pending.await_decision(lan_timeout).await {
            Decision::Completed => {
                info!(transfer_id = %pending.transfer_id, "LAN sync finished");
            }
            Decision::Upload(reason) => {
                // compare-and-set guard: exactly one upload per transfer
                if pending.try_claim_upload() {
                    info!(
                        transfer_id = %pending.transfer_id,
                        reason = %reason,
                        "upload start"
                    );
                    if let Err(e) = self.perform_cloud_upload(&pending).await {
                        warn!(transfer_id = %pending.transfer_id, "cloud upload failed: {}", e);
                    }
                    info!(transfer_id = %pending.transfer_id, "upload end");
                }
                // Peers still polling the LAN URL get a grace window
                // before the staged envelope disappears
                tokio::time::sleep(self.upload_grace()).await;
            }
        }

        if let Err(e) = tokio::fs::remove_file(&pending.temp_path).await {
            tracing::debug!(
                "temp cleanup for {}: {}",
                pending.temp_path.display(),
                e
            );
        }
        self.registry().remove(&pending.transfer_id);
    }

    /// Cloud path: auth, PUT the envelope, announce `file_sync`
    ///
    /// Any non-2xx aborts the transfer with no automatic retry; the
    /// sender's next push starts a fresh transfer.
    pub(crate) async fn perform_cloud_upload(
        &self,
        pending: &PendingTransfer,
    ) -> anyhow::Result<()> {
        let config = self.config().snapshot();

        let auth_url = format!("{}/api/file/upload_auth", config.relay_base());
        let auth_request = UploadAuthRequest {
            filename: pending.filename.clone(),
            size: pending.encrypted.len() as u64,
            content_type: "application/octet-stream".to_string(),
        };
        let auth = self.http().post_json(&auth_url, &auth_request).await?;
        if !auth.is_success() {
            bail!("upload auth rejected: {}", auth.status);
        }
        let grant: UploadAuthResponse =
            serde_json::from_str(&auth.body).context("parse upload auth response")?;
        if grant.upload_url.is_empty() {
            bail!("upload auth returned no upload_url");
        }

        let put = self
            .http()
            .put(&grant.upload_url, pending.encrypted.clone())
            .await?;
        if !put.is_success() {
            bail!("blob upload failed: {}", put.status);
        }

        let relay_url = format!("{}/api/relay", config.relay_base());
        let message = RelayMessage {
            room: config.room_id.clone(),
            event: "file_sync".to_string(),
            sender_id: config.device_id.clone(),
            data: serde_json::to_value(FileSyncPayload {
                room: config.room_id.clone(),
                download_url: grant.download_url,
                filename: pending.filename.clone(),
                kind: pending.kind.clone(),
                timestamp: clock_stamp(),
            })?,
        };
        let relayed = self.http().post_json(&relay_url, &message).await?;
        if !relayed.is_success() {
            bail!("file_sync relay rejected: {}", relayed.status);
        }
        info!(transfer_id = %pending.transfer_id, "cloud sync pushed");
        Ok(())
    }

    /// Manual push of whatever the clipboard holds (hotkey / CLI)
    pub async fn manual_push(&self) {
        if self.peer_count() == 0 {
            warn!("manual push with no peers in the room");
            self.notify(
                "Push Failed",
                "No target devices connected to this room.",
                NotificationStyle::Inbound,
            );
            return;
        }

        let clipboard = self.clipboard();
        let content = match tokio::task::spawn_blocking(move || clipboard.get()).await {
            Ok(content) => content,
            Err(e) => {
                warn!("clipboard read failed: {}", e);
                return;
            }
        };

        match content {
            ClipboardContent::Text(text) if !text.is_empty() => match self.push_text(&text).await
            {
                Ok(()) => self.notify(
                    "Clipboard Pushed",
                    "Text content sent",
                    NotificationStyle::Outbound,
                ),
                Err(e) => {
                    warn!("manual text push failed: {}", e);
                    self.notify(
                        "Push Failed",
                        "Failed to send text content.",
                        NotificationStyle::Inbound,
                    );
                }
            },
            ClipboardContent::Image(png) => match self.push_image(png).await {
                Ok(_) => self.notify(
                    "Clipboard Pushed",
                    "Image content sent",
                    NotificationStyle::Outbound,
                ),
                Err(e) => {
                    warn!("manual image push failed: {}", e);
                    self.notify(
                        "Push Failed",
                        "Failed to send image content.",
                        NotificationStyle::Inbound,
                    );
                }
            },
            ClipboardContent::Files(paths) => {
                let mut pushed = 0usize;
                for path in &paths {
                    match self.push_file_path(path).await {
                        Ok(_) => pushed += 1,
                        Err(e) => warn!("manual file push failed for {}: {}", path.display(), e),
                    }
                }
                if pushed > 0 {
                    self.notify(
                        "Clipboard Pushed",
                        "File(s) sent",
                        NotificationStyle::Outbound,
                    );
                }
            }
            _ => info!("manual push: clipboard empty"),
        }
    }

    /// Automatic push on a clipboard change; failures are silent
    pub async fn auto_push(&self, content: ClipboardContent) {
        let config = self.config().snapshot();
        if !should_auto_push(
            &config,
            &content,
            self.suppress().engaged(),
            self.peer_count(),
        ) {
            return;
        }

        match content {
            ClipboardContent::Text(text) => {
                if let Err(e) = self.push_text(&text).await {
                    warn!("auto text push failed: {}", e);
                } else {
                    self.notify(
                        "Auto Pushed",
                        "Text content sent automatically",
                        NotificationStyle::Outbound,
                    );
                }
            }
            ClipboardContent::Image(png) => {
                if let Err(e) = self.push_image(png).await {
                    warn!("auto image push failed: {}", e);
                } else {
                    self.notify(
                        "Auto Pushed",
                        "Image content sent automatically",
                        NotificationStyle::Outbound,
                    );
                }
            }
            ClipboardContent::Files(paths) => {
                for path in &paths {
                    if let Err(e) = self.push_file_path(path).await {
                        warn!("auto file push failed for {}: {}", path.display(), e);
                    }
                }
                self.notify(
                    "Auto Pushed",
                    "File(s) sent automatically",
                    NotificationStyle::Outbound,
                );
            }
            ClipboardContent::None => {}
        }
    }
}

/// Outbound gate for automatic pushes
///
/// Quiet skips: the suppression latch (we installed the content
/// ourselves), an empty room, and per-type auto-push switches.
pub fn should_auto_push(
    config: &Config,
    content: &ClipboardContent,
    suppressed: bool,
    peer_count: usize,
) -> bool {
    if suppressed || peer_count == 0 {
        return false;
    }
    match content {
        ClipboardContent::Text(text) => config.auto_push_text && !text.is_empty(),
        ClipboardContent::Image(_) => config.auto_push_image,
        ClipboardContent::Files(_) => config.auto_push_file,
        ClipboardContent::None => false,
    }
}
