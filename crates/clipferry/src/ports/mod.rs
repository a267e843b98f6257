//! Platform ports
//!
//! Thin interfaces over the host platform: clipboard read/write, toast
//! notifications, the global push hotkey, and the clipboard change
//! monitor. The sync engine only sees the traits, so tests substitute
//! in-memory fakes.

pub mod clipboard;
pub mod hotkey;
pub mod monitor;
pub mod notify;

use std::path::{Path, PathBuf};

/// What the local clipboard currently holds
#[derive(Debug, Clone, PartialEq)]
pub enum ClipboardContent {
    Text(String),
    /// PNG-encoded image bytes
    Image(Vec<u8>),
    Files(Vec<PathBuf>),
    None,
}

/// Clipboard access
pub trait ClipboardPort: Send + Sync {
    fn get(&self) -> ClipboardContent;
    fn set_text(&self, text: &str) -> anyhow::Result<()>;
    fn set_image_png(&self, png: &[u8]) -> anyhow::Result<()>;
    fn set_files(&self, paths: &[PathBuf]) -> anyhow::Result<()>;
    fn set_image_from_file(&self, path: &Path) -> anyhow::Result<()>;
}

/// Visual style of a toast
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationStyle {
    /// Something arrived from a peer
    Inbound,
    /// Something we sent out
    Outbound,
}

/// Toast notifications; implementations are fire-and-forget
pub trait NotificationPort: Send + Sync {
    fn show(&self, title: &str, body: &str, style: NotificationStyle);
}
