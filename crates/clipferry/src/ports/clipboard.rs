//! System clipboard on `arboard`
//!
//! A fresh `arboard::Clipboard` is opened per operation; the handle is
//! not `Sync` and operations are rare enough that reopening is cheaper
//! than fencing a shared one. File lists have no portable clipboard
//! representation in `arboard`, so they are written as newline-joined
//! paths in text form; image data crosses the boundary as PNG and is
//! converted to the raw bitmap `arboard` wants via the `image` crate.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::Context;
use arboard::Clipboard;
use image::ImageFormat;
use tracing::debug;

use super::{ClipboardContent, ClipboardPort};

/// `ClipboardPort` implementation for the host system
pub struct SystemClipboard;

impl SystemClipboard {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemClipboard {
    fn default() -> Self {
        Self::new()
    }
}

impl ClipboardPort for SystemClipboard {
    fn get(&self) -> ClipboardContent {
        let mut clipboard = match Clipboard::new() {
            Ok(clipboard) => clipboard,
            Err(e) => {
                debug!("clipboard unavailable: {}", e);
                return ClipboardContent::None;
            }
        };

        if let Ok(text) = clipboard.get_text() {
            if !text.is_empty() {
                return ClipboardContent::Text(text);
            }
        }

        if let Ok(image) = clipboard.get_image() {
            match encode_png(image.width, image.height, &image.bytes) {
                Ok(png) => return ClipboardContent::Image(png),
                Err(e) => debug!("clipboard image encode failed: {}", e),
            }
        }

        ClipboardContent::None
    }

    fn set_text(&self, text: &str) -> anyhow::Result<()> {
        Clipboard::new()
            .context("open clipboard")?
            .set_text(text.to_string())
            .context("set clipboard text")
    }

    fn set_image_png(&self, png: &[u8]) -> anyhow::Result<()> {
        let decoded = image::load_from_memory(png).context("decode png")?;
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        let data = arboard::ImageData {
            width: width as usize,
            height: height as usize,
            bytes: rgba.into_raw().into(),
        };
        Clipboard::new()
            .context("open clipboard")?
            .set_image(data)
            .context("set clipboard image")
    }

    fn set_files(&self, paths: &[PathBuf]) -> anyhow::Result<()> {
        let joined = paths
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join("\n");
        self.set_text(&joined)
    }

    fn set_image_from_file(&self, path: &Path) -> anyhow::Result<()> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("read image {}", path.display()))?;
        self.set_image_png(&bytes)
    }
}

fn encode_png(width: usize, height: usize, rgba: &[u8]) -> anyhow::Result<Vec<u8>> {
    let buffer: image::RgbaImage =
        image::ImageBuffer::from_raw(width as u32, height as u32, rgba.to_vec())
            .context("clipboard bitmap has unexpected size")?;
    let mut png = Vec::new();
    buffer
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .context("encode png")?;
    Ok(png)
}
