//! Application directories and the collision-safe save rule
//!
//! The app dir is the executable's directory (the config lives next to
//! the binary, like the original deployment). `temp/` underneath it
//! holds outbound envelopes while a transfer is pending and is swept on
//! startup; only the sync engine writes and deletes there afterwards.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::Result;
use crate::StoreError;

/// Directory the executable lives in
pub fn app_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe()?;
    exe.parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| StoreError::Path("executable has no parent directory".to_string()))
}

/// `temp/` under the app dir, created if missing
pub fn temp_dir() -> Result<PathBuf> {
    let dir = app_dir()?.join("temp");
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Remove every regular file under `temp/`
///
/// Called once at startup; leftovers are envelopes from transfers that
/// never reached a terminal state in a previous run.
pub fn clean_temp_dir() -> Result<()> {
    let dir = match app_dir() {
        Ok(base) => base.join("temp"),
        Err(e) => return Err(e),
    };
    if !dir.exists() {
        return Ok(());
    }
    for entry in fs::read_dir(&dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() {
            if let Err(e) = fs::remove_file(&path) {
                warn!("failed to remove stale temp file {}: {}", path.display(), e);
            } else {
                debug!("removed stale temp file {}", path.display());
            }
        }
    }
    Ok(())
}

/// Default download directory: `<Downloads>/ClipboardMan`
pub fn default_download_dir() -> PathBuf {
    dirs::download_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ClipboardMan")
}

/// First non-existing path for `name` inside `dir`
///
/// Tries `stem.ext`, then `stem_1.ext`, `stem_2.ext`, and so on; the
/// canonical collision rule for every saved file.
pub fn unique_path(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return candidate;
    }

    let (stem, ext) = clipferry_protocol::filename::split_stem(name);
    let mut count = 1u32;
    loop {
        let renamed = dir.join(format!("{}_{}{}", stem, count, ext));
        if !renamed.exists() {
            return renamed;
        }
        count += 1;
    }
}

/// Write `bytes` into `dir` under `name`, renaming on collision
///
/// Creates `dir` if needed and returns the path actually written.
pub fn save_unique(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = unique_path(dir, name);
    fs::write(&path, bytes)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_path_no_collision() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            unique_path(dir.path(), "a.txt"),
            dir.path().join("a.txt")
        );
    }

    #[test]
    fn test_unique_path_counts_past_existing_suffixes() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("name.ext"), b"0").unwrap();
        fs::write(dir.path().join("name_1.ext"), b"1").unwrap();

        assert_eq!(
            unique_path(dir.path(), "name.ext"),
            dir.path().join("name_2.ext")
        );
    }

    #[test]
    fn test_unique_path_without_extension() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("blob"), b"0").unwrap();
        assert_eq!(unique_path(dir.path(), "blob"), dir.path().join("blob_1"));
    }

    #[test]
    fn test_save_unique_writes_and_renames() {
        let dir = tempfile::tempdir().unwrap();
        let first = save_unique(dir.path(), "img.png", b"one").unwrap();
        let second = save_unique(dir.path(), "img.png", b"two").unwrap();

        assert_eq!(first, dir.path().join("img.png"));
        assert_eq!(second, dir.path().join("img_1.png"));
        assert_eq!(fs::read(&first).unwrap(), b"one");
        assert_eq!(fs::read(&second).unwrap(), b"two");
    }

    #[test]
    fn test_save_unique_creates_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("deep").join("down");
        let path = save_unique(&nested, "f.bin", b"x").unwrap();
        assert!(path.exists());
    }
}
