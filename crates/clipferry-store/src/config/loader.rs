//! Configuration file loading and saving

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::Config;
use crate::Result;

/// Default configuration path: `config.json` next to the executable
pub fn config_path() -> Result<PathBuf> {
    Ok(crate::paths::app_dir()?.join("config.json"))
}

/// Load the config from `path`, creating it with defaults when absent
///
/// A corrupt file is not fatal: the error is logged and defaults are
/// written back, matching the "never crash on bad local state" rule.
pub fn load_or_init(path: &Path) -> Result<Config> {
    let mut config = match fs::read_to_string(path) {
        Ok(text) => match serde_json::from_str::<Config>(&text) {
            Ok(config) => config,
            Err(e) => {
                warn!("config at {} is corrupt ({}), rewriting defaults", path.display(), e);
                Config::default()
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("no config at {}, creating one", path.display());
            Config::default()
        }
        Err(e) => return Err(e.into()),
    };

    config.ensure_complete();
    save(path, &config)?;
    Ok(config)
}

/// Persist the config atomically (temp file + rename)
pub fn save(path: &Path, config: &Config) -> Result<()> {
    let text = serde_json::to_string_pretty(config)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, text)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_creates_file_with_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let config = load_or_init(&path).unwrap();

        assert!(path.exists());
        assert!(!config.room_id.is_empty());
        assert!(clipferry_crypto::decode_key(&config.room_key).is_ok());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = load_or_init(&path).unwrap();
        config.auto_push_text = true;
        config.lan_timeout = 4;
        save(&path, &config).unwrap();

        let reloaded = load_or_init(&path).unwrap();
        assert!(reloaded.auto_push_text);
        assert_eq!(reloaded.lan_timeout, 4);
        assert_eq!(reloaded.room_id, config.room_id);
    }

    #[test]
    fn test_corrupt_file_replaced_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ this is not json").unwrap();

        let config = load_or_init(&path).unwrap();
        assert!(!config.room_id.is_empty());

        // The rewritten file parses cleanly
        let text = fs::read_to_string(&path).unwrap();
        assert!(serde_json::from_str::<Config>(&text).is_ok());
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        save(&path, &Config::default()).unwrap();
        assert!(!path.with_extension("json.tmp").exists());
    }
}
