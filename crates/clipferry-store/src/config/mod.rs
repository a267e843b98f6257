//! Configuration management
//!
//! A single JSON object persisted next to the executable. Loading is
//! lenient (missing fields take defaults, unknown fields are ignored)
//! because older and newer agents share rooms. Saving goes through a
//! temp file + rename so a crash can never leave half a config; room
//! credential changes in particular must be all-or-nothing.

pub mod defaults;
pub mod loader;
pub mod schema;

pub use loader::{config_path, load_or_init, save};
pub use schema::Config;

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

/// Shared, reloadable configuration
///
/// Readers take a cheap snapshot; writers (credential regeneration, CLI
/// edits) replace the whole value and persist it in one step.
#[derive(Clone)]
pub struct ConfigHandle {
    inner: Arc<RwLock<Config>>,
    path: PathBuf,
}

impl ConfigHandle {
    /// Wrap a loaded config together with its file path
    pub fn new(config: Config, path: PathBuf) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
            path,
        }
    }

    /// Load the config from `path` (or create it) and wrap it
    pub fn open(path: PathBuf) -> crate::Result<Self> {
        let config = loader::load_or_init(&path)?;
        Ok(Self::new(config, path))
    }

    /// Snapshot of the current configuration
    pub fn snapshot(&self) -> Config {
        self.inner.read().expect("config lock poisoned").clone()
    }

    /// Path of the backing file
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Apply a mutation and persist atomically
    pub fn update<F>(&self, mutate: F) -> crate::Result<Config>
    where
        F: FnOnce(&mut Config),
    {
        let mut guard = self.inner.write().expect("config lock poisoned");
        mutate(&mut guard);
        loader::save(&self.path, &guard)?;
        Ok(guard.clone())
    }

    /// Re-read the backing file, replacing the in-memory value
    ///
    /// Used when another process (the `regen` command) rewrote the file.
    pub fn reload(&self) -> crate::Result<Config> {
        let fresh = loader::load_or_init(&self.path)?;
        let mut guard = self.inner.write().expect("config lock poisoned");
        *guard = fresh.clone();
        Ok(fresh)
    }

    /// Regenerate room credentials and persist them in one atomic step
    ///
    /// Returns the new config; peers holding the old key are cut off the
    /// moment the new join goes out.
    pub fn regenerate_credentials(&self) -> crate::Result<Config> {
        self.update(Config::regenerate_credentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_update_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let handle = ConfigHandle::open(path.clone()).unwrap();

        handle.update(|c| c.lan_timeout = 25).unwrap();

        let reloaded = loader::load_or_init(&path).unwrap();
        assert_eq!(reloaded.lan_timeout, 25);
    }

    #[test]
    fn test_regenerate_changes_room_and_key() {
        let dir = tempfile::tempdir().unwrap();
        let handle = ConfigHandle::open(dir.path().join("config.json")).unwrap();
        let before = handle.snapshot();

        let after = handle.regenerate_credentials().unwrap();

        assert_ne!(before.room_id, after.room_id);
        assert_ne!(before.room_key, after.room_key);
        assert!(!after.room_key.is_empty());
    }
}
