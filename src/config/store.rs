// src/config/store.rs

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::loader::{load_from_path, save_to_path};
use crate::config::model::Settings;
use crate::errors::Result;
use crate::fs::FileSystem;

/// No-payload signal: persisted settings were replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigChanged;

/// Shared, persisted settings.
///
/// Readers take whole-value snapshots; writers commit a complete new value,
/// which is written to disk and only then becomes visible in memory.
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    fs: Arc<dyn FileSystem>,
    current: Mutex<Settings>,
    changed: broadcast::Sender<ConfigChanged>,
}

impl SettingsStore {
    /// Load the store from `path` (missing file → defaults).
    pub fn load(path: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Result<Self> {
        let path = path.into();
        let settings = load_from_path(fs.as_ref(), &path)?;
        info!(path = ?path, entries = settings.watch_entries.len(), "settings loaded");
        Ok(Self::with_settings(path, fs, settings))
    }

    pub fn with_settings(
        path: impl Into<PathBuf>,
        fs: Arc<dyn FileSystem>,
        mut settings: Settings,
    ) -> Self {
        settings.ensure_default_group();
        let (changed, _) = broadcast::channel(16);
        Self {
            path: path.into(),
            fs,
            current: Mutex::new(settings),
            changed,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> Settings {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Persist `settings`, then make them current. On a write error the
    /// previous value stays in place.
    pub fn commit(&self, mut settings: Settings) -> Result<()> {
        settings.ensure_default_group();
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        save_to_path(self.fs.as_ref(), &self.path, &settings)?;
        *current = settings;
        debug!(path = ?self.path, "settings persisted");
        Ok(())
    }

    /// Re-read the file. Returns `true` and publishes [`ConfigChanged`] when
    /// its content differs from the current value. A missing file keeps the
    /// current settings.
    pub fn reload(&self) -> Result<bool> {
        if !self.fs.is_file(&self.path) {
            warn!(path = ?self.path, "settings file missing; keeping current settings");
            return Ok(false);
        }
        let loaded = load_from_path(self.fs.as_ref(), &self.path)?;
        {
            let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
            if *current == loaded {
                debug!(path = ?self.path, "settings file unchanged");
                return Ok(false);
            }
            *current = loaded;
        }
        info!(path = ?self.path, "settings reloaded from disk");
        self.publish_changed();
        Ok(true)
    }

    pub fn subscribe_changed(&self) -> broadcast::Receiver<ConfigChanged> {
        self.changed.subscribe()
    }

    /// Tell subscribers the settings were replaced.
    pub fn publish_changed(&self) {
        if self.changed.send(ConfigChanged).is_err() {
            debug!("no configuration-changed subscribers");
        }
    }

    /// Apply `f` to a snapshot and commit the result.
    pub fn update(&self, f: impl FnOnce(&mut Settings)) -> Result<()> {
        let mut settings = self.snapshot();
        f(&mut settings);
        self.commit(settings)
    }
}
