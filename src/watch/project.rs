// src/watch/project.rs

//! Watches the project's own files, next to the rule-driven [`WatchService`].
//!
//! - A change to the settings file re-reads it; the store publishes
//!   `ConfigChanged` when the content actually differs.
//! - A new `*.py` file below the script root is registered in the Default
//!   script group, and the script root is handed to the view refresher.
//!
//! [`WatchService`]: crate::watch::WatchService

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, info, warn};

use crate::config::SettingsStore;
use crate::exec::ViewRefresher;
use crate::fs::FileSystem;
use crate::types::{ProjectContext, slash_string};
use crate::watch::event::{EventKind, RawChange, normalize};
use crate::watch::path_utils::relative_str;
use crate::watch::source::{
    BatchHandler, EventSource, Subscription, WatchTarget, coalesce_targets,
};
use crate::workflow::discovery::is_python_file;
use crate::workflow::resolve::resolve_path;

pub const AUTO_ADDED_DESCRIPTION: &str = "Auto-added by watcher";

struct Running {
    subscription: Box<dyn Subscription>,
    active: Arc<AtomicBool>,
}

pub struct ProjectWatcher {
    settings: Arc<SettingsStore>,
    ctx: ProjectContext,
    fs: Arc<dyn FileSystem>,
    source: Arc<dyn EventSource>,
    refresher: Arc<dyn ViewRefresher>,
    running: Mutex<Option<Running>>,
}

impl std::fmt::Debug for ProjectWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectWatcher")
            .field("settings", &self.settings.path())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl ProjectWatcher {
    pub fn new(
        settings: Arc<SettingsStore>,
        ctx: ProjectContext,
        fs: Arc<dyn FileSystem>,
        source: Arc<dyn EventSource>,
        refresher: Arc<dyn ViewRefresher>,
    ) -> Self {
        Self {
            settings,
            ctx,
            fs,
            source,
            refresher,
            running: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock().is_some()
    }

    /// Resubscribe for the current settings file location and script root.
    /// Returns whether anything is watched.
    pub fn update_configuration(&self) -> bool {
        let mut running = self.lock();
        stop_locked(&mut running);

        let script_root = self.script_root();
        let mut targets = Vec::new();
        if let Some(dir) = self.settings.path().parent().filter(|d| self.fs.is_dir(d)) {
            targets.push(WatchTarget {
                path: dir.to_path_buf(),
                recursive: false,
            });
        }
        if let Some(root) = &script_root {
            targets.push(WatchTarget {
                path: root.clone(),
                recursive: true,
            });
        }
        let targets = coalesce_targets(targets);
        if targets.is_empty() {
            debug!("no project directory to watch");
            return false;
        }

        let active = Arc::new(AtomicBool::new(true));
        let batch = ProjectBatch {
            settings: Arc::clone(&self.settings),
            fs: Arc::clone(&self.fs),
            refresher: Arc::clone(&self.refresher),
            settings_file: slash_string(self.settings.path()),
            script_root,
        };
        let flag = Arc::clone(&active);
        let handler: BatchHandler = Arc::new(move |changes: Vec<RawChange>| {
            if flag.load(Ordering::SeqCst) {
                batch.handle(&changes);
            }
        });

        match self.source.subscribe(&targets, handler) {
            Ok(subscription) => {
                info!(targets = targets.len(), "project watcher started");
                *running = Some(Running {
                    subscription,
                    active,
                });
                true
            }
            Err(err) => {
                error!(error = %err, "failed to watch project files");
                false
            }
        }
    }

    pub fn stop(&self) {
        stop_locked(&mut self.lock());
    }

    fn script_root(&self) -> Option<PathBuf> {
        self.settings
            .snapshot()
            .script_root
            .as_deref()
            .map(|root| resolve_path(root, &self.ctx))
            .filter(|root| self.fs.is_dir(root))
    }

    fn lock(&self) -> MutexGuard<'_, Option<Running>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn stop_locked(running: &mut Option<Running>) {
    if let Some(Running {
        subscription,
        active,
    }) = running.take()
    {
        active.store(false, Ordering::SeqCst);
        drop(subscription);
        debug!("project watcher stopped");
    }
}

struct ProjectBatch {
    settings: Arc<SettingsStore>,
    fs: Arc<dyn FileSystem>,
    refresher: Arc<dyn ViewRefresher>,
    settings_file: String,
    script_root: Option<PathBuf>,
}

impl ProjectBatch {
    fn handle(&self, changes: &[RawChange]) {
        let mut settings_touched = false;
        let mut new_scripts = Vec::new();
        let mut scripts_changed = false;

        for event in changes.iter().filter_map(normalize) {
            if event.affected_path == self.settings_file {
                settings_touched = true;
                continue;
            }
            let Some(root) = &self.script_root else {
                continue;
            };
            let path = PathBuf::from(&event.affected_path);
            let Some(relative) = relative_str(root, &path).filter(|r| !r.is_empty()) else {
                continue;
            };
            match event.kind {
                EventKind::Create if is_python_file(&path) && self.fs.is_file(&path) => {
                    new_scripts.push(relative);
                    scripts_changed = true;
                }
                EventKind::Remove | EventKind::Move | EventKind::ModifyProperty
                    if self.is_script_or_dir(&path) =>
                {
                    scripts_changed = true;
                }
                _ => {}
            }
        }

        if settings_touched {
            match self.settings.reload() {
                Ok(changed) => debug!(changed, "settings file event handled"),
                Err(err) => warn!(error = %err, "settings file changed but could not be read"),
            }
        }
        if !new_scripts.is_empty() {
            self.register(&new_scripts);
        }
        if let Some(root) = self.script_root.as_ref().filter(|_| scripts_changed) {
            self.refresher.refresh(root);
        }
    }

    fn register(&self, relative_paths: &[String]) {
        let mut settings = self.settings.snapshot();
        let added = settings.register_scripts(
            relative_paths.iter().map(String::as_str),
            Some(AUTO_ADDED_DESCRIPTION),
        );
        if added == 0 {
            return;
        }
        match self.settings.commit(settings) {
            Ok(()) => info!(added, "new scripts registered"),
            Err(err) => warn!(error = %err, "could not persist new scripts"),
        }
    }

    /// A removed directory no longer reports as one, so extension-less
    /// paths count as directories too.
    fn is_script_or_dir(&self, path: &Path) -> bool {
        is_python_file(path) || path.extension().is_none() || self.fs.is_dir(path)
    }
}
