// src/watch/rules.rs

//! The reloadable table of watch rules.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, warn};

use crate::config::Settings;
use crate::fs::FileSystem;
use crate::types::{ProjectContext, slash_string};
use crate::workflow::resolve::resolve_path;

/// A resolved `(watched path, script)` pair. Both paths are absolute,
/// normalized and `/` separated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WatchEntry {
    pub watched_path: String,
    pub script_path: String,
}

impl WatchEntry {
    pub fn new(watched_path: impl Into<String>, script_path: impl Into<String>) -> Self {
        Self {
            watched_path: watched_path.into(),
            script_path: script_path.into(),
        }
    }

    pub fn watched(&self) -> PathBuf {
        PathBuf::from(&self.watched_path)
    }
}

/// Rule table swapped as a whole. Readers get a snapshot that never changes
/// underneath them.
#[derive(Debug, Default)]
pub struct WatchRuleStore {
    current: Mutex<Arc<Vec<WatchEntry>>>,
}

impl WatchRuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Arc<Vec<WatchEntry>> {
        Arc::clone(&self.current.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn replace(&self, rules: Vec<WatchEntry>) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        *current = Arc::new(rules);
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}

/// Build the rule table from persisted watch entries.
///
/// Entries with an empty path or whose script is not an existing file are
/// skipped.
pub fn build_rules(
    settings: &Settings,
    ctx: &ProjectContext,
    fs: &dyn FileSystem,
) -> Vec<WatchEntry> {
    let mut rules = Vec::with_capacity(settings.watch_entries.len());

    for entry in &settings.watch_entries {
        if entry.watched_path.trim().is_empty() || entry.on_event_script.trim().is_empty() {
            warn!(?entry, "skipping watch entry with empty path");
            continue;
        }

        let watched = resolve_path(&entry.watched_path, ctx);
        let script = resolve_path(&entry.on_event_script, ctx);

        if !fs.is_file(&script) {
            warn!(
                watched = %watched.display(),
                script = %script.display(),
                "skipping watch entry: script is not an existing file"
            );
            continue;
        }

        let rule = WatchEntry::new(slash_string(&watched), slash_string(&script));
        debug!(?rule, "watch rule");
        rules.push(rule);
    }

    rules
}
