// src/workflow/orchestrator.rs

//! Two-phase workflow: `prepare` records the descriptor's platform config
//! and starts a sync; `finalize` derives and commits the final settings once
//! that sync has finished.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::{ConfigChanged, Mapping, Settings, SettingsStore, WatchEntrySetting};
use crate::errors::{Result, SyncwatchError};
use crate::fs::FileSystem;
use crate::types::{ProjectContext, slash_string};
use crate::watch::path_utils::{absolutize, normalize_lexically, relative_str};
use crate::workflow::advisory::{Advisory, AdvisorySink};
use crate::workflow::descriptor::{DescriptorWatchEntry, WorkflowDescriptor};
use crate::workflow::discovery::{DiscoveryEnv, find_interpreter, find_script_root};
use crate::workflow::resolve::{expand_placeholders, resolve_path, resolve_required};
use crate::workflow::sync::ContentSync;

/// Platform config held between the two phases.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingPlatformConfig {
    pub source_url: String,
    pub target_dir: PathBuf,
    pub script_root: Option<String>,
    pub executable_path: Option<String>,
    pub env_variables: BTreeMap<String, String>,
    pub watch_entries: Vec<DescriptorWatchEntry>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum WorkflowState {
    #[default]
    Idle,
    AwaitingSync {
        pending: PendingPlatformConfig,
        sync_finished: bool,
    },
}

/// What the finalize phase ended up applying.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FinalizeReport {
    /// Interpreter chosen in this run; `None` keeps the persisted one.
    pub interpreter: Option<PathBuf>,
    /// Script root chosen in this run; `None` keeps the persisted one.
    pub script_root: Option<PathBuf>,
    pub env_variables: BTreeMap<String, String>,
    /// New persisted watch entries, if they were replaced.
    pub watch_entries: Option<Vec<WatchEntrySetting>>,
    pub scripts_added: usize,
    pub persisted: bool,
}

pub struct WorkflowOrchestrator {
    settings: Arc<SettingsStore>,
    ctx: ProjectContext,
    fs: Arc<dyn FileSystem>,
    sync: Arc<dyn ContentSync>,
    advisories: Arc<dyn AdvisorySink>,
    discovery: DiscoveryEnv,
    state: Mutex<WorkflowState>,
}

impl std::fmt::Debug for WorkflowOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowOrchestrator")
            .field("state", &*self.lock())
            .finish_non_exhaustive()
    }
}

impl WorkflowOrchestrator {
    pub fn new(
        settings: Arc<SettingsStore>,
        ctx: ProjectContext,
        fs: Arc<dyn FileSystem>,
        sync: Arc<dyn ContentSync>,
        advisories: Arc<dyn AdvisorySink>,
        discovery: DiscoveryEnv,
    ) -> Self {
        Self {
            settings,
            ctx,
            fs,
            sync,
            advisories,
            discovery,
            state: Mutex::new(WorkflowState::Idle),
        }
    }

    pub fn subscribe_config_changed(&self) -> broadcast::Receiver<ConfigChanged> {
        self.settings.subscribe_changed()
    }

    pub fn state(&self) -> WorkflowState {
        self.lock().clone()
    }

    pub fn pending(&self) -> Option<PendingPlatformConfig> {
        match &*self.lock() {
            WorkflowState::AwaitingSync { pending, .. } => Some(pending.clone()),
            WorkflowState::Idle => None,
        }
    }

    /// Phase 1. Any earlier pending config is discarded first.
    pub fn prepare(&self, descriptor_text: &str) -> Result<()> {
        if let WorkflowState::AwaitingSync { .. } = self.replace_state(WorkflowState::Idle) {
            info!("discarding pending workflow configuration");
        }

        let descriptor = WorkflowDescriptor::parse(descriptor_text)
            .map_err(|e| self.abort("Configuration Error", e))?;
        let platform = descriptor
            .for_platform(self.ctx.platform)
            .map_err(|e| self.abort("Configuration Error", e))?
            .clone();

        let source_url = resolve_required("sourceUrl", platform.source_url.as_deref(), &self.ctx)
            .map_err(|e| self.abort("Configuration Error", e))?;
        let target_raw = resolve_required("targetDir", platform.target_dir.as_deref(), &self.ctx)
            .map_err(|e| self.abort("Configuration Error", e))?;
        let target_dir = absolutize(&self.ctx.project_dir, Path::new(&target_raw));

        let mapping = Mapping {
            source_url: source_url.clone(),
            target_path: slash_string(&target_dir),
        };
        self.settings
            .update(|s| s.mappings = vec![mapping.clone()])
            .map_err(|e| self.abort("Configuration Error", e))?;

        let pending = PendingPlatformConfig {
            source_url,
            target_dir,
            script_root: platform.python_script_path,
            executable_path: platform.python_executable_path,
            env_variables: platform.env_variables,
            watch_entries: platform.watch_entries,
        };
        self.replace_state(WorkflowState::AwaitingSync {
            pending,
            sync_finished: false,
        });
        info!(source = %mapping.source_url, target = %mapping.target_path, "workflow prepared; starting sync");

        if let Err(err) = self.sync.start(&mapping) {
            self.replace_state(WorkflowState::Idle);
            return Err(self.abort(
                "Synchronization Error",
                SyncwatchError::ConfigError(format!("failed to start file synchronization: {err}")),
            ));
        }
        Ok(())
    }

    /// The sync started by `prepare` completed.
    pub fn on_sync_finished(&self) -> Option<FinalizeReport> {
        if let WorkflowState::AwaitingSync { sync_finished, .. } = &mut *self.lock() {
            *sync_finished = true;
        }
        self.finalize()
    }

    /// Phase 2. A no-op unless a pending config exists and its sync has been
    /// signalled.
    pub fn finalize(&self) -> Option<FinalizeReport> {
        let pending = {
            let mut state = self.lock();
            match &*state {
                WorkflowState::Idle => {
                    debug!("finalize: no workflow in progress");
                    return None;
                }
                WorkflowState::AwaitingSync {
                    sync_finished: false,
                    ..
                } => {
                    debug!("finalize: sync not finished yet");
                    return None;
                }
                WorkflowState::AwaitingSync { .. } => {}
            }
            match std::mem::take(&mut *state) {
                WorkflowState::AwaitingSync { pending, .. } => pending,
                WorkflowState::Idle => return None,
            }
        };

        info!("finalizing workflow configuration");
        let report = self.apply(pending);

        self.settings.publish_changed();
        self.advisories.report(Advisory::info(
            "Smart Workflow Completed",
            "Smart Workflow successfully applied all configurations.",
        ));
        Some(report)
    }

    fn apply(&self, pending: PendingPlatformConfig) -> FinalizeReport {
        let mut settings = self.settings.snapshot();
        let mut report = FinalizeReport::default();

        report.interpreter = self.choose_interpreter(&pending);
        if let Some(interpreter) = &report.interpreter {
            settings.interpreter_path = Some(slash_string(interpreter));
        }

        report.script_root = self.choose_script_root(&pending);
        if let Some(root) = &report.script_root {
            settings.script_root = Some(slash_string(root));
        }

        report.env_variables = self.environment(&pending);
        settings.env_variables = report.env_variables.clone();

        let root = settings
            .script_root
            .as_deref()
            .map(|r| resolve_path(r, &self.ctx))
            .filter(|r| self.fs.is_dir(r));
        match root {
            Some(root) => self.apply_watch_entries(&pending, &root, &mut settings, &mut report),
            None => self.advisories.report(Advisory::warning(
                "Watch Entries Skipped",
                "The script directory is not valid; watch entries were not updated.",
            )),
        }

        match self.settings.commit(settings) {
            Ok(()) => report.persisted = true,
            Err(err) => self.advisories.report(Advisory::error(
                "Configuration Error",
                format!("Failed to save settings: {err}"),
            )),
        }
        report
    }

    fn choose_interpreter(&self, pending: &PendingPlatformConfig) -> Option<PathBuf> {
        let declared = pending
            .executable_path
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .map(|p| resolve_path(p, &self.ctx));

        if let Some(path) = &declared {
            if self.fs.is_file(path) {
                info!(interpreter = %path.display(), "using declared interpreter");
                return declared;
            }
            warn!(interpreter = %path.display(), "declared interpreter not found; searching the system");
        }

        let found = find_interpreter(&self.discovery, self.fs.as_ref());
        if found.is_none() {
            let mut message = String::from(
                "Could not validate the declared interpreter and failed to find one on this system.",
            );
            if let Some(path) = &declared {
                message.push_str(&format!("\nDeclared path was: {}", path.display()));
            }
            message.push_str("\nConfigure it manually if script execution is needed.");
            self.advisories
                .report(Advisory::warning("Python Executable Not Found", message));
        }
        found
    }

    fn choose_script_root(&self, pending: &PendingPlatformConfig) -> Option<PathBuf> {
        let target = &pending.target_dir;
        let target_ok = self.fs.is_dir(target);
        if !target_ok {
            self.advisories.report(Advisory::error(
                "Configuration Error",
                format!(
                    "The target directory {} is invalid. Script path cannot be determined.",
                    target.display()
                ),
            ));
        }

        let declared = pending
            .script_root
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .map(|p| resolve_path(p, &self.ctx));
        if let Some(dir) = &declared {
            if self.fs.is_dir(dir) {
                return declared;
            }
            warn!(dir = %dir.display(), "declared script directory not found; searching target");
        }

        if !target_ok {
            return None;
        }
        let found = find_script_root(target, self.fs.as_ref());
        if found.is_none() {
            self.advisories.report(Advisory::warning(
                "Python Scripts Directory Not Found",
                format!(
                    "No scripts directory found within {}. Script-related features might not work correctly.",
                    target.display()
                ),
            ));
        }
        found
    }

    fn environment(&self, pending: &PendingPlatformConfig) -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();
        env.insert("PROJECT_DIR".to_string(), self.ctx.project_dir_str());
        if let Some(home) = self.ctx.user_home_str() {
            env.insert("USER_HOME".to_string(), home);
        }
        env.insert("SYSTEM_TYPE".to_string(), self.ctx.platform.to_string());
        for (key, value) in &pending.env_variables {
            env.insert(key.clone(), expand_placeholders(value, &self.ctx));
        }
        env
    }

    fn apply_watch_entries(
        &self,
        pending: &PendingPlatformConfig,
        root: &Path,
        settings: &mut Settings,
        report: &mut FinalizeReport,
    ) {
        if pending.watch_entries.is_empty() {
            info!("descriptor has no watch entries");
            return;
        }

        let mut entries = Vec::new();
        for entry in &pending.watch_entries {
            let Some(relative) = self.script_relative_to_root(&entry.on_event_script, root) else {
                continue;
            };
            report.scripts_added += settings.register_scripts([relative.as_str()], None);

            if entry.watched_path.trim().is_empty() {
                warn!(script = %relative, "watch entry without watched path; script registered only");
                continue;
            }
            entries.push(WatchEntrySetting {
                watched_path: slash_string(&resolve_path(&entry.watched_path, &self.ctx)),
                on_event_script: slash_string(&normalize_lexically(&root.join(&relative))),
            });
        }

        settings.watch_entries = entries.clone();
        report.watch_entries = Some(entries);
    }

    /// Path of an event script relative to `root`, if it names an existing
    /// file inside it.
    fn script_relative_to_root(&self, raw: &str, root: &Path) -> Option<String> {
        if raw.trim().is_empty() {
            return None;
        }
        let resolved = PathBuf::from(expand_placeholders(raw.trim(), &self.ctx));
        let full = if resolved.is_absolute() {
            normalize_lexically(&resolved)
        } else {
            normalize_lexically(&root.join(&resolved))
        };

        let Some(relative) = relative_str(root, &full) else {
            warn!(script = %resolved.display(), root = %root.display(), "event script is outside the script directory; skipped");
            return None;
        };
        if !self.fs.is_file(&full) {
            warn!(script = %full.display(), "event script not found; skipped");
            return None;
        }
        Some(relative)
    }

    fn abort(&self, title: &str, err: SyncwatchError) -> SyncwatchError {
        self.advisories.report(Advisory::error(title, err.to_string()));
        err
    }

    fn replace_state(&self, next: WorkflowState) -> WorkflowState {
        std::mem::replace(&mut *self.lock(), next)
    }

    fn lock(&self) -> MutexGuard<'_, WorkflowState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
