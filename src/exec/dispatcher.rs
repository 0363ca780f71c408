// src/exec/dispatcher.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::config::{Settings, SettingsStore};
use crate::exec::backend::ExecutorBackend;
use crate::fs::FileSystem;
use crate::types::ProjectContext;
use crate::workflow::resolve::resolve_path;

/// One script run for one matched `(event, rule)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchJob {
    pub interpreter: PathBuf,
    pub script_path: PathBuf,
    pub event_kind_label: String,
    pub affected_path: String,
    /// Variables layered over the inherited process environment.
    pub environment: BTreeMap<String, String>,
    pub working_dir: PathBuf,
}

/// The configured interpreter, placeholders expanded, if it is an existing
/// regular file.
pub fn valid_interpreter(
    settings: &Settings,
    ctx: &ProjectContext,
    fs: &dyn FileSystem,
) -> Option<PathBuf> {
    let raw = settings.interpreter_path.as_deref()?.trim();
    if raw.is_empty() {
        return None;
    }
    let path = resolve_path(raw, ctx);
    fs.is_file(&path).then_some(path)
}

/// Turns matches into [`DispatchJob`]s and hands them to an executor.
#[derive(Debug)]
pub struct Dispatcher {
    settings: Arc<SettingsStore>,
    ctx: ProjectContext,
    fs: Arc<dyn FileSystem>,
    backend: Arc<dyn ExecutorBackend>,
}

impl Dispatcher {
    pub fn new(
        settings: Arc<SettingsStore>,
        ctx: ProjectContext,
        fs: Arc<dyn FileSystem>,
        backend: Arc<dyn ExecutorBackend>,
    ) -> Self {
        Self {
            settings,
            ctx,
            fs,
            backend,
        }
    }

    /// Validate and submit a script run. Returns `false` when the run was
    /// rejected (invalid interpreter or script); nothing is spawned then.
    pub fn dispatch(&self, script_path: &str, event_kind_label: &str, affected_path: &str) -> bool {
        let settings = self.settings.snapshot();

        let Some(interpreter) = valid_interpreter(&settings, &self.ctx, self.fs.as_ref()) else {
            error!(
                interpreter = ?settings.interpreter_path,
                script = script_path,
                "interpreter is not configured or not an existing file; script not run"
            );
            return false;
        };

        let script = PathBuf::from(script_path);
        if !self.fs.is_file(&script) {
            warn!(script = script_path, "script is not an existing file; not run");
            return false;
        }

        let job = DispatchJob {
            interpreter,
            script_path: script,
            event_kind_label: event_kind_label.to_string(),
            affected_path: affected_path.to_string(),
            environment: build_environment(&settings, &self.ctx),
            working_dir: self.ctx.project_dir.clone(),
        };

        debug!(?job, "dispatching script");
        self.backend.submit(job);
        true
    }
}

/// Custom variables first, then the fixed ones, which always win.
pub fn build_environment(settings: &Settings, ctx: &ProjectContext) -> BTreeMap<String, String> {
    let mut env = settings.env_variables.clone();
    env.insert("PYTHONIOENCODING".to_string(), "UTF-8".to_string());
    env.insert("PROJECT_DIR".to_string(), ctx.project_dir_str());
    env
}
