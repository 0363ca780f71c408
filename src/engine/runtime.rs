// src/engine/runtime.rs

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::watch::{ProjectWatcher, WatchService};
use crate::config::ConfigChanged;
use crate::workflow::WorkflowOrchestrator;

use super::core::{CoreCommand, step};
use super::AppEvent;

/// Async shell: reads events from the app channel and the
/// configuration-changed broadcast and drives the services.
pub struct Runtime {
    events: mpsc::Receiver<AppEvent>,
    config_changed: broadcast::Receiver<ConfigChanged>,
    orchestrator: Arc<WorkflowOrchestrator>,
    watch: Arc<WatchService>,
    project: Arc<ProjectWatcher>,
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("watch", &self.watch)
            .field("project", &self.project)
            .finish_non_exhaustive()
    }
}

impl Runtime {
    pub fn new(
        events: mpsc::Receiver<AppEvent>,
        config_changed: broadcast::Receiver<ConfigChanged>,
        orchestrator: Arc<WorkflowOrchestrator>,
        watch: Arc<WatchService>,
        project: Arc<ProjectWatcher>,
    ) -> Self {
        Self {
            events,
            config_changed,
            orchestrator,
            watch,
            project,
        }
    }

    /// Main event loop. Returns once shutdown is requested or every event
    /// producer is gone.
    pub async fn run(mut self) -> Result<()> {
        info!("syncwatch runtime started");
        let mut config_open = true;

        loop {
            let event = tokio::select! {
                ev = self.events.recv() => match ev {
                    Some(ev) => ev,
                    None => {
                        info!("runtime event channel closed; exiting");
                        break;
                    }
                },
                changed = self.config_changed.recv(), if config_open => match changed {
                    Ok(ConfigChanged) => AppEvent::ConfigChanged,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        debug!(missed = n, "configuration-changed lagged; reloading once");
                        AppEvent::ConfigChanged
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        config_open = false;
                        continue;
                    }
                },
            };

            debug!(?event, "runtime received event");
            let step = step(event);
            for command in step.commands {
                self.execute_command(command).await;
            }
            if !step.keep_running {
                break;
            }
        }

        self.watch.stop();
        self.project.stop();
        info!("runtime exiting");
        Ok(())
    }

    async fn execute_command(&self, command: CoreCommand) {
        match command {
            CoreCommand::FinalizeWorkflow => {
                let orchestrator = Arc::clone(&self.orchestrator);
                match tokio::task::spawn_blocking(move || orchestrator.on_sync_finished()).await {
                    Ok(Some(report)) => info!(
                        interpreter = ?report.interpreter,
                        script_root = ?report.script_root,
                        scripts_added = report.scripts_added,
                        persisted = report.persisted,
                        "workflow finalized"
                    ),
                    Ok(None) => debug!("sync finished with nothing to finalize"),
                    Err(err) => warn!(error = %err, "workflow finalize task failed"),
                }
            }
            CoreCommand::ReloadWatch => {
                let watch = Arc::clone(&self.watch);
                let project = Arc::clone(&self.project);
                let reload = move || (watch.update_configuration(), project.update_configuration());
                match tokio::task::spawn_blocking(reload).await {
                    Ok((running, project_watched)) => {
                        info!(running, project_watched, "watch configuration reloaded")
                    }
                    Err(err) => warn!(error = %err, "watch reload task failed"),
                }
            }
            CoreCommand::StopWatch => {
                self.watch.stop();
                self.project.stop();
            }
        }
    }
}
