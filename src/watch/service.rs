// src/watch/service.rs

//! Owns the subscription lifecycle and routes batches through
//! normalize → match → dispatch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, info, warn};

use crate::config::SettingsStore;
use crate::exec::{Dispatcher, valid_interpreter};
use crate::fs::FileSystem;
use crate::types::ProjectContext;
use crate::watch::event::{RawChange, normalize};
use crate::watch::matcher::matching_rules;
use crate::watch::rules::{WatchRuleStore, build_rules};
use crate::watch::source::{BatchHandler, EventSource, Subscription, watch_targets};

enum Lifecycle {
    Stopped,
    Running {
        subscription: Box<dyn Subscription>,
        running: Arc<AtomicBool>,
    },
}

pub struct WatchService {
    settings: Arc<SettingsStore>,
    ctx: ProjectContext,
    fs: Arc<dyn FileSystem>,
    source: Arc<dyn EventSource>,
    dispatcher: Arc<Dispatcher>,
    rules: Arc<WatchRuleStore>,
    lifecycle: Mutex<Lifecycle>,
}

impl std::fmt::Debug for WatchService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchService")
            .field("project_dir", &self.ctx.project_dir)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl WatchService {
    pub fn new(
        settings: Arc<SettingsStore>,
        ctx: ProjectContext,
        fs: Arc<dyn FileSystem>,
        source: Arc<dyn EventSource>,
        dispatcher: Arc<Dispatcher>,
    ) -> Self {
        Self {
            settings,
            ctx,
            fs,
            source,
            dispatcher,
            rules: Arc::new(WatchRuleStore::new()),
            lifecycle: Mutex::new(Lifecycle::Stopped),
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(*self.lock(), Lifecycle::Running { .. })
    }

    pub fn rules(&self) -> Arc<WatchRuleStore> {
        Arc::clone(&self.rules)
    }

    /// Stop, rebuild the rule table from current settings, and start again
    /// if there is anything to watch. Returns whether the service runs.
    pub fn update_configuration(&self) -> bool {
        let mut lifecycle = self.lock();
        stop_locked(&mut lifecycle);

        let settings = self.settings.snapshot();
        let rules = build_rules(&settings, &self.ctx, self.fs.as_ref());
        info!(rules = rules.len(), "watch rules rebuilt");
        self.rules.replace(rules);

        self.start_locked(&mut lifecycle)
    }

    /// Start with the current rule table. No-op when already running.
    pub fn start(&self) -> bool {
        let mut lifecycle = self.lock();
        self.start_locked(&mut lifecycle)
    }

    pub fn stop(&self) {
        let mut lifecycle = self.lock();
        stop_locked(&mut lifecycle);
    }

    fn start_locked(&self, lifecycle: &mut Lifecycle) -> bool {
        if matches!(lifecycle, Lifecycle::Running { .. }) {
            return true;
        }

        let rules = self.rules.snapshot();
        if rules.is_empty() {
            info!("no watch rules configured; watcher stays stopped");
            return false;
        }

        let settings = self.settings.snapshot();
        if valid_interpreter(&settings, &self.ctx, self.fs.as_ref()).is_none() {
            warn!(
                interpreter = ?settings.interpreter_path,
                "interpreter is not configured or missing; watcher stays stopped"
            );
            return false;
        }

        let targets = watch_targets(&rules, self.fs.as_ref());
        if targets.is_empty() {
            warn!("no watch target could be registered; watcher stays stopped");
            return false;
        }

        let running = Arc::new(AtomicBool::new(true));
        let handler = batch_handler(
            Arc::clone(&running),
            Arc::clone(&self.rules),
            Arc::clone(&self.dispatcher),
        );

        match self.source.subscribe(&targets, handler) {
            Ok(subscription) => {
                info!(targets = targets.len(), rules = rules.len(), "watch service started");
                *lifecycle = Lifecycle::Running {
                    subscription,
                    running,
                };
                true
            }
            Err(err) => {
                error!(error = %err, "failed to subscribe to file events");
                false
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn stop_locked(lifecycle: &mut Lifecycle) {
    if let Lifecycle::Running {
        subscription,
        running,
    } = std::mem::replace(lifecycle, Lifecycle::Stopped)
    {
        running.store(false, Ordering::SeqCst);
        debug!(targets = subscription.targets().len(), "unsubscribing");
        drop(subscription);
        info!("watch service stopped");
    }
}

/// The running flag is checked once per batch; a batch already past the
/// check finishes even if the service stops meanwhile.
fn batch_handler(
    running: Arc<AtomicBool>,
    rules: Arc<WatchRuleStore>,
    dispatcher: Arc<Dispatcher>,
) -> BatchHandler {
    Arc::new(move |batch: Vec<RawChange>| {
        if !running.load(Ordering::SeqCst) {
            debug!(count = batch.len(), "batch ignored: subscription stopped");
            return;
        }
        let rules = rules.snapshot();
        for change in &batch {
            let Some(event) = normalize(change) else {
                continue;
            };
            for rule in matching_rules(&rules, &event) {
                debug!(?event, script = %rule.script_path, "rule matched");
                dispatcher.dispatch(&rule.script_path, event.kind.label(), &event.affected_path);
            }
        }
    })
}
