// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The dispatcher talks to an `ExecutorBackend` instead of spawning
//! processes itself, so tests can swap in a recording backend.
//!
//! - `ProcessExecutor` is the production implementation: every job runs in
//!   its own Tokio task, optionally bounded by a semaphore, and the view is
//!   refreshed afterwards.

use std::fmt::Debug;
use std::path::Path;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tracing::{debug, error};

use crate::exec::dispatcher::DispatchJob;
use crate::exec::refresh::{ViewRefresher, refresh_target};
use crate::exec::runner::run_and_report;
use crate::fs::FileSystem;

/// Accepts jobs without blocking the caller.
pub trait ExecutorBackend: Send + Sync + Debug {
    fn submit(&self, job: DispatchJob);
}

/// Runs jobs as subprocesses on the Tokio runtime. Fire-and-forget: no
/// queueing beyond the optional concurrency bound, no retries.
#[derive(Debug)]
pub struct ProcessExecutor {
    handle: Handle,
    limit: Option<Arc<Semaphore>>,
    refresher: Arc<dyn ViewRefresher>,
    fs: Arc<dyn FileSystem>,
}

impl ProcessExecutor {
    /// `max_concurrent = None` (or `Some(0)`) means unbounded.
    pub fn new(
        handle: Handle,
        max_concurrent: Option<usize>,
        refresher: Arc<dyn ViewRefresher>,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        let limit = max_concurrent
            .filter(|n| *n > 0)
            .map(|n| Arc::new(Semaphore::new(n)));
        Self {
            handle,
            limit,
            refresher,
            fs,
        }
    }
}

impl ExecutorBackend for ProcessExecutor {
    fn submit(&self, job: DispatchJob) {
        let limit = self.limit.clone();
        let refresher = Arc::clone(&self.refresher);
        let fs = Arc::clone(&self.fs);

        self.handle.spawn(async move {
            let _permit = match limit {
                Some(sem) => match sem.acquire_owned().await {
                    Ok(permit) => Some(permit),
                    Err(err) => {
                        error!(error = %err, "script pool closed; dropping job");
                        return;
                    }
                },
                None => None,
            };

            run_and_report(&job).await;

            if let Some(target) = refresh_target(fs.as_ref(), Path::new(&job.affected_path)) {
                refresher.refresh(&target);
            }
            debug!(script = %job.script_path.display(), "job finished");
        });
    }
}
