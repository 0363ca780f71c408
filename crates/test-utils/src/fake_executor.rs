use std::sync::{Arc, Mutex};

use syncwatch::exec::{DispatchJob, ExecutorBackend};

/// A fake executor that records every submitted job instead of spawning a
/// process.
#[derive(Debug, Clone, Default)]
pub struct RecordingExecutor {
    jobs: Arc<Mutex<Vec<DispatchJob>>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn jobs(&self) -> Vec<DispatchJob> {
        self.jobs.lock().unwrap().clone()
    }

    /// `(label, affected path, script)` of every job, in submission order.
    pub fn summary(&self) -> Vec<(String, String, String)> {
        self.jobs()
            .into_iter()
            .map(|j| {
                (
                    j.event_kind_label,
                    j.affected_path,
                    j.script_path.to_string_lossy().replace('\\', "/"),
                )
            })
            .collect()
    }
}

impl ExecutorBackend for RecordingExecutor {
    fn submit(&self, job: DispatchJob) {
        self.jobs.lock().unwrap().push(job);
    }
}
