use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use syncwatch::config::Mapping;
use syncwatch::errors::{Result, SyncwatchError};
use syncwatch::exec::ViewRefresher;
use syncwatch::watch::{BatchHandler, EventSource, RawChange, Subscription, WatchTarget};
use syncwatch::workflow::{Advisory, AdvisorySink, ContentSync, Severity};

/// Collects advisories for assertions.
#[derive(Debug, Clone, Default)]
pub struct RecordingAdvisories {
    seen: Arc<Mutex<Vec<Advisory>>>,
}

impl RecordingAdvisories {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<Advisory> {
        self.seen.lock().unwrap().clone()
    }

    pub fn titles(&self, severity: Severity) -> Vec<String> {
        self.all()
            .into_iter()
            .filter(|a| a.severity == severity)
            .map(|a| a.title)
            .collect()
    }
}

impl AdvisorySink for RecordingAdvisories {
    fn report(&self, advisory: Advisory) {
        self.seen.lock().unwrap().push(advisory);
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordingRefresher {
    paths: Arc<Mutex<Vec<PathBuf>>>,
}

impl RecordingRefresher {
    pub fn paths(&self) -> Vec<PathBuf> {
        self.paths.lock().unwrap().clone()
    }
}

impl ViewRefresher for RecordingRefresher {
    fn refresh(&self, path: &Path) {
        self.paths.lock().unwrap().push(path.to_path_buf());
    }
}

/// Content sync that only records the mappings it was asked to start.
/// Completion is signalled by the test calling `on_sync_finished`.
#[derive(Debug, Clone, Default)]
pub struct FakeSync {
    started: Arc<Mutex<Vec<Mapping>>>,
    fail: Arc<AtomicBool>,
}

impl FakeSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let sync = Self::default();
        sync.fail.store(true, Ordering::SeqCst);
        sync
    }

    pub fn started(&self) -> Vec<Mapping> {
        self.started.lock().unwrap().clone()
    }
}

impl ContentSync for FakeSync {
    fn start(&self, mapping: &Mapping) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SyncwatchError::ConfigError("sync refused".into()));
        }
        self.started.lock().unwrap().push(mapping.clone());
        Ok(())
    }
}

#[derive(Default)]
struct SourceState {
    subscriptions: usize,
    active: Vec<(u64, BatchHandler)>,
    next_id: u64,
    last_targets: Vec<WatchTarget>,
}

/// In-memory event source. Tests push batches with [`FakeEventSource::emit`],
/// which delivers them synchronously to every live subscription.
#[derive(Clone, Default)]
pub struct FakeEventSource {
    state: Arc<Mutex<SourceState>>,
}

impl std::fmt::Debug for FakeEventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeEventSource")
            .field("active", &self.active_count())
            .finish()
    }
}

impl FakeEventSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of `subscribe` calls so far.
    pub fn subscribe_count(&self) -> usize {
        self.state.lock().unwrap().subscriptions
    }

    pub fn active_count(&self) -> usize {
        self.state.lock().unwrap().active.len()
    }

    pub fn last_targets(&self) -> Vec<WatchTarget> {
        self.state.lock().unwrap().last_targets.clone()
    }

    pub fn emit(&self, batch: Vec<RawChange>) {
        let handlers: Vec<BatchHandler> = self
            .state
            .lock()
            .unwrap()
            .active
            .iter()
            .map(|(_, h)| Arc::clone(h))
            .collect();
        for handler in handlers {
            handler(batch.clone());
        }
    }

    /// A handler as it was registered, even after unsubscribe, to model a
    /// batch already in flight.
    pub fn current_handler(&self) -> Option<BatchHandler> {
        self.state
            .lock()
            .unwrap()
            .active
            .last()
            .map(|(_, h)| Arc::clone(h))
    }
}

struct FakeSubscription {
    id: u64,
    targets: Vec<WatchTarget>,
    state: Arc<Mutex<SourceState>>,
}

impl Subscription for FakeSubscription {
    fn targets(&self) -> &[WatchTarget] {
        &self.targets
    }
}

impl Drop for FakeSubscription {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.active.retain(|(id, _)| *id != self.id);
    }
}

impl EventSource for FakeEventSource {
    fn subscribe(
        &self,
        targets: &[WatchTarget],
        handler: BatchHandler,
    ) -> Result<Box<dyn Subscription>> {
        let mut state = self.state.lock().unwrap();
        state.subscriptions += 1;
        let id = state.next_id;
        state.next_id += 1;
        state.active.push((id, handler));
        state.last_targets = targets.to_vec();
        Ok(Box::new(FakeSubscription {
            id,
            targets: targets.to_vec(),
            state: Arc::clone(&self.state),
        }))
    }
}
