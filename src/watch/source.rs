// src/watch/source.rs

//! Raw event sources. `NotifyEventSource` is the production one.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::fs::FileSystem;
use crate::watch::event::RawChange;
use crate::watch::rules::WatchEntry;

/// Receives every delivered batch of raw changes.
pub type BatchHandler = Arc<dyn Fn(Vec<RawChange>) + Send + Sync>;

/// A live subscription. Dropping it unsubscribes.
pub trait Subscription: Send {
    fn targets(&self) -> &[WatchTarget];
}

pub trait EventSource: Send + Sync {
    fn subscribe(
        &self,
        targets: &[WatchTarget],
        handler: BatchHandler,
    ) -> Result<Box<dyn Subscription>>;
}

/// A location registered with the event source.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct WatchTarget {
    pub path: PathBuf,
    pub recursive: bool,
}

/// Where to listen so that every rule can see its events.
///
/// An existing directory is watched recursively; for a file or a missing
/// path the parent is watched non-recursively when it exists. Duplicates are
/// registered once.
pub fn watch_targets(rules: &[WatchEntry], fs: &dyn FileSystem) -> Vec<WatchTarget> {
    let mut targets = BTreeSet::new();
    for rule in rules {
        let watched = rule.watched();
        if fs.is_dir(&watched) {
            targets.insert(WatchTarget {
                path: watched,
                recursive: true,
            });
            continue;
        }
        match watched.parent().filter(|p| fs.is_dir(p)) {
            Some(parent) => {
                targets.insert(WatchTarget {
                    path: parent.to_path_buf(),
                    recursive: false,
                });
            }
            None => warn!(path = %rule.watched_path, "no existing directory to watch for rule"),
        }
    }

    coalesce_targets(targets)
}

/// Drop every target that lies at or below a recursive target.
///
/// Registering such a target again would downgrade notify's watch on that
/// subtree, so directories created under it later would go unobserved.
pub fn coalesce_targets(targets: impl IntoIterator<Item = WatchTarget>) -> Vec<WatchTarget> {
    let targets: BTreeSet<WatchTarget> = targets.into_iter().collect();
    let recursive: Vec<PathBuf> = targets
        .iter()
        .filter(|t| t.recursive)
        .map(|t| t.path.clone())
        .collect();
    targets
        .into_iter()
        .filter(|t| {
            !recursive
                .iter()
                .any(|root| t.path.starts_with(root) && (*root != t.path || !t.recursive))
        })
        .collect()
}

/// `notify`-backed source. The notify callback only forwards events into an
/// unbounded channel; a Tokio task drains it in batches.
#[derive(Debug, Clone)]
pub struct NotifyEventSource {
    handle: Handle,
}

impl NotifyEventSource {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }
}

struct NotifySubscription {
    _watcher: RecommendedWatcher,
    targets: Vec<WatchTarget>,
}

impl Subscription for NotifySubscription {
    fn targets(&self) -> &[WatchTarget] {
        &self.targets
    }
}

impl EventSource for NotifyEventSource {
    fn subscribe(
        &self,
        targets: &[WatchTarget],
        handler: BatchHandler,
    ) -> Result<Box<dyn Subscription>> {
        let (event_tx, mut event_rx) = tokio::sync::mpsc::unbounded_channel::<Event>();

        // Called synchronously by notify on its own thread.
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event_tx.send(event).is_err() {
                        debug!("notify event dropped: subscription closed");
                    }
                }
                Err(err) => warn!(error = %err, "file watch error"),
            },
            Config::default(),
        )?;

        for target in targets {
            let mode = if target.recursive {
                RecursiveMode::Recursive
            } else {
                RecursiveMode::NonRecursive
            };
            watcher.watch(&target.path, mode)?;
            info!(path = %target.path.display(), recursive = target.recursive, "watching");
        }

        // Ends when the watcher (and with it the sender) is dropped.
        self.handle.spawn(async move {
            while let Some(first) = event_rx.recv().await {
                let mut changes = RawChange::from_notify(&first);
                while let Ok(event) = event_rx.try_recv() {
                    changes.extend(RawChange::from_notify(&event));
                }
                debug!(count = changes.len(), "delivering change batch");
                handler(changes);
            }
            debug!("notify batch loop finished");
        });

        Ok(Box::new(NotifySubscription {
            _watcher: watcher,
            targets: targets.to_vec(),
        }))
    }
}
