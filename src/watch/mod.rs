// src/watch/mod.rs

//! File watching: from raw notifications to dispatched scripts.
//!
//! - [`event`] normalizes raw notifications into canonical kinds.
//! - [`matcher`] decides which rules an event satisfies.
//! - [`rules`] holds the reloadable rule table.
//! - [`source`] wraps `notify` behind the `EventSource` seam.
//! - [`service`] owns start/stop/reload.
//! - [`project`] follows the settings file and the script root.

pub mod event;
pub mod matcher;
pub mod path_utils;
pub mod project;
pub mod rules;
pub mod service;
pub mod source;

pub use event::{EventKind, NormalizedEvent, RawChange, RawKind, normalize};
pub use matcher::{matching_rules, rule_matches};
pub use rules::{WatchEntry, WatchRuleStore, build_rules};
pub use project::ProjectWatcher;
pub use service::WatchService;
pub use source::{
    BatchHandler, EventSource, NotifyEventSource, Subscription, WatchTarget, coalesce_targets,
    watch_targets,
};
