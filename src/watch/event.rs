// src/watch/event.rs

//! Raw change notifications and their canonical, normalized form.

use std::path::PathBuf;

use notify::EventKind as NotifyKind;
use notify::event::{ModifyKind, RenameMode};

/// Kind of a raw notification, before normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawKind {
    Created,
    Deleted,
    ContentChanged,
    PropertyChanged,
    Renamed,
    Moved,
    Copied,
    Other,
}

/// A single raw notification as delivered by an event source.
///
/// `path` is the post-change location (new name for renames, destination for
/// moves, the new file for copies). `None` means it could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChange {
    pub kind: RawKind,
    pub path: Option<PathBuf>,
}

impl RawChange {
    pub fn new(kind: RawKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: Some(path.into()),
        }
    }

    /// Split a `notify` event into raw changes, one per reported path.
    pub fn from_notify(event: &notify::Event) -> Vec<RawChange> {
        let kind = match event.kind {
            NotifyKind::Create(_) => RawKind::Created,
            NotifyKind::Remove(_) => RawKind::Deleted,
            NotifyKind::Modify(ModifyKind::Data(_)) | NotifyKind::Modify(ModifyKind::Any) => {
                RawKind::ContentChanged
            }
            NotifyKind::Modify(ModifyKind::Metadata(_)) => RawKind::PropertyChanged,
            NotifyKind::Modify(ModifyKind::Name(RenameMode::To))
            | NotifyKind::Modify(ModifyKind::Name(RenameMode::Any)) => RawKind::Renamed,
            NotifyKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
                // paths = [from, to]; only the destination is reported
                return vec![RawChange {
                    kind: RawKind::Moved,
                    path: event.paths.get(1).cloned(),
                }];
            }
            _ => RawKind::Other,
        };

        if event.paths.is_empty() {
            return vec![RawChange { kind, path: None }];
        }
        event
            .paths
            .iter()
            .map(|p| RawChange::new(kind, p.clone()))
            .collect()
    }
}

/// Canonical event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Create,
    Remove,
    ModifyContent,
    ModifyProperty,
    Move,
    Copy,
    Unknown,
}

impl EventKind {
    /// Label passed to scripts as their first argument.
    pub fn label(self) -> &'static str {
        match self {
            EventKind::Create => "Change New",
            EventKind::Remove | EventKind::Move => "Change Del",
            EventKind::ModifyContent => "Change Mod",
            _ => "UnKnow",
        }
    }
}

impl From<RawKind> for EventKind {
    fn from(kind: RawKind) -> Self {
        match kind {
            RawKind::Created => EventKind::Create,
            RawKind::Deleted => EventKind::Remove,
            RawKind::ContentChanged => EventKind::ModifyContent,
            RawKind::PropertyChanged | RawKind::Renamed => EventKind::ModifyProperty,
            RawKind::Moved => EventKind::Move,
            RawKind::Copied => EventKind::Copy,
            RawKind::Other => EventKind::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedEvent {
    pub kind: EventKind,
    /// Absolute path with `/` separators.
    pub affected_path: String,
}

/// Map a raw change to its canonical form.
///
/// Returns `None` for `Unknown` kinds and for paths that are missing, empty
/// or not valid UTF-8.
pub fn normalize(change: &RawChange) -> Option<NormalizedEvent> {
    let kind = EventKind::from(change.kind);
    if kind == EventKind::Unknown {
        return None;
    }
    let path = change.path.as_ref()?.to_str()?;
    if path.is_empty() {
        return None;
    }
    Some(NormalizedEvent {
        kind,
        affected_path: path.replace('\\', "/"),
    })
}
