// src/workflow/sync.rs

//! Content sync collaborator: fetch the tree named by a mapping into its
//! local target, then signal completion.

use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::config::Mapping;
use crate::engine::AppEvent;
use crate::errors::{Result, SyncwatchError};
use crate::fs::FileSystem;
use crate::watch::path_utils::normalize_lexically;

/// Starts a sync without waiting for it. Implementations send
/// [`AppEvent::SyncFinished`] once the content is in place.
pub trait ContentSync: Send + Sync + Debug {
    fn start(&self, mapping: &Mapping) -> Result<()>;
}

/// Copies from a local directory, file, or `file://` URL.
///
/// A failed copy is logged and no finish signal is sent.
#[derive(Debug, Clone)]
pub struct LocalTreeSync {
    handle: Handle,
    events: mpsc::Sender<AppEvent>,
    fs: Arc<dyn FileSystem>,
}

impl LocalTreeSync {
    pub fn new(handle: Handle, events: mpsc::Sender<AppEvent>, fs: Arc<dyn FileSystem>) -> Self {
        Self { handle, events, fs }
    }
}

/// Local path named by a source URL. Remote schemes are not supported.
pub fn local_source_path(source_url: &str) -> Result<PathBuf> {
    let trimmed = source_url.trim();
    if let Some(rest) = trimmed.strip_prefix("file://") {
        // file:///C:/x → C:/x on Windows-style URLs
        let rest = match rest.as_bytes() {
            [b'/', drive, b':', ..] if drive.is_ascii_alphabetic() => &rest[1..],
            _ => rest,
        };
        return Ok(PathBuf::from(rest));
    }
    if trimmed.contains("://") {
        return Err(SyncwatchError::ConfigError(format!(
            "unsupported sync source '{trimmed}': only local paths and file:// URLs"
        )));
    }
    Ok(PathBuf::from(trimmed))
}

impl ContentSync for LocalTreeSync {
    fn start(&self, mapping: &Mapping) -> Result<()> {
        let source = local_source_path(&mapping.source_url)?;
        if !self.fs.exists(&source) {
            return Err(SyncwatchError::ConfigError(format!(
                "sync source {:?} does not exist",
                source
            )));
        }
        let target = PathBuf::from(&mapping.target_path);
        let nested = normalize_lexically(&target).starts_with(normalize_lexically(&source));
        if nested && self.fs.is_dir(&source) {
            return Err(SyncwatchError::ConfigError(format!(
                "sync target {:?} lies inside source {:?}",
                target, source
            )));
        }
        let fs = Arc::clone(&self.fs);
        let events = self.events.clone();

        info!(source = %source.display(), target = %target.display(), "starting content sync");
        self.handle.spawn(async move {
            let copied = tokio::task::spawn_blocking(move || {
                copy_tree(fs.as_ref(), &source, &target)
                    .with_context(|| format!("syncing {:?} into {:?}", source, target))
            })
            .await;

            match copied {
                Ok(Ok(files)) => {
                    info!(files, "content sync finished");
                    if events.send(AppEvent::SyncFinished).await.is_err() {
                        debug!("runtime gone; sync finish not delivered");
                    }
                }
                Ok(Err(err)) => error!(error = %format!("{err:#}"), "content sync failed"),
                Err(err) => error!(error = %err, "content sync task panicked"),
            }
        });
        Ok(())
    }
}

/// Copy a directory tree (or a single file) into `target`. Returns the
/// number of files copied.
pub fn copy_tree(fs: &dyn FileSystem, source: &Path, target: &Path) -> anyhow::Result<usize> {
    if fs.is_file(source) {
        let Some(name) = source.file_name() else {
            bail!("source {:?} has no file name", source);
        };
        fs.create_dir_all(target)?;
        fs.copy_file(source, &target.join(name))?;
        return Ok(1);
    }
    if !fs.is_dir(source) {
        bail!("source {:?} is neither a file nor a directory", source);
    }

    fs.create_dir_all(target)?;
    let mut copied = 0;
    for entry in fs.read_dir(source)? {
        let Some(name) = entry.file_name() else {
            continue;
        };
        let dest = target.join(name);
        if fs.is_dir(&entry) {
            copied += copy_tree(fs, &entry, &dest)?;
        } else {
            fs.copy_file(&entry, &dest)?;
            copied += 1;
        }
    }
    Ok(copied)
}
