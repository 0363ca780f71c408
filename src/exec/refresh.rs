// src/exec/refresh.rs

use std::fmt::Debug;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::fs::FileSystem;

/// Asks a host view to re-read part of the filesystem. Fire-and-forget.
pub trait ViewRefresher: Send + Sync + Debug {
    fn refresh(&self, path: &Path);
}

/// Refresher for headless runs: records the request in the log only.
#[derive(Debug, Clone, Default)]
pub struct LogRefresher;

impl ViewRefresher for LogRefresher {
    fn refresh(&self, path: &Path) {
        debug!(path = %path.display(), "view refresh requested");
    }
}

/// What to refresh after a script touched `affected`: the path itself, or
/// its parent when it no longer exists.
pub fn refresh_target(fs: &dyn FileSystem, affected: &Path) -> Option<PathBuf> {
    if fs.exists(affected) {
        Some(affected.to_path_buf())
    } else {
        affected
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
    }
}
