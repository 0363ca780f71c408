// src/types.rs

use std::fmt;
use std::path::{Path, PathBuf};

/// Host platform key, used to select a sub-config from a workflow descriptor
/// and exported to scripts as `SYSTEM_TYPE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformKey {
    Windows,
    Macos,
    Linux,
    Unknown,
}

impl PlatformKey {
    /// Platform key of the compile target.
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            PlatformKey::Windows
        } else if cfg!(target_os = "macos") {
            PlatformKey::Macos
        } else if cfg!(target_os = "linux") {
            PlatformKey::Linux
        } else {
            PlatformKey::Unknown
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PlatformKey::Windows => "windows",
            PlatformKey::Macos => "macos",
            PlatformKey::Linux => "linux",
            PlatformKey::Unknown => "unknown",
        }
    }
}

impl fmt::Display for PlatformKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything path resolution needs to know about the running project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectContext {
    pub project_dir: PathBuf,
    pub user_home: Option<PathBuf>,
    pub platform: PlatformKey,
}

impl ProjectContext {
    /// Context for `project_dir` on the current host.
    pub fn detect(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            user_home: dirs::home_dir(),
            platform: PlatformKey::current(),
        }
    }

    pub fn new(
        project_dir: impl Into<PathBuf>,
        user_home: Option<PathBuf>,
        platform: PlatformKey,
    ) -> Self {
        Self {
            project_dir: project_dir.into(),
            user_home,
            platform,
        }
    }

    /// Project directory with `/` separators.
    pub fn project_dir_str(&self) -> String {
        slash_string(&self.project_dir)
    }

    pub fn user_home_str(&self) -> Option<String> {
        self.user_home.as_deref().map(slash_string)
    }
}

/// Render a path as a string with `/` separators.
pub fn slash_string(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
