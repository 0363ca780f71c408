// src/workflow/descriptor.rs

//! Workflow descriptor document.
//!
//! ```toml
//! [platforms.linux]
//! sourceUrl = "file:///srv/shared/tools"
//! targetDir = "$PROJECT_DIR$/.tools"
//! pythonExecutablePath = "/usr/bin/python3"
//!
//! [platforms.linux.envVariables]
//! STAGE = "dev"
//!
//! [[platforms.linux.watchEntries]]
//! watchedPath = "$PROJECT_DIR$/assets"
//! onEventScript = "on_assets.py"
//! ```

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::errors::{Result, SyncwatchError};
use crate::types::PlatformKey;

#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowDescriptor {
    #[serde(default)]
    pub platforms: Option<BTreeMap<String, PlatformConfig>>,
}

/// Per-platform section. Every field is optional at parse time; required
/// ones are checked during resolution.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformConfig {
    pub source_url: Option<String>,
    pub target_dir: Option<String>,
    pub python_script_path: Option<String>,
    pub python_executable_path: Option<String>,
    #[serde(default)]
    pub env_variables: BTreeMap<String, String>,
    #[serde(default)]
    pub watch_entries: Vec<DescriptorWatchEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptorWatchEntry {
    #[serde(default)]
    pub watched_path: String,
    #[serde(default)]
    pub on_event_script: String,
}

impl WorkflowDescriptor {
    /// Parse descriptor text. Empty or malformed text and a missing
    /// `platforms` table are descriptor errors.
    pub fn parse(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Err(SyncwatchError::Descriptor("descriptor is empty".into()));
        }
        let descriptor: WorkflowDescriptor =
            toml::from_str(text).map_err(|e| SyncwatchError::Descriptor(e.to_string()))?;
        if descriptor.platforms.is_none() {
            return Err(SyncwatchError::Descriptor(
                "descriptor has no 'platforms' table".into(),
            ));
        }
        Ok(descriptor)
    }

    /// Sub-config for `platform`.
    pub fn for_platform(&self, platform: PlatformKey) -> Result<&PlatformConfig> {
        self.platforms
            .as_ref()
            .and_then(|p| p.get(platform.as_str()))
            .ok_or_else(|| SyncwatchError::PlatformMissing(platform.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [platforms.linux]
        sourceUrl = "file:///srv/tools"
        targetDir = "$PROJECT_DIR$/.tools"

        [platforms.linux.envVariables]
        STAGE = "dev"

        [[platforms.linux.watchEntries]]
        watchedPath = "$PROJECT_DIR$/assets"
        onEventScript = "on_assets.py"

        [platforms.windows]
        sourceUrl = "file:///C:/tools"
    "#;

    #[test]
    fn parses_camel_case_platform_sections() {
        let d = WorkflowDescriptor::parse(SAMPLE).unwrap();
        let linux = d.for_platform(PlatformKey::Linux).unwrap();
        assert_eq!(linux.source_url.as_deref(), Some("file:///srv/tools"));
        assert_eq!(linux.target_dir.as_deref(), Some("$PROJECT_DIR$/.tools"));
        assert_eq!(linux.env_variables["STAGE"], "dev");
        assert_eq!(linux.watch_entries[0].on_event_script, "on_assets.py");
        assert!(linux.python_executable_path.is_none());
    }

    #[test]
    fn missing_platform_is_reported() {
        let d = WorkflowDescriptor::parse(SAMPLE).unwrap();
        assert!(matches!(
            d.for_platform(PlatformKey::Macos),
            Err(SyncwatchError::PlatformMissing(p)) if p == "macos"
        ));
    }

    #[test]
    fn malformed_or_incomplete_documents_are_rejected() {
        assert!(matches!(
            WorkflowDescriptor::parse("platforms = ["),
            Err(SyncwatchError::Descriptor(_))
        ));
        assert!(matches!(
            WorkflowDescriptor::parse("title = \"x\""),
            Err(SyncwatchError::Descriptor(_))
        ));
        assert!(matches!(
            WorkflowDescriptor::parse("   "),
            Err(SyncwatchError::Descriptor(_))
        ));
    }
}
