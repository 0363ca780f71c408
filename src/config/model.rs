// src/config/model.rs

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub const DEFAULT_GROUP_ID: &str = "syncfiles-default-group-id";
pub const DEFAULT_GROUP_NAME: &str = "Default";

/// Persisted settings, read from and written to a TOML file.
///
/// ```toml
/// interpreter_path = "/usr/bin/python3"
/// script_root = "$PROJECT_DIR$/tools"
///
/// [env_variables]
/// STAGE = "dev"
///
/// [[watch_entries]]
/// watched_path = "$PROJECT_DIR$/assets"
/// on_event_script = "$PROJECT_DIR$/tools/on_assets.py"
///
/// [[mappings]]
/// source_url = "file:///srv/shared/tools"
/// target_path = "tools"
///
/// [runtime]
/// max_concurrent_scripts = 4
/// ```
///
/// All sections are optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Interpreter used to run every script. Placeholders are allowed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpreter_path: Option<String>,

    /// Directory that script group entries are relative to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_root: Option<String>,

    /// Extra variables exported to every script run.
    #[serde(default)]
    pub env_variables: BTreeMap<String, String>,

    #[serde(default)]
    pub watch_entries: Vec<WatchEntrySetting>,

    #[serde(default)]
    pub mappings: Vec<Mapping>,

    #[serde(default)]
    pub script_groups: Vec<ScriptGroup>,

    #[serde(default)]
    pub runtime: RuntimeSection,
}

impl Settings {
    /// Make sure the "Default" script group exists, as the first group.
    pub fn ensure_default_group(&mut self) {
        if !self.script_groups.iter().any(|g| g.id == DEFAULT_GROUP_ID) {
            self.script_groups.insert(
                0,
                ScriptGroup {
                    id: DEFAULT_GROUP_ID.to_string(),
                    name: DEFAULT_GROUP_NAME.to_string(),
                    scripts: Vec::new(),
                },
            );
        }
    }

    pub fn default_group_mut(&mut self) -> &mut ScriptGroup {
        self.ensure_default_group();
        let idx = self
            .script_groups
            .iter()
            .position(|g| g.id == DEFAULT_GROUP_ID)
            .unwrap_or(0);
        &mut self.script_groups[idx]
    }

    /// Add scripts (paths relative to the script root) to the Default group.
    ///
    /// A path already present in any group, compared case-insensitively, is
    /// skipped. The Default group is re-sorted by lowercase display name when
    /// anything was added. Returns the number of scripts added.
    pub fn register_scripts<'a>(
        &mut self,
        relative_paths: impl IntoIterator<Item = &'a str>,
        description: Option<&str>,
    ) -> usize {
        let mut added = 0;
        for relative in relative_paths {
            let known = self
                .script_groups
                .iter()
                .flat_map(|g| g.scripts.iter())
                .any(|s| s.path.eq_ignore_ascii_case(relative));
            if known {
                continue;
            }
            self.default_group_mut().scripts.push(ScriptEntry {
                id: script_id(relative),
                path: relative.to_string(),
                alias: None,
                description: description.map(str::to_string),
            });
            added += 1;
        }
        if added > 0 {
            self.default_group_mut()
                .scripts
                .sort_by_key(|s| s.display_name().to_lowercase());
        }
        added
    }
}

/// Stable id for an automatically registered script.
pub fn script_id(relative: &str) -> String {
    let hash = blake3::hash(relative.to_lowercase().as_bytes());
    format!("script-{}", &hash.to_hex()[..16])
}

/// One `(watched path, script)` pair as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchEntrySetting {
    pub watched_path: String,
    pub on_event_script: String,
}

/// Source-to-local sync mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
    pub source_url: String,
    pub target_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptGroup {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub scripts: Vec<ScriptEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptEntry {
    pub id: String,

    /// Path relative to the script root, `/` separated.
    pub path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

}

impl ScriptEntry {
    /// Alias if set, else the file stem of `path`.
    pub fn display_name(&self) -> String {
        if let Some(alias) = self.alias.as_deref().map(str::trim) {
            if !alias.is_empty() {
                return alias.to_string();
            }
        }
        Path::new(&self.path)
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| "Unnamed Script".to_string())
    }
}

/// `[runtime]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeSection {
    /// Upper bound on concurrently running scripts. Unbounded when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrent_scripts: Option<usize>,
}
