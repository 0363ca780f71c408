#![allow(dead_code)]

use std::collections::BTreeMap;

use syncwatch::config::{Settings, WatchEntrySetting};

/// Builder for `Settings` to simplify test setup.
#[derive(Debug, Default)]
pub struct SettingsBuilder {
    settings: Settings,
}

impl SettingsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interpreter(mut self, path: &str) -> Self {
        self.settings.interpreter_path = Some(path.to_string());
        self
    }

    pub fn script_root(mut self, path: &str) -> Self {
        self.settings.script_root = Some(path.to_string());
        self
    }

    pub fn watch(mut self, watched: &str, script: &str) -> Self {
        self.settings.watch_entries.push(WatchEntrySetting {
            watched_path: watched.to_string(),
            on_event_script: script.to_string(),
        });
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.settings
            .env_variables
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn max_concurrent_scripts(mut self, n: usize) -> Self {
        self.settings.runtime.max_concurrent_scripts = Some(n);
        self
    }

    pub fn build(mut self) -> Settings {
        self.settings.ensure_default_group();
        self.settings
    }
}

/// Builder for one `[platforms.<key>]` section of a workflow descriptor,
/// rendered as TOML text.
#[derive(Debug, Clone)]
pub struct DescriptorBuilder {
    platform: String,
    fields: BTreeMap<&'static str, String>,
    env: BTreeMap<String, String>,
    watch_entries: Vec<(String, String)>,
}

impl DescriptorBuilder {
    pub fn new(platform: &str) -> Self {
        Self {
            platform: platform.to_string(),
            fields: BTreeMap::new(),
            env: BTreeMap::new(),
            watch_entries: Vec::new(),
        }
    }

    pub fn source_url(mut self, v: &str) -> Self {
        self.fields.insert("sourceUrl", v.to_string());
        self
    }

    pub fn target_dir(mut self, v: &str) -> Self {
        self.fields.insert("targetDir", v.to_string());
        self
    }

    pub fn script_path(mut self, v: &str) -> Self {
        self.fields.insert("pythonScriptPath", v.to_string());
        self
    }

    pub fn executable_path(mut self, v: &str) -> Self {
        self.fields.insert("pythonExecutablePath", v.to_string());
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn watch(mut self, watched: &str, script: &str) -> Self {
        self.watch_entries
            .push((watched.to_string(), script.to_string()));
        self
    }

    pub fn build(self) -> String {
        let mut out = format!("[platforms.{}]\n", self.platform);
        for (key, value) in &self.fields {
            out.push_str(&format!("{key} = {}\n", quote(value)));
        }
        if !self.env.is_empty() {
            out.push_str(&format!("\n[platforms.{}.envVariables]\n", self.platform));
            for (key, value) in &self.env {
                out.push_str(&format!("{key} = {}\n", quote(value)));
            }
        }
        for (watched, script) in &self.watch_entries {
            out.push_str(&format!("\n[[platforms.{}.watchEntries]]\n", self.platform));
            out.push_str(&format!("watchedPath = {}\n", quote(watched)));
            out.push_str(&format!("onEventScript = {}\n", quote(script)));
        }
        out
    }
}

/// TOML literal string (no escapes needed for paths with backslashes).
fn quote(value: &str) -> String {
    format!("'{value}'")
}
