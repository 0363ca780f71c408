// src/config/loader.rs

use std::path::Path;

use crate::config::model::Settings;
use crate::errors::Result;
use crate::fs::FileSystem;

/// Parse settings from TOML text and apply the default-group invariant.
pub fn parse_settings(contents: &str) -> Result<Settings> {
    let mut settings: Settings = toml::from_str(contents)?;
    settings.ensure_default_group();
    Ok(settings)
}

/// Load settings from `path`.
///
/// A missing file yields default settings; an unreadable or malformed file
/// is an error.
pub fn load_from_path(fs: &dyn FileSystem, path: &Path) -> Result<Settings> {
    if !fs.exists(path) {
        let mut settings = Settings::default();
        settings.ensure_default_group();
        return Ok(settings);
    }
    let contents = fs.read_to_string(path)?;
    parse_settings(&contents)
}

/// Serialize settings and write them to `path`, replacing the file.
pub fn save_to_path(fs: &dyn FileSystem, path: &Path, settings: &Settings) -> Result<()> {
    let contents = toml::to_string_pretty(settings)?;
    fs.write(path, contents.as_bytes())?;
    Ok(())
}
