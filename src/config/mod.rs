// src/config/mod.rs

//! Persisted settings: model, TOML loading/saving and the shared store.

pub mod loader;
pub mod model;
pub mod store;

pub use loader::{load_from_path, parse_settings, save_to_path};
pub use model::{
    DEFAULT_GROUP_ID, DEFAULT_GROUP_NAME, Mapping, RuntimeSection, ScriptEntry, ScriptGroup,
    Settings, WatchEntrySetting, script_id,
};
pub use store::{ConfigChanged, SettingsStore};
