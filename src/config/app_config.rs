use std::path::PathBuf;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::bin_constants::DEFAULT_DATA_DIR;
use crate::lib_constants::{DEFAULT_FILE_WATCHER_DEBOUNCE_TIME, DEFAULT_SAVE_DEBOUNCE_TIME};

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// The whole collection in one file, shared by every local session.
    #[default]
    Local,

    /// One document per note in a per-account collection.
    Remote,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default = "app_config_default_data_directory")]
    pub data_directory: PathBuf,

    #[serde(default)]
    pub storage: StorageKind,

    #[serde(default = "app_config_default_save_debounce_ms")]
    pub save_debounce_ms: u64,

    #[serde(default = "app_config_default_file_watcher_debounce_ms")]
    pub file_watcher_debounce_ms: u64,

    /// Commit pending edits when leaving a note instead of dropping them.
    #[serde(default)]
    pub flush_on_navigation: bool,
}

impl AppConfig {
    pub fn save_debounce_time(&self) -> Duration {
        Duration::from_millis(self.save_debounce_ms)
    }

    pub fn file_watcher_debounce_time(&self) -> Duration {
        Duration::from_millis(self.file_watcher_debounce_ms)
    }
}

pub fn app_config_default_data_directory() -> PathBuf {
    DEFAULT_DATA_DIR.into()
}

pub fn app_config_default_save_debounce_ms() -> u64 {
    DEFAULT_SAVE_DEBOUNCE_TIME.as_millis() as u64
}

pub fn app_config_default_file_watcher_debounce_ms() -> u64 {
    DEFAULT_FILE_WATCHER_DEBOUNCE_TIME.as_millis() as u64
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            data_directory: app_config_default_data_directory(),
            storage: StorageKind::default(),
            save_debounce_ms: app_config_default_save_debounce_ms(),
            file_watcher_debounce_ms: app_config_default_file_watcher_debounce_ms(),
            flush_on_navigation: false,
        }
    }
}
