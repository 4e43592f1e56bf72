pub mod bin_constants;
pub mod config;
pub mod data;
pub mod editor;
pub mod file_watcher;
pub mod identity;
mod lib_constants;
pub mod logging;
pub mod notes_store;
pub mod rng;
pub mod scheduler;
pub mod storage;
pub mod timestamp;
pub mod util;
pub mod version_policy;

pub use lib_constants::{DEFAULT_NOTE_TITLE, MAX_VERSIONS};
