use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "collabnote.toml";
pub const APP_CONFIG_ENV_PREFIX: &str = "COLLABNOTE_";
pub const DEFAULT_DATA_DIR: &str = "collabnote-data";
pub const LOAD_TIMEOUT: Duration = Duration::from_secs(10);
