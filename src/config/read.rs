use std::path::Path;
use figment::Figment;
use log::debug;
use crate::config::app_config::AppConfig;
use crate::config::figment::FigmentExt;

#[derive(Debug)]
pub struct ReadConfig {
    pub app_config: AppConfig,
    pub figment: Figment,
}

pub fn read_app_config(
    config_file: impl AsRef<Path>,
    figment: Figment,
) -> Result<ReadConfig, figment::Error> {
    let config_file = config_file.as_ref();
    debug!("reading configuration from \"{}\"", config_file.display());
    let figment = figment.setup_app_config(config_file);
    let app_config = figment.extract()?;
    debug!("configuration: {app_config:?}");
    Ok(
        ReadConfig {
            app_config,
            figment,
        }
    )
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use figment::Jail;
    use crate::config::app_config::StorageKind;
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        Jail::expect_with(|_jail| {
            let ReadConfig { app_config, .. } = read_app_config(
                "missing.toml",
                Figment::new(),
            )?;
            assert_eq!(app_config, AppConfig::default());
            Ok(())
        });
    }

    #[test]
    fn file_then_env_override() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "collabnote.toml",
                r#"
                    data_directory = "/var/notes"
                    storage = "remote"
                    save_debounce_ms = 250
                "#,
            )?;
            jail.set_env("COLLABNOTE_SAVE_DEBOUNCE_MS", "750");
            let ReadConfig { app_config, .. } = read_app_config(
                "collabnote.toml",
                Figment::new(),
            )?;
            assert_eq!(app_config.data_directory, PathBuf::from("/var/notes"));
            assert_eq!(app_config.storage, StorageKind::Remote);
            assert_eq!(app_config.save_debounce_ms, 750);
            assert!(!app_config.flush_on_navigation);
            Ok(())
        });
    }
}
