use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tally_types::LiveParserConfig;

use crate::error::LiveParserError;

/// Name under which the configuration file is stored.
pub const APP_NAME: &str = "tally";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Log to open when none is given on the command line.
    pub log_path: Option<PathBuf>,
    /// Where the game writes its combat logs.
    pub log_directory: PathBuf,
    pub live: LiveParserConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_path: None,
            log_directory: default_log_directory(),
            live: LiveParserConfig::default(),
        }
    }
}

fn default_log_directory() -> PathBuf {
    dirs::document_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_default()
        .join("Tally")
        .join("CombatLogs")
}

/// Persistence of [`AppConfig`] through confy.
pub trait AppConfigExt: Sized {
    fn load() -> Result<Self, LiveParserError>;
    fn save(&self) -> Result<(), LiveParserError>;
    fn config_path() -> Result<PathBuf, LiveParserError>;
}

impl AppConfigExt for AppConfig {
    fn load() -> Result<Self, LiveParserError> {
        Ok(confy::load(APP_NAME, None)?)
    }

    fn save(&self) -> Result<(), LiveParserError> {
        confy::store(APP_NAME, None, self)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf, LiveParserError> {
        Ok(confy::get_configuration_file_path(APP_NAME, None)?)
    }
}

/// Resolve a log file path, joining with log_directory if relative.
pub fn resolve_log_path(config: &AppConfig, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        config.log_directory.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_join_log_directory() {
        let config = AppConfig {
            log_directory: PathBuf::from("/games/logs"),
            ..AppConfig::default()
        };
        assert_eq!(
            resolve_log_path(&config, Path::new("Combatlog.log")),
            PathBuf::from("/games/logs/Combatlog.log")
        );
        assert_eq!(
            resolve_log_path(&config, Path::new("/tmp/other.log")),
            PathBuf::from("/tmp/other.log")
        );
    }

    #[test]
    fn config_roundtrips_through_confy_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tally.toml");

        let mut config = AppConfig::default();
        config.log_path = Some(PathBuf::from("/games/logs/Combatlog.log"));
        config.live.seconds_between_combats = 20;

        confy::store_path(&path, &config).unwrap();
        let loaded: AppConfig = confy::load_path(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn missing_file_yields_default() {
        let dir = tempfile::tempdir().unwrap();
        let loaded: AppConfig = confy::load_path(dir.path().join("absent.toml")).unwrap();
        assert_eq!(loaded, AppConfig::default());
    }
}
