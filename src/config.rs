use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    alarm::DEFAULT_AUTO_STOP_SECS,
    error::{Error, Result},
};

const APP_NAME: &str = "class_chime";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Config {
    /// strftime format used when printing times.
    #[serde(default = "default_time_format")]
    pub time_format: String,
    /// Namespace the schedule and sound are stored under.
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default = "default_auto_stop_secs")]
    pub auto_stop_secs: u32,
    #[serde(default = "always_true")]
    pub notifications: bool,
    /// Command printing a motivational phrase, e.g. `["fortune", "-s"]`.
    #[serde(default)]
    pub advice_command: Option<Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            time_format: default_time_format(),
            user: default_user(),
            auto_stop_secs: DEFAULT_AUTO_STOP_SECS,
            notifications: true,
            advice_command: None,
        }
    }
}

impl Config {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let config = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&config)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let config = toml::to_string(self)?;
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, config)?;
        Ok(())
    }

    fn project_dirs() -> Result<directories::ProjectDirs> {
        directories::ProjectDirs::from("", "", APP_NAME).ok_or(Error::NoProjectDirs)
    }

    pub fn config_path() -> Result<PathBuf> {
        let mut path = Self::project_dirs()?.config_dir().to_path_buf();
        path.push("config.toml");
        Ok(path)
    }

    /// Directory holding every user's stored schedule.
    pub fn data_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.data_dir().to_path_buf())
    }

    #[must_use]
    pub fn is_config_present() -> bool {
        Self::config_path().is_ok_and(|path| path.exists())
    }
}

#[inline]
#[must_use]
pub const fn always_true() -> bool {
    true
}

fn default_time_format() -> String {
    "%H:%M".to_string()
}

fn default_user() -> String {
    "default".to_string()
}

const fn default_auto_stop_secs() -> u32 {
    DEFAULT_AUTO_STOP_SECS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config: Config = toml::from_str("user = \"sam\"").unwrap();
        assert_eq!(config.user, "sam");
        assert_eq!(config.auto_stop_secs, 20);
        assert!(config.notifications);
        assert_eq!(config.time_format, "%H:%M");
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config {
            advice_command: Some(vec!["fortune".into(), "-s".into()]),
            ..Config::default()
        };
        config.save(&path).unwrap();
        assert_eq!(Config::load(&path).unwrap(), config);
    }
}
