use crate::app_dirs::AppDirs;
use crate::passage::{Category, Difficulty};
use crate::score::TIME_LIMIT;
use crate::session::{SessionConfig, COUNTDOWN_FROM};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Persisted user preferences. Missing fields fall back to their defaults so
/// older files keep loading.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Pre-selected on the menu.
    pub difficulty: Option<Difficulty>,
    pub category: Option<Category>,
    pub time_limit_secs: u32,
    pub countdown_secs: u32,
    /// Rows shown on the history screen.
    pub history_limit: usize,
    pub save_results: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            difficulty: None,
            category: None,
            time_limit_secs: TIME_LIMIT,
            countdown_secs: COUNTDOWN_FROM,
            history_limit: 10,
            save_results: true,
        }
    }
}

impl Config {
    pub fn session(&self) -> SessionConfig {
        SessionConfig {
            // A zero limit would end every session before it begins.
            time_limit: self.time_limit_secs.max(1),
            countdown: self.countdown_secs,
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        let path = AppDirs::config_path().unwrap_or_else(|| PathBuf::from("typespeed_config.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        let Ok(bytes) = fs::read(&self.path) else {
            return Config::default();
        };
        serde_json::from_slice::<Config>(&bytes).unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "ignoring unreadable config");
            Config::default()
        })
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("config.json"));
        let cfg = Config::default();
        store.save(&cfg).unwrap();
        assert_eq!(cfg, store.load());
    }

    #[test]
    fn save_and_load_custom_config() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("nested").join("config.json"));
        let cfg = Config {
            difficulty: Some(Difficulty::Hard),
            category: Some(Category::Science),
            time_limit_secs: 30,
            countdown_secs: 0,
            history_limit: 25,
            save_results: false,
        };
        store.save(&cfg).unwrap();
        assert_eq!(cfg, store.load());
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("absent.json"));
        assert_eq!(store.load(), Config::default());
    }

    #[test]
    fn partial_and_corrupt_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = FileConfigStore::with_path(&path);

        fs::write(&path, r#"{"difficulty":"medium"}"#).unwrap();
        let cfg = store.load();
        assert_eq!(cfg.difficulty, Some(Difficulty::Medium));
        assert_eq!(cfg.time_limit_secs, 60);
        assert!(cfg.save_results);

        fs::write(&path, "not json").unwrap();
        assert_eq!(store.load(), Config::default());
    }

    #[test]
    fn session_config_from_config() {
        let cfg = Config {
            time_limit_secs: 0,
            countdown_secs: 5,
            ..Config::default()
        };
        let session = cfg.session();
        assert_eq!(session.time_limit, 1);
        assert_eq!(session.countdown, 5);
        assert_eq!(Config::default().session(), SessionConfig::default());
    }
}
