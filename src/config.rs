// YAML configuration

use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;
use tracing::debug;

use crate::error::BoardError;
use crate::status::DEFAULT_MAX_STATUS_LEN;
use crate::store::DEFAULT_DUE_SOON_HOURS;

const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// Settings read from `config.yaml`. Every field is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the `.taskboard` data directory
    pub store_dir: Option<PathBuf>,
    /// Half-width of the due-soon / reminder window, in hours
    pub due_soon_hours: i64,
    pub search_debounce_ms: u64,
    pub max_status_len: usize,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_dir: None,
            due_soon_hours: DEFAULT_DUE_SOON_HOURS,
            search_debounce_ms: DEFAULT_DEBOUNCE_MS,
            max_status_len: DEFAULT_MAX_STATUS_LEN,
            log_level: "warn".to_string(),
        }
    }
}

impl Config {
    /// `<config dir>/taskboard/config.yaml`, if the platform has a config dir
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("taskboard").join("config.yaml"))
    }

    /// Load from `path`, or from the default location when `None`.
    /// A missing file gives the defaults; a malformed one is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            debug!(path = ?path, "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config =
            serde_yaml::from_str(&content).with_context(|| format!("Failed to parse config {}", path.display()))?;
        config.validate()?;
        debug!(path = ?path, "Loaded config");
        Ok(config)
    }

    /// Reject values that cannot be used as-is.
    pub fn validate(&self) -> Result<()> {
        if self.due_soon_hours < 0 || chrono::Duration::try_hours(self.due_soon_hours).is_none() {
            return Err(eyre!(BoardError::InvalidSettings(format!(
                "due_soon_hours out of range: {}",
                self.due_soon_hours
            ))));
        }
        Ok(())
    }

    /// Out-of-range values fall back to the default window.
    pub fn due_soon_window(&self) -> chrono::Duration {
        chrono::Duration::try_hours(self.due_soon_hours)
            .filter(|d| *d >= chrono::Duration::zero())
            .unwrap_or_else(|| chrono::Duration::hours(DEFAULT_DUE_SOON_HOURS))
    }

    pub fn debounce_delay(&self) -> StdDuration {
        StdDuration::from_millis(self.search_debounce_ms)
    }

    /// Store directory, falling back to the current directory
    pub fn resolve_store_dir(&self) -> PathBuf {
        self.store_dir
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let config = Config::load(Some(&temp.path().join("absent.yaml"))).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.due_soon_hours, 24);
        assert_eq!(config.search_debounce_ms, 300);
        assert_eq!(config.max_status_len, 20);
    }

    #[test]
    fn test_partial_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        fs::write(&path, "due_soon_hours: 48\nstore_dir: /tmp/board\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.due_soon_hours, 48);
        assert_eq!(config.store_dir, Some(PathBuf::from("/tmp/board")));
        assert_eq!(config.search_debounce_ms, 300);
        assert_eq!(config.due_soon_window(), chrono::Duration::hours(48));
    }

    #[test]
    fn test_malformed_file_errors() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        fs::write(&path, "due_soon_hours: [not, a, number]\n").unwrap();
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn test_out_of_range_window_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        fs::write(&path, format!("due_soon_hours: {}\n", i64::MAX)).unwrap();

        let err = Config::load(Some(&path)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BoardError>(),
            Some(BoardError::InvalidSettings(_))
        ));

        fs::write(&path, "due_soon_hours: -5\n").unwrap();
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn test_window_never_panics() {
        let config = Config {
            due_soon_hours: i64::MAX,
            ..Config::default()
        };
        assert_eq!(config.due_soon_window(), chrono::Duration::hours(24));
    }
}
