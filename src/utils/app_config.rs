/// Application configuration management
/// Stores user preferences in <config dir>/sysdash/config.toml

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_REFRESH_MS: u64 = 1000;
pub const MIN_REFRESH_MS: u64 = 1000;
pub const DEFAULT_ACTION_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub refresh_ms: Option<u64>,
    pub action_timeout_ms: Option<u64>,
    pub log_file: Option<String>,
    pub log_level: Option<String>,
}

impl AppConfig {
    /// Get config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine the user config directory")?
            .join("sysdash");
        Ok(config_dir.join("config.toml"))
    }

    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).context("Failed to create config directory")?;
        }
        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        fs::write(path, contents)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Effective refresh interval: command line, then config file, then the default.
    pub fn refresh_interval(&self, cli: Option<u64>) -> Result<Duration> {
        let ms = cli.or(self.refresh_ms).unwrap_or(DEFAULT_REFRESH_MS);
        if ms < MIN_REFRESH_MS {
            bail!(
                "refresh interval must be at least {}ms, got {}ms",
                MIN_REFRESH_MS,
                ms
            );
        }
        Ok(Duration::from_millis(ms))
    }

    pub fn action_timeout(&self) -> Duration {
        Duration::from_millis(self.action_timeout_ms.unwrap_or(DEFAULT_ACTION_TIMEOUT_MS))
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    /// The command line wins over the config file.
    pub fn log_file(&self, cli: Option<&Path>) -> Option<PathBuf> {
        cli.map(Path::to_path_buf)
            .or_else(|| self.log_file.as_ref().map(PathBuf::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.refresh_interval(None).unwrap(), Duration::from_millis(1000));
        assert_eq!(config.action_timeout(), Duration::from_millis(5000));
        assert_eq!(config.log_level(), "info");
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = AppConfig {
            refresh_ms: Some(2000),
            log_level: Some("debug".into()),
            ..Default::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(AppConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_refresh_precedence_and_floor() {
        let config = AppConfig { refresh_ms: Some(3000), ..Default::default() };
        assert_eq!(config.refresh_interval(None).unwrap(), Duration::from_secs(3));
        assert_eq!(config.refresh_interval(Some(1500)).unwrap(), Duration::from_millis(1500));

        let err = config.refresh_interval(Some(200)).unwrap_err();
        assert!(err.to_string().contains("at least 1000ms"));

        let too_fast = AppConfig { refresh_ms: Some(999), ..Default::default() };
        assert!(too_fast.refresh_interval(None).is_err());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "refresh_ms = \"fast\"").unwrap();
        assert!(AppConfig::load_from(&path).is_err());
    }

    #[test]
    fn test_log_file_precedence() {
        let config = AppConfig { log_file: Some("/tmp/a.log".into()), ..Default::default() };
        assert_eq!(config.log_file(None), Some(PathBuf::from("/tmp/a.log")));
        assert_eq!(
            config.log_file(Some(Path::new("/tmp/b.log"))),
            Some(PathBuf::from("/tmp/b.log"))
        );
    }
}
