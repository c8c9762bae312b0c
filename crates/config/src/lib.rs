//! modwatch configuration management.
//!
//! Configuration is stored as TOML:
//! - Linux: `~/.config/modwatch/config.toml`
//! - Windows: `%APPDATA%/modwatch/config.toml`
//! - macOS: `~/Library/Application Support/modwatch/config.toml`
//!
//! The file is normally written by the setup wizard. A fresh default carries
//! the [`UNCONFIGURED_PREFIX`] sentinel and is rejected by [`Config::validate`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Prefix value written by a fresh install; means setup has not run.
pub const UNCONFIGURED_PREFIX: &str = "YOUR_MOD";

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration not ready: {0}")]
    NotReady(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("no configuration directory available")]
    NoConfigDir,
}

/// Monitor configuration, immutable for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Identifiers the mod logs with, e.g. `LN` for `[LN] Spawned fleet`.
    #[serde(default = "default_prefixes")]
    pub mod_prefixes: Vec<String>,

    /// Folder-name substrings that attribute error-log paths to the mod.
    #[serde(default)]
    pub mod_folder_names: Vec<String>,

    /// Root containing `logs/game.log` and `logs/error.log`.
    #[serde(default = "default_docs_path")]
    pub stellaris_docs_path: PathBuf,

    /// Extra substrings or regex fragments highlighted by the `game` scan.
    #[serde(default)]
    pub extra_patterns: Vec<String>,

    /// Line count for the historical views.
    #[serde(default = "default_tail_lines")]
    pub tail_lines: usize,

    /// Delay between tail polls, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Mod source tree, used to judge whether the logs are fresh.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mod_source_path: Option<PathBuf>,

    /// How long the launch prompt waits before continuing without launching.
    #[serde(default = "default_launch_prompt_timeout")]
    pub launch_prompt_timeout_secs: u64,
}

fn default_prefixes() -> Vec<String> {
    vec![UNCONFIGURED_PREFIX.into()]
}

fn default_tail_lines() -> usize {
    50
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_launch_prompt_timeout() -> u64 {
    10
}

/// Platform location of the Stellaris user documents folder.
fn default_docs_path() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(home)
            .join(".local/share")
            .join("Paradox Interactive")
            .join("Stellaris")
    }

    #[cfg(target_os = "windows")]
    {
        let profile =
            std::env::var("USERPROFILE").unwrap_or_else(|_| "C:\\Users\\Default".into());
        PathBuf::from(profile)
            .join("Documents")
            .join("Paradox Interactive")
            .join("Stellaris")
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(home)
            .join("Documents")
            .join("Paradox Interactive")
            .join("Stellaris")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mod_prefixes: default_prefixes(),
            mod_folder_names: Vec::new(),
            stellaris_docs_path: default_docs_path(),
            extra_patterns: Vec::new(),
            tail_lines: default_tail_lines(),
            poll_interval_ms: default_poll_interval_ms(),
            mod_source_path: None,
            launch_prompt_timeout_secs: default_launch_prompt_timeout(),
        }
    }
}

impl Config {
    /// Loads configuration from the platform path, creating a default if absent.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_path()?)
    }

    /// Loads configuration from `path`, creating a default file if absent.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let mut config: Config = toml::from_str(&content)?;
            config.normalize();
            tracing::debug!(path = %path.display(), "configuration loaded");
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            tracing::info!(path = %path.display(), "default configuration written");
            Ok(config)
        }
    }

    /// Saves the configuration to the platform path.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_path()?)
    }

    /// Saves the configuration to `path`.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, self.to_toml()?)?;

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    /// Renders the configuration as it would be saved.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Checks that setup has run and the monitor may start.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let prefixes: Vec<&str> = self
            .mod_prefixes
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .collect();

        if prefixes.is_empty() {
            return Err(ConfigError::NotReady("no mod prefixes configured".into()));
        }
        if prefixes.iter().all(|p| *p == UNCONFIGURED_PREFIX) {
            return Err(ConfigError::NotReady(format!(
                "mod prefix is still the placeholder {UNCONFIGURED_PREFIX}"
            )));
        }
        Ok(())
    }

    /// Whether [`Config::validate`] passes.
    pub fn is_ready(&self) -> bool {
        self.validate().is_ok()
    }

    /// Trims entries, drops blanks, and dedups prefixes case-insensitively.
    pub fn normalize(&mut self) {
        let mut seen: Vec<String> = Vec::new();
        self.mod_prefixes.retain_mut(|p| {
            *p = p.trim().to_string();
            let key = p.to_ascii_uppercase();
            if p.is_empty() || seen.contains(&key) {
                return false;
            }
            seen.push(key);
            true
        });

        for list in [&mut self.mod_folder_names, &mut self.extra_patterns] {
            list.retain_mut(|s| {
                *s = s.trim().to_string();
                !s.is_empty()
            });
            list.dedup();
        }
    }

    /// `{docs}/logs`.
    pub fn logs_dir(&self) -> PathBuf {
        self.stellaris_docs_path.join("logs")
    }

    /// `{docs}/logs/game.log`.
    pub fn game_log_path(&self) -> PathBuf {
        self.logs_dir().join("game.log")
    }

    /// `{docs}/logs/error.log`.
    pub fn error_log_path(&self) -> PathBuf {
        self.logs_dir().join("error.log")
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(10))
    }

    pub fn launch_prompt_timeout(&self) -> Duration {
        Duration::from_secs(self.launch_prompt_timeout_secs)
    }
}

/// Returns the platform-specific configuration file path.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    #[cfg(target_os = "linux")]
    {
        let home = std::env::var("HOME").map_err(|_| ConfigError::NoConfigDir)?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("modwatch")
            .join("config.toml"))
    }

    #[cfg(target_os = "windows")]
    {
        let appdata = std::env::var("APPDATA").map_err(|_| ConfigError::NoConfigDir)?;
        Ok(PathBuf::from(appdata).join("modwatch").join("config.toml"))
    }

    #[cfg(target_os = "macos")]
    {
        let home = std::env::var("HOME").map_err(|_| ConfigError::NoConfigDir)?;
        Ok(PathBuf::from(home)
            .join("Library/Application Support")
            .join("modwatch")
            .join("config.toml"))
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
    {
        Err(ConfigError::NoConfigDir)
    }
}
