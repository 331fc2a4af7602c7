//! User configuration and on-disk locations.
//!
//! Config lives at `$XDG_CONFIG_HOME/careease/config.toml`. Every key is
//! optional; a missing file or a parse error falls back to defaults and is
//! logged, never fatal.

use std::path::{Path, PathBuf};
use std::time::Duration;

use careease_core::api::{DEFAULT_API_URL, DEFAULT_TIMEOUT};
use careease_core::transcript::DEFAULT_REVEAL_INTERVAL;
use serde::Deserialize;
use tracing::warn;

/// Environment variable that overrides `api_url`.
pub const API_URL_ENV: &str = "CAREEASE_API_URL";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_url: String,
    /// `dark`, `light` or `catppuccin-mocha`. A theme saved with `t` wins.
    pub theme: String,
    pub reveal_interval_ms: u64,
    /// How often the open chat is refetched while a reply is awaited.
    pub poll_interval_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_owned(),
            theme: "dark".to_owned(),
            reveal_interval_ms: DEFAULT_REVEAL_INTERVAL.as_millis() as u64,
            poll_interval_secs: 3,
            request_timeout_secs: DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

impl Config {
    /// Loads the config file and applies the environment override.
    pub fn load() -> Self {
        Self::load_from(&config_path()).with_api_url_override(std::env::var(API_URL_ENV).ok())
    }

    /// Reads `path`, falling back to defaults on any error.
    pub fn load_from(path: &Path) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(_) => return Self::default(),
        };
        match toml::from_str(&raw) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "config parse error, using defaults");
                Self::default()
            }
        }
    }

    /// Replaces `api_url` with `value` when it is set and non-blank.
    pub fn with_api_url_override(mut self, value: Option<String>) -> Self {
        if let Some(url) = value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty()) {
            self.api_url = url;
        }
        self
    }

    /// Zero would spin the reveal timer, so it is clamped to 1 ms.
    pub fn reveal_interval(&self) -> Duration {
        Duration::from_millis(self.reveal_interval_ms.max(1))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

/// Resolves `$<var>` or `$HOME/<fallback>`, then `./<fallback>`.
fn xdg_base(var: &str, fallback: &str) -> PathBuf {
    std::env::var(var)
        .ok()
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join(fallback))
        })
        .unwrap_or_else(|| PathBuf::from(fallback))
}

/// Returns the path to the careease config file.
///
/// Prefers `$XDG_CONFIG_HOME/careease/config.toml`; falls back to
/// `~/.config/careease/config.toml` when the env var is absent.
pub fn config_path() -> PathBuf {
    xdg_base("XDG_CONFIG_HOME", ".config")
        .join("careease")
        .join("config.toml")
}

/// Directory holding the settings database and the log files.
pub fn data_dir() -> PathBuf {
    xdg_base("XDG_DATA_HOME", ".local/share").join("careease")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(body: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, body).unwrap();
        (dir, path)
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("nope.toml"));
        assert_eq!(config, Config::default());
        assert_eq!(config.reveal_interval(), Duration::from_millis(50));
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let (_dir, path) = write_config("theme = \"light\"\nreveal_interval_ms = 20\n");
        let config = Config::load_from(&path);
        assert_eq!(config.theme, "light");
        assert_eq!(config.reveal_interval_ms, 20);
        assert_eq!(config.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let (_dir, path) = write_config("theme = [unclosed");
        assert_eq!(Config::load_from(&path), Config::default());
    }

    #[test]
    fn env_override_ignores_blank_values() {
        let config = Config::default().with_api_url_override(Some("   ".to_owned()));
        assert_eq!(config.api_url, DEFAULT_API_URL);

        let config = Config::default().with_api_url_override(Some("http://care.test/api".to_owned()));
        assert_eq!(config.api_url, "http://care.test/api");
    }

    #[test]
    fn zero_intervals_are_clamped() {
        let config = Config {
            reveal_interval_ms: 0,
            poll_interval_secs: 0,
            ..Config::default()
        };
        assert_eq!(config.reveal_interval(), Duration::from_millis(1));
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
    }
}
