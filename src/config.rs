use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Env var naming an alternate state directory (default `~/.guidebot`)
pub const HOME_ENV: &str = "GUIDEBOT_HOME";

/// Env var supplying a declared default API base
pub const API_BASE_ENV: &str = "GUIDEBOT_API_BASE";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Declared default API base, tried after the saved override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_api_base: Option<String>,

    /// Origin of a self-hosted full-stack deployment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,

    /// Last-resort API base (default: https://crc-guidelines-bot-server.onrender.com)
    #[serde(default = "default_fallback_api_base")]
    pub fallback_api_base: String,

    /// Health probe timeout in milliseconds
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// Timeout for ask/upload/list/delete requests in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Language tags sent with an upload when none are given
    #[serde(default = "default_langs")]
    pub default_langs: String,
}

fn default_fallback_api_base() -> String {
    "https://crc-guidelines-bot-server.onrender.com".to_string()
}

fn default_probe_timeout_ms() -> u64 {
    3500
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_langs() -> String {
    "eng".to_string()
}

/// Directory holding config.toml and storage.json
pub fn home_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(HOME_ENV) {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let home = std::env::var("HOME").context("HOME not set")?;
    Ok(PathBuf::from(home).join(".guidebot"))
}

fn config_path() -> Result<PathBuf> {
    Ok(home_dir()?.join("config.toml"))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Load config from $GUIDEBOT_HOME/config.toml, returning defaults if the file doesn't exist
    pub fn load() -> Result<Self> {
        let path = config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Save config to $GUIDEBOT_HOME/config.toml
    pub fn save(&self) -> Result<PathBuf> {
        let path = config_path()?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        let content = toml::to_string_pretty(self).context("failed to serialize config")?;
        fs::write(&path, content).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }

    /// Declared default base: explicit flag, then env, then config file
    pub fn declared_api_base(&self, flag: Option<String>) -> Option<String> {
        non_blank(flag)
            .or_else(|| non_blank(std::env::var(API_BASE_ENV).ok()))
            .or_else(|| non_blank(self.default_api_base.clone()))
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Apply a `config set` key/value pair
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "default_api_base" | "api_base" => {
                self.default_api_base = non_blank(Some(value.trim().to_string()));
            }
            "origin" => {
                self.origin = non_blank(Some(value.trim().to_string()));
            }
            "fallback_api_base" | "fallback" => {
                if value.trim().is_empty() {
                    bail!("fallback_api_base cannot be empty");
                }
                self.fallback_api_base = value.trim().to_string();
            }
            "probe_timeout_ms" => {
                self.probe_timeout_ms = parse_positive(key, value)?;
            }
            "request_timeout_secs" => {
                self.request_timeout_secs = parse_positive(key, value)?;
            }
            "default_langs" | "langs" => {
                if value.trim().is_empty() {
                    bail!("default_langs cannot be empty");
                }
                self.default_langs = value.trim().to_string();
            }
            _ => bail!("unknown config key: {key}"),
        }
        Ok(())
    }
}

fn parse_positive(key: &str, value: &str) -> Result<u64> {
    match value.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => bail!("invalid {key}: must be a positive integer"),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_api_base: None,
            origin: None,
            fallback_api_base: default_fallback_api_base(),
            probe_timeout_ms: default_probe_timeout_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            default_langs: default_langs(),
        }
    }
}
