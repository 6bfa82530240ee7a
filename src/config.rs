//! Configuration loading
//!
//! Values are layered: built-in defaults, then the YAML config file, then
//! environment variables and command-line flags (both arrive through clap as
//! [`Overrides`]).

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::ValueEnum;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::ApiError;

pub const DEFAULT_API_URL: &str = "https://grokipedia.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Seven days
pub const DEFAULT_CACHE_TTL_SECS: i64 = 604_800;
pub const DEFAULT_CACHE_DIR: &str = "~/.grokipedia/cache";

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    /// The config file exists but could not be read
    #[error("failed to read config file {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    /// The config file is not valid YAML for this schema
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::InvalidArgs(err.to_string())
    }
}

/// When to color output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

/// Full configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiSettings,
    pub cache: CacheSettings,
    pub output: OutputSettings,
    pub commands: CommandSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub url: String,
    /// Seconds; zero falls back to the default
    pub timeout: u64,
    /// Upper bound for rate-limit waits, in milliseconds
    pub max_retry_delay_ms: Option<u64>,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_API_URL.to_string(),
            timeout: DEFAULT_TIMEOUT_SECS,
            max_retry_delay_ms: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub enabled: bool,
    /// Seconds; zero or negative disables caching
    pub ttl: i64,
    pub dir: String,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: DEFAULT_CACHE_TTL_SECS,
            dir: DEFAULT_CACHE_DIR.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub color: ColorMode,
}

/// Per-command defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandSettings {
    pub search: SearchDefaults,
    pub edits: EditsDefaults,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchDefaults {
    pub limit: u32,
    pub offset: u32,
}

impl Default for SearchDefaults {
    fn default() -> Self {
        Self {
            limit: 12,
            offset: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditsDefaults {
    pub limit: u32,
}

impl Default for EditsDefaults {
    fn default() -> Self {
        Self { limit: 20 }
    }
}

/// Values from flags or environment that take precedence over the file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub config_file: Option<PathBuf>,
    pub api_url: Option<String>,
    pub timeout: Option<u64>,
    pub no_cache: bool,
    pub cache_dir: Option<String>,
    pub cache_ttl: Option<i64>,
    pub max_retry_delay_ms: Option<u64>,
    pub color: Option<ColorMode>,
}

impl Config {
    /// Loads defaults, the config file and then `overrides`
    ///
    /// A missing default config file is fine; a missing file that was asked for
    /// explicitly is an error.
    pub fn load(overrides: &Overrides) -> Result<Self, ConfigError> {
        let mut config = match &overrides.config_file {
            Some(path) => {
                let path = expand_path(&path.to_string_lossy());
                if !path.exists() {
                    return Err(ConfigError::NotFound(path));
                }
                Self::from_file(&path)?
            }
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };

        config.apply(overrides);
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    pub fn apply(&mut self, overrides: &Overrides) {
        if let Some(url) = overrides.api_url.as_ref().filter(|u| !u.is_empty()) {
            self.api.url = url.clone();
        }
        if let Some(timeout) = overrides.timeout.filter(|t| *t > 0) {
            self.api.timeout = timeout;
        }
        if overrides.no_cache {
            self.cache.enabled = false;
        }
        if let Some(dir) = overrides.cache_dir.as_ref().filter(|d| !d.is_empty()) {
            self.cache.dir = dir.clone();
        }
        if let Some(ttl) = overrides.cache_ttl.filter(|t| *t != 0) {
            self.cache.ttl = ttl;
        }
        if let Some(delay) = overrides.max_retry_delay_ms {
            self.api.max_retry_delay_ms = Some(delay);
        }
        if let Some(color) = overrides.color {
            self.output.color = color;
        }
    }

    pub fn timeout(&self) -> Duration {
        if self.api.timeout == 0 {
            Duration::from_secs(DEFAULT_TIMEOUT_SECS)
        } else {
            Duration::from_secs(self.api.timeout)
        }
    }

    pub fn max_retry_delay(&self) -> Option<Duration> {
        self.api.max_retry_delay_ms.map(Duration::from_millis)
    }

    /// TTL handed to the store; a negative value reads as the default
    ///
    /// Only `cache clear` sees the fallback, since a store is never built
    /// while [`Config::cache_enabled`] is false.
    pub fn cache_ttl(&self) -> i64 {
        if self.cache.ttl < 0 {
            DEFAULT_CACHE_TTL_SECS
        } else {
            self.cache.ttl
        }
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache.enabled && self.cache.ttl > 0
    }

    pub fn cache_dir(&self) -> PathBuf {
        if self.cache.dir.is_empty() {
            expand_path(DEFAULT_CACHE_DIR)
        } else {
            expand_path(&self.cache.dir)
        }
    }
}

/// `~/.grokipedia/config.yml`, if a home directory is known
pub fn default_config_path() -> Option<PathBuf> {
    let dirs = BaseDirs::new()?;
    Some(dirs.home_dir().join(".grokipedia").join("config.yml"))
}

/// Expands a leading `~` and `$VAR` / `${VAR}` references
///
/// Unset variables expand to nothing.
pub fn expand_path(path: &str) -> PathBuf {
    let expanded = expand_env(path);

    if expanded == "~" || expanded.starts_with("~/") {
        if let Some(dirs) = BaseDirs::new() {
            let rest = expanded[1..].trim_start_matches('/');
            return dirs.home_dir().join(rest);
        }
    }

    PathBuf::from(expanded)
}

fn expand_env(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }

        let name: String = if chars.peek() == Some(&'{') {
            chars.next();
            let name: String = chars.by_ref().take_while(|c| *c != '}').collect();
            name
        } else {
            let mut name = String::new();
            while let Some(&next) = chars.peek() {
                if next.is_ascii_alphanumeric() || next == '_' {
                    name.push(next);
                    chars.next();
                } else {
                    break;
                }
            }
            name
        };

        if name.is_empty() {
            out.push('$');
        } else {
            out.push_str(&env::var(&name).unwrap_or_default());
        }
    }

    out
}
