//! Configuration management for Autocast
//!
//! Configuration is read from a TOML file and then overridden by
//! `AUTOCAST_*` environment variables. A missing file is not an error: the
//! defaults describe a local setup with the HelaGPT provider, two daily
//! publish slots and no platform credentials.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{AutocastError, ConfigError, Result};
use crate::scheduling::{parse_schedule_times, ScheduleTime};

pub const CONFIG_ENV: &str = "AUTOCAST_CONFIG";
pub const DB_PATH_ENV: &str = "AUTOCAST_DB_PATH";
pub const REQUIRE_APPROVAL_ENV: &str = "AUTOCAST_REQUIRE_APPROVAL";
pub const POSTS_PER_DAY_ENV: &str = "AUTOCAST_POSTS_PER_DAY";
pub const SCHEDULE_TIMES_ENV: &str = "AUTOCAST_SCHEDULE_TIMES";
pub const AI_PROVIDER_ENV: &str = "AUTOCAST_AI_PROVIDER";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub ai: AiConfig,
    pub linkedin: Option<LinkedInConfig>,
    pub facebook: Option<FacebookConfig>,
    pub instagram: Option<InstagramConfig>,
    pub x: Option<XConfig>,
    pub tiktok: Option<TikTokConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "~/.local/share/autocast/autocast.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// New posts start as drafts and drafts are never auto-published
    pub require_approval: bool,
    /// Global publish budget per cycle run
    pub posts_per_day: u32,
    /// Comma-separated daily `HH:MM` slots for the publish cycle
    pub schedule_times: String,
    /// humantime duration between generation cycles
    pub generation_interval: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            require_approval: false,
            posts_per_day: 2,
            schedule_times: "10:00,16:00".to_string(),
            generation_interval: "2h".to_string(),
        }
    }
}

impl SchedulerConfig {
    pub fn publish_times(&self) -> Result<Vec<ScheduleTime>> {
        parse_schedule_times(&self.schedule_times).map_err(|e| {
            ConfigError::InvalidValue {
                field: "scheduler.schedule_times".to_string(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    pub fn generation_interval(&self) -> Result<Duration> {
        parse_positive_duration("scheduler.generation_interval", &self.generation_interval)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiProviderKind {
    #[default]
    HelaGpt,
    Ollama,
}

impl FromStr for AiProviderKind {
    type Err = AutocastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "helagpt" => Ok(AiProviderKind::HelaGpt),
            "ollama" => Ok(AiProviderKind::Ollama),
            other => Err(ConfigError::InvalidValue {
                field: "ai.provider".to_string(),
                reason: format!("unknown provider '{}', expected helagpt or ollama", other),
            }
            .into()),
        }
    }
}

impl fmt::Display for AiProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AiProviderKind::HelaGpt => f.write_str("helagpt"),
            AiProviderKind::Ollama => f.write_str("ollama"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub provider: AiProviderKind,
    pub helagpt_url: String,
    pub helagpt_timeout: String,
    pub ollama_url: String,
    pub ollama_model: String,
    pub ollama_timeout: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: AiProviderKind::HelaGpt,
            helagpt_url: "https://helagpt-backend.vercel.app/api/chat".to_string(),
            helagpt_timeout: "30s".to_string(),
            ollama_url: "http://localhost:11434/api/generate".to_string(),
            ollama_model: "mistral".to_string(),
            ollama_timeout: "60s".to_string(),
        }
    }
}

impl AiConfig {
    pub fn helagpt_timeout(&self) -> Result<Duration> {
        parse_positive_duration("ai.helagpt_timeout", &self.helagpt_timeout)
    }

    pub fn ollama_timeout(&self) -> Result<Duration> {
        parse_positive_duration("ai.ollama_timeout", &self.ollama_timeout)
    }
}

// Credential sections redact their tokens in Debug output.

#[derive(Clone, Serialize, Deserialize)]
pub struct LinkedInConfig {
    pub access_token: String,
    /// Resolved through the profile endpoint when absent
    pub person_id: Option<String>,
}

impl fmt::Debug for LinkedInConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkedInConfig")
            .field("access_token", &"[REDACTED]")
            .field("person_id", &self.person_id)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct FacebookConfig {
    pub page_id: String,
    pub access_token: String,
}

impl fmt::Debug for FacebookConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FacebookConfig")
            .field("page_id", &self.page_id)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct InstagramConfig {
    pub account_id: String,
    pub access_token: String,
}

impl fmt::Debug for InstagramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstagramConfig")
            .field("account_id", &self.account_id)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct XConfig {
    pub bearer_token: String,
}

impl fmt::Debug for XConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XConfig")
            .field("bearer_token", &"[REDACTED]")
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct TikTokConfig {
    pub access_token: String,
}

impl fmt::Debug for TikTokConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TikTokConfig")
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

impl Config {
    /// Load configuration from the default location
    ///
    /// Falls back to defaults when the file does not exist, then applies
    /// environment overrides and validates the result.
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;

        let mut config = if config_path.exists() {
            Self::parse_file(&config_path)?
        } else {
            tracing::debug!(
                "No config file at {}, using defaults",
                config_path.display()
            );
            Self::default_config()
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate configuration from a specific path, without
    /// environment overrides
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let config = Self::parse_file(path)?;
        config.validate()?;
        Ok(config)
    }

    fn parse_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        Ok(config)
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self::default()
    }

    /// Override file values with `AUTOCAST_*` environment variables
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(path) = std::env::var(DB_PATH_ENV) {
            self.database.path = path;
        }

        if let Ok(value) = std::env::var(REQUIRE_APPROVAL_ENV) {
            self.scheduler.require_approval = parse_bool(REQUIRE_APPROVAL_ENV, &value)?;
        }

        if let Ok(value) = std::env::var(POSTS_PER_DAY_ENV) {
            self.scheduler.posts_per_day =
                value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    field: POSTS_PER_DAY_ENV.to_string(),
                    reason: format!("'{}' is not a positive integer", value),
                })?;
        }

        if let Ok(value) = std::env::var(SCHEDULE_TIMES_ENV) {
            self.scheduler.schedule_times = value;
        }

        if let Ok(value) = std::env::var(AI_PROVIDER_ENV) {
            self.ai.provider = value.parse()?;
        }

        Ok(())
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> Result<()> {
        if self.database.path.trim().is_empty() {
            return Err(ConfigError::MissingField("database.path".to_string()).into());
        }

        if self.scheduler.posts_per_day < 1 {
            return Err(ConfigError::InvalidValue {
                field: "scheduler.posts_per_day".to_string(),
                reason: "must be at least 1".to_string(),
            }
            .into());
        }

        self.scheduler.publish_times()?;
        self.scheduler.generation_interval()?;
        self.ai.helagpt_timeout()?;
        self.ai.ollama_timeout()?;

        Ok(())
    }
}

/// Resolve the configuration file path following the XDG Base Directory spec
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("autocast").join("config.toml"))
}

fn parse_bool(field: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: format!("'{}' is not a boolean", value),
        }
        .into()),
    }
}

fn parse_positive_duration(field: &str, value: &str) -> Result<Duration> {
    let duration = humantime::parse_duration(value.trim()).map_err(|e| ConfigError::InvalidValue {
        field: field.to_string(),
        reason: format!("'{}': {}", value, e),
    })?;

    if duration.is_zero() {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: "must be greater than zero".to_string(),
        }
        .into());
    }

    Ok(duration)
}
