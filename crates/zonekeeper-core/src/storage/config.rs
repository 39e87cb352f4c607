//! TOML-based application configuration.
//!
//! Stores:
//! - Sync retry policy for the peer link
//! - Session tick cadence
//! - Profile data used to derive the maximum heart rate
//!
//! Configuration is stored at `~/.config/zonekeeper/config.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::ConfigError;
use crate::zone::{BirthDate, MaxRate, DEFAULT_MAX_RATE};

/// Peer link retry policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Extra attempts after the first failed transfer.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

/// Session loop configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,
}

/// Profile used to derive the maximum heart rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileConfig {
    #[serde(default)]
    pub birth_year: Option<i32>,
    #[serde(default)]
    pub birth_month: Option<u32>,
    /// Used when no birth data is configured.
    #[serde(default = "default_fallback_max_rate")]
    pub fallback_max_rate: u32,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/zonekeeper/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub profile: ProfileConfig,
}

fn default_max_retries() -> u32 {
    1
}
fn default_retry_backoff_ms() -> u64 {
    1_000
}
fn default_tick_interval_secs() -> u64 {
    4
}
fn default_fallback_max_rate() -> u32 {
    DEFAULT_MAX_RATE
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_tick_interval_secs(),
        }
    }
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            birth_year: None,
            birth_month: None,
            fallback_max_rate: default_fallback_max_rate(),
        }
    }
}

impl SyncConfig {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl SessionConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs.max(1))
    }
}

impl ProfileConfig {
    pub fn birth_date(&self) -> Option<BirthDate> {
        self.birth_year.map(|year| BirthDate {
            year,
            month: self.birth_month,
        })
    }

    /// Maximum heart rate from the birth date, or the configured fallback.
    pub fn max_rate(&self, today: NaiveDate) -> u32 {
        match self.birth_date() {
            Some(birth) => MaxRate::resolve(Some(birth), today),
            None => self.fallback_max_rate,
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    // Optional profile fields are null until set; `none` clears
                    // them and is rejected by required fields on deserialize.
                    serde_json::Value::Number(_) | serde_json::Value::Null => {
                        if value == "none" {
                            serde_json::Value::Null
                        } else {
                            value
                                .parse::<i64>()
                                .map(|n| serde_json::Value::Number(n.into()))
                                .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?
                        }
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    pub fn path() -> Result<PathBuf, ConfigError> {
        data_dir()
            .map(|dir| dir.join("config.toml"))
            .map_err(|e| ConfigError::LoadFailed {
                path: PathBuf::from("config.toml"),
                message: e.to_string(),
            })
    }

    /// Load from disk or return default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let load_failed = |message: String| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message,
                };
                let config: Self = toml::from_str(&content).map_err(|e| load_failed(e.to_string()))?;
                config.validate().map_err(|e| load_failed(e.to_string()))?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key, in memory only.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Self = serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Range checks serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.profile.birth_month {
            Some(month) if !(1..=12).contains(&month) => Err(ConfigError::InvalidValue {
                key: "profile.birth_month".into(),
                message: format!("{month} is not a month (1-12)"),
            }),
            _ => Ok(()),
        }
    }

    /// Load from disk, returning default on error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to default configuration");
            Self::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
        assert_eq!(parsed.session.tick_interval_secs, 4);
        assert_eq!(parsed.sync.max_retries, 1);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[profile]\nbirth_year = 1990\n").unwrap();
        assert_eq!(parsed.profile.birth_year, Some(1990));
        assert_eq!(parsed.profile.fallback_max_rate, 190);
        assert_eq!(parsed.sync.retry_backoff_ms, 1_000);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("session.tick_interval_secs").as_deref(), Some("4"));
        assert_eq!(cfg.get("profile.birth_year").as_deref(), Some("null"));
        assert!(cfg.get("session.missing_key").is_none());
    }

    #[test]
    fn set_updates_numbers_and_optionals() {
        let mut cfg = Config::default();
        cfg.set("sync.max_retries", "3").unwrap();
        cfg.set("profile.birth_year", "1985").unwrap();
        assert_eq!(cfg.sync.max_retries, 3);
        assert_eq!(cfg.profile.birth_year, Some(1985));
        cfg.set("profile.birth_year", "none").unwrap();
        assert_eq!(cfg.profile.birth_year, None);
    }

    #[test]
    fn set_rejects_unknown_key_and_bad_value() {
        let mut cfg = Config::default();
        assert!(matches!(cfg.set("sync.nope", "1"), Err(ConfigError::UnknownKey(_))));
        assert!(matches!(
            cfg.set("session.tick_interval_secs", "soon"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn none_clears_optionals_after_they_hold_numbers() {
        let mut cfg = Config::default();
        cfg.set("profile.birth_year", "-50").unwrap();
        assert_eq!(cfg.profile.birth_year, Some(-50));
        cfg.set("profile.birth_month", "7").unwrap();
        cfg.set("profile.birth_month", "none").unwrap();
        assert_eq!(cfg.profile.birth_month, None);
        cfg.set("profile.birth_year", "none").unwrap();
        assert_eq!(cfg.profile.birth_year, None);
    }

    #[test]
    fn none_is_rejected_for_required_numbers() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set("sync.max_retries", "none"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            cfg.set("sync.max_retries", "-1"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert_eq!(cfg.sync.max_retries, 1);
    }

    #[test]
    fn birth_month_must_be_a_month() {
        let mut cfg = Config::default();
        for bad in ["0", "13"] {
            assert!(matches!(
                cfg.set("profile.birth_month", bad),
                Err(ConfigError::InvalidValue { .. })
            ));
        }
        assert_eq!(cfg.profile.birth_month, None);
        cfg.set("profile.birth_month", "12").unwrap();
        assert_eq!(cfg.profile.birth_month, Some(12));
    }

    #[test]
    fn load_rejects_out_of_range_month() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[profile]\nbirth_year = 1990\nbirth_month = 14\n").unwrap();
        assert!(matches!(Config::load_from(&path), Err(ConfigError::LoadFailed { .. })));
    }

    #[test]
    fn max_rate_prefers_birth_date() {
        let today = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        let mut profile = ProfileConfig::default();
        assert_eq!(profile.max_rate(today), 190);
        profile.birth_year = Some(1987);
        profile.birth_month = Some(3);
        // age 37 -> 208 - 25.9
        assert_eq!(profile.max_rate(today), 182);
    }

    #[test]
    fn load_missing_file_returns_default_and_save_roundtrips() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        assert_eq!(Config::load_from(&path).unwrap(), Config::default());

        let mut cfg = Config::default();
        cfg.sync.retry_backoff_ms = 250;
        cfg.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), cfg);
    }
}
