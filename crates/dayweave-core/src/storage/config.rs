//! TOML-based application configuration.
//!
//! Stores:
//! - the user's address, from which their own domain is derived
//! - merge tuning (due-soon window, default allocations)
//! - a fallback priority mapping for fetches that carry none
//!
//! Configuration is stored at `~/.config/dayweave/config.toml`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;
use crate::merge::{MergeContext, PriorityMapping};
use crate::timeline::extract_email_domain;

/// Tables whose leaves are free-form, so `set` may add new keys to them.
const OPEN_TABLES: &[&str] = &["priorities"];

/// Upper bound for `merge.due_soon_days` (ten years).
const MAX_DUE_SOON_DAYS: i64 = 3650;
/// Upper bound for the `merge.default_*_minutes` values (one week).
const MAX_DEFAULT_MINUTES: i64 = 7 * 24 * 60;

/// Who the agenda belongs to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default)]
    pub email: String,
}

/// Merge tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    #[serde(default = "default_due_soon_days")]
    pub due_soon_days: i64,
    #[serde(default = "default_message_minutes")]
    pub default_message_minutes: i64,
    #[serde(default = "default_task_minutes")]
    pub default_task_minutes: i64,
    #[serde(default = "default_event_minutes")]
    pub default_event_minutes: i64,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/dayweave/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub user: UserConfig,
    #[serde(default)]
    pub merge: MergeConfig,
    /// Label -> rank, lower ranks first.
    #[serde(default)]
    pub priorities: PriorityMapping,
}

fn default_due_soon_days() -> i64 {
    7
}
fn default_message_minutes() -> i64 {
    5
}
fn default_task_minutes() -> i64 {
    60
}
fn default_event_minutes() -> i64 {
    30
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            due_soon_days: default_due_soon_days(),
            default_message_minutes: default_message_minutes(),
            default_task_minutes: default_task_minutes(),
            default_event_minutes: default_event_minutes(),
        }
    }
}

impl MergeConfig {
    /// Check every value against its allowed range.
    ///
    /// # Errors
    ///
    /// Returns `InvalidValue` naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("merge.due_soon_days", self.due_soon_days, 0, MAX_DUE_SOON_DAYS)?;
        for (key, minutes) in [
            ("merge.default_message_minutes", self.default_message_minutes),
            ("merge.default_task_minutes", self.default_task_minutes),
            ("merge.default_event_minutes", self.default_event_minutes),
        ] {
            check_range(key, minutes, 1, MAX_DEFAULT_MINUTES)?;
        }
        Ok(())
    }

    /// The due-soon window as a duration.
    pub fn due_soon(&self) -> Duration {
        Duration::try_days(self.due_soon_days.clamp(0, MAX_DUE_SOON_DAYS))
            .unwrap_or_else(|| Duration::days(default_due_soon_days()))
    }
}

fn check_range(key: &str, value: i64, min: i64, max: i64) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{value} is outside {min}..={max}"),
        })
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
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(unknown());
        }

        let mut current = root;
        let mut parent: Option<&str> = None;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let open_table = parent.is_some_and(|p| OPEN_TABLES.contains(&p));
                let obj = current.as_object_mut().ok_or_else(unknown)?;

                let new_value = match obj.get(part) {
                    Some(serde_json::Value::Bool(_)) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    Some(serde_json::Value::Number(_)) => parse_number(value).ok_or_else(|| {
                        invalid(format!("cannot parse '{value}' as number"))
                    })?,
                    Some(serde_json::Value::Object(_) | serde_json::Value::Array(_)) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    Some(_) => serde_json::Value::String(value.into()),
                    None if open_table => parse_number(value).ok_or_else(|| {
                        invalid(format!("cannot parse '{value}' as number"))
                    })?,
                    None => return Err(unknown()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
            parent = Some(part);
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing defaults there if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed, or the
    /// defaults cannot be written.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Self = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.merge.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// Persist to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
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
    ///
    /// The new value is parsed according to the type of the current one.
    /// Under `priorities` new labels may be added.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or a merge setting falls outside its range. `self` is left unchanged
    /// on error.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Self = serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        updated.merge.validate()?;
        *self = updated;
        Ok(())
    }

    /// Restore defaults and persist them.
    ///
    /// # Errors
    ///
    /// Returns an error if the defaults cannot be written.
    pub fn reset() -> Result<Self, ConfigError> {
        let cfg = Self::default();
        cfg.save()?;
        Ok(cfg)
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to default config");
            Self::default()
        })
    }

    /// The user's own domain, derived from `user.email`.
    pub fn user_domain(&self) -> String {
        extract_email_domain(&self.user.email)
    }

    /// Merge context for `now` carrying this config's domain, window and mapping.
    ///
    /// A non-empty `fetched` mapping takes precedence over the configured one.
    pub fn merge_context(
        &self,
        now: DateTime<Utc>,
        fetched: Option<PriorityMapping>,
    ) -> MergeContext {
        let priorities = fetched
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| self.priorities.clone());
        MergeContext::new(now, self.user_domain())
            .with_priorities(priorities)
            .with_due_soon(self.merge.due_soon())
    }
}

fn parse_number(value: &str) -> Option<serde_json::Value> {
    if let Ok(n) = value.parse::<i64>() {
        Some(serde_json::Value::Number(n.into()))
    } else {
        value
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(serde_json::Value::Number)
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
        assert_eq!(parsed.merge.due_soon_days, 7);
        assert_eq!(parsed.merge.default_task_minutes, 60);
        assert!(parsed.priorities.is_empty());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let parsed: Config = toml::from_str(
            "[user]\nemail = \"ada@corp.io\"\n\n[priorities]\nHighest = 1\nLow = 4\n",
        )
        .unwrap();
        assert_eq!(parsed.user.email, "ada@corp.io");
        assert_eq!(parsed.merge.default_message_minutes, 5);
        assert_eq!(parsed.priorities.rank("Low"), Some(4));
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("merge.due_soon_days").as_deref(), Some("7"));
        assert_eq!(cfg.get("user.email").as_deref(), Some(""));
        assert!(cfg.get("merge.missing_key").is_none());
        assert!(cfg.get("").is_none());
    }

    #[test]
    fn set_updates_nested_number() {
        let mut cfg = Config::default();
        cfg.set("merge.default_task_minutes", "45").unwrap();
        assert_eq!(cfg.merge.default_task_minutes, 45);
    }

    #[test]
    fn set_updates_nested_string() {
        let mut cfg = Config::default();
        cfg.set("user.email", "Grace@Navy.MIL").unwrap();
        assert_eq!(cfg.user_domain(), "navy.mil");
    }

    #[test]
    fn set_adds_new_priority_labels() {
        let mut cfg = Config::default();
        cfg.set("priorities.Blocker", "0").unwrap();
        cfg.set("priorities.Minor", "3").unwrap();
        assert_eq!(cfg.priorities.rank("Blocker"), Some(0));
        assert_eq!(cfg.priorities.rank("Minor"), Some(3));
    }

    #[test]
    fn set_rejects_unknown_key() {
        let mut cfg = Config::default();
        let err = cfg.set("merge.nonexistent_key", "1").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownKey(_)));
        let err = cfg.set("user.email.deeper", "x").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownKey(_)));
    }

    #[test]
    fn set_rejects_invalid_type() {
        let mut cfg = Config::default();
        let err = cfg.set("merge.due_soon_days", "soon").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
        let err = cfg.set("priorities.Major", "high").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn set_rejects_out_of_range_merge_values() {
        let mut cfg = Config::default();
        for (key, value) in [
            ("merge.due_soon_days", "1000000000"),
            ("merge.due_soon_days", "-1"),
            ("merge.default_task_minutes", "-30"),
            ("merge.default_message_minutes", "0"),
            ("merge.default_event_minutes", "99999999999"),
        ] {
            let err = cfg.set(key, value).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidValue { .. }), "{key}={value}");
        }
        assert_eq!(cfg.merge.due_soon_days, 7);
        assert_eq!(cfg.merge.default_task_minutes, 60);

        cfg.set("merge.due_soon_days", "0").unwrap();
        assert_eq!(cfg.merge_context(Utc::now(), None).due_soon, Duration::zero());
    }

    #[test]
    fn out_of_range_file_value_is_rejected_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[merge]\ndue_soon_days = 1000000000\n").unwrap();

        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn due_soon_clamps_values_set_directly() {
        let merge = MergeConfig {
            due_soon_days: i64::MAX,
            ..MergeConfig::default()
        };
        assert_eq!(merge.due_soon(), Duration::days(MAX_DUE_SOON_DAYS));
    }

    #[test]
    fn load_from_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let cfg = Config::load_from(&path).unwrap();

        assert_eq!(cfg.merge.due_soon_days, 7);
        assert!(path.exists());
    }

    #[test]
    fn save_then_load_preserves_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut cfg = Config::default();
        cfg.set("user.email", "ada@corp.io").unwrap();
        cfg.set("priorities.High", "2").unwrap();
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();

        assert_eq!(loaded.user.email, "ada@corp.io");
        assert_eq!(loaded.priorities.rank("High"), Some(2));
    }

    #[test]
    fn unparseable_file_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "merge = [not toml").unwrap();

        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::LoadFailed { .. })
        ));
    }

    #[test]
    fn merge_context_prefers_fetched_mapping() {
        let mut cfg = Config::default();
        cfg.set("user.email", "ada@corp.io").unwrap();
        cfg.set("priorities.High", "2").unwrap();
        let now = Utc::now();

        let fallback = cfg.merge_context(now, Some(PriorityMapping::new()));
        assert_eq!(fallback.priorities.rank("High"), Some(2));
        assert_eq!(fallback.user_domain, "corp.io");
        assert_eq!(fallback.due_soon, Duration::days(7));

        let fetched: PriorityMapping = [("Critical", 1)].into_iter().collect();
        let ctx = cfg.merge_context(now, Some(fetched));
        assert_eq!(ctx.priorities.rank("Critical"), Some(1));
        assert_eq!(ctx.priorities.rank("High"), None);
    }
}
