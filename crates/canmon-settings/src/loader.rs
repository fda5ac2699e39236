//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`MonitorSettings::default()`]
//! 2. If the settings file exists, deep-merge user values over defaults
//! 3. Apply environment variable overrides (highest priority)
//! 4. Validate the result

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::MonitorSettings;

/// Resolve the path to the settings file (`~/.canmon/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".canmon").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<MonitorSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. Invalid JSON or a value that fails
/// validation is an error.
pub fn load_settings_from_path(path: &Path) -> Result<MonitorSettings> {
    load_with(path, |name| std::env::var(name).ok())
}

fn load_with(path: &Path, env: impl Fn(&str) -> Option<String>) -> Result<MonitorSettings> {
    let defaults = serde_json::to_value(MonitorSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: MonitorSettings = serde_json::from_value(merged)?;
    apply_overrides(&mut settings, env);
    settings.validate()?;
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `CANMON_*` overrides read through `env`. Invalid values are
/// ignored with a warning (falling back to file/default).
fn apply_overrides(settings: &mut MonitorSettings, env: impl Fn(&str) -> Option<String>) {
    let read = |name: &str| env(name).filter(|v| !v.is_empty());

    if let Some(v) = read("CANMON_ORIGIN") {
        settings.origin = v;
    }
    if let Some(v) = read("CANMON_HISTORY_CAPACITY") {
        match parse_usize_range(&v, 1, 10_000) {
            Some(n) => settings.history_capacity = n,
            None => warn_invalid("CANMON_HISTORY_CAPACITY", &v),
        }
    }
    if let Some(v) = read("CANMON_RECONNECT") {
        match parse_bool(&v) {
            Some(b) => settings.reconnect.enabled = b,
            None => warn_invalid("CANMON_RECONNECT", &v),
        }
    }
    if let Some(v) = read("CANMON_RECONNECT_BASE_MS") {
        match parse_u64_range(&v, 1, 600_000) {
            Some(n) => settings.reconnect.base_delay_ms = n,
            None => warn_invalid("CANMON_RECONNECT_BASE_MS", &v),
        }
    }
    if let Some(v) = read("CANMON_RECONNECT_MAX_MS") {
        match parse_u64_range(&v, 1, 3_600_000) {
            Some(n) => settings.reconnect.max_delay_ms = n,
            None => warn_invalid("CANMON_RECONNECT_MAX_MS", &v),
        }
    }
    if let Some(v) = read("CANMON_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read("CANMON_LOG_JSON") {
        match parse_bool(&v) {
            Some(b) => settings.logging.json = b,
            None => warn_invalid("CANMON_LOG_JSON", &v),
        }
    }
}

fn warn_invalid(key: &str, value: &str) {
    tracing::warn!(key, value, "invalid env var, ignoring");
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;
    use crate::errors::SettingsError;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn write_settings(json: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_nested_objects() {
        let target = serde_json::json!({"reconnect": {"enabled": true, "baseDelayMs": 500}});
        let source = serde_json::json!({"reconnect": {"baseDelayMs": 50}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["reconnect"]["enabled"], true);
        assert_eq!(merged["reconnect"]["baseDelayMs"], 50);
    }

    #[test]
    fn merge_skips_null() {
        let merged = deep_merge(serde_json::json!({"a": 1}), serde_json::json!({"a": null}));
        assert_eq!(merged["a"], 1);
    }

    // ── loading ─────────────────────────────────────────────────────

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_with(&dir.path().join("absent.json"), no_env).unwrap();
        assert_eq!(settings, MonitorSettings::default());
    }

    #[test]
    fn file_values_merge_over_defaults() {
        let file = write_settings(r#"{"historyCapacity": 20, "reconnect": {"maxAttempts": 5}}"#);
        let settings = load_with(file.path(), no_env).unwrap();
        assert_eq!(settings.history_capacity, 20);
        assert_eq!(settings.reconnect.max_attempts, Some(5));
        assert_eq!(settings.reconnect.base_delay_ms, 500);
    }

    #[test]
    fn invalid_json_is_error() {
        let file = write_settings("{not json");
        assert!(matches!(load_with(file.path(), no_env), Err(SettingsError::Json(_))));
    }

    #[test]
    fn file_failing_validation_is_error() {
        let file = write_settings(r#"{"historyCapacity": 0}"#);
        assert!(matches!(
            load_with(file.path(), no_env),
            Err(SettingsError::InvalidValue(_))
        ));
    }

    #[test]
    fn env_overrides_win_over_file() {
        let file = write_settings(r#"{"historyCapacity": 20, "origin": "http://file:3000"}"#);
        let env = env_from(&[
            ("CANMON_HISTORY_CAPACITY", "15"),
            ("CANMON_ORIGIN", "https://env.example"),
            ("CANMON_RECONNECT", "off"),
            ("CANMON_LOG_JSON", "yes"),
        ]);
        let settings = load_with(file.path(), env).unwrap();
        assert_eq!(settings.history_capacity, 15);
        assert_eq!(settings.origin, "https://env.example");
        assert!(!settings.reconnect.enabled);
        assert!(settings.logging.json);
    }

    #[test]
    fn invalid_env_values_ignored() {
        let mut settings = MonitorSettings::default();
        apply_overrides(
            &mut settings,
            env_from(&[
                ("CANMON_HISTORY_CAPACITY", "0"),
                ("CANMON_RECONNECT", "maybe"),
                ("CANMON_RECONNECT_BASE_MS", "fast"),
                ("CANMON_ORIGIN", ""),
            ]),
        );
        assert_eq!(settings, MonitorSettings::default());
    }

    // ── parsing ─────────────────────────────────────────────────────

    #[test]
    fn parse_bool_variants() {
        assert_eq!(parse_bool("ON"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("nah"), None);
    }

    #[test]
    fn parse_ranges() {
        assert_eq!(parse_usize_range("100", 1, 10_000), Some(100));
        assert_eq!(parse_usize_range("0", 1, 10_000), None);
        assert_eq!(parse_u64_range("-1", 1, 10), None);
        assert_eq!(parse_u64_range("10", 1, 10), Some(10));
    }
}
