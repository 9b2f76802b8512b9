//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`MnemonSettings::default()`]
//! 2. If `~/.mnemon/settings.json` exists, deep-merge user values over defaults
//! 3. Apply `MNEMON_*` environment variable overrides (highest priority)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{Result, SettingsError};
use crate::types::{LogFormat, MnemonSettings, mnemon_home};

/// Upper bound accepted for `MNEMON_LOG_MAX_ROWS`.
pub const MAX_LOG_ROWS: usize = 10_000_000;

/// Resolve the path to the settings file (`~/.mnemon/settings.json`).
pub fn settings_path() -> PathBuf {
    mnemon_home().join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<MnemonSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<MnemonSettings> {
    let mut settings = load_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Defaults merged with the file at `path`, without env overrides.
fn load_file(path: &Path) -> Result<MnemonSettings> {
    let defaults = serde_json::to_value(MnemonSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let settings: MnemonSettings = serde_json::from_value(merged)?;
    validate(&settings)?;
    Ok(settings)
}

fn validate(settings: &MnemonSettings) -> Result<()> {
    let max_rows = settings.logging.max_rows;
    if !(1..=MAX_LOG_ROWS).contains(&max_rows) {
        return Err(SettingsError::InvalidValue(format!(
            "logging.maxRows must be between 1 and {MAX_LOG_ROWS}, got {max_rows}"
        )));
    }
    Ok(())
}

/// Recursive deep merge of two JSON values.
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

/// Apply environment variable overrides to loaded settings.
///
/// Invalid values are logged and ignored, keeping the file or default value.
pub fn apply_env_overrides(settings: &mut MnemonSettings) {
    apply_overrides_from(settings, |name| std::env::var(name).ok());
}

/// Apply overrides read through `lookup` instead of the process environment.
pub fn apply_overrides_from<F>(settings: &mut MnemonSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let env = EnvReader { lookup };

    if let Some(v) = env.string("MNEMON_LOG_DB") {
        settings.logging.db_path = PathBuf::from(v);
    }
    if let Some(v) = env.string("MNEMON_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = env.format("MNEMON_LOG_FORMAT") {
        settings.logging.format = v;
    }
    if let Some(v) = env.string("MNEMON_LOG_FILE") {
        settings.logging.file = Some(PathBuf::from(v));
    }
    if let Some(v) = env.usize("MNEMON_LOG_MAX_ROWS", 1, MAX_LOG_ROWS) {
        settings.logging.max_rows = v;
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }

    fn usize(&self, name: &str, min: usize, max: usize) -> Option<usize> {
        let val = self.string(name)?;
        let result = parse_usize_range(&val, min, max);
        if result.is_none() {
            warn!(key = name, value = %val, "invalid usize env var, ignoring");
        }
        result
    }

    fn format(&self, name: &str) -> Option<LogFormat> {
        let val = self.string(name)?;
        let result = LogFormat::parse(&val);
        if result.is_none() {
            warn!(key = name, value = %val, "invalid log format env var, ignoring");
        }
        result
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::types::ResponseMode;

    fn with_env(vars: &[(&str, &str)]) -> MnemonSettings {
        let env: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        let mut settings = MnemonSettings::default();
        apply_overrides_from(&mut settings, |name| env.get(name).cloned());
        settings
    }

    fn write_settings(dir: &tempfile::TempDir, json: &str) -> PathBuf {
        let path = dir.path().join("settings.json");
        std::fs::write(&path, json).unwrap();
        path
    }

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_nested_override() {
        let target = serde_json::json!({"logging": {"level": "info", "maxRows": 10}});
        let source = serde_json::json!({"logging": {"level": "debug"}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["logging"]["level"], "debug");
        assert_eq!(merged["logging"]["maxRows"], 10);
    }

    #[test]
    fn merge_array_replace() {
        let target = serde_json::json!({"items": [1, 2, 3]});
        let source = serde_json::json!({"items": [4, 5]});
        let merged = deep_merge(target, source);
        assert_eq!(merged["items"], serde_json::json!([4, 5]));
    }

    #[test]
    fn merge_null_preserves_target() {
        let target = serde_json::json!({"a": 1, "b": 2});
        let source = serde_json::json!({"a": null});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"], 1);
        assert_eq!(merged["b"], 2);
    }

    #[test]
    fn merge_new_keys_added() {
        let merged = deep_merge(serde_json::json!({"a": 1}), serde_json::json!({"b": 2}));
        assert_eq!(merged["a"], 1);
        assert_eq!(merged["b"], 2);
    }

    #[test]
    fn merge_primitive_replaces_object() {
        let target = serde_json::json!({"a": {"nested": true}});
        let source = serde_json::json!({"a": 42});
        assert_eq!(deep_merge(target, source)["a"], 42);
    }

    // ── load_file ───────────────────────────────────────────────────

    #[test]
    fn load_missing_file_returns_defaults() {
        let settings = load_file(Path::new("/nonexistent/settings.json")).unwrap();
        assert_eq!(settings.logging.max_rows, 10_000);
        assert_eq!(settings.response.default_mode, ResponseMode::Smart);
    }

    #[test]
    fn load_partial_json_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_settings(
            &dir,
            r#"{"logging": {"level": "debug", "format": "json"}, "response": {"defaultMode": "mention"}}"#,
        );

        let settings = load_file(&path).unwrap();
        assert_eq!(settings.logging.level, "debug");
        assert_eq!(settings.logging.format, LogFormat::Json);
        assert_eq!(settings.logging.max_rows, 10_000);
        assert_eq!(settings.response.default_mode, ResponseMode::Mention);
    }

    #[test]
    fn load_agents_and_resolve() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_settings(
            &dir,
            r#"{"agents": [{"serverId": "server1", "responseMode": "all",
                "channels": [{"id": "chan1", "responseMode": "none"}]}]}"#,
        );

        let settings = load_file(&path).unwrap();
        assert_eq!(settings.resolve_response_mode("server1", "chan1"), ResponseMode::Never);
        assert_eq!(settings.resolve_response_mode("server1", "other"), ResponseMode::All);
    }

    #[test]
    fn load_retry_array_replaces_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_settings(&dir, r#"{"retry": {"delaysMs": [50]}}"#);
        assert_eq!(load_file(&path).unwrap().retry.delays_ms, [50]);
    }

    #[test]
    fn load_invalid_json_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_settings(&dir, "not valid json");
        assert!(matches!(load_file(&path), Err(SettingsError::Json(_))));
    }

    #[test]
    fn load_wrong_type_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_settings(&dir, r#"{"logging": {"maxRows": "lots"}}"#);
        assert!(matches!(load_file(&path), Err(SettingsError::Json(_))));
    }

    #[test]
    fn load_zero_max_rows_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_settings(&dir, r#"{"logging": {"maxRows": 0}}"#);
        let err = load_file(&path).unwrap_err();
        assert!(matches!(err, SettingsError::InvalidValue(_)));
        assert!(err.to_string().contains("logging.maxRows"));
    }

    // ── env overrides ───────────────────────────────────────────────

    #[test]
    fn env_overrides_logging() {
        let settings = with_env(&[
            ("MNEMON_LOG_DB", "/var/lib/mnemon/logs.db"),
            ("MNEMON_LOG_LEVEL", "mnemon=debug,warn"),
            ("MNEMON_LOG_FORMAT", "JSON"),
            ("MNEMON_LOG_FILE", "/var/log/mnemon/mnemon.log"),
            ("MNEMON_LOG_MAX_ROWS", "500"),
        ]);
        assert_eq!(settings.logging.db_path, Path::new("/var/lib/mnemon/logs.db"));
        assert_eq!(settings.logging.level, "mnemon=debug,warn");
        assert_eq!(settings.logging.format, LogFormat::Json);
        assert_eq!(
            settings.logging.file.as_deref(),
            Some(Path::new("/var/log/mnemon/mnemon.log"))
        );
        assert_eq!(settings.logging.max_rows, 500);
    }

    #[test]
    fn invalid_env_values_are_ignored() {
        let settings = with_env(&[
            ("MNEMON_LOG_FORMAT", "pretty"),
            ("MNEMON_LOG_MAX_ROWS", "0"),
            ("MNEMON_LOG_LEVEL", ""),
        ]);
        let defaults = MnemonSettings::default();
        assert_eq!(settings.logging.format, defaults.logging.format);
        assert_eq!(settings.logging.max_rows, defaults.logging.max_rows);
        assert_eq!(settings.logging.level, defaults.logging.level);
    }

    #[test]
    fn no_env_leaves_settings_untouched() {
        let settings = with_env(&[]);
        assert_eq!(settings.logging.max_rows, 10_000);
        assert!(settings.logging.file.is_none());
    }

    // ── parse helpers ───────────────────────────────────────────────

    #[test]
    fn parse_usize_range_bounds() {
        assert_eq!(parse_usize_range("1", 1, MAX_LOG_ROWS), Some(1));
        assert_eq!(parse_usize_range(" 50 ", 1, MAX_LOG_ROWS), Some(50));
        assert_eq!(parse_usize_range("10000000", 1, MAX_LOG_ROWS), Some(MAX_LOG_ROWS));
        assert_eq!(parse_usize_range("10000001", 1, MAX_LOG_ROWS), None);
        assert_eq!(parse_usize_range("0", 1, MAX_LOG_ROWS), None);
        assert_eq!(parse_usize_range("-3", 1, MAX_LOG_ROWS), None);
        assert_eq!(parse_usize_range("abc", 1, MAX_LOG_ROWS), None);
    }
}
