//! Settings loading with deep merge, profile files, and environment overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`GatewaySettings::default()`]
//! 2. If `<dir>/application.json` exists, deep-merge it over the defaults
//! 3. If a profile is set, deep-merge `<dir>/application-<profile>.json` (must exist)
//! 4. Apply `APP_*` environment overrides (highest priority)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::errors::{Result, SettingsError};
use crate::types::{DirectoryBackend, GatewaySettings, LogFormat};

/// Name of the base settings file.
pub const BASE_FILE: &str = "application.json";

/// Environment variable selecting the profile file.
pub const PROFILE_ENV: &str = "APP_PROFILE";

/// Path of the profile file for `profile` inside `dir`.
pub fn profile_path(dir: &Path, profile: &str) -> PathBuf {
    dir.join(format!("application-{profile}.json"))
}

/// Read the profile name from `APP_PROFILE`, if set and non-empty.
pub fn profile_from_env() -> Option<String> {
    read_env_string(PROFILE_ENV)
}

/// Load settings from `dir` with an optional profile and env var overrides.
///
/// A missing base file yields defaults. A requested profile whose file is
/// missing is an error. Invalid JSON in either file is an error.
pub fn load_settings(dir: &Path, profile: Option<&str>) -> Result<GatewaySettings> {
    let mut settings = load_files(dir, profile)?;
    apply_overrides(&mut settings, |key| std::env::var(key).ok());
    validate(&settings)?;
    Ok(settings)
}

/// Load and merge the base and profile files without env overrides.
pub fn load_files(dir: &Path, profile: Option<&str>) -> Result<GatewaySettings> {
    let mut merged = serde_json::to_value(GatewaySettings::default())?;

    let base = dir.join(BASE_FILE);
    if base.exists() {
        debug!(path = %base.display(), "loading base settings");
        merged = deep_merge(merged, read_json(&base)?);
    } else {
        debug!(path = %base.display(), "base settings not found, using defaults");
    }

    if let Some(profile) = profile.filter(|p| !p.is_empty()) {
        let path = profile_path(dir, profile);
        if !path.exists() {
            return Err(SettingsError::MissingProfile(path));
        }
        merged = deep_merge(merged, read_json(&path)?);
        info!(profile, path = %path.display(), "profile settings loaded");
    }

    Ok(serde_json::from_value(merged)?)
}

fn read_json(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
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

/// Apply `APP_*` overrides read through `lookup`.
///
/// Invalid values are logged and ignored, leaving the file/default value.
pub fn apply_overrides<F>(settings: &mut GatewaySettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

    // ── Server ──────────────────────────────────────────────────────
    if let Some(v) = get("APP_SERVER_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = parsed(&get, "APP_SERVER_PORT", |s| parse_u16_range(s, 1, 65535)) {
        settings.server.port = v;
    }

    // ── Redis ───────────────────────────────────────────────────────
    if let Some(v) = get("APP_REDIS_HOST") {
        settings.redis.host = v;
    }
    if let Some(v) = parsed(&get, "APP_REDIS_PORT", |s| parse_u16_range(s, 1, 65535)) {
        settings.redis.port = v;
    }
    if let Some(v) = parsed(&get, "APP_REDIS_TIMEOUT", |s| parse_u64_range(s, 1, 525_600)) {
        settings.redis.timeout = v;
    }

    // ── Directory / instance ────────────────────────────────────────
    if let Some(v) = parsed(&get, "APP_DIRECTORY_BACKEND", parse_backend) {
        settings.directory.backend = v;
    }
    if let Some(v) = get("APP_INSTANCE_NAME") {
        settings.instance.name = Some(v);
    }
    if let Some(v) = get("APP_INSTANCE_IP") {
        settings.instance.ip = Some(v);
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = get("APP_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = parsed(&get, "APP_LOG_FORMAT", parse_log_format) {
        settings.logging.format = v;
    }
}

fn parsed<T>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Option<T> {
    let val = get(key)?;
    let result = parse(&val);
    if result.is_none() {
        warn!(key, value = %val, "invalid env override, ignoring");
    }
    result
}

/// Reject settings no instance can run with.
pub fn validate(settings: &GatewaySettings) -> Result<()> {
    if settings.redis.timeout == 0 {
        return Err(SettingsError::InvalidValue(
            "redis.timeout must be at least 1 minute".into(),
        ));
    }
    if settings.server.heartbeat_interval_secs > 0
        && settings.server.heartbeat_timeout_secs < settings.server.heartbeat_interval_secs
    {
        return Err(SettingsError::InvalidValue(
            "server.heartbeat_timeout_secs must not be shorter than the interval".into(),
        ));
    }
    Ok(())
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a directory backend name.
pub fn parse_backend(val: &str) -> Option<DirectoryBackend> {
    match val.to_lowercase().as_str() {
        "redis" => Some(DirectoryBackend::Redis),
        "memory" => Some(DirectoryBackend::Memory),
        _ => None,
    }
}

/// Parse a log format name.
pub fn parse_log_format(val: &str) -> Option<LogFormat> {
    match val.to_lowercase().as_str() {
        "compact" | "console" => Some(LogFormat::Compact),
        "json" => Some(LogFormat::Json),
        _ => None,
    }
}

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
