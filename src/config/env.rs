//! Environment variable configuration support.
//!
//! `HONEYPY_*` variables override values loaded from the config file.
//! The host-key passphrase is only ever read from the environment, which may
//! be seeded from a `.env` file.

use crate::config::types::*;
use anyhow::Context;
use std::path::{Path, PathBuf};

/// Load `.env` from the working directory or its parents, if present.
/// Variables already set in the process environment are not overridden.
pub fn load_dotenv() -> Option<PathBuf> {
    dotenvy::dotenv().ok()
}

/// Load variables from a specific env file. Existing variables win.
pub fn load_dotenv_from(path: &Path) -> anyhow::Result<()> {
    dotenvy::from_path(path).with_context(|| format!("loading env file: {}", path.display()))
}

/// Apply `HONEYPY_*` overrides on top of an existing config.
pub fn apply_env_overrides(config: &mut AppConfig) -> anyhow::Result<()> {
    // Server
    if let Some(v) = opt_env("HONEYPY_LISTEN") {
        config.server.listen = v;
    }
    if let Some(v) = opt_env("HONEYPY_HOST_KEY_PATH") {
        config.server.host_key_path = PathBuf::from(v);
    }
    config.server.generate_host_key =
        parse_bool_env("HONEYPY_GENERATE_HOST_KEY", config.server.generate_host_key);
    if let Some(v) = opt_env("HONEYPY_SERVER_ID") {
        config.server.server_id = v;
    }
    config.server.shutdown_timeout =
        parse_env("HONEYPY_SHUTDOWN_TIMEOUT", config.server.shutdown_timeout);

    // Shell identity
    if let Some(v) = opt_env("HONEYPY_SHELL_HOSTNAME") {
        config.shell.hostname = v;
    }
    if let Some(v) = opt_env("HONEYPY_SHELL_USERNAME") {
        config.shell.username = v;
    }
    if let Some(v) = opt_env("HONEYPY_SHELL_WORKING_DIR") {
        config.shell.working_dir = v;
    }

    // Limits
    config.limits.max_connections =
        parse_env("HONEYPY_MAX_CONNECTIONS", config.limits.max_connections);
    if let Some(v) = opt_env("HONEYPY_OVERFLOW") {
        config.limits.overflow = parse_overflow(&v)?;
    }
    config.limits.rate_limit_window_secs = parse_env(
        "HONEYPY_RATE_LIMIT_WINDOW",
        config.limits.rate_limit_window_secs,
    );
    config.limits.channel_timeout =
        parse_env("HONEYPY_CHANNEL_TIMEOUT", config.limits.channel_timeout);
    config.limits.rate_limit_cleanup_interval = parse_env(
        "HONEYPY_RATE_LIMIT_CLEANUP_INTERVAL",
        config.limits.rate_limit_cleanup_interval,
    );
    config.limits.rate_limit_stale_age = parse_env(
        "HONEYPY_RATE_LIMIT_STALE_AGE",
        config.limits.rate_limit_stale_age,
    );

    // Logging
    if let Some(v) = opt_env("HONEYPY_LOG_LEVEL") {
        config.logging.level = parse_log_level(&v)?;
    }
    if let Some(v) = opt_env("HONEYPY_LOG_FORMAT") {
        config.logging.format = parse_log_format(&v)?;
    }
    config.logging.audit_enabled =
        parse_bool_env("HONEYPY_AUDIT_ENABLED", config.logging.audit_enabled);
    if let Some(v) = opt_env("HONEYPY_AUDIT_DIR") {
        config.logging.audit_dir = PathBuf::from(v);
    }
    config.logging.audit_max_size_bytes = parse_env(
        "HONEYPY_AUDIT_MAX_SIZE_BYTES",
        config.logging.audit_max_size_bytes,
    );
    config.logging.audit_max_files =
        parse_env("HONEYPY_AUDIT_MAX_FILES", config.logging.audit_max_files);

    Ok(())
}

/// Passphrase for an encrypted host key.
/// `HONEYPY_SSH_KEY_PASSPHRASE` wins over the legacy `SSH_KEY_PASSPHRASE`.
pub fn host_key_passphrase() -> Option<String> {
    opt_env("HONEYPY_SSH_KEY_PASSPHRASE").or_else(|| opt_env("SSH_KEY_PASSPHRASE"))
}

fn opt_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn parse_env<T: std::str::FromStr + Copy>(key: &str, default: T) -> T {
    opt_env(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn parse_bool_env(key: &str, default: bool) -> bool {
    opt_env(key)
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}

pub(crate) fn parse_log_level(s: &str) -> anyhow::Result<LogLevel> {
    match s.to_ascii_lowercase().as_str() {
        "trace" => Ok(LogLevel::Trace),
        "debug" => Ok(LogLevel::Debug),
        "info" => Ok(LogLevel::Info),
        "warn" => Ok(LogLevel::Warn),
        "error" => Ok(LogLevel::Error),
        _ => anyhow::bail!("invalid log level: '{s}'"),
    }
}

fn parse_log_format(s: &str) -> anyhow::Result<LogFormat> {
    match s.to_ascii_lowercase().as_str() {
        "pretty" => Ok(LogFormat::Pretty),
        "json" => Ok(LogFormat::Json),
        _ => anyhow::bail!("invalid log format: '{s}'"),
    }
}

fn parse_overflow(s: &str) -> anyhow::Result<OverflowPolicy> {
    match s.to_ascii_lowercase().as_str() {
        "block" => Ok(OverflowPolicy::Block),
        "reject" => Ok(OverflowPolicy::Reject),
        _ => anyhow::bail!("invalid overflow policy: '{s}' (expected block or reject)"),
    }
}
