use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Log level enum (replaces stringly-typed field)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Pretty => write!(f, "pretty"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

/// What the acceptor does when every worker slot is taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// Hold the accepted connection until a slot frees up.
    #[default]
    Block,
    /// Drop the accepted connection immediately.
    Reject,
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverflowPolicy::Block => write!(f, "block"),
            OverflowPolicy::Reject => write!(f, "reject"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub shell: ShellConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default = "default_host_key_path")]
    pub host_key_path: PathBuf,
    /// Generate and persist an Ed25519 key when `host_key_path` does not exist
    #[serde(default = "default_true")]
    pub generate_host_key: bool,
    #[serde(default = "default_server_id")]
    pub server_id: String,
    /// Seconds to wait for in-flight sessions on shutdown
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            host_key_path: default_host_key_path(),
            generate_host_key: true,
            server_id: default_server_id(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0:2222".to_string()
}

fn default_host_key_path() -> PathBuf {
    PathBuf::from("server.key")
}

fn default_server_id() -> String {
    "SSH-2.0-OpenSSH_8.9p1 Ubuntu-3ubuntu0.6".to_string()
}

fn default_shutdown_timeout() -> u64 {
    10
}

/// Identity presented by the fake shell
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ShellConfig {
    #[serde(default = "default_hostname")]
    pub hostname: String,
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default = "default_working_dir")]
    pub working_dir: String,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            hostname: default_hostname(),
            username: default_username(),
            working_dir: default_working_dir(),
        }
    }
}

fn default_hostname() -> String {
    "corporate-jumpbox2".to_string()
}

fn default_username() -> String {
    "corpuser1".to_string()
}

fn default_working_dir() -> String {
    "/usr/local".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LimitsConfig {
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default)]
    pub overflow: OverflowPolicy,
    /// Minimum seconds between two accepted connections from one address (0 = off)
    #[serde(default = "default_rate_limit_window_secs")]
    pub rate_limit_window_secs: u64,
    /// Seconds a client has to open a session channel and request a shell
    #[serde(default = "default_channel_timeout")]
    pub channel_timeout: u64,
    #[serde(default = "default_rate_limit_cleanup_interval")]
    pub rate_limit_cleanup_interval: u64,
    /// Rate-limit entries older than this many seconds are swept
    #[serde(default = "default_rate_limit_stale_age")]
    pub rate_limit_stale_age: u64,
    /// Delay applied to rejected `none`/`publickey` probes
    #[serde(default = "default_auth_rejection_time_ms")]
    pub auth_rejection_time_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            overflow: OverflowPolicy::default(),
            rate_limit_window_secs: default_rate_limit_window_secs(),
            channel_timeout: default_channel_timeout(),
            rate_limit_cleanup_interval: default_rate_limit_cleanup_interval(),
            rate_limit_stale_age: default_rate_limit_stale_age(),
            auth_rejection_time_ms: default_auth_rejection_time_ms(),
        }
    }
}

fn default_max_connections() -> u32 {
    500
}

fn default_rate_limit_window_secs() -> u64 {
    2
}

fn default_channel_timeout() -> u64 {
    20
}

fn default_rate_limit_cleanup_interval() -> u64 {
    60
}

fn default_rate_limit_stale_age() -> u64 {
    600
}

fn default_auth_rejection_time_ms() -> u64 {
    1000
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: LogLevel,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    /// Write `creds_audit.log` and `cmd_audit.log` under `audit_dir`
    #[serde(default = "default_true")]
    pub audit_enabled: bool,
    #[serde(default = "default_audit_dir")]
    pub audit_dir: PathBuf,
    #[serde(default = "default_audit_max_size_bytes")]
    pub audit_max_size_bytes: u64,
    #[serde(default = "default_audit_max_files")]
    pub audit_max_files: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            audit_enabled: true,
            audit_dir: default_audit_dir(),
            audit_max_size_bytes: default_audit_max_size_bytes(),
            audit_max_files: default_audit_max_files(),
        }
    }
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

fn default_audit_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_audit_max_size_bytes() -> u64 {
    100_000
}

fn default_audit_max_files() -> u32 {
    5
}

fn default_true() -> bool {
    true
}
