pub mod env;
pub mod types;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::path::Path;
use types::AppConfig;

/// Maximum config file size (1 MB)
const MAX_CONFIG_SIZE: u64 = 1_048_576;

/// Load and validate configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("reading config metadata: {}", path.display()))?;
    if metadata.len() > MAX_CONFIG_SIZE {
        anyhow::bail!(
            "config file too large: {} bytes (max {} bytes)",
            metadata.len(),
            MAX_CONFIG_SIZE
        );
    }

    check_config_file_permissions(path);

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading config: {}", path.display()))?;
    parse_config(&content)
}

/// On Unix, warn if the config file is readable by group or others.
#[cfg(unix)]
fn check_config_file_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    match std::fs::metadata(path) {
        Ok(meta) => {
            let mode = meta.permissions().mode();
            if mode & 0o077 != 0 {
                tracing::warn!(
                    path = %path.display(),
                    mode = format!("{:04o}", mode & 0o7777),
                    "Config file is readable by group/others. \
                     Consider restricting permissions to 0600."
                );
            }
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Could not check config file permissions"
            );
        }
    }
}

#[cfg(not(unix))]
fn check_config_file_permissions(_path: &Path) {}

/// Parse configuration from a TOML string
pub fn parse_config(content: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(content).context("parsing TOML configuration")?;
    validate_config(&config)?;
    Ok(config)
}

/// Validate an already-constructed AppConfig (e.g. after env and CLI overrides).
pub fn validate_config(config: &AppConfig) -> Result<()> {
    validate_server(config)?;
    validate_shell(config)?;
    validate_limits(config)?;
    validate_logging(config)?;
    Ok(())
}

fn validate_server(config: &AppConfig) -> Result<()> {
    config
        .server
        .listen
        .parse::<SocketAddr>()
        .with_context(|| format!("server.listen is not a socket address: {}", config.server.listen))?;
    if !config.server.server_id.starts_with("SSH-2.0-") {
        anyhow::bail!(
            "server.server_id must start with 'SSH-2.0-' (got '{}')",
            config.server.server_id
        );
    }
    if config.server.host_key_path.as_os_str().is_empty() {
        anyhow::bail!("server.host_key_path must not be empty");
    }
    Ok(())
}

fn validate_shell(config: &AppConfig) -> Result<()> {
    if config.shell.hostname.trim().is_empty() {
        anyhow::bail!("shell.hostname must not be empty");
    }
    if config.shell.username.trim().is_empty() {
        anyhow::bail!("shell.username must not be empty");
    }
    if !config.shell.working_dir.starts_with('/') {
        anyhow::bail!(
            "shell.working_dir must be an absolute path (got '{}')",
            config.shell.working_dir
        );
    }
    Ok(())
}

fn validate_limits(config: &AppConfig) -> Result<()> {
    if config.limits.max_connections == 0 {
        anyhow::bail!("limits.max_connections must be > 0");
    }
    if config.limits.channel_timeout == 0 {
        anyhow::bail!("limits.channel_timeout must be > 0");
    }
    if config.limits.rate_limit_cleanup_interval == 0 {
        anyhow::bail!("limits.rate_limit_cleanup_interval must be > 0");
    }
    if config.limits.rate_limit_stale_age < config.limits.rate_limit_window_secs {
        anyhow::bail!(
            "limits.rate_limit_stale_age ({}) must be >= limits.rate_limit_window_secs ({})",
            config.limits.rate_limit_stale_age,
            config.limits.rate_limit_window_secs
        );
    }
    Ok(())
}

fn validate_logging(config: &AppConfig) -> Result<()> {
    if config.logging.audit_enabled && config.logging.audit_dir.as_os_str().is_empty() {
        anyhow::bail!("logging.audit_dir must not be empty when audit is enabled");
    }
    Ok(())
}
