use crate::config::types::AppConfig;
use clap::{Args, Parser, Subcommand};
use std::ffi::OsString;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "honeypy",
    version,
    about = "Low-interaction SSH honeypot that records credentials and shell commands"
)]
pub struct Cli {
    /// Path to configuration file (also settable via HONEYPY_CONFIG env var)
    #[arg(short, long, env = "HONEYPY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Bind address override
    #[arg(short, long)]
    pub address: Option<String>,

    /// Bind port override
    #[arg(short, long)]
    pub port: Option<u16>,

    #[command(flatten)]
    pub mode: ModeArgs,

    /// Username for the HTTP honeypot
    #[arg(short, long, default_value = "admin")]
    pub username: String,

    /// Password for the HTTP honeypot
    #[arg(short = 'w', long, default_value = "deeboodah")]
    pub password: String,

    /// Enable tarpit mode (accepted for compatibility; has no effect)
    #[arg(short, long)]
    pub tarpit: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Args, Debug, Default)]
#[group(multiple = false)]
pub struct ModeArgs {
    /// Run the SSH honeypot (the default)
    #[arg(short, long)]
    pub ssh: bool,

    /// Run the HTTP honeypot
    #[arg(long, alias = "wh")]
    pub http: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Ssh,
    Http,
}

impl ModeArgs {
    pub fn mode(&self) -> Mode {
        if self.http {
            Mode::Http
        } else {
            Mode::Ssh
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate configuration and print a summary
    CheckConfig,
    /// Generate a new Ed25519 host key
    GenerateKey {
        /// Output file path (defaults to server.host_key_path)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Legacy single-dash spelling of `--http`. Without rewriting, clap reads it
/// as `-w h` (password "h").
const LEGACY_HTTP_FLAG: &str = "-wh";

/// Rewrite legacy argv tokens into their clap spelling. Only whole tokens are
/// touched, so `-w wh` still sets the password to "wh".
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut out = Vec::new();
    let mut expects_value = false;
    for arg in args {
        let arg: OsString = arg.into();
        if !expects_value && arg == LEGACY_HTTP_FLAG {
            out.push(OsString::from("--http"));
            continue;
        }
        expects_value = arg == "-w" || arg == "--password";
        out.push(arg);
    }
    out
}

impl Cli {
    /// Parse the process arguments, accepting the legacy `-wh` flag.
    pub fn parse_normalized() -> Self {
        Self::parse_from(normalize_args(std::env::args_os()))
    }

    /// Apply `--address`, `--port` and `--log-level` on top of `config`.
    ///
    /// A bare `--port` keeps the configured host; a bare `--address` keeps the
    /// configured port.
    pub fn apply_overrides(&self, config: &mut AppConfig) -> anyhow::Result<()> {
        if self.address.is_some() || self.port.is_some() {
            let (current_host, current_port) = split_host_port(&config.server.listen)?;
            let host = self.address.as_deref().unwrap_or(current_host);
            let port = self.port.unwrap_or(current_port);
            config.server.listen = join_host_port(host, port);
        }
        // Filter directives such as "honeypy=debug" are valid here but are
        // not a single level; those only reach the subscriber.
        if let Some(level) = self
            .log_level
            .as_deref()
            .and_then(|l| crate::config::env::parse_log_level(l).ok())
        {
            config.logging.level = level;
        }
        Ok(())
    }

    /// Build the effective configuration: defaults, then the config file
    /// (if any), then `HONEYPY_*` environment variables, then CLI flags.
    pub fn resolve_config(&self) -> anyhow::Result<AppConfig> {
        let mut config = match self.config {
            Some(ref path) => crate::config::load_config(path)?,
            None => AppConfig::default(),
        };
        crate::config::env::apply_env_overrides(&mut config)?;
        self.apply_overrides(&mut config)?;
        crate::config::validate_config(&config)?;
        Ok(config)
    }

    /// Effective tracing filter: the raw `--log-level` string wins over the config.
    pub fn log_filter(&self, config: &AppConfig) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config.logging.level.to_string())
    }
}

fn split_host_port(listen: &str) -> anyhow::Result<(&str, u16)> {
    let (host, port) = listen
        .rsplit_once(':')
        .ok_or_else(|| anyhow::anyhow!("listen address has no port: {}", listen))?;
    let port = port
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid port in listen address: {}", listen))?;
    Ok((host.trim_start_matches('[').trim_end_matches(']'), port))
}

fn join_host_port(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}
