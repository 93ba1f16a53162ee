use anyhow::Result;
use tracing::{error, info, warn};

use honeypy::cli::{Cli, Command, Mode};
use honeypy::ssh::keys;

fn main() -> Result<()> {
    let env_file = honeypy::config::env::load_dotenv();
    let cli = Cli::parse_normalized();

    match &cli.command {
        Some(Command::CheckConfig) => {
            let cfg = cli.resolve_config()?;
            println!("Configuration is valid.");
            println!("  Listen:          {}", cfg.server.listen);
            println!("  Server ID:       {}", cfg.server.server_id);
            println!("  Host key:        {}", cfg.server.host_key_path.display());
            println!(
                "  Shell identity:  {}@{}:{}",
                cfg.shell.username, cfg.shell.hostname, cfg.shell.working_dir
            );
            println!(
                "  Limits:          {} sessions ({}), {}s rate-limit window",
                cfg.limits.max_connections, cfg.limits.overflow, cfg.limits.rate_limit_window_secs
            );
            if cfg.logging.audit_enabled {
                println!("  Audit dir:       {}", cfg.logging.audit_dir.display());
            } else {
                println!("  Audit dir:       (disabled)");
            }
            return Ok(());
        }
        Some(Command::GenerateKey { output }) => {
            let path = match output {
                Some(p) => p.clone(),
                None => cli.resolve_config()?.server.host_key_path,
            };
            if path.exists() {
                anyhow::bail!("refusing to overwrite existing key: {}", path.display());
            }
            let key = keys::generate_host_key()?;
            keys::save_host_key(&key, &path)?;
            eprintln!("Ed25519 host key written to {}", path.display());
            return Ok(());
        }
        None => {}
    }

    let app_config = match cli.resolve_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    honeypy::logging::setup_logging(&cli.log_filter(&app_config), app_config.logging.format);

    if let Some(path) = &env_file {
        info!(path = %path.display(), "Environment loaded from env file");
    }

    if cli.tarpit {
        info!("Tarpit mode requested; it is accepted but has no effect");
    }

    if cli.mode.mode() == Mode::Http {
        info!(
            listen = %app_config.server.listen,
            user = %cli.username,
            "HTTP honeypot requested"
        );
        warn!("HTTP honeypot is not available in this build, exiting");
        return Ok(());
    }

    match cli.config.as_deref() {
        Some(path) => info!(path = %path.display(), "Configuration loaded"),
        None => info!("No config file given, using defaults and environment"),
    }
    info!(
        version = env!("CARGO_PKG_VERSION"),
        listen = %app_config.server.listen,
        "Starting honeypy SSH honeypot"
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        if let Err(e) = honeypy::server::run(app_config).await {
            error!(error = %e, "Server error");
            std::process::exit(1);
        }
    });

    Ok(())
}
