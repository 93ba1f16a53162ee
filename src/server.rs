use crate::audit::AuditLogger;
use crate::config;
use crate::config::types::AppConfig;
use crate::context::AppContext;
use crate::security::rate_limit::{self, ConnectionRateLimiter, RateLimitCleanupConfig};
use crate::ssh::listener::{self, ConnectionPool};
use crate::ssh::{self, keys};

use anyhow::Result;
use russh::keys::PrivateKey;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Instrument};

/// A bound, ready-to-run honeypot.
///
/// Binding is separate from running so callers can learn the local address
/// (e.g. after binding port 0) before any connection is accepted.
pub struct HoneypotServer {
    ctx: Arc<AppContext>,
    listener: TcpListener,
    pool: Arc<ConnectionPool>,
}

impl HoneypotServer {
    /// Load the host key, open the audit sink and bind the listener, all from `config`.
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let passphrase = config::env::host_key_passphrase();
        let host_key = keys::load_or_generate_host_key(
            &config.server.host_key_path,
            passphrase.as_deref(),
            config.server.generate_host_key,
        )?;
        info!(path = %config.server.host_key_path.display(), "Host key loaded");

        let audit = if config.logging.audit_enabled {
            AuditLogger::new(
                &config.logging.audit_dir,
                config.logging.audit_max_size_bytes,
                config.logging.audit_max_files,
            )
        } else {
            AuditLogger::in_memory()
        };
        let rate_limiter =
            ConnectionRateLimiter::new(Duration::from_secs(config.limits.rate_limit_window_secs));

        Self::new(config, host_key, Arc::new(audit), Arc::new(rate_limiter))
    }

    /// Assemble a server from already-built parts.
    pub fn new(
        config: AppConfig,
        host_key: PrivateKey,
        audit: Arc<AuditLogger>,
        rate_limiter: Arc<ConnectionRateLimiter>,
    ) -> Result<Self> {
        let ssh_config = Arc::new(ssh::build_ssh_config(&config, host_key));
        let listener = listener::bind_listener(&config.server.listen)?;
        let pool = Arc::new(ConnectionPool::new(
            config.limits.max_connections as usize,
            config.limits.overflow,
        ));
        let ctx = Arc::new(AppContext {
            config: Arc::new(config),
            audit,
            rate_limiter,
            ssh_config,
            start_time: Instant::now(),
        });
        Ok(Self {
            ctx,
            listener,
            pool,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn context(&self) -> Arc<AppContext> {
        self.ctx.clone()
    }

    /// Accept connections until `shutdown` is cancelled, then wait up to
    /// `server.shutdown_timeout` seconds for in-flight sessions.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        let HoneypotServer {
            ctx,
            listener,
            pool,
        } = self;
        let config = ctx.config.clone();
        let addr = listener.local_addr()?;

        let cleanup = rate_limit::spawn_cleanup_task(
            ctx.rate_limiter.clone(),
            RateLimitCleanupConfig {
                cleanup_interval_secs: config.limits.rate_limit_cleanup_interval,
                max_stale_age: Duration::from_secs(config.limits.rate_limit_stale_age),
            },
            shutdown.clone(),
        );

        info!(
            addr = %addr,
            max_connections = config.limits.max_connections,
            overflow = %config.limits.overflow,
            "SSH honeypot listening"
        );

        let trace_id = uuid::Uuid::new_v4().to_string();
        let span = tracing::info_span!("ssh_listener", trace_id = %trace_id, addr = %addr);
        let accept_result = listener::serve(listener, ctx.clone(), pool.clone(), shutdown.clone())
            .instrument(span)
            .await;
        if let Err(ref e) = accept_result {
            error!(error = %e, "Accept loop failed");
        }

        // The accept loop only stops on shutdown; make sure the sweeper stops too.
        shutdown.cancel();
        let shutdown_timeout = config.server.shutdown_timeout;
        info!(timeout = shutdown_timeout, "Initiating graceful shutdown");
        pool.drain(Duration::from_secs(shutdown_timeout)).await;
        let _ = cleanup.await;

        info!(
            uptime_secs = ctx.start_time.elapsed().as_secs(),
            "Graceful shutdown complete"
        );
        accept_result
    }
}

/// Main server orchestrator: bind, install signal handlers, run to shutdown.
pub async fn run(config: AppConfig) -> Result<()> {
    let server = HoneypotServer::from_config(config)?;
    let shutdown = CancellationToken::new();
    tokio::spawn(handle_signals(shutdown.clone()));
    server.run(shutdown).await
}

#[cfg(unix)]
async fn handle_signals(shutdown: CancellationToken) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "Failed to install SIGTERM handler");
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => {
            info!("SIGTERM received, initiating graceful shutdown");
        }
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!(error = %e, "Failed to listen for SIGINT");
                return;
            }
            info!("SIGINT received, initiating graceful shutdown");
        }
        _ = shutdown.cancelled() => return,
    }
    shutdown.cancel();
}

#[cfg(not(unix))]
async fn handle_signals(shutdown: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Ctrl-C received, initiating graceful shutdown");
        shutdown.cancel();
    }
}
