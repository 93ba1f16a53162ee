use crate::config::types::OverflowPolicy;
use crate::context::AppContext;
use crate::ssh::session;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpSocket};
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Instrument};

const LISTEN_BACKLOG: u32 = 5;
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(250);
const DRAIN_LOG_INTERVAL: Duration = Duration::from_secs(5);

/// Bind the honeypot socket with address reuse and a short backlog.
/// Must be called from within a tokio runtime.
pub fn bind_listener(addr: &str) -> Result<TcpListener> {
    let addr: SocketAddr = addr
        .parse()
        .with_context(|| format!("invalid listen address: {}", addr))?;
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()
    } else {
        TcpSocket::new_v6()
    }
    .context("creating listening socket")?;
    socket
        .set_reuseaddr(true)
        .context("setting SO_REUSEADDR")?;
    socket
        .bind(addr)
        .with_context(|| format!("binding {}", addr))?;
    socket
        .listen(LISTEN_BACKLOG)
        .with_context(|| format!("listening on {}", addr))
}

/// Bounded pool of session slots. A permit is held for a session's lifetime.
pub struct ConnectionPool {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    overflow: OverflowPolicy,
}

impl ConnectionPool {
    pub fn new(capacity: usize, overflow: OverflowPolicy) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            overflow,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn overflow(&self) -> OverflowPolicy {
        self.overflow
    }

    /// Sessions currently holding a slot.
    pub fn active(&self) -> usize {
        self.capacity
            .saturating_sub(self.semaphore.available_permits())
    }

    /// Stop handing out slots. Sessions already running keep theirs.
    pub fn close(&self) {
        self.semaphore.close();
    }

    pub fn is_closed(&self) -> bool {
        self.semaphore.is_closed()
    }

    /// Get a slot according to the overflow policy.
    ///
    /// Returns `None` when the connection must be dropped: the pool is
    /// saturated under `Reject`, the pool was closed, or shutdown fired while
    /// waiting under `Block`.
    pub async fn acquire(&self, shutdown: &CancellationToken) -> Option<OwnedSemaphorePermit> {
        match self.overflow {
            OverflowPolicy::Block => {
                tokio::select! {
                    permit = self.semaphore.clone().acquire_owned() => permit.ok(),
                    _ = shutdown.cancelled() => None,
                }
            }
            OverflowPolicy::Reject => match self.semaphore.clone().try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(TryAcquireError::NoPermits) => None,
                Err(TryAcquireError::Closed) => None,
            },
        }
    }

    /// Wait for in-flight sessions to finish, at most `timeout`.
    /// Returns the number of sessions still running when it gave up.
    pub async fn drain(&self, timeout: Duration) -> usize {
        let deadline = tokio::time::Instant::now() + timeout;
        // log immediately on first iteration
        let mut last_log = tokio::time::Instant::now()
            .checked_sub(DRAIN_LOG_INTERVAL)
            .unwrap_or_else(tokio::time::Instant::now);
        loop {
            let active = self.active();
            if active == 0 {
                info!("All sessions drained");
                return 0;
            }
            if tokio::time::Instant::now() >= deadline {
                warn!(active_sessions = active, "Shutdown timeout reached, abandoning sessions");
                return active;
            }
            if last_log.elapsed() >= DRAIN_LOG_INTERVAL {
                info!(active_sessions = active, "Draining: {} sessions", active);
                last_log = tokio::time::Instant::now();
            }
            tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
        }
    }
}

/// Accept loop. Runs until `shutdown` is cancelled, then closes the pool and
/// drops the listening socket. In-flight sessions are left running.
pub async fn serve(
    listener: TcpListener,
    ctx: Arc<AppContext>,
    pool: Arc<ConnectionPool>,
    shutdown: CancellationToken,
) -> Result<()> {
    loop {
        let (stream, peer) = tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok(pair) => pair,
                Err(e) => {
                    error!(error = %e, "Accept failed");
                    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    continue;
                }
            },
        };

        let decision = ctx.rate_limiter.check_and_record(peer.ip());
        if !decision.is_allowed() {
            warn!(peer = %peer, "Rate limited connection");
            drop(stream);
            continue;
        }

        let Some(permit) = pool.acquire(&shutdown).await else {
            if shutdown.is_cancelled() || pool.is_closed() {
                debug!(peer = %peer, "Connection dropped during shutdown");
                break;
            }
            warn!(
                peer = %peer,
                capacity = pool.capacity(),
                "Connection rejected, session pool saturated"
            );
            drop(stream);
            continue;
        };

        let ctx = ctx.clone();
        let span = tracing::info_span!("ssh_session", peer = %peer);
        tokio::spawn(
            async move {
                let _permit = permit;
                if let Err(e) = session::handle_connection(stream, peer, ctx).await {
                    error!(peer = %peer, error = %e, "Session error");
                }
            }
            .instrument(span),
        );
    }

    pool.close();
    info!("Accept loop stopped");
    Ok(())
}
