use crate::context::AppContext;
use crate::shell::context::ShellState;
use crate::shell::{FakeShell, ShellError, ShellExit};
use crate::ssh::handler::HoneypotHandler;
use crate::utils::generate_correlation_id;

use anyhow::Result;
use russh::server::{Handle, Msg};
use russh::{Channel, ChannelId, Disconnect};
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Upper bound on how long teardown waits for the disconnect to flush.
pub const TEARDOWN_GRACE: Duration = Duration::from_secs(2);

/// Lifecycle of one attacker connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Negotiating,
    Authenticating,
    ShellActive,
    Closing,
    Closed,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionState::Negotiating => "negotiating",
            SessionState::Authenticating => "authenticating",
            SessionState::ShellActive => "shell_active",
            SessionState::Closing => "closing",
            SessionState::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Bookkeeping for one accepted connection, owned by the task serving it.
#[derive(Debug)]
pub struct Session {
    peer: SocketAddr,
    conn_id: String,
    state: SessionState,
    started_at: Instant,
}

impl Session {
    pub fn new(peer: SocketAddr) -> Self {
        Self::with_conn_id(peer, generate_correlation_id())
    }

    pub fn with_conn_id(peer: SocketAddr, conn_id: impl Into<String>) -> Self {
        Self {
            peer,
            conn_id: conn_id.into(),
            state: SessionState::Negotiating,
            started_at: Instant::now(),
        }
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn conn_id(&self) -> &str {
        &self.conn_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Move to `next`. States only ever advance; a backwards move is ignored.
    pub fn transition(&mut self, next: SessionState) {
        if (next as u8) <= (self.state as u8) {
            return;
        }
        debug!(conn_id = %self.conn_id, from = %self.state, to = %next, "Session state change");
        self.state = next;
    }
}

/// Serve one accepted connection from handshake to teardown.
///
/// Per-connection failures are logged here and never returned; the `Result`
/// is reserved for errors the caller should see.
pub async fn handle_connection<S>(stream: S, peer: SocketAddr, ctx: Arc<AppContext>) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let mut session = Session::new(peer);
    info!(peer = %peer, conn_id = %session.conn_id(), "New SSH connection");

    let (shell_tx, shell_rx) = oneshot::channel::<Channel<Msg>>();
    let handler = HoneypotHandler::new(ctx.audit.clone(), peer, session.conn_id(), shell_tx);

    let running = match russh::server::run_stream(ctx.ssh_config.clone(), stream, handler).await {
        Ok(running) => running,
        Err(e) => {
            warn!(peer = %peer, conn_id = %session.conn_id(), error = %e, "SSH handshake failed");
            session.transition(SessionState::Closed);
            return Ok(());
        }
    };
    session.transition(SessionState::Authenticating);

    let handle = running.handle();
    let mut running = std::pin::pin!(running);
    let channel_timeout = Duration::from_secs(ctx.config.limits.channel_timeout);

    let channel = tokio::select! {
        result = &mut running => {
            if let Err(e) = result {
                debug!(conn_id = %session.conn_id(), error = %e, "Transport error before shell");
            }
            info!(peer = %peer, conn_id = %session.conn_id(), "Connection closed before shell request");
            session.transition(SessionState::Closed);
            return Ok(());
        }
        waited = tokio::time::timeout(channel_timeout, shell_rx) => match waited {
            Ok(Ok(channel)) => channel,
            Ok(Err(_)) => {
                debug!(conn_id = %session.conn_id(), "Handler dropped before shell request");
                close_session(&mut session, &handle, None, running.as_mut()).await;
                return Ok(());
            }
            Err(_) => {
                warn!(
                    peer = %peer,
                    conn_id = %session.conn_id(),
                    timeout_secs = channel_timeout.as_secs(),
                    "No shell channel requested in time, aborting"
                );
                close_session(&mut session, &handle, None, running.as_mut()).await;
                return Ok(());
            }
        }
    };

    session.transition(SessionState::ShellActive);
    let channel_id = channel.id();
    let mut channel_stream = channel.into_stream();
    let mut shell = FakeShell::new(
        ShellState::from_config(&ctx.config.shell),
        ctx.audit.clone(),
        peer,
        session.conn_id(),
    );

    let shell_result = tokio::select! {
        result = shell.run(&mut channel_stream) => Some(result),
        _ = &mut running => None,
    };

    match shell_result {
        Some(Ok(ShellExit::Logout)) => {
            info!(peer = %peer, conn_id = %session.conn_id(), "Shell exited");
        }
        Some(Ok(ShellExit::PeerClosed)) => {
            info!(peer = %peer, conn_id = %session.conn_id(), "Shell channel closed by peer");
        }
        Some(Err(e)) => log_shell_error(&session, &e),
        None => {
            info!(peer = %peer, conn_id = %session.conn_id(), "Transport closed during shell");
            drop(channel_stream);
            session.transition(SessionState::Closing);
            session.transition(SessionState::Closed);
            return Ok(());
        }
    }

    drop(channel_stream);
    close_session(&mut session, &handle, Some(channel_id), running.as_mut()).await;
    Ok(())
}

fn log_shell_error(session: &Session, e: &ShellError) {
    let source = std::error::Error::source(e)
        .map(|s| s.to_string())
        .unwrap_or_default();
    warn!(
        peer = %session.peer(),
        conn_id = %session.conn_id(),
        error = %e,
        reason = %source,
        "Shell terminated by I/O error"
    );
}

/// Close the channel, disconnect the transport, then give the transport task
/// a bounded grace period to finish. Secondary errors are ignored.
async fn close_session<F>(
    session: &mut Session,
    handle: &Handle,
    channel: Option<ChannelId>,
    running: Pin<&mut F>,
) where
    F: Future,
{
    session.transition(SessionState::Closing);
    if let Some(id) = channel {
        let _ = handle.close(id).await;
    }
    let _ = handle
        .disconnect(
            Disconnect::ByApplication,
            "Connection closed".to_string(),
            "en".to_string(),
        )
        .await;
    await_transport(running, TEARDOWN_GRACE, session.conn_id()).await;
    session.transition(SessionState::Closed);
    info!(
        peer = %session.peer(),
        conn_id = %session.conn_id(),
        duration_ms = session.elapsed().as_millis() as u64,
        "Session closed"
    );
}

/// Wait up to `grace` for the transport to finish. Returns `false` when it
/// did not: russh spawns the transport task and offers no way to abort it, so
/// it keeps running detached after the session slot is released.
async fn await_transport<F>(running: Pin<&mut F>, grace: Duration, conn_id: &str) -> bool
where
    F: Future,
{
    if tokio::time::timeout(grace, running).await.is_err() {
        warn!(
            conn_id = %conn_id,
            grace_ms = grace.as_millis() as u64,
            "Transport still running after teardown grace, detaching"
        );
        return false;
    }
    true
}
