use crate::audit::AuditLogger;
use crate::utils::sanitize_for_log;
use std::net::SocketAddr;
use std::sync::Arc;

use russh::server::{Auth, Msg, Session};
use russh::{Channel, ChannelId, MethodKind, MethodSet};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

fn password_only() -> MethodSet {
    MethodSet::from([MethodKind::Password].as_slice())
}

/// Per-connection russh handler.
///
/// Every password is accepted after it has been written to the audit sink.
/// The first session channel that asks for a shell is handed to the session
/// driver through `shell_tx`; everything else is refused.
pub struct HoneypotHandler {
    audit: Arc<AuditLogger>,
    peer_addr: SocketAddr,
    conn_id: String,
    auth_attempts: u32,
    pending: Option<Channel<Msg>>,
    shell_tx: Option<oneshot::Sender<Channel<Msg>>>,
}

impl HoneypotHandler {
    pub fn new(
        audit: Arc<AuditLogger>,
        peer_addr: SocketAddr,
        conn_id: impl Into<String>,
        shell_tx: oneshot::Sender<Channel<Msg>>,
    ) -> Self {
        Self {
            audit,
            peer_addr,
            conn_id: conn_id.into(),
            auth_attempts: 0,
            pending: None,
            shell_tx: Some(shell_tx),
        }
    }

    pub fn conn_id(&self) -> &str {
        &self.conn_id
    }

    pub fn auth_attempts(&self) -> u32 {
        self.auth_attempts
    }

    /// Record a credential pair and accept it.
    pub async fn capture_password(&mut self, user: &str, password: &str) -> Auth {
        self.auth_attempts += 1;
        if let Err(e) = self
            .audit
            .log_credential_attempt(user, password, &self.peer_addr, &self.conn_id)
            .await
        {
            error!(conn_id = %self.conn_id, error = %e, "Failed to record credential attempt");
        }
        info!(
            conn_id = %self.conn_id,
            peer = %self.peer_addr,
            user = %sanitize_for_log(user, 64),
            attempt = self.auth_attempts,
            "Credential captured"
        );
        Auth::Accept
    }
}

impl russh::server::Handler for HoneypotHandler {
    type Error = anyhow::Error;

    async fn auth_none(&mut self, user: &str) -> Result<Auth, Self::Error> {
        debug!(conn_id = %self.conn_id, user = %sanitize_for_log(user, 64), "auth_none rejected");
        Ok(Auth::Reject {
            proceed_with_methods: Some(password_only()),
            partial_success: false,
        })
    }

    async fn auth_password(&mut self, user: &str, password: &str) -> Result<Auth, Self::Error> {
        Ok(self.capture_password(user, password).await)
    }

    async fn auth_publickey(
        &mut self,
        user: &str,
        _public_key: &russh::keys::PublicKey,
    ) -> Result<Auth, Self::Error> {
        debug!(conn_id = %self.conn_id, user = %sanitize_for_log(user, 64), "Public key auth rejected");
        Ok(Auth::Reject {
            proceed_with_methods: Some(password_only()),
            partial_success: false,
        })
    }

    async fn channel_open_session(
        &mut self,
        channel: Channel<Msg>,
        _session: &mut Session,
    ) -> Result<bool, Self::Error> {
        if self.pending.is_some() || self.shell_tx.is_none() {
            warn!(conn_id = %self.conn_id, peer = %self.peer_addr, "Extra session channel refused");
            return Ok(false);
        }
        debug!(conn_id = %self.conn_id, channel = ?channel.id(), "Session channel opened");
        self.pending = Some(channel);
        Ok(true)
    }

    async fn pty_request(
        &mut self,
        channel: ChannelId,
        term: &str,
        col_width: u32,
        row_height: u32,
        _pix_width: u32,
        _pix_height: u32,
        _modes: &[(russh::Pty, u32)],
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        debug!(
            conn_id = %self.conn_id,
            term = %sanitize_for_log(term, 32),
            cols = col_width,
            rows = row_height,
            "PTY requested"
        );
        let _ = session.channel_success(channel);
        Ok(())
    }

    async fn shell_request(
        &mut self,
        channel: ChannelId,
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        let is_pending = self.pending.as_ref().map(|c| c.id()) == Some(channel);
        let (Some(open), Some(tx)) = (
            self.pending.take().filter(|_| is_pending),
            self.shell_tx.take(),
        ) else {
            warn!(conn_id = %self.conn_id, channel = ?channel, "Shell request refused");
            let _ = session.channel_failure(channel);
            return Ok(());
        };

        let _ = session.channel_success(channel);
        if tx.send(open).is_err() {
            debug!(conn_id = %self.conn_id, "Session driver gone before shell start");
        }
        Ok(())
    }

    async fn exec_request(
        &mut self,
        channel: ChannelId,
        data: &[u8],
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        warn!(
            conn_id = %self.conn_id,
            peer = %self.peer_addr,
            command = %sanitize_for_log(&String::from_utf8_lossy(data), 256),
            "Exec request refused"
        );
        let _ = session.channel_failure(channel);
        Ok(())
    }

    async fn subsystem_request(
        &mut self,
        channel: ChannelId,
        name: &str,
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        warn!(
            conn_id = %self.conn_id,
            peer = %self.peer_addr,
            subsystem = %sanitize_for_log(name, 64),
            "Subsystem request refused"
        );
        let _ = session.channel_failure(channel);
        Ok(())
    }
}
