pub mod commands;
pub mod context;
pub mod terminal;

use crate::audit::AuditLogger;
use crate::utils::sanitize_for_log;
use commands::{CommandOutcome, StateChange};
use context::ShellState;
use std::net::SocketAddr;
use std::sync::Arc;
use terminal::{decode_line, KeyAction, LineEditor};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info};

const READ_CHUNK: usize = 1024;

/// Why the shell loop stopped running.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("reading from channel")]
    Read(#[source] std::io::Error),
    #[error("writing to channel")]
    Write(#[source] std::io::Error),
}

/// How a shell loop that did not fail came to an end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellExit {
    /// The attacker typed `exit`.
    Logout,
    /// The channel reached EOF.
    PeerClosed,
}

/// Fake interactive shell bound to one connection.
///
/// Every submitted line is recorded in the audit sink (awaited) before it is
/// evaluated, including blank lines.
pub struct FakeShell {
    editor: LineEditor,
    state: ShellState,
    audit: Arc<AuditLogger>,
    peer: SocketAddr,
    conn_id: String,
}

impl FakeShell {
    pub fn new(
        state: ShellState,
        audit: Arc<AuditLogger>,
        peer: SocketAddr,
        conn_id: impl Into<String>,
    ) -> Self {
        Self {
            editor: LineEditor::new(),
            state,
            audit,
            peer,
            conn_id: conn_id.into(),
        }
    }

    pub fn state(&self) -> &ShellState {
        &self.state
    }

    /// Drive the shell over `stream` until `exit`, EOF, or an I/O error.
    /// The initial prompt is sent before any input is read.
    pub async fn run<S>(&mut self, stream: &mut S) -> Result<ShellExit, ShellError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let prompt = self.state.prompt();
        write_all(stream, prompt.as_bytes()).await?;

        let mut buf = [0u8; READ_CHUNK];
        loop {
            let n = stream.read(&mut buf).await.map_err(ShellError::Read)?;
            if n == 0 {
                debug!(conn_id = %self.conn_id, peer = %self.peer, "Shell input closed");
                return Ok(ShellExit::PeerClosed);
            }
            for &byte in &buf[..n] {
                if self.handle_byte(stream, byte).await? == Some(ShellExit::Logout) {
                    return Ok(ShellExit::Logout);
                }
            }
        }
    }

    async fn handle_byte<S>(
        &mut self,
        stream: &mut S,
        byte: u8,
    ) -> Result<Option<ShellExit>, ShellError>
    where
        S: AsyncWrite + Unpin,
    {
        match self.editor.process_byte(byte) {
            KeyAction::Echo(bytes) => {
                if !bytes.is_empty() {
                    write_all(stream, &bytes).await?;
                }
                Ok(None)
            }
            KeyAction::Interrupt => {
                let mut out = b"^C\n".to_vec();
                out.extend_from_slice(self.state.prompt().as_bytes());
                write_all(stream, &out).await?;
                Ok(None)
            }
            KeyAction::Submit { echo, line } => {
                write_all(stream, &echo).await?;
                let line = decode_line(&line);
                let outcome = self.evaluate(&line).await;

                if !outcome.output.is_empty() {
                    write_all(stream, outcome.output.as_bytes()).await?;
                }
                if outcome.is_exit() {
                    info!(conn_id = %self.conn_id, peer = %self.peer, "Attacker logged out");
                    return Ok(Some(ShellExit::Logout));
                }
                let prompt = self.state.prompt();
                write_all(stream, prompt.as_bytes()).await?;
                Ok(None)
            }
        }
    }

    /// Record `line`, then dispatch it and apply its effect to the session state.
    pub async fn evaluate(&mut self, line: &str) -> CommandOutcome {
        let command_kind = commands::classify(line).map_or("unknown", |kind| kind.name());
        info!(
            conn_id = %self.conn_id,
            peer = %self.peer,
            command = %sanitize_for_log(line, 256),
            command_kind,
            "Command captured"
        );
        if let Err(e) = self
            .audit
            .log_command(line, &self.peer, &self.conn_id)
            .await
        {
            error!(conn_id = %self.conn_id, error = %e, "Failed to record command");
        }

        let outcome = commands::dispatch(line, &self.state);
        if let StateChange::SetCwd(ref path) = outcome.effect {
            self.state.cwd = path.clone();
        }
        outcome
    }
}

async fn write_all<S>(stream: &mut S, bytes: &[u8]) -> Result<(), ShellError>
where
    S: AsyncWrite + Unpin,
{
    stream.write_all(bytes).await.map_err(ShellError::Write)?;
    stream.flush().await.map_err(ShellError::Write)
}
