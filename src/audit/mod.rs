pub mod events;

use anyhow::{Context, Result};
use events::{AuditEvent, AuditStream};
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error};

const RECENT_EVENTS_CAPACITY: usize = 100;

pub const CREDENTIALS_LOG: &str = "creds_audit.log";
pub const COMMANDS_LOG: &str = "cmd_audit.log";

/// Append-only audit sink for captured credentials and commands.
///
/// Every record is serialized to a single JSON line, written and flushed
/// before the `log_*` future resolves. Callers await it before moving on
/// to the next protocol step, so a record is never lost to back-pressure.
pub struct AuditLogger {
    credentials: Option<AuditFile>,
    commands: Option<AuditFile>,
    recent_events: Mutex<VecDeque<AuditEvent>>,
}

impl AuditLogger {
    /// File-backed logger writing `creds_audit.log` and `cmd_audit.log` under `dir`.
    pub fn new(dir: &Path, max_size_bytes: u64, max_files: u32) -> Self {
        Self {
            credentials: Some(AuditFile::new(
                dir.join(CREDENTIALS_LOG),
                max_size_bytes,
                max_files,
            )),
            commands: Some(AuditFile::new(
                dir.join(COMMANDS_LOG),
                max_size_bytes,
                max_files,
            )),
            recent_events: Mutex::new(VecDeque::with_capacity(RECENT_EVENTS_CAPACITY)),
        }
    }

    /// Logger that only keeps the in-memory ring buffer (tests, audit disabled).
    pub fn in_memory() -> Self {
        Self {
            credentials: None,
            commands: None,
            recent_events: Mutex::new(VecDeque::with_capacity(RECENT_EVENTS_CAPACITY)),
        }
    }

    pub async fn log_credential_attempt(
        &self,
        username: &str,
        password: &str,
        source: &SocketAddr,
        cid: &str,
    ) -> Result<()> {
        let event = AuditEvent::credential_attempt(username, password, source, cid);
        self.log_event(event).await
    }

    pub async fn log_command(&self, command: &str, source: &SocketAddr, cid: &str) -> Result<()> {
        let event = AuditEvent::command_record(command, source, cid);
        self.log_event(event).await
    }

    pub async fn log_event(&self, event: AuditEvent) -> Result<()> {
        self.remember(&event);
        let json = serde_json::to_string(&event).context("serializing audit event")?;
        debug!(event = %json, "Audit event");

        let sink = match event.stream() {
            AuditStream::Credentials => self.credentials.as_ref(),
            AuditStream::Commands => self.commands.as_ref(),
        };
        match sink {
            Some(file) => file.append_line(&json).await,
            None => Ok(()),
        }
    }

    /// Return the most recent audit events (up to `max`), newest last.
    pub fn get_recent_events(&self, max: usize) -> Vec<AuditEvent> {
        let buf = self.recent_events.lock().unwrap_or_else(|e| e.into_inner());
        let skip = buf.len().saturating_sub(max);
        buf.iter().skip(skip).cloned().collect()
    }

    pub fn credentials_path(&self) -> Option<&Path> {
        self.credentials.as_ref().map(|f| f.path.as_path())
    }

    pub fn commands_path(&self) -> Option<&Path> {
        self.commands.as_ref().map(|f| f.path.as_path())
    }

    fn remember(&self, event: &AuditEvent) {
        let mut buf = self.recent_events.lock().unwrap_or_else(|e| e.into_inner());
        if buf.len() >= RECENT_EVENTS_CAPACITY {
            buf.pop_front();
        }
        buf.push_back(event.clone());
    }
}

/// One size-rotated JSON-lines file. The lock serializes writers so lines
/// from concurrent sessions never interleave.
struct AuditFile {
    path: PathBuf,
    max_size_bytes: u64,
    max_files: u32,
    writer: tokio::sync::Mutex<Option<OpenFile>>,
}

struct OpenFile {
    file: tokio::fs::File,
    size: u64,
}

impl AuditFile {
    fn new(path: PathBuf, max_size_bytes: u64, max_files: u32) -> Self {
        Self {
            path,
            max_size_bytes,
            max_files,
            writer: tokio::sync::Mutex::new(None),
        }
    }

    async fn append_line(&self, json: &str) -> Result<()> {
        let mut guard = self.writer.lock().await;
        if guard.is_none() {
            *guard = Some(self.open().await?);
        }
        let Some(open) = guard.as_mut() else {
            return Ok(());
        };

        let line = format!("{}\n", json);
        let written = open.file.write_all(line.as_bytes()).await;
        if let Err(e) = written {
            // Reopen on the next write in case the file was moved underneath us.
            *guard = None;
            return Err(e).with_context(|| format!("writing audit log: {}", self.path.display()));
        }
        open.file
            .flush()
            .await
            .with_context(|| format!("flushing audit log: {}", self.path.display()))?;
        open.size += line.len() as u64;

        if self.max_size_bytes > 0 && open.size >= self.max_size_bytes {
            drop(guard.take());
            rotate_audit_files(&self.path, self.max_files).await;
            *guard = Some(self.open().await?);
        }
        Ok(())
    }

    async fn open(&self) -> Result<OpenFile> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("creating audit directory: {}", parent.display()))?;
            }
        }
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("opening audit log: {}", self.path.display()))?;
        let size = file.metadata().await.map(|m| m.len()).unwrap_or(0);
        Ok(OpenFile { file, size })
    }
}

/// Rotate audit log files: creds_audit.log -> creds_audit.log.1, .1 -> .2, etc.
/// Files beyond `max_files` backups are overwritten by the shift.
async fn rotate_audit_files(path: &Path, max_files: u32) {
    if max_files == 0 {
        if let Err(e) = tokio::fs::remove_file(path).await {
            error!(error = %e, path = %path.display(), "Failed to truncate audit log");
        }
        return;
    }
    for i in (1..max_files).rev() {
        let from = format!("{}.{}", path.display(), i);
        let to = format!("{}.{}", path.display(), i + 1);
        let _ = tokio::fs::rename(&from, &to).await;
    }
    let rotated = format!("{}.1", path.display());
    if let Err(e) = tokio::fs::rename(path, &rotated).await {
        error!(error = %e, path = %path.display(), "Failed to rotate audit log");
    }
}
