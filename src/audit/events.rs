use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum AuditEvent {
    #[serde(rename = "auth.attempt")]
    CredentialAttempt {
        timestamp: DateTime<Utc>,
        correlation_id: String,
        username: String,
        password: String,
        source_ip: String,
    },
    #[serde(rename = "shell.command")]
    CommandRecord {
        timestamp: DateTime<Utc>,
        correlation_id: String,
        command: String,
        source_ip: String,
    },
}

/// Which on-disk stream an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditStream {
    Credentials,
    Commands,
}

impl AuditEvent {
    pub fn credential_attempt(
        username: &str,
        password: &str,
        source: &SocketAddr,
        cid: &str,
    ) -> Self {
        Self::CredentialAttempt {
            timestamp: Utc::now(),
            correlation_id: cid.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            source_ip: source.ip().to_string(),
        }
    }

    pub fn command_record(command: &str, source: &SocketAddr, cid: &str) -> Self {
        Self::CommandRecord {
            timestamp: Utc::now(),
            correlation_id: cid.to_string(),
            command: command.to_string(),
            source_ip: source.ip().to_string(),
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            Self::CredentialAttempt { .. } => "auth.attempt",
            Self::CommandRecord { .. } => "shell.command",
        }
    }

    pub fn stream(&self) -> AuditStream {
        match self {
            Self::CredentialAttempt { .. } => AuditStream::Credentials,
            Self::CommandRecord { .. } => AuditStream::Commands,
        }
    }

    pub fn source_ip(&self) -> &str {
        match self {
            Self::CredentialAttempt { source_ip, .. } | Self::CommandRecord { source_ip, .. } => {
                source_ip
            }
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::CredentialAttempt { correlation_id, .. }
            | Self::CommandRecord { correlation_id, .. } => correlation_id,
        }
    }
}
