use honeypy::audit::AuditLogger;
use honeypy::config::types::AppConfig;
use honeypy::security::ConnectionRateLimiter;
use honeypy::server::HoneypotServer;
use honeypy::ssh::keys;

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

pub const PROMPT: &str = "corporate-jumpbox2$ ";

/// Holds references to a running in-process honeypot
pub struct TestHoneypot {
    pub addr: SocketAddr,
    pub audit: Arc<AuditLogger>,
    pub shutdown: CancellationToken,
    pub task: tokio::task::JoinHandle<anyhow::Result<()>>,
}

impl TestHoneypot {
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub async fn stop(self) {
        self.shutdown.cancel();
        let _ = tokio::time::timeout(Duration::from_secs(10), self.task).await;
    }
}

/// Minimal russh client handler for testing
pub struct TestClientHandler;

impl russh::client::Handler for TestClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &russh::keys::PublicKey,
    ) -> Result<bool, Self::Error> {
        Ok(true)
    }
}

/// Loopback config on an ephemeral port with rate limiting off, so tests
/// can reconnect freely.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.server.listen = "127.0.0.1:0".to_string();
    config.server.shutdown_timeout = 2;
    config.limits.rate_limit_window_secs = 0;
    config.limits.auth_rejection_time_ms = 10;
    config.logging.audit_enabled = false;
    config
}

pub async fn start_honeypot(config: AppConfig) -> TestHoneypot {
    let window = Duration::from_secs(config.limits.rate_limit_window_secs);
    start_honeypot_with(
        config,
        Arc::new(AuditLogger::in_memory()),
        Arc::new(ConnectionRateLimiter::new(window)),
    )
    .await
}

pub async fn start_honeypot_with(
    config: AppConfig,
    audit: Arc<AuditLogger>,
    rate_limiter: Arc<ConnectionRateLimiter>,
) -> TestHoneypot {
    let key = keys::generate_host_key().unwrap();
    let server = HoneypotServer::new(config, key, audit.clone(), rate_limiter).unwrap();
    let addr = server.local_addr().unwrap();
    let shutdown = CancellationToken::new();
    let task = tokio::spawn(server.run(shutdown.clone()));
    TestHoneypot {
        addr,
        audit,
        shutdown,
        task,
    }
}

pub async fn connect(addr: SocketAddr) -> russh::client::Handle<TestClientHandler> {
    let client_config = Arc::new(russh::client::Config::default());
    russh::client::connect(client_config, addr, TestClientHandler)
        .await
        .unwrap()
}

/// Connect and authenticate with a password (which always succeeds).
pub async fn login(
    addr: SocketAddr,
    user: &str,
    password: &str,
) -> russh::client::Handle<TestClientHandler> {
    let mut handle = connect(addr).await;
    let auth = handle.authenticate_password(user, password).await.unwrap();
    assert!(auth.success(), "honeypot must accept every password");
    handle
}

/// Open a session channel, request a PTY and a shell, and wait for the first prompt.
pub async fn open_shell(
    handle: &russh::client::Handle<TestClientHandler>,
) -> (russh::ChannelStream<russh::client::Msg>, String) {
    let channel = handle.channel_open_session().await.unwrap();
    channel
        .request_pty(true, "xterm", 80, 24, 0, 0, &[])
        .await
        .unwrap();
    channel.request_shell(true).await.unwrap();
    let mut stream = channel.into_stream();
    let banner = read_until(&mut stream, PROMPT, Duration::from_secs(5)).await;
    (stream, banner)
}

/// Read until `needle` shows up, EOF, or `limit` elapses. Returns everything read.
pub async fn read_until<S>(stream: &mut S, needle: &str, limit: Duration) -> String
where
    S: AsyncRead + Unpin,
{
    let deadline = tokio::time::Instant::now() + limit;
    let mut buf = vec![0u8; 4096];
    let mut output = String::new();
    loop {
        match tokio::time::timeout_at(deadline, stream.read(&mut buf)).await {
            Ok(Ok(0)) => break,
            Ok(Ok(n)) => {
                output.push_str(&String::from_utf8_lossy(&buf[..n]));
                if output.contains(needle) {
                    break;
                }
            }
            Ok(Err(_)) => break,
            Err(_) => break,
        }
    }
    output
}

/// Read until the peer closes the stream or `limit` elapses.
pub async fn read_to_close<S>(stream: &mut S, limit: Duration) -> (String, bool)
where
    S: AsyncRead + Unpin,
{
    let deadline = tokio::time::Instant::now() + limit;
    let mut buf = vec![0u8; 4096];
    let mut output = String::new();
    loop {
        match tokio::time::timeout_at(deadline, stream.read(&mut buf)).await {
            Ok(Ok(0)) | Ok(Err(_)) => return (output, true),
            Ok(Ok(n)) => output.push_str(&String::from_utf8_lossy(&buf[..n])),
            Err(_) => return (output, false),
        }
    }
}

/// Type a command followed by Enter and return the output up to the next prompt.
pub async fn run_command<S>(stream: &mut S, line: &str) -> String
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream
        .write_all(format!("{}\r", line).as_bytes())
        .await
        .unwrap();
    read_until(stream, PROMPT, Duration::from_secs(5)).await
}

/// Strip the echoed input line and the trailing prompt from a `run_command` result.
pub fn response_body<'a>(output: &'a str, line: &str) -> &'a str {
    let echoed = format!("{}\r\n", line);
    let body = output.strip_prefix(echoed.as_str()).unwrap_or(output);
    body.strip_suffix(PROMPT).unwrap_or(body)
}
