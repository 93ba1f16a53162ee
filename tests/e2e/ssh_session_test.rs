#[allow(dead_code, unused_imports)]
mod helpers;

use helpers::*;
use honeypy::audit::events::AuditEvent;
use honeypy::audit::AuditLogger;
use honeypy::security::ConnectionRateLimiter;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::time::Duration;

// ---------------------------------------------------------------------------
// Test 1: any credential pair is accepted and recorded
// ---------------------------------------------------------------------------
#[tokio::test]
async fn test_password_accepted_and_recorded() {
    let honeypot = start_honeypot(test_config()).await;

    let _handle = login(honeypot.addr, "root", "toor").await;

    let events = honeypot.audit.get_recent_events(10);
    assert_eq!(events.len(), 1);
    match &events[0] {
        AuditEvent::CredentialAttempt {
            username,
            password,
            source_ip,
            ..
        } => {
            assert_eq!(username, "root");
            assert_eq!(password, "toor");
            assert_eq!(source_ip, "127.0.0.1");
        }
        other => panic!("expected credential attempt, got {other:?}"),
    }

    honeypot.stop().await;
}

// ---------------------------------------------------------------------------
// Test 2: public key auth is refused, password still works afterwards
// ---------------------------------------------------------------------------
#[tokio::test]
async fn test_publickey_rejected_then_password_accepted() {
    let honeypot = start_honeypot(test_config()).await;
    let mut handle = connect(honeypot.addr).await;

    let key = honeypy::ssh::keys::generate_host_key().unwrap();
    let pk_auth = handle
        .authenticate_publickey(
            "root",
            russh::keys::PrivateKeyWithHashAlg::new(Arc::new(key), None),
        )
        .await
        .unwrap();
    assert!(!pk_auth.success(), "public key auth must be refused");

    let pw_auth = handle
        .authenticate_password("admin", "admin123")
        .await
        .unwrap();
    assert!(pw_auth.success());

    let creds: Vec<_> = honeypot
        .audit
        .get_recent_events(10)
        .into_iter()
        .filter(|e| matches!(e, AuditEvent::CredentialAttempt { .. }))
        .collect();
    assert_eq!(creds.len(), 1, "only the password attempt is recorded");

    honeypot.stop().await;
}

// ---------------------------------------------------------------------------
// Test 3: full attacker session from login to logout
// ---------------------------------------------------------------------------
#[tokio::test]
async fn test_full_session_transcript() {
    let honeypot = start_honeypot(test_config()).await;
    let handle = login(honeypot.addr, "root", "toor").await;
    let (mut stream, banner) = open_shell(&handle).await;
    assert_eq!(banner, PROMPT);

    let out = run_command(&mut stream, "whoami").await;
    assert_eq!(response_body(&out, "whoami"), "corpuser1\n");
    assert!(out.ends_with(PROMPT));

    let out = run_command(&mut stream, "cd /tmp").await;
    assert_eq!(response_body(&out, "cd /tmp"), "");

    let out = run_command(&mut stream, "pwd").await;
    assert_eq!(response_body(&out, "pwd"), "/usr/local/tmp\n");

    stream.write_all(b"exit\r").await.unwrap();
    let (out, closed) = read_to_close(&mut stream, Duration::from_secs(5)).await;
    assert!(out.contains("logout"), "got: {out:?}");
    assert!(out.contains("Connection closed."));
    assert!(closed, "server should close the channel after exit");

    let commands: Vec<String> = honeypot
        .audit
        .get_recent_events(20)
        .into_iter()
        .filter_map(|e| match e {
            AuditEvent::CommandRecord { command, .. } => Some(command),
            _ => None,
        })
        .collect();
    assert_eq!(commands, vec!["whoami", "cd /tmp", "pwd", "exit"]);

    honeypot.stop().await;
}

// ---------------------------------------------------------------------------
// Test 4: exec requests are refused and never reach the shell
// ---------------------------------------------------------------------------
#[tokio::test]
async fn test_exec_request_refused() {
    let honeypot = start_honeypot(test_config()).await;
    let handle = login(honeypot.addr, "root", "toor").await;

    let mut channel = handle.channel_open_session().await.unwrap();
    channel.exec(true, "cat /etc/passwd").await.unwrap();

    let mut refused = false;
    let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
    while let Ok(Some(msg)) = tokio::time::timeout_at(deadline, channel.wait()).await {
        match msg {
            russh::ChannelMsg::Failure => {
                refused = true;
                break;
            }
            russh::ChannelMsg::Data { .. } => panic!("exec must not produce output"),
            _ => {}
        }
    }
    assert!(refused, "exec should be answered with channel failure");

    let commands = honeypot
        .audit
        .get_recent_events(10)
        .into_iter()
        .filter(|e| matches!(e, AuditEvent::CommandRecord { .. }))
        .count();
    assert_eq!(commands, 0);

    honeypot.stop().await;
}

// ---------------------------------------------------------------------------
// Test 5: authenticated client that never asks for a shell is dropped
// ---------------------------------------------------------------------------
#[tokio::test]
async fn test_no_shell_request_times_out() {
    let mut config = test_config();
    config.limits.channel_timeout = 1;
    let honeypot = start_honeypot(config).await;
    let handle = login(honeypot.addr, "root", "toor").await;

    let deadline = tokio::time::Instant::now() + Duration::from_secs(6);
    while !handle.is_closed() && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert!(handle.is_closed(), "idle pre-shell connection should be closed");

    honeypot.stop().await;
}

// ---------------------------------------------------------------------------
// Test 6: audit files receive one JSON line per capture
// ---------------------------------------------------------------------------
#[tokio::test]
async fn test_session_written_to_audit_files() {
    let dir = tempfile::tempdir().unwrap();
    let audit = Arc::new(AuditLogger::new(dir.path(), 100_000, 5));
    let honeypot = start_honeypot_with(
        test_config(),
        audit,
        Arc::new(ConnectionRateLimiter::new(Duration::ZERO)),
    )
    .await;

    let handle = login(honeypot.addr, "ubuntu", "ubuntu").await;
    let (mut stream, _) = open_shell(&handle).await;
    run_command(&mut stream, "uname").await;
    stream.write_all(b"exit\r").await.unwrap();
    read_to_close(&mut stream, Duration::from_secs(5)).await;

    let creds = std::fs::read_to_string(dir.path().join("creds_audit.log")).unwrap();
    let cred_lines: Vec<serde_json::Value> = creds
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(cred_lines.len(), 1);
    assert_eq!(cred_lines[0]["event_type"], "auth.attempt");
    assert_eq!(cred_lines[0]["username"], "ubuntu");
    assert_eq!(cred_lines[0]["password"], "ubuntu");

    let cmds = std::fs::read_to_string(dir.path().join("cmd_audit.log")).unwrap();
    let cmd_lines: Vec<serde_json::Value> = cmds
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(cmd_lines.len(), 2);
    assert_eq!(cmd_lines[0]["event_type"], "shell.command");
    assert_eq!(cmd_lines[0]["command"], "uname");
    assert_eq!(cmd_lines[1]["command"], "exit");
    assert_eq!(
        cmd_lines[0]["correlation_id"], cred_lines[0]["correlation_id"],
        "one correlation id per connection"
    );

    honeypot.stop().await;
}
