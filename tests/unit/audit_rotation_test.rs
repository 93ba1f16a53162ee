use honeypy::audit::{AuditLogger, COMMANDS_LOG, CREDENTIALS_LOG};
use std::net::SocketAddr;
use std::path::Path;

fn peer() -> SocketAddr {
    "192.0.2.200:2200".parse().unwrap()
}

fn backup(dir: &Path, name: &str, n: u32) -> std::path::PathBuf {
    dir.join(format!("{}.{}", name, n))
}

#[tokio::test]
async fn rotates_when_size_reached() {
    let dir = tempfile::tempdir().unwrap();
    // Each command line is well over 100 bytes, so every write rotates.
    let audit = AuditLogger::new(dir.path(), 100, 3);

    audit.log_command("first", &peer(), "r1").await.unwrap();
    assert!(backup(dir.path(), COMMANDS_LOG, 1).exists());

    let rotated = std::fs::read_to_string(backup(dir.path(), COMMANDS_LOG, 1)).unwrap();
    assert!(rotated.contains("\"command\":\"first\""));
}

#[tokio::test]
async fn keeps_at_most_max_files_backups() {
    let dir = tempfile::tempdir().unwrap();
    let audit = AuditLogger::new(dir.path(), 100, 2);

    for i in 0..5 {
        audit
            .log_command(&format!("cmd{i}"), &peer(), "r2")
            .await
            .unwrap();
    }

    assert!(backup(dir.path(), COMMANDS_LOG, 1).exists());
    assert!(backup(dir.path(), COMMANDS_LOG, 2).exists());
    assert!(!backup(dir.path(), COMMANDS_LOG, 3).exists());

    let newest = std::fs::read_to_string(backup(dir.path(), COMMANDS_LOG, 1)).unwrap();
    let older = std::fs::read_to_string(backup(dir.path(), COMMANDS_LOG, 2)).unwrap();
    assert!(newest.contains("cmd4"));
    assert!(older.contains("cmd3"));
}

#[tokio::test]
async fn small_writes_accumulate_before_rotation() {
    let dir = tempfile::tempdir().unwrap();
    let audit = AuditLogger::new(dir.path(), 100_000, 5);

    for i in 0..20 {
        audit
            .log_credential_attempt("root", &format!("pw{i}"), &peer(), "r3")
            .await
            .unwrap();
    }
    let live = std::fs::read_to_string(dir.path().join(CREDENTIALS_LOG)).unwrap();
    assert_eq!(live.lines().count(), 20);
    assert!(!backup(dir.path(), CREDENTIALS_LOG, 1).exists());
}

#[tokio::test]
async fn zero_max_files_discards_full_log() {
    let dir = tempfile::tempdir().unwrap();
    let audit = AuditLogger::new(dir.path(), 100, 0);

    audit.log_command("gone", &peer(), "r4").await.unwrap();
    audit.log_command("kept", &peer(), "r4").await.unwrap();

    assert!(!backup(dir.path(), COMMANDS_LOG, 1).exists());
    let live = std::fs::read_to_string(dir.path().join(COMMANDS_LOG)).unwrap_or_default();
    assert!(!live.contains("gone"));
}

#[tokio::test]
async fn streams_rotate_independently() {
    let dir = tempfile::tempdir().unwrap();
    let audit = AuditLogger::new(dir.path(), 400, 5);

    audit.log_command("ls", &peer(), "r5").await.unwrap();
    for _ in 0..4 {
        audit
            .log_credential_attempt("admin", "admin", &peer(), "r5")
            .await
            .unwrap();
    }

    assert!(backup(dir.path(), CREDENTIALS_LOG, 1).exists());
    assert!(!backup(dir.path(), COMMANDS_LOG, 1).exists());
}
