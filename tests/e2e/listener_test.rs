#[allow(dead_code, unused_imports)]
mod helpers;

use helpers::*;
use honeypy::config::types::OverflowPolicy;
use std::net::SocketAddr;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::time::Duration;

/// Read the first bytes within `limit`. `None` means nothing arrived in time.
async fn read_some(stream: &mut TcpStream, limit: Duration) -> Option<Vec<u8>> {
    let mut buf = vec![0u8; 256];
    match tokio::time::timeout(limit, stream.read(&mut buf)).await {
        Ok(Ok(n)) => Some(buf[..n].to_vec()),
        Ok(Err(_)) => Some(Vec::new()),
        Err(_) => None,
    }
}

async fn banner_connection(addr: SocketAddr) -> TcpStream {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let banner = read_some(&mut stream, Duration::from_secs(3)).await.unwrap();
    assert!(banner.starts_with(b"SSH-2.0-"));
    stream
}

fn pool_config(max: u32, overflow: OverflowPolicy) -> honeypy::config::types::AppConfig {
    let mut config = test_config();
    config.limits.max_connections = max;
    config.limits.overflow = overflow;
    config
}

#[tokio::test]
async fn test_reject_policy_drops_overflow() {
    let honeypot = start_honeypot(pool_config(1, OverflowPolicy::Reject)).await;

    let holder = banner_connection(honeypot.addr).await;

    let mut extra = TcpStream::connect(honeypot.addr).await.unwrap();
    let got = read_some(&mut extra, Duration::from_secs(3)).await;
    assert_eq!(got, Some(Vec::new()), "overflow connection must be closed silently");

    // Freeing the slot lets the next connection through.
    drop(holder);
    let mut accepted = false;
    for _ in 0..20 {
        let mut stream = TcpStream::connect(honeypot.addr).await.unwrap();
        if let Some(bytes) = read_some(&mut stream, Duration::from_secs(1)).await {
            if bytes.starts_with(b"SSH-2.0-") {
                accepted = true;
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert!(accepted, "slot should be released once the holder disconnects");

    honeypot.stop().await;
}

#[tokio::test]
async fn test_block_policy_queues_overflow() {
    let honeypot = start_honeypot(pool_config(1, OverflowPolicy::Block)).await;

    let holder = banner_connection(honeypot.addr).await;

    let mut waiting = TcpStream::connect(honeypot.addr).await.unwrap();
    assert!(
        read_some(&mut waiting, Duration::from_millis(500)).await.is_none(),
        "second connection should wait for a slot"
    );

    drop(holder);
    let banner = read_some(&mut waiting, Duration::from_secs(5)).await.unwrap();
    assert!(banner.starts_with(b"SSH-2.0-"));

    honeypot.stop().await;
}

#[tokio::test]
async fn test_shutdown_stops_accepting() {
    let honeypot = start_honeypot(test_config()).await;
    let addr = honeypot.addr;
    let _live = banner_connection(addr).await;

    honeypot.shutdown.cancel();
    let finished = tokio::time::timeout(Duration::from_secs(10), honeypot.task).await;
    assert!(finished.is_ok(), "server must return within the drain timeout");

    match TcpStream::connect(addr).await {
        Err(_) => {}
        Ok(mut stream) => {
            let got = read_some(&mut stream, Duration::from_secs(1)).await;
            assert!(
                !matches!(got, Some(ref b) if b.starts_with(b"SSH-2.0-")),
                "no new session may start after shutdown"
            );
        }
    }
}

#[tokio::test]
async fn test_peer_leaving_mid_handshake_is_harmless() {
    let honeypot = start_honeypot(pool_config(1, OverflowPolicy::Block)).await;

    let quitter = banner_connection(honeypot.addr).await;
    drop(quitter);

    // The single slot must come back for a real client.
    let _handle = tokio::time::timeout(
        Duration::from_secs(5),
        login(honeypot.addr, "root", "toor"),
    )
    .await
    .expect("slot was not released after the peer left");
    assert_eq!(honeypot.audit.get_recent_events(10).len(), 1);

    honeypot.stop().await;
}
