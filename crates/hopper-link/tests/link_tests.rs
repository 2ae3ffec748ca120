//! Environment link tests against a scripted TCP peer

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use hopper_core::{Action, Environment, HopperError};
use hopper_link::{EnvLink, LinkConfig};

/// Bind a listener on an ephemeral port and return it with a matching config
async fn listener() -> (TcpListener, LinkConfig) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let config = LinkConfig {
        host: "127.0.0.1".to_string(),
        port,
        receive_timeout_ms: 500,
        max_parse_attempts: 3,
        ..LinkConfig::default()
    };
    (listener, config)
}

/// Read one action label from the client
async fn read_action(stream: &mut TcpStream) -> String {
    let mut buf = [0u8; 32];
    let n = stream.read(&mut buf).await.unwrap();
    String::from_utf8_lossy(&buf[..n]).to_string()
}

/// Write a payload and give the client time to consume it as its own receive
async fn send(stream: &mut TcpStream, payload: &str) {
    stream.write_all(payload.as_bytes()).await.unwrap();
    stream.flush().await.unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;
}

// ============================================================================
// Connection Tests
// ============================================================================

#[tokio::test]
async fn test_connect_failure_is_reported() {
    // Grab a free port and release it so nothing is listening
    let (listener, config) = listener().await;
    drop(listener);

    let result = EnvLink::connect(config).await;
    assert!(matches!(result, Err(HopperError::Connect(_))));
}

// ============================================================================
// Exchange Tests
// ============================================================================

#[tokio::test]
async fn test_canonical_and_localized_replies() {
    let (listener, config) = listener().await;

    let peer = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        assert_eq!(read_action(&mut stream).await, "left");
        send(&mut stream, "{'state': '0000110', 'reward': -1}").await;
        assert_eq!(read_action(&mut stream).await, "jump");
        send(&mut stream, "{'estado': '0001000', 'recompensa': 300}").await;
    });

    let mut link = EnvLink::connect(config).await.unwrap();

    let first = link.step(Action::Left).await.unwrap();
    assert_eq!(first.next_state.index(), 6);
    assert_eq!(first.reward, -1.0);

    let second = link.step(Action::Jump).await.unwrap();
    assert_eq!(second.next_state.index(), 8);
    assert_eq!(second.reward, 300.0);

    peer.await.unwrap();
}

#[tokio::test]
async fn test_malformed_replies_are_skipped() {
    let (listener, config) = listener().await;

    let peer = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        assert_eq!(read_action(&mut stream).await, "right");
        send(&mut stream, "loading...").await;
        send(&mut stream, "{'estado': '01'").await;
        send(&mut stream, "{'estado': '0000001', 'recompensa': '-100'}").await;
    });

    let mut link = EnvLink::connect(config).await.unwrap();
    let t = link.step(Action::Right).await.unwrap();
    assert_eq!(t.next_state.index(), 1);
    assert_eq!(t.reward, -100.0);

    peer.await.unwrap();
}

#[tokio::test]
async fn test_persistent_garbage_desyncs() {
    let (listener, config) = listener().await;

    let peer = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        read_action(&mut stream).await;
        for _ in 0..3 {
            send(&mut stream, "not a mapping").await;
        }
        // Keep the socket open until the client gives up
        tokio::time::sleep(Duration::from_millis(200)).await;
    });

    let mut link = EnvLink::connect(config).await.unwrap();
    let err = link.step(Action::Jump).await.unwrap_err();
    assert!(matches!(err, HopperError::ProtocolDesync { attempts: 3 }));
    assert!(err.is_transport());
    assert!(link.is_reply_owed());

    peer.await.unwrap();
}

#[tokio::test]
async fn test_late_reply_is_not_paired_with_next_action() {
    let (listener, mut config) = listener().await;
    config.receive_timeout_ms = 150;

    let peer = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        assert_eq!(read_action(&mut stream).await, "left");
        // Answer after the client has given up on this step
        tokio::time::sleep(Duration::from_millis(200)).await;
        send(&mut stream, "{'state': '0000001', 'reward': -1}").await;
        assert_eq!(read_action(&mut stream).await, "jump");
        send(&mut stream, "{'state': '0000010', 'reward': 300}").await;
    });

    let mut link = EnvLink::connect(config).await.unwrap();
    let err = link.step(Action::Left).await.unwrap_err();
    assert!(matches!(err, HopperError::Timeout(_)));
    assert!(err.is_transport());

    let t = link.step(Action::Jump).await.unwrap();
    assert_eq!(t.next_state.index(), 2);
    assert_eq!(t.reward, 300.0);

    peer.await.unwrap();
}

#[tokio::test]
async fn test_peer_disconnect_is_not_retried() {
    let (listener, config) = listener().await;

    let peer = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        read_action(&mut stream).await;
        // Drop without replying
    });

    let mut link = EnvLink::connect(config).await.unwrap();
    let err = link.step(Action::Left).await.unwrap_err();
    assert!(err.is_transport());
    assert!(!matches!(err, HopperError::ProtocolDesync { .. }));

    peer.await.unwrap();
}

#[tokio::test]
async fn test_out_of_range_state_fails_step() {
    let (listener, config) = listener().await;

    let peer = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        read_action(&mut stream).await;
        send(&mut stream, "{'state': '1111111', 'reward': 0}").await;
    });

    let mut link = EnvLink::connect(config).await.unwrap();
    let err = link.step(Action::Left).await.unwrap_err();
    assert!(matches!(err, HopperError::InvalidState(_)));

    peer.await.unwrap();
}
