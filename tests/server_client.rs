//! End-to-end tests: in-process server plus real client over loopback.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use shoutback::client::{Client, ClientError};
use shoutback::config::{ClientConfig, ServerConfig};
use shoutback::server::{Server, ServerError};
use shoutback::shutdown::ShutdownHandle;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::task::JoinHandle;

/// Bind a server on an ephemeral loopback port and run it in the
/// background. Returns the bound address, the shutdown handle, and the
/// run task.
async fn start_server() -> (
    SocketAddr,
    ShutdownHandle,
    JoinHandle<Result<(), ServerError>>,
) {
    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        log_level: "error".to_string(),
    };

    let mut server = Server::new(config);
    let addr = server.bind().await.expect("server failed to bind");
    let handle = server.shutdown_handle();
    let task = tokio::spawn(async move { server.run().await });
    (addr, handle, task)
}

fn client_for(addr: SocketAddr) -> Client {
    Client::new(ClientConfig::new(
        addr.ip().to_string(),
        addr.port(),
        Duration::from_secs(2),
    ))
}

#[tokio::test]
async fn round_trip_uppercase() {
    let (addr, handle, task) = start_server().await;

    let mut client = client_for(addr);
    let response = client.send_single_message("hello world").await;
    assert_eq!(response.as_deref(), Some("HELLO WORLD"));

    handle.shutdown();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn whitespace_only_message_yields_empty_error() {
    let (addr, handle, task) = start_server().await;

    let mut client = client_for(addr);
    let response = client.send_single_message("   ").await;
    assert_eq!(response.as_deref(), Some("ERROR: Empty message"));

    handle.shutdown();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn repeated_exchanges_on_one_connection() {
    let (addr, handle, task) = start_server().await;

    let mut client = client_for(addr);
    assert!(client.connect().await);

    // Response N is fully written before request N+1 is read.
    assert_eq!(
        client.send_message("first").await.as_deref(),
        Some("FIRST")
    );
    assert_eq!(
        client.send_message("second").await.as_deref(),
        Some("SECOND")
    );
    assert_eq!(
        client.send_message("  padded  ").await.as_deref(),
        Some("PADDED")
    );

    client.disconnect().await;
    handle.shutdown();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn concurrent_clients_get_their_own_replies() {
    let (addr, handle, task) = start_server().await;

    let mut exchanges = Vec::new();
    for message in ["client1", "client2", "client3"] {
        exchanges.push(tokio::spawn(async move {
            let mut client = client_for(addr);
            (message, client.send_single_message(message).await)
        }));
    }

    for exchange in exchanges {
        let (message, response) = exchange.await.unwrap();
        assert_eq!(response, Some(message.to_uppercase()));
    }

    handle.shutdown();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn shutdown_is_idempotent() {
    let (_addr, handle, task) = start_server().await;

    assert!(handle.shutdown());
    assert!(!handle.shutdown());

    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn in_flight_exchange_survives_shutdown() {
    let (addr, handle, task) = start_server().await;

    let mut client = client_for(addr);
    assert!(client.connect().await);
    assert_eq!(client.send_message("before").await.as_deref(), Some("BEFORE"));

    // Stop accepting; the established connection keeps working within the
    // grace period.
    handle.shutdown();
    assert_eq!(client.send_message("during").await.as_deref(), Some("DURING"));

    client.disconnect().await;
    task.await.unwrap().unwrap();

    // New connections are refused once the listener is gone.
    let mut late = client_for(addr);
    assert!(!late.connect().await);
}

#[tokio::test]
async fn restart_rebinds_same_address() {
    let (addr, handle, task) = start_server().await;

    let mut client = client_for(addr);
    assert_eq!(
        client.send_single_message("one").await.as_deref(),
        Some("ONE")
    );

    handle.shutdown();
    task.await.unwrap().unwrap();

    // Re-bind the exact same (host, port) right away.
    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: addr.port(),
        log_level: "error".to_string(),
    };
    let mut server = Server::new(config);
    server.bind().await.expect("re-bind failed");
    let handle = server.shutdown_handle();
    let task = tokio::spawn(async move { server.run().await });

    assert_eq!(
        client.send_single_message("two").await.as_deref(),
        Some("TWO")
    );

    handle.shutdown();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn invalid_utf8_gets_error_then_connection_ends() {
    let (addr, handle, task) = start_server().await;

    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    stream.write_all(&[0xff, 0xfe, 0xfd]).await.unwrap();

    let mut buf = vec![0u8; 256];
    let n = stream.read(&mut buf).await.unwrap();
    let response = String::from_utf8_lossy(&buf[..n]);
    assert!(response.contains("ERROR"), "got: {response}");

    // The server closes its side after the error response.
    let n = stream.read(&mut buf).await.unwrap();
    assert_eq!(n, 0);

    handle.shutdown();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn silent_peer_times_out_within_bounds() {
    // A listener that accepts and then never replies.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (_held, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
    });

    let mut client = Client::new(ClientConfig::new(
        addr.ip().to_string(),
        addr.port(),
        Duration::from_secs(1),
    ));
    assert!(client.connect().await);

    let start = Instant::now();
    match client.try_send("anyone there").await {
        Err(ClientError::ExchangeTimeout(_)) => {}
        other => panic!("expected ExchangeTimeout, got {other:?}"),
    }
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(900), "too fast: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(3), "too slow: {elapsed:?}");
}

#[tokio::test]
async fn peer_close_before_reply_is_not_a_timeout() {
    // A listener that reads the request and closes without answering.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 64];
        let _ = stream.read(&mut buf).await;
    });

    let mut client = Client::new(ClientConfig::new(
        addr.ip().to_string(),
        addr.port(),
        Duration::from_secs(2),
    ));
    assert!(client.connect().await);

    match client.try_send("hello").await {
        Err(ClientError::PeerClosed) => {}
        other => panic!("expected PeerClosed, got {other:?}"),
    }
}
