//! TCP client: connect, exchange messages, disconnect.
//!
//! Every public operation folds failures into a clean result (`bool` or
//! `Option`) plus a logged cause; nothing panics or leaks raw errors past
//! this boundary. The typed taxonomy lives in [`ClientError`] and is
//! reachable through the `try_*` variants.

use std::io::ErrorKind;
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time;
use tracing::{debug, error, info};

use crate::config::ClientConfig;
use crate::RECV_BUFFER_SIZE;

/// Client session. `stream == None` means disconnected; a failed connect
/// never leaves the session in an intermediate state.
pub struct Client {
    config: ClientConfig,
    stream: Option<TcpStream>,
}

/// Client-side failures, one variant per fault in the taxonomy.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("connection to {0} timed out after {1:?}")]
    ConnectTimeout(String, Duration),

    #[error("connection refused by {0}")]
    Refused(String),

    #[error("not connected to server")]
    NotConnected,

    #[error("exchange timed out after {0:?}")]
    ExchangeTimeout(Duration),

    #[error("server closed the connection before replying")]
    PeerClosed,

    #[error("invalid UTF-8 in response: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl Client {
    pub fn new(config: ClientConfig) -> Self {
        Client {
            config,
            stream: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Connect to the server, folding any failure into `false` plus a
    /// logged cause.
    pub async fn connect(&mut self) -> bool {
        match self.try_connect().await {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "Connection failed");
                false
            }
        }
    }

    /// Connect with the typed error taxonomy: timeout, refusal, and
    /// resolution failure are distinct variants.
    pub async fn try_connect(&mut self) -> Result<(), ClientError> {
        if self.stream.is_some() {
            self.disconnect().await;
        }

        let addr = self.config.server_addr();
        debug!(address = %addr, "Connecting");

        match time::timeout(self.config.timeout, TcpStream::connect(addr.as_str())).await {
            Err(_) => Err(ClientError::ConnectTimeout(addr, self.config.timeout)),
            Ok(Err(e)) if e.kind() == ErrorKind::ConnectionRefused => {
                Err(ClientError::Refused(addr))
            }
            // Name-resolution failures surface as plain I/O errors here.
            Ok(Err(e)) => Err(ClientError::Io(e)),
            Ok(Ok(stream)) => {
                info!(address = %addr, "Connected to server");
                self.stream = Some(stream);
                Ok(())
            }
        }
    }

    /// Send one message and block for the paired response. Failures fold
    /// into `None`; the socket stays open for the caller to reuse or close.
    pub async fn send_message(&mut self, message: &str) -> Option<String> {
        match self.try_send(message).await {
            Ok(response) => Some(response),
            Err(e) => {
                error!(error = %e, "Message exchange failed");
                None
            }
        }
    }

    /// One write, one timeout-bounded read. A zero-byte read means the
    /// peer closed before replying, reported distinctly from a timeout.
    pub async fn try_send(&mut self, message: &str) -> Result<String, ClientError> {
        let timeout = self.config.timeout;
        let stream = self.stream.as_mut().ok_or(ClientError::NotConnected)?;

        debug!(request = %message, "Sending message");
        time::timeout(timeout, stream.write_all(message.as_bytes()))
            .await
            .map_err(|_| ClientError::ExchangeTimeout(timeout))??;

        let mut buffer = BytesMut::with_capacity(RECV_BUFFER_SIZE);
        let n = time::timeout(timeout, stream.read_buf(&mut buffer))
            .await
            .map_err(|_| ClientError::ExchangeTimeout(timeout))??;
        if n == 0 {
            return Err(ClientError::PeerClosed);
        }

        let response = std::str::from_utf8(&buffer)?.to_string();
        debug!(response = %response, "Received response");
        Ok(response)
    }

    /// Connect, exchange one message, disconnect. The socket is closed on
    /// every exit path.
    pub async fn send_single_message(&mut self, message: &str) -> Option<String> {
        if !self.connect().await {
            return None;
        }
        let response = self.send_message(message).await;
        self.disconnect().await;
        response
    }

    /// Repeated exchanges over one held-open connection, driven by stdin.
    /// A sentinel quit message or a failed exchange ends the session.
    pub async fn interactive(&mut self) {
        println!("Interactive mode. Type 'quit' to exit.");

        if !self.connect().await {
            eprintln!("Failed to connect to server");
            return;
        }

        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            print!("Enter message: ");
            let _ = std::io::Write::flush(&mut std::io::stdout());

            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    error!(error = %e, "Failed to read input");
                    break;
                }
            };

            let message = line.trim();
            if matches!(message.to_lowercase().as_str(), "quit" | "exit" | "q") {
                println!("Goodbye!");
                break;
            }
            if message.is_empty() {
                println!("Please enter a non-empty message");
                continue;
            }

            match self.send_message(message).await {
                Some(response) => println!("Server response: {response}"),
                None => {
                    eprintln!("Failed to get response from server");
                    break;
                }
            }
        }

        self.disconnect().await;
    }

    /// Close the connection if one is open. Safe to call repeatedly.
    pub async fn disconnect(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
            info!("Disconnected from server");
        }
    }
}
