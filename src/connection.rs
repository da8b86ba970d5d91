//! Per-connection handler loop.
//!
//! Each accepted socket is exclusively owned by one handler task: read a
//! message, process it, write the response, repeat until the peer closes
//! or an unrecoverable error occurs. A zero-length read is the orderly
//! peer-closed signal, not an error. Invalid UTF-8 gets an error response
//! and ends the connection; an empty message gets an error response and
//! the loop continues.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace, warn};

use crate::message::{self, Transform, INVALID_UTF8_RESPONSE};
use crate::RECV_BUFFER_SIZE;

/// Run the request/response loop for one connection.
///
/// Returns `Ok(())` on orderly termination (peer closed, or the
/// connection-ending error response was sent); socket errors propagate to
/// the dispatcher, which logs them without touching the accept loop.
///
/// Generic over the stream so tests can drive it with mock I/O.
pub(crate) async fn handle_connection<S>(
    mut stream: S,
    peer: SocketAddr,
    transform: Arc<dyn Transform>,
) -> std::io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buffer = BytesMut::with_capacity(RECV_BUFFER_SIZE);

    loop {
        buffer.clear();
        let n = stream.read_buf(&mut buffer).await?;
        if n == 0 {
            trace!(peer = %peer, "Peer closed connection");
            return Ok(());
        }

        let text = match std::str::from_utf8(&buffer) {
            Ok(text) => text,
            Err(e) => {
                warn!(peer = %peer, error = %e, "Invalid UTF-8 from peer, closing connection");
                // Best effort; the connection ends either way.
                let _ = stream.write_all(INVALID_UTF8_RESPONSE.as_bytes()).await;
                return Ok(());
            }
        };

        let request = text.trim();
        debug!(peer = %peer, request = %request, "Received message");

        let response = message::process(transform.as_ref(), request);
        stream.write_all(response.as_bytes()).await?;
        debug!(peer = %peer, response = %response, "Sent response");
    }
}
