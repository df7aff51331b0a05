//! Connection Worker
//!
//! This module handles individual client connections. Each client gets its
//! own task that runs in a loop, reading frames and sending replies.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Client connects
//!        │
//!        ▼
//! 2. ConnectionHandler spawned
//!        │
//!        ▼
//! 3. ┌──────────────────────────────┐
//!    │      Main Loop               │
//!    │                              │
//!    │  Decode every complete frame │
//!    │  Execute, queue replies      │
//!    │  Flush replies               │
//!    │  Read more bytes             │
//!    │         [Loop back]          │
//!    └──────────────────────────────┘
//!        │
//!        ▼
//! 4. Client disconnects / I/O error
//!        │
//!        ▼
//! 5. Handler task ends
//! ```
//!
//! ## Malformed Input
//!
//! A frame that fails to decode is logged and everything buffered after it is
//! dropped. The connection stays open and keeps serving later frames. The
//! store is never touched by a failed decode.

use crate::commands::CommandHandler;
use crate::protocol::{FrameLimits, Reply, RequestDecoder};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::{debug, info, trace, warn};

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total commands decoded
    pub commands_processed: AtomicU64,
    /// Total malformed frames dropped
    pub parse_errors: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn parse_error(&self) {
        self.parse_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written
            .fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Handles a single client connection.
///
/// Owns the stream and the decode buffer for one client; only the store
/// (inside the command handler) and the stats are shared.
pub struct ConnectionHandler<S> {
    stream: BufWriter<S>,

    /// Client's address (for logging)
    addr: SocketAddr,

    /// Bytes received but not yet decoded
    decoder: RequestDecoder,

    command_handler: CommandHandler,

    /// Reply encoding scratch space, reused across replies
    out: Vec<u8>,

    stats: Arc<ConnectionStats>,
}

impl<S> ConnectionHandler<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(
        stream: S,
        addr: SocketAddr,
        command_handler: CommandHandler,
        stats: Arc<ConnectionStats>,
        limits: FrameLimits,
    ) -> Self {
        stats.connection_opened();

        Self {
            stream: BufWriter::new(stream),
            addr,
            decoder: RequestDecoder::with_limits(limits),
            command_handler,
            out: Vec::with_capacity(256),
            stats,
        }
    }

    /// Runs the connection until the client disconnects or an I/O error occurs.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "Client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => info!(client = %self.addr, "Client disconnected gracefully"),
            Err(ConnectionError::ClientDisconnected) => {
                info!(client = %self.addr, "Client disconnected")
            }
            Err(ConnectionError::IoError(io_err))
                if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
            {
                debug!(client = %self.addr, "Connection reset by client")
            }
            Err(e) => warn!(client = %self.addr, error = %e, "Connection error"),
        }

        self.stats.connection_closed();
        result
    }

    /// The read-decode-execute-reply loop.
    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            if self.process_buffered().await? {
                self.stream.flush().await?;
            }

            self.read_more_data().await?;
        }
    }

    /// Executes every complete frame currently buffered.
    ///
    /// Returns whether any reply was queued and still needs flushing.
    async fn process_buffered(&mut self) -> Result<bool, ConnectionError> {
        let mut queued = false;

        loop {
            match self.decoder.decode() {
                Ok(Some(command)) => {
                    trace!(client = %self.addr, command = %command, "Decoded command");
                    self.stats.command_processed();

                    if let Some(reply) = self.command_handler.execute(command) {
                        self.queue_reply(&reply).await?;
                        queued = true;
                    }
                }
                Ok(None) => {
                    trace!(
                        client = %self.addr,
                        buffered = self.decoder.buffered(),
                        "Incomplete frame, need more data"
                    );
                    return Ok(queued);
                }
                Err(e) => {
                    let dropped = self.decoder.discard();
                    self.stats.parse_error();
                    warn!(
                        client = %self.addr,
                        error = %e,
                        dropped_bytes = dropped,
                        "Malformed frame, discarding buffered input"
                    );
                    return Ok(queued);
                }
            }
        }
    }

    /// Reads more data from the socket into the decoder.
    async fn read_more_data(&mut self) -> Result<(), ConnectionError> {
        let buffer = self.decoder.buffer_mut();
        if buffer.capacity() - buffer.len() < 1024 {
            buffer.reserve(4096);
        }

        let n = self.stream.get_mut().read_buf(buffer).await?;

        if n == 0 {
            return if self.decoder.is_empty() {
                Err(ConnectionError::ClientDisconnected)
            } else {
                Err(ConnectionError::UnexpectedEof {
                    buffered: self.decoder.buffered(),
                })
            };
        }

        self.stats.bytes_read(n);
        trace!(client = %self.addr, bytes = n, "Read data");

        Ok(())
    }

    /// Encodes a reply into the write buffer.
    async fn queue_reply(&mut self, reply: &Reply) -> Result<(), ConnectionError> {
        self.out.clear();
        reply.serialize_into(&mut self.out);
        self.stream.write_all(&self.out).await?;
        self.stats.bytes_written(self.out.len());
        trace!(client = %self.addr, reply = %reply, "Queued reply");
        Ok(())
    }
}

/// Errors that end a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Client disconnected between frames
    #[error("Client disconnected")]
    ClientDisconnected,

    /// Client disconnected in the middle of a frame
    #[error("Unexpected end of stream with {buffered} bytes of partial frame")]
    UnexpectedEof { buffered: usize },
}

/// Handles a client connection to completion.
///
/// Normal disconnects are swallowed; anything else has already been logged
/// by [`ConnectionHandler::run`].
pub async fn handle_connection<S>(
    stream: S,
    addr: SocketAddr,
    command_handler: CommandHandler,
    stats: Arc<ConnectionStats>,
    limits: FrameLimits,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let handler = ConnectionHandler::new(stream, addr, command_handler, stats, limits);
    if let Err(e) = handler.run().await {
        match e {
            ConnectionError::ClientDisconnected => {}
            _ => debug!(client = %addr, error = %e, "Connection ended with error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Store;
    use tokio_test::io::Builder;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:50000".parse().unwrap()
    }

    fn handler_over<S>(stream: S) -> (ConnectionHandler<S>, Arc<Store>, Arc<ConnectionStats>)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let store = Arc::new(Store::new());
        let stats = Arc::new(ConnectionStats::new());
        let handler = ConnectionHandler::new(
            stream,
            test_addr(),
            CommandHandler::new(Arc::clone(&store)),
            Arc::clone(&stats),
            FrameLimits::default(),
        );
        (handler, store, stats)
    }

    #[tokio::test]
    async fn test_ping_pong() {
        let mock = Builder::new()
            .read(b"*1\r\n$4\r\nPING\r\n")
            .write(b"+PONG\r\n")
            .build();

        let (handler, _, _) = handler_over(mock);
        assert!(matches!(
            handler.run().await,
            Err(ConnectionError::ClientDisconnected)
        ));
    }

    #[tokio::test]
    async fn test_frame_split_across_reads() {
        let mock = Builder::new()
            .read(b"*2\r\n$4\r\nEC")
            .read(b"HO\r\n$2\r")
            .read(b"\nhi\r\n")
            .write(b"$2\r\nhi\r\n")
            .build();

        let (handler, _, stats) = handler_over(mock);
        let _ = handler.run().await;
        assert_eq!(stats.commands_processed.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_set_get_scenario() {
        let mock = Builder::new()
            .read(b"*3\r\n$3\r\nSET\r\n$3\r\nfoo\r\n$3\r\nbar\r\n")
            .write(b"+OK\r\n")
            .read(b"*2\r\n$3\r\nGET\r\n$3\r\nfoo\r\n")
            .write(b"$3\r\nbar\r\n")
            .read(b"*2\r\n$3\r\nGET\r\n$7\r\nmissing\r\n")
            .write(b"$-1\r\n")
            .build();

        let (handler, store, _) = handler_over(mock);
        let _ = handler.run().await;
        assert_eq!(store.get("foo"), Some("bar".to_string()));
    }

    #[tokio::test]
    async fn test_pipelined_commands() {
        let mock = Builder::new()
            .read(b"*1\r\n$4\r\nPING\r\n*2\r\n$4\r\nECHO\r\n$1\r\na\r\n*1\r\n$4\r\nPING\r\n")
            .write(b"+PONG\r\n$1\r\na\r\n+PONG\r\n")
            .build();

        let (handler, _, stats) = handler_over(mock);
        let _ = handler.run().await;
        assert_eq!(stats.commands_processed.load(Ordering::Relaxed), 3);
    }

    #[tokio::test]
    async fn test_unknown_command_gets_no_reply() {
        let mock = Builder::new()
            .read(b"*1\r\n$7\r\nFLUSHDB\r\n")
            .read(b"*1\r\n$4\r\nPING\r\n")
            .write(b"+PONG\r\n")
            .build();

        let (handler, _, _) = handler_over(mock);
        let _ = handler.run().await;
    }

    #[tokio::test]
    async fn test_malformed_frame_is_dropped_and_connection_survives() {
        let mock = Builder::new()
            .read(b"*1\r\n$3\r\nPING\r\n")
            .read(b"*1\r\n$4\r\nPING\r\n")
            .write(b"+PONG\r\n")
            .build();

        let (handler, store, stats) = handler_over(mock);
        assert!(matches!(
            handler.run().await,
            Err(ConnectionError::ClientDisconnected)
        ));
        assert_eq!(stats.parse_errors.load(Ordering::Relaxed), 1);
        assert_eq!(stats.commands_processed.load(Ordering::Relaxed), 1);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_eof_mid_frame() {
        let mock = Builder::new().read(b"*1\r\n$4\r\nPI").build();

        let (handler, _, stats) = handler_over(mock);
        assert!(matches!(
            handler.run().await,
            Err(ConnectionError::UnexpectedEof { buffered: 10 })
        ));
        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);
        assert_eq!(stats.connections_accepted.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_stats_track_bytes() {
        let mock = Builder::new()
            .read(b"*1\r\n$4\r\nPING\r\n")
            .write(b"+PONG\r\n")
            .build();

        let (handler, _, stats) = handler_over(mock);
        let _ = handler.run().await;

        assert_eq!(stats.bytes_read.load(Ordering::Relaxed), 14);
        assert_eq!(stats.bytes_written.load(Ordering::Relaxed), 7);
    }
}
