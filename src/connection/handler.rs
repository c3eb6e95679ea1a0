//! Per-Client Connection Handling
//!
//! Every accepted socket gets its own task running a [`Connection`]: read
//! bytes into a pending buffer, peel off as many complete frames as the
//! buffer holds, execute each against the command handler, write the
//! replies back, repeat until the peer hangs up or violates the
//! protocol.
//!
//! The pending buffer is bounded; a peer that streams an endless
//! never-completing frame is disconnected rather than buffered forever.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::BytesMut;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tracing::{debug, info, trace, warn};

use crate::commands::CommandHandler;
use crate::protocol::{decode, Frame, FrameError};

/// Cap on buffered not-yet-parsable bytes per connection.
const MAX_PENDING: usize = 64 * 1024;

/// Initial pending-buffer capacity.
const INITIAL_CAPACITY: usize = 4096;

/// Server-wide connection counters.
#[derive(Debug, Default)]
pub struct ConnectionStats {
    pub accepted: AtomicU64,
    pub active: AtomicU64,
    pub commands: AtomicU64,
    pub bytes_in: AtomicU64,
    pub bytes_out: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn opened(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
        self.active.fetch_add(1, Ordering::Relaxed);
    }

    fn closed(&self) {
        self.active.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Why a connection ended.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol violation: {0}")]
    Protocol(#[from] FrameError),

    /// The peer closed the socket between frames. The normal ending.
    #[error("peer disconnected")]
    Closed,

    /// The peer closed the socket mid-frame.
    #[error("connection closed inside a frame")]
    TruncatedFrame,

    /// The peer exceeded the pending-buffer cap without completing a
    /// frame.
    #[error("pending buffer limit exceeded")]
    PendingLimit,
}

/// One client connection.
pub struct Connection {
    stream: BufWriter<TcpStream>,
    peer: SocketAddr,
    pending: BytesMut,
    handler: CommandHandler,
    stats: Arc<ConnectionStats>,
}

impl Connection {
    pub fn new(
        stream: TcpStream,
        peer: SocketAddr,
        handler: CommandHandler,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        stats.opened();
        Self {
            stream: BufWriter::new(stream),
            peer,
            pending: BytesMut::with_capacity(INITIAL_CAPACITY),
            handler,
            stats,
        }
    }

    /// Runs the connection to completion.
    pub async fn serve(mut self) -> Result<(), ConnectionError> {
        info!(peer = %self.peer, "client connected");
        let outcome = self.pump().await;
        self.stats.closed();
        match &outcome {
            Err(ConnectionError::Closed) => {
                debug!(peer = %self.peer, "client disconnected");
            }
            Err(err) => {
                warn!(peer = %self.peer, error = %err, "connection ended");
            }
            Ok(()) => {}
        }
        outcome
    }

    async fn pump(&mut self) -> Result<(), ConnectionError> {
        loop {
            while let Some(command) = self.next_frame()? {
                let reply = self.handler.execute(command);
                self.stats.commands.fetch_add(1, Ordering::Relaxed);
                self.reply(&reply).await?;
            }
            self.fill().await?;
        }
    }

    /// Peels one complete frame off the pending buffer, if present.
    fn next_frame(&mut self) -> Result<Option<Frame>, ConnectionError> {
        match decode(&self.pending)? {
            Some((frame, consumed)) => {
                let _ = self.pending.split_to(consumed);
                trace!(peer = %self.peer, consumed, "frame decoded");
                Ok(Some(frame))
            }
            None => Ok(None),
        }
    }

    /// Reads more bytes from the socket into the pending buffer.
    async fn fill(&mut self) -> Result<(), ConnectionError> {
        if self.pending.len() >= MAX_PENDING {
            return Err(ConnectionError::PendingLimit);
        }

        let n = self.stream.get_mut().read_buf(&mut self.pending).await?;
        if n == 0 {
            return if self.pending.is_empty() {
                Err(ConnectionError::Closed)
            } else {
                Err(ConnectionError::TruncatedFrame)
            };
        }
        self.stats.bytes_in.fetch_add(n as u64, Ordering::Relaxed);
        trace!(peer = %self.peer, bytes = n, "read");
        Ok(())
    }

    async fn reply(&mut self, frame: &Frame) -> Result<(), ConnectionError> {
        let bytes = frame.encode();
        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;
        self.stats
            .bytes_out
            .fetch_add(bytes.len() as u64, Ordering::Relaxed);
        Ok(())
    }
}

/// Spawn target for the accept loop: serves the connection and keeps
/// expected endings quiet.
pub async fn handle_client(
    stream: TcpStream,
    peer: SocketAddr,
    handler: CommandHandler,
    stats: Arc<ConnectionStats>,
) {
    let connection = Connection::new(stream, peer, handler, stats);
    match connection.serve().await {
        Ok(()) | Err(ConnectionError::Closed) => {}
        Err(ConnectionError::Io(err))
            if err.kind() == std::io::ErrorKind::ConnectionReset => {}
        Err(err) => {
            debug!(peer = %peer, error = %err, "connection error");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ValueStore;
    use std::time::Duration;
    use tokio::net::TcpListener;

    async fn spawn_server() -> (SocketAddr, Arc<ValueStore>, Arc<ConnectionStats>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let store = Arc::new(ValueStore::default());
        let stats = Arc::new(ConnectionStats::new());

        let accept_store = Arc::clone(&store);
        let accept_stats = Arc::clone(&stats);
        tokio::spawn(async move {
            while let Ok((stream, peer)) = listener.accept().await {
                let handler = CommandHandler::new(Arc::clone(&accept_store));
                let stats = Arc::clone(&accept_stats);
                tokio::spawn(handle_client(stream, peer, handler, stats));
            }
        });

        (addr, store, stats)
    }

    async fn roundtrip(client: &mut TcpStream, request: &[u8]) -> Vec<u8> {
        client.write_all(request).await.unwrap();
        let mut buf = vec![0u8; 1024];
        let n = client.read(&mut buf).await.unwrap();
        buf.truncate(n);
        buf
    }

    #[tokio::test]
    async fn ping_pong() {
        let (addr, _, _) = spawn_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();
        let reply = roundtrip(&mut client, b"*1\r\n$4\r\nPING\r\n").await;
        assert_eq!(reply, b"+pong\r\n");
    }

    #[tokio::test]
    async fn set_then_get_over_the_wire() {
        let (addr, _, _) = spawn_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        let reply = roundtrip(
            &mut client,
            b"*3\r\n$3\r\nSET\r\n$4\r\nname\r\n$3\r\nada\r\n",
        )
        .await;
        assert_eq!(reply, b"+ok\r\n");

        let reply = roundtrip(&mut client, b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n").await;
        assert_eq!(reply, b"*2\r\n$3\r\nada\r\n:0\r\n");
    }

    #[tokio::test]
    async fn list_and_map_verbs_over_the_wire() {
        let (addr, _, _) = spawn_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        roundtrip(&mut client, b"*3\r\n$5\r\nRPUSH\r\n$3\r\ntbr\r\n$8\r\nmistborn\r\n").await;
        roundtrip(&mut client, b"*3\r\n$5\r\nLPUSH\r\n$3\r\ntbr\r\n$8\r\nelantris\r\n").await;
        let reply = roundtrip(&mut client, b"*2\r\n$7\r\nGETLIST\r\n$3\r\ntbr\r\n").await;
        assert_eq!(
            reply,
            b"*2\r\n:0\r\n*2\r\n$8\r\nelantris\r\n$8\r\nmistborn\r\n".as_slice()
        );

        let reply = roundtrip(
            &mut client,
            b"*4\r\n$5\r\nHMSET\r\n$5\r\nbooks\r\n$5\r\nscifi\r\n$4\r\ndune\r\n",
        )
        .await;
        assert_eq!(reply, b"+ok\r\n");
        let reply = roundtrip(&mut client, b"*2\r\n$6\r\nGETMAP\r\n$5\r\nbooks\r\n").await;
        assert_eq!(
            reply,
            b"*2\r\n:0\r\n*2\r\n$5\r\nscifi\r\n$4\r\ndune\r\n".as_slice()
        );
    }

    #[tokio::test]
    async fn pipelined_commands_each_get_a_reply() {
        let (addr, _, _) = spawn_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client
            .write_all(
                b"*3\r\n$3\r\nSET\r\n$1\r\na\r\n$1\r\n1\r\n\
                  *3\r\n$3\r\nSET\r\n$1\r\nb\r\n$1\r\n2\r\n\
                  *1\r\n$6\r\nDBSIZE\r\n",
            )
            .await
            .unwrap();

        let expected = b"+ok\r\n+ok\r\n:2\r\n";
        let mut collected = Vec::new();
        let mut buf = [0u8; 256];
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while collected.len() < expected.len() && tokio::time::Instant::now() < deadline {
            match tokio::time::timeout(Duration::from_millis(100), client.read(&mut buf)).await {
                Ok(Ok(n)) if n > 0 => collected.extend_from_slice(&buf[..n]),
                _ => break,
            }
        }
        assert_eq!(collected, expected);
    }

    #[tokio::test]
    async fn protocol_violation_closes_the_connection() {
        let (addr, _, _) = spawn_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client.write_all(b"@garbage\r\n").await.unwrap();
        let mut buf = [0u8; 16];
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(n, 0, "server should hang up on a protocol violation");
    }

    #[tokio::test]
    async fn stats_track_the_session() {
        let (addr, _, stats) = spawn_server().await;

        let mut client = TcpStream::connect(addr).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(stats.accepted.load(Ordering::Relaxed), 1);
        assert_eq!(stats.active.load(Ordering::Relaxed), 1);

        let _ = roundtrip(&mut client, b"*1\r\n$4\r\nPING\r\n").await;
        assert!(stats.commands.load(Ordering::Relaxed) >= 1);
        assert!(stats.bytes_in.load(Ordering::Relaxed) > 0);
        assert!(stats.bytes_out.load(Ordering::Relaxed) > 0);

        drop(client);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(stats.active.load(Ordering::Relaxed), 0);
    }
}
