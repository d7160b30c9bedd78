//! Per-connection session worker
//!
//! A worker owns one accepted `TcpStream` and walks a small state machine:
//!
//! ```text
//! Connected --export seq--> Exporting --write error / shutdown--> Closed
//!     |  ^                      |
//!     |  +--nothing configured--+
//!     +--peer close / shutdown / read error--> Closed
//! ```
//!
//! Every blocking step waits at most one poll interval so the shared
//! running flag is observed promptly. Once exporting, nothing more is read
//! from the connection.

use crate::client_manager::ClientId;
use crate::network::ServerShared;
use log::{debug, info, warn};
use shared::{parse_commands, Command, ProgressionSet, EXPORT_SLICES, RECV_BUFFER_SIZE};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Reading configuration commands
    Connected,
    /// Streaming counter values, terminal for command intake
    Exporting,
    Closed,
}

/// Outcome of pushing one exported line onto the connection
enum SendOutcome {
    Sent,
    Shutdown,
}

pub(crate) struct SessionWorker {
    id: ClientId,
    peer: SocketAddr,
    stream: TcpStream,
    shared: Arc<ServerShared>,
}

impl SessionWorker {
    pub fn new(id: ClientId, stream: TcpStream, peer: SocketAddr, shared: Arc<ServerShared>) -> Self {
        Self {
            id,
            peer,
            stream,
            shared,
        }
    }

    /// Drives the session until it closes, then tears it down.
    pub async fn run(mut self) {
        let mut state = SessionState::Connected;

        while state != SessionState::Closed {
            state = match state {
                SessionState::Connected => self.receive().await,
                SessionState::Exporting => self.export().await,
                SessionState::Closed => SessionState::Closed,
            };
        }

        self.teardown().await;
    }

    async fn receive(&mut self) -> SessionState {
        if !self.shared.is_running() {
            return SessionState::Closed;
        }

        let mut buf = [0u8; RECV_BUFFER_SIZE];

        match timeout(self.shared.config.poll_interval, self.stream.read(&mut buf)).await {
            Err(_) => {
                if self.shared.is_running() {
                    SessionState::Connected
                } else {
                    debug!("Client {} closing on server shutdown", self.id);
                    SessionState::Closed
                }
            }
            Ok(Ok(0)) => {
                info!("client {} disconnected", self.id);
                SessionState::Closed
            }
            Ok(Ok(len)) => self.dispatch(&buf[..len]).await,
            Ok(Err(e)) => {
                warn!("recv from client {} failed: {}", self.id, e);
                SessionState::Closed
            }
        }
    }

    /// Applies every command of one receive buffer in order. An export
    /// request ends intake for the rest of the buffer.
    async fn dispatch(&mut self, buf: &[u8]) -> SessionState {
        for parsed in parse_commands(buf) {
            match parsed {
                Ok(Command::Configure { slot, start, step }) => {
                    if self.shared.store.configure(self.id, slot, start, step).await {
                        info!(
                            "client {}: adding subseq {}: {}, {}",
                            self.id, slot, start, step
                        );
                    }
                }
                Ok(Command::Export) => return SessionState::Exporting,
                Err(e) => debug!("client {}: discarding command: {}", self.id, e),
            }
        }

        SessionState::Connected
    }

    async fn export(&mut self) -> SessionState {
        let mut sequence = self.shared.store.snapshot(self.id).await;

        if sequence.is_empty() {
            info!("sequence for client {} has not been configured yet", self.id);
            return SessionState::Connected;
        }

        info!(
            "client {}: exporting {} subsequence(s)",
            self.id,
            sequence.len()
        );

        let slice = self.shared.config.export_period / EXPORT_SLICES;

        loop {
            match self.send_values(&sequence).await {
                Ok(SendOutcome::Sent) => {}
                Ok(SendOutcome::Shutdown) => return SessionState::Closed,
                Err(e) => {
                    warn!("send to client {} failed: {}", self.id, e);
                    return SessionState::Closed;
                }
            }

            sequence.advance_all();

            for _ in 0..EXPORT_SLICES {
                if !self.shared.is_running() {
                    return SessionState::Closed;
                }
                sleep(slice).await;
            }
        }
    }

    /// Writes the rendered set plus a newline, giving up early if the server
    /// stops while the peer is not draining its socket.
    async fn send_values(&mut self, sequence: &ProgressionSet) -> io::Result<SendOutcome> {
        let line = format!("{}\n", sequence);
        let bytes = line.as_bytes();
        let mut written = 0;

        let poll_interval = self.shared.config.poll_interval;

        while written < bytes.len() {
            match timeout(poll_interval, self.stream.write(&bytes[written..])).await {
                Err(_) => {
                    if !self.shared.is_running() {
                        return Ok(SendOutcome::Shutdown);
                    }
                }
                Ok(Ok(0)) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(Ok(len)) => written += len,
                Ok(Err(e)) => return Err(e),
            }
        }

        Ok(SendOutcome::Sent)
    }

    /// Closes the connection, forgets the client's settings and hands
    /// deregistration to a reaper task.
    async fn teardown(self) {
        let SessionWorker {
            id,
            peer,
            mut stream,
            shared,
        } = self;

        if let Err(e) = stream.shutdown().await {
            debug!("shutdown of client {} ({}) failed: {}", id, peer, e);
        }
        drop(stream);

        shared.store.remove(id).await;
        debug!("Client {} ({}) session closed", id, peer);

        tokio::spawn(async move {
            shared.registry.reap(id).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::net::TcpListener;

    /// Accepts one loopback connection and runs a registered worker on it.
    async fn start_session(shared: &Arc<ServerShared>) -> (ClientId, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let client = TcpStream::connect(addr).await.unwrap();
        let (stream, peer) = listener.accept().await.unwrap();

        let id = shared.registry.next_id();
        let worker = SessionWorker::new(id, stream, peer, Arc::clone(shared));
        shared
            .registry
            .register(id, move || tokio::spawn(worker.run()))
            .await;

        (id, client)
    }

    fn running_shared() -> Arc<ServerShared> {
        let shared = Arc::new(ServerShared::new(ServerConfig::with_port(0)));
        shared.set_running(true);
        shared
    }

    async fn wait_until_reaped(shared: &ServerShared, id: ClientId) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while shared.registry.contains(id).await {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("session was not reaped");
    }

    #[tokio::test]
    async fn test_configure_then_export() {
        let shared = running_shared();
        let (id, client) = start_session(&shared).await;
        let (reader, mut writer) = client.into_split();
        let mut lines = BufReader::new(reader).lines();

        writer.write_all(b"seq1 10 5\r\n").await.unwrap();
        sleep(Duration::from_millis(50)).await;
        assert_eq!(shared.store.snapshot(id).await.render(), "10");

        writer.write_all(b"export seq\r\n").await.unwrap();
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "10");
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "15");
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "20");

        drop(lines);
        drop(writer);
        wait_until_reaped(&shared, id).await;
        assert!(!shared.store.contains(id).await);
    }

    #[tokio::test]
    async fn test_multiple_commands_in_one_buffer() {
        let shared = running_shared();
        let (_id, client) = start_session(&shared).await;
        let (reader, mut writer) = client.into_split();
        let mut lines = BufReader::new(reader).lines();

        writer
            .write_all(b"seq1 1 1\nseq3 100 10\nseq9 5 5\nexport seq\n")
            .await
            .unwrap();

        assert_eq!(lines.next_line().await.unwrap().unwrap(), "1 100");
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "2 110");
    }

    #[tokio::test]
    async fn test_export_without_configuration_keeps_session() {
        let shared = running_shared();
        let (id, client) = start_session(&shared).await;
        let (reader, mut writer) = client.into_split();
        let mut lines = BufReader::new(reader).lines();

        writer.write_all(b"export seq\n").await.unwrap();

        let nothing = tokio::time::timeout(Duration::from_millis(250), lines.next_line()).await;
        assert!(nothing.is_err(), "server sent data for an empty export");
        assert!(shared.registry.contains(id).await);

        writer.write_all(b"seq2 7 3\n").await.unwrap();
        sleep(Duration::from_millis(50)).await;
        writer.write_all(b"export seq\n").await.unwrap();

        assert_eq!(lines.next_line().await.unwrap().unwrap(), "7");
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "10");
    }

    #[tokio::test]
    async fn test_peer_close_tears_down() {
        let shared = running_shared();
        let (id, mut client) = start_session(&shared).await;

        client.write_all(b"seq1 3 3\n").await.unwrap();
        sleep(Duration::from_millis(50)).await;
        assert!(shared.store.contains(id).await);

        drop(client);
        wait_until_reaped(&shared, id).await;

        assert!(shared.store.is_empty().await);
        assert_eq!(shared.registry.len().await, 0);
    }

    #[tokio::test]
    async fn test_shutdown_stops_exporting_session() {
        let shared = running_shared();
        let (id, client) = start_session(&shared).await;
        let (reader, mut writer) = client.into_split();
        let mut lines = BufReader::new(reader).lines();

        writer.write_all(b"seq1 1 1\nexport seq\n").await.unwrap();
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "1");

        shared.set_running(false);
        wait_until_reaped(&shared, id).await;
        assert!(!shared.store.contains(id).await);
    }
}
