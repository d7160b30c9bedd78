//! Listening endpoint and accept loop

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::network::ServerShared;
use crate::session::SessionWorker;
use log::{debug, error, info};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::time::timeout;

/// Owns the listening socket and spawns one session worker per connection
pub(crate) struct ConnectionAcceptor {
    listener: TcpListener,
    shared: Arc<ServerShared>,
}

impl ConnectionAcceptor {
    /// Creates, configures, binds and listens on the endpoint. Any failure
    /// here is fatal for server startup.
    pub fn bind(config: &ServerConfig) -> Result<TcpListener, ServerError> {
        let addr = config.bind_addr();

        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        }
        .map_err(|source| ServerError::Socket { addr, source })?;

        socket
            .set_reuseaddr(true)
            .map_err(|source| ServerError::ReuseAddr { addr, source })?;

        socket
            .bind(addr)
            .map_err(|source| ServerError::Bind { addr, source })?;

        socket
            .listen(config.backlog)
            .map_err(|source| ServerError::Listen { addr, source })
    }

    pub fn new(listener: TcpListener, shared: Arc<ServerShared>) -> Self {
        Self { listener, shared }
    }

    /// Accepts connections until the running flag is cleared or accepting
    /// fails. Hands the listener back so the controller decides when it is
    /// closed.
    pub async fn run(self) -> TcpListener {
        let poll_interval = self.shared.config.poll_interval;

        while self.shared.is_running() {
            match timeout(poll_interval, self.listener.accept()).await {
                // Timeout, loop around and look at the running flag
                Err(_) => continue,
                Ok(Ok((stream, peer))) => self.spawn_session(stream, peer).await,
                Ok(Err(e)) if is_transient(&e) => {
                    debug!("accept() returned nothing: {}", e);
                }
                Ok(Err(e)) => {
                    error!("accept() failed: {}", e);
                    self.shared.set_accepting(false);
                    return self.listener;
                }
            }
        }

        debug!("Accept loop stopped");
        self.shared.set_accepting(false);
        self.listener
    }

    async fn spawn_session(&self, stream: TcpStream, peer: SocketAddr) {
        let id = self.shared.registry.next_id();
        info!("new connection accepted (client: {}, peer: {})", id, peer);

        let worker = SessionWorker::new(id, stream, peer, Arc::clone(&self.shared));
        self.shared
            .registry
            .register(id, move || tokio::spawn(worker.run()))
            .await;
    }
}

/// Errors after which the accept loop simply tries again
fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock
            | io::ErrorKind::Interrupted
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
    )
}
