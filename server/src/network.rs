//! Server controller coordinating the accept loop and session shutdown

use crate::acceptor::ConnectionAcceptor;
use crate::client_manager::ClientManager;
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::store::SessionStore;
use log::{error, info, warn};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// State shared between the controller, the accept loop and every session
pub(crate) struct ServerShared {
    pub config: ServerConfig,
    pub store: SessionStore,
    pub registry: ClientManager,
    running: AtomicBool,
    accepting: AtomicBool,
}

impl ServerShared {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            store: SessionStore::new(),
            registry: ClientManager::new(),
            running: AtomicBool::new(false),
            accepting: AtomicBool::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Release);
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::Acquire)
    }

    pub fn set_accepting(&self, accepting: bool) {
        self.accepting.store(accepting, Ordering::Release);
    }
}

/// Coarse health of a [`Server`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerStatus {
    Stopped,
    Running,
    /// The accept loop died on an error; existing sessions keep running
    /// until `stop()`.
    Degraded,
}

/// Sequence server owning the accept loop and all session workers
pub struct Server {
    shared: Arc<ServerShared>,
    acceptor: Option<JoinHandle<TcpListener>>,
    local_addr: Option<SocketAddr>,
}

impl Server {
    /// Creates a stopped server listening on all interfaces at `port`
    pub fn new(port: u16) -> Self {
        Self::with_config(ServerConfig::with_port(port))
    }

    pub fn with_config(config: ServerConfig) -> Self {
        Server {
            shared: Arc::new(ServerShared::new(config)),
            acceptor: None,
            local_addr: None,
        }
    }

    /// Configured port
    pub fn port(&self) -> u16 {
        self.shared.config.port
    }

    /// Address actually bound while running
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn config(&self) -> &ServerConfig {
        &self.shared.config
    }

    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    pub fn status(&self) -> ServerStatus {
        if !self.shared.is_running() {
            ServerStatus::Stopped
        } else if self.shared.is_accepting() {
            ServerStatus::Running
        } else {
            ServerStatus::Degraded
        }
    }

    /// Number of session workers that have not been reaped yet
    pub async fn session_count(&self) -> usize {
        self.shared.registry.len().await
    }

    /// Number of clients with stored progression settings
    pub async fn stored_client_count(&self) -> usize {
        self.shared.store.len().await
    }

    /// Binds the endpoint and launches the accept loop
    ///
    /// Does nothing when already running. On error the server stays fully
    /// stopped.
    pub async fn start(&mut self) -> Result<(), ServerError> {
        if self.shared.is_running() {
            return Ok(());
        }

        let listener = ConnectionAcceptor::bind(&self.shared.config)?;
        self.local_addr = listener.local_addr().ok();

        self.shared.set_running(true);
        self.shared.set_accepting(true);

        let acceptor = ConnectionAcceptor::new(listener, Arc::clone(&self.shared));
        self.acceptor = Some(tokio::spawn(acceptor.run()));

        info!(
            "Server listening on {}",
            self.local_addr
                .map(|addr| addr.to_string())
                .unwrap_or_else(|| self.shared.config.bind_addr().to_string())
        );
        Ok(())
    }

    /// Stops accepting, waits for every session to exit and closes the
    /// listening socket
    ///
    /// Does nothing when not running. Sessions observe the stop within one
    /// poll interval.
    pub async fn stop(&mut self) {
        if !self.shared.is_running() {
            return;
        }

        info!("Server shutting down");
        self.shared.set_running(false);

        let listener = match self.acceptor.take() {
            Some(handle) => match handle.await {
                Ok(listener) => Some(listener),
                Err(e) => {
                    error!("Accept task failed: {}", e);
                    None
                }
            },
            None => None,
        };

        // The accept loop is gone, so nothing registers behind our back.
        // Workers already being reaped hold the registry lock until they
        // finish, so the drain below sees every remaining one.
        let sessions = self.shared.registry.drain().await;
        let session_total = sessions.len();
        for (id, handle) in sessions {
            if let Err(e) = handle.await {
                warn!("Session worker for client {} failed: {}", id, e);
            }
        }

        drop(listener);
        self.local_addr = None;
        self.shared.set_accepting(false);

        info!("Server stopped ({} sessions closed)", session_total);
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        // Tasks wind down by themselves once they see the flag
        self.shared.set_running(false);
    }
}
