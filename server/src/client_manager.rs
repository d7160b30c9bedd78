//! Registry of live session workers
//!
//! This module tracks every task that currently owns a client connection:
//! - Client identity allocation (monotonic, never reused by one server)
//! - Registration of a worker handle at accept time
//! - Reaping of finished workers from a helper task
//! - Draining of all remaining workers on shutdown
//!
//! A worker cannot await its own `JoinHandle`, so it never removes itself.
//! At teardown it spawns a reaper that awaits the worker and then drops the
//! registry entry.

use log::{debug, warn};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Identity of one accepted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub u64);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Manages the worker handles of all connected clients
///
/// The map is guarded by a single lock. Registration spawns the worker while
/// holding that lock, so a reaper started by a very short lived worker always
/// finds the entry it is looking for.
pub struct ClientManager {
    /// Worker handles indexed by client identity
    sessions: Mutex<HashMap<ClientId, JoinHandle<()>>>,
    /// Next identity handed out to an accepted connection
    next_client_id: AtomicU64,
}

impl ClientManager {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            next_client_id: AtomicU64::new(1),
        }
    }

    /// Allocates a fresh client identity
    pub fn next_id(&self) -> ClientId {
        ClientId(self.next_client_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Starts a worker and records its handle under `id`
    ///
    /// `spawn` runs with the registry lock held and must only start the task,
    /// never wait on it.
    pub async fn register<F>(&self, id: ClientId, spawn: F)
    where
        F: FnOnce() -> JoinHandle<()>,
    {
        let mut sessions = self.sessions.lock().await;
        let handle = spawn();

        if let Some(previous) = sessions.insert(id, handle) {
            // Identities are never reused, so this only happens on misuse
            warn!("Client {} was registered twice", id);
            previous.abort();
        }
    }

    /// Waits for the worker registered under `id` to finish, then removes it
    ///
    /// Called from a detached helper task spawned by the worker itself. Does
    /// nothing if the entry was already drained by a shutdown.
    pub async fn reap(&self, id: ClientId) {
        let mut sessions = self.sessions.lock().await;

        let Some(handle) = sessions.get_mut(&id) else {
            debug!("Client {} already reaped", id);
            return;
        };

        if let Err(e) = handle.await {
            warn!("Session worker for client {} failed: {}", id, e);
        }

        sessions.remove(&id);
        debug!("Client {} removed from registry", id);
    }

    /// Takes every remaining worker handle out of the registry
    pub async fn drain(&self) -> Vec<(ClientId, JoinHandle<()>)> {
        self.sessions.lock().await.drain().collect()
    }

    pub async fn contains(&self, id: ClientId) -> bool {
        self.sessions.lock().await.contains_key(&id)
    }

    /// Returns the number of registered workers
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}

impl Default for ClientManager {
    fn default() -> Self {
        Self::new()
    }
}
