//! Per-client progression settings shared by all session workers

use crate::client_manager::ClientId;
use log::debug;
use shared::ProgressionSet;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Maps each client to the progressions it configured
///
/// One coarse lock covers the whole map. Every operation is a single hash
/// lookup, so holding it briefly from many workers is cheap. Readers get an
/// owned copy; a worker streaming values advances its copy without touching
/// the store.
#[derive(Default)]
pub struct SessionStore {
    sequences: Mutex<HashMap<ClientId, ProgressionSet>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets slot `slot` of the client's progression set, creating the set on
    /// first use. Returns whether a counter was installed.
    pub async fn configure(&self, client_id: ClientId, slot: u8, start: u32, step: u32) -> bool {
        let mut sequences = self.sequences.lock().await;
        let applied = sequences
            .entry(client_id)
            .or_default()
            .set_slot(slot, start, step);

        if !applied {
            debug!(
                "Ignoring subsequence {} ({}, {}) for client {}",
                slot, start, step, client_id
            );
        }

        applied
    }

    /// Returns an independent copy of the client's progression set, or an
    /// empty set for an unknown client. Never creates an entry.
    pub async fn snapshot(&self, client_id: ClientId) -> ProgressionSet {
        self.sequences
            .lock()
            .await
            .get(&client_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Forgets the client. Returns true if an entry existed.
    pub async fn remove(&self, client_id: ClientId) -> bool {
        self.sequences.lock().await.remove(&client_id).is_some()
    }

    pub async fn contains(&self, client_id: ClientId) -> bool {
        self.sequences.lock().await.contains_key(&client_id)
    }

    /// Number of clients with a stored progression set
    pub async fn len(&self) -> usize {
        self.sequences.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sequences.lock().await.is_empty()
    }
}
