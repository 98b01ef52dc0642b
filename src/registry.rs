//! Registry of live, cancellable deliveries.
//!
//! Every delivery task registers a [`CancellationToken`] here for exactly
//! the lifetime of its attempt loop, so that any thread can stop all
//! outstanding deliveries without holding references to the tasks
//! themselves. Bulk cancellation snapshots the current membership; tokens
//! registered concurrently with the snapshot are not guaranteed to be
//! cancelled.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

/// Concurrency-safe set of cancellation tokens, one per live delivery.
#[derive(Debug, Default)]
pub struct CancelRegistry {
    tokens: Mutex<HashMap<u64, CancellationToken>>,
    next_id: AtomicU64,
}

impl CancelRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a fresh token and returns a guard that removes it on drop.
    ///
    /// The guard ties registry membership to the delivery task's lifetime:
    /// dropping it at any terminal state (or during unwinding) upholds the
    /// invariant that only live deliveries are cancellable.
    pub fn register(self: &Arc<Self>) -> RegistryGuard {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        self.tokens.lock().insert(id, token.clone());
        RegistryGuard { registry: Arc::clone(self), id, token }
    }

    /// Cancels every delivery registered at the time of the call.
    ///
    /// Takes a snapshot, signals each token, then clears the set. Best-effort
    /// by design: this is a shutdown broadcast, not a barrier.
    pub fn cancel_all(&self) {
        let snapshot: Vec<CancellationToken> = {
            let mut tokens = self.tokens.lock();
            tokens.drain().map(|(_, token)| token).collect()
        };

        for token in snapshot {
            token.cancel();
        }
    }

    /// Number of currently registered deliveries.
    pub fn len(&self) -> usize {
        self.tokens.lock().len()
    }

    /// Returns true when no deliveries are registered.
    pub fn is_empty(&self) -> bool {
        self.tokens.lock().is_empty()
    }

    fn remove(&self, id: u64) {
        self.tokens.lock().remove(&id);
    }
}

/// RAII membership of one delivery in the registry.
#[derive(Debug)]
pub struct RegistryGuard {
    registry: Arc<CancelRegistry>,
    id: u64,
    token: CancellationToken,
}

impl RegistryGuard {
    /// The cancellation token observed by this delivery's suspension points.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

impl Drop for RegistryGuard {
    fn drop(&mut self) {
        self.registry.remove(self.id);
    }
}
