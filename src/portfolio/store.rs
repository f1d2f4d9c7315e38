use std::sync::Arc;

use tokio::sync::{broadcast, watch};

use crate::models::PortfolioSnapshot;

/// Holds the latest published portfolio snapshot.
///
/// Readers get an `Arc` to an immutable snapshot; a publish swaps the whole
/// value. Only the refresh coordinator publishes.
#[derive(Clone)]
pub struct PortfolioStore {
    tx: watch::Sender<Arc<PortfolioSnapshot>>,
    updates: broadcast::Sender<Arc<PortfolioSnapshot>>,
}

impl PortfolioStore {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Arc::new(PortfolioSnapshot::idle()));
        let (updates, _) = broadcast::channel(64);
        Self { tx, updates }
    }

    pub fn current(&self) -> Arc<PortfolioSnapshot> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<PortfolioSnapshot>> {
        self.tx.subscribe()
    }

    /// Every publication, in order, for push-style consumers such as the
    /// WebSocket feed. Slow receivers may lag and skip entries.
    pub fn updates(&self) -> broadcast::Receiver<Arc<PortfolioSnapshot>> {
        self.updates.subscribe()
    }

    /// Wait until a settled (`Ready` or `Failed`) snapshot of generation
    /// `generation` or later is published.
    pub async fn wait_for_generation(&self, generation: u64) -> Arc<PortfolioSnapshot> {
        let mut rx = self.subscribe();
        let result = rx
            .wait_for(|s| s.as_of >= generation && s.status.is_settled())
            .await
            .map(|s| s.clone());
        match result {
            Ok(snapshot) => snapshot,
            // The sender lives in `self`, so the channel cannot close here.
            Err(_) => self.current(),
        }
    }

    pub(crate) fn publish(&self, snapshot: PortfolioSnapshot) {
        let snapshot = Arc::new(snapshot);
        self.tx.send_replace(Arc::clone(&snapshot));
        // No WebSocket subscribers is not an error.
        let _ = self.updates.send(snapshot);
    }
}

impl Default for PortfolioStore {
    fn default() -> Self {
        Self::new()
    }
}
