use std::sync::Arc;

use tokio::sync::RwLock;

use crate::event::DetectionEvent;

/// Append-only, ordered sequence of detection events. Cloneable handle;
/// insertion order is display order. Unbounded by design: this is a
/// session-scoped operator log, not a persisted audit trail.
#[derive(Clone, Default)]
pub struct DetectionLog {
    inner: Arc<RwLock<Vec<DetectionEvent>>>,
}

impl DetectionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn append(&self, event: DetectionEvent) {
        self.inner.write().await.push(event);
    }

    pub async fn clear(&self) {
        self.inner.write().await.clear();
    }

    /// Full ordered sequence for display; never destructive.
    pub async fn snapshot(&self) -> Vec<DetectionEvent> {
        self.inner.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}
