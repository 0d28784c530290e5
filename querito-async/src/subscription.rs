use crate::resource_cache::{settled_result, Inner};
use querito_core::{CacheEntry, CacheKey, QueryError, Result};
use serde_json::Value;
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tracing::trace;

/// A mounted reader of one cache key.
///
/// While alive it counts as a subscriber of its entry: the entry is never
/// garbage collected and invalidation revalidates it immediately. Dropping the
/// handle unsubscribes exactly once.
pub struct Subscription {
    key: CacheKey,
    rx: watch::Receiver<CacheEntry>,
    inner: Weak<Inner>,
    active: bool,
}

impl Subscription {
    pub(crate) fn new(key: CacheKey, rx: watch::Receiver<CacheEntry>, inner: Weak<Inner>) -> Self {
        Self {
            key,
            rx,
            inner,
            active: true,
        }
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Latest published snapshot.
    pub fn current(&self) -> CacheEntry {
        self.rx.borrow().clone()
    }

    /// Waits for the next status, data, error or invalidation change.
    ///
    /// # Errors
    ///
    /// [`QueryError::Closed`] once the entry has been removed.
    pub async fn changed(&mut self) -> Result<CacheEntry> {
        self.rx.changed().await.map_err(|_| QueryError::Closed)?;
        Ok(self.rx.borrow_and_update().clone())
    }

    /// Waits until no request is in flight and returns the data or the error.
    pub async fn settled(&mut self) -> Result<Arc<Value>> {
        let entry = {
            let settled = self
                .rx
                .wait_for(CacheEntry::is_settled)
                .await
                .map_err(|_| QueryError::Closed)?;
            settled.clone()
        };
        settled_result(entry)
    }

    /// Unmounts the reader. Equivalent to dropping it.
    pub fn unsubscribe(self) {}

    fn release(&mut self) {
        if !std::mem::take(&mut self.active) {
            return;
        }
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        if let Some(mut slot) = inner.entries.get_mut(&self.key) {
            if slot.state.unsubscribe() {
                slot.publish();
                trace!(key = %self.key, remaining = slot.state.subscribers(), "unsubscribed");
            }
        };
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .field("active", &self.active)
            .finish()
    }
}
