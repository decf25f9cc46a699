use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;

use cairn_types::ObjectId;

/// Indexing state for one store instance: the set of object IDs with an
/// indexing attempt in progress.
#[derive(Debug, Default)]
pub struct IndexState {
    in_flight: Mutex<HashSet<ObjectId>>,
    released: Notify,
}

impl IndexState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the in-flight slot for `id`. `None` if another attempt holds it.
    pub fn try_claim(self: &Arc<Self>, id: ObjectId) -> Option<InFlightGuard> {
        let claimed = self
            .in_flight
            .lock()
            .expect("in-flight lock poisoned")
            .insert(id);
        claimed.then(|| InFlightGuard {
            state: Arc::clone(self),
            id,
        })
    }

    pub fn is_in_flight(&self, id: &ObjectId) -> bool {
        self.in_flight
            .lock()
            .expect("in-flight lock poisoned")
            .contains(id)
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().expect("in-flight lock poisoned").len()
    }

    /// Wait until `id` is not in flight, up to `timeout`. Returns `false` if
    /// it is still in flight at the deadline.
    pub async fn wait_released(&self, id: &ObjectId, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.released.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if !self.is_in_flight(id) {
                return true;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return !self.is_in_flight(id);
            }
        }
    }

    /// Claim `id`, waiting up to `timeout` for a current holder to finish.
    pub async fn claim(self: &Arc<Self>, id: ObjectId, timeout: Duration) -> Option<InFlightGuard> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(guard) = self.try_claim(id) {
                return Some(guard);
            }
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if !self.wait_released(&id, remaining).await {
                return None;
            }
        }
    }

    fn release(&self, id: &ObjectId) {
        self.in_flight
            .lock()
            .expect("in-flight lock poisoned")
            .remove(id);
        self.released.notify_waiters();
    }
}

/// Holds an in-flight slot; releases it on drop, whether the attempt
/// finished, failed, panicked or was aborted.
#[derive(Debug)]
pub struct InFlightGuard {
    state: Arc<IndexState>,
    id: ObjectId,
}

impl InFlightGuard {
    pub fn id(&self) -> ObjectId {
        self.id
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.state.release(&self.id);
    }
}
