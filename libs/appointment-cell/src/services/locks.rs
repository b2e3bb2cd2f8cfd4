use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Per-doctor serialization point for the booking read-then-write. Holding
/// the guard across the conflict check and the insert closes the
/// check-then-act window between two concurrent bookings for the same
/// doctor; bookings for different doctors proceed independently.
pub struct SlotLocks {
    inner: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl SlotLocks {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    pub async fn acquire(&self, doctor_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            Arc::clone(
                map.entry(doctor_id)
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };

        lock.lock_owned().await
    }
}

impl Default for SlotLocks {
    fn default() -> Self {
        Self::new()
    }
}
