//! Per-cart placement locks.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use onepage_core::CartId;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Locks for carts not touched for this long are dropped. There is no size
/// bound: evicting a held lock would let a second placement in.
const IDLE_EXPIRY: Duration = Duration::from_secs(600);

/// One async mutex per cart id, so a cart is placed at most once at a time.
#[derive(Clone)]
pub struct CartLocks {
    locks: Cache<CartId, Arc<Mutex<()>>>,
}

impl CartLocks {
    #[must_use]
    pub fn new() -> Self {
        let locks = Cache::builder().time_to_idle(IDLE_EXPIRY).build();
        Self { locks }
    }

    /// Take the lock for `cart_id` without waiting.
    ///
    /// Returns `None` while another placement for the same cart holds it.
    pub async fn try_acquire(&self, cart_id: CartId) -> Option<OwnedMutexGuard<()>> {
        let lock = self
            .locks
            .get_with(cart_id, async { Arc::new(Mutex::new(())) })
            .await;
        lock.try_lock_owned().ok()
    }
}

impl Default for CartLocks {
    fn default() -> Self {
        Self::new()
    }
}
