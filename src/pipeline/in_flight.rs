use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::ProductId;

/// At most one render per product identifier at a time.
#[derive(Default)]
pub struct InFlight {
    locks: Mutex<HashMap<ProductId, Arc<AsyncMutex<()>>>>,
}

impl InFlight {
    pub async fn acquire(&self, product: &ProductId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            // Drop entries nobody is holding or waiting on.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(product.clone()).or_default().clone()
        };
        lock.lock_owned().await
    }
}
