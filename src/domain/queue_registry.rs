//! Concurrent waitlist storage with per-restaurant locking.
//!
//! [`QueueRegistry`] keeps one [`RestaurantQueue`] per restaurant behind
//! its own [`tokio::sync::Mutex`], so renumbering is serialized within a
//! restaurant while different restaurants proceed in parallel. A second
//! index maps entry ids to their restaurant.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use super::restaurant_queue::RestaurantQueue;
use super::wait_time::TurnoverSettings;
use super::{EntryId, RestaurantId};
use crate::error::GatewayError;

/// Central store for all restaurant waitlists.
///
/// Queues are created lazily with the registry's default
/// [`TurnoverSettings`] the first time a restaurant is touched.
#[derive(Debug)]
pub struct QueueRegistry {
    queues: RwLock<HashMap<RestaurantId, Arc<Mutex<RestaurantQueue>>>>,
    entry_index: RwLock<HashMap<EntryId, RestaurantId>>,
    default_settings: TurnoverSettings,
}

impl QueueRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(default_settings: TurnoverSettings) -> Self {
        Self {
            queues: RwLock::new(HashMap::new()),
            entry_index: RwLock::new(HashMap::new()),
            default_settings,
        }
    }

    /// Returns the queue for a restaurant, creating it if needed.
    pub async fn queue(&self, restaurant_id: RestaurantId) -> Arc<Mutex<RestaurantQueue>> {
        if let Some(existing) = self.queues.read().await.get(&restaurant_id) {
            return Arc::clone(existing);
        }
        let mut map = self.queues.write().await;
        Arc::clone(map.entry(restaurant_id).or_insert_with(|| {
            Arc::new(Mutex::new(RestaurantQueue::new(
                restaurant_id,
                self.default_settings,
            )))
        }))
    }

    /// Returns the queue holding the given entry.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::EntryNotFound`] if the entry was never
    /// registered.
    pub async fn queue_for_entry(
        &self,
        entry_id: EntryId,
    ) -> Result<Arc<Mutex<RestaurantQueue>>, GatewayError> {
        let restaurant_id = self
            .entry_index
            .read()
            .await
            .get(&entry_id)
            .copied()
            .ok_or(GatewayError::EntryNotFound(*entry_id.as_uuid()))?;
        Ok(self.queue(restaurant_id).await)
    }

    /// Records which restaurant an entry belongs to.
    pub async fn index_entry(&self, entry_id: EntryId, restaurant_id: RestaurantId) {
        self.entry_index
            .write()
            .await
            .insert(entry_id, restaurant_id);
    }

    /// Returns handles to every queue created so far.
    pub async fn all(&self) -> Vec<Arc<Mutex<RestaurantQueue>>> {
        self.queues.read().await.values().map(Arc::clone).collect()
    }

    /// Returns the number of restaurants with a queue.
    pub async fn len(&self) -> usize {
        self.queues.read().await.len()
    }

    /// Returns `true` if no queue exists yet.
    pub async fn is_empty(&self) -> bool {
        self.queues.read().await.is_empty()
    }
}

impl Default for QueueRegistry {
    fn default() -> Self {
        Self::new(TurnoverSettings::default())
    }
}
