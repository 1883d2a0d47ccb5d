//! Queue service: waitlist operations and `queue_updated` fan-out.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::domain::queue_entry::{JoinDetails, missing_entry_transition};
use crate::domain::{
    DomainEvent, EntryId, EventBus, QueueEntry, QueueRegistry, QueueStatus, RestaurantId,
    TurnoverSettings, UserDirectory, UserId,
};
use crate::error::GatewayError;

/// Orchestration layer for all waitlist operations.
///
/// Every mutation follows the pattern: acquire the restaurant's lock →
/// mutate → publish one `queue_updated` per changed entry → release.
/// Events are only published for committed state, and subscribers see
/// a restaurant's events in the order its mutations happened.
#[derive(Debug, Clone)]
pub struct QueueService {
    registry: Arc<QueueRegistry>,
    users: Arc<UserDirectory>,
    event_bus: EventBus,
}

impl QueueService {
    /// Creates a new `QueueService`.
    #[must_use]
    pub fn new(registry: Arc<QueueRegistry>, users: Arc<UserDirectory>, event_bus: EventBus) -> Self {
        Self {
            registry,
            users,
            event_bus,
        }
    }

    /// Returns a reference to the inner [`EventBus`].
    #[must_use]
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Adds a party to a restaurant's waitlist.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::UserNotFound`] for an unknown user and
    /// [`GatewayError::InvalidRequest`] for a zero party size or a
    /// duplicate active entry.
    pub async fn join_queue(
        &self,
        user_id: UserId,
        restaurant_id: RestaurantId,
        party_size: u32,
        details: JoinDetails,
    ) -> Result<QueueEntry, GatewayError> {
        self.users.get(user_id).await?;

        let queue = self.registry.queue(restaurant_id).await;
        let mut queue = queue.lock().await;
        let (entry, changed) = queue.join(user_id, party_size, details, Utc::now())?;
        self.registry.index_entry(entry.id, restaurant_id).await;

        tracing::info!(
            entry_id = %entry.id,
            %user_id,
            %restaurant_id,
            position = entry.position,
            wait = entry.estimated_wait_time,
            "party joined queue"
        );
        self.publish(changed);
        drop(queue);
        Ok(entry)
    }

    /// Applies a staff or customer status transition.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidTransition`] for an unknown entry or
    /// a move the state machine forbids. Neither mutates state.
    pub async fn transition(
        &self,
        entry_id: EntryId,
        next: QueueStatus,
    ) -> Result<QueueEntry, GatewayError> {
        let queue = self
            .registry
            .queue_for_entry(entry_id)
            .await
            .map_err(|_| missing_entry_transition(next))?;
        let mut queue = queue.lock().await;
        let changed = queue.transition(entry_id, next, Utc::now())?;
        let updated = changed
            .first()
            .cloned()
            .ok_or_else(|| missing_entry_transition(next))?;

        tracing::info!(
            %entry_id,
            status = %updated.status,
            shifted = changed.len().saturating_sub(1),
            "queue entry transitioned"
        );
        self.publish(changed);
        drop(queue);
        Ok(updated)
    }

    /// Returns one entry.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::EntryNotFound`] for an unknown id.
    pub async fn get_entry(&self, entry_id: EntryId) -> Result<QueueEntry, GatewayError> {
        let queue = self.registry.queue_for_entry(entry_id).await?;
        let queue = queue.lock().await;
        queue
            .get(entry_id)
            .cloned()
            .ok_or(GatewayError::EntryNotFound(*entry_id.as_uuid()))
    }

    /// Returns a restaurant's active entries and estimator settings.
    pub async fn list_queue(
        &self,
        restaurant_id: RestaurantId,
    ) -> (Vec<QueueEntry>, TurnoverSettings) {
        let queue = self.registry.queue(restaurant_id).await;
        let queue = queue.lock().await;
        (queue.active(), queue.settings())
    }

    /// Returns every entry a user ever created, newest first.
    pub async fn user_entries(&self, user_id: UserId) -> Vec<QueueEntry> {
        let mut entries = Vec::new();
        for queue in self.registry.all().await {
            entries.extend(queue.lock().await.entries_for_user(user_id));
        }
        entries.sort_by(|a, b| b.joined_at.cmp(&a.joined_at));
        entries
    }

    /// Replaces a restaurant's turnover settings and recomputes every
    /// waiting entry's estimate.
    ///
    /// Returns the number of entries whose estimate changed.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] for a zero turnover.
    pub async fn update_turnover(
        &self,
        restaurant_id: RestaurantId,
        average_table_turnover: u32,
        concurrent_tables: Option<u32>,
    ) -> Result<usize, GatewayError> {
        if average_table_turnover == 0 {
            return Err(GatewayError::InvalidRequest(
                "averageTableTurnover must be positive".to_string(),
            ));
        }
        let queue = self.registry.queue(restaurant_id).await;
        let mut queue = queue.lock().await;
        let tables = concurrent_tables.unwrap_or(queue.settings().concurrent_tables);
        let changed = queue.update_settings(TurnoverSettings::new(average_table_turnover, tables));
        let count = changed.len();
        tracing::info!(
            %restaurant_id,
            average_table_turnover,
            updated = count,
            "wait times recomputed"
        );
        self.publish(changed);
        drop(queue);
        Ok(count)
    }

    /// Cancels `ready` entries that were called more than `grace` ago.
    ///
    /// Returns the number of entries cancelled.
    pub async fn expire_stale_ready(&self, grace: Duration, now: DateTime<Utc>) -> usize {
        let cutoff = now - grace;
        let mut total = 0;
        for queue in self.registry.all().await {
            let mut guard = queue.lock().await;
            let expired = guard.expire_ready(cutoff, now);
            if expired.is_empty() {
                continue;
            }
            total += expired.len();
            for entry in &expired {
                tracing::info!(entry_id = %entry.id, user_id = %entry.user_id, "ready entry expired");
            }
            self.publish(expired);
        }
        total
    }

    fn publish(&self, changed: Vec<QueueEntry>) {
        self.event_bus
            .publish_all(changed.into_iter().map(DomainEvent::QueueUpdated));
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::domain::Role;

    async fn make_service() -> (QueueService, UserId, UserId) {
        let users = Arc::new(UserDirectory::new());
        let Ok(x) = users.register("Xavier", Role::Customer).await else {
            panic!("register failed");
        };
        let Ok(y) = users.register("Yara", Role::Customer).await else {
            panic!("register failed");
        };
        let service = QueueService::new(
            Arc::new(QueueRegistry::new(TurnoverSettings::new(25, 1))),
            users,
            EventBus::new(1000),
        );
        (service, x.id, y.id)
    }

    #[tokio::test]
    async fn join_cancel_scenario_recomputes_and_notifies() {
        let (service, x, y) = make_service().await;
        let mut rx = service.event_bus().subscribe();
        let restaurant = RestaurantId(1);

        let Ok(entry_x) = service
            .join_queue(x, restaurant, 2, JoinDetails::default())
            .await
        else {
            panic!("join failed");
        };
        assert_eq!((entry_x.position, entry_x.estimated_wait_time), (1, 0));

        let Ok(entry_y) = service
            .join_queue(y, restaurant, 2, JoinDetails::default())
            .await
        else {
            panic!("join failed");
        };
        assert_eq!((entry_y.position, entry_y.estimated_wait_time), (2, 25));

        // Drain join events.
        for _ in 0..2 {
            let _ = rx.recv().await;
        }

        let Ok(cancelled) = service.transition(entry_x.id, QueueStatus::Cancelled).await else {
            panic!("cancel failed");
        };
        assert_eq!(cancelled.status, QueueStatus::Cancelled);

        let Ok(DomainEvent::QueueUpdated(first)) = rx.recv().await else {
            panic!("expected queue_updated for X");
        };
        assert_eq!(first.id, entry_x.id);
        let Ok(DomainEvent::QueueUpdated(second)) = rx.recv().await else {
            panic!("expected queue_updated for Y");
        };
        assert_eq!(second.id, entry_y.id);
        assert_eq!((second.position, second.estimated_wait_time), (1, 0));
    }

    #[tokio::test]
    async fn unknown_user_cannot_join() {
        let (service, _, _) = make_service().await;
        let result = service
            .join_queue(UserId(404), RestaurantId(1), 2, JoinDetails::default())
            .await;
        assert!(matches!(result, Err(GatewayError::UserNotFound(404))));
    }

    #[tokio::test]
    async fn failed_transition_publishes_nothing() {
        let (service, x, _) = make_service().await;
        let Ok(entry) = service
            .join_queue(x, RestaurantId(1), 2, JoinDetails::default())
            .await
        else {
            panic!("join failed");
        };
        let mut rx = service.event_bus().subscribe();
        let result = service.transition(entry.id, QueueStatus::Completed).await;
        assert!(matches!(result, Err(GatewayError::InvalidTransition { .. })));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn turnover_update_recomputes_waiting_entries() {
        let (service, x, y) = make_service().await;
        let restaurant = RestaurantId(3);
        let _ = service.join_queue(x, restaurant, 2, JoinDetails::default()).await;
        let Ok(entry_y) = service.join_queue(y, restaurant, 4, JoinDetails::default()).await else {
            panic!("join failed");
        };

        let Ok(updated) = service.update_turnover(restaurant, 40, None).await else {
            panic!("update failed");
        };
        assert_eq!(updated, 1);
        let Ok(fetched) = service.get_entry(entry_y.id).await else {
            panic!("entry missing");
        };
        assert_eq!(fetched.estimated_wait_time, 40);

        let (active, settings) = service.list_queue(restaurant).await;
        assert_eq!(active.len(), 2);
        assert_eq!(settings.average_table_turnover, 40);
        assert!(service.update_turnover(restaurant, 0, None).await.is_err());
    }

    #[tokio::test]
    async fn transition_on_unknown_entry_is_rejected() {
        let (service, _, _) = make_service().await;
        let mut rx = service.event_bus().subscribe();
        let result = service.transition(EntryId::new(), QueueStatus::Cancelled).await;
        let (from, to) = match result {
            Err(GatewayError::InvalidTransition { from, to }) => (from, to),
            other => panic!("expected InvalidTransition, got {other:?}"),
        };
        assert_eq!((from.as_str(), to.as_str()), ("missing", "cancelled"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_joins_publish_in_position_order() {
        let users = Arc::new(UserDirectory::new());
        let mut ids = Vec::new();
        for n in 0..16 {
            let Ok(user) = users.register(&format!("guest-{n}"), Role::Customer).await else {
                panic!("register failed");
            };
            ids.push(user.id);
        }
        let service = Arc::new(QueueService::new(
            Arc::new(QueueRegistry::new(TurnoverSettings::new(25, 1))),
            users,
            EventBus::new(1000),
        ));
        let mut rx = service.event_bus().subscribe();

        let handles: Vec<_> = ids
            .into_iter()
            .map(|id| {
                let service = Arc::clone(&service);
                tokio::spawn(async move {
                    service
                        .join_queue(id, RestaurantId(9), 2, JoinDetails::default())
                        .await
                })
            })
            .collect();
        for handle in handles {
            let Ok(Ok(_)) = handle.await else {
                panic!("join failed");
            };
        }

        let mut positions = Vec::new();
        while let Ok(DomainEvent::QueueUpdated(entry)) = rx.try_recv() {
            positions.push(entry.position);
        }
        assert_eq!(positions, (1..=16).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn stale_ready_entries_expire() {
        let (service, x, _) = make_service().await;
        let Ok(entry) = service
            .join_queue(x, RestaurantId(1), 2, JoinDetails::default())
            .await
        else {
            panic!("join failed");
        };
        let _ = service.transition(entry.id, QueueStatus::Ready).await;

        let now = Utc::now();
        assert_eq!(service.expire_stale_ready(Duration::minutes(10), now).await, 0);
        let later = now + Duration::minutes(11);
        assert_eq!(service.expire_stale_ready(Duration::minutes(10), later).await, 1);

        let entries = service.user_entries(x).await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, QueueStatus::Cancelled);
    }
}
