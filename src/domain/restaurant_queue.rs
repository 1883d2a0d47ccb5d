//! A single restaurant's waitlist.
//!
//! [`RestaurantQueue`] owns every entry ever created for one restaurant,
//! in join order. Entries are never removed; leaving the line is a status
//! transition. After every mutation the queue renumbers its waiting
//! entries and recomputes their wait estimates, returning the entries
//! whose visible state changed so the caller can publish them.

use chrono::{DateTime, Utc};

use super::queue_entry::{JoinDetails, QueueEntry, QueueStatus, missing_entry_transition};
use super::wait_time::TurnoverSettings;
use super::{EntryId, RestaurantId, UserId};
use crate::error::GatewayError;

/// Waitlist for one restaurant.
#[derive(Debug, Clone)]
pub struct RestaurantQueue {
    restaurant_id: RestaurantId,
    settings: TurnoverSettings,
    entries: Vec<QueueEntry>,
}

impl RestaurantQueue {
    /// Creates an empty queue.
    #[must_use]
    pub const fn new(restaurant_id: RestaurantId, settings: TurnoverSettings) -> Self {
        Self {
            restaurant_id,
            settings,
            entries: Vec::new(),
        }
    }

    /// Restaurant this queue belongs to.
    #[must_use]
    pub const fn restaurant_id(&self) -> RestaurantId {
        self.restaurant_id
    }

    /// Current estimator settings.
    #[must_use]
    pub const fn settings(&self) -> TurnoverSettings {
        self.settings
    }

    /// Adds a party to the back of the line.
    ///
    /// Returns the created entry and every entry whose position or wait
    /// changed (the new entry included).
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] for a zero party size or
    /// when the user already holds an active entry here.
    pub fn join(
        &mut self,
        user_id: UserId,
        party_size: u32,
        details: JoinDetails,
        now: DateTime<Utc>,
    ) -> Result<(QueueEntry, Vec<QueueEntry>), GatewayError> {
        if party_size == 0 {
            return Err(GatewayError::InvalidRequest(
                "partySize must be positive".to_string(),
            ));
        }
        if self
            .entries
            .iter()
            .any(|e| e.user_id == user_id && e.status.is_active())
        {
            return Err(GatewayError::InvalidRequest(format!(
                "user {user_id} is already in the queue for restaurant {}",
                self.restaurant_id
            )));
        }

        let entry = QueueEntry::new(user_id, self.restaurant_id, party_size, details, now);
        let id = entry.id;
        self.entries.push(entry);
        let changed = self.recompute();
        let created = self
            .get(id)
            .cloned()
            .ok_or(GatewayError::EntryNotFound(*id.as_uuid()))?;
        Ok((created, changed))
    }

    /// Applies a status transition to one entry.
    ///
    /// The transitioned entry comes first in the returned list, followed by
    /// any waiting entries that moved up.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidTransition`] for an unknown id or
    /// when the state machine forbids the move. Neither mutates the queue.
    pub fn transition(
        &mut self,
        id: EntryId,
        next: QueueStatus,
        now: DateTime<Utc>,
    ) -> Result<Vec<QueueEntry>, GatewayError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| missing_entry_transition(next))?;
        entry.transition(next, now)?;
        let transitioned = entry.clone();

        let mut changed = vec![transitioned];
        changed.extend(self.recompute().into_iter().filter(|e| e.id != id));
        Ok(changed)
    }

    /// Replaces the estimator settings and recomputes every waiting entry.
    pub fn update_settings(&mut self, settings: TurnoverSettings) -> Vec<QueueEntry> {
        self.settings = settings;
        self.recompute()
    }

    /// Cancels `ready` entries called at or before `cutoff`.
    pub fn expire_ready(&mut self, cutoff: DateTime<Utc>, now: DateTime<Utc>) -> Vec<QueueEntry> {
        let mut expired = Vec::new();
        for entry in &mut self.entries {
            let overdue = entry.status == QueueStatus::Ready
                && entry.called_at.is_some_and(|called| called <= cutoff);
            if overdue && entry.transition(QueueStatus::Cancelled, now).is_ok() {
                expired.push(entry.clone());
            }
        }
        expired
    }

    /// Returns the entry with the given id.
    #[must_use]
    pub fn get(&self, id: EntryId) -> Option<&QueueEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Waiting entries by position, followed by ready entries by call time.
    #[must_use]
    pub fn active(&self) -> Vec<QueueEntry> {
        let mut waiting: Vec<QueueEntry> = self
            .entries
            .iter()
            .filter(|e| e.status == QueueStatus::Waiting)
            .cloned()
            .collect();
        waiting.sort_by_key(|e| e.position);

        let mut ready: Vec<QueueEntry> = self
            .entries
            .iter()
            .filter(|e| e.status == QueueStatus::Ready)
            .cloned()
            .collect();
        ready.sort_by_key(|e| e.called_at);

        waiting.extend(ready);
        waiting
    }

    /// Number of parties currently waiting.
    #[must_use]
    pub fn waiting_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.status == QueueStatus::Waiting)
            .count()
    }

    /// All entries (any status) for a user, in join order.
    #[must_use]
    pub fn entries_for_user(&self, user_id: UserId) -> Vec<QueueEntry> {
        self.entries
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Renumbers waiting entries 1..N by join time and refreshes their
    /// wait estimates. Returns the entries whose values changed.
    fn recompute(&mut self) -> Vec<QueueEntry> {
        let mut order: Vec<usize> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.status == QueueStatus::Waiting)
            .map(|(idx, _)| idx)
            .collect();
        // Stable: equal timestamps keep insertion order.
        order.sort_by_key(|&idx| self.entries.get(idx).map(|e| e.joined_at));

        let mut changed = Vec::new();
        for (ahead, idx) in order.into_iter().enumerate() {
            let ahead = u32::try_from(ahead).unwrap_or(u32::MAX);
            let wait = self.settings.estimate(ahead);
            let Some(entry) = self.entries.get_mut(idx) else {
                continue;
            };
            let position = ahead.saturating_add(1);
            if entry.position != position || entry.estimated_wait_time != wait {
                entry.position = position;
                entry.estimated_wait_time = wait;
                changed.push(entry.clone());
            }
        }
        changed
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    fn queue() -> RestaurantQueue {
        RestaurantQueue::new(RestaurantId(1), TurnoverSettings::new(25, 1))
    }

    fn join(q: &mut RestaurantQueue, user: i64) -> QueueEntry {
        let Ok((entry, _)) = q.join(UserId(user), 2, JoinDetails::default(), Utc::now()) else {
            panic!("join failed");
        };
        entry
    }

    fn assert_fifo(q: &RestaurantQueue) {
        let waiting: Vec<&QueueEntry> = q
            .entries
            .iter()
            .filter(|e| e.status == QueueStatus::Waiting)
            .collect();
        let mut by_position = waiting.clone();
        by_position.sort_by_key(|e| e.position);
        for (idx, entry) in by_position.iter().enumerate() {
            assert_eq!(entry.position as usize, idx + 1);
        }
        for pair in by_position.windows(2) {
            assert!(pair[0].joined_at <= pair[1].joined_at);
        }
    }

    #[test]
    fn first_party_has_no_wait() {
        let mut q = queue();
        let x = join(&mut q, 1);
        assert_eq!(x.position, 1);
        assert_eq!(x.estimated_wait_time, 0);
    }

    #[test]
    fn cancel_head_shifts_everyone_up() {
        let mut q = queue();
        let x = join(&mut q, 1);
        let y = join(&mut q, 2);
        assert_eq!(y.position, 2);
        assert_eq!(y.estimated_wait_time, 25);

        let Ok(changed) = q.transition(x.id, QueueStatus::Cancelled, Utc::now()) else {
            panic!("cancel failed");
        };
        assert_eq!(changed.len(), 2);
        assert_eq!(changed[0].id, x.id);
        assert_eq!(changed[0].status, QueueStatus::Cancelled);
        assert_eq!(changed[1].id, y.id);
        assert_eq!(changed[1].position, 1);
        assert_eq!(changed[1].estimated_wait_time, 0);
    }

    #[test]
    fn calling_a_party_renumbers_the_rest() {
        let mut q = queue();
        let x = join(&mut q, 1);
        let _y = join(&mut q, 2);
        let z = join(&mut q, 3);
        assert!(q.transition(x.id, QueueStatus::Ready, Utc::now()).is_ok());
        assert_eq!(q.get(z.id).map(|e| e.position), Some(2));
        assert_eq!(q.waiting_count(), 2);
        let active = q.active();
        assert_eq!(active.len(), 3);
        assert_eq!(active[2].id, x.id);
    }

    #[test]
    fn removing_tail_changes_nobody_else() {
        let mut q = queue();
        let _x = join(&mut q, 1);
        let y = join(&mut q, 2);
        let Ok(changed) = q.transition(y.id, QueueStatus::Cancelled, Utc::now()) else {
            panic!("cancel failed");
        };
        assert_eq!(changed.len(), 1);
    }

    #[test]
    fn duplicate_active_join_is_rejected() {
        let mut q = queue();
        let _ = join(&mut q, 1);
        let result = q.join(UserId(1), 2, JoinDetails::default(), Utc::now());
        assert!(matches!(result, Err(GatewayError::InvalidRequest(_))));
    }

    #[test]
    fn rejoin_after_cancel_is_allowed() {
        let mut q = queue();
        let x = join(&mut q, 1);
        assert!(q.transition(x.id, QueueStatus::Cancelled, Utc::now()).is_ok());
        let again = join(&mut q, 1);
        assert_eq!(again.position, 1);
        assert_eq!(q.entries_for_user(UserId(1)).len(), 2);
    }

    #[test]
    fn zero_party_size_is_rejected() {
        let mut q = queue();
        let result = q.join(UserId(1), 0, JoinDetails::default(), Utc::now());
        assert!(result.is_err());
    }

    #[test]
    fn invalid_transition_leaves_queue_untouched() {
        let mut q = queue();
        let x = join(&mut q, 1);
        let y = join(&mut q, 2);
        let result = q.transition(x.id, QueueStatus::Completed, Utc::now());
        assert!(matches!(result, Err(GatewayError::InvalidTransition { .. })));
        assert_eq!(q.get(x.id).map(|e| e.status), Some(QueueStatus::Waiting));
        assert_eq!(q.get(y.id).map(|e| e.position), Some(2));
    }

    #[test]
    fn unknown_entry_transition_is_rejected() {
        let mut q = queue();
        let x = join(&mut q, 1);
        let result = q.transition(EntryId::new(), QueueStatus::Ready, Utc::now());
        let (from, to) = match result {
            Err(GatewayError::InvalidTransition { from, to }) => (from, to),
            other => panic!("expected InvalidTransition, got {other:?}"),
        };
        assert_eq!((from.as_str(), to.as_str()), ("missing", "ready"));
        assert_eq!(q.get(x.id).map(|e| e.position), Some(1));
    }

    #[test]
    fn settings_update_recomputes_all_waiting() {
        let mut q = queue();
        let _x = join(&mut q, 1);
        let y = join(&mut q, 2);
        let z = join(&mut q, 3);
        let changed = q.update_settings(TurnoverSettings::new(10, 1));
        assert_eq!(changed.len(), 2);
        assert_eq!(q.get(y.id).map(|e| e.estimated_wait_time), Some(10));
        assert_eq!(q.get(z.id).map(|e| e.estimated_wait_time), Some(20));
    }

    #[test]
    fn expire_ready_cancels_only_overdue() {
        let mut q = queue();
        let x = join(&mut q, 1);
        let y = join(&mut q, 2);
        let long_ago = Utc::now() - Duration::minutes(30);
        assert!(q.transition(x.id, QueueStatus::Ready, long_ago).is_ok());
        assert!(q.transition(y.id, QueueStatus::Ready, Utc::now()).is_ok());

        let cutoff = Utc::now() - Duration::minutes(10);
        let expired = q.expire_ready(cutoff, Utc::now());
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id, x.id);
        assert_eq!(q.get(y.id).map(|e| e.status), Some(QueueStatus::Ready));
    }

    proptest! {
        #[test]
        fn positions_stay_contiguous(ops in proptest::collection::vec((any::<bool>(), 0usize..16), 1..64)) {
            let mut q = queue();
            let mut next_user = 1i64;
            let mut ids: Vec<EntryId> = Vec::new();
            for (is_join, pick) in ops {
                if is_join || ids.is_empty() {
                    let Ok((entry, _)) = q.join(UserId(next_user), 2, JoinDetails::default(), Utc::now()) else {
                        panic!("join failed");
                    };
                    next_user += 1;
                    ids.push(entry.id);
                } else {
                    let id = ids[pick % ids.len()];
                    let _ = q.transition(id, QueueStatus::Cancelled, Utc::now());
                }
                assert_fifo(&q);
            }
        }
    }
}
