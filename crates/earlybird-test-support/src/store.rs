//! In-memory `ArrivalStore` — a full, single-process implementation of the
//! storage trait for deterministic unit tests.
//!
//! The interior mutex serializes every operation, which gives the same
//! atomicity guarantees the Postgres implementation provides with
//! transactions and advisory locks.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use earlybird_core::aggregate;
use earlybird_core::error::DomainError;
use earlybird_core::model::{
    Achievement, ArrivalEvent, ArrivalRecord, Badge, BadgeType, UserAggregate, UserBadge,
};
use earlybird_core::store::{ArrivalStore, ArrivalSubmission, RegistrationOutcome};

#[derive(Debug, Default)]
struct State {
    events: Vec<ArrivalEvent>,
    records: Vec<ArrivalRecord>,
    users: HashMap<String, UserAggregate>,
    badge_types: Vec<BadgeType>,
    badges: Vec<Badge>,
    achievements: Vec<Achievement>,
    user_badges: Vec<UserBadge>,
}

/// In-memory arrival store backed by plain vectors and maps.
#[derive(Debug, Default)]
pub struct InMemoryArrivalStore {
    state: Mutex<State>,
}

impl InMemoryArrivalStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the raw arrival events, for asserting that duplicates
    /// are still logged.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn raw_events(&self) -> Vec<ArrivalEvent> {
        self.state.lock().unwrap().events.clone()
    }

    /// Snapshot of all achievement rows.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn all_achievements(&self) -> Vec<Achievement> {
        self.state.lock().unwrap().achievements.clone()
    }
}

fn order_key(record: &ArrivalRecord) -> (DateTime<Utc>, i64) {
    (record.arrived_at, record.id)
}

#[async_trait]
#[allow(clippy::cast_possible_wrap)]
impl ArrivalStore for InMemoryArrivalStore {
    async fn register_arrival(
        &self,
        submission: ArrivalSubmission,
    ) -> Result<RegistrationOutcome, DomainError> {
        let mut state = self.state.lock().unwrap();

        // The raw event is logged even when the registration is rejected.
        let event_id = state.events.len() as i64 + 1;
        state.events.push(ArrivalEvent {
            id: event_id,
            user_id: submission.user_id.clone(),
            arrived_at: submission.arrived_at,
        });

        let duplicate = state.records.iter().any(|record| {
            record.user_id == submission.user_id && record.arrival_day == submission.arrival_day
        });
        if duplicate {
            return Ok(RegistrationOutcome::AlreadyRegisteredToday {
                user_id: submission.user_id,
                day: submission.arrival_day,
            });
        }

        let rank = state
            .records
            .iter()
            .filter(|record| record.arrival_day == submission.arrival_day)
            .count() as i64
            + 1;
        let rank_score = if rank == 1 {
            submission.first_rank_bonus
        } else {
            0
        };

        let record = ArrivalRecord {
            id: state.records.len() as i64 + 1,
            user_id: submission.user_id.clone(),
            arrived_at: submission.arrived_at,
            arrival_day: submission.arrival_day,
            arrival_rank: rank,
            time_score: submission.time_score,
            rank_score,
            total_score: submission.time_score + rank_score,
        };
        state.records.push(record.clone());

        let user = aggregate::advance(
            state.users.get(&submission.user_id),
            &submission.user_id,
            record.total_score,
            submission.arrived_at,
        );
        state.users.insert(submission.user_id, user.clone());

        Ok(RegistrationOutcome::Registered { record, user })
    }

    async fn find_arrival(&self, arrival_id: i64) -> Result<Option<ArrivalRecord>, DomainError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .records
            .iter()
            .find(|record| record.id == arrival_id)
            .cloned())
    }

    async fn count_user_arrivals_before(
        &self,
        user_id: &str,
        before: DateTime<Utc>,
    ) -> Result<i64, DomainError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .records
            .iter()
            .filter(|record| record.user_id == user_id && record.arrived_at < before)
            .count() as i64)
    }

    async fn count_arrivals_preceding(&self, record: &ArrivalRecord) -> Result<i64, DomainError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .records
            .iter()
            .filter(|other| order_key(other) < order_key(record))
            .count() as i64)
    }

    async fn earliest_user_arrival_between(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Option<ArrivalRecord>, DomainError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .records
            .iter()
            .filter(|record| {
                record.user_id == user_id
                    && record.arrived_at >= since
                    && record.arrived_at <= until
            })
            .min_by_key(|record| order_key(record))
            .cloned())
    }

    async fn latest_user_arrival_before(
        &self,
        user_id: &str,
        before: DateTime<Utc>,
    ) -> Result<Option<ArrivalRecord>, DomainError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .records
            .iter()
            .filter(|record| record.user_id == user_id && record.arrived_at < before)
            .max_by_key(|record| order_key(record))
            .cloned())
    }

    async fn count_same_minute_arrivals(
        &self,
        record: &ArrivalRecord,
        minute_start: DateTime<Utc>,
    ) -> Result<i64, DomainError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .records
            .iter()
            .filter(|other| {
                other.arrived_at >= minute_start && order_key(other) <= order_key(record)
            })
            .count() as i64)
    }

    async fn recent_user_arrivals(
        &self,
        user_id: &str,
        before: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<ArrivalRecord>, DomainError> {
        let state = self.state.lock().unwrap();
        let mut arrivals: Vec<ArrivalRecord> = state
            .records
            .iter()
            .filter(|record| record.user_id == user_id && record.arrived_at < before)
            .cloned()
            .collect();
        arrivals.sort_by_key(|record| std::cmp::Reverse(order_key(record)));
        arrivals.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(arrivals)
    }

    async fn achievements_for_arrival(
        &self,
        arrival_id: i64,
    ) -> Result<Vec<Achievement>, DomainError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .achievements
            .iter()
            .filter(|achievement| achievement.arrival_id == arrival_id)
            .cloned()
            .collect())
    }

    async fn achievements_for_arrivals(
        &self,
        arrival_ids: &[i64],
    ) -> Result<Vec<Achievement>, DomainError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .achievements
            .iter()
            .filter(|achievement| arrival_ids.contains(&achievement.arrival_id))
            .cloned()
            .collect())
    }

    async fn badge_holder_exists(&self, badge_id: i64) -> Result<bool, DomainError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .user_badges
            .iter()
            .any(|user_badge| user_badge.badge_id == badge_id))
    }

    async fn record_achievements(
        &self,
        record: &ArrivalRecord,
        badge_ids: &[i64],
    ) -> Result<(), DomainError> {
        let mut state = self.state.lock().unwrap();

        for badge_id in badge_ids {
            let exists = state.achievements.iter().any(|achievement| {
                achievement.arrival_id == record.id && achievement.badge_id == *badge_id
            });
            if exists {
                return Err(DomainError::AchievementAlreadyRegistered(record.id));
            }
        }

        for badge_id in badge_ids {
            let achievement_id = state.achievements.len() as i64 + 1;
            state.achievements.push(Achievement {
                id: achievement_id,
                user_id: record.user_id.clone(),
                arrival_id: record.id,
                badge_id: *badge_id,
                achieved_at: record.arrived_at,
            });

            if let Some(user_badge) = state
                .user_badges
                .iter_mut()
                .find(|ub| ub.user_id == record.user_id && ub.badge_id == *badge_id)
            {
                user_badge.count += 1;
                user_badge.last_acquired_at = record.arrived_at;
            } else {
                let user_badge_id = state.user_badges.len() as i64 + 1;
                state.user_badges.push(UserBadge {
                    id: user_badge_id,
                    user_id: record.user_id.clone(),
                    badge_id: *badge_id,
                    first_acquired_at: record.arrived_at,
                    last_acquired_at: record.arrived_at,
                    count: 1,
                });
            }
        }

        Ok(())
    }

    async fn seed_catalog(
        &self,
        types: &[BadgeType],
        badges: &[Badge],
    ) -> Result<(), DomainError> {
        let mut state = self.state.lock().unwrap();

        for badge_type in types {
            if !state.badge_types.iter().any(|t| t.id == badge_type.id) {
                state.badge_types.push(badge_type.clone());
            }
        }
        for badge in badges {
            if !state.badges.iter().any(|b| b.id == badge.id) {
                state.badges.push(badge.clone());
            }
        }
        Ok(())
    }

    async fn user_aggregate(&self, user_id: &str) -> Result<Option<UserAggregate>, DomainError> {
        let state = self.state.lock().unwrap();
        Ok(state.users.get(user_id).cloned())
    }

    async fn arrivals_on_day(&self, day: NaiveDate) -> Result<Vec<ArrivalRecord>, DomainError> {
        let state = self.state.lock().unwrap();
        let mut arrivals: Vec<ArrivalRecord> = state
            .records
            .iter()
            .filter(|record| record.arrival_day == day)
            .cloned()
            .collect();
        arrivals.sort_by_key(|record| record.arrival_rank);
        Ok(arrivals)
    }

    async fn user_badges(&self, user_id: &str) -> Result<Vec<UserBadge>, DomainError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .user_badges
            .iter()
            .filter(|user_badge| user_badge.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn user_achievements(&self, user_id: &str) -> Result<Vec<Achievement>, DomainError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .achievements
            .iter()
            .filter(|achievement| achievement.user_id == user_id)
            .cloned()
            .collect())
    }
}
