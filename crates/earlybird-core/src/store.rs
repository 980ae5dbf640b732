//! Storage abstraction over the shared relational store.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::model::{Achievement, ArrivalRecord, Badge, BadgeType, UserAggregate, UserBadge};

/// A scored registration request produced by the registrar.
///
/// The time window score and the rank bonus are computed before the
/// transaction; the store applies `first_rank_bonus` only when the arrival
/// turns out to take rank 1 for its day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrivalSubmission {
    /// Chat-platform user id.
    pub user_id: String,
    /// Check-in timestamp.
    pub arrived_at: DateTime<Utc>,
    /// Local calendar day derived from the timestamp.
    pub arrival_day: NaiveDate,
    /// Points from the time-of-day window.
    pub time_score: i64,
    /// Bonus granted if and only if this arrival takes rank 1.
    pub first_rank_bonus: i64,
}

/// Outcome of a registration attempt. A duplicate same-day registration is
/// an expected outcome, not an error: the raw event is still logged, and
/// nothing else changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RegistrationOutcome {
    /// The arrival was accepted and the user aggregate advanced.
    Registered {
        /// The persisted arrival record.
        record: ArrivalRecord,
        /// The user aggregate after advancement.
        user: UserAggregate,
    },
    /// The user already has an arrival record for this local day.
    AlreadyRegisteredToday {
        /// Chat-platform user id.
        user_id: String,
        /// The local day the duplicate fell on.
        day: NaiveDate,
    },
}

/// Repository trait over the five logical tables plus the badge catalog.
///
/// Implementations must make [`register_arrival`](Self::register_arrival)
/// and [`record_achievements`](Self::record_achievements) atomic: two
/// concurrent registrations for the same user and day must not both
/// succeed, and same-day ranks must stay contiguous.
#[async_trait]
pub trait ArrivalStore: Send + Sync {
    /// Atomically registers an arrival: logs the raw event, rejects a
    /// same-day duplicate, assigns the day rank, persists the record, and
    /// advances the user aggregate. The raw event is kept either way.
    async fn register_arrival(
        &self,
        submission: ArrivalSubmission,
    ) -> Result<RegistrationOutcome, DomainError>;

    /// Looks up an arrival record by id.
    async fn find_arrival(&self, arrival_id: i64) -> Result<Option<ArrivalRecord>, DomainError>;

    /// Number of the user's arrival records strictly before `before`.
    async fn count_user_arrivals_before(
        &self,
        user_id: &str,
        before: DateTime<Utc>,
    ) -> Result<i64, DomainError>;

    /// Number of arrival records across all users that precede `record`
    /// in `(arrived_at, id)` order.
    async fn count_arrivals_preceding(&self, record: &ArrivalRecord) -> Result<i64, DomainError>;

    /// The user's earliest arrival within `[since, until]`, both inclusive.
    async fn earliest_user_arrival_between(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Option<ArrivalRecord>, DomainError>;

    /// The user's most recent arrival strictly before `before`.
    async fn latest_user_arrival_before(
        &self,
        user_id: &str,
        before: DateTime<Utc>,
    ) -> Result<Option<ArrivalRecord>, DomainError>;

    /// Arrivals across all users within `[minute_start, record.arrived_at]`
    /// that do not come after `record` in `(arrived_at, id)` order, the
    /// record itself included.
    async fn count_same_minute_arrivals(
        &self,
        record: &ArrivalRecord,
        minute_start: DateTime<Utc>,
    ) -> Result<i64, DomainError>;

    /// The user's most recent arrivals strictly before `before`, newest
    /// first, at most `limit` of them.
    async fn recent_user_arrivals(
        &self,
        user_id: &str,
        before: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<ArrivalRecord>, DomainError>;

    /// All achievements recorded against one arrival.
    async fn achievements_for_arrival(
        &self,
        arrival_id: i64,
    ) -> Result<Vec<Achievement>, DomainError>;

    /// All achievements recorded against any of the given arrivals.
    async fn achievements_for_arrivals(
        &self,
        arrival_ids: &[i64],
    ) -> Result<Vec<Achievement>, DomainError>;

    /// Whether any user already holds the badge — the scarce-badge lock.
    async fn badge_holder_exists(&self, badge_id: i64) -> Result<bool, DomainError>;

    /// Atomically records achievements for an arrival and upserts the
    /// corresponding user-badge rows: a first acquisition starts at
    /// count 1; a repeat increments the count and bumps the last-acquired
    /// timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::AchievementAlreadyRegistered`] when a
    /// `(arrival_id, badge_id)` pair already exists, which makes a racing
    /// double evaluation a safe no-op error.
    async fn record_achievements(
        &self,
        record: &ArrivalRecord,
        badge_ids: &[i64],
    ) -> Result<(), DomainError>;

    /// Idempotent catalog seed: inserts missing rows, never overwrites
    /// existing ones (achievements hold foreign keys into the catalog).
    async fn seed_catalog(
        &self,
        types: &[BadgeType],
        badges: &[Badge],
    ) -> Result<(), DomainError>;

    /// Read-only projection: the user's current aggregate.
    async fn user_aggregate(&self, user_id: &str) -> Result<Option<UserAggregate>, DomainError>;

    /// Read-only projection: all arrival records on a local day, in rank
    /// order.
    async fn arrivals_on_day(&self, day: NaiveDate) -> Result<Vec<ArrivalRecord>, DomainError>;

    /// Read-only projection: the user's badge holdings.
    async fn user_badges(&self, user_id: &str) -> Result<Vec<UserBadge>, DomainError>;

    /// Read-only projection: the user's achievement history.
    async fn user_achievements(&self, user_id: &str) -> Result<Vec<Achievement>, DomainError>;
}
