//! Persisted domain entities.
//!
//! Five logical tables plus the badge catalog: the raw arrival audit log,
//! the authoritative arrival records, the per-user score aggregate, and
//! the achievement/user-badge facts produced by badge evaluation.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Raw, append-only audit entry for a check-in attempt. Written for every
/// registration, rejected duplicates included; never mutated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrivalEvent {
    /// Unique event identifier.
    pub id: i64,
    /// Chat-platform user id.
    pub user_id: String,
    /// Check-in timestamp.
    pub arrived_at: DateTime<Utc>,
}

/// Authoritative arrival record. At most one exists per
/// `(user_id, arrival_day)`; created once and never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrivalRecord {
    /// Unique record identifier; also the same-instant tie-break for rank.
    pub id: i64,
    /// Chat-platform user id.
    pub user_id: String,
    /// Check-in timestamp.
    pub arrived_at: DateTime<Utc>,
    /// Local calendar day the check-in belongs to.
    pub arrival_day: NaiveDate,
    /// 1-based position among the day's registrations.
    pub arrival_rank: i64,
    /// Points earned from the time-of-day window.
    pub time_score: i64,
    /// Bonus points for being the day's first scored arrival.
    pub rank_score: i64,
    /// `time_score + rank_score`.
    pub total_score: i64,
}

/// Latest per-user score and level snapshot. Created lazily on the first
/// arrival and mutated only by the registrar; `current_score` is
/// monotonically non-decreasing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAggregate {
    /// Chat-platform user id.
    pub user_id: String,
    /// Cumulative score after the latest accepted arrival.
    pub current_score: i64,
    /// Cumulative score before the latest accepted arrival.
    pub previous_score: i64,
    /// Level for `current_score`.
    pub level: i64,
    /// Display name of the level.
    pub level_name: String,
    /// Whether the latest arrival crossed a level boundary.
    pub level_uped: bool,
    /// Points until the next level; 0 once saturated at the final level.
    pub points_to_next_level: i64,
    /// Width of the current level band; `None` once saturated.
    pub point_range_to_next_level: Option<i64>,
    /// Position within the current level band; `None` once saturated.
    pub current_level_point: Option<i64>,
    /// Timestamp of the latest accepted arrival.
    pub updated_at: DateTime<Utc>,
}

/// Immutable badge-type catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeType {
    /// Catalog identifier.
    pub id: i64,
    /// Machine-readable rule name, e.g. `"welcome"`.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Instant the rule came into force; arrivals before it never qualify.
    /// `None` means the rule has always applied.
    pub apply_start: Option<DateTime<Utc>>,
}

/// Immutable badge catalog entry. Ids inside the reserved kiriban band are
/// scarce: at most one user may ever hold them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    /// Catalog identifier.
    pub id: i64,
    /// Message shown to the user on acquisition.
    pub message: String,
    /// Human-readable acquisition condition.
    pub condition: String,
    /// Tier of the badge within its type.
    pub level: i64,
    /// Prestige score attached to the badge.
    pub score: i64,
    /// Owning badge type.
    pub badge_type_id: i64,
}

/// Fact linking one arrival record to one badge for one user.
/// `(arrival_id, badge_id)` is unique; rows are never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Achievement {
    /// Unique fact identifier.
    pub id: i64,
    /// Chat-platform user id.
    pub user_id: String,
    /// The arrival the badge was earned on.
    pub arrival_id: i64,
    /// The earned badge.
    pub badge_id: i64,
    /// The arrival timestamp the badge was earned at.
    pub achieved_at: DateTime<Utc>,
}

/// First/latest acquisition per `(user_id, badge_id)` with a repeat count.
/// For scarce badges, existence of any row is the exclusivity lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBadge {
    /// Unique row identifier.
    pub id: i64,
    /// Chat-platform user id.
    pub user_id: String,
    /// The held badge.
    pub badge_id: i64,
    /// Timestamp of the first qualifying arrival.
    pub first_acquired_at: DateTime<Utc>,
    /// Timestamp of the latest qualifying arrival.
    pub last_acquired_at: DateTime<Utc>,
    /// Number of qualifying arrivals.
    pub count: i64,
}
