//! `PostgreSQL` implementation of the `ArrivalStore` trait.
//!
//! Registration takes a per-day advisory lock inside its transaction, so
//! concurrent same-day registrations serialize and ranks stay contiguous.
//! The raw arrival event is written outside the transaction: it must
//! survive even when the registration is rejected as a duplicate.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;

use earlybird_core::aggregate;
use earlybird_core::error::DomainError;
use earlybird_core::model::{
    Achievement, ArrivalRecord, Badge, BadgeType, UserAggregate, UserBadge,
};
use earlybird_core::store::{ArrivalStore, ArrivalSubmission, RegistrationOutcome};

/// PostgreSQL-backed arrival store.
#[derive(Debug, Clone)]
pub struct PgArrivalStore {
    pool: PgPool,
}

impl PgArrivalStore {
    /// Creates a new `PgArrivalStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn infra(err: sqlx::Error) -> DomainError {
    DomainError::Infrastructure(err.to_string())
}

#[derive(sqlx::FromRow)]
struct ArrivalRecordRow {
    id: i64,
    user_id: String,
    arrived_at: DateTime<Utc>,
    arrival_day: NaiveDate,
    arrival_rank: i64,
    time_score: i64,
    rank_score: i64,
    total_score: i64,
}

impl From<ArrivalRecordRow> for ArrivalRecord {
    fn from(row: ArrivalRecordRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            arrived_at: row.arrived_at,
            arrival_day: row.arrival_day,
            arrival_rank: row.arrival_rank,
            time_score: row.time_score,
            rank_score: row.rank_score,
            total_score: row.total_score,
        }
    }
}

#[derive(sqlx::FromRow)]
struct UserAggregateRow {
    user_id: String,
    current_score: i64,
    previous_score: i64,
    level: i64,
    level_name: String,
    level_uped: bool,
    points_to_next_level: i64,
    point_range_to_next_level: Option<i64>,
    current_level_point: Option<i64>,
    updated_at: DateTime<Utc>,
}

impl From<UserAggregateRow> for UserAggregate {
    fn from(row: UserAggregateRow) -> Self {
        Self {
            user_id: row.user_id,
            current_score: row.current_score,
            previous_score: row.previous_score,
            level: row.level,
            level_name: row.level_name,
            level_uped: row.level_uped,
            points_to_next_level: row.points_to_next_level,
            point_range_to_next_level: row.point_range_to_next_level,
            current_level_point: row.current_level_point,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct AchievementRow {
    id: i64,
    user_id: String,
    arrival_id: i64,
    badge_id: i64,
    achieved_at: DateTime<Utc>,
}

impl From<AchievementRow> for Achievement {
    fn from(row: AchievementRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            arrival_id: row.arrival_id,
            badge_id: row.badge_id,
            achieved_at: row.achieved_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct UserBadgeRow {
    id: i64,
    user_id: String,
    badge_id: i64,
    first_acquired_at: DateTime<Utc>,
    last_acquired_at: DateTime<Utc>,
    count: i64,
}

impl From<UserBadgeRow> for UserBadge {
    fn from(row: UserBadgeRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            badge_id: row.badge_id,
            first_acquired_at: row.first_acquired_at,
            last_acquired_at: row.last_acquired_at,
            count: row.count,
        }
    }
}

const SELECT_ARRIVAL: &str = "SELECT id, user_id, arrived_at, arrival_day, arrival_rank, \
     time_score, rank_score, total_score FROM arrival_record";

const SELECT_AGGREGATE: &str = "SELECT user_id, current_score, previous_score, level, level_name, \
     level_uped, points_to_next_level, point_range_to_next_level, \
     current_level_point, updated_at FROM user_aggregate";

#[async_trait]
impl ArrivalStore for PgArrivalStore {
    async fn register_arrival(
        &self,
        submission: ArrivalSubmission,
    ) -> Result<RegistrationOutcome, DomainError> {
        // The audit log keeps every attempt, duplicates included, so it
        // is written on the pool before the transaction begins.
        sqlx::query("INSERT INTO arrival_event (user_id, arrived_at) VALUES ($1, $2)")
            .bind(&submission.user_id)
            .bind(submission.arrived_at)
            .execute(&self.pool)
            .await
            .map_err(infra)?;

        let mut tx = self.pool.begin().await.map_err(infra)?;

        // Serialize registrations for the day so ranks stay contiguous.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(submission.arrival_day.to_string())
            .execute(&mut *tx)
            .await
            .map_err(infra)?;

        let duplicate: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM arrival_record WHERE user_id = $1 AND arrival_day = $2")
                .bind(&submission.user_id)
                .bind(submission.arrival_day)
                .fetch_optional(&mut *tx)
                .await
                .map_err(infra)?;
        if duplicate.is_some() {
            tracing::debug!(
                user_id = %submission.user_id,
                day = %submission.arrival_day,
                "duplicate same-day registration"
            );
            return Ok(RegistrationOutcome::AlreadyRegisteredToday {
                user_id: submission.user_id,
                day: submission.arrival_day,
            });
        }

        let (rank,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) + 1 FROM arrival_record WHERE arrival_day = $1")
                .bind(submission.arrival_day)
                .fetch_one(&mut *tx)
                .await
                .map_err(infra)?;
        let rank_score = if rank == 1 {
            submission.first_rank_bonus
        } else {
            0
        };
        let total_score = submission.time_score + rank_score;

        let record: ArrivalRecordRow = sqlx::query_as(
            "INSERT INTO arrival_record \
                 (user_id, arrived_at, arrival_day, arrival_rank, \
                  time_score, rank_score, total_score) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING id, user_id, arrived_at, arrival_day, arrival_rank, \
                 time_score, rank_score, total_score",
        )
        .bind(&submission.user_id)
        .bind(submission.arrived_at)
        .bind(submission.arrival_day)
        .bind(rank)
        .bind(submission.time_score)
        .bind(rank_score)
        .bind(total_score)
        .fetch_one(&mut *tx)
        .await
        .map_err(infra)?;
        let record = ArrivalRecord::from(record);

        let previous: Option<UserAggregateRow> =
            sqlx::query_as(&format!("{SELECT_AGGREGATE} WHERE user_id = $1 FOR UPDATE"))
                .bind(&submission.user_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(infra)?;
        let previous = previous.map(UserAggregate::from);
        let user = aggregate::advance(
            previous.as_ref(),
            &submission.user_id,
            record.total_score,
            submission.arrived_at,
        );

        sqlx::query(
            "INSERT INTO user_aggregate \
                 (user_id, current_score, previous_score, level, level_name, \
                  level_uped, points_to_next_level, point_range_to_next_level, \
                  current_level_point, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             ON CONFLICT (user_id) DO UPDATE SET \
                 current_score = EXCLUDED.current_score, \
                 previous_score = EXCLUDED.previous_score, \
                 level = EXCLUDED.level, \
                 level_name = EXCLUDED.level_name, \
                 level_uped = EXCLUDED.level_uped, \
                 points_to_next_level = EXCLUDED.points_to_next_level, \
                 point_range_to_next_level = EXCLUDED.point_range_to_next_level, \
                 current_level_point = EXCLUDED.current_level_point, \
                 updated_at = EXCLUDED.updated_at",
        )
        .bind(&user.user_id)
        .bind(user.current_score)
        .bind(user.previous_score)
        .bind(user.level)
        .bind(&user.level_name)
        .bind(user.level_uped)
        .bind(user.points_to_next_level)
        .bind(user.point_range_to_next_level)
        .bind(user.current_level_point)
        .bind(user.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(infra)?;

        tx.commit().await.map_err(infra)?;

        Ok(RegistrationOutcome::Registered { record, user })
    }

    async fn find_arrival(&self, arrival_id: i64) -> Result<Option<ArrivalRecord>, DomainError> {
        let row: Option<ArrivalRecordRow> =
            sqlx::query_as(&format!("{SELECT_ARRIVAL} WHERE id = $1"))
                .bind(arrival_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(infra)?;
        Ok(row.map(ArrivalRecord::from))
    }

    async fn count_user_arrivals_before(
        &self,
        user_id: &str,
        before: DateTime<Utc>,
    ) -> Result<i64, DomainError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM arrival_record WHERE user_id = $1 AND arrived_at < $2",
        )
        .bind(user_id)
        .bind(before)
        .fetch_one(&self.pool)
        .await
        .map_err(infra)?;
        Ok(count)
    }

    async fn count_arrivals_preceding(&self, record: &ArrivalRecord) -> Result<i64, DomainError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM arrival_record WHERE (arrived_at, id) < ($1, $2)")
                .bind(record.arrived_at)
                .bind(record.id)
                .fetch_one(&self.pool)
                .await
                .map_err(infra)?;
        Ok(count)
    }

    async fn earliest_user_arrival_between(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Option<ArrivalRecord>, DomainError> {
        let row: Option<ArrivalRecordRow> = sqlx::query_as(&format!(
            "{SELECT_ARRIVAL} WHERE user_id = $1 AND arrived_at >= $2 AND arrived_at <= $3 \
             ORDER BY arrived_at, id LIMIT 1"
        ))
        .bind(user_id)
        .bind(since)
        .bind(until)
        .fetch_optional(&self.pool)
        .await
        .map_err(infra)?;
        Ok(row.map(ArrivalRecord::from))
    }

    async fn latest_user_arrival_before(
        &self,
        user_id: &str,
        before: DateTime<Utc>,
    ) -> Result<Option<ArrivalRecord>, DomainError> {
        let row: Option<ArrivalRecordRow> = sqlx::query_as(&format!(
            "{SELECT_ARRIVAL} WHERE user_id = $1 AND arrived_at < $2 \
             ORDER BY arrived_at DESC, id DESC LIMIT 1"
        ))
        .bind(user_id)
        .bind(before)
        .fetch_optional(&self.pool)
        .await
        .map_err(infra)?;
        Ok(row.map(ArrivalRecord::from))
    }

    async fn count_same_minute_arrivals(
        &self,
        record: &ArrivalRecord,
        minute_start: DateTime<Utc>,
    ) -> Result<i64, DomainError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM arrival_record \
             WHERE arrived_at >= $1 AND (arrived_at, id) <= ($2, $3)",
        )
        .bind(minute_start)
        .bind(record.arrived_at)
        .bind(record.id)
        .fetch_one(&self.pool)
        .await
        .map_err(infra)?;
        Ok(count)
    }

    async fn recent_user_arrivals(
        &self,
        user_id: &str,
        before: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<ArrivalRecord>, DomainError> {
        let rows: Vec<ArrivalRecordRow> = sqlx::query_as(&format!(
            "{SELECT_ARRIVAL} WHERE user_id = $1 AND arrived_at < $2 \
             ORDER BY arrived_at DESC, id DESC LIMIT $3"
        ))
        .bind(user_id)
        .bind(before)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(infra)?;
        Ok(rows.into_iter().map(ArrivalRecord::from).collect())
    }

    async fn achievements_for_arrival(
        &self,
        arrival_id: i64,
    ) -> Result<Vec<Achievement>, DomainError> {
        let rows: Vec<AchievementRow> = sqlx::query_as(
            "SELECT id, user_id, arrival_id, badge_id, achieved_at \
             FROM achievement WHERE arrival_id = $1 ORDER BY id",
        )
        .bind(arrival_id)
        .fetch_all(&self.pool)
        .await
        .map_err(infra)?;
        Ok(rows.into_iter().map(Achievement::from).collect())
    }

    async fn achievements_for_arrivals(
        &self,
        arrival_ids: &[i64],
    ) -> Result<Vec<Achievement>, DomainError> {
        let rows: Vec<AchievementRow> = sqlx::query_as(
            "SELECT id, user_id, arrival_id, badge_id, achieved_at \
             FROM achievement WHERE arrival_id = ANY($1) ORDER BY id",
        )
        .bind(arrival_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(infra)?;
        Ok(rows.into_iter().map(Achievement::from).collect())
    }

    async fn badge_holder_exists(&self, badge_id: i64) -> Result<bool, DomainError> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM user_badge WHERE badge_id = $1)")
                .bind(badge_id)
                .fetch_one(&self.pool)
                .await
                .map_err(infra)?;
        Ok(exists)
    }

    async fn record_achievements(
        &self,
        record: &ArrivalRecord,
        badge_ids: &[i64],
    ) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(infra)?;

        for badge_id in badge_ids {
            let inserted = sqlx::query(
                "INSERT INTO achievement (user_id, arrival_id, badge_id, achieved_at) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(&record.user_id)
            .bind(record.id)
            .bind(badge_id)
            .bind(record.arrived_at)
            .execute(&mut *tx)
            .await;
            match inserted {
                Ok(_) => {}
                Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                    return Err(DomainError::AchievementAlreadyRegistered(record.id));
                }
                Err(err) => return Err(infra(err)),
            }

            // A scarce badge already held by another user trips the partial
            // unique index on user_badge and rolls the transaction back.
            sqlx::query(
                "INSERT INTO user_badge \
                     (user_id, badge_id, first_acquired_at, last_acquired_at, count) \
                 VALUES ($1, $2, $3, $3, 1) \
                 ON CONFLICT (user_id, badge_id) DO UPDATE SET \
                     count = user_badge.count + 1, \
                     last_acquired_at = EXCLUDED.last_acquired_at",
            )
            .bind(&record.user_id)
            .bind(badge_id)
            .bind(record.arrived_at)
            .execute(&mut *tx)
            .await
            .map_err(infra)?;
        }

        tx.commit().await.map_err(infra)
    }

    async fn seed_catalog(
        &self,
        types: &[BadgeType],
        badges: &[Badge],
    ) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(infra)?;

        for badge_type in types {
            sqlx::query(
                "INSERT INTO badge_type (id, name, description, apply_start) \
                 VALUES ($1, $2, $3, $4) ON CONFLICT (id) DO NOTHING",
            )
            .bind(badge_type.id)
            .bind(&badge_type.name)
            .bind(&badge_type.description)
            .bind(badge_type.apply_start)
            .execute(&mut *tx)
            .await
            .map_err(infra)?;
        }
        for badge in badges {
            sqlx::query(
                "INSERT INTO badge (id, message, condition, level, score, badge_type_id) \
                 VALUES ($1, $2, $3, $4, $5, $6) ON CONFLICT (id) DO NOTHING",
            )
            .bind(badge.id)
            .bind(&badge.message)
            .bind(&badge.condition)
            .bind(badge.level)
            .bind(badge.score)
            .bind(badge.badge_type_id)
            .execute(&mut *tx)
            .await
            .map_err(infra)?;
        }

        tx.commit().await.map_err(infra)
    }

    async fn user_aggregate(&self, user_id: &str) -> Result<Option<UserAggregate>, DomainError> {
        let row: Option<UserAggregateRow> =
            sqlx::query_as(&format!("{SELECT_AGGREGATE} WHERE user_id = $1"))
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(infra)?;
        Ok(row.map(UserAggregate::from))
    }

    async fn arrivals_on_day(&self, day: NaiveDate) -> Result<Vec<ArrivalRecord>, DomainError> {
        let rows: Vec<ArrivalRecordRow> = sqlx::query_as(&format!(
            "{SELECT_ARRIVAL} WHERE arrival_day = $1 ORDER BY arrival_rank"
        ))
        .bind(day)
        .fetch_all(&self.pool)
        .await
        .map_err(infra)?;
        Ok(rows.into_iter().map(ArrivalRecord::from).collect())
    }

    async fn user_badges(&self, user_id: &str) -> Result<Vec<UserBadge>, DomainError> {
        let rows: Vec<UserBadgeRow> = sqlx::query_as(
            "SELECT id, user_id, badge_id, first_acquired_at, last_acquired_at, count \
             FROM user_badge WHERE user_id = $1 ORDER BY badge_id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(infra)?;
        Ok(rows.into_iter().map(UserBadge::from).collect())
    }

    async fn user_achievements(&self, user_id: &str) -> Result<Vec<Achievement>, DomainError> {
        let rows: Vec<AchievementRow> = sqlx::query_as(
            "SELECT id, user_id, arrival_id, badge_id, achieved_at \
             FROM achievement WHERE user_id = $1 ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(infra)?;
        Ok(rows.into_iter().map(Achievement::from).collect())
    }
}
