//! Badge evaluation over committed arrivals.

use std::sync::Arc;

use chrono::FixedOffset;
use tracing::{debug, info};

use earlybird_catalog::BadgeCatalog;
use earlybird_core::error::DomainError;
use earlybird_core::store::ArrivalStore;

use crate::rules::BadgeRule;

/// Runs the badge rules for one arrival and records the verdicts.
pub struct BadgeEvaluator {
    store: Arc<dyn ArrivalStore>,
    catalog: Arc<BadgeCatalog>,
    rules: Vec<BadgeRule>,
    local_offset: FixedOffset,
}

impl BadgeEvaluator {
    /// Creates an evaluator running the standard rule set.
    #[must_use]
    pub fn new(
        store: Arc<dyn ArrivalStore>,
        catalog: Arc<BadgeCatalog>,
        local_offset: FixedOffset,
    ) -> Self {
        Self {
            store,
            catalog,
            rules: BadgeRule::standard_order(),
            local_offset,
        }
    }

    /// Evaluates one arrival and returns the badge ids awarded, possibly
    /// none. Badges in the scarce band go to the first qualifier only;
    /// later qualifiers are skipped silently.
    ///
    /// # Errors
    ///
    /// - [`DomainError::ArrivalNotFound`] when no arrival has this id.
    /// - [`DomainError::AchievementAlreadyRegistered`] when the arrival was
    ///   evaluated before. Evaluation is a one-shot step, not idempotent.
    /// - [`DomainError::UnknownBadge`] when a rule names a badge the
    ///   catalog does not carry.
    pub async fn evaluate(&self, arrival_id: i64) -> Result<Vec<i64>, DomainError> {
        let existing = self.store.achievements_for_arrival(arrival_id).await?;
        if !existing.is_empty() {
            return Err(DomainError::AchievementAlreadyRegistered(arrival_id));
        }

        let record = self
            .store
            .find_arrival(arrival_id)
            .await?
            .ok_or(DomainError::ArrivalNotFound(arrival_id))?;

        let mut awarded = Vec::new();
        for rule in &self.rules {
            let candidates = rule
                .qualifying(self.store.as_ref(), &self.catalog, &record, self.local_offset)
                .await?;
            for badge_id in candidates {
                if self.catalog.badge(badge_id).is_none() {
                    return Err(DomainError::UnknownBadge(badge_id));
                }
                if self.catalog.is_scarce(badge_id)
                    && self.store.badge_holder_exists(badge_id).await?
                {
                    debug!(arrival_id, badge_id, "scarce badge already claimed");
                    continue;
                }
                awarded.push(badge_id);
            }
        }

        if !awarded.is_empty() {
            self.store.record_achievements(&record, &awarded).await?;
        }
        info!(
            arrival_id,
            user_id = %record.user_id,
            badges = ?awarded,
            "arrival evaluated"
        );
        Ok(awarded)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};
    use earlybird_catalog::{DEFAULT_KIRIBAN_CEILING, badge_id};
    use earlybird_core::store::RegistrationOutcome;
    use earlybird_test_support::InMemoryArrivalStore;

    use crate::registrar::ArrivalRegistrar;

    use super::*;

    struct Fixture {
        store: Arc<InMemoryArrivalStore>,
        registrar: ArrivalRegistrar,
        evaluator: BadgeEvaluator,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryArrivalStore::new());
        let offset = FixedOffset::east_opt(0).unwrap();
        let catalog = Arc::new(BadgeCatalog::standard(DEFAULT_KIRIBAN_CEILING).unwrap());
        Fixture {
            store: store.clone(),
            registrar: ArrivalRegistrar::new(store.clone(), offset),
            evaluator: BadgeEvaluator::new(store, catalog, offset),
        }
    }

    fn at(month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, month, day, hour, minute, 0)
            .unwrap()
    }

    async fn register(fx: &Fixture, user: &str, when: DateTime<Utc>) -> i64 {
        match fx.registrar.register(user, when).await.unwrap() {
            RegistrationOutcome::Registered { record, .. } => record.id,
            RegistrationOutcome::AlreadyRegisteredToday { .. } => {
                panic!("arrival unexpectedly rejected")
            }
        }
    }

    #[tokio::test]
    async fn test_first_arrival_earns_welcome_fastest_window_and_start_dash() {
        let fx = fixture();
        let arrival = register(&fx, "U1", at(1, 15, 8, 0)).await;

        let awarded = fx.evaluator.evaluate(arrival).await.unwrap();

        assert!(awarded.contains(&badge_id::WELCOME));
        assert!(awarded.contains(&badge_id::FASTEST_ARRIVAL));
        assert!(awarded.contains(&badge_id::TIME_WINDOW_MORNING));
        assert!(awarded.contains(&badge_id::START_DASH));
        assert_eq!(awarded.len(), 4);
    }

    #[tokio::test]
    async fn test_evaluating_twice_is_an_error_and_writes_nothing_twice() {
        let fx = fixture();
        let arrival = register(&fx, "U1", at(1, 15, 8, 0)).await;

        let first = fx.evaluator.evaluate(arrival).await.unwrap();
        let second = fx.evaluator.evaluate(arrival).await;

        assert_eq!(
            second,
            Err(DomainError::AchievementAlreadyRegistered(arrival))
        );
        let achievements = fx.store.all_achievements();
        assert_eq!(achievements.len(), first.len());
    }

    #[tokio::test]
    async fn test_missing_arrival_is_reported() {
        let fx = fixture();

        let result = fx.evaluator.evaluate(4242).await;

        assert_eq!(result, Err(DomainError::ArrivalNotFound(4242)));
    }

    #[tokio::test]
    async fn test_hundredth_overall_arrival_earns_the_kiriban() {
        let fx = fixture();
        for i in 0..99u32 {
            let user = format!("W{i}");
            register(&fx, &user, at(1, 15, 9 + i / 60, i % 60)).await;
        }
        let arrival = register(&fx, "U1", at(1, 15, 13, 0)).await;

        let awarded = fx.evaluator.evaluate(arrival).await.unwrap();

        assert!(awarded.contains(&601));
    }

    #[tokio::test]
    async fn test_scarce_badge_goes_to_the_first_holder_only() {
        let fx = fixture();

        // User A already holds the milestone badge.
        let held = register(&fx, "A", at(1, 14, 9, 0)).await;
        let held_record = fx.store.find_arrival(held).await.unwrap().unwrap();
        fx.store
            .record_achievements(&held_record, &[601])
            .await
            .unwrap();

        for i in 0..98u32 {
            let user = format!("W{i}");
            register(&fx, &user, at(1, 15, 9 + i / 60, i % 60)).await;
        }
        // B lands exactly on the 100th overall arrival, but the badge is
        // taken.
        let hundredth = register(&fx, "B", at(1, 15, 13, 0)).await;
        let awarded = fx.evaluator.evaluate(hundredth).await.unwrap();

        assert!(!awarded.contains(&601));
        assert!(awarded.contains(&badge_id::WELCOME));
    }

    #[tokio::test]
    async fn test_third_same_minute_arrival_is_a_lucky_trio() {
        let fx = fixture();
        register(&fx, "U1", at(1, 15, 9, 30)).await;
        register(&fx, "U2", at(1, 15, 9, 30)).await;
        let third = register(&fx, "U3", at(1, 15, 9, 30)).await;

        let awarded = fx.evaluator.evaluate(third).await.unwrap();

        assert!(awarded.contains(&badge_id::LUCKY_TRIO));
        assert!(!awarded.contains(&badge_id::LUCKY_PAIR));
    }

    #[tokio::test]
    async fn test_fifth_cumulative_arrival_earns_the_count_badge() {
        let fx = fixture();
        let mut last = 0;
        for day in 12..=16 {
            last = register(&fx, "U1", at(1, day, 9, 0)).await;
        }

        let awarded = fx.evaluator.evaluate(last).await.unwrap();

        assert!(awarded.contains(&badge_id::ARRIVAL_COUNT_5));
    }

    #[tokio::test]
    async fn test_nineteen_day_gap_earns_the_two_week_return_badge() {
        let fx = fixture();
        register(&fx, "U1", at(1, 5, 9, 0)).await;
        let comeback = register(&fx, "U1", at(1, 24, 9, 0)).await;

        let awarded = fx.evaluator.evaluate(comeback).await.unwrap();

        assert!(awarded.contains(&badge_id::LONG_TIME_NO_SEE_2_WEEKS));
        assert!(!awarded.contains(&badge_id::LONG_TIME_NO_SEE_1_MONTH));
    }

    #[tokio::test]
    async fn test_straight_flash_awards_once_per_five_fresh_days() {
        let fx = fixture();

        // Mon 2026-01-12 through Fri 2026-01-16, same hour every day.
        let mut awarded_by_day = Vec::new();
        for day in 12..=16 {
            let arrival = register(&fx, "U1", at(1, day, 8, 15)).await;
            awarded_by_day.push(fx.evaluator.evaluate(arrival).await.unwrap());
        }
        assert!(!awarded_by_day[3].contains(&badge_id::STRAIGHT_FLASH));
        assert!(awarded_by_day[4].contains(&badge_id::STRAIGHT_FLASH));
        // Identical hours: no royal tier.
        assert!(!awarded_by_day[4].contains(&badge_id::ROYAL_STRAIGHT_FLASH));

        // Mon 19 continues the streak but the celebration already
        // happened within the window.
        let monday = register(&fx, "U1", at(1, 19, 8, 15)).await;
        let monday_awards = fx.evaluator.evaluate(monday).await.unwrap();
        assert!(!monday_awards.contains(&badge_id::STRAIGHT_FLASH));

        // By Fri 23 the previous celebration has rolled out of the
        // window and the streak is rewarded again.
        let mut friday_awards = Vec::new();
        for day in 20..=23 {
            let arrival = register(&fx, "U1", at(1, day, 8, 15)).await;
            friday_awards = fx.evaluator.evaluate(arrival).await.unwrap();
        }
        assert!(friday_awards.contains(&badge_id::STRAIGHT_FLASH));
    }

    #[tokio::test]
    async fn test_fresh_streak_tiers_are_not_blocked_by_a_plain_flush() {
        let fx = fixture();

        // Mon 12 through Fri 16 at hours 8, 8, 9, 10, 11: Friday earns the
        // plain flush only, since the week spans four distinct hours.
        let hours = [8, 8, 9, 10, 11];
        let mut friday_awards = Vec::new();
        for (index, day) in (12..=16).enumerate() {
            let arrival = register(&fx, "U1", at(1, day, hours[index], 0)).await;
            friday_awards = fx.evaluator.evaluate(arrival).await.unwrap();
        }
        assert!(friday_awards.contains(&badge_id::STRAIGHT_FLASH));
        assert!(!friday_awards.contains(&badge_id::ROYAL_STRAIGHT_FLASH));

        // Mon 19 at hour 12 makes the last five arrivals span hours 8
        // through 12. The plain flush is still inside its window, but the
        // higher tiers are reached for the first time and must land.
        let monday = register(&fx, "U1", at(1, 19, 12, 0)).await;
        let awarded = fx.evaluator.evaluate(monday).await.unwrap();

        assert!(!awarded.contains(&badge_id::STRAIGHT_FLASH));
        assert!(awarded.contains(&badge_id::ROYAL_STRAIGHT_FLASH));
        assert!(awarded.contains(&badge_id::ULTRA_ROYAL_STRAIGHT_FLASH));
    }

    #[tokio::test]
    async fn test_consecutive_hours_earn_the_ultra_royal_tier() {
        let fx = fixture();

        let mut last = 0;
        for (offset, day) in (12..=16).enumerate() {
            let hour = 8 + u32::try_from(offset).unwrap();
            last = register(&fx, "U1", at(1, day, hour, 0)).await;
        }

        let awarded = fx.evaluator.evaluate(last).await.unwrap();

        assert!(awarded.contains(&badge_id::STRAIGHT_FLASH));
        assert!(awarded.contains(&badge_id::ROYAL_STRAIGHT_FLASH));
        assert!(awarded.contains(&badge_id::ULTRA_ROYAL_STRAIGHT_FLASH));
    }

    #[tokio::test]
    async fn test_start_dash_stops_two_weeks_after_the_first_arrival() {
        let fx = fixture();
        register(&fx, "U1", at(1, 5, 9, 0)).await;
        let within = register(&fx, "U1", at(1, 16, 9, 0)).await;
        let beyond = register(&fx, "U1", at(1, 22, 9, 0)).await;

        let awarded = fx.evaluator.evaluate(within).await.unwrap();
        assert!(awarded.contains(&badge_id::START_DASH));

        let awarded = fx.evaluator.evaluate(beyond).await.unwrap();
        assert!(!awarded.contains(&badge_id::START_DASH));
    }

    #[tokio::test]
    async fn test_gated_rules_ignore_arrivals_before_they_opened() {
        let fx = fixture();
        // 2025-12-15 at 11:11 predates both gated rules.
        let early = Utc.with_ymd_and_hms(2025, 12, 15, 11, 11, 0).unwrap();
        let arrival = register(&fx, "U1", early).await;

        let awarded = fx.evaluator.evaluate(arrival).await.unwrap();

        assert!(!awarded.contains(&badge_id::START_DASH));
        assert!(!awarded.contains(&badge_id::SPECIFIC_TIME_1111));
        assert!(awarded.contains(&badge_id::WELCOME));
    }

    #[tokio::test]
    async fn test_exact_clock_readings_outrank_the_digit_patterns() {
        let fx = fixture();
        // 09:10 has adjacent digits too, but the exact reading wins.
        let arrival = register(&fx, "U1", at(1, 15, 9, 10)).await;

        let awarded = fx.evaluator.evaluate(arrival).await.unwrap();

        assert!(awarded.contains(&badge_id::SPECIFIC_TIME_0910));
        assert!(!awarded.contains(&badge_id::SPECIFIC_TIME_ADJACENT));
    }

    #[tokio::test]
    async fn test_matching_and_adjacent_clock_digits_earn_their_badges() {
        let fx = fixture();
        let matching = register(&fx, "U1", at(1, 15, 13, 13)).await;
        let adjacent = register(&fx, "U2", at(1, 15, 13, 14)).await;

        let awarded = fx.evaluator.evaluate(matching).await.unwrap();
        assert!(awarded.contains(&badge_id::SPECIFIC_TIME_MATCHING));

        let awarded = fx.evaluator.evaluate(adjacent).await.unwrap();
        assert!(awarded.contains(&badge_id::SPECIFIC_TIME_ADJACENT));
        assert!(!awarded.contains(&badge_id::SPECIFIC_TIME_MATCHING));
    }
}
