//! Badge qualification rules.
//!
//! Each rule inspects one committed arrival record against the store and
//! answers with the badge ids the arrival qualifies for. Rules never write;
//! the [`crate::evaluator::BadgeEvaluator`] persists the verdicts.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Timelike, Utc, Weekday};

use earlybird_catalog::{BadgeCatalog, badge_id, badge_type_id};
use earlybird_core::error::DomainError;
use earlybird_core::model::ArrivalRecord;
use earlybird_core::store::ArrivalStore;

use crate::scoring;

/// Streak length for the straight-flush family.
const STRAIGHT_FLASH_LENGTH: usize = 5;

/// Days scanned backwards when resolving recent business days. Generous
/// enough to hold five business days across any holiday cluster.
const BUSINESS_DAY_SCAN_WINDOW: i64 = 14;

/// How long after the first check-in the start-dash badge keeps landing.
const START_DASH_WINDOW_DAYS: i64 = 14;

/// One badge qualification rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeRule {
    /// First-ever check-in of a user.
    Welcome,
    /// First check-in of the day.
    FastestArrival,
    /// Cumulative check-in counts (5, 20, 100).
    ArrivalCount,
    /// Five consecutive business days, with royal and ultra-royal tiers.
    StraightFlash,
    /// Local time-of-day windows.
    TimeWindow,
    /// Round-number global check-in ordinals.
    Kiriban,
    /// Returning after a long absence.
    LongTimeNoSee,
    /// Several users checking in within the same minute.
    LuckyYouGuys,
    /// Check-in within two weeks of the user's first check-in.
    StartDash,
    /// Check-in at a notable clock reading.
    SpecificTime,
}

impl BadgeRule {
    /// Every rule, in the order evaluation runs them.
    #[must_use]
    pub fn standard_order() -> Vec<Self> {
        vec![
            Self::Welcome,
            Self::FastestArrival,
            Self::ArrivalCount,
            Self::StraightFlash,
            Self::TimeWindow,
            Self::Kiriban,
            Self::LongTimeNoSee,
            Self::LuckyYouGuys,
            Self::StartDash,
            Self::SpecificTime,
        ]
    }

    /// The badge ids this arrival qualifies for under this rule.
    pub(crate) async fn qualifying(
        self,
        store: &dyn ArrivalStore,
        catalog: &BadgeCatalog,
        record: &ArrivalRecord,
        offset: FixedOffset,
    ) -> Result<Vec<i64>, DomainError> {
        match self {
            Self::Welcome => welcome(store, record, offset).await,
            Self::FastestArrival => Ok(fastest_arrival(record)),
            Self::ArrivalCount => arrival_count(store, record, offset).await,
            Self::StraightFlash => straight_flash(store, record, offset).await,
            Self::TimeWindow => Ok(time_window(record, offset)),
            Self::Kiriban => kiriban(store, catalog, record).await,
            Self::LongTimeNoSee => long_time_no_see(store, record).await,
            Self::LuckyYouGuys => lucky_you_guys(store, record).await,
            Self::StartDash => start_dash(store, catalog, record).await,
            Self::SpecificTime => Ok(specific_time(catalog, record, offset)),
        }
    }
}

async fn welcome(
    store: &dyn ArrivalStore,
    record: &ArrivalRecord,
    offset: FixedOffset,
) -> Result<Vec<i64>, DomainError> {
    let (day_start, _) = scoring::day_bounds(record.arrival_day, offset);
    let earlier = store
        .count_user_arrivals_before(&record.user_id, day_start)
        .await?;
    Ok(if earlier == 0 {
        vec![badge_id::WELCOME]
    } else {
        Vec::new()
    })
}

fn fastest_arrival(record: &ArrivalRecord) -> Vec<i64> {
    if record.arrival_rank == 1 {
        vec![badge_id::FASTEST_ARRIVAL]
    } else {
        Vec::new()
    }
}

async fn arrival_count(
    store: &dyn ArrivalStore,
    record: &ArrivalRecord,
    offset: FixedOffset,
) -> Result<Vec<i64>, DomainError> {
    let (_, day_end) = scoring::day_bounds(record.arrival_day, offset);
    // Counting up to the end of the day includes the record itself.
    let total = store
        .count_user_arrivals_before(&record.user_id, day_end)
        .await?;
    Ok(match total {
        5 => vec![badge_id::ARRIVAL_COUNT_5],
        20 => vec![badge_id::ARRIVAL_COUNT_20],
        100 => vec![badge_id::ARRIVAL_COUNT_100],
        _ => Vec::new(),
    })
}

async fn straight_flash(
    store: &dyn ArrivalStore,
    record: &ArrivalRecord,
    offset: FixedOffset,
) -> Result<Vec<i64>, DomainError> {
    let expected_days = recent_business_days(record.arrival_day, STRAIGHT_FLASH_LENGTH);
    if expected_days.len() < STRAIGHT_FLASH_LENGTH {
        return Ok(Vec::new());
    }

    let (_, day_end) = scoring::day_bounds(record.arrival_day, offset);
    let recents = store
        .recent_user_arrivals(
            &record.user_id,
            day_end,
            i64::try_from(STRAIGHT_FLASH_LENGTH).unwrap_or(i64::MAX),
        )
        .await?;
    if recents.len() < STRAIGHT_FLASH_LENGTH {
        return Ok(Vec::new());
    }

    // `recents` is newest first; the expected days are oldest first.
    let mut actual_days: Vec<NaiveDate> = recents.iter().map(|r| r.arrival_day).collect();
    actual_days.reverse();
    if actual_days != expected_days {
        return Ok(Vec::new());
    }

    let mut candidates = vec![badge_id::STRAIGHT_FLASH];

    let mut hours: Vec<u32> = recents
        .iter()
        .map(|r| scoring::local_time(r.arrived_at, offset).hour())
        .collect();
    hours.sort_unstable();
    hours.dedup();
    if hours.len() == STRAIGHT_FLASH_LENGTH {
        candidates.push(badge_id::ROYAL_STRAIGHT_FLASH);
        if hours[STRAIGHT_FLASH_LENGTH - 1] - hours[0] == 4 {
            candidates.push(badge_id::ULTRA_ROYAL_STRAIGHT_FLASH);
        }
    }

    // Each tier sits out while its own celebration is within the previous
    // four arrivals; a tier reached for the first time mid-window still
    // lands.
    let previous_ids: Vec<i64> = recents
        .iter()
        .filter(|r| r.id != record.id)
        .map(|r| r.id)
        .collect();
    let previous = store.achievements_for_arrivals(&previous_ids).await?;
    candidates.retain(|candidate| {
        !previous
            .iter()
            .any(|achievement| achievement.badge_id == *candidate)
    });

    Ok(candidates)
}

fn time_window(record: &ArrivalRecord, offset: FixedOffset) -> Vec<i64> {
    let hour = scoring::local_time(record.arrived_at, offset).hour();
    match hour {
        6 => vec![badge_id::TIME_WINDOW_ULTRA_EARLY],
        7 | 8 => vec![badge_id::TIME_WINDOW_MORNING],
        9 | 10 => vec![badge_id::TIME_WINDOW_STANDARD],
        11..=17 => vec![badge_id::TIME_WINDOW_LATE],
        _ => Vec::new(),
    }
}

async fn kiriban(
    store: &dyn ArrivalStore,
    catalog: &BadgeCatalog,
    record: &ArrivalRecord,
) -> Result<Vec<i64>, DomainError> {
    let preceding = store.count_arrivals_preceding(record).await?;
    let Ok(ordinal) = u32::try_from(preceding + 1) else {
        return Ok(Vec::new());
    };
    Ok(catalog
        .kiriban_badge_for_ordinal(ordinal)
        .map_or_else(Vec::new, |id| vec![id]))
}

async fn long_time_no_see(
    store: &dyn ArrivalStore,
    record: &ArrivalRecord,
) -> Result<Vec<i64>, DomainError> {
    let previous = store
        .latest_user_arrival_before(&record.user_id, record.arrived_at)
        .await?;
    let Some(previous) = previous else {
        return Ok(Vec::new());
    };

    let gap_days = (record.arrived_at - previous.arrived_at).num_days();
    Ok(if gap_days > 183 {
        vec![badge_id::LONG_TIME_NO_SEE_HALF_YEAR]
    } else if gap_days > 61 {
        vec![badge_id::LONG_TIME_NO_SEE_2_MONTHS]
    } else if gap_days > 30 {
        vec![badge_id::LONG_TIME_NO_SEE_1_MONTH]
    } else if gap_days > 14 {
        vec![badge_id::LONG_TIME_NO_SEE_2_WEEKS]
    } else {
        Vec::new()
    })
}

async fn lucky_you_guys(
    store: &dyn ArrivalStore,
    record: &ArrivalRecord,
) -> Result<Vec<i64>, DomainError> {
    let minute_start = scoring::minute_start(record.arrived_at);
    let position = store
        .count_same_minute_arrivals(record, minute_start)
        .await?;
    Ok(match position {
        2 => vec![badge_id::LUCKY_PAIR],
        3 => vec![badge_id::LUCKY_TRIO],
        4 => vec![badge_id::LUCKY_QUARTET],
        _ => Vec::new(),
    })
}

/// The instant a gated rule came into force, or `None` while the arrival
/// predates the gate. Ungated rules open at the epoch.
fn rule_open_since(
    catalog: &BadgeCatalog,
    badge_type: i64,
    record: &ArrivalRecord,
) -> Option<DateTime<Utc>> {
    let opened = catalog
        .badge_type(badge_type)
        .and_then(|t| t.apply_start)
        .unwrap_or(DateTime::UNIX_EPOCH);
    (record.arrived_at >= opened).then_some(opened)
}

async fn start_dash(
    store: &dyn ArrivalStore,
    catalog: &BadgeCatalog,
    record: &ArrivalRecord,
) -> Result<Vec<i64>, DomainError> {
    let Some(opened) = rule_open_since(catalog, badge_type_id::START_DASH, record) else {
        return Ok(Vec::new());
    };

    // The anchor is the first arrival since the rule opened, so users who
    // predate the rule still get their two weeks.
    let first = store
        .earliest_user_arrival_between(&record.user_id, opened, record.arrived_at)
        .await?;
    let Some(first) = first else {
        return Ok(Vec::new());
    };

    Ok(
        if record.arrived_at - first.arrived_at <= Duration::days(START_DASH_WINDOW_DAYS) {
            vec![badge_id::START_DASH]
        } else {
            Vec::new()
        },
    )
}

fn specific_time(catalog: &BadgeCatalog, record: &ArrivalRecord, offset: FixedOffset) -> Vec<i64> {
    if rule_open_since(catalog, badge_type_id::SPECIFIC_TIME, record).is_none() {
        return Vec::new();
    }

    let time = scoring::local_time(record.arrived_at, offset);
    let (hour, minute) = (time.hour(), time.minute());
    // Exact readings outrank the digit patterns they also satisfy.
    match (hour, minute) {
        (11, 11) => vec![badge_id::SPECIFIC_TIME_1111],
        (11, 22) => vec![badge_id::SPECIFIC_TIME_1122],
        (11, 29) => vec![badge_id::SPECIFIC_TIME_1129],
        (9, 10) => vec![badge_id::SPECIFIC_TIME_0910],
        (12, 34) => vec![badge_id::SPECIFIC_TIME_1234],
        _ if hour == minute => vec![badge_id::SPECIFIC_TIME_MATCHING],
        _ if hour.abs_diff(minute) == 1 => vec![badge_id::SPECIFIC_TIME_ADJACENT],
        _ => Vec::new(),
    }
}

/// Whether a local calendar day counts as a business day: Monday through
/// Friday, minus the New Year closure (Dec 31 and Jan 1 through Jan 3).
#[must_use]
pub fn is_business_day(day: NaiveDate) -> bool {
    if matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
        return false;
    }
    !matches!((day.month(), day.day()), (1, 1..=3) | (12, 31))
}

/// The `n` most recent business days ending at `last` inclusive, oldest
/// first. Empty when `last` itself is not a business day.
#[must_use]
pub fn recent_business_days(last: NaiveDate, n: usize) -> Vec<NaiveDate> {
    if !is_business_day(last) {
        return Vec::new();
    }
    let mut days = Vec::with_capacity(n);
    let mut cursor = last;
    for _ in 0..=BUSINESS_DAY_SCAN_WINDOW {
        if is_business_day(cursor) {
            days.push(cursor);
            if days.len() == n {
                break;
            }
        }
        cursor -= Duration::days(1);
    }
    days.reverse();
    days
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_weekends_and_new_year_closure_are_not_business_days() {
        assert!(is_business_day(day(2026, 1, 15))); // Thursday
        assert!(!is_business_day(day(2026, 1, 17))); // Saturday
        assert!(!is_business_day(day(2026, 1, 18))); // Sunday
        assert!(!is_business_day(day(2026, 1, 1)));
        assert!(!is_business_day(day(2026, 1, 2)));
        assert!(!is_business_day(day(2027, 1, 1))); // Friday, still closed
        assert!(!is_business_day(day(2026, 12, 31)));
        assert!(is_business_day(day(2026, 12, 30)));
    }

    #[test]
    fn test_recent_business_days_skip_the_weekend() {
        // Monday the 19th looks back across the weekend.
        let days = recent_business_days(day(2026, 1, 19), 5);

        assert_eq!(
            days,
            vec![
                day(2026, 1, 13),
                day(2026, 1, 14),
                day(2026, 1, 15),
                day(2026, 1, 16),
                day(2026, 1, 19),
            ]
        );
    }

    #[test]
    fn test_recent_business_days_require_a_business_day_anchor() {
        assert!(recent_business_days(day(2026, 1, 17), 5).is_empty());
    }
}
