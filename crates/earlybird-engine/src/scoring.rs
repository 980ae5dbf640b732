//! Arrival scoring: time-of-day windows, the first-arrival bonus, and the
//! local-day arithmetic shared by the registrar and the badge rules.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Timelike, Utc};

/// Bonus granted to the day's first scored arrival.
pub const FIRST_ARRIVAL_BONUS: i64 = 2;

/// Points for the local time-of-day window:
/// `[06:00, 09:00) → 3`, `[09:00, 11:00) → 2`, `[11:00, 18:00) → 1`,
/// everything else `0`.
#[must_use]
pub fn time_score(local_time: NaiveTime) -> i64 {
    match local_time.hour() {
        6..=8 => 3,
        9 | 10 => 2,
        11..=17 => 1,
        _ => 0,
    }
}

/// The rank bonus this arrival would earn if it takes rank 1. The earliest
/// arriver only gets the bonus when the slot itself is scored.
#[must_use]
pub fn first_rank_bonus(time_score: i64) -> i64 {
    if time_score == 0 { 0 } else { FIRST_ARRIVAL_BONUS }
}

/// The local calendar day a timestamp falls on.
#[must_use]
pub fn local_day(at: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    at.with_timezone(&offset).date_naive()
}

/// The local wall-clock time of a timestamp.
#[must_use]
pub fn local_time(at: DateTime<Utc>, offset: FixedOffset) -> NaiveTime {
    at.with_timezone(&offset).time()
}

/// UTC half-open bounds `[start, end)` of one local calendar day.
#[must_use]
pub fn day_bounds(day: NaiveDate, offset: FixedOffset) -> (DateTime<Utc>, DateTime<Utc>) {
    let start_naive_utc =
        day.and_time(NaiveTime::MIN) - Duration::seconds(i64::from(offset.local_minus_utc()));
    let start = DateTime::<Utc>::from_naive_utc_and_offset(start_naive_utc, Utc);
    (start, start + Duration::days(1))
}

/// The timestamp truncated to the start of its minute.
#[must_use]
pub fn minute_start(at: DateTime<Utc>) -> DateTime<Utc> {
    at - Duration::seconds(i64::from(at.second())) - Duration::nanoseconds(i64::from(at.nanosecond()))
}
