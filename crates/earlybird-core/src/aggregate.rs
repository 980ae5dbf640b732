//! User aggregate advancement.

use chrono::{DateTime, Utc};
use earlybird_level as level;

use crate::model::UserAggregate;

/// Folds an accepted arrival's total score into the user's aggregate.
///
/// `previous_score` becomes the old `current_score` (0 for a first-ever
/// arrival). Level fields are recomputed from the new cumulative score.
/// The band-relative columns saturate to `None` once the user sits at the
/// final level — the level engine fails there and the failure is absorbed
/// here so it can never abort a registration transaction.
#[must_use]
pub fn advance(
    prev: Option<&UserAggregate>,
    user_id: &str,
    total_score: i64,
    at: DateTime<Utc>,
) -> UserAggregate {
    let previous_score = prev.map_or(0, |user| user.current_score);
    let current_score = previous_score + total_score;

    UserAggregate {
        user_id: user_id.to_owned(),
        current_score,
        previous_score,
        level: level::level_for(current_score),
        level_name: level::level_name(current_score).to_owned(),
        level_uped: level::did_cross(previous_score, current_score),
        points_to_next_level: level::points_to_next(current_score),
        point_range_to_next_level: level::range_to_next(current_score).ok(),
        current_level_point: level::current_level_point(current_score).ok(),
        updated_at: at,
    }
}
