//! Earlybird Level — the pure level curve.
//!
//! Maps a cumulative check-in score to a level tier and name. The curve is
//! a fixed ascending table of cumulative thresholds; beyond the final
//! threshold a user saturates at the last level forever.
//!
//! Boundary behavior is deliberately asymmetric: [`points_to_next`]
//! saturates to `0` at the final level, while [`range_to_next`] and
//! [`current_level_point`] fail with [`LevelError::PointOutOfRange`] there.
//! Callers that persist band-relative values must handle the error
//! themselves.

use thiserror::Error;

/// One rung of the level curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelStep {
    /// Level number, starting at 1.
    pub level: i64,
    /// Cumulative score at which this level ends (exclusive).
    pub threshold: i64,
    /// Display name for the level.
    pub name: &'static str,
}

/// The fixed ascending level curve. Thresholds are strictly increasing
/// cumulative scores; a score below `threshold` belongs to that step.
pub static LEVEL_CURVE: [LevelStep; 12] = [
    LevelStep { level: 1, threshold: 20, name: "Fledgling Employee" },
    LevelStep { level: 2, threshold: 42, name: "Apprentice Employee" },
    LevelStep { level: 3, threshold: 71, name: "Developing Employee" },
    LevelStep { level: 4, threshold: 111, name: "Promising Employee" },
    LevelStep { level: 5, threshold: 167, name: "Confident Employee" },
    LevelStep { level: 6, threshold: 244, name: "Full-Fledged Employee" },
    LevelStep { level: 7, threshold: 346, name: "Seasoned Employee" },
    LevelStep { level: 8, threshold: 478, name: "Expert Employee" },
    LevelStep { level: 9, threshold: 644, name: "Master Employee" },
    LevelStep { level: 10, threshold: 849, name: "Elite Employee" },
    LevelStep { level: 11, threshold: 1098, name: "Invincible Employee" },
    LevelStep { level: 12, threshold: 1400, name: "Legendary Employee" },
];

/// Errors from band-relative level queries.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LevelError {
    /// The score is at or above the final threshold; no band exists there.
    #[error("score {0} is at or above the final level threshold")]
    PointOutOfRange(i64),
}

/// Returns the step containing `score` together with the floor of its band
/// (the previous threshold, or 0 for the first step). `None` once the
/// score is at or above the final threshold.
fn current_step(score: i64) -> Option<(i64, &'static LevelStep)> {
    let mut floor = 0;
    for step in &LEVEL_CURVE {
        if score < step.threshold {
            return Some((floor, step));
        }
        floor = step.threshold;
    }
    None
}

fn final_step() -> &'static LevelStep {
    &LEVEL_CURVE[LEVEL_CURVE.len() - 1]
}

/// The level for a cumulative score: the smallest level whose threshold
/// exceeds the score, saturating at the final level.
#[must_use]
pub fn level_for(score: i64) -> i64 {
    current_step(score).map_or_else(|| final_step().level, |(_, step)| step.level)
}

/// The level name for a cumulative score (saturates at the final level).
#[must_use]
pub fn level_name(score: i64) -> &'static str {
    current_step(score).map_or_else(|| final_step().name, |(_, step)| step.name)
}

/// True iff some threshold `T` satisfies `prev < T <= curr` — whether a
/// level boundary was crossed, not how many.
#[must_use]
pub fn did_cross(prev: i64, curr: i64) -> bool {
    LEVEL_CURVE
        .iter()
        .any(|step| prev < step.threshold && step.threshold <= curr)
}

/// Points remaining until the next threshold; `0` at or above the final
/// threshold (saturates, never fails).
#[must_use]
pub fn points_to_next(score: i64) -> i64 {
    current_step(score).map_or(0, |(_, step)| step.threshold - score)
}

/// Width of the band the score currently sits in.
///
/// # Errors
///
/// Returns [`LevelError::PointOutOfRange`] at or above the final threshold.
pub fn range_to_next(score: i64) -> Result<i64, LevelError> {
    current_step(score)
        .map(|(floor, step)| step.threshold - floor)
        .ok_or(LevelError::PointOutOfRange(score))
}

/// Position of the score within its current band.
///
/// # Errors
///
/// Returns [`LevelError::PointOutOfRange`] at or above the final threshold.
pub fn current_level_point(score: i64) -> Result<i64, LevelError> {
    current_step(score)
        .map(|(floor, _)| score - floor)
        .ok_or(LevelError::PointOutOfRange(score))
}
