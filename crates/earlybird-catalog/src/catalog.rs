//! The static badge catalog.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};

use earlybird_core::error::DomainError;
use earlybird_core::model::{Badge, BadgeType};

use crate::kiriban::{KIRIBAN_BADGE_ID_BASE, KIRIBAN_BADGE_ID_MAX, KiribanGenerator};

/// Badge type ids, one per evaluation rule.
pub mod badge_type_id {
    /// First-ever check-in.
    pub const WELCOME: i64 = 1;
    /// First check-in of the day.
    pub const FASTEST_ARRIVAL: i64 = 2;
    /// Cumulative check-in counts.
    pub const ARRIVAL_COUNT: i64 = 3;
    /// Consecutive business-day streaks.
    pub const STRAIGHT_FLASH: i64 = 4;
    /// Time-of-day windows.
    pub const TIME_WINDOW: i64 = 5;
    /// Round-number global ordinals.
    pub const KIRIBAN: i64 = 6;
    /// Returning after a long absence.
    pub const LONG_TIME_NO_SEE: i64 = 7;
    /// Several users checking in within the same minute.
    pub const LUCKY_YOU_GUYS: i64 = 8;
    /// Check-ins close to the user's first check-in.
    pub const START_DASH: i64 = 9;
    /// Check-ins at notable clock readings.
    pub const SPECIFIC_TIME: i64 = 10;
}

/// Well-known badge ids referenced by the evaluation rules.
pub mod badge_id {
    /// First-ever check-in.
    pub const WELCOME: i64 = 101;
    /// First check-in of the day.
    pub const FASTEST_ARRIVAL: i64 = 201;
    /// 5 cumulative check-ins.
    pub const ARRIVAL_COUNT_5: i64 = 301;
    /// 20 cumulative check-ins.
    pub const ARRIVAL_COUNT_20: i64 = 302;
    /// 100 cumulative check-ins.
    pub const ARRIVAL_COUNT_100: i64 = 303;
    /// 5 consecutive business days.
    pub const STRAIGHT_FLASH: i64 = 401;
    /// 5 consecutive business days at 5 distinct hours.
    pub const ROYAL_STRAIGHT_FLASH: i64 = 402;
    /// 5 consecutive business days at 5 consecutive hours.
    pub const ULTRA_ROYAL_STRAIGHT_FLASH: i64 = 403;
    /// Check-in within [07:00, 09:00).
    pub const TIME_WINDOW_MORNING: i64 = 501;
    /// Check-in within [09:00, 11:00).
    pub const TIME_WINDOW_STANDARD: i64 = 502;
    /// Check-in within [11:00, 18:00).
    pub const TIME_WINDOW_LATE: i64 = 503;
    /// Check-in within [06:00, 07:00).
    pub const TIME_WINDOW_ULTRA_EARLY: i64 = 504;
    /// Return after more than 14 days away.
    pub const LONG_TIME_NO_SEE_2_WEEKS: i64 = 701;
    /// Return after more than 30 days away.
    pub const LONG_TIME_NO_SEE_1_MONTH: i64 = 702;
    /// Return after more than 61 days away.
    pub const LONG_TIME_NO_SEE_2_MONTHS: i64 = 703;
    /// Return after more than 183 days away.
    pub const LONG_TIME_NO_SEE_HALF_YEAR: i64 = 704;
    /// Second check-in within the same minute.
    pub const LUCKY_PAIR: i64 = 801;
    /// Third check-in within the same minute.
    pub const LUCKY_TRIO: i64 = 802;
    /// Fourth check-in within the same minute.
    pub const LUCKY_QUARTET: i64 = 803;
    /// Check-in within two weeks of the first check-in.
    pub const START_DASH: i64 = 901;
    /// Hour and minute one apart.
    pub const SPECIFIC_TIME_ADJACENT: i64 = 1001;
    /// Hour equal to the minute.
    pub const SPECIFIC_TIME_MATCHING: i64 = 1002;
    /// Check-in at exactly 12:34.
    pub const SPECIFIC_TIME_1234: i64 = 1003;
    /// Check-in at exactly 11:11.
    pub const SPECIFIC_TIME_1111: i64 = 1004;
    /// Check-in at exactly 11:22.
    pub const SPECIFIC_TIME_1122: i64 = 1005;
    /// Check-in at exactly 11:29.
    pub const SPECIFIC_TIME_1129: i64 = 1006;
    /// Check-in at exactly 09:10.
    pub const SPECIFIC_TIME_0910: i64 = 1007;
}

/// Midnight UTC on the day a gated rule came into force. An invalid date
/// yields `None`, which leaves the rule ungated.
fn rule_start(year: i32, month: u32, day: u32) -> Option<DateTime<Utc>> {
    let midnight = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(0, 0, 0)?;
    Some(midnight.and_utc())
}

fn badge_types() -> Vec<BadgeType> {
    fn entry(id: i64, name: &str, description: &str) -> BadgeType {
        BadgeType {
            id,
            name: name.to_owned(),
            description: description.to_owned(),
            apply_start: None,
        }
    }

    fn gated(
        id: i64,
        name: &str,
        description: &str,
        apply_start: Option<DateTime<Utc>>,
    ) -> BadgeType {
        BadgeType {
            apply_start,
            ..entry(id, name, description)
        }
    }

    vec![
        entry(
            badge_type_id::WELCOME,
            "welcome",
            "Used the check-in bot for the first time",
        ),
        entry(
            badge_type_id::FASTEST_ARRIVAL,
            "fastest_arrival",
            "Was the first to check in that day",
        ),
        entry(
            badge_type_id::ARRIVAL_COUNT,
            "arrival_count",
            "Checked in many times",
        ),
        entry(
            badge_type_id::STRAIGHT_FLASH,
            "straight_flash",
            "Checked in on consecutive business days",
        ),
        entry(
            badge_type_id::TIME_WINDOW,
            "time_window",
            "Checked in during a scored time window",
        ),
        entry(
            badge_type_id::KIRIBAN,
            "kiriban",
            "Made a round-number check-in overall",
        ),
        entry(
            badge_type_id::LONG_TIME_NO_SEE,
            "long_time_no_see",
            "Returned after a long stretch without check-ins",
        ),
        entry(
            badge_type_id::LUCKY_YOU_GUYS,
            "lucky_you_guys",
            "Checked in within the same minute as someone else",
        ),
        gated(
            badge_type_id::START_DASH,
            "start_dash",
            "Checked in within two weeks of the first check-in",
            rule_start(2026, 1, 1),
        ),
        gated(
            badge_type_id::SPECIFIC_TIME,
            "specific_time",
            "Checked in at a notable clock reading",
            rule_start(2026, 1, 1),
        ),
    ]
}

#[allow(clippy::too_many_lines)]
fn static_badges() -> Vec<Badge> {
    fn entry(
        id: i64,
        message: &str,
        condition: &str,
        level: i64,
        score: i64,
        badge_type_id: i64,
    ) -> Badge {
        Badge {
            id,
            message: message.to_owned(),
            condition: condition.to_owned(),
            level,
            score,
            badge_type_id,
        }
    }

    vec![
        entry(
            badge_id::WELCOME,
            "First check-in",
            "Used the check-in bot for the first time",
            1,
            2,
            badge_type_id::WELCOME,
        ),
        entry(
            badge_id::FASTEST_ARRIVAL,
            "Speed of light",
            "Was the first to check in that day",
            1,
            2,
            badge_type_id::FASTEST_ARRIVAL,
        ),
        entry(
            badge_id::ARRIVAL_COUNT_5,
            "Check-in beginner",
            "Checked in 5 times",
            1,
            3,
            badge_type_id::ARRIVAL_COUNT,
        ),
        entry(
            badge_id::ARRIVAL_COUNT_20,
            "Check-in regular",
            "Checked in 20 times",
            2,
            5,
            badge_type_id::ARRIVAL_COUNT,
        ),
        entry(
            badge_id::ARRIVAL_COUNT_100,
            "Check-in devotee",
            "Checked in 100 times",
            3,
            10,
            badge_type_id::ARRIVAL_COUNT,
        ),
        entry(
            badge_id::STRAIGHT_FLASH,
            "Straight flush",
            "Checked in on 5 consecutive business days",
            1,
            3,
            badge_type_id::STRAIGHT_FLASH,
        ),
        entry(
            badge_id::ROYAL_STRAIGHT_FLASH,
            "Royal straight flush",
            "Checked in on 5 consecutive business days, each at a different hour",
            2,
            5,
            badge_type_id::STRAIGHT_FLASH,
        ),
        entry(
            badge_id::ULTRA_ROYAL_STRAIGHT_FLASH,
            "Ultra royal straight flush",
            "Checked in on 5 consecutive business days at 5 consecutive hours",
            3,
            8,
            badge_type_id::STRAIGHT_FLASH,
        ),
        entry(
            badge_id::TIME_WINDOW_MORNING,
            "Morning check-in",
            "Checked in between 07:00 and 09:00",
            3,
            3,
            badge_type_id::TIME_WINDOW,
        ),
        entry(
            badge_id::TIME_WINDOW_STANDARD,
            "On-time check-in",
            "Checked in between 09:00 and 11:00",
            2,
            2,
            badge_type_id::TIME_WINDOW,
        ),
        entry(
            badge_id::TIME_WINDOW_LATE,
            "Late check-in",
            "Checked in between 11:00 and 18:00",
            1,
            1,
            badge_type_id::TIME_WINDOW,
        ),
        entry(
            badge_id::TIME_WINDOW_ULTRA_EARLY,
            "Ultra early riser",
            "Checked in during the six o'clock hour",
            4,
            5,
            badge_type_id::TIME_WINDOW,
        ),
        entry(
            badge_id::LONG_TIME_NO_SEE_2_WEEKS,
            "Two weeks! How have you been?",
            "Returned after more than 14 days without a check-in",
            1,
            2,
            badge_type_id::LONG_TIME_NO_SEE,
        ),
        entry(
            badge_id::LONG_TIME_NO_SEE_1_MONTH,
            "A whole month! Welcome back.",
            "Returned after more than 30 days without a check-in",
            2,
            3,
            badge_type_id::LONG_TIME_NO_SEE,
        ),
        entry(
            badge_id::LONG_TIME_NO_SEE_2_MONTHS,
            "Two months! I nearly forgot your face.",
            "Returned after more than two months without a check-in",
            3,
            4,
            badge_type_id::LONG_TIME_NO_SEE,
        ),
        entry(
            badge_id::LONG_TIME_NO_SEE_HALF_YEAR,
            "Half a year! Nice to meet you — again.",
            "Returned after more than half a year without a check-in",
            4,
            6,
            badge_type_id::LONG_TIME_NO_SEE,
        ),
        entry(
            badge_id::LUCKY_PAIR,
            "Lucky pair",
            "Was the second to check in within the same minute",
            1,
            2,
            badge_type_id::LUCKY_YOU_GUYS,
        ),
        entry(
            badge_id::LUCKY_TRIO,
            "Lucky trio",
            "Was the third to check in within the same minute",
            2,
            3,
            badge_type_id::LUCKY_YOU_GUYS,
        ),
        entry(
            badge_id::LUCKY_QUARTET,
            "Lucky quartet",
            "Was the fourth to check in within the same minute",
            3,
            4,
            badge_type_id::LUCKY_YOU_GUYS,
        ),
        entry(
            badge_id::START_DASH,
            "Start dash",
            "Checked in within two weeks of the first check-in",
            1,
            2,
            badge_type_id::START_DASH,
        ),
        entry(
            badge_id::SPECIFIC_TIME_ADJACENT,
            "Side by side",
            "Checked in when the hour and minute were one apart",
            1,
            2,
            badge_type_id::SPECIFIC_TIME,
        ),
        entry(
            badge_id::SPECIFIC_TIME_MATCHING,
            "Matching digits",
            "Checked in when the hour equaled the minute",
            2,
            3,
            badge_type_id::SPECIFIC_TIME,
        ),
        entry(
            badge_id::SPECIFIC_TIME_1234,
            "Up the staircase",
            "Checked in at exactly 12:34",
            3,
            4,
            badge_type_id::SPECIFIC_TIME,
        ),
        entry(
            badge_id::SPECIFIC_TIME_1111,
            "Make a wish",
            "Checked in at exactly 11:11",
            4,
            5,
            badge_type_id::SPECIFIC_TIME,
        ),
        entry(
            badge_id::SPECIFIC_TIME_1122,
            "Double doubles",
            "Checked in at exactly 11:22",
            4,
            5,
            badge_type_id::SPECIFIC_TIME,
        ),
        entry(
            badge_id::SPECIFIC_TIME_1129,
            "Barbecue night",
            "Checked in at exactly 11:29",
            4,
            5,
            badge_type_id::SPECIFIC_TIME,
        ),
        entry(
            badge_id::SPECIFIC_TIME_0910,
            "Right on the dot",
            "Checked in at exactly 09:10",
            4,
            5,
            badge_type_id::SPECIFIC_TIME,
        ),
    ]
}

/// The immutable badge catalog: static badge types and badges plus the
/// generated kiriban milestones. Constructed once at startup, seeded
/// idempotently into storage, and passed by reference afterwards.
#[derive(Debug, Clone)]
pub struct BadgeCatalog {
    types: Vec<BadgeType>,
    badges: Vec<Badge>,
    badge_index: HashMap<i64, usize>,
    kiriban: Vec<(i64, u32)>,
}

impl BadgeCatalog {
    /// Assembles the standard catalog with kiriban milestones up to
    /// `kiriban_ceiling`.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidCatalog`] if the generated kiriban ids
    /// would overflow the reserved band or collide with a static badge id.
    pub fn standard(kiriban_ceiling: u32) -> Result<Self, DomainError> {
        let kiriban = KiribanGenerator::new(kiriban_ceiling).milestones();
        if let Some((last_id, _)) = kiriban.last()
            && *last_id > KIRIBAN_BADGE_ID_MAX
        {
            return Err(DomainError::InvalidCatalog(format!(
                "kiriban ceiling {kiriban_ceiling} produces badge id {last_id}, \
                 beyond the reserved band end {KIRIBAN_BADGE_ID_MAX}"
            )));
        }

        let mut badges = static_badges();
        for (id, count) in &kiriban {
            badges.push(Badge {
                id: *id,
                message: format!("Visitor number {count}"),
                condition: format!("Made check-in number {count} overall"),
                level: 1,
                score: KiribanGenerator::score_for(*count),
                badge_type_id: badge_type_id::KIRIBAN,
            });
        }

        let mut badge_index = HashMap::with_capacity(badges.len());
        for (position, badge) in badges.iter().enumerate() {
            if badge_index.insert(badge.id, position).is_some() {
                return Err(DomainError::InvalidCatalog(format!(
                    "duplicate badge id {}",
                    badge.id
                )));
            }
        }

        Ok(Self {
            types: badge_types(),
            badges,
            badge_index,
            kiriban,
        })
    }

    /// The badge type seed rows.
    #[must_use]
    pub fn types(&self) -> &[BadgeType] {
        &self.types
    }

    /// Looks up a badge type by id.
    #[must_use]
    pub fn badge_type(&self, badge_type_id: i64) -> Option<&BadgeType> {
        self.types
            .iter()
            .find(|badge_type| badge_type.id == badge_type_id)
    }

    /// The badge seed rows, static and kiriban alike.
    #[must_use]
    pub fn badges(&self) -> &[Badge] {
        &self.badges
    }

    /// Looks up a badge by id.
    #[must_use]
    pub fn badge(&self, badge_id: i64) -> Option<&Badge> {
        self.badge_index
            .get(&badge_id)
            .map(|position| &self.badges[*position])
    }

    /// The generated `(badge_id, milestone_count)` pairs.
    #[must_use]
    pub fn kiriban_milestones(&self) -> &[(i64, u32)] {
        &self.kiriban
    }

    /// The kiriban badge for a global check-in ordinal, if the ordinal is
    /// a milestone.
    #[must_use]
    pub fn kiriban_badge_for_ordinal(&self, ordinal: u32) -> Option<i64> {
        self.kiriban
            .iter()
            .find(|(_, count)| *count == ordinal)
            .map(|(id, _)| *id)
    }

    /// Whether a badge id falls in the reserved scarce band.
    #[must_use]
    pub fn is_scarce(&self, badge_id: i64) -> bool {
        (KIRIBAN_BADGE_ID_BASE..=KIRIBAN_BADGE_ID_MAX).contains(&badge_id)
    }
}

#[cfg(test)]
mod tests {
    use crate::DEFAULT_KIRIBAN_CEILING;

    use super::*;

    #[test]
    fn test_standard_catalog_contains_static_and_kiriban_badges() {
        let catalog = BadgeCatalog::standard(DEFAULT_KIRIBAN_CEILING).unwrap();

        assert_eq!(catalog.types().len(), 10);
        assert!(catalog.badge(badge_id::WELCOME).is_some());
        assert!(catalog.badge(601).is_some());
        assert!(catalog.badge(639).is_some());
        assert!(catalog.badge(640).is_none());
        assert_eq!(catalog.kiriban_milestones().len(), 39);
    }

    #[test]
    fn test_gated_types_carry_their_start_instant() {
        let catalog = BadgeCatalog::standard(DEFAULT_KIRIBAN_CEILING).unwrap();

        let start_dash = catalog.badge_type(badge_type_id::START_DASH).unwrap();
        assert!(start_dash.apply_start.is_some());
        assert_eq!(start_dash.apply_start, rule_start(2026, 1, 1));

        let welcome = catalog.badge_type(badge_type_id::WELCOME).unwrap();
        assert!(welcome.apply_start.is_none());
    }

    #[test]
    fn test_kiriban_lookup_by_ordinal() {
        let catalog = BadgeCatalog::standard(DEFAULT_KIRIBAN_CEILING).unwrap();

        assert_eq!(catalog.kiriban_badge_for_ordinal(100), Some(601));
        assert_eq!(catalog.kiriban_badge_for_ordinal(777), Some(614));
        assert_eq!(catalog.kiriban_badge_for_ordinal(101), None);
    }

    #[test]
    fn test_scarce_band_covers_exactly_the_kiriban_ids() {
        let catalog = BadgeCatalog::standard(DEFAULT_KIRIBAN_CEILING).unwrap();

        assert!(catalog.is_scarce(601));
        assert!(catalog.is_scarce(639));
        assert!(!catalog.is_scarce(badge_id::WELCOME));
        assert!(!catalog.is_scarce(badge_id::LONG_TIME_NO_SEE_2_WEEKS));
    }

    #[test]
    fn test_oversized_ceiling_is_rejected() {
        // A ceiling of 10000 would generate far more ids than the band holds.
        let result = BadgeCatalog::standard(10_000);

        assert!(matches!(
            result,
            Err(earlybird_core::error::DomainError::InvalidCatalog(_))
        ));
    }
}
