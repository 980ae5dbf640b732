//! Deterministic "round-number" (kiriban) milestone generation.
//!
//! A kiriban is a global check-in ordinal worth celebrating: the 100th
//! check-in overall, the 777th, and so on. The generator is a pure
//! function of its ceiling: identical input always yields an identical
//! ordered sequence of `(badge_id, milestone_count)` pairs, and raising
//! the ceiling only appends, so badge ids stay stable across releases.

/// First badge id of the reserved kiriban band. Badges in this band are
/// scarce: at most one user may ever hold each of them.
pub const KIRIBAN_BADGE_ID_BASE: i64 = 601;

/// Last badge id of the reserved kiriban band.
pub const KIRIBAN_BADGE_ID_MAX: i64 = 699;

/// Default milestone ceiling (inclusive).
pub const DEFAULT_KIRIBAN_CEILING: u32 = 2000;

/// Enumerates round-number milestones up to a ceiling and assigns each a
/// stable badge id from the reserved band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KiribanGenerator {
    ceiling: u32,
}

/// A count is a milestone if it is a multiple of 100, if its trailing
/// three digits repeat a single digit (111, 222, …, 999), or if it is the
/// staircase 1234.
fn is_milestone(count: u32) -> bool {
    if count % 100 == 0 {
        return true;
    }
    if count == 1234 {
        return true;
    }
    let tail = count % 1000;
    tail >= 111 && tail % 111 == 0
}

/// Thousand marks, the 999s, and 1111 carry a premium prestige score.
fn score_for(count: u32) -> i64 {
    if count % 1000 == 0 || count % 1000 == 999 || count == 1111 {
        10
    } else {
        5
    }
}

impl KiribanGenerator {
    /// Creates a generator for milestones up to `ceiling` (inclusive).
    #[must_use]
    pub fn new(ceiling: u32) -> Self {
        Self { ceiling }
    }

    /// The ordered `(badge_id, milestone_count)` sequence. Ids start at
    /// [`KIRIBAN_BADGE_ID_BASE`] and follow ascending milestone order.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn milestones(&self) -> Vec<(i64, u32)> {
        (100..=self.ceiling)
            .filter(|count| is_milestone(*count))
            .enumerate()
            .map(|(index, count)| (KIRIBAN_BADGE_ID_BASE + index as i64, count))
            .collect()
    }

    /// Prestige score for one milestone count.
    #[must_use]
    pub fn score_for(count: u32) -> i64 {
        score_for(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ceiling_reproduces_canonical_table() {
        let milestones = KiribanGenerator::new(DEFAULT_KIRIBAN_CEILING).milestones();

        assert_eq!(milestones.len(), 39);
        assert_eq!(milestones[0], (601, 100));
        assert_eq!(milestones[1], (602, 111));
        assert_eq!(milestones[2], (603, 200));
        assert_eq!(milestones[17], (618, 999));
        assert_eq!(milestones[18], (619, 1000));
        assert_eq!(milestones[20], (621, 1111));
        assert_eq!(milestones[23], (624, 1234));
        assert_eq!(milestones[37], (638, 1999));
        assert_eq!(milestones[38], (639, 2000));
    }

    #[test]
    fn test_generator_is_deterministic() {
        let first = KiribanGenerator::new(10_000).milestones();
        let second = KiribanGenerator::new(10_000).milestones();

        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn test_raising_the_ceiling_only_appends() {
        let small = KiribanGenerator::new(1000).milestones();
        let large = KiribanGenerator::new(2000).milestones();

        assert_eq!(&large[..small.len()], &small[..]);
    }

    #[test]
    fn test_milestone_counts_ascend_and_ids_are_contiguous() {
        let milestones = KiribanGenerator::new(5000).milestones();

        for (index, (id, _)) in milestones.iter().enumerate() {
            assert_eq!(*id, KIRIBAN_BADGE_ID_BASE + index as i64);
        }
        for pair in milestones.windows(2) {
            assert!(pair[0].1 < pair[1].1);
        }
    }

    #[test]
    fn test_premium_scores() {
        assert_eq!(KiribanGenerator::score_for(100), 5);
        assert_eq!(KiribanGenerator::score_for(999), 10);
        assert_eq!(KiribanGenerator::score_for(1000), 10);
        assert_eq!(KiribanGenerator::score_for(1111), 10);
        assert_eq!(KiribanGenerator::score_for(1222), 5);
        assert_eq!(KiribanGenerator::score_for(1999), 10);
        assert_eq!(KiribanGenerator::score_for(2000), 10);
    }
}
