use serde::{Deserialize, Serialize};

/// Points spanning the first level; thresholds grow with the square of the level.
pub const POINTS_PER_LEVEL_UNIT: u64 = 100;

/// Level reached with `points`: `floor(sqrt(points / 100)) + 1`.
pub fn level_for_points(points: u64) -> u64 {
    integer_sqrt(points / POINTS_PER_LEVEL_UNIT) + 1
}

/// Points at which `level_for_points` first returns `level + 1`.
pub fn points_required_for_level(level: u64) -> u64 {
    level
        .saturating_mul(level)
        .saturating_mul(POINTS_PER_LEVEL_UNIT)
}

/// Percentage of the way from the current level's floor to the next threshold.
///
/// Always within `[0, 100]`, even when `points` and `level` disagree.
pub fn progress_to_next_level(points: u64, level: u64) -> f64 {
    let floor = points_required_for_level(level.saturating_sub(1));
    let next = points_required_for_level(level);
    if next <= floor {
        return 100.0;
    }

    let earned = points.saturating_sub(floor) as f64;
    let span = (next - floor) as f64;
    (earned / span * 100.0).clamp(0.0, 100.0)
}

// floor(sqrt(floor(x))) == floor(sqrt(x)), so integer division before the root is exact.
fn integer_sqrt(value: u64) -> u64 {
    if value < 2 {
        return value;
    }

    let mut root = (value as f64).sqrt() as u64;
    while root.checked_mul(root).map_or(true, |square| square > value) {
        root -= 1;
    }
    while (root + 1)
        .checked_mul(root + 1)
        .map_or(false, |square| square <= value)
    {
        root += 1;
    }
    root
}

/// Cumulative points with the level derived from them.
///
/// There is no way to build a standing with a level that disagrees with its points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PointsStanding {
    points: u64,
    level: u64,
}

impl PointsStanding {
    pub fn from_points(points: u64) -> Self {
        Self {
            points,
            level: level_for_points(points),
        }
    }

    pub fn points(&self) -> u64 {
        self.points
    }

    pub fn level(&self) -> u64 {
        self.level
    }

    /// Standing after earning `amount` more points.
    pub fn credit(&self, amount: u64) -> Self {
        Self::from_points(self.points.saturating_add(amount))
    }

    pub fn points_for_next_level(&self) -> u64 {
        points_required_for_level(self.level)
    }

    pub fn progress(&self) -> f64 {
        progress_to_next_level(self.points, self.level)
    }
}

impl Default for PointsStanding {
    fn default() -> Self {
        Self::from_points(0)
    }
}

impl<'de> Deserialize<'de> for PointsStanding {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            points: u64,
        }

        let raw = Raw::deserialize(deserializer)?;
        Ok(Self::from_points(raw.points))
    }
}
