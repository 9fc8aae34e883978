use serde::{Deserialize, Serialize};
use std::fmt;

/// One scoring contribution. Penalty weights are negative, bonuses
/// positive; `count` is how many findings shared the category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub category: String,
    pub weight: i32,
    pub count: u32,
}

impl ScoreEntry {
    pub fn total(&self) -> i64 {
        self.weight as i64 * self.count as i64
    }
}

/// A 0-100 quality score built from a base of 100 plus signed entries.
/// The sum is commutative, so the final value is independent of the order
/// in which findings were discovered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct QualityScore {
    pub penalties: Vec<ScoreEntry>,
    pub bonuses: Vec<ScoreEntry>,
}

impl QualityScore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `count` findings of `category`, each weighted `weight`.
    /// Negative weights land in the penalty list, positive in the bonus
    /// list; zero-weight or zero-count entries are dropped.
    pub fn record(&mut self, category: &str, weight: i32, count: u32) {
        if weight == 0 || count == 0 {
            return;
        }
        let entry = ScoreEntry {
            category: category.to_string(),
            weight,
            count,
        };
        if weight < 0 {
            self.penalties.push(entry);
        } else {
            self.bonuses.push(entry);
        }
    }

    pub fn value(&self) -> u8 {
        let sum: i64 = 100
            + self.penalties.iter().map(ScoreEntry::total).sum::<i64>()
            + self.bonuses.iter().map(ScoreEntry::total).sum::<i64>();
        sum.clamp(0, 100) as u8
    }

    pub fn level(&self, bands: &ScoreBands) -> ScoreLevel {
        bands.classify(self.value())
    }
}

/// Ordered band edges classifying a score into a level. Edges are
/// analyzer-configurable; the shape is fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreBands {
    pub critical_below: u8,
    pub sufficient_below: u8,
    pub good_below: u8,
}

impl Default for ScoreBands {
    fn default() -> Self {
        Self {
            critical_below: 40,
            sufficient_below: 60,
            good_below: 80,
        }
    }
}

impl ScoreBands {
    pub fn classify(&self, value: u8) -> ScoreLevel {
        if value < self.critical_below {
            ScoreLevel::Critical
        } else if value < self.sufficient_below {
            ScoreLevel::Sufficient
        } else if value < self.good_below {
            ScoreLevel::Good
        } else {
            ScoreLevel::Excellent
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreLevel {
    Critical,
    Sufficient,
    Good,
    Excellent,
}

impl fmt::Display for ScoreLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreLevel::Critical => write!(f, "critical"),
            ScoreLevel::Sufficient => write!(f, "sufficient"),
            ScoreLevel::Good => write!(f, "good"),
            ScoreLevel::Excellent => write!(f, "excellent"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_score_is_100() {
        let score = QualityScore::new();
        assert_eq!(score.value(), 100);
        assert_eq!(score.level(&ScoreBands::default()), ScoreLevel::Excellent);
    }

    #[test]
    fn test_penalties_reduce_monotonically() {
        let mut score = QualityScore::new();
        let mut last = score.value();
        for _ in 0..5 {
            score.record("field_injection", -8, 1);
            let current = score.value();
            assert!(current <= last);
            last = current;
        }
        assert_eq!(score.value(), 60);
    }

    #[test]
    fn test_score_clamped_to_zero() {
        let mut score = QualityScore::new();
        score.record("di_cycle", -15, 20);
        assert_eq!(score.value(), 0);
    }

    #[test]
    fn test_bonuses_clamped_to_100() {
        let mut score = QualityScore::new();
        score.record("constructor_injection", 5, 10);
        assert_eq!(score.value(), 100);
    }

    #[test]
    fn test_order_independence() {
        let mut a = QualityScore::new();
        a.record("x", -10, 1);
        a.record("y", 3, 2);
        let mut b = QualityScore::new();
        b.record("y", 3, 2);
        b.record("x", -10, 1);
        assert_eq!(a.value(), b.value());
    }

    #[test]
    fn test_zero_entries_dropped() {
        let mut score = QualityScore::new();
        score.record("noop", 0, 5);
        score.record("none", -8, 0);
        assert!(score.penalties.is_empty());
        assert!(score.bonuses.is_empty());
    }

    #[test]
    fn test_band_edges() {
        let bands = ScoreBands::default();
        assert_eq!(bands.classify(0), ScoreLevel::Critical);
        assert_eq!(bands.classify(39), ScoreLevel::Critical);
        assert_eq!(bands.classify(40), ScoreLevel::Sufficient);
        assert_eq!(bands.classify(59), ScoreLevel::Sufficient);
        assert_eq!(bands.classify(60), ScoreLevel::Good);
        assert_eq!(bands.classify(79), ScoreLevel::Good);
        assert_eq!(bands.classify(80), ScoreLevel::Excellent);
        assert_eq!(bands.classify(100), ScoreLevel::Excellent);
    }
}
