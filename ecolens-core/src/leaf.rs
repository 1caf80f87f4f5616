//! Leaf-color classification of enrichment scores
//!
//! A four-tier visual rating derived from the average of the three scores.
//! Pure and total: identical input always yields identical output, and every
//! average lands in exactly one tier.

use crate::EcoScores;

/// Four-tier visual classification of a destination's eco scores
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafColor {
    Good,
    OneLeaf,
    NoLeaf,
    Bad,
}

impl LeafColor {
    /// Classify the average of the three scores. Boundaries are inclusive on
    /// the higher tier: an average of exactly 60 is `OneLeaf`, not `NoLeaf`.
    pub fn from_scores(scores: &EcoScores) -> Self {
        let average =
            (scores.energy_sources + scores.air_quality + scores.water_quality) / 3.0;

        if average >= 80.0 {
            LeafColor::Good
        } else if average >= 60.0 {
            LeafColor::OneLeaf
        } else if average >= 40.0 {
            LeafColor::NoLeaf
        } else {
            LeafColor::Bad
        }
    }

    /// The style class applied to the overlay container for this tier
    pub fn as_class(&self) -> &'static str {
        match self {
            LeafColor::Good => "good",
            LeafColor::OneLeaf => "one-leaf",
            LeafColor::NoLeaf => "no-leaf",
            LeafColor::Bad => "bad",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(e: f64, a: f64, w: f64) -> EcoScores {
        EcoScores {
            energy_sources: e,
            air_quality: a,
            water_quality: w,
        }
    }

    #[test]
    fn test_tiers() {
        assert_eq!(LeafColor::from_scores(&scores(90.0, 85.0, 95.0)), LeafColor::Good);
        assert_eq!(LeafColor::from_scores(&scores(70.0, 60.0, 65.0)), LeafColor::OneLeaf);
        assert_eq!(LeafColor::from_scores(&scores(45.0, 40.0, 50.0)), LeafColor::NoLeaf);
        assert_eq!(LeafColor::from_scores(&scores(10.0, 20.0, 30.0)), LeafColor::Bad);
    }

    #[test]
    fn test_boundaries_inclusive_on_higher_tier() {
        assert_eq!(LeafColor::from_scores(&scores(80.0, 80.0, 80.0)), LeafColor::Good);
        assert_eq!(LeafColor::from_scores(&scores(60.0, 60.0, 60.0)), LeafColor::OneLeaf);
        assert_eq!(LeafColor::from_scores(&scores(40.0, 40.0, 40.0)), LeafColor::NoLeaf);
        assert_eq!(
            LeafColor::from_scores(&scores(39.9, 39.9, 39.9)),
            LeafColor::Bad
        );
    }

    #[test]
    fn test_deterministic() {
        let s = scores(61.0, 59.0, 60.0);
        assert_eq!(LeafColor::from_scores(&s), LeafColor::from_scores(&s));
    }
}
