//! Composite scoring and deterministic ordering of scored candidates.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::core::score::ScoredCandidate;
use crate::design::on_target::ScoringError;

/// Relative weights of on-target efficiency and off-target specificity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankWeights {
    pub on_target: f64,
    pub specificity: f64,
}

impl Default for RankWeights {
    fn default() -> Self {
        Self {
            on_target: 0.6,   // 60%
            specificity: 0.4, // 40%
        }
    }
}

impl RankWeights {
    /// Normalize weights to sum to 1.0
    #[must_use]
    pub fn normalized(&self) -> Self {
        let total = self.on_target + self.specificity;

        if total <= 0.0 {
            return Self::default();
        }

        Self {
            on_target: self.on_target / total,
            specificity: self.specificity / total,
        }
    }

    /// Specificity must carry weight, or off-target hits would not affect the ranking.
    ///
    /// # Errors
    ///
    /// Returns `ScoringError::InvalidConfig` for a non-finite or negative
    /// weight, or a specificity weight of zero.
    pub fn validate(&self) -> Result<(), ScoringError> {
        if !self.on_target.is_finite() || !self.specificity.is_finite() {
            return Err(ScoringError::InvalidConfig(
                "Rank weights must be finite".to_string(),
            ));
        }
        if self.on_target < 0.0 {
            return Err(ScoringError::InvalidConfig(
                "On-target rank weight must not be negative".to_string(),
            ));
        }
        if self.specificity <= 0.0 {
            return Err(ScoringError::InvalidConfig(
                "Specificity rank weight must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// `1 / (1 + penalty)`: 1.0 with no off-targets, strictly lower with any
#[must_use]
pub fn specificity(off_target_penalty: f64) -> f64 {
    1.0 / (1.0 + off_target_penalty.max(0.0))
}

/// Weighted combination of on-target score and specificity
#[must_use]
pub fn composite_score(on_target: f64, off_target_penalty: f64, weights: &RankWeights) -> f64 {
    let w = weights.normalized();
    w.on_target * on_target + w.specificity * specificity(off_target_penalty)
}

/// Total order used for ranking: best composite first, then leftmost,
/// forward strand, earlier target, and finally the protospacer bases.
#[must_use]
pub fn rank_order(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    b.score
        .composite
        .total_cmp(&a.score.composite)
        .then_with(|| a.candidate.start.cmp(&b.candidate.start))
        .then_with(|| a.candidate.strand.cmp(&b.candidate.strand))
        .then_with(|| a.candidate.target_index.cmp(&b.candidate.target_index))
        .then_with(|| a.candidate.protospacer.cmp(&b.candidate.protospacer))
}

/// Orders scored candidates; stable and deterministic for identical inputs
#[derive(Debug, Clone, Default)]
pub struct Ranker {
    weights: RankWeights,
}

impl Ranker {
    #[must_use]
    pub fn new(weights: RankWeights) -> Self {
        Self { weights }
    }

    #[must_use]
    pub fn weights(&self) -> &RankWeights {
        &self.weights
    }

    /// Recompute composites under this ranker's weights and sort best-first
    #[must_use]
    pub fn rank(&self, mut candidates: Vec<ScoredCandidate>) -> Vec<ScoredCandidate> {
        for scored in &mut candidates {
            scored.score.composite = composite_score(
                scored.score.on_target,
                scored.score.off_target_penalty,
                &self.weights,
            );
        }
        candidates.sort_by(rank_order);
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::candidate::Candidate;
    use crate::core::pam::PamSide;
    use crate::core::score::{OffTargetHit, OffTargetResult, ScoreResult, SearchStatus};
    use crate::core::types::Strand;

    fn scored(start: usize, strand: Strand, on_target: f64, hits: Vec<usize>) -> ScoredCandidate {
        let off_target = OffTargetResult {
            hits: hits
                .into_iter()
                .enumerate()
                .map(|(i, mismatches)| OffTargetHit {
                    sequence_index: 0,
                    sequence_name: "bg".to_string(),
                    position: i * 100,
                    strand: Strand::Forward,
                    mismatches,
                    mismatch_offsets: Vec::new(),
                })
                .collect(),
            status: SearchStatus::Complete,
        };
        let penalty = off_target.penalty();
        ScoredCandidate {
            candidate: Candidate {
                target_index: 0,
                target_name: "t".to_string(),
                start,
                length: 20,
                strand,
                protospacer: "ACGTACGTACGTACGTACGT".to_string(),
                pam: "AGG".to_string(),
                pam_start: start + 20,
                pam_side: PamSide::ThreePrime,
                cut_site: None,
            },
            score: ScoreResult {
                on_target,
                gc_score: 1.0,
                homopolymer_score: 1.0,
                position_score: 0.5,
                gc_fraction: 0.5,
                longest_homopolymer: 1,
                off_target,
                off_target_penalty: penalty,
                specificity: specificity(penalty),
                composite: 0.0,
            },
        }
    }

    #[test]
    fn test_zero_hits_beats_any_hit() {
        let ranker = Ranker::default();
        let ranked = ranker.rank(vec![
            scored(0, Strand::Forward, 0.7, vec![4]),
            scored(50, Strand::Forward, 0.7, vec![]),
        ]);
        assert_eq!(ranked[0].candidate.start, 50);
        assert!(ranked[0].score.composite > ranked[1].score.composite);
    }

    #[test]
    fn test_zero_hits_beats_hit_even_with_zero_on_target() {
        let ranker = Ranker::default();
        let ranked = ranker.rank(vec![
            scored(0, Strand::Forward, 0.0, vec![3]),
            scored(10, Strand::Forward, 0.0, vec![]),
        ]);
        assert_eq!(ranked[0].candidate.start, 10);
    }

    #[test]
    fn test_fewer_mismatches_penalized_more() {
        assert!(composite_score(0.5, 1.0, &RankWeights::default()) < composite_score(0.5, 0.25, &RankWeights::default()));
    }

    #[test]
    fn test_ties_broken_by_position_then_strand() {
        let ranker = Ranker::default();
        let ranked = ranker.rank(vec![
            scored(30, Strand::Forward, 0.5, vec![]),
            scored(10, Strand::Reverse, 0.5, vec![]),
            scored(10, Strand::Forward, 0.5, vec![]),
        ]);
        let order: Vec<_> = ranked
            .iter()
            .map(|s| (s.candidate.start, s.candidate.strand))
            .collect();
        assert_eq!(
            order,
            vec![
                (10, Strand::Forward),
                (10, Strand::Reverse),
                (30, Strand::Forward)
            ]
        );
    }

    #[test]
    fn test_ranking_is_stable() {
        let ranker = Ranker::default();
        let input = vec![
            scored(5, Strand::Reverse, 0.4, vec![2]),
            scored(1, Strand::Forward, 0.9, vec![0, 3]),
            scored(9, Strand::Forward, 0.4, vec![2]),
            scored(2, Strand::Forward, 0.6, vec![]),
        ];
        let first = ranker.rank(input.clone());
        let second = ranker.rank(input.into_iter().rev().collect());
        assert_eq!(first, second);
    }

    #[test]
    fn test_validate_weights() {
        assert!(RankWeights::default().validate().is_ok());
        let specificity_only = RankWeights {
            on_target: 0.0,
            specificity: 1.0,
        };
        assert!(specificity_only.validate().is_ok());

        for (on_target, specificity) in [
            (1.0, 0.0),
            (1.0, -0.5),
            (-0.1, 1.0),
            (f64::NAN, 0.4),
            (0.6, f64::NAN),
            (f64::INFINITY, 0.4),
        ] {
            let weights = RankWeights {
                on_target,
                specificity,
            };
            assert!(
                matches!(weights.validate(), Err(ScoringError::InvalidConfig(_))),
                "{weights:?}"
            );
        }
    }

    #[test]
    fn test_specificity() {
        assert!((specificity(0.0) - 1.0).abs() < 1e-12);
        assert!((specificity(1.0) - 0.5).abs() < 1e-12);
    }
}
