use serde::{Deserialize, Serialize};

use crate::core::candidate::Candidate;
use crate::core::types::Strand;

/// A reference window similar enough to a guide to risk cleavage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffTargetHit {
    /// Index of the reference sequence in the corpus
    pub sequence_index: usize,

    /// Name of the reference sequence
    pub sequence_name: String,

    /// Leftmost forward-strand coordinate of the matching window
    pub position: usize,

    pub strand: Strand,

    pub mismatches: usize,

    /// Mismatch offsets counted from the PAM-proximal end of the guide, ascending
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mismatch_offsets: Vec<usize>,
}

impl OffTargetHit {
    /// Offset of the mismatch closest to the PAM (the seed region), if any
    #[must_use]
    pub fn nearest_mismatch_to_pam(&self) -> Option<usize> {
        self.mismatch_offsets.first().copied()
    }

    /// Contribution to the off-target penalty; fewer mismatches weigh more
    #[must_use]
    pub fn penalty(&self) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        {
            1.0 / (1.0 + self.mismatches as f64)
        }
    }
}

/// How an off-target search ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    /// Every window was examined
    #[default]
    Complete,
    /// The hit cap was reached; more hits may exist
    Truncated,
    /// The per-candidate deadline passed before the search finished
    TimedOut,
    /// The shared cancellation flag was raised
    Cancelled,
    /// No reference corpus was supplied
    NotSearched,
}

impl SearchStatus {
    /// Whether the reported hits are known to be exhaustive
    #[must_use]
    pub fn is_exhaustive(self) -> bool {
        matches!(self, Self::Complete)
    }
}

impl std::fmt::Display for SearchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Complete => "complete",
            Self::Truncated => "truncated",
            Self::TimedOut => "timed_out",
            Self::Cancelled => "cancelled",
            Self::NotSearched => "not_searched",
        };
        write!(f, "{s}")
    }
}

/// Result of one off-target search
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OffTargetResult {
    /// Hits sorted by (sequence index, position, strand)
    pub hits: Vec<OffTargetHit>,
    pub status: SearchStatus,
}

impl OffTargetResult {
    #[must_use]
    pub fn not_searched() -> Self {
        Self {
            hits: Vec::new(),
            status: SearchStatus::NotSearched,
        }
    }

    /// Sum of per-hit penalties
    #[must_use]
    pub fn penalty(&self) -> f64 {
        self.hits.iter().map(OffTargetHit::penalty).sum()
    }

    /// Riskiest hit: fewest mismatches, then the one whose mismatches sit furthest from the PAM
    #[must_use]
    pub fn worst_hit(&self) -> Option<&OffTargetHit> {
        self.hits.iter().min_by(|a, b| {
            a.mismatches.cmp(&b.mismatches).then_with(|| {
                b.nearest_mismatch_to_pam()
                    .unwrap_or(usize::MAX)
                    .cmp(&a.nearest_mismatch_to_pam().unwrap_or(usize::MAX))
            })
        })
    }

    /// Hit counts indexed by mismatch count
    #[must_use]
    pub fn mismatch_histogram(&self, max_mismatches: usize) -> Vec<usize> {
        let mut histogram = vec![0; max_mismatches + 1];
        for hit in &self.hits {
            if let Some(slot) = histogram.get_mut(hit.mismatches) {
                *slot += 1;
            }
        }
        histogram
    }
}

/// Scores derived for a single candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    /// Predicted on-target efficiency in [0, 1]
    pub on_target: f64,

    /// GC component of the on-target score
    pub gc_score: f64,

    /// Homopolymer component of the on-target score
    pub homopolymer_score: f64,

    /// Position-specific component of the on-target score
    pub position_score: f64,

    /// Fraction of G/C in the protospacer
    pub gc_fraction: f64,

    /// Longest single-base run in the protospacer
    pub longest_homopolymer: usize,

    /// Off-target search outcome
    pub off_target: OffTargetResult,

    /// Sum of per-hit penalties (>= 0)
    pub off_target_penalty: f64,

    /// `1 / (1 + off_target_penalty)`
    pub specificity: f64,

    /// Weighted combination used for ranking
    pub composite: f64,
}

/// A candidate and its scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub score: ScoreResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(position: usize, mismatches: usize, offsets: Vec<usize>) -> OffTargetHit {
        OffTargetHit {
            sequence_index: 0,
            sequence_name: "chr1".to_string(),
            position,
            strand: Strand::Forward,
            mismatches,
            mismatch_offsets: offsets,
        }
    }

    #[test]
    fn test_penalty_weights_fewer_mismatches_more() {
        assert!(hit(0, 0, vec![]).penalty() > hit(0, 1, vec![3]).penalty());
        assert!(hit(0, 1, vec![3]).penalty() > hit(0, 3, vec![1, 2, 3]).penalty());
        assert!(hit(0, 4, vec![0, 1, 2, 3]).penalty() > 0.0);
    }

    #[test]
    fn test_worst_hit() {
        let result = OffTargetResult {
            hits: vec![
                hit(10, 2, vec![1, 5]),
                hit(20, 1, vec![2]),
                hit(30, 1, vec![15]),
            ],
            status: SearchStatus::Complete,
        };
        let worst = result.worst_hit().unwrap();
        assert_eq!(worst.position, 30);
    }

    #[test]
    fn test_mismatch_histogram() {
        let result = OffTargetResult {
            hits: vec![hit(1, 0, vec![]), hit(2, 2, vec![1, 2]), hit(3, 2, vec![4, 5])],
            status: SearchStatus::Complete,
        };
        assert_eq!(result.mismatch_histogram(3), vec![1, 0, 2, 0]);
    }

    #[test]
    fn test_status_exhaustive() {
        assert!(SearchStatus::Complete.is_exhaustive());
        assert!(!SearchStatus::Truncated.is_exhaustive());
        assert!(!SearchStatus::TimedOut.is_exhaustive());
    }
}
