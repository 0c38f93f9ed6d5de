//! On-target efficiency scoring from sequence composition.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::candidate::Candidate;
use crate::core::sequence::{gc_fraction, longest_homopolymer};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoringError {
    #[error("Candidate at {target}:{start} has length {actual}, expected protospacer length {expected}")]
    LengthMismatch {
        target: String,
        start: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Relative weights of the on-target components
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OnTargetWeights {
    pub gc: f64,
    pub homopolymer: f64,
    pub position: f64,
}

impl Default for OnTargetWeights {
    fn default() -> Self {
        Self {
            gc: 0.35,          // 35%
            homopolymer: 0.25, // 25%
            position: 0.40,    // 40%
        }
    }
}

impl OnTargetWeights {
    /// Normalize weights to sum to 1.0
    #[must_use]
    pub fn normalized(&self) -> Self {
        let total = self.gc + self.homopolymer + self.position;

        if total <= 0.0 {
            return Self::default();
        }

        Self {
            gc: self.gc / total,
            homopolymer: self.homopolymer / total,
            position: self.position / total,
        }
    }
}

/// One cell of the position-specific scoring matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionWeight {
    /// Distance from the PAM-proximal end of the protospacer (0 = adjacent to the PAM)
    pub offset: usize,
    pub base: char,
    pub weight: f64,
}

impl PositionWeight {
    const fn new(offset: usize, base: char, weight: f64) -> Self {
        Self {
            offset,
            base,
            weight,
        }
    }
}

/// Empirical nucleotide preferences for SpCas9 guides, keyed from the PAM-proximal end
fn default_position_weights() -> Vec<PositionWeight> {
    vec![
        // Seed region next to the PAM
        PositionWeight::new(0, 'G', 0.60),
        PositionWeight::new(0, 'C', -0.50),
        PositionWeight::new(0, 'T', -0.40),
        PositionWeight::new(1, 'G', 0.20),
        PositionWeight::new(1, 'T', -0.30),
        PositionWeight::new(2, 'T', -0.30),
        PositionWeight::new(3, 'C', 0.20),
        PositionWeight::new(3, 'T', -0.30),
        PositionWeight::new(4, 'C', -0.40),
        PositionWeight::new(4, 'G', 0.30),
        PositionWeight::new(5, 'A', 0.15),
        PositionWeight::new(7, 'C', 0.15),
        PositionWeight::new(9, 'A', 0.20),
        PositionWeight::new(11, 'G', -0.15),
        PositionWeight::new(13, 'C', 0.10),
        // U6 promoter favours a 5' G
        PositionWeight::new(19, 'G', 0.30),
        PositionWeight::new(19, 'T', -0.20),
    ]
}

/// Settings for the on-target scoring engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: OnTargetWeights,

    /// GC fraction below which the GC component is penalized
    pub gc_min: f64,

    /// GC fraction above which the GC component is penalized
    pub gc_max: f64,

    /// Distance outside the GC window at which the GC component reaches 0
    pub gc_falloff: f64,

    /// Runs at least this long are penalized
    pub homopolymer_threshold: usize,

    /// Penalty per base of run length at or beyond the threshold
    pub homopolymer_step: f64,

    pub position_weights: Vec<PositionWeight>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: OnTargetWeights::default(),
            gc_min: 0.40,
            gc_max: 0.60,
            gc_falloff: 0.20,
            homopolymer_threshold: 4,
            homopolymer_step: 0.25,
            position_weights: default_position_weights(),
        }
    }
}

impl ScoringConfig {
    /// Check that the configuration can produce scores in [0, 1].
    ///
    /// # Errors
    ///
    /// Returns `ScoringError::InvalidConfig` describing the first problem found.
    pub fn validate(&self) -> Result<(), ScoringError> {
        if !(0.0..=1.0).contains(&self.gc_min) || !(0.0..=1.0).contains(&self.gc_max) {
            return Err(ScoringError::InvalidConfig(format!(
                "GC window [{}, {}] must lie within [0, 1]",
                self.gc_min, self.gc_max
            )));
        }
        if self.gc_min > self.gc_max {
            return Err(ScoringError::InvalidConfig(format!(
                "GC window minimum {} exceeds maximum {}",
                self.gc_min, self.gc_max
            )));
        }
        if self.gc_falloff <= 0.0 {
            return Err(ScoringError::InvalidConfig(
                "GC falloff must be positive".to_string(),
            ));
        }
        if self.homopolymer_threshold < 2 {
            return Err(ScoringError::InvalidConfig(
                "Homopolymer threshold must be at least 2".to_string(),
            ));
        }
        let w = &self.weights;
        if w.gc < 0.0 || w.homopolymer < 0.0 || w.position < 0.0 {
            return Err(ScoringError::InvalidConfig(
                "On-target weights must be non-negative".to_string(),
            ));
        }
        if w.gc + w.homopolymer + w.position <= 0.0 {
            return Err(ScoringError::InvalidConfig(
                "On-target weights must not all be zero".to_string(),
            ));
        }
        if let Some(bad) = self
            .position_weights
            .iter()
            .find(|pw| !matches!(pw.base.to_ascii_uppercase(), 'A' | 'C' | 'G' | 'T'))
        {
            return Err(ScoringError::InvalidConfig(format!(
                "Position weight at offset {} uses unknown base '{}'",
                bad.offset, bad.base
            )));
        }
        Ok(())
    }
}

/// On-target score and its components
#[derive(Debug, Clone, PartialEq)]
pub struct OnTargetScore {
    pub on_target: f64,
    pub gc_score: f64,
    pub homopolymer_score: f64,
    pub position_score: f64,
    pub gc_fraction: f64,
    pub longest_homopolymer: usize,
}

/// Score how efficiently a candidate is likely to cut at its intended site.
///
/// # Errors
///
/// Returns `ScoringError::LengthMismatch` if the candidate's protospacer is not
/// `protospacer_length` long.
pub fn score_on_target(
    candidate: &Candidate,
    config: &ScoringConfig,
    protospacer_length: usize,
) -> Result<OnTargetScore, ScoringError> {
    let bases = candidate.protospacer_bases();
    if candidate.length != protospacer_length || bases.len() != protospacer_length {
        return Err(ScoringError::LengthMismatch {
            target: candidate.target_name.clone(),
            start: candidate.start,
            expected: protospacer_length,
            actual: bases.len().max(candidate.length),
        });
    }

    let gc = gc_fraction(bases);
    let gc_score = gc_component(gc, config);

    let longest = longest_homopolymer(bases);
    let homopolymer_score = homopolymer_component(longest, config);

    let position_score = position_component(&candidate.pam_proximal_bases(), config);

    let w = config.weights.normalized();
    let on_target = (w.gc * gc_score
        + w.homopolymer * homopolymer_score
        + w.position * position_score)
        .clamp(0.0, 1.0);

    Ok(OnTargetScore {
        on_target,
        gc_score,
        homopolymer_score,
        position_score,
        gc_fraction: gc,
        longest_homopolymer: longest,
    })
}

fn gc_component(gc: f64, config: &ScoringConfig) -> f64 {
    let distance = if gc < config.gc_min {
        config.gc_min - gc
    } else if gc > config.gc_max {
        gc - config.gc_max
    } else {
        0.0
    };
    (1.0 - distance / config.gc_falloff).clamp(0.0, 1.0)
}

fn homopolymer_component(longest: usize, config: &ScoringConfig) -> f64 {
    if longest < config.homopolymer_threshold {
        return 1.0;
    }
    let excess = longest + 1 - config.homopolymer_threshold;
    #[allow(clippy::cast_precision_loss)]
    let penalty = excess as f64 * config.homopolymer_step;
    (1.0 - penalty).clamp(0.0, 1.0)
}

fn position_component(pam_proximal: &[u8], config: &ScoringConfig) -> f64 {
    let raw: f64 = config
        .position_weights
        .iter()
        .filter(|pw| {
            pam_proximal
                .get(pw.offset)
                .is_some_and(|&b| char::from(b) == pw.base.to_ascii_uppercase())
        })
        .map(|pw| pw.weight)
        .sum();
    1.0 / (1.0 + (-raw).exp())
}
