//! Run configuration for guide design.
//!
//! A [`DesignConfig`] can be written as JSON; every field is optional and
//! falls back to the `cas9-ngg` defaults:
//!
//! ```json
//! {
//!   "nuclease": "cas12a-tttv",
//!   "gc_filter": { "min": 0.3, "max": 0.7 },
//!   "off_target": { "max_mismatches": 3, "timeout_ms": 500 },
//!   "rank": { "on_target": 0.5, "specificity": 0.5 }
//! }
//! ```
//!
//! Naming a `nuclease` without a `pam` uses that nuclease's PAM, length and
//! cut offset.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::pam::PamPattern;
use crate::core::types::Nuclease;
use crate::design::on_target::{ScoringConfig, ScoringError};
use crate::design::ranker::RankWeights;
use crate::offtarget::OffTargetConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error(transparent)]
    Invalid(#[from] ScoringError),
}

/// Candidates outside this GC window are dropped before scoring
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GcFilter {
    /// Minimum GC fraction (0-1)
    pub min: f64,
    /// Maximum GC fraction (0-1)
    pub max: f64,
}

impl GcFilter {
    #[must_use]
    pub fn accepts(&self, gc_fraction: f64) -> bool {
        gc_fraction >= self.min && gc_fraction <= self.max
    }
}

/// Everything a design run needs besides its inputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesignConfig {
    pub nuclease: Nuclease,

    /// PAM to scan for; `None` uses the nuclease's
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pam: Option<PamPattern>,

    /// Protospacer length; `None` uses the nuclease's
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protospacer_length: Option<usize>,

    /// Cut distance from the PAM; `None` uses the nuclease's
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cut_offset: Option<usize>,

    pub scoring: ScoringConfig,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gc_filter: Option<GcFilter>,

    pub off_target: OffTargetConfig,

    pub rank: RankWeights,
}

impl Default for DesignConfig {
    fn default() -> Self {
        Self::for_nuclease(Nuclease::Cas9Ngg)
    }
}

impl DesignConfig {
    /// Defaults for a nuclease preset
    #[must_use]
    pub fn for_nuclease(nuclease: Nuclease) -> Self {
        Self {
            nuclease,
            pam: None,
            protospacer_length: None,
            cut_offset: None,
            scoring: ScoringConfig::default(),
            gc_filter: None,
            off_target: OffTargetConfig::default(),
            rank: RankWeights::default(),
        }
    }

    /// Load a configuration from a JSON file and validate it.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read, is not valid JSON for
    /// this structure, or describes an unusable configuration.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse and validate a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ParseError` or `ConfigError::Invalid`.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// The PAM in effect
    #[must_use]
    pub fn pam(&self) -> PamPattern {
        self.pam.clone().unwrap_or_else(|| self.nuclease.pam())
    }

    /// The protospacer length in effect
    #[must_use]
    pub fn protospacer_length(&self) -> usize {
        self.protospacer_length
            .unwrap_or_else(|| self.nuclease.protospacer_length())
    }

    /// The cut offset in effect; a custom PAM has none unless set explicitly
    #[must_use]
    pub fn cut_offset(&self) -> Option<usize> {
        match (self.cut_offset, &self.pam) {
            (Some(offset), _) => Some(offset),
            (None, None) => Some(self.nuclease.cut_offset()),
            (None, Some(_)) => None,
        }
    }

    /// # Errors
    ///
    /// Returns `ScoringError::InvalidConfig` describing the first problem found.
    pub fn validate(&self) -> Result<(), ScoringError> {
        if let Some(pam) = &self.pam {
            // Deserialized patterns bypass `PamPattern::parse`
            PamPattern::parse(pam.motif(), pam.side())
                .map_err(|e| ScoringError::InvalidConfig(format!("PAM: {e}")))?;
        }

        let length = self.protospacer_length();
        if length == 0 {
            return Err(ScoringError::InvalidConfig(
                "Protospacer length must be at least 1".to_string(),
            ));
        }
        if self.cut_offset.is_some_and(|offset| offset > length) {
            return Err(ScoringError::InvalidConfig(format!(
                "Cut offset {} is beyond the {length} nt protospacer",
                self.cut_offset.unwrap_or_default()
            )));
        }

        if let Some(filter) = &self.gc_filter {
            if !(0.0..=1.0).contains(&filter.min)
                || !(0.0..=1.0).contains(&filter.max)
                || filter.min > filter.max
            {
                return Err(ScoringError::InvalidConfig(format!(
                    "GC filter [{}, {}] must be an ordered range within [0, 1]",
                    filter.min, filter.max
                )));
            }
        }

        self.rank.validate()?;
        self.scoring.validate()?;
        self.off_target.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pam::PamSide;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_is_cas9() {
        let config = DesignConfig::default();
        assert_eq!(config.pam().motif(), "NGG");
        assert_eq!(config.protospacer_length(), 20);
        assert_eq!(config.cut_offset(), Some(3));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_nuclease_preset() {
        let config = DesignConfig::for_nuclease(Nuclease::Cas12aTttv);
        assert_eq!(config.pam().side(), PamSide::FivePrime);
        assert_eq!(config.protospacer_length(), 23);
        assert_eq!(config.cut_offset(), Some(18));
    }

    #[test]
    fn test_custom_pam_has_no_cut_site() {
        let config = DesignConfig {
            pam: Some(PamPattern::parse("NNGRRT", PamSide::ThreePrime).unwrap()),
            ..DesignConfig::default()
        };
        assert_eq!(config.cut_offset(), None);
    }

    #[test]
    fn test_from_json_partial() {
        let config = DesignConfig::from_json(
            r#"{"nuclease": "cas12a-tttv", "off_target": {"max_mismatches": 3}}"#,
        )
        .unwrap();
        assert_eq!(config.nuclease, Nuclease::Cas12aTttv);
        assert_eq!(config.off_target.max_mismatches, 3);
        assert_eq!(config.off_target.max_hits, 100);
    }

    #[test]
    fn test_from_json_rejects_bad_pam() {
        let json = r#"{"pam": {"motif": "NGX", "side": "three-prime"}}"#;
        assert!(matches!(
            DesignConfig::from_json(json),
            Err(ConfigError::Invalid(ScoringError::InvalidConfig(_)))
        ));
    }

    #[test]
    fn test_validate_gc_filter() {
        let config = DesignConfig {
            gc_filter: Some(GcFilter { min: 0.7, max: 0.4 }),
            ..DesignConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_specificity_weight() {
        let config = DesignConfig {
            rank: RankWeights {
                on_target: 1.0,
                specificity: 0.0,
            },
            ..DesignConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ScoringError::InvalidConfig(_))
        ));

        let json = r#"{"rank": {"on_target": 1.0, "specificity": 0.0}}"#;
        assert!(matches!(
            DesignConfig::from_json(json),
            Err(ConfigError::Invalid(ScoringError::InvalidConfig(_)))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut temp = NamedTempFile::with_suffix(".json").unwrap();
        writeln!(temp, r#"{{"protospacer_length": 18}}"#).unwrap();
        temp.flush().unwrap();

        let config = DesignConfig::load_from_file(temp.path()).unwrap();
        assert_eq!(config.protospacer_length(), 18);
    }
}
