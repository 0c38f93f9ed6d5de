use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::DesignConfig;
use crate::core::candidate::Candidate;
use crate::core::pam::PamPattern;
use crate::core::score::{OffTargetResult, ScoreResult, ScoredCandidate};
use crate::core::sequence::Sequence;
use crate::core::types::Nuclease;
use crate::design::on_target::{score_on_target, ScoringError};
use crate::design::ranker::{composite_score, specificity, Ranker};
use crate::design::scanner::CandidateScanner;
use crate::offtarget::{OffTargetQuery, OffTargetSearcher, SearchStrategy, SiteKey};

/// Outcome of a design run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesignReport {
    /// When the run finished (RFC 3339)
    pub generated_at: String,

    pub nuclease: Nuclease,
    pub pam: PamPattern,
    pub protospacer_length: usize,

    /// How off-targets were searched; `None` without a background corpus
    pub strategy: Option<SearchStrategy>,

    /// Number of target sequences scanned
    pub targets: usize,

    /// PAM-adjacent windows found before filtering
    pub candidates_found: usize,

    /// Windows dropped by the GC filter
    pub candidates_filtered: usize,

    /// Candidates whose off-target search was cut short
    pub incomplete_searches: usize,

    /// Ranked candidates, best first
    pub candidates: Vec<ScoredCandidate>,
}

impl DesignReport {
    /// Keep only the `n` best candidates
    pub fn truncate(&mut self, n: usize) {
        self.candidates.truncate(n);
    }
}

/// Drives enumeration, scoring, off-target search and ranking
pub struct DesignEngine<'a> {
    config: DesignConfig,
    searcher: Option<&'a dyn OffTargetSearcher>,
    cancel: Arc<AtomicBool>,
}

impl<'a> DesignEngine<'a> {
    /// Create an engine that scores on-target only
    pub fn new(config: DesignConfig) -> Self {
        Self {
            config,
            searcher: None,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Search off-targets with `searcher`
    #[must_use]
    pub fn with_searcher(mut self, searcher: &'a dyn OffTargetSearcher) -> Self {
        self.searcher = Some(searcher);
        self
    }

    pub fn config(&self) -> &DesignConfig {
        &self.config
    }

    /// Flag that stops every outstanding off-target search when set
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Design and rank guides for every target.
    ///
    /// Candidates are scored on the rayon pool while the scanner is still
    /// producing windows.
    ///
    /// # Errors
    ///
    /// Returns `ScoringError::InvalidConfig` if the configuration is unusable,
    /// or `ScoringError::LengthMismatch` if a candidate cannot be scored.
    pub fn design(&self, targets: &[Sequence]) -> Result<DesignReport, ScoringError> {
        self.config.validate()?;

        let pam = self.config.pam();
        let length = self.config.protospacer_length();
        let cut_offset = self.config.cut_offset();
        let gc_filter = self.config.gc_filter;

        let strategy = self
            .searcher
            .map(|s| s.strategy(length, self.config.off_target.max_mismatches));
        if strategy == Some(SearchStrategy::IndexFallback) {
            warn!(
                "Index seeds are longer than the {} nt segments of a {} nt guide with {} mismatches; scanning directly",
                length / (self.config.off_target.max_mismatches + 1),
                length,
                self.config.off_target.max_mismatches
            );
        }

        info!(
            "Designing {} nt guides for {} PAM over {} target(s)",
            length,
            pam,
            targets.len()
        );

        let mut found = 0usize;
        let mut filtered = 0usize;

        let scored: Vec<ScoredCandidate> = targets
            .iter()
            .enumerate()
            .flat_map(|(index, target)| CandidateScanner::new(target, index, &pam, length, cut_offset))
            .inspect(|_| found += 1)
            .filter(|candidate| {
                let keep = gc_filter.map_or(true, |f| f.accepts(candidate.gc_fraction()));
                if !keep {
                    filtered += 1;
                }
                keep
            })
            .par_bridge()
            .map(|candidate| self.score(candidate, &pam))
            .collect::<Result<_, _>>()?;

        debug!(
            "Found {} candidates, {} outside the GC filter, {} scored",
            found,
            filtered,
            scored.len()
        );

        let incomplete_searches = scored
            .iter()
            .filter(|s| self.searcher.is_some() && !s.score.off_target.status.is_exhaustive())
            .count();
        if incomplete_searches > 0 {
            warn!(
                "{} candidate(s) have incomplete off-target results (hit cap, timeout or cancellation)",
                incomplete_searches
            );
        }

        let candidates = Ranker::new(self.config.rank.clone()).rank(scored);

        Ok(DesignReport {
            generated_at: chrono::Utc::now().to_rfc3339(),
            nuclease: self.config.nuclease,
            pam,
            protospacer_length: length,
            strategy,
            targets: targets.len(),
            candidates_found: found,
            candidates_filtered: filtered,
            incomplete_searches,
            candidates,
        })
    }

    /// Score a single candidate against the engine's configuration.
    ///
    /// # Errors
    ///
    /// Returns `ScoringError::LengthMismatch` if the candidate's length differs
    /// from the configured protospacer length.
    pub fn score(
        &self,
        candidate: Candidate,
        pam: &PamPattern,
    ) -> Result<ScoredCandidate, ScoringError> {
        let on = score_on_target(
            &candidate,
            &self.config.scoring,
            self.config.protospacer_length(),
        )?;

        let off_target = match self.searcher {
            Some(searcher) => {
                let query = OffTargetQuery::new(candidate.protospacer_bases(), pam.side())
                    .with_pam(pam)
                    .excluding(SiteKey {
                        sequence_name: candidate.target_name.clone(),
                        position: candidate.start,
                        strand: candidate.strand,
                    });
                let budget = self.config.off_target.budget(Some(self.cancel_handle()));
                searcher.search(&query, &self.config.off_target, &budget)
            }
            None => OffTargetResult::not_searched(),
        };

        let penalty = off_target.penalty();
        let score = ScoreResult {
            on_target: on.on_target,
            gc_score: on.gc_score,
            homopolymer_score: on.homopolymer_score,
            position_score: on.position_score,
            gc_fraction: on.gc_fraction,
            longest_homopolymer: on.longest_homopolymer,
            off_target,
            off_target_penalty: penalty,
            specificity: specificity(penalty),
            composite: composite_score(on.on_target, penalty, &self.config.rank),
        };

        Ok(ScoredCandidate { candidate, score })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GcFilter;
    use crate::core::score::SearchStatus;
    use crate::core::sequence::reverse_complement;
    use crate::core::types::Strand;
    use crate::offtarget::{CorpusIndex, DirectScan, ReferenceCorpus};

    const TARGET: &str = "ATGGCTAGCTAGGACTGACTTACAGATCATCATGGTTACCGATCGGATCCAGTCAAGGCTTACG";

    fn target() -> Vec<Sequence> {
        vec![Sequence::parse("target", TARGET).unwrap()]
    }

    #[test]
    fn test_design_without_background() {
        let engine = DesignEngine::new(DesignConfig::default());
        let report = engine.design(&target()).unwrap();

        assert!(report.candidates_found > 0);
        assert_eq!(report.candidates.len(), report.candidates_found);
        assert_eq!(report.strategy, None);
        assert_eq!(report.incomplete_searches, 0);
        for scored in &report.candidates {
            assert_eq!(scored.score.off_target.status, SearchStatus::NotSearched);
            assert!((0.0..=1.0).contains(&scored.score.on_target));
            assert!((scored.score.specificity - 1.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn test_design_is_deterministic() {
        let engine = DesignEngine::new(DesignConfig::default());
        let a = engine.design(&target()).unwrap();
        let b = engine.design(&target()).unwrap();
        assert_eq!(a.candidates, b.candidates);
    }

    #[test]
    fn test_gc_filter() {
        let config = DesignConfig {
            gc_filter: Some(GcFilter { min: 0.45, max: 0.55 }),
            ..DesignConfig::default()
        };
        let report = DesignEngine::new(config).design(&target()).unwrap();

        assert_eq!(
            report.candidates.len() + report.candidates_filtered,
            report.candidates_found
        );
        for scored in &report.candidates {
            assert!((0.45..=0.55).contains(&scored.score.gc_fraction));
        }
    }

    #[test]
    fn test_off_target_hit_lowers_rank() {
        let targets = target();
        let first = DesignEngine::new(DesignConfig::default())
            .design(&targets)
            .unwrap()
            .candidates
            .remove(0);

        // Plant the best guide's reverse complement in the background
        let rc = String::from_utf8(reverse_complement(first.candidate.protospacer_bases())).unwrap();
        let corpus = ReferenceCorpus::new(vec![Sequence::parse_reference(
            "bg",
            &format!("TTTTTTTTTT{rc}TTTTTTTTTT"),
        )
        .unwrap()]);
        let scan = DirectScan::new(&corpus);

        let report = DesignEngine::new(DesignConfig::default())
            .with_searcher(&scan)
            .design(&targets)
            .unwrap();
        assert_eq!(report.strategy, Some(SearchStrategy::DirectScan));

        let hit = report
            .candidates
            .iter()
            .find(|s| s.candidate == first.candidate)
            .unwrap();
        assert_eq!(hit.score.off_target.hits.len(), 1);
        assert_eq!(hit.score.off_target.hits[0].strand, Strand::Reverse);
        assert!(hit.score.composite < first.score.composite);
    }

    #[test]
    fn test_own_site_is_excluded() {
        let targets = target();
        let corpus = ReferenceCorpus::new(targets.clone());
        let scan = DirectScan::new(&corpus);
        let config = DesignConfig {
            off_target: crate::offtarget::OffTargetConfig {
                max_mismatches: 0,
                ..Default::default()
            },
            ..DesignConfig::default()
        };

        let report = DesignEngine::new(config)
            .with_searcher(&scan)
            .design(&targets)
            .unwrap();
        for scored in &report.candidates {
            assert!(
                scored.score.off_target.hits.is_empty(),
                "{:?}",
                scored.score.off_target.hits
            );
        }
    }

    #[test]
    fn test_index_fallback_is_reported() {
        let corpus = ReferenceCorpus::new(target());
        let index = CorpusIndex::build(corpus, 8).unwrap();
        let config = DesignConfig {
            off_target: crate::offtarget::OffTargetConfig {
                max_mismatches: 4,
                ..Default::default()
            },
            ..DesignConfig::default()
        };
        let report = DesignEngine::new(config)
            .with_searcher(&index)
            .design(&target())
            .unwrap();
        assert_eq!(report.strategy, Some(SearchStrategy::IndexFallback));
    }

    #[test]
    fn test_cancelled_searches_are_incomplete() {
        // Long enough that every search reaches a budget check
        let corpus = ReferenceCorpus::new(vec![
            Sequence::parse_reference("bg", &"ACGT".repeat(1500)).unwrap()
        ]);
        let scan = DirectScan::new(&corpus);
        let engine = DesignEngine::new(DesignConfig::default()).with_searcher(&scan);
        engine.cancel();

        let report = engine.design(&target()).unwrap();
        assert!(!report.candidates.is_empty());
        assert_eq!(report.incomplete_searches, report.candidates.len());
        for scored in &report.candidates {
            assert_eq!(scored.score.off_target.status, SearchStatus::Cancelled);
        }
    }

    #[test]
    fn test_invalid_config() {
        let config = DesignConfig {
            protospacer_length: Some(0),
            ..DesignConfig::default()
        };
        assert!(matches!(
            DesignEngine::new(config).design(&target()),
            Err(ScoringError::InvalidConfig(_))
        ));
    }
}
