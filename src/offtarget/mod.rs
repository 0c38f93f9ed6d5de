//! Off-target search over a reference corpus.
//!
//! Two strategies implement [`OffTargetSearcher`]:
//!
//! - [`DirectScan`]: examines every window of every reference sequence. Cost is
//!   linear in corpus size; fine for plasmids, amplicons and small genomes.
//! - [`CorpusIndex`]: a k-mer seed index built once and then shared read-only
//!   between worker threads. With `m` allowed mismatches the guide is split into
//!   `m + 1` disjoint segments; any window within `m` mismatches matches at
//!   least one segment exactly, so only windows implied by seed postings are
//!   verified.
//!
//! Both strategies search the forward corpus strand with the guide and the
//! reverse strand with the guide's reverse complement. Hits are Hamming-distance
//! matches only (no indels), deduplicated by reference position and capped at
//! [`OffTargetConfig::max_hits`]. A capped, timed-out or cancelled search
//! reports that through [`SearchStatus`] rather than failing.
//!
//! [`DirectScan`]: scan::DirectScan
//! [`CorpusIndex`]: index::CorpusIndex

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::core::candidate::offset_from_pam;
use crate::core::pam::{PamPattern, PamSide};
use crate::core::score::{OffTargetHit, OffTargetResult, SearchStatus};
use crate::core::sequence::reverse_complement;
use crate::core::types::Strand;
use crate::design::on_target::ScoringError;
use crate::design::scanner::pam_range;

pub mod corpus;
pub mod index;
pub mod scan;

pub use corpus::ReferenceCorpus;
pub use index::CorpusIndex;
pub use scan::DirectScan;

/// Largest mismatch count the search accepts
pub const MAX_MISMATCHES: usize = 4;

/// Default cap on reported hits per guide
pub const DEFAULT_MAX_HITS: usize = 100;

/// Windows examined between deadline checks
pub(crate) const BUDGET_CHECK_INTERVAL: usize = 4096;

/// Off-target search settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OffTargetConfig {
    /// Maximum mismatches for a window to count as a hit (0-4)
    pub max_mismatches: usize,

    /// Stop after this many distinct hits and mark the result truncated
    pub max_hits: usize,

    /// Per-candidate time limit in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    /// Only count windows that are themselves next to a PAM
    pub require_pam: bool,
}

impl Default for OffTargetConfig {
    fn default() -> Self {
        Self {
            max_mismatches: 2,
            max_hits: DEFAULT_MAX_HITS,
            timeout_ms: None,
            require_pam: false,
        }
    }
}

impl OffTargetConfig {
    /// # Errors
    ///
    /// Returns `ScoringError::InvalidConfig` if the mismatch limit exceeds
    /// [`MAX_MISMATCHES`] or the hit cap is zero.
    pub fn validate(&self) -> Result<(), ScoringError> {
        if self.max_mismatches > MAX_MISMATCHES {
            return Err(ScoringError::InvalidConfig(format!(
                "max_mismatches {} exceeds the supported maximum of {MAX_MISMATCHES}",
                self.max_mismatches
            )));
        }
        if self.max_hits == 0 {
            return Err(ScoringError::InvalidConfig(
                "max_hits must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Budget for a single candidate's search, starting now
    #[must_use]
    pub fn budget(&self, cancel: Option<Arc<AtomicBool>>) -> SearchBudget {
        let mut budget = SearchBudget::unlimited();
        if let Some(ms) = self.timeout_ms {
            budget = budget.with_timeout(Duration::from_millis(ms));
        }
        if let Some(flag) = cancel {
            budget = budget.with_cancel(flag);
        }
        budget
    }
}

/// Deadline and cancellation flag bounding one search
#[derive(Debug, Clone, Default)]
pub struct SearchBudget {
    deadline: Option<Instant>,
    cancel: Option<Arc<AtomicBool>>,
}

impl SearchBudget {
    #[must_use]
    pub fn unlimited() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    #[must_use]
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// `Some(status)` once the search must stop
    #[must_use]
    pub fn exhausted(&self) -> Option<SearchStatus> {
        if self
            .cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
        {
            return Some(SearchStatus::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Some(SearchStatus::TimedOut);
        }
        None
    }
}

/// A reference site that must not be reported (the guide's own target)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SiteKey {
    pub sequence_name: String,
    pub position: usize,
    pub strand: Strand,
}

/// What to search for
#[derive(Debug, Clone)]
pub struct OffTargetQuery<'a> {
    /// Guide bases 5'->3' (uppercase ACGT)
    pub guide: &'a [u8],

    /// Side of the guide the PAM sits on; orients mismatch offsets
    pub pam_side: PamSide,

    /// PAM a hit must sit next to when `require_pam` is set
    pub pam: Option<&'a PamPattern>,

    /// The guide's own site, excluded from the results
    pub exclude: Option<SiteKey>,
}

impl<'a> OffTargetQuery<'a> {
    #[must_use]
    pub fn new(guide: &'a [u8], pam_side: PamSide) -> Self {
        Self {
            guide,
            pam_side,
            pam: None,
            exclude: None,
        }
    }

    #[must_use]
    pub fn with_pam(mut self, pam: &'a PamPattern) -> Self {
        self.pam = Some(pam);
        self
    }

    #[must_use]
    pub fn excluding(mut self, site: SiteKey) -> Self {
        self.exclude = Some(site);
        self
    }
}

/// How a searcher will handle a given guide length and mismatch limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchStrategy {
    DirectScan,
    SeedIndex,
    /// An index whose k-mers are longer than the pigeonhole segments
    IndexFallback,
}

impl std::fmt::Display for SearchStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DirectScan => write!(f, "direct scan"),
            Self::SeedIndex => write!(f, "seed index"),
            Self::IndexFallback => write!(f, "direct scan (index fallback)"),
        }
    }
}

/// A strategy for finding near matches of a guide in a corpus
pub trait OffTargetSearcher: Sync {
    /// Search the corpus for windows within `config.max_mismatches` of the guide
    fn search(
        &self,
        query: &OffTargetQuery<'_>,
        config: &OffTargetConfig,
        budget: &SearchBudget,
    ) -> OffTargetResult;

    /// The corpus being searched
    fn corpus(&self) -> &ReferenceCorpus;

    /// Strategy used for guides of `guide_len` with `max_mismatches`
    fn strategy(&self, guide_len: usize, max_mismatches: usize) -> SearchStrategy;
}

/// Mismatching offsets between `pattern` and `window`, or `None` once more than
/// `max_mismatches` are found. `N` in the window never matches.
#[must_use]
pub fn mismatch_offsets(pattern: &[u8], window: &[u8], max_mismatches: usize) -> Option<Vec<usize>> {
    if pattern.len() != window.len() {
        return None;
    }
    let mut offsets = Vec::new();
    for (i, (&p, &w)) in pattern.iter().zip(window).enumerate() {
        if p != w || w == b'N' {
            if offsets.len() == max_mismatches {
                return None;
            }
            offsets.push(i);
        }
    }
    Some(offsets)
}

/// The guide and its reverse complement, ready for matching against the forward corpus strand
pub(crate) struct StrandPatterns {
    pub forward: Vec<u8>,
    pub reverse: Vec<u8>,
}

impl StrandPatterns {
    pub fn new(guide: &[u8]) -> Self {
        Self {
            forward: guide.to_vec(),
            reverse: reverse_complement(guide),
        }
    }

    pub fn for_strand(&self, strand: Strand) -> &[u8] {
        match strand {
            Strand::Forward => &self.forward,
            Strand::Reverse => &self.reverse,
        }
    }
}

/// Verify one window on one strand; builds the hit if it qualifies
pub(crate) fn evaluate_window(
    query: &OffTargetQuery<'_>,
    config: &OffTargetConfig,
    corpus: &ReferenceCorpus,
    sequence_index: usize,
    position: usize,
    strand: Strand,
    pattern: &[u8],
) -> Option<OffTargetHit> {
    let sequence = corpus.sequences.get(sequence_index)?;
    let bases = sequence.bases();
    let len = pattern.len();
    let window = bases.get(position..position + len)?;

    let offsets = mismatch_offsets(pattern, window, config.max_mismatches)?;

    if let Some(exclude) = &query.exclude {
        if exclude.sequence_name == sequence.name
            && exclude.position == position
            && exclude.strand == strand
        {
            return None;
        }
    }

    if config.require_pam {
        if let Some(pam) = query.pam {
            let (pam_start, pam_end) = pam_range(position, len, pam.len(), pam.side(), strand)?;
            let pam_forward = bases.get(pam_start..pam_end)?;
            let pam_bases = match strand {
                Strand::Forward => pam_forward.to_vec(),
                Strand::Reverse => reverse_complement(pam_forward),
            };
            if !pam.matches(&pam_bases) {
                return None;
            }
        }
    }

    // Pattern offsets on the reverse strand run opposite to guide offsets
    let mut pam_offsets: Vec<usize> = offsets
        .iter()
        .map(|&i| {
            let guide_offset = match strand {
                Strand::Forward => i,
                Strand::Reverse => len - 1 - i,
            };
            offset_from_pam(guide_offset, len, query.pam_side)
        })
        .collect();
    pam_offsets.sort_unstable();

    Some(OffTargetHit {
        sequence_index,
        sequence_name: sequence.name.clone(),
        position,
        strand,
        mismatches: pam_offsets.len(),
        mismatch_offsets: pam_offsets,
    })
}

/// Deduplicates hits by reference position and enforces the hit cap
pub(crate) struct HitCollector {
    hits: BTreeMap<(usize, usize), OffTargetHit>,
    max_hits: usize,
    overflowed: bool,
}

impl HitCollector {
    pub fn new(max_hits: usize) -> Self {
        Self {
            hits: BTreeMap::new(),
            max_hits,
            overflowed: false,
        }
    }

    /// Add a hit; returns `false` once the cap has been exceeded
    pub fn offer(&mut self, hit: OffTargetHit) -> bool {
        let key = (hit.sequence_index, hit.position);
        match self.hits.get_mut(&key) {
            Some(existing) => {
                if (hit.mismatches, hit.strand) < (existing.mismatches, existing.strand) {
                    *existing = hit;
                }
            }
            None => {
                self.hits.insert(key, hit);
                if self.hits.len() > self.max_hits {
                    self.overflowed = true;
                }
            }
        }
        !self.overflowed
    }

    /// Final result; `stopped` carries a budget status if the search was cut short
    pub fn finish(self, stopped: Option<SearchStatus>) -> OffTargetResult {
        let status = match stopped {
            Some(status) => status,
            None if self.overflowed => SearchStatus::Truncated,
            None => SearchStatus::Complete,
        };
        let hits = self.hits.into_values().take(self.max_hits).collect();
        OffTargetResult { hits, status }
    }
}
