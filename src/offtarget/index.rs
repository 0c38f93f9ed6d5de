use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::core::score::OffTargetResult;
use crate::core::types::Strand;
use crate::offtarget::{
    evaluate_window, DirectScan, HitCollector, OffTargetConfig, OffTargetQuery,
    OffTargetSearcher, ReferenceCorpus, SearchBudget, SearchStrategy, StrandPatterns,
    BUDGET_CHECK_INTERVAL,
};

/// Leading bytes of a saved index file
pub const INDEX_MAGIC: &[u8; 16] = b"crispr-lab-index";

/// Index format version for compatibility checking
pub const INDEX_VERSION: u32 = 1;

/// Default seed length; suits 20 nt guides with up to 3 mismatches
pub const DEFAULT_KMER_SIZE: usize = 5;

/// Largest seed length that packs into a `u64`
pub const MAX_KMER_SIZE: usize = 31;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Failed to read or write index: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode or decode index: {0}")]
    Codec(#[from] bincode::Error),

    #[error("Not a crispr-lab index file")]
    NotAnIndex,

    #[error("Index version mismatch (expected {expected}, found {found})")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("Index corpus fingerprint does not match its contents; the file is corrupt")]
    FingerprintMismatch,

    #[error("k-mer size must be between 1 and {MAX_KMER_SIZE}, got {0}")]
    InvalidKmerSize(usize),

    #[error("Sequence '{0}' is too long to index")]
    SequenceTooLong(String),
}

/// One occurrence of a k-mer in the corpus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub sequence: u32,
    pub position: u32,
}

#[inline]
fn encode_base(base: u8) -> Option<u64> {
    match base {
        b'A' => Some(0),
        b'C' => Some(1),
        b'G' => Some(2),
        b'T' => Some(3),
        _ => None,
    }
}

/// Pack a k-mer into 2 bits per base; `None` if it contains a non-ACGT base
#[must_use]
pub fn encode_kmer(kmer: &[u8]) -> Option<u64> {
    kmer.iter()
        .try_fold(0u64, |acc, &b| encode_base(b).map(|code| (acc << 2) | code))
}

/// Every ACGT-only k-mer of `bases` with its start position, via a rolling encoding
fn kmers(bases: &[u8], k: usize) -> Vec<(u64, usize)> {
    let mask = if k == 32 { u64::MAX } else { (1u64 << (2 * k)) - 1 };
    let mut out = Vec::with_capacity(bases.len().saturating_sub(k - 1));
    let mut code = 0u64;
    let mut valid = 0usize;

    for (i, &b) in bases.iter().enumerate() {
        match encode_base(b) {
            Some(bits) => {
                code = ((code << 2) | bits) & mask;
                valid += 1;
            }
            None => {
                code = 0;
                valid = 0;
            }
        }
        if valid >= k {
            out.push((code, i + 1 - k));
        }
    }

    out
}

/// Length of each pigeonhole segment for a guide of `guide_len` with `max_mismatches`
#[must_use]
pub fn seed_length(guide_len: usize, max_mismatches: usize) -> usize {
    guide_len / (max_mismatches + 1)
}

/// Immutable k-mer seed index over a reference corpus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusIndex {
    version: u32,

    /// When the index was built (RFC 3339)
    pub created_at: String,

    /// MD5 fingerprint of the indexed corpus
    pub fingerprint: String,

    k: usize,
    corpus: ReferenceCorpus,
    postings: HashMap<u64, Vec<Posting>>,
}

impl CorpusIndex {
    /// Build an index over `corpus` with seeds of length `k`.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::InvalidKmerSize` if `k` is 0 or too large, or
    /// `IndexError::SequenceTooLong` if a sequence cannot be addressed with 32 bits.
    pub fn build(corpus: ReferenceCorpus, k: usize) -> Result<Self, IndexError> {
        if k == 0 || k > MAX_KMER_SIZE {
            return Err(IndexError::InvalidKmerSize(k));
        }
        if let Some(long) = corpus
            .sequences
            .iter()
            .find(|s| u32::try_from(s.len()).is_err())
        {
            return Err(IndexError::SequenceTooLong(long.name.clone()));
        }
        if u32::try_from(corpus.len()).is_err() {
            return Err(IndexError::SequenceTooLong(format!(
                "{} sequences",
                corpus.len()
            )));
        }

        info!(
            "Indexing {} sequences ({} bp) with k={}",
            corpus.len(),
            corpus.total_bases(),
            k
        );

        // Per-sequence extraction in parallel; merged in sequence order so postings stay sorted
        let per_sequence: Vec<Vec<(u64, usize)>> = corpus
            .sequences
            .par_iter()
            .map(|s| kmers(s.bases(), k))
            .collect();

        let mut postings: HashMap<u64, Vec<Posting>> = HashMap::new();
        for (sequence, occurrences) in per_sequence.into_iter().enumerate() {
            #[allow(clippy::cast_possible_truncation)] // bounds checked above
            let sequence = sequence as u32;
            for (code, position) in occurrences {
                #[allow(clippy::cast_possible_truncation)]
                postings.entry(code).or_default().push(Posting {
                    sequence,
                    position: position as u32,
                });
            }
        }

        debug!("Index holds {} distinct k-mers", postings.len());

        Ok(Self {
            version: INDEX_VERSION,
            created_at: chrono::Utc::now().to_rfc3339(),
            fingerprint: corpus.fingerprint(),
            k,
            corpus,
            postings,
        })
    }

    #[must_use]
    pub fn kmer_size(&self) -> usize {
        self.k
    }

    /// Number of distinct k-mers indexed
    #[must_use]
    pub fn distinct_kmers(&self) -> usize {
        self.postings.len()
    }

    /// Whether seeded lookup is exact for this guide length and mismatch limit
    #[must_use]
    pub fn supports(&self, guide_len: usize, max_mismatches: usize) -> bool {
        seed_length(guide_len, max_mismatches) >= self.k
    }

    /// Write the index to `path`.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::Io` or `IndexError::Codec` on failure.
    pub fn save(&self, path: &Path) -> Result<(), IndexError> {
        let mut writer = BufWriter::new(File::create(path)?);
        writer.write_all(INDEX_MAGIC)?;
        bincode::serialize_into(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    /// Read an index written by [`CorpusIndex::save`].
    ///
    /// # Errors
    ///
    /// Returns `IndexError::Io`/`Codec` if the file cannot be read or decoded,
    /// `NotAnIndex` or `VersionMismatch` for foreign or stale files, and
    /// `FingerprintMismatch` if the stored corpus does not match its fingerprint.
    pub fn load(path: &Path) -> Result<Self, IndexError> {
        let mut reader = BufReader::new(File::open(path)?);

        let mut magic = [0u8; INDEX_MAGIC.len()];
        if reader.read_exact(&mut magic).is_err() || &magic != INDEX_MAGIC {
            return Err(IndexError::NotAnIndex);
        }

        let index: Self = bincode::deserialize_from(reader)?;
        if index.version != INDEX_VERSION {
            return Err(IndexError::VersionMismatch {
                expected: INDEX_VERSION,
                found: index.version,
            });
        }
        if index.corpus.fingerprint() != index.fingerprint {
            return Err(IndexError::FingerprintMismatch);
        }

        info!(
            "Loaded index of {} sequences (k={}, built {})",
            index.corpus.len(),
            index.k,
            index.created_at
        );
        Ok(index)
    }
}

impl OffTargetSearcher for CorpusIndex {
    fn search(
        &self,
        query: &OffTargetQuery<'_>,
        config: &OffTargetConfig,
        budget: &SearchBudget,
    ) -> OffTargetResult {
        let len = query.guide.len();
        if !self.supports(len, config.max_mismatches) {
            debug!(
                "Seed length {} is shorter than index k={}; scanning directly",
                seed_length(len, config.max_mismatches),
                self.k
            );
            return DirectScan::new(&self.corpus).search(query, config, budget);
        }

        let patterns = StrandPatterns::new(query.guide);
        let segment = seed_length(len, config.max_mismatches);
        let mut collector = HitCollector::new(config.max_hits);
        let mut examined = 0usize;

        for strand in [Strand::Forward, Strand::Reverse] {
            let pattern = patterns.for_strand(strand);

            for j in 0..=config.max_mismatches {
                let offset = j * segment;
                let Some(code) = encode_kmer(&pattern[offset..offset + self.k]) else {
                    continue;
                };
                let Some(postings) = self.postings.get(&code) else {
                    continue;
                };

                for posting in postings {
                    examined += 1;
                    if examined % BUDGET_CHECK_INTERVAL == 0 {
                        if let Some(status) = budget.exhausted() {
                            return collector.finish(Some(status));
                        }
                    }

                    let Some(start) = (posting.position as usize).checked_sub(offset) else {
                        continue;
                    };
                    let hit = evaluate_window(
                        query,
                        config,
                        &self.corpus,
                        posting.sequence as usize,
                        start,
                        strand,
                        pattern,
                    );
                    if let Some(hit) = hit {
                        if !collector.offer(hit) {
                            return collector.finish(None);
                        }
                    }
                }
            }
        }

        collector.finish(None)
    }

    fn corpus(&self) -> &ReferenceCorpus {
        &self.corpus
    }

    fn strategy(&self, guide_len: usize, max_mismatches: usize) -> SearchStrategy {
        if self.supports(guide_len, max_mismatches) {
            SearchStrategy::SeedIndex
        } else {
            SearchStrategy::IndexFallback
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pam::PamSide;
    use crate::core::score::SearchStatus;
    use crate::core::sequence::{reverse_complement, Sequence};
    use tempfile::NamedTempFile;

    const GUIDE: &str = "ACTGACTTACAGATCATCAT";

    fn background() -> ReferenceCorpus {
        let rc = String::from_utf8(reverse_complement(GUIDE.as_bytes())).unwrap();
        // exact forward copy, a 2-mismatch copy, the reverse complement, and masked filler
        let two_mm = "ACTGACTTACTGATCATGAT";
        let chr1 = format!("TTGCAAGT{GUIDE}CCAGTTNNNNNGCATTA{two_mm}AGCTTGCA");
        let chr2 = format!("GCGCGCAT{rc}TATACGCGTTAGC");
        ReferenceCorpus::new(vec![
            Sequence::parse_reference("chr1", &chr1).unwrap(),
            Sequence::parse_reference("chr2", &chr2).unwrap(),
        ])
    }

    #[test]
    fn test_encode_kmer() {
        assert_eq!(encode_kmer(b"A"), Some(0));
        assert_eq!(encode_kmer(b"ACGT"), Some(0b00_01_10_11));
        assert_eq!(encode_kmer(b"ACNT"), None);
    }

    #[test]
    fn test_kmers_skip_masked_bases() {
        let found = kmers(b"ACGNACGT", 3);
        let positions: Vec<usize> = found.iter().map(|(_, p)| *p).collect();
        assert_eq!(positions, vec![0, 4, 5]);
        assert_eq!(found[0].0, encode_kmer(b"ACG").unwrap());
        assert_eq!(found[2].0, encode_kmer(b"CGT").unwrap());
    }

    #[test]
    fn test_build_rejects_bad_k() {
        assert!(matches!(
            CorpusIndex::build(background(), 0),
            Err(IndexError::InvalidKmerSize(0))
        ));
        assert!(CorpusIndex::build(background(), 32).is_err());
    }

    #[test]
    fn test_index_agrees_with_direct_scan() {
        let corpus = background();
        let index = CorpusIndex::build(corpus.clone(), 5).unwrap();
        let scan = DirectScan::new(&corpus);

        for max_mismatches in 0..=3 {
            let config = OffTargetConfig {
                max_mismatches,
                ..OffTargetConfig::default()
            };
            let query = OffTargetQuery::new(GUIDE.as_bytes(), PamSide::ThreePrime);
            let from_index = index.search(&query, &config, &SearchBudget::unlimited());
            let from_scan = scan.search(&query, &config, &SearchBudget::unlimited());
            assert_eq!(from_index, from_scan, "max_mismatches={max_mismatches}");
            assert_eq!(from_index.status, SearchStatus::Complete);
        }
    }

    #[test]
    fn test_finds_expected_hits() {
        let index = CorpusIndex::build(background(), 5).unwrap();
        let config = OffTargetConfig {
            max_mismatches: 2,
            ..OffTargetConfig::default()
        };
        let query = OffTargetQuery::new(GUIDE.as_bytes(), PamSide::ThreePrime);
        let result = index.search(&query, &config, &SearchBudget::unlimited());

        let summary: Vec<_> = result
            .hits
            .iter()
            .map(|h| (h.sequence_name.as_str(), h.position, h.strand, h.mismatches))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("chr1", 8, Strand::Forward, 0),
                ("chr1", 45, Strand::Forward, 2),
                ("chr2", 8, Strand::Reverse, 0),
            ]
        );
    }

    #[test]
    fn test_falls_back_when_seed_too_short() {
        let corpus = background();
        let index = CorpusIndex::build(corpus.clone(), 8).unwrap();
        let config = OffTargetConfig {
            max_mismatches: 3,
            ..OffTargetConfig::default()
        };
        assert!(!index.supports(20, 3));
        let query = OffTargetQuery::new(GUIDE.as_bytes(), PamSide::ThreePrime);
        let from_index = index.search(&query, &config, &SearchBudget::unlimited());
        let from_scan = DirectScan::new(&corpus).search(&query, &config, &SearchBudget::unlimited());
        assert_eq!(from_index, from_scan);
    }

    #[test]
    fn test_save_and_load() {
        let index = CorpusIndex::build(background(), 5).unwrap();
        let temp = NamedTempFile::with_suffix(".idx").unwrap();
        index.save(temp.path()).unwrap();

        let loaded = CorpusIndex::load(temp.path()).unwrap();
        assert_eq!(loaded.kmer_size(), 5);
        assert_eq!(loaded.fingerprint, index.fingerprint);
        assert_eq!(loaded.distinct_kmers(), index.distinct_kmers());

        let config = OffTargetConfig::default();
        let query = OffTargetQuery::new(GUIDE.as_bytes(), PamSide::ThreePrime);
        assert_eq!(
            loaded.search(&query, &config, &SearchBudget::unlimited()),
            index.search(&query, &config, &SearchBudget::unlimited())
        );
    }

    #[test]
    fn test_load_rejects_garbage() {
        let mut temp = NamedTempFile::with_suffix(".idx").unwrap();
        temp.write_all(b"definitely not an index").unwrap();
        temp.flush().unwrap();
        assert!(matches!(
            CorpusIndex::load(temp.path()),
            Err(IndexError::NotAnIndex)
        ));
    }

    #[test]
    fn test_expired_deadline_keeps_partial_hits() {
        // More seed postings than one budget check interval
        let corpus = ReferenceCorpus::new(vec![
            Sequence::parse_reference("rep", &GUIDE.repeat(5000)).unwrap()
        ]);
        let index = CorpusIndex::build(corpus, 5).unwrap();
        let config = OffTargetConfig {
            max_mismatches: 0,
            max_hits: 10_000,
            ..OffTargetConfig::default()
        };
        let query = OffTargetQuery::new(GUIDE.as_bytes(), PamSide::ThreePrime);
        let budget = SearchBudget::unlimited().with_deadline(std::time::Instant::now());

        let result = index.search(&query, &config, &budget);
        assert_eq!(result.status, SearchStatus::TimedOut);
        assert!(!result.status.is_exhaustive());
        assert!(!result.hits.is_empty());
        assert!(result.hits.len() < 5000);
    }
}
