//! # crispr-lab
//!
//! A library for designing CRISPR guide RNAs and checking them for off-target sites.
//!
//! Given a target sequence and a nuclease, `crispr-lab` enumerates every protospacer
//! next to a PAM on both strands, scores each one for on-target efficiency, searches
//! a background corpus for near matches, and ranks the candidates by a composite of
//! efficiency and specificity.
//!
//! ## Features
//!
//! - **PAM scanning**: IUPAC motifs on either side of the protospacer (Cas9, Cas12a, custom)
//! - **On-target scoring**: GC content, homopolymer runs and position-specific base weights
//! - **Off-target search**: Hamming-distance search by direct scan or a k-mer seed index
//! - **Bounded searches**: hit caps, timeouts and cancellation reported as partial results
//! - **Edit simulation**: frame-0 translation before and after an indel or substitution
//!
//! ## Example
//!
//! ```rust,no_run
//! use crispr_lab::{DesignConfig, DesignEngine, DirectScan, ReferenceCorpus, Sequence};
//!
//! let target = Sequence::parse("exon1", "ATGCTAGCTAGGATCGATCGATCGGCTAGCTAGCTAGG").unwrap();
//! let background = ReferenceCorpus::new(vec![
//!     Sequence::parse_reference("chr1", "NNNNACGTACGTACGTACGTACGTAGGNNNN").unwrap(),
//! ]);
//! let searcher = DirectScan::new(&background);
//!
//! let report = DesignEngine::new(DesignConfig::default())
//!     .with_searcher(&searcher)
//!     .design(&[target])
//!     .unwrap();
//!
//! for guide in &report.candidates {
//!     println!("{} {:.1}%", guide.candidate.protospacer, guide.score.composite * 100.0);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`core`]: Sequences, PAM patterns, candidates and score types
//! - [`design`]: Candidate scanning, on-target scoring, ranking and the design engine
//! - [`offtarget`]: Reference corpus, direct scan and seed index searchers
//! - [`edit`]: Protein-level effect of edits at a cut site
//! - [`config`]: Design configuration loaded from JSON
//! - [`parsing`]: FASTA and raw sequence input
//! - [`cli`]: Command-line interface implementation

pub mod cli;
pub mod config;
pub mod core;
pub mod design;
pub mod edit;
pub mod offtarget;
pub mod parsing;
pub mod utils;

// Re-export commonly used types for convenience
pub use config::DesignConfig;
pub use core::candidate::Candidate;
pub use core::pam::{PamPattern, PamSide};
pub use core::score::{OffTargetHit, OffTargetResult, ScoreResult, ScoredCandidate, SearchStatus};
pub use core::sequence::Sequence;
pub use core::types::*;
pub use design::{DesignEngine, DesignReport};
pub use offtarget::{CorpusIndex, DirectScan, OffTargetConfig, OffTargetSearcher, ReferenceCorpus};
