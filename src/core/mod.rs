//! Core data types for guide RNA design.
//!
//! This module provides the fundamental types used throughout the library:
//!
//! - [`Sequence`]: A named, validated nucleotide sequence
//! - [`PamPattern`]: A protospacer-adjacent motif with IUPAC wildcards
//! - [`Candidate`]: A protospacer window next to a PAM match
//! - [`ScoreResult`], [`OffTargetHit`]: Scores and off-target findings for a candidate
//! - [`Strand`], [`Nuclease`]: Site orientation and nuclease presets
//!
//! ## Coordinates
//!
//! All positions are 0-based forward-strand coordinates of the leftmost base,
//! regardless of the strand a site sits on. Bases stored on a candidate or hit
//! are always written 5'->3' on that site's own strand.
//!
//! | Nuclease | PAM  | Side | Protospacer |
//! |----------|------|------|-------------|
//! | Cas9     | NGG  | 3'   | 20 nt       |
//! | Cas9     | NAG  | 3'   | 20 nt       |
//! | Cas12a   | TTTV | 5'   | 23 nt       |
//!
//! [`Sequence`]: sequence::Sequence
//! [`PamPattern`]: pam::PamPattern
//! [`Candidate`]: candidate::Candidate
//! [`ScoreResult`]: score::ScoreResult
//! [`OffTargetHit`]: score::OffTargetHit
//! [`Strand`]: types::Strand
//! [`Nuclease`]: types::Nuclease

pub mod candidate;
pub mod pam;
pub mod score;
pub mod sequence;
pub mod types;
