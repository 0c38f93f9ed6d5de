//! Guide design pipeline.
//!
//! A run flows through four stages:
//!
//! 1. [`CandidateScanner`] lazily walks each target and yields every
//!    protospacer window next to a PAM match, forward strand first.
//! 2. An optional GC filter drops windows outside the requested range.
//! 3. Each remaining candidate is scored on the rayon pool: on-target
//!    efficiency from sequence composition ([`score_on_target`]) and, when a
//!    background corpus is available, an off-target search.
//! 4. [`Ranker`] combines the two into a composite score and sorts the
//!    candidates into a total, deterministic order.
//!
//! [`CandidateScanner`]: scanner::CandidateScanner
//! [`score_on_target`]: on_target::score_on_target
//! [`Ranker`]: ranker::Ranker

pub mod engine;
pub mod on_target;
pub mod ranker;
pub mod scanner;

pub use engine::{DesignEngine, DesignReport};
pub use on_target::ScoringError;
