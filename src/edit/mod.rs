//! Protein-level consequences of edits at a cut site.
//!
//! After a nuclease cuts, repair commonly leaves a small insertion or
//! deletion. This module translates the target (frame 0, standard code),
//! applies an edit at a position and reports:
//!
//! | Field | Meaning |
//! |-------|---------|
//! | `frameshift` | length change is not a multiple of 3 |
//! | `premature_stop` | the edited protein stops earlier than the original |
//! | `changes` | residue-level differences, e.g. `Q3*` |
//!
//! [`indel_scan`] tabulates the outcome of every +/-1 to 3 bp indel at one
//! position.

pub mod simulate;
pub mod translate;

pub use simulate::{
    diff_proteins, indel_scan, locate_guide, simulate_edit, EditKind, EditOutcome,
    IndelOutcome, ResidueChange,
};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("Edit position {position} is outside the {length} bp sequence")]
    PositionOutOfRange { position: usize, length: usize },

    #[error("Substitution expects '{expected}' at position {position} but found '{found}'")]
    SubstitutionMismatch {
        position: usize,
        expected: char,
        found: char,
    },

    #[error("Guide {0} not found on either strand of the target")]
    GuideNotFound(String),

    #[error("Unrecognized edit '{0}' (expected del<N>, ins-<BASES> or sub:<FROM>><TO>)")]
    InvalidEdit(String),
}
