use serde::{Deserialize, Serialize};

use crate::core::pam::PamSide;
use crate::core::sequence::gc_fraction;
use crate::core::types::Strand;

/// A protospacer window next to a PAM match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Index of the target sequence this window came from
    pub target_index: usize,

    /// Name of the target sequence
    pub target_name: String,

    /// Leftmost forward-strand coordinate of the protospacer (0-based)
    pub start: usize,

    /// Protospacer length
    pub length: usize,

    pub strand: Strand,

    /// Protospacer bases, 5'->3' on `strand`
    pub protospacer: String,

    /// PAM bases as matched, 5'->3' on `strand`
    pub pam: String,

    /// Leftmost forward-strand coordinate of the PAM
    pub pam_start: usize,

    /// Which side of the protospacer the PAM sits on
    pub pam_side: PamSide,

    /// Forward-strand coordinate the nuclease cuts before, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cut_site: Option<usize>,
}

impl Candidate {
    /// One past the last forward-strand coordinate of the protospacer
    #[must_use]
    pub fn end(&self) -> usize {
        self.start + self.length
    }

    #[must_use]
    pub fn protospacer_bases(&self) -> &[u8] {
        self.protospacer.as_bytes()
    }

    #[must_use]
    pub fn gc_fraction(&self) -> f64 {
        gc_fraction(self.protospacer_bases())
    }

    /// Protospacer bases reordered so index 0 is the base next to the PAM
    #[must_use]
    pub fn pam_proximal_bases(&self) -> Vec<u8> {
        pam_proximal_order(self.protospacer_bases(), self.pam_side)
    }

    /// Protospacer with its PAM, both 5'->3' on the candidate's strand
    #[must_use]
    pub fn full_site(&self) -> String {
        match self.pam_side {
            PamSide::ThreePrime => format!("{}{}", self.protospacer, self.pam),
            PamSide::FivePrime => format!("{}{}", self.pam, self.protospacer),
        }
    }
}

/// Reorder a guide so that index 0 is adjacent to the PAM
#[must_use]
pub fn pam_proximal_order(guide: &[u8], side: PamSide) -> Vec<u8> {
    match side {
        PamSide::ThreePrime => guide.iter().rev().copied().collect(),
        PamSide::FivePrime => guide.to_vec(),
    }
}

/// Distance of guide offset `offset` from the PAM-proximal end
#[must_use]
pub fn offset_from_pam(offset: usize, guide_len: usize, side: PamSide) -> usize {
    match side {
        PamSide::ThreePrime => guide_len - 1 - offset,
        PamSide::FivePrime => offset,
    }
}
