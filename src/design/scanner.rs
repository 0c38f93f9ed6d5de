//! Lazy enumeration of candidate protospacers on both strands.

use crate::core::candidate::Candidate;
use crate::core::pam::{PamPattern, PamSide};
use crate::core::sequence::{reverse_complement, Sequence};
use crate::core::types::Strand;

/// Forward-strand range `[start, end)` of the PAM for a protospacer starting at `start`
pub(crate) fn pam_range(
    start: usize,
    length: usize,
    pam_len: usize,
    side: PamSide,
    strand: Strand,
) -> Option<(usize, usize)> {
    let downstream = matches!(
        (side, strand),
        (PamSide::ThreePrime, Strand::Forward) | (PamSide::FivePrime, Strand::Reverse)
    );
    if downstream {
        Some((start + length, start + length + pam_len))
    } else {
        start.checked_sub(pam_len).map(|s| (s, start))
    }
}

/// Forward-strand cut coordinate for a protospacer, given the cut's distance from the PAM
#[must_use]
pub fn cut_site(
    start: usize,
    length: usize,
    side: PamSide,
    strand: Strand,
    cut_offset: usize,
) -> Option<usize> {
    if cut_offset > length {
        return None;
    }
    let pam_at_end = matches!(
        (side, strand),
        (PamSide::ThreePrime, Strand::Forward) | (PamSide::FivePrime, Strand::Reverse)
    );
    if pam_at_end {
        Some(start + length - cut_offset)
    } else {
        Some(start + cut_offset)
    }
}

/// Iterator over every PAM-adjacent protospacer window of a target.
///
/// Windows are produced left-to-right by protospacer start; at equal start
/// the forward-strand window comes first.
pub struct CandidateScanner<'a> {
    target: &'a Sequence,
    target_index: usize,
    pam: &'a PamPattern,
    length: usize,
    cut_offset: Option<usize>,
    next_start: usize,
    next_strand: Strand,
}

impl<'a> CandidateScanner<'a> {
    pub fn new(
        target: &'a Sequence,
        target_index: usize,
        pam: &'a PamPattern,
        length: usize,
        cut_offset: Option<usize>,
    ) -> Self {
        Self {
            target,
            target_index,
            pam,
            length,
            cut_offset,
            next_start: 0,
            next_strand: Strand::Forward,
        }
    }

    fn try_window(&self, start: usize, strand: Strand) -> Option<Candidate> {
        let bases = self.target.bases();
        let (pam_start, pam_end) =
            pam_range(start, self.length, self.pam.len(), self.pam.side(), strand)?;
        if pam_end > bases.len() {
            return None;
        }

        let pam_forward = &bases[pam_start..pam_end];
        let proto_forward = &bases[start..start + self.length];

        let (pam, protospacer) = match strand {
            Strand::Forward => (pam_forward.to_vec(), proto_forward.to_vec()),
            Strand::Reverse => (
                reverse_complement(pam_forward),
                reverse_complement(proto_forward),
            ),
        };

        if !self.pam.matches(&pam) {
            return None;
        }

        Some(Candidate {
            target_index: self.target_index,
            target_name: self.target.name.clone(),
            start,
            length: self.length,
            strand,
            protospacer: String::from_utf8_lossy(&protospacer).into_owned(),
            pam: String::from_utf8_lossy(&pam).into_owned(),
            pam_start,
            pam_side: self.pam.side(),
            cut_site: self
                .cut_offset
                .and_then(|off| cut_site(start, self.length, self.pam.side(), strand, off)),
        })
    }
}

impl Iterator for CandidateScanner<'_> {
    type Item = Candidate;

    fn next(&mut self) -> Option<Candidate> {
        if self.length == 0 || self.pam.is_empty() {
            return None;
        }

        while self.next_start + self.length <= self.target.len() {
            let start = self.next_start;
            let strand = self.next_strand;

            match strand {
                Strand::Forward => self.next_strand = Strand::Reverse,
                Strand::Reverse => {
                    self.next_strand = Strand::Forward;
                    self.next_start += 1;
                }
            }

            if let Some(candidate) = self.try_window(start, strand) {
                return Some(candidate);
            }
        }

        None
    }
}
