//! Protospacer-adjacent motif patterns with IUPAC wildcards.

use serde::{Deserialize, Serialize};

use crate::core::sequence::InvalidSequenceError;

/// Which end of the protospacer the PAM is found on (5'->3' on the guide's strand)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PamSide {
    /// PAM follows the protospacer (Cas9)
    ThreePrime,
    /// PAM precedes the protospacer (Cas12a)
    FivePrime,
}

/// A PAM motif such as `NGG` or `TTTV`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PamPattern {
    motif: String,
    side: PamSide,
}

/// Does IUPAC code `code` admit nucleotide `base`?
#[must_use]
pub fn iupac_matches(code: u8, base: u8) -> bool {
    match code {
        b'A' | b'C' | b'G' | b'T' => code == base,
        b'N' => matches!(base, b'A' | b'C' | b'G' | b'T'),
        b'R' => matches!(base, b'A' | b'G'),
        b'Y' => matches!(base, b'C' | b'T'),
        b'S' => matches!(base, b'C' | b'G'),
        b'W' => matches!(base, b'A' | b'T'),
        b'K' => matches!(base, b'G' | b'T'),
        b'M' => matches!(base, b'A' | b'C'),
        b'B' => matches!(base, b'C' | b'G' | b'T'),
        b'D' => matches!(base, b'A' | b'G' | b'T'),
        b'H' => matches!(base, b'A' | b'C' | b'T'),
        b'V' => matches!(base, b'A' | b'C' | b'G'),
        _ => false,
    }
}

fn is_iupac(code: u8) -> bool {
    b"ACGTNRYSWKMBDHV".contains(&code)
}

impl PamPattern {
    /// Parse a PAM motif.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSequenceError` if the motif is empty or contains a
    /// character that is not an IUPAC nucleotide code.
    pub fn parse(motif: &str, side: PamSide) -> Result<Self, InvalidSequenceError> {
        let upper: String = motif
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| c.to_ascii_uppercase())
            .collect();

        if upper.is_empty() {
            return Err(InvalidSequenceError::Empty("PAM".to_string()));
        }

        if let Some((position, symbol)) = upper.bytes().enumerate().find(|(_, b)| !is_iupac(*b)) {
            return Err(InvalidSequenceError::InvalidSymbol {
                name: "PAM".to_string(),
                symbol: char::from(symbol),
                position,
            });
        }

        Ok(Self {
            motif: upper,
            side,
        })
    }

    /// Construct from a motif known to be valid uppercase IUPAC
    pub(crate) fn new_unchecked(motif: &str, side: PamSide) -> Self {
        Self {
            motif: motif.to_string(),
            side,
        }
    }

    #[must_use]
    pub fn motif(&self) -> &str {
        &self.motif
    }

    #[must_use]
    pub fn side(&self) -> PamSide {
        self.side
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.motif.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.motif.is_empty()
    }

    /// Check `bases` (5'->3' on the guide's strand) against the motif
    #[must_use]
    pub fn matches(&self, bases: &[u8]) -> bool {
        bases.len() == self.motif.len()
            && self
                .motif
                .bytes()
                .zip(bases)
                .all(|(code, &base)| iupac_matches(code, base))
    }
}

impl std::fmt::Display for PamPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.side {
            PamSide::ThreePrime => write!(f, "{} (3')", self.motif),
            PamSide::FivePrime => write!(f, "{} (5')", self.motif),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ngg_matches() {
        let pam = PamPattern::parse("ngg", PamSide::ThreePrime).unwrap();
        assert_eq!(pam.motif(), "NGG");
        assert!(pam.matches(b"AGG"));
        assert!(pam.matches(b"TGG"));
        assert!(!pam.matches(b"AGC"));
        assert!(!pam.matches(b"GG"));
    }

    #[test]
    fn test_n_does_not_match_masked_base() {
        let pam = PamPattern::parse("NGG", PamSide::ThreePrime).unwrap();
        assert!(!pam.matches(b"NGG"));
    }

    #[test]
    fn test_tttv_matches() {
        let pam = PamPattern::parse("TTTV", PamSide::FivePrime).unwrap();
        assert!(pam.matches(b"TTTA"));
        assert!(pam.matches(b"TTTG"));
        assert!(!pam.matches(b"TTTT"));
    }

    #[test]
    fn test_parse_rejects_non_iupac() {
        assert!(PamPattern::parse("NGX", PamSide::ThreePrime).is_err());
        assert!(PamPattern::parse("", PamSide::ThreePrime).is_err());
    }
}
