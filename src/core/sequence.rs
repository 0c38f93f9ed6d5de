//! Validated nucleotide sequences.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Malformed sequence text
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidSequenceError {
    #[error("Sequence '{0}' is empty")]
    Empty(String),

    #[error("Sequence '{name}' contains unrecognized symbol '{symbol}' at position {position}")]
    InvalidSymbol {
        name: String,
        symbol: char,
        position: usize,
    },
}

/// Which symbols a sequence may contain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alphabet {
    /// A, C, G, T only. Used for design targets.
    Strict,
    /// A, C, G, T and N. Used for reference corpora, which commonly carry masked bases.
    Reference,
}

impl Alphabet {
    fn accepts(self, base: u8) -> bool {
        match self {
            Self::Strict => matches!(base, b'A' | b'C' | b'G' | b'T'),
            Self::Reference => matches!(base, b'A' | b'C' | b'G' | b'T' | b'N'),
        }
    }
}

/// A named, uppercase nucleotide sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    pub name: String,
    bases: Vec<u8>,
}

impl Sequence {
    /// Parse a design target. Case-insensitive, whitespace is stripped.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSequenceError` if the text is empty after stripping or
    /// contains anything other than A, C, G or T.
    pub fn parse(name: impl Into<String>, text: &str) -> Result<Self, InvalidSequenceError> {
        Self::from_bytes(name, text.as_bytes(), Alphabet::Strict)
    }

    /// Parse a reference sequence, which may additionally contain `N`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSequenceError` on empty input or unrecognized symbols.
    pub fn parse_reference(
        name: impl Into<String>,
        text: &str,
    ) -> Result<Self, InvalidSequenceError> {
        Self::from_bytes(name, text.as_bytes(), Alphabet::Reference)
    }

    /// Build a sequence from raw bytes under the given alphabet.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSequenceError` on empty input or unrecognized symbols.
    pub fn from_bytes(
        name: impl Into<String>,
        raw: &[u8],
        alphabet: Alphabet,
    ) -> Result<Self, InvalidSequenceError> {
        let name = name.into();
        let mut bases = Vec::with_capacity(raw.len());

        for &byte in raw {
            if byte.is_ascii_whitespace() {
                continue;
            }
            let base = byte.to_ascii_uppercase();
            if !alphabet.accepts(base) {
                return Err(InvalidSequenceError::InvalidSymbol {
                    name,
                    symbol: char::from(byte),
                    position: bases.len(),
                });
            }
            bases.push(base);
        }

        if bases.is_empty() {
            return Err(InvalidSequenceError::Empty(name));
        }

        Ok(Self { name, bases })
    }

    #[must_use]
    pub fn bases(&self) -> &[u8] {
        &self.bases
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bases.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }

    /// The sequence as text
    #[must_use]
    pub fn as_str(&self) -> &str {
        // Only ASCII nucleotides are ever stored
        std::str::from_utf8(&self.bases).unwrap_or_default()
    }

    /// Reverse complement of the whole sequence
    #[must_use]
    pub fn reverse_complement(&self) -> Self {
        Self {
            name: self.name.clone(),
            bases: reverse_complement(&self.bases),
        }
    }

    /// Fraction of G and C bases
    #[must_use]
    pub fn gc_fraction(&self) -> f64 {
        gc_fraction(&self.bases)
    }
}

impl std::fmt::Display for Sequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Watson-Crick complement. Anything outside ACGT maps to N.
#[inline]
#[must_use]
pub fn complement(base: u8) -> u8 {
    match base {
        b'A' => b'T',
        b'C' => b'G',
        b'G' => b'C',
        b'T' => b'A',
        _ => b'N',
    }
}

#[must_use]
pub fn reverse_complement(bases: &[u8]) -> Vec<u8> {
    bases.iter().rev().map(|&b| complement(b)).collect()
}

/// Fraction of G/C in `bases`; 0.0 for an empty slice
#[must_use]
pub fn gc_fraction(bases: &[u8]) -> f64 {
    if bases.is_empty() {
        return 0.0;
    }
    let gc = bases.iter().filter(|&&b| b == b'G' || b == b'C').count();
    #[allow(clippy::cast_precision_loss)]
    {
        gc as f64 / bases.len() as f64
    }
}

/// Length of the longest run of a single repeated base
#[must_use]
pub fn longest_homopolymer(bases: &[u8]) -> usize {
    let mut longest = 0;
    let mut current = 0;
    let mut previous = None;

    for &b in bases {
        if Some(b) == previous {
            current += 1;
        } else {
            current = 1;
            previous = Some(b);
        }
        longest = longest.max(current);
    }

    longest
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strips_whitespace_and_uppercases() {
        let seq = Sequence::parse("t", " acgt\nAC GT\t").unwrap();
        assert_eq!(seq.as_str(), "ACGTACGT");
        assert_eq!(seq.len(), 8);
    }

    #[test]
    fn test_parse_rejects_unknown_symbol() {
        let err = Sequence::parse("t", "ACGTXACGT").unwrap_err();
        assert_eq!(
            err,
            InvalidSequenceError::InvalidSymbol {
                name: "t".to_string(),
                symbol: 'X',
                position: 4,
            }
        );
    }

    #[test]
    fn test_parse_rejects_n_in_target() {
        assert!(Sequence::parse("t", "ACGTN").is_err());
        assert!(Sequence::parse_reference("r", "ACGTN").is_ok());
    }

    #[test]
    fn test_parse_empty() {
        assert!(matches!(
            Sequence::parse("t", "  \n "),
            Err(InvalidSequenceError::Empty(_))
        ));
    }

    #[test]
    fn test_position_counts_stripped_bases() {
        let err = Sequence::parse("t", "AC GT\nU").unwrap_err();
        match err {
            InvalidSequenceError::InvalidSymbol { position, .. } => assert_eq!(position, 4),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_reverse_complement() {
        assert_eq!(reverse_complement(b"AACGTT"), b"AACGTT".to_vec());
        assert_eq!(reverse_complement(b"AAGC"), b"GCTT".to_vec());
        let seq = Sequence::parse("t", "ATGC").unwrap();
        assert_eq!(seq.reverse_complement().as_str(), "GCAT");
    }

    #[test]
    fn test_gc_fraction() {
        assert!((gc_fraction(b"GGCC") - 1.0).abs() < 1e-12);
        assert!((gc_fraction(b"ATGC") - 0.5).abs() < 1e-12);
        assert!(gc_fraction(b"").abs() < 1e-12);
    }

    #[test]
    fn test_longest_homopolymer() {
        assert_eq!(longest_homopolymer(b"ACGT"), 1);
        assert_eq!(longest_homopolymer(b"AAAACG"), 4);
        assert_eq!(longest_homopolymer(b"ACGTTTTTG"), 5);
        assert_eq!(longest_homopolymer(b""), 0);
    }
}
