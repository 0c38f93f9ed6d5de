//! Translation of coding DNA with the standard genetic code.

/// Amino acids for codons in TCAG order (`TTT`, `TTC`, `TTA`, `TTG`, `TCT`, ...)
const STANDARD_CODE: &[u8; 64] =
    b"FFLLSSSSYY**CC*WLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG";

/// Residue written for a translation stop
pub const STOP: char = '*';

/// Residue written for a codon with a non-ACGT base
pub const UNKNOWN: char = 'X';

fn tcag_index(base: u8) -> Option<usize> {
    match base {
        b'T' => Some(0),
        b'C' => Some(1),
        b'A' => Some(2),
        b'G' => Some(3),
        _ => None,
    }
}

/// Amino acid for one codon
#[must_use]
pub fn translate_codon(codon: &[u8]) -> char {
    let [a, b, c] = codon else {
        return UNKNOWN;
    };
    match (tcag_index(*a), tcag_index(*b), tcag_index(*c)) {
        (Some(a), Some(b), Some(c)) => char::from(STANDARD_CODE[a * 16 + b * 4 + c]),
        _ => UNKNOWN,
    }
}

/// Translate from the first base in frame 0. Stops are written as `*` and
/// translation continues past them; a trailing partial codon is dropped.
#[must_use]
pub fn translate(bases: &[u8]) -> String {
    bases.chunks_exact(3).map(translate_codon).collect()
}

/// Offset of the first stop codon in a protein
#[must_use]
pub fn first_stop(protein: &str) -> Option<usize> {
    protein.find(STOP)
}
