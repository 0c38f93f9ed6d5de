//! Parser for FASTA files using noodles.
//!
//! Reads named sequences from FASTA files for design targets and reference
//! corpora. Supports both uncompressed and gzip/bgzip compressed files.
//!
//! Supported extensions:
//! - `.fa`, `.fasta`, `.fna` (uncompressed)
//! - `.fa.gz`, `.fasta.gz`, `.fna.gz` (gzip compressed)
//! - `.fa.bgz`, `.fasta.bgz`, `.fna.bgz` (bgzip compressed)

use std::collections::HashSet;
use std::ffi::OsStr;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use noodles_fasta as fasta;
use tracing::debug;

use crate::core::sequence::{Alphabet, Sequence};
use crate::parsing::ParseError;
use crate::utils::validation::check_sequence_limit;

/// Check if the path has a FASTA extension
pub fn is_fasta_file(path: &Path) -> bool {
    let path_str = path.to_string_lossy().to_lowercase();

    // Check for gzipped FASTA
    if path_str.ends_with(".fa.gz")
        || path_str.ends_with(".fasta.gz")
        || path_str.ends_with(".fna.gz")
        || path_str.ends_with(".fa.bgz")
        || path_str.ends_with(".fasta.bgz")
        || path_str.ends_with(".fna.bgz")
    {
        return true;
    }

    // Check for uncompressed FASTA
    matches!(
        path.extension()
            .and_then(OsStr::to_str)
            .map(str::to_lowercase)
            .as_deref(),
        Some("fa" | "fasta" | "fna")
    )
}

/// Check if the path is a gzipped file
#[allow(clippy::case_sensitive_file_extension_comparisons)] // Already lowercased
pub(crate) fn is_gzipped(path: &Path) -> bool {
    let path_str = path.to_string_lossy().to_lowercase();
    path_str.ends_with(".gz") || path_str.ends_with(".bgz")
}

/// Read every record of a FASTA file as a validated sequence.
///
/// Record names are the first word of the definition line.
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read, `ParseError::Noodles` if
/// parsing fails, `ParseError::InvalidSequence` if a record holds symbols
/// outside `alphabet`, `ParseError::InvalidFormat` if no records are found, or
/// `ParseError::TooManySequences` if the limit is exceeded.
pub fn read_fasta(path: &Path, alphabet: Alphabet) -> Result<Vec<Sequence>, ParseError> {
    let file = std::fs::File::open(path)?;
    if is_gzipped(path) {
        let decoder = MultiGzDecoder::new(file);
        read_fasta_records(BufReader::new(decoder), alphabet)
    } else {
        read_fasta_records(BufReader::new(file), alphabet)
    }
}

/// Parse FASTA records held in memory.
///
/// # Errors
///
/// Same as [`read_fasta`], minus file I/O.
pub fn parse_fasta_text(text: &[u8], alphabet: Alphabet) -> Result<Vec<Sequence>, ParseError> {
    read_fasta_records(text, alphabet)
}

/// Parse from any buffered FASTA source
fn read_fasta_records<R: BufRead>(
    inner: R,
    alphabet: Alphabet,
) -> Result<Vec<Sequence>, ParseError> {
    let mut reader = fasta::io::Reader::new(inner);
    let mut sequences: Vec<Sequence> = Vec::new();
    let mut names = HashSet::new();

    for result in reader.records() {
        let record = result
            .map_err(|e| ParseError::Noodles(format!("Failed to parse FASTA record: {e}")))?;

        // Check sequence limit for DOS protection
        if check_sequence_limit(sequences.len()).is_some() {
            return Err(ParseError::TooManySequences(sequences.len()));
        }

        let name = String::from_utf8_lossy(record.name()).to_string();
        if !names.insert(name.clone()) {
            return Err(ParseError::DuplicateName(name));
        }

        let sequence = Sequence::from_bytes(name, record.sequence().as_ref(), alphabet)?;
        debug!("Read {} ({} bp)", sequence.name, sequence.len());
        sequences.push(sequence);
    }

    if sequences.is_empty() {
        return Err(ParseError::InvalidFormat(
            "No sequences found in FASTA input".to_string(),
        ));
    }

    Ok(sequences)
}
