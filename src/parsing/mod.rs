//! Readers for target and background sequences.
//!
//! Input can be:
//!
//! - **FASTA files** (`.fa`, `.fasta`, `.fna`, optionally `.gz`/`.bgz`): one
//!   sequence per record, parsed with noodles
//! - **Raw sequence text** (`.txt` or anything else): the whole file is one
//!   sequence, whitespace and line breaks ignored
//! - **stdin** (`-`): FASTA if the first non-blank character is `>`,
//!   raw text otherwise
//!
//! ## Example
//!
//! ```rust,no_run
//! use crispr_lab::core::sequence::Alphabet;
//! use crispr_lab::parsing::{parse_text, read_sequences};
//! use std::path::Path;
//!
//! let targets = read_sequences(Path::new("exon.fa"), Alphabet::Strict).unwrap();
//! let pasted = parse_text(b"ATGGCTAGC TAGGACTGA", "pasted", Alphabet::Strict).unwrap();
//! ```

pub mod fasta;

use std::io::Read;
use std::path::Path;

use flate2::read::MultiGzDecoder;
use thiserror::Error;

use crate::core::sequence::{Alphabet, InvalidSequenceError, Sequence};
use crate::utils::validation::{validate_text_content, ValidationError, MAX_RAW_TEXT_BYTES};

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid sequence input: {0}")]
    InvalidFormat(String),

    #[error("noodles error: {0}")]
    Noodles(String),

    #[error(transparent)]
    InvalidSequence(#[from] InvalidSequenceError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Duplicate sequence name: {0}")]
    DuplicateName(String),

    #[error("Too many sequences: {0} exceeds maximum allowed (100000)")]
    TooManySequences(usize),
}

/// Read sequences from a path, or from stdin when the path is `-`.
///
/// # Errors
///
/// Returns `ParseError` if the input cannot be read or holds no valid sequence.
pub fn read_sequences(path: &Path, alphabet: Alphabet) -> Result<Vec<Sequence>, ParseError> {
    if path == Path::new("-") {
        let mut content = Vec::new();
        std::io::stdin()
            .take(MAX_RAW_TEXT_BYTES as u64 + 1)
            .read_to_end(&mut content)?;
        return parse_text(&content, "stdin", alphabet);
    }

    if fasta::is_fasta_file(path) {
        return fasta::read_fasta(path, alphabet);
    }

    let mut content = Vec::new();
    let file = std::fs::File::open(path)?;
    if fasta::is_gzipped(path) {
        MultiGzDecoder::new(file)
            .take(MAX_RAW_TEXT_BYTES as u64 + 1)
            .read_to_end(&mut content)?;
    } else {
        file.take(MAX_RAW_TEXT_BYTES as u64 + 1)
            .read_to_end(&mut content)?;
    }

    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.split('.').next())
        .filter(|n| !n.is_empty())
        .unwrap_or("input");
    parse_text(&content, name, alphabet)
}

/// Parse pasted or file text: FASTA when it starts with `>`, otherwise a
/// single raw sequence called `name`.
///
/// # Errors
///
/// Returns `ParseError::Validation` for empty or binary content, and
/// `ParseError::InvalidSequence` for symbols outside `alphabet`.
pub fn parse_text(content: &[u8], name: &str, alphabet: Alphabet) -> Result<Vec<Sequence>, ParseError> {
    validate_text_content(content)?;

    // noodles rejects blank lines ahead of the first record
    let start = content
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(content.len());
    if content.get(start) == Some(&b'>') {
        return fasta::parse_fasta_text(&content[start..], alphabet);
    }

    Ok(vec![Sequence::from_bytes(name, content, alphabet)?])
}
