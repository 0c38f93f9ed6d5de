//! Command-line interface for crispr-lab.
//!
//! This module implements the CLI using clap. Available commands:
//!
//! - **design**: Find, score and rank guides for a target sequence
//! - **offtarget**: Search a background for near matches of one guide
//! - **index**: Build a k-mer seed index over a background FASTA
//! - **simulate**: Predict the protein-level effect of an edit at a cut site
//!
//! ## Usage
//!
//! ```text
//! # Rank Cas9 guides for an exon, checking off-targets against a genome
//! crispr-lab design exon.fa --background genome.fa.gz
//!
//! # Build the index once, then reuse it
//! crispr-lab index genome.fa.gz -o genome.idx
//! crispr-lab design exon.fa --index genome.idx --max-mismatches 3
//!
//! # Pasted sequence from stdin, CSV output
//! echo ATGGCTAGCTAGG... | crispr-lab design - --format csv
//!
//! # What does a 1 bp deletion at this guide's cut site do?
//! crispr-lab simulate cds.fa --guide ACTGACTTACAGATCATCAT --edit del1
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use crate::core::sequence::{Alphabet, Sequence};
use crate::offtarget::{CorpusIndex, DirectScan, OffTargetSearcher, ReferenceCorpus};
use crate::parsing::read_sequences;
use crate::utils::validation::check_target_length;

pub mod design;
pub mod index;
pub mod offtarget;
pub mod simulate;

#[derive(Parser)]
#[command(name = "crispr-lab")]
#[command(version)]
#[command(about = "Design and evaluate CRISPR guide RNAs")]
#[command(
    long_about = "crispr-lab finds candidate protospacers next to a PAM in a target sequence and ranks them.\n\nFor each candidate it reports:\n- An on-target efficiency score from GC content, homopolymer runs and position-specific base preferences\n- Off-target sites within a mismatch limit in a background sequence set\n- A composite score combining both, used for ranking"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Find, score and rank guides for a target sequence
    Design(design::DesignArgs),

    /// Search a background for off-target sites of one guide
    Offtarget(offtarget::OffTargetArgs),

    /// Build a seed index over a background FASTA
    Index(index::IndexArgs),

    /// Simulate the protein-level effect of an edit
    Simulate(simulate::SimulateArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Tsv,
    Csv,
}

impl OutputFormat {
    /// Field separator for delimited formats
    #[must_use]
    pub fn separator(self) -> Option<char> {
        match self {
            Self::Tsv => Some('\t'),
            Self::Csv => Some(','),
            Self::Text | Self::Json => None,
        }
    }
}

/// Join fields with `sep`, quoting CSV fields that need it
pub(crate) fn delimited_row<S: AsRef<str>>(fields: &[S], sep: char) -> String {
    fields
        .iter()
        .map(|f| {
            let f = f.as_ref();
            if sep == ',' && (f.contains(',') || f.contains('"')) {
                format!("\"{}\"", f.replace('"', "\"\""))
            } else {
                f.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(&sep.to_string())
}

/// Read design targets (strict ACGT) and enforce the total length limit
pub(crate) fn load_targets(path: &Path) -> anyhow::Result<Vec<Sequence>> {
    let targets = read_sequences(path, Alphabet::Strict)
        .with_context(|| format!("Failed to read target {}", path.display()))?;
    check_target_length(targets.iter().map(Sequence::len).sum())?;
    info!("Read {} target sequence(s)", targets.len());
    Ok(targets)
}

/// Where off-target searches run
pub(crate) enum Background {
    Corpus(ReferenceCorpus),
    Index(Box<CorpusIndex>),
}

impl Background {
    /// Load a background FASTA or a saved index; `None` when neither is given.
    ///
    /// `extra` sequences (the design targets, with `--include-target`) are added
    /// to a FASTA background, or form the whole background when none is given.
    pub fn load(
        fasta: Option<&PathBuf>,
        index: Option<&PathBuf>,
        extra: &[Sequence],
    ) -> anyhow::Result<Option<Self>> {
        if let Some(path) = index {
            let index = CorpusIndex::load(path)
                .with_context(|| format!("Failed to load index {}", path.display()))?;
            if !extra.is_empty() {
                warn!("Saved indexes are immutable; targets are not added to the background");
            }
            return Ok(Some(Self::Index(Box::new(index))));
        }

        let mut corpus = match fasta {
            Some(path) => ReferenceCorpus::new(
                read_sequences(path, Alphabet::Reference)
                    .with_context(|| format!("Failed to read background {}", path.display()))?,
            ),
            None if extra.is_empty() => return Ok(None),
            None => ReferenceCorpus::default(),
        };
        for sequence in extra {
            if !corpus.add(sequence.clone()) {
                warn!(
                    "Background already has a sequence named '{}'; target not added",
                    sequence.name
                );
            }
        }

        info!(
            "Background: {} sequence(s), {} bp",
            corpus.len(),
            corpus.total_bases()
        );
        Ok(Some(Self::Corpus(corpus)))
    }

    /// Run `f` with a searcher over this background
    pub fn with_searcher<R>(&self, f: impl FnOnce(&dyn OffTargetSearcher) -> R) -> R {
        match self {
            Self::Corpus(corpus) => f(&DirectScan::new(corpus)),
            Self::Index(index) => f(index.as_ref()),
        }
    }
}
