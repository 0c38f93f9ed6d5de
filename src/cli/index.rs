use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use tracing::info;

use crate::cli::{delimited_row, OutputFormat};
use crate::core::sequence::Alphabet;
use crate::offtarget::index::DEFAULT_KMER_SIZE;
use crate::offtarget::{CorpusIndex, ReferenceCorpus};
use crate::parsing::read_sequences;

#[derive(Args)]
pub struct IndexArgs {
    /// Background FASTA (optionally gzipped)
    #[arg(required = true)]
    pub fasta: PathBuf,

    /// Output index file
    #[arg(short, long, required = true)]
    pub output: PathBuf,

    /// Seed (k-mer) length
    #[arg(short = 'k', long, default_value_t = DEFAULT_KMER_SIZE)]
    pub kmer_size: usize,
}

/// Execute index subcommand
///
/// # Errors
///
/// Returns an error if the FASTA cannot be read, the k-mer size is invalid,
/// or the index cannot be written.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: IndexArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let sequences = read_sequences(&args.fasta, Alphabet::Reference)
        .with_context(|| format!("Failed to read background {}", args.fasta.display()))?;
    let corpus = ReferenceCorpus::new(sequences);
    let sequence_count = corpus.len();
    let total_bases = corpus.total_bases();

    if verbose {
        eprintln!(
            "Indexing {} sequence(s), {} bp with k={}",
            sequence_count, total_bases, args.kmer_size
        );
    }

    let index = CorpusIndex::build(corpus, args.kmer_size)?;
    index
        .save(&args.output)
        .with_context(|| format!("Failed to write index {}", args.output.display()))?;
    info!("Wrote index to {}", args.output.display());

    match format {
        OutputFormat::Text => {
            println!("Index written to {}", args.output.display());
            println!("   Sequences:    {sequence_count}");
            println!("   Bases:        {total_bases}");
            println!("   k:            {}", index.kmer_size());
            println!("   Distinct k-mers: {}", index.distinct_kmers());
            println!("   Fingerprint:  {}", index.fingerprint);
            println!("   Created:      {}", index.created_at);
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "path": args.output,
                "sequences": sequence_count,
                "bases": total_bases,
                "kmer_size": index.kmer_size(),
                "distinct_kmers": index.distinct_kmers(),
                "fingerprint": index.fingerprint,
                "created_at": index.created_at,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Tsv | OutputFormat::Csv => {
            let sep = format.separator().unwrap_or('\t');
            println!(
                "{}",
                delimited_row(
                    &["path", "sequences", "bases", "kmer_size", "distinct_kmers", "fingerprint", "created_at"],
                    sep
                )
            );
            let fields = [
                args.output.display().to_string(),
                sequence_count.to_string(),
                total_bases.to_string(),
                index.kmer_size().to_string(),
                index.distinct_kmers().to_string(),
                index.fingerprint.clone(),
                index.created_at.clone(),
            ];
            println!("{}", delimited_row(&fields, sep));
        }
    }

    Ok(())
}
