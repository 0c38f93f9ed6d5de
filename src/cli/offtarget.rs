use std::path::PathBuf;

use clap::Args;

use crate::cli::{delimited_row, Background, OutputFormat};
use crate::core::pam::{PamPattern, PamSide};
use crate::core::score::{OffTargetHit, OffTargetResult};
use crate::core::sequence::{reverse_complement, Sequence};
use crate::core::types::{Nuclease, Strand};
use crate::offtarget::{OffTargetConfig, OffTargetQuery, ReferenceCorpus};

#[derive(Args)]
pub struct OffTargetArgs {
    /// Guide (protospacer) sequence, 5' to 3'
    #[arg(required = true)]
    pub guide: String,

    /// Background FASTA to search
    #[arg(long, conflicts_with = "index", required_unless_present = "index")]
    pub background: Option<PathBuf>,

    /// Pre-built background index (see `crispr-lab index`)
    #[arg(long)]
    pub index: Option<PathBuf>,

    /// Nuclease whose PAM orients mismatch offsets and `--require-pam`
    #[arg(long, value_enum, default_value = "cas9-ngg")]
    pub nuclease: Nuclease,

    /// Custom PAM motif overriding the nuclease's
    #[arg(long)]
    pub pam: Option<String>,

    /// Side of the protospacer the custom PAM sits on
    #[arg(long, value_enum, requires = "pam")]
    pub pam_side: Option<PamSide>,

    /// Maximum mismatches for a hit (0-4)
    #[arg(long, default_value = "2", value_parser = clap::value_parser!(u8).range(0..=4))]
    pub max_mismatches: u8,

    /// Stop after this many hits
    #[arg(long, default_value = "100")]
    pub max_hits: usize,

    /// Search time limit in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Only count sites that sit next to a PAM
    #[arg(long)]
    pub require_pam: bool,
}

/// Execute offtarget subcommand
///
/// # Errors
///
/// Returns an error if the guide is not a valid sequence or the background
/// cannot be loaded.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: OffTargetArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let guide = Sequence::parse("guide", &args.guide)?;
    let pam = match &args.pam {
        Some(motif) => PamPattern::parse(
            motif,
            args.pam_side.unwrap_or_else(|| args.nuclease.pam().side()),
        )?,
        None => args.nuclease.pam(),
    };

    let config = OffTargetConfig {
        max_mismatches: usize::from(args.max_mismatches),
        max_hits: args.max_hits,
        timeout_ms: args.timeout_ms,
        require_pam: args.require_pam,
    };
    config.validate()?;

    let background = Background::load(args.background.as_ref(), args.index.as_ref(), &[])?
        .ok_or_else(|| anyhow::anyhow!("--background or --index is required"))?;

    let query = OffTargetQuery::new(guide.bases(), pam.side()).with_pam(&pam);
    let budget = config.budget(None);

    let (result, strategy) = background.with_searcher(|searcher| {
        let strategy = searcher.strategy(guide.len(), config.max_mismatches);
        (searcher.search(&query, &config, &budget), strategy)
    });

    if verbose {
        eprintln!(
            "Searched for {} with <= {} mismatches by {}",
            guide, config.max_mismatches, strategy
        );
    }

    let sites: Vec<String> = background.with_searcher(|searcher| {
        result
            .hits
            .iter()
            .map(|hit| site_bases(searcher.corpus(), hit, guide.len()))
            .collect()
    });

    match format {
        OutputFormat::Text => print_text(&guide, &result, &sites, config.max_mismatches),
        OutputFormat::Json => print_json(&guide, &pam, &result, &sites, &config)?,
        OutputFormat::Tsv | OutputFormat::Csv => {
            print_delimited(&result, &sites, format.separator().unwrap_or('\t'));
        }
    }

    Ok(())
}

/// Bases of a hit's window read on the hit strand
fn site_bases(corpus: &ReferenceCorpus, hit: &OffTargetHit, len: usize) -> String {
    let window = corpus
        .sequences
        .get(hit.sequence_index)
        .and_then(|s| s.bases().get(hit.position..hit.position + len))
        .unwrap_or_default();
    let bases = match hit.strand {
        Strand::Forward => window.to_vec(),
        Strand::Reverse => reverse_complement(window),
    };
    String::from_utf8_lossy(&bases).into_owned()
}

/// Site bases with matches lower-cased so mismatches stand out
fn highlight(guide: &Sequence, site: &str) -> String {
    site.chars()
        .zip(guide.as_str().chars())
        .map(|(s, g)| if s == g { s.to_ascii_lowercase() } else { s })
        .collect()
}

fn print_text(guide: &Sequence, result: &OffTargetResult, sites: &[String], max_mismatches: usize) {
    println!("Guide: {guide}");
    println!(
        "Off-targets: {} [{}], penalty {:.3}",
        result.hits.len(),
        result.status,
        result.penalty()
    );

    let histogram = result.mismatch_histogram(max_mismatches);
    for (mm, n) in histogram.iter().enumerate() {
        println!("   {mm} mismatch(es): {n}");
    }

    if !result.hits.is_empty() {
        println!();
    }
    for (hit, site) in result.hits.iter().zip(sites) {
        println!(
            "   {}:{}({})  {}  {} mm{}",
            hit.sequence_name,
            hit.position + 1,
            hit.strand,
            highlight(guide, site),
            hit.mismatches,
            if hit.mismatch_offsets.is_empty() {
                String::new()
            } else {
                format!(
                    " at {} from PAM",
                    hit.mismatch_offsets
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(",")
                )
            }
        );
    }
}

fn print_json(
    guide: &Sequence,
    pam: &PamPattern,
    result: &OffTargetResult,
    sites: &[String],
    config: &OffTargetConfig,
) -> anyhow::Result<()> {
    let hits: Vec<serde_json::Value> = result
        .hits
        .iter()
        .zip(sites)
        .map(|(hit, site)| {
            serde_json::json!({
                "sequence": hit.sequence_name,
                "position": hit.position,
                "strand": hit.strand,
                "mismatches": hit.mismatches,
                "mismatch_offsets": hit.mismatch_offsets,
                "site": site,
                "penalty": hit.penalty(),
            })
        })
        .collect();

    let output = serde_json::json!({
        "guide": guide.as_str(),
        "pam": pam.motif(),
        "pam_side": pam.side(),
        "max_mismatches": config.max_mismatches,
        "require_pam": config.require_pam,
        "status": result.status,
        "penalty": result.penalty(),
        "by_mismatches": result.mismatch_histogram(config.max_mismatches),
        "hits": hits,
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_delimited(result: &OffTargetResult, sites: &[String], sep: char) {
    println!(
        "{}",
        delimited_row(
            &[
                "sequence",
                "position",
                "strand",
                "site",
                "mismatches",
                "mismatch_offsets",
                "penalty",
                "status",
            ],
            sep
        )
    );
    for (hit, site) in result.hits.iter().zip(sites) {
        let offsets = hit
            .mismatch_offsets
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(";");
        let fields = [
            hit.sequence_name.clone(),
            hit.position.to_string(),
            hit.strand.to_string(),
            site.clone(),
            hit.mismatches.to_string(),
            offsets,
            format!("{:.4}", hit.penalty()),
            result.status.to_string(),
        ];
        println!("{}", delimited_row(&fields, sep));
    }
}
