use std::path::PathBuf;

use clap::Args;

use crate::cli::{delimited_row, load_targets, Background, OutputFormat};
use crate::config::{DesignConfig, GcFilter};
use crate::core::pam::{PamPattern, PamSide};
use crate::core::score::ScoredCandidate;
use crate::core::sequence::Sequence;
use crate::core::types::Nuclease;
use crate::design::{DesignEngine, DesignReport};
use crate::utils::validation::gc_bound_to_fraction;

#[derive(Args)]
pub struct DesignArgs {
    /// Target sequence (FASTA, optionally gzipped, or raw sequence text)
    /// Use '-' for stdin
    #[arg(required = true)]
    pub target: PathBuf,

    /// Background FASTA searched for off-target sites
    #[arg(long, conflicts_with = "index")]
    pub background: Option<PathBuf>,

    /// Pre-built background index (see `crispr-lab index`)
    #[arg(long)]
    pub index: Option<PathBuf>,

    /// Nuclease preset (PAM, protospacer length and cut site)
    #[arg(long, value_enum)]
    pub nuclease: Option<Nuclease>,

    /// Custom PAM motif with IUPAC codes, e.g. NNGRRT
    #[arg(long)]
    pub pam: Option<String>,

    /// Side of the protospacer the custom PAM sits on
    #[arg(long, value_enum, requires = "pam")]
    pub pam_side: Option<PamSide>,

    /// Protospacer length in nt
    #[arg(short = 'l', long)]
    pub length: Option<usize>,

    /// Cut distance from the PAM in nt
    #[arg(long)]
    pub cut_offset: Option<usize>,

    /// Maximum mismatches for an off-target hit (0-4)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=4))]
    pub max_mismatches: Option<u8>,

    /// Stop recording off-targets for a guide after this many
    #[arg(long)]
    pub max_hits: Option<usize>,

    /// Per-guide off-target search time limit in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Only count off-targets that sit next to a PAM
    #[arg(long)]
    pub require_pam: bool,

    /// Drop guides below this GC content: percent when >= 1 (so 1 means 1%), else a fraction
    #[arg(long)]
    pub min_gc: Option<f64>,

    /// Drop guides above this GC content: percent when >= 1 (so 1 means 1%), else a fraction
    #[arg(long)]
    pub max_gc: Option<f64>,

    /// Also search the target itself for off-target sites
    #[arg(long)]
    pub include_target: bool,

    /// Number of guides to report
    #[arg(short = 'n', long, default_value = "20")]
    pub max_guides: usize,

    /// JSON configuration file; command-line options override it
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Execute design subcommand
///
/// # Errors
///
/// Returns an error if the inputs cannot be read, the configuration is
/// invalid, or scoring fails.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: DesignArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let config = build_config(&args)?;
    let targets = load_targets(&args.target)?;

    let extra: &[Sequence] = if args.include_target {
        targets.as_slice()
    } else {
        &[]
    };
    let background = Background::load(args.background.as_ref(), args.index.as_ref(), extra)?;

    let mut report = match &background {
        Some(background) => background.with_searcher(|searcher| {
            DesignEngine::new(config.clone())
                .with_searcher(searcher)
                .design(&targets)
        })?,
        None => DesignEngine::new(config.clone()).design(&targets)?,
    };
    report.truncate(args.max_guides);

    if verbose {
        eprintln!(
            "Scanned {} target(s): {} candidates, {} removed by GC filter",
            report.targets, report.candidates_found, report.candidates_filtered
        );
    }

    if report.candidates.is_empty() {
        eprintln!("No guides found.");
        if format != OutputFormat::Json {
            return Ok(());
        }
    }

    match format {
        OutputFormat::Text => print_text(&report, &config),
        OutputFormat::Json => print_json(&report, &config)?,
        OutputFormat::Tsv | OutputFormat::Csv => {
            print_delimited(&report, format.separator().unwrap_or('\t'));
        }
    }

    Ok(())
}

/// Merge the config file (if any) with command-line overrides
fn build_config(args: &DesignArgs) -> anyhow::Result<DesignConfig> {
    let mut config = match &args.config {
        Some(path) => DesignConfig::load_from_file(path)?,
        None => DesignConfig::default(),
    };

    if let Some(nuclease) = args.nuclease {
        config.nuclease = nuclease;
    }
    if let Some(motif) = &args.pam {
        let side = args.pam_side.unwrap_or_else(|| config.nuclease.pam().side());
        config.pam = Some(PamPattern::parse(motif, side)?);
    }
    if let Some(length) = args.length {
        config.protospacer_length = Some(length);
    }
    if let Some(offset) = args.cut_offset {
        config.cut_offset = Some(offset);
    }
    if let Some(m) = args.max_mismatches {
        config.off_target.max_mismatches = usize::from(m);
    }
    if let Some(max_hits) = args.max_hits {
        config.off_target.max_hits = max_hits;
    }
    if args.timeout_ms.is_some() {
        config.off_target.timeout_ms = args.timeout_ms;
    }
    if args.require_pam {
        config.off_target.require_pam = true;
    }
    if args.min_gc.is_some() || args.max_gc.is_some() {
        let current = config.gc_filter.unwrap_or(GcFilter { min: 0.0, max: 1.0 });
        config.gc_filter = Some(GcFilter {
            min: args.min_gc.map(gc_bound_to_fraction).transpose()?.unwrap_or(current.min),
            max: args.max_gc.map(gc_bound_to_fraction).transpose()?.unwrap_or(current.max),
        });
    }

    config.validate()?;
    Ok(config)
}

fn location(s: &ScoredCandidate) -> String {
    format!(
        "{}:{}-{}({})",
        s.candidate.target_name,
        s.candidate.start + 1,
        s.candidate.end(),
        s.candidate.strand
    )
}

fn print_text(report: &DesignReport, config: &DesignConfig) {
    let norm = config.rank.normalized();
    println!(
        "{} guides ({} PAM, {} nt, {})",
        report.candidates.len(),
        report.pam,
        report.protospacer_length,
        report.nuclease
    );
    match report.strategy {
        Some(strategy) => println!(
            "Off-targets: <= {} mismatches by {}",
            config.off_target.max_mismatches, strategy
        ),
        None => println!("Off-targets: not searched (no background)"),
    }
    println!(
        "Score = {:.0}%×on-target + {:.0}%×specificity",
        norm.on_target * 100.0,
        norm.specificity * 100.0
    );

    for (i, s) in report.candidates.iter().enumerate() {
        println!("\n#{} {} {}", i + 1, s.candidate.protospacer, s.candidate.pam);
        println!("   Location: {}", location(s));
        if let Some(cut) = s.candidate.cut_site {
            println!("   Cut site: {cut}");
        }
        println!(
            "   Score: {:.1}% (on-target {:.3}, specificity {:.3})",
            s.score.composite * 100.0,
            s.score.on_target,
            s.score.specificity
        );
        println!(
            "   GC: {:.0}%  longest run: {}  components: gc {:.2}, homopolymer {:.2}, position {:.2}",
            s.score.gc_fraction * 100.0,
            s.score.longest_homopolymer,
            s.score.gc_score,
            s.score.homopolymer_score,
            s.score.position_score
        );

        let off = &s.score.off_target;
        if report.strategy.is_some() {
            let histogram = off
                .mismatch_histogram(config.off_target.max_mismatches)
                .iter()
                .enumerate()
                .map(|(mm, n)| format!("{mm}mm:{n}"))
                .collect::<Vec<_>>()
                .join(" ");
            println!(
                "   Off-targets: {} [{}] {}",
                off.hits.len(),
                off.status,
                histogram
            );
            if let Some(worst) = off.worst_hit() {
                println!(
                    "   Closest: {}:{}({}) with {} mismatch(es)",
                    worst.sequence_name,
                    worst.position + 1,
                    worst.strand,
                    worst.mismatches
                );
            }
        }
    }

    if report.incomplete_searches > 0 {
        println!(
            "\nNote: {} guide(s) have incomplete off-target results; their specificity is an upper bound.",
            report.incomplete_searches
        );
    }
}

fn print_json(report: &DesignReport, config: &DesignConfig) -> anyhow::Result<()> {
    let guides: Vec<serde_json::Value> = report
        .candidates
        .iter()
        .enumerate()
        .map(|(i, s)| {
            serde_json::json!({
                "rank": i + 1,
                "protospacer": s.candidate.protospacer,
                "pam": s.candidate.pam,
                "target": s.candidate.target_name,
                "start": s.candidate.start,
                "end": s.candidate.end(),
                "strand": s.candidate.strand,
                "cut_site": s.candidate.cut_site,
                "score": {
                    "composite": s.score.composite,
                    "on_target": s.score.on_target,
                    "specificity": s.score.specificity,
                    "off_target_penalty": s.score.off_target_penalty,
                    "components": {
                        "gc": s.score.gc_score,
                        "homopolymer": s.score.homopolymer_score,
                        "position": s.score.position_score,
                    },
                    "gc_fraction": s.score.gc_fraction,
                    "longest_homopolymer": s.score.longest_homopolymer,
                },
                "off_targets": {
                    "status": s.score.off_target.status,
                    "count": s.score.off_target.hits.len(),
                    "by_mismatches": s.score.off_target.mismatch_histogram(config.off_target.max_mismatches),
                    "hits": s.score.off_target.hits,
                },
            })
        })
        .collect();

    let output = serde_json::json!({
        "generated_at": report.generated_at,
        "nuclease": report.nuclease,
        "pam": report.pam.motif(),
        "pam_side": report.pam.side(),
        "protospacer_length": report.protospacer_length,
        "off_target_strategy": report.strategy,
        "max_mismatches": config.off_target.max_mismatches,
        "weights": config.rank.normalized(),
        "targets": report.targets,
        "candidates_found": report.candidates_found,
        "candidates_filtered": report.candidates_filtered,
        "incomplete_searches": report.incomplete_searches,
        "guides": guides,
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_delimited(report: &DesignReport, sep: char) {
    println!(
        "{}",
        delimited_row(
            &[
                "rank",
                "target",
                "start",
                "end",
                "strand",
                "protospacer",
                "pam",
                "cut_site",
                "gc_fraction",
                "gc_score",
                "homopolymer_score",
                "position_score",
                "on_target",
                "off_targets",
                "off_target_status",
                "off_target_penalty",
                "specificity",
                "composite",
            ],
            sep
        )
    );

    for (i, s) in report.candidates.iter().enumerate() {
        let fields = [
            (i + 1).to_string(),
            s.candidate.target_name.clone(),
            s.candidate.start.to_string(),
            s.candidate.end().to_string(),
            s.candidate.strand.to_string(),
            s.candidate.protospacer.clone(),
            s.candidate.pam.clone(),
            s.candidate
                .cut_site
                .map(|c| c.to_string())
                .unwrap_or_default(),
            format!("{:.4}", s.score.gc_fraction),
            format!("{:.4}", s.score.gc_score),
            format!("{:.4}", s.score.homopolymer_score),
            format!("{:.4}", s.score.position_score),
            format!("{:.4}", s.score.on_target),
            s.score.off_target.hits.len().to_string(),
            s.score.off_target.status.to_string(),
            format!("{:.4}", s.score.off_target_penalty),
            format!("{:.4}", s.score.specificity),
            format!("{:.4}", s.score.composite),
        ];
        println!("{}", delimited_row(&fields, sep));
    }
}
