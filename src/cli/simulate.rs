use std::path::PathBuf;

use clap::{ArgGroup, Args};
use tracing::warn;

use crate::cli::{delimited_row, load_targets, OutputFormat};
use crate::core::pam::PamSide;
use crate::core::sequence::Sequence;
use crate::core::types::Strand;
use crate::design::scanner::cut_site;
use crate::edit::translate::first_stop;
use crate::edit::{indel_scan, locate_guide, simulate_edit, EditKind, EditOutcome, IndelOutcome};

#[derive(Args)]
#[command(group(ArgGroup::new("site").required(true).args(["guide", "position"])))]
pub struct SimulateArgs {
    /// Coding sequence, read in frame 0 (FASTA or raw text, '-' for stdin)
    #[arg(required = true)]
    pub target: PathBuf,

    /// Guide whose cut site receives the edit
    #[arg(long)]
    pub guide: Option<String>,

    /// 0-based position of the edit, instead of a guide
    #[arg(long)]
    pub position: Option<usize>,

    /// Edit to apply: del<N>, ins-<BASES> or sub:<FROM>><TO>
    #[arg(long, default_value = "del1")]
    pub edit: EditKind,

    /// Cut distance from the PAM in nt
    #[arg(long, default_value = "3")]
    pub cut_offset: usize,

    /// Side of the guide the PAM sits on
    #[arg(long, value_enum, default_value = "three-prime")]
    pub pam_side: PamSide,
}

/// Where the edit lands and how it was found
struct EditSite {
    position: usize,
    guide: Option<(usize, Strand)>,
}

/// Execute simulate subcommand
///
/// # Errors
///
/// Returns an error if the target cannot be read, the guide is not found,
/// or the edit does not fit the sequence.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: SimulateArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let targets = load_targets(&args.target)?;
    if targets.len() > 1 {
        warn!(
            "{} sequences in {}; simulating on the first ({})",
            targets.len(),
            args.target.display(),
            targets[0].name
        );
    }
    let target = targets
        .first()
        .ok_or_else(|| anyhow::anyhow!("No sequences in {}", args.target.display()))?;

    let site = locate_site(&args, target)?;
    if verbose {
        if let Some((start, strand)) = site.guide {
            eprintln!(
                "Guide found at {}:{}({}), cut at {}",
                target.name,
                start + 1,
                strand,
                site.position
            );
        }
    }

    let outcome = simulate_edit(target.bases(), site.position, &args.edit)?;
    let scan = indel_scan(target.bases(), site.position)?;

    match format {
        OutputFormat::Text => print_text(target, &outcome, &scan),
        OutputFormat::Json => print_json(target, &site, &outcome, &scan)?,
        OutputFormat::Tsv | OutputFormat::Csv => {
            print_delimited(&outcome, &scan, format.separator().unwrap_or('\t'));
        }
    }

    Ok(())
}

fn locate_site(args: &SimulateArgs, target: &Sequence) -> anyhow::Result<EditSite> {
    if let Some(position) = args.position {
        return Ok(EditSite {
            position,
            guide: None,
        });
    }

    let guide = match &args.guide {
        Some(text) => Sequence::parse("guide", text)?,
        None => anyhow::bail!("--guide or --position is required"),
    };
    let (start, strand) = locate_guide(target.bases(), guide.bases())?;
    let position = cut_site(start, guide.len(), args.pam_side, strand, args.cut_offset)
        .ok_or_else(|| {
            anyhow::anyhow!(
                "Cut offset {} is longer than the {} nt guide",
                args.cut_offset,
                guide.len()
            )
        })?;

    Ok(EditSite {
        position,
        guide: Some((start, strand)),
    })
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

fn print_text(target: &Sequence, outcome: &EditOutcome, scan: &[IndelOutcome]) {
    println!("{} at {}:{}", outcome.edit, target.name, outcome.position);
    println!("   Frameshift:     {}", yes_no(outcome.frameshift));
    println!("   Premature stop: {}", yes_no(outcome.premature_stop));
    println!("   Protein before: {}", outcome.protein_before);
    println!("   Protein after:  {}", outcome.protein_after);
    if outcome.changes.is_empty() {
        println!("   Changes:        none");
    } else {
        println!(
            "   Changes:        {}",
            outcome
                .changes
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" ")
        );
    }

    println!("\nIndels at this position:");
    for row in scan {
        println!(
            "   {:<8} {:+}  frameshift: {:<3}  premature stop: {:<3}  protein: {} aa",
            row.edit.to_string(),
            row.length_change,
            yes_no(row.frameshift),
            yes_no(row.premature_stop),
            row.protein_length
        );
    }
}

fn print_json(
    target: &Sequence,
    site: &EditSite,
    outcome: &EditOutcome,
    scan: &[IndelOutcome],
) -> anyhow::Result<()> {
    let guide = site.guide.map(|(start, strand)| {
        serde_json::json!({
            "start": start,
            "strand": strand,
        })
    });

    let output = serde_json::json!({
        "target": target.name,
        "position": outcome.position,
        "guide": guide,
        "edit": outcome.edit.to_string(),
        "frameshift": outcome.frameshift,
        "premature_stop": outcome.premature_stop,
        "protein_before": outcome.protein_before,
        "protein_after": outcome.protein_after,
        "first_difference": outcome.first_difference(),
        "changes": outcome.changes.iter().map(ToString::to_string).collect::<Vec<_>>(),
        "indel_scan": scan.iter().map(|row| serde_json::json!({
            "edit": row.edit.to_string(),
            "length_change": row.length_change,
            "frameshift": row.frameshift,
            "premature_stop": row.premature_stop,
            "protein_length": row.protein_length,
        })).collect::<Vec<_>>(),
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// The requested edit first, then the indel scan rows
fn print_delimited(outcome: &EditOutcome, scan: &[IndelOutcome], sep: char) {
    println!(
        "{}",
        delimited_row(
            &[
                "edit",
                "position",
                "length_change",
                "frameshift",
                "premature_stop",
                "protein_length",
            ],
            sep
        )
    );

    let requested_length = first_stop(&outcome.protein_after)
        .unwrap_or(outcome.protein_after.len());
    let mut rows = vec![[
        outcome.edit.to_string(),
        outcome.position.to_string(),
        outcome.edit.length_change().to_string(),
        outcome.frameshift.to_string(),
        outcome.premature_stop.to_string(),
        requested_length.to_string(),
    ]];
    rows.extend(scan.iter().map(|row| {
        [
            row.edit.to_string(),
            outcome.position.to_string(),
            row.length_change.to_string(),
            row.frameshift.to_string(),
            row.premature_stop.to_string(),
            row.protein_length.to_string(),
        ]
    }));

    for row in rows {
        println!("{}", delimited_row(&row, sep));
    }
}
