use clap::Parser;
use tracing_subscriber::EnvFilter;

use crispr_lab::cli;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    // Initialize logging based on verbosity flag
    let filter = if cli.verbose {
        EnvFilter::new("crispr_lab=debug,info")
    } else {
        EnvFilter::new("crispr_lab=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    match cli.command {
        cli::Commands::Design(args) => {
            cli::design::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Offtarget(args) => {
            cli::offtarget::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Index(args) => {
            cli::index::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Simulate(args) => {
            cli::simulate::run(args, cli.format, cli.verbose)?;
        }
    }

    Ok(())
}
