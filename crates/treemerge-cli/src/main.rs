use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use treemerge_core::{merge_trees, parse_file};

#[derive(Parser)]
#[command(
    name = "treemerge",
    about = "Structural three-way merge for Python source files"
)]
struct Cli {
    /// Common ancestor version
    base: PathBuf,
    /// Locally edited version
    local: PathBuf,
    /// Remotely edited version
    remote: PathBuf,
    /// Destination for the merged result
    output: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    run(&Cli::parse())
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    tracing::info!(path = %cli.base.display(), "Parsing base file");
    let mut base = parse_file(&cli.base)?;
    tracing::info!(path = %cli.local.display(), "Parsing local file");
    let local = parse_file(&cli.local)?;
    tracing::info!(path = %cli.remote.display(), "Parsing remote file");
    let remote = parse_file(&cli.remote)?;

    tracing::debug!(tree = %base.debug_tree(), "base tree before replay");

    tracing::info!("Generating tree diffs");
    let report = merge_trees(&mut base, &local, &remote)?;
    if report.total_conflicts > 0 {
        tracing::warn!(
            solved = report.solved_conflicts,
            total = report.total_conflicts,
            "Both sides edited the same nodes"
        );
    }

    fs::write(&cli.output, base.unparse())
        .with_context(|| format!("failed to write {}", cli.output.display()))?;
    tracing::info!(path = %cli.output.display(), "Wrote merged result");
    Ok(())
}
