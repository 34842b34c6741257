//! Move audio files into per-artist folders.
//! Usage: cargo run --release --bin organize-by-artist -- <dir> [--recursive] [--dry-run]

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use tunesweep::normalize::ArtistSplit;
use tunesweep::organize::{execute_moves, plan_directory, render_plan, OrganizeOptions};
use tunesweep::progress::{init_logging, ProgressMode};

#[derive(Parser)]
#[command(name = "organize-by-artist")]
#[command(about = "Move audio files into <dir>/<artist>/ folders based on their artist tag")]
struct Args {
    /// Directory holding the audio files
    dir: PathBuf,

    /// Include files in subdirectories
    #[arg(long)]
    recursive: bool,

    /// Use the whole artist tag instead of the first credited artist
    #[arg(long)]
    keep_full_artist: bool,

    /// Print the plan without moving anything
    #[arg(long)]
    dry_run: bool,

    #[arg(long)]
    log_only: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging();
    let mode = ProgressMode::from_flag(args.log_only);

    let options = OrganizeOptions {
        recursive: args.recursive,
        artist_split: if args.keep_full_artist {
            ArtistSplit::Keep
        } else {
            ArtistSplit::FirstSegment
        },
    };

    let plan = plan_directory(&args.dir, &options)
        .with_context(|| format!("Failed to read {}", args.dir.display()))?;

    println!("{}", render_plan(&plan));
    println!("\n{} to move, {} skipped", plan.moves.len(), plan.skipped.len());

    if args.dry_run {
        println!("Dry run: nothing moved.");
        return Ok(());
    }

    let report = execute_moves(&args.dir, &plan, mode)?;
    println!("Moved {} files, {} failed", report.moved.len(), report.failed.len());
    if let Some(log) = &report.log_path {
        println!("Operation log: {}", log.display());
    }

    Ok(())
}
