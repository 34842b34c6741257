//! Generate download lists for songs worth upgrading.
//! Usage: cargo run --release --bin upgrade-list -- <music_root> [--formats csv,txt,json]

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;

use tunesweep::export::{timestamp, ExportFormat, UpgradeLists};
use tunesweep::normalize::{ArtistSplit, KeyOptions};
use tunesweep::pipeline::analyze;
use tunesweep::progress::{format_duration, init_logging, ProgressMode};
use tunesweep::scanner::scan_library;

#[derive(Parser)]
#[command(name = "upgrade-list")]
#[command(about = "List mp3-only and multi-version songs as upgrade candidates")]
struct Args {
    /// Library root to scan
    root: PathBuf,

    #[arg(long, default_value = "exports")]
    export_dir: PathBuf,

    #[arg(long, value_enum, value_delimiter = ',', default_values = ["csv", "txt", "json"])]
    formats: Vec<ExportFormat>,

    /// Key songs on the first credited artist only
    #[arg(long)]
    split_artist: bool,

    #[arg(long)]
    log_only: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging();
    let mode = ProgressMode::from_flag(args.log_only);
    let start = Instant::now();

    println!("Scanning: {}", args.root.display());
    let scan = scan_library(&args.root, mode)
        .with_context(|| format!("Failed to scan {}", args.root.display()))?;
    if scan.records.is_empty() {
        println!("No audio files found.");
        return Ok(());
    }

    let options = KeyOptions {
        artist_split: if args.split_artist {
            ArtistSplit::FirstSegment
        } else {
            ArtistSplit::Keep
        },
    };
    let analyzed = analyze(scan.records, &options);
    println!("Scanned {} files", analyzed.len());

    let lists = UpgradeLists::build(&analyzed);

    println!("\n{:-<60}", "");
    println!("  MP3 only:      {} songs", lists.mp3_only.len());
    println!("  Multi-version: {} songs", lists.multi_version.len());
    println!("{:-<60}", "");
    println!("  Total:         {} songs to upgrade", lists.total());

    let written = lists
        .export(&args.export_dir, &args.formats, &timestamp())
        .with_context(|| format!("Failed to export to {}", args.export_dir.display()))?;
    for path in &written {
        println!("Exported: {}", path.display());
    }

    println!("\nDone in {}", format_duration(start.elapsed()));
    Ok(())
}
