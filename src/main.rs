use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

use tunesweep::classify;
use tunesweep::export::{export_library, group_views, render_group, timestamp, ExportFormat};
use tunesweep::grouping::SongGroup;
use tunesweep::models::{LibrarySummary, MarkedRecord};
use tunesweep::normalize::{ArtistSplit, KeyOptions};
use tunesweep::pipeline::{analyze, mark_for_deletion, removable, summarize};
use tunesweep::progress::{format_duration, init_logging, ProgressMode};
use tunesweep::removal::{delete_files, AuditLog};
use tunesweep::safety::validate_removal_targets;
use tunesweep::scanner::scan_library;

#[derive(Parser)]
#[command(name = "tunesweep")]
#[command(about = "Find duplicate and multi-version songs in a music library and remove redundant copies")]
struct Args {
    /// Library root to scan
    root: PathBuf,

    #[arg(long, value_enum, default_value = "summary")]
    view: View,

    /// Key songs on the first credited artist only
    #[arg(long)]
    split_artist: bool,

    #[arg(long, default_value = "exports")]
    export_dir: PathBuf,

    /// Export formats (comma-separated, e.g. csv,txt,json)
    #[arg(long, value_enum, value_delimiter = ',')]
    export: Vec<ExportFormat>,

    /// Delete every file marked for removal
    #[arg(long)]
    delete: bool,

    /// Write a JSON-lines deletion audit into the export directory
    #[arg(long)]
    audit_log: bool,

    /// Hide progress bars and log periodic progress lines instead
    #[arg(long)]
    log_only: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum View {
    Summary,
    Duplicates,
    MultiVersion,
    Mp3Only,
    Removable,
}

fn print_summary(summary: &LibrarySummary) {
    println!("\n{:=<60}", "");
    println!("Library summary");
    println!("  Files:               {}", summary.total_files);
    println!("  Unique songs:        {}", summary.unique_songs);
    println!("  Duplicate songs:     {} ({} files)", summary.duplicate_songs, summary.duplicate_files);
    println!("  Multi-version songs: {}", summary.multi_version_songs);
    println!("  MP3-only songs:      {}", summary.mp3_only_songs);
    println!("  Formats:             {}", summary.format_count);
    println!("  Unresolved files:    {}", summary.unresolved_files);
    println!("  Removable files:     {}", summary.removable_files);
    println!("{:=<60}", "");
}

fn print_groups(title: &str, marked: &[MarkedRecord], pred: fn(&SongGroup<'_>) -> bool) {
    let views = group_views(marked, pred);
    println!("\n{} ({} songs)", title, views.len());
    println!("{:-<60}", "");
    for view in &views {
        print!("{}", render_group(view));
    }
}

fn print_view(view: View, marked: &[MarkedRecord]) {
    match view {
        View::Summary => {}
        View::Duplicates => print_groups("Duplicates", marked, classify::is_duplicate),
        View::MultiVersion => print_groups("Multi-version", marked, classify::is_multi_version),
        View::Mp3Only => print_groups("MP3 only", marked, classify::is_mp3_only),
        View::Removable => {
            let targets = removable(marked);
            println!("\nRemovable files ({})", targets.len());
            println!("{:-<60}", "");
            for m in targets {
                println!("  {}", m.path().display());
            }
        }
    }
}

fn delete_removable(args: &Args, marked: &[MarkedRecord], mode: ProgressMode) -> Result<()> {
    let targets: Vec<&Path> = removable(marked).into_iter().map(|m| m.path()).collect();
    if targets.is_empty() {
        println!("\nNothing to delete.");
        return Ok(());
    }

    validate_removal_targets(&args.root, &targets)?;

    let mut audit = if args.audit_log {
        Some(AuditLog::create(&args.export_dir).context("Failed to create deletion audit log")?)
    } else {
        None
    };

    let report = delete_files(&targets, audit.as_mut(), mode);

    println!("\nDeleted {} files", report.succeeded.len());
    if !report.failed.is_empty() {
        println!("Failed to delete {} files:", report.failed.len());
        for (path, reason) in &report.failed {
            println!("  {} ({})", path.display(), reason);
        }
    }
    if let Some(audit) = &audit {
        println!("Audit log: {}", audit.path().display());
    }
    println!("Rescan the library to refresh the analysis.");

    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging();
    let mode = ProgressMode::from_flag(args.log_only);

    let start = Instant::now();

    let options = KeyOptions {
        artist_split: if args.split_artist {
            ArtistSplit::FirstSegment
        } else {
            ArtistSplit::Keep
        },
    };

    println!("Scanning library: {}", args.root.display());
    let scan = scan_library(&args.root, mode)
        .with_context(|| format!("Failed to scan {}", args.root.display()))?;
    if !scan.skipped.is_empty() {
        println!("Skipped {} unreadable files (see log)", scan.skipped.len());
    }

    let marked = mark_for_deletion(analyze(scan.records, &options));
    let summary = summarize(&marked);
    print_summary(&summary);
    print_view(args.view, &marked);

    if !args.export.is_empty() {
        let stamp = timestamp();
        let written = export_library(&args.export_dir, &marked, &args.export, &stamp)
            .with_context(|| format!("Failed to export to {}", args.export_dir.display()))?;
        let summary_path = args.export_dir.join(format!("summary_{stamp}.json"));
        summary.write_to_file(&summary_path)?;
        println!("\nExported {} files to {}", written.len() + 1, args.export_dir.display());
    }

    if args.delete {
        delete_removable(&args, &marked, mode)?;
    }

    info!("Finished in {}", format_duration(start.elapsed()));
    Ok(())
}
