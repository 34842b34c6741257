//! Organize a directory of audio files into per-artist folders.
//!
//! Planning is pure: it maps `(path, artist tag)` pairs to moves and skips.
//! Execution performs the moves, continues past failures, and leaves a
//! plain-text operation log in the directory.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::normalize::{extract_primary_artist, ArtistSplit};
use crate::progress::{create_progress_bar, log_progress, ProgressMode};
use crate::scanner::{collect_audio_paths, read_record, ScanError};

/// Stand-in artist for files whose tags could not supply one.
pub const UNKNOWN_ARTIST: &str = "unknown artist";

/// Operation log written into the organized directory.
pub const OPERATION_LOG_NAME: &str = "organize_log.txt";

/// Characters that cannot appear in a folder name on common filesystems.
static INVALID_FOLDER_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[*<>:"/\\|?\x00-\x1f]"#).unwrap());

#[derive(Debug, Error)]
pub enum OrganizeError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("Failed to write operation log {path}: {source}")]
    Log {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OrganizeOptions {
    pub recursive: bool,
    pub artist_split: ArtistSplit,
}

/// Why a file is left where it is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    WildcardInName,
    NoArtist,
    InvalidArtist(String),
    AlreadyInPlace,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::WildcardInName => write!(f, "file name contains '*'"),
            SkipReason::NoArtist => write!(f, "no artist tag ({UNKNOWN_ARTIST})"),
            SkipReason::InvalidArtist(a) => write!(f, "artist '{a}' is not a valid folder name"),
            SkipReason::AlreadyInPlace => write!(f, "already in its artist folder"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMove {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub artist: String,
}

#[derive(Debug, Clone, Default)]
pub struct MovePlan {
    pub moves: Vec<PlannedMove>,
    pub skipped: Vec<(PathBuf, SkipReason)>,
    /// Informational lines for the operation log (artist reductions).
    pub notes: Vec<String>,
}

#[derive(Debug, Default)]
pub struct OrganizeReport {
    pub moved: Vec<PlannedMove>,
    pub failed: Vec<(PlannedMove, String)>,
    pub log_path: Option<PathBuf>,
}

fn is_valid_folder_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !INVALID_FOLDER_CHARS.is_match(name)
}

/// Map each `(path, artist tag)` to a move into `<dir>/<artist>/<file>`.
pub fn plan_moves(dir: &Path, files: &[(PathBuf, Option<String>)], split: ArtistSplit) -> MovePlan {
    let mut plan = MovePlan::default();

    for (path, tag) in files {
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_string_lossy().contains('*') {
            plan.skipped.push((path.clone(), SkipReason::WildcardInName));
            continue;
        }

        let raw = tag.as_deref().map(str::trim).filter(|a| !a.is_empty());
        let Some(raw) = raw else {
            plan.skipped.push((path.clone(), SkipReason::NoArtist));
            continue;
        };

        let artist = match split {
            ArtistSplit::Keep => raw,
            ArtistSplit::FirstSegment => {
                let first = extract_primary_artist(raw).trim();
                if first != raw {
                    plan.notes
                        .push(format!("'{}': artist reduced from '{}' to '{}'", path.display(), raw, first));
                }
                first
            }
        };

        if !is_valid_folder_name(artist) {
            plan.skipped
                .push((path.clone(), SkipReason::InvalidArtist(artist.to_string())));
            continue;
        }

        let destination = dir.join(artist).join(file_name);
        if destination == *path {
            plan.skipped.push((path.clone(), SkipReason::AlreadyInPlace));
            continue;
        }

        plan.moves.push(PlannedMove {
            source: path.clone(),
            destination,
            artist: artist.to_string(),
        });
    }

    plan
}

/// Read artist tags for every supported file in `dir` and plan the moves.
/// Unreadable files are planned with no artist.
pub fn plan_directory(dir: &Path, options: &OrganizeOptions) -> Result<MovePlan, OrganizeError> {
    let (paths, _) = collect_audio_paths(dir, options.recursive)?;

    let files: Vec<(PathBuf, Option<String>)> = paths
        .into_iter()
        .map(|path| {
            let artist = match read_record(&path) {
                Ok(record) => record.artist,
                Err(e) => {
                    warn!("{}", e);
                    None
                }
            };
            debug!("Artist for {}: {}", path.display(), artist.as_deref().unwrap_or(UNKNOWN_ARTIST));
            (path, artist)
        })
        .collect();

    Ok(plan_moves(dir, &files, options.artist_split))
}

fn move_file(source: &Path, destination: &Path) -> std::io::Result<()> {
    if destination.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("destination exists: {}", destination.display()),
        ));
    }
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }
    // rename fails across devices; fall back to copy + remove
    if fs::rename(source, destination).is_err() {
        fs::copy(source, destination)?;
        fs::remove_file(source)?;
    }
    Ok(())
}

/// Carry out a plan. Individual move failures are recorded, not returned.
pub fn execute_moves(dir: &Path, plan: &MovePlan, mode: ProgressMode) -> Result<OrganizeReport, OrganizeError> {
    let total = plan.moves.len() as u64;
    let pb = create_progress_bar(total, "Moving files", mode);
    let mut report = OrganizeReport::default();

    for (i, planned) in plan.moves.iter().enumerate() {
        match move_file(&planned.source, &planned.destination) {
            Ok(()) => report.moved.push(planned.clone()),
            Err(e) => {
                warn!("Failed to move {}: {}", planned.source.display(), e);
                report.failed.push((planned.clone(), e.to_string()));
            }
        }
        pb.inc(1);
        log_progress(mode, "organize", i as u64 + 1, total, 100);
    }
    pb.finish_with_message(format!("Moved {} files", report.moved.len()));

    let log_path = dir.join(OPERATION_LOG_NAME);
    fs::write(&log_path, render_log(plan, &report)).map_err(|source| OrganizeError::Log {
        path: log_path.clone(),
        source,
    })?;
    info!(
        "Organized {}: {} moved, {} failed, {} skipped (log: {})",
        dir.display(),
        report.moved.len(),
        report.failed.len(),
        plan.skipped.len(),
        log_path.display()
    );
    report.log_path = Some(log_path);

    Ok(report)
}

/// Human-readable plan, as printed by a dry run.
pub fn render_plan(plan: &MovePlan) -> String {
    let mut lines = Vec::new();
    for m in &plan.moves {
        lines.push(format!("MOVE '{}' -> '{}'", m.source.display(), m.destination.display()));
    }
    for (path, reason) in &plan.skipped {
        lines.push(format!("SKIP '{}': {}", path.display(), reason));
    }
    lines.join("\n")
}

fn render_log(plan: &MovePlan, report: &OrganizeReport) -> String {
    let mut lines = vec!["Operation log:".to_string()];
    lines.extend(plan.notes.iter().cloned());
    for (path, reason) in &plan.skipped {
        lines.push(format!("Skipped '{}': {}", path.display(), reason));
    }
    for m in &report.moved {
        lines.push(format!("Moved '{}' to '{}'", m.source.display(), m.destination.display()));
    }
    for (m, reason) in &report.failed {
        lines.push(format!("Failed to move '{}': {}", m.source.display(), reason));
    }
    lines.join("\n") + "\n"
}
