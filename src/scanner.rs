//! Library scanner.
//!
//! Walks a root directory in file-name order, reads tags and stream
//! properties with lofty, and produces one `MetadataRecord` per supported
//! file. Files that cannot be read are skipped and reported, never fatal.

use lofty::error::ErrorKind;
use lofty::file::TaggedFile;
use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::ItemKey;
use once_cell::sync::Lazy;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::models::MetadataRecord;
use crate::progress::{create_progress_bar, create_spinner, log_progress, ProgressMode};

/// Extensions (lower-case, no dot) the scanner picks up.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["mp3", "flac", "wav", "m4a", "ogg", "aiff", "aif", "alac", "aac"];

/// Directory entries never descended into or scanned.
pub const IGNORED_NAMES: &[&str] = &[".DS_Store", "Thumbs.db", ".git", ".svn", "@eaDir"];

/// Tag keys tried in order for each field; the first non-empty value wins.
static TITLE_KEYS: Lazy<Vec<ItemKey>> = Lazy::new(|| vec![ItemKey::TrackTitle]);
static ARTIST_KEYS: Lazy<Vec<ItemKey>> = Lazy::new(|| vec![ItemKey::TrackArtist, ItemKey::AlbumArtist]);
static ALBUM_KEYS: Lazy<Vec<ItemKey>> = Lazy::new(|| vec![ItemKey::AlbumTitle]);

/// Scanner errors
#[derive(Debug, Error)]
pub enum ScanError {
    /// Scan root does not exist
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// Scan root exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// One file could not be opened or parsed
    #[error("Failed to read {path}: {reason}")]
    Read { path: PathBuf, reason: String },
}

/// A file left out of the scan, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of one full scan pass.
#[derive(Debug, Default)]
pub struct ScanReport {
    pub records: Vec<MetadataRecord>,
    pub skipped: Vec<SkippedFile>,
}

/// Whether `path` carries one of the supported extensions (case-insensitive).
pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

fn is_ignored(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    IGNORED_NAMES.iter().any(|ignored| name == *ignored)
}

fn check_root(root: &Path) -> Result<(), ScanError> {
    if !root.exists() {
        return Err(ScanError::PathNotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }
    Ok(())
}

/// Collect supported audio files under `root` in traversal order.
///
/// Entries are sorted by file name at every level so that two scans of an
/// unchanged tree produce the same order. Unreadable directory entries are
/// returned as skipped files.
pub fn collect_audio_paths(root: &Path, recursive: bool) -> Result<(Vec<PathBuf>, Vec<SkippedFile>), ScanError> {
    check_root(root)?;

    let mut paths = Vec::new();
    let mut skipped = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .max_depth(if recursive { usize::MAX } else { 1 })
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_ignored(e));

    for entry in walker {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_file() && is_supported(entry.path()) {
                    paths.push(entry.into_path());
                }
            }
            Err(e) => {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
                warn!("Error accessing entry {}: {}", path.display(), e);
                skipped.push(SkippedFile {
                    path,
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok((paths, skipped))
}

fn first_value(file: &TaggedFile, keys: &[ItemKey]) -> Option<String> {
    for key in keys {
        let tags = file.primary_tag().into_iter().chain(file.tags());
        for tag in tags {
            if let Some(value) = tag.get_string(key) {
                let value = value.trim();
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }
    None
}

/// Read one file into a record.
///
/// Containers lofty does not recognise still produce a bare record (no tags,
/// no duration) so the file is counted; it just never resolves to a song.
pub fn read_record(path: &Path) -> Result<MetadataRecord, ScanError> {
    let read_err = |reason: String| ScanError::Read {
        path: path.to_path_buf(),
        reason,
    };

    let mut record = MetadataRecord::new(path);

    let probe = Probe::open(path)
        .map_err(|e| read_err(e.to_string()))?
        .guess_file_type()
        .map_err(|e| read_err(e.to_string()))?;
    let tagged_file = match probe.read() {
        Ok(f) => f,
        Err(e) if matches!(e.kind(), ErrorKind::UnknownFormat) => {
            debug!("Unrecognised container, keeping bare record: {}", path.display());
            return Ok(record);
        }
        Err(e) => return Err(read_err(e.to_string())),
    };

    let properties = tagged_file.properties();
    let secs = properties.duration().as_secs_f64();
    if secs > 0.0 {
        record.duration_seconds = Some((secs * 100.0).round() / 100.0);
    }
    record.bitrate = properties.audio_bitrate();
    record.sample_rate = properties.sample_rate();

    record.title = first_value(&tagged_file, &TITLE_KEYS);
    record.artist = first_value(&tagged_file, &ARTIST_KEYS);
    record.album = first_value(&tagged_file, &ALBUM_KEYS);

    debug!(
        file = %path.display(),
        artist = ?record.artist,
        title = ?record.title,
        duration_s = ?record.duration_seconds,
        "Extracted metadata"
    );

    Ok(record)
}

/// Scan a library root into a full record snapshot.
pub fn scan_library(root: &Path, mode: ProgressMode) -> Result<ScanReport, ScanError> {
    let spinner = create_spinner("Discovering audio files...", mode);
    let (paths, mut skipped) = collect_audio_paths(root, true)?;
    spinner.finish_with_message(format!("Found {} audio files", paths.len()));

    let total = paths.len() as u64;
    let pb = create_progress_bar(total, "Reading tags", mode);
    let mut records = Vec::with_capacity(paths.len());

    for (i, path) in paths.iter().enumerate() {
        match read_record(path) {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!("Skipping {}", e);
                skipped.push(SkippedFile {
                    path: path.clone(),
                    reason: e.to_string(),
                });
            }
        }
        pb.inc(1);
        log_progress(mode, "scan", i as u64 + 1, total, 500);
    }
    pb.finish_with_message(format!("Phase 1: Scanned {} files", records.len()));

    info!(
        "Scan of {} complete: {} records, {} skipped",
        root.display(),
        records.len(),
        skipped.len()
    );

    Ok(ScanReport { records, skipped })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_supported_extensions_case_insensitive() {
        assert!(is_supported(Path::new("/m/a.FLAC")));
        assert!(is_supported(Path::new("/m/a.Mp3")));
        assert!(!is_supported(Path::new("/m/cover.jpg")));
        assert!(!is_supported(Path::new("/m/noext")));
    }

    #[test]
    fn test_missing_root() {
        let result = scan_library(Path::new("/nonexistent/music/root"), ProgressMode::LogOnly);
        assert!(matches!(result, Err(ScanError::PathNotFound(_))));
    }

    #[test]
    fn test_root_is_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("song.mp3");
        fs::write(&file, b"").unwrap();
        let result = scan_library(&file, ProgressMode::LogOnly);
        assert!(matches!(result, Err(ScanError::NotADirectory(_))));
    }

    #[test]
    fn test_collect_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("b")).unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join("b/2.flac"), b"").unwrap();
        fs::write(dir.path().join("a.mp3"), b"").unwrap();
        fs::write(dir.path().join("c.txt"), b"").unwrap();
        fs::write(dir.path().join(".git/x.mp3"), b"").unwrap();

        let (paths, skipped) = collect_audio_paths(dir.path(), true).unwrap();
        let names: Vec<_> = paths
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.mp3", "b/2.flac"]);
        assert!(skipped.is_empty());
    }

    #[test]
    fn test_non_recursive_collect() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/deep.mp3"), b"").unwrap();
        fs::write(dir.path().join("top.mp3"), b"").unwrap();

        let (paths, _) = collect_audio_paths(dir.path(), false).unwrap();
        assert_eq!(paths, vec![dir.path().join("top.mp3")]);
    }

    #[test]
    fn test_garbage_file_does_not_abort_scan() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.flac"), b"definitely not flac data").unwrap();
        fs::write(dir.path().join("empty.mp3"), b"").unwrap();

        let report = scan_library(dir.path(), ProgressMode::LogOnly).unwrap();
        // Each file is either a keyless record or a reported skip.
        assert_eq!(report.records.len() + report.skipped.len(), 2);
        assert!(report.records.iter().all(|r| r.title.is_none()));
    }

    #[test]
    fn test_read_nonexistent_file() {
        let result = read_record(Path::new("/nonexistent/file.mp3"));
        assert!(matches!(result, Err(ScanError::Read { .. })));
    }
}
