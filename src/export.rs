//! Report exports: record tables, grouped listings and upgrade lists.
//!
//! Exports are read-only views over an analyzed snapshot. Every file name
//! carries a `YYYYmmdd_HHMMSS` stamp so repeated runs never overwrite each
//! other.

use chrono::Local;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::classify;
use crate::grouping::{group, SongGroup};
use crate::models::{AnalyzedRecord, IdentityKey, MarkedRecord};
use crate::ranking::{rank_group, retained};

/// UTF-8 byte order mark, so spreadsheet tools pick the right encoding.
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
pub const LIBRARY_PREFIX: &str = "library";
pub const DOWNLOAD_LIST_PREFIX: &str = "download_list";
pub const MP3_ONLY_PREFIX: &str = "mp3_only";
pub const MULTI_VERSION_PREFIX: &str = "multi_version";

const RULE: &str = "============================================================";
const THIN_RULE: &str = "------------------------------------------------------------";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum ExportFormat {
    Csv,
    Txt,
    Json,
}

/// File-name timestamp for one export run.
pub fn timestamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

fn create(path: &Path) -> Result<BufWriter<File>, ExportError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(BufWriter::new(File::create(path)?))
}

/// Write rows as CSV with a leading BOM.
pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), ExportError> {
    let mut out = create(path)?;
    out.write_all(UTF8_BOM)?;
    let mut writer = csv::Writer::from_writer(out);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), ExportError> {
    let mut out = create(path)?;
    serde_json::to_writer_pretty(&mut out, value)?;
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}

fn write_text(path: &Path, text: &str) -> Result<(), ExportError> {
    let mut out = create(path)?;
    out.write_all(text.as_bytes())?;
    out.flush()?;
    Ok(())
}

// ============================================================================
// Record Table
// ============================================================================

/// Flat CSV row for one marked record.
#[derive(Debug, Serialize)]
pub struct RecordRow<'a> {
    pub path: String,
    pub file_name: &'a str,
    pub format: &'a str,
    pub title: Option<&'a str>,
    pub artist: Option<&'a str>,
    pub album: Option<&'a str>,
    pub duration_seconds: Option<f64>,
    pub bitrate: Option<u32>,
    pub sample_rate: Option<u32>,
    pub song_key: Option<String>,
    pub should_delete: bool,
}

impl<'a> From<&'a MarkedRecord> for RecordRow<'a> {
    fn from(m: &'a MarkedRecord) -> Self {
        let r = m.record();
        RecordRow {
            path: r.path.display().to_string(),
            file_name: &r.file_name,
            format: &r.format,
            title: r.title.as_deref(),
            artist: r.artist.as_deref(),
            album: r.album.as_deref(),
            duration_seconds: r.duration_seconds,
            bitrate: r.bitrate,
            sample_rate: r.sample_rate,
            song_key: m.song_key().map(ToString::to_string),
            should_delete: m.should_delete,
        }
    }
}

// ============================================================================
// Grouped Views
// ============================================================================

/// One song group, members best-first, each with its retention decision.
#[derive(Debug, Clone)]
pub struct GroupView<'a> {
    pub key: &'a IdentityKey,
    pub members: Vec<(&'a MarkedRecord, bool)>,
}

/// Build views for every group matching `pred`, in first-seen order.
pub fn group_views<'a>(records: &'a [MarkedRecord], pred: fn(&SongGroup<'_>) -> bool) -> Vec<GroupView<'a>> {
    let by_path: FxHashMap<&Path, &MarkedRecord> = records.iter().map(|m| (m.path(), m)).collect();
    let grouping = group(records.iter().map(|m| &m.analyzed));

    grouping
        .iter()
        .filter(|g| pred(g))
        .map(|g| GroupView {
            key: g.key,
            members: rank_group(g)
                .into_iter()
                .filter_map(|a| by_path.get(a.path()).map(|&m| (m, m.should_delete)))
                .collect(),
        })
        .collect()
}

fn fmt_opt<T: std::fmt::Display>(value: Option<T>, suffix: &str) -> String {
    value.map(|v| format!("{v}{suffix}")).unwrap_or_else(|| "-".to_string())
}

/// Plain-text rendering of one group.
pub fn render_group(view: &GroupView<'_>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} ({} files)", view.key, view.members.len());
    for (m, delete) in &view.members {
        let r = m.record();
        let _ = writeln!(
            out,
            "  [{}] {}  {}  {}  {}  {}",
            if *delete { "DELETE" } else { "KEEP  " },
            r.file_name,
            r.format,
            fmt_opt(r.bitrate, " kbps"),
            fmt_opt(r.sample_rate, " Hz"),
            fmt_opt(r.duration_seconds.map(|d| format!("{d:.2}")), "s"),
        );
    }
    out
}

fn render_section(out: &mut String, title: &str, views: &[GroupView<'_>]) {
    let _ = writeln!(out, "\n{title}");
    let _ = writeln!(out, "{THIN_RULE}");
    for view in views {
        out.push_str(&render_group(view));
    }
    let _ = writeln!(out, "\nSubtotal: {} songs", views.len());
    let _ = writeln!(out, "{RULE}");
}

/// Grouped text listing of the duplicate, multi-version and mp3-only views.
pub fn render_library_txt(records: &[MarkedRecord]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Library report");
    let _ = writeln!(out, "Generated: {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(out, "{RULE}");
    render_section(&mut out, "DUPLICATES", &group_views(records, classify::is_duplicate));
    render_section(&mut out, "MULTI-VERSION", &group_views(records, classify::is_multi_version));
    render_section(&mut out, "MP3-ONLY", &group_views(records, classify::is_mp3_only));
    out
}

/// Export the marked record set in the requested formats. Returns the files
/// written.
pub fn export_library(
    dir: &Path,
    records: &[MarkedRecord],
    formats: &[ExportFormat],
    stamp: &str,
) -> Result<Vec<PathBuf>, ExportError> {
    let mut written = Vec::new();
    for format in formats {
        let path = match format {
            ExportFormat::Csv => {
                let path = dir.join(format!("{LIBRARY_PREFIX}_{stamp}.csv"));
                let rows: Vec<RecordRow<'_>> = records.iter().map(RecordRow::from).collect();
                write_csv(&path, &rows)?;
                path
            }
            ExportFormat::Json => {
                let path = dir.join(format!("{LIBRARY_PREFIX}_{stamp}.json"));
                write_json(&path, records)?;
                path
            }
            ExportFormat::Txt => {
                let path = dir.join(format!("{LIBRARY_PREFIX}_{stamp}.txt"));
                write_text(&path, &render_library_txt(records))?;
                path
            }
        };
        info!("Exported {}", path.display());
        written.push(path);
    }
    Ok(written)
}

// ============================================================================
// Upgrade Lists
// ============================================================================

/// A song only held as MP3, candidate for a better download.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mp3UpgradeRow {
    pub song_key: String,
    pub title: String,
    pub artist: String,
    pub duration: Option<f64>,
    pub current_bitrate: Option<u32>,
    pub file_name: String,
}

/// A song held in several formats.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiVersionRow {
    pub song_key: String,
    pub title: String,
    pub artist: String,
    pub formats: String,
    pub best_format: String,
    pub version_count: usize,
}

/// One row per mp3-only song, described by its first-seen copy, sorted by key.
pub fn mp3_upgrade_list(records: &[AnalyzedRecord]) -> Vec<Mp3UpgradeRow> {
    let grouping = group(records);
    let mut rows: Vec<Mp3UpgradeRow> = grouping
        .iter()
        .filter(|g| classify::is_mp3_only(g))
        .filter_map(|g| {
            let first = g.members.first()?;
            let r = &first.record;
            Some(Mp3UpgradeRow {
                song_key: g.key.to_string(),
                title: r.title.clone().unwrap_or_default(),
                artist: r.artist.clone().unwrap_or_default(),
                duration: r.duration_seconds,
                current_bitrate: r.bitrate,
                file_name: r.file_name.clone(),
            })
        })
        .collect();
    rows.sort_by(|a, b| a.song_key.cmp(&b.song_key));
    rows
}

/// One row per multi-version song, described by its best copy, sorted by key.
pub fn multi_version_list(records: &[AnalyzedRecord]) -> Vec<MultiVersionRow> {
    let grouping = group(records);
    let mut rows: Vec<MultiVersionRow> = grouping
        .iter()
        .filter(|g| classify::is_multi_version(g))
        .filter_map(|g| {
            let best = retained(g)?;
            let r = &best.record;
            Some(MultiVersionRow {
                song_key: g.key.to_string(),
                title: r.title.clone().unwrap_or_default(),
                artist: r.artist.clone().unwrap_or_default(),
                formats: g.formats_sorted().join(", "),
                best_format: r.format.clone(),
                version_count: g.len(),
            })
        })
        .collect();
    rows.sort_by(|a, b| a.song_key.cmp(&b.song_key));
    rows
}

/// Both upgrade lists for one snapshot.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpgradeLists {
    pub mp3_only: Vec<Mp3UpgradeRow>,
    pub multi_version: Vec<MultiVersionRow>,
}

impl UpgradeLists {
    pub fn build(records: &[AnalyzedRecord]) -> Self {
        Self {
            mp3_only: mp3_upgrade_list(records),
            multi_version: multi_version_list(records),
        }
    }

    pub fn total(&self) -> usize {
        self.mp3_only.len() + self.multi_version.len()
    }

    pub fn render_txt(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Upgrade download list");
        let _ = writeln!(out, "Generated: {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
        let _ = writeln!(out, "{RULE}");

        if !self.mp3_only.is_empty() {
            let _ = writeln!(out, "\nMP3 ONLY\n{THIN_RULE}");
            for (i, row) in self.mp3_only.iter().enumerate() {
                let _ = writeln!(out, "\n[{}] {}", i + 1, row.song_key);
                let _ = writeln!(out, "  title: {}", row.title);
                let _ = writeln!(out, "  artist: {}", row.artist);
                if let Some(d) = row.duration {
                    let _ = writeln!(out, "  duration: {d:.2}");
                }
                if let Some(b) = row.current_bitrate {
                    let _ = writeln!(out, "  current_bitrate: {b}");
                }
                let _ = writeln!(out, "  file_name: {}", row.file_name);
            }
            let _ = writeln!(out, "\nSubtotal: {} songs\n{RULE}", self.mp3_only.len());
        }

        if !self.multi_version.is_empty() {
            let _ = writeln!(out, "\nMULTI VERSION\n{THIN_RULE}");
            for (i, row) in self.multi_version.iter().enumerate() {
                let _ = writeln!(out, "\n[{}] {}", i + 1, row.song_key);
                let _ = writeln!(out, "  title: {}", row.title);
                let _ = writeln!(out, "  artist: {}", row.artist);
                let _ = writeln!(out, "  formats: {}", row.formats);
                let _ = writeln!(out, "  best_format: {}", row.best_format);
                let _ = writeln!(out, "  version_count: {}", row.version_count);
            }
            let _ = writeln!(out, "\nSubtotal: {} songs\n{RULE}", self.multi_version.len());
        }

        out
    }

    /// Write the lists in each requested format. Empty lists produce no CSV.
    pub fn export(&self, dir: &Path, formats: &[ExportFormat], stamp: &str) -> Result<Vec<PathBuf>, ExportError> {
        let mut written = Vec::new();
        for format in formats {
            match format {
                ExportFormat::Csv => {
                    if !self.mp3_only.is_empty() {
                        let path = dir.join(format!("{MP3_ONLY_PREFIX}_{stamp}.csv"));
                        write_csv(&path, &self.mp3_only)?;
                        written.push(path);
                    }
                    if !self.multi_version.is_empty() {
                        let path = dir.join(format!("{MULTI_VERSION_PREFIX}_{stamp}.csv"));
                        write_csv(&path, &self.multi_version)?;
                        written.push(path);
                    }
                }
                ExportFormat::Txt => {
                    let path = dir.join(format!("{DOWNLOAD_LIST_PREFIX}_{stamp}.txt"));
                    write_text(&path, &self.render_txt())?;
                    written.push(path);
                }
                ExportFormat::Json => {
                    let path = dir.join(format!("{DOWNLOAD_LIST_PREFIX}_{stamp}.json"));
                    write_json(&path, self)?;
                    written.push(path);
                }
            }
        }
        for path in &written {
            info!("Exported {}", path.display());
        }
        Ok(written)
    }
}
