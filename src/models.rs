//! Core data models for library analysis.
//!
//! This module contains the record, key, and report types shared by the
//! scanner, the analysis pipeline, and the exporters.

use rustc_hash::FxHashMap;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

// ============================================================================
// Type Aliases
// ============================================================================

/// Index mapping an identity key to its group position in `Grouping::groups`
pub type GroupIndex = FxHashMap<IdentityKey, usize>;

// ============================================================================
// Scanned Records
// ============================================================================

/// One scanned audio file, as produced by the scanner.
///
/// Records are a full snapshot of one scan pass and are never patched; a new
/// scan replaces the whole set.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MetadataRecord {
    pub path: PathBuf,
    pub file_name: String,
    pub format: String, // lower-cased extension without the dot, e.g. "flac"
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub duration_seconds: Option<f64>,
    pub bitrate: Option<u32>,     // kbps
    pub sample_rate: Option<u32>, // Hz
}

impl MetadataRecord {
    /// Bare record for a path; format and file name are derived from the path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let format = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        Self {
            path,
            file_name,
            format,
            title: None,
            artist: None,
            album: None,
            duration_seconds: None,
            bitrate: None,
            sample_rate: None,
        }
    }

    pub fn audio_format(&self) -> AudioFormat {
        AudioFormat::from(self.format.as_str())
    }
}

// ============================================================================
// Formats
// ============================================================================

/// Known encodings, ranked by presumed quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioFormat {
    Flac,
    Wav,
    Alac,
    Aiff,
    Aac,
    Mp3,
    Unknown,
}

impl AudioFormat {
    /// Rank for retention: higher is better. Lossless containers tie.
    pub fn priority(self) -> FormatPriority {
        FormatPriority(match self {
            AudioFormat::Flac | AudioFormat::Wav | AudioFormat::Alac => 4,
            AudioFormat::Aiff => 3,
            AudioFormat::Aac => 2,
            AudioFormat::Mp3 => 1,
            AudioFormat::Unknown => 0,
        })
    }
}

impl From<&str> for AudioFormat {
    fn from(s: &str) -> Self {
        match s.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "flac" => AudioFormat::Flac,
            "wav" => AudioFormat::Wav,
            "alac" => AudioFormat::Alac,
            "aiff" | "aif" => AudioFormat::Aiff,
            "aac" => AudioFormat::Aac,
            "mp3" => AudioFormat::Mp3,
            _ => AudioFormat::Unknown,
        }
    }
}

/// Total order over formats; only ever compared within one song group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct FormatPriority(pub u8);

/// Priority of a raw format string (unlisted formats rank lowest).
pub fn format_priority(format: &str) -> FormatPriority {
    AudioFormat::from(format).priority()
}

// ============================================================================
// Identity
// ============================================================================

/// Canonical "same song" key: folded title, folded artist, whole seconds.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct IdentityKey {
    pub title: String,
    pub artist: String,
    pub duration_secs: i64,
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.title, self.artist, self.duration_secs)
    }
}

/// Scanned record with its derived identity key (`None` = unresolvable).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnalyzedRecord {
    #[serde(flatten)]
    pub record: MetadataRecord,
    pub song_key: Option<IdentityKey>,
}

impl AnalyzedRecord {
    pub fn path(&self) -> &Path {
        &self.record.path
    }
}

/// Analyzed record with its retention decision.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MarkedRecord {
    #[serde(flatten)]
    pub analyzed: AnalyzedRecord,
    pub should_delete: bool,
}

impl MarkedRecord {
    pub fn path(&self) -> &Path {
        self.analyzed.path()
    }

    pub fn record(&self) -> &MetadataRecord {
        &self.analyzed.record
    }

    pub fn song_key(&self) -> Option<&IdentityKey> {
        self.analyzed.song_key.as_ref()
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// Library-wide counts shown after a scan.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibrarySummary {
    pub total_files: usize,
    pub unresolved_files: usize,
    pub unique_songs: usize,
    pub duplicate_songs: usize,
    pub duplicate_files: usize,
    pub multi_version_songs: usize,
    pub mp3_only_songs: usize,
    pub format_count: usize,
    pub removable_files: usize,
}

impl LibrarySummary {
    /// Write summary to a JSON file
    pub fn write_to_file(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
