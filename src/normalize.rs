//! Identity key construction.
//!
//! A key is built from title, artist and duration only. Format, path, bitrate
//! and sample rate never participate, so every encoding of a song lands in
//! the same group.
//!
//! CRITICAL: Any change here changes which files are considered the same song
//! and therefore which files get deleted. Run tests after changes.

use unicode_normalization::UnicodeNormalization;

use crate::models::{IdentityKey, MetadataRecord};

// ============================================================================
// OPTIONS
// ============================================================================

/// How the raw artist tag is reduced before it enters the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArtistSplit {
    /// Use the whole artist string.
    #[default]
    Keep,
    /// Keep only the first credited artist (`;` takes precedence over `,`).
    FirstSegment,
}

/// Options applied in front of key construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyOptions {
    pub artist_split: ArtistSplit,
}

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Fold free text for key comparison: NFC compose, trim, lower-case.
///
/// Lower-casing is Unicode-aware and locale-independent; CJK and other
/// caseless scripts pass through untouched.
pub fn fold_text(s: &str) -> String {
    let composed: String = s.nfc().collect();
    composed.trim().to_lowercase()
}

/// Extract the primary (first) artist from a multi-artist tag.
/// Returns the input unchanged when there is no separator.
/// e.g., "Jay Chou; Lara" → "Jay Chou"
///       "A, B; C"        → "A, B"
///       "Beatles"        → "Beatles"
pub fn extract_primary_artist(artist: &str) -> &str {
    let separator = if artist.contains(';') { ';' } else { ',' };
    artist.split(separator).next().unwrap_or(artist)
}

/// Round a duration to whole seconds, ties to even.
/// 200.4 → 200, 200.6 → 201, 200.5 → 200, 201.5 → 202
pub fn round_duration(seconds: f64) -> i64 {
    seconds.round_ties_even() as i64
}

fn usable_text(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

fn usable_duration(value: Option<f64>) -> Option<f64> {
    value.filter(|d| d.is_finite() && *d > 0.0)
}

// ============================================================================
// KEY CONSTRUCTION
// ============================================================================

/// Build the identity key for a record, or `None` if it cannot be resolved.
///
/// A record with a missing, blank or zero title, artist or duration has no
/// reliable identity and must never be merged with another record.
pub fn build_key(record: &MetadataRecord, options: &KeyOptions) -> Option<IdentityKey> {
    let title = usable_text(record.title.as_deref())?;
    let raw_artist = usable_text(record.artist.as_deref())?;
    let duration = usable_duration(record.duration_seconds)?;

    let artist = match options.artist_split {
        ArtistSplit::Keep => raw_artist,
        ArtistSplit::FirstSegment => extract_primary_artist(raw_artist),
    };
    let artist = fold_text(artist);
    if artist.is_empty() {
        return None;
    }

    Some(IdentityKey {
        title: fold_text(title),
        artist,
        duration_secs: round_duration(duration),
    })
}

// ============================================================================
// TESTS
// ============================================================================
