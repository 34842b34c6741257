//! Group classification.
//!
//! Three independent predicates over the same grouping. They overlap freely:
//! a group of two MP3s and one FLAC is both a duplicate and a multi-version
//! group, but not mp3-only.

use crate::grouping::{Grouping, SongGroup};
use crate::models::{AnalyzedRecord, IdentityKey};

/// More than one file carries this identity, regardless of format.
pub fn is_duplicate(group: &SongGroup<'_>) -> bool {
    group.len() >= 2
}

/// The group holds more than one distinct format.
pub fn is_multi_version(group: &SongGroup<'_>) -> bool {
    group.distinct_formats() > 1
}

/// Only lossy MP3 copies exist for this song (a lone MP3 counts).
pub fn is_mp3_only(group: &SongGroup<'_>) -> bool {
    !group.is_empty() && group.members.iter().all(|m| m.record.format == "mp3")
}

fn flatten<'a>(grouping: &Grouping<'a>, pred: fn(&SongGroup<'_>) -> bool) -> Vec<&'a AnalyzedRecord> {
    grouping
        .iter()
        .filter(|g| pred(g))
        .flat_map(|g| g.members.iter().copied())
        .collect()
}

fn keys<'a>(grouping: &Grouping<'a>, pred: fn(&SongGroup<'_>) -> bool) -> Vec<&'a IdentityKey> {
    grouping.iter().filter(|g| pred(g)).map(|g| g.key).collect()
}

/// Every record belonging to a group of two or more.
pub fn duplicates<'a>(grouping: &Grouping<'a>) -> Vec<&'a AnalyzedRecord> {
    flatten(grouping, is_duplicate)
}

/// Every record belonging to a group with more than one format.
pub fn multi_version<'a>(grouping: &Grouping<'a>) -> Vec<&'a AnalyzedRecord> {
    flatten(grouping, is_multi_version)
}

/// Every record belonging to a group whose only format is mp3.
pub fn mp3_only<'a>(grouping: &Grouping<'a>) -> Vec<&'a AnalyzedRecord> {
    flatten(grouping, is_mp3_only)
}

pub fn duplicate_keys<'a>(grouping: &Grouping<'a>) -> Vec<&'a IdentityKey> {
    keys(grouping, is_duplicate)
}

pub fn multi_version_keys<'a>(grouping: &Grouping<'a>) -> Vec<&'a IdentityKey> {
    keys(grouping, is_multi_version)
}

pub fn mp3_only_keys<'a>(grouping: &Grouping<'a>) -> Vec<&'a IdentityKey> {
    keys(grouping, is_mp3_only)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grouping::group;
    use crate::models::MetadataRecord;

    fn analyzed(path: &str, title: &str) -> AnalyzedRecord {
        AnalyzedRecord {
            record: MetadataRecord::new(path),
            song_key: Some(IdentityKey {
                title: title.to_string(),
                artist: "a".to_string(),
                duration_secs: 200,
            }),
        }
    }

    #[test]
    fn test_empty_grouping() {
        let records: Vec<AnalyzedRecord> = Vec::new();
        let grouping = group(&records);
        assert!(duplicates(&grouping).is_empty());
        assert!(multi_version(&grouping).is_empty());
        assert!(mp3_only(&grouping).is_empty());
    }

    #[test]
    fn test_all_mp3_group() {
        let records = vec![analyzed("/1.mp3", "x"), analyzed("/2.mp3", "x"), analyzed("/3.mp3", "x")];
        let grouping = group(&records);
        assert_eq!(duplicates(&grouping).len(), 3);
        assert!(multi_version(&grouping).is_empty());
        assert_eq!(mp3_only(&grouping).len(), 3);
    }

    #[test]
    fn test_same_format_duplicates_not_multi_version() {
        let records: Vec<_> = (0..5).map(|i| analyzed(&format!("/{i}.flac"), "x")).collect();
        let grouping = group(&records);
        assert_eq!(duplicates(&grouping).len(), 5);
        assert!(multi_version(&grouping).is_empty());
        assert!(mp3_only(&grouping).is_empty());
    }

    #[test]
    fn test_overlapping_sets() {
        let records = vec![analyzed("/1.mp3", "x"), analyzed("/2.mp3", "x"), analyzed("/3.flac", "x")];
        let grouping = group(&records);
        assert_eq!(duplicates(&grouping).len(), 3);
        assert_eq!(multi_version(&grouping).len(), 3);
        assert!(mp3_only(&grouping).is_empty());
        let g = &grouping.groups[0];
        assert!(is_duplicate(g) && is_multi_version(g) && !is_mp3_only(g));
    }

    #[test]
    fn test_lone_mp3_is_mp3_only() {
        let records = vec![analyzed("/1.mp3", "x"), analyzed("/2.flac", "y")];
        let grouping = group(&records);
        assert!(duplicates(&grouping).is_empty());
        assert_eq!(mp3_only(&grouping).len(), 1);
        assert_eq!(mp3_only_keys(&grouping)[0].title, "x");
    }

    #[test]
    fn test_single_flac_in_no_set() {
        let records = vec![analyzed("/1.flac", "x")];
        let grouping = group(&records);
        assert!(duplicates(&grouping).is_empty());
        assert!(multi_version(&grouping).is_empty());
        assert!(mp3_only(&grouping).is_empty());
    }

    #[test]
    fn test_keys_are_distinct() {
        let records = vec![
            analyzed("/1.mp3", "x"),
            analyzed("/2.flac", "x"),
            analyzed("/3.mp3", "y"),
            analyzed("/4.wav", "y"),
        ];
        let grouping = group(&records);
        assert_eq!(duplicate_keys(&grouping).len(), 2);
        assert_eq!(multi_version_keys(&grouping).len(), 2);
        assert!(mp3_only_keys(&grouping).is_empty());
    }
}
