//! Analysis pipeline: the function boundary between the scanner and the
//! report/removal shims.
//!
//! Every function here is a pure transform over one record snapshot. Callers
//! re-run the pipeline after each scan; nothing is cached between runs.

use rustc_hash::FxHashSet;

use crate::classify;
use crate::grouping::group;
use crate::models::{AnalyzedRecord, IdentityKey, LibrarySummary, MarkedRecord, MetadataRecord};
use crate::normalize::{build_key, KeyOptions};
use crate::ranking::rank_and_mark;

/// Attach an identity key (or `None`) to every record, preserving order.
pub fn analyze(records: Vec<MetadataRecord>, options: &KeyOptions) -> Vec<AnalyzedRecord> {
    records
        .into_iter()
        .map(|record| {
            let song_key = build_key(&record, options);
            AnalyzedRecord { record, song_key }
        })
        .collect()
}

pub fn find_duplicates(records: &[AnalyzedRecord]) -> Vec<&AnalyzedRecord> {
    in_input_order(records, classify::duplicate_keys(&group(records)))
}

pub fn find_multi_version(records: &[AnalyzedRecord]) -> Vec<&AnalyzedRecord> {
    in_input_order(records, classify::multi_version_keys(&group(records)))
}

pub fn find_mp3_only(records: &[AnalyzedRecord]) -> Vec<&AnalyzedRecord> {
    in_input_order(records, classify::mp3_only_keys(&group(records)))
}

/// Class membership is per key, so a record belongs to the class exactly
/// when its key was selected. Reports list members in scan order.
fn in_input_order<'a>(records: &'a [AnalyzedRecord], keys: Vec<&IdentityKey>) -> Vec<&'a AnalyzedRecord> {
    let keys: FxHashSet<&IdentityKey> = keys.into_iter().collect();
    records
        .iter()
        .filter(|r| r.song_key.as_ref().is_some_and(|k| keys.contains(k)))
        .collect()
}

/// Attach a retention decision to every analyzed record.
pub fn mark_for_deletion(records: Vec<AnalyzedRecord>) -> Vec<MarkedRecord> {
    let plan = rank_and_mark(&group(&records));
    let decisions: Vec<bool> = records.iter().map(|r| plan.should_delete(r.path())).collect();
    records
        .into_iter()
        .zip(decisions)
        .map(|(analyzed, should_delete)| MarkedRecord { analyzed, should_delete })
        .collect()
}

/// Records whose files may be removed.
pub fn removable(records: &[MarkedRecord]) -> Vec<&MarkedRecord> {
    records.iter().filter(|r| r.should_delete).collect()
}

/// Library-wide counts for the overview screen.
pub fn summarize(records: &[MarkedRecord]) -> LibrarySummary {
    let grouping = group(records.iter().map(|r| &r.analyzed));

    let mut formats: Vec<&str> = records.iter().map(|r| r.record().format.as_str()).collect();
    formats.sort_unstable();
    formats.dedup();

    LibrarySummary {
        total_files: records.len(),
        unresolved_files: records.iter().filter(|r| r.song_key().is_none()).count(),
        unique_songs: grouping.len(),
        duplicate_songs: classify::duplicate_keys(&grouping).len(),
        duplicate_files: classify::duplicates(&grouping).len(),
        multi_version_songs: classify::multi_version_keys(&grouping).len(),
        mp3_only_songs: classify::mp3_only_keys(&grouping).len(),
        format_count: formats.len(),
        removable_files: removable(records).len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(path: &str, title: Option<&str>, artist: Option<&str>, duration: Option<f64>) -> MetadataRecord {
        let mut r = MetadataRecord::new(path);
        r.title = title.map(str::to_string);
        r.artist = artist.map(str::to_string);
        r.duration_seconds = duration;
        r
    }

    fn song(path: &str, duration: f64) -> MetadataRecord {
        rec(path, Some("X"), Some("Y"), Some(duration))
    }

    fn paths<'a, I: IntoIterator<Item = &'a AnalyzedRecord>>(records: I) -> Vec<&'a str> {
        records.into_iter().map(|r| r.path().to_str().unwrap()).collect()
    }

    #[test]
    fn test_empty_input() {
        let analyzed = analyze(Vec::new(), &KeyOptions::default());
        assert!(find_duplicates(&analyzed).is_empty());
        assert!(find_multi_version(&analyzed).is_empty());
        assert!(find_mp3_only(&analyzed).is_empty());
        let marked = mark_for_deletion(analyzed);
        assert!(removable(&marked).is_empty());
        assert_eq!(summarize(&marked), LibrarySummary::default());
    }

    #[test]
    fn test_rounding_scenario() {
        // 200.4 and 200.6 split, 200.4 and 200.3 merge
        let split = analyze(vec![song("/a.flac", 200.4), song("/b.mp3", 200.6)], &KeyOptions::default());
        assert!(find_duplicates(&split).is_empty());

        let merged = analyze(vec![song("/a.flac", 200.4), song("/b.mp3", 200.3)], &KeyOptions::default());
        assert_eq!(paths(find_multi_version(&merged)), vec!["/a.flac", "/b.mp3"]);

        let marked = mark_for_deletion(merged);
        assert!(!marked[0].should_delete);
        assert!(marked[1].should_delete);
    }

    #[test]
    fn test_three_mp3_scenario() {
        let analyzed = analyze(
            vec![song("/1.mp3", 100.0), song("/2.mp3", 100.0), song("/3.mp3", 100.0)],
            &KeyOptions::default(),
        );
        assert_eq!(find_duplicates(&analyzed).len(), 3);
        assert!(find_multi_version(&analyzed).is_empty());
        assert_eq!(find_mp3_only(&analyzed).len(), 3);

        let marked = mark_for_deletion(analyzed);
        let flags: Vec<bool> = marked.iter().map(|m| m.should_delete).collect();
        assert_eq!(flags, vec![false, true, true]);
    }

    #[test]
    fn test_single_flac_scenario() {
        let analyzed = analyze(vec![song("/only.flac", 250.0)], &KeyOptions::default());
        assert!(find_duplicates(&analyzed).is_empty());
        assert!(find_multi_version(&analyzed).is_empty());
        assert!(find_mp3_only(&analyzed).is_empty());
        let marked = mark_for_deletion(analyzed);
        assert!(!marked[0].should_delete);
    }

    #[test]
    fn test_unresolvable_never_flagged() {
        let analyzed = analyze(
            vec![
                rec("/no-title-1.mp3", None, Some("Y"), Some(100.0)),
                rec("/no-title-2.mp3", None, Some("Y"), Some(100.0)),
                rec("/no-duration.mp3", Some("X"), Some("Y"), None),
                song("/ok.mp3", 100.0),
            ],
            &KeyOptions::default(),
        );
        assert_eq!(paths(find_mp3_only(&analyzed)), vec!["/ok.mp3"]);
        assert!(find_duplicates(&analyzed).is_empty());

        let marked = mark_for_deletion(analyzed);
        assert!(removable(&marked).is_empty());
        assert_eq!(summarize(&marked).unresolved_files, 3);
    }

    #[test]
    fn test_results_follow_scan_order() {
        let analyzed = analyze(
            vec![
                rec("/x1.mp3", Some("X"), Some("A"), Some(10.0)),
                rec("/z1.mp3", Some("Z"), Some("A"), Some(10.0)),
                rec("/x2.flac", Some("X"), Some("A"), Some(10.0)),
                rec("/z2.mp3", Some("Z"), Some("A"), Some(10.0)),
            ],
            &KeyOptions::default(),
        );
        assert_eq!(paths(find_duplicates(&analyzed)), vec!["/x1.mp3", "/z1.mp3", "/x2.flac", "/z2.mp3"]);
    }

    #[test]
    fn test_mark_is_idempotent() {
        let input = vec![song("/1.mp3", 90.0), song("/2.flac", 90.2), song("/3.wav", 89.9)];
        let first = mark_for_deletion(analyze(input.clone(), &KeyOptions::default()));
        let second = mark_for_deletion(analyze(input, &KeyOptions::default()));
        assert_eq!(first, second);
    }

    #[test]
    fn test_summary_counts() {
        let analyzed = analyze(
            vec![
                rec("/x.mp3", Some("X"), Some("A"), Some(10.0)),
                rec("/x.flac", Some("X"), Some("A"), Some(10.0)),
                rec("/y.mp3", Some("Y"), Some("A"), Some(10.0)),
                rec("/u.ogg", None, None, None),
            ],
            &KeyOptions::default(),
        );
        let summary = summarize(&mark_for_deletion(analyzed));
        assert_eq!(summary.total_files, 4);
        assert_eq!(summary.unresolved_files, 1);
        assert_eq!(summary.unique_songs, 2);
        assert_eq!(summary.duplicate_songs, 1);
        assert_eq!(summary.duplicate_files, 2);
        assert_eq!(summary.multi_version_songs, 1);
        assert_eq!(summary.mp3_only_songs, 1);
        assert_eq!(summary.format_count, 3);
        assert_eq!(summary.removable_files, 1);
    }
}
