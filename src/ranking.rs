//! Retention ranking for song groups.
//!
//! Within a group of two or more files exactly one is retained: the member
//! with the highest format priority, earliest-seen on ties. Every other
//! member is removable. Singletons are never touched.

use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};

use crate::grouping::{Grouping, SongGroup};
use crate::models::{format_priority, AnalyzedRecord};

// ============================================================================
// Group Ranking
// ============================================================================

/// Order a group's members best-first.
///
/// The sort is stable, so equal-priority members keep scan order and the
/// first one scanned wins.
pub fn rank_group<'a>(group: &SongGroup<'a>) -> Vec<&'a AnalyzedRecord> {
    let mut ranked = group.members.clone();
    ranked.sort_by(|a, b| format_priority(&b.record.format).cmp(&format_priority(&a.record.format)));
    ranked
}

/// The member a group keeps.
pub fn retained<'a>(group: &SongGroup<'a>) -> Option<&'a AnalyzedRecord> {
    rank_group(group).into_iter().next()
}

// ============================================================================
// Removal Plan
// ============================================================================

/// Per-path retention decisions for one grouping.
#[derive(Debug, Clone, Default)]
pub struct RemovalPlan {
    decisions: FxHashMap<PathBuf, bool>,
}

impl RemovalPlan {
    /// Whether the file at `path` may be deleted. Paths outside the plan
    /// (unresolvable records) are never deletable.
    pub fn should_delete(&self, path: &Path) -> bool {
        self.decisions.get(path).copied().unwrap_or(false)
    }

    pub fn removable_count(&self) -> usize {
        self.decisions.values().filter(|&&d| d).count()
    }

    pub fn len(&self) -> usize {
        self.decisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }

    fn record(&mut self, path: &Path, delete: bool) {
        // A path retained anywhere in the snapshot stays retained.
        self.decisions
            .entry(path.to_path_buf())
            .and_modify(|d| *d &= delete)
            .or_insert(delete);
    }
}

/// Decide, for every grouped record, whether it should be deleted.
pub fn rank_and_mark(grouping: &Grouping<'_>) -> RemovalPlan {
    let mut plan = RemovalPlan::default();

    for group in grouping.iter() {
        if group.len() < 2 {
            for member in &group.members {
                plan.record(member.path(), false);
            }
            continue;
        }
        for (rank, member) in rank_group(group).into_iter().enumerate() {
            plan.record(member.path(), rank > 0);
        }
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grouping::group;
    use crate::models::{IdentityKey, MetadataRecord};

    fn analyzed(path: &str) -> AnalyzedRecord {
        AnalyzedRecord {
            record: MetadataRecord::new(path),
            song_key: Some(IdentityKey {
                title: "x".to_string(),
                artist: "y".to_string(),
                duration_secs: 200,
            }),
        }
    }

    #[test]
    fn test_flac_beats_mp3() {
        let records = vec![analyzed("/a.mp3"), analyzed("/b.flac")];
        let grouping = group(&records);
        let plan = rank_and_mark(&grouping);
        assert!(plan.should_delete(Path::new("/a.mp3")));
        assert!(!plan.should_delete(Path::new("/b.flac")));
    }

    #[test]
    fn test_earliest_wins_tie() {
        let records = vec![analyzed("/1.mp3"), analyzed("/2.mp3"), analyzed("/3.mp3")];
        let grouping = group(&records);
        let plan = rank_and_mark(&grouping);
        assert!(!plan.should_delete(Path::new("/1.mp3")));
        assert!(plan.should_delete(Path::new("/2.mp3")));
        assert!(plan.should_delete(Path::new("/3.mp3")));
        assert_eq!(plan.removable_count(), 2);
    }

    #[test]
    fn test_lossless_tie_keeps_first_seen() {
        let records = vec![analyzed("/a.mp3"), analyzed("/b.wav"), analyzed("/c.flac"), analyzed("/d.alac")];
        let grouping = group(&records);
        assert_eq!(retained(&grouping.groups[0]).map(|r| r.path()), Some(Path::new("/b.wav")));
    }

    #[test]
    fn test_unknown_formats_tie() {
        let records = vec![analyzed("/a.ogg"), analyzed("/b.m4a")];
        let grouping = group(&records);
        let plan = rank_and_mark(&grouping);
        assert!(!plan.should_delete(Path::new("/a.ogg")));
        assert!(plan.should_delete(Path::new("/b.m4a")));
    }

    #[test]
    fn test_priority_ladder() {
        let records = vec![analyzed("/a.ogg"), analyzed("/b.mp3"), analyzed("/c.aac"), analyzed("/d.aiff")];
        let grouping = group(&records);
        let ranked: Vec<_> = rank_group(&grouping.groups[0])
            .iter()
            .map(|r| r.record.format.clone())
            .collect();
        assert_eq!(ranked, vec!["aiff", "aac", "mp3", "ogg"]);
    }

    #[test]
    fn test_m4a_ranks_below_mp3() {
        // priority follows the extension, whatever codec the container holds
        let records = vec![analyzed("/a.m4a"), analyzed("/b.mp3")];
        let grouping = group(&records);
        let plan = rank_and_mark(&grouping);
        assert!(plan.should_delete(Path::new("/a.m4a")));
        assert!(!plan.should_delete(Path::new("/b.mp3")));
    }

    #[test]
    fn test_singleton_never_deleted() {
        let records = vec![analyzed("/only.mp3")];
        let grouping = group(&records);
        let plan = rank_and_mark(&grouping);
        assert!(!plan.should_delete(Path::new("/only.mp3")));
        assert_eq!(plan.removable_count(), 0);
    }

    #[test]
    fn test_exactly_one_survivor_with_max_priority() {
        let records = vec![
            analyzed("/1.mp3"),
            analyzed("/2.aac"),
            analyzed("/3.flac"),
            analyzed("/4.wav"),
            analyzed("/5.mp3"),
        ];
        let grouping = group(&records);
        let plan = rank_and_mark(&grouping);
        let survivors: Vec<_> = records.iter().filter(|r| !plan.should_delete(r.path())).collect();
        assert_eq!(survivors.len(), 1);
        let best = records.iter().map(|r| format_priority(&r.record.format)).max().unwrap();
        assert_eq!(format_priority(&survivors[0].record.format), best);
    }

    #[test]
    fn test_repeated_path_stays_retained() {
        let records = vec![analyzed("/same.flac"), analyzed("/same.flac")];
        let grouping = group(&records);
        let plan = rank_and_mark(&grouping);
        assert!(!plan.should_delete(Path::new("/same.flac")));
    }

    #[test]
    fn test_unknown_path_not_deletable() {
        let plan = RemovalPlan::default();
        assert!(!plan.should_delete(Path::new("/nowhere.mp3")));
    }
}
