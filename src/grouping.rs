//! Partition analyzed records into song groups.

use crate::models::{AnalyzedRecord, GroupIndex, IdentityKey};

/// All records sharing one identity key, in first-seen order.
#[derive(Clone, Debug)]
pub struct SongGroup<'a> {
    pub key: &'a IdentityKey, // stored once per group
    pub members: Vec<&'a AnalyzedRecord>,
}

impl<'a> SongGroup<'a> {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Number of distinct formats among the members.
    pub fn distinct_formats(&self) -> usize {
        self.formats_sorted().len()
    }

    pub fn formats_sorted(&self) -> Vec<&'a str> {
        let mut formats: Vec<&'a str> = self.members.iter().map(|&m| m.record.format.as_str()).collect();
        formats.sort_unstable();
        formats.dedup();
        formats
    }
}

/// Key → group mapping over one snapshot. Groups are ordered by the first
/// appearance of their key; unresolvable records never appear.
#[derive(Clone, Debug, Default)]
pub struct Grouping<'a> {
    pub groups: Vec<SongGroup<'a>>,
    index: GroupIndex,
}

impl<'a> Grouping<'a> {
    pub fn get(&self, key: &IdentityKey) -> Option<&SongGroup<'a>> {
        self.index.get(key).map(|&i| &self.groups[i])
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SongGroup<'a>> {
        self.groups.iter()
    }
}

/// Group records by identity key, dropping records without one.
pub fn group<'a, I>(records: I) -> Grouping<'a>
where
    I: IntoIterator<Item = &'a AnalyzedRecord>,
{
    let mut grouping = Grouping::default();

    for record in records {
        let Some(key) = record.song_key.as_ref() else {
            continue;
        };
        match grouping.index.get(key) {
            Some(&i) => grouping.groups[i].members.push(record),
            None => {
                grouping.index.insert(key.clone(), grouping.groups.len());
                grouping.groups.push(SongGroup {
                    key,
                    members: vec![record],
                });
            }
        }
    }

    grouping
}
