// src/metadata/store.rs
use std::collections::HashMap;

use crate::metadata::value::MetaValue;

/// The five structural buckets a metadata entry can live in. Entries are
/// serialized grouped by bucket, between the structural header lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum MetaLocation {
    AfterTag,
    AfterBpv,
    AfterVpe,
    AfterSequential,
    #[default]
    End,
}

impl MetaLocation {
    pub const COUNT: usize = 5;

    pub const ALL: [MetaLocation; MetaLocation::COUNT] = [
        MetaLocation::AfterTag,
        MetaLocation::AfterBpv,
        MetaLocation::AfterVpe,
        MetaLocation::AfterSequential,
        MetaLocation::End,
    ];

    pub fn index(self) -> usize {
        match self {
            MetaLocation::AfterTag => 0,
            MetaLocation::AfterBpv => 1,
            MetaLocation::AfterVpe => 2,
            MetaLocation::AfterSequential => 3,
            MetaLocation::End => 4,
        }
    }
}

/// Delimiter used in auto-generated comment names. It cannot start a
/// user metadata name, so generated names never collide with real ones.
pub(crate) const COMMENT_NAME_DELIM: char = ';';

/// Standard name for a comment stored at (bucket, index).
pub fn comment_name(location: MetaLocation, index: u64) -> String {
    format!(
        "{}{}{}{}",
        COMMENT_NAME_DELIM,
        location.index(),
        COMMENT_NAME_DELIM,
        index
    )
}

/// One named metadata entry with its serialization position.
#[derive(Debug, Clone, PartialEq)]
pub struct MetaEntry {
    pub name: String,
    pub location: MetaLocation,
    /// Position within the bucket; drawn from a monotonic per-bucket counter.
    pub index: u64,
    /// Global insertion order, the tiebreaker for equal indices.
    pub(crate) seq: u64,
    pub value: MetaValue,
}

/// Name-keyed metadata collection with bucketed ordering.
///
/// Names are unique: inserting an existing name replaces the entry in place,
/// and the replacement takes the NEW bucket/index. There is no positional
/// insertion; append-or-replace is the whole contract, by design.
#[derive(Debug, Clone, Default)]
pub struct MetaStore {
    entries: HashMap<String, MetaEntry>,
    loc_counts: [u64; MetaLocation::COUNT],
    next_seq: u64,
}

impl MetaStore {
    pub fn new() -> Self {
        MetaStore::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&MetaEntry> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetaEntry> {
        self.entries.values()
    }

    /// Claim the next sequence index within a bucket. The counter only ever
    /// grows; an overwrite leaves a gap, which is harmless since indices are
    /// used solely for comment naming and sorting.
    pub(crate) fn next_index(&mut self, location: MetaLocation) -> u64 {
        let index = self.loc_counts[location.index()];
        self.loc_counts[location.index()] += 1;
        index
    }

    /// Append-or-replace by name.
    pub(crate) fn insert(
        &mut self,
        name: String,
        location: MetaLocation,
        index: u64,
        value: MetaValue,
    ) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(
            name.clone(),
            MetaEntry {
                name,
                location,
                index,
                seq,
                value,
            },
        );
    }

    /// All entries grouped by bucket, each bucket sorted by sequence index
    /// ascending (insertion order breaks ties). This is the writer's only
    /// ordering input.
    pub fn grouped_by_location(&self) -> [Vec<&MetaEntry>; MetaLocation::COUNT] {
        let mut groups: [Vec<&MetaEntry>; MetaLocation::COUNT] = Default::default();
        for entry in self.entries.values() {
            groups[entry.location.index()].push(entry);
        }
        for group in &mut groups {
            group.sort_by_key(|entry| (entry.index, entry.seq));
        }
        groups
    }
}
