//! Read/write conflict detection
//!
//! Intervals of one file are sorted by starting offset and each adjacent pair
//! is checked for a byte-range overlap. An overlapping pair only counts as a
//! conflict when both operations carry session context and the contexts show
//! a shared epoch (nothing like a close/open or sync orders them). The
//! earlier operation by start time decides the kind:
//!
//! | earlier | later | kind |
//! |---------|-------|------|
//! | read    | read  | RAR  |
//! | write   | read  | RAW  |
//! | write   | write | WAW  |
//! | read    | write | WAR  |
//!
//! Only neighbours in offset order are compared, which keeps the cost at
//! O(n log n) per file; overlapping ranges almost always end up adjacent.
//!
//! Start-time ties go to the lower rank, then to the interval that comes
//! first in offset order.

use crate::config::SegmentMatch;
use crate::filter::FileFilter;
use crate::intervals::{FileIntervals, IoInterval};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConflictKind {
    #[serde(rename = "RAR")]
    Rar,
    #[serde(rename = "RAW")]
    Raw,
    #[serde(rename = "WAW")]
    Waw,
    #[serde(rename = "WAR")]
    War,
}

impl ConflictKind {
    pub const ALL: [ConflictKind; 4] = [
        ConflictKind::Rar,
        ConflictKind::Raw,
        ConflictKind::Waw,
        ConflictKind::War,
    ];

    /// Kind for an (earlier, later) pair of read flags
    pub fn from_order(earlier_is_read: bool, later_is_read: bool) -> Self {
        match (earlier_is_read, later_is_read) {
            (true, true) => ConflictKind::Rar,
            (true, false) => ConflictKind::War,
            (false, false) => ConflictKind::Waw,
            (false, true) => ConflictKind::Raw,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ConflictKind::Rar => "RAR",
            ConflictKind::Raw => "RAW",
            ConflictKind::Waw => "WAW",
            ConflictKind::War => "WAR",
        }
    }
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Same-rank / different-rank counters for one conflict kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankSplit {
    pub same_rank: u64,
    pub different_rank: u64,
}

impl RankSplit {
    pub fn total(&self) -> u64 {
        self.same_rank + self.different_rank
    }
}

/// Conflict counters for one file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictTally {
    #[serde(rename = "RAR")]
    pub rar: RankSplit,
    #[serde(rename = "RAW")]
    pub raw: RankSplit,
    #[serde(rename = "WAW")]
    pub waw: RankSplit,
    #[serde(rename = "WAR")]
    pub war: RankSplit,
}

impl ConflictTally {
    pub fn get(&self, kind: ConflictKind) -> RankSplit {
        match kind {
            ConflictKind::Rar => self.rar,
            ConflictKind::Raw => self.raw,
            ConflictKind::Waw => self.waw,
            ConflictKind::War => self.war,
        }
    }

    fn get_mut(&mut self, kind: ConflictKind) -> &mut RankSplit {
        match kind {
            ConflictKind::Rar => &mut self.rar,
            ConflictKind::Raw => &mut self.raw,
            ConflictKind::Waw => &mut self.waw,
            ConflictKind::War => &mut self.war,
        }
    }

    pub fn record(&mut self, kind: ConflictKind, same_rank: bool) {
        let split = self.get_mut(kind);
        if same_rank {
            split.same_rank += 1;
        } else {
            split.different_rank += 1;
        }
    }

    pub fn total(&self) -> u64 {
        ConflictKind::ALL.iter().map(|k| self.get(*k).total()).sum()
    }
}

/// Whether two segment sets show a shared epoch
///
/// Two operations of the same rank share an epoch only when they ran in the
/// same local session. Another rank's session that spans both of them does not
/// undo this rank's own close/open or sync.
pub fn shares_epoch(a: &IoInterval, b: &IoInterval, mode: SegmentMatch) -> bool {
    if a.segments.is_empty() || b.segments.is_empty() {
        return false;
    }
    if a.rank == b.rank {
        let local = a.local_segment();
        return local.is_some() && local == b.local_segment();
    }
    match mode {
        SegmentMatch::Intersect => a.segments.intersection(&b.segments).next().is_some(),
        SegmentMatch::LocalSession => {
            a.local_segment().is_some_and(|s| b.segments.contains(&s))
                || b.local_segment().is_some_and(|s| a.segments.contains(&s))
        }
    }
}

/// Order two intervals in time; returns (earlier, later)
fn temporal_order<'a>(
    i1: &'a IoInterval,
    i2: &'a IoInterval,
) -> (&'a IoInterval, &'a IoInterval) {
    if i2.tstart < i1.tstart || (i2.tstart == i1.tstart && i2.rank < i1.rank) {
        (i2, i1)
    } else {
        (i1, i2)
    }
}

/// Classify one adjacent pair in offset order, if it is a conflict
pub fn classify_pair(
    i1: &IoInterval,
    i2: &IoInterval,
    mode: SegmentMatch,
) -> Option<(ConflictKind, bool)> {
    if i1.end() <= i2.offset {
        return None;
    }
    if !shares_epoch(i1, i2, mode) {
        return None;
    }
    let (earlier, later) = temporal_order(i1, i2);
    let kind = ConflictKind::from_order(earlier.is_read, later.is_read);
    Some((kind, earlier.rank == later.rank))
}

/// Conflicts within a single file's intervals (any order; sorted internally)
pub fn detect_file(intervals: &[IoInterval], mode: SegmentMatch) -> ConflictTally {
    let mut tally = ConflictTally::default();
    let mut ordered: Vec<&IoInterval> = intervals.iter().collect();
    ordered.sort_by_key(|i| i.offset);

    for pair in ordered.windows(2) {
        if let Some((kind, same_rank)) = classify_pair(pair[0], pair[1], mode) {
            tally.record(kind, same_rank);
        }
    }
    tally
}

/// Per-file conflict tallies for every non-ignorable file
pub fn detect_conflicts<F: FileFilter + ?Sized>(
    intervals: &FileIntervals,
    filter: &F,
    mode: SegmentMatch,
) -> BTreeMap<String, ConflictTally> {
    let tallies: BTreeMap<String, ConflictTally> = intervals
        .as_map()
        .par_iter()
        .filter(|(file, _)| !filter.is_ignorable(file))
        .map(|(file, list)| (file.clone(), detect_file(list, mode)))
        .collect();

    for (file, tally) in &tallies {
        for kind in ConflictKind::ALL {
            let split = tally.get(kind);
            if split.total() > 0 && kind != ConflictKind::Rar {
                tracing::debug!(
                    same_rank = split.same_rank,
                    different_rank = split.different_rank,
                    "{} conflicts on {}",
                    kind,
                    file
                );
            }
        }
    }
    tallies
}
