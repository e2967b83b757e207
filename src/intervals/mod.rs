// Per-file I/O intervals
//
// Turns raw per-rank call records into byte-range intervals grouped by file.
// Byte offsets are reconstructed from a per-rank file cursor (open/seek/close
// and positional calls), and each interval is stamped with the session
// segments it ran under so conflicts can be judged against epochs.
//
// Intervals are stored in (rank, record) order. Consumers that need another
// order sort their own copy.

mod builder;
mod sessions;

pub use builder::{BuildOutput, IntervalBuilder};
pub use sessions::{stamp_segments, SessionSpan};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::AddAssign;

/// Identifier of one rank's session (open→close or sync-bounded epoch) on a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SegmentId {
    pub rank: u32,
    pub seq: u32,
}

impl SegmentId {
    pub fn new(rank: u32, seq: u32) -> Self {
        Self { rank, seq }
    }
}

/// A single read or write on one file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IoInterval {
    pub rank: u32,
    pub tstart: f64,
    pub tend: f64,
    /// First byte accessed
    pub offset: u64,
    /// Bytes accessed; `offset + count` is exclusive
    pub count: u64,
    pub is_read: bool,
    /// Sessions the operation belongs to; empty means no session context
    pub segments: BTreeSet<SegmentId>,
}

impl IoInterval {
    /// Exclusive end of the byte range
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.count)
    }

    pub fn duration(&self) -> f64 {
        self.tend - self.tstart
    }

    /// The issuing rank's own session, if any
    pub fn local_segment(&self) -> Option<SegmentId> {
        self.segments.iter().copied().find(|s| s.rank == self.rank)
    }

    /// Whether the two byte ranges share at least one byte
    pub fn overlaps(&self, other: &IoInterval) -> bool {
        self.offset < other.end() && other.offset < self.end()
    }
}

/// Filename → intervals, in lexicographic filename order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileIntervals {
    files: BTreeMap<String, Vec<IoInterval>>,
}

impl FileIntervals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, filename: &str, interval: IoInterval) {
        match self.files.get_mut(filename) {
            Some(list) => list.push(interval),
            None => {
                self.files.insert(filename.to_string(), vec![interval]);
            }
        }
    }

    /// Append a whole batch for one file, keeping batch order
    pub fn extend(&mut self, filename: String, intervals: Vec<IoInterval>) {
        self.files.entry(filename).or_default().extend(intervals);
    }

    pub fn get(&self, filename: &str) -> Option<&[IoInterval]> {
        self.files.get(filename).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[IoInterval])> {
        self.files.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn filenames(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// Number of files
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn total_intervals(&self) -> usize {
        self.files.values().map(Vec::len).sum()
    }

    pub(crate) fn files_mut(&mut self) -> &mut BTreeMap<String, Vec<IoInterval>> {
        &mut self.files
    }

    pub fn as_map(&self) -> &BTreeMap<String, Vec<IoInterval>> {
        &self.files
    }
}

impl FromIterator<(String, IoInterval)> for FileIntervals {
    fn from_iter<I: IntoIterator<Item = (String, IoInterval)>>(iter: I) -> Self {
        let mut out = FileIntervals::new();
        for (file, interval) in iter {
            out.push(&file, interval);
        }
        out
    }
}

/// Counts of records seen and skipped while building intervals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildDiagnostics {
    pub records_seen: u64,
    pub intervals: u64,
    /// Function id outside the catalog (user functions)
    pub out_of_range: u64,
    /// No usable filename argument
    pub unresolved_file: u64,
    pub ignored_file: u64,
    /// Count, offset or whence that does not parse
    pub malformed_args: u64,
    /// `tend < tstart`
    pub negative_duration: u64,
}

impl AddAssign for BuildDiagnostics {
    fn add_assign(&mut self, rhs: Self) {
        self.records_seen += rhs.records_seen;
        self.intervals += rhs.intervals;
        self.out_of_range += rhs.out_of_range;
        self.unresolved_file += rhs.unresolved_file;
        self.ignored_file += rhs.ignored_file;
        self.malformed_args += rhs.malformed_args;
        self.negative_duration += rhs.negative_duration;
    }
}
