//! Per-file I/O statistics
//!
//! Two phases: transfer bytes and time are summed from the interval set, then
//! the raw records are scanned again to charge metadata calls (open, close,
//! sync, seek) to the files they target.

use crate::catalog::{FunctionCatalog, FunctionClass};
use crate::filter::FileFilter;
use crate::intervals::FileIntervals;
use crate::trace::RecordStream;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

const MIB: f64 = 1024.0 * 1024.0;

/// Bandwidth in MB/s; zero when no time was spent
pub fn bandwidth(bytes: u64, seconds: f64) -> f64 {
    if seconds > 0.0 {
        bytes as f64 / seconds / MIB
    } else {
        0.0
    }
}

/// Statistics for a single file
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FileStatistics {
    pub bytes_written: u64,
    /// Cumulative write time (seconds)
    pub write_time: f64,
    pub bytes_read: u64,
    /// Cumulative read time (seconds)
    pub read_time: f64,
    /// Time spent in open/close/sync/seek calls (seconds)
    pub metadata_time: f64,
}

impl FileStatistics {
    pub fn write_bandwidth(&self) -> f64 {
        bandwidth(self.bytes_written, self.write_time)
    }

    pub fn read_bandwidth(&self) -> f64 {
        bandwidth(self.bytes_read, self.read_time)
    }
}

/// Aggregates [`FileStatistics`] for every tracked file
pub struct StatisticsAggregator<'a, F: FileFilter + ?Sized> {
    catalog: &'a FunctionCatalog,
    filter: &'a F,
}

impl<'a, F: FileFilter + ?Sized> StatisticsAggregator<'a, F> {
    pub fn new(catalog: &'a FunctionCatalog, filter: &'a F) -> Self {
        Self { catalog, filter }
    }

    /// Run both phases
    pub fn aggregate<S: RecordStream + ?Sized>(
        &self,
        intervals: &FileIntervals,
        stream: &S,
    ) -> BTreeMap<String, FileStatistics> {
        let mut stats = self.transfer_totals(intervals);
        self.add_metadata_time(&mut stats, stream);

        tracing::debug!(files = stats.len(), "aggregated per-file statistics");
        stats
    }

    /// Phase 1: bytes and time per direction
    pub fn transfer_totals(&self, intervals: &FileIntervals) -> BTreeMap<String, FileStatistics> {
        let mut stats = BTreeMap::new();

        for (file, list) in intervals.iter() {
            if self.filter.is_ignorable(file) {
                continue;
            }

            let mut entry = FileStatistics::default();
            for interval in list {
                if interval.is_read {
                    entry.bytes_read = entry.bytes_read.saturating_add(interval.count);
                    entry.read_time += interval.duration();
                } else {
                    entry.bytes_written = entry.bytes_written.saturating_add(interval.count);
                    entry.write_time += interval.duration();
                }
            }
            stats.insert(file.to_string(), entry);
        }

        stats
    }

    /// Phase 2: charge metadata call time to tracked files
    ///
    /// Ranks are scanned in parallel into rank-local sums, which are then
    /// added in rank order.
    pub fn add_metadata_time<S: RecordStream + ?Sized>(
        &self,
        stats: &mut BTreeMap<String, FileStatistics>,
        stream: &S,
    ) {
        let tracked: &BTreeMap<String, FileStatistics> = stats;
        let per_rank: Vec<Vec<(String, f64)>> = (0..stream.total_ranks())
            .into_par_iter()
            .map(|rank| self.rank_metadata_time(stream, rank, tracked))
            .collect();

        for rank_times in per_rank {
            for (file, time) in rank_times {
                if let Some(entry) = stats.get_mut(&file) {
                    entry.metadata_time += time;
                }
            }
        }
    }

    fn rank_metadata_time<S: RecordStream + ?Sized>(
        &self,
        stream: &S,
        rank: usize,
        tracked: &BTreeMap<String, FileStatistics>,
    ) -> Vec<(String, f64)> {
        // First-seen order keeps the per-file sums in record order
        let mut order: Vec<String> = Vec::new();
        let mut sums: HashMap<&str, f64> = HashMap::new();

        for record in stream.records(rank) {
            if !matches!(
                self.catalog.class(record.func_id),
                Some(FunctionClass::Metadata(_))
            ) {
                continue;
            }
            if record.tend < record.tstart {
                continue;
            }
            let Some(file) = stream.target_file(rank, record) else {
                continue;
            };
            let Some((key, _)) = tracked.get_key_value(file) else {
                continue;
            };

            let sum = sums.entry(key.as_str()).or_insert_with(|| {
                order.push(key.clone());
                0.0
            });
            *sum += record.duration();
        }

        order
            .into_iter()
            .map(|file| {
                let time = sums.get(file.as_str()).copied().unwrap_or(0.0);
                (file, time)
            })
            .collect()
    }
}
