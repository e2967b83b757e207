//! Temporal access pattern classification
//!
//! Each file's intervals are put in start-time order and every adjacent pair
//! is classified by where the second access starts relative to the end of the
//! first:
//!
//! - `1,2,3` consecutive: starts exactly where the previous one ended
//! - `1,3,9` sequential: forward jump, leaving a gap
//! - `1,3,2` random: overlaps or goes backwards

use crate::filter::FileFilter;
use crate::intervals::{FileIntervals, IoInterval};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::ops::Add;

/// Classification of one adjacent pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessPattern {
    Consecutive,
    Sequential,
    Random,
}

impl AccessPattern {
    /// Classify `b` following `a` in time
    pub fn between(a: &IoInterval, b: &IoInterval) -> Self {
        let end = a.end();
        if end == b.offset {
            AccessPattern::Consecutive
        } else if end < b.offset {
            AccessPattern::Sequential
        } else {
            AccessPattern::Random
        }
    }
}

/// Global pattern counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternTally {
    pub consecutive: u64,
    pub sequential: u64,
    pub random: u64,
}

impl PatternTally {
    pub fn record(&mut self, pattern: AccessPattern) {
        match pattern {
            AccessPattern::Consecutive => self.consecutive += 1,
            AccessPattern::Sequential => self.sequential += 1,
            AccessPattern::Random => self.random += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.consecutive + self.sequential + self.random
    }

    /// Label/count pairs in display order
    pub fn entries(&self) -> [(&'static str, u64); 3] {
        [
            ("consecutive", self.consecutive),
            ("sequential", self.sequential),
            ("random", self.random),
        ]
    }
}

impl Add for PatternTally {
    type Output = PatternTally;

    fn add(self, rhs: Self) -> Self::Output {
        PatternTally {
            consecutive: self.consecutive + rhs.consecutive,
            sequential: self.sequential + rhs.sequential,
            random: self.random + rhs.random,
        }
    }
}

/// Tally for a single file's intervals (any order; sorted internally)
pub fn classify_file(intervals: &[IoInterval]) -> PatternTally {
    let mut tally = PatternTally::default();
    if intervals.len() < 2 {
        return tally;
    }

    let mut ordered: Vec<&IoInterval> = intervals.iter().collect();
    // stable: equal start times keep record order
    ordered.sort_by(|a, b| a.tstart.total_cmp(&b.tstart));

    for pair in ordered.windows(2) {
        tally.record(AccessPattern::between(pair[0], pair[1]));
    }
    tally
}

/// Tally access patterns across every non-ignorable file
pub fn classify_patterns<F: FileFilter + ?Sized>(
    intervals: &FileIntervals,
    filter: &F,
) -> PatternTally {
    let tally = intervals
        .as_map()
        .par_iter()
        .filter(|(file, _)| !filter.is_ignorable(file))
        .map(|(_, list)| classify_file(list))
        .reduce(PatternTally::default, |a, b| a + b);

    tracing::debug!(
        consecutive = tally.consecutive,
        sequential = tally.sequential,
        random = tally.random,
        "classified access patterns"
    );
    tally
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::PathFilter;
    use std::collections::BTreeSet;

    fn iv(tstart: f64, offset: u64, count: u64) -> IoInterval {
        IoInterval {
            rank: 0,
            tstart,
            tend: tstart + 0.5,
            offset,
            count,
            is_read: false,
            segments: BTreeSet::new(),
        }
    }

    #[test]
    fn test_consecutive_writes() {
        let list = vec![iv(0.0, 0, 10), iv(1.0, 10, 10), iv(2.0, 20, 10)];
        let tally = classify_file(&list);
        assert_eq!(tally.consecutive, 2);
        assert_eq!(tally.total(), 2);
    }

    #[test]
    fn test_gap_is_sequential() {
        let list = vec![iv(0.0, 0, 10), iv(1.0, 50, 10)];
        let tally = classify_file(&list);
        assert_eq!(tally.sequential, 1);
        assert_eq!(tally.total(), 1);
    }

    #[test]
    fn test_backward_and_overlap_are_random() {
        let list = vec![iv(0.0, 100, 10), iv(1.0, 0, 10), iv(2.0, 5, 10)];
        let tally = classify_file(&list);
        assert_eq!(tally.random, 2);
    }

    #[test]
    fn test_sorted_by_start_time_not_input_order() {
        // Input order is reversed in time
        let list = vec![iv(2.0, 20, 10), iv(1.0, 10, 10), iv(0.0, 0, 10)];
        let tally = classify_file(&list);
        assert_eq!(tally.consecutive, 2);
    }

    #[test]
    fn test_equal_start_times_keep_record_order() {
        let list = vec![iv(1.0, 0, 10), iv(1.0, 10, 10)];
        assert_eq!(classify_file(&list).consecutive, 1);

        let list = vec![iv(1.0, 10, 10), iv(1.0, 0, 10)];
        assert_eq!(classify_file(&list).random, 1);
    }

    #[test]
    fn test_single_interval_contributes_nothing() {
        assert_eq!(classify_file(&[iv(0.0, 0, 10)]).total(), 0);
        assert_eq!(classify_file(&[]).total(), 0);
    }

    #[test]
    fn test_global_tally_skips_ignorable_files() {
        let mut intervals = FileIntervals::new();
        for i in [iv(0.0, 0, 10), iv(1.0, 10, 10)] {
            intervals.push("g", i);
        }
        for i in [iv(0.0, 0, 10), iv(1.0, 50, 10)] {
            intervals.push("h", i);
        }
        for i in [iv(0.0, 0, 10), iv(1.0, 0, 10)] {
            intervals.push("stderr", i);
        }

        let tally = classify_patterns(&intervals, &PathFilter::default());
        assert_eq!(
            tally,
            PatternTally {
                consecutive: 1,
                sequential: 1,
                random: 0
            }
        );
    }
}
