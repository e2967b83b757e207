//! Property-based tests over randomly generated traces

use iovista::config::{AnalysisConfig, SegmentMatch};
use iovista::conflict::{shares_epoch, ConflictKind};
use iovista::intervals::IoInterval;
use iovista::report::{Analyzer, Report};
use iovista::stats::bandwidth;
use iovista::trace::{CallRecord, FileTable, JsonTrace};
use proptest::prelude::*;

const FUNCS: &[&str] = &["open", "write", "read", "pwrite", "lseek", "close", "fsync"];
const FILES: &[&str] = &["a", "b", "c"];

/// One generated call: (function index, file index, size/offset argument, duration)
fn call() -> impl Strategy<Value = (usize, usize, u64, f64)> {
    (0..FUNCS.len(), 0..FILES.len(), 0u64..512, 0.0f64..0.5)
}

fn to_records(calls: &[(usize, usize, u64, f64)]) -> Vec<CallRecord> {
    let mut clock = 0.0;
    calls
        .iter()
        .map(|&(func, file, value, duration)| {
            let f = FILES[file];
            let value = value.to_string();
            let v = value.as_str();
            let args: Vec<&str> = match FUNCS[func] {
                "open" => vec![f, "O_RDWR"],
                "write" | "read" => vec![f, "buf", v],
                "pwrite" => vec![f, "buf", "64", v],
                "lseek" => vec![f, v, "SEEK_SET"],
                _ => vec![f],
            };
            let record = CallRecord::new(func as u32, clock, clock + duration, &args);
            clock += duration + 0.01;
            record
        })
        .collect()
}

fn build_trace(ranks: &[Vec<(usize, usize, u64, f64)>]) -> JsonTrace {
    let mut trace = JsonTrace {
        functions: FUNCS.iter().map(|s| s.to_string()).collect(),
        ranks: Vec::new(),
    };
    for calls in ranks {
        trace.push_rank(FileTable::new(), to_records(calls));
    }
    trace
}

fn analyze(trace: &JsonTrace) -> Report {
    Analyzer::new(AnalysisConfig::default()).unwrap().run(trace)
}

fn ranks_strategy() -> impl Strategy<Value = Vec<Vec<(usize, usize, u64, f64)>>> {
    prop::collection::vec(prop::collection::vec(call(), 0..40), 1..5)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_pattern_total_is_pairs_per_file(ranks in ranks_strategy()) {
        let report = analyze(&build_trace(&ranks));
        let expected: u64 = report
            .intervals
            .iter()
            .map(|(_, list)| list.len().saturating_sub(1) as u64)
            .sum();
        prop_assert_eq!(report.patterns.total(), expected);
    }

    #[test]
    fn prop_conflicts_bounded_by_adjacent_pairs(ranks in ranks_strategy()) {
        let report = analyze(&build_trace(&ranks));
        for (file, tally) in &report.conflicts {
            let n = report.intervals.get(file).map_or(0, |l| l.len());
            prop_assert!(tally.total() <= n.saturating_sub(1) as u64);
        }
    }

    #[test]
    fn prop_conflict_counts_match_overlapping_pairs(ranks in ranks_strategy()) {
        let report = analyze(&build_trace(&ranks));
        for (file, tally) in &report.conflicts {
            let mut ordered: Vec<&IoInterval> =
                report.intervals.get(file).unwrap_or_default().iter().collect();
            ordered.sort_by_key(|i| i.offset);
            let expected = ordered
                .windows(2)
                .filter(|pair| {
                    pair[0].end() > pair[1].offset
                        && shares_epoch(pair[0], pair[1], SegmentMatch::Intersect)
                })
                .count() as u64;
            prop_assert_eq!(tally.total(), expected);

            let split: u64 = ConflictKind::ALL
                .iter()
                .map(|&kind| tally.get(kind).same_rank + tally.get(kind).different_rank)
                .sum();
            prop_assert_eq!(split, expected);
        }
    }

    #[test]
    fn prop_statistics_match_intervals(ranks in ranks_strategy()) {
        let report = analyze(&build_trace(&ranks));
        for (file, list) in report.intervals.iter() {
            let stats = report.statistics[file];
            let written: u64 = list.iter().filter(|i| !i.is_read).map(|i| i.count).sum();
            let read: u64 = list.iter().filter(|i| i.is_read).map(|i| i.count).sum();
            prop_assert_eq!(stats.bytes_written, written);
            prop_assert_eq!(stats.bytes_read, read);
            prop_assert!(stats.metadata_time >= 0.0);
            prop_assert!(stats.write_bandwidth() >= 0.0);
            prop_assert!(stats.read_bandwidth() >= 0.0);
        }
    }

    #[test]
    fn prop_sessionless_intervals_never_conflict(ranks in ranks_strategy()) {
        // Drop every open so no interval carries session context
        let stripped: Vec<Vec<_>> = ranks
            .iter()
            .map(|calls| calls.iter().copied().filter(|c| FUNCS[c.0] != "open").collect())
            .collect();
        let report = analyze(&build_trace(&stripped));
        for tally in report.conflicts.values() {
            prop_assert_eq!(tally.total(), 0);
        }
    }

    #[test]
    fn prop_same_result_on_any_thread_count(ranks in ranks_strategy()) {
        let trace = build_trace(&ranks);
        let single = rayon::ThreadPoolBuilder::new()
            .num_threads(1)
            .build()
            .unwrap()
            .install(|| analyze(&trace));
        let many = rayon::ThreadPoolBuilder::new()
            .num_threads(4)
            .build()
            .unwrap()
            .install(|| analyze(&trace));
        prop_assert_eq!(single, many);
    }

    #[test]
    fn prop_bandwidth_non_negative(bytes in 0u64..u64::MAX / 2, seconds in 0.0f64..1e6) {
        let bw = bandwidth(bytes, seconds);
        prop_assert!(bw >= 0.0);
        if seconds == 0.0 {
            prop_assert_eq!(bw, 0.0);
        }
    }
}
