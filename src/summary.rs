//! Trace-level summary aggregates
//!
//! Record and file counts per rank, per-function call counts and time,
//! software layer breakdown and I/O size histograms.

use crate::catalog::{FunctionCatalog, Layer};
use crate::filter::FileFilter;
use crate::intervals::FileIntervals;
use crate::trace::RecordStream;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-rank activity counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankSummary {
    pub records: u64,
    /// Distinct non-ignorable files in the rank's file table
    pub files: u64,
}

/// Calls and time for one catalog function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSummary {
    pub name: String,
    pub calls: u64,
    /// Total seconds spent in the function
    pub time: f64,
}

/// Call counts per software layer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerCounts {
    pub hdf5: u64,
    pub mpi: u64,
    pub posix: u64,
}

impl LayerCounts {
    fn add(&mut self, layer: Layer, calls: u64) {
        match layer {
            Layer::Hdf5 => self.hdf5 = self.hdf5.saturating_add(calls),
            Layer::Mpi => self.mpi = self.mpi.saturating_add(calls),
            Layer::Posix => self.posix = self.posix.saturating_add(calls),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraceSummary {
    pub ranks: Vec<RankSummary>,
    /// Functions with at least one call, most-called first
    pub functions: Vec<FunctionSummary>,
    pub layers: LayerCounts,
    /// Transfer size → number of reads
    pub read_sizes: BTreeMap<u64, u64>,
    /// Transfer size → number of writes
    pub write_sizes: BTreeMap<u64, u64>,
}

impl TraceSummary {
    pub fn total_records(&self) -> u64 {
        self.ranks.iter().fold(0, |acc, r| acc.saturating_add(r.records))
    }

    /// Sum of per-rank file counts; a file opened by several ranks counts once per rank
    pub fn total_rank_files(&self) -> u64 {
        self.ranks.iter().fold(0, |acc, r| acc.saturating_add(r.files))
    }

    /// Functions ordered by time spent, longest first
    pub fn functions_by_time(&self) -> Vec<&FunctionSummary> {
        let mut by_time: Vec<&FunctionSummary> =
            self.functions.iter().filter(|f| f.time > 0.0).collect();
        by_time.sort_by(|a, b| b.time.total_cmp(&a.time));
        by_time
    }
}

/// Per-rank partial: counts and times indexed by function id
struct RankTotals {
    summary: RankSummary,
    calls: Vec<u64>,
    times: Vec<f64>,
}

/// Profiled names are reported under their public MPI name
fn display_name(name: &str) -> String {
    name.replace("PMPI", "MPI")
}

pub fn summarize<S: RecordStream + ?Sized, F: FileFilter + ?Sized>(
    stream: &S,
    catalog: &FunctionCatalog,
    intervals: &FileIntervals,
    filter: &F,
) -> TraceSummary {
    let width = catalog.len();

    let partials: Vec<RankTotals> = (0..stream.total_ranks())
        .into_par_iter()
        .map(|rank| {
            let records = stream.records(rank);
            let mut calls = vec![0u64; width];
            let mut times = vec![0.0f64; width];
            for record in records {
                let id = record.func_id as usize;
                if id >= width {
                    continue;
                }
                calls[id] = calls[id].saturating_add(1);
                times[id] += record.duration();
            }

            let mut paths: Vec<&str> = stream
                .file_table(rank)
                .paths()
                .filter(|p| !filter.is_ignorable(p))
                .collect();
            paths.sort_unstable();
            paths.dedup();

            RankTotals {
                summary: RankSummary {
                    records: records.len() as u64,
                    files: paths.len() as u64,
                },
                calls,
                times,
            }
        })
        .collect();

    let mut calls = vec![0u64; width];
    let mut times = vec![0.0f64; width];
    let mut ranks = Vec::with_capacity(partials.len());
    for partial in partials {
        ranks.push(partial.summary);
        for (total, c) in calls.iter_mut().zip(&partial.calls) {
            *total = total.saturating_add(*c);
        }
        for (total, t) in times.iter_mut().zip(&partial.times) {
            *total += t;
        }
    }

    let mut layers = LayerCounts::default();
    let mut functions = Vec::new();
    for (id, name) in catalog.names().iter().enumerate() {
        if calls[id] == 0 {
            continue;
        }
        layers.add(Layer::of(name), calls[id]);
        functions.push(FunctionSummary {
            name: display_name(name),
            calls: calls[id],
            time: times[id],
        });
    }
    functions.sort_by(|a, b| b.calls.cmp(&a.calls));

    let mut read_sizes = BTreeMap::new();
    let mut write_sizes = BTreeMap::new();
    for (file, list) in intervals.iter() {
        if filter.is_ignorable(file) {
            continue;
        }
        for interval in list {
            let sizes = if interval.is_read {
                &mut read_sizes
            } else {
                &mut write_sizes
            };
            let seen = sizes.entry(interval.count).or_insert(0u64);
            *seen = seen.saturating_add(1);
        }
    }

    TraceSummary {
        ranks,
        functions,
        layers,
        read_sizes,
        write_sizes,
    }
}
