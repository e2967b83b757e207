//! Read-only access to captured per-rank call records
//!
//! A trace holds one record stream per rank, a global function-name table and
//! one filename table per rank. The engine only ever reads through the
//! [`RecordStream`] trait, so any storage format can feed it; [`JsonTrace`]
//! is the built-in one.

mod json;

pub use json::{JsonRank, JsonTrace};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single timestamped function call issued by one rank
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    /// Index into the global function table
    #[serde(rename = "func", alias = "func_id")]
    pub func_id: u32,
    /// Call entry time (seconds)
    pub tstart: f64,
    /// Call exit time (seconds)
    pub tend: f64,
    /// Arguments as recorded; the first one names the target file
    #[serde(default)]
    pub args: Vec<String>,
}

impl CallRecord {
    pub fn new(func_id: u32, tstart: f64, tend: f64, args: &[&str]) -> Self {
        Self {
            func_id,
            tstart,
            tend,
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Wall-clock time spent in the call
    pub fn duration(&self) -> f64 {
        self.tend - self.tstart
    }

    /// First argument, if present and non-empty
    pub fn target(&self) -> Option<&str> {
        self.args.first().map(String::as_str).filter(|a| !a.is_empty())
    }
}

/// Rank-local mapping from a file token (as it appears in arguments) to a path
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileTable {
    table: HashMap<String, String>,
}

impl FileTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, token: impl Into<String>, path: impl Into<String>) {
        self.table.insert(token.into(), path.into());
    }

    /// Resolve a record argument to a filename
    ///
    /// Known tokens map through the table. Unknown tokens are taken as the
    /// path itself, which covers traces that store paths inline.
    pub fn resolve<'a>(&'a self, arg: &'a str) -> Option<&'a str> {
        if arg.is_empty() {
            return None;
        }
        Some(self.table.get(arg).map(String::as_str).unwrap_or(arg))
    }

    /// All paths this rank opened
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.table.values().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FileTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = FileTable::new();
        for (k, v) in iter {
            table.insert(k, v);
        }
        table
    }
}

/// Source of per-rank call records
///
/// Implementations must be shareable across worker threads: ranks are
/// processed in parallel.
pub trait RecordStream: Sync {
    /// Number of ranks in the trace
    fn total_ranks(&self) -> usize;

    /// All records of one rank, in issue order
    fn records(&self, rank: usize) -> &[CallRecord];

    /// Global function-id → name table
    fn functions(&self) -> &[String];

    /// Rank-local filename table
    fn file_table(&self, rank: usize) -> &FileTable;

    /// Resolve a function id; `None` for ids outside the catalog
    fn function_name(&self, func_id: u32) -> Option<&str> {
        self.functions().get(func_id as usize).map(String::as_str)
    }

    /// Resolve a record's target filename through the rank's table
    fn target_file<'a>(&'a self, rank: usize, record: &'a CallRecord) -> Option<&'a str> {
        record
            .target()
            .and_then(|arg| self.file_table(rank).resolve(arg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_table_resolves_known_token() {
        let table: FileTable = [("3", "/scratch/out.dat")].into_iter().collect();
        assert_eq!(table.resolve("3"), Some("/scratch/out.dat"));
    }

    #[test]
    fn test_file_table_falls_back_to_literal() {
        let table = FileTable::new();
        assert_eq!(table.resolve("/scratch/in.dat"), Some("/scratch/in.dat"));
        assert_eq!(table.resolve(""), None);
    }

    #[test]
    fn test_record_target_skips_empty() {
        let record = CallRecord::new(0, 0.0, 1.0, &[]);
        assert_eq!(record.target(), None);

        let record = CallRecord::new(0, 0.0, 1.0, &["", "buf"]);
        assert_eq!(record.target(), None);

        let record = CallRecord::new(0, 0.5, 1.0, &["f", "buf"]);
        assert_eq!(record.target(), Some("f"));
        assert_eq!(record.duration(), 0.5);
    }
}
