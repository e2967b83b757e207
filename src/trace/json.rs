//! JSON trace documents
//!
//! ```json
//! {
//!   "functions": ["open", "write", "close"],
//!   "ranks": [
//!     { "rank": 0, "files": {"0": "/scratch/out.dat"},
//!       "records": [ {"func": 1, "tstart": 0.1, "tend": 0.2, "args": ["0", "buf", "4096"]} ] }
//!   ]
//! }
//! ```

use super::{CallRecord, FileTable, RecordStream};
use crate::error::{Result, TraceError};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// One rank's section of a JSON trace
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JsonRank {
    /// Optional explicit rank id; must match the position when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
    #[serde(default)]
    pub files: FileTable,
    #[serde(default)]
    pub records: Vec<CallRecord>,
}

/// In-memory trace loaded from a JSON document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JsonTrace {
    pub functions: Vec<String>,
    #[serde(default)]
    pub ranks: Vec<JsonRank>,
}

impl JsonTrace {
    /// Load and validate a trace file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| TraceError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let trace: JsonTrace =
            serde_json::from_reader(BufReader::new(file)).map_err(|source| {
                TraceError::Parse {
                    path: path.to_path_buf(),
                    source,
                }
            })?;
        trace.validate()?;

        tracing::debug!(
            ranks = trace.ranks.len(),
            functions = trace.functions.len(),
            "loaded trace {}",
            path.display()
        );
        Ok(trace)
    }

    /// Parse and validate a trace held in memory
    pub fn from_json_str(json: &str) -> Result<Self> {
        let trace: JsonTrace = serde_json::from_str(json).map_err(|source| TraceError::Parse {
            path: "<memory>".into(),
            source,
        })?;
        trace.validate()?;
        Ok(trace)
    }

    fn validate(&self) -> Result<()> {
        for (position, rank) in self.ranks.iter().enumerate() {
            if let Some(id) = rank.rank {
                if id as usize != position {
                    return Err(TraceError::Invalid(format!(
                        "rank {} listed at position {}",
                        id, position
                    )));
                }
            }
        }
        Ok(())
    }

    /// Append a rank and return its id
    pub fn push_rank(&mut self, files: FileTable, records: Vec<CallRecord>) -> usize {
        let id = self.ranks.len();
        self.ranks.push(JsonRank {
            rank: Some(id as u32),
            files,
            records,
        });
        id
    }
}

impl RecordStream for JsonTrace {
    fn total_ranks(&self) -> usize {
        self.ranks.len()
    }

    fn records(&self, rank: usize) -> &[CallRecord] {
        self.ranks
            .get(rank)
            .map(|r| r.records.as_slice())
            .unwrap_or(&[])
    }

    fn functions(&self) -> &[String] {
        &self.functions
    }

    fn file_table(&self, rank: usize) -> &FileTable {
        static EMPTY: std::sync::OnceLock<FileTable> = std::sync::OnceLock::new();
        match self.ranks.get(rank) {
            Some(r) => &r.files,
            None => EMPTY.get_or_init(FileTable::new),
        }
    }
}
