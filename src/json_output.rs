//! JSON report format
//!
//! `--format json` writes the same sections as the HTML report, pretty-printed.

use crate::conflict::ConflictTally;
use crate::intervals::{BuildDiagnostics, FileIntervals};
use crate::pattern::PatternTally;
use crate::report::Report;
use crate::summary::TraceSummary;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-file statistics with derived bandwidths
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonFileStatistics {
    pub bytes_written: u64,
    pub write_time: f64,
    /// MB/s
    pub write_bandwidth: f64,
    pub bytes_read: u64,
    pub read_time: f64,
    /// MB/s
    pub read_bandwidth: f64,
    pub metadata_time: f64,
}

/// Root JSON output structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonReport {
    /// Crate version that produced the report
    pub version: String,
    /// Format name
    pub format: String,
    pub patterns: PatternTally,
    pub conflicts: BTreeMap<String, ConflictTally>,
    pub statistics: BTreeMap<String, JsonFileStatistics>,
    pub summary: TraceSummary,
    pub diagnostics: BuildDiagnostics,
    /// Raw intervals, only when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intervals: Option<FileIntervals>,
}

impl JsonReport {
    pub fn new(report: &Report) -> Self {
        let statistics = report
            .statistics
            .iter()
            .map(|(file, s)| {
                (
                    file.clone(),
                    JsonFileStatistics {
                        bytes_written: s.bytes_written,
                        write_time: s.write_time,
                        write_bandwidth: s.write_bandwidth(),
                        bytes_read: s.bytes_read,
                        read_time: s.read_time,
                        read_bandwidth: s.read_bandwidth(),
                        metadata_time: s.metadata_time,
                    },
                )
            })
            .collect();

        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            format: "iovista-json-v1".to_string(),
            patterns: report.patterns,
            conflicts: report.conflicts.clone(),
            statistics,
            summary: report.summary.clone(),
            diagnostics: report.diagnostics,
            intervals: None,
        }
    }

    /// Embed every interval in the output
    pub fn with_intervals(mut self, report: &Report) -> Self {
        self.intervals = Some(report.intervals.clone());
        self
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
