//! Analysis pipeline
//!
//! Ingest → Build → {Classify, Detect, Aggregate} → Done. The three stages
//! after the build only read the interval set and run concurrently. There is
//! no partial result: a run either produces a complete [`Report`] or fails
//! before the build starts.

use crate::catalog::FunctionCatalog;
use crate::config::AnalysisConfig;
use crate::conflict::{detect_conflicts, ConflictTally};
use crate::filter::{FileFilter, PathFilter};
use crate::intervals::{BuildDiagnostics, FileIntervals, IntervalBuilder};
use crate::pattern::{classify_patterns, PatternTally};
use crate::stats::{FileStatistics, StatisticsAggregator};
use crate::summary::{summarize, TraceSummary};
use crate::trace::RecordStream;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

/// Everything the renderers consume
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub patterns: PatternTally,
    pub conflicts: BTreeMap<String, ConflictTally>,
    pub statistics: BTreeMap<String, FileStatistics>,
    pub intervals: FileIntervals,
    pub summary: TraceSummary,
    pub diagnostics: BuildDiagnostics,
}

/// Configured analysis engine
pub struct Analyzer<F: FileFilter = PathFilter> {
    config: AnalysisConfig,
    filter: F,
}

impl Analyzer<PathFilter> {
    /// Build an analyzer whose file filter comes from the configuration
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        let filter = PathFilter::from_rules(&config.filter)?;
        Ok(Self { config, filter })
    }
}

impl<F: FileFilter> Analyzer<F> {
    /// Use a custom file filter instead of the configured one
    pub fn with_filter(config: AnalysisConfig, filter: F) -> Self {
        Self { config, filter }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn run<S: RecordStream + ?Sized>(&self, stream: &S) -> Report {
        let started = Instant::now();
        let catalog = FunctionCatalog::new(stream.functions(), &self.config.catalog);
        tracing::info!(
            ranks = stream.total_ranks(),
            functions = catalog.len(),
            "analyzing trace"
        );

        let built = IntervalBuilder::new(&catalog, &self.filter).build(stream);
        let intervals = built.intervals;

        let segment_match = self.config.conflicts.segment_match;
        let ((patterns, conflicts), (statistics, summary)) = rayon::join(
            || {
                rayon::join(
                    || classify_patterns(&intervals, &self.filter),
                    || detect_conflicts(&intervals, &self.filter, segment_match),
                )
            },
            || {
                rayon::join(
                    || {
                        StatisticsAggregator::new(&catalog, &self.filter)
                            .aggregate(&intervals, stream)
                    },
                    || summarize(stream, &catalog, &intervals, &self.filter),
                )
            },
        );

        tracing::info!(
            files = intervals.len(),
            intervals = intervals.total_intervals(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "analysis complete"
        );

        Report {
            patterns,
            conflicts,
            statistics,
            intervals,
            summary,
            diagnostics: built.diagnostics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict::ConflictKind;
    use crate::trace::{CallRecord, FileTable, JsonTrace};

    const FUNCS: &[&str] = &["open", "write", "read", "close", "MPI_Barrier"];

    fn rec(func: u32, tstart: f64, tend: f64, args: &[&str]) -> CallRecord {
        CallRecord::new(func, tstart, tend, args)
    }

    fn two_rank_trace() -> JsonTrace {
        let mut trace = JsonTrace {
            functions: FUNCS.iter().map(|s| s.to_string()).collect(),
            ranks: Vec::new(),
        };
        trace.push_rank(
            FileTable::new(),
            vec![
                rec(0, 0.0, 0.0, &["f", "O_RDWR"]),
                rec(1, 0.0, 1.0, &["f", "buf", "100"]),
                rec(4, 1.0, 1.2, &[]),
                rec(3, 2.0, 2.0, &["f"]),
            ],
        );
        trace.push_rank(
            FileTable::new(),
            vec![
                rec(0, 0.0, 0.0, &["f", "O_RDWR"]),
                rec(2, 0.5, 1.5, &["f", "buf", "100"]),
                rec(4, 1.0, 1.2, &[]),
                rec(3, 2.0, 2.0, &["f"]),
            ],
        );
        trace
    }

    #[test]
    fn test_full_pipeline() -> Result<()> {
        let trace = two_rank_trace();
        let report = Analyzer::new(AnalysisConfig::default())?.run(&trace);

        // Both ranks start at offset 0: rank 0 writes [0,100), rank 1 reads [0,100)
        assert_eq!(report.intervals.total_intervals(), 2);
        assert_eq!(report.patterns.total(), 1);
        assert_eq!(report.conflicts["f"].get(ConflictKind::Raw).different_rank, 1);

        let f = report.statistics["f"];
        assert_eq!(f.bytes_written, 100);
        assert_eq!(f.bytes_read, 100);
        assert_eq!(f.metadata_time, 0.0);
        assert_eq!(report.summary.ranks.len(), 2);
        assert_eq!(report.diagnostics.intervals, 2);
        Ok(())
    }

    #[test]
    fn test_custom_filter() {
        let trace = two_rank_trace();
        let analyzer = Analyzer::with_filter(AnalysisConfig::default(), |name: &str| name == "f");
        let report = analyzer.run(&trace);
        assert!(report.intervals.is_empty());
        assert!(report.statistics.is_empty());
    }

    #[test]
    fn test_empty_trace() -> Result<()> {
        let trace = JsonTrace::default();
        let report = Analyzer::new(AnalysisConfig::default())?.run(&trace);
        assert_eq!(report.patterns, PatternTally::default());
        assert!(report.conflicts.is_empty());
        assert!(report.statistics.is_empty());
        Ok(())
    }

    #[test]
    fn test_deterministic_across_runs() -> Result<()> {
        let trace = two_rank_trace();
        let analyzer = Analyzer::new(AnalysisConfig::default())?;
        assert_eq!(analyzer.run(&trace), analyzer.run(&trace));
        Ok(())
    }
}
