//! Analysis pipeline benchmark
//!
//! Synthetic traces where every rank opens one shared file, writes strided
//! blocks and reads a neighbour's block back. Measures the interval build
//! alone and the full analysis as the rank count grows.
//!
//! ```bash
//! cargo bench --bench pipeline
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use iovista::catalog::FunctionCatalog;
use iovista::config::AnalysisConfig;
use iovista::filter::PathFilter;
use iovista::intervals::IntervalBuilder;
use iovista::report::Analyzer;
use iovista::trace::{CallRecord, FileTable, JsonTrace};

const OPS_PER_RANK: u64 = 2_000;
const BLOCK: u64 = 4096;

fn synthetic_trace(ranks: u64) -> JsonTrace {
    let mut trace = JsonTrace {
        functions: ["open", "pwrite", "pread", "close", "MPI_Barrier"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        ranks: Vec::new(),
    };

    for rank in 0..ranks {
        let mut records = Vec::with_capacity(OPS_PER_RANK as usize + 2);
        records.push(CallRecord::new(0, 0.0, 0.001, &["3", "O_RDWR"]));
        for op in 0..OPS_PER_RANK {
            let t = 0.01 + op as f64 * 0.001;
            let block = op * ranks + rank;
            let (func, offset) = if op % 4 == 3 {
                (2, (block + 1) * BLOCK)
            } else {
                (1, block * BLOCK)
            };
            let offset = offset.to_string();
            let args = ["3", "buf", "4096", offset.as_str()];
            records.push(CallRecord::new(func, t, t + 0.0005, &args));
        }
        records.push(CallRecord::new(3, 10.0, 10.001, &["3"]));

        let files: FileTable = [("3", "/scratch/shared.dat")].into_iter().collect();
        trace.push_rank(files, records);
    }
    trace
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("interval_build");
    let config = AnalysisConfig::default();
    let filter = PathFilter::default();

    for ranks in [1u64, 8, 32] {
        let trace = synthetic_trace(ranks);
        let catalog = FunctionCatalog::new(&trace.functions, &config.catalog);
        group.bench_with_input(BenchmarkId::from_parameter(ranks), &trace, |b, trace| {
            b.iter(|| {
                let built = IntervalBuilder::new(&catalog, &filter).build(black_box(trace));
                black_box(built.intervals.total_intervals())
            });
        });
    }
    group.finish();
}

fn bench_full_analysis(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_analysis");
    let analyzer = Analyzer::new(AnalysisConfig::default()).expect("default configuration");

    for ranks in [1u64, 8, 32] {
        let trace = synthetic_trace(ranks);
        group.bench_with_input(BenchmarkId::from_parameter(ranks), &trace, |b, trace| {
            b.iter(|| black_box(analyzer.run(black_box(trace))));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_build, bench_full_analysis);
criterion_main!(benches);
