use anyhow::{Context, Result};
use clap::Parser;
use iovista::cli::{resolve_output_path, Cli, OutputFormat};
use iovista::config::AnalysisConfig;
use iovista::html_output::HtmlReport;
use iovista::json_output::JsonReport;
use iovista::report::{Analyzer, Report};
use iovista::trace::JsonTrace;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Short per-file table on stderr once the report is written
fn print_statistics(report: &Report) {
    eprintln!(
        "{:<40} {:>14} {:>12} {:>14} {:>12} {:>12}",
        "file", "bytes written", "write MB/s", "bytes read", "read MB/s", "meta (s)"
    );
    eprintln!("{}", "─".repeat(109));
    for (file, stats) in &report.statistics {
        eprintln!(
            "{:<40} {:>14} {:>12.2} {:>14} {:>12.2} {:>12.6}",
            file,
            stats.bytes_written,
            stats.write_bandwidth(),
            stats.bytes_read,
            stats.read_bandwidth(),
            stats.metadata_time
        );
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    if let Some(jobs) = args.jobs {
        if jobs == 0 {
            anyhow::bail!("Invalid value for --jobs: 0 (must be >= 1)");
        }
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
            .context("Failed to configure worker pool")?;
    }

    let config = match &args.config {
        Some(path) => AnalysisConfig::from_toml(path)?,
        None => AnalysisConfig::default(),
    };

    let trace = JsonTrace::from_path(&args.input_path)?;
    let report = Analyzer::new(config)?.run(&trace);

    let output_path = resolve_output_path(&args.output_path, args.format)
        .context("Failed to resolve output path")?;
    let rendered = match args.format {
        OutputFormat::Html => HtmlReport::new(&report)
            .with_title(format!("I/O Trace Report: {}", args.input_path.display()))
            .to_html(),
        OutputFormat::Json => {
            let json = JsonReport::new(&report);
            let json = if args.intervals {
                json.with_intervals(&report)
            } else {
                json
            };
            json.to_json()?
        }
    };
    std::fs::write(&output_path, rendered)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    tracing::info!(path = %output_path.display(), "report written");
    eprintln!("Report written to {}", output_path.display());
    print_statistics(&report);

    Ok(())
}
