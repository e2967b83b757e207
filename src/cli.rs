//! CLI argument parsing for iovista

use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};

/// Report format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Self-contained HTML page of tables (default)
    Html,
    /// Pretty-printed JSON for machine parsing
    Json,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Html => "html",
            OutputFormat::Json => "json",
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "iovista")]
#[command(version)]
#[command(
    about = "Access pattern, conflict and bandwidth analysis for parallel I/O traces",
    long_about = None
)]
pub struct Cli {
    /// Trace to analyze (JSON trace file)
    #[arg(short = 'i', long = "input_path", value_name = "PATH")]
    pub input_path: PathBuf,

    /// Report destination; the format's extension is appended when missing
    #[arg(short = 'o', long = "output_path", value_name = "PATH")]
    pub output_path: PathBuf,

    /// Report format
    #[arg(long = "format", value_enum, default_value = "html")]
    pub format: OutputFormat,

    /// Analysis configuration (TOML)
    #[arg(long = "config", value_name = "TOML")]
    pub config: Option<PathBuf>,

    /// Worker threads (defaults to one per core)
    #[arg(short = 'j', long = "jobs", value_name = "N")]
    pub jobs: Option<usize>,

    /// Include every interval in JSON output
    #[arg(long = "intervals")]
    pub intervals: bool,

    /// Enable debug tracing to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}

/// Append the format's extension if absent and make the path absolute
pub fn resolve_output_path(path: &Path, format: OutputFormat) -> std::io::Result<PathBuf> {
    let ext = format.extension();
    let path = if path.extension().is_some_and(|e| e == ext) {
        path.to_path_buf()
    } else {
        let mut name = path.as_os_str().to_os_string();
        name.push(".");
        name.push(ext);
        PathBuf::from(name)
    };

    if path.is_absolute() {
        Ok(path)
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
