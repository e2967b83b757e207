//! iovista - access pattern, conflict and bandwidth analysis for parallel I/O traces
//!
//! A trace holds per-rank call records (function id, start/end time,
//! arguments). The library rebuilds byte-range intervals per file and derives
//! the temporal access pattern mix, read/write conflicts between overlapping
//! accesses and per-file transfer statistics.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod conflict;
pub mod error;
pub mod filter;
pub mod html_output;
pub mod intervals;
pub mod json_output;
pub mod pattern;
pub mod report;
pub mod stats;
pub mod summary;
pub mod trace;
