//! Analysis configuration
//!
//! Every knob has a built-in default, so an empty or partial TOML file is
//! valid. Example:
//!
//! ```toml
//! [catalog]
//! excluded_namespaces = ["MPI", "H5", "nc_"]
//!
//! [filter]
//! ignore_prefixes = ["/dev/", "/proc/"]
//! ignore_patterns = ['\.lock$']
//!
//! [conflicts]
//! segment_match = "local-session"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Substring rules used to classify function names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogRules {
    /// Library namespaces that never describe byte-range I/O (collective/metadata layers)
    pub excluded_namespaces: Vec<String>,
    /// Directory operations are excluded as well
    pub directory_marker: String,
    pub write_markers: Vec<String>,
    pub read_markers: Vec<String>,
    /// File lifecycle calls whose time is charged to the file
    pub metadata_markers: Vec<String>,
}

impl Default for CatalogRules {
    fn default() -> Self {
        Self {
            excluded_namespaces: strings(&["MPI", "H5"]),
            directory_marker: "dir".to_string(),
            write_markers: strings(&["write", "fprintf"]),
            read_markers: strings(&["read"]),
            metadata_markers: strings(&["open", "close", "sync", "seek"]),
        }
    }
}

/// Rules deciding which filenames are noise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterRules {
    pub ignore_prefixes: Vec<String>,
    pub ignore_exact: Vec<String>,
    /// Regular expressions matched anywhere in the filename
    pub ignore_patterns: Vec<String>,
}

impl Default for FilterRules {
    fn default() -> Self {
        Self {
            ignore_prefixes: strings(&[
                "/dev/",
                "/proc/",
                "/sys/",
                "/etc/",
                "/usr/",
                "/opt/",
                "/lib/",
                "/lib64/",
                "/run/",
                "pipe:",
                "socket:",
                "anon_inode:",
            ]),
            ignore_exact: strings(&["stdin", "stdout", "stderr"]),
            ignore_patterns: strings(&[r"\.so(\.\d+)*$"]),
        }
    }
}

/// How two overlapping intervals prove they ran in a shared epoch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SegmentMatch {
    /// Segment sets share at least one identifier
    #[default]
    Intersect,
    /// One interval's own session appears in the other's set
    LocalSession,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConflictRules {
    pub segment_match: SegmentMatch,
}

/// Complete analysis configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub catalog: CatalogRules,
    pub filter: FilterRules,
    pub conflicts: ConflictRules,
}

impl AnalysisConfig {
    /// Load configuration from a TOML file
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read config file: {}", path.as_ref().display())
        })?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.as_ref().display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_toml_is_default() {
        let config = AnalysisConfig::from_toml_str("").unwrap();
        assert_eq!(config, AnalysisConfig::default());
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config = AnalysisConfig::from_toml_str(
            r#"
[catalog]
excluded_namespaces = ["MPI", "H5", "nc_"]
"#,
        )
        .unwrap();
        assert_eq!(config.catalog.excluded_namespaces.len(), 3);
        assert_eq!(config.catalog.directory_marker, "dir");
        assert_eq!(config.filter, FilterRules::default());
    }

    #[test]
    fn test_segment_match_kebab_case() {
        let config = AnalysisConfig::from_toml_str(
            r#"
[conflicts]
segment_match = "local-session"
"#,
        )
        .unwrap();
        assert_eq!(config.conflicts.segment_match, SegmentMatch::LocalSession);
    }

    #[test]
    fn test_unknown_segment_match_rejected() {
        let result = AnalysisConfig::from_toml_str("[conflicts]\nsegment_match = \"first\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_from_toml_file() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "[filter]\nignore_exact = [\"stdout\"]")?;
        file.flush()?;

        let config = AnalysisConfig::from_toml(file.path())?;
        assert_eq!(config.filter.ignore_exact, vec!["stdout".to_string()]);
        Ok(())
    }

    #[test]
    fn test_missing_file_error_mentions_path() {
        let err = AnalysisConfig::from_toml("/nonexistent/iovista.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/iovista.toml"));
    }
}
