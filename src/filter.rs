//! Filename noise filtering
//!
//! Runtime bookkeeping files (device nodes, procfs, shared libraries, std
//! streams) show up in every trace and drown out application data, so they are
//! dropped before any analysis.

use crate::config::FilterRules;
use anyhow::{Context, Result};
use regex::RegexSet;

/// Predicate deciding whether a filename is excluded from analysis
pub trait FileFilter: Sync {
    fn is_ignorable(&self, filename: &str) -> bool;
}

/// Prefix, exact-name and regex based filter
#[derive(Debug, Clone)]
pub struct PathFilter {
    prefixes: Vec<String>,
    exact: Vec<String>,
    patterns: RegexSet,
}

impl PathFilter {
    /// Build from configuration rules
    ///
    /// # Errors
    /// Returns error if any of the ignore patterns is not a valid regex.
    pub fn from_rules(rules: &FilterRules) -> Result<Self> {
        let patterns = RegexSet::new(&rules.ignore_patterns).with_context(|| {
            format!(
                "Invalid filename ignore pattern in {:?}",
                rules.ignore_patterns
            )
        })?;

        Ok(Self {
            prefixes: rules.ignore_prefixes.clone(),
            exact: rules.ignore_exact.clone(),
            patterns,
        })
    }

    /// Filter that keeps every file
    pub fn none() -> Self {
        Self {
            prefixes: Vec::new(),
            exact: Vec::new(),
            patterns: RegexSet::empty(),
        }
    }
}

impl Default for PathFilter {
    fn default() -> Self {
        let rules = FilterRules::default();
        Self {
            prefixes: rules.ignore_prefixes,
            exact: rules.ignore_exact,
            // The built-in patterns are constant and known to compile
            patterns: RegexSet::new(&rules.ignore_patterns).unwrap_or_else(|_| RegexSet::empty()),
        }
    }
}

impl FileFilter for PathFilter {
    fn is_ignorable(&self, filename: &str) -> bool {
        self.exact.iter().any(|e| e == filename)
            || self.prefixes.iter().any(|p| filename.starts_with(p.as_str()))
            || self.patterns.is_match(filename)
    }
}

impl<F: Fn(&str) -> bool + Sync> FileFilter for F {
    fn is_ignorable(&self, filename: &str) -> bool {
        self(filename)
    }
}
