//! Function catalog classification
//!
//! Traced function names are classified once per trace by substring rules
//! from [`CatalogRules`]. Ids outside the catalog are user-defined functions
//! and are never classified.

use crate::config::CatalogRules;
use serde::{Deserialize, Serialize};

/// Direction of a byte-range transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IoDirection {
    Read,
    Write,
}

/// File lifecycle operation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetaOp {
    Open,
    Close,
    Sync,
    Seek,
    /// Matched a custom metadata marker with no cursor/session effect
    Other,
}

/// How a read/write call lays out its size and position arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgLayout {
    /// `(file, buf, count)` at the current cursor
    Sequential,
    /// `(file, buf, count, offset)`; cursor untouched
    Positional,
    /// `(file, size, nmemb)` at the current cursor
    Stream,
    /// `(file, length)` at the current cursor
    Formatted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionClass {
    Io(IoDirection, ArgLayout),
    Metadata(MetaOp),
    /// Collective/library namespace or directory operation
    Excluded,
    Other,
}

/// Software layer a function belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Hdf5,
    Mpi,
    Posix,
}

impl Layer {
    pub fn of(name: &str) -> Self {
        if name.contains("H5") {
            Layer::Hdf5
        } else if name.contains("MPI") {
            Layer::Mpi
        } else {
            Layer::Posix
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Layer::Hdf5 => "hdf5",
            Layer::Mpi => "mpi",
            Layer::Posix => "posix",
        }
    }
}

/// Pre-classified function table, indexed by function id
#[derive(Debug, Clone)]
pub struct FunctionCatalog {
    names: Vec<String>,
    classes: Vec<FunctionClass>,
}

impl FunctionCatalog {
    pub fn new(names: &[String], rules: &CatalogRules) -> Self {
        let classes = names.iter().map(|n| classify(n, rules)).collect();
        Self {
            names: names.to_vec(),
            classes,
        }
    }

    /// Classification of a function id; `None` when out of range
    pub fn class(&self, func_id: u32) -> Option<FunctionClass> {
        self.classes.get(func_id as usize).copied()
    }

    pub fn name(&self, func_id: u32) -> Option<&str> {
        self.names.get(func_id as usize).map(String::as_str)
    }

    /// Number of known functions
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

fn contains_any(name: &str, markers: &[String]) -> bool {
    markers.iter().any(|m| !m.is_empty() && name.contains(m.as_str()))
}

/// Classify a single function name
pub fn classify(name: &str, rules: &CatalogRules) -> FunctionClass {
    if contains_any(name, &rules.excluded_namespaces)
        || (!rules.directory_marker.is_empty() && name.contains(rules.directory_marker.as_str()))
    {
        return FunctionClass::Excluded;
    }

    if contains_any(name, &rules.write_markers) {
        return FunctionClass::Io(IoDirection::Write, layout_of(name));
    }
    if contains_any(name, &rules.read_markers) {
        return FunctionClass::Io(IoDirection::Read, layout_of(name));
    }

    if contains_any(name, &rules.metadata_markers) {
        let op = if name.contains("open") {
            MetaOp::Open
        } else if name.contains("close") {
            MetaOp::Close
        } else if name.contains("sync") {
            MetaOp::Sync
        } else if name.contains("seek") {
            MetaOp::Seek
        } else {
            MetaOp::Other
        };
        return FunctionClass::Metadata(op);
    }

    FunctionClass::Other
}

fn layout_of(name: &str) -> ArgLayout {
    if name.contains("pwrite") || name.contains("pread") {
        ArgLayout::Positional
    } else if name.contains("fwrite") || name.contains("fread") {
        ArgLayout::Stream
    } else if name.contains("printf") {
        ArgLayout::Formatted
    } else {
        ArgLayout::Sequential
    }
}
