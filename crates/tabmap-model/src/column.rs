//! Column profiles produced by the tabular parser.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single parsed data row, keyed by source column name.
pub type Record = BTreeMap<String, String>;

/// Type declared (or inferred) for a source column by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclaredType {
    Text,
    Integer,
    Float,
    Boolean,
    Date,
    #[default]
    Unknown,
}

/// Statistics about one source column, computed once per uploaded file.
///
/// Immutable input to the complexity analyzer and the mapping service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnProfile {
    /// Source column name as it appears in the file header.
    pub name: String,
    /// Declared or parser-inferred type.
    #[serde(default)]
    pub declared_type: DeclaredType,
    /// Up to ~20 sample values in file order.
    #[serde(default)]
    pub sample_values: Vec<String>,
    /// Ratio of null/empty values to total rows (0.0 to 1.0).
    #[serde(default)]
    pub null_fraction: f64,
    /// Ratio of distinct values to total rows (0.0 to 1.0).
    #[serde(default)]
    pub unique_fraction: f64,
}

impl ColumnProfile {
    /// Creates a profile with just a name, defaulting all statistics.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_type: DeclaredType::Unknown,
            sample_values: Vec::new(),
            null_fraction: 0.0,
            unique_fraction: 0.0,
        }
    }

    /// Sets sample values.
    #[must_use]
    pub fn with_samples(mut self, samples: &[&str]) -> Self {
        self.sample_values = samples.iter().map(|s| (*s).to_string()).collect();
        self
    }
}
