//! Validation and transformation types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::column::Record;

/// Severity of a validation issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Info,
    Warning,
    /// Error-severity issues exclude the affected row from the valid set.
    Error,
    /// Critical issues are pipeline-level failures, not row-level ones.
    Critical,
}

/// One issue found while validating mapped data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Zero-based row index the issue applies to; `None` for file-level issues.
    pub row: Option<usize>,
    pub field: String,
    pub message: String,
    pub severity: IssueSeverity,
}

/// Named value transformation applied to one target field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformOp {
    Uppercase,
    Lowercase,
    Trim,
    NumericCoerce,
}

impl TransformOp {
    /// Applies the transformation to a single value.
    pub fn apply(&self, value: &str) -> String {
        match self {
            Self::Uppercase => value.to_uppercase(),
            Self::Lowercase => value.to_lowercase(),
            Self::Trim => value.trim().to_string(),
            Self::NumericCoerce => coerce_numeric(value),
        }
    }
}

/// Strips currency symbols, thousands separators, and percent signs so the
/// remainder parses as a plain number. Unparseable values pass through.
fn coerce_numeric(value: &str) -> String {
    let stripped: String = value
        .trim()
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    if stripped.is_empty() || stripped.parse::<f64>().is_err() {
        value.trim().to_string()
    } else {
        stripped
    }
}

/// A transformation rule targeting one field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformRule {
    pub field: String,
    pub op: TransformOp,
}

/// Output of validate-and-transform: valid rows plus per-row issues.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatedData {
    pub valid: Vec<Record>,
    pub errors: Vec<ValidationIssue>,
}

impl ValidatedData {
    /// All rows valid, no issues - the conservative default when the
    /// validation call itself fails.
    pub fn all_valid(rows: Vec<BTreeMap<String, String>>) -> Self {
        Self {
            valid: rows,
            errors: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_coerce_strips_symbols() {
        assert_eq!(TransformOp::NumericCoerce.apply("$1,234.50"), "1234.50");
        assert_eq!(TransformOp::NumericCoerce.apply("15%"), "15");
        assert_eq!(TransformOp::NumericCoerce.apply("n/a"), "n/a");
    }

    #[test]
    fn trim_and_case_ops() {
        assert_eq!(TransformOp::Trim.apply("  x  "), "x");
        assert_eq!(TransformOp::Uppercase.apply("abc"), "ABC");
        assert_eq!(TransformOp::Lowercase.apply("ABC"), "abc");
    }
}
