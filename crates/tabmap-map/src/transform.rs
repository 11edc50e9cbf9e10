//! Applying transformation rules and splitting rows by validation issues.

use std::collections::BTreeSet;

use tabmap_model::{IssueSeverity, Record, TransformRule, ValidatedData, ValidationIssue};

/// Applies each rule to its target field across all rows. Fields a row does
/// not carry are skipped.
pub fn apply_rules(mut rows: Vec<Record>, rules: &[TransformRule]) -> Vec<Record> {
    for rule in rules {
        for row in &mut rows {
            if let Some(value) = row.get_mut(&rule.field) {
                *value = rule.op.apply(value);
            }
        }
    }
    rows
}

/// Splits rows into valid and invalid sets.
///
/// A row is invalid when any error-severity issue names its index. Critical
/// issues are file-level and do not exclude rows here; info and warning
/// issues are advisory.
pub fn split_rows(rows: Vec<Record>, issues: Vec<ValidationIssue>) -> ValidatedData {
    let invalid_rows: BTreeSet<usize> = issues
        .iter()
        .filter(|i| i.severity == IssueSeverity::Error)
        .filter_map(|i| i.row)
        .collect();
    let valid = rows
        .into_iter()
        .enumerate()
        .filter(|(index, _)| !invalid_rows.contains(index))
        .map(|(_, row)| row)
        .collect();
    ValidatedData {
        valid,
        errors: issues,
    }
}
