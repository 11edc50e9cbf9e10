//! The tabular parser seam.
//!
//! Parsing produces the column profiles the analyzer and mapper consume plus
//! the full row set. CSV is the built-in format; other formats plug in behind
//! the trait.

use std::collections::BTreeSet;

use tabmap_model::{ColumnProfile, DeclaredType, Record};

use crate::error::{PipelineError, Result};

const MAX_SAMPLE_VALUES: usize = 20;
const SAMPLE_ROW_COUNT: usize = 5;

/// A parsed tabular file.
#[derive(Debug, Clone)]
pub struct ParsedTable {
    pub columns: Vec<ColumnProfile>,
    pub rows: Vec<Record>,
    /// First few raw rows in header order, for entity detection prompts.
    pub sample_rows: Vec<Vec<String>>,
}

pub trait TableParser: Send + Sync {
    fn parse(&self, bytes: &[u8]) -> Result<ParsedTable>;
}

/// CSV parser with header row, tolerant of ragged records.
#[derive(Debug, Clone, Default)]
pub struct CsvParser;

impl TableParser for CsvParser {
    fn parse(&self, bytes: &[u8]) -> Result<ParsedTable> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(bytes);
        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| PipelineError::Parse(e.to_string()))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        if headers.is_empty() {
            return Err(PipelineError::Parse("missing header row".to_string()));
        }

        let mut rows: Vec<Record> = Vec::new();
        let mut raw_values: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
        for record in reader.records() {
            let record = record.map_err(|e| PipelineError::Parse(e.to_string()))?;
            let mut row = Record::new();
            for (index, header) in headers.iter().enumerate() {
                let value = record.get(index).unwrap_or_default().trim().to_string();
                raw_values[index].push(value.clone());
                row.insert(header.clone(), value);
            }
            rows.push(row);
        }
        if rows.is_empty() {
            return Err(PipelineError::EmptyFile);
        }

        let columns = headers
            .iter()
            .zip(&raw_values)
            .map(|(name, values)| profile_column(name, values))
            .collect();
        let sample_rows = rows
            .iter()
            .take(SAMPLE_ROW_COUNT)
            .map(|row| headers.iter().map(|h| row[h].clone()).collect())
            .collect();
        Ok(ParsedTable {
            columns,
            rows,
            sample_rows,
        })
    }
}

fn profile_column(name: &str, values: &[String]) -> ColumnProfile {
    let total = values.len();
    let non_empty: Vec<&String> = values.iter().filter(|v| !v.is_empty()).collect();
    let null_fraction = if total == 0 {
        0.0
    } else {
        (total - non_empty.len()) as f64 / total as f64
    };
    let unique: BTreeSet<&String> = non_empty.iter().copied().collect();
    let unique_fraction = if total == 0 {
        0.0
    } else {
        unique.len() as f64 / total as f64
    };
    let sample_values = non_empty
        .iter()
        .take(MAX_SAMPLE_VALUES)
        .map(|v| (*v).clone())
        .collect();
    ColumnProfile {
        name: name.to_string(),
        declared_type: infer_type(&non_empty),
        sample_values,
        null_fraction,
        unique_fraction,
    }
}

/// Infers a declared type when every non-empty value agrees on one.
fn infer_type(values: &[&String]) -> DeclaredType {
    if values.is_empty() {
        return DeclaredType::Unknown;
    }
    if values.iter().all(|v| v.parse::<i64>().is_ok()) {
        return DeclaredType::Integer;
    }
    if values.iter().all(|v| v.parse::<f64>().is_ok()) {
        return DeclaredType::Float;
    }
    if values.iter().all(|v| is_bool(v)) {
        return DeclaredType::Boolean;
    }
    if values.iter().all(|v| is_date_like(v)) {
        return DeclaredType::Date;
    }
    DeclaredType::Text
}

fn is_bool(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "true" | "false" | "yes" | "no" | "y" | "n"
    )
}

/// Matches common numeric date layouts: 8-10 chars, exactly two separators.
fn is_date_like(value: &str) -> bool {
    let len = value.len();
    if !(8..=10).contains(&len) {
        return false;
    }
    let separators = value.chars().filter(|c| matches!(c, '-' | '/' | '.')).count();
    separators == 2
        && value
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '-' | '/' | '.'))
}
