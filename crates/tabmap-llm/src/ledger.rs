//! Durable API usage ledger.
//!
//! Every model call - success or failure - appends one JSON line to the log
//! file. The file is the source of truth: daily totals for the budget gate
//! and range reports are recomputed by aggregation on each read, so the
//! ledger survives process restarts and is never held as a long-lived
//! in-memory counter. A race between concurrent deep-tier calls can permit
//! transient budget overshoot; that is an accepted tolerance.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};

use tabmap_model::{DailyUsage, ModelTier, UsageRecord, UsageReport};

#[derive(Debug, Clone)]
pub struct UsageLedger {
    path: PathBuf,
}

impl UsageLedger {
    /// Opens (or prepares to create) a ledger at the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one call record.
    pub fn record(&self, record: &UsageRecord) -> io::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let line = serde_json::to_string(record).map_err(io::Error::other)?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    /// Loads all records whose timestamp date falls in `start..=end`.
    pub fn load_range(&self, start: NaiveDate, end: NaiveDate) -> io::Result<Vec<UsageRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&self.path)?;
        let mut records = Vec::new();
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            // Skip corrupt lines rather than failing the whole aggregation.
            let Ok(record) = serde_json::from_str::<UsageRecord>(line) else {
                continue;
            };
            let Some(date) = record_date(&record) else {
                continue;
            };
            if date >= start && date <= end {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Total spend for one tier on one calendar day, recomputed from the log.
    pub fn cost_for_day(&self, date: NaiveDate, tier: ModelTier) -> io::Result<f64> {
        let records = self.load_range(date, date)?;
        Ok(records
            .iter()
            .filter(|r| r.tier == tier)
            .map(|r| r.cost)
            .sum())
    }

    /// Today's spend for one tier (UTC day bucketing).
    pub fn cost_today(&self, tier: ModelTier) -> io::Result<f64> {
        self.cost_for_day(Utc::now().date_naive(), tier)
    }

    /// Aggregated usage report over an inclusive date range.
    pub fn report(&self, start: NaiveDate, end: NaiveDate) -> io::Result<UsageReport> {
        let records = self.load_range(start, end)?;
        let mut days: std::collections::BTreeMap<String, DailyUsage> =
            std::collections::BTreeMap::new();
        let mut total_cost = 0.0;
        for record in &records {
            let Some(date) = record_date(record) else {
                continue;
            };
            let key = date.format("%Y-%m-%d").to_string();
            let day = days.entry(key.clone()).or_insert_with(|| DailyUsage {
                date: key,
                ..DailyUsage::default()
            });
            day.calls += 1;
            day.input_tokens += record.input_tokens;
            day.output_tokens += record.output_tokens;
            day.cost += record.cost;
            total_cost += record.cost;
        }
        let total_calls = records.len() as u64;
        let average_cost_per_call = if total_calls == 0 {
            0.0
        } else {
            total_cost / total_calls as f64
        };
        Ok(UsageReport {
            daily_breakdown: days.into_values().collect(),
            total_cost,
            total_calls,
            average_cost_per_call,
        })
    }
}

fn record_date(record: &UsageRecord) -> Option<NaiveDate> {
    chrono::DateTime::parse_from_rfc3339(&record.timestamp)
        .ok()
        .map(|dt| dt.date_naive())
}

/// Current timestamp in the ledger's RFC 3339 format.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record_on(date: &str, tier: ModelTier, cost: f64, success: bool) -> UsageRecord {
        UsageRecord {
            timestamp: format!("{date}T12:00:00+00:00"),
            model: "test-model".to_string(),
            tier,
            input_tokens: 100,
            output_tokens: 50,
            cost,
            elapsed_ms: 10,
            success,
            error: if success {
                None
            } else {
                Some("boom".to_string())
            },
        }
    }

    #[test]
    fn aggregates_by_day_and_tier() {
        let dir = TempDir::new().unwrap();
        let ledger = UsageLedger::new(dir.path().join("usage.jsonl"));
        ledger
            .record(&record_on("2026-08-01", ModelTier::Deep, 1.0, true))
            .unwrap();
        ledger
            .record(&record_on("2026-08-01", ModelTier::Cheap, 0.1, true))
            .unwrap();
        ledger
            .record(&record_on("2026-08-02", ModelTier::Deep, 2.0, false))
            .unwrap();

        let day = NaiveDate::from_ymd_opt(2026, 8, 1).unwrap();
        let cost = ledger.cost_for_day(day, ModelTier::Deep).unwrap();
        assert!((cost - 1.0).abs() < 1e-9);
    }

    #[test]
    fn report_covers_range_with_daily_breakdown() {
        let dir = TempDir::new().unwrap();
        let ledger = UsageLedger::new(dir.path().join("usage.jsonl"));
        ledger
            .record(&record_on("2026-08-01", ModelTier::Deep, 1.0, true))
            .unwrap();
        ledger
            .record(&record_on("2026-08-02", ModelTier::Deep, 3.0, true))
            .unwrap();
        ledger
            .record(&record_on("2026-09-01", ModelTier::Deep, 9.0, true))
            .unwrap();

        let report = ledger
            .report(
                NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
                NaiveDate::from_ymd_opt(2026, 8, 31).unwrap(),
            )
            .unwrap();
        assert_eq!(report.total_calls, 2);
        assert!((report.total_cost - 4.0).abs() < 1e-9);
        assert!((report.average_cost_per_call - 2.0).abs() < 1e-9);
        assert_eq!(report.daily_breakdown.len(), 2);
    }

    #[test]
    fn survives_reload_and_skips_corrupt_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("usage.jsonl");
        let ledger = UsageLedger::new(&path);
        ledger
            .record(&record_on("2026-08-01", ModelTier::Deep, 1.5, true))
            .unwrap();
        fs::write(
            &path,
            format!("{}\nnot json at all\n", fs::read_to_string(&path).unwrap().trim()),
        )
        .unwrap();

        let reloaded = UsageLedger::new(&path);
        let day = NaiveDate::from_ymd_opt(2026, 8, 1).unwrap();
        assert!((reloaded.cost_for_day(day, ModelTier::Deep).unwrap() - 1.5).abs() < 1e-9);
    }

    #[test]
    fn missing_file_reports_zero() {
        let dir = TempDir::new().unwrap();
        let ledger = UsageLedger::new(dir.path().join("missing.jsonl"));
        assert_eq!(ledger.cost_today(ModelTier::Deep).unwrap(), 0.0);
    }
}
