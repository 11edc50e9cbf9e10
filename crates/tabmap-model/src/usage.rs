//! API usage accounting types.

use serde::{Deserialize, Serialize};

use crate::tier::ModelTier;

/// One model call, success or failure, as appended to the usage log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    /// RFC 3339 timestamp of the call.
    pub timestamp: String,
    /// Model identifier (e.g. provider model name).
    pub model: String,
    pub tier: ModelTier,
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// Computed cost in account currency.
    pub cost: f64,
    pub elapsed_ms: u64,
    pub success: bool,
    pub error: Option<String>,
}

/// Aggregated usage for one calendar day.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DailyUsage {
    /// Day in `YYYY-MM-DD` form.
    pub date: String,
    pub calls: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost: f64,
}

/// Usage report over a date range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageReport {
    pub daily_breakdown: Vec<DailyUsage>,
    pub total_cost: f64,
    pub total_calls: u64,
    pub average_cost_per_call: f64,
}
