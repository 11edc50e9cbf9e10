//! Centralized decision thresholds.
//!
//! Every confidence or cost boundary used by the analyzer, router, mapping
//! service, and pipeline lives here so tests can exercise boundary values
//! precisely instead of chasing constants across crates.

use serde::{Deserialize, Serialize};

/// Named decision boundaries shared by all components.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thresholds {
    /// Suggestions below this confidence require manual review (0..1).
    pub review_confidence: f64,
    /// Suggestions at or above this confidence may be auto-confirmed (0..1).
    pub auto_map_confidence: f64,
    /// Complexity score at or above which the deep tier is recommended (0..5).
    pub complexity_routing: f64,
    /// Data quality below this value forces the deep tier (0..1).
    pub data_quality_floor: f64,
    /// Mean cheap-tier confidence below this value triggers escalation (0..1).
    pub escalation_confidence: f64,
    /// Suggestions at or above this confidence are recorded as learning data (0..1).
    pub learning_confidence: f64,
    /// Learned mappings below this success rate are excluded from few-shot context (0..1).
    pub learning_success_rate: f64,
    /// Daily spend ceiling for the deep tier, in account currency.
    pub daily_budget: f64,
    /// Maximum model-call attempts before surfacing the error.
    pub max_retries: u32,
    /// Base retry delay in milliseconds; attempt N waits `base * N`.
    pub retry_base_delay_ms: u64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            review_confidence: 0.70,
            auto_map_confidence: 0.80,
            complexity_routing: 3.0,
            data_quality_floor: 0.5,
            escalation_confidence: 0.70,
            learning_confidence: 0.85,
            learning_success_rate: 0.70,
            daily_budget: 50.0,
            max_retries: 3,
            retry_base_delay_ms: 500,
        }
    }
}
