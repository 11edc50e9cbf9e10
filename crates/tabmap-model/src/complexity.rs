//! Complexity report types.

use serde::{Deserialize, Serialize};

use crate::tier::ModelTier;

/// Qualitative bucket for the ambiguity sub-score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AmbiguityLevel {
    Low,
    Medium,
    High,
}

/// Synthetic 0..5 estimate of how hard a file is to map correctly.
///
/// Derived and stateless: recomputed per file, logged for audit, never
/// persisted as authoritative state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplexityScore {
    /// Weighted aggregate score (0.0 to 5.0).
    pub score: f64,
    /// True when column names suggest foreign keys, hierarchy, or junctions.
    pub has_nested_relationships: bool,
    /// Bucketed ambiguity sub-score.
    pub ambiguity_level: AmbiguityLevel,
    /// True when calculated-field, workflow-state, or date-range names appear.
    pub business_logic_detected: bool,
    /// Estimated data quality (0.0 to 1.0, higher is cleaner).
    pub data_quality_score: f64,
    /// Tier recommendation from the score threshold alone.
    pub recommended_tier: ModelTier,
    /// Human-readable triggers, in evaluation order.
    pub reasons: Vec<String>,
}
