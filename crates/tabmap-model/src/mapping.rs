//! Column mapping suggestion types.

use serde::{Deserialize, Serialize};

use crate::catalog::FieldDomain;
use crate::complexity::ComplexityScore;
use crate::config::Thresholds;
use crate::tier::ModelTier;

/// A lower-ranked candidate for the same source column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlternativeSuggestion {
    pub field: String,
    /// Confidence (0.0 to 1.0).
    pub confidence: f64,
}

/// A suggested mapping from one source column to a standard field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingSuggestion {
    /// Source column name from the input file.
    pub source_column: String,
    /// Target standard field name.
    pub target_field: String,
    /// Domain the target field belongs to, when known.
    pub target_domain: Option<FieldDomain>,
    /// Confidence score, always normalized to 0.0..1.0.
    pub confidence: f64,
    /// Why this mapping was suggested.
    pub reasoning: String,
    /// Lower-ranked candidates, best first.
    #[serde(default)]
    pub alternatives: Vec<AlternativeSuggestion>,
    /// Which tier produced this suggestion.
    pub model_used: ModelTier,
}

impl MappingSuggestion {
    /// Whether this suggestion needs human review.
    ///
    /// A pure function of confidence against the configured review
    /// threshold; recomputed on demand, never stored or overridden.
    pub fn requires_manual_review(&self, thresholds: &Thresholds) -> bool {
        self.confidence < thresholds.review_confidence
    }
}

/// The full set of suggestions for one file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingResult {
    pub suggestions: Vec<MappingSuggestion>,
    /// The tier that produced the final result.
    pub model: ModelTier,
    /// Actual call cost, when the model tier was used.
    pub cost: Option<f64>,
    pub processing_time_ms: Option<u64>,
    /// Complexity report that informed routing, when one was computed.
    pub complexity: Option<ComplexityScore>,
}

impl MappingResult {
    /// Arithmetic mean of all suggestion confidences, or `None` when empty.
    pub fn mean_confidence(&self) -> Option<f64> {
        if self.suggestions.is_empty() {
            return None;
        }
        let sum: f64 = self.suggestions.iter().map(|s| s.confidence).sum();
        Some(sum / self.suggestions.len() as f64)
    }
}

/// Clamp a raw model confidence onto the 0..1 range.
///
/// The cheap tier's JSON contract emits 0-100; the deep tier emits 0-1.
/// Callers state the expected scale explicitly; this clamp is the guard for
/// models that ignore the contract.
pub fn normalize_confidence(raw: f64) -> f64 {
    let value = if raw > 1.0 { raw / 100.0 } else { raw };
    value.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_percent_and_unit_scales() {
        assert_eq!(normalize_confidence(98.0), 0.98);
        assert_eq!(normalize_confidence(0.85), 0.85);
        assert_eq!(normalize_confidence(150.0), 1.0);
        assert_eq!(normalize_confidence(-0.5), 0.0);
    }

    #[test]
    fn review_flag_follows_threshold() {
        let thresholds = Thresholds::default();
        let mut suggestion = MappingSuggestion {
            source_column: "sku".to_string(),
            target_field: "sku_code".to_string(),
            target_domain: Some(FieldDomain::Inventory),
            confidence: 0.65,
            reasoning: "test".to_string(),
            alternatives: Vec::new(),
            model_used: ModelTier::Cheap,
        };
        assert!(suggestion.requires_manual_review(&thresholds));
        suggestion.confidence = 0.7;
        assert!(!suggestion.requires_manual_review(&thresholds));
    }

    #[test]
    fn mean_confidence_is_arithmetic_mean() {
        let make = |confidence| MappingSuggestion {
            source_column: "a".to_string(),
            target_field: "b".to_string(),
            target_domain: None,
            confidence,
            reasoning: String::new(),
            alternatives: Vec::new(),
            model_used: ModelTier::Cheap,
        };
        let result = MappingResult {
            suggestions: vec![make(0.4), make(0.8)],
            model: ModelTier::Cheap,
            cost: None,
            processing_time_ms: None,
            complexity: None,
        };
        assert!((result.mean_confidence().unwrap() - 0.6).abs() < 1e-9);
    }
}
