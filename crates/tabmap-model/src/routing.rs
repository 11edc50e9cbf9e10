use serde::{Deserialize, Serialize};

/// Outcome of a single tier decision, made at most once per mapping request.
///
/// Logged for audit and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingDecision {
    /// True when the deep (expensive) tier was selected.
    pub use_deep_tier: bool,
    /// Why this tier was selected.
    pub reason: String,
    /// The aggregate complexity score that informed the decision.
    pub complexity_score: f64,
    /// Estimated call cost in account currency, when computable.
    pub estimated_cost: Option<f64>,
}
