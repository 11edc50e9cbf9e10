//! The intelligent router.
//!
//! Decides which model tier handles a mapping request, executes the chosen
//! path, and owns the two recovery behaviors around it: auto-escalation from
//! cheap to deep when mean confidence is low, and silent fallback from deep
//! to cheap when the deep tier fails. Exactly one tier decision is made per
//! request and it is logged before anything executes, so the audit trail
//! survives a failed call.

use std::sync::Arc;

use tracing::{info, warn};

use tabmap_complexity::analyze;
use tabmap_llm::{TierClient, prompt};
use tabmap_map::MappingService;
use tabmap_model::{
    AmbiguityLevel, ColumnProfile, ComplexityScore, EntityType, MappingResult, RoutingDecision,
    Thresholds,
};
use tabmap_store::RecordStore;

/// Score recorded on a forced-deep decision, pinned to the top of the scale.
const FORCED_SCORE: f64 = 5.0;

/// One request to map a file's columns.
#[derive(Debug, Clone)]
pub struct FileMappingRequest {
    pub file_upload_id: String,
    pub company_id: String,
    pub entity_type: EntityType,
    pub columns: Vec<ColumnProfile>,
    /// Route to the deep tier regardless of complexity.
    pub force_deep: bool,
}

pub struct IntelligentRouter {
    cheap: TierClient,
    deep: TierClient,
    service: MappingService,
    records: Arc<dyn RecordStore>,
    thresholds: Thresholds,
    /// Operator switch; when off every request takes the cheap path.
    deep_tier_enabled: bool,
}

impl IntelligentRouter {
    pub fn new(
        cheap: TierClient,
        deep: TierClient,
        service: MappingService,
        records: Arc<dyn RecordStore>,
        thresholds: Thresholds,
    ) -> Self {
        Self {
            cheap,
            deep,
            service,
            records,
            thresholds,
            deep_tier_enabled: true,
        }
    }

    #[must_use]
    pub fn with_deep_tier_enabled(mut self, enabled: bool) -> Self {
        self.deep_tier_enabled = enabled;
        self
    }

    pub fn service(&self) -> &MappingService {
        &self.service
    }

    /// The tier decision for a request. Pure apart from reading the ledger
    /// for the cost estimate; does not log or execute.
    pub fn should_use_deep_tier(
        &self,
        request: &FileMappingRequest,
        force: bool,
    ) -> RoutingDecision {
        self.decide(request, force).0
    }

    fn decide(
        &self,
        request: &FileMappingRequest,
        force: bool,
    ) -> (RoutingDecision, ComplexityScore) {
        let complexity = analyze(&request.columns, &self.thresholds);
        if force {
            // Forced decisions carry a fixed top score so the audit record
            // reads the same regardless of what the analyzer saw.
            let decision = self.decision(true, "forced".to_string(), FORCED_SCORE, request);
            return (decision, complexity);
        }
        if !self.deep_tier_enabled {
            let decision = self.decision(
                false,
                "deep tier disabled".to_string(),
                complexity.score,
                request,
            );
            return (decision, complexity);
        }
        let reason = if complexity.has_nested_relationships {
            Some("nested relationships detected".to_string())
        } else if complexity.ambiguity_level == AmbiguityLevel::High {
            Some("high column-name ambiguity".to_string())
        } else if complexity.business_logic_detected {
            Some("business logic columns detected".to_string())
        } else if complexity.data_quality_score < self.thresholds.data_quality_floor {
            Some(format!(
                "data quality {:.2} below floor {:.2}",
                complexity.data_quality_score, self.thresholds.data_quality_floor
            ))
        } else if complexity.score >= self.thresholds.complexity_routing {
            Some(format!(
                "complexity score {:.1} at or above {:.1}",
                complexity.score, self.thresholds.complexity_routing
            ))
        } else {
            None
        };
        let decision = match reason {
            Some(reason) => self.decision(true, reason, complexity.score, request),
            None => self.decision(
                false,
                format!(
                    "complexity score {:.1} below {:.1} threshold",
                    complexity.score, self.thresholds.complexity_routing
                ),
                complexity.score,
                request,
            ),
        };
        (decision, complexity)
    }

    fn decision(
        &self,
        use_deep_tier: bool,
        reason: String,
        complexity_score: f64,
        request: &FileMappingRequest,
    ) -> RoutingDecision {
        let client = if use_deep_tier { &self.deep } else { &self.cheap };
        let estimate = prompt::mapping_prompt(&request.columns, self.service.catalog(), &[]);
        RoutingDecision {
            use_deep_tier,
            reason,
            complexity_score,
            estimated_cost: Some(client.estimate_cost(&estimate)),
        }
    }

    /// Routes and executes a mapping request end to end.
    pub fn route_mapping_request(&self, request: &FileMappingRequest) -> MappingResult {
        let (decision, complexity) = self.decide(request, request.force_deep);
        // Logged before execution so a failed call still leaves a trail.
        if let Err(error) = self
            .records
            .log_routing_decision(&request.file_upload_id, &decision)
        {
            warn!(%error, "could not log routing decision");
        }
        info!(
            file_id = %request.file_upload_id,
            use_deep = decision.use_deep_tier,
            score = complexity.score,
            reason = %decision.reason,
            "routing decision"
        );

        let mut result = if decision.use_deep_tier {
            self.execute_deep(request, None)
        } else {
            self.execute_cheap_with_escalation(request)
        };

        if let Err(error) = self.service.record_confirmed(
            &request.company_id,
            request.entity_type,
            &result.suggestions,
        ) {
            warn!(%error, "could not record learned mappings");
        }
        result.complexity = Some(complexity);
        result
    }

    fn execute_cheap_with_escalation(&self, request: &FileMappingRequest) -> MappingResult {
        let cheap_result = self.service.suggest_column_mappings(
            &self.cheap,
            &request.columns,
            request.entity_type,
            &request.company_id,
        );
        if !self.deep_tier_enabled {
            return cheap_result;
        }
        let Some(mean) = cheap_result.mean_confidence() else {
            return cheap_result;
        };
        if mean >= self.thresholds.escalation_confidence {
            return cheap_result;
        }
        let reason = format!("escalated due to low confidence: {mean:.2}");
        info!(file_id = %request.file_upload_id, mean, "{reason}");
        match self.service.suggest_deep(
            &self.deep,
            &request.columns,
            request.entity_type,
            &request.company_id,
            Some(&cheap_result.suggestions),
        ) {
            Ok(mut deep_result) => {
                deep_result
                    .suggestions
                    .iter_mut()
                    .for_each(|s| s.reasoning = format!("{reason}; {}", s.reasoning));
                deep_result
            }
            Err(error) => {
                warn!(%error, "escalation failed, keeping cheap-tier result");
                cheap_result
            }
        }
    }

    fn execute_deep(
        &self,
        request: &FileMappingRequest,
        prior: Option<&[tabmap_model::MappingSuggestion]>,
    ) -> MappingResult {
        match self.service.suggest_deep(
            &self.deep,
            &request.columns,
            request.entity_type,
            &request.company_id,
            prior,
        ) {
            Ok(result) => result,
            Err(error) => {
                warn!(%error, "deep tier failed, falling back to cheap tier");
                self.service.suggest_column_mappings(
                    &self.cheap,
                    &request.columns,
                    request.entity_type,
                    &request.company_id,
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabmap_llm::{ScriptedModel, TierConfig, UnavailableModel, UsageLedger};
    use tabmap_map::LearningStore;
    use tabmap_model::{FieldCatalog, ModelTier};
    use tabmap_store::MemoryRecordStore;
    use tempfile::TempDir;

    fn thresholds() -> Thresholds {
        Thresholds {
            retry_base_delay_ms: 0,
            max_retries: 1,
            ..Thresholds::default()
        }
    }

    fn client(dir: &TempDir, config: TierConfig, model: ScriptedModel) -> TierClient {
        TierClient::new(
            Arc::new(model),
            config,
            UsageLedger::new(dir.path().join("usage.jsonl")),
        )
    }

    fn offline_client(dir: &TempDir, config: TierConfig) -> TierClient {
        TierClient::new(
            Arc::new(UnavailableModel::default()),
            config,
            UsageLedger::new(dir.path().join("usage.jsonl")),
        )
    }

    fn router(
        dir: &TempDir,
        cheap: TierClient,
        deep: TierClient,
        records: Arc<MemoryRecordStore>,
    ) -> IntelligentRouter {
        let service = MappingService::new(
            FieldCatalog::builtin(),
            LearningStore::new(dir.path().join("learned")).unwrap(),
            thresholds(),
        );
        IntelligentRouter::new(cheap, deep, service, records, thresholds())
    }

    fn simple_request() -> FileMappingRequest {
        FileMappingRequest {
            file_upload_id: "f1".to_string(),
            company_id: "acme".to_string(),
            entity_type: EntityType::Inventory,
            columns: vec![
                ColumnProfile::named("sku").with_samples(&["A-1", "A-2"]),
                ColumnProfile::named("item_name").with_samples(&["Flour", "Sugar"]),
            ],
            force_deep: false,
        }
    }

    fn cheap_response(confidence: u32) -> String {
        format!(
            r#"{{"mappings": [
                {{"source_column": "sku", "target_field": "sku_code", "confidence": {confidence}, "reasoning": "alias"}},
                {{"source_column": "item_name", "target_field": "item_name", "confidence": {confidence}, "reasoning": "alias"}}
            ]}}"#
        )
    }

    #[test]
    fn simple_file_routes_cheap_and_logs_before_execution() {
        let dir = TempDir::new().unwrap();
        let records = Arc::new(MemoryRecordStore::new());
        let cheap = client(
            &dir,
            TierConfig::cheap(&thresholds()),
            ScriptedModel::new("cheap").with_response(cheap_response(95)),
        );
        let deep = offline_client(&dir, TierConfig::deep(&thresholds()));
        let router = router(&dir, cheap, deep, Arc::clone(&records));

        let result = router.route_mapping_request(&simple_request());
        assert_eq!(result.model, ModelTier::Cheap);
        assert!(result.complexity.is_some());

        let log = records.routing_log("f1").unwrap();
        assert_eq!(log.len(), 1);
        assert!(!log[0].decision.use_deep_tier);
        assert!(log[0].decision.estimated_cost.is_some());
    }

    #[test]
    fn force_deep_overrides_complexity() {
        let dir = TempDir::new().unwrap();
        let records = Arc::new(MemoryRecordStore::new());
        let cheap = offline_client(&dir, TierConfig::cheap(&thresholds()));
        let deep = offline_client(&dir, TierConfig::deep(&thresholds()));
        let router = router(&dir, cheap, deep, records);

        let request = FileMappingRequest {
            force_deep: true,
            ..simple_request()
        };
        let decision = router.should_use_deep_tier(&request, true);
        assert!(decision.use_deep_tier);
        assert_eq!(decision.reason, "forced");
        assert!((decision.complexity_score - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn disabled_deep_tier_always_routes_cheap() {
        let dir = TempDir::new().unwrap();
        let records = Arc::new(MemoryRecordStore::new());
        let cheap = offline_client(&dir, TierConfig::cheap(&thresholds()));
        let deep = offline_client(&dir, TierConfig::deep(&thresholds()));
        let router = router(&dir, cheap, deep, records).with_deep_tier_enabled(false);

        let decision = router.should_use_deep_tier(&simple_request(), false);
        assert!(!decision.use_deep_tier);
        assert_eq!(decision.reason, "deep tier disabled");
    }

    #[test]
    fn low_cheap_confidence_escalates_to_deep() {
        let dir = TempDir::new().unwrap();
        let records = Arc::new(MemoryRecordStore::new());
        let cheap = client(
            &dir,
            TierConfig::cheap(&thresholds()),
            ScriptedModel::new("cheap").with_response(cheap_response(50)),
        );
        let deep = client(
            &dir,
            TierConfig::deep(&thresholds()),
            ScriptedModel::new("deep").with_response(
                r#"{"mappings": [
                    {"source_column": "sku", "target_field": "sku_code", "confidence": 0.95, "reasoning": "verified"},
                    {"source_column": "item_name", "target_field": "item_name", "confidence": 0.92, "reasoning": "verified"}
                ]}"#,
            ),
        );
        let router = router(&dir, cheap, deep, records);

        let result = router.route_mapping_request(&simple_request());
        assert_eq!(result.model, ModelTier::Deep);
        assert!(
            result.suggestions[0]
                .reasoning
                .starts_with("escalated due to low confidence: 0.50")
        );
    }

    #[test]
    fn failed_escalation_keeps_cheap_result() {
        let dir = TempDir::new().unwrap();
        let records = Arc::new(MemoryRecordStore::new());
        let cheap = client(
            &dir,
            TierConfig::cheap(&thresholds()),
            ScriptedModel::new("cheap").with_response(cheap_response(50)),
        );
        let deep = offline_client(&dir, TierConfig::deep(&thresholds()));
        let router = router(&dir, cheap, deep, records);

        let result = router.route_mapping_request(&simple_request());
        assert_eq!(result.model, ModelTier::Cheap);
        assert!((result.mean_confidence().unwrap() - 0.50).abs() < 1e-9);
    }

    #[test]
    fn deep_failure_falls_back_to_cheap_path() {
        let dir = TempDir::new().unwrap();
        let records = Arc::new(MemoryRecordStore::new());
        let cheap = client(
            &dir,
            TierConfig::cheap(&thresholds()),
            ScriptedModel::new("cheap").with_response(cheap_response(95)),
        );
        let deep = offline_client(&dir, TierConfig::deep(&thresholds()));
        let router = router(&dir, cheap, deep, records);

        let request = FileMappingRequest {
            force_deep: true,
            ..simple_request()
        };
        let result = router.route_mapping_request(&request);
        assert_eq!(result.model, ModelTier::Cheap);
        assert!(!result.suggestions.is_empty());
    }

    #[test]
    fn high_confidence_suggestions_are_learned() {
        let dir = TempDir::new().unwrap();
        let records = Arc::new(MemoryRecordStore::new());
        let cheap = client(
            &dir,
            TierConfig::cheap(&thresholds()),
            ScriptedModel::new("cheap").with_response(cheap_response(95)),
        );
        let deep = offline_client(&dir, TierConfig::deep(&thresholds()));
        let router = router(&dir, cheap, deep, records);

        router.route_mapping_request(&simple_request());
        let learned = router.service().learning().load("acme").unwrap();
        assert_eq!(learned.len(), 2);
    }
}
