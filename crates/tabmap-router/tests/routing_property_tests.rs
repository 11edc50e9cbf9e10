//! Property tests for the tier decision.

use std::sync::Arc;

use proptest::prelude::*;
use tempfile::TempDir;

use tabmap_complexity::analyze;
use tabmap_llm::{TierClient, TierConfig, UnavailableModel, UsageLedger};
use tabmap_map::{LearningStore, MappingService};
use tabmap_model::{
    AmbiguityLevel, ColumnProfile, EntityType, FieldCatalog, Thresholds,
};
use tabmap_router::{FileMappingRequest, IntelligentRouter};
use tabmap_store::MemoryRecordStore;

fn offline_router(dir: &TempDir) -> IntelligentRouter {
    let thresholds = Thresholds::default();
    let ledger = UsageLedger::new(dir.path().join("usage.jsonl"));
    let cheap = TierClient::new(
        Arc::new(UnavailableModel::default()),
        TierConfig::cheap(&thresholds),
        ledger.clone(),
    );
    let deep = TierClient::new(
        Arc::new(UnavailableModel::default()),
        TierConfig::deep(&thresholds),
        ledger,
    );
    let service = MappingService::new(
        FieldCatalog::builtin(),
        LearningStore::new(dir.path().join("learned")).unwrap(),
        thresholds.clone(),
    );
    IntelligentRouter::new(
        cheap,
        deep,
        service,
        Arc::new(MemoryRecordStore::new()),
        thresholds,
    )
}

fn request(columns: Vec<ColumnProfile>) -> FileMappingRequest {
    FileMappingRequest {
        file_upload_id: "prop".to_string(),
        company_id: "default".to_string(),
        entity_type: EntityType::Unknown,
        columns,
        force_deep: false,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// The tier decision agrees with the analyzer: deep exactly when a
    /// structural override fires or the score reaches the routing threshold.
    #[test]
    fn decision_is_consistent_with_analyzer(
        names in prop::collection::vec("[a-z][a-z0-9_]{0,14}", 1..16)
    ) {
        let dir = TempDir::new().unwrap();
        let router = offline_router(&dir);
        let thresholds = Thresholds::default();
        let columns: Vec<ColumnProfile> =
            names.iter().map(|n| ColumnProfile::named(n)).collect();
        let complexity = analyze(&columns, &thresholds);

        let decision = router.should_use_deep_tier(&request(columns), false);

        let structural_override = complexity.has_nested_relationships
            || complexity.ambiguity_level == AmbiguityLevel::High
            || complexity.business_logic_detected
            || complexity.data_quality_score < thresholds.data_quality_floor;
        let expect_deep = structural_override || complexity.score >= thresholds.complexity_routing;
        prop_assert_eq!(decision.use_deep_tier, expect_deep, "reason: {}", decision.reason);
        prop_assert!((decision.complexity_score - complexity.score).abs() < 1e-9);
        prop_assert!(decision.estimated_cost.is_some());
    }

    /// Force-deep wins regardless of what the columns look like.
    #[test]
    fn force_deep_overrides_any_columns(
        names in prop::collection::vec("[a-z][a-z0-9_]{0,14}", 1..16)
    ) {
        let dir = TempDir::new().unwrap();
        let router = offline_router(&dir);
        let columns: Vec<ColumnProfile> =
            names.iter().map(|n| ColumnProfile::named(n)).collect();

        let decision = router.should_use_deep_tier(&request(columns), true);
        prop_assert!(decision.use_deep_tier);
        prop_assert_eq!(decision.reason, "forced");
        prop_assert!((decision.complexity_score - 5.0).abs() < f64::EPSILON);
    }
}
