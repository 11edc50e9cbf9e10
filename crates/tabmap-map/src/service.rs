//! The mapping service.
//!
//! Model-backed column mapping, entity detection, and validation, each with a
//! deterministic degradation path: mapping falls back to the alias matcher,
//! detection to inventory at zero confidence, validation to all-rows-valid.
//! None of the public operations here surface a model error to the pipeline
//! except [`MappingService::suggest_deep`], whose caller owns the fallback.

use tracing::{info, warn};

use tabmap_llm::{CallOptions, LlmError, TierClient, prompt};
use tabmap_model::{
    ColumnProfile, EntityDetection, EntityType, FieldCatalog, MappingResult, MappingSuggestion,
    ModelTier, Record, Thresholds, ValidatedData,
};

use crate::error::Result;
use crate::fallback::match_columns;
use crate::learning::LearningStore;
use crate::parse::{parse_entity_response, parse_mapping_response, parse_validation_response};
use crate::transform::{apply_rules, split_rows};

const SYSTEM_PROMPT: &str =
    "You map tabular business data onto a standard schema. Respond with strict JSON only.";
const FEW_SHOT_LIMIT: usize = 10;
const VALIDATION_SAMPLE_ROWS: usize = 5;

pub struct MappingService {
    catalog: FieldCatalog,
    learning: LearningStore,
    thresholds: Thresholds,
}

impl MappingService {
    pub fn new(catalog: FieldCatalog, learning: LearningStore, thresholds: Thresholds) -> Self {
        Self {
            catalog,
            learning,
            thresholds,
        }
    }

    pub fn catalog(&self) -> &FieldCatalog {
        &self.catalog
    }

    pub fn learning(&self) -> &LearningStore {
        &self.learning
    }

    /// Suggests mappings via the given tier, degrading to the deterministic
    /// matcher on any failure. Never errors.
    pub fn suggest_column_mappings(
        &self,
        client: &TierClient,
        columns: &[ColumnProfile],
        entity_type: EntityType,
        scope: &str,
    ) -> MappingResult {
        let examples = self.examples_for(scope, entity_type);
        let request = prompt::mapping_prompt(columns, &self.catalog, &examples);
        match client.call(&request, Some(SYSTEM_PROMPT), &CallOptions::default()) {
            Ok(outcome) => {
                if let Some(value) = outcome.result.as_parsed() {
                    let suggestions = parse_mapping_response(
                        value,
                        client.config().confidence_scale,
                        client.tier(),
                        &self.catalog,
                    );
                    if !suggestions.is_empty() {
                        return MappingResult {
                            suggestions,
                            model: client.tier(),
                            cost: Some(outcome.metadata.cost),
                            processing_time_ms: Some(outcome.metadata.elapsed_ms),
                            complexity: None,
                        };
                    }
                }
                warn!(tier = %client.tier(), "mapping response unusable, using fallback matcher");
                self.fallback_result(columns)
            }
            Err(error) => {
                warn!(tier = %client.tier(), %error, "mapping call failed, using fallback matcher");
                self.fallback_result(columns)
            }
        }
    }

    /// Deep-tier mapping with the richer prompt; errors surface so the
    /// router can fall back to the cheap path.
    pub fn suggest_deep(
        &self,
        client: &TierClient,
        columns: &[ColumnProfile],
        entity_type: EntityType,
        scope: &str,
        prior: Option<&[MappingSuggestion]>,
    ) -> std::result::Result<MappingResult, LlmError> {
        let examples = self.examples_for(scope, entity_type);
        let request = prompt::deep_mapping_prompt(columns, &self.catalog, &examples, prior);
        let (value, metadata) =
            client.call_strict(&request, Some(SYSTEM_PROMPT), &CallOptions::default())?;
        let suggestions = parse_mapping_response(
            &value,
            client.config().confidence_scale,
            client.tier(),
            &self.catalog,
        );
        if suggestions.is_empty() {
            return Err(LlmError::StrictParse(
                "mapping response contained no usable mappings".to_string(),
            ));
        }
        Ok(MappingResult {
            suggestions,
            model: client.tier(),
            cost: Some(metadata.cost),
            processing_time_ms: Some(metadata.elapsed_ms),
            complexity: None,
        })
    }

    /// Deterministic matcher result, used directly by offline mode.
    pub fn fallback_result(&self, columns: &[ColumnProfile]) -> MappingResult {
        let names: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();
        MappingResult {
            suggestions: match_columns(&names, &self.catalog),
            model: ModelTier::Cheap,
            cost: None,
            processing_time_ms: None,
            complexity: None,
        }
    }

    /// Detects the entity type of a file; any failure yields the inventory
    /// default at zero confidence rather than an error.
    pub fn detect_entity_type(
        &self,
        client: &TierClient,
        columns: &[ColumnProfile],
        sample_rows: &[Vec<String>],
    ) -> EntityDetection {
        let request = prompt::entity_detection_prompt(columns, sample_rows);
        match client.call(&request, Some(SYSTEM_PROMPT), &CallOptions::default()) {
            Ok(outcome) => {
                if let Some((entity_type, confidence, reasoning)) =
                    outcome.result.as_parsed().and_then(parse_entity_response)
                {
                    info!(%entity_type, confidence, "detected entity type");
                    return EntityDetection {
                        entity_type,
                        confidence,
                        reasoning,
                        target_dashboards: entity_type.target_dashboards(),
                    };
                }
                warn!("entity detection response unusable, defaulting to inventory");
                EntityDetection::fallback("detection response was not usable")
            }
            Err(error) => {
                warn!(%error, "entity detection call failed, defaulting to inventory");
                EntityDetection::fallback(format!("detection unavailable: {error}"))
            }
        }
    }

    /// Validates and transforms mapped rows. Total failure keeps every row
    /// valid with no issues.
    pub fn validate_and_transform(
        &self,
        client: &TierClient,
        rows: Vec<Record>,
        entity_type: EntityType,
    ) -> ValidatedData {
        if rows.is_empty() {
            return ValidatedData::all_valid(rows);
        }
        let fields: Vec<String> = rows[0].keys().cloned().collect();
        let samples: Vec<Vec<(String, String)>> = rows
            .iter()
            .take(VALIDATION_SAMPLE_ROWS)
            .map(|row| row.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .collect();
        let request = prompt::validation_prompt(entity_type, &fields, &samples);
        match client.call(&request, Some(SYSTEM_PROMPT), &CallOptions::default()) {
            Ok(outcome) => {
                if let Some(value) = outcome.result.as_parsed() {
                    let (rules, issues) = parse_validation_response(value);
                    let transformed = apply_rules(rows, &rules);
                    return split_rows(transformed, issues);
                }
                warn!("validation response unusable, keeping all rows");
                ValidatedData::all_valid(rows)
            }
            Err(error) => {
                warn!(%error, "validation call failed, keeping all rows");
                ValidatedData::all_valid(rows)
            }
        }
    }

    /// Persists suggestions at or above the learning threshold; returns how
    /// many were recorded.
    pub fn record_confirmed(
        &self,
        scope: &str,
        entity_type: EntityType,
        suggestions: &[MappingSuggestion],
    ) -> Result<usize> {
        let mut recorded = 0;
        for suggestion in suggestions {
            if suggestion.confidence >= self.thresholds.learning_confidence {
                self.learning.record_observation(
                    scope,
                    entity_type,
                    &suggestion.source_column,
                    &suggestion.target_field,
                    suggestion.confidence,
                )?;
                recorded += 1;
            }
        }
        Ok(recorded)
    }

    fn examples_for(&self, scope: &str, entity_type: EntityType) -> Vec<(String, String)> {
        self.learning
            .few_shot_examples(
                scope,
                entity_type,
                self.thresholds.learning_success_rate,
                FEW_SHOT_LIMIT,
            )
            .unwrap_or_else(|error| {
                warn!(%error, "could not load learned mappings");
                Vec::new()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tabmap_llm::{ScriptedModel, TierClient, TierConfig, UnavailableModel, UsageLedger};
    use tempfile::TempDir;

    fn service(dir: &TempDir) -> MappingService {
        MappingService::new(
            FieldCatalog::builtin(),
            LearningStore::new(dir.path().join("learned")).unwrap(),
            Thresholds::default(),
        )
    }

    fn cheap_client(dir: &TempDir, model: ScriptedModel) -> TierClient {
        let thresholds = Thresholds {
            retry_base_delay_ms: 0,
            ..Thresholds::default()
        };
        TierClient::new(
            Arc::new(model),
            TierConfig::cheap(&thresholds),
            UsageLedger::new(dir.path().join("usage.jsonl")),
        )
    }

    fn offline_client(dir: &TempDir) -> TierClient {
        let thresholds = Thresholds {
            retry_base_delay_ms: 0,
            ..Thresholds::default()
        };
        TierClient::new(
            Arc::new(UnavailableModel::default()),
            TierConfig::cheap(&thresholds),
            UsageLedger::new(dir.path().join("usage.jsonl")),
        )
    }

    fn columns() -> Vec<ColumnProfile> {
        vec![
            ColumnProfile::named("sku"),
            ColumnProfile::named("quantity"),
        ]
    }

    #[test]
    fn model_suggestions_are_normalized() {
        let dir = TempDir::new().unwrap();
        let model = ScriptedModel::new("cheap").with_response(
            r#"{"mappings": [{"source_column": "sku", "target_field": "sku_code", "confidence": 95, "reasoning": "alias"}]}"#,
        );
        let client = cheap_client(&dir, model);
        let result = service(&dir).suggest_column_mappings(
            &client,
            &columns(),
            EntityType::Inventory,
            "acme",
        );
        assert_eq!(result.suggestions.len(), 1);
        assert!((result.suggestions[0].confidence - 0.95).abs() < 1e-9);
        assert!(result.cost.is_some());
    }

    #[test]
    fn unavailable_model_falls_back_to_matcher() {
        let dir = TempDir::new().unwrap();
        let client = offline_client(&dir);
        let result = service(&dir).suggest_column_mappings(
            &client,
            &columns(),
            EntityType::Inventory,
            "acme",
        );
        assert_eq!(result.suggestions.len(), 2);
        assert!(result.cost.is_none());
        let sku = result
            .suggestions
            .iter()
            .find(|s| s.source_column == "sku")
            .unwrap();
        assert_eq!(sku.target_field, "sku_code");
        assert!((sku.confidence - 0.98).abs() < 1e-9);
    }

    #[test]
    fn prose_response_falls_back_to_matcher() {
        let dir = TempDir::new().unwrap();
        let model =
            ScriptedModel::new("cheap").with_response("I cannot map these columns, sorry.");
        let client = cheap_client(&dir, model);
        let result = service(&dir).suggest_column_mappings(
            &client,
            &columns(),
            EntityType::Inventory,
            "acme",
        );
        assert!(!result.suggestions.is_empty());
        assert!(result.cost.is_none());
    }

    #[test]
    fn entity_detection_defaults_to_inventory_on_failure() {
        let dir = TempDir::new().unwrap();
        let client = offline_client(&dir);
        let detection = service(&dir).detect_entity_type(&client, &columns(), &[]);
        assert_eq!(detection.entity_type, EntityType::Inventory);
        assert_eq!(detection.confidence, 0.0);
    }

    #[test]
    fn validation_failure_keeps_all_rows() {
        let dir = TempDir::new().unwrap();
        let client = offline_client(&dir);
        let rows: Vec<Record> = vec![
            [("sku_code".to_string(), "a-1".to_string())].into_iter().collect(),
            [("sku_code".to_string(), "a-2".to_string())].into_iter().collect(),
        ];
        let validated =
            service(&dir).validate_and_transform(&client, rows, EntityType::Inventory);
        assert_eq!(validated.valid.len(), 2);
        assert!(validated.errors.is_empty());
    }

    #[test]
    fn only_high_confidence_suggestions_are_learned() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);
        let make = |column: &str, confidence| MappingSuggestion {
            source_column: column.to_string(),
            target_field: "sku_code".to_string(),
            target_domain: None,
            confidence,
            reasoning: String::new(),
            alternatives: Vec::new(),
            model_used: ModelTier::Cheap,
        };
        let recorded = svc
            .record_confirmed(
                "acme",
                EntityType::Inventory,
                &[make("sku", 0.9), make("code", 0.6)],
            )
            .unwrap();
        assert_eq!(recorded, 1);
        assert_eq!(svc.learning().load("acme").unwrap().len(), 1);
    }
}
