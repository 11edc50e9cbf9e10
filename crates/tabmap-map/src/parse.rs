//! Parsing model JSON responses into typed results.
//!
//! Responses follow the prompt contracts but are treated as hostile input:
//! missing fields default, unknown fields are ignored, malformed entries are
//! skipped rather than failing the batch.

use serde_json::Value;
use tracing::warn;

use tabmap_llm::ConfidenceScale;
use tabmap_model::{
    AlternativeSuggestion, EntityType, FieldCatalog, IssueSeverity, MappingSuggestion, ModelTier,
    TransformOp, TransformRule, ValidationIssue, mapping::normalize_confidence,
};

/// Parses a mapping response into suggestions, confidence normalized to 0..1.
pub fn parse_mapping_response(
    value: &Value,
    scale: ConfidenceScale,
    tier: ModelTier,
    catalog: &FieldCatalog,
) -> Vec<MappingSuggestion> {
    let Some(entries) = value.get("mappings").and_then(Value::as_array) else {
        warn!("mapping response has no 'mappings' array");
        return Vec::new();
    };
    let mut suggestions = Vec::new();
    for entry in entries {
        let Some(source_column) = entry.get("source_column").and_then(Value::as_str) else {
            continue;
        };
        // Null target means the model deliberately left the column unmapped.
        let Some(target_field) = entry.get("target_field").and_then(Value::as_str) else {
            continue;
        };
        if target_field.is_empty() {
            continue;
        }
        let confidence = scaled_confidence(entry.get("confidence"), scale);
        let reasoning = entry
            .get("reasoning")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let target_domain = catalog.field(target_field).map(|f| f.domain);
        let alternatives = entry
            .get("alternatives")
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .filter_map(|alt| {
                        let field = alt.get("field").and_then(Value::as_str)?;
                        Some(AlternativeSuggestion {
                            field: field.to_string(),
                            confidence: scaled_confidence(alt.get("confidence"), scale),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        suggestions.push(MappingSuggestion {
            source_column: source_column.to_string(),
            target_field: target_field.to_string(),
            target_domain,
            confidence,
            reasoning,
            alternatives,
            model_used: tier,
        });
    }
    suggestions
}

/// Parses an entity detection response.
pub fn parse_entity_response(value: &Value) -> Option<(EntityType, f64, String)> {
    let entity: EntityType = value
        .get("entity_type")
        .and_then(Value::as_str)?
        .parse()
        .ok()?;
    let confidence = scaled_confidence(value.get("confidence"), ConfidenceScale::Unit);
    let reasoning = value
        .get("reasoning")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Some((entity, confidence, reasoning))
}

/// Parses a validation response into transformation rules and issues.
pub fn parse_validation_response(value: &Value) -> (Vec<TransformRule>, Vec<ValidationIssue>) {
    let rules = value
        .get("transformations")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(|entry| {
                    let field = entry.get("field").and_then(Value::as_str)?;
                    let op: TransformOp =
                        serde_json::from_value(entry.get("op")?.clone()).ok()?;
                    Some(TransformRule {
                        field: field.to_string(),
                        op,
                    })
                })
                .collect()
        })
        .unwrap_or_default();
    let issues = value
        .get("issues")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(|entry| {
                    let message = entry.get("message").and_then(Value::as_str)?;
                    let severity: IssueSeverity = entry
                        .get("severity")
                        .and_then(|s| serde_json::from_value(s.clone()).ok())
                        .unwrap_or(IssueSeverity::Warning);
                    Some(ValidationIssue {
                        row: entry
                            .get("row")
                            .and_then(Value::as_u64)
                            .map(|r| r as usize),
                        field: entry
                            .get("field")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string(),
                        message: message.to_string(),
                        severity,
                    })
                })
                .collect()
        })
        .unwrap_or_default();
    (rules, issues)
}

/// Applies the tier's declared scale, then the defensive clamp.
fn scaled_confidence(raw: Option<&Value>, scale: ConfidenceScale) -> f64 {
    let raw = raw.and_then(Value::as_f64).unwrap_or(0.0);
    let value = match scale {
        ConfidenceScale::Percent => raw / 100.0,
        ConfidenceScale::Unit => raw,
    };
    normalize_confidence(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn percent_scale_divides_by_100() {
        let value = json!({"mappings": [{
            "source_column": "sku",
            "target_field": "sku_code",
            "confidence": 95,
            "reasoning": "direct match"
        }]});
        let suggestions = parse_mapping_response(
            &value,
            ConfidenceScale::Percent,
            ModelTier::Cheap,
            &FieldCatalog::builtin(),
        );
        assert_eq!(suggestions.len(), 1);
        assert!((suggestions[0].confidence - 0.95).abs() < 1e-9);
        assert_eq!(
            suggestions[0].target_domain,
            Some(tabmap_model::FieldDomain::Inventory)
        );
    }

    #[test]
    fn unit_scale_clamps_contract_violations() {
        let value = json!({"mappings": [{
            "source_column": "qty",
            "target_field": "quantity_on_hand",
            "confidence": 85.0
        }]});
        let suggestions = parse_mapping_response(
            &value,
            ConfidenceScale::Unit,
            ModelTier::Deep,
            &FieldCatalog::builtin(),
        );
        // A deep model that answered on the percent scale is still normalized.
        assert!((suggestions[0].confidence - 0.85).abs() < 1e-9);
    }

    #[test]
    fn null_targets_are_skipped() {
        let value = json!({"mappings": [
            {"source_column": "notes", "target_field": null, "confidence": 10},
            {"source_column": "sku", "target_field": "sku_code", "confidence": 98}
        ]});
        let suggestions = parse_mapping_response(
            &value,
            ConfidenceScale::Percent,
            ModelTier::Cheap,
            &FieldCatalog::builtin(),
        );
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].source_column, "sku");
    }

    #[test]
    fn entity_response_round_trips() {
        let value = json!({"entity_type": "orders", "confidence": 0.9, "reasoning": "order ids"});
        let (entity, confidence, reasoning) = parse_entity_response(&value).unwrap();
        assert_eq!(entity, EntityType::Orders);
        assert!((confidence - 0.9).abs() < 1e-9);
        assert_eq!(reasoning, "order ids");
    }

    #[test]
    fn unknown_entity_is_rejected() {
        let value = json!({"entity_type": "spacecraft", "confidence": 0.9});
        assert!(parse_entity_response(&value).is_none());
    }

    #[test]
    fn validation_response_parses_rules_and_issues() {
        let value = json!({
            "transformations": [{"field": "sku_code", "op": "uppercase"}],
            "issues": [
                {"row": 3, "field": "unit_price", "message": "negative price", "severity": "error"},
                {"row": null, "field": "", "message": "header noise", "severity": "info"}
            ]
        });
        let (rules, issues) = parse_validation_response(&value);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].op, TransformOp::Uppercase);
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].row, Some(3));
        assert_eq!(issues[0].severity, IssueSeverity::Error);
        assert_eq!(issues[1].row, None);
    }
}
