//! Learned mapping store.
//!
//! High-confidence confirmed mappings are persisted as JSON files, one per
//! scope (company), and fed back into prompts as few-shot context. A repeat
//! observation of the same (entity, source column, target field) key bumps
//! the usage count and averages the confidence with the stored value instead
//! of overwriting it, so one enthusiastic model answer cannot erase history.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use tabmap_model::EntityType;

use crate::error::{MapError, Result};
use crate::fallback::normalize;

/// Scope whose learned mappings every company inherits.
pub const SHARED_SCOPE: &str = "shared";

/// One learned column mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnedMapping {
    pub entity_type: EntityType,
    /// Normalized source column name.
    pub source_column: String,
    pub target_field: String,
    /// Averaged confidence across observations (0..1).
    pub confidence: f64,
    pub usage_count: u32,
    pub success_count: u32,
    pub failure_count: u32,
}

impl LearnedMapping {
    /// Fraction of outcomes that were successes; a mapping with no recorded
    /// outcomes counts as fully successful.
    pub fn success_rate(&self) -> f64 {
        let total = self.success_count + self.failure_count;
        if total == 0 {
            return 1.0;
        }
        f64::from(self.success_count) / f64::from(total)
    }
}

/// Directory of per-scope JSON files holding learned mappings.
#[derive(Debug, Clone)]
pub struct LearningStore {
    base_dir: PathBuf,
}

impl LearningStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir).map_err(|source| MapError::LearningIo {
            path: base_dir.clone(),
            source,
        })?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Records one confirmed observation; averages confidence on repeats.
    pub fn record_observation(
        &self,
        scope: &str,
        entity_type: EntityType,
        source_column: &str,
        target_field: &str,
        confidence: f64,
    ) -> Result<()> {
        let normalized = normalize(source_column);
        let mut mappings = self.load(scope)?;
        if let Some(existing) = mappings.iter_mut().find(|m| {
            m.entity_type == entity_type
                && m.source_column == normalized
                && m.target_field == target_field
        }) {
            existing.usage_count += 1;
            existing.success_count += 1;
            existing.confidence = (existing.confidence + confidence) / 2.0;
        } else {
            mappings.push(LearnedMapping {
                entity_type,
                source_column: normalized,
                target_field: target_field.to_string(),
                confidence,
                usage_count: 1,
                success_count: 1,
                failure_count: 0,
            });
        }
        debug!(scope, source_column, target_field, "recorded learned mapping");
        self.save(scope, &mappings)
    }

    /// Records a rejected mapping, lowering its success rate.
    pub fn record_failure(
        &self,
        scope: &str,
        entity_type: EntityType,
        source_column: &str,
        target_field: &str,
    ) -> Result<()> {
        let normalized = normalize(source_column);
        let mut mappings = self.load(scope)?;
        if let Some(existing) = mappings.iter_mut().find(|m| {
            m.entity_type == entity_type
                && m.source_column == normalized
                && m.target_field == target_field
        }) {
            existing.failure_count += 1;
            self.save(scope, &mappings)?;
        }
        Ok(())
    }

    /// Few-shot examples for prompting: scope-local plus shared mappings for
    /// the entity type, filtered by success rate, most used first, one per
    /// source column.
    pub fn few_shot_examples(
        &self,
        scope: &str,
        entity_type: EntityType,
        min_success_rate: f64,
        limit: usize,
    ) -> Result<Vec<(String, String)>> {
        let mut mappings = self.load(scope)?;
        if scope != SHARED_SCOPE {
            mappings.extend(self.load(SHARED_SCOPE)?);
        }
        mappings.retain(|m| {
            m.entity_type == entity_type && m.success_rate() > min_success_rate
        });
        mappings.sort_by(|a, b| {
            b.usage_count
                .cmp(&a.usage_count)
                .then_with(|| a.source_column.cmp(&b.source_column))
        });
        let mut seen = std::collections::BTreeSet::new();
        let examples = mappings
            .into_iter()
            .filter(|m| seen.insert(m.source_column.clone()))
            .take(limit)
            .map(|m| (m.source_column, m.target_field))
            .collect();
        Ok(examples)
    }

    pub fn load(&self, scope: &str) -> Result<Vec<LearnedMapping>> {
        let path = self.scope_path(scope);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&path).map_err(|source| MapError::LearningIo {
            path: path.clone(),
            source,
        })?;
        Ok(serde_json::from_str(&contents)?)
    }

    fn save(&self, scope: &str, mappings: &[LearnedMapping]) -> Result<()> {
        let path = self.scope_path(scope);
        let json = serde_json::to_string_pretty(mappings)?;
        fs::write(&path, json).map_err(|source| MapError::LearningIo { path, source })
    }

    fn scope_path(&self, scope: &str) -> PathBuf {
        let name: String = scope
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect();
        self.base_dir.join(format!("{name}.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn repeat_observations_average_confidence() {
        let dir = TempDir::new().unwrap();
        let store = LearningStore::new(dir.path()).unwrap();
        store
            .record_observation("acme", EntityType::Inventory, "Prod Code", "sku_code", 0.9)
            .unwrap();
        store
            .record_observation("acme", EntityType::Inventory, "prod_code", "sku_code", 1.0)
            .unwrap();

        let mappings = store.load("acme").unwrap();
        assert_eq!(mappings.len(), 1, "normalized keys must collapse");
        assert_eq!(mappings[0].usage_count, 2);
        assert!((mappings[0].confidence - 0.95).abs() < 1e-9);
    }

    #[test]
    fn averaging_is_order_sensitive_but_bounded() {
        let dir = TempDir::new().unwrap();
        let store = LearningStore::new(dir.path()).unwrap();
        for _ in 0..5 {
            store
                .record_observation("acme", EntityType::Orders, "ord", "order_number", 1.0)
                .unwrap();
        }
        let mappings = store.load("acme").unwrap();
        assert!(mappings[0].confidence <= 1.0);
        assert_eq!(mappings[0].usage_count, 5);
    }

    #[test]
    fn low_success_rate_mappings_are_excluded_from_examples() {
        let dir = TempDir::new().unwrap();
        let store = LearningStore::new(dir.path()).unwrap();
        store
            .record_observation("acme", EntityType::Inventory, "sku", "sku_code", 0.95)
            .unwrap();
        store
            .record_observation("acme", EntityType::Inventory, "desc", "item_name", 0.9)
            .unwrap();
        // Two failures against one success drops "desc" to 1/3.
        store
            .record_failure("acme", EntityType::Inventory, "desc", "item_name")
            .unwrap();
        store
            .record_failure("acme", EntityType::Inventory, "desc", "item_name")
            .unwrap();

        let examples = store
            .few_shot_examples("acme", EntityType::Inventory, 0.7, 10)
            .unwrap();
        assert_eq!(examples, vec![("sku".to_string(), "sku_code".to_string())]);
    }

    #[test]
    fn shared_scope_is_merged_for_companies() {
        let dir = TempDir::new().unwrap();
        let store = LearningStore::new(dir.path()).unwrap();
        store
            .record_observation(SHARED_SCOPE, EntityType::Inventory, "upc", "sku_code", 0.9)
            .unwrap();
        let examples = store
            .few_shot_examples("acme", EntityType::Inventory, 0.7, 10)
            .unwrap();
        assert_eq!(examples.len(), 1);
    }

    #[test]
    fn entity_types_are_isolated() {
        let dir = TempDir::new().unwrap();
        let store = LearningStore::new(dir.path()).unwrap();
        store
            .record_observation("acme", EntityType::Orders, "total", "total_amount", 0.9)
            .unwrap();
        let examples = store
            .few_shot_examples("acme", EntityType::Inventory, 0.7, 10)
            .unwrap();
        assert!(examples.is_empty());
    }
}
