//! The record store seam and its in-memory implementation.

use std::collections::BTreeMap;
use std::sync::Mutex;

use tracing::debug;

use tabmap_model::{
    Dashboard, EntityType, FileStatus, MappingSuggestion, PipelineStage, RoutingDecision,
};

use crate::error::{Result, StoreError};
use crate::records::{
    DashboardSyncRecord, FileUploadRecord, ProcessedRecord, ProcessingErrorRecord,
    QualityMetricsRecord, RoutingLogEntry, StoredSuggestion, SyncStatus,
};

/// Structured persistence for everything except raw file bytes.
///
/// Methods take `&self`; implementations use interior mutability so one store
/// can be shared across the router and pipeline.
pub trait RecordStore: Send + Sync {
    fn create_file_upload(&self, record: FileUploadRecord) -> Result<()>;
    fn file_upload(&self, file_id: &str) -> Result<FileUploadRecord>;
    fn update_status(&self, file_id: &str, status: FileStatus) -> Result<()>;
    /// Persists stage completion: the stage just finished and cumulative
    /// progress percentage.
    fn update_stage(&self, file_id: &str, stage: PipelineStage, progress: u8) -> Result<()>;
    fn record_analysis(
        &self,
        file_id: &str,
        entity_type: EntityType,
        row_count: usize,
        column_count: usize,
    ) -> Result<()>;

    fn save_suggestions(&self, file_id: &str, suggestions: &[MappingSuggestion]) -> Result<()>;
    fn confirm_suggestions(&self, file_id: &str, min_confidence: f64) -> Result<usize>;
    fn suggestions(&self, file_id: &str) -> Result<Vec<StoredSuggestion>>;

    fn record_error(&self, error: ProcessingErrorRecord) -> Result<()>;
    fn errors(&self, file_id: &str) -> Result<Vec<ProcessingErrorRecord>>;

    fn insert_processed(&self, records: &[ProcessedRecord]) -> Result<()>;
    fn processed_count(&self, file_id: &str) -> Result<usize>;

    fn save_quality_metrics(&self, metrics: QualityMetricsRecord) -> Result<()>;
    fn quality_metrics(&self, file_id: &str) -> Result<Option<QualityMetricsRecord>>;

    fn set_dashboard_sync(
        &self,
        file_id: &str,
        dashboard: Dashboard,
        status: SyncStatus,
    ) -> Result<()>;
    fn dashboard_syncs(&self, file_id: &str) -> Result<Vec<DashboardSyncRecord>>;

    fn log_routing_decision(&self, file_id: &str, decision: &RoutingDecision) -> Result<()>;
    fn routing_log(&self, file_id: &str) -> Result<Vec<RoutingLogEntry>>;
}

#[derive(Debug, Default)]
struct Tables {
    files: BTreeMap<String, FileUploadRecord>,
    suggestions: Vec<StoredSuggestion>,
    errors: Vec<ProcessingErrorRecord>,
    processed: Vec<ProcessedRecord>,
    quality: BTreeMap<String, QualityMetricsRecord>,
    syncs: Vec<DashboardSyncRecord>,
    routing: Vec<RoutingLogEntry>,
}

/// In-memory record store used by the CLI and tests.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    tables: Mutex<Tables>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_tables<T>(&self, f: impl FnOnce(&mut Tables) -> Result<T>) -> Result<T> {
        let mut tables = self
            .tables
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut tables)
    }
}

impl RecordStore for MemoryRecordStore {
    fn create_file_upload(&self, record: FileUploadRecord) -> Result<()> {
        debug!(file_id = %record.id, file_name = %record.file_name, "registering file upload");
        self.with_tables(|t| {
            t.files.insert(record.id.clone(), record);
            Ok(())
        })
    }

    fn file_upload(&self, file_id: &str) -> Result<FileUploadRecord> {
        self.with_tables(|t| {
            t.files
                .get(file_id)
                .cloned()
                .ok_or_else(|| StoreError::FileNotFound(file_id.to_string()))
        })
    }

    fn update_status(&self, file_id: &str, status: FileStatus) -> Result<()> {
        self.with_tables(|t| {
            let file = t
                .files
                .get_mut(file_id)
                .ok_or_else(|| StoreError::FileNotFound(file_id.to_string()))?;
            file.status = status;
            Ok(())
        })
    }

    fn update_stage(&self, file_id: &str, stage: PipelineStage, progress: u8) -> Result<()> {
        self.with_tables(|t| {
            let file = t
                .files
                .get_mut(file_id)
                .ok_or_else(|| StoreError::FileNotFound(file_id.to_string()))?;
            file.current_stage = Some(stage);
            file.progress = progress.min(100);
            Ok(())
        })
    }

    fn record_analysis(
        &self,
        file_id: &str,
        entity_type: EntityType,
        row_count: usize,
        column_count: usize,
    ) -> Result<()> {
        self.with_tables(|t| {
            let file = t
                .files
                .get_mut(file_id)
                .ok_or_else(|| StoreError::FileNotFound(file_id.to_string()))?;
            file.entity_type = Some(entity_type);
            file.row_count = Some(row_count);
            file.column_count = Some(column_count);
            Ok(())
        })
    }

    fn save_suggestions(&self, file_id: &str, suggestions: &[MappingSuggestion]) -> Result<()> {
        self.with_tables(|t| {
            for suggestion in suggestions {
                t.suggestions.push(StoredSuggestion {
                    file_upload_id: file_id.to_string(),
                    suggestion: suggestion.clone(),
                    confirmed: false,
                });
            }
            Ok(())
        })
    }

    fn confirm_suggestions(&self, file_id: &str, min_confidence: f64) -> Result<usize> {
        self.with_tables(|t| {
            let mut confirmed = 0;
            for stored in t
                .suggestions
                .iter_mut()
                .filter(|s| s.file_upload_id == file_id)
            {
                if stored.suggestion.confidence >= min_confidence {
                    stored.confirmed = true;
                    confirmed += 1;
                }
            }
            Ok(confirmed)
        })
    }

    fn suggestions(&self, file_id: &str) -> Result<Vec<StoredSuggestion>> {
        self.with_tables(|t| {
            Ok(t.suggestions
                .iter()
                .filter(|s| s.file_upload_id == file_id)
                .cloned()
                .collect())
        })
    }

    fn record_error(&self, error: ProcessingErrorRecord) -> Result<()> {
        self.with_tables(|t| {
            t.errors.push(error);
            Ok(())
        })
    }

    fn errors(&self, file_id: &str) -> Result<Vec<ProcessingErrorRecord>> {
        self.with_tables(|t| {
            Ok(t.errors
                .iter()
                .filter(|e| e.file_upload_id == file_id)
                .cloned()
                .collect())
        })
    }

    fn insert_processed(&self, records: &[ProcessedRecord]) -> Result<()> {
        self.with_tables(|t| {
            t.processed.extend_from_slice(records);
            Ok(())
        })
    }

    fn processed_count(&self, file_id: &str) -> Result<usize> {
        self.with_tables(|t| {
            Ok(t.processed
                .iter()
                .filter(|r| r.file_upload_id == file_id)
                .count())
        })
    }

    fn save_quality_metrics(&self, metrics: QualityMetricsRecord) -> Result<()> {
        self.with_tables(|t| {
            if let Some(file) = t.files.get_mut(&metrics.file_upload_id) {
                file.quality_score = Some(metrics.quality_score);
            }
            t.quality.insert(metrics.file_upload_id.clone(), metrics);
            Ok(())
        })
    }

    fn quality_metrics(&self, file_id: &str) -> Result<Option<QualityMetricsRecord>> {
        self.with_tables(|t| Ok(t.quality.get(file_id).cloned()))
    }

    fn set_dashboard_sync(
        &self,
        file_id: &str,
        dashboard: Dashboard,
        status: SyncStatus,
    ) -> Result<()> {
        self.with_tables(|t| {
            if let Some(existing) = t
                .syncs
                .iter_mut()
                .find(|s| s.file_upload_id == file_id && s.dashboard == dashboard)
            {
                existing.status = status;
            } else {
                t.syncs.push(DashboardSyncRecord {
                    file_upload_id: file_id.to_string(),
                    dashboard,
                    status,
                });
            }
            Ok(())
        })
    }

    fn dashboard_syncs(&self, file_id: &str) -> Result<Vec<DashboardSyncRecord>> {
        self.with_tables(|t| {
            Ok(t.syncs
                .iter()
                .filter(|s| s.file_upload_id == file_id)
                .cloned()
                .collect())
        })
    }

    fn log_routing_decision(&self, file_id: &str, decision: &RoutingDecision) -> Result<()> {
        self.with_tables(|t| {
            t.routing.push(RoutingLogEntry {
                file_upload_id: file_id.to_string(),
                decision: decision.clone(),
                decided_at: chrono::Utc::now().to_rfc3339(),
            });
            Ok(())
        })
    }

    fn routing_log(&self, file_id: &str) -> Result<Vec<RoutingLogEntry>> {
        self.with_tables(|t| {
            Ok(t.routing
                .iter()
                .filter(|e| e.file_upload_id == file_id)
                .cloned()
                .collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabmap_model::ModelTier;

    fn suggestion(column: &str, confidence: f64) -> MappingSuggestion {
        MappingSuggestion {
            source_column: column.to_string(),
            target_field: "sku_code".to_string(),
            target_domain: None,
            confidence,
            reasoning: String::new(),
            alternatives: Vec::new(),
            model_used: ModelTier::Cheap,
        }
    }

    #[test]
    fn file_lifecycle_updates_in_place() {
        let store = MemoryRecordStore::new();
        store
            .create_file_upload(FileUploadRecord::new("f1", "acme", "inv.csv", "f1.csv"))
            .unwrap();
        store
            .update_stage("f1", PipelineStage::Analyze, 28)
            .unwrap();
        store
            .record_analysis("f1", EntityType::Inventory, 200, 8)
            .unwrap();
        store.update_status("f1", FileStatus::Processing).unwrap();

        let file = store.file_upload("f1").unwrap();
        assert_eq!(file.current_stage, Some(PipelineStage::Analyze));
        assert_eq!(file.progress, 28);
        assert_eq!(file.row_count, Some(200));
        assert_eq!(file.status, FileStatus::Processing);
    }

    #[test]
    fn unknown_file_is_an_error() {
        let store = MemoryRecordStore::new();
        assert!(matches!(
            store.file_upload("missing"),
            Err(StoreError::FileNotFound(_))
        ));
    }

    #[test]
    fn confirmation_respects_threshold() {
        let store = MemoryRecordStore::new();
        store
            .create_file_upload(FileUploadRecord::new("f1", "acme", "inv.csv", "f1.csv"))
            .unwrap();
        store
            .save_suggestions("f1", &[suggestion("sku", 0.98), suggestion("notes", 0.55)])
            .unwrap();
        let confirmed = store.confirm_suggestions("f1", 0.80).unwrap();
        assert_eq!(confirmed, 1);
        let stored = store.suggestions("f1").unwrap();
        assert!(stored[0].confirmed);
        assert!(!stored[1].confirmed);
    }

    #[test]
    fn sync_status_is_upserted_per_dashboard() {
        let store = MemoryRecordStore::new();
        store
            .set_dashboard_sync("f1", Dashboard::Inventory, SyncStatus::Pending)
            .unwrap();
        store
            .set_dashboard_sync("f1", Dashboard::Inventory, SyncStatus::Synced)
            .unwrap();
        let syncs = store.dashboard_syncs("f1").unwrap();
        assert_eq!(syncs.len(), 1);
        assert_eq!(syncs[0].status, SyncStatus::Synced);
    }
}
