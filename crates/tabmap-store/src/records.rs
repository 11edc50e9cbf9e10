//! Persisted record shapes.

use serde::{Deserialize, Serialize};

use tabmap_model::{
    Dashboard, EntityType, FileStatus, IssueSeverity, MappingSuggestion, PipelineStage, Record,
    RoutingDecision,
};

/// State of one uploaded file as it moves through the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileUploadRecord {
    pub id: String,
    pub company_id: String,
    pub file_name: String,
    /// Object-store key holding the raw bytes.
    pub object_key: String,
    pub status: FileStatus,
    pub current_stage: Option<PipelineStage>,
    /// Progress percentage, 0-100.
    pub progress: u8,
    pub entity_type: Option<EntityType>,
    pub row_count: Option<usize>,
    pub column_count: Option<usize>,
    pub quality_score: Option<f64>,
    /// RFC 3339 upload timestamp.
    pub uploaded_at: String,
}

impl FileUploadRecord {
    pub fn new(
        id: impl Into<String>,
        company_id: impl Into<String>,
        file_name: impl Into<String>,
        object_key: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            company_id: company_id.into(),
            file_name: file_name.into(),
            object_key: object_key.into(),
            status: FileStatus::Pending,
            current_stage: None,
            progress: 0,
            entity_type: None,
            row_count: None,
            column_count: None,
            quality_score: None,
            uploaded_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// A persisted mapping suggestion, optionally confirmed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSuggestion {
    pub file_upload_id: String,
    pub suggestion: MappingSuggestion,
    pub confirmed: bool,
}

/// One recorded processing problem, from a validation issue to a fatal
/// stage error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingErrorRecord {
    pub file_upload_id: String,
    pub stage: PipelineStage,
    pub row: Option<usize>,
    pub field: Option<String>,
    pub message: String,
    pub severity: IssueSeverity,
}

/// A standardized output row tagged with its destination dashboards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedRecord {
    pub file_upload_id: String,
    pub entity_type: EntityType,
    pub dashboards: Vec<Dashboard>,
    pub data: Record,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityMetricsRecord {
    pub file_upload_id: String,
    pub records_processed: usize,
    pub error_count: usize,
    /// Percentage, 0.0-100.0.
    pub quality_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Pending,
    Synced,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSyncRecord {
    pub file_upload_id: String,
    pub dashboard: Dashboard,
    pub status: SyncStatus,
}

/// A routing decision, written before the routed call executes so the trail
/// survives a failed call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingLogEntry {
    pub file_upload_id: String,
    pub decision: RoutingDecision,
    /// RFC 3339 decision timestamp.
    pub decided_at: String,
}
