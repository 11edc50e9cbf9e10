//! Pipeline state and result types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entity::Dashboard;

/// The seven pipeline stages, in fixed execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    Fetch,
    Analyze,
    Map,
    Validate,
    Process,
    Quality,
    Sync,
}

impl PipelineStage {
    /// All stages in execution order.
    pub const ALL: [PipelineStage; 7] = [
        Self::Fetch,
        Self::Analyze,
        Self::Map,
        Self::Validate,
        Self::Process,
        Self::Quality,
        Self::Sync,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::Analyze => "analyze",
            Self::Map => "map",
            Self::Validate => "validate",
            Self::Process => "process",
            Self::Quality => "quality",
            Self::Sync => "sync",
        }
    }

    /// Progress percentage once this stage has completed.
    pub fn progress_after(&self) -> u8 {
        let position = Self::ALL.iter().position(|s| s == self).unwrap_or(0) + 1;
        ((position * 100) / Self::ALL.len()) as u8
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Pending,
    Processing,
    /// Halted: low-confidence mappings need human confirmation.
    MappingRequired,
    Completed,
    Failed,
    Exported,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::MappingRequired => "mapping_required",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Exported => "exported",
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller options for one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOptions {
    /// Persist suggestions at or above the auto-map threshold as confirmed.
    pub auto_map: bool,
    /// Run the validation stage against the mapping service.
    pub auto_validate: bool,
    /// Export to target dashboards during the sync stage.
    pub auto_sync: bool,
    /// Halt with `mapping_required` when any suggestion needs review.
    pub require_user_confirmation: bool,
    /// Optional minimum quality score; below it the run is reported
    /// unsuccessful even when it completes.
    pub quality_threshold: Option<f64>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            auto_map: true,
            auto_validate: true,
            auto_sync: true,
            require_user_confirmation: false,
            quality_threshold: None,
        }
    }
}

/// What a pipeline run reports back to its caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOutcome {
    pub success: bool,
    pub file_id: String,
    pub status: FileStatus,
    pub records_processed: Option<usize>,
    pub errors: Vec<String>,
    pub quality_score: Option<f64>,
    pub dashboards: Vec<Dashboard>,
}
