//! The seven-stage pipeline executor.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, info_span, warn};

use tabmap_llm::TierClient;
use tabmap_model::{
    Dashboard, EntityType, FileStatus, IssueSeverity, MappingSuggestion, PipelineOptions,
    PipelineOutcome, PipelineStage, Record, Thresholds,
};
use tabmap_router::{FileMappingRequest, IntelligentRouter};
use tabmap_store::{
    ObjectStore, ProcessedRecord, ProcessingErrorRecord, QualityMetricsRecord, RecordStore,
    SyncStatus,
};

use crate::error::Result;
use crate::parser::{ParsedTable, TableParser};

const PROCESS_BATCH_SIZE: usize = 100;

pub struct PipelineExecutor {
    objects: Arc<dyn ObjectStore>,
    records: Arc<dyn RecordStore>,
    router: IntelligentRouter,
    /// Cheap-tier client for entity detection and validation calls.
    assistant: TierClient,
    parser: Box<dyn TableParser>,
    thresholds: Thresholds,
}

/// Accumulated state across stages of one run.
#[derive(Default)]
struct RunState {
    company_id: String,
    object_key: String,
    bytes: Vec<u8>,
    table: Option<ParsedTable>,
    entity_type: Option<EntityType>,
    mapped_rows: Vec<Record>,
    valid_rows: Vec<Record>,
    error_count: usize,
    records_processed: usize,
    quality_score: Option<f64>,
    dashboards: Vec<Dashboard>,
    halted: bool,
}

impl PipelineExecutor {
    pub fn new(
        objects: Arc<dyn ObjectStore>,
        records: Arc<dyn RecordStore>,
        router: IntelligentRouter,
        assistant: TierClient,
        parser: Box<dyn TableParser>,
        thresholds: Thresholds,
    ) -> Self {
        Self {
            objects,
            records,
            router,
            assistant,
            parser,
            thresholds,
        }
    }

    pub fn router(&self) -> &IntelligentRouter {
        &self.router
    }

    /// Runs the full pipeline for one registered file. Never panics and
    /// never returns an error: failures are reported through the outcome
    /// and the file's persisted status.
    pub fn execute_pipeline(&self, file_id: &str, options: &PipelineOptions) -> PipelineOutcome {
        let file = match self.records.file_upload(file_id) {
            Ok(file) => file,
            Err(error) => {
                warn!(file_id, %error, "unknown file upload");
                return failed_outcome(file_id, vec![error.to_string()]);
            }
        };
        if let Err(error) = self.records.update_status(file_id, FileStatus::Processing) {
            return failed_outcome(file_id, vec![error.to_string()]);
        }

        let mut state = RunState {
            company_id: file.company_id,
            object_key: file.object_key,
            ..RunState::default()
        };

        for stage in PipelineStage::ALL {
            let result = info_span!("pipeline_stage", stage = %stage, file_id).in_scope(|| {
                let start = Instant::now();
                let result = self.run_stage(stage, file_id, &mut state, options);
                if result.is_ok() {
                    info!(
                        duration_ms = start.elapsed().as_millis() as u64,
                        progress = stage.progress_after(),
                        "stage complete"
                    );
                }
                result
            });
            if let Err(error) = result {
                return self.fail(file_id, stage, &error.to_string());
            }
            if let Err(error) = self
                .records
                .update_stage(file_id, stage, stage.progress_after())
            {
                return self.fail(file_id, stage, &error.to_string());
            }
            if state.halted {
                if let Err(error) = self
                    .records
                    .update_status(file_id, FileStatus::MappingRequired)
                {
                    return self.fail(file_id, stage, &error.to_string());
                }
                info!(file_id, "pipeline halted: mappings need review");
                return PipelineOutcome {
                    success: false,
                    file_id: file_id.to_string(),
                    status: FileStatus::MappingRequired,
                    records_processed: None,
                    errors: Vec::new(),
                    quality_score: None,
                    dashboards: state.dashboards,
                };
            }
        }

        let status = if options.auto_sync {
            FileStatus::Exported
        } else {
            FileStatus::Completed
        };
        if let Err(error) = self.records.update_status(file_id, status) {
            return self.fail(file_id, PipelineStage::Sync, &error.to_string());
        }
        let meets_quality = match (options.quality_threshold, state.quality_score) {
            (Some(threshold), Some(score)) => score >= threshold,
            _ => true,
        };
        PipelineOutcome {
            success: meets_quality,
            file_id: file_id.to_string(),
            status,
            records_processed: Some(state.records_processed),
            errors: Vec::new(),
            quality_score: state.quality_score,
            dashboards: state.dashboards,
        }
    }

    fn run_stage(
        &self,
        stage: PipelineStage,
        file_id: &str,
        state: &mut RunState,
        options: &PipelineOptions,
    ) -> Result<()> {
        match stage {
            PipelineStage::Fetch => self.stage_fetch(state),
            PipelineStage::Analyze => self.stage_analyze(file_id, state),
            PipelineStage::Map => self.stage_map(file_id, state, options),
            PipelineStage::Validate => self.stage_validate(file_id, state, options),
            PipelineStage::Process => self.stage_process(file_id, state),
            PipelineStage::Quality => self.stage_quality(file_id, state),
            PipelineStage::Sync => self.stage_sync(file_id, state, options),
        }
    }

    fn stage_fetch(&self, state: &mut RunState) -> Result<()> {
        state.bytes = self.objects.get(&state.object_key)?;
        Ok(())
    }

    fn stage_analyze(&self, file_id: &str, state: &mut RunState) -> Result<()> {
        let table = self.parser.parse(&state.bytes)?;
        let detection =
            self.router
                .service()
                .detect_entity_type(&self.assistant, &table.columns, &table.sample_rows);
        self.records.record_analysis(
            file_id,
            detection.entity_type,
            table.rows.len(),
            table.columns.len(),
        )?;
        info!(
            entity_type = %detection.entity_type,
            confidence = detection.confidence,
            rows = table.rows.len(),
            columns = table.columns.len(),
            "analysis complete"
        );
        state.entity_type = Some(detection.entity_type);
        state.dashboards = detection.target_dashboards;
        state.table = Some(table);
        Ok(())
    }

    fn stage_map(
        &self,
        file_id: &str,
        state: &mut RunState,
        options: &PipelineOptions,
    ) -> Result<()> {
        let table = state.table.as_ref().ok_or_else(missing_table)?;
        let request = FileMappingRequest {
            file_upload_id: file_id.to_string(),
            company_id: state.company_id.clone(),
            entity_type: state.entity_type.unwrap_or(EntityType::Unknown),
            columns: table.columns.clone(),
            force_deep: false,
        };
        let result = self.router.route_mapping_request(&request);
        self.records.save_suggestions(file_id, &result.suggestions)?;

        let needs_review = result
            .suggestions
            .iter()
            .any(|s| s.confidence < self.thresholds.auto_map_confidence);
        if needs_review && options.require_user_confirmation {
            state.halted = true;
            return Ok(());
        }
        if options.auto_map {
            let confirmed = self
                .records
                .confirm_suggestions(file_id, self.thresholds.auto_map_confidence)?;
            debug!(confirmed, "auto-confirmed suggestions");
        }
        state.mapped_rows = apply_mappings(&table.rows, &result.suggestions);
        Ok(())
    }

    fn stage_validate(
        &self,
        file_id: &str,
        state: &mut RunState,
        options: &PipelineOptions,
    ) -> Result<()> {
        let entity_type = state.entity_type.unwrap_or(EntityType::Unknown);
        if !options.auto_validate {
            state.valid_rows = std::mem::take(&mut state.mapped_rows);
            return Ok(());
        }
        let rows = std::mem::take(&mut state.mapped_rows);
        let validated =
            self.router
                .service()
                .validate_and_transform(&self.assistant, rows, entity_type);
        for issue in &validated.errors {
            self.records.record_error(ProcessingErrorRecord {
                file_upload_id: file_id.to_string(),
                stage: PipelineStage::Validate,
                row: issue.row,
                field: Some(issue.field.clone()),
                message: issue.message.clone(),
                severity: issue.severity,
            })?;
        }
        state.error_count = validated
            .errors
            .iter()
            .filter(|i| i.severity == IssueSeverity::Error)
            .count();
        state.valid_rows = validated.valid;
        Ok(())
    }

    fn stage_process(&self, file_id: &str, state: &mut RunState) -> Result<()> {
        let entity_type = state.entity_type.unwrap_or(EntityType::Unknown);
        let rows = std::mem::take(&mut state.valid_rows);
        let total = rows.len();
        let mut inserted = 0;
        for chunk in rows.chunks(PROCESS_BATCH_SIZE) {
            let batch: Vec<ProcessedRecord> = chunk
                .iter()
                .map(|row| ProcessedRecord {
                    file_upload_id: file_id.to_string(),
                    entity_type,
                    dashboards: state.dashboards.clone(),
                    data: row.clone(),
                })
                .collect();
            self.records.insert_processed(&batch)?;
            inserted += batch.len();
            debug!(inserted, total, "processed batch");
        }
        state.records_processed = inserted;
        Ok(())
    }

    fn stage_quality(&self, file_id: &str, state: &mut RunState) -> Result<()> {
        let processed = state.records_processed;
        let errors = state.error_count;
        let quality = if processed + errors == 0 {
            100.0
        } else {
            processed as f64 / (processed + errors) as f64 * 100.0
        };
        self.records.save_quality_metrics(QualityMetricsRecord {
            file_upload_id: file_id.to_string(),
            records_processed: processed,
            error_count: errors,
            quality_score: quality,
        })?;
        info!(quality, processed, errors, "quality computed");
        state.quality_score = Some(quality);
        Ok(())
    }

    fn stage_sync(
        &self,
        file_id: &str,
        state: &mut RunState,
        options: &PipelineOptions,
    ) -> Result<()> {
        for dashboard in &state.dashboards {
            if options.auto_sync {
                self.export_to_dashboard(*dashboard, state);
                self.records
                    .set_dashboard_sync(file_id, *dashboard, SyncStatus::Synced)?;
            } else {
                self.records
                    .set_dashboard_sync(file_id, *dashboard, SyncStatus::Pending)?;
            }
        }
        Ok(())
    }

    /// Per-dashboard export arm. All destinations currently receive the same
    /// standardized records; the arms exist so destination-specific shaping
    /// has a home.
    fn export_to_dashboard(&self, dashboard: Dashboard, state: &RunState) {
        match dashboard {
            Dashboard::Executive | Dashboard::Financial => {
                info!(%dashboard, records = state.records_processed, "synced summary records");
            }
            _ => {
                info!(%dashboard, records = state.records_processed, "synced records");
            }
        }
    }

    fn fail(&self, file_id: &str, stage: PipelineStage, message: &str) -> PipelineOutcome {
        warn!(file_id, %stage, message, "pipeline stage failed");
        if let Err(error) = self.records.record_error(ProcessingErrorRecord {
            file_upload_id: file_id.to_string(),
            stage,
            row: None,
            field: None,
            message: message.to_string(),
            severity: IssueSeverity::Critical,
        }) {
            warn!(%error, "could not record pipeline failure");
        }
        if let Err(error) = self.records.update_status(file_id, FileStatus::Failed) {
            warn!(%error, "could not mark file failed");
        }
        failed_outcome(file_id, vec![message.to_string()])
    }
}

fn failed_outcome(file_id: &str, errors: Vec<String>) -> PipelineOutcome {
    PipelineOutcome {
        success: false,
        file_id: file_id.to_string(),
        status: FileStatus::Failed,
        records_processed: None,
        errors,
        quality_score: None,
        dashboards: Vec::new(),
    }
}

fn missing_table() -> crate::error::PipelineError {
    crate::error::PipelineError::Parse("analyze stage did not run".to_string())
}

/// Renames row keys from source columns to target fields. Columns without a
/// suggestion are dropped from the standardized records.
fn apply_mappings(rows: &[Record], suggestions: &[MappingSuggestion]) -> Vec<Record> {
    rows.iter()
        .map(|row| {
            suggestions
                .iter()
                .filter_map(|s| {
                    row.get(&s.source_column)
                        .map(|value| (s.target_field.clone(), value.clone()))
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_renames_and_drops_columns() {
        let mut row = Record::new();
        row.insert("sku".to_string(), "A-1".to_string());
        row.insert("notes".to_string(), "ignore".to_string());
        let suggestions = vec![MappingSuggestion {
            source_column: "sku".to_string(),
            target_field: "sku_code".to_string(),
            target_domain: None,
            confidence: 0.98,
            reasoning: String::new(),
            alternatives: Vec::new(),
            model_used: tabmap_model::ModelTier::Cheap,
        }];
        let mapped = apply_mappings(&[row], &suggestions);
        assert_eq!(mapped[0].get("sku_code").map(String::as_str), Some("A-1"));
        assert!(!mapped[0].contains_key("notes"));
    }
}
