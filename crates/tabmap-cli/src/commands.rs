//! Command implementations.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, ensure};
use chrono::{Duration, NaiveDate, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;

use tabmap_llm::{
    ChatApiConfig, ChatApiModel, LanguageModel, TierClient, TierConfig, UnavailableModel,
    UsageLedger,
};
use tabmap_map::{LearningStore, MappingService};
use tabmap_model::{
    ComplexityScore, EntityType, FieldCatalog, PipelineOptions, PipelineOutcome, RoutingDecision,
    StandardField, Thresholds, UsageReport,
};
use tabmap_pipeline::{CsvParser, PipelineExecutor, TableParser};
use tabmap_router::{FileMappingRequest, IntelligentRouter};
use tabmap_store::{
    FileUploadRecord, LocalObjectStore, MemoryRecordStore, ObjectStore, ProcessingErrorRecord,
    RecordStore, RoutingLogEntry, StoredSuggestion,
};

use crate::cli::{FieldsArgs, RouteArgs, RunArgs, UsageArgs};

const API_KEY_ENV: &str = "TABMAP_API_KEY";
const API_BASE_ENV: &str = "TABMAP_API_BASE";
const CHEAP_MODEL_ENV: &str = "TABMAP_CHEAP_MODEL";
const DEEP_MODEL_ENV: &str = "TABMAP_DEEP_MODEL";
const DEFAULT_API_BASE: &str = "https://openrouter.ai/api/v1";
const DEFAULT_CHEAP_MODEL: &str = "openai/gpt-4o-mini";
const DEFAULT_DEEP_MODEL: &str = "openai/gpt-4o";
const LEDGER_FILE: &str = "usage.jsonl";

/// Everything the summary printer needs about one ingested file.
pub struct FileReport {
    pub file: PathBuf,
    pub outcome: PipelineOutcome,
    pub entity_type: Option<EntityType>,
    pub suggestions: Vec<StoredSuggestion>,
    pub issues: Vec<ProcessingErrorRecord>,
    pub routing: Option<RoutingLogEntry>,
}

/// Complexity report plus tier decision for one file, without execution.
pub struct RouteReport {
    pub file: PathBuf,
    pub columns: usize,
    pub rows: usize,
    pub complexity: ComplexityScore,
    pub decision: RoutingDecision,
}

/// Drives the full pipeline over every file in the run arguments.
pub fn run_files(args: &RunArgs) -> Result<Vec<FileReport>> {
    let thresholds = Thresholds::default();
    let objects = Arc::new(
        LocalObjectStore::new(args.data_dir.join("objects"))
            .context("could not open the object store")?,
    );
    let records = Arc::new(MemoryRecordStore::new());
    let executor = build_executor(
        args,
        &thresholds,
        Arc::clone(&objects) as Arc<dyn ObjectStore>,
        Arc::clone(&records) as Arc<dyn RecordStore>,
    )?;

    let options = PipelineOptions {
        auto_map: !args.no_auto_map,
        auto_validate: !args.no_validate,
        auto_sync: !args.no_auto_sync,
        require_user_confirmation: args.require_confirmation,
        quality_threshold: args.quality_threshold,
    };

    let progress = (args.files.len() > 1).then(|| {
        let bar = ProgressBar::new(args.files.len() as u64);
        bar.set_style(
            ProgressStyle::with_template("[{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar
    });

    let mut reports = Vec::with_capacity(args.files.len());
    for (index, path) in args.files.iter().enumerate() {
        if let Some(bar) = &progress {
            bar.set_message(path.display().to_string());
        }
        let file_id = register_file(&objects, &records, &args.company, path, index)?;
        let outcome = executor.execute_pipeline(&file_id, &options);
        reports.push(collect_report(&records, path, &file_id, outcome)?);
        if let Some(bar) = &progress {
            bar.inc(1);
        }
    }
    if let Some(bar) = &progress {
        bar.finish_and_clear();
    }
    Ok(reports)
}

/// Parses a file and reports its complexity and tier decision.
pub fn run_route(args: &RouteArgs) -> Result<RouteReport> {
    let thresholds = Thresholds::default();
    let bytes =
        fs::read(&args.file).with_context(|| format!("could not read {}", args.file.display()))?;
    let table = CsvParser
        .parse(&bytes)
        .with_context(|| format!("could not parse {}", args.file.display()))?;

    // Offline clients: the decision only needs the ledger and tier rates.
    let ledger = UsageLedger::new(args.data_dir.join(LEDGER_FILE));
    let offline: Arc<dyn LanguageModel> = Arc::new(UnavailableModel::default());
    let cheap = TierClient::new(
        Arc::clone(&offline),
        TierConfig::cheap(&thresholds),
        ledger.clone(),
    );
    let deep = TierClient::new(offline, TierConfig::deep(&thresholds), ledger);
    let service = MappingService::new(
        FieldCatalog::builtin(),
        LearningStore::new(args.data_dir.join("learned"))
            .context("could not open the learning store")?,
        thresholds.clone(),
    );
    let records: Arc<dyn RecordStore> = Arc::new(MemoryRecordStore::new());
    let router = IntelligentRouter::new(cheap, deep, service, records, thresholds.clone());

    let complexity = tabmap_complexity::analyze(&table.columns, &thresholds);
    let request = FileMappingRequest {
        file_upload_id: "adhoc".to_string(),
        company_id: "default".to_string(),
        entity_type: EntityType::Unknown,
        columns: table.columns.clone(),
        force_deep: args.force_deep,
    };
    let decision = router.should_use_deep_tier(&request, args.force_deep);
    Ok(RouteReport {
        file: args.file.clone(),
        columns: table.columns.len(),
        rows: table.rows.len(),
        complexity,
        decision,
    })
}

/// Aggregates the usage ledger over the requested date range.
pub fn run_usage(args: &UsageArgs) -> Result<(NaiveDate, NaiveDate, UsageReport)> {
    let end = args.end.unwrap_or_else(|| Utc::now().date_naive());
    let start = args.start.unwrap_or(end - Duration::days(30));
    ensure!(start <= end, "start date {start} is after end date {end}");
    let ledger = UsageLedger::new(args.data_dir.join(LEDGER_FILE));
    let report = ledger
        .report(start, end)
        .context("could not read the usage ledger")?;
    Ok((start, end, report))
}

/// Lists the standard field catalog, optionally restricted to one domain.
pub fn run_fields(args: &FieldsArgs) -> Vec<StandardField> {
    let catalog = FieldCatalog::builtin();
    match args.domain {
        Some(domain) => catalog
            .fields_for_domain(domain.into())
            .into_iter()
            .cloned()
            .collect(),
        None => catalog.fields,
    }
}

fn build_executor(
    args: &RunArgs,
    thresholds: &Thresholds,
    objects: Arc<dyn ObjectStore>,
    records: Arc<dyn RecordStore>,
) -> Result<PipelineExecutor> {
    let ledger = UsageLedger::new(args.data_dir.join(LEDGER_FILE));
    let (cheap_model, deep_model) = build_models(args.offline)?;
    let cheap = TierClient::new(
        Arc::clone(&cheap_model),
        TierConfig::cheap(thresholds),
        ledger.clone(),
    );
    let assistant = TierClient::new(cheap_model, TierConfig::cheap(thresholds), ledger.clone());
    let deep = TierClient::new(deep_model, TierConfig::deep(thresholds), ledger);
    let service = MappingService::new(
        FieldCatalog::builtin(),
        LearningStore::new(args.data_dir.join("learned"))
            .context("could not open the learning store")?,
        thresholds.clone(),
    );
    let router = IntelligentRouter::new(
        cheap,
        deep,
        service,
        Arc::clone(&records),
        thresholds.clone(),
    );
    Ok(PipelineExecutor::new(
        objects,
        records,
        router,
        assistant,
        Box::new(CsvParser),
        thresholds.clone(),
    ))
}

/// Picks the model adapters for the run: API-backed when a key is configured,
/// always-unavailable otherwise so mapping degrades to the deterministic path.
fn build_models(offline: bool) -> Result<(Arc<dyn LanguageModel>, Arc<dyn LanguageModel>)> {
    if offline {
        return Ok((
            Arc::new(UnavailableModel::default()),
            Arc::new(UnavailableModel::default()),
        ));
    }
    let Ok(api_key) = std::env::var(API_KEY_ENV) else {
        warn!("{API_KEY_ENV} not set; running offline with the deterministic mapper");
        return Ok((
            Arc::new(UnavailableModel::default()),
            Arc::new(UnavailableModel::default()),
        ));
    };
    let base_url = std::env::var(API_BASE_ENV).unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
    let cheap_name =
        std::env::var(CHEAP_MODEL_ENV).unwrap_or_else(|_| DEFAULT_CHEAP_MODEL.to_string());
    let deep_name =
        std::env::var(DEEP_MODEL_ENV).unwrap_or_else(|_| DEFAULT_DEEP_MODEL.to_string());
    let cheap = ChatApiModel::new(ChatApiConfig::new(&base_url, &api_key, cheap_name))
        .context("could not build the cheap-tier API client")?;
    let deep = ChatApiModel::new(ChatApiConfig::new(&base_url, &api_key, deep_name))
        .context("could not build the deep-tier API client")?;
    Ok((Arc::new(cheap), Arc::new(deep)))
}

fn register_file(
    objects: &LocalObjectStore,
    records: &MemoryRecordStore,
    company: &str,
    path: &Path,
    index: usize,
) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("could not read {}", path.display()))?;
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("upload");
    let file_id = format!("{stem}-{}", index + 1);
    let object_key = format!("{file_id}.csv");
    objects
        .put(&object_key, &bytes)
        .with_context(|| format!("could not store {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("upload.csv");
    records.create_file_upload(FileUploadRecord::new(&file_id, company, file_name, object_key))?;
    Ok(file_id)
}

fn collect_report(
    records: &MemoryRecordStore,
    path: &Path,
    file_id: &str,
    outcome: PipelineOutcome,
) -> Result<FileReport> {
    let upload = records.file_upload(file_id)?;
    Ok(FileReport {
        file: path.to_path_buf(),
        entity_type: upload.entity_type,
        suggestions: records.suggestions(file_id)?,
        issues: records.errors(file_id)?,
        routing: records.routing_log(file_id)?.into_iter().next(),
        outcome,
    })
}
