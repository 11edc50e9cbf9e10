//! Storage collaborator seams.
//!
//! The pipeline talks to two external stores: an object store holding raw
//! uploaded file bytes, and a record store holding everything else (file
//! upload state, suggestions, processing errors, processed records, quality
//! metrics, dashboard sync status, routing decisions). Both are traits so
//! tests and the CLI run against local implementations.

pub mod error;
pub mod object;
pub mod record;
pub mod records;

pub use error::StoreError;
pub use object::{LocalObjectStore, ObjectStore};
pub use record::{MemoryRecordStore, RecordStore};
pub use records::{
    DashboardSyncRecord, FileUploadRecord, ProcessedRecord, ProcessingErrorRecord,
    QualityMetricsRecord, RoutingLogEntry, StoredSuggestion, SyncStatus,
};
