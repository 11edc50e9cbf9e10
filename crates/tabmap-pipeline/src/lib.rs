//! The ingestion pipeline.
//!
//! Drives an uploaded file through seven fixed-order stages - fetch, analyze,
//! map, validate, process, quality, sync - persisting stage and progress
//! after each one so an interrupted run is inspectable. A low-confidence
//! mapping can halt the run for human review; any stage error fails the file
//! with a critical processing-error record and no automatic retry.

pub mod error;
pub mod executor;
pub mod parser;

pub use error::PipelineError;
pub use executor::PipelineExecutor;
pub use parser::{CsvParser, ParsedTable, TableParser};
