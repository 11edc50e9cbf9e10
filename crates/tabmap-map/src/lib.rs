//! Column mapping service.
//!
//! Maps source columns of tabular business files onto the standard field
//! catalog. The primary path asks a model tier for suggestions; every model
//! failure degrades to a deterministic alias/fuzzy matcher, so mapping never
//! returns an error to the pipeline. High-confidence confirmed mappings are
//! persisted to a learning store and fed back as few-shot context.

pub mod error;
pub mod fallback;
pub mod learning;
pub mod parse;
pub mod service;
pub mod transform;

pub use error::MapError;
pub use fallback::match_columns;
pub use learning::{LearnedMapping, LearningStore, SHARED_SCOPE};
pub use service::MappingService;
