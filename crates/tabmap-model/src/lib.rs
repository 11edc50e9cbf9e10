pub mod catalog;
pub mod column;
pub mod complexity;
pub mod config;
pub mod entity;
pub mod mapping;
pub mod pipeline;
pub mod routing;
pub mod tier;
pub mod usage;
pub mod validation;

pub use catalog::{FieldCatalog, FieldDomain, StandardField};
pub use column::{ColumnProfile, DeclaredType, Record};
pub use complexity::{AmbiguityLevel, ComplexityScore};
pub use config::Thresholds;
pub use entity::{Dashboard, EntityDetection, EntityType};
pub use mapping::{AlternativeSuggestion, MappingResult, MappingSuggestion};
pub use pipeline::{FileStatus, PipelineOptions, PipelineOutcome, PipelineStage};
pub use routing::RoutingDecision;
pub use tier::ModelTier;
pub use usage::{DailyUsage, UsageRecord, UsageReport};
pub use validation::{IssueSeverity, TransformOp, TransformRule, ValidatedData, ValidationIssue};
