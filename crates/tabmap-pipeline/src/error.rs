use thiserror::Error;

use tabmap_store::StoreError;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("could not parse tabular file: {0}")]
    Parse(String),
    #[error("file contains no data rows")]
    EmptyFile,
}

pub type Result<T> = std::result::Result<T, PipelineError>;
