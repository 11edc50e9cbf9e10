use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MapError {
    #[error("learning store access failed at {path}: {source}")]
    LearningIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode learned mappings: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MapError>;
