use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    /// Rejected before any model call was attempted.
    #[error(
        "daily budget exceeded: spent {spent:.2} + estimated {estimated:.2} exceeds ceiling {ceiling:.2}"
    )]
    BudgetExceeded {
        spent: f64,
        estimated: f64,
        ceiling: f64,
    },
    #[error("model call failed after {attempts} attempt(s): {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
    #[error("model unavailable: {0}")]
    Unavailable(String),
    /// The caller required structured output and every extraction strategy failed.
    #[error("response was not parseable as JSON: {0}")]
    StrictParse(String),
    #[error("usage ledger: {0}")]
    Ledger(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LlmError>;
