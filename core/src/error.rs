use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation failed, missing required fields: {}", .missing_required.join(", "))]
    ValidationFailed { missing_required: Vec<String> },

    #[error("render failed: {0}")]
    RenderFailed(String),

    #[error("concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;
