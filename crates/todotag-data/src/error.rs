use thiserror::Error;
use todotag_types::models::ModelKind;

/// Any rejection from the data service: validation, authorization, or storage.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("{model} not found: {id}")]
    NotFound { model: ModelKind, id: String },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

impl ServiceError {
    pub fn not_found(model: ModelKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            model,
            id: id.into(),
        }
    }
}

impl From<anyhow::Error> for ServiceError {
    fn from(err: anyhow::Error) -> Self {
        Self::Backend(err.to_string())
    }
}
