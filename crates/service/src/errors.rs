use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("storage error: {0}")]
    Storage(String),
    /// Persisted content exists but is not a valid document.
    #[error("storage corrupt: {0}")]
    Corrupt(String),
}

impl ServiceError {
    pub fn not_found(entity: &str) -> Self { Self::NotFound(format!("{} not found", entity)) }

    pub fn missing_field(field: &str) -> Self { Self::Validation(format!("missing required field: {}", field)) }
}

impl From<std::io::Error> for ServiceError {
    fn from(e: std::io::Error) -> Self { Self::Storage(e.to_string()) }
}
