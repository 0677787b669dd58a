use shrink_core::StorageError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ShortenerError>;

#[derive(Debug, Clone, Error)]
pub enum ShortenerError {
    /// The URL violates one or more input constraints. Each entry is a
    /// human-readable reason.
    #[error("invalid url: {}", .0.join(", "))]
    Validation(Vec<String>),
    /// Every candidate code collided with an existing one.
    #[error("no free short code found after {attempts} attempts")]
    CapacityExhausted { attempts: u32 },
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ShortenerError {
    /// The validation reasons, if this is a validation failure.
    pub fn details(&self) -> &[String] {
        match self {
            ShortenerError::Validation(reasons) => reasons,
            _ => &[],
        }
    }
}
