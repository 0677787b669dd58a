use thiserror::Error;

/// Errors returned when configuring a generator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GeneratorError {
    #[error("invalid code length {length}; expected {min}..={max}")]
    InvalidLength { length: usize, min: usize, max: usize },
}
