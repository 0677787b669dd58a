use thiserror::Error;

/// Failures while starting a disposable container or talking to it.
#[derive(Debug, Error)]
pub enum TestInfraError {
    #[error("failed to start test container: {0}")]
    Container(#[from] testcontainers::TestcontainersError),
    #[error("test redis rejected a command: {0}")]
    Redis(#[from] redis::RedisError),
}

pub type Result<T, E = TestInfraError> = std::result::Result<T, E>;
