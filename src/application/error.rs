use crate::infrastructure::error::InfraError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    /// Input rejected at the command boundary before it reached the store.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// The caller broke an integration contract, e.g. a poisoned store lock.
    #[error("Integration error: {0}")]
    Integration(String),
}
