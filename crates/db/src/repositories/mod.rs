use thiserror::Error;

use cotador_core::errors::StoreError;

pub mod memory;
pub mod proposal;
pub mod settings;

pub use memory::{InMemoryProposalRepository, InMemorySettingsRepository};
pub use proposal::SqlProposalRepository;
pub use settings::SqlSettingsRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("record already exists: {0}")]
    Conflict(String),
}

impl RepositoryError {
    pub(crate) fn decode(error: impl std::fmt::Display) -> Self {
        Self::Decode(error.to_string())
    }
}

impl From<RepositoryError> for StoreError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Database(error) => Self::Unavailable(error.to_string()),
            RepositoryError::Decode(message) => Self::Decode(message),
            RepositoryError::Conflict(message) => Self::Conflict(message),
        }
    }
}
