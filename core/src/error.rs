use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Company record at position {index} is missing its identifier")]
    MissingCompanyId { index: usize },

    #[error("Owner roster is empty: cannot assign deal owners")]
    EmptyOwnerRoster,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type SimResult<T> = Result<T, SimError>;
