use thiserror::Error;

#[derive(Error, Debug)]
pub enum TiergateError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    #[error("Metadata fetch error: {0}")]
    MetadataFetch(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TiergateError {
    pub fn status_code(&self) -> u16 {
        match self {
            TiergateError::NotFound(_) => 404,
            TiergateError::InvalidInput(_) => 400,
            TiergateError::Database(_) | TiergateError::Internal(_) => 500,
            TiergateError::Rpc(_) | TiergateError::MetadataFetch(_) => 502,
            TiergateError::MalformedEvent(_) => 500,
            TiergateError::Config(_) => 500,
        }
    }

    /// Fatal errors stop the indexing run instead of being retried.
    /// A malformed payload will stay malformed on replay.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TiergateError::MalformedEvent(_) | TiergateError::Config(_))
    }
}

impl From<serde_json::Error> for TiergateError {
    fn from(err: serde_json::Error) -> Self {
        TiergateError::Internal(err.to_string())
    }
}
