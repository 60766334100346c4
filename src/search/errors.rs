use std::time::Duration;

use thiserror::Error;

use crate::backend::BackendError;
use crate::embeddings::EmbeddingError;

/// Everything that can go wrong while answering a search.
///
/// An empty result set is not an error; see [`super::SearchOutcome`].
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Invalid query: {field}: {message}")]
    InvalidQuery { field: String, message: String },

    #[error("Invalid embedding: {0}")]
    InvalidEmbedding(String),

    #[error("Embedding failed: {0}")]
    EmbeddingFailure(String),

    #[error("Search backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Search backend timed out after {0:?}")]
    BackendTimeout(Duration),
}

impl SearchError {
    /// Create an invalid query error
    pub fn invalid_query(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidQuery {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an invalid embedding error
    pub fn invalid_embedding(message: impl Into<String>) -> Self {
        Self::InvalidEmbedding(message.into())
    }

    /// External service failures may succeed when the caller tries again.
    /// Input and contract errors never will.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::EmbeddingFailure(_) | Self::BackendUnavailable(_) | Self::BackendTimeout(_)
        )
    }
}

impl From<EmbeddingError> for SearchError {
    fn from(err: EmbeddingError) -> Self {
        Self::EmbeddingFailure(err.to_string())
    }
}

impl From<BackendError> for SearchError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Timeout(after) => Self::BackendTimeout(after),
            other => Self::BackendUnavailable(other.to_string()),
        }
    }
}
