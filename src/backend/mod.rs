//! Nearest-neighbour backends.
//!
//! - `pinecone`: hosted index queried over its REST data plane
//! - `local`: a JSON dataset searched in memory with cosine similarity

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::search::{RawMatch, RetrievalRequest};

mod local;
mod pinecone;

pub use local::{LocalBackend, LocalRecord};
pub use pinecone::PineconeBackend;

/// Answers a filtered top-k query with matches ordered by descending similarity.
///
/// Calls run on the caller's thread, so an implementation must bound its own
/// latency and report `BackendError::Timeout` when it gives up.
pub trait VectorBackend: Send + Sync {
    fn query(&self, request: &RetrievalRequest) -> Result<Vec<RawMatch>, BackendError>;

    /// Vector length the index stores, when known.
    fn dimensions(&self) -> Option<usize> {
        None
    }

    fn describe(&self) -> String;
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("backend misconfigured: {0}")]
    Config(String),

    #[error("io error: {0:?}")]
    IO(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Pinecone,
    Local,
}
