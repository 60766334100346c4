//! In-memory backend over a JSON dataset with cosine similarity search.
//!
//! The dataset is an array of `{id, namespace?, values, metadata}` records,
//! the same shape a hosted index export produces.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{BackendError, VectorBackend};
use crate::search::{RawMatch, RetrievalRequest};

/// One stored vector with its metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalRecord {
    pub id: String,
    /// Records without a namespace belong to every namespace.
    #[serde(default)]
    pub namespace: Option<String>,
    pub values: Vec<f32>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

pub struct LocalBackend {
    records: Vec<LocalRecord>,
    dimensions: usize,
}

impl LocalBackend {
    /// Build from records. All vectors must share one dimensionality and be non-zero.
    pub fn new(records: Vec<LocalRecord>) -> Result<Self, BackendError> {
        let dimensions = records.first().map(|r| r.values.len()).unwrap_or(0);

        for record in &records {
            if record.values.len() != dimensions {
                return Err(BackendError::Config(format!(
                    "record '{}' has {} dimensions, expected {dimensions}",
                    record.id,
                    record.values.len()
                )));
            }
            if l2_norm(&record.values) < f32::EPSILON {
                return Err(BackendError::Config(format!(
                    "record '{}' has a zero-norm vector",
                    record.id
                )));
            }
        }

        Ok(Self {
            records,
            dimensions,
        })
    }

    pub fn load(path: &Path) -> Result<Self, BackendError> {
        let text = std::fs::read_to_string(path)?;
        let records: Vec<LocalRecord> = serde_json::from_str(&text)
            .map_err(|e| BackendError::Decode(format!("{}: {e}", path.display())))?;

        log::info!("Loaded {} vectors from {}", records.len(), path.display());
        Self::new(records)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl VectorBackend for LocalBackend {
    /// Filter by namespace and predicate, score by cosine similarity, keep the best `top_k`.
    fn query(&self, request: &RetrievalRequest) -> Result<Vec<RawMatch>, BackendError> {
        if self.records.is_empty() {
            return Ok(vec![]);
        }

        if request.vector.len() != self.dimensions {
            return Err(BackendError::Status {
                status: 400,
                body: format!(
                    "query vector has {} dimensions, index has {}",
                    request.vector.len(),
                    self.dimensions
                ),
            });
        }

        let query_norm = l2_norm(&request.vector);
        if query_norm < f32::EPSILON {
            return Err(BackendError::Status {
                status: 400,
                body: "cannot search with a zero-norm vector".to_string(),
            });
        }

        let mut results: Vec<RawMatch> = self
            .records
            .iter()
            .filter(|record| {
                record
                    .namespace
                    .as_deref()
                    .map(|ns| ns == request.namespace)
                    .unwrap_or(true)
            })
            .filter(|record| request.filter.matches(&record.metadata))
            .map(|record| RawMatch {
                id: record.id.clone(),
                score: cosine_similarity(&request.vector, &record.values, query_norm),
                metadata: if request.include_metadata {
                    record.metadata.clone()
                } else {
                    Map::new()
                },
            })
            .collect();

        // Sort by score descending
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(request.top_k);

        Ok(results)
    }

    fn dimensions(&self) -> Option<usize> {
        (!self.records.is_empty()).then_some(self.dimensions)
    }

    fn describe(&self) -> String {
        format!("local dataset ({} vectors)", self.records.len())
    }
}

/// Compute L2 norm of a vector.
fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Cosine similarity with the query norm precomputed.
fn cosine_similarity(query: &[f32], target: &[f32], query_norm: f32) -> f32 {
    let target_norm = l2_norm(target);
    if target_norm < f32::EPSILON {
        return 0.0;
    }

    let dot_product: f32 = query.iter().zip(target.iter()).map(|(a, b)| a * b).sum();
    dot_product / (query_norm * target_norm)
}
