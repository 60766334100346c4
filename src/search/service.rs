//! One search action: validate, embed, query, normalize.
//!
//! The embedding model and the backend are injected at construction and
//! shared by reference across searches. Embedding runs on a worker thread so
//! the caller stops waiting once its timeout elapses; a timed out encode is
//! left to finish in the background, and at most [`MAX_PENDING_EMBEDDINGS`]
//! may be outstanding. Backends bound their own latency and run inline.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::errors::SearchError;
use super::planner::{QueryPlanner, RetrievalRequest};
use super::query::{
    DisplayRange, DisplayUnit, SearchQuery, Sector, MAX_RESULT_COUNT, MIN_RESULT_COUNT,
};
use super::result::{RawMatch, StockResult};
use crate::backend::VectorBackend;
use crate::embeddings::{Embedder, EmbeddingError};

const DEFAULT_RESULT_COUNT: usize = 10;

/// Embedding calls allowed to run at once, including ones whose caller timed out.
pub const MAX_PENDING_EMBEDDINGS: usize = 4;

/// Result of a search that reached the backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "results", rename_all = "snake_case")]
pub enum SearchOutcome {
    Matches(Vec<StockResult>),
    NoMatches,
}

impl SearchOutcome {
    pub fn results(&self) -> &[StockResult] {
        match self {
            SearchOutcome::Matches(results) => results,
            SearchOutcome::NoMatches => &[],
        }
    }

    pub fn into_results(self) -> Vec<StockResult> {
        match self {
            SearchOutcome::Matches(results) => results,
            SearchOutcome::NoMatches => vec![],
        }
    }
}

/// Slider bounds and choices the input layer should offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchLimits {
    pub market_cap: DisplayRange,
    pub market_cap_unit: DisplayUnit,
    pub volume: DisplayRange,
    pub volume_unit: DisplayUnit,
    pub max_result_count: usize,
    pub sectors: Vec<Sector>,
}

pub struct SearchService {
    planner: QueryPlanner,
    embedder: Arc<dyn Embedder>,
    backend: Arc<dyn VectorBackend>,
    timeout: Duration,
    default_result_count: usize,
    pending_embeddings: Arc<AtomicUsize>,
}

impl SearchService {
    pub fn new(
        planner: QueryPlanner,
        embedder: Arc<dyn Embedder>,
        backend: Arc<dyn VectorBackend>,
        timeout: Duration,
    ) -> Self {
        Self {
            planner,
            embedder,
            backend,
            timeout,
            default_result_count: DEFAULT_RESULT_COUNT,
            pending_embeddings: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Result count used when the caller does not ask for one.
    pub fn with_default_result_count(mut self, count: usize) -> Self {
        self.default_result_count = count.clamp(MIN_RESULT_COUNT, MAX_RESULT_COUNT);
        self
    }

    pub fn default_result_count(&self) -> usize {
        self.default_result_count
    }

    pub fn limits(&self) -> SearchLimits {
        let settings = self.planner.settings();
        SearchLimits {
            market_cap: DisplayRange::full(settings.market_cap_unit, settings.known_max_market_cap),
            market_cap_unit: settings.market_cap_unit,
            volume: DisplayRange::full(settings.volume_unit, settings.known_max_volume),
            volume_unit: settings.volume_unit,
            max_result_count: MAX_RESULT_COUNT,
            sectors: Sector::ALL.to_vec(),
        }
    }

    /// A query covering the full slider ranges, as the input layer starts out.
    pub fn default_query(&self, text: &str, result_count: usize) -> SearchQuery {
        let limits = self.limits();
        SearchQuery {
            text: text.to_string(),
            result_count,
            sector: None,
            market_cap: limits.market_cap,
            volume: limits.volume,
        }
    }

    /// Search with the configured timeout.
    pub fn search(&self, query: &SearchQuery) -> Result<SearchOutcome, SearchError> {
        self.search_with_timeout(query, self.timeout)
    }

    /// Search, giving the embedding call at most `timeout`.
    pub fn search_with_timeout(
        &self,
        query: &SearchQuery,
        timeout: Duration,
    ) -> Result<SearchOutcome, SearchError> {
        // reject bad input before spending an embedding on it
        self.planner.validate(query)?;

        let started = Instant::now();
        let embedding = self.embed(&query.text, timeout)?;
        log::debug!("embedded query with {} in {:?}", self.embedder.name(), started.elapsed());

        let request = self.planner.build_request(query, embedding)?;
        let raw_matches = self.retrieve(&request)?;
        log::info!(
            "search text={:?} top_k={} sector={:?} matches={} took={:?}",
            query.text,
            query.result_count,
            query.sector,
            raw_matches.len(),
            started.elapsed()
        );

        let results: Vec<StockResult> = self.planner.normalize_results(raw_matches).collect();
        if results.is_empty() {
            Ok(SearchOutcome::NoMatches)
        } else {
            Ok(SearchOutcome::Matches(results))
        }
    }

    fn embed(&self, text: &str, timeout: Duration) -> Result<Vec<f32>, SearchError> {
        let pending = PendingGuard::acquire(&self.pending_embeddings).ok_or_else(|| {
            log::warn!("{MAX_PENDING_EMBEDDINGS} embedding calls still running");
            SearchError::EmbeddingFailure(format!(
                "{MAX_PENDING_EMBEDDINGS} embedding calls are still running"
            ))
        })?;

        let embedder = self.embedder.clone();
        let text = text.to_string();
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let _pending = pending;
            // receiver may be gone after a timeout
            let _ = tx.send(embedder.encode(&text));
        });

        rx.recv_timeout(timeout)
            .unwrap_or(Err(EmbeddingError::Timeout(timeout)))
            .map_err(|err| {
                log::warn!("embedding failed: {err}");
                SearchError::from(err)
            })
    }

    fn retrieve(&self, request: &RetrievalRequest) -> Result<Vec<RawMatch>, SearchError> {
        self.backend.query(request).map_err(|err| {
            log::warn!("{} failed: {err}", self.backend.describe());
            SearchError::from(err)
        })
    }
}

/// Holds one slot of the pending embedding budget until dropped.
struct PendingGuard(Arc<AtomicUsize>);

impl PendingGuard {
    fn acquire(counter: &Arc<AtomicUsize>) -> Option<Self> {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < MAX_PENDING_EMBEDDINGS).then_some(n + 1)
            })
            .ok()
            .map(|_| Self(counter.clone()))
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
