//! Turns a [`SearchQuery`] into a backend request and backend matches into results.
//!
//! Both directions are pure: no I/O, no clock, no shared state. Anything that
//! talks to the embedding model or the vector index lives in
//! [`super::service`].

use serde::{Deserialize, Serialize};

use super::errors::SearchError;
use super::filter::{
    Clause, FilterPredicate, FIELD_MARKET_CAP, FIELD_SECTOR, FIELD_TICKER, FIELD_VOLUME,
    PLACEHOLDER,
};
use super::query::{DisplayUnit, SearchQuery, MAX_RESULT_COUNT, MIN_RESULT_COUNT};
use super::result::{RawMatch, StockResult};

/// Largest market cap in the dataset (AAPL).
pub const KNOWN_MAX_MARKET_CAP: f64 = 3_670_720_643_072.0;
/// Largest daily volume in the dataset (HMBL).
pub const KNOWN_MAX_VOLUME: f64 = 647_676_134.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerSettings {
    pub namespace: String,
    pub known_max_market_cap: f64,
    pub known_max_volume: f64,
    pub market_cap_unit: DisplayUnit,
    pub volume_unit: DisplayUnit,
    /// Embedding length the index was built with, when known.
    pub dimensions: Option<usize>,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            namespace: "stock-descriptions2".to_string(),
            known_max_market_cap: KNOWN_MAX_MARKET_CAP,
            known_max_volume: KNOWN_MAX_VOLUME,
            market_cap_unit: DisplayUnit::Billions,
            volume_unit: DisplayUnit::Millions,
            dimensions: None,
        }
    }
}

/// Everything a nearest-neighbour backend needs to answer one search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalRequest {
    pub namespace: String,
    pub vector: Vec<f32>,
    pub top_k: usize,
    pub filter: FilterPredicate,
    pub include_metadata: bool,
}

#[derive(Debug, Clone)]
pub struct QueryPlanner {
    settings: PlannerSettings,
}

impl QueryPlanner {
    pub fn new(settings: PlannerSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &PlannerSettings {
        &self.settings
    }

    /// Local checks on user input. Runs before any embedding is computed.
    pub fn validate(&self, query: &SearchQuery) -> Result<(), SearchError> {
        if query.text.trim().is_empty() {
            return Err(SearchError::invalid_query("text", "query text cannot be empty"));
        }

        if !(MIN_RESULT_COUNT..=MAX_RESULT_COUNT).contains(&query.result_count) {
            return Err(SearchError::invalid_query(
                "result_count",
                format!(
                    "must be between {MIN_RESULT_COUNT} and {MAX_RESULT_COUNT}, got {}",
                    query.result_count
                ),
            ));
        }

        query.market_cap.validate(
            "market_cap",
            self.settings.market_cap_unit,
            self.settings.known_max_market_cap,
        )?;
        query.volume.validate(
            "volume",
            self.settings.volume_unit,
            self.settings.known_max_volume,
        )?;

        Ok(())
    }

    /// Check the embedding is non-empty and, if the index dimensionality is known, matches it.
    pub fn validate_embedding(&self, embedding: &[f32]) -> Result<(), SearchError> {
        if embedding.is_empty() {
            return Err(SearchError::invalid_embedding("embedding is empty"));
        }

        if let Some(expected) = self.settings.dimensions {
            if embedding.len() != expected {
                return Err(SearchError::invalid_embedding(format!(
                    "expected {expected} dimensions, got {}",
                    embedding.len()
                )));
            }
        }

        Ok(())
    }

    /// Assemble the filter for `query`. The sector clause is left out entirely
    /// when no sector is selected.
    pub fn filter_for(&self, query: &SearchQuery) -> FilterPredicate {
        let market_cap = query.market_cap.to_canonical(self.settings.market_cap_unit);
        let volume = query.volume.to_canonical(self.settings.volume_unit);

        FilterPredicate::all_of([
            Some(Clause::range(FIELD_MARKET_CAP, market_cap)),
            Some(Clause::range(FIELD_VOLUME, volume)),
            Some(Clause::ne(FIELD_TICKER, PLACEHOLDER)),
            query.sector.map(|sector| Clause::eq(FIELD_SECTOR, sector.as_str())),
        ])
    }

    pub fn build_request(
        &self,
        query: &SearchQuery,
        embedding: Vec<f32>,
    ) -> Result<RetrievalRequest, SearchError> {
        self.validate(query)?;
        self.validate_embedding(&embedding)?;

        Ok(RetrievalRequest {
            namespace: self.settings.namespace.clone(),
            vector: embedding,
            top_k: query.result_count,
            filter: self.filter_for(query),
            include_metadata: true,
        })
    }

    /// Project backend matches into results, keeping the backend's order.
    ///
    /// The returned iterator is lazy and can be consumed once.
    pub fn normalize_results<I>(&self, raw_matches: I) -> impl Iterator<Item = StockResult>
    where
        I: IntoIterator<Item = RawMatch>,
    {
        raw_matches.into_iter().map(StockResult::from_match)
    }
}
