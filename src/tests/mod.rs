//! Shared fixtures: a keyword embedder and a small in-memory stock dataset.


use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Map, Value};

use crate::backend::{BackendError, LocalBackend, LocalRecord, VectorBackend};
use crate::config::Config;
use crate::embeddings::{Embedder, EmbeddingError};
use crate::factory::AppFactory;
use crate::search::{PlannerSettings, QueryPlanner, RawMatch, RetrievalRequest, SearchService};

const KEYWORDS: [&str; 6] = ["crypto", "bitcoin", "bank", "software", "oil", "drug"];
const NAMESPACE: &str = "stock-descriptions2";

/// One dimension per keyword plus a constant so no text embeds to zero.
pub struct KeywordEmbedder {
    pub calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

impl Embedder for KeywordEmbedder {
    fn encode(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let text = text.to_lowercase();
        let mut vector: Vec<f32> = KEYWORDS
            .iter()
            .map(|kw| if text.contains(kw) { 1.0 } else { 0.0 })
            .collect();
        vector.push(0.1);
        Ok(vector)
    }

    fn dimensions(&self) -> Option<usize> {
        Some(KEYWORDS.len() + 1)
    }

    fn name(&self) -> &str {
        "keyword"
    }
}

fn record(id: &str, namespace: Option<&str>, values: [f32; 7], metadata: Value) -> LocalRecord {
    let metadata: Map<String, Value> = match metadata {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    LocalRecord {
        id: id.to_string(),
        namespace: namespace.map(str::to_string),
        values: values.to_vec(),
        metadata,
    }
}

#[allow(clippy::too_many_arguments)]
fn stock(
    ticker: &str,
    name: &str,
    sector: &str,
    summary: &str,
    market_cap: f64,
    volume: f64,
    values: [f32; 7],
) -> LocalRecord {
    record(
        ticker,
        Some(NAMESPACE),
        values,
        json!({
            "Ticker": ticker,
            "Name": name,
            "Sector": sector,
            "Business Summary": summary,
            "Earnings Growth": 0.12,
            "Revenue Growth": "0.05",
            "Gross Margins": 0.5,
            "EBITDA Margins": 0.2,
            "52 Week Change": -0.1,
            "Beta": 1.3,
            "Website": format!("https://www.{}.com", ticker.to_lowercase()),
            "Market Cap": market_cap,
            "Volume": volume,
        }),
    )
}

pub fn fixture_records() -> Vec<LocalRecord> {
    vec![
        stock(
            "COIN",
            "Coinbase Global, Inc.",
            "Financial Services",
            "Operates a platform for buying and selling crypto assets.",
            60e9,
            10e6,
            [1.0, 0.5, 0.0, 0.0, 0.0, 0.0, 0.1],
        ),
        stock(
            "MSTR",
            "MicroStrategy Incorporated",
            "Technology",
            "Business intelligence software; holds bitcoin as a treasury reserve.",
            30e9,
            15e6,
            [0.3, 1.0, 0.0, 1.0, 0.0, 0.0, 0.1],
        ),
        stock(
            "MARA",
            "Marathon Digital Holdings, Inc.",
            "Financial Services",
            "Mines bitcoin at scale.",
            5e9,
            40e6,
            [0.8, 1.0, 0.0, 0.0, 0.0, 0.0, 0.1],
        ),
        stock(
            "JPM",
            "JPMorgan Chase & Co.",
            "Financial Services",
            "Global bank.",
            600e9,
            9e6,
            [0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.1],
        ),
        stock(
            "MSFT",
            "Microsoft Corporation",
            "Technology",
            "Develops software and cloud services.",
            3_100e9,
            20e6,
            [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.1],
        ),
        stock(
            "XOM",
            "Exxon Mobil Corporation",
            "Energy",
            "Explores for and produces oil and gas.",
            450e9,
            15e6,
            [0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.1],
        ),
        stock(
            "PFE",
            "Pfizer Inc.",
            "Healthcare",
            "Discovers and sells drugs and vaccines.",
            160e9,
            30e6,
            [0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.1],
        ),
        // ticker only: every other field falls back to its default
        record(
            "BTCS",
            Some(NAMESPACE),
            [1.0, 0.2, 0.0, 0.0, 0.0, 0.0, 0.1],
            json!({"Ticker": "BTCS", "Market Cap": 5e7, "Volume": 2e5}),
        ),
        // placeholder ticker never shows up
        record(
            "placeholder",
            Some(NAMESPACE),
            [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.1],
            json!({"Ticker": "N/A", "Market Cap": 1e9, "Volume": 1e6}),
        ),
        // no market cap, so no range can match it
        record(
            "NOCAP",
            Some(NAMESPACE),
            [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.1],
            json!({"Ticker": "NOCAP", "Volume": 1e6}),
        ),
        record(
            "ELSEWHERE",
            Some("other-namespace"),
            [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.1],
            json!({"Ticker": "ELSEWHERE", "Market Cap": 1e9, "Volume": 1e6}),
        ),
    ]
}

/// Service over the fixture dataset with the default planner settings.
pub fn fixture_service_with(embedder: Arc<KeywordEmbedder>) -> SearchService {
    let backend = LocalBackend::new(fixture_records()).unwrap();
    let settings = PlannerSettings {
        dimensions: embedder.dimensions(),
        ..PlannerSettings::default()
    };

    SearchService::new(
        QueryPlanner::new(settings),
        embedder,
        Arc::new(backend),
        Duration::from_secs(5),
    )
}

pub fn fixture_service() -> SearchService {
    fixture_service_with(Arc::new(KeywordEmbedder::new()))
}

/// Embedder whose model always errors.
pub struct FailingEmbedder;

impl Embedder for FailingEmbedder {
    fn encode(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Err(EmbeddingError::EmbeddingFailed("model crashed".to_string()))
    }

    fn dimensions(&self) -> Option<usize> {
        None
    }

    fn name(&self) -> &str {
        "failing"
    }
}

pub enum Outage {
    Unavailable,
    TimedOut,
}

/// Backend that fails every query the same way.
pub struct DownBackend(pub Outage);

impl VectorBackend for DownBackend {
    fn query(&self, _request: &RetrievalRequest) -> Result<Vec<RawMatch>, BackendError> {
        match self.0 {
            Outage::Unavailable => Err(BackendError::Status {
                status: 503,
                body: "service unavailable".to_string(),
            }),
            Outage::TimedOut => Err(BackendError::Timeout(Duration::from_secs(30))),
        }
    }

    fn describe(&self) -> String {
        "down backend".to_string()
    }
}

/// Two-dimensional dataset, too small for [`KeywordEmbedder`] vectors.
pub fn narrow_backend() -> LocalBackend {
    LocalBackend::new(vec![LocalRecord {
        id: "COIN".to_string(),
        namespace: Some(NAMESPACE.to_string()),
        values: vec![1.0, 0.0],
        metadata: json!({"Ticker": "COIN", "Market Cap": 60e9, "Volume": 10e6})
            .as_object()
            .cloned()
            .unwrap(),
    }])
    .unwrap()
}

/// Service wired the way the application wires it, with default config.
pub fn wired_service(
    embedder: Arc<dyn Embedder>,
    backend: Arc<dyn VectorBackend>,
) -> SearchService {
    AppFactory::build_search_service(&Config::default(), embedder, backend)
}
