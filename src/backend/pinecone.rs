use std::sync::OnceLock;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{BackendError, VectorBackend};
use crate::search::{RawMatch, RetrievalRequest};

const CONTROL_PLANE_URL: &str = "https://api.pinecone.io";
const API_VERSION: &str = "2024-07";

/// Client for a hosted Pinecone index.
///
/// The index host is either configured or looked up once through the
/// control plane, together with the index dimension.
pub struct PineconeBackend {
    client: reqwest::blocking::Client,
    api_key: String,
    index_name: String,
    index_host: Option<String>,
    described: OnceLock<DescribeIndexResponse>,
    timeout: Duration,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<RawMatch>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
struct DescribeIndexResponse {
    host: String,
    #[serde(default)]
    dimension: Option<usize>,
}

impl PineconeBackend {
    pub fn new(
        api_key: &str,
        index_name: &str,
        index_host: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        if api_key.trim().is_empty() {
            return Err(BackendError::Config("PINECONE_API_KEY is not set".to_string()));
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Config(e.to_string()))?;

        Ok(Self {
            client,
            api_key: api_key.trim().to_string(),
            index_name: index_name.to_string(),
            index_host: index_host
                .filter(|h| !h.trim().is_empty())
                .map(normalize_host),
            described: OnceLock::new(),
            timeout,
        })
    }

    fn host(&self) -> Result<&str, BackendError> {
        match &self.index_host {
            Some(host) => Ok(host.as_str()),
            None => Ok(self.describe_index()?.host.as_str()),
        }
    }

    fn describe_index(&self) -> Result<&DescribeIndexResponse, BackendError> {
        if let Some(described) = self.described.get() {
            return Ok(described);
        }

        let url = format!("{CONTROL_PLANE_URL}/indexes/{}", self.index_name);
        log::info!("resolving index host: {url}");
        let resp = self
            .client
            .get(&url)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .send()
            .map_err(|e| self.map_reqwest(e))?;

        let described: DescribeIndexResponse = self.handle_response(resp)?;
        log::debug!(
            "index '{}' lives at {} with dimension {:?}",
            self.index_name,
            described.host,
            described.dimension
        );

        Ok(self.described.get_or_init(|| DescribeIndexResponse {
            host: normalize_host(&described.host),
            dimension: described.dimension,
        }))
    }

    fn handle_response<T>(&self, response: reqwest::blocking::Response) -> Result<T, BackendError>
    where
        T: serde::de::DeserializeOwned,
    {
        let status = response.status();
        let text = response.text().map_err(|e| self.map_reqwest(e))?;

        if !status.is_success() {
            log::warn!("pinecone error: status={status} body={text}");
            return Err(BackendError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str::<T>(&text).map_err(|err| {
            log::error!("{err}. tried to parse: {text:?}");
            BackendError::Decode(err.to_string())
        })
    }

    fn map_reqwest(&self, err: reqwest::Error) -> BackendError {
        if err.is_timeout() {
            BackendError::Timeout(self.timeout)
        } else {
            BackendError::Connection(err.to_string())
        }
    }
}

/// Body of a data plane `/query` call.
pub(crate) fn query_body(request: &RetrievalRequest) -> serde_json::Value {
    json!({
        "namespace": request.namespace,
        "vector": request.vector,
        "topK": request.top_k,
        "filter": request.filter.to_json(),
        "includeMetadata": request.include_metadata,
    })
}

fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}

impl VectorBackend for PineconeBackend {
    fn query(&self, request: &RetrievalRequest) -> Result<Vec<RawMatch>, BackendError> {
        let url = format!("{}/query", self.host()?);
        log::debug!("query {url} top_k={} namespace={}", request.top_k, request.namespace);

        let resp = self
            .client
            .post(&url)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .json(&query_body(request))
            .send()
            .map_err(|e| self.map_reqwest(e))?;

        let response: QueryResponse = self.handle_response(resp)?;
        Ok(response.matches)
    }

    /// Known only when the index is looked up through the control plane.
    fn dimensions(&self) -> Option<usize> {
        if self.index_host.is_some() {
            return None;
        }

        match self.describe_index() {
            Ok(described) => described.dimension,
            Err(err) => {
                log::warn!("could not describe index '{}': {err}", self.index_name);
                None
            }
        }
    }

    fn describe(&self) -> String {
        format!("pinecone index '{}'", self.index_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{PlannerSettings, QueryPlanner};
    use crate::search::{DisplayRange, SearchQuery, Sector};

    #[test]
    fn test_query_body_shape() {
        let planner = QueryPlanner::new(PlannerSettings::default());
        let query = SearchQuery {
            text: "chip makers".to_string(),
            result_count: 5,
            sector: Some(Sector::Technology),
            market_cap: DisplayRange::new(1.0, 2.0),
            volume: DisplayRange::new(0.0, 1.0),
        };
        let request = planner.build_request(&query, vec![0.25, 0.5]).unwrap();
        let body = query_body(&request);

        assert_eq!(body["namespace"], "stock-descriptions2");
        assert_eq!(body["topK"], 5);
        assert_eq!(body["includeMetadata"], true);
        assert_eq!(body["vector"], json!([0.25, 0.5]));
        assert_eq!(body["filter"]["Sector"], json!({ "$eq": "Technology" }));
        assert_eq!(body["filter"]["Market Cap"], json!({ "$gte": 1e9, "$lte": 2e9 }));
    }

    #[test]
    fn test_query_response_decoding() {
        let text = r#"{
            "matches": [
                {"id": "COIN", "score": 0.82, "metadata": {"Ticker": "COIN", "Beta": 3.1}},
                {"id": "MSTR", "score": 0.79}
            ],
            "namespace": "stock-descriptions2",
            "usage": {"readUnits": 6}
        }"#;
        let response: QueryResponse = serde_json::from_str(text).unwrap();
        assert_eq!(response.matches.len(), 2);
        assert_eq!(response.matches[0].id, "COIN");
        assert!(response.matches[1].metadata.is_empty());

        let empty: QueryResponse = serde_json::from_str(r#"{"namespace": "x"}"#).unwrap();
        assert!(empty.matches.is_empty());
    }

    #[test]
    fn test_describe_index_decoding() {
        let text = r#"{
            "name": "stocks",
            "dimension": 768,
            "metric": "cosine",
            "host": "stocks-abc.svc.pinecone.io",
            "status": {"ready": true}
        }"#;
        let described: DescribeIndexResponse = serde_json::from_str(text).unwrap();
        assert_eq!(described.dimension, Some(768));
        assert_eq!(described.host, "stocks-abc.svc.pinecone.io");
    }

    #[test]
    fn test_configured_host_has_unknown_dimensions() {
        let backend = PineconeBackend::new(
            "key",
            "stocks",
            Some("stocks-abc.svc.pinecone.io/"),
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(backend.host().unwrap(), "https://stocks-abc.svc.pinecone.io");
        assert_eq!(backend.dimensions(), None);
    }

    #[test]
    fn test_normalize_host() {
        assert_eq!(normalize_host("stocks-abc.svc.pinecone.io"), "https://stocks-abc.svc.pinecone.io");
        assert_eq!(normalize_host("http://localhost:5080/"), "http://localhost:5080");
    }

    #[test]
    fn test_missing_api_key() {
        let result = PineconeBackend::new(" ", "stocks", None, Duration::from_secs(1));
        assert!(matches!(result, Err(BackendError::Config(_))));
    }

    #[test]
    fn test_unreachable_host_is_connection_error() {
        // nothing listens on port 9 of localhost
        let backend = PineconeBackend::new(
            "key",
            "stocks",
            Some("http://127.0.0.1:9"),
            Duration::from_secs(2),
        )
        .unwrap();
        let planner = QueryPlanner::new(PlannerSettings::default());
        let query = SearchQuery {
            text: "anything".to_string(),
            result_count: 1,
            sector: None,
            market_cap: DisplayRange::new(0.0, 1.0),
            volume: DisplayRange::new(0.0, 1.0),
        };
        let request = planner.build_request(&query, vec![1.0]).unwrap();

        let err = backend.query(&request).unwrap_err();
        assert!(matches!(err, BackendError::Connection(_) | BackendError::Timeout(_)));
    }
}
