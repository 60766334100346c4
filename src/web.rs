use crate::search::{
    DisplayRange, SearchError, SearchLimits, SearchOutcome, SearchQuery, SearchService, Sector,
    StockResult, ANY_SECTOR,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::signal;

#[derive(Clone)]
struct SharedState {
    service: Arc<SearchService>,
}

pub fn router(service: Arc<SearchService>) -> Router {
    let shared_state = Arc::new(SharedState { service });

    Router::new()
        .route("/api/stocks/search", post(search))
        .route("/api/sectors", get(sectors))
        .route("/api/limits", get(limits))
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(
                    tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO),
                )
                .on_response(
                    tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO),
                ),
        )
        .with_state(shared_state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            log::error!("failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                log::error!("failed to install signal handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::warn!("shutting down");
}

async fn start_app(service: Arc<SearchService>, addr: &str) -> anyhow::Result<()> {
    let app = router(service);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("listening on {addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

pub fn start_daemon(service: SearchService, addr: &str) -> anyhow::Result<()> {
    // the blocking http client inside must not be dropped on a runtime thread
    let service = Arc::new(service);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(start_app(service.clone(), addr));
    drop(runtime);

    result
}

#[derive(Debug)]
struct HttpError(SearchError);

impl IntoResponse for HttpError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self.0 {
            SearchError::InvalidQuery { .. } => axum::http::StatusCode::BAD_REQUEST,
            SearchError::InvalidEmbedding(_) => {
                log::error!("{self:?}");
                axum::http::StatusCode::INTERNAL_SERVER_ERROR
            }
            SearchError::EmbeddingFailure(_) | SearchError::BackendUnavailable(_) => {
                log::error!("{self:?}");
                axum::http::StatusCode::BAD_GATEWAY
            }
            SearchError::BackendTimeout(_) => {
                log::error!("{self:?}");
                axum::http::StatusCode::GATEWAY_TIMEOUT
            }
        };

        (
            status,
            Json(json!({
                "error": self.0.to_string(),
                "retryable": self.0.is_retryable(),
            })),
        )
            .into_response()
    }
}

impl<E> From<E> for HttpError
where
    E: Into<SearchError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchRequest {
    pub text: String,

    /// Number of results, defaults to the configured count
    pub result_count: Option<usize>,

    /// Sector name, or "Any Sector" / absent for no constraint
    pub sector: Option<String>,

    /// Market cap range in display units; the full range when absent
    pub market_cap: Option<DisplayRange>,

    /// Volume range in display units; the full range when absent
    pub volume: Option<DisplayRange>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub matched: bool,
    pub results: Vec<StockResult>,
}

impl SearchRequest {
    fn into_query(self, defaults: SearchQuery) -> Result<SearchQuery, SearchError> {
        let sector = match self.sector {
            Some(sector) => Sector::parse_selection(&sector)?,
            None => None,
        };

        Ok(SearchQuery {
            text: self.text,
            result_count: self.result_count.unwrap_or(defaults.result_count),
            sector,
            market_cap: self.market_cap.unwrap_or(defaults.market_cap),
            volume: self.volume.unwrap_or(defaults.volume),
        })
    }
}

async fn search(
    State(state): State<Arc<SharedState>>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, HttpError> {
    let Json(payload) =
        payload.map_err(|rejection| SearchError::invalid_query("body", rejection.body_text()))?;
    log::debug!("payload: {payload:?}");
    let service = state.service.clone();

    let defaults = service.default_query("", service.default_result_count());
    let query = payload.into_query(defaults)?;

    let outcome = tokio::task::spawn_blocking(move || service.search(&query))
        .await
        .map_err(|err| SearchError::BackendUnavailable(format!("search task failed: {err}")))??;

    Ok(Json(SearchResponse {
        matched: matches!(outcome, SearchOutcome::Matches(_)),
        results: outcome.into_results(),
    }))
}

async fn sectors() -> Json<Vec<&'static str>> {
    Json(
        std::iter::once(ANY_SECTOR)
            .chain(Sector::ALL.iter().map(Sector::as_str))
            .collect(),
    )
}

async fn limits(State(state): State<Arc<SharedState>>) -> Json<SearchLimits> {
    Json(state.service.limits())
}
