use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use homedir::my_home;

use crate::{
    backend::{BackendKind, LocalBackend, PineconeBackend, VectorBackend},
    config::Config,
    embeddings::{Embedder, FastEmbedder},
    search::{QueryPlanner, SearchService},
};

/// Builds the long-lived clients once at startup and hands them to the search service.
pub struct AppFactory;

impl AppFactory {
    /// Resolve and create the base directory holding config.yaml, models and datasets.
    pub fn get_base_path() -> Result<PathBuf> {
        let base_path = match std::env::var("STOCKFINDER_BASE_PATH") {
            Ok(path) => PathBuf::from(path),
            Err(_) => {
                let home = my_home()
                    .map_err(|e| anyhow::anyhow!("Could not determine home directory: {e:?}"))?
                    .context("Home directory path is empty")?;
                home.join(".local/share/stockfinder")
            }
        };

        std::fs::create_dir_all(&base_path)
            .context("Failed to create application base directory")?;

        Ok(base_path)
    }

    pub fn load_config() -> Result<Config> {
        let base_path = Self::get_base_path()?;
        Config::load_with(&base_path)
    }

    pub fn create_search_service(config: &Config) -> Result<SearchService> {
        let embedder = Self::create_embedder(config)?;
        let backend = Self::create_backend(config)?;
        Ok(Self::build_search_service(config, embedder, backend))
    }

    /// Wire an embedder and a backend into a service. Query vectors are checked
    /// against the index dimension, falling back to the embedder's when the
    /// backend does not know it.
    pub fn build_search_service(
        config: &Config,
        embedder: Arc<dyn Embedder>,
        backend: Arc<dyn VectorBackend>,
    ) -> SearchService {
        let dimensions = match (backend.dimensions(), embedder.dimensions()) {
            (Some(index), Some(model)) if index != model => {
                log::warn!(
                    "{} produces {model} dimensions but {} stores {index}",
                    embedder.name(),
                    backend.describe()
                );
                Some(index)
            }
            (index, model) => index.or(model),
        };
        let planner = QueryPlanner::new(config.planner_settings(dimensions));

        log::info!(
            "search ready: model={} backend={}",
            embedder.name(),
            backend.describe()
        );

        SearchService::new(
            planner,
            embedder,
            backend,
            Duration::from_secs(config.backend.request_timeout_secs),
        )
        .with_default_result_count(config.search.default_result_count)
    }

    fn create_embedder(config: &Config) -> Result<Arc<dyn Embedder>> {
        let timeout = Duration::from_secs(config.embedding.download_timeout_secs);
        let embedder = FastEmbedder::new(
            &config.embedding.model,
            config.base_path().to_path_buf(),
            Some(timeout),
        )
        .context("Failed to load embedding model")?;

        Ok(Arc::new(embedder))
    }

    pub fn create_backend(config: &Config) -> Result<Arc<dyn VectorBackend>> {
        match config.backend.kind {
            BackendKind::Pinecone => {
                let api_key = std::env::var("PINECONE_API_KEY")
                    .context("PINECONE_API_KEY not set for the pinecone backend")?;
                let index_host = std::env::var("PINECONE_INDEX_HOST")
                    .ok()
                    .or_else(|| config.backend.index_host.clone());

                let backend = PineconeBackend::new(
                    &api_key,
                    &config.backend.index_name,
                    index_host.as_deref(),
                    Duration::from_secs(config.backend.request_timeout_secs),
                )?;
                Ok(Arc::new(backend))
            }
            BackendKind::Local => {
                let path = config.local_dataset_path();
                let backend = LocalBackend::load(&path)
                    .with_context(|| format!("Failed to load dataset {}", path.display()))?;
                Ok(Arc::new(backend))
            }
        }
    }
}
