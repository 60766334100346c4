use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use crate::backend::BackendKind;
use crate::search::{DisplayUnit, PlannerSettings, MAX_RESULT_COUNT};

const CONFIG_FILE: &str = "config.yaml";

/// Default embedding model (the one the hosted index was built with)
const DEFAULT_EMBEDDING_MODEL: &str = "all-mpnet-base-v2";
/// Default model download timeout in seconds
const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 300;
/// Default per-call timeout for embedding and backend queries
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_INDEX_NAME: &str = "stocks";
const DEFAULT_RESULT_COUNT: usize = 10;

/// Where vectors are searched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub kind: BackendKind,

    /// Hosted index name, used to look up its host
    #[serde(default = "default_index_name")]
    pub index_name: String,

    /// Hosted index host; skips the control plane lookup when set
    #[serde(default)]
    pub index_host: Option<String>,

    /// Partition of the index holding the stock descriptions
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// JSON dataset for the local backend, relative to the base path
    #[serde(default = "default_local_dataset")]
    pub local_dataset: String,

    /// Timeout for each embedding and backend call, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::default(),
            index_name: default_index_name(),
            index_host: None,
            namespace: default_namespace(),
            local_dataset: default_local_dataset(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Model name for embeddings (e.g., "all-mpnet-base-v2")
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Timeout for model download in seconds
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            download_timeout_secs: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
        }
    }
}

/// Bounds and units for the input sliders.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_result_count")]
    pub default_result_count: usize,

    /// Largest market cap in the dataset, in USD
    #[serde(default = "default_known_max_market_cap")]
    pub known_max_market_cap: f64,

    /// Largest volume in the dataset, in shares
    #[serde(default = "default_known_max_volume")]
    pub known_max_volume: f64,

    #[serde(default = "default_market_cap_unit")]
    pub market_cap_unit: DisplayUnit,

    #[serde(default = "default_volume_unit")]
    pub volume_unit: DisplayUnit,
}

impl Default for SearchConfig {
    fn default() -> Self {
        let planner = PlannerSettings::default();
        Self {
            default_result_count: DEFAULT_RESULT_COUNT,
            known_max_market_cap: planner.known_max_market_cap,
            known_max_volume: planner.known_max_volume,
            market_cap_unit: planner.market_cap_unit,
            volume_unit: planner.volume_unit,
        }
    }
}

fn default_index_name() -> String {
    DEFAULT_INDEX_NAME.to_string()
}

fn default_namespace() -> String {
    PlannerSettings::default().namespace
}

fn default_local_dataset() -> String {
    "stocks.json".to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_download_timeout_secs() -> u64 {
    DEFAULT_DOWNLOAD_TIMEOUT_SECS
}

fn default_result_count() -> usize {
    DEFAULT_RESULT_COUNT
}

fn default_known_max_market_cap() -> f64 {
    SearchConfig::default().known_max_market_cap
}

fn default_known_max_volume() -> f64 {
    SearchConfig::default().known_max_volume
}

fn default_market_cap_unit() -> DisplayUnit {
    SearchConfig::default().market_cap_unit
}

fn default_volume_unit() -> DisplayUnit {
    SearchConfig::default().volume_unit
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub search: SearchConfig,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: PathBuf,
}

impl Config {
    fn validate(&self) -> anyhow::Result<()> {
        let search = &self.search;
        if !(1..=MAX_RESULT_COUNT).contains(&search.default_result_count) {
            bail!(
                "search.default_result_count must be between 1 and {MAX_RESULT_COUNT}, got {}",
                search.default_result_count
            );
        }

        for (name, value) in [
            ("search.known_max_market_cap", search.known_max_market_cap),
            ("search.known_max_volume", search.known_max_volume),
        ] {
            if !value.is_finite() || value <= 0.0 {
                bail!("{name} must be a positive number, got {value}");
            }
        }

        if self.backend.namespace.trim().is_empty() {
            bail!("backend.namespace cannot be empty");
        }

        if self.backend.request_timeout_secs == 0 {
            bail!("backend.request_timeout_secs must be greater than 0");
        }

        if self.embedding.download_timeout_secs == 0 {
            bail!("embedding.download_timeout_secs must be greater than 0");
        }

        Ok(())
    }

    /// Load `config.yaml` from `base_path`, writing defaults if it does not exist.
    pub fn load_with(base_path: &Path) -> anyhow::Result<Self> {
        let path = base_path.join(CONFIG_FILE);

        // create new if does not exist
        if !path.exists() {
            log::info!("Creating default config at {}", path.display());
            let defaults = Self {
                base_path: base_path.to_path_buf(),
                ..Default::default()
            };
            defaults.save()?;
        }

        let config_str = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let mut config: Self = serde_yml::from_str(&config_str)
            .with_context(|| format!("{} is malformed", path.display()))?;

        config.base_path = base_path.to_path_buf();
        config.validate()?;

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config)? {
            config.save()?;
        }

        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_str = serde_yml::to_string(&self)?;
        let path = self.base_path.join(CONFIG_FILE);
        std::fs::write(&path, config_str)
            .with_context(|| format!("failed to write {}", path.display()))
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn local_dataset_path(&self) -> PathBuf {
        self.base_path.join(&self.backend.local_dataset)
    }

    pub fn planner_settings(&self, dimensions: Option<usize>) -> PlannerSettings {
        PlannerSettings {
            namespace: self.backend.namespace.clone(),
            known_max_market_cap: self.search.known_max_market_cap,
            known_max_volume: self.search.known_max_volume,
            market_cap_unit: self.search.market_cap_unit,
            volume_unit: self.search.volume_unit,
            dimensions,
        }
    }
}
