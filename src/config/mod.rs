use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    pub api_server: ServerConfig,
    pub auth: AuthConfig,
    pub geoip: GeoIpConfig,
    pub generator: GeneratorSettings,
    pub prediction: PredictionConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path of the flat-file log table
    pub log_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Shared secret expected in the `API_KEY` request header.
    /// When unset, every protected request is rejected.
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoIpConfig {
    pub city_db_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorSettings {
    pub batch_size: usize,
    /// Largest batch a single API generate request may ask for
    pub max_batch_size: usize,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionConfig {
    pub split_seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub max_entries: u64,
}

impl GeneratorSettings {
    pub const fn default_batch_size() -> usize {
        300
    }

    pub const fn default_max_batch_size() -> usize {
        10_000
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig {
                log_file: PathBuf::from("web_server_logs.csv"),
            },
            api_server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 5000,
            },
            auth: AuthConfig { api_key: None },
            geoip: GeoIpConfig { city_db_path: None },
            generator: GeneratorSettings {
                batch_size: GeneratorSettings::default_batch_size(),
                max_batch_size: GeneratorSettings::default_max_batch_size(),
                seed: None,
            },
            prediction: PredictionConfig {
                split_seed: crate::analytics::predictor::DEFAULT_SPLIT_SEED,
            },
            cache: CacheConfig { max_entries: 16 },
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Config::default();

        let log_file = std::env::var("LOG_FILE")
            .map(PathBuf::from)
            .unwrap_or(defaults.storage.log_file);

        let api_host = std::env::var("API_HOST").unwrap_or(defaults.api_server.host);
        let api_port = std::env::var("API_PORT")
            .unwrap_or_else(|_| defaults.api_server.port.to_string())
            .parse::<u16>()
            .context("API_PORT must be a valid port number")?;

        let api_key = std::env::var("API_KEY").ok().filter(|k| !k.is_empty());
        if api_key.is_none() {
            tracing::warn!("API_KEY is not set; all protected API requests will be rejected");
        }

        let city_db_path = std::env::var("GEOIP_CITY_DB_PATH").ok().map(PathBuf::from);

        let batch_size = std::env::var("GENERATE_BATCH_SIZE")
            .unwrap_or_else(|_| defaults.generator.batch_size.to_string())
            .parse::<usize>()
            .context("GENERATE_BATCH_SIZE must be a positive integer")?;
        if batch_size == 0 {
            anyhow::bail!("GENERATE_BATCH_SIZE must be a positive integer");
        }

        let max_batch_size = std::env::var("GENERATE_MAX_BATCH_SIZE")
            .unwrap_or_else(|_| defaults.generator.max_batch_size.to_string())
            .parse::<usize>()
            .context("GENERATE_MAX_BATCH_SIZE must be a positive integer")?;
        if max_batch_size < batch_size {
            anyhow::bail!("GENERATE_MAX_BATCH_SIZE must not be smaller than GENERATE_BATCH_SIZE");
        }

        let seed = std::env::var("GENERATOR_SEED")
            .ok()
            .map(|v| v.parse::<u64>())
            .transpose()
            .context("GENERATOR_SEED must be an unsigned integer")?;

        let split_seed = std::env::var("PREDICT_SPLIT_SEED")
            .unwrap_or_else(|_| defaults.prediction.split_seed.to_string())
            .parse::<u64>()
            .context("PREDICT_SPLIT_SEED must be an unsigned integer")?;

        let max_entries = std::env::var("CACHE_MAX_ENTRIES")
            .unwrap_or_else(|_| defaults.cache.max_entries.to_string())
            .parse::<u64>()
            .context("CACHE_MAX_ENTRIES must be an unsigned integer")?;

        Ok(Config {
            storage: StorageConfig { log_file },
            api_server: ServerConfig {
                host: api_host,
                port: api_port,
            },
            auth: AuthConfig { api_key },
            geoip: GeoIpConfig { city_db_path },
            generator: GeneratorSettings {
                batch_size,
                max_batch_size,
                seed,
            },
            prediction: PredictionConfig { split_seed },
            cache: CacheConfig { max_entries },
        })
    }
}
