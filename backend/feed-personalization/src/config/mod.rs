use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment configuration: {0}")]
    Env(#[from] envy::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Redis,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default, rename = "store_backend")]
    pub backend: StoreBackend,
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
}

/// Namespace for the persisted keys of one device/user context.
#[derive(Debug, Clone, Deserialize)]
pub struct KeyspaceConfig {
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    #[serde(default = "default_device_id")]
    pub device_id: String,
}

impl KeyspaceConfig {
    pub fn key(&self, name: &str) -> String {
        format!("{}:{}:{}", self.key_prefix, self.device_id, name)
    }
}

impl Default for KeyspaceConfig {
    fn default() -> Self {
        Self {
            key_prefix: default_key_prefix(),
            device_id: default_device_id(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PersonalizationConfig {
    pub store: StoreConfig,
    pub keyspace: KeyspaceConfig,
    /// Fixes score jitter and cold-start shuffles when set
    pub random_seed: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct SeedConfig {
    random_seed: Option<u64>,
}

const ENV_PREFIX: &str = "PERSONALIZATION_";

impl PersonalizationConfig {
    /// Load `PERSONALIZATION_*` variables, reading `.env` first when present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    /// Build from explicit key/value pairs (same names as the environment).
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: Vec<(String, String)> = vars
            .into_iter()
            .filter_map(|(k, v)| k.strip_prefix(ENV_PREFIX).map(|k| (k.to_string(), v)))
            .collect();

        let store: StoreConfig = envy::from_iter(vars.clone())?;
        let keyspace: KeyspaceConfig = envy::from_iter(vars.clone())?;
        let seed: SeedConfig = envy::from_iter(vars)?;

        Ok(Self {
            store,
            keyspace,
            random_seed: seed.random_seed,
        })
    }
}

impl Default for PersonalizationConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig {
                backend: StoreBackend::Memory,
                redis_url: default_redis_url(),
            },
            keyspace: KeyspaceConfig::default(),
            random_seed: None,
        }
    }
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_key_prefix() -> String {
    "feed".to_string()
}

fn default_device_id() -> String {
    "local".to_string()
}
