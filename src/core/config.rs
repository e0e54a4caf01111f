use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub catalog: CatalogConfig,
    pub delivery: DeliveryConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Absolute base URL written into subtitle-proxy references
    /// (catalog records and the pre-generated snapshot).
    pub public_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// "s3" for production, "memory" for local development.
    pub backend: String,
    pub endpoint: String,
    pub bucket: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
    #[serde(default)]
    pub path_style: bool,
}

/// Catalog indexing and caching knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// How long an assembled catalog stays VALID before going STALE.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// Signed-URL expiry for interactive serving.
    #[serde(default = "default_sign_expiry_secs")]
    pub sign_expiry_secs: u64,
    /// Signed-URL expiry used by the offline pre-generation pass.
    #[serde(default = "default_pregen_sign_expiry_secs")]
    pub pregen_sign_expiry_secs: u64,
    /// Snapshot file the cache seeds itself from at startup.
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: String,
}

fn default_cache_ttl_secs() -> u64 {
    1800
}
fn default_sign_expiry_secs() -> u64 {
    3600
}
fn default_pregen_sign_expiry_secs() -> u64 {
    86400
}
fn default_snapshot_path() -> String {
    "pre-generated-urls.json".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub log_format: String,
    pub metrics_enabled: bool,
}

impl AppConfig {
    /// Load configuration in three layers:
    /// 1. config/default.toml
    /// 2. config/{env}.toml (based on COURSECAST_ENV) — replaces the
    ///    defaults wholesale, so an env file must be a complete config
    /// 3. Environment variables (COURSECAST_* prefix), applied on top
    pub fn load() -> anyhow::Result<Self> {
        let default_path = Path::new("config/default.toml");
        let default_content = std::fs::read_to_string(default_path)
            .map_err(|e| anyhow::anyhow!("failed to read {}: {}", default_path.display(), e))?;

        let mut config: AppConfig = toml::from_str(&default_content)
            .map_err(|e| anyhow::anyhow!("failed to parse {}: {}", default_path.display(), e))?;

        // Layer 2: environment-specific config file. Not a merge: the env
        // file replaces the defaults and must restate every section.
        let env_name =
            std::env::var("COURSECAST_ENV").unwrap_or_else(|_| "development".to_string());
        let env_path = format!("config/{}.toml", env_name);
        if let Ok(env_content) = std::fs::read_to_string(&env_path) {
            let env_config: AppConfig = toml::from_str(&env_content)
                .map_err(|e| anyhow::anyhow!("failed to parse {}: {}", env_path, e))?;
            config = env_config;
        }

        // Layer 3: environment variable overrides (selected keys)
        Self::apply_env_overrides(&mut config);

        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(config: &mut AppConfig) {
        if let Ok(v) = std::env::var("COURSECAST_SERVER_HOST") {
            config.server.host = v;
        }
        if let Ok(v) = std::env::var("COURSECAST_SERVER_PORT") {
            if let Ok(port) = v.parse() {
                config.server.port = port;
            }
        }
        if let Ok(v) = std::env::var("COURSECAST_SERVER_PUBLIC_BASE_URL") {
            config.server.public_base_url = v;
        }
        if let Ok(v) = std::env::var("COURSECAST_STORAGE_BACKEND") {
            config.storage.backend = v;
        }
        if let Ok(v) = std::env::var("COURSECAST_STORAGE_ENDPOINT") {
            config.storage.endpoint = v;
        }
        if let Ok(v) = std::env::var("COURSECAST_STORAGE_BUCKET") {
            config.storage.bucket = v;
        }
        if let Ok(v) = std::env::var("COURSECAST_STORAGE_ACCESS_KEY_ID") {
            config.storage.access_key_id = v;
        }
        if let Ok(v) = std::env::var("COURSECAST_STORAGE_SECRET_ACCESS_KEY") {
            config.storage.secret_access_key = v;
        }
        if let Ok(v) = std::env::var("COURSECAST_STORAGE_REGION") {
            config.storage.region = v;
        }
        if let Ok(v) = std::env::var("COURSECAST_CATALOG_CACHE_TTL_SECS") {
            if let Ok(secs) = v.parse() {
                config.catalog.cache_ttl_secs = secs;
            }
        }
        if let Ok(v) = std::env::var("COURSECAST_CATALOG_SNAPSHOT_PATH") {
            config.catalog.snapshot_path = v;
        }
        if let Ok(v) = std::env::var("COURSECAST_OBSERVABILITY_LOG_LEVEL") {
            config.observability.log_level = v;
        }
    }

    /// Reject configurations that would silently fall back to baked-in
    /// credentials. The S3 backend requires externally injected keys; the
    /// memory backend needs none.
    fn validate(&self) -> anyhow::Result<()> {
        match self.storage.backend.as_str() {
            "s3" => {
                if self.storage.access_key_id.is_empty()
                    || self.storage.secret_access_key.is_empty()
                {
                    anyhow::bail!(
                        "storage credentials are required for the s3 backend; \
                         set COURSECAST_STORAGE_ACCESS_KEY_ID and \
                         COURSECAST_STORAGE_SECRET_ACCESS_KEY"
                    );
                }
                if self.storage.bucket.is_empty() {
                    anyhow::bail!("storage.bucket must not be empty");
                }
                Ok(())
            }
            "memory" => Ok(()),
            other => anyhow::bail!("unknown storage backend: {}", other),
        }
    }
}
