use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Lifetime of issued bearer tokens, in hours.
    pub token_ttl_hours: i64,
}

/// Behavior switches for the car-ad workflow.
#[derive(Debug, Deserialize, Clone)]
pub struct ListingConfig {
    /// Upper bound for an uploaded photo, in bytes.
    #[serde(default = "default_max_photo_size")]
    pub max_photo_size: usize,
    /// Reject a `model` that is not listed under the submitted `brand`.
    #[serde(default = "default_enforce_brand_models")]
    pub enforce_brand_models: bool,
    /// Keep the original owner on edit instead of handing the ad to the editor.
    #[serde(default)]
    pub preserve_owner_on_edit: bool,
    /// Stored in place of an empty description.
    #[serde(default = "default_description")]
    pub default_description: String,
}

fn default_max_photo_size() -> usize {
    10 * 1024 * 1024
}
fn default_enforce_brand_models() -> bool {
    true
}
fn default_description() -> String {
    "No description".into()
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            max_photo_size: default_max_photo_size(),
            enforce_brand_models: default_enforce_brand_models(),
            preserve_owner_on_edit: false,
            default_description: default_description(),
        }
    }
}

/// One brand and its ordered model list.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct BrandConfig {
    pub name: String,
    pub models: Vec<String>,
}

/// Overrides for the brand/model lookup table. Empty means the built-in table.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct CatalogConfig {
    #[serde(default)]
    pub brands: Vec<BrandConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub listing: ListingConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("AUTOREALM_CONFIG").unwrap_or_else(|_| "config/config".to_string());

        Self::builder()?
            // Load from config/config.toml
            .add_source(File::with_name(&config_path).required(false))
            // Override from environment (e.g., AUTOREALM__AUTH__JWT_SECRET)
            .add_source(Environment::with_prefix("AUTOREALM").separator("__"))
            .build()?
            .try_deserialize()
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            .set_default("database.url", "sqlite://autorealm.db?mode=rwc")?
            .set_default("database.max_connections", 10)?
            .set_default("auth.jwt_secret", "autorealm-dev-secret")?
            .set_default("auth.token_ttl_hours", 24 * 7)
    }
}
