use crate::models::plans::PlanCredit;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub plans: PlansConfig,
    #[serde(default)]
    pub restoration: RestorationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub access_token_expiration_minutes: u64,
}

/// Static product catalog: which products grant credits, and for how long.
#[derive(Debug, Clone, Deserialize)]
pub struct PlansConfig {
    #[serde(default = "default_products")]
    pub products: HashMap<String, PlanCredit>,
}

impl Default for PlansConfig {
    fn default() -> Self {
        Self {
            products: default_products(),
        }
    }
}

fn default_products() -> HashMap<String, PlanCredit> {
    HashMap::from([
        (
            "com.lexora.plan.weekly".to_string(),
            PlanCredit {
                credits: 100,
                validity_days: 7,
            },
        ),
        (
            "com.lexora.plan.monthly".to_string(),
            PlanCredit {
                credits: 500,
                validity_days: 30,
            },
        ),
        (
            "com.lexora.plan.yearly".to_string(),
            PlanCredit {
                credits: 6000,
                validity_days: 365,
            },
        ),
    ])
}

#[derive(Debug, Clone, Deserialize)]
pub struct RestorationConfig {
    /// Automatic verification never re-credits purchases older than this.
    #[serde(default = "default_freshness_window_hours")]
    pub freshness_window_hours: i64,
}

impl Default for RestorationConfig {
    fn default() -> Self {
        Self {
            freshness_window_hours: default_freshness_window_hours(),
        }
    }
}

fn default_freshness_window_hours() -> i64 {
    24
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        // Load .env file if it exists (for environment variable overrides)
        dotenvy::dotenv().ok();

        // Build config from config.yml (required) with environment variable overrides
        let config = config::Config::builder()
            // Load config.yml (REQUIRED)
            .add_source(config::File::with_name("config").required(true))
            // Allow environment variables to override config file
            .add_source(
                config::Environment::with_prefix("LEXORA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
