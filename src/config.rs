//! Configuration module
//!
//! Loads configuration from environment variables.

use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// Maximum database connections in pool
    pub database_max_connections: u32,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    /// Base URL of the Lightning gateway service
    pub ln_gateway_url: String,

    /// Base URL of the fiat swap service
    pub swap_service_url: String,

    /// Fiat currency used when a request does not name one
    pub default_currency: String,

    /// How long a minted LNURL-withdraw point stays claimable
    pub lnurl_withdraw_expiry_secs: u64,

    /// Minimum claimable floor for LNURL-withdraw points
    pub min_withdrawable_msats: i64,

    /// Capacity of the rail event channel
    pub event_channel_capacity: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| ConfigError::MissingEnv("DATABASE_URL"))?;

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("DATABASE_MAX_CONNECTIONS"))?;

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("PORT"))?;

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let ln_gateway_url =
            env::var("LN_GATEWAY_URL").map_err(|_| ConfigError::MissingEnv("LN_GATEWAY_URL"))?;

        let swap_service_url = env::var("SWAP_SERVICE_URL")
            .map_err(|_| ConfigError::MissingEnv("SWAP_SERVICE_URL"))?;

        let default_currency = env::var("DEFAULT_CURRENCY").unwrap_or_else(|_| "KES".to_string());

        let lnurl_withdraw_expiry_secs = env::var("LNURL_WITHDRAW_EXPIRY_SECS")
            .unwrap_or_else(|_| "3600".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("LNURL_WITHDRAW_EXPIRY_SECS"))?;

        let min_withdrawable_msats = env::var("MIN_WITHDRAWABLE_MSATS")
            .unwrap_or_else(|_| "1000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("MIN_WITHDRAWABLE_MSATS"))?;

        let event_channel_capacity = env::var("EVENT_CHANNEL_CAPACITY")
            .unwrap_or_else(|_| "1024".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("EVENT_CHANNEL_CAPACITY"))?;

        Ok(Self {
            database_url,
            database_max_connections,
            host,
            port,
            environment,
            ln_gateway_url,
            swap_service_url,
            default_currency,
            lnurl_withdraw_expiry_secs,
            min_withdrawable_msats,
            event_channel_capacity,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Settlement knobs consumed by the orchestrator handlers.
    pub fn settlement_settings(&self) -> SettlementSettings {
        SettlementSettings {
            default_currency: self.default_currency.clone(),
            lnurl_withdraw_expiry_secs: self.lnurl_withdraw_expiry_secs,
            min_withdrawable_msats: self.min_withdrawable_msats,
        }
    }
}

/// Settlement parameters, decoupled from the env-backed `Config` so
/// handlers can be constructed directly in tests.
#[derive(Debug, Clone)]
pub struct SettlementSettings {
    pub default_currency: String,
    pub lnurl_withdraw_expiry_secs: u64,
    pub min_withdrawable_msats: i64,
}

impl Default for SettlementSettings {
    fn default() -> Self {
        Self {
            default_currency: "KES".to_string(),
            lnurl_withdraw_expiry_secs: 3600,
            min_withdrawable_msats: 1000,
        }
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}
