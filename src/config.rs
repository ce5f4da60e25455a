//! Environment-backed service configuration.

use std::env;
use std::time::Duration;

use crate::domain::cart::QuantityPolicy;
use crate::error::ConfigError;

const DEFAULT_PORT: &str = "8083";
const DEFAULT_SESSION_IDLE_MINUTES: u64 = 30;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub nats_url: Option<String>,
    /// Sessions not touched for this long are dropped on next access.
    pub session_idle: Duration,
    pub quantity_policy: QuantityPolicy,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;
        let port = env::var("PORT").unwrap_or_else(|_| DEFAULT_PORT.to_string());
        let nats_url = env::var("NATS_URL").ok();

        let session_idle = match env::var("SESSION_IDLE_MINUTES") {
            Ok(raw) => {
                let minutes: u64 = raw.parse().map_err(|_| ConfigError::Invalid {
                    key: "SESSION_IDLE_MINUTES",
                    value: raw.clone(),
                })?;
                Duration::from_secs(minutes * 60)
            }
            Err(_) => Duration::from_secs(DEFAULT_SESSION_IDLE_MINUTES * 60),
        };

        let quantity_policy = match env::var("CART_QUANTITY_POLICY") {
            Ok(raw) => match raw.as_str() {
                "clamp" => QuantityPolicy::Clamp,
                "reject" => QuantityPolicy::Reject,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "CART_QUANTITY_POLICY",
                        value: raw,
                    })
                }
            },
            Err(_) => QuantityPolicy::Clamp,
        };

        Ok(Self {
            database_url,
            bind_addr: format!("0.0.0.0:{}", port),
            nats_url,
            session_idle,
            quantity_policy,
        })
    }
}
