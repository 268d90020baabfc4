use std::env;

use bazaar_common::Secret;
use bazaar_engine::OrderPolicy;
use chrono::Duration;
use log::*;
use rand::{distributions::Alphanumeric, Rng};

use crate::errors::ServerError;

const DEFAULT_BZR_HOST: &str = "127.0.0.1";
const DEFAULT_BZR_PORT: u16 = 8470;
const DEFAULT_PAYMENT_WINDOW: Duration = Duration::minutes(30);
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;
const DEFAULT_CACHE_TTL_SECS: u64 = 300;
const DEFAULT_MIN_CREDIT_SCORE: i64 = 60;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub auth: AuthConfig,
    /// Shared secret for verifying payment-gateway callback signatures.
    pub gateway_secret: Secret<String>,
    /// How long a buyer has to pay before the expiry sweep cancels the order.
    pub payment_window: Duration,
    /// How often the expiry sweep runs.
    pub sweep_interval: std::time::Duration,
    pub cache_ttl: std::time::Duration,
    /// Buyers below this credit score cannot place orders.
    pub min_credit_score: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_BZR_HOST.to_string(),
            port: DEFAULT_BZR_PORT,
            database_url: String::default(),
            auth: AuthConfig::default(),
            gateway_secret: Secret::default(),
            payment_window: DEFAULT_PAYMENT_WINDOW,
            sweep_interval: std::time::Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            cache_ttl: std::time::Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            min_credit_score: DEFAULT_MIN_CREDIT_SCORE,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("BZR_HOST").ok().unwrap_or_else(|| DEFAULT_BZR_HOST.into());
        let port = env::var("BZR_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!("🪛️ {s} is not a valid port for BZR_PORT. {e} Using the default, {DEFAULT_BZR_PORT}, instead.");
                    DEFAULT_BZR_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_BZR_PORT);
        let database_url = env::var("BZR_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ BZR_DATABASE_URL is not set. Please set it to the URL for the marketplace database.");
            String::default()
        });
        let auth = AuthConfig::try_from_env().unwrap_or_else(|e| {
            warn!("🪛️ Could not load the authentication configuration from the environment. {e}. Reverting to the default.");
            AuthConfig::default()
        });
        let gateway_secret = env::var("BZR_GATEWAY_SECRET").map(Secret::new).unwrap_or_else(|_| {
            error!(
                "🪛️ BZR_GATEWAY_SECRET is not set. Payment callbacks cannot be verified and will all be rejected \
                 until it is configured."
            );
            Secret::default()
        });
        let payment_window = duration_from_env("BZR_PAYMENT_WINDOW_MINUTES", DEFAULT_PAYMENT_WINDOW);
        let sweep_interval = std::time::Duration::from_secs(
            secs_from_env("BZR_SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL_SECS),
        );
        let cache_ttl =
            std::time::Duration::from_secs(secs_from_env("BZR_CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS));
        let min_credit_score = env::var("BZR_MIN_CREDIT_SCORE")
            .ok()
            .and_then(|s| {
                s.parse::<i64>()
                    .map_err(|e| warn!("🪛️ Invalid value for BZR_MIN_CREDIT_SCORE. {e}"))
                    .ok()
            })
            .unwrap_or(DEFAULT_MIN_CREDIT_SCORE);
        Self {
            host,
            port,
            database_url,
            auth,
            gateway_secret,
            payment_window,
            sweep_interval,
            cache_ttl,
            min_credit_score,
        }
    }

    /// The engine-facing slice of this configuration.
    pub fn order_policy(&self) -> OrderPolicy {
        OrderPolicy {
            payment_window: self.payment_window,
            min_credit_score: self.min_credit_score,
            cache_ttl: self.cache_ttl,
        }
    }
}

fn duration_from_env(var: &str, default: Duration) -> Duration {
    env::var(var)
        .map_err(|_| {
            info!("🪛️ {var} is not set. Using the default value of {} minutes.", default.num_minutes());
        })
        .and_then(|s| {
            s.parse::<i64>()
                .map(Duration::minutes)
                .map_err(|e| warn!("🪛️ Invalid configuration value for {var}. {e}"))
        })
        .ok()
        .unwrap_or(default)
}

fn secs_from_env(var: &str, default: u64) -> u64 {
    env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().map_err(|e| warn!("🪛️ Invalid configuration value for {var}. {e}")).ok())
        .unwrap_or(default)
}

//-------------------------------------------------  AuthConfig  ------------------------------------------------------
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// The secret used to sign and verify access tokens (HS256).
    pub jwt_secret: Secret<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        warn!(
            "🚨️🚨️🚨️ The JWT secret has not been set. I'm using a random value for this session. DO NOT operate in \
             production like this, since every restart invalidates all issued tokens. Set BZR_JWT_SECRET instead. \
             🚨️🚨️🚨️"
        );
        let secret: String = rand::thread_rng().sample_iter(&Alphanumeric).take(64).map(char::from).collect();
        Self { jwt_secret: Secret::new(secret) }
    }
}

impl AuthConfig {
    pub fn try_from_env() -> Result<Self, ServerError> {
        let secret =
            env::var("BZR_JWT_SECRET").map_err(|e| ServerError::ConfigurationError(format!("{e} [BZR_JWT_SECRET]")))?;
        if secret.len() < 32 {
            return Err(ServerError::ConfigurationError(
                "BZR_JWT_SECRET must be at least 32 characters long".to_string(),
            ));
        }
        Ok(Self { jwt_secret: Secret::new(secret) })
    }
}
