//! Configuration management for the storefront API.
//!
//! ## Sources (lowest priority first)
//! ```text
//! built-in defaults ──► ./stride.toml (optional) ──► environment variables
//! ```
//! `main` loads `.env` into the process environment with `dotenvy` before
//! [`AppConfig::load`] runs, so `.env` entries behave like real variables.
//! Environment keys are the upper-case field names (`HTTP_PORT`,
//! `JWT_SECRET`, `DELIVERY_FEE_CENTS`, ...).

use std::collections::HashMap;

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use stride_core::validation::{validate_email, validate_password};
use stride_core::{DeliveryPolicy, Money, MAX_PRICE_CENTS};

/// Signing secret used when `JWT_SECRET` is unset. Local development only.
pub const DEV_JWT_SECRET: &str = "stride-dev-secret-do-not-use-in-production";

const MIN_JWT_SECRET_LEN: usize = 32;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

/// Storefront API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Interface to bind.
    pub http_host: String,

    /// HTTP port.
    pub http_port: u16,

    /// SQLite database file.
    pub database_path: String,

    /// Upper bound for the connection pool.
    pub db_max_connections: u32,

    /// HS256 signing secret for session tokens.
    #[serde(default)]
    pub jwt_secret: String,

    /// Access token lifetime in seconds.
    pub jwt_access_lifetime_secs: i64,

    /// Refresh token lifetime in seconds.
    pub jwt_refresh_lifetime_secs: i64,

    /// Flat delivery fee in minor units.
    pub delivery_fee_cents: i64,

    /// Subtotal at or above which delivery is free.
    pub free_delivery_threshold_cents: Option<i64>,

    /// Browser origin allowed by CORS. No CORS layer when absent.
    pub cors_allowed_origin: Option<String>,

    /// Admin account created or promoted at startup.
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl AppConfig {
    /// Load configuration from `./stride.toml` and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::build(Some("stride"), None)
    }

    /// Load configuration from explicit environment entries only.
    ///
    /// Keys follow the environment convention (`HTTP_PORT=9000`). No file is
    /// read.
    pub fn from_env_map(env: HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::build(None, Some(env))
    }

    fn build(file: Option<&str>, env: Option<HashMap<String, String>>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("http_host", "0.0.0.0")?
            .set_default("http_port", 8080_i64)?
            .set_default("database_path", "./stride.db")?
            .set_default("db_max_connections", 5_i64)?
            .set_default("jwt_access_lifetime_secs", 3600_i64)?
            .set_default("jwt_refresh_lifetime_secs", 604_800_i64)?
            .set_default("delivery_fee_cents", 25_000_i64)?;

        if let Some(name) = file {
            builder = builder.add_source(File::with_name(name).required(false));
        }

        let environment = match env {
            Some(map) => Environment::default().source(Some(map)),
            None => Environment::default(),
        };

        let mut config: AppConfig = builder.add_source(environment).build()?.try_deserialize()?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Blank optional values count as unset.
    fn normalize(&mut self) {
        for value in [
            &mut self.cors_allowed_origin,
            &mut self.admin_email,
            &mut self.admin_password,
        ] {
            if value.as_deref().map(str::trim).is_some_and(str::is_empty) {
                *value = None;
            }
        }
        self.jwt_secret = self.jwt_secret.trim().to_string();
    }

    fn validate(&mut self) -> Result<(), ConfigError> {
        if self.http_port == 0 {
            return Err(invalid("http_port", "must be greater than 0"));
        }

        if self.db_max_connections == 0 {
            return Err(invalid("db_max_connections", "must be at least 1"));
        }

        if self.jwt_access_lifetime_secs <= 0 {
            return Err(invalid("jwt_access_lifetime_secs", "must be positive"));
        }

        if self.jwt_refresh_lifetime_secs <= self.jwt_access_lifetime_secs {
            return Err(invalid(
                "jwt_refresh_lifetime_secs",
                "must be longer than the access token lifetime",
            ));
        }

        if !(0..=MAX_PRICE_CENTS).contains(&self.delivery_fee_cents) {
            return Err(invalid(
                "delivery_fee_cents",
                &format!("must be between 0 and {}", MAX_PRICE_CENTS),
            ));
        }

        if self
            .free_delivery_threshold_cents
            .is_some_and(|t| !(0..=MAX_PRICE_CENTS).contains(&t))
        {
            return Err(invalid(
                "free_delivery_threshold_cents",
                &format!("must be between 0 and {}", MAX_PRICE_CENTS),
            ));
        }

        if self.jwt_secret.is_empty() {
            warn!("JWT_SECRET is not set, using the development secret");
            self.jwt_secret = DEV_JWT_SECRET.to_string();
        } else if self.jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(invalid(
                "jwt_secret",
                &format!("must be at least {} characters", MIN_JWT_SECRET_LEN),
            ));
        }

        match (&self.admin_email, &self.admin_password) {
            (Some(email), Some(password)) => {
                validate_password(password)
                    .map_err(|e| invalid("admin_password", &e.to_string()))?;
                let email =
                    validate_email(email).map_err(|e| invalid("admin_email", &e.to_string()))?;
                self.admin_email = Some(email);
            }
            (Some(_), None) => return Err(ConfigError::MissingRequired("admin_password".into())),
            (None, Some(_)) => return Err(ConfigError::MissingRequired("admin_email".into())),
            (None, None) => {}
        }

        Ok(())
    }

    /// `host:port` for the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }

    /// Delivery pricing shared by quotes and checkout.
    pub fn delivery_policy(&self) -> DeliveryPolicy {
        DeliveryPolicy::new(
            Money::from_cents(self.delivery_fee_cents),
            self.free_delivery_threshold_cents.map(Money::from_cents),
        )
    }

    /// True when the built-in development secret is in use.
    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

fn invalid(key: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_env_map(HashMap::new()).unwrap();

        assert_eq!(config.http_port, 8080);
        assert_eq!(config.database_path, "./stride.db");
        assert_eq!(config.db_max_connections, 5);
        assert_eq!(config.delivery_fee_cents, 25_000);
        assert!(config.free_delivery_threshold_cents.is_none());
        assert!(config.uses_dev_secret());
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
    }

    #[test]
    fn test_environment_overrides() {
        let config = AppConfig::from_env_map(env(&[
            ("HTTP_PORT", "9000"),
            ("DELIVERY_FEE_CENTS", "15000"),
            ("FREE_DELIVERY_THRESHOLD_CENTS", "1000000"),
            ("JWT_SECRET", "0123456789abcdef0123456789abcdef"),
            ("CORS_ALLOWED_ORIGIN", ""),
        ]))
        .unwrap();

        assert_eq!(config.http_port, 9000);
        assert!(!config.uses_dev_secret());
        assert!(config.cors_allowed_origin.is_none());

        let policy = config.delivery_policy();
        assert_eq!(policy.fee_for(Money::from_cents(500_000)).cents(), 15_000);
        assert_eq!(policy.fee_for(Money::from_cents(1_000_000)).cents(), 0);
    }

    #[test]
    fn test_short_secret_rejected() {
        let result = AppConfig::from_env_map(env(&[("JWT_SECRET", "short")]));
        assert!(matches!(result, Err(ConfigError::InvalidValue { key, .. }) if key == "jwt_secret"));
    }

    #[test]
    fn test_admin_credentials_come_in_pairs() {
        let result = AppConfig::from_env_map(env(&[("ADMIN_EMAIL", "owner@stride.pk")]));
        assert!(matches!(result, Err(ConfigError::MissingRequired(_))));

        let config = AppConfig::from_env_map(env(&[
            ("ADMIN_EMAIL", " Owner@Stride.pk "),
            ("ADMIN_PASSWORD", "correct-horse"),
        ]))
        .unwrap();
        assert_eq!(config.admin_email.as_deref(), Some("owner@stride.pk"));
    }

    #[test]
    fn test_invalid_numbers_rejected() {
        assert!(AppConfig::from_env_map(env(&[("HTTP_PORT", "0")])).is_err());
        assert!(AppConfig::from_env_map(env(&[("HTTP_PORT", "http")])).is_err());
        assert!(AppConfig::from_env_map(env(&[("DELIVERY_FEE_CENTS", "-1")])).is_err());
        assert!(AppConfig::from_env_map(env(&[("DELIVERY_FEE_CENTS", "4611686018427387903")])).is_err());
        assert!(AppConfig::from_env_map(env(&[("JWT_REFRESH_LIFETIME_SECS", "60")])).is_err());
    }
}
