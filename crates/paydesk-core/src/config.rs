//! Configuration module
//!
//! Server, database and auth settings plus the process-wide payment provider
//! defaults. Values come from the environment (a `.env` file is honoured);
//! per-user payment settings stored in the database override the provider
//! defaults at request time.

use std::env;

use crate::models::ProviderMode;

// Common constants
const SERVER_PORT: u16 = 4000;
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const OVERDUE_SWEEP_INTERVAL_SECS: u64 = 3600;
const PROVIDER_HTTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CURRENCY: &str = "EUR";
const DEFAULT_APP_URL: &str = "http://localhost:3000";

pub const STRIPE_API_BASE: &str = "https://api.stripe.com";
pub const STRIPE_CONNECT_BASE: &str = "https://connect.stripe.com";
pub const MOLLIE_API_BASE: &str = "https://api.mollie.com";
pub const RABOBANK_SANDBOX_BASE: &str = "https://api-sandbox.rabobank.nl/openapi/sandbox";
pub const RABOBANK_PRODUCTION_BASE: &str = "https://api.rabobank.nl/openapi";
pub const TIKKIE_SANDBOX_BASE: &str = "https://api-sandbox.abnamro.com";
pub const TIKKIE_PRODUCTION_BASE: &str = "https://api.abnamro.com";
pub const PAYPAL_SANDBOX_BASE: &str = "https://api-m.sandbox.paypal.com";
pub const PAYPAL_PRODUCTION_BASE: &str = "https://api-m.paypal.com";

/// Base configuration for the HTTP service
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub jwt_secret: String,
    pub environment: String,
}

#[derive(Clone, Debug)]
pub struct StripeDefaults {
    pub secret_key: Option<String>,
    /// Connect platform client id (`ca_...`)
    pub client_id: Option<String>,
    pub webhook_secret: Option<String>,
    pub api_base: String,
    pub connect_base: String,
}

impl Default for StripeDefaults {
    fn default() -> Self {
        Self {
            secret_key: None,
            client_id: None,
            webhook_secret: None,
            api_base: STRIPE_API_BASE.to_string(),
            connect_base: STRIPE_CONNECT_BASE.to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct MollieDefaults {
    pub api_key: Option<String>,
    pub api_base: String,
}

impl Default for MollieDefaults {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: MOLLIE_API_BASE.to_string(),
        }
    }
}

/// Defaults for a provider with separate sandbox and production endpoints.
#[derive(Clone, Debug)]
pub struct ModalProviderDefaults {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub sandbox: bool,
    pub sandbox_base: String,
    pub production_base: String,
}

impl ModalProviderDefaults {
    fn new(sandbox_base: &str, production_base: &str) -> Self {
        Self {
            client_id: None,
            client_secret: None,
            sandbox: true,
            sandbox_base: sandbox_base.to_string(),
            production_base: production_base.to_string(),
        }
    }

    pub fn base_url(&self, mode: ProviderMode) -> &str {
        match mode {
            ProviderMode::Sandbox => &self.sandbox_base,
            ProviderMode::Production => &self.production_base,
        }
    }
}

#[derive(Clone, Debug)]
pub struct TikkieDefaults {
    pub api_key: Option<String>,
    pub app_token: Option<String>,
    pub sandbox: bool,
    pub sandbox_base: String,
    pub production_base: String,
}

impl Default for TikkieDefaults {
    fn default() -> Self {
        Self {
            api_key: None,
            app_token: None,
            sandbox: true,
            sandbox_base: TIKKIE_SANDBOX_BASE.to_string(),
            production_base: TIKKIE_PRODUCTION_BASE.to_string(),
        }
    }
}

impl TikkieDefaults {
    pub fn base_url(&self, mode: ProviderMode) -> &str {
        match mode {
            ProviderMode::Sandbox => &self.sandbox_base,
            ProviderMode::Production => &self.production_base,
        }
    }
}

/// Process-wide provider credentials and endpoints.
#[derive(Clone, Debug)]
pub struct ProviderDefaults {
    pub stripe: StripeDefaults,
    pub mollie: MollieDefaults,
    pub rabobank: ModalProviderDefaults,
    pub tikkie: TikkieDefaults,
    pub paypal: ModalProviderDefaults,
}

impl Default for ProviderDefaults {
    fn default() -> Self {
        Self {
            stripe: StripeDefaults::default(),
            mollie: MollieDefaults::default(),
            rabobank: ModalProviderDefaults::new(RABOBANK_SANDBOX_BASE, RABOBANK_PRODUCTION_BASE),
            tikkie: TikkieDefaults::default(),
            paypal: ModalProviderDefaults::new(PAYPAL_SANDBOX_BASE, PAYPAL_PRODUCTION_BASE),
        }
    }
}

impl ProviderDefaults {
    pub fn from_env() -> Self {
        let mut defaults = Self::default();

        defaults.stripe.secret_key = optional_env("STRIPE_SECRET_KEY");
        defaults.stripe.client_id = optional_env("STRIPE_CLIENT_ID");
        defaults.stripe.webhook_secret = optional_env("STRIPE_WEBHOOK_SECRET");
        if let Some(base) = optional_env("STRIPE_API_BASE") {
            defaults.stripe.api_base = base;
        }
        if let Some(base) = optional_env("STRIPE_CONNECT_BASE") {
            defaults.stripe.connect_base = base;
        }

        defaults.mollie.api_key = optional_env("MOLLIE_API_KEY");
        if let Some(base) = optional_env("MOLLIE_API_BASE") {
            defaults.mollie.api_base = base;
        }

        defaults.rabobank.client_id = optional_env("RABOBANK_CLIENT_ID");
        defaults.rabobank.client_secret = optional_env("RABOBANK_CLIENT_SECRET");
        defaults.rabobank.sandbox = env_flag("RABOBANK_SANDBOX", true);
        if let Some(base) = optional_env("RABOBANK_SANDBOX_BASE") {
            defaults.rabobank.sandbox_base = base;
        }
        if let Some(base) = optional_env("RABOBANK_PRODUCTION_BASE") {
            defaults.rabobank.production_base = base;
        }

        defaults.tikkie.api_key = optional_env("TIKKIE_API_KEY");
        defaults.tikkie.app_token = optional_env("TIKKIE_APP_TOKEN");
        defaults.tikkie.sandbox = env_flag("TIKKIE_SANDBOX", true);
        if let Some(base) = optional_env("TIKKIE_API_BASE") {
            defaults.tikkie.sandbox_base = base.clone();
            defaults.tikkie.production_base = base;
        }

        defaults.paypal.client_id = optional_env("PAYPAL_CLIENT_ID");
        defaults.paypal.client_secret = optional_env("PAYPAL_CLIENT_SECRET");
        defaults.paypal.sandbox = env_flag("PAYPAL_SANDBOX", true);
        if let Some(base) = optional_env("PAYPAL_API_BASE") {
            defaults.paypal.sandbox_base = base.clone();
            defaults.paypal.production_base = base;
        }

        defaults
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub base: BaseConfig,
    pub database_url: String,
    /// Public URL of the dashboard UI, used for redirects after payment.
    pub app_url: String,
    /// Public URL of this API, used to build webhook callback URLs.
    pub api_public_url: String,
    /// 0 disables the sweeper.
    pub overdue_sweep_interval_secs: u64,
    pub provider_http_timeout_secs: u64,
    pub currency: String,
    pub providers: ProviderDefaults,
}

impl Config {
    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.base.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let is_production =
            environment.to_lowercase() == "production" || environment.to_lowercase() == "prod";
        if is_production && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let base = BaseConfig {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            jwt_secret: env::var("JWT_SECRET")
                .map_err(|_| anyhow::anyhow!("JWT_SECRET must be set for authentication"))?,
            environment,
        };

        let app_url = env::var("APP_URL")
            .unwrap_or_else(|_| DEFAULT_APP_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let api_public_url = env::var("API_PUBLIC_URL")
            .unwrap_or_else(|_| format!("http://localhost:{}", base.server_port))
            .trim_end_matches('/')
            .to_string();

        Ok(Config {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            app_url,
            api_public_url,
            overdue_sweep_interval_secs: env::var("OVERDUE_SWEEP_INTERVAL_SECS")
                .unwrap_or_else(|_| OVERDUE_SWEEP_INTERVAL_SECS.to_string())
                .parse()
                .unwrap_or(OVERDUE_SWEEP_INTERVAL_SECS),
            provider_http_timeout_secs: env::var("PROVIDER_HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| PROVIDER_HTTP_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(PROVIDER_HTTP_TIMEOUT_SECS),
            currency: env::var("CURRENCY")
                .unwrap_or_else(|_| DEFAULT_CURRENCY.to_string())
                .to_uppercase(),
            providers: ProviderDefaults::from_env(),
            base,
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.base.jwt_secret.len() < 32 {
            return Err(anyhow::anyhow!(
                "JWT_SECRET must be at least 32 characters long"
            ));
        }

        if !self.database_url.starts_with("postgresql://")
            && !self.database_url.starts_with("postgres://")
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        if self.currency.len() != 3 {
            return Err(anyhow::anyhow!(
                "CURRENCY must be a three-letter ISO 4217 code"
            ));
        }

        if self.is_production() && self.base.cors_origins.iter().any(|o| o == "*") {
            return Err(anyhow::anyhow!("CORS_ORIGINS cannot contain '*' in production"));
        }

        Ok(())
    }

    /// Configuration for tests and local tooling; no environment access.
    pub fn for_tests() -> Self {
        Config {
            base: BaseConfig {
                server_port: SERVER_PORT,
                cors_origins: vec!["*".to_string()],
                db_max_connections: 1,
                db_timeout_seconds: 5,
                jwt_secret: "test-secret-key-that-is-at-least-32-chars".to_string(),
                environment: "test".to_string(),
            },
            database_url: "postgresql://localhost/paydesk_test".to_string(),
            app_url: DEFAULT_APP_URL.to_string(),
            api_public_url: format!("http://localhost:{}", SERVER_PORT),
            overdue_sweep_interval_secs: 0,
            provider_http_timeout_secs: 5,
            currency: DEFAULT_CURRENCY.to_string(),
            providers: ProviderDefaults::default(),
        }
    }
}

fn optional_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_flag(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(v) => matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes"),
        Err(_) => default,
    }
}
