//! Error types module
//!
//! All failures surfaced by the payment layer are unified under `AppError`.
//! Each variant self-describes how it is presented over HTTP through the
//! `ErrorMetadata` trait, so handlers only need to propagate with `?`.
//!
//! The `Database` variant and `From<sqlx::Error>` are gated behind the `sqlx` feature.

use std::io;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

use crate::models::Provider;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like provider misconfiguration
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "PROVIDER_API_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{provider} is not configured: {message}")]
    ProviderNotConfigured { provider: Provider, message: String },

    #[error("{provider} API error ({status}): {message}")]
    ProviderApi {
        provider: Provider,
        status: u16,
        message: String,
    },

    #[error("{provider} request failed: {message}")]
    ProviderNetwork { provider: Provider, message: String },

    #[error("Malformed webhook: {0}")]
    WebhookMalformed(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl AppError {
    pub fn missing_field(field: &str) -> Self {
        AppError::MissingField(format!("{} is required", field))
    }

    pub fn provider_api(provider: Provider, status: u16, message: impl Into<String>) -> Self {
        AppError::ProviderApi {
            provider,
            status,
            message: message.into(),
        }
    }

    pub fn provider_network(provider: Provider, message: impl Into<String>) -> Self {
        AppError::ProviderNetwork {
            provider,
            message: message.into(),
        }
    }

    pub fn not_configured(provider: Provider, message: impl Into<String>) -> Self {
        AppError::ProviderNotConfigured {
            provider,
            message: message.into(),
        }
    }
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::InvalidInput(format!("UUID parsing error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::InvalidInput(format!("Validation error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::Database(_) => (
            500,
            "DATABASE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Unauthorized(_) => (
            401,
            "UNAUTHORIZED",
            false,
            Some("Sign in again and retry with a valid bearer token"),
            false,
            LogLevel::Debug,
        ),
        AppError::MissingField(_) => (
            400,
            "MISSING_FIELD",
            false,
            Some("Provide all required fields"),
            false,
            LogLevel::Debug,
        ),
        AppError::InvalidAmount(_) => (
            400,
            "INVALID_AMOUNT",
            false,
            Some("Amount must be a number greater than zero"),
            false,
            LogLevel::Debug,
        ),
        AppError::InvalidInput(_) => (
            400,
            "INVALID_INPUT",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::BadRequest(_) => (
            400,
            "BAD_REQUEST",
            false,
            Some("Check request format and parameters"),
            false,
            LogLevel::Debug,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the resource ID exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::ProviderNotConfigured { .. } => (
            400,
            "PROVIDER_NOT_CONFIGURED",
            false,
            Some("Complete the provider credentials in payment settings"),
            false,
            LogLevel::Warn,
        ),
        AppError::ProviderApi { .. } => (
            500,
            "PROVIDER_API_ERROR",
            false,
            Some("Check the provider dashboard or credentials"),
            false,
            LogLevel::Error,
        ),
        AppError::ProviderNetwork { .. } => (
            500,
            "PROVIDER_UNAVAILABLE",
            true,
            Some("Retry after a short delay"),
            false,
            LogLevel::Error,
        ),
        AppError::WebhookMalformed(_) => (
            400,
            "WEBHOOK_MALFORMED",
            false,
            None,
            false,
            LogLevel::Warn,
        ),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::Database(_) => "Database",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::MissingField(_) => "MissingField",
            AppError::InvalidAmount(_) => "InvalidAmount",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::BadRequest(_) => "BadRequest",
            AppError::NotFound(_) => "NotFound",
            AppError::ProviderNotConfigured { .. } => "ProviderNotConfigured",
            AppError::ProviderApi { .. } => "ProviderApi",
            AppError::ProviderNetwork { .. } => "ProviderNetwork",
            AppError::WebhookMalformed(_) => "WebhookMalformed",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "Failed to access database".to_string(),
            AppError::Unauthorized(ref msg) => msg.clone(),
            AppError::MissingField(ref msg) => msg.clone(),
            AppError::InvalidAmount(ref msg) => msg.clone(),
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::BadRequest(ref msg) => msg.clone(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::ProviderNotConfigured { provider, message } => {
                format!("{} is not configured: {}", provider.display_name(), message)
            }
            AppError::ProviderApi {
                provider, message, ..
            } => format!("{} error: {}", provider.display_name(), message),
            AppError::ProviderNetwork { provider, .. } => {
                format!("Could not reach {}", provider.display_name())
            }
            AppError::WebhookMalformed(ref msg) => msg.clone(),
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::InternalWithSource { .. } => "Internal server error".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_database() {
        #[cfg(feature = "sqlx")]
        let err = AppError::from(sqlx::Error::PoolClosed);
        #[cfg(not(feature = "sqlx"))]
        let err = AppError::Database("pool closed".to_string());
        assert_eq!(err.http_status_code(), 500);
        assert_eq!(err.error_code(), "DATABASE_ERROR");
        assert!(err.is_recoverable());
        assert_eq!(err.client_message(), "Failed to access database");
        assert!(err.is_sensitive());
        assert_eq!(err.log_level(), LogLevel::Error);
    }

    #[test]
    fn test_validation_errors_are_bad_requests() {
        let missing = AppError::missing_field("invoiceId");
        assert_eq!(missing.http_status_code(), 400);
        assert_eq!(missing.error_code(), "MISSING_FIELD");
        assert_eq!(missing.client_message(), "invoiceId is required");

        let amount = AppError::InvalidAmount("must be greater than zero".to_string());
        assert_eq!(amount.http_status_code(), 400);
        assert_eq!(amount.error_code(), "INVALID_AMOUNT");
    }

    #[test]
    fn test_provider_api_error_surfaces_provider_message() {
        let err = AppError::provider_api(Provider::Mollie, 422, "The amount is lower than minimum");
        assert_eq!(err.http_status_code(), 500);
        assert_eq!(err.error_code(), "PROVIDER_API_ERROR");
        assert!(!err.is_sensitive());
        assert_eq!(
            err.client_message(),
            "Mollie error: The amount is lower than minimum"
        );
        assert!(err.to_string().contains("422"));
    }

    #[test]
    fn test_provider_not_configured() {
        let err = AppError::not_configured(Provider::Tikkie, "missing appToken");
        assert_eq!(err.http_status_code(), 400);
        assert_eq!(err.error_code(), "PROVIDER_NOT_CONFIGURED");
        assert_eq!(err.log_level(), LogLevel::Warn);
        assert!(err.client_message().contains("appToken"));
    }

    #[test]
    fn test_internal_errors_are_sensitive() {
        let err = AppError::Internal("connection string leaked".to_string());
        assert!(err.is_sensitive());
        assert_eq!(err.client_message(), "Internal server error");
    }
}
