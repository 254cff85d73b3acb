//! Shared HTTP plumbing for provider calls.

use anyhow::{Context, Result};
use paydesk_core::models::Provider;
use paydesk_core::AppError;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::time::Duration;

use crate::provider::json_str;

const MAX_ERROR_BODY_CHARS: usize = 300;

pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("paydesk/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to create HTTP client for payment providers")
}

pub(crate) fn network_error(provider: Provider, err: reqwest::Error) -> AppError {
    tracing::warn!(provider = %provider, error = %err, "Provider request failed");
    AppError::provider_network(provider, err.to_string())
}

/// Read a provider response, mapping non-2xx statuses to `ProviderApi`
/// carrying the provider's own message.
pub(crate) async fn read_json<T: DeserializeOwned>(
    provider: Provider,
    response: Response,
) -> Result<T, AppError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| network_error(provider, e))?;

    if !status.is_success() {
        let message = extract_error_message(&body)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown error").to_string());
        tracing::warn!(
            provider = %provider,
            status = status.as_u16(),
            message = %message,
            "Provider rejected request"
        );
        return Err(AppError::provider_api(provider, status.as_u16(), message));
    }

    serde_json::from_str(&body).map_err(|e| {
        AppError::provider_api(
            provider,
            status.as_u16(),
            format!("unexpected response: {}", e),
        )
    })
}

/// Pull a human-readable message out of the error shapes providers use.
pub(crate) fn extract_error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    let Ok(json) = serde_json::from_str::<JsonValue>(trimmed) else {
        return Some(trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect());
    };

    [
        "/error/message",
        "/detail",
        "/error_description",
        "/message",
        "/errors/0/message",
        "/title",
        "/error",
    ]
    .iter()
    .find_map(|pointer| json_str(&json, pointer))
    .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_error_message_shapes() {
        let stripe = r#"{"error":{"message":"No such customer","type":"invalid_request_error"}}"#;
        assert_eq!(
            extract_error_message(stripe).as_deref(),
            Some("No such customer")
        );

        let mollie = r#"{"status":422,"title":"Unprocessable Entity","detail":"The amount is higher than the maximum"}"#;
        assert_eq!(
            extract_error_message(mollie).as_deref(),
            Some("The amount is higher than the maximum")
        );

        let tikkie = r#"{"errors":[{"code":"INVALID_AMOUNT","message":"Amount is invalid"}]}"#;
        assert_eq!(
            extract_error_message(tikkie).as_deref(),
            Some("Amount is invalid")
        );

        let oauth = r#"{"error":"invalid_client","error_description":"Client authentication failed"}"#;
        assert_eq!(
            extract_error_message(oauth).as_deref(),
            Some("Client authentication failed")
        );

        assert_eq!(extract_error_message("Bad Gateway").as_deref(), Some("Bad Gateway"));
        assert_eq!(extract_error_message("   "), None);
    }
}
