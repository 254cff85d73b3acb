//! Payment provider abstraction
//!
//! Each adapter translates the provider-agnostic `CreatePaymentParams` into
//! one external API and parses that provider's webhook callbacks back into a
//! `WebhookNotification`.

use async_trait::async_trait;
use paydesk_core::models::{CreatePaymentParams, PaymentResult, Provider, WebhookNotification};
use paydesk_core::AppError;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt::Debug;

use crate::credentials::ResolvedCredentials;

/// Raw inbound webhook as received over HTTP.
#[derive(Debug, Clone, Default)]
pub struct WebhookRequest {
    pub body: String,
    pub content_type: Option<String>,
    pub query: HashMap<String, String>,
}

impl WebhookRequest {
    pub fn json(body: JsonValue) -> Self {
        Self {
            body: body.to_string(),
            content_type: Some("application/json".to_string()),
            query: HashMap::new(),
        }
    }

    pub fn is_form(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"))
    }

    /// Parse the body as JSON; failures are malformed webhooks.
    pub fn json_body(&self) -> Result<JsonValue, AppError> {
        if self.body.trim().is_empty() {
            return Err(AppError::WebhookMalformed("empty body".to_string()));
        }
        serde_json::from_str(&self.body)
            .map_err(|e| AppError::WebhookMalformed(format!("invalid JSON: {}", e)))
    }

    /// Parse an `application/x-www-form-urlencoded` body.
    pub fn form_body(&self) -> HashMap<String, String> {
        self.body
            .split('&')
            .filter(|pair| !pair.is_empty())
            .filter_map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                let key = urlencoding::decode(&key.replace('+', " ")).ok()?.into_owned();
                let value = urlencoding::decode(&value.replace('+', " ")).ok()?.into_owned();
                Some((key, value))
            })
            .collect()
    }
}

/// Public URLs adapters hand to providers for redirects and callbacks.
#[derive(Debug, Clone)]
pub struct CallbackUrls {
    /// Dashboard UI base URL
    pub app_url: String,
    /// This API's public base URL
    pub api_public_url: String,
}

impl CallbackUrls {
    /// Where the payer lands after finishing (or abandoning) the payment.
    pub fn invoice_return_url(&self, invoice_id: &str, outcome: &str) -> String {
        format!(
            "{}/invoices/{}?payment={}",
            self.app_url,
            urlencoding::encode(invoice_id),
            outcome
        )
    }

    /// Webhook endpoint for a provider, optionally tagged with the user id.
    pub fn webhook_url(&self, provider: Provider, user_id: Option<&str>) -> String {
        let base = format!("{}/{}-webhook", self.api_public_url, provider.as_str());
        match user_id {
            Some(user_id) => format!("{}?userId={}", base, urlencoding::encode(user_id)),
            None => base,
        }
    }
}

/// Trait every payment provider adapter implements
#[async_trait]
pub trait PaymentProvider: Send + Sync + Debug {
    fn provider(&self) -> Provider;

    /// Credential fields that must resolve before `create_payment` is called.
    fn required_fields(&self) -> &'static [&'static str];

    /// Create a payment request at the provider. No retries.
    async fn create_payment(
        &self,
        params: &CreatePaymentParams,
        credentials: &ResolvedCredentials,
    ) -> Result<PaymentResult, AppError>;

    /// Extract `{paymentId, status, invoiceId?}` from a callback.
    fn parse_webhook(&self, request: &WebhookRequest) -> Result<WebhookNotification, AppError>;

    /// Whether the callback needs a follow-up call to the provider, made
    /// with `fetch_webhook_status`, before its status can be applied.
    fn webhook_needs_fetch(&self, _notification: &WebhookNotification) -> bool {
        false
    }

    /// Complete a notification by asking the provider for the current state
    /// (or by driving the payment on, such as capturing an approved order).
    async fn fetch_webhook_status(
        &self,
        notification: WebhookNotification,
        _credentials: &ResolvedCredentials,
    ) -> Result<WebhookNotification, AppError> {
        Ok(notification)
    }
}

/// Non-empty string at a JSON pointer.
pub(crate) fn json_str<'a>(value: &'a JsonValue, pointer: &str) -> Option<&'a str> {
    value
        .pointer(pointer)
        .and_then(JsonValue::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
