//! Tikkie payment requests (v2)

use async_trait::async_trait;
use chrono::{Duration, Utc};
use paydesk_core::config::TikkieDefaults;
use paydesk_core::models::{CreatePaymentParams, PaymentResult, Provider, WebhookNotification};
use paydesk_core::AppError;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::fmt::{Debug, Formatter, Result as FmtResult};

use crate::credentials::ResolvedCredentials;
use crate::http::{network_error, read_json};
use crate::provider::{json_str, PaymentProvider, WebhookRequest};

const PROVIDER: Provider = Provider::Tikkie;
const REQUIRED_FIELDS: &[&str] = &["apiKey", "appToken"];
const MAX_DESCRIPTION_CHARS: usize = 35;
const EXPIRY_DAYS: i64 = 14;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaymentRequestResponse {
    payment_request_token: String,
    url: String,
    status: Option<String>,
}

pub struct TikkieProvider {
    http_client: Client,
    defaults: TikkieDefaults,
}

impl Debug for TikkieProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("TikkieProvider")
            .field("sandbox_base", &self.defaults.sandbox_base)
            .field("production_base", &self.defaults.production_base)
            .finish()
    }
}

/// Tikkie rejects descriptions longer than 35 characters.
fn truncate_description(description: &str) -> String {
    description.chars().take(MAX_DESCRIPTION_CHARS).collect()
}

impl TikkieProvider {
    pub fn new(http_client: Client, defaults: TikkieDefaults) -> Self {
        Self {
            http_client,
            defaults,
        }
    }
}

#[async_trait]
impl PaymentProvider for TikkieProvider {
    fn provider(&self) -> Provider {
        PROVIDER
    }

    fn required_fields(&self) -> &'static [&'static str] {
        REQUIRED_FIELDS
    }

    #[tracing::instrument(skip(self, params, credentials), fields(provider = "tikkie", mode = %credentials.mode(), invoice_id = %params.invoice_id))]
    async fn create_payment(
        &self,
        params: &CreatePaymentParams,
        credentials: &ResolvedCredentials,
    ) -> Result<PaymentResult, AppError> {
        let expiry = (Utc::now() + Duration::days(EXPIRY_DAYS)).date_naive();
        let body = json!({
            "description": truncate_description(&params.description),
            "amountInCents": params.amount_in_cents()?,
            "externalId": params.invoice_id,
            "expiryDate": expiry.format("%Y-%m-%d").to_string(),
        });

        let url = format!(
            "{}/v2/paymentrequests",
            self.defaults
                .base_url(credentials.mode())
                .trim_end_matches('/')
        );
        let response = self
            .http_client
            .post(url)
            .header("API-Key", credentials.require("apiKey")?)
            .header("X-App-Token", credentials.require("appToken")?)
            .json(&body)
            .send()
            .await
            .map_err(|e| network_error(PROVIDER, e))?;

        let created: PaymentRequestResponse = read_json(PROVIDER, response).await?;
        tracing::info!(token = %created.payment_request_token, "Tikkie payment request created");

        Ok(PaymentResult {
            payment_id: created.payment_request_token,
            payment_url: created.url,
            status: created.status.unwrap_or_else(|| "OPEN".to_string()),
        })
    }

    fn parse_webhook(&self, request: &WebhookRequest) -> Result<WebhookNotification, AppError> {
        let body = request.json_body()?;
        let payment_id = json_str(&body, "/paymentRequestUuid")
            .or_else(|| json_str(&body, "/paymentRequestToken"))
            .ok_or_else(|| AppError::WebhookMalformed("missing payment request id".to_string()))?;
        let status = json_str(&body, "/status")
            .ok_or_else(|| AppError::WebhookMalformed("missing status".to_string()))?;

        Ok(WebhookNotification {
            payment_id: payment_id.to_string(),
            status: status.to_string(),
            invoice_id: json_str(&body, "/externalId").map(str::to_string),
        })
    }
}
