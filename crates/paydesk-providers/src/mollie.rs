//! Mollie Payments API v2
//!
//! Mollie's webhook only posts the payment id (`id=tr_...`, form-encoded);
//! the status and our invoice id are read back with `GET /v2/payments/{id}`.

use async_trait::async_trait;
use paydesk_core::config::MollieDefaults;
use paydesk_core::models::{CreatePaymentParams, PaymentResult, Provider, WebhookNotification};
use paydesk_core::AppError;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use std::fmt::{Debug, Formatter, Result as FmtResult};

use crate::credentials::ResolvedCredentials;
use crate::http::{network_error, read_json};
use crate::provider::{json_str, CallbackUrls, PaymentProvider, WebhookRequest};

const PROVIDER: Provider = Provider::Mollie;
const REQUIRED_FIELDS: &[&str] = &["apiKey"];

#[derive(Debug, Deserialize)]
struct MolliePayment {
    id: String,
    status: String,
    #[serde(default)]
    metadata: JsonValue,
    #[serde(rename = "_links", default)]
    links: JsonValue,
}

pub struct MollieProvider {
    http_client: Client,
    defaults: MollieDefaults,
    urls: CallbackUrls,
}

impl Debug for MollieProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("MollieProvider")
            .field("api_base", &self.defaults.api_base)
            .finish()
    }
}

impl MollieProvider {
    pub fn new(http_client: Client, defaults: MollieDefaults, urls: CallbackUrls) -> Self {
        Self {
            http_client,
            defaults,
            urls,
        }
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.defaults.api_base.trim_end_matches('/'), path)
    }

    fn payment_body(&self, params: &CreatePaymentParams) -> JsonValue {
        let mut metadata = match &params.metadata {
            JsonValue::Object(map) => map.clone(),
            _ => Default::default(),
        };
        metadata.insert("invoiceId".into(), json!(params.invoice_id));
        metadata.insert("userId".into(), json!(params.user_id));
        if let Some(client_id) = &params.client_id {
            metadata.insert("clientId".into(), json!(client_id));
        }

        json!({
            "amount": {
                "currency": params.currency,
                "value": params.amount_string(),
            },
            "description": params.description,
            "redirectUrl": self.urls.invoice_return_url(&params.invoice_id, "return"),
            "webhookUrl": self.urls.webhook_url(PROVIDER, Some(&params.user_id)),
            "metadata": metadata,
        })
    }

    #[tracing::instrument(skip(self, api_key))]
    async fn get_payment(&self, api_key: &str, payment_id: &str) -> Result<MolliePayment, AppError> {
        let response = self
            .http_client
            .get(self.api_url(&format!(
                "/v2/payments/{}",
                urlencoding::encode(payment_id)
            )))
            .bearer_auth(api_key)
            .send()
            .await
            .map_err(|e| network_error(PROVIDER, e))?;

        read_json(PROVIDER, response).await
    }
}

#[async_trait]
impl PaymentProvider for MollieProvider {
    fn provider(&self) -> Provider {
        PROVIDER
    }

    fn required_fields(&self) -> &'static [&'static str] {
        REQUIRED_FIELDS
    }

    #[tracing::instrument(skip(self, params, credentials), fields(provider = "mollie", invoice_id = %params.invoice_id))]
    async fn create_payment(
        &self,
        params: &CreatePaymentParams,
        credentials: &ResolvedCredentials,
    ) -> Result<PaymentResult, AppError> {
        let response = self
            .http_client
            .post(self.api_url("/v2/payments"))
            .bearer_auth(credentials.require("apiKey")?)
            .json(&self.payment_body(params))
            .send()
            .await
            .map_err(|e| network_error(PROVIDER, e))?;

        let payment: MolliePayment = read_json(PROVIDER, response).await?;
        let checkout = json_str(&payment.links, "/checkout/href")
            .ok_or_else(|| AppError::provider_api(PROVIDER, 201, "payment has no checkout link"))?
            .to_string();
        tracing::info!(payment_id = %payment.id, "Mollie payment created");

        Ok(PaymentResult {
            payment_id: payment.id,
            payment_url: checkout,
            status: payment.status,
        })
    }

    fn parse_webhook(&self, request: &WebhookRequest) -> Result<WebhookNotification, AppError> {
        let id = if request.is_form() {
            request.form_body().get("id").cloned()
        } else {
            let body = request.json_body()?;
            json_str(&body, "/id").map(str::to_string)
        };
        let id = id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AppError::WebhookMalformed("missing payment id".to_string()))?;

        Ok(WebhookNotification {
            payment_id: id,
            status: String::new(),
            invoice_id: None,
        })
    }

    fn webhook_needs_fetch(&self, _notification: &WebhookNotification) -> bool {
        true
    }

    async fn fetch_webhook_status(
        &self,
        notification: WebhookNotification,
        credentials: &ResolvedCredentials,
    ) -> Result<WebhookNotification, AppError> {
        let payment = self
            .get_payment(credentials.require("apiKey")?, &notification.payment_id)
            .await?;

        Ok(WebhookNotification {
            invoice_id: json_str(&payment.metadata, "/invoiceId")
                .map(str::to_string)
                .or(notification.invoice_id),
            payment_id: payment.id,
            status: payment.status,
        })
    }
}
