//! Rabobank request-to-pay
//!
//! Every call needs an OAuth2 access token obtained with the client
//! credentials grant. Tokens are cached per mode so that sandbox and
//! production never share one.

use async_trait::async_trait;
use paydesk_core::config::ModalProviderDefaults;
use paydesk_core::models::{
    CreatePaymentParams, PaymentResult, Provider, ProviderMode, WebhookNotification,
};
use paydesk_core::AppError;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::Duration;

use crate::credentials::ResolvedCredentials;
use crate::http::{network_error, read_json};
use crate::provider::{json_str, CallbackUrls, PaymentProvider, WebhookRequest};
use crate::token_cache::TokenCache;

const PROVIDER: Provider = Provider::Rabobank;
const REQUIRED_FIELDS: &[&str] = &["clientId", "clientSecret"];
const DEFAULT_TOKEN_TTL_SECS: u64 = 300;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequestToPayResponse {
    request_id: String,
    payment_url: String,
    status: Option<String>,
}

pub struct RabobankProvider {
    http_client: Client,
    defaults: ModalProviderDefaults,
    urls: CallbackUrls,
    tokens: TokenCache,
}

impl Debug for RabobankProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("RabobankProvider")
            .field("sandbox_base", &self.defaults.sandbox_base)
            .field("production_base", &self.defaults.production_base)
            .finish()
    }
}

impl RabobankProvider {
    pub fn new(
        http_client: Client,
        defaults: ModalProviderDefaults,
        urls: CallbackUrls,
        tokens: TokenCache,
    ) -> Self {
        Self {
            http_client,
            defaults,
            urls,
            tokens,
        }
    }

    fn api_url(&self, mode: ProviderMode, path: &str) -> String {
        format!("{}{}", self.defaults.base_url(mode).trim_end_matches('/'), path)
    }

    async fn access_token(&self, credentials: &ResolvedCredentials) -> Result<String, AppError> {
        let mode = credentials.mode();
        let client_id = credentials.require("clientId")?;
        let client_secret = credentials.require("clientSecret")?;

        self.tokens
            .get_or_fetch(mode, client_id, || async move {
                let response = self
                    .http_client
                    .post(self.api_url(mode, "/oauth2/token"))
                    .basic_auth(client_id, Some(client_secret))
                    .form(&[("grant_type", "client_credentials")])
                    .send()
                    .await
                    .map_err(|e| network_error(PROVIDER, e))?;

                let token: TokenResponse = read_json(PROVIDER, response).await?;
                let ttl = Duration::from_secs(token.expires_in.unwrap_or(DEFAULT_TOKEN_TTL_SECS));
                Ok((token.access_token, ttl))
            })
            .await
    }
}

#[async_trait]
impl PaymentProvider for RabobankProvider {
    fn provider(&self) -> Provider {
        PROVIDER
    }

    fn required_fields(&self) -> &'static [&'static str] {
        REQUIRED_FIELDS
    }

    #[tracing::instrument(skip(self, params, credentials), fields(provider = "rabobank", mode = %credentials.mode(), invoice_id = %params.invoice_id))]
    async fn create_payment(
        &self,
        params: &CreatePaymentParams,
        credentials: &ResolvedCredentials,
    ) -> Result<PaymentResult, AppError> {
        let token = self.access_token(credentials).await?;

        let body = json!({
            "amount": {
                "currency": params.currency,
                "value": params.amount_string(),
            },
            "description": params.description,
            "creditorReference": params.invoice_id,
            "redirectUrl": self.urls.invoice_return_url(&params.invoice_id, "return"),
            "callbackUrl": self.urls.webhook_url(PROVIDER, Some(&params.user_id)),
        });

        let response = self
            .http_client
            .post(self.api_url(credentials.mode(), "/request-to-pay"))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .map_err(|e| network_error(PROVIDER, e))?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            // A revoked token must not be served again from the cache.
            if let Some(client_id) = credentials.get("clientId") {
                self.tokens.invalidate(credentials.mode(), client_id);
            }
        }

        let created: RequestToPayResponse = read_json(PROVIDER, response).await?;
        tracing::info!(request_id = %created.request_id, "Rabobank payment request created");

        Ok(PaymentResult {
            payment_id: created.request_id,
            payment_url: created.payment_url,
            status: created.status.unwrap_or_else(|| "open".to_string()),
        })
    }

    fn parse_webhook(&self, request: &WebhookRequest) -> Result<WebhookNotification, AppError> {
        let body = request.json_body()?;
        let request_id = json_str(&body, "/requestId")
            .ok_or_else(|| AppError::WebhookMalformed("missing requestId".to_string()))?;
        let status = json_str(&body, "/status")
            .ok_or_else(|| AppError::WebhookMalformed("missing status".to_string()))?;

        Ok(WebhookNotification {
            payment_id: request_id.to_string(),
            status: status.to_string(),
            invoice_id: json_str(&body, "/creditorReference").map(str::to_string),
        })
    }
}
