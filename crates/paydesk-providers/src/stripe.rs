//! Stripe: Checkout Sessions for payments, Connect OAuth for linking a
//! user's own Stripe account.
//!
//! Requests are form-encoded and authenticated with the platform (or user)
//! secret key. When the user has a connected account, calls carry the
//! `Stripe-Account` header so the session is created on that account.

use async_trait::async_trait;
use paydesk_core::config::StripeDefaults;
use paydesk_core::models::{CreatePaymentParams, PaymentResult, Provider, WebhookNotification};
use paydesk_core::AppError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt::{Debug, Formatter, Result as FmtResult};

use crate::credentials::ResolvedCredentials;
use crate::http::{network_error, read_json};
use crate::provider::{json_str, CallbackUrls, PaymentProvider, WebhookRequest};

const PROVIDER: Provider = Provider::Stripe;
const REQUIRED_FIELDS: &[&str] = &["secretKey"];
const SESSION_COMPLETED: &str = "checkout.session.completed";
/// Reported instead of `checkout.session.completed` while a delayed payment
/// method (SEPA debit, bank transfer) has not settled yet.
const SESSION_AWAITING_PAYMENT: &str = "checkout.session.awaiting_payment";

#[derive(Debug, Deserialize)]
struct CheckoutSession {
    id: String,
    url: Option<String>,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OAuthTokenResponse {
    stripe_user_id: String,
}

#[derive(Debug, Deserialize)]
struct Account {
    id: String,
    #[serde(default)]
    charges_enabled: bool,
    #[serde(default)]
    payouts_enabled: bool,
    #[serde(default)]
    details_submitted: bool,
}

#[derive(Debug, Deserialize)]
struct Balance {
    #[serde(default)]
    livemode: bool,
}

/// Capabilities of a connected account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountStatus {
    pub account_id: String,
    pub charges_enabled: bool,
    pub payouts_enabled: bool,
    pub details_submitted: bool,
}

pub struct StripeProvider {
    http_client: Client,
    defaults: StripeDefaults,
    urls: CallbackUrls,
}

impl Debug for StripeProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("StripeProvider")
            .field("api_base", &self.defaults.api_base)
            .finish()
    }
}

impl StripeProvider {
    pub fn new(http_client: Client, defaults: StripeDefaults, urls: CallbackUrls) -> Self {
        Self {
            http_client,
            defaults,
            urls,
        }
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.defaults.api_base.trim_end_matches('/'), path)
    }

    fn connect_url(&self, path: &str) -> String {
        format!("{}{}", self.defaults.connect_base.trim_end_matches('/'), path)
    }

    fn checkout_form(
        &self,
        params: &CreatePaymentParams,
    ) -> Result<Vec<(String, String)>, AppError> {
        let mut form: Vec<(String, String)> = vec![
            ("mode".into(), "payment".into()),
            (
                "line_items[0][price_data][currency]".into(),
                params.currency.to_lowercase(),
            ),
            (
                "line_items[0][price_data][product_data][name]".into(),
                params.description.clone(),
            ),
            (
                "line_items[0][price_data][unit_amount]".into(),
                params.amount_in_cents()?.to_string(),
            ),
            ("line_items[0][quantity]".into(), "1".into()),
            (
                "success_url".into(),
                self.urls.invoice_return_url(&params.invoice_id, "success"),
            ),
            (
                "cancel_url".into(),
                self.urls.invoice_return_url(&params.invoice_id, "cancelled"),
            ),
            ("client_reference_id".into(), params.invoice_id.clone()),
            ("metadata[invoiceId]".into(), params.invoice_id.clone()),
            ("metadata[userId]".into(), params.user_id.clone()),
            (
                "payment_intent_data[metadata][invoiceId]".into(),
                params.invoice_id.clone(),
            ),
        ];
        if let Some(client_id) = &params.client_id {
            form.push(("metadata[clientId]".into(), client_id.clone()));
        }
        if let Some(extra) = params.metadata.as_object() {
            for (key, value) in extra {
                if matches!(key.as_str(), "invoiceId" | "userId" | "clientId") {
                    continue;
                }
                let value = match value {
                    JsonValue::String(s) => s.clone(),
                    JsonValue::Number(_) | JsonValue::Bool(_) => value.to_string(),
                    _ => continue,
                };
                form.push((format!("metadata[{}]", key), value));
            }
        }
        Ok(form)
    }

    /// URL of the Connect OAuth consent page. `state` is echoed back to the
    /// callback unchanged.
    pub fn authorize_url(&self, client_id: &str, state: &str) -> String {
        format!(
            "{}?response_type=code&client_id={}&scope=read_write&state={}&redirect_uri={}",
            self.connect_url("/oauth/authorize"),
            urlencoding::encode(client_id),
            urlencoding::encode(state),
            urlencoding::encode(&format!(
                "{}/stripe-connect/callback",
                self.urls.api_public_url
            )),
        )
    }

    /// Exchange an OAuth code for the connected account id.
    #[tracing::instrument(skip(self, secret_key, code))]
    pub async fn exchange_code(&self, secret_key: &str, code: &str) -> Result<String, AppError> {
        let response = self
            .http_client
            .post(self.connect_url("/oauth/token"))
            .bearer_auth(secret_key)
            .form(&[("grant_type", "authorization_code"), ("code", code)])
            .send()
            .await
            .map_err(|e| network_error(PROVIDER, e))?;

        let token: OAuthTokenResponse = read_json(PROVIDER, response).await?;
        tracing::info!(account_id = %token.stripe_user_id, "Stripe account connected");
        Ok(token.stripe_user_id)
    }

    #[tracing::instrument(skip(self, secret_key))]
    pub async fn account_status(
        &self,
        secret_key: &str,
        account_id: &str,
    ) -> Result<AccountStatus, AppError> {
        let response = self
            .http_client
            .get(self.api_url(&format!(
                "/v1/accounts/{}",
                urlencoding::encode(account_id)
            )))
            .bearer_auth(secret_key)
            .send()
            .await
            .map_err(|e| network_error(PROVIDER, e))?;

        let account: Account = read_json(PROVIDER, response).await?;
        Ok(AccountStatus {
            account_id: account.id,
            charges_enabled: account.charges_enabled,
            payouts_enabled: account.payouts_enabled,
            details_submitted: account.details_submitted,
        })
    }

    /// Verify a key by reading the balance. Returns whether the key is live.
    #[tracing::instrument(skip(self, credentials))]
    pub async fn test_connection(&self, credentials: &ResolvedCredentials) -> Result<bool, AppError> {
        let mut request = self
            .http_client
            .get(self.api_url("/v1/balance"))
            .bearer_auth(credentials.require("secretKey")?);
        if let Some(account_id) = credentials.get("accountId") {
            request = request.header("Stripe-Account", account_id);
        }
        let response = request.send().await.map_err(|e| network_error(PROVIDER, e))?;

        let balance: Balance = read_json(PROVIDER, response).await?;
        Ok(balance.livemode)
    }
}

#[async_trait]
impl PaymentProvider for StripeProvider {
    fn provider(&self) -> Provider {
        PROVIDER
    }

    fn required_fields(&self) -> &'static [&'static str] {
        REQUIRED_FIELDS
    }

    #[tracing::instrument(skip(self, params, credentials), fields(provider = "stripe", invoice_id = %params.invoice_id))]
    async fn create_payment(
        &self,
        params: &CreatePaymentParams,
        credentials: &ResolvedCredentials,
    ) -> Result<PaymentResult, AppError> {
        let form = self.checkout_form(params)?;
        let mut request = self
            .http_client
            .post(self.api_url("/v1/checkout/sessions"))
            .bearer_auth(credentials.require("secretKey")?)
            .form(&form);
        if let Some(account_id) = credentials.get("accountId") {
            request = request.header("Stripe-Account", account_id);
        }

        let response = request.send().await.map_err(|e| network_error(PROVIDER, e))?;
        let session: CheckoutSession = read_json(PROVIDER, response).await?;

        let payment_url = session.url.ok_or_else(|| {
            AppError::provider_api(PROVIDER, 200, "checkout session has no URL")
        })?;
        tracing::info!(session_id = %session.id, "Stripe checkout session created");

        Ok(PaymentResult {
            payment_id: session.id,
            payment_url,
            status: session.status.unwrap_or_else(|| "open".to_string()),
        })
    }

    fn parse_webhook(&self, request: &WebhookRequest) -> Result<WebhookNotification, AppError> {
        let event = request.json_body()?;
        let event_type = json_str(&event, "/type")
            .ok_or_else(|| AppError::WebhookMalformed("event has no type".to_string()))?;
        let object_id = json_str(&event, "/data/object/id")
            .ok_or_else(|| AppError::WebhookMalformed("event has no data.object.id".to_string()))?;
        let invoice_id = json_str(&event, "/data/object/metadata/invoiceId")
            .or_else(|| json_str(&event, "/data/object/client_reference_id"))
            .map(str::to_string);

        // A completed session only means the payer finished checkout.
        let settled = matches!(
            json_str(&event, "/data/object/payment_status"),
            None | Some("paid") | Some("no_payment_required")
        );
        let status = if event_type == SESSION_COMPLETED && !settled {
            tracing::debug!(session_id = %object_id, "Checkout completed with payment outstanding");
            SESSION_AWAITING_PAYMENT
        } else {
            event_type
        };

        Ok(WebhookNotification {
            payment_id: object_id.to_string(),
            status: status.to_string(),
            invoice_id,
        })
    }
}
