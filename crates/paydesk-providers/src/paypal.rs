//! PayPal Orders API v2
//!
//! An order with intent CAPTURE is created and the payer is sent to its
//! `approve` link. Approval does not move money: when the
//! `CHECKOUT.ORDER.APPROVED` webhook arrives the order is captured, and the
//! capture result decides the invoice status. Webhook events are keyed on
//! the order id.

use async_trait::async_trait;
use paydesk_core::config::ModalProviderDefaults;
use paydesk_core::models::{
    CreatePaymentParams, PaymentResult, Provider, ProviderMode, WebhookNotification,
};
use paydesk_core::AppError;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::Duration;

use crate::credentials::ResolvedCredentials;
use crate::http::{network_error, read_json};
use crate::provider::{json_str, CallbackUrls, PaymentProvider, WebhookRequest};
use crate::token_cache::TokenCache;

const PROVIDER: Provider = Provider::Paypal;
const REQUIRED_FIELDS: &[&str] = &["clientId", "clientSecret"];
const MAX_DESCRIPTION_CHARS: usize = 127;
const DEFAULT_TOKEN_TTL_SECS: u64 = 300;
const ORDER_APPROVED: &str = "CHECKOUT.ORDER.APPROVED";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct Link {
    href: String,
    rel: String,
}

#[derive(Debug, Deserialize)]
struct Order {
    id: String,
    status: String,
    #[serde(default)]
    links: Vec<Link>,
}

pub struct PaypalProvider {
    http_client: Client,
    defaults: ModalProviderDefaults,
    urls: CallbackUrls,
    tokens: TokenCache,
}

impl Debug for PaypalProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("PaypalProvider")
            .field("sandbox_base", &self.defaults.sandbox_base)
            .field("production_base", &self.defaults.production_base)
            .finish()
    }
}

impl PaypalProvider {
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
                    .post(self.api_url(mode, "/v1/oauth2/token"))
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

    fn invalidate_on_unauthorized(
        &self,
        status: reqwest::StatusCode,
        credentials: &ResolvedCredentials,
    ) {
        if status == reqwest::StatusCode::UNAUTHORIZED {
            if let Some(client_id) = credentials.get("clientId") {
                self.tokens.invalidate(credentials.mode(), client_id);
            }
        }
    }

    /// Capture an approved order, returning PayPal's order document.
    #[tracing::instrument(skip(self, credentials), fields(provider = "paypal", mode = %credentials.mode()))]
    pub async fn capture_order(
        &self,
        order_id: &str,
        credentials: &ResolvedCredentials,
    ) -> Result<JsonValue, AppError> {
        let token = self.access_token(credentials).await?;
        let response = self
            .http_client
            .post(self.api_url(
                credentials.mode(),
                &format!("/v2/checkout/orders/{}/capture", urlencoding::encode(order_id)),
            ))
            .bearer_auth(&token)
            .header("PayPal-Request-Id", format!("capture-{}", order_id))
            .json(&json!({}))
            .send()
            .await
            .map_err(|e| network_error(PROVIDER, e))?;
        self.invalidate_on_unauthorized(response.status(), credentials);

        let order: JsonValue = read_json(PROVIDER, response).await?;
        tracing::info!(
            order_id = %order_id,
            status = json_str(&order, "/status").unwrap_or("unknown"),
            "PayPal order captured"
        );
        Ok(order)
    }
}

/// Translate the capture state of an order into the matching webhook event
/// type, so it maps through the same status table.
fn capture_event_type(order: &JsonValue) -> Option<&'static str> {
    let capture_status = json_str(order, "/purchase_units/0/payments/captures/0/status")
        .or_else(|| json_str(order, "/status"))?;
    match capture_status.to_ascii_uppercase().as_str() {
        "COMPLETED" => Some("PAYMENT.CAPTURE.COMPLETED"),
        "PENDING" => Some("PAYMENT.CAPTURE.PENDING"),
        "DECLINED" | "FAILED" => Some("PAYMENT.CAPTURE.DENIED"),
        _ => None,
    }
}

#[async_trait]
impl PaymentProvider for PaypalProvider {
    fn provider(&self) -> Provider {
        PROVIDER
    }

    fn required_fields(&self) -> &'static [&'static str] {
        REQUIRED_FIELDS
    }

    #[tracing::instrument(skip(self, params, credentials), fields(provider = "paypal", mode = %credentials.mode(), invoice_id = %params.invoice_id))]
    async fn create_payment(
        &self,
        params: &CreatePaymentParams,
        credentials: &ResolvedCredentials,
    ) -> Result<PaymentResult, AppError> {
        let token = self.access_token(credentials).await?;
        let description: String = params.description.chars().take(MAX_DESCRIPTION_CHARS).collect();

        let body = json!({
            "intent": "CAPTURE",
            "purchase_units": [{
                "reference_id": params.invoice_id,
                "custom_id": params.invoice_id,
                "description": description,
                "amount": {
                    "currency_code": params.currency,
                    "value": params.amount_string(),
                },
            }],
            "application_context": {
                "return_url": self.urls.invoice_return_url(&params.invoice_id, "success"),
                "cancel_url": self.urls.invoice_return_url(&params.invoice_id, "cancelled"),
                "user_action": "PAY_NOW",
            },
        });

        let response = self
            .http_client
            .post(self.api_url(credentials.mode(), "/v2/checkout/orders"))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .map_err(|e| network_error(PROVIDER, e))?;

        self.invalidate_on_unauthorized(response.status(), credentials);

        let order: Order = read_json(PROVIDER, response).await?;
        let approve = order
            .links
            .iter()
            .find(|link| link.rel == "approve" || link.rel == "payer-action")
            .map(|link| link.href.clone())
            .ok_or_else(|| AppError::provider_api(PROVIDER, 201, "order has no approve link"))?;
        tracing::info!(order_id = %order.id, "PayPal order created");

        Ok(PaymentResult {
            payment_id: order.id,
            payment_url: approve,
            status: order.status,
        })
    }

    fn parse_webhook(&self, request: &WebhookRequest) -> Result<WebhookNotification, AppError> {
        let event = request.json_body()?;
        let event_type = json_str(&event, "/event_type")
            .ok_or_else(|| AppError::WebhookMalformed("missing event_type".to_string()))?;
        let resource_id = json_str(&event, "/resource/id")
            .ok_or_else(|| AppError::WebhookMalformed("missing resource.id".to_string()))?;

        // Capture events reference the order through related_ids.
        let payment_id = json_str(&event, "/resource/supplementary_data/related_ids/order_id")
            .unwrap_or(resource_id);
        let invoice_id = json_str(&event, "/resource/custom_id")
            .or_else(|| json_str(&event, "/resource/purchase_units/0/custom_id"))
            .or_else(|| json_str(&event, "/resource/purchase_units/0/reference_id"))
            .map(str::to_string);

        Ok(WebhookNotification {
            payment_id: payment_id.to_string(),
            status: event_type.to_string(),
            invoice_id,
        })
    }

    fn webhook_needs_fetch(&self, notification: &WebhookNotification) -> bool {
        notification.status.eq_ignore_ascii_case(ORDER_APPROVED)
    }

    async fn fetch_webhook_status(
        &self,
        notification: WebhookNotification,
        credentials: &ResolvedCredentials,
    ) -> Result<WebhookNotification, AppError> {
        let order = self
            .capture_order(&notification.payment_id, credentials)
            .await?;
        let Some(event_type) = capture_event_type(&order) else {
            return Ok(notification);
        };

        Ok(WebhookNotification {
            invoice_id: json_str(&order, "/purchase_units/0/payments/captures/0/custom_id")
                .or_else(|| json_str(&order, "/purchase_units/0/reference_id"))
                .map(str::to_string)
                .or(notification.invoice_id),
            payment_id: notification.payment_id,
            status: event_type.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use rust_decimal_macros::dec;

    fn provider(base: &str) -> PaypalProvider {
        PaypalProvider::new(
            Client::new(),
            ModalProviderDefaults {
                client_id: None,
                client_secret: None,
                sandbox: true,
                sandbox_base: base.to_string(),
                production_base: base.to_string(),
            },
            CallbackUrls {
                app_url: "https://app.example.com".to_string(),
                api_public_url: "https://api.example.com".to_string(),
            },
            TokenCache::new(),
        )
    }

    #[tokio::test]
    async fn test_create_order() {
        let mut server = mockito::Server::new_async().await;
        let token = server
            .mock("POST", "/v1/oauth2/token")
            .match_body(Matcher::UrlEncoded(
                "grant_type".into(),
                "client_credentials".into(),
            ))
            .with_body(r#"{"access_token":"A21AA","token_type":"Bearer","expires_in":32400}"#)
            .create_async()
            .await;
        let order = server
            .mock("POST", "/v2/checkout/orders")
            .match_header("authorization", "Bearer A21AA")
            .match_body(Matcher::AllOf(vec![
                Matcher::PartialJson(json!({"intent": "CAPTURE"})),
                Matcher::Regex(r#""custom_id":"inv_5""#.to_string()),
                Matcher::Regex(r#""value":"42.00""#.to_string()),
            ]))
            .with_status(201)
            .with_body(
                json!({
                    "id": "5O190127TN364715T",
                    "status": "CREATED",
                    "links": [
                        {"href": "https://api.sandbox.paypal.com/v2/checkout/orders/5O190127TN364715T", "rel": "self", "method": "GET"},
                        {"href": "https://www.sandbox.paypal.com/checkoutnow?token=5O190127TN364715T", "rel": "approve", "method": "GET"}
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let params = CreatePaymentParams {
            invoice_id: "inv_5".to_string(),
            amount: dec!(42),
            description: "Invoice 5".to_string(),
            user_id: "user_1".to_string(),
            client_id: None,
            metadata: JsonValue::Null,
            currency: "EUR".to_string(),
        };
        let result = provider(&server.url())
            .create_payment(&params, &credentials())
            .await
            .unwrap();

        token.assert_async().await;
        order.assert_async().await;
        assert_eq!(result.payment_id, "5O190127TN364715T");
        assert_eq!(result.status, "CREATED");
        assert!(result.payment_url.contains("checkoutnow"));
    }

    #[test]
    fn test_parse_capture_completed_uses_order_id() {
        let request = WebhookRequest::json(json!({
            "id": "WH-1",
            "event_type": "PAYMENT.CAPTURE.COMPLETED",
            "resource": {
                "id": "3C679366HH908993F",
                "custom_id": "inv_5",
                "supplementary_data": {"related_ids": {"order_id": "5O190127TN364715T"}}
            }
        }));
        let n = provider("http://unused").parse_webhook(&request).unwrap();
        assert_eq!(n.payment_id, "5O190127TN364715T");
        assert_eq!(n.status, "PAYMENT.CAPTURE.COMPLETED");
        assert_eq!(n.invoice_id.as_deref(), Some("inv_5"));
    }

    fn credentials() -> ResolvedCredentials {
        ResolvedCredentials::new(Provider::Paypal, ProviderMode::Sandbox)
            .with("clientId", "pp-client")
            .with("clientSecret", "pp-secret")
    }

    #[tokio::test]
    async fn test_approved_order_is_captured() {
        let mut server = mockito::Server::new_async().await;
        let _token = server
            .mock("POST", "/v1/oauth2/token")
            .with_body(r#"{"access_token":"A21AA","expires_in":32400}"#)
            .create_async()
            .await;
        let capture = server
            .mock("POST", "/v2/checkout/orders/5O190127TN364715T/capture")
            .match_header("authorization", "Bearer A21AA")
            .match_header("paypal-request-id", "capture-5O190127TN364715T")
            .with_status(201)
            .with_body(
                json!({
                    "id": "5O190127TN364715T",
                    "status": "COMPLETED",
                    "purchase_units": [{
                        "reference_id": "inv_5",
                        "payments": {"captures": [{
                            "id": "3C679366HH908993F",
                            "status": "COMPLETED",
                            "custom_id": "inv_5"
                        }]}
                    }]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let paypal = provider(&server.url());
        let approved = paypal
            .parse_webhook(&WebhookRequest::json(json!({
                "event_type": "CHECKOUT.ORDER.APPROVED",
                "resource": {"id": "5O190127TN364715T"}
            })))
            .unwrap();
        assert!(paypal.webhook_needs_fetch(&approved));

        let captured = paypal
            .fetch_webhook_status(approved, &credentials())
            .await
            .unwrap();

        capture.assert_async().await;
        assert_eq!(captured.status, "PAYMENT.CAPTURE.COMPLETED");
        assert_eq!(captured.payment_id, "5O190127TN364715T");
        assert_eq!(captured.invoice_id.as_deref(), Some("inv_5"));
    }

    #[tokio::test]
    async fn test_pending_capture_is_reported_pending() {
        let mut server = mockito::Server::new_async().await;
        let _token = server
            .mock("POST", "/v1/oauth2/token")
            .with_body(r#"{"access_token":"A21AA","expires_in":32400}"#)
            .create_async()
            .await;
        let _capture = server
            .mock("POST", "/v2/checkout/orders/ORDER-2/capture")
            .with_status(201)
            .with_body(
                json!({
                    "id": "ORDER-2",
                    "status": "COMPLETED",
                    "purchase_units": [{"payments": {"captures": [{"status": "PENDING"}]}}]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let notification = WebhookNotification {
            payment_id: "ORDER-2".to_string(),
            status: "CHECKOUT.ORDER.APPROVED".to_string(),
            invoice_id: None,
        };
        let captured = provider(&server.url())
            .fetch_webhook_status(notification, &credentials())
            .await
            .unwrap();
        assert_eq!(captured.status, "PAYMENT.CAPTURE.PENDING");
    }

    #[test]
    fn test_only_approvals_trigger_capture() {
        let paypal = provider("http://unused");
        let completed = WebhookNotification {
            payment_id: "ORDER-1".to_string(),
            status: "PAYMENT.CAPTURE.COMPLETED".to_string(),
            invoice_id: None,
        };
        assert!(!paypal.webhook_needs_fetch(&completed));
    }

    #[test]
    fn test_parse_order_approved() {
        let request = WebhookRequest::json(json!({
            "event_type": "CHECKOUT.ORDER.APPROVED",
            "resource": {
                "id": "5O190127TN364715T",
                "purchase_units": [{"reference_id": "inv_5", "custom_id": "inv_5"}]
            }
        }));
        let n = provider("http://unused").parse_webhook(&request).unwrap();
        assert_eq!(n.payment_id, "5O190127TN364715T");
        assert_eq!(n.invoice_id.as_deref(), Some("inv_5"));
    }
}
