//! Provider webhook endpoints (`POST|GET /{provider}-webhook`)
//!
//! Unauthenticated. A body that cannot be parsed is rejected with 400;
//! everything else is acknowledged with `{"received": true}`.

use crate::error::{ErrorResponse, HttpAppError};
use crate::services::reconciliation;
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    http::{header::CONTENT_TYPE, HeaderMap},
    response::IntoResponse,
    Extension, Json,
};
use paydesk_core::models::Provider;
use paydesk_providers::WebhookRequest;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookAck {
    pub received: bool,
}

#[utoipa::path(
    post,
    path = "/{provider}-webhook",
    tag = "webhooks",
    params(
        ("provider" = String, Path, description = "stripe, mollie, rabobank, tikkie or paypal")
    ),
    request_body(content = String, description = "Provider-specific JSON or form payload"),
    responses(
        (status = 200, description = "Webhook acknowledged", body = WebhookAck),
        (status = 400, description = "Malformed payload", body = ErrorResponse),
    )
)]
#[tracing::instrument(skip(state, headers, query, body), fields(operation = "receive_webhook"))]
pub async fn receive_webhook(
    State(state): State<Arc<AppState>>,
    Extension(provider): Extension<Provider>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: String,
) -> Result<impl IntoResponse, HttpAppError> {
    let request = WebhookRequest {
        body,
        content_type: headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        query,
    };

    let outcome =
        reconciliation::reconcile_webhook(&state.db, &state.payments, provider, request).await?;
    tracing::debug!(outcome = ?outcome, "Webhook handled");

    Ok(Json(WebhookAck { received: true }))
}

/// Some providers check the webhook URL with GET when it is registered.
#[utoipa::path(
    get,
    path = "/{provider}-webhook",
    tag = "webhooks",
    params(
        ("provider" = String, Path, description = "stripe, mollie, rabobank, tikkie or paypal")
    ),
    responses(
        (status = 200, description = "Endpoint is reachable", body = WebhookAck),
    )
)]
pub async fn ping_webhook(Extension(provider): Extension<Provider>) -> impl IntoResponse {
    tracing::debug!(provider = %provider, "Webhook endpoint pinged");
    Json(WebhookAck { received: true })
}
