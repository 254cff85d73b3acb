//! Per-user payment provider settings

use crate::auth::AuthUser;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use paydesk_core::models::Provider;
use paydesk_core::AppError;
use serde_json::{Map, Value as JsonValue};
use std::sync::Arc;

#[utoipa::path(
    get,
    path = "/api/v0/settings/payments",
    tag = "settings",
    responses(
        (status = 200, description = "Payment settings keyed by provider, secrets masked", body = serde_json::Value),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    )
)]
#[tracing::instrument(skip(state), fields(operation = "get_payment_settings"))]
pub async fn get_payment_settings(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
) -> Result<impl IntoResponse, HttpAppError> {
    let user = state
        .db
        .users
        .get_user(&auth_user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(Json(user.redacted_payment_settings()))
}

#[utoipa::path(
    put,
    path = "/api/v0/settings/payments/{provider}",
    tag = "settings",
    params(("provider" = String, Path, description = "stripe, mollie, rabobank, tikkie or paypal")),
    request_body(content = serde_json::Value, description = "Fields to merge; null removes a key"),
    responses(
        (status = 200, description = "Updated settings, secrets masked", body = serde_json::Value),
        (status = 400, description = "Unknown provider or invalid body", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    )
)]
#[tracing::instrument(skip(state, patch), fields(operation = "update_payment_settings"))]
pub async fn update_payment_settings(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(provider): Path<String>,
    ValidatedJson(patch): ValidatedJson<Map<String, JsonValue>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let provider: Provider = provider.parse()?;

    let user = state
        .db
        .users
        .update_provider_settings(&auth_user.user_id, provider, patch)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    tracing::info!(provider = %provider, "Payment settings updated");
    Ok(Json(user.redacted_payment_settings()))
}
