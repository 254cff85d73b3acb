//! Stripe Connect onboarding and account status
//!
//! The OAuth `state` is a short-lived token signed with the JWT secret, so a
//! callback can only link an account to the user who started the flow.

use crate::auth::{AuthUser, JwtKeys};
use crate::constants::CONNECT_STATE_TTL_MINUTES;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect},
    Json,
};
use chrono::Duration;
use paydesk_core::models::{Provider, User};
use paydesk_core::AppError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthorizeUrlResponse {
    pub url: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ConnectCallbackQuery {
    pub code: Option<String>,
    /// Signed token handed out by the authorize endpoint
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

#[derive(Debug, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StripeStatusResponse {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    pub charges_enabled: bool,
    pub payouts_enabled: bool,
    pub details_submitted: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TestConnectionResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub livemode: Option<bool>,
    pub message: String,
}

async fn find_user(state: &AppState, user_id: &str) -> Result<Option<User>, AppError> {
    state.db.users.get_user(user_id).await
}

fn state_keys(state: &AppState) -> JwtKeys {
    JwtKeys::new(&state.config.base.jwt_secret)
}

#[utoipa::path(
    get,
    path = "/stripe-connect/authorize",
    tag = "stripe",
    responses(
        (status = 200, description = "Stripe OAuth consent URL", body = AuthorizeUrlResponse),
        (status = 400, description = "Stripe client id not configured", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
    )
)]
#[tracing::instrument(skip(state), fields(operation = "stripe_connect_authorize"))]
pub async fn authorize(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
) -> Result<impl IntoResponse, HttpAppError> {
    let user = find_user(&state, &auth_user.user_id).await?;
    let credentials =
        state
            .payments
            .credentials
            .resolve_required(Provider::Stripe, user.as_ref(), &["clientId"])?;

    let connect_state = state_keys(&state).sign_connect_state(
        &auth_user.user_id,
        Duration::minutes(CONNECT_STATE_TTL_MINUTES),
    )?;
    let url = state
        .payments
        .stripe
        .authorize_url(credentials.require("clientId")?, &connect_state);
    Ok(Json(AuthorizeUrlResponse { url }))
}

#[utoipa::path(
    get,
    path = "/stripe-connect/callback",
    tag = "stripe",
    params(ConnectCallbackQuery),
    responses(
        (status = 303, description = "Redirect back to the dashboard settings page"),
    )
)]
#[tracing::instrument(skip(state, query), fields(operation = "stripe_connect_callback"))]
pub async fn callback(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectCallbackQuery>,
) -> Redirect {
    let outcome = match complete_connect(&state, query).await {
        Ok(account_id) => {
            tracing::info!(account_id = %account_id, "Stripe Connect onboarding completed");
            "connected"
        }
        Err(e) => {
            tracing::warn!(error = %e, "Stripe Connect onboarding failed");
            "error"
        }
    };
    Redirect::to(&format!("{}/settings?stripe={}", state.config.app_url, outcome))
}

async fn complete_connect(state: &AppState, query: ConnectCallbackQuery) -> Result<String, AppError> {
    if let Some(error) = query.error {
        return Err(AppError::BadRequest(format!(
            "authorization declined: {} {}",
            error,
            query.error_description.unwrap_or_default()
        )));
    }
    let code = query
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::missing_field("code"))?;
    let signed_state = query
        .state
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::missing_field("state"))?;
    let user_id = state_keys(state).verify_connect_state(&signed_state)?;

    let user = find_user(state, &user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;
    let credentials =
        state
            .payments
            .credentials
            .resolve_required(Provider::Stripe, Some(&user), &["secretKey"])?;

    let account_id = state
        .payments
        .stripe
        .exchange_code(credentials.require("secretKey")?, &code)
        .await?;

    let mut patch = Map::new();
    patch.insert("accountId".to_string(), json!(account_id));
    state
        .db
        .users
        .update_provider_settings(&user.id, Provider::Stripe, patch)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user.id)))?;

    Ok(account_id)
}

#[utoipa::path(
    get,
    path = "/stripe-status",
    tag = "stripe",
    responses(
        (status = 200, description = "Connected account capabilities", body = StripeStatusResponse),
        (status = 400, description = "Stripe not configured", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 500, description = "Stripe API error", body = ErrorResponse),
    )
)]
#[tracing::instrument(skip(state), fields(operation = "stripe_status"))]
pub async fn status(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
) -> Result<impl IntoResponse, HttpAppError> {
    let user = find_user(&state, &auth_user.user_id).await?;
    let credentials = state
        .payments
        .credentials
        .resolve(Provider::Stripe, user.as_ref());

    let Some(account_id) = credentials.get("accountId") else {
        return Ok(Json(StripeStatusResponse::default()));
    };

    let account = state
        .payments
        .stripe
        .account_status(credentials.require("secretKey")?, account_id)
        .await?;

    Ok(Json(StripeStatusResponse {
        connected: true,
        account_id: Some(account.account_id),
        charges_enabled: account.charges_enabled,
        payouts_enabled: account.payouts_enabled,
        details_submitted: account.details_submitted,
    }))
}

#[utoipa::path(
    post,
    path = "/test-stripe-connection",
    tag = "stripe",
    responses(
        (status = 200, description = "Result of a balance read with the resolved key", body = TestConnectionResponse),
        (status = 400, description = "Stripe not configured", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
    )
)]
#[tracing::instrument(skip(state), fields(operation = "test_stripe_connection"))]
pub async fn test_connection(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
) -> Result<impl IntoResponse, HttpAppError> {
    let user = find_user(&state, &auth_user.user_id).await?;
    let credentials =
        state
            .payments
            .credentials
            .resolve_required(Provider::Stripe, user.as_ref(), &["secretKey"])?;

    let response = match state.payments.stripe.test_connection(&credentials).await {
        Ok(livemode) => TestConnectionResponse {
            success: true,
            livemode: Some(livemode),
            message: if livemode {
                "Connected to Stripe (live mode)".to_string()
            } else {
                "Connected to Stripe (test mode)".to_string()
            },
        },
        Err(AppError::ProviderApi { message, .. }) => TestConnectionResponse {
            success: false,
            livemode: None,
            message,
        },
        Err(e) => return Err(e.into()),
    };

    Ok(Json(response))
}
