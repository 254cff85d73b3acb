//! Create-payment endpoints (`POST /create-{provider}-payment`)

use crate::auth::AuthUser;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::services::payments;
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Extension, Json};
use paydesk_core::models::{CreatePaymentRequest, PaymentResult, Provider};
use std::sync::Arc;

#[utoipa::path(
    post,
    path = "/create-{provider}-payment",
    tag = "payments",
    params(
        ("provider" = String, Path, description = "stripe, mollie, rabobank, tikkie or paypal")
    ),
    request_body = CreatePaymentRequest,
    responses(
        (status = 200, description = "Payment request created", body = PaymentResult),
        (status = 400, description = "Missing field, invalid amount or provider not configured", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "User, invoice or client not found", body = ErrorResponse),
        (status = 500, description = "Provider API error", body = ErrorResponse),
    )
)]
#[tracing::instrument(skip(state, request), fields(operation = "create_payment"))]
pub async fn create_payment(
    State(state): State<Arc<AppState>>,
    Extension(provider): Extension<Provider>,
    auth_user: AuthUser,
    ValidatedJson(request): ValidatedJson<CreatePaymentRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let result =
        payments::create_payment(&state.db, &state.payments, provider, request, &auth_user)
            .await?;
    Ok(Json(result))
}
