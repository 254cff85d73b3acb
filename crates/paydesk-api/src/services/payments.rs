//! Payment orchestration
//!
//! validate → authorize → load records → resolve credentials → call the
//! provider → record the payment on the invoice. Everything up to the
//! provider call is local, so bad requests never reach an external API.

use paydesk_core::models::{CreatePaymentRequest, PaymentResult, Provider};
use paydesk_core::AppError;

use crate::auth::AuthUser;
use crate::state::{DbState, PaymentState};

#[tracing::instrument(
    skip(db, payments, request, auth_user),
    fields(provider = %provider, user_id = %auth_user.user_id, invoice_id = tracing::field::Empty)
)]
pub async fn create_payment(
    db: &DbState,
    payments: &PaymentState,
    provider: Provider,
    request: CreatePaymentRequest,
    auth_user: &AuthUser,
) -> Result<PaymentResult, AppError> {
    let mut params = request.into_params(&payments.currency)?;
    tracing::Span::current().record("invoice_id", params.invoice_id.as_str());

    if params.user_id != auth_user.user_id {
        return Err(AppError::Unauthorized(
            "userId does not match the authenticated user".to_string(),
        ));
    }

    let user = db
        .users
        .get_user(&params.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", params.user_id)))?;

    let invoice = db
        .invoices
        .get_for_user(&user.id, &params.invoice_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Invoice {} not found", params.invoice_id)))?;

    if let Some(client_id) = &params.client_id {
        db.clients
            .get(&user.id, client_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Client {} not found", client_id)))?;
    }

    let adapter = payments.registry.get(provider).await?;
    let credentials =
        payments
            .credentials
            .resolve_required(provider, Some(&user), adapter.required_fields())?;

    params.currency = invoice.currency.clone();
    let result = adapter.create_payment(&params, &credentials).await?;

    let updated = db
        .invoices
        .attach_payment(&invoice.id, provider, &result.payment_id, &result.payment_url)
        .await?;
    if updated.is_none() {
        tracing::warn!(payment_id = %result.payment_id, "Invoice disappeared before the payment could be recorded");
    }

    tracing::info!(
        payment_id = %result.payment_id,
        status = %result.status,
        mode = %credentials.mode(),
        "Payment request created"
    );
    Ok(result)
}
