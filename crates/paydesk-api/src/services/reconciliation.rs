//! Webhook reconciliation
//!
//! Turns a provider callback into an invoice status transition. Only a
//! malformed payload is reported to the caller; anything that goes wrong
//! after parsing is logged and the callback is still acknowledged, so
//! providers do not keep redelivering.

use chrono::Utc;
use paydesk_core::models::{InvoiceStatus, Provider, WebhookNotification};
use paydesk_core::AppError;
use paydesk_providers::{map_status, PaymentProvider, WebhookRequest};
use std::sync::Arc;

use crate::state::{DbState, PaymentState};

/// What a delivered webhook did to the invoice store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Updated {
        invoice_id: String,
        status: InvoiceStatus,
    },
    /// The provider status has no invoice counterpart.
    Ignored { status: String },
    InvoiceNotFound { payment_id: String },
    Failed,
}

#[tracing::instrument(skip(db, payments, request), fields(provider = %provider))]
pub async fn reconcile_webhook(
    db: &DbState,
    payments: &PaymentState,
    provider: Provider,
    request: WebhookRequest,
) -> Result<ReconcileOutcome, AppError> {
    let adapter = payments.registry.get(provider).await?;
    let notification = adapter.parse_webhook(&request)?;

    tracing::info!(
        payment_id = %notification.payment_id,
        status = %notification.status,
        invoice_id = ?notification.invoice_id,
        "Webhook received"
    );

    match apply_notification(db, payments, adapter, &request, notification).await {
        Ok(outcome) => Ok(outcome),
        Err(e) => {
            tracing::error!(error = %e, "Webhook processing failed");
            Ok(ReconcileOutcome::Failed)
        }
    }
}

async fn apply_notification(
    db: &DbState,
    payments: &PaymentState,
    adapter: Arc<dyn PaymentProvider>,
    request: &WebhookRequest,
    mut notification: WebhookNotification,
) -> Result<ReconcileOutcome, AppError> {
    let provider = adapter.provider();

    if adapter.webhook_needs_fetch(&notification) {
        notification = complete_notification(db, payments, &adapter, request, notification).await?;
    }

    let Some(status) = map_status(provider, &notification.status) else {
        tracing::warn!(status = %notification.status, "Unmapped provider status ignored");
        return Ok(ReconcileOutcome::Ignored {
            status: notification.status,
        });
    };

    let invoice_id = match notification.invoice_id.clone() {
        Some(id) => Some(id),
        None => db
            .invoices
            .find_by_payment_id(provider, &notification.payment_id)
            .await?
            .map(|invoice| invoice.id),
    };
    let Some(invoice_id) = invoice_id else {
        tracing::warn!(payment_id = %notification.payment_id, "No invoice for webhook");
        return Ok(ReconcileOutcome::InvoiceNotFound {
            payment_id: notification.payment_id,
        });
    };

    match db.invoices.apply_status(&invoice_id, status, Utc::now()).await? {
        Some(invoice) => {
            tracing::info!(invoice_id = %invoice.id, status = %status, "Invoice status updated from webhook");
            Ok(ReconcileOutcome::Updated { invoice_id, status })
        }
        None => {
            tracing::warn!(invoice_id = %invoice_id, "Webhook references an unknown invoice");
            Ok(ReconcileOutcome::InvoiceNotFound {
                payment_id: notification.payment_id,
            })
        }
    }
}

/// Ask the provider for the state of a payment the callback only names, or
/// let it finish one the callback reports as approved.
///
/// The owning user comes from the `userId` query parameter set on the
/// webhook URL, falling back to the invoice that holds the payment id.
async fn complete_notification(
    db: &DbState,
    payments: &PaymentState,
    adapter: &Arc<dyn PaymentProvider>,
    request: &WebhookRequest,
    notification: WebhookNotification,
) -> Result<WebhookNotification, AppError> {
    let provider = adapter.provider();
    let invoice = db
        .invoices
        .find_by_payment_id(provider, &notification.payment_id)
        .await?;

    let user_id = request
        .query
        .get("userId")
        .cloned()
        .or_else(|| invoice.as_ref().map(|i| i.user_id.clone()));
    let user = match user_id {
        Some(id) => db.users.get_user(&id).await?,
        None => None,
    };

    let credentials =
        payments
            .credentials
            .resolve_required(provider, user.as_ref(), adapter.required_fields())?;
    let mut completed = adapter.fetch_webhook_status(notification, &credentials).await?;
    if completed.invoice_id.is_none() {
        completed.invoice_id = invoice.map(|i| i.id);
    }
    Ok(completed)
}
