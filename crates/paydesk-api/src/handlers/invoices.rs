//! Invoice CRUD and lifecycle actions

use crate::auth::AuthUser;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use paydesk_core::models::{
    new_id, validate_line_items, CreateInvoiceRequest, Invoice, InvoiceListQuery, InvoiceStatus,
    UpdateInvoiceRequest,
};
use paydesk_core::AppError;
use std::sync::Arc;
use validator::Validate;

async fn load_invoice(state: &AppState, user_id: &str, id: &str) -> Result<Invoice, AppError> {
    state
        .db
        .invoices
        .get_for_user(user_id, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Invoice {} not found", id)))
}

async fn ensure_client(state: &AppState, user_id: &str, client_id: &str) -> Result<(), AppError> {
    state
        .db
        .clients
        .get(user_id, client_id)
        .await?
        .map(|_| ())
        .ok_or_else(|| AppError::NotFound(format!("Client {} not found", client_id)))
}

fn default_invoice_number(id: &str) -> String {
    let suffix: String = id.chars().rev().take(6).collect::<Vec<_>>().into_iter().rev().collect();
    format!("INV-{}-{}", Utc::now().format("%Y%m%d"), suffix.to_uppercase())
}

#[utoipa::path(
    post,
    path = "/api/v0/invoices",
    tag = "invoices",
    request_body = CreateInvoiceRequest,
    responses(
        (status = 201, description = "Draft invoice created", body = Invoice),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Client not found", body = ErrorResponse),
    )
)]
#[tracing::instrument(skip(state, request), fields(operation = "create_invoice"))]
pub async fn create_invoice(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    ValidatedJson(request): ValidatedJson<CreateInvoiceRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    request.validate()?;
    validate_line_items(&request.line_items)?;

    if let Some(client_id) = &request.client_id {
        ensure_client(&state, &auth_user.user_id, client_id).await?;
    }

    let issue_date = request.issue_date.unwrap_or_else(|| Utc::now().date_naive());
    if let Some(due) = request.due_date {
        if due < issue_date {
            return Err(AppError::InvalidInput(
                "dueDate cannot be before issueDate".to_string(),
            )
            .into());
        }
    }

    let id = new_id("inv");
    let invoice_number = request
        .invoice_number
        .unwrap_or_else(|| default_invoice_number(&id));
    let currency = request
        .currency
        .unwrap_or_else(|| state.payments.currency.clone())
        .to_uppercase();

    let invoice = Invoice::new_draft(
        id,
        auth_user.user_id.clone(),
        request.client_id,
        invoice_number,
        request.line_items,
        currency,
        issue_date,
        request.due_date,
        request.notes,
    )?;
    let created = state.db.invoices.create(&invoice).await?;

    tracing::info!(invoice_id = %created.id, total = %created.total, "Invoice created");
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    get,
    path = "/api/v0/invoices",
    tag = "invoices",
    params(
        ("status" = Option<InvoiceStatus>, Query, description = "Only invoices in this status")
    ),
    responses(
        (status = 200, description = "Invoices owned by the caller, newest first", body = Vec<Invoice>),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
    )
)]
#[tracing::instrument(skip(state), fields(operation = "list_invoices"))]
pub async fn list_invoices(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Query(query): Query<InvoiceListQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let invoices = state
        .db
        .invoices
        .list_for_user(&auth_user.user_id, query.status)
        .await?;
    Ok(Json(invoices))
}

#[utoipa::path(
    get,
    path = "/api/v0/invoices/{id}",
    tag = "invoices",
    params(("id" = String, Path, description = "Invoice id")),
    responses(
        (status = 200, description = "Invoice", body = Invoice),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Invoice not found", body = ErrorResponse),
    )
)]
#[tracing::instrument(skip(state), fields(operation = "get_invoice"))]
pub async fn get_invoice(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(load_invoice(&state, &auth_user.user_id, &id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v0/invoices/{id}",
    tag = "invoices",
    params(("id" = String, Path, description = "Invoice id")),
    request_body = UpdateInvoiceRequest,
    responses(
        (status = 200, description = "Updated invoice", body = Invoice),
        (status = 400, description = "Invalid input or invoice no longer a draft", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Invoice or client not found", body = ErrorResponse),
    )
)]
#[tracing::instrument(skip(state, request), fields(operation = "update_invoice"))]
pub async fn update_invoice(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateInvoiceRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    request.validate()?;
    let mut invoice = load_invoice(&state, &auth_user.user_id, &id).await?;

    if let Some(items) = request.line_items {
        if invoice.status != InvoiceStatus::Draft {
            return Err(AppError::BadRequest(format!(
                "Line items of a {} invoice cannot be changed",
                invoice.status
            ))
            .into());
        }
        validate_line_items(&items)?;
        invoice.set_line_items(items)?;
    }
    if let Some(client_id) = request.client_id {
        ensure_client(&state, &auth_user.user_id, &client_id).await?;
        invoice.client_id = Some(client_id);
    }
    if let Some(due) = request.due_date {
        if due < invoice.issue_date {
            return Err(AppError::InvalidInput(
                "dueDate cannot be before issueDate".to_string(),
            )
            .into());
        }
        invoice.due_date = Some(due);
    }
    if let Some(notes) = request.notes {
        invoice.notes = Some(notes);
    }
    invoice.updated_at = Utc::now();

    Ok(Json(state.db.invoices.update(&invoice).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v0/invoices/{id}",
    tag = "invoices",
    params(("id" = String, Path, description = "Invoice id")),
    responses(
        (status = 204, description = "Invoice deleted"),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Invoice not found", body = ErrorResponse),
    )
)]
#[tracing::instrument(skip(state), fields(operation = "delete_invoice"))]
pub async fn delete_invoice(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    if !state.db.invoices.delete(&auth_user.user_id, &id).await? {
        return Err(AppError::NotFound(format!("Invoice {} not found", id)).into());
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Transition an invoice by owner action; `allowed` lists the source statuses.
async fn transition(
    state: &AppState,
    user_id: &str,
    id: &str,
    allowed: &[InvoiceStatus],
    target: InvoiceStatus,
) -> Result<Invoice, AppError> {
    let mut invoice = load_invoice(state, user_id, id).await?;
    if !allowed.contains(&invoice.status) {
        return Err(AppError::BadRequest(format!(
            "Cannot move a {} invoice to {}",
            invoice.status, target
        )));
    }
    invoice.status = target;
    invoice.updated_at = Utc::now();
    let updated = state.db.invoices.update(&invoice).await?;
    tracing::info!(invoice_id = %id, status = %target, "Invoice status changed");
    Ok(updated)
}

#[utoipa::path(
    post,
    path = "/api/v0/invoices/{id}/send",
    tag = "invoices",
    params(("id" = String, Path, description = "Invoice id")),
    responses(
        (status = 200, description = "Invoice marked as sent", body = Invoice),
        (status = 400, description = "Invoice is not a draft", body = ErrorResponse),
        (status = 404, description = "Invoice not found", body = ErrorResponse),
    )
)]
#[tracing::instrument(skip(state), fields(operation = "send_invoice"))]
pub async fn send_invoice(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    let invoice = transition(
        &state,
        &auth_user.user_id,
        &id,
        &[InvoiceStatus::Draft],
        InvoiceStatus::Sent,
    )
    .await?;
    Ok(Json(invoice))
}

#[utoipa::path(
    post,
    path = "/api/v0/invoices/{id}/cancel",
    tag = "invoices",
    params(("id" = String, Path, description = "Invoice id")),
    responses(
        (status = 200, description = "Invoice cancelled", body = Invoice),
        (status = 400, description = "Invoice already paid or cancelled", body = ErrorResponse),
        (status = 404, description = "Invoice not found", body = ErrorResponse),
    )
)]
#[tracing::instrument(skip(state), fields(operation = "cancel_invoice"))]
pub async fn cancel_invoice(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    let invoice = transition(
        &state,
        &auth_user.user_id,
        &id,
        &[
            InvoiceStatus::Draft,
            InvoiceStatus::Sent,
            InvoiceStatus::Pending,
            InvoiceStatus::Overdue,
        ],
        InvoiceStatus::Cancelled,
    )
    .await?;
    Ok(Json(invoice))
}
