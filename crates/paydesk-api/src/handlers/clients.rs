use crate::auth::AuthUser;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use paydesk_core::models::{new_id, Client, CreateClientRequest};
use paydesk_core::AppError;
use std::sync::Arc;
use validator::Validate;

#[utoipa::path(
    post,
    path = "/api/v0/clients",
    tag = "clients",
    request_body = CreateClientRequest,
    responses(
        (status = 201, description = "Client created", body = Client),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
    )
)]
#[tracing::instrument(skip(state, request), fields(operation = "create_client"))]
pub async fn create_client(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    ValidatedJson(request): ValidatedJson<CreateClientRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    request.validate()?;

    let now = Utc::now();
    let client = Client {
        id: new_id("cli"),
        user_id: auth_user.user_id,
        name: request.name.trim().to_string(),
        email: request.email,
        address: request.address,
        vat_number: request.vat_number,
        created_at: now,
        updated_at: now,
    };
    let created = state.db.clients.create(&client).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    get,
    path = "/api/v0/clients",
    tag = "clients",
    responses(
        (status = 200, description = "Clients of the caller", body = Vec<Client>),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
    )
)]
#[tracing::instrument(skip(state), fields(operation = "list_clients"))]
pub async fn list_clients(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(state.db.clients.list(&auth_user.user_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/v0/clients/{id}",
    tag = "clients",
    params(("id" = String, Path, description = "Client id")),
    responses(
        (status = 200, description = "Client", body = Client),
        (status = 404, description = "Client not found", body = ErrorResponse),
    )
)]
#[tracing::instrument(skip(state), fields(operation = "get_client"))]
pub async fn get_client(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    let client = state
        .db
        .clients
        .get(&auth_user.user_id, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Client {} not found", id)))?;
    Ok(Json(client))
}

#[utoipa::path(
    delete,
    path = "/api/v0/clients/{id}",
    tag = "clients",
    params(("id" = String, Path, description = "Client id")),
    responses(
        (status = 204, description = "Client deleted"),
        (status = 404, description = "Client not found", body = ErrorResponse),
    )
)]
#[tracing::instrument(skip(state), fields(operation = "delete_client"))]
pub async fn delete_client(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    if !state.db.clients.delete(&auth_user.user_id, &id).await? {
        return Err(AppError::NotFound(format!("Client {} not found", id)).into());
    }
    Ok(StatusCode::NO_CONTENT)
}
