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
use paydesk_core::models::{new_id, CreateProductRequest, Product};
use paydesk_core::AppError;
use std::sync::Arc;
use validator::Validate;

#[utoipa::path(
    post,
    path = "/api/v0/products",
    tag = "products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = Product),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
    )
)]
#[tracing::instrument(skip(state, request), fields(operation = "create_product"))]
pub async fn create_product(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    ValidatedJson(request): ValidatedJson<CreateProductRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    request.validate()?;
    request.check_amounts()?;

    let now = Utc::now();
    let product = Product {
        id: new_id("prod"),
        user_id: auth_user.user_id,
        name: request.name.trim().to_string(),
        description: request.description,
        unit_price: request.unit_price,
        vat_rate: request.vat_rate,
        created_at: now,
        updated_at: now,
    };
    let created = state.db.products.create(&product).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    get,
    path = "/api/v0/products",
    tag = "products",
    responses(
        (status = 200, description = "Products of the caller", body = Vec<Product>),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
    )
)]
#[tracing::instrument(skip(state), fields(operation = "list_products"))]
pub async fn list_products(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(state.db.products.list(&auth_user.user_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/v0/products/{id}",
    tag = "products",
    params(("id" = String, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product", body = Product),
        (status = 404, description = "Product not found", body = ErrorResponse),
    )
)]
#[tracing::instrument(skip(state), fields(operation = "get_product"))]
pub async fn get_product(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    let product = state
        .db
        .products
        .get(&auth_user.user_id, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product {} not found", id)))?;
    Ok(Json(product))
}

#[utoipa::path(
    delete,
    path = "/api/v0/products/{id}",
    tag = "products",
    params(("id" = String, Path, description = "Product id")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 404, description = "Product not found", body = ErrorResponse),
    )
)]
#[tracing::instrument(skip(state), fields(operation = "delete_product"))]
pub async fn delete_product(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    if !state.db.products.delete(&auth_user.user_id, &id).await? {
        return Err(AppError::NotFound(format!("Product {} not found", id)).into());
    }
    Ok(StatusCode::NO_CONTENT)
}
