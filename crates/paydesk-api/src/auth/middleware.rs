use crate::auth::jwt::JwtKeys;
use crate::auth::models::AuthUser;
use crate::error::HttpAppError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use paydesk_core::AppError;
use std::sync::Arc;

#[derive(Clone)]
pub struct AuthState {
    pub keys: JwtKeys,
}

impl AuthState {
    pub fn new(jwt_secret: &str) -> Self {
        Self {
            keys: JwtKeys::new(jwt_secret),
        }
    }
}

fn bearer_token(request: &Request) -> Result<&str, AppError> {
    let header = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".to_string()))?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Invalid authorization header format".to_string()))
}

pub async fn auth_middleware(
    State(auth_state): State<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let claims = match bearer_token(&request).and_then(|token| auth_state.keys.verify(token)) {
        Ok(claims) => claims,
        Err(e) => return HttpAppError(e).into_response(),
    };

    tracing::debug!(user_id = %claims.sub, "Request authenticated");
    request.extensions_mut().insert(AuthUser::from(claims));
    next.run(request).await
}
