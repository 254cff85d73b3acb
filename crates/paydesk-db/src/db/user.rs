use async_trait::async_trait;
use paydesk_core::models::{merge_provider_settings, Provider, User};
use paydesk_core::AppError;
use serde_json::{Map, Value as JsonValue};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres};

use crate::db::store::UserSettingsStore;

/// Repository for the `users` table
///
/// Accounts are provisioned by the identity service; this repository only
/// reads them and maintains `payment_settings`.
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserSettingsStore for UserRepository {
    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "select", db.record_id = %id))]
    async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<Postgres, User>(
            "SELECT id, email, company_name, payment_settings, created_at, updated_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    #[tracing::instrument(skip(self, patch), fields(db.table = "users", db.operation = "update", db.record_id = %user_id))]
    async fn update_provider_settings(
        &self,
        user_id: &str,
        provider: Provider,
        patch: Map<String, JsonValue>,
    ) -> Result<Option<User>, AppError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_scalar::<Postgres, Json<JsonValue>>(
            "SELECT payment_settings FROM users WHERE id = $1 FOR UPDATE",
        )
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(Json(mut settings)) = current else {
            return Ok(None);
        };
        merge_provider_settings(&mut settings, provider, patch);

        let user = sqlx::query_as::<Postgres, User>(
            r#"
            UPDATE users SET payment_settings = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, email, company_name, payment_settings, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(Json(&settings))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(user))
    }
}
