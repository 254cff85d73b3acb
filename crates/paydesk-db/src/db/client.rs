use async_trait::async_trait;
use paydesk_core::models::Client;
use paydesk_core::AppError;
use sqlx::{PgPool, Postgres};

use crate::db::store::ClientStore;

/// Repository for the `clients` table
#[derive(Clone)]
pub struct ClientRepository {
    pool: PgPool,
}

impl ClientRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClientStore for ClientRepository {
    #[tracing::instrument(skip(self, client), fields(db.table = "clients", db.operation = "insert", db.record_id = %client.id))]
    async fn create(&self, client: &Client) -> Result<Client, AppError> {
        let created = sqlx::query_as::<Postgres, Client>(
            r#"
            INSERT INTO clients (id, user_id, name, email, address, vat_number, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, user_id, name, email, address, vat_number, created_at, updated_at
            "#,
        )
        .bind(&client.id)
        .bind(&client.user_id)
        .bind(&client.name)
        .bind(&client.email)
        .bind(&client.address)
        .bind(&client.vat_number)
        .bind(client.created_at)
        .bind(client.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    #[tracing::instrument(skip(self), fields(db.table = "clients", db.operation = "select", db.record_id = %id))]
    async fn get(&self, user_id: &str, id: &str) -> Result<Option<Client>, AppError> {
        let client = sqlx::query_as::<Postgres, Client>(
            "SELECT id, user_id, name, email, address, vat_number, created_at, updated_at FROM clients WHERE user_id = $1 AND id = $2",
        )
        .bind(user_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(client)
    }

    #[tracing::instrument(skip(self), fields(db.table = "clients", db.operation = "select"))]
    async fn list(&self, user_id: &str) -> Result<Vec<Client>, AppError> {
        let clients = sqlx::query_as::<Postgres, Client>(
            "SELECT id, user_id, name, email, address, vat_number, created_at, updated_at FROM clients WHERE user_id = $1 ORDER BY name ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(clients)
    }

    #[tracing::instrument(skip(self), fields(db.table = "clients", db.operation = "delete", db.record_id = %id))]
    async fn delete(&self, user_id: &str, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM clients WHERE user_id = $1 AND id = $2")
            .bind(user_id)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
