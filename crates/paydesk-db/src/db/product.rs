use async_trait::async_trait;
use paydesk_core::models::Product;
use paydesk_core::AppError;
use sqlx::{PgPool, Postgres};

use crate::db::store::ProductStore;

/// Repository for the `products` table
#[derive(Clone)]
pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductStore for ProductRepository {
    #[tracing::instrument(skip(self, product), fields(db.table = "products", db.operation = "insert", db.record_id = %product.id))]
    async fn create(&self, product: &Product) -> Result<Product, AppError> {
        let created = sqlx::query_as::<Postgres, Product>(
            r#"
            INSERT INTO products (id, user_id, name, description, unit_price, vat_rate, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, user_id, name, description, unit_price, vat_rate, created_at, updated_at
            "#,
        )
        .bind(&product.id)
        .bind(&product.user_id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.unit_price)
        .bind(product.vat_rate)
        .bind(product.created_at)
        .bind(product.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    #[tracing::instrument(skip(self), fields(db.table = "products", db.operation = "select", db.record_id = %id))]
    async fn get(&self, user_id: &str, id: &str) -> Result<Option<Product>, AppError> {
        let product = sqlx::query_as::<Postgres, Product>(
            "SELECT id, user_id, name, description, unit_price, vat_rate, created_at, updated_at FROM products WHERE user_id = $1 AND id = $2",
        )
        .bind(user_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    #[tracing::instrument(skip(self), fields(db.table = "products", db.operation = "select"))]
    async fn list(&self, user_id: &str) -> Result<Vec<Product>, AppError> {
        let products = sqlx::query_as::<Postgres, Product>(
            "SELECT id, user_id, name, description, unit_price, vat_rate, created_at, updated_at FROM products WHERE user_id = $1 ORDER BY name ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    #[tracing::instrument(skip(self), fields(db.table = "products", db.operation = "delete", db.record_id = %id))]
    async fn delete(&self, user_id: &str, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM products WHERE user_id = $1 AND id = $2")
            .bind(user_id)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
