use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use paydesk_core::models::{Invoice, InvoiceStatus, Provider};
use paydesk_core::AppError;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres};

use crate::db::store::InvoiceStore;

const INVOICE_COLUMNS: &str = "id, user_id, client_id, invoice_number, line_items, subtotal, \
     vat_amount, total, currency, status, issue_date, due_date, notes, payment_provider, \
     payment_id, payment_url, paid_at, created_at, updated_at";

/// Repository for the `invoices` table
#[derive(Clone)]
pub struct InvoiceRepository {
    pool: PgPool,
}

impl InvoiceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InvoiceStore for InvoiceRepository {
    #[tracing::instrument(skip(self, invoice), fields(db.table = "invoices", db.operation = "insert", db.record_id = %invoice.id))]
    async fn create(&self, invoice: &Invoice) -> Result<Invoice, AppError> {
        let sql = format!(
            r#"
            INSERT INTO invoices (
                id, user_id, client_id, invoice_number, line_items, subtotal, vat_amount,
                total, currency, status, issue_date, due_date, notes, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING {}
            "#,
            INVOICE_COLUMNS
        );

        let created = sqlx::query_as::<Postgres, Invoice>(&sql)
            .bind(&invoice.id)
            .bind(&invoice.user_id)
            .bind(&invoice.client_id)
            .bind(&invoice.invoice_number)
            .bind(Json(&invoice.line_items))
            .bind(invoice.subtotal)
            .bind(invoice.vat_amount)
            .bind(invoice.total)
            .bind(&invoice.currency)
            .bind(invoice.status)
            .bind(invoice.issue_date)
            .bind(invoice.due_date)
            .bind(&invoice.notes)
            .bind(invoice.created_at)
            .bind(invoice.updated_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(created)
    }

    #[tracing::instrument(skip(self), fields(db.table = "invoices", db.operation = "select", db.record_id = %id))]
    async fn get(&self, id: &str) -> Result<Option<Invoice>, AppError> {
        let sql = format!("SELECT {} FROM invoices WHERE id = $1", INVOICE_COLUMNS);
        let invoice = sqlx::query_as::<Postgres, Invoice>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(invoice)
    }

    #[tracing::instrument(skip(self), fields(db.table = "invoices", db.operation = "select", db.record_id = %id))]
    async fn get_for_user(&self, user_id: &str, id: &str) -> Result<Option<Invoice>, AppError> {
        let sql = format!(
            "SELECT {} FROM invoices WHERE user_id = $1 AND id = $2",
            INVOICE_COLUMNS
        );
        let invoice = sqlx::query_as::<Postgres, Invoice>(&sql)
            .bind(user_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(invoice)
    }

    #[tracing::instrument(skip(self), fields(db.table = "invoices", db.operation = "select"))]
    async fn list_for_user(
        &self,
        user_id: &str,
        status: Option<InvoiceStatus>,
    ) -> Result<Vec<Invoice>, AppError> {
        let invoices = match status {
            Some(status) => {
                let sql = format!(
                    "SELECT {} FROM invoices WHERE user_id = $1 AND status = $2 ORDER BY issue_date DESC, created_at DESC",
                    INVOICE_COLUMNS
                );
                sqlx::query_as::<Postgres, Invoice>(&sql)
                    .bind(user_id)
                    .bind(status)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!(
                    "SELECT {} FROM invoices WHERE user_id = $1 ORDER BY issue_date DESC, created_at DESC",
                    INVOICE_COLUMNS
                );
                sqlx::query_as::<Postgres, Invoice>(&sql)
                    .bind(user_id)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(invoices)
    }

    #[tracing::instrument(skip(self, invoice), fields(db.table = "invoices", db.operation = "update", db.record_id = %invoice.id))]
    async fn update(&self, invoice: &Invoice) -> Result<Invoice, AppError> {
        let sql = format!(
            r#"
            UPDATE invoices
            SET client_id = $3, line_items = $4, subtotal = $5, vat_amount = $6, total = $7,
                status = $8, due_date = $9, notes = $10, updated_at = NOW()
            WHERE user_id = $1 AND id = $2
            RETURNING {}
            "#,
            INVOICE_COLUMNS
        );

        let updated = sqlx::query_as::<Postgres, Invoice>(&sql)
            .bind(&invoice.user_id)
            .bind(&invoice.id)
            .bind(&invoice.client_id)
            .bind(Json(&invoice.line_items))
            .bind(invoice.subtotal)
            .bind(invoice.vat_amount)
            .bind(invoice.total)
            .bind(invoice.status)
            .bind(invoice.due_date)
            .bind(&invoice.notes)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Invoice {} not found", invoice.id)))?;

        Ok(updated)
    }

    #[tracing::instrument(skip(self), fields(db.table = "invoices", db.operation = "delete", db.record_id = %id))]
    async fn delete(&self, user_id: &str, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM invoices WHERE user_id = $1 AND id = $2")
            .bind(user_id)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self), fields(db.table = "invoices", db.operation = "select"))]
    async fn find_by_payment_id(
        &self,
        provider: Provider,
        payment_id: &str,
    ) -> Result<Option<Invoice>, AppError> {
        let sql = format!(
            "SELECT {} FROM invoices WHERE payment_provider = $1 AND payment_id = $2 ORDER BY updated_at DESC LIMIT 1",
            INVOICE_COLUMNS
        );
        let invoice = sqlx::query_as::<Postgres, Invoice>(&sql)
            .bind(provider.as_str())
            .bind(payment_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(invoice)
    }

    #[tracing::instrument(skip(self, payment_url), fields(db.table = "invoices", db.operation = "update", db.record_id = %id))]
    async fn attach_payment(
        &self,
        id: &str,
        provider: Provider,
        payment_id: &str,
        payment_url: &str,
    ) -> Result<Option<Invoice>, AppError> {
        let sql = format!(
            r#"
            UPDATE invoices
            SET payment_provider = $2, payment_id = $3, payment_url = $4,
                status = CASE WHEN status IN ('draft', 'sent') THEN 'pending'::invoice_status ELSE status END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            INVOICE_COLUMNS
        );

        let invoice = sqlx::query_as::<Postgres, Invoice>(&sql)
            .bind(id)
            .bind(provider.as_str())
            .bind(payment_id)
            .bind(payment_url)
            .fetch_optional(&self.pool)
            .await?;

        Ok(invoice)
    }

    #[tracing::instrument(skip(self), fields(db.table = "invoices", db.operation = "update", db.record_id = %id))]
    async fn apply_status(
        &self,
        id: &str,
        status: InvoiceStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<Invoice>, AppError> {
        let sql = format!(
            r#"
            UPDATE invoices
            SET status = $2,
                paid_at = CASE WHEN $2 = 'paid'::invoice_status AND paid_at IS NULL THEN $3 ELSE paid_at END,
                updated_at = $3
            WHERE id = $1
            RETURNING {}
            "#,
            INVOICE_COLUMNS
        );

        let invoice = sqlx::query_as::<Postgres, Invoice>(&sql)
            .bind(id)
            .bind(status)
            .bind(at)
            .fetch_optional(&self.pool)
            .await?;

        Ok(invoice)
    }

    #[tracing::instrument(skip(self), fields(db.table = "invoices", db.operation = "update"))]
    async fn mark_overdue(&self, today: NaiveDate) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE invoices
            SET status = 'overdue', updated_at = NOW()
            WHERE status IN ('sent', 'pending') AND due_date IS NOT NULL AND due_date < $1
            "#,
        )
        .bind(today)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
