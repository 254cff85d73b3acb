use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use paydesk_core::models::{Client, Invoice, InvoiceStatus, Product, Provider, User};
use paydesk_core::AppError;
use serde_json::{Map, Value as JsonValue};

/// Invoice persistence as seen by handlers, the payment orchestration and
/// webhook reconciliation.
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    async fn create(&self, invoice: &Invoice) -> Result<Invoice, AppError>;

    /// Fetch by id regardless of owner. Webhooks have no user context.
    async fn get(&self, id: &str) -> Result<Option<Invoice>, AppError>;

    async fn get_for_user(&self, user_id: &str, id: &str) -> Result<Option<Invoice>, AppError>;

    async fn list_for_user(
        &self,
        user_id: &str,
        status: Option<InvoiceStatus>,
    ) -> Result<Vec<Invoice>, AppError>;

    /// Overwrite the editable fields of an invoice (client, lines, totals,
    /// dates, notes, status).
    async fn update(&self, invoice: &Invoice) -> Result<Invoice, AppError>;

    async fn delete(&self, user_id: &str, id: &str) -> Result<bool, AppError>;

    async fn find_by_payment_id(
        &self,
        provider: Provider,
        payment_id: &str,
    ) -> Result<Option<Invoice>, AppError>;

    /// Record a freshly created payment request. `draft` and `sent` invoices
    /// move to `pending`; other statuses are left alone.
    async fn attach_payment(
        &self,
        id: &str,
        provider: Provider,
        payment_id: &str,
        payment_url: &str,
    ) -> Result<Option<Invoice>, AppError>;

    /// Unconditionally overwrite the status. `paid_at` is set on the first
    /// transition to `paid`. Returns `None` when the invoice does not exist.
    async fn apply_status(
        &self,
        id: &str,
        status: InvoiceStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<Invoice>, AppError>;

    /// Move `sent`/`pending` invoices due before `today` to `overdue`.
    async fn mark_overdue(&self, today: NaiveDate) -> Result<u64, AppError>;
}

/// Users and their per-provider payment settings.
#[async_trait]
pub trait UserSettingsStore: Send + Sync {
    async fn get_user(&self, id: &str) -> Result<Option<User>, AppError>;

    /// Merge `patch` into `payment_settings.<provider>`; `null` values delete keys.
    async fn update_provider_settings(
        &self,
        user_id: &str,
        provider: Provider,
        patch: Map<String, JsonValue>,
    ) -> Result<Option<User>, AppError>;
}

#[async_trait]
pub trait ClientStore: Send + Sync {
    async fn create(&self, client: &Client) -> Result<Client, AppError>;
    async fn get(&self, user_id: &str, id: &str) -> Result<Option<Client>, AppError>;
    async fn list(&self, user_id: &str) -> Result<Vec<Client>, AppError>;
    async fn delete(&self, user_id: &str, id: &str) -> Result<bool, AppError>;
}

#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn create(&self, product: &Product) -> Result<Product, AppError>;
    async fn get(&self, user_id: &str, id: &str) -> Result<Option<Product>, AppError>;
    async fn list(&self, user_id: &str) -> Result<Vec<Product>, AppError>;
    async fn delete(&self, user_id: &str, id: &str) -> Result<bool, AppError>;
}
