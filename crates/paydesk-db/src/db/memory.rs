//! Process-local implementation of every store trait
//!
//! Backs the API integration tests and lets the payment layer be exercised
//! without a database.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use paydesk_core::models::{
    merge_provider_settings, Client, Invoice, InvoiceStatus, Product, Provider, User,
};
use paydesk_core::AppError;
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::db::store::{ClientStore, InvoiceStore, ProductStore, UserSettingsStore};

#[derive(Clone, Default)]
pub struct InMemoryStore {
    invoices: Arc<Mutex<HashMap<String, Invoice>>>,
    users: Arc<Mutex<HashMap<String, User>>>,
    clients: Arc<Mutex<HashMap<String, Client>>>,
    products: Arc<Mutex<HashMap<String, Product>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, AppError> {
    mutex
        .lock()
        .map_err(|_| AppError::Internal("in-memory store lock poisoned".to_string()))
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_user(&self, user: User) {
        if let Ok(mut users) = self.users.lock() {
            users.insert(user.id.clone(), user);
        }
    }

    pub fn insert_invoice(&self, invoice: Invoice) {
        if let Ok(mut invoices) = self.invoices.lock() {
            invoices.insert(invoice.id.clone(), invoice);
        }
    }

    pub fn insert_client(&self, client: Client) {
        if let Ok(mut clients) = self.clients.lock() {
            clients.insert(client.id.clone(), client);
        }
    }

    pub fn invoice(&self, id: &str) -> Option<Invoice> {
        self.invoices.lock().ok()?.get(id).cloned()
    }

    pub fn user(&self, id: &str) -> Option<User> {
        self.users.lock().ok()?.get(id).cloned()
    }
}

#[async_trait]
impl InvoiceStore for InMemoryStore {
    async fn create(&self, invoice: &Invoice) -> Result<Invoice, AppError> {
        lock(&self.invoices)?.insert(invoice.id.clone(), invoice.clone());
        Ok(invoice.clone())
    }

    async fn get(&self, id: &str) -> Result<Option<Invoice>, AppError> {
        Ok(lock(&self.invoices)?.get(id).cloned())
    }

    async fn get_for_user(&self, user_id: &str, id: &str) -> Result<Option<Invoice>, AppError> {
        Ok(lock(&self.invoices)?
            .get(id)
            .filter(|inv| inv.user_id == user_id)
            .cloned())
    }

    async fn list_for_user(
        &self,
        user_id: &str,
        status: Option<InvoiceStatus>,
    ) -> Result<Vec<Invoice>, AppError> {
        let mut invoices: Vec<Invoice> = lock(&self.invoices)?
            .values()
            .filter(|inv| inv.user_id == user_id)
            .filter(|inv| status.map_or(true, |s| inv.status == s))
            .cloned()
            .collect();
        invoices.sort_by(|a, b| {
            b.issue_date
                .cmp(&a.issue_date)
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(invoices)
    }

    async fn update(&self, invoice: &Invoice) -> Result<Invoice, AppError> {
        let mut invoices = lock(&self.invoices)?;
        let existing = invoices
            .get_mut(&invoice.id)
            .filter(|inv| inv.user_id == invoice.user_id)
            .ok_or_else(|| AppError::NotFound(format!("Invoice {} not found", invoice.id)))?;
        existing.client_id = invoice.client_id.clone();
        existing.line_items = invoice.line_items.clone();
        existing.subtotal = invoice.subtotal;
        existing.vat_amount = invoice.vat_amount;
        existing.total = invoice.total;
        existing.status = invoice.status;
        existing.due_date = invoice.due_date;
        existing.notes = invoice.notes.clone();
        existing.updated_at = Utc::now();
        Ok(existing.clone())
    }

    async fn delete(&self, user_id: &str, id: &str) -> Result<bool, AppError> {
        let mut invoices = lock(&self.invoices)?;
        let owned = invoices.get(id).is_some_and(|inv| inv.user_id == user_id);
        if owned {
            invoices.remove(id);
        }
        Ok(owned)
    }

    async fn find_by_payment_id(
        &self,
        provider: Provider,
        payment_id: &str,
    ) -> Result<Option<Invoice>, AppError> {
        Ok(lock(&self.invoices)?
            .values()
            .filter(|inv| {
                inv.payment_provider.as_deref() == Some(provider.as_str())
                    && inv.payment_id.as_deref() == Some(payment_id)
            })
            .max_by_key(|inv| inv.updated_at)
            .cloned())
    }

    async fn attach_payment(
        &self,
        id: &str,
        provider: Provider,
        payment_id: &str,
        payment_url: &str,
    ) -> Result<Option<Invoice>, AppError> {
        let mut invoices = lock(&self.invoices)?;
        let Some(invoice) = invoices.get_mut(id) else {
            return Ok(None);
        };
        invoice.payment_provider = Some(provider.as_str().to_string());
        invoice.payment_id = Some(payment_id.to_string());
        invoice.payment_url = Some(payment_url.to_string());
        if matches!(invoice.status, InvoiceStatus::Draft | InvoiceStatus::Sent) {
            invoice.status = InvoiceStatus::Pending;
        }
        invoice.updated_at = Utc::now();
        Ok(Some(invoice.clone()))
    }

    async fn apply_status(
        &self,
        id: &str,
        status: InvoiceStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<Invoice>, AppError> {
        let mut invoices = lock(&self.invoices)?;
        Ok(invoices.get_mut(id).map(|invoice| {
            invoice.apply_status(status, at);
            invoice.clone()
        }))
    }

    async fn mark_overdue(&self, today: NaiveDate) -> Result<u64, AppError> {
        let mut invoices = lock(&self.invoices)?;
        let now = Utc::now();
        let mut count = 0;
        for invoice in invoices.values_mut().filter(|inv| inv.is_overdue_on(today)) {
            invoice.status = InvoiceStatus::Overdue;
            invoice.updated_at = now;
            count += 1;
        }
        Ok(count)
    }
}

#[async_trait]
impl UserSettingsStore for InMemoryStore {
    async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        Ok(lock(&self.users)?.get(id).cloned())
    }

    async fn update_provider_settings(
        &self,
        user_id: &str,
        provider: Provider,
        patch: Map<String, JsonValue>,
    ) -> Result<Option<User>, AppError> {
        let mut users = lock(&self.users)?;
        Ok(users.get_mut(user_id).map(|user| {
            merge_provider_settings(&mut user.payment_settings, provider, patch);
            user.updated_at = Utc::now();
            user.clone()
        }))
    }
}

#[async_trait]
impl ClientStore for InMemoryStore {
    async fn create(&self, client: &Client) -> Result<Client, AppError> {
        lock(&self.clients)?.insert(client.id.clone(), client.clone());
        Ok(client.clone())
    }

    async fn get(&self, user_id: &str, id: &str) -> Result<Option<Client>, AppError> {
        Ok(lock(&self.clients)?
            .get(id)
            .filter(|c| c.user_id == user_id)
            .cloned())
    }

    async fn list(&self, user_id: &str) -> Result<Vec<Client>, AppError> {
        let mut clients: Vec<Client> = lock(&self.clients)?
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        clients.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(clients)
    }

    async fn delete(&self, user_id: &str, id: &str) -> Result<bool, AppError> {
        let mut clients = lock(&self.clients)?;
        let owned = clients.get(id).is_some_and(|c| c.user_id == user_id);
        if owned {
            clients.remove(id);
        }
        Ok(owned)
    }
}

#[async_trait]
impl ProductStore for InMemoryStore {
    async fn create(&self, product: &Product) -> Result<Product, AppError> {
        lock(&self.products)?.insert(product.id.clone(), product.clone());
        Ok(product.clone())
    }

    async fn get(&self, user_id: &str, id: &str) -> Result<Option<Product>, AppError> {
        Ok(lock(&self.products)?
            .get(id)
            .filter(|p| p.user_id == user_id)
            .cloned())
    }

    async fn list(&self, user_id: &str) -> Result<Vec<Product>, AppError> {
        let mut products: Vec<Product> = lock(&self.products)?
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        products.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(products)
    }

    async fn delete(&self, user_id: &str, id: &str) -> Result<bool, AppError> {
        let mut products = lock(&self.products)?;
        let owned = products.get(id).is_some_and(|p| p.user_id == user_id);
        if owned {
            products.remove(id);
        }
        Ok(owned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paydesk_core::models::LineItem;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn invoice(id: &str, status: InvoiceStatus, due: Option<NaiveDate>) -> Invoice {
        let mut inv = Invoice::new_draft(
            id.to_string(),
            "user_1".to_string(),
            None,
            format!("NR-{}", id),
            vec![LineItem {
                description: "Work".to_string(),
                quantity: dec!(1),
                unit_price: dec!(100),
                vat_rate: dec!(21),
                product_id: None,
            }],
            "EUR".to_string(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            due,
            None,
        )
        .unwrap();
        inv.status = status;
        inv
    }

    #[tokio::test]
    async fn test_attach_payment_moves_sent_to_pending() {
        let store = InMemoryStore::new();
        store.insert_invoice(invoice("inv_1", InvoiceStatus::Sent, None));
        store.insert_invoice(invoice("inv_2", InvoiceStatus::Overdue, None));

        let inv = store
            .attach_payment("inv_1", Provider::Mollie, "tr_1", "https://pay/1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(inv.status, InvoiceStatus::Pending);
        assert_eq!(inv.payment_provider.as_deref(), Some("mollie"));

        let inv = store
            .attach_payment("inv_2", Provider::Mollie, "tr_2", "https://pay/2")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(inv.status, InvoiceStatus::Overdue);

        let found = store
            .find_by_payment_id(Provider::Mollie, "tr_2")
            .await
            .unwrap();
        assert_eq!(found.map(|i| i.id), Some("inv_2".to_string()));
        assert!(store
            .find_by_payment_id(Provider::Stripe, "tr_2")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_apply_status_missing_invoice() {
        let store = InMemoryStore::new();
        let res = store
            .apply_status("nope", InvoiceStatus::Paid, Utc::now())
            .await
            .unwrap();
        assert!(res.is_none());
    }

    #[tokio::test]
    async fn test_mark_overdue() {
        let store = InMemoryStore::new();
        let jan = NaiveDate::from_ymd_opt(2024, 1, 15);
        store.insert_invoice(invoice("a", InvoiceStatus::Sent, jan));
        store.insert_invoice(invoice("b", InvoiceStatus::Pending, jan));
        store.insert_invoice(invoice("c", InvoiceStatus::Paid, jan));
        store.insert_invoice(invoice("d", InvoiceStatus::Draft, jan));
        store.insert_invoice(invoice("e", InvoiceStatus::Sent, None));

        let moved = store
            .mark_overdue(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap())
            .await
            .unwrap();
        assert_eq!(moved, 2);
        assert_eq!(store.invoice("a").unwrap().status, InvoiceStatus::Overdue);
        assert_eq!(store.invoice("c").unwrap().status, InvoiceStatus::Paid);
        assert_eq!(store.invoice("e").unwrap().status, InvoiceStatus::Sent);
    }

    #[tokio::test]
    async fn test_update_provider_settings_merges() {
        let store = InMemoryStore::new();
        store.insert_user(User {
            id: "user_1".to_string(),
            email: "a@example.com".to_string(),
            company_name: None,
            payment_settings: json!({"mollie": {"apiKey": "test_1"}}),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        });

        let user = store
            .update_provider_settings(
                "user_1",
                Provider::Stripe,
                json!({"accountId": "acct_9"}).as_object().cloned().unwrap(),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.payment_settings["mollie"]["apiKey"], "test_1");
        assert_eq!(user.payment_settings["stripe"]["accountId"], "acct_9");

        assert!(store
            .update_provider_settings("ghost", Provider::Stripe, Map::new())
            .await
            .unwrap()
            .is_none());
    }
}
