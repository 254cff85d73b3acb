//! Application state and sub-state extractors.
//!
//! Handlers take `State<Arc<AppState>>` and reach the sub-state they need;
//! stores are trait objects so the same router runs over PostgreSQL or the
//! in-memory implementation.

use axum::extract::FromRef;
use paydesk_core::Config;
use paydesk_db::{ClientStore, InvoiceStore, ProductStore, UserSettingsStore};
use paydesk_providers::{CredentialResolver, ProviderRegistry, StripeProvider};
use sqlx::PgPool;
use std::sync::Arc;

/// Persistence handles.
#[derive(Clone)]
pub struct DbState {
    /// Absent when running over in-memory stores.
    pub pool: Option<PgPool>,
    pub invoices: Arc<dyn InvoiceStore>,
    pub users: Arc<dyn UserSettingsStore>,
    pub clients: Arc<dyn ClientStore>,
    pub products: Arc<dyn ProductStore>,
}

/// Provider adapters and the credential resolver.
#[derive(Clone)]
pub struct PaymentState {
    pub registry: ProviderRegistry,
    pub credentials: CredentialResolver,
    /// Also registered in `registry`; held concretely for the Connect endpoints.
    pub stripe: Arc<StripeProvider>,
    pub currency: String,
}

#[derive(Clone)]
pub struct AppState {
    pub db: DbState,
    pub payments: PaymentState,
    pub config: Config,
}

impl FromRef<Arc<AppState>> for DbState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.db.clone()
    }
}

impl FromRef<Arc<AppState>> for PaymentState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.payments.clone()
    }
}
