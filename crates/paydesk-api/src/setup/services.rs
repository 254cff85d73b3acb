//! Wiring of repositories and provider adapters into `AppState`

use crate::state::{AppState, DbState, PaymentState};
use anyhow::Result;
use paydesk_core::Config;
use paydesk_db::{ClientRepository, InvoiceRepository, ProductRepository, UserRepository};
use paydesk_providers::{build_providers, CredentialResolver};
use sqlx::PgPool;
use std::sync::Arc;

/// Build the application state over PostgreSQL repositories.
pub async fn initialize_services(config: &Config, pool: PgPool) -> Result<Arc<AppState>> {
    let db = DbState {
        pool: Some(pool.clone()),
        invoices: Arc::new(InvoiceRepository::new(pool.clone())),
        users: Arc::new(UserRepository::new(pool.clone())),
        clients: Arc::new(ClientRepository::new(pool.clone())),
        products: Arc::new(ProductRepository::new(pool)),
    };
    build_state(config, db).await
}

/// Build the application state over any set of stores.
pub async fn build_state(config: &Config, db: DbState) -> Result<Arc<AppState>> {
    let (registry, stripe) = build_providers(config).await?;
    let enabled: Vec<&str> = registry
        .list()
        .await
        .into_iter()
        .map(|p| p.as_str())
        .collect();
    tracing::info!(providers = ?enabled, "Payment providers registered");

    let payments = PaymentState {
        registry,
        credentials: CredentialResolver::new(config.providers.clone()),
        stripe,
        currency: config.currency.clone(),
    };

    Ok(Arc::new(AppState {
        db,
        payments,
        config: config.clone(),
    }))
}
