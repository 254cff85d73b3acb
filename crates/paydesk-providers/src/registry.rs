//! Registry of payment provider adapters

use paydesk_core::models::Provider;
use paydesk_core::AppError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::provider::PaymentProvider;

/// Registry for looking up adapters by provider.
///
/// Cloning is cheap; clones share the same adapters.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    adapters: Arc<RwLock<HashMap<Provider, Arc<dyn PaymentProvider>>>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter, replacing any previous one for the same provider.
    pub async fn register(&self, adapter: Arc<dyn PaymentProvider>) {
        let provider = adapter.provider();
        let mut adapters = self.adapters.write().await;
        adapters.insert(provider, adapter);
        tracing::debug!(provider = %provider, "Payment provider registered");
    }

    pub async fn get(&self, provider: Provider) -> Result<Arc<dyn PaymentProvider>, AppError> {
        let adapters = self.adapters.read().await;
        adapters.get(&provider).cloned().ok_or_else(|| {
            AppError::not_configured(provider, "provider is not enabled on this server")
        })
    }

    pub async fn contains(&self, provider: Provider) -> bool {
        self.adapters.read().await.contains_key(&provider)
    }

    /// Registered providers in declaration order.
    pub async fn list(&self) -> Vec<Provider> {
        let adapters = self.adapters.read().await;
        Provider::ALL
            .into_iter()
            .filter(|p| adapters.contains_key(p))
            .collect()
    }
}
