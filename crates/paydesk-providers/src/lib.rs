//! Paydesk payment provider adapters
//!
//! One adapter per external payment API behind the `PaymentProvider` trait,
//! plus the pieces every adapter shares: credential resolution, the OAuth
//! token cache and the status tables that map provider vocabularies onto
//! the invoice lifecycle.

pub mod credentials;
pub mod http;
pub mod mollie;
pub mod paypal;
pub mod provider;
pub mod rabobank;
pub mod registry;
pub mod status;
pub mod stripe;
pub mod tikkie;
pub mod token_cache;

pub use credentials::{CredentialResolver, ResolvedCredentials};
pub use provider::{CallbackUrls, PaymentProvider, WebhookRequest};
pub use registry::ProviderRegistry;
pub use status::map_status;
pub use stripe::{AccountStatus, StripeProvider};
pub use token_cache::TokenCache;

use anyhow::Result;
use paydesk_core::Config;
use std::sync::Arc;
use std::time::Duration;

/// Build every adapter from configuration.
///
/// Stripe is also returned concretely because the Connect endpoints use
/// methods outside the `PaymentProvider` trait.
pub async fn build_providers(config: &Config) -> Result<(ProviderRegistry, Arc<StripeProvider>)> {
    let http_client = http::build_client(Duration::from_secs(config.provider_http_timeout_secs))?;
    let urls = CallbackUrls {
        app_url: config.app_url.clone(),
        api_public_url: config.api_public_url.clone(),
    };
    let defaults = &config.providers;

    let stripe = Arc::new(StripeProvider::new(
        http_client.clone(),
        defaults.stripe.clone(),
        urls.clone(),
    ));

    let registry = ProviderRegistry::new();
    registry.register(stripe.clone()).await;
    registry
        .register(Arc::new(mollie::MollieProvider::new(
            http_client.clone(),
            defaults.mollie.clone(),
            urls.clone(),
        )))
        .await;
    registry
        .register(Arc::new(rabobank::RabobankProvider::new(
            http_client.clone(),
            defaults.rabobank.clone(),
            urls.clone(),
            TokenCache::new(),
        )))
        .await;
    registry
        .register(Arc::new(tikkie::TikkieProvider::new(
            http_client.clone(),
            defaults.tikkie.clone(),
        )))
        .await;
    registry
        .register(Arc::new(paypal::PaypalProvider::new(
            http_client,
            defaults.paypal.clone(),
            urls,
            TokenCache::new(),
        )))
        .await;

    tracing::info!(providers = ?registry.list().await, "Payment providers ready");
    Ok((registry, stripe))
}
