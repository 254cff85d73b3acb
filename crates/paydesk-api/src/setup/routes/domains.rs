//! Route groups per domain.
//!
//! Provider endpoints are built once per mount prefix; every provider gets
//! its own concrete path with the `Provider` attached as a request
//! extension.

use crate::constants::API_PREFIX;
use crate::handlers;
use crate::state::AppState;
use axum::routing::{get, post};
use axum::{Extension, Router};
use paydesk_core::models::Provider;
use std::sync::Arc;

/// `POST {prefix}/create-{provider}-payment`
pub fn payment_routes(prefix: &str) -> Router<Arc<AppState>> {
    Provider::ALL
        .into_iter()
        .fold(Router::new(), |router, provider| {
            router.route(
                &format!("{}/create-{}-payment", prefix, provider.as_str()),
                post(handlers::payments::create_payment).layer(Extension(provider)),
            )
        })
}

/// `POST|GET {prefix}/{provider}-webhook`
pub fn webhook_routes(prefix: &str) -> Router<Arc<AppState>> {
    Provider::ALL
        .into_iter()
        .fold(Router::new(), |router, provider| {
            router.route(
                &format!("{}/{}-webhook", prefix, provider.as_str()),
                post(handlers::webhooks::receive_webhook)
                    .get(handlers::webhooks::ping_webhook)
                    .layer(Extension(provider)),
            )
        })
}

/// The OAuth redirect target; Stripe calls it without our bearer token.
pub fn stripe_connect_public_routes(prefix: &str) -> Router<Arc<AppState>> {
    Router::new().route(
        &format!("{}/stripe-connect/callback", prefix),
        get(handlers::stripe_connect::callback),
    )
}

pub fn stripe_connect_routes(prefix: &str) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/stripe-connect/authorize", prefix),
            get(handlers::stripe_connect::authorize),
        )
        .route(
            &format!("{}/stripe-status", prefix),
            get(handlers::stripe_connect::status),
        )
        .route(
            &format!("{}/test-stripe-connection", prefix),
            post(handlers::stripe_connect::test_connection),
        )
}

pub fn invoice_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/invoices", API_PREFIX),
            get(handlers::invoices::list_invoices).post(handlers::invoices::create_invoice),
        )
        .route(
            &format!("{}/invoices/{{id}}", API_PREFIX),
            get(handlers::invoices::get_invoice)
                .put(handlers::invoices::update_invoice)
                .delete(handlers::invoices::delete_invoice),
        )
        .route(
            &format!("{}/invoices/{{id}}/send", API_PREFIX),
            post(handlers::invoices::send_invoice),
        )
        .route(
            &format!("{}/invoices/{{id}}/cancel", API_PREFIX),
            post(handlers::invoices::cancel_invoice),
        )
}

pub fn client_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/clients", API_PREFIX),
            get(handlers::clients::list_clients).post(handlers::clients::create_client),
        )
        .route(
            &format!("{}/clients/{{id}}", API_PREFIX),
            get(handlers::clients::get_client).delete(handlers::clients::delete_client),
        )
}

pub fn product_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/products", API_PREFIX),
            get(handlers::products::list_products).post(handlers::products::create_product),
        )
        .route(
            &format!("{}/products/{{id}}", API_PREFIX),
            get(handlers::products::get_product).delete(handlers::products::delete_product),
        )
}

pub fn settings_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/settings/payments", API_PREFIX),
            get(handlers::settings::get_payment_settings),
        )
        .route(
            &format!("{}/settings/payments/{{provider}}", API_PREFIX),
            axum::routing::put(handlers::settings::update_payment_settings),
        )
}
