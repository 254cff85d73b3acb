//! Test helpers: build AppState and router for integration tests.
//!
//! The router runs over the in-memory stores; every provider base URL points
//! at one mockito server so external calls can be asserted.
//!
//! Run from workspace root: `cargo test -p paydesk-api`.

#![allow(dead_code)]

pub mod auth;
pub mod fixtures;

use axum_test::TestServer;
use paydesk_api::constants;
use paydesk_api::setup::{routes, services};
use paydesk_api::state::DbState;
use paydesk_core::Config;
use paydesk_db::InMemoryStore;
use std::sync::Arc;

/// API path prefix for tests (e.g. `/api/v0`).
pub fn api_path(path: &str) -> String {
    format!("{}{}", constants::API_PREFIX, path)
}

/// Test application: server, backing store and the fake provider API.
pub struct TestApp {
    pub server: TestServer,
    pub store: InMemoryStore,
    pub provider_api: mockito::ServerGuard,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

/// Configuration with every provider pointed at `base`.
pub fn create_test_config(base: &str) -> Config {
    let mut config = Config::for_tests();
    let providers = &mut config.providers;
    providers.stripe.api_base = base.to_string();
    providers.stripe.connect_base = base.to_string();
    providers.stripe.client_id = Some("ca_test".to_string());
    providers.mollie.api_base = base.to_string();
    for modal in [&mut providers.rabobank, &mut providers.paypal] {
        modal.sandbox_base = base.to_string();
        modal.production_base = base.to_string();
    }
    providers.tikkie.sandbox_base = base.to_string();
    providers.tikkie.production_base = base.to_string();
    config
}

/// Setup a test app with an empty in-memory store.
pub async fn setup_test_app() -> TestApp {
    let provider_api = mockito::Server::new_async().await;
    let config = create_test_config(&provider_api.url());
    let store = InMemoryStore::new();

    let db = DbState {
        pool: None,
        invoices: Arc::new(store.clone()),
        users: Arc::new(store.clone()),
        clients: Arc::new(store.clone()),
        products: Arc::new(store.clone()),
    };
    let state = services::build_state(&config, db)
        .await
        .expect("Failed to build application state");
    let router = routes::setup_routes(&config, state).expect("Failed to build router");
    let server = TestServer::new(router).expect("Failed to create test server");

    TestApp {
        server,
        store,
        provider_api,
    }
}
