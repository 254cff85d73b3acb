//! OpenAPI documentation.
//!
//! Paths under `/api/v0` use a literal version (utoipa needs compile-time
//! strings) and are rewritten to `API_VERSION` when the document is served.

use utoipa::OpenApi;

use crate::constants::API_VERSION;
use crate::error;
use crate::handlers;
use paydesk_core::models;

const OPENAPI_PATH_PLACEHOLDER: &str = "/api/v0";

fn transform_openapi_paths(spec: &mut utoipa::openapi::OpenApi, version: &str) {
    let replacement = format!("/api/{}", version);
    if OPENAPI_PATH_PLACEHOLDER == replacement {
        return;
    }
    let path_map = std::mem::take(&mut spec.paths.paths);
    for (key, item) in path_map {
        let new_key = key.replacen(OPENAPI_PATH_PLACEHOLDER, &replacement, 1);
        spec.paths.paths.insert(new_key, item);
    }
}

/// The OpenAPI document with versioned paths matching the router.
pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    let mut spec = ApiDoc::openapi();
    transform_openapi_paths(&mut spec, API_VERSION);
    spec
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Paydesk API",
        version = "0.1.0",
        description = "Invoicing and payments backend. Creates payment requests at Stripe, Mollie, Rabobank, Tikkie and PayPal and reconciles their webhooks into invoice status. Provider endpoints are served at the root and under /api/v0; invoice management lives under /api/v0."
    ),
    paths(
        // Payments
        handlers::payments::create_payment,
        handlers::webhooks::receive_webhook,
        handlers::webhooks::ping_webhook,
        // Stripe Connect
        handlers::stripe_connect::authorize,
        handlers::stripe_connect::callback,
        handlers::stripe_connect::status,
        handlers::stripe_connect::test_connection,
        // Invoices
        handlers::invoices::create_invoice,
        handlers::invoices::list_invoices,
        handlers::invoices::get_invoice,
        handlers::invoices::update_invoice,
        handlers::invoices::delete_invoice,
        handlers::invoices::send_invoice,
        handlers::invoices::cancel_invoice,
        // Clients
        handlers::clients::create_client,
        handlers::clients::list_clients,
        handlers::clients::get_client,
        handlers::clients::delete_client,
        // Products
        handlers::products::create_product,
        handlers::products::list_products,
        handlers::products::get_product,
        handlers::products::delete_product,
        // Settings
        handlers::settings::get_payment_settings,
        handlers::settings::update_payment_settings,
    ),
    components(
        schemas(
            error::ErrorResponse,
            models::Provider,
            models::CreatePaymentRequest,
            models::PaymentResult,
            models::WebhookNotification,
            models::Invoice,
            models::InvoiceStatus,
            models::LineItem,
            models::CreateInvoiceRequest,
            models::UpdateInvoiceRequest,
            models::Client,
            models::CreateClientRequest,
            models::Product,
            models::CreateProductRequest,
            handlers::webhooks::WebhookAck,
            handlers::stripe_connect::AuthorizeUrlResponse,
            handlers::stripe_connect::StripeStatusResponse,
            handlers::stripe_connect::TestConnectionResponse,
        )
    ),
    tags(
        (name = "payments", description = "Payment requests at external providers"),
        (name = "webhooks", description = "Provider status callbacks"),
        (name = "stripe", description = "Stripe Connect onboarding"),
        (name = "invoices", description = "Invoice management"),
        (name = "clients", description = "Invoice recipients"),
        (name = "products", description = "Catalogue entries for invoice lines"),
        (name = "settings", description = "Per-user provider credentials"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_provider_and_invoice_paths() {
        let spec = get_openapi_spec();
        assert!(spec.paths.paths.contains_key("/create-{provider}-payment"));
        assert!(spec.paths.paths.contains_key("/{provider}-webhook"));
        assert!(spec.paths.paths.contains_key("/api/v0/invoices/{id}/send"));
    }
}
