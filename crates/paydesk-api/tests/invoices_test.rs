//! Invoice, client, product and settings API integration tests.
//!
//! Run with: `cargo test -p paydesk-api --test invoices_test`

mod helpers;

use helpers::auth::{bearer, OTHER_USER_ID, TEST_USER_ID};
use helpers::{api_path, fixtures, setup_test_app};
use paydesk_core::models::InvoiceStatus;
use serde_json::{json, Value};

fn invoice_body() -> Value {
    json!({
        "invoiceNumber": "2024-001",
        "lineItems": [
            {"description": "Consulting", "quantity": 2, "unitPrice": 50, "vatRate": 21},
            {"description": "Travel", "quantity": 1, "unitPrice": 30, "vatRate": 0}
        ],
        "issueDate": "2024-03-01",
        "dueDate": "2024-03-31"
    })
}

#[tokio::test]
async fn test_create_invoice_computes_totals() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post(&api_path("/invoices"))
        .add_header("Authorization", bearer(TEST_USER_ID))
        .json(&invoice_body())
        .await;

    assert_eq!(response.status_code(), 201);
    let invoice: Value = response.json();
    assert_eq!(invoice["status"], "draft");
    assert_eq!(invoice["currency"], "EUR");
    assert_eq!(invoice["userId"], TEST_USER_ID);
    assert_eq!(invoice["subtotal"].as_f64(), Some(130.0));
    assert_eq!(invoice["vatAmount"].as_f64(), Some(21.0));
    assert_eq!(invoice["total"].as_f64(), Some(151.0));
    assert!(invoice["id"].as_str().unwrap().starts_with("inv_"));
}

#[tokio::test]
async fn test_create_invoice_rejects_bad_input() {
    let app = setup_test_app().await;

    let mut empty = invoice_body();
    empty["lineItems"] = json!([]);
    let response = app
        .client()
        .post(&api_path("/invoices"))
        .add_header("Authorization", bearer(TEST_USER_ID))
        .json(&empty)
        .await;
    assert_eq!(response.status_code(), 400);

    let mut backwards = invoice_body();
    backwards["dueDate"] = json!("2024-02-01");
    let response = app
        .client()
        .post(&api_path("/invoices"))
        .add_header("Authorization", bearer(TEST_USER_ID))
        .json(&backwards)
        .await;
    assert_eq!(response.status_code(), 400);

    let mut unknown_client = invoice_body();
    unknown_client["clientId"] = json!("cli_missing");
    let response = app
        .client()
        .post(&api_path("/invoices"))
        .add_header("Authorization", bearer(TEST_USER_ID))
        .json(&unknown_client)
        .await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_invoices_are_scoped_to_owner() {
    let app = setup_test_app().await;
    app.store
        .insert_invoice(fixtures::invoice("inv_1", TEST_USER_ID, InvoiceStatus::Sent));

    let response = app
        .client()
        .get(&api_path("/invoices/inv_1"))
        .add_header("Authorization", bearer(OTHER_USER_ID))
        .await;
    assert_eq!(response.status_code(), 404);

    let response = app
        .client()
        .get(&api_path("/invoices"))
        .add_header("Authorization", bearer(OTHER_USER_ID))
        .await;
    assert_eq!(response.status_code(), 200);
    let invoices: Vec<Value> = response.json();
    assert!(invoices.is_empty());

    let response = app
        .client()
        .get(&api_path("/invoices/inv_1"))
        .add_header("Authorization", bearer(TEST_USER_ID))
        .await;
    assert_eq!(response.status_code(), 200);
}

#[tokio::test]
async fn test_list_filters_by_status() {
    let app = setup_test_app().await;
    app.store
        .insert_invoice(fixtures::invoice("inv_1", TEST_USER_ID, InvoiceStatus::Sent));
    app.store
        .insert_invoice(fixtures::invoice("inv_2", TEST_USER_ID, InvoiceStatus::Paid));

    let response = app
        .client()
        .get(&api_path("/invoices"))
        .add_query_param("status", "paid")
        .add_header("Authorization", bearer(TEST_USER_ID))
        .await;

    assert_eq!(response.status_code(), 200);
    let invoices: Vec<Value> = response.json();
    assert_eq!(invoices.len(), 1);
    assert_eq!(invoices[0]["id"], "inv_2");
}

#[tokio::test]
async fn test_send_and_cancel_lifecycle() {
    let app = setup_test_app().await;
    app.store
        .insert_invoice(fixtures::invoice("inv_1", TEST_USER_ID, InvoiceStatus::Draft));

    let response = app
        .client()
        .post(&api_path("/invoices/inv_1/send"))
        .add_header("Authorization", bearer(TEST_USER_ID))
        .await;
    assert_eq!(response.status_code(), 200);
    let invoice: Value = response.json();
    assert_eq!(invoice["status"], "sent");

    let response = app
        .client()
        .post(&api_path("/invoices/inv_1/send"))
        .add_header("Authorization", bearer(TEST_USER_ID))
        .await;
    assert_eq!(response.status_code(), 400);

    let response = app
        .client()
        .post(&api_path("/invoices/inv_1/cancel"))
        .add_header("Authorization", bearer(TEST_USER_ID))
        .await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(
        app.store.invoice("inv_1").unwrap().status,
        InvoiceStatus::Cancelled
    );

    let response = app
        .client()
        .post(&api_path("/invoices/inv_1/cancel"))
        .add_header("Authorization", bearer(TEST_USER_ID))
        .await;
    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_line_items_locked_after_sending() {
    let app = setup_test_app().await;
    app.store
        .insert_invoice(fixtures::invoice("inv_1", TEST_USER_ID, InvoiceStatus::Draft));
    app.store
        .insert_invoice(fixtures::invoice("inv_2", TEST_USER_ID, InvoiceStatus::Sent));
    let update = json!({
        "lineItems": [{"description": "Design", "quantity": 1, "unitPrice": 200, "vatRate": 21}],
        "notes": "Thanks"
    });

    let response = app
        .client()
        .put(&api_path("/invoices/inv_1"))
        .add_header("Authorization", bearer(TEST_USER_ID))
        .json(&update)
        .await;
    assert_eq!(response.status_code(), 200);
    let invoice: Value = response.json();
    assert_eq!(invoice["total"].as_f64(), Some(242.0));
    assert_eq!(invoice["notes"], "Thanks");

    let response = app
        .client()
        .put(&api_path("/invoices/inv_2"))
        .add_header("Authorization", bearer(TEST_USER_ID))
        .json(&update)
        .await;
    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_delete_invoice() {
    let app = setup_test_app().await;
    app.store
        .insert_invoice(fixtures::invoice("inv_1", TEST_USER_ID, InvoiceStatus::Draft));

    let response = app
        .client()
        .delete(&api_path("/invoices/inv_1"))
        .add_header("Authorization", bearer(TEST_USER_ID))
        .await;
    assert_eq!(response.status_code(), 204);

    let response = app
        .client()
        .delete(&api_path("/invoices/inv_1"))
        .add_header("Authorization", bearer(TEST_USER_ID))
        .await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_clients_and_products() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post(&api_path("/clients"))
        .add_header("Authorization", bearer(TEST_USER_ID))
        .json(&json!({"name": "Globex", "email": "billing@globex.example"}))
        .await;
    assert_eq!(response.status_code(), 201);
    let client: Value = response.json();
    let client_id = client["id"].as_str().unwrap().to_string();

    let response = app
        .client()
        .post(&api_path("/clients"))
        .add_header("Authorization", bearer(TEST_USER_ID))
        .json(&json!({"name": "Initech", "email": "not-an-email"}))
        .await;
    assert_eq!(response.status_code(), 400);

    let mut body = invoice_body();
    body["clientId"] = json!(client_id);
    let response = app
        .client()
        .post(&api_path("/invoices"))
        .add_header("Authorization", bearer(TEST_USER_ID))
        .json(&body)
        .await;
    assert_eq!(response.status_code(), 201);

    let response = app
        .client()
        .post(&api_path("/products"))
        .add_header("Authorization", bearer(TEST_USER_ID))
        .json(&json!({"name": "Hourly rate", "unitPrice": 95, "vatRate": 21}))
        .await;
    assert_eq!(response.status_code(), 201);

    let response = app
        .client()
        .post(&api_path("/products"))
        .add_header("Authorization", bearer(TEST_USER_ID))
        .json(&json!({"name": "Refund", "unitPrice": -10}))
        .await;
    assert_eq!(response.status_code(), 400);

    let response = app
        .client()
        .get(&api_path("/products"))
        .add_header("Authorization", bearer(TEST_USER_ID))
        .await;
    let products: Vec<Value> = response.json();
    assert_eq!(products.len(), 1);
}

#[tokio::test]
async fn test_payment_settings_are_merged_and_masked() {
    let app = setup_test_app().await;
    app.store.insert_user(fixtures::user(
        TEST_USER_ID,
        json!({"stripe": {"accountId": "acct_1"}}),
    ));

    let response = app
        .client()
        .put(&api_path("/settings/payments/mollie"))
        .add_header("Authorization", bearer(TEST_USER_ID))
        .json(&json!({"apiKey": "test_abcdefghijkl", "sandbox": true}))
        .await;
    assert_eq!(response.status_code(), 200);
    let settings: Value = response.json();
    assert_eq!(settings["mollie"]["apiKey"], "****ijkl");
    assert_eq!(settings["mollie"]["sandbox"], true);
    assert_eq!(settings["stripe"]["accountId"], "acct_1");

    let stored = app.store.user(TEST_USER_ID).unwrap();
    assert_eq!(
        stored.payment_settings["mollie"]["apiKey"],
        "test_abcdefghijkl"
    );

    let response = app
        .client()
        .get(&api_path("/settings/payments"))
        .add_header("Authorization", bearer(TEST_USER_ID))
        .await;
    assert_eq!(response.status_code(), 200);

    let response = app
        .client()
        .put(&api_path("/settings/payments/venmo"))
        .add_header("Authorization", bearer(TEST_USER_ID))
        .json(&json!({"apiKey": "x"}))
        .await;
    assert_eq!(response.status_code(), 400);

    let response = app
        .client()
        .get(&api_path("/settings/payments"))
        .add_header("Authorization", bearer(OTHER_USER_ID))
        .await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_health_and_openapi() {
    let app = setup_test_app().await;

    let response = app.client().get("/health").await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["status"], "alive");

    let response = app.client().get("/health/ready").await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["database"], "skipped");

    let response = app.client().get("/api/openapi.json").await;
    assert_eq!(response.status_code(), 200);
    let spec: Value = response.json();
    assert!(spec["paths"]["/create-{provider}-payment"].is_object());
}
