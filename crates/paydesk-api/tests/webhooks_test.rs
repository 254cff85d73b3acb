//! Webhook reconciliation integration tests.
//!
//! Run with: `cargo test -p paydesk-api --test webhooks_test`

mod helpers;

use helpers::auth::TEST_USER_ID;
use helpers::{api_path, fixtures, setup_test_app};
use paydesk_core::models::InvoiceStatus;
use serde_json::{json, Value};

#[tokio::test]
async fn test_tikkie_paid_marks_invoice_paid() {
    let app = setup_test_app().await;
    app.store
        .insert_invoice(fixtures::invoice("inv_1", TEST_USER_ID, InvoiceStatus::Sent));

    let response = app
        .client()
        .post("/tikkie-webhook")
        .json(&json!({
            "paymentRequestUuid": "p1",
            "status": "PAID",
            "externalId": "inv_1"
        }))
        .await;

    assert_eq!(response.status_code(), 200);
    let ack: Value = response.json();
    assert_eq!(ack, json!({"received": true}));

    let invoice = app.store.invoice("inv_1").unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Paid);
    assert!(invoice.paid_at.is_some());
}

#[tokio::test]
async fn test_duplicate_delivery_keeps_invoice_paid() {
    let app = setup_test_app().await;
    app.store
        .insert_invoice(fixtures::invoice("inv_1", TEST_USER_ID, InvoiceStatus::Sent));
    let body = json!({
        "paymentRequestUuid": "p1",
        "status": "PAID",
        "externalId": "inv_1"
    });

    app.client().post("/tikkie-webhook").json(&body).await;
    let first_paid_at = app.store.invoice("inv_1").unwrap().paid_at;

    let response = app.client().post("/tikkie-webhook").json(&body).await;

    assert_eq!(response.status_code(), 200);
    let invoice = app.store.invoice("inv_1").unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Paid);
    assert_eq!(invoice.paid_at, first_paid_at);
}

#[tokio::test]
async fn test_unrecognized_status_leaves_invoice_unchanged() {
    let app = setup_test_app().await;
    app.store
        .insert_invoice(fixtures::invoice("inv_1", TEST_USER_ID, InvoiceStatus::Sent));

    let response = app
        .client()
        .post("/tikkie-webhook")
        .json(&json!({
            "paymentRequestUuid": "p1",
            "status": "SOMETHING_NEW",
            "externalId": "inv_1"
        }))
        .await;

    assert_eq!(response.status_code(), 200);
    let invoice = app.store.invoice("inv_1").unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Sent);
    assert!(invoice.paid_at.is_none());
}

#[tokio::test]
async fn test_malformed_payload_is_rejected() {
    let app = setup_test_app().await;

    let response = app.client().post("/tikkie-webhook").text("not json").await;
    assert_eq!(response.status_code(), 400);
    let error: Value = response.json();
    assert_eq!(error["code"], "WEBHOOK_MALFORMED");

    let response = app
        .client()
        .post("/rabobank-webhook")
        .json(&json!({"status": "ACCEPTED"}))
        .await;
    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_unknown_invoice_is_acknowledged() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post("/tikkie-webhook")
        .json(&json!({
            "paymentRequestUuid": "p404",
            "status": "PAID",
            "externalId": "inv_missing"
        }))
        .await;

    assert_eq!(response.status_code(), 200);
}

#[tokio::test]
async fn test_get_ping_answers_every_provider() {
    let app = setup_test_app().await;

    for provider in ["stripe", "mollie", "rabobank", "tikkie", "paypal"] {
        let response = app.client().get(&format!("/{}-webhook", provider)).await;
        assert_eq!(response.status_code(), 200, "{}", provider);
        let ack: Value = response.json();
        assert_eq!(ack["received"], true);
    }
}

#[tokio::test]
async fn test_rabobank_webhook_under_api_prefix_finds_invoice_by_payment_id() {
    let app = setup_test_app().await;
    let mut invoice = fixtures::invoice("inv_3", TEST_USER_ID, InvoiceStatus::Pending);
    invoice.payment_provider = Some("rabobank".to_string());
    invoice.payment_id = Some("rtp_1".to_string());
    app.store.insert_invoice(invoice);

    let response = app
        .client()
        .post(&api_path("/rabobank-webhook"))
        .json(&json!({"requestId": "rtp_1", "status": "ACCEPTED"}))
        .await;

    assert_eq!(response.status_code(), 200);
    assert_eq!(
        app.store.invoice("inv_3").unwrap().status,
        InvoiceStatus::Paid
    );
}

#[tokio::test]
async fn test_paypal_capture_completed_marks_paid() {
    let app = setup_test_app().await;
    let mut invoice = fixtures::invoice("inv_5", TEST_USER_ID, InvoiceStatus::Pending);
    invoice.payment_id = Some("5O190127TN364715T".to_string());
    app.store.insert_invoice(invoice);

    let response = app
        .client()
        .post("/paypal-webhook")
        .json(&json!({
            "id": "WH-1",
            "event_type": "PAYMENT.CAPTURE.COMPLETED",
            "resource": {
                "id": "3C679366HH908993F",
                "custom_id": "inv_5",
                "supplementary_data": {"related_ids": {"order_id": "5O190127TN364715T"}}
            }
        }))
        .await;

    assert_eq!(response.status_code(), 200);
    assert_eq!(
        app.store.invoice("inv_5").unwrap().status,
        InvoiceStatus::Paid
    );
}

#[tokio::test]
async fn test_paypal_approval_captures_order_and_marks_paid() {
    let mut app = setup_test_app().await;
    app.store.insert_user(fixtures::user(
        TEST_USER_ID,
        json!({"paypal": {"clientId": "pp-client", "clientSecret": "pp-secret"}}),
    ));
    let mut invoice = fixtures::invoice("inv_5", TEST_USER_ID, InvoiceStatus::Sent);
    invoice.payment_provider = Some("paypal".to_string());
    invoice.payment_id = Some("5O190127TN364715T".to_string());
    app.store.insert_invoice(invoice);

    let _token = app
        .provider_api
        .mock("POST", "/v1/oauth2/token")
        .with_body(r#"{"access_token":"A21AA","expires_in":32400}"#)
        .create_async()
        .await;
    let capture = app
        .provider_api
        .mock("POST", "/v2/checkout/orders/5O190127TN364715T/capture")
        .match_header("authorization", "Bearer A21AA")
        .with_status(201)
        .with_body(
            json!({
                "id": "5O190127TN364715T",
                "status": "COMPLETED",
                "purchase_units": [{
                    "reference_id": "inv_5",
                    "payments": {"captures": [{"id": "CAP-1", "status": "COMPLETED"}]}
                }]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let response = app
        .client()
        .post("/paypal-webhook")
        .json(&json!({
            "id": "WH-2",
            "event_type": "CHECKOUT.ORDER.APPROVED",
            "resource": {"id": "5O190127TN364715T"}
        }))
        .await;

    assert_eq!(response.status_code(), 200);
    capture.assert_async().await;
    let invoice = app.store.invoice("inv_5").unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Paid);
    assert!(invoice.paid_at.is_some());
}

#[tokio::test]
async fn test_stripe_session_completed_without_payment_stays_pending() {
    let app = setup_test_app().await;
    app.store
        .insert_invoice(fixtures::invoice("inv_2", TEST_USER_ID, InvoiceStatus::Sent));

    let response = app
        .client()
        .post("/stripe-webhook")
        .json(&json!({
            "id": "evt_sepa",
            "type": "checkout.session.completed",
            "data": {"object": {
                "id": "cs_test_sepa",
                "payment_status": "unpaid",
                "metadata": {"invoiceId": "inv_2"}
            }}
        }))
        .await;

    assert_eq!(response.status_code(), 200);
    let invoice = app.store.invoice("inv_2").unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Pending);
    assert!(invoice.paid_at.is_none());

    app.client()
        .post("/stripe-webhook")
        .json(&json!({
            "id": "evt_settled",
            "type": "checkout.session.async_payment_succeeded",
            "data": {"object": {
                "id": "cs_test_sepa",
                "payment_status": "paid",
                "metadata": {"invoiceId": "inv_2"}
            }}
        }))
        .await;
    assert_eq!(
        app.store.invoice("inv_2").unwrap().status,
        InvoiceStatus::Paid
    );
}

#[tokio::test]
async fn test_mollie_webhook_fetches_status() {
    let mut app = setup_test_app().await;
    app.store.insert_user(fixtures::user(
        TEST_USER_ID,
        json!({"mollie": {"apiKey": "test_user_key"}}),
    ));
    app.store
        .insert_invoice(fixtures::invoice("inv_7", TEST_USER_ID, InvoiceStatus::Pending));
    let fetch = app
        .provider_api
        .mock("GET", "/v2/payments/tr_7")
        .match_header("authorization", "Bearer test_user_key")
        .with_body(
            json!({
                "id": "tr_7",
                "status": "paid",
                "metadata": {"invoiceId": "inv_7", "userId": TEST_USER_ID}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let response = app
        .client()
        .post("/mollie-webhook")
        .add_query_param("userId", TEST_USER_ID)
        .form(&[("id", "tr_7")])
        .await;

    assert_eq!(response.status_code(), 200);
    fetch.assert_async().await;
    let invoice = app.store.invoice("inv_7").unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Paid);
    assert!(invoice.paid_at.is_some());
}

#[tokio::test]
async fn test_mollie_fetch_failure_is_still_acknowledged() {
    let mut app = setup_test_app().await;
    app.store.insert_user(fixtures::user(
        TEST_USER_ID,
        json!({"mollie": {"apiKey": "test_user_key"}}),
    ));
    app.store
        .insert_invoice(fixtures::invoice("inv_7", TEST_USER_ID, InvoiceStatus::Pending));
    let _fetch = app
        .provider_api
        .mock("GET", "/v2/payments/tr_7")
        .with_status(404)
        .with_body(r#"{"status":404,"title":"Not Found","detail":"No payment exists with token tr_7."}"#)
        .create_async()
        .await;

    let response = app
        .client()
        .post("/mollie-webhook")
        .add_query_param("userId", TEST_USER_ID)
        .form(&[("id", "tr_7")])
        .await;

    assert_eq!(response.status_code(), 200);
    assert_eq!(
        app.store.invoice("inv_7").unwrap().status,
        InvoiceStatus::Pending
    );
}
