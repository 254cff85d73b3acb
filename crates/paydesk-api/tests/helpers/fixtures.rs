use chrono::{NaiveDate, Utc};
use paydesk_core::models::{Client, Invoice, InvoiceStatus, LineItem, User};
use rust_decimal_macros::dec;
use serde_json::Value as JsonValue;

pub fn user(id: &str, payment_settings: JsonValue) -> User {
    User {
        id: id.to_string(),
        email: format!("{}@example.com", id),
        company_name: Some("Acme BV".to_string()),
        payment_settings,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn line_item() -> LineItem {
    LineItem {
        description: "Consulting".to_string(),
        quantity: dec!(2),
        unit_price: dec!(50),
        vat_rate: dec!(21),
        product_id: None,
    }
}

/// Invoice of 121.00 EUR in the given status.
pub fn invoice(id: &str, user_id: &str, status: InvoiceStatus) -> Invoice {
    let mut invoice = Invoice::new_draft(
        id.to_string(),
        user_id.to_string(),
        None,
        format!("INV-{}", id),
        vec![line_item()],
        "EUR".to_string(),
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 3, 31),
        None,
    )
    .unwrap();
    invoice.status = status;
    invoice
}

pub fn client(id: &str, user_id: &str) -> Client {
    Client {
        id: id.to_string(),
        user_id: user_id.to_string(),
        name: "Globex".to_string(),
        email: Some("billing@globex.example".to_string()),
        address: None,
        vat_number: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}
