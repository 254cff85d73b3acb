use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

/// A customer invoices are addressed to.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub vat_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateClientRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 1000))]
    pub address: Option<String>,
    #[validate(length(max = 64))]
    pub vat_number: Option<String>,
}
