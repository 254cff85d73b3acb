use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

use crate::error::AppError;
use crate::models::invoice::max_money_amount;

/// A reusable catalogue entry for invoice lines.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    #[schema(value_type = f64)]
    pub unit_price: Decimal,
    #[schema(value_type = f64)]
    pub vat_rate: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[schema(value_type = f64)]
    pub unit_price: Decimal,
    #[serde(default)]
    #[schema(value_type = f64)]
    pub vat_rate: Decimal,
}

impl CreateProductRequest {
    pub fn check_amounts(&self) -> Result<(), AppError> {
        if self.unit_price < Decimal::ZERO {
            return Err(AppError::InvalidInput(
                "unitPrice cannot be negative".to_string(),
            ));
        }
        if self.unit_price > max_money_amount() {
            return Err(AppError::InvalidInput(format!(
                "unitPrice cannot exceed {}",
                max_money_amount()
            )));
        }
        if self.vat_rate < Decimal::ZERO || self.vat_rate > Decimal::ONE_HUNDRED {
            return Err(AppError::InvalidInput(
                "vatRate must be between 0 and 100".to_string(),
            ));
        }
        Ok(())
    }
}
