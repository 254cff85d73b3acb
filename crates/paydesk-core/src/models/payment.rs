use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::models::invoice::{max_money_amount, round_money};

/// Payment providers an invoice can be collected through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Card processor with connected accounts
    Stripe,
    /// European direct-payment provider
    Mollie,
    /// Regional bank request-to-pay
    Rabobank,
    /// Mobile payment requests
    Tikkie,
    /// Wallet-based checkout
    Paypal,
}

impl Provider {
    pub const ALL: [Provider; 5] = [
        Provider::Stripe,
        Provider::Mollie,
        Provider::Rabobank,
        Provider::Tikkie,
        Provider::Paypal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Stripe => "stripe",
            Provider::Mollie => "mollie",
            Provider::Rabobank => "rabobank",
            Provider::Tikkie => "tikkie",
            Provider::Paypal => "paypal",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Stripe => "Stripe",
            Provider::Mollie => "Mollie",
            Provider::Rabobank => "Rabobank",
            Provider::Tikkie => "Tikkie",
            Provider::Paypal => "PayPal",
        }
    }
}

impl Display for Provider {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Provider {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stripe" => Ok(Provider::Stripe),
            "mollie" => Ok(Provider::Mollie),
            "rabobank" => Ok(Provider::Rabobank),
            "tikkie" => Ok(Provider::Tikkie),
            "paypal" => Ok(Provider::Paypal),
            other => Err(AppError::BadRequest(format!(
                "Unknown payment provider: {}",
                other
            ))),
        }
    }
}

/// Endpoint set a provider call goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderMode {
    Sandbox,
    Production,
}

impl ProviderMode {
    pub fn from_sandbox_flag(sandbox: bool) -> Self {
        if sandbox {
            ProviderMode::Sandbox
        } else {
            ProviderMode::Production
        }
    }

    pub fn is_sandbox(&self) -> bool {
        matches!(self, ProviderMode::Sandbox)
    }
}

impl Display for ProviderMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ProviderMode::Sandbox => write!(f, "sandbox"),
            ProviderMode::Production => write!(f, "production"),
        }
    }
}

/// Body of `POST /create-{provider}-payment`.
///
/// Every field is optional at the serde level so that a missing field is
/// reported as `MISSING_FIELD` rather than a generic body rejection.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub invoice_id: Option<String>,
    /// Number or numeric string, in major units (e.g. `12.50`)
    #[schema(value_type = Option<f64>)]
    pub amount: Option<JsonValue>,
    pub description: Option<String>,
    pub user_id: Option<String>,
    pub client_id: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<JsonValue>,
}

/// Validated, provider-agnostic payment parameters.
#[derive(Debug, Clone)]
pub struct CreatePaymentParams {
    pub invoice_id: String,
    pub amount: Decimal,
    pub description: String,
    pub user_id: String,
    pub client_id: Option<String>,
    pub metadata: JsonValue,
    pub currency: String,
}

impl CreatePaymentParams {
    /// Amount in minor units (cents), as most provider APIs expect.
    pub fn amount_in_cents(&self) -> Result<i64, AppError> {
        self.amount
            .checked_mul(Decimal::ONE_HUNDRED)
            .map(|cents| cents.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
            .and_then(|cents| i64::try_from(cents).ok())
            .ok_or_else(|| AppError::InvalidAmount(format!("{} is out of range", self.amount)))
    }

    /// Amount formatted with exactly two decimals (e.g. `"10.00"`).
    pub fn amount_string(&self) -> String {
        format!("{:.2}", round_money(self.amount))
    }
}

fn non_blank(value: Option<String>, field: &str) -> Result<String, AppError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(AppError::missing_field(field)),
    }
}

/// Parse an amount from JSON, accepting numbers and numeric strings.
pub fn parse_amount(value: &JsonValue) -> Result<Decimal, AppError> {
    let amount = match value {
        JsonValue::Number(n) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .map_err(|_| AppError::InvalidAmount(format!("{} is not a valid amount", n)))?,
        JsonValue::String(s) => Decimal::from_str(s.trim())
            .map_err(|_| AppError::InvalidAmount(format!("'{}' is not a number", s)))?,
        other => {
            return Err(AppError::InvalidAmount(format!(
                "expected a number, got {}",
                other
            )))
        }
    };

    if amount <= Decimal::ZERO {
        return Err(AppError::InvalidAmount(
            "amount must be greater than zero".to_string(),
        ));
    }
    if amount.round_dp(2) <= Decimal::ZERO {
        return Err(AppError::InvalidAmount(
            "amount is smaller than one cent".to_string(),
        ));
    }
    if amount > max_money_amount() {
        return Err(AppError::InvalidAmount(format!(
            "amount cannot exceed {}",
            max_money_amount()
        )));
    }

    Ok(amount)
}

impl CreatePaymentRequest {
    /// Validate presence and shape of the fields. Performs no I/O.
    pub fn into_params(self, currency: &str) -> Result<CreatePaymentParams, AppError> {
        let invoice_id = non_blank(self.invoice_id, "invoiceId")?;
        let amount = self
            .amount
            .filter(|v| !v.is_null())
            .ok_or_else(|| AppError::missing_field("amount"))?;
        let description = non_blank(self.description, "description")?;
        let user_id = non_blank(self.user_id, "userId")?;
        let amount = parse_amount(&amount)?;

        Ok(CreatePaymentParams {
            invoice_id,
            amount,
            description,
            user_id,
            client_id: self.client_id.filter(|c| !c.trim().is_empty()),
            metadata: self.metadata.unwrap_or(JsonValue::Null),
            currency: currency.to_string(),
        })
    }
}

/// Normalized result of a create-payment call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResult {
    pub payment_id: String,
    pub payment_url: String,
    pub status: String,
}

/// Normalized webhook notification: `{paymentId, status, invoiceId?}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WebhookNotification {
    pub payment_id: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<String>,
}
