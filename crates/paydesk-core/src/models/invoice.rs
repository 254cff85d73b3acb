use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;
use validator::Validate;

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

use crate::error::AppError;

/// Invoice lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "invoice_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Pending,
    Paid,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    /// Statuses in which the invoice is still waiting for money.
    pub fn is_outstanding(&self) -> bool {
        matches!(
            self,
            InvoiceStatus::Sent | InvoiceStatus::Pending | InvoiceStatus::Overdue
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, InvoiceStatus::Paid | InvoiceStatus::Cancelled)
    }
}

impl Display for InvoiceStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            InvoiceStatus::Draft => write!(f, "draft"),
            InvoiceStatus::Sent => write!(f, "sent"),
            InvoiceStatus::Pending => write!(f, "pending"),
            InvoiceStatus::Paid => write!(f, "paid"),
            InvoiceStatus::Overdue => write!(f, "overdue"),
            InvoiceStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for InvoiceStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(InvoiceStatus::Draft),
            "sent" => Ok(InvoiceStatus::Sent),
            "pending" => Ok(InvoiceStatus::Pending),
            "paid" => Ok(InvoiceStatus::Paid),
            "overdue" => Ok(InvoiceStatus::Overdue),
            "cancelled" => Ok(InvoiceStatus::Cancelled),
            _ => Err(AppError::InvalidInput(format!(
                "Invalid invoice status: {}",
                s
            ))),
        }
    }
}

/// A single invoice line. `vat_rate` is a percentage (21 means 21%).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    #[validate(length(min = 1, max = 500))]
    pub description: String,
    #[schema(value_type = f64)]
    pub quantity: Decimal,
    #[schema(value_type = f64)]
    pub unit_price: Decimal,
    #[serde(default)]
    #[schema(value_type = f64)]
    pub vat_rate: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
}

impl LineItem {
    pub fn net_total(&self) -> Result<Decimal, AppError> {
        self.quantity
            .checked_mul(self.unit_price)
            .ok_or_else(|| AppError::InvalidInput("Line total is out of range".to_string()))
    }

    pub fn vat(&self) -> Result<Decimal, AppError> {
        self.net_total()?
            .checked_mul(self.vat_rate)
            .map(|v| round_money(v / Decimal::ONE_HUNDRED))
            .ok_or_else(|| AppError::InvalidInput("Line VAT is out of range".to_string()))
    }
}

/// Computed amounts of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvoiceTotals {
    pub subtotal: Decimal,
    pub vat_amount: Decimal,
    pub total: Decimal,
}

/// Largest amount a `NUMERIC(12, 2)` money column holds.
pub fn max_money_amount() -> Decimal {
    Decimal::new(999_999_999_999, 2)
}

const MAX_QUANTITY: i64 = 1_000_000;

pub(crate) fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn checked_sum(values: impl IntoIterator<Item = Decimal>) -> Result<Decimal, AppError> {
    values.into_iter().try_fold(Decimal::ZERO, |acc, v| {
        acc.checked_add(v)
            .ok_or_else(|| AppError::InvalidInput("Invoice total is out of range".to_string()))
    })
}

/// Compute subtotal, VAT and total. VAT is rounded per line.
///
/// Fails when the total does not fit a money column.
pub fn compute_totals(items: &[LineItem]) -> Result<InvoiceTotals, AppError> {
    let nets = items
        .iter()
        .map(LineItem::net_total)
        .collect::<Result<Vec<_>, _>>()?;
    let vats = items
        .iter()
        .map(LineItem::vat)
        .collect::<Result<Vec<_>, _>>()?;

    let subtotal = round_money(checked_sum(nets)?);
    let vat_amount = checked_sum(vats)?;
    let total = checked_sum([subtotal, vat_amount])?;
    if total > max_money_amount() {
        return Err(AppError::InvalidInput(format!(
            "Invoice total cannot exceed {}",
            max_money_amount()
        )));
    }

    Ok(InvoiceTotals {
        subtotal,
        vat_amount,
        total,
    })
}

/// Validate line items beyond what the derive can express.
pub fn validate_line_items(items: &[LineItem]) -> Result<(), AppError> {
    if items.is_empty() {
        return Err(AppError::InvalidInput(
            "An invoice needs at least one line item".to_string(),
        ));
    }
    for (idx, item) in items.iter().enumerate() {
        item.validate()?;
        if item.quantity <= Decimal::ZERO {
            return Err(AppError::InvalidInput(format!(
                "Line {}: quantity must be greater than zero",
                idx + 1
            )));
        }
        if item.quantity > Decimal::from(MAX_QUANTITY) {
            return Err(AppError::InvalidInput(format!(
                "Line {}: quantity cannot exceed {}",
                idx + 1,
                MAX_QUANTITY
            )));
        }
        if item.unit_price < Decimal::ZERO {
            return Err(AppError::InvalidInput(format!(
                "Line {}: unit price cannot be negative",
                idx + 1
            )));
        }
        if item.unit_price > max_money_amount() {
            return Err(AppError::InvalidInput(format!(
                "Line {}: unit price cannot exceed {}",
                idx + 1,
                max_money_amount()
            )));
        }
        if item.vat_rate < Decimal::ZERO || item.vat_rate > Decimal::ONE_HUNDRED {
            return Err(AppError::InvalidInput(format!(
                "Line {}: VAT rate must be between 0 and 100",
                idx + 1
            )));
        }
    }
    Ok(())
}

/// Invoice document
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: String,
    pub user_id: String,
    pub client_id: Option<String>,
    pub invoice_number: String,
    #[cfg_attr(feature = "sqlx", sqlx(json))]
    pub line_items: Vec<LineItem>,
    #[schema(value_type = f64)]
    pub subtotal: Decimal,
    #[schema(value_type = f64)]
    pub vat_amount: Decimal,
    #[schema(value_type = f64)]
    pub total: Decimal,
    pub currency: String,
    pub status: InvoiceStatus,
    pub issue_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub payment_provider: Option<String>,
    pub payment_id: Option<String>,
    pub payment_url: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// Build a new draft invoice with totals computed from its line items.
    #[allow(clippy::too_many_arguments)]
    pub fn new_draft(
        id: String,
        user_id: String,
        client_id: Option<String>,
        invoice_number: String,
        line_items: Vec<LineItem>,
        currency: String,
        issue_date: NaiveDate,
        due_date: Option<NaiveDate>,
        notes: Option<String>,
    ) -> Result<Self, AppError> {
        let totals = compute_totals(&line_items)?;
        let now = Utc::now();
        Ok(Self {
            id,
            user_id,
            client_id,
            invoice_number,
            line_items,
            subtotal: totals.subtotal,
            vat_amount: totals.vat_amount,
            total: totals.total,
            currency,
            status: InvoiceStatus::Draft,
            issue_date,
            due_date,
            notes,
            payment_provider: None,
            payment_id: None,
            payment_url: None,
            paid_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn set_line_items(&mut self, items: Vec<LineItem>) -> Result<(), AppError> {
        let totals = compute_totals(&items)?;
        self.line_items = items;
        self.subtotal = totals.subtotal;
        self.vat_amount = totals.vat_amount;
        self.total = totals.total;
        Ok(())
    }

    /// Apply a status reported by a payment provider.
    ///
    /// The write is an unconditional overwrite; `paid_at` is stamped on the
    /// first transition to `paid` and kept on redelivery.
    pub fn apply_status(&mut self, status: InvoiceStatus, at: DateTime<Utc>) {
        self.status = status;
        if status == InvoiceStatus::Paid && self.paid_at.is_none() {
            self.paid_at = Some(at);
        }
        self.updated_at = at;
    }

    pub fn is_overdue_on(&self, today: NaiveDate) -> bool {
        matches!(self.status, InvoiceStatus::Sent | InvoiceStatus::Pending)
            && self.due_date.is_some_and(|due| due < today)
    }
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceRequest {
    pub client_id: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub invoice_number: Option<String>,
    pub line_items: Vec<LineItem>,
    #[validate(length(equal = 3))]
    pub currency: Option<String>,
    pub issue_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInvoiceRequest {
    pub client_id: Option<String>,
    pub line_items: Option<Vec<LineItem>>,
    pub due_date: Option<NaiveDate>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct InvoiceListQuery {
    pub status: Option<InvoiceStatus>,
}
