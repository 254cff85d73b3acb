use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use utoipa::ToSchema;

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

use crate::models::Provider;

/// Keys inside a provider settings object whose values are never echoed back.
pub const SECRET_SETTING_KEYS: &[&str] = &[
    "secretKey",
    "apiKey",
    "appToken",
    "clientSecret",
    "webhookSecret",
];

/// Account of a business issuing invoices.
///
/// `payment_settings` is a JSON object keyed by provider
/// (`{"mollie": {"apiKey": "..."}, "stripe": {"accountId": "..."}}`).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub company_name: Option<String>,
    #[cfg_attr(feature = "sqlx", sqlx(json))]
    #[schema(value_type = Object)]
    pub payment_settings: JsonValue,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Settings object for one provider, if the user saved any.
    pub fn provider_settings(&self, provider: Provider) -> Option<&Map<String, JsonValue>> {
        self.payment_settings
            .get(provider.as_str())
            .and_then(JsonValue::as_object)
    }

    /// A string setting for one provider, ignoring blank values.
    pub fn provider_setting(&self, provider: Provider, key: &str) -> Option<&str> {
        self.provider_settings(provider)?
            .get(key)
            .and_then(JsonValue::as_str)
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    /// Payment settings with secret values replaced by a mask.
    pub fn redacted_payment_settings(&self) -> JsonValue {
        let mut settings = self.payment_settings.clone();
        if let Some(providers) = settings.as_object_mut() {
            for provider_settings in providers.values_mut() {
                if let Some(fields) = provider_settings.as_object_mut() {
                    for (key, value) in fields.iter_mut() {
                        if SECRET_SETTING_KEYS.contains(&key.as_str()) && value.is_string() {
                            *value = JsonValue::String(mask_secret(value.as_str().unwrap_or("")));
                        }
                    }
                }
            }
        }
        settings
    }
}

fn mask_secret(secret: &str) -> String {
    let tail: String = secret
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    if secret.chars().count() <= 8 {
        "****".to_string()
    } else {
        format!("****{}", tail)
    }
}

/// Merge `patch` into the provider's settings object. `null` values remove keys.
pub fn merge_provider_settings(
    settings: &mut JsonValue,
    provider: Provider,
    patch: Map<String, JsonValue>,
) {
    if !settings.is_object() {
        *settings = JsonValue::Object(Map::new());
    }
    let Some(root) = settings.as_object_mut() else {
        return;
    };
    let entry = root
        .entry(provider.as_str().to_string())
        .or_insert_with(|| JsonValue::Object(Map::new()));
    if !entry.is_object() {
        *entry = JsonValue::Object(Map::new());
    }
    if let Some(fields) = entry.as_object_mut() {
        for (key, value) in patch {
            if value.is_null() {
                fields.remove(&key);
            } else {
                fields.insert(key, value);
            }
        }
    }
}
