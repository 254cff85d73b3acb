//! Credential resolution
//!
//! A user's saved settings (`payment_settings.<provider>`) are overlaid on the
//! process-wide defaults field by field; user values win.

use paydesk_core::models::{Provider, ProviderMode, User};
use paydesk_core::{AppError, ProviderDefaults};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter, Result as FmtResult};

/// Credential fields after merging user settings over defaults.
#[derive(Clone)]
pub struct ResolvedCredentials {
    provider: Provider,
    mode: ProviderMode,
    fields: BTreeMap<String, String>,
}

impl ResolvedCredentials {
    pub fn new(provider: Provider, mode: ProviderMode) -> Self {
        Self {
            provider,
            mode,
            fields: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn mode(&self) -> ProviderMode {
        self.mode
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// A field that must be present; absent fields read as not configured.
    pub fn require(&self, key: &str) -> Result<&str, AppError> {
        self.get(key)
            .ok_or_else(|| AppError::not_configured(self.provider, format!("missing {}", key)))
    }

    fn missing(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|key| self.get(key).is_none())
            .map(|key| key.to_string())
            .collect()
    }
}

impl Debug for ResolvedCredentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        // Field names only; values are secrets.
        f.debug_struct("ResolvedCredentials")
            .field("provider", &self.provider)
            .field("mode", &self.mode)
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Merges user payment settings over environment defaults.
#[derive(Clone, Debug)]
pub struct CredentialResolver {
    defaults: ProviderDefaults,
}

impl CredentialResolver {
    pub fn new(defaults: ProviderDefaults) -> Self {
        Self { defaults }
    }

    /// Resolve without checking for required fields.
    pub fn resolve(&self, provider: Provider, user: Option<&User>) -> ResolvedCredentials {
        let mut fields = BTreeMap::new();
        for (key, value) in self.default_fields(provider) {
            if let Some(value) = value {
                fields.insert(key.to_string(), value);
            }
        }

        let user_settings = user.and_then(|u| u.provider_settings(provider));
        if let Some(settings) = user_settings {
            for (key, value) in settings {
                let value = match value {
                    JsonValue::String(s) if !s.trim().is_empty() => s.trim().to_string(),
                    JsonValue::Bool(b) => b.to_string(),
                    JsonValue::Number(n) => n.to_string(),
                    _ => continue,
                };
                fields.insert(key.clone(), value);
            }
        }

        let mode = match fields.get("sandbox").map(String::as_str) {
            Some(flag) => ProviderMode::from_sandbox_flag(matches!(flag, "true" | "1" | "yes")),
            None => self.default_mode(provider, &fields),
        };

        ResolvedCredentials {
            provider,
            mode,
            fields,
        }
    }

    /// Resolve and fail with `ProviderNotConfigured` naming every missing field.
    pub fn resolve_required(
        &self,
        provider: Provider,
        user: Option<&User>,
        required: &[&str],
    ) -> Result<ResolvedCredentials, AppError> {
        let credentials = self.resolve(provider, user);
        let missing = credentials.missing(required);
        if !missing.is_empty() {
            return Err(AppError::not_configured(
                provider,
                format!("missing {}", missing.join(", ")),
            ));
        }
        Ok(credentials)
    }

    fn default_fields(&self, provider: Provider) -> Vec<(&'static str, Option<String>)> {
        let d = &self.defaults;
        match provider {
            Provider::Stripe => vec![
                ("secretKey", d.stripe.secret_key.clone()),
                ("clientId", d.stripe.client_id.clone()),
                ("webhookSecret", d.stripe.webhook_secret.clone()),
            ],
            Provider::Mollie => vec![("apiKey", d.mollie.api_key.clone())],
            Provider::Rabobank => vec![
                ("clientId", d.rabobank.client_id.clone()),
                ("clientSecret", d.rabobank.client_secret.clone()),
            ],
            Provider::Tikkie => vec![
                ("apiKey", d.tikkie.api_key.clone()),
                ("appToken", d.tikkie.app_token.clone()),
            ],
            Provider::Paypal => vec![
                ("clientId", d.paypal.client_id.clone()),
                ("clientSecret", d.paypal.client_secret.clone()),
            ],
        }
    }

    fn default_mode(&self, provider: Provider, fields: &BTreeMap<String, String>) -> ProviderMode {
        let d = &self.defaults;
        match provider {
            Provider::Rabobank => ProviderMode::from_sandbox_flag(d.rabobank.sandbox),
            Provider::Tikkie => ProviderMode::from_sandbox_flag(d.tikkie.sandbox),
            Provider::Paypal => ProviderMode::from_sandbox_flag(d.paypal.sandbox),
            // Key prefixes tell test keys apart.
            Provider::Stripe => ProviderMode::from_sandbox_flag(
                fields
                    .get("secretKey")
                    .is_some_and(|k| k.starts_with("sk_test_") || k.starts_with("rk_test_")),
            ),
            Provider::Mollie => ProviderMode::from_sandbox_flag(
                fields.get("apiKey").is_some_and(|k| k.starts_with("test_")),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn user(settings: JsonValue) -> User {
        User {
            id: "user_1".to_string(),
            email: "owner@example.com".to_string(),
            company_name: Some("Acme".to_string()),
            payment_settings: settings,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn resolver() -> CredentialResolver {
        let mut defaults = ProviderDefaults::default();
        defaults.mollie.api_key = Some("live_env_key".to_string());
        defaults.tikkie.api_key = Some("env-api-key".to_string());
        defaults.tikkie.app_token = Some("env-app-token".to_string());
        CredentialResolver::new(defaults)
    }

    #[test]
    fn test_user_settings_override_defaults() {
        let u = user(json!({"mollie": {"apiKey": "test_user_key"}}));
        let creds = resolver().resolve(Provider::Mollie, Some(&u));
        assert_eq!(creds.get("apiKey"), Some("test_user_key"));
        assert_eq!(creds.mode(), ProviderMode::Sandbox);

        let creds = resolver().resolve(Provider::Mollie, None);
        assert_eq!(creds.get("apiKey"), Some("live_env_key"));
        assert_eq!(creds.mode(), ProviderMode::Production);
    }

    #[test]
    fn test_override_is_field_by_field() {
        let u = user(json!({"tikkie": {"appToken": "user-token", "apiKey": ""}}));
        let creds = resolver().resolve(Provider::Tikkie, Some(&u));
        assert_eq!(creds.get("appToken"), Some("user-token"));
        // blank user values do not mask defaults
        assert_eq!(creds.get("apiKey"), Some("env-api-key"));
    }

    #[test]
    fn test_missing_required_fields_are_named() {
        let err = resolver()
            .resolve_required(Provider::Rabobank, None, &["clientId", "clientSecret"])
            .unwrap_err();
        match err {
            AppError::ProviderNotConfigured { provider, message } => {
                assert_eq!(provider, Provider::Rabobank);
                assert!(message.contains("clientId"));
                assert!(message.contains("clientSecret"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_user_sandbox_flag_selects_mode() {
        let u = user(json!({"rabobank": {"clientId": "c", "clientSecret": "s", "sandbox": false}}));
        let creds = resolver()
            .resolve_required(Provider::Rabobank, Some(&u), &["clientId", "clientSecret"])
            .unwrap();
        assert_eq!(creds.mode(), ProviderMode::Production);
    }

    #[test]
    fn test_debug_hides_values() {
        let creds = ResolvedCredentials::new(Provider::Stripe, ProviderMode::Sandbox)
            .with("secretKey", "sk_test_supersecret");
        let printed = format!("{:?}", creds);
        assert!(printed.contains("secretKey"));
        assert!(!printed.contains("supersecret"));
    }
}
