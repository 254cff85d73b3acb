//! OAuth access-token cache for client-credentials providers.
//!
//! One token is held per provider mode and client id. A token is handed out
//! until 60 seconds before it expires; lifetimes reported by a provider are
//! capped at a day. The cache is an owned object passed to the adapters that
//! need it.

use paydesk_core::models::ProviderMode;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use paydesk_core::AppError;

const EXPIRY_MARGIN: Duration = Duration::from_secs(60);
const MAX_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

type TokenMap = HashMap<(ProviderMode, String), CachedToken>;

#[derive(Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

#[derive(Clone, Default)]
pub struct TokenCache {
    tokens: Arc<Mutex<TokenMap>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Each entry is written whole, so a panic elsewhere cannot leave the map
    /// half-updated and a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, TokenMap> {
        self.tokens.lock().unwrap_or_else(|poisoned: PoisonError<_>| {
            tracing::warn!("Token cache lock was poisoned; continuing with its contents");
            poisoned.into_inner()
        })
    }

    /// A cached token that is still valid at `now`.
    pub fn get_at(&self, mode: ProviderMode, client_id: &str, now: Instant) -> Option<String> {
        self.lock()
            .get(&(mode, client_id.to_string()))
            .filter(|t| now + EXPIRY_MARGIN < t.expires_at)
            .map(|t| t.access_token.clone())
    }

    pub fn get(&self, mode: ProviderMode, client_id: &str) -> Option<String> {
        self.get_at(mode, client_id, Instant::now())
    }

    pub fn store(
        &self,
        mode: ProviderMode,
        client_id: &str,
        access_token: String,
        expires_in: Duration,
    ) {
        let now = Instant::now();
        let Some(expires_at) = now.checked_add(expires_in.min(MAX_TOKEN_TTL)) else {
            tracing::warn!(mode = %mode, "Token lifetime out of range; not cached");
            return;
        };
        self.lock().insert(
            (mode, client_id.to_string()),
            CachedToken {
                access_token,
                expires_at,
            },
        );
    }

    pub fn invalidate(&self, mode: ProviderMode, client_id: &str) {
        self.lock().remove(&(mode, client_id.to_string()));
    }

    /// Return the cached token or fetch a new one. The lock is not held
    /// while `fetch` runs, so concurrent misses may each fetch.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        mode: ProviderMode,
        client_id: &str,
        fetch: F,
    ) -> Result<String, AppError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(String, Duration), AppError>>,
    {
        if let Some(token) = self.get(mode, client_id) {
            tracing::debug!(mode = %mode, "Using cached access token");
            return Ok(token);
        }

        let (token, expires_in) = fetch().await?;
        self.store(mode, client_id, token.clone(), expires_in);
        tracing::debug!(mode = %mode, expires_in_secs = expires_in.as_secs(), "Fetched new access token");
        Ok(token)
    }
}
