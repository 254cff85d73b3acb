//! API constants
//!
//! Routes are versioned under `/api/{version}`. The payment provider
//! endpoints are additionally mounted at the root for existing callers.

/// API base path prefix (version-independent)
pub const API_BASE: &str = "/api";

pub const API_VERSION: &str = "v0";

/// Versioned prefix, e.g. `/api/v0`
pub const API_PREFIX: &str = "/api/v0";

/// Where the OpenAPI document is served
pub const OPENAPI_JSON_PATH: &str = "/api/openapi.json";

/// Upper bound on request bodies; invoices and webhooks are small JSON documents.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// How long a Stripe Connect consent link stays usable
pub const CONNECT_STATE_TTL_MINUTES: i64 = 15;

/// In-flight request cap across the whole router
pub const MAX_CONCURRENT_REQUESTS: usize = 10_000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_matches_version() {
        assert_eq!(API_PREFIX, format!("{}/{}", API_BASE, API_VERSION));
    }
}
