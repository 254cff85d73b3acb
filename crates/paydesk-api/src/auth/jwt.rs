use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use paydesk_core::AppError;

use crate::auth::models::{ConnectStateClaims, JwtClaims};

/// Audience of OAuth `state` tokens; bearer tokens carry none.
const CONNECT_STATE_AUDIENCE: &str = "paydesk:stripe-connect";

/// HS256 signing and verification keys derived from the shared secret.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    state_validation: Validation,
}

impl JwtKeys {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 30;
        let mut state_validation = validation.clone();
        state_validation.set_audience(&[CONNECT_STATE_AUDIENCE]);
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            state_validation,
        }
    }

    /// Short-lived OAuth `state` binding a Connect flow to `user_id`.
    pub fn sign_connect_state(&self, user_id: &str, ttl: Duration) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = ConnectStateClaims {
            sub: user_id.to_string(),
            aud: CONNECT_STATE_AUDIENCE.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("Failed to sign state: {}", e)))
    }

    /// User id of a state issued by `sign_connect_state`.
    pub fn verify_connect_state(&self, state: &str) -> Result<String, AppError> {
        decode::<ConnectStateClaims>(state, &self.decoding, &self.state_validation)
            .map(|data| data.claims.sub)
            .map_err(|e| AppError::BadRequest(format!("Invalid OAuth state: {}", e)))
    }

    pub fn verify(&self, token: &str) -> Result<JwtClaims, AppError> {
        decode::<JwtClaims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
    }

    /// Sign a token for `user_id`. Used by local tooling and tests.
    pub fn sign(&self, user_id: &str, ttl: Duration) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = JwtClaims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            email: None,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-that-is-at-least-32-chars";

    #[test]
    fn test_sign_and_verify() {
        let keys = JwtKeys::new(SECRET);
        let token = keys.sign("user_1", Duration::hours(1)).unwrap();
        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.sub, "user_1");
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = JwtKeys::new(SECRET)
            .sign("user_1", Duration::hours(1))
            .unwrap();
        let other = JwtKeys::new("another-secret-key-that-is-32-chars-long");
        assert!(matches!(
            other.verify(&token),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_connect_state_round_trip() {
        let keys = JwtKeys::new(SECRET);
        let state = keys
            .sign_connect_state("user_1", Duration::minutes(10))
            .unwrap();
        assert_eq!(keys.verify_connect_state(&state).unwrap(), "user_1");
    }

    #[test]
    fn test_connect_state_rejects_raw_ids_and_bearer_tokens() {
        let keys = JwtKeys::new(SECRET);
        assert!(matches!(
            keys.verify_connect_state("user_1"),
            Err(AppError::BadRequest(_))
        ));

        let bearer = keys.sign("user_1", Duration::hours(1)).unwrap();
        assert!(keys.verify_connect_state(&bearer).is_err());

        let foreign = JwtKeys::new("another-secret-key-that-is-32-chars-long")
            .sign_connect_state("user_1", Duration::minutes(10))
            .unwrap();
        assert!(keys.verify_connect_state(&foreign).is_err());

        let expired = keys
            .sign_connect_state("user_1", Duration::minutes(-5))
            .unwrap();
        assert!(keys.verify_connect_state(&expired).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let keys = JwtKeys::new(SECRET);
        let token = keys.sign("user_1", Duration::hours(-2)).unwrap();
        assert!(keys.verify(&token).is_err());
    }
}
