use std::time::Duration;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;

use crate::state::AppState;

const ISSUER: &str = "wedding-rsvp";

#[derive(Debug, Serialize, Deserialize)]
pub struct AdminClaims {
    pub sub: String,
    pub exp: usize,
    pub iat: usize,
    pub iss: String,
}

/// Signing and verification keys for admin session tokens.
#[derive(Clone)]
pub struct SessionKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub ttl: Duration,
}

impl FromRef<AppState> for SessionKeys {
    fn from_ref(state: &AppState) -> Self {
        let admin = &state.config.admin;
        Self {
            encoding: EncodingKey::from_secret(admin.session_secret.as_bytes()),
            decoding: DecodingKey::from_secret(admin.session_secret.as_bytes()),
            ttl: Duration::from_secs((admin.session_ttl_minutes as u64) * 60),
        }
    }
}

impl SessionKeys {
    pub fn sign(&self, username: &str) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = AdminClaims {
            sub: username.to_string(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: ISSUER.to_string(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(username, "admin session signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<AdminClaims> {
        let mut validation = Validation::default();
        validation.set_issuer(&[ISSUER]);
        let data = decode::<AdminClaims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }
}

/// Extracts and validates the admin bearer token.
pub struct AdminSession(pub String);

#[async_trait]
impl FromRequestParts<AppState> for AdminSession {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or((
                StatusCode::UNAUTHORIZED,
                "missing Authorization header".into(),
            ))?;

        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or((StatusCode::UNAUTHORIZED, "invalid auth scheme".into()))?;

        let keys = SessionKeys::from_ref(state);
        let claims = keys
            .verify(token)
            .map_err(|_| (StatusCode::UNAUTHORIZED, "invalid or expired session".into()))?;

        Ok(AdminSession(claims.sub))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> SessionKeys {
        SessionKeys {
            encoding: EncodingKey::from_secret(b"test-secret"),
            decoding: DecodingKey::from_secret(b"test-secret"),
            ttl: Duration::from_secs(60),
        }
    }

    #[test]
    fn sign_and_verify_roundtrip() {
        let keys = keys();
        let token = keys.sign("admin").unwrap();
        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.sub, "admin");
        assert_eq!(claims.iss, ISSUER);
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let token = keys().sign("admin").unwrap();
        let other = SessionKeys {
            encoding: EncodingKey::from_secret(b"other"),
            decoding: DecodingKey::from_secret(b"other"),
            ttl: Duration::from_secs(60),
        };
        assert!(other.verify(&token).is_err());
    }
}
