//! Caller identity resolution (§4.13).
//!
//! `AuthUser` resolves to exactly one of a verified user id or an anonymous session id. There
//! is no external identity provider in scope, so user ids are carried in an HS256 JWT signed
//! with a server-held secret rather than fetched from a JWKS endpoint; anonymous sessions are
//! a session id plus an HMAC tag in a cookie or header, verified the same way.

use std::time::Duration;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum_extra::extract::cookie::CookieJar;
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use hmac::{Hmac, Mac};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use clipcast_models::Identity;

use crate::error::ApiError;
use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Cookie carrying a signed anonymous session id.
pub const SESSION_COOKIE_NAME: &str = "clipcast_session";
/// Header fallback for non-browser callers that can't set cookies.
pub const SESSION_HEADER_NAME: &str = "x-clipcast-session";

/// Claims embedded in a user's bearer JWT.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Verifies (and, for tests/tooling, issues) HS256 user JWTs.
pub struct JwtVerifier {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtVerifier {
    pub fn from_env() -> Self {
        let secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| "dev-insecure-jwt-secret".to_string());
        Self::new(secret.as_bytes())
    }

    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    fn verify(&self, token: &str) -> Option<String> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<UserClaims>(token, &self.decoding_key, &validation)
            .ok()
            .map(|data| data.claims.sub)
    }

    /// Issue a token for `user_id`, valid for `ttl`. Used by tests and by the promotion flow
    /// when it hands a freshly-promoted caller a token for their new user id.
    pub fn issue(&self, user_id: &str, ttl: Duration) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let claims = UserClaims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
    }
}

/// Signs and verifies anonymous session ids carried in a cookie or header.
pub struct SessionSigner {
    secret: Vec<u8>,
}

impl SessionSigner {
    pub fn from_env() -> Self {
        let secret = std::env::var("SESSION_SECRET").unwrap_or_else(|_| "dev-insecure-session-secret".to_string());
        Self::new(secret.into_bytes())
    }

    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self { secret: secret.into() }
    }

    fn mac_for(&self, session_id: &str) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts any key length");
        mac.update(session_id.as_bytes());
        mac
    }

    /// Sign a fresh session id as `"<id>.<tag>"`.
    pub fn sign(&self, session_id: &str) -> String {
        let tag = self.mac_for(session_id).finalize().into_bytes();
        format!("{session_id}.{}", URL_SAFE_NO_PAD.encode(tag))
    }

    /// Verify a signed session value, returning the session id if the tag matches.
    pub fn verify(&self, signed: &str) -> Option<String> {
        let (session_id, tag_b64) = signed.split_once('.')?;
        let tag = URL_SAFE_NO_PAD.decode(tag_b64).ok()?;
        self.mac_for(session_id).verify_slice(&tag).ok()?;
        Some(session_id.to_string())
    }
}

/// A caller identity resolved from the request, required. Routes that require an existing
/// job's owner to make the call use this extractor directly.
pub struct AuthUser(pub Identity);

/// A caller identity resolved from the request, if any. `create_job` uses this: a missing or
/// invalid identity isn't an error there, it means "mint a new anonymous session" (§4.13).
pub struct MaybeAuthUser(pub Option<Identity>);

async fn resolve_identity(state: &AppState, parts: &mut Parts) -> Option<Identity> {
    if let Ok(TypedHeader(Authorization(bearer))) =
        TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state).await
    {
        if let Some(user_id) = state.jwt.verify(bearer.token()) {
            return Some(Identity::user(user_id));
        }
    }

    if let Some(session_id) = resolve_session_header(parts, state) {
        return Some(Identity::session(session_id));
    }

    let jar = CookieJar::from_request_parts(parts, state).await.ok()?;
    let cookie = jar.get(SESSION_COOKIE_NAME)?;
    let session_id = state.session_signer.verify(cookie.value())?;
    Some(Identity::session(session_id))
}

fn resolve_session_header(parts: &Parts, state: &AppState) -> Option<String> {
    let value = parts.headers.get(SESSION_HEADER_NAME)?.to_str().ok()?;
    state.session_signer.verify(value)
}

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        resolve_identity(&app_state, parts)
            .await
            .map(AuthUser)
            .ok_or_else(|| ApiError::unauthorized("missing or invalid credentials"))
    }
}

impl<S> FromRequestParts<S> for MaybeAuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        Ok(MaybeAuthUser(resolve_identity(&app_state, parts).await))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_signer_round_trip() {
        let signer = SessionSigner::new(b"test-secret".to_vec());
        let signed = signer.sign("session-123");
        assert_eq!(signer.verify(&signed), Some("session-123".to_string()));
    }

    #[test]
    fn test_session_signer_rejects_tampered_value() {
        let signer = SessionSigner::new(b"test-secret".to_vec());
        let signed = signer.sign("session-123");
        let tampered = signed.replace("session-123", "session-999");
        assert_eq!(signer.verify(&tampered), None);
    }

    #[test]
    fn test_jwt_round_trip() {
        let verifier = JwtVerifier::new(b"test-secret");
        let token = verifier.issue("user-1", Duration::from_secs(3600)).unwrap();
        assert_eq!(verifier.verify(&token), Some("user-1".to_string()));
    }

    #[test]
    fn test_jwt_rejects_wrong_secret() {
        let issuer = JwtVerifier::new(b"secret-a");
        let verifier = JwtVerifier::new(b"secret-b");
        let token = issuer.issue("user-1", Duration::from_secs(3600)).unwrap();
        assert_eq!(verifier.verify(&token), None);
    }
}
