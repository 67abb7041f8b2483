//! Token codec: typed claims per token purpose, HS256 signing with two
//! distinct secrets, and decode-time purpose/expiry validation.
//!
//! Encoding and decoding are pure functions over the input and the keys
//! derived from configuration at startup. Signature comparison is
//! constant-time (ring, via `jsonwebtoken`). Expiry is checked against a
//! caller-supplied clock instant after the signature verifies, never against
//! unverified claims content; jsonwebtoken's own `exp` validation is disabled
//! so the injected clock is authoritative.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::auth::{AuthConfig, AuthError, AuthResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenPurpose {
    Access,
    Refresh,
}

/// Claims signed into an access token. The email/role snapshot is recorded
/// for defense in depth only; authorization decisions always re-resolve the
/// live identity and never trust the embedded copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    pub sub: String,
    pub iss: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
    pub purpose: TokenPurpose,
    pub email: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenClaims {
    pub sub: String,
    pub iss: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
    pub purpose: TokenPurpose,
}

pub struct TokenCodec {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub fn from_config(config: &AuthConfig) -> AuthResult<Self> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[config.audience.clone()]);
        validation.set_issuer(&[config.issuer.clone()]);
        // Expiry is enforced below with the caller's clock.
        validation.validate_exp = false;

        Ok(Self {
            access_encoding: EncodingKey::from_secret(config.access_token_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(config.access_token_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(config.refresh_token_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(config.refresh_token_secret.as_bytes()),
            validation,
        })
    }

    pub fn encode_access(&self, claims: &AccessTokenClaims) -> AuthResult<String> {
        let header = Header::new(Algorithm::HS256);
        encode(&header, claims, &self.access_encoding)
            .map_err(|err| AuthError::Config(format!("access token encoding failed: {err}")))
    }

    pub fn encode_refresh(&self, claims: &RefreshTokenClaims) -> AuthResult<String> {
        let header = Header::new(Algorithm::HS256);
        encode(&header, claims, &self.refresh_encoding)
            .map_err(|err| AuthError::Config(format!("refresh token encoding failed: {err}")))
    }

    pub fn decode_access(&self, token: &str, now: DateTime<Utc>) -> AuthResult<AccessTokenClaims> {
        let data = decode::<AccessTokenClaims>(token, &self.access_decoding, &self.validation)
            .map_err(classify_decode_error)?;
        if data.claims.purpose != TokenPurpose::Access {
            return Err(AuthError::WrongPurpose);
        }
        if data.claims.exp <= now.timestamp() {
            return Err(AuthError::TokenExpired);
        }
        Ok(data.claims)
    }

    pub fn decode_refresh(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> AuthResult<RefreshTokenClaims> {
        let data = decode::<RefreshTokenClaims>(token, &self.refresh_decoding, &self.validation)
            .map_err(classify_decode_error)?;
        if data.claims.purpose != TokenPurpose::Refresh {
            return Err(AuthError::WrongPurpose);
        }
        if data.claims.exp <= now.timestamp() {
            return Err(AuthError::TokenExpired);
        }
        Ok(data.claims)
    }
}

fn classify_decode_error(err: jsonwebtoken::errors::Error) -> AuthError {
    use jsonwebtoken::errors::ErrorKind;

    match err.kind() {
        ErrorKind::InvalidToken
        | ErrorKind::Base64(_)
        | ErrorKind::Json(_)
        | ErrorKind::Utf8(_) => AuthError::TokenMalformed,
        _ => AuthError::TokenInvalid,
    }
}
