//! Issuance of access and refresh tokens.
//!
//! Claims are immutable once minted; a token is never updated, only
//! superseded by a new one. TTLs come from configuration, never from this
//! module. The clock is a parameter so callers (and tests) decide what "now"
//! means.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::auth::identity::Identity;
use crate::auth::jwt::{AccessTokenClaims, RefreshTokenClaims, TokenCodec, TokenPurpose};
use crate::auth::{AuthConfig, AuthResult};

#[derive(Debug, Clone)]
pub struct SignedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Access and refresh token returned together at login and at refresh time.
/// Each is independently verifiable and independently expires.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: SignedToken,
    pub refresh: SignedToken,
}

#[derive(Debug, Clone)]
pub struct TokenMetadata {
    pub algorithm: String,
    pub issuer: String,
    pub audience: String,
    pub access_token_ttl_secs: i64,
    pub refresh_token_ttl_secs: i64,
}

pub struct TokenIssuer {
    codec: Arc<TokenCodec>,
    issuer: String,
    audience: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(codec: Arc<TokenCodec>, config: &AuthConfig) -> Self {
        Self {
            codec,
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            access_ttl: Duration::seconds(config.access_token_ttl_secs),
            refresh_ttl: Duration::seconds(config.refresh_token_ttl_secs),
        }
    }

    pub fn issue_access(&self, identity: &Identity, now: DateTime<Utc>) -> AuthResult<SignedToken> {
        let expires_at = now + self.access_ttl;
        let claims = AccessTokenClaims {
            sub: identity.id.to_string(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
            purpose: TokenPurpose::Access,
            email: identity.email.clone(),
            role: identity.role.as_str().to_string(),
        };

        Ok(SignedToken {
            token: self.codec.encode_access(&claims)?,
            expires_at,
        })
    }

    pub fn issue_refresh(
        &self,
        identity: &Identity,
        now: DateTime<Utc>,
    ) -> AuthResult<SignedToken> {
        let expires_at = now + self.refresh_ttl;
        let claims = RefreshTokenClaims {
            sub: identity.id.to_string(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
            purpose: TokenPurpose::Refresh,
        };

        Ok(SignedToken {
            token: self.codec.encode_refresh(&claims)?,
            expires_at,
        })
    }

    pub fn issue_pair(&self, identity: &Identity, now: DateTime<Utc>) -> AuthResult<TokenPair> {
        Ok(TokenPair {
            access: self.issue_access(identity, now)?,
            refresh: self.issue_refresh(identity, now)?,
        })
    }

    pub fn metadata(&self) -> TokenMetadata {
        TokenMetadata {
            algorithm: "HS256".to_string(),
            issuer: self.issuer.clone(),
            audience: self.audience.clone(),
            access_token_ttl_secs: self.access_ttl.num_seconds(),
            refresh_token_ttl_secs: self.refresh_ttl.num_seconds(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::identity::Role;

    fn make_test_config() -> AuthConfig {
        AuthConfig {
            issuer: "https://mindline.test".into(),
            audience: "mindline-mobile".into(),
            access_token_ttl_secs: 900,
            refresh_token_ttl_secs: 14 * 24 * 60 * 60,
            access_token_secret: "access-test-secret".into(),
            refresh_token_secret: "refresh-test-secret".into(),
        }
    }

    fn make_identity(role: Role) -> Identity {
        Identity {
            id: Uuid::new_v4(),
            email: "maya@example.com".into(),
            display_name: Some("Maya".into()),
            role,
            disabled: false,
        }
    }

    #[test]
    fn access_tokens_carry_subject_and_role_snapshot() {
        let config = make_test_config();
        let codec = Arc::new(TokenCodec::from_config(&config).expect("codec"));
        let issuer = TokenIssuer::new(codec.clone(), &config);
        let identity = make_identity(Role::Therapist);
        let now = Utc::now();

        let signed = issuer.issue_access(&identity, now).expect("issue");
        assert_eq!(signed.expires_at, now + Duration::seconds(900));

        let claims = codec.decode_access(&signed.token, now).expect("decode");
        assert_eq!(claims.sub, identity.id.to_string());
        assert_eq!(claims.role, "therapist");
        assert_eq!(claims.email, identity.email);
        assert_eq!(claims.exp, signed.expires_at.timestamp());
    }

    #[test]
    fn pair_members_verify_independently() {
        let config = make_test_config();
        let codec = Arc::new(TokenCodec::from_config(&config).expect("codec"));
        let issuer = TokenIssuer::new(codec.clone(), &config);
        let identity = make_identity(Role::Patient);
        let now = Utc::now();

        let pair = issuer.issue_pair(&identity, now).expect("issue pair");
        assert_ne!(pair.access.token, pair.refresh.token);
        assert!(pair.refresh.expires_at > pair.access.expires_at);

        codec
            .decode_access(&pair.access.token, now)
            .expect("access decodes under access secret");
        codec
            .decode_refresh(&pair.refresh.token, now)
            .expect("refresh decodes under refresh secret");

        // Neither member decodes under the other's secret.
        assert!(codec.decode_refresh(&pair.access.token, now).is_err());
        assert!(codec.decode_access(&pair.refresh.token, now).is_err());
    }
}
