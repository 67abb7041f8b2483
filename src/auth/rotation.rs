//! Refresh token rotation.
//!
//! Presenting a valid, unexpired refresh token yields a brand-new token
//! pair. Rotation is stateless: nothing is persisted, so it either fully
//! succeeds or fully fails, and the old refresh token simply remains one of
//! possibly several still-valid tokens until its own expiry. There is no
//! reuse detection or all-sessions revocation without a persisted token
//! registry; that is a known limitation of this design, not an oversight.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::identity::{Identity, IdentityStore};
use crate::auth::issuer::{TokenIssuer, TokenPair};
use crate::auth::jwt::TokenCodec;
use crate::auth::{AuthError, AuthResult};

pub struct RefreshRotator {
    codec: Arc<TokenCodec>,
    issuer: Arc<TokenIssuer>,
    identities: Arc<dyn IdentityStore>,
}

impl RefreshRotator {
    pub fn new(
        codec: Arc<TokenCodec>,
        issuer: Arc<TokenIssuer>,
        identities: Arc<dyn IdentityStore>,
    ) -> Self {
        Self {
            codec,
            issuer,
            identities,
        }
    }

    /// Exchange a refresh token for a new pair.
    ///
    /// Rejections are terminal for the request; the caller must restart
    /// primary login. `WrongPurpose` means a syntactically valid access
    /// token was presented here, which callers should treat as suspicious.
    pub async fn rotate(
        &self,
        refresh_token: &str,
        now: DateTime<Utc>,
    ) -> AuthResult<(Identity, TokenPair)> {
        let claims = match self.codec.decode_refresh(refresh_token, now) {
            Ok(claims) => claims,
            Err(AuthError::TokenExpired) => return Err(AuthError::TokenExpired),
            Err(AuthError::WrongPurpose) => return Err(AuthError::WrongPurpose),
            Err(err) => {
                // The signature did not verify under the refresh secret. If
                // the same string verifies under the access secret it is a
                // cross-purpose presentation (a leaked access token being
                // laundered into a refresh cycle), not garbage.
                return match self.codec.decode_access(refresh_token, now) {
                    Ok(_) | Err(AuthError::TokenExpired) => Err(AuthError::WrongPurpose),
                    Err(_) => Err(err),
                };
            }
        };

        let subject: Uuid = claims.sub.parse().map_err(|_| AuthError::TokenInvalid)?;

        let identity = self
            .identities
            .find_by_id(subject)
            .await?
            .ok_or(AuthError::TokenInvalid)?;

        if identity.disabled {
            return Err(AuthError::TokenInvalid);
        }

        let pair = self.issuer.issue_pair(&identity, now)?;

        Ok((identity, pair))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::identity::{MemoryIdentityStore, Role};
    use crate::auth::{AuthConfig, AuthState};
    use chrono::Duration;

    fn make_test_config() -> AuthConfig {
        AuthConfig {
            issuer: "https://mindline.test".into(),
            audience: "mindline-mobile".into(),
            access_token_ttl_secs: 900,
            refresh_token_ttl_secs: 7 * 24 * 60 * 60,
            access_token_secret: "access-test-secret".into(),
            refresh_token_secret: "refresh-test-secret".into(),
        }
    }

    fn seeded_state() -> (AuthState, Arc<MemoryIdentityStore>, Identity) {
        let store = Arc::new(MemoryIdentityStore::new());
        let identity = Identity {
            id: Uuid::new_v4(),
            email: "jules@example.com".into(),
            display_name: None,
            role: Role::Patient,
            disabled: false,
        };
        store.insert(identity.clone(), None);

        let state = AuthState::new(make_test_config(), store.clone()).expect("auth state");
        (state, store, identity)
    }

    #[tokio::test]
    async fn rotation_returns_a_fresh_pair() {
        let (state, _store, identity) = seeded_state();
        let now = Utc::now();

        let original = state.issuer.issue_pair(&identity, now).expect("pair");
        let (resolved, pair) = state
            .rotator
            .rotate(&original.refresh.token, now)
            .await
            .expect("rotation succeeds");

        assert_eq!(resolved.id, identity.id);
        assert_ne!(pair.refresh.token, original.refresh.token);

        // Both members of the new pair verify.
        state
            .verifier
            .verify(&pair.access.token, now)
            .await
            .expect("new access token verifies");
        state
            .rotator
            .rotate(&pair.refresh.token, now)
            .await
            .expect("new refresh token rotates");
    }

    #[tokio::test]
    async fn expired_refresh_token_is_rejected() {
        let (state, _store, identity) = seeded_state();
        let issued_at = Utc::now();

        let pair = state.issuer.issue_pair(&identity, issued_at).expect("pair");
        let after_expiry = issued_at + Duration::seconds(7 * 24 * 60 * 60 + 1);

        let err = state
            .rotator
            .rotate(&pair.refresh.token, after_expiry)
            .await
            .expect_err("expired token must not rotate");
        assert!(matches!(err, AuthError::TokenExpired));
    }

    #[tokio::test]
    async fn access_token_presented_for_rotation_is_wrong_purpose() {
        let (state, _store, identity) = seeded_state();
        let now = Utc::now();

        let pair = state.issuer.issue_pair(&identity, now).expect("pair");
        let err = state
            .rotator
            .rotate(&pair.access.token, now)
            .await
            .expect_err("access token must not rotate");
        assert!(matches!(err, AuthError::WrongPurpose));
    }

    #[tokio::test]
    async fn deleted_identity_cannot_rotate() {
        let (state, store, identity) = seeded_state();
        let now = Utc::now();

        let pair = state.issuer.issue_pair(&identity, now).expect("pair");
        store.remove(identity.id);

        let err = state
            .rotator
            .rotate(&pair.refresh.token, now)
            .await
            .expect_err("deleted identity must not rotate");
        assert!(matches!(err, AuthError::TokenInvalid));
    }

    #[tokio::test]
    async fn disabled_identity_cannot_rotate() {
        let (state, store, identity) = seeded_state();
        let now = Utc::now();

        let pair = state.issuer.issue_pair(&identity, now).expect("pair");
        store.set_disabled(identity.id, true);

        let err = state
            .rotator
            .rotate(&pair.refresh.token, now)
            .await
            .expect_err("disabled identity must not rotate");
        assert!(matches!(err, AuthError::TokenInvalid));
    }

    #[tokio::test]
    async fn garbage_input_is_rejected_as_malformed() {
        let (state, _store, _identity) = seeded_state();
        let err = state
            .rotator
            .rotate("definitely-not-a-token", Utc::now())
            .await
            .expect_err("garbage must not rotate");
        assert!(matches!(err, AuthError::TokenMalformed));
    }
}
