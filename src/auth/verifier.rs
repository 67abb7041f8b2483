//! Access token verification.
//!
//! Every inbound bearer token is decoded, signature- and expiry-checked, and
//! then resolved against the live identity store. All failure causes
//! collapse into one generic `Unauthorized` so the response is not an oracle
//! for which check failed; the specific cause is only logged server-side.
//! Infrastructure errors (the store itself failing) are the one exception
//! and propagate as such.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::identity::{Identity, IdentityStore};
use crate::auth::jwt::TokenCodec;
use crate::auth::{AuthError, AuthResult};

pub struct CredentialVerifier {
    codec: Arc<TokenCodec>,
    identities: Arc<dyn IdentityStore>,
}

impl CredentialVerifier {
    pub fn new(codec: Arc<TokenCodec>, identities: Arc<dyn IdentityStore>) -> Self {
        Self { codec, identities }
    }

    pub async fn verify(&self, access_token: &str, now: DateTime<Utc>) -> AuthResult<Identity> {
        match self.resolve(access_token, now).await {
            Ok(identity) => Ok(identity),
            Err(err @ AuthError::Sqlx(_)) => Err(err),
            Err(err) => {
                log::debug!("access token rejected: {err}");
                Err(AuthError::Unauthorized)
            }
        }
    }

    async fn resolve(&self, access_token: &str, now: DateTime<Utc>) -> AuthResult<Identity> {
        let claims = self.codec.decode_access(access_token, now)?;

        let subject: Uuid = claims.sub.parse().map_err(|_| AuthError::TokenInvalid)?;

        // Always re-resolve: role and email edits, or deactivation, must take
        // effect on the next request, not at token expiry. The snapshot
        // embedded in the claims is never consulted.
        let identity = self
            .identities
            .find_by_id(subject)
            .await?
            .ok_or(AuthError::TokenInvalid)?;

        if identity.disabled {
            return Err(AuthError::AccountDisabled);
        }

        Ok(identity)
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

    fn seeded_state(role: Role) -> (AuthState, Arc<MemoryIdentityStore>, Identity) {
        let store = Arc::new(MemoryIdentityStore::new());
        let identity = Identity {
            id: Uuid::new_v4(),
            email: "sam@example.com".into(),
            display_name: Some("Sam".into()),
            role,
            disabled: false,
        };
        store.insert(identity.clone(), None);

        let state = AuthState::new(make_test_config(), store.clone()).expect("auth state");
        (state, store, identity)
    }

    #[tokio::test]
    async fn valid_token_resolves_to_live_identity() {
        let (state, _store, identity) = seeded_state(Role::Patient);
        let now = Utc::now();

        let signed = state.issuer.issue_access(&identity, now).expect("issue");
        let resolved = state
            .verifier
            .verify(&signed.token, now)
            .await
            .expect("verify");

        assert_eq!(resolved.id, identity.id);
        assert_eq!(resolved.role, Role::Patient);
    }

    #[tokio::test]
    async fn role_change_is_visible_on_next_verification() {
        let (state, store, identity) = seeded_state(Role::Patient);
        let now = Utc::now();

        let signed = state.issuer.issue_access(&identity, now).expect("issue");
        store.set_role(identity.id, Role::Therapist);

        // The token still carries the patient snapshot, but verification
        // reflects the live record.
        let resolved = state
            .verifier
            .verify(&signed.token, now)
            .await
            .expect("verify");
        assert_eq!(resolved.role, Role::Therapist);
    }

    #[tokio::test]
    async fn deleted_account_fails_even_with_valid_signature() {
        let (state, store, identity) = seeded_state(Role::Patient);
        let now = Utc::now();

        let signed = state.issuer.issue_access(&identity, now).expect("issue");
        store.remove(identity.id);

        let err = state
            .verifier
            .verify(&signed.token, now)
            .await
            .expect_err("deleted account must not verify");
        assert!(matches!(err, AuthError::Unauthorized));
    }

    #[tokio::test]
    async fn disabled_account_fails_generically() {
        let (state, store, identity) = seeded_state(Role::Therapist);
        let now = Utc::now();

        let signed = state.issuer.issue_access(&identity, now).expect("issue");
        store.set_disabled(identity.id, true);

        let err = state
            .verifier
            .verify(&signed.token, now)
            .await
            .expect_err("disabled account must not verify");
        assert!(matches!(err, AuthError::Unauthorized));
    }

    #[tokio::test]
    async fn expired_token_fails_generically() {
        let (state, _store, identity) = seeded_state(Role::Patient);
        let issued_at = Utc::now();

        let signed = state
            .issuer
            .issue_access(&identity, issued_at)
            .expect("issue");
        let err = state
            .verifier
            .verify(&signed.token, issued_at + Duration::seconds(901))
            .await
            .expect_err("expired token must not verify");
        assert!(matches!(err, AuthError::Unauthorized));
    }

    #[tokio::test]
    async fn refresh_token_is_not_an_access_token() {
        let (state, _store, identity) = seeded_state(Role::Patient);
        let now = Utc::now();

        let refresh = state.issuer.issue_refresh(&identity, now).expect("issue");
        let err = state
            .verifier
            .verify(&refresh.token, now)
            .await
            .expect_err("refresh token must not pass access verification");
        assert!(matches!(err, AuthError::Unauthorized));
    }
}
