//! Authentication and authorization core: token codec, issuance, refresh
//! rotation, credential verification, and the request-pipeline gates.

use std::sync::Arc;

pub mod config;
pub mod error;
pub mod guards;
pub mod identity;
pub mod issuer;
pub mod jwt;
pub mod passwords;
pub mod responses;
pub mod rotation;
pub mod routes;
pub mod verifier;

pub use config::AuthConfig;
pub use error::{AuthError, AuthResult};
pub use guards::{AuthUser, RequireAdmin, RequireCareTeam, RequireTherapist};
pub use identity::{Identity, IdentityStore, MemoryIdentityStore, PgIdentityStore, Role};
pub use issuer::{TokenIssuer, TokenPair};
pub use jwt::TokenCodec;
pub use passwords::PasswordService;
pub use rotation::RefreshRotator;
pub use verifier::CredentialVerifier;

/// Wiring for the auth components. Configuration and the identity store are
/// passed in explicitly at construction; nothing here reads ambient state.
#[derive(Clone)]
pub struct AuthState {
    pub config: AuthConfig,
    pub passwords: Arc<PasswordService>,
    pub issuer: Arc<TokenIssuer>,
    pub verifier: Arc<CredentialVerifier>,
    pub rotator: Arc<RefreshRotator>,
    pub identities: Arc<dyn IdentityStore>,
}

impl AuthState {
    pub fn new(config: AuthConfig, identities: Arc<dyn IdentityStore>) -> AuthResult<Self> {
        let codec = Arc::new(TokenCodec::from_config(&config)?);
        let issuer = Arc::new(TokenIssuer::new(codec.clone(), &config));
        let verifier = Arc::new(CredentialVerifier::new(codec.clone(), identities.clone()));
        let rotator = Arc::new(RefreshRotator::new(codec, issuer.clone(), identities.clone()));
        let passwords = Arc::new(PasswordService::new()?);

        Ok(Self {
            config,
            passwords,
            issuer,
            verifier,
            rotator,
            identities,
        })
    }
}
