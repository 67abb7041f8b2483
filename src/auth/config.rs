use crate::auth::{AuthError, AuthResult};

/// Authentication configuration loaded from environment variables.
///
/// The two signing secrets are deliberately distinct so a compromise of one
/// does not compromise the other; both are required and their absence is a
/// fatal startup condition, never a per-request error.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub issuer: String,
    pub audience: String,
    pub access_token_ttl_secs: i64,
    pub refresh_token_ttl_secs: i64,
    pub access_token_secret: String,
    pub refresh_token_secret: String,
}

impl AuthConfig {
    pub fn from_env() -> AuthResult<Self> {
        let issuer = std::env::var("MINDLINE_JWT_ISSUER")
            .unwrap_or_else(|_| "https://api.mindline.app".into());
        let audience =
            std::env::var("MINDLINE_JWT_AUDIENCE").unwrap_or_else(|_| "mindline-mobile".into());
        let access_token_ttl_secs = std::env::var("MINDLINE_ACCESS_TOKEN_TTL_SECS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(15 * 60);
        let refresh_token_ttl_secs = std::env::var("MINDLINE_REFRESH_TOKEN_TTL_SECS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(14 * 24 * 60 * 60);
        let access_token_secret = std::env::var("MINDLINE_ACCESS_TOKEN_SECRET")
            .map_err(|_| AuthError::Config("MINDLINE_ACCESS_TOKEN_SECRET is required".into()))?;
        let refresh_token_secret = std::env::var("MINDLINE_REFRESH_TOKEN_SECRET")
            .map_err(|_| AuthError::Config("MINDLINE_REFRESH_TOKEN_SECRET is required".into()))?;

        if access_token_secret == refresh_token_secret {
            log::warn!(
                "access and refresh token secrets are identical; blast-radius separation is lost"
            );
        }

        Ok(Self {
            issuer,
            audience,
            access_token_ttl_secs,
            refresh_token_ttl_secs,
            access_token_secret,
            refresh_token_secret,
        })
    }
}
