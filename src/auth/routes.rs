use chrono::Utc;
use rocket::State;
use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::{get, post};
use rocket_okapi::okapi::schemars::JsonSchema;
use rocket_okapi::openapi;

use crate::auth::guards::{AuthUser, RequireAdmin};
use crate::auth::responses::{
    LoginRequest, LoginResponse, RefreshRequest, RefreshResponse, TokenMetadataResponse,
    UserSummary,
};
use crate::auth::{AuthError, AuthState};

type AuthRouteResult<T> = Result<Json<T>, status::Custom<Json<AuthErrorResponse>>>;

#[derive(Debug, serde::Serialize, JsonSchema)]
pub struct AuthErrorResponse {
    pub status: u16,
    pub message: String,
}

/// Primary-credential login: verifies the password and mints a token pair.
/// Unknown accounts and wrong passwords produce byte-identical responses.
#[openapi(tag = "Auth")]
#[post("/auth/login", data = "<payload>")]
pub async fn login(
    state: &State<AuthState>,
    payload: Json<LoginRequest>,
) -> AuthRouteResult<LoginResponse> {
    let email = payload.email.trim().to_lowercase();
    let password = payload.password.trim();

    if email.is_empty() || password.is_empty() {
        return Err(respond_message(
            Status::BadRequest,
            "Email and password are required",
        ));
    }

    let now = Utc::now();

    let record = state
        .identities
        .find_by_email(&email)
        .await
        .map_err(respond_error)?;

    let record = match record {
        Some(record) => record,
        None => return Err(invalid_credentials()),
    };

    let password_hash = match record.password_hash.as_deref() {
        Some(hash) => hash,
        None => return Err(invalid_credentials()),
    };

    let verified = state
        .passwords
        .verify_password(password, password_hash)
        .map_err(respond_error)?;

    if !verified {
        return Err(invalid_credentials());
    }

    // Only a caller who holds the password learns the account is disabled;
    // anyone else sees the same generic rejection as an unknown email.
    if record.identity.disabled {
        return Err(respond_error(AuthError::AccountDisabled));
    }

    state
        .identities
        .record_login(record.identity.id, now)
        .await
        .map_err(respond_error)?;

    let pair = state
        .issuer
        .issue_pair(&record.identity, now)
        .map_err(respond_error)?;

    Ok(Json(LoginResponse {
        access_token: pair.access.token,
        access_token_expires_at: pair.access.expires_at,
        refresh_token: pair.refresh.token,
        refresh_token_expires_at: pair.refresh.expires_at,
        user: UserSummary::from(&record.identity),
    }))
}

/// Exchange a refresh token for a new pair. Every rejection surfaces the
/// same generic 401; the precise classification only reaches the log.
#[openapi(tag = "Auth")]
#[post("/auth/refresh", data = "<payload>")]
pub async fn refresh(
    state: &State<AuthState>,
    payload: Json<RefreshRequest>,
) -> AuthRouteResult<RefreshResponse> {
    let now = Utc::now();

    let (_identity, pair) = match state.rotator.rotate(&payload.refresh_token, now).await {
        Ok(rotation) => rotation,
        Err(err @ (AuthError::Sqlx(_) | AuthError::Config(_))) => return Err(respond_error(err)),
        Err(AuthError::WrongPurpose) => {
            log::warn!("access token presented to the refresh endpoint");
            return Err(respond_error(AuthError::TokenInvalid));
        }
        Err(err) => {
            log::debug!("refresh rotation rejected: {err}");
            return Err(respond_error(AuthError::TokenInvalid));
        }
    };

    Ok(Json(RefreshResponse {
        access_token: pair.access.token,
        access_token_expires_at: pair.access.expires_at,
        refresh_token: pair.refresh.token,
        refresh_token_expires_at: pair.refresh.expires_at,
    }))
}

/// The authenticated identity, as resolved live by the authentication gate.
#[openapi(tag = "Auth")]
#[get("/auth/me")]
pub async fn me(user: AuthUser) -> Json<UserSummary> {
    Json(UserSummary::from(&user.identity))
}

/// Signing and TTL metadata, for operators. Admin-gated.
#[openapi(tag = "Auth")]
#[get("/auth/keys")]
pub async fn signing_keys(
    state: &State<AuthState>,
    _admin: RequireAdmin,
) -> Json<TokenMetadataResponse> {
    let meta = state.issuer.metadata();
    Json(TokenMetadataResponse {
        algorithm: meta.algorithm,
        issuer: meta.issuer,
        audience: meta.audience,
        access_token_ttl_secs: meta.access_token_ttl_secs,
        refresh_token_ttl_secs: meta.refresh_token_ttl_secs,
    })
}

fn respond_error(err: AuthError) -> status::Custom<Json<AuthErrorResponse>> {
    let status = err.status();
    status::Custom(
        status,
        Json(AuthErrorResponse {
            status: status.code,
            message: err.to_string(),
        }),
    )
}

fn respond_message(
    status: Status,
    message: impl Into<String>,
) -> status::Custom<Json<AuthErrorResponse>> {
    status::Custom(
        status,
        Json(AuthErrorResponse {
            status: status.code,
            message: message.into(),
        }),
    )
}

fn invalid_credentials() -> status::Custom<Json<AuthErrorResponse>> {
    respond_error(AuthError::InvalidCredentials)
}
