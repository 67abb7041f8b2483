//! Request guards: the authentication gate and the role authorization gate.
//!
//! `AuthUser` is the authentication gate. A request either carries a bearer
//! token that verifies against the live identity store, or it is rejected
//! with 401 before the handler runs. The `Require*` wrappers are the role
//! gate: they compose on top of `AuthUser`, so role evaluation can never
//! happen for an unauthenticated request, and denial is a distinct 403.

use rocket::Request;
use rocket::State;
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use rocket_okapi::request::OpenApiFromRequest;

use crate::auth::identity::{Identity, Role};
use crate::auth::{AuthError, AuthResult, AuthState};

/// Allow iff the operation declares no roles (role annotations are opt-in)
/// or the authenticated identity's role is among the declared ones.
pub fn role_allowed(required: &[Role], role: Role) -> bool {
    required.is_empty() || required.contains(&role)
}

/// The identity attached to a request after the authentication gate passed.
#[derive(Debug, Clone, OpenApiFromRequest)]
pub struct AuthUser {
    pub identity: Identity,
}

impl AuthUser {
    pub fn role(&self) -> Role {
        self.identity.role
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthUser {
    type Error = AuthError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match extract_identity(request).await {
            Ok(identity) => Outcome::Success(AuthUser { identity }),
            Err(err) => Outcome::Error((err.status(), err)),
        }
    }
}

async fn extract_identity(request: &Request<'_>) -> AuthResult<Identity> {
    let token = bearer_token_from_request(request)?;

    let state = request
        .guard::<&State<AuthState>>()
        .await
        .succeeded()
        .ok_or_else(|| AuthError::Config("AuthState missing from managed state".into()))?;

    state.verifier.verify(token, chrono::Utc::now()).await
}

fn bearer_token_from_request<'r>(request: &'r Request<'_>) -> AuthResult<&'r str> {
    let header = request
        .headers()
        .get_one("Authorization")
        .ok_or(AuthError::Unauthorized)?;
    let mut parts = header.splitn(2, ' ');
    let scheme = parts.next().unwrap_or_default();
    let token = parts.next().unwrap_or_default();
    if scheme.eq_ignore_ascii_case("Bearer") && !token.is_empty() {
        Ok(token)
    } else {
        Err(AuthError::Unauthorized)
    }
}

async fn require_roles(request: &Request<'_>, required: &[Role]) -> Outcome<AuthUser, AuthError> {
    match AuthUser::from_request(request).await {
        Outcome::Success(user) => {
            if role_allowed(required, user.role()) {
                Outcome::Success(user)
            } else {
                Outcome::Error((Status::Forbidden, AuthError::Forbidden))
            }
        }
        Outcome::Error(err) => Outcome::Error(err),
        Outcome::Forward(_) => Outcome::Error((Status::Unauthorized, AuthError::Unauthorized)),
    }
}

#[derive(Debug, Clone, OpenApiFromRequest)]
pub struct RequireAdmin(pub AuthUser);

impl RequireAdmin {
    const REQUIRED: &'static [Role] = &[Role::Admin];
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for RequireAdmin {
    type Error = AuthError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        require_roles(request, Self::REQUIRED).await.map(Self)
    }
}

#[derive(Debug, Clone, OpenApiFromRequest)]
pub struct RequireTherapist(pub AuthUser);

impl RequireTherapist {
    const REQUIRED: &'static [Role] = &[Role::Therapist];
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for RequireTherapist {
    type Error = AuthError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        require_roles(request, Self::REQUIRED).await.map(Self)
    }
}

/// Operations shared by a patient and their therapist.
#[derive(Debug, Clone, OpenApiFromRequest)]
pub struct RequireCareTeam(pub AuthUser);

impl RequireCareTeam {
    const REQUIRED: &'static [Role] = &[Role::Patient, Role::Therapist];
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for RequireCareTeam {
    type Error = AuthError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        require_roles(request, Self::REQUIRED).await.map(Self)
    }
}
