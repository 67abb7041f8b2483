use rocket::http::Status;
use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

/// Failure taxonomy for the authentication core.
///
/// Token-shaped failures (`TokenMalformed`, `TokenInvalid`, `TokenExpired`,
/// `WrongPurpose`) are indistinguishable at the HTTP boundary: every one maps
/// to 401 so a caller probing the API learns nothing about which check
/// tripped. Authorization denial (`Forbidden`) is a distinct outcome and maps
/// to 403.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("account disabled")]
    AccountDisabled,
    #[error("token malformed")]
    TokenMalformed,
    #[error("token invalid")]
    TokenInvalid,
    #[error("token expired")]
    TokenExpired,
    #[error("wrong token purpose")]
    WrongPurpose,
    #[error("unauthorized")]
    Unauthorized,
    #[error("forbidden")]
    Forbidden,
    #[error("configuration error: {0}")]
    Config(String),
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("argon2 parameter error: {0}")]
    Argon2(String),
    #[error("password hashing error: {0}")]
    PasswordHash(String),
}

impl AuthError {
    pub fn status(&self) -> Status {
        match self {
            AuthError::InvalidCredentials
            | AuthError::TokenMalformed
            | AuthError::TokenInvalid
            | AuthError::TokenExpired
            | AuthError::WrongPurpose
            | AuthError::Unauthorized => Status::Unauthorized,
            AuthError::AccountDisabled | AuthError::Forbidden => Status::Forbidden,
            AuthError::Config(_)
            | AuthError::Sqlx(_)
            | AuthError::Argon2(_)
            | AuthError::PasswordHash(_) => Status::InternalServerError,
        }
    }
}

impl From<argon2::Error> for AuthError {
    fn from(err: argon2::Error) -> Self {
        AuthError::Argon2(err.to_string())
    }
}

impl From<argon2::password_hash::Error> for AuthError {
    fn from(err: argon2::password_hash::Error) -> Self {
        AuthError::PasswordHash(err.to_string())
    }
}
