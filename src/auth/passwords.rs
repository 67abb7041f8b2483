//! argon2id password hashing. Callers only ever see hash/verify; the
//! parameters and salt handling stay contained here so they can be tuned
//! without touching the login path.

use argon2::{
    Algorithm, Argon2, ParamsBuilder, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::SaltString,
};
use rand::RngCore;

use crate::auth::{AuthError, AuthResult};

// OWASP-recommended argon2id minimums as of 2024.
const MEMORY_KIB: u32 = 19 * 1024;
const ITERATIONS: u32 = 2;
const LANES: u32 = 1;
const SALT_LEN: usize = 16;

#[derive(Clone)]
pub struct PasswordService {
    argon2: Argon2<'static>,
}

impl PasswordService {
    pub fn new() -> AuthResult<Self> {
        let mut params = ParamsBuilder::new();
        params.m_cost(MEMORY_KIB).t_cost(ITERATIONS).p_cost(LANES);
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params.build()?),
        })
    }

    /// Hash with a fresh random salt. The PHC string embeds salt and
    /// parameters, so nothing else needs to be stored alongside it.
    pub fn hash_password(&self, password: &str) -> AuthResult<String> {
        let mut salt_bytes = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt_bytes);
        let salt = SaltString::encode_b64(&salt_bytes)?;
        Ok(self.argon2.hash_password(password.as_bytes(), &salt)?.to_string())
    }

    /// `Ok(false)` means the password does not match; `Err` means the stored
    /// hash could not be parsed or hashing itself failed.
    pub fn verify_password(&self, password: &str, encoded: &str) -> AuthResult<bool> {
        let parsed = PasswordHash::new(encoded)?;
        match self.argon2.verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(err) => Err(AuthError::from(err)),
        }
    }
}
