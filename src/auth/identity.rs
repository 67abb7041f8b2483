//! Identity model and the lookup seam to user storage.
//!
//! The auth core never owns user records: it reads them fresh on every
//! verification and rotation through the injected [`IdentityStore`], so role
//! edits and deactivation take effect on the very next request instead of
//! waiting for token expiry.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::auth::AuthResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Patient,
    Therapist,
    Admin,
    GrowthManager,
}

impl Role {
    pub const ALL: [Role; 4] = [
        Role::Patient,
        Role::Therapist,
        Role::Admin,
        Role::GrowthManager,
    ];

    /// Unknown strings parse to the least-privileged role.
    pub fn from_str(role: &str) -> Self {
        match role {
            "therapist" => Role::Therapist,
            "admin" => Role::Admin,
            "growth_manager" => Role::GrowthManager,
            _ => Role::Patient,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Therapist => "therapist",
            Role::Admin => "admin",
            Role::GrowthManager => "growth_manager",
        }
    }
}

/// A user record as seen by the auth core: read-only, looked up by id.
#[derive(Debug, Clone)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub role: Role,
    pub disabled: bool,
}

/// Login-time view: the identity plus its stored password hash, if the
/// account has local credentials at all.
#[derive(Debug, Clone)]
pub struct CredentialRecord {
    pub identity: Identity,
    pub password_hash: Option<String>,
}

/// The only call the core makes into external state.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<Identity>>;

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<CredentialRecord>>;

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> AuthResult<()>;
}

/// Production store backed by the Postgres users table.
#[derive(Debug, Clone)]
pub struct PgIdentityStore {
    pool: PgPool,
}

impl PgIdentityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityStore for PgIdentityStore {
    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<Identity>> {
        let row = sqlx::query(
            "SELECT id, email, display_name, role, disabled FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let row = match row {
            Some(row) => row,
            None => return Ok(None),
        };

        Ok(Some(Identity {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            display_name: row.try_get("display_name")?,
            role: Role::from_str(row.try_get::<String, _>("role")?.as_str()),
            disabled: row.try_get("disabled")?,
        }))
    }

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<CredentialRecord>> {
        let row = sqlx::query(
            "SELECT id, email, display_name, role, disabled, password_hash FROM users WHERE lower(email) = $1",
        )
        .bind(email.to_lowercase())
        .fetch_optional(&self.pool)
        .await?;

        let row = match row {
            Some(row) => row,
            None => return Ok(None),
        };

        let identity = Identity {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            display_name: row.try_get("display_name")?,
            role: Role::from_str(row.try_get::<String, _>("role")?.as_str()),
            disabled: row.try_get("disabled")?,
        };

        Ok(Some(CredentialRecord {
            identity,
            password_hash: row.try_get("password_hash")?,
        }))
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> AuthResult<()> {
        sqlx::query("UPDATE users SET last_login_at = $1 WHERE id = $2")
            .bind(at)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// In-memory store for tests and local tooling. Mutation helpers exist so
/// tests can change a role or disable an account between token issuance and
/// verification.
#[derive(Debug, Default)]
pub struct MemoryIdentityStore {
    records: RwLock<HashMap<Uuid, CredentialRecord>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, identity: Identity, password_hash: Option<String>) {
        self.write().insert(
            identity.id,
            CredentialRecord {
                identity,
                password_hash,
            },
        );
    }

    pub fn set_role(&self, id: Uuid, role: Role) {
        if let Some(record) = self.write().get_mut(&id) {
            record.identity.role = role;
        }
    }

    pub fn set_disabled(&self, id: Uuid, disabled: bool) {
        if let Some(record) = self.write().get_mut(&id) {
            record.identity.disabled = disabled;
        }
    }

    pub fn remove(&self, id: Uuid) {
        self.write().remove(&id);
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<Uuid, CredentialRecord>> {
        self.records.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<Uuid, CredentialRecord>> {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<Identity>> {
        Ok(self.read().get(&id).map(|record| record.identity.clone()))
    }

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<CredentialRecord>> {
        let email = email.to_lowercase();
        Ok(self
            .read()
            .values()
            .find(|record| record.identity.email.to_lowercase() == email)
            .cloned())
    }

    async fn record_login(&self, _id: Uuid, _at: DateTime<Utc>) -> AuthResult<()> {
        Ok(())
    }
}
