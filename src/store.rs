//! Credential store: the Postgres `users` table plus the scan counter the
//! dashboard reads. Behind a trait so the HTTP layer can be exercised against
//! an in-memory implementation in tests.
//!
//! Every operation is a single-row read or write; no multi-statement
//! transactions are needed anywhere in this subsystem.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use std::time::Duration;
use uuid::Uuid;

use crate::identity::Identity;

/// Full user row, hash included. Only the login path sees this; everything
/// else works with [`Identity`].
#[derive(Debug, Clone, FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

impl UserRecord {
    pub fn identity(&self) -> Identity {
        Identity { id: self.id, name: self.name.clone(), email: self.email.clone() }
    }
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Row for a login attempt, hash included. Email matches are exact,
    /// case-sensitive, as stored.
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>>;
    /// Re-validate a token subject on every protected request.
    async fn find_identity(&self, id: Uuid) -> Result<Option<Identity>>;
    async fn insert_user(&self, name: &str, email: &str, password_hash: &str) -> Result<Identity>;
    /// Rows in `dog_breed_scans` for this email. The table is owned by the
    /// inference service; this side only counts.
    async fn scan_count(&self, email: &str) -> Result<i64>;
}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Handle for the owner to close on shutdown.
    pub fn pool(&self) -> PgPool {
        self.pool.clone()
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let row = sqlx::query_as::<_, UserRecord>(
            "SELECT id, name, email, password_hash FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_identity(&self, id: Uuid) -> Result<Option<Identity>> {
        let row = sqlx::query_as::<_, Identity>(
            "SELECT id, name, email FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert_user(&self, name: &str, email: &str, password_hash: &str) -> Result<Identity> {
        let row = sqlx::query_as::<_, Identity>(
            "INSERT INTO users (id, name, email, password_hash) VALUES ($1, $2, $3, $4) \
             RETURNING id, name, email",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn scan_count(&self, email: &str) -> Result<i64> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM dog_breed_scans WHERE user_email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;
        Ok(total)
    }
}
