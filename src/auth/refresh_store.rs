use std::ops::DerefMut;

use chrono::{DateTime, Utc};
use rocket_db_pools::sqlx::{self, PgPool, Postgres, Transaction};
use sha2::{Digest, Sha256};

use crate::auth::{AuthError, AuthResult};
use crate::models::RefreshTokenRecord;

/// Persistent bookkeeping for issued refresh tokens.
///
/// Only a one-way SHA-256 hash of each raw token is stored (a lookup key,
/// not a password, so a single fast hash is sufficient). Rows are revoked in
/// place rather than deleted, keeping an append-only audit trail, and the
/// unique hash column guarantees no duplicate token is ever trusted.
#[derive(Debug, Clone)]
pub struct RefreshTokenStore {
    pool: PgPool,
}

impl RefreshTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Insert a fresh record for a newly issued token. A hash collision or
    /// token reuse is a conflict, never a silent overwrite.
    pub async fn record_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: i32,
        raw_token: &str,
        expires_at: DateTime<Utc>,
    ) -> AuthResult<()> {
        let result = sqlx::query(
            "INSERT INTO refresh_tokens (user_id, token_hash, revoked, expires_at) VALUES ($1, $2, FALSE, $3)",
        )
        .bind(user_id)
        .bind(token_fingerprint(raw_token))
        .bind(expires_at)
        .execute(tx.deref_mut())
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => Err(AuthError::DuplicateToken),
            Err(err) => Err(err.into()),
        }
    }

    /// Find the record for a presented raw token and require it to be both
    /// unrevoked and unexpired. The row is locked so a concurrent rotation of
    /// the same token serializes behind this transaction.
    ///
    /// The three failure kinds stay distinguishable here for observability;
    /// the workflow collapses them before anything reaches a caller.
    pub async fn lookup_active_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        raw_token: &str,
    ) -> AuthResult<RefreshTokenRecord> {
        let record = sqlx::query_as::<_, RefreshTokenRecord>(
            "SELECT id, user_id, token_hash, revoked, expires_at FROM refresh_tokens WHERE token_hash = $1 FOR UPDATE",
        )
        .bind(token_fingerprint(raw_token))
        .fetch_optional(tx.deref_mut())
        .await?;

        let record = record.ok_or(AuthError::RefreshNotFound)?;

        if record.revoked {
            return Err(AuthError::RefreshRevoked);
        }
        if record.expires_at < Utc::now() {
            return Err(AuthError::RefreshExpired);
        }

        Ok(record)
    }

    pub async fn revoke_by_id_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        record_id: i32,
    ) -> AuthResult<()> {
        sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE id = $1")
            .bind(record_id)
            .execute(tx.deref_mut())
            .await?;
        Ok(())
    }

    /// Idempotent revocation by raw token. A token that was never recorded is
    /// a no-op, so logout cannot be used to probe which tokens exist.
    pub async fn revoke(&self, raw_token: &str) -> AuthResult<()> {
        sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE token_hash = $1")
            .bind(token_fingerprint(raw_token))
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// One-way lookup key for a raw refresh token.
fn token_fingerprint(raw_token: &str) -> String {
    hex::encode(Sha256::digest(raw_token.as_bytes()))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err)
            if db_err.code().map(|code| code == "23505").unwrap_or(false)
    )
}
