use chrono::{DateTime, Utc};
use rocket_db_pools::sqlx::FromRow;
use serde::{Deserialize, Serialize};

/// User identity row. The password digest is stored as
/// `<hex_salt>$<hex_digest>`; the raw password never reaches storage.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub hashed_password: String,
    pub role_id: i32,
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Role {
    pub id: i32,
    pub name: String,
}

/// Audit-trail row for an issued refresh token. Only the SHA-256 hex hash of
/// the raw token is kept; rows are revoked, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RefreshTokenRecord {
    pub id: i32,
    pub user_id: i32,
    pub token_hash: String,
    pub revoked: bool,
    pub expires_at: DateTime<Utc>,
}
