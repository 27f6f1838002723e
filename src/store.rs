//! Lookups and inserts on the user/role relations.
//!
//! The credential workflows consume these as plain queries against
//! unique-keyed tables; everything runs on a caller-supplied transaction so a
//! workflow stays a single atomic unit of work.

use std::ops::DerefMut;

use rocket_db_pools::sqlx::{self, PgPool, Postgres, Transaction};

use crate::auth::AuthResult;
use crate::models::{Role, User};

pub async fn find_user_by_email_tx(
    tx: &mut Transaction<'_, Postgres>,
    email: &str,
) -> AuthResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, email, hashed_password, role_id, is_active, created_at FROM users WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(tx.deref_mut())
    .await?;
    Ok(user)
}

pub async fn find_user_by_email(pool: &PgPool, email: &str) -> AuthResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, email, hashed_password, role_id, is_active, created_at FROM users WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

pub async fn find_user_by_id_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: i32,
) -> AuthResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, email, hashed_password, role_id, is_active, created_at FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(tx.deref_mut())
    .await?;
    Ok(user)
}

pub async fn find_user_by_id(pool: &PgPool, user_id: i32) -> AuthResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, email, hashed_password, role_id, is_active, created_at FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

pub async fn find_role_by_name_tx(
    tx: &mut Transaction<'_, Postgres>,
    name: &str,
) -> AuthResult<Option<Role>> {
    let role = sqlx::query_as::<_, Role>("SELECT id, name FROM roles WHERE name = $1")
        .bind(name)
        .fetch_optional(tx.deref_mut())
        .await?;
    Ok(role)
}

pub async fn find_role_by_id(pool: &PgPool, role_id: i32) -> AuthResult<Option<Role>> {
    let role = sqlx::query_as::<_, Role>("SELECT id, name FROM roles WHERE id = $1")
        .bind(role_id)
        .fetch_optional(pool)
        .await?;
    Ok(role)
}

pub async fn insert_role_tx(
    tx: &mut Transaction<'_, Postgres>,
    name: &str,
) -> AuthResult<Role> {
    let role = sqlx::query_as::<_, Role>("INSERT INTO roles (name) VALUES ($1) RETURNING id, name")
        .bind(name)
        .fetch_one(tx.deref_mut())
        .await?;
    Ok(role)
}

pub async fn insert_user_tx(
    tx: &mut Transaction<'_, Postgres>,
    email: &str,
    hashed_password: &str,
    role_id: i32,
) -> AuthResult<User> {
    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (email, hashed_password, role_id, is_active)
        VALUES ($1, $2, $3, TRUE)
        RETURNING id, email, hashed_password, role_id, is_active, created_at
        "#,
    )
    .bind(email)
    .bind(hashed_password)
    .bind(role_id)
    .fetch_one(tx.deref_mut())
    .await?;
    Ok(user)
}
