//! Service health endpoint used for readiness checks and tests.

use rocket::serde::json::Json;
use rocket::State;
use rocket_db_pools::sqlx::{self, PgPool};
use rocket_okapi::okapi::schemars::JsonSchema;
use rocket_okapi::openapi;
use serde::{Deserialize, Serialize};

use crate::auth::AuthError;

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Health check: a trivial round-trip through the connection pool, so a
/// wedged database shows up here before it shows up in auth failures.
#[openapi(tag = "Health")]
#[get("/health")]
pub async fn health_check(pool: &State<PgPool>) -> Result<Json<HealthResponse>, AuthError> {
    sqlx::query("SELECT 1").execute(pool.inner()).await?;
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
    }))
}
