use rocket::request::{FromRequest, Outcome, Request};
use rocket::State;
use rocket_db_pools::sqlx;
use rocket_okapi::request::OpenApiFromRequest;

use crate::auth::{AuthError, AuthResult, AuthState};
use crate::store;

/// Request guard for protected routes: validates the bearer access token
/// (signature, expiry, type claim) and then loads the live user row, so a
/// deactivated or deleted user is rejected even while their token is still
/// cryptographically valid.
#[derive(Debug, Clone, OpenApiFromRequest)]
pub struct AuthUser {
    pub id: i32,
    pub email: String,
    pub role: String,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthUser {
    type Error = AuthError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match extract_user(request).await {
            Ok(user) => Outcome::Success(user),
            Err(err) => Outcome::Error((err.status(), err)),
        }
    }
}

async fn extract_user(request: &Request<'_>) -> AuthResult<AuthUser> {
    let token = bearer_token_from_request(request)?;

    let auth_state = request
        .guard::<&State<AuthState>>()
        .await
        .succeeded()
        .ok_or_else(|| AuthError::Config("AuthState missing from state".into()))?;

    let pool = request
        .guard::<&State<sqlx::PgPool>>()
        .await
        .succeeded()
        .ok_or_else(|| AuthError::Config("database pool missing from state".into()))?;

    let user_id = auth_state.workflow.verify_access(token)?;

    let user = store::find_user_by_id(pool.inner(), user_id)
        .await?
        .ok_or(AuthError::Unauthorized)?;

    if !user.is_active {
        return Err(AuthError::UserInactive);
    }

    let role = store::find_role_by_id(pool.inner(), user.role_id)
        .await?
        .ok_or(AuthError::Unauthorized)?;

    Ok(AuthUser {
        id: user.id,
        email: user.email,
        role: role.name,
    })
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
