use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::{get, post, State};
use rocket_okapi::openapi;

use crate::auth::responses::{
    LoginRequest, LogoutRequest, LogoutResponse, RefreshRequest, RegisterRequest, TokenPair,
    UserSummary,
};
use crate::auth::{AuthError, AuthState, AuthUser};

#[openapi(tag = "Auth")]
#[post("/auth/register", data = "<payload>")]
pub async fn register(
    state: &State<AuthState>,
    payload: Json<RegisterRequest>,
) -> Result<status::Custom<Json<UserSummary>>, AuthError> {
    let email = payload.email.trim().to_lowercase();
    let role = payload.role.trim();

    if email.is_empty() || payload.password.is_empty() || role.is_empty() {
        return Err(AuthError::Validation(
            "email, password and role are required".into(),
        ));
    }

    let summary = state
        .workflow
        .register(&email, &payload.password, role)
        .await?;

    Ok(status::Custom(Status::Created, Json(summary)))
}

#[openapi(tag = "Auth")]
#[post("/auth/login", data = "<payload>")]
pub async fn login(
    state: &State<AuthState>,
    payload: Json<LoginRequest>,
) -> Result<Json<TokenPair>, AuthError> {
    let email = payload.email.trim().to_lowercase();

    if email.is_empty() || payload.password.is_empty() {
        return Err(AuthError::Validation(
            "email and password are required".into(),
        ));
    }

    let pair = state.workflow.login(&email, &payload.password).await?;
    Ok(Json(pair))
}

#[openapi(tag = "Auth")]
#[post("/auth/refresh", data = "<payload>")]
pub async fn refresh(
    state: &State<AuthState>,
    payload: Json<RefreshRequest>,
) -> Result<Json<TokenPair>, AuthError> {
    let pair = state.workflow.refresh(&payload.refresh_token).await?;
    Ok(Json(pair))
}

/// Always reports success: revocation is idempotent and the response must not
/// reveal whether the presented token ever existed.
#[openapi(tag = "Auth")]
#[post("/auth/logout", data = "<payload>")]
pub async fn logout(
    state: &State<AuthState>,
    payload: Json<LogoutRequest>,
) -> Result<Json<LogoutResponse>, AuthError> {
    state.workflow.logout(&payload.refresh_token).await?;
    Ok(Json(LogoutResponse { ok: true }))
}

/// Protected resource: the guard has already verified the access token and
/// loaded the live user row.
#[openapi(tag = "Auth")]
#[get("/me")]
pub async fn me(user: AuthUser) -> Json<UserSummary> {
    Json(UserSummary {
        id: user.id,
        email: user.email,
        role: user.role,
    })
}
