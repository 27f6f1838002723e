use rocket::http::{ContentType, Status};
use rocket::response::{self, Responder};
use rocket::{Request, Response};
use okapi::openapi3::Responses;
use rocket_okapi::r#gen::OpenApiGenerator;
use rocket_okapi::response::OpenApiResponderInner;
use serde::Serialize;
use std::io::Cursor;
use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

/// Failure taxonomy for the credential lifecycle.
///
/// The refresh-store kinds (`RefreshNotFound`, `RefreshRevoked`,
/// `RefreshExpired`) are internal: `AuthWorkflow` collapses them into
/// `InvalidRefreshToken` before they reach a caller, so responses never leak
/// which check rejected the token. The same applies to `InvalidCredentials`,
/// which covers both unknown email and wrong password.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("user inactive")]
    UserInactive,
    #[error("invalid refresh token")]
    InvalidRefreshToken,
    #[error("email already registered")]
    EmailTaken,
    #[error("refresh token hash already recorded")]
    DuplicateToken,
    #[error("refresh token not found")]
    RefreshNotFound,
    #[error("refresh token revoked")]
    RefreshRevoked,
    #[error("refresh token expired")]
    RefreshExpired,
    #[error("token expired")]
    Expired,
    #[error("bad token signature")]
    BadSignature,
    #[error("malformed token")]
    Malformed,
    #[error("unauthorized")]
    Unauthorized,
    #[error("unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AuthError {
    pub fn status(&self) -> Status {
        match self {
            AuthError::InvalidCredentials
            | AuthError::InvalidRefreshToken
            | AuthError::RefreshNotFound
            | AuthError::RefreshRevoked
            | AuthError::RefreshExpired
            | AuthError::Expired
            | AuthError::BadSignature
            | AuthError::Unauthorized => Status::Unauthorized,
            AuthError::UserInactive => Status::Forbidden,
            AuthError::EmailTaken | AuthError::DuplicateToken => Status::Conflict,
            AuthError::Validation(_) | AuthError::Malformed => Status::BadRequest,
            AuthError::UnsupportedAlgorithm(_) | AuthError::Config(_) => {
                Status::InternalServerError
            }
            AuthError::Sqlx(_) | AuthError::Json(_) => Status::InternalServerError,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    status: u16,
    message: String,
}

impl<'r> Responder<'r, 'static> for AuthError {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let status = self.status();

        if status == Status::InternalServerError {
            log::error!("auth internal error: {}", self);
        } else {
            log::debug!("auth request rejected: {}", self);
        }

        let body = ErrorBody {
            status: status.code,
            message: self.to_string(),
        };
        let json = serde_json::to_string(&body).unwrap_or_else(|_| {
            r#"{"status":500,"message":"failed to serialize error"}"#.to_string()
        });

        Response::build()
            .status(status)
            .header(ContentType::JSON)
            .sized_body(json.len(), Cursor::new(json))
            .ok()
    }
}

impl OpenApiResponderInner for AuthError {
    fn responses(_gen: &mut OpenApiGenerator) -> rocket_okapi::Result<Responses> {
        Ok(Responses::default())
    }
}
