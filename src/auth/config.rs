use crate::auth::token::SUPPORTED_ALGORITHM;
use crate::auth::{AuthError, AuthResult};

/// Authentication configuration loaded once from environment variables at
/// startup and injected into each component; token and hash logic never reads
/// the environment.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_algorithm: String,
    pub access_token_minutes: i64,
    pub refresh_token_days: i64,
}

impl AuthConfig {
    pub fn from_env() -> AuthResult<Self> {
        let jwt_secret = std::env::var("JWT_SECRET")
            .map_err(|_| AuthError::Config("JWT_SECRET is required".into()))?;
        let jwt_algorithm =
            std::env::var("JWT_ALG").unwrap_or_else(|_| SUPPORTED_ALGORITHM.into());
        let access_token_minutes =
            parse_duration("ACCESS_TOKEN_MINUTES", std::env::var("ACCESS_TOKEN_MINUTES").ok(), 15)?;
        let refresh_token_days =
            parse_duration("REFRESH_TOKEN_DAYS", std::env::var("REFRESH_TOKEN_DAYS").ok(), 7)?;

        let config = Self {
            jwt_secret,
            jwt_algorithm,
            access_token_minutes,
            refresh_token_days,
        };
        config.validate()?;
        Ok(config)
    }

    /// Startup validation: a misconfigured signing scheme must abort boot
    /// rather than fail per request.
    pub fn validate(&self) -> AuthResult<()> {
        if self.jwt_algorithm != SUPPORTED_ALGORITHM {
            return Err(AuthError::UnsupportedAlgorithm(self.jwt_algorithm.clone()));
        }
        if self.jwt_secret.is_empty() {
            return Err(AuthError::Config("JWT_SECRET must not be empty".into()));
        }
        if self.access_token_minutes <= 0 || self.refresh_token_days <= 0 {
            return Err(AuthError::Config(
                "token lifetimes must be positive".into(),
            ));
        }
        if self.jwt_secret.len() < 32 {
            log::warn!(
                "JWT_SECRET is shorter than the recommended 32 bytes ({} bytes)",
                self.jwt_secret.len()
            );
        }
        Ok(())
    }
}

/// A set-but-unparseable duration variable aborts startup; only an unset
/// variable falls back to the default.
fn parse_duration(name: &str, raw: Option<String>, default: i64) -> AuthResult<i64> {
    match raw {
        Some(value) => value
            .parse::<i64>()
            .map_err(|_| AuthError::Config(format!("{} must be an integer, got {:?}", name, value))),
        None => Ok(default),
    }
}
