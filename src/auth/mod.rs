//! Credential lifecycle: configuration, password hashing, token minting and
//! verification, refresh-token rotation bookkeeping, the composed user-facing
//! workflows, Rocket request guards, and HTTP route handlers.

use std::sync::Arc;

use rocket_db_pools::sqlx::PgPool;

pub mod config;
pub mod error;
pub mod guards;
pub mod issuer;
pub mod passwords;
pub mod refresh_store;
pub mod responses;
pub mod routes;
pub mod token;
pub mod workflow;

pub use config::AuthConfig;
pub use error::{AuthError, AuthResult};
pub use guards::AuthUser;
pub use issuer::CredentialIssuer;
pub use passwords::PasswordHasher;
pub use refresh_store::RefreshTokenStore;
pub use token::TokenCodec;
pub use workflow::AuthWorkflow;

/// Process-wide auth wiring, built once at startup and managed by Rocket.
#[derive(Clone)]
pub struct AuthState {
    pub config: AuthConfig,
    pub workflow: Arc<AuthWorkflow>,
}

impl AuthState {
    /// Wire up every component from a validated configuration. Fails with
    /// `UnsupportedAlgorithm` on a misconfigured signing scheme, which aborts
    /// boot rather than surfacing per request.
    pub fn from_config(config: AuthConfig, pool: PgPool) -> AuthResult<Self> {
        config.validate()?;
        let codec = Arc::new(TokenCodec::from_config(&config)?);
        let issuer = CredentialIssuer::new(&config, Arc::clone(&codec));
        let refresh_store = RefreshTokenStore::new(pool.clone());
        let workflow = AuthWorkflow::new(
            pool,
            PasswordHasher::new(),
            codec,
            issuer,
            refresh_store,
        );

        Ok(Self {
            config,
            workflow: Arc::new(workflow),
        })
    }
}
