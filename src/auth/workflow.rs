use std::sync::Arc;

use rocket_db_pools::sqlx::PgPool;

use crate::auth::passwords::PasswordHasher;
use crate::auth::responses::{TokenPair, UserSummary};
use crate::auth::token::{TokenClaims, TokenCodec, TokenType};
use crate::auth::{AuthError, AuthResult, CredentialIssuer, RefreshTokenStore};
use crate::store;

/// The user-facing credential operations: register, login, refresh, logout,
/// plus stateless access-token verification. Each call is a short-lived unit
/// of work; anything that must be atomic runs inside a single transaction.
pub struct AuthWorkflow {
    pool: PgPool,
    hasher: PasswordHasher,
    codec: Arc<TokenCodec>,
    issuer: CredentialIssuer,
    refresh_store: RefreshTokenStore,
}

impl AuthWorkflow {
    pub fn new(
        pool: PgPool,
        hasher: PasswordHasher,
        codec: Arc<TokenCodec>,
        issuer: CredentialIssuer,
        refresh_store: RefreshTokenStore,
    ) -> Self {
        Self {
            pool,
            hasher,
            codec,
            issuer,
            refresh_store,
        }
    }

    /// Create a user with a hashed password, creating the role lazily on
    /// first reference. No tokens are issued at registration.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        role_name: &str,
    ) -> AuthResult<UserSummary> {
        let mut tx = self.pool.begin().await?;

        if store::find_user_by_email_tx(&mut tx, email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let role = match store::find_role_by_name_tx(&mut tx, role_name).await? {
            Some(role) => role,
            None => store::insert_role_tx(&mut tx, role_name).await?,
        };

        let hashed = self.hasher.hash(password);
        let user = store::insert_user_tx(&mut tx, email, &hashed, role.id).await?;
        tx.commit().await?;

        log::info!("registered user {} with role {}", user.id, role.name);

        Ok(UserSummary {
            id: user.id,
            email: user.email,
            role: role.name,
        })
    }

    /// Verify the password and issue an access/refresh pair, persisting the
    /// refresh token's hash. Unknown email and wrong password are
    /// indistinguishable to the caller.
    pub async fn login(&self, email: &str, password: &str) -> AuthResult<TokenPair> {
        let user = match store::find_user_by_email(&self.pool, email).await? {
            Some(user) => user,
            None => {
                log::debug!("login rejected: unknown email");
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !self.hasher.verify(password, &user.hashed_password) {
            log::debug!("login rejected for user {}: password mismatch", user.id);
            return Err(AuthError::InvalidCredentials);
        }

        if !user.is_active {
            return Err(AuthError::UserInactive);
        }

        let subject = user.id.to_string();
        let access_token = self.issuer.issue_access(&subject)?;
        let (refresh_token, expires_at) = self.issuer.issue_refresh(&subject)?;

        let mut tx = self.pool.begin().await?;
        self.refresh_store
            .record_tx(&mut tx, user.id, &refresh_token, expires_at)
            .await?;
        tx.commit().await?;

        Ok(TokenPair::bearer(access_token, refresh_token))
    }

    /// Rotate a refresh token: revoke the presented record and insert the
    /// replacement in one transaction, so no window exists where both tokens
    /// are valid and a failed rotation issues nothing.
    ///
    /// Every rejection surfaces as the uniform `InvalidRefreshToken`; the
    /// precise kind (not found, revoked, expired, missing or inactive user)
    /// is only logged. A revoked-token rejection in the logs is the replay
    /// signal for a rotated token.
    pub async fn refresh(&self, raw_token: &str) -> AuthResult<TokenPair> {
        let mut tx = self.pool.begin().await?;

        let record = match self.refresh_store.lookup_active_tx(&mut tx, raw_token).await {
            Ok(record) => record,
            Err(
                err @ (AuthError::RefreshNotFound
                | AuthError::RefreshRevoked
                | AuthError::RefreshExpired),
            ) => {
                log::warn!("refresh rejected: {}", err);
                return Err(AuthError::InvalidRefreshToken);
            }
            Err(err) => return Err(err),
        };

        let user = match store::find_user_by_id_tx(&mut tx, record.user_id).await? {
            Some(user) if user.is_active => user,
            Some(user) => {
                log::warn!("refresh rejected: user {} inactive", user.id);
                return Err(AuthError::InvalidRefreshToken);
            }
            None => {
                log::warn!("refresh rejected: user {} no longer exists", record.user_id);
                return Err(AuthError::InvalidRefreshToken);
            }
        };

        let subject = user.id.to_string();
        let access_token = self.issuer.issue_access(&subject)?;
        let (new_refresh, expires_at) = self.issuer.issue_refresh(&subject)?;

        self.refresh_store.revoke_by_id_tx(&mut tx, record.id).await?;
        self.refresh_store
            .record_tx(&mut tx, user.id, &new_refresh, expires_at)
            .await?;
        tx.commit().await?;

        Ok(TokenPair::bearer(access_token, new_refresh))
    }

    /// Idempotent: revokes the matching record when present and reports
    /// success either way, so logout never leaks whether a token existed.
    pub async fn logout(&self, raw_token: &str) -> AuthResult<()> {
        self.refresh_store.revoke(raw_token).await
    }

    /// Stateless check used on every protected request: signature, expiry,
    /// and the `access` type claim. No storage round-trip.
    pub fn verify_access(&self, token: &str) -> AuthResult<i32> {
        let claims: TokenClaims = self.codec.decode_and_verify(token)?;
        if claims.token_type != TokenType::Access {
            return Err(AuthError::Unauthorized);
        }
        claims.sub.parse().map_err(|_| AuthError::Unauthorized)
    }
}
