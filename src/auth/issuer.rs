use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;

use crate::auth::token::{TokenClaims, TokenCodec, TokenType};
use crate::auth::{AuthConfig, AuthResult};

/// Mints access/refresh token pairs for a verified subject by building claim
/// sets and delegating signing to the codec. TTLs come from the immutable
/// startup configuration.
pub struct CredentialIssuer {
    codec: Arc<TokenCodec>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl CredentialIssuer {
    pub fn new(config: &AuthConfig, codec: Arc<TokenCodec>) -> Self {
        Self {
            codec,
            access_ttl: Duration::minutes(config.access_token_minutes),
            refresh_ttl: Duration::days(config.refresh_token_days),
        }
    }

    pub fn issue_access(&self, subject: &str) -> AuthResult<String> {
        let now = Utc::now();
        self.codec.encode(&TokenClaims {
            sub: subject.to_string(),
            token_type: TokenType::Access,
            iat: now.timestamp(),
            exp: (now + self.access_ttl).timestamp(),
            jti: None,
        })
    }

    /// Returns the raw token together with its expiry so the caller can
    /// persist the refresh record. Each token carries a random `jti`, so two
    /// issuances for the same subject in the same second never hash alike.
    pub fn issue_refresh(&self, subject: &str) -> AuthResult<(String, DateTime<Utc>)> {
        let now = Utc::now();
        let expires_at = now + self.refresh_ttl;
        let token = self.codec.encode(&TokenClaims {
            sub: subject.to_string(),
            token_type: TokenType::Refresh,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Some(fresh_token_id()),
        })?;
        Ok((token, expires_at))
    }
}

fn fresh_token_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
