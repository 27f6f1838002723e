use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;

use crate::auth::{AuthConfig, AuthError, AuthResult};

type HmacSha256 = Hmac<Sha256>;

/// The single symmetric signing scheme this service supports.
pub const SUPPORTED_ALGORITHM: &str = "HS256";

/// Discriminates access tokens from refresh tokens inside the signed payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Claim set carried by every issued token. Timestamps are Unix seconds.
///
/// `jti` is carried by refresh tokens only: without it, two refresh tokens
/// minted for the same subject in the same second would be byte-identical
/// and collide on the stored hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    pub iat: i64,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

/// Builds and verifies compact signed tokens: three unpadded base64url
/// segments (`header.payload.signature`) with an HMAC-SHA256 signature over
/// the first two. Header and payload are canonical JSON (sorted keys, no
/// whitespace) so identical claims always produce identical signatures.
///
/// Claims are opaque key/value pairs to the codec; `type` discrimination is
/// the caller's responsibility.
#[derive(Debug)]
pub struct TokenCodec {
    secret: Vec<u8>,
    header_b64: String,
}

impl TokenCodec {
    /// Fails with `UnsupportedAlgorithm` when the configured scheme is not
    /// HS256, so a misconfigured deployment aborts at startup instead of
    /// failing per request.
    pub fn from_config(config: &AuthConfig) -> AuthResult<Self> {
        if config.jwt_algorithm != SUPPORTED_ALGORITHM {
            return Err(AuthError::UnsupportedAlgorithm(
                config.jwt_algorithm.clone(),
            ));
        }

        let header = serde_json::json!({ "alg": SUPPORTED_ALGORITHM, "typ": "JWT" });
        let header_b64 = URL_SAFE_NO_PAD.encode(canonical_json(&header)?);

        Ok(Self {
            secret: config.jwt_secret.as_bytes().to_vec(),
            header_b64,
        })
    }

    pub fn encode<T: Serialize>(&self, claims: &T) -> AuthResult<String> {
        let payload = serde_json::to_value(claims)?;
        let payload_b64 = URL_SAFE_NO_PAD.encode(canonical_json(&payload)?);
        let signing_input = format!("{}.{}", self.header_b64, payload_b64);
        let signature = URL_SAFE_NO_PAD.encode(self.sign(signing_input.as_bytes()));
        Ok(format!("{}.{}", signing_input, signature))
    }

    /// Splits into exactly three segments, recomputes the signature over the
    /// first two and compares it constant time against the third, then checks
    /// `exp` against the current clock.
    ///
    /// Verification never reads the token's own `alg` header: the signature
    /// is always recomputed with the server-configured scheme and key, which
    /// closes off algorithm-substitution attacks.
    pub fn decode_and_verify<T: DeserializeOwned>(&self, token: &str) -> AuthResult<T> {
        let segments: Vec<&str> = token.split('.').collect();
        let [header_b64, payload_b64, signature_b64] = segments[..] else {
            return Err(AuthError::Malformed);
        };

        let presented = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| AuthError::Malformed)?;
        let signing_input = format!("{}.{}", header_b64, payload_b64);
        let expected = self.sign(signing_input.as_bytes());
        if !constant_time_eq(&expected, &presented) {
            return Err(AuthError::BadSignature);
        }

        let payload_bytes = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| AuthError::Malformed)?;
        let payload: Value =
            serde_json::from_slice(&payload_bytes).map_err(|_| AuthError::Malformed)?;

        let exp = payload
            .get("exp")
            .and_then(Value::as_i64)
            .ok_or(AuthError::Malformed)?;
        if exp < Utc::now().timestamp() {
            return Err(AuthError::Expired);
        }

        serde_json::from_value(payload).map_err(|_| AuthError::Malformed)
    }

    fn sign(&self, input: &[u8]) -> Vec<u8> {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts keys of any length");
        mac.update(input);
        mac.finalize().into_bytes().to_vec()
    }
}

/// Canonical JSON: object keys sorted, no incidental whitespace. Scalars and
/// strings are delegated to serde_json, which already emits them compactly.
fn canonical_json(value: &Value) -> AuthResult<String> {
    let mut out = String::new();
    write_canonical(value, &mut out)?;
    Ok(out)
}

fn write_canonical(value: &Value, out: &mut String) -> AuthResult<()> {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(key)?);
                out.push(':');
                write_canonical(&map[key.as_str()], out)?;
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out)?;
            }
            out.push(']');
        }
        scalar => out.push_str(&serde_json::to_string(scalar)?),
    }
    Ok(())
}

/// Constant-time comparison to avoid timing side-channels.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (&x, &y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }

    result == 0
}
