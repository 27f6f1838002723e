use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

use crate::auth::token::constant_time_eq;

type HmacSha256 = Hmac<Sha256>;

const SALT_LEN: usize = 16;
const DIGEST_LEN: usize = 32;
const PBKDF2_ITERATIONS: u32 = 120_000;

/// Derives and verifies salted password digests.
///
/// Stored record format: `<hex_salt>$<hex_digest>` with a 16-byte random salt
/// (32 hex chars) and a PBKDF2-HMAC-SHA256 digest over 120 000 iterations
/// (64 hex chars). The hex-encoded salt string itself is the PBKDF2 salt
/// input, so records are interchangeable with other implementations of the
/// same format.
#[derive(Debug, Clone, Default)]
pub struct PasswordHasher;

impl PasswordHasher {
    pub fn new() -> Self {
        Self
    }

    pub fn hash(&self, password: &str) -> String {
        let mut salt_bytes = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt_bytes);
        let salt = hex::encode(salt_bytes);
        let digest = pbkdf2_sha256(password.as_bytes(), salt.as_bytes(), PBKDF2_ITERATIONS);
        format!("{}${}", salt, hex::encode(digest))
    }

    /// A malformed stored record is an expected condition, not an error:
    /// verification simply fails.
    pub fn verify(&self, password: &str, record: &str) -> bool {
        let Some((salt, digest_hex)) = record.split_once('$') else {
            return false;
        };
        let Ok(expected) = hex::decode(digest_hex) else {
            return false;
        };
        let candidate = pbkdf2_sha256(password.as_bytes(), salt.as_bytes(), PBKDF2_ITERATIONS);
        constant_time_eq(&candidate, &expected)
    }
}

/// PBKDF2-HMAC-SHA256, single-block variant: the derived key length equals
/// the SHA-256 output size, so only block index 1 is computed.
fn pbkdf2_sha256(password: &[u8], salt: &[u8], iterations: u32) -> [u8; DIGEST_LEN] {
    let mut mac =
        HmacSha256::new_from_slice(password).expect("HMAC accepts keys of any length");
    mac.update(salt);
    mac.update(&1u32.to_be_bytes());
    let mut block: [u8; DIGEST_LEN] = mac.finalize().into_bytes().into();

    let mut output = block;
    for _ in 1..iterations {
        let mut mac =
            HmacSha256::new_from_slice(password).expect("HMAC accepts keys of any length");
        mac.update(&block);
        block = mac.finalize().into_bytes().into();
        for (out, byte) in output.iter_mut().zip(block.iter()) {
            *out ^= byte;
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    // Published PBKDF2-HMAC-SHA256 test vectors (password "password",
    // salt "salt", 32-byte derived key).
    #[test]
    fn pbkdf2_matches_known_vectors() {
        let one = pbkdf2_sha256(b"password", b"salt", 1);
        assert_eq!(
            hex::encode(one),
            "120fb6cffcf8b32c43e7225256c4f837a86548c92ccc35480805987cb70be17b"
        );

        let many = pbkdf2_sha256(b"password", b"salt", 4096);
        assert_eq!(
            hex::encode(many),
            "c5e478d59288c841aa530db6845c4c8d962893a001ce4e11a4963873aa98134a"
        );
    }

    #[test]
    fn hashes_and_verifies_passwords() {
        let hasher = PasswordHasher::new();
        let record = hasher.hash("super-secret");
        assert!(hasher.verify("super-secret", &record));
        assert!(!hasher.verify("wrong-password", &record));
    }

    #[test]
    fn record_format_is_hex_salt_and_hex_digest() {
        let hasher = PasswordHasher::new();
        let record = hasher.hash("pw123");
        let (salt, digest) = record.split_once('$').expect("separator present");
        assert_eq!(salt.len(), 32);
        assert_eq!(digest.len(), 64);
        assert!(salt.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn salts_are_random_but_both_records_verify() {
        let hasher = PasswordHasher::new();
        let first = hasher.hash("pw123");
        let second = hasher.hash("pw123");
        assert_ne!(first, second);
        assert!(hasher.verify("pw123", &first));
        assert!(hasher.verify("pw123", &second));
    }

    #[test]
    fn malformed_records_fail_closed() {
        let hasher = PasswordHasher::new();
        assert!(!hasher.verify("pw123", ""));
        assert!(!hasher.verify("pw123", "no-separator"));
        assert!(!hasher.verify("pw123", "abc$not-hex"));
    }
}
