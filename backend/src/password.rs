//! Password hashing.
//!
//! Hashes are scrypt-derived keys stored as `<hex key>.<hex salt>`, with
//! N = 2^14, r = 8, p = 1 and a 64-byte key.

use rand::{RngCore, rngs::OsRng};
use scrypt::{Params, scrypt};
use subtle::ConstantTimeEq;
use thiserror::Error;

const LOG_N: u8 = 14;
const R: u32 = 8;
const P: u32 = 1;
const KEY_LEN: usize = 64;
const SALT_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("invalid scrypt parameters")]
    Params,
    #[error("invalid scrypt output length")]
    OutputLength,
    #[error("hashing task failed: {0}")]
    Join(String),
}

fn derive(password: &str, salt: &[u8]) -> Result<[u8; KEY_LEN], PasswordError> {
    let params = Params::new(LOG_N, R, P, KEY_LEN).map_err(|_| PasswordError::Params)?;
    let mut key = [0u8; KEY_LEN];
    scrypt(password.as_bytes(), salt, &params, &mut key).map_err(|_| PasswordError::OutputLength)?;
    Ok(key)
}

/// Hashes `password` with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    let key = derive(password, &salt)?;
    Ok(format!("{}.{}", hex::encode(key), hex::encode(salt)))
}

/// Checks `password` against a stored `hash.salt` string in constant time.
///
/// Malformed stored values never match.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((hash_hex, salt_hex)) = stored.split_once('.') else {
        return false;
    };
    let (Ok(expected), Ok(salt)) = (hex::decode(hash_hex), hex::decode(salt_hex)) else {
        return false;
    };
    if expected.len() != KEY_LEN {
        return false;
    }
    match derive(password, &salt) {
        Ok(actual) => actual.ct_eq(&expected).into(),
        Err(_) => false,
    }
}

/// Runs [`hash_password`] on the blocking pool; scrypt is deliberately slow.
pub async fn hash(password: String) -> Result<String, PasswordError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| PasswordError::Join(e.to_string()))?
}

/// Runs [`verify_password`] on the blocking pool. A failed task counts as a mismatch.
pub async fn verify(password: String, stored: String) -> bool {
    tokio::task::spawn_blocking(move || verify_password(&password, &stored))
        .await
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_has_key_and_salt_parts() {
        let stored = hash_password("hunter22").unwrap();
        let (key, salt) = stored.split_once('.').unwrap();
        assert_eq!(key.len(), KEY_LEN * 2);
        assert_eq!(salt.len(), SALT_LEN * 2);
    }

    #[test]
    fn verify_accepts_the_right_password_only() {
        let stored = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &stored));
        assert!(!verify_password("correct horsf", &stored));
    }

    #[test]
    fn same_password_gets_different_salts() {
        let a = hash_password("pw123456").unwrap();
        let b = hash_password("pw123456").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_hashes_never_verify() {
        assert!(!verify_password("x", ""));
        assert!(!verify_password("x", "no-dot-here"));
        assert!(!verify_password("x", "zz.zz"));
        assert!(!verify_password("x", "abcd.0011"));
    }

    #[test]
    fn tampered_salt_is_rejected() {
        let stored = hash_password("secret1").unwrap();
        let (key, _) = stored.split_once('.').unwrap();
        let forged = format!("{key}.{}", hex::encode([0u8; SALT_LEN]));
        assert!(!verify_password("secret1", &forged));
    }
}
