//! Password hashing using Argon2id.

use crate::error::{CoreError, Result};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

fn peppered<'a>(password: &'a str, pepper: Option<&str>, buf: &'a mut String) -> &'a [u8] {
    match pepper {
        Some(p) => {
            *buf = format!("{p}{password}");
            buf.as_bytes()
        }
        None => password.as_bytes(),
    }
}

/// Hash a password with a random salt, returning a PHC-format string.
///
/// If `pepper` is provided it is prepended to the password first.
pub fn hash_password(password: &str, pepper: Option<&str>) -> Result<String> {
    let mut buf = String::new();
    let input = peppered(password, pepper, &mut buf);
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(input, &salt)?;
    Ok(hash.to_string())
}

/// Verify a plaintext password against an Argon2id PHC-format hash.
///
/// Returns `Ok(true)` on match, `Ok(false)` on mismatch, or
/// `Err(CoreError::Hashing)` if the stored hash is malformed.
pub fn verify_password(password: &str, hash: &str, pepper: Option<&str>) -> Result<bool> {
    let mut buf = String::new();
    let input = peppered(password, pepper, &mut buf);

    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| CoreError::Hashing(format!("invalid hash format: {e}")))?;

    match Argon2::default().verify_password(input, &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(CoreError::Hashing(format!("verify error: {e}"))),
    }
}

/// Fixed salt for [`dummy_verify`]; its output is never stored or compared
const DUMMY_SALT: &str = "c2Vzc2lvbmQtdW5rbm93bi1sb2dpbg";

/// Do the Argon2 work of one [`verify_password`] call and discard the result.
///
/// Sign-in runs this for unknown logins so they take as long as a wrong password.
pub fn dummy_verify(password: &str, pepper: Option<&str>) {
    let mut buf = String::new();
    let input = peppered(password, pepper, &mut buf);
    match SaltString::from_b64(DUMMY_SALT) {
        Ok(salt) => {
            let _ = Argon2::default().hash_password(input, &salt);
        }
        Err(e) => tracing::warn!("Dummy salt rejected: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correct_password_matches() {
        let hash = hash_password("hunter2", None).unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("hunter2", &hash, None).unwrap());
    }

    #[test]
    fn wrong_password_does_not_match() {
        let hash = hash_password("hunter2", None).unwrap();
        assert!(!verify_password("wrong", &hash, None).unwrap());
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let a = hash_password("hunter2", None).unwrap();
        let b = hash_password("hunter2", None).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn pepper_is_applied() {
        let hash = hash_password("hunter2", Some("pepper!")).unwrap();
        assert!(verify_password("hunter2", &hash, Some("pepper!")).unwrap());
        assert!(!verify_password("hunter2", &hash, None).unwrap());
    }

    #[test]
    fn dummy_salt_is_usable() {
        let salt = SaltString::from_b64(DUMMY_SALT).unwrap();
        assert!(Argon2::default().hash_password(b"pw", &salt).is_ok());
        dummy_verify("pw", Some("pepper!"));
    }

    #[test]
    fn malformed_hash_returns_error() {
        let result = verify_password("pw", "not-a-hash", None);
        assert!(matches!(result, Err(CoreError::Hashing(_))));
    }
}
