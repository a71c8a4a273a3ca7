//! Credential hashing with Argon2id.
//!
//! Hashes are stored as PHC strings, so salt and parameters travel with them.

use crate::error::{Result, WorkflowError};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

pub const MIN_PASSWORD_CHARS: usize = 6;

pub fn hash_password(password: &str) -> Result<String> {
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(WorkflowError::ValidationError(format!(
            "password must be at least {MIN_PASSWORD_CHARS} characters"
        )));
    }
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| WorkflowError::internal(format!("failed to hash password: {e}")))
}

/// Returns false on mismatch; errors only on a malformed stored hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| WorkflowError::internal(format!("invalid password hash format: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("steppe-wind").unwrap();

        assert!(hash.starts_with("$argon2id"));
        assert!(verify_password("steppe-wind", &hash).unwrap());
        assert!(!verify_password("steppe-rain", &hash).unwrap());
    }

    #[test]
    fn test_salts_differ() {
        let first = hash_password("same-password").unwrap();
        let second = hash_password("same-password").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_short_password_rejected() {
        assert!(matches!(
            hash_password("abc"),
            Err(WorkflowError::ValidationError(_))
        ));
    }

    #[test]
    fn test_invalid_hash_format() {
        assert!(verify_password("password", "not-a-hash").is_err());
    }
}
