/// Password hashing and verification using Argon2id
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("{0}")]
    WeakPassword(String),
    #[error("password hashing failed: {0}")]
    Hash(String),
}

/// Hash a password using Argon2id with a random per-password salt.
///
/// Returns a PHC-formatted hash string safe for database storage.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    validate_password_strength(password)?;

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::Hash(e.to_string()))
}

/// Verify a password against its stored PHC hash (constant-time compare).
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|e| PasswordError::Hash(format!("invalid password hash format: {e}")))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(_) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::Hash(e.to_string())),
    }
}

/// Minimum composition rules: 8..=128 chars with at least one letter and one digit.
pub fn validate_password_strength(password: &str) -> Result<(), PasswordError> {
    if password.chars().count() < 8 {
        return Err(PasswordError::WeakPassword(
            "Password must be at least 8 characters".to_string(),
        ));
    }
    if password.chars().count() > 128 {
        return Err(PasswordError::WeakPassword(
            "Password must be at most 128 characters".to_string(),
        ));
    }

    let has_letter = password.chars().any(|c| c.is_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());

    if !has_letter || !has_digit {
        return Err(PasswordError::WeakPassword(
            "Password must contain at least one letter and one digit".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_valid_password() {
        let password = "correct horse 42";
        let hash = hash_password(password).expect("should hash password successfully");
        assert!(verify_password(password, &hash).expect("should verify successfully"));
    }

    #[test]
    fn test_verify_wrong_password() {
        let hash = hash_password("correct horse 42").unwrap();
        assert!(!verify_password("battery staple 7", &hash).unwrap());
    }

    #[test]
    fn test_weak_password_too_short() {
        let result = hash_password("abc123");
        assert!(matches!(result, Err(PasswordError::WeakPassword(_))));
    }

    #[test]
    fn test_weak_password_no_digit() {
        let result = hash_password("onlyletters");
        assert!(matches!(result, Err(PasswordError::WeakPassword(_))));
    }

    #[test]
    fn test_malformed_hash_is_an_error() {
        assert!(verify_password("whatever1", "not-a-phc-string").is_err());
    }

    #[test]
    fn test_different_hashes_for_same_password() {
        let hash1 = hash_password("correct horse 42").unwrap();
        let hash2 = hash_password("correct horse 42").unwrap();
        assert_ne!(hash1, hash2);
    }
}
