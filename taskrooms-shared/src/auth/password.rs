/// Password hashing using Argon2id
///
/// Hashes are produced in PHC string format with a per-password random
/// salt, so the same password never hashes twice to the same string.
/// Verification is constant-time.
///
/// # Parameters
///
/// - Memory: 64 MB
/// - Iterations: 3
/// - Parallelism: 4 lanes
/// - Output: 32 bytes
///
/// # Example
///
/// ```
/// use taskrooms_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("hunter2hunter2")?;
/// assert!(verify_password("hunter2hunter2", &hash)?);
/// assert!(!verify_password("wrong", &hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder, Version,
};

/// Error type for password hashing operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashError(String),

    /// Failed to verify password
    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    /// Invalid password hash format
    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),
}

/// Hashes a password using Argon2id
///
/// Returns a PHC string (algorithm, parameters, salt, and hash), e.g.
///
/// ```text
/// $argon2id$v=19$m=65536,t=3,p=4$c2FsdHNhbHQ$hash...
/// ```
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let params = ParamsBuilder::new()
        .m_cost(65536)
        .t_cost(3)
        .p_cost(4)
        .output_len(32)
        .build()
        .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params);

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))?;

    Ok(password_hash.to_string())
}

/// Verifies a password against a stored hash
///
/// Parameters are read from the hash itself, so hashes created with older
/// parameter sets keep verifying after the defaults change.
///
/// Returns `Ok(false)` for a wrong password; errors are reserved for
/// malformed hashes.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| PasswordError::InvalidHash(format!("Failed to parse hash: {}", e)))?;

    let argon2 = Argon2::default();

    match argon2.verify_password(password.as_bytes(), &parsed_hash) {
        Ok(_) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(format!(
            "Verification failed: {}",
            e
        ))),
    }
}

/// Validates password strength
///
/// Requires at least 8 characters containing at least one letter and one
/// digit. Returns a human-readable reason on failure, surfaced to clients
/// as a validation error.
pub fn validate_password_strength(password: &str) -> Result<(), String> {
    if password.chars().count() < 8 {
        return Err("Password must be at least 8 characters long".to_string());
    }

    if !password.chars().any(|c| c.is_alphabetic()) {
        return Err("Password must contain at least one letter".to_string());
    }

    if !password.chars().any(|c| c.is_numeric()) {
        return Err("Password must contain at least one digit".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_password_format() {
        let hash = hash_password("test_password_123").expect("Hash should succeed");

        assert!(hash.starts_with("$argon2id$"));
        assert!(hash.contains("v=19"));
        assert!(hash.contains("m=65536"));
        assert!(hash.contains("t=3"));
        assert!(hash.contains("p=4"));
    }

    #[test]
    fn test_hash_password_produces_different_salts() {
        let hash1 = hash_password("same_password").expect("Hash 1 should succeed");
        let hash2 = hash_password("same_password").expect("Hash 2 should succeed");

        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_verify_password_roundtrip() {
        let hash = hash_password("correct_password1").expect("Hash should succeed");

        assert!(verify_password("correct_password1", &hash).unwrap());
        assert!(!verify_password("wrong_password", &hash).unwrap());
        assert!(!verify_password("", &hash).unwrap());
    }

    #[test]
    fn test_verify_password_invalid_hash() {
        assert!(verify_password("password", "not_a_hash").is_err());
        assert!(verify_password("password", "$argon2id$truncated").is_err());
    }

    #[test]
    fn test_verify_unicode_passwords() {
        for password in ["with spaces 1", "paßwort-密码-7", "sp€cial!chars9"] {
            let hash = hash_password(password).expect("Hash should succeed");
            assert!(
                verify_password(password, &hash).unwrap(),
                "Password '{}' should verify",
                password
            );
        }
    }

    #[test]
    fn test_validate_password_strength() {
        assert!(validate_password_strength("longenough1").is_ok());
        assert!(validate_password_strength("P4ssword!").is_ok());

        let too_short = validate_password_strength("abc1");
        assert!(too_short.unwrap_err().contains("at least 8 characters"));

        let no_digit = validate_password_strength("onlyletters");
        assert!(no_digit.unwrap_err().contains("digit"));

        let no_letter = validate_password_strength("1234567890");
        assert!(no_letter.unwrap_err().contains("letter"));
    }
}
