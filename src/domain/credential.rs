//! Password hashing.
//!
//! Plain-text passwords never reach storage: they are hashed with Argon2id
//! and a random salt, and persisted as a PHC string.

use crate::config::PasswordHashConfig;
use argon2::{Algorithm, Argon2, Params, Version};
use password_hash::rand_core::OsRng;
use password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("password must not be empty")]
    EmptyPassword,
    #[error("invalid hashing parameters: {0}")]
    InvalidParams(String),
    #[error("failed to hash password: {0}")]
    Hash(String),
}

/// A salted Argon2id hash in PHC string format.
#[derive(Clone, PartialEq, Eq)]
pub struct HashedPassword(String);

impl HashedPassword {
    /// Hash a plain-text password with a fresh random salt.
    pub fn hash(plain: &str, config: &PasswordHashConfig) -> Result<Self, CredentialError> {
        if plain.is_empty() {
            return Err(CredentialError::EmptyPassword);
        }

        let params = Params::new(
            config.memory_kib,
            config.iterations,
            config.parallelism,
            None,
        )
        .map_err(|e| CredentialError::InvalidParams(e.to_string()))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let salt = SaltString::generate(&mut OsRng);
        let hash = argon2
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| CredentialError::Hash(e.to_string()))?;

        Ok(HashedPassword(hash.to_string()))
    }

    /// Wrap a PHC string read back from storage.
    pub fn from_phc(phc: String) -> Self {
        HashedPassword(phc)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check a plain-text password against this hash.
    ///
    /// Returns false for a malformed stored hash.
    pub fn verify(&self, plain: &str) -> bool {
        match PasswordHash::new(&self.0) {
            Ok(parsed) => Argon2::default()
                .verify_password(plain.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }
}

impl std::fmt::Debug for HashedPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("HashedPassword(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> PasswordHashConfig {
        PasswordHashConfig {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        }
    }

    #[test]
    fn test_hash_is_not_plaintext_and_verifies() {
        let hashed = HashedPassword::hash("password", &cheap()).unwrap();
        assert_ne!(hashed.as_str(), "password");
        assert!(hashed.as_str().starts_with("$argon2id$"));
        assert!(hashed.verify("password"));
        assert!(!hashed.verify("Password"));
    }

    #[test]
    fn test_same_password_gets_distinct_salts() {
        let a = HashedPassword::hash("password", &cheap()).unwrap();
        let b = HashedPassword::hash("password", &cheap()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_empty_password_rejected() {
        assert!(matches!(
            HashedPassword::hash("", &cheap()),
            Err(CredentialError::EmptyPassword)
        ));
    }

    #[test]
    fn test_invalid_params_rejected() {
        let config = PasswordHashConfig {
            memory_kib: 1,
            iterations: 0,
            parallelism: 0,
        };
        assert!(matches!(
            HashedPassword::hash("password", &config),
            Err(CredentialError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_malformed_stored_hash_does_not_verify() {
        let stored = HashedPassword::from_phc("plaintext".to_string());
        assert!(!stored.verify("plaintext"));
    }

    #[test]
    fn test_debug_redacts() {
        let hashed = HashedPassword::hash("password", &cheap()).unwrap();
        assert_eq!(format!("{:?}", hashed), "HashedPassword(<redacted>)");
    }
}
