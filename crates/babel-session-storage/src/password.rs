//! Argon2id password hashes keyed with the server secret.
//!
//! Stored form is the PHC string (`$argon2id$v=19$m=..,t=..,p=..$salt$hash`),
//! so cost parameters travel with each hash.

use argon2::password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Version};
use uuid::Uuid;

use crate::traits::{StorageError, StorageResult};

pub use argon2::Params as PasswordParams;

/// Minimum accepted password length
pub const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Clone)]
pub struct PasswordHasher {
    secret: Vec<u8>,
    params: PasswordParams,
}

impl std::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHasher")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl PasswordHasher {
    /// Hasher with the default Argon2id cost
    pub fn new(secret: impl Into<String>) -> Self {
        Self::with_params(secret, PasswordParams::default())
    }

    pub fn with_params(secret: impl Into<String>, params: PasswordParams) -> Self {
        Self {
            secret: secret.into().into_bytes(),
            params,
        }
    }

    fn argon2(&self) -> StorageResult<Argon2<'_>> {
        Argon2::new_with_secret(
            &self.secret,
            Algorithm::Argon2id,
            Version::V0x13,
            self.params.clone(),
        )
        .map_err(|e| StorageError::Internal(format!("Invalid password hasher setup: {}", e)))
    }

    pub fn hash(&self, password: &str) -> StorageResult<String> {
        let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes())
            .map_err(|e| StorageError::Internal(format!("Failed to encode salt: {}", e)))?;
        let hash = self
            .argon2()?
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| StorageError::Internal(format!("Failed to hash password: {}", e)))?;
        Ok(hash.to_string())
    }

    /// Check a password against a stored hash; malformed hashes never match
    pub fn verify(&self, password: &str, stored: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(stored) else {
            return false;
        };
        self.argon2()
            .is_ok_and(|argon2| argon2.verify_password(password.as_bytes(), &parsed).is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn hasher(secret: &str) -> PasswordHasher {
        PasswordHasher::with_params(secret, PasswordParams::new(64, 1, 1, None).unwrap())
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = hasher(SECRET);
        let stored = hasher.hash("correct horse").unwrap();

        assert!(stored.starts_with("$argon2id$v=19$m=64,t=1,p=1$"));
        assert!(!stored.contains("correct horse"));
        assert!(hasher.verify("correct horse", &stored));
        assert!(!hasher.verify("wrong horse", &stored));
    }

    #[test]
    fn test_default_cost() {
        let stored = PasswordHasher::new(SECRET).hash("correct horse").unwrap();
        let parsed = PasswordHash::new(&stored).unwrap();
        let params = PasswordParams::try_from(&parsed).unwrap();

        assert_eq!(params.m_cost(), PasswordParams::DEFAULT_M_COST);
        assert_eq!(params.t_cost(), PasswordParams::DEFAULT_T_COST);
    }

    #[test]
    fn test_salts_differ() {
        let hasher = hasher(SECRET);
        assert_ne!(hasher.hash("same").unwrap(), hasher.hash("same").unwrap());
    }

    #[test]
    fn test_secret_is_part_of_hash() {
        let stored = hasher(SECRET).hash("password1").unwrap();
        let other = hasher("another-secret-that-is-long-enough!!");
        assert!(!other.verify("password1", &stored));
    }

    #[test]
    fn test_hash_from_stronger_params_still_verifies() {
        let stored = hasher(SECRET).hash("password1").unwrap();
        let stronger = PasswordHasher::with_params(SECRET, PasswordParams::new(128, 2, 1, None).unwrap());
        assert!(stronger.verify("password1", &stored));
    }

    #[test]
    fn test_malformed_hash() {
        let hasher = hasher(SECRET);
        assert!(!hasher.verify("x", ""));
        assert!(!hasher.verify("x", "sha256$salt$abc"));
        assert!(!hasher.verify("x", "$argon2id$v=19$m=64,t=1,p=1$only-salt"));
    }
}
