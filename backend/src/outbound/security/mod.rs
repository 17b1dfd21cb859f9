//! Argon2id implementation of the [`PasswordHasher`] port.
//!
//! Hashes are stored in PHC string format, so the algorithm parameters and
//! salt travel with every hash and old hashes keep verifying after the
//! defaults change.

use argon2::password_hash::{
    Error as PhcError, PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
};
use argon2::Argon2;
use rand::rngs::OsRng;

use crate::domain::ports::{PasswordHashError, PasswordHasher};

/// Argon2id hasher using the crate's recommended parameters.
#[derive(Debug, Clone, Default)]
pub struct Argon2PasswordHasher {
    argon2: Argon2<'static>,
}

impl Argon2PasswordHasher {
    /// Create a hasher with default Argon2id parameters.
    pub fn new() -> Self {
        Self::default()
    }
}

impl PasswordHasher for Argon2PasswordHasher {
    fn hash(&self, password: &str) -> Result<String, PasswordHashError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|err| PasswordHashError::hash(err.to_string()))
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordHashError> {
        let parsed = PasswordHash::new(hash)
            .map_err(|err| PasswordHashError::malformed_hash(err.to_string()))?;
        match self.argon2.verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(PhcError::Password) => Ok(false),
            Err(err) => Err(PasswordHashError::hash(err.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn hasher() -> Argon2PasswordHasher {
        Argon2PasswordHasher::new()
    }

    #[rstest]
    fn hash_verifies_original_password(hasher: Argon2PasswordHasher) {
        let hash = hasher.hash("correct horse").expect("hashes");
        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify("correct horse", &hash).expect("verifies"));
        assert!(!hasher.verify("wrong horse", &hash).expect("verifies"));
    }

    #[rstest]
    fn hashes_are_salted(hasher: Argon2PasswordHasher) {
        let first = hasher.hash("same password").expect("hashes");
        let second = hasher.hash("same password").expect("hashes");
        assert_ne!(first, second);
    }

    #[rstest]
    fn malformed_hash_is_reported(hasher: Argon2PasswordHasher) {
        let err = hasher
            .verify("anything", "not-a-phc-string")
            .expect_err("malformed");
        assert!(matches!(err, PasswordHashError::MalformedHash { .. }));
    }
}
