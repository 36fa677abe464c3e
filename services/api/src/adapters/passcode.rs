//! services/api/src/adapters/passcode.rs
//!
//! Argon2 implementation of the `PasscodeHasher` port. Used for both user
//! account passwords and per-entry passcodes; secrets are stored as salted
//! PHC strings and never in plaintext. `verify_password` is the
//! constant-time comparison the access gate relies on.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use diary_core::ports::{PasscodeHasher, PortError, PortResult};

/// An adapter that implements the `PasscodeHasher` port using argon2id.
#[derive(Clone, Default)]
pub struct Argon2Hasher;

impl PasscodeHasher for Argon2Hasher {
    fn hash(&self, passcode: &str) -> PortResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(passcode.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| PortError::Unexpected(format!("Failed to hash secret: {e}")))
    }

    fn verify(&self, candidate: &str, stored_hash: &str) -> bool {
        match PasswordHash::new(stored_hash) {
            Ok(parsed) => Argon2::default()
                .verify_password(candidate.as_bytes(), &parsed)
                .is_ok(),
            // An unparseable stored hash can only deny access.
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_round_trip() {
        let hasher = Argon2Hasher;
        let hash = hasher.hash("1234").expect("hashing succeeds");

        assert_ne!(hash, "1234");
        assert!(hasher.verify("1234", &hash));
        assert!(!hasher.verify("4321", &hash));
    }

    #[test]
    fn same_passcode_hashes_differently_each_time() {
        let hasher = Argon2Hasher;
        let a = hasher.hash("secret").expect("hashing succeeds");
        let b = hasher.hash("secret").expect("hashing succeeds");
        assert_ne!(a, b);
    }

    #[test]
    fn garbage_stored_hash_denies_access() {
        let hasher = Argon2Hasher;
        assert!(!hasher.verify("anything", "not-a-phc-string"));
    }
}
