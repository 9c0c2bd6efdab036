use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use rand_core::OsRng;

use crate::models::ModelError;

/// Hashes `password` with Argon2 on the blocking pool.
pub async fn hash_password(password: String) -> Result<String, ModelError> {
    tokio::task::spawn_blocking(move || -> Result<String, ModelError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|err| ModelError::PasswordHashing(err.to_string()))?;
        Ok(hash.to_string())
    })
    .await
    .map_err(|err| ModelError::Task(err.to_string()))?
}

/// Returns `Ok(false)` for a wrong password. A stored hash that cannot be
/// parsed is a fault, not a mismatch.
pub async fn verify_password(password: String, stored_hash: String) -> Result<bool, ModelError> {
    tokio::task::spawn_blocking(move || -> Result<bool, ModelError> {
        let parsed = PasswordHash::new(&stored_hash)
            .map_err(|err| ModelError::PasswordHashing(err.to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .map_err(|err| ModelError::Task(err.to_string()))?
}
