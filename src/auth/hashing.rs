use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use lazy_static::lazy_static;
use rand::rngs::OsRng;

use crate::errors::{Error, Result};

lazy_static! {
    /// Hash compared against when the account being authenticated does not exist,
    /// so unknown emails cost the same Argon2 work as wrong passwords.
    pub(crate) static ref DUMMY_HASH: String = hash_password("penwright-dummy-password")
        .unwrap_or_else(|_| "$argon2id$v=19$m=768,t=1,p=1$ZHVtbXlzYWx0$ZHVtbXloYXNo".to_string());
}

pub fn password_hasher() -> Argon2<'static> {
    // Argon2id tuned for interactive requests: moderate memory, single pass.
    const MEMORY_COST_KIB: u32 = 768;
    const ITERATIONS: u32 = 1;
    const PARALLELISM: u32 = 1;
    let params = Params::new(MEMORY_COST_KIB, ITERATIONS, PARALLELISM, Some(32))
        .expect("valid Argon2 parameters");
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
}

/// Produce a salted PHC string for `password`.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = password_hasher()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| Error::internal(format!("Failed to hash password: {}", err)))?;
    Ok(hash.to_string())
}

/// Check `candidate` against a stored PHC string.
pub fn verify_password(candidate: &str, stored: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored)
        .map_err(|err| Error::internal(format!("Invalid password hash: {}", err)))?;
    Ok(password_hasher().verify_password(candidate.as_bytes(), &parsed).is_ok())
}
