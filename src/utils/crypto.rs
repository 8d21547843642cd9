use std::sync::Arc;

use argon2::{
    password_hash::{self, SaltString},
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
};
use data_encoding::BASE64URL_NOPAD;
use derive_more::Display;
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use tokio::task::{self, JoinError};
use uuid::Uuid;

use crate::setup::HashingSettings;

/// Size in bytes of session, CSRF and remember-me tokens.
pub const TOKEN_BYTES: usize = 32;

const DUMMY_PASSWORD: &str = "timing-equaliser-not-a-real-password";

#[derive(Debug, Display)]
pub enum HashingError {
    #[display("password hashing failed: {_0}")]
    Hash(password_hash::Error),
    #[display("invalid argon2 parameters: {_0}")]
    Params(argon2::Error),
    #[display("hashing task failed: {_0}")]
    Task(JoinError),
}

impl std::error::Error for HashingError {}

/// Argon2id hasher with deploy-time cost parameters.
///
/// Hashing and verification run on the blocking thread pool since both are
/// deliberately expensive.
#[derive(Clone)]
pub struct PasswordHashing {
    argon2: Argon2<'static>,
    dummy_hash: Arc<str>,
}

impl PasswordHashing {
    /// Builds the hasher and precomputes the hash used by [`Self::verify_dummy`].
    ///
    /// Fails when the cost parameters are rejected by argon2, which is treated
    /// as a fatal configuration error at startup.
    pub fn new(settings: &HashingSettings) -> Result<Self, HashingError> {
        let params = Params::new(
            settings.memory_kib,
            settings.iterations,
            settings.parallelism,
            None,
        )
        .map_err(HashingError::Params)?;

        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let dummy_hash = hash_with(&argon2, DUMMY_PASSWORD)?;

        Ok(Self {
            argon2,
            dummy_hash: Arc::from(dummy_hash),
        })
    }

    pub async fn hash(&self, password: String) -> Result<String, HashingError> {
        let argon2 = self.argon2.clone();

        task::spawn_blocking(move || hash_with(&argon2, &password))
            .await
            .map_err(HashingError::Task)?
    }

    /// Returns `Ok(false)` on a mismatch; errors only when the stored hash
    /// cannot be parsed or the task fails.
    pub async fn verify(&self, password: String, hash: String) -> Result<bool, HashingError> {
        let argon2 = self.argon2.clone();

        task::spawn_blocking(move || verify_with(&argon2, &password, &hash))
            .await
            .map_err(HashingError::Task)?
    }

    /// Spends the same work as [`Self::verify`] against a hash no password
    /// matches. Used when the account does not exist.
    pub async fn verify_dummy(&self, password: String) -> Result<bool, HashingError> {
        self.verify(password, self.dummy_hash.to_string()).await
    }
}

fn hash_with(argon2: &Argon2<'_>, password: &str) -> Result<String, HashingError> {
    let salt = SaltString::generate(&mut OsRng);

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(HashingError::Hash)?;

    Ok(password_hash.to_string())
}

fn verify_with(argon2: &Argon2<'_>, password: &str, hash: &str) -> Result<bool, HashingError> {
    let hash = PasswordHash::new(hash).map_err(HashingError::Hash)?;

    match argon2.verify_password(password.as_bytes(), &hash) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(HashingError::Hash(e)),
    }
}

pub fn generate_uuid() -> String {
    Uuid::new_v4().simple().to_string()
}

/// 256 bits from the OS RNG, base64url without padding.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];

    OsRng.fill_bytes(&mut bytes);

    BASE64URL_NOPAD.encode(&bytes)
}

/// One-way SHA-256 of a token, hex encoded. Only this value is ever stored.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();

    hasher.update(token);
    hex::encode(hasher.finalize())
}

/// Compares two secrets by their SHA-256 digests so the comparison time does
/// not depend on where the raw values first differ.
pub fn tokens_match(expected: &str, provided: &str) -> bool {
    let expected = Sha256::digest(expected.as_bytes());
    let provided = Sha256::digest(provided.as_bytes());

    expected
        .iter()
        .zip(provided.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

#[cfg(test)]
pub(crate) fn test_hashing() -> PasswordHashing {
    PasswordHashing::new(&HashingSettings {
        memory_kib: 8,
        iterations: 1,
        parallelism: 1,
    })
    .expect("test argon2 parameters are valid")
}
