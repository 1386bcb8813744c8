//! Password hashing.
//!
//! Account passwords never reach the store in clear text. Handlers go through
//! the [`PasswordHasher`] trait; [`BcryptHasher`] is the production
//! implementation and runs the deliberately slow hash on the blocking pool.

use crate::error::SessionError;
use async_trait::async_trait;

/// Lowest cost accepted by bcrypt.
pub const MIN_HASH_COST: u32 = 4;
/// Highest cost accepted by bcrypt.
pub const MAX_HASH_COST: u32 = 31;
/// Cost used when none is configured.
pub const DEFAULT_HASH_COST: u32 = bcrypt::DEFAULT_COST;

/// Hashes and verifies account passwords.
#[async_trait]
pub trait PasswordHasher: Send + Sync {
    async fn hash(&self, password: &str) -> Result<String, SessionError>;

    /// Returns `Ok(false)` for a wrong password and `Err` only if the stored
    /// hash is unusable.
    async fn verify(&self, password: &str, hash: &str) -> Result<bool, SessionError>;
}

/// bcrypt with a fixed work factor.
#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    /// Creates a hasher, clamping `cost` into bcrypt's valid range.
    pub fn new(cost: u32) -> Self {
        Self {
            cost: cost.clamp(MIN_HASH_COST, MAX_HASH_COST),
        }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_COST)
    }
}

#[async_trait]
impl PasswordHasher for BcryptHasher {
    async fn hash(&self, password: &str) -> Result<String, SessionError> {
        let password = password.to_owned();
        let cost = self.cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| SessionError::Internal(format!("hashing task failed: {e}")))?
            .map_err(|e| SessionError::Hashing(e.to_string()))
    }

    async fn verify(&self, password: &str, hash: &str) -> Result<bool, SessionError> {
        let password = password.to_owned();
        let hash = hash.to_owned();
        tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| SessionError::Internal(format!("hashing task failed: {e}")))?
            .map_err(|e| SessionError::Hashing(e.to_string()))
    }
}
