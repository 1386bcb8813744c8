//! Account and character persistence.
//!
//! The session core only talks to storage through the [`AccountStore`] and
//! [`CharacterStore`] traits. [`InMemoryStore`] implements both and is what the
//! server binary ships with.

pub mod memory;

use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub use memory::InMemoryStore;

/// A registered player account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: Uuid,
    /// Lower-cased login name
    pub name: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// A character owned by an [`Account`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Character {
    pub id: Uuid,
    /// Lower-cased display name
    pub name: String,
    pub account_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Account lookups and creation.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_account_by_name(&self, name: &str) -> Result<Option<Account>, StoreError>;

    async fn account_name_exists(&self, name: &str) -> Result<bool, StoreError>;

    /// Creates an account.
    ///
    /// # Errors
    ///
    /// [`StoreError::NameTaken`] if the name is already in use, even when the
    /// caller checked [`account_name_exists`](Self::account_name_exists) first.
    async fn create_account(&self, name: &str, password_hash: &str) -> Result<Account, StoreError>;
}

/// Character lookups and creation.
#[async_trait]
pub trait CharacterStore: Send + Sync {
    async fn find_character_by_name(&self, name: &str) -> Result<Option<Character>, StoreError>;

    async fn character_name_exists(&self, name: &str) -> Result<bool, StoreError>;

    /// Creates a character owned by `account_id`.
    ///
    /// # Errors
    ///
    /// [`StoreError::NameTaken`] if the name is already in use.
    async fn create_character(&self, name: &str, account_id: Uuid) -> Result<Character, StoreError>;

    /// All characters of an account, oldest first.
    async fn list_characters_for_account(&self, account_id: Uuid) -> Result<Vec<Character>, StoreError>;
}
