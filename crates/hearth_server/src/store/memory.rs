//! In-process store backed by concurrent maps.

use super::{Account, AccountStore, Character, CharacterStore};
use crate::error::StoreError;
use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

/// Keeps accounts and characters in memory for the lifetime of the process.
///
/// Names are the map keys, so uniqueness is enforced by the map's entry lock
/// and two concurrent creations of the same name cannot both succeed.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    accounts: DashMap<String, Account>,
    characters: DashMap<String, Character>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    pub fn character_count(&self) -> usize {
        self.characters.len()
    }
}

#[async_trait]
impl AccountStore for InMemoryStore {
    async fn find_account_by_name(&self, name: &str) -> Result<Option<Account>, StoreError> {
        Ok(self.accounts.get(name).map(|entry| entry.value().clone()))
    }

    async fn account_name_exists(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.accounts.contains_key(name))
    }

    async fn create_account(&self, name: &str, password_hash: &str) -> Result<Account, StoreError> {
        match self.accounts.entry(name.to_string()) {
            Entry::Occupied(_) => Err(StoreError::NameTaken(name.to_string())),
            Entry::Vacant(slot) => {
                let account = Account {
                    id: Uuid::new_v4(),
                    name: name.to_string(),
                    password_hash: password_hash.to_string(),
                    created_at: Utc::now(),
                };
                slot.insert(account.clone());
                Ok(account)
            }
        }
    }
}

#[async_trait]
impl CharacterStore for InMemoryStore {
    async fn find_character_by_name(&self, name: &str) -> Result<Option<Character>, StoreError> {
        Ok(self.characters.get(name).map(|entry| entry.value().clone()))
    }

    async fn character_name_exists(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.characters.contains_key(name))
    }

    async fn create_character(&self, name: &str, account_id: Uuid) -> Result<Character, StoreError> {
        match self.characters.entry(name.to_string()) {
            Entry::Occupied(_) => Err(StoreError::NameTaken(name.to_string())),
            Entry::Vacant(slot) => {
                let character = Character {
                    id: Uuid::new_v4(),
                    name: name.to_string(),
                    account_id,
                    created_at: Utc::now(),
                };
                slot.insert(character.clone());
                Ok(character)
            }
        }
    }

    async fn list_characters_for_account(&self, account_id: Uuid) -> Result<Vec<Character>, StoreError> {
        let mut characters: Vec<Character> = self
            .characters
            .iter()
            .filter(|entry| entry.account_id == account_id)
            .map(|entry| entry.value().clone())
            .collect();
        characters.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.name.cmp(&b.name)));
        Ok(characters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn account_names_are_unique() {
        let store = InMemoryStore::new();
        let account = store.create_account("alice", "hash").await.unwrap();
        assert_eq!(account.name, "alice");
        assert!(store.account_name_exists("alice").await.unwrap());

        let err = store.create_account("alice", "other").await.unwrap_err();
        assert_eq!(err, StoreError::NameTaken("alice".into()));
        assert_eq!(store.account_count(), 1);
    }

    #[tokio::test]
    async fn concurrent_account_creation_has_one_winner() {
        let store = Arc::new(InMemoryStore::new());
        let mut tasks = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move { store.create_account("bob", "h").await }));
        }

        let mut created = 0;
        for task in tasks {
            if task.await.unwrap().is_ok() {
                created += 1;
            }
        }
        assert_eq!(created, 1);
    }

    #[tokio::test]
    async fn characters_are_listed_per_account() {
        let store = InMemoryStore::new();
        let a = store.create_account("a", "h").await.unwrap();
        let b = store.create_account("b", "h").await.unwrap();

        store.create_character("knight", a.id).await.unwrap();
        store.create_character("mage", a.id).await.unwrap();
        store.create_character("rogue", b.id).await.unwrap();

        let names: Vec<_> = store
            .list_characters_for_account(a.id)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"knight".to_string()));
        assert!(names.contains(&"mage".to_string()));

        assert!(store.create_character("rogue", a.id).await.is_err());
        let found = store.find_character_by_name("rogue").await.unwrap().unwrap();
        assert_eq!(found.account_id, b.id);
    }
}
