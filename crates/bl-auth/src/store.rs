use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::errors::{AuthError, Result};

/// Credential map as produced by
/// [`AuthenticationSession::save_for_storage`](crate::AuthenticationSession::save_for_storage)
pub type CredentialMap = HashMap<String, String>;

/// Capability for persisting credential maps between launcher runs.
///
/// Keyed by account (the username). An absent map, or one without an
/// `accessToken` entry, means "not logged in via cached token".
#[async_trait::async_trait]
pub trait CredentialStore: Send + Sync {
    /// Load the credential map for an account
    async fn load(&self, account_key: &str) -> Option<CredentialMap>;

    /// Save the credential map for an account
    async fn save(&self, account_key: &str, credentials: &CredentialMap) -> Result<()>;

    /// Remove an account's stored credentials
    async fn remove(&self, account_key: &str) -> Result<()>;

    /// List all stored account keys
    async fn list_accounts(&self) -> Vec<String>;
}

/// In-memory credential store for testing and simple embedders
#[derive(Debug, Clone, Default)]
pub struct MemoryCredentialStore {
    accounts: Arc<RwLock<HashMap<String, CredentialMap>>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load(&self, account_key: &str) -> Option<CredentialMap> {
        self.accounts.read().ok()?.get(account_key).cloned()
    }

    async fn save(&self, account_key: &str, credentials: &CredentialMap) -> Result<()> {
        self.accounts
            .write()
            .map_err(|_| AuthError::InvalidResponse("lock poisoned".to_string()))?
            .insert(account_key.to_string(), credentials.clone());
        Ok(())
    }

    async fn remove(&self, account_key: &str) -> Result<()> {
        self.accounts
            .write()
            .map_err(|_| AuthError::InvalidResponse("lock poisoned".to_string()))?
            .remove(account_key);
        Ok(())
    }

    async fn list_accounts(&self) -> Vec<String> {
        self.accounts
            .read()
            .ok()
            .map(|accounts| accounts.keys().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_round_trip() {
        let store = MemoryCredentialStore::new();
        let mut credentials = CredentialMap::new();
        credentials.insert("username".to_string(), "alice".to_string());
        credentials.insert("accessToken".to_string(), "AT1".to_string());

        store.save("alice", &credentials).await.unwrap();
        let loaded = store.load("alice").await.unwrap();
        assert_eq!(loaded, credentials);

        assert_eq!(store.list_accounts().await, vec!["alice".to_string()]);

        store.remove("alice").await.unwrap();
        assert!(store.load("alice").await.is_none());
    }
}
