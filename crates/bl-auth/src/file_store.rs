use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::RwLock;
use zeroize::Zeroize;

use crate::crypto::{self, KeyManager, SealedBlob};
use crate::errors::{AuthError, Result};
use crate::secret::SecretProvider;
use crate::store::{CredentialMap, CredentialStore};

/// File-based encrypted credential store.
///
/// One sealed file per account under `accounts/`, bound to the account
/// key so files cannot be swapped between accounts. The encryption key
/// comes from the OS keyring with an Argon2id passphrase fallback.
///
/// # Directory structure
/// ```text
/// ~/.config/boreal/bl-auth/
/// ├── meta.json              # key-derivation metadata
/// ├── lock                   # advisory lock file
/// └── accounts/
///     └── <account>.json     # sealed credential map per account
/// ```
#[derive(Debug)]
pub struct FileCredentialStore {
    accounts_dir: PathBuf,
    lock_file: PathBuf,
    key_manager: Arc<RwLock<KeyManager>>,
    cache: Arc<RwLock<HashMap<String, CredentialMap>>>,
}

/// On-disk plaintext layout, sealed before writing
#[derive(Debug, Serialize, Deserialize)]
struct StoredCredentials {
    saved_at: DateTime<Utc>,
    values: CredentialMap,
}

impl FileCredentialStore {
    pub async fn new(
        storage_dir: impl AsRef<Path>,
        secret_provider: Arc<dyn SecretProvider>,
    ) -> Result<Self> {
        let storage_dir = storage_dir.as_ref().to_path_buf();
        let accounts_dir = storage_dir.join("accounts");
        let lock_file = storage_dir.join("lock");

        fs::create_dir_all(&accounts_dir).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o700);
            std::fs::set_permissions(&storage_dir, perms.clone())?;
            std::fs::set_permissions(&accounts_dir, perms)?;
        }

        let key_manager = KeyManager::new(&storage_dir, secret_provider).await?;

        Ok(Self {
            accounts_dir,
            lock_file,
            key_manager: Arc::new(RwLock::new(key_manager)),
            cache: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    /// Default storage directory for the current platform
    pub fn default_storage_dir() -> Result<PathBuf> {
        let project_dirs = directories::ProjectDirs::from("", "", "boreal").ok_or_else(|| {
            AuthError::InvalidResponse("could not determine config directory".to_string())
        })?;

        Ok(project_dirs.config_dir().join("bl-auth"))
    }

    /// Account keys are usernames, so the filename is an encoding of
    /// the key rather than the key itself.
    fn account_path(&self, account_key: &str) -> PathBuf {
        let encoded = URL_SAFE_NO_PAD.encode(account_key);
        self.accounts_dir.join(format!("{encoded}.json"))
    }

    fn acquire_lock(&self) -> Result<std::fs::File> {
        let lock_file = std::fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock_file)?;

        lock_file
            .try_lock_exclusive()
            .map_err(|_| AuthError::LockTimeout)?;

        Ok(lock_file)
    }

    async fn load_from_disk(&self, account_key: &str) -> Result<Option<CredentialMap>> {
        let path = self.account_path(account_key);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path).await?;
        let sealed: SealedBlob = serde_json::from_str(&content)
            .map_err(|e| AuthError::InvalidResponse(format!("invalid sealed data: {e}")))?;

        let key_manager = self.key_manager.read().await;
        let mut plaintext = crypto::open(key_manager.key(), &sealed, account_key)?;
        let stored: StoredCredentials = serde_json::from_slice(&plaintext)
            .map_err(|e| AuthError::InvalidResponse(format!("invalid credential data: {e}")))?;
        plaintext.zeroize();

        Ok(Some(stored.values))
    }

    async fn save_to_disk(&self, account_key: &str, credentials: &CredentialMap) -> Result<()> {
        let stored = StoredCredentials {
            saved_at: Utc::now(),
            values: credentials.clone(),
        };
        let mut plaintext = serde_json::to_vec(&stored)?;

        let key_manager = self.key_manager.read().await;
        let sealed = crypto::seal(key_manager.key(), &plaintext, account_key)?;
        plaintext.zeroize();

        let _lock = self.acquire_lock()?;
        let content = serde_json::to_string_pretty(&sealed)?;
        fs::write(self.account_path(account_key), content).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self, account_key: &str) -> Option<CredentialMap> {
        if let Some(cached) = self.cache.read().await.get(account_key) {
            return Some(cached.clone());
        }

        match self.load_from_disk(account_key).await {
            Ok(Some(credentials)) => {
                self.cache
                    .write()
                    .await
                    .insert(account_key.to_string(), credentials.clone());
                Some(credentials)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("failed to load credentials for {account_key}: {e}");
                None
            }
        }
    }

    async fn save(&self, account_key: &str, credentials: &CredentialMap) -> Result<()> {
        self.save_to_disk(account_key, credentials).await?;
        self.cache
            .write()
            .await
            .insert(account_key.to_string(), credentials.clone());
        Ok(())
    }

    async fn remove(&self, account_key: &str) -> Result<()> {
        self.cache.write().await.remove(account_key);

        let path = self.account_path(account_key);
        if path.exists() {
            let _lock = self.acquire_lock()?;
            fs::remove_file(path).await?;
        }
        Ok(())
    }

    async fn list_accounts(&self) -> Vec<String> {
        let mut accounts = Vec::new();

        let Ok(mut entries) = fs::read_dir(&self.accounts_dir).await else {
            return accounts;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name();
            let Some(encoded) = name.to_str().and_then(|n| n.strip_suffix(".json")) else {
                continue;
            };
            if let Some(account) = URL_SAFE_NO_PAD
                .decode(encoded)
                .ok()
                .and_then(|bytes| String::from_utf8(bytes).ok())
            {
                accounts.push(account);
            }
        }

        accounts.sort();
        accounts
    }
}
