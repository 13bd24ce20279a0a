use std::path::Path;
use std::sync::Arc;

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use argon2::password_hash::{PasswordHasher, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use tokio::fs;
use zeroize::ZeroizeOnDrop;

use crate::errors::{AuthError, Result};
use crate::secret::SecretProvider;

const SALT_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const AAD_VERSION: &str = "v1";

#[cfg(feature = "keyring-support")]
const KEYRING_SERVICE: &str = "boreal-launcher";
#[cfg(feature = "keyring-support")]
const KEYRING_USER: &str = "bl-auth:v1";

fn fill_random(buf: &mut [u8]) -> Result<()> {
    getrandom::fill(buf).map_err(|e| AuthError::Crypto(format!("rng failure: {e}")))
}

/// AES-256 key, zeroized on drop
#[derive(Clone, ZeroizeOnDrop)]
pub struct EncryptionKey {
    key: [u8; 32],
}

impl EncryptionKey {
    pub fn generate() -> Result<Self> {
        let mut key = [0u8; 32];
        fill_random(&mut key)?;
        Ok(Self { key })
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self { key: bytes }
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.key
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EncryptionKey([REDACTED])")
    }
}

/// Sealed credential data: nonce, ciphertext+tag, AAD version
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SealedBlob {
    /// Base64url-encoded 96-bit nonce
    pub nonce: String,
    /// Base64url-encoded ciphertext and authentication tag
    pub ciphertext: String,
    pub aad_version: String,
}

fn aad_for(version: &str, account_key: &str) -> String {
    format!("bl-auth|{version}|{account_key}")
}

/// Seal plaintext with AES-256-GCM, binding it to the account key via AAD
pub fn seal(key: &EncryptionKey, plaintext: &[u8], account_key: &str) -> Result<SealedBlob> {
    let cipher = Aes256Gcm::new(key.as_bytes().into());

    let mut nonce_bytes = [0u8; NONCE_LEN];
    fill_random(&mut nonce_bytes)?;
    let nonce = Nonce::from_slice(&nonce_bytes);

    let aad = aad_for(AAD_VERSION, account_key);
    let ciphertext = cipher
        .encrypt(
            nonce,
            Payload {
                msg: plaintext,
                aad: aad.as_bytes(),
            },
        )
        .map_err(|e| AuthError::Crypto(format!("encryption failed: {e}")))?;

    Ok(SealedBlob {
        nonce: URL_SAFE_NO_PAD.encode(nonce_bytes),
        ciphertext: URL_SAFE_NO_PAD.encode(ciphertext),
        aad_version: AAD_VERSION.to_string(),
    })
}

/// Open a sealed blob. Fails with `CorruptedStore` on any tampering,
/// wrong key or wrong account binding.
pub fn open(key: &EncryptionKey, blob: &SealedBlob, account_key: &str) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new(key.as_bytes().into());

    let nonce_bytes = URL_SAFE_NO_PAD
        .decode(&blob.nonce)
        .map_err(|_| AuthError::CorruptedStore)?;
    if nonce_bytes.len() != NONCE_LEN {
        return Err(AuthError::CorruptedStore);
    }
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = URL_SAFE_NO_PAD
        .decode(&blob.ciphertext)
        .map_err(|_| AuthError::CorruptedStore)?;

    let aad = aad_for(&blob.aad_version, account_key);
    cipher
        .decrypt(
            nonce,
            Payload {
                msg: &ciphertext,
                aad: aad.as_bytes(),
            },
        )
        .map_err(|_| AuthError::CorruptedStore)
}

/// Key-derivation metadata persisted next to the sealed account files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyMeta {
    pub version: u32,
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Base64-encoded Argon2id salt, present once the passphrase
    /// fallback has been used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passphrase_salt: Option<String>,
}

impl Default for KeyMeta {
    fn default() -> Self {
        Self {
            version: 1,
            created_at: chrono::Utc::now(),
            passphrase_salt: None,
        }
    }
}

/// Resolves the store encryption key: OS keyring first, Argon2id
/// passphrase derivation as fallback.
pub struct KeyManager {
    meta: KeyMeta,
    key: EncryptionKey,
}

impl KeyManager {
    pub async fn new(storage_dir: &Path, secret_provider: Arc<dyn SecretProvider>) -> Result<Self> {
        let meta_path = storage_dir.join("meta.json");

        let mut meta = if meta_path.exists() {
            let content = fs::read_to_string(&meta_path).await?;
            serde_json::from_str(&content)
                .map_err(|e| AuthError::InvalidResponse(format!("invalid meta.json: {e}")))?
        } else {
            KeyMeta::default()
        };

        let key = match Self::keyring_key() {
            Ok(key) => {
                tracing::debug!("loaded encryption key from OS keyring");
                key
            }
            Err(e) => {
                tracing::debug!("keyring unavailable ({e}), deriving key from passphrase");
                let key = Self::derive_from_passphrase(&mut meta, secret_provider.as_ref()).await?;
                if let Err(e) = Self::store_keyring_key(&key) {
                    tracing::warn!("could not save key to keyring: {e}");
                }
                key
            }
        };

        let meta_json = serde_json::to_string_pretty(&meta)?;
        fs::write(&meta_path, meta_json).await?;

        Ok(Self { meta, key })
    }

    pub fn key(&self) -> &EncryptionKey {
        &self.key
    }

    pub fn meta(&self) -> &KeyMeta {
        &self.meta
    }

    #[cfg(feature = "keyring-support")]
    fn keyring_key() -> Result<EncryptionKey> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER)
            .map_err(|e| AuthError::Keyring(format!("cannot access keyring: {e}")))?;
        let key_b64 = entry
            .get_password()
            .map_err(|e| AuthError::Keyring(format!("cannot read keyring entry: {e}")))?;

        let key_bytes = STANDARD
            .decode(key_b64)
            .map_err(|_| AuthError::CorruptedStore)?;
        let key: [u8; 32] = key_bytes
            .try_into()
            .map_err(|_| AuthError::CorruptedStore)?;

        Ok(EncryptionKey::from_bytes(key))
    }

    #[cfg(not(feature = "keyring-support"))]
    fn keyring_key() -> Result<EncryptionKey> {
        Err(AuthError::Keyring("keyring support disabled".to_string()))
    }

    #[cfg(feature = "keyring-support")]
    fn store_keyring_key(key: &EncryptionKey) -> Result<()> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER)
            .map_err(|e| AuthError::Keyring(format!("cannot access keyring: {e}")))?;
        entry
            .set_password(&STANDARD.encode(key.as_bytes()))
            .map_err(|e| AuthError::Keyring(format!("cannot write keyring entry: {e}")))?;
        Ok(())
    }

    #[cfg(not(feature = "keyring-support"))]
    fn store_keyring_key(_key: &EncryptionKey) -> Result<()> {
        Ok(())
    }

    async fn derive_from_passphrase(
        meta: &mut KeyMeta,
        secret_provider: &dyn SecretProvider,
    ) -> Result<EncryptionKey> {
        let salt = match &meta.passphrase_salt {
            Some(salt_b64) => STANDARD
                .decode(salt_b64)
                .map_err(|_| AuthError::CorruptedStore)?,
            None => {
                let mut salt = vec![0u8; SALT_LEN];
                fill_random(&mut salt)?;
                meta.passphrase_salt = Some(STANDARD.encode(&salt));
                salt
            }
        };

        let passphrase = secret_provider
            .passphrase("Enter passphrase for credential storage")
            .await
            .ok_or(AuthError::UserCancelled)?;

        // Argon2id, m=64MiB, t=3, p=1
        let params = Params::new(65536, 3, 1, Some(32))
            .map_err(|e| AuthError::Crypto(format!("invalid Argon2 params: {e}")))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let salt_string = SaltString::encode_b64(&salt)
            .map_err(|e| AuthError::Crypto(format!("invalid salt: {e}")))?;
        let hash = argon2
            .hash_password(passphrase.as_bytes(), &salt_string)
            .map_err(|e| AuthError::Crypto(format!("key derivation failed: {e}")))?;

        let output = hash
            .hash
            .ok_or_else(|| AuthError::Crypto("Argon2 produced no output".to_string()))?;
        let key: [u8; 32] = output
            .as_bytes()
            .try_into()
            .map_err(|_| AuthError::Crypto("unexpected Argon2 output length".to_string()))?;

        Ok(EncryptionKey::from_bytes(key))
    }
}

impl std::fmt::Debug for KeyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyManager")
            .field("meta", &self.meta)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_open_round_trip() {
        let key = EncryptionKey::generate().unwrap();
        let sealed = seal(&key, b"accessToken=AT1", "alice").unwrap();
        let opened = open(&key, &sealed, "alice").unwrap();
        assert_eq!(opened, b"accessToken=AT1");
    }

    #[test]
    fn wrong_key_is_a_corrupted_store() {
        let sealed = seal(&EncryptionKey::generate().unwrap(), b"data", "alice").unwrap();
        let result = open(&EncryptionKey::generate().unwrap(), &sealed, "alice");
        assert!(matches!(result, Err(AuthError::CorruptedStore)));
    }

    #[test]
    fn blob_is_bound_to_the_account_key() {
        let key = EncryptionKey::generate().unwrap();
        let sealed = seal(&key, b"data", "alice").unwrap();
        let result = open(&key, &sealed, "mallory");
        assert!(matches!(result, Err(AuthError::CorruptedStore)));
    }

    #[test]
    fn tampered_ciphertext_is_rejected() {
        let key = EncryptionKey::generate().unwrap();
        let mut sealed = seal(&key, b"data", "alice").unwrap();

        let mut bytes = URL_SAFE_NO_PAD.decode(&sealed.ciphertext).unwrap();
        bytes[0] ^= 0xFF;
        sealed.ciphertext = URL_SAFE_NO_PAD.encode(bytes);

        assert!(matches!(
            open(&key, &sealed, "alice"),
            Err(AuthError::CorruptedStore)
        ));
    }
}
