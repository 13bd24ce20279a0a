use zeroize::Zeroizing;

/// Source of passphrases for key derivation.
///
/// Used when the OS keyring is unavailable. How the passphrase is
/// obtained (dialog, prompt, env) is the embedder's concern.
#[async_trait::async_trait]
pub trait SecretProvider: Send + Sync {
    /// Return a passphrase, or `None` if the user cancelled. The value
    /// is zeroized on drop.
    async fn passphrase(&self, prompt: &str) -> Option<Zeroizing<String>>;
}

/// Provider that never supplies a passphrase (keyring-only setups)
#[derive(Debug, Clone, Default)]
pub struct NoSecretProvider;

#[async_trait::async_trait]
impl SecretProvider for NoSecretProvider {
    async fn passphrase(&self, _prompt: &str) -> Option<Zeroizing<String>> {
        None
    }
}

/// Fixed passphrase, for tests and headless environments
#[derive(Debug, Clone)]
pub struct StaticSecretProvider {
    secret: String,
}

impl StaticSecretProvider {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

#[async_trait::async_trait]
impl SecretProvider for StaticSecretProvider {
    async fn passphrase(&self, _prompt: &str) -> Option<Zeroizing<String>> {
        Some(Zeroizing::new(self.secret.clone()))
    }
}
