//! Yggdrasil authentication core for the boreal launcher
//!
//! This crate implements the login state machine a Minecraft-style
//! launcher needs against a Yggdrasil-protocol identity service:
//! login with password, login with a cached token (validate first,
//! refresh only when needed), one-shot game-profile selection and
//! credential persistence.
//!
//! # Authentication flows
//!
//! - **Password flow**: `authenticate` with username + password,
//!   verify the echoed client token, adopt the returned access token,
//!   profiles and user properties.
//! - **Token flow**: `validate` the cached access token first; when
//!   the server still accepts it, no refresh round trip happens at
//!   all. Otherwise `refresh` with the same response handling as the
//!   password flow.
//!
//! # Example
//!
//! ```no_run
//! use bl_auth::{AuthServiceClient, AuthServiceConfig, AuthenticationSession};
//!
//! # async fn example() -> bl_auth::Result<()> {
//! let client = AuthServiceClient::new(AuthServiceConfig::mojang())?;
//! let mut session = AuthenticationSession::new(client, true);
//!
//! session.set_username("alice@example.com")?;
//! session.set_password("hunter2")?;
//! session.log_in().await?;
//!
//! if let Some(profile) = session.available_profiles().first().cloned() {
//!     session.select_game_profile(&profile).await?;
//! }
//! assert!(session.is_logged_in());
//!
//! // Persist the session for the next launcher run
//! let credentials = session.save_for_storage();
//! # let _ = credentials;
//! # Ok(())
//! # }
//! ```
//!
//! # Credential storage
//!
//! [`CredentialStore`] persists the string map produced by
//! [`AuthenticationSession::save_for_storage`]. [`MemoryCredentialStore`]
//! backs tests and simple embedders; [`FileCredentialStore`] seals each
//! account's map with AES-256-GCM, keyed from the OS keyring with an
//! Argon2id passphrase fallback ([`SecretProvider`]).
//!
//! # Notes
//!
//! - Session operations take `&mut self` and block on network I/O; run
//!   them off any UI event thread.
//! - No internal retries: a failed validate falls through to refresh,
//!   everything else surfaces to the caller.
//! - The client token never changes for the lifetime of an
//!   [`AuthServiceClient`]; a server echoing a different one is a
//!   fatal protocol error for that session.

pub mod client;
pub mod config;
pub mod crypto;
pub mod errors;
pub mod file_store;
pub mod models;
pub mod secret;
pub mod session;
pub mod store;

pub use client::AuthServiceClient;
pub use config::{AuthServiceConfig, HttpTimeouts, Routes};
pub use errors::{AuthError, Result};
pub use file_store::FileCredentialStore;
pub use models::{Agent, GameProfile, UserType};
pub use secret::{NoSecretProvider, SecretProvider, StaticSecretProvider};
pub use session::AuthenticationSession;
pub use store::{CredentialMap, CredentialStore, MemoryCredentialStore};
