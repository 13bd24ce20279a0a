use thiserror::Error;

/// Yggdrasil authentication error types
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("invalid game profile: {0}")]
    InvalidProfile(String),

    #[error("not logged in")]
    NotLoggedIn,

    #[error("a game profile is already selected - log out and back in to change it")]
    ProfileAlreadySelected,

    #[error("cannot change credentials while logged in and online")]
    SessionActive,

    #[error("server echoed a different client token than ours")]
    ClientTokenMismatch,

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP error {status}: {body_snippet}")]
    Http {
        status: reqwest::StatusCode,
        body_snippet: String,
    },

    #[error("authentication service rejected the request: {error}: {message}")]
    Service { error: String, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON serialization/deserialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cryptography error: {0}")]
    Crypto(String),

    #[error("keyring error: {0}")]
    Keyring(String),

    #[error("credential store is corrupted or was written with a different key")]
    CorruptedStore,

    #[error("could not acquire the credential store lock")]
    LockTimeout,

    #[error("passphrase entry was cancelled")]
    UserCancelled,
}

impl AuthError {
    /// True for failures that cannot be fixed without new user input.
    pub fn is_invalid_credentials(&self) -> bool {
        matches!(self, Self::InvalidCredentials(_))
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
