use serde::{Deserialize, Serialize};

/// Identifies which game/product is authenticating.
///
/// Opaque to the core; the server uses it for account linking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub name: String,
    pub version: u32,
}

impl Agent {
    pub fn minecraft() -> Self {
        Self {
            name: "Minecraft".to_string(),
            version: 1,
        }
    }
}

/// A selectable in-game identity bound to an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameProfile {
    /// UUID without dashes
    pub id: String,
    /// Player name
    pub name: String,
    /// Profiles predating the account migration carry a different user type
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub legacy: bool,
}

impl GameProfile {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            legacy: false,
        }
    }
}

/// Account classification derived from the profile's `legacy` flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserType {
    Legacy,
    #[default]
    Mojang,
}

impl UserType {
    pub fn from_legacy(legacy: bool) -> Self {
        if legacy { Self::Legacy } else { Self::Mojang }
    }
}

/// User object attached to authenticate/refresh responses
#[derive(Debug, Clone, Deserialize)]
pub struct UserInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub properties: Vec<UserProperty>,
}

/// Single name/value user property; later values overwrite earlier ones
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProperty {
    pub name: String,
    pub value: String,
}

/// `authenticate` request body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticateRequest<'a> {
    pub agent: &'a Agent,
    pub username: &'a str,
    pub password: &'a str,
    pub client_token: &'a str,
    pub request_user: bool,
}

/// `refresh` request body; `selected_profile` pins one profile
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest<'a> {
    pub client_token: &'a str,
    pub access_token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_profile: Option<&'a GameProfile>,
    pub request_user: bool,
}

/// `validate` and `invalidate` request body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest<'a> {
    pub client_token: &'a str,
    pub access_token: &'a str,
}

/// `signout` request body
#[derive(Debug, Clone, Serialize)]
pub struct SignoutRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Response body shared by `authenticate` and `refresh`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub access_token: String,
    /// Must equal the locally held client token on every response
    pub client_token: String,
    #[serde(default)]
    pub available_profiles: Vec<GameProfile>,
    #[serde(default)]
    pub selected_profile: Option<GameProfile>,
    #[serde(default)]
    pub user: Option<UserInfo>,
}

/// Structured error body returned by the service on non-success statuses
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub cause: Option<String>,
}
