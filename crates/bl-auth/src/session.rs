use std::collections::HashMap;

use tracing::{debug, info, instrument};
use zeroize::Zeroizing;

use crate::client::AuthServiceClient;
use crate::errors::{AuthError, Result};
use crate::models::{GameProfile, SessionResponse, UserType};

const STORAGE_KEY_ACCESS_TOKEN: &str = "accessToken";
const STORAGE_KEY_USER_NAME: &str = "username";
const STORAGE_KEY_USER_ID: &str = "userid";
const STORAGE_KEY_PROFILE_ID: &str = "uuid";
const STORAGE_KEY_PROFILE_NAME: &str = "displayName";

/// Login state machine for one launcher account.
///
/// Holds the credentials and session state (username, password or
/// cached token, selected profile, user properties) and drives the
/// password-flow / token-flow login described by the Yggdrasil
/// protocol. Operations take `&mut self` and perform blocking network
/// I/O from the caller's perspective; callers needing a responsive UI
/// should run them off their event thread.
#[derive(Debug)]
pub struct AuthenticationSession {
    client: AuthServiceClient,
    /// When false (offline mode), a username alone is enough to log in
    online_required: bool,

    username: Option<String>,
    password: Option<Zeroizing<String>>,
    user_id: Option<String>,
    user_type: UserType,

    access_token: Option<String>,
    online: bool,
    selected_profile: Option<GameProfile>,
    profiles: Vec<GameProfile>,
    user_properties: HashMap<String, String>,
}

fn non_blank(value: &str) -> bool {
    !value.trim().is_empty()
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(non_blank)
}

impl AuthenticationSession {
    pub fn new(client: AuthServiceClient, online_required: bool) -> Self {
        Self {
            client,
            online_required,
            username: None,
            password: None,
            user_id: None,
            user_type: UserType::default(),
            access_token: None,
            online: false,
            selected_profile: None,
            profiles: Vec::new(),
            user_properties: HashMap::new(),
        }
    }

    pub fn client(&self) -> &AuthServiceClient {
        &self.client
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn user_type(&self) -> UserType {
        self.user_type
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn selected_profile(&self) -> Option<&GameProfile> {
        self.selected_profile.as_ref()
    }

    pub fn available_profiles(&self) -> &[GameProfile] {
        &self.profiles
    }

    pub fn user_properties(&self) -> &HashMap<String, String> {
        &self.user_properties
    }

    /// Change the account username. Refused while the session is
    /// logged in and online; log out first.
    pub fn set_username(&mut self, username: impl Into<String>) -> Result<()> {
        if self.is_logged_in() && self.can_play_online() {
            return Err(AuthError::SessionActive);
        }
        self.username = Some(username.into());
        Ok(())
    }

    /// Change the account password. Same restriction as
    /// [`set_username`](Self::set_username). The password is dropped
    /// from memory after any successful exchange.
    pub fn set_password(&mut self, password: impl Into<String>) -> Result<()> {
        if self.is_logged_in() && self.can_play_online() {
            return Err(AuthError::SessionActive);
        }
        self.password = Some(Zeroizing::new(password.into()));
        Ok(())
    }

    pub fn is_logged_in(&self) -> bool {
        present(&self.access_token)
    }

    /// Logged in, with a selected profile, and the last server round
    /// trip succeeded
    pub fn can_play_online(&self) -> bool {
        self.is_logged_in() && self.selected_profile.is_some() && self.online
    }

    /// Whether a login attempt is worth making with the current
    /// credentials
    pub fn can_log_in(&self) -> bool {
        if !self.online_required {
            return present(&self.username);
        }
        !self.can_play_online()
            && present(&self.username)
            && (self.password.as_ref().is_some_and(|p| non_blank(p))
                || present(&self.access_token))
    }

    /// Log in with the cached token when one is present, otherwise
    /// with username and password.
    #[instrument(skip(self), fields(account = self.username.as_deref().unwrap_or("")))]
    pub async fn log_in(&mut self) -> Result<()> {
        let username = self
            .username
            .clone()
            .filter(|u| non_blank(u))
            .ok_or_else(|| AuthError::InvalidCredentials("missing username".to_string()))?;

        if present(&self.access_token) {
            return self.log_in_with_token(&username).await;
        }

        let has_password = self.password.as_ref().is_some_and(|p| non_blank(p));
        if !has_password {
            if self.online_required {
                return Err(AuthError::InvalidCredentials("missing password".to_string()));
            }
            // Offline mode: accept the username locally without a
            // server round trip. No token is minted, so the session
            // never claims online play.
            info!("logging in offline");
            self.user_id = Some(username);
            self.online = false;
            return Ok(());
        }

        self.log_in_with_password(&username).await
    }

    async fn log_in_with_password(&mut self, username: &str) -> Result<()> {
        info!("logging in with username and password");
        let password = self.password.clone().unwrap_or_default();
        let response = self
            .client
            .authenticate(username, &password, username)
            .await?;
        self.apply_session_response(username, response)
    }

    async fn log_in_with_token(&mut self, username: &str) -> Result<()> {
        if !present(&self.user_id) {
            if !non_blank(username) {
                return Err(AuthError::InvalidCredentials(
                    "missing user id and username".to_string(),
                ));
            }
            self.user_id = Some(username.to_string());
        }
        let token = self
            .access_token
            .clone()
            .filter(|t| non_blank(t))
            .ok_or_else(|| AuthError::InvalidCredentials("missing access token".to_string()))?;

        info!("logging in with access token");
        if self.check_token_validity(&token, username).await {
            debug!("token still valid, skipping refresh");
            self.online = true;
            return Ok(());
        }

        let response = self.client.refresh(&token, None, username).await?;
        self.apply_session_response(username, response)
    }

    /// Fire-and-forget validation; rejection and transport failure
    /// both count as "not valid" and fall through to refresh.
    async fn check_token_validity(&self, token: &str, username: &str) -> bool {
        self.client.validate(token, username).await.is_ok()
    }

    /// Ingest an authenticate/refresh response.
    ///
    /// The client-token check happens before any field is touched, so
    /// a mismatch leaves the session exactly as it was.
    fn apply_session_response(&mut self, username: &str, response: SessionResponse) -> Result<()> {
        if response.client_token != self.client.client_token() {
            return Err(AuthError::ClientTokenMismatch);
        }

        let user_type = response
            .selected_profile
            .as_ref()
            .or_else(|| response.available_profiles.first())
            .map(|profile| UserType::from_legacy(profile.legacy));
        let user_id = response
            .user
            .as_ref()
            .and_then(|user| user.id.clone())
            .filter(|id| non_blank(id))
            .unwrap_or_else(|| username.to_string());

        if let Some(user_type) = user_type {
            self.user_type = user_type;
        }
        self.user_id = Some(user_id);
        self.online = true;
        self.access_token = Some(response.access_token);
        self.profiles = response.available_profiles;
        self.selected_profile = response.selected_profile;

        self.user_properties.clear();
        if let Some(user) = response.user {
            for property in user.properties {
                self.user_properties.insert(property.name, property.value);
            }
        }

        self.password = None;
        Ok(())
    }

    /// Drop all session state. Username and password survive so the
    /// user can log back in.
    pub fn log_out(&mut self) {
        self.user_id = None;
        self.user_type = UserType::default();
        self.access_token = None;
        self.online = false;
        self.selected_profile = None;
        self.profiles.clear();
        self.user_properties.clear();
    }

    /// Pin one of the available profiles to this session.
    ///
    /// One-shot: once a profile is selected the session must be logged
    /// out and back in to change it.
    #[instrument(skip(self, profile), fields(profile_name = %profile.name))]
    pub async fn select_game_profile(&mut self, profile: &GameProfile) -> Result<()> {
        let Some(token) = self.access_token.clone().filter(|t| non_blank(t)) else {
            return Err(AuthError::NotLoggedIn);
        };
        if self.selected_profile.is_some() {
            return Err(AuthError::ProfileAlreadySelected);
        }
        if !self.profiles.contains(profile) {
            return Err(AuthError::InvalidProfile(format!(
                "'{}' is not one of this account's profiles",
                profile.name
            )));
        }

        let account = self.username.clone().unwrap_or_default();
        let response = self.client.refresh(&token, Some(profile), &account).await?;
        if response.client_token != self.client.client_token() {
            return Err(AuthError::ClientTokenMismatch);
        }

        self.online = true;
        self.access_token = Some(response.access_token);
        self.selected_profile = response.selected_profile;
        Ok(())
    }

    /// Restore session state from a persisted credential map. Replaces
    /// the current state entirely; blank or missing values stay unset.
    pub fn load_from_storage(&mut self, credentials: &HashMap<String, String>) {
        self.log_out();

        let get = |key: &str| credentials.get(key).cloned().filter(|v| non_blank(v));
        self.username = get(STORAGE_KEY_USER_NAME);
        self.user_id = get(STORAGE_KEY_USER_ID);
        if let (Some(id), Some(name)) = (get(STORAGE_KEY_PROFILE_ID), get(STORAGE_KEY_PROFILE_NAME))
        {
            self.selected_profile = Some(GameProfile::new(id, name));
        }
        self.access_token = get(STORAGE_KEY_ACCESS_TOKEN);
    }

    /// Persistable credential map. Blank values are never written; in
    /// particular there is no `accessToken` key unless one is held.
    pub fn save_for_storage(&self) -> HashMap<String, String> {
        let mut result = HashMap::new();

        let mut put = |key: &str, value: Option<&str>| {
            if let Some(value) = value.filter(|v| non_blank(v)) {
                result.insert(key.to_string(), value.to_string());
            }
        };
        put(STORAGE_KEY_USER_NAME, self.username.as_deref());
        put(STORAGE_KEY_USER_ID, self.user_id.as_deref());
        if let Some(profile) = &self.selected_profile {
            put(STORAGE_KEY_PROFILE_ID, Some(&profile.id));
            put(STORAGE_KEY_PROFILE_NAME, Some(&profile.name));
        }
        put(STORAGE_KEY_ACCESS_TOKEN, self.access_token.as_deref());

        result
    }

    /// Key under which this session's credentials are stored
    pub fn account_key(&self) -> Option<&str> {
        self.username.as_deref().filter(|u| non_blank(u))
    }
}
