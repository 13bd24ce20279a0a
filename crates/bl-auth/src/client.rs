use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;
use uuid::Uuid;

use crate::config::AuthServiceConfig;
use crate::errors::{AuthError, Result};
use crate::models::{
    AuthenticateRequest, ErrorResponse, GameProfile, RefreshRequest, SessionResponse,
    SignoutRequest, TokenRequest,
};

/// Transport for the Yggdrasil authentication service.
///
/// Serializes typed requests to JSON, POSTs them to the configured
/// routes and deserializes typed responses. Owns the client token,
/// generated once per client instance and attached to every request;
/// the server must echo it back unchanged.
#[derive(Debug, Clone)]
pub struct AuthServiceClient {
    config: AuthServiceConfig,
    http: Client,
    client_token: String,
}

impl AuthServiceClient {
    /// Create a client with a freshly generated client token
    pub fn new(config: AuthServiceConfig) -> Result<Self> {
        Self::with_client_token(config, Uuid::new_v4().to_string())
    }

    /// Create a client reusing a client token round-tripped from storage
    pub fn with_client_token(config: AuthServiceConfig, client_token: String) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(config.http_timeouts.connect)
            .timeout(config.http_timeouts.request)
            .user_agent(config.user_agent.as_deref().unwrap_or("boreal-launcher"))
            .build()?;

        Ok(Self {
            config,
            http,
            client_token,
        })
    }

    /// Client token sent with every request
    pub fn client_token(&self) -> &str {
        &self.client_token
    }

    pub fn config(&self) -> &AuthServiceConfig {
        &self.config
    }

    /// Exchange username and password for a session
    #[instrument(skip(self, password))]
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
        account: &str,
    ) -> Result<SessionResponse> {
        let request = AuthenticateRequest {
            agent: &self.config.agent,
            username,
            password,
            client_token: &self.client_token,
            request_user: true,
        };

        debug!("authenticating with username and password");
        let route = self.config.routes.authenticate.clone();
        self.post_json(&route, &request).await
    }

    /// Exchange an existing access token for a fresh one, optionally
    /// pinning a game profile
    #[instrument(skip(self, access_token))]
    pub async fn refresh(
        &self,
        access_token: &str,
        selected_profile: Option<&GameProfile>,
        account: &str,
    ) -> Result<SessionResponse> {
        let request = RefreshRequest {
            client_token: &self.client_token,
            access_token,
            selected_profile,
            request_user: true,
        };

        debug!("refreshing access token");
        let route = self.config.routes.refresh.clone();
        self.post_json(&route, &request).await
    }

    /// Check whether the server still accepts an access token.
    ///
    /// Empty success body; any rejection surfaces as an error.
    #[instrument(skip(self, access_token))]
    pub async fn validate(&self, access_token: &str, account: &str) -> Result<()> {
        let request = TokenRequest {
            client_token: &self.client_token,
            access_token,
        };

        debug!("validating access token");
        let route = self.config.routes.validate.clone();
        self.post_empty(&route, &request).await
    }

    /// Invalidate an access token on the server
    #[instrument(skip(self, access_token))]
    pub async fn invalidate(&self, access_token: &str, account: &str) -> Result<()> {
        let request = TokenRequest {
            client_token: &self.client_token,
            access_token,
        };

        debug!("invalidating access token");
        let route = self.config.routes.invalidate.clone();
        self.post_empty(&route, &request).await
    }

    /// Invalidate every access token issued for an account
    #[instrument(skip(self, password))]
    pub async fn signout(&self, username: &str, password: &str, account: &str) -> Result<()> {
        let request = SignoutRequest { username, password };

        debug!("signing out all sessions");
        let route = self.config.routes.signout.clone();
        self.post_empty(&route, &request).await
    }

    fn route_url(&self, route: &str) -> Result<Url> {
        Ok(self.config.base_url.join(route)?)
    }

    async fn post_json<R: DeserializeOwned>(
        &self,
        route: &str,
        body: &impl Serialize,
    ) -> Result<R> {
        let response = self.send(route, body).await?;
        Ok(response.json().await?)
    }

    async fn post_empty(&self, route: &str, body: &impl Serialize) -> Result<()> {
        self.send(route, body).await?;
        Ok(())
    }

    async fn send(&self, route: &str, body: &impl Serialize) -> Result<reqwest::Response> {
        let url = self.route_url(route)?;
        let response = self.http.post(url).json(body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_error_body(status, &body));
        }

        Ok(response)
    }
}

/// Map a non-success status plus body into the error taxonomy.
///
/// Structured service errors distinguish invalid credentials from other
/// rejections; anything unparseable falls back to a raw HTTP error.
fn map_error_body(status: StatusCode, body: &str) -> AuthError {
    if let Ok(error) = serde_json::from_str::<ErrorResponse>(body) {
        let message = error.error_message.unwrap_or_default();
        if error.error.contains("ForbiddenOperationException")
            && message.starts_with("Invalid credentials")
        {
            return AuthError::InvalidCredentials(message);
        }
        return AuthError::Service {
            error: error.error,
            message,
        };
    }

    AuthError::Http {
        status,
        body_snippet: body.chars().take(200).collect(),
    }
}
