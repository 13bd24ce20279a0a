use std::time::Duration;

use url::Url;

use crate::models::Agent;

/// Production Yggdrasil authentication server.
pub const MOJANG_AUTH_URL: &str = "https://authserver.mojang.com/";

/// Route suffixes, resolved against the configured base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routes {
    pub authenticate: String,
    pub refresh: String,
    pub validate: String,
    pub invalidate: String,
    pub signout: String,
}

impl Default for Routes {
    fn default() -> Self {
        Self {
            authenticate: "authenticate".to_string(),
            refresh: "refresh".to_string(),
            validate: "validate".to_string(),
            invalidate: "invalidate".to_string(),
            signout: "signout".to_string(),
        }
    }
}

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpTimeouts {
    pub connect: Duration,
    pub request: Duration,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(15),
            request: Duration::from_secs(30),
        }
    }
}

/// Configuration for [`AuthServiceClient`](crate::AuthServiceClient)
#[derive(Debug, Clone)]
pub struct AuthServiceConfig {
    /// Base URL of the authentication service
    pub base_url: Url,

    /// Route suffixes joined onto `base_url`
    pub routes: Routes,

    /// Which game/product is authenticating
    pub agent: Agent,

    /// HTTP client timeouts
    pub http_timeouts: HttpTimeouts,

    /// Custom user agent (optional)
    pub user_agent: Option<String>,
}

impl AuthServiceConfig {
    /// Create config for the production Mojang authentication server
    pub fn mojang() -> Self {
        Self::custom(Url::parse(MOJANG_AUTH_URL).expect("valid auth server URL"))
    }

    /// Create config against an arbitrary base URL (alternate backends, tests)
    pub fn custom(base_url: Url) -> Self {
        Self {
            base_url,
            routes: Routes::default(),
            agent: Agent::minecraft(),
            http_timeouts: HttpTimeouts::default(),
            user_agent: Some("boreal-launcher".to_string()),
        }
    }
}

impl Default for AuthServiceConfig {
    fn default() -> Self {
        Self::mojang()
    }
}
