//! End-to-end login flow tests against a mock Yggdrasil service

use std::collections::HashMap;

use bl_auth::{
    AuthError, AuthServiceClient, AuthServiceConfig, AuthenticationSession, GameProfile, UserType,
};
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn mock_client(server: &MockServer) -> AuthServiceClient {
    let config = AuthServiceConfig::custom(Url::parse(&server.uri()).unwrap());
    AuthServiceClient::new(config).unwrap()
}

fn online_session(server: &MockServer) -> AuthenticationSession {
    AuthenticationSession::new(mock_client(server), true)
}

fn invalid_credentials_body() -> serde_json::Value {
    json!({
        "error": "ForbiddenOperationException",
        "errorMessage": "Invalid credentials. Invalid username or password."
    })
}

fn stored_credentials(with_profile: bool) -> HashMap<String, String> {
    let mut credentials = HashMap::new();
    credentials.insert("username".to_string(), "alice".to_string());
    credentials.insert("userid".to_string(), "user-1".to_string());
    credentials.insert("accessToken".to_string(), "CACHED".to_string());
    if with_profile {
        credentials.insert("uuid".to_string(), "p1".to_string());
        credentials.insert("displayName".to_string(), "Alice".to_string());
    }
    credentials
}

#[tokio::test]
async fn password_flow_populates_the_session() {
    let server = MockServer::start().await;
    let mut session = online_session(&server);
    let client_token = session.client().client_token().to_string();

    Mock::given(method("POST"))
        .and(path("/authenticate"))
        .and(body_partial_json(json!({
            "agent": { "name": "Minecraft", "version": 1 },
            "username": "alice",
            "password": "secret",
            "clientToken": client_token,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accessToken": "AT1",
            "clientToken": client_token,
            "availableProfiles": [
                { "id": "p1", "name": "Alice", "legacy": false }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    session.set_username("alice").unwrap();
    session.set_password("secret").unwrap();
    session.log_in().await.unwrap();

    assert!(session.is_logged_in());
    assert_eq!(session.access_token(), Some("AT1"));
    assert_eq!(session.available_profiles().len(), 1);
    assert_eq!(session.available_profiles()[0].id, "p1");
    assert!(session.selected_profile().is_none());
    assert!(!session.can_play_online());
    assert_eq!(session.user_type(), UserType::Mojang);
    // No user object in the response, so the id falls back to the username
    assert_eq!(session.user_id(), Some("alice"));
}

#[tokio::test]
async fn password_flow_adopts_user_id_and_properties() {
    let server = MockServer::start().await;
    let mut session = online_session(&server);
    let client_token = session.client().client_token().to_string();

    Mock::given(method("POST"))
        .and(path("/authenticate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accessToken": "AT1",
            "clientToken": client_token,
            "availableProfiles": [
                { "id": "p1", "name": "Alice", "legacy": true }
            ],
            "selectedProfile": { "id": "p1", "name": "Alice", "legacy": true },
            "user": {
                "id": "user-1",
                "properties": [
                    { "name": "twitch_access_token", "value": "tw-1" }
                ]
            }
        })))
        .mount(&server)
        .await;

    session.set_username("alice").unwrap();
    session.set_password("secret").unwrap();
    session.log_in().await.unwrap();

    assert_eq!(session.user_id(), Some("user-1"));
    assert_eq!(session.user_type(), UserType::Legacy);
    assert_eq!(
        session.user_properties().get("twitch_access_token"),
        Some(&"tw-1".to_string())
    );
    assert!(session.can_play_online());
}

#[tokio::test]
async fn client_token_mismatch_fails_without_mutating_state() {
    let server = MockServer::start().await;
    let mut session = online_session(&server);

    Mock::given(method("POST"))
        .and(path("/authenticate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accessToken": "AT1",
            "clientToken": "someone-elses-token",
            "availableProfiles": [
                { "id": "p1", "name": "Alice", "legacy": false }
            ]
        })))
        .mount(&server)
        .await;

    session.set_username("alice").unwrap();
    session.set_password("secret").unwrap();

    let error = session.log_in().await.unwrap_err();
    assert!(matches!(error, AuthError::ClientTokenMismatch));

    assert!(!session.is_logged_in());
    assert!(session.available_profiles().is_empty());
    assert!(session.user_id().is_none());
    // The password is only cleared on success
    assert!(session.can_log_in());
}

#[tokio::test]
async fn invalid_credentials_from_the_service_are_classified() {
    let server = MockServer::start().await;
    let mut session = online_session(&server);

    Mock::given(method("POST"))
        .and(path("/authenticate"))
        .respond_with(ResponseTemplate::new(403).set_body_json(invalid_credentials_body()))
        .mount(&server)
        .await;

    session.set_username("alice").unwrap();
    session.set_password("wrong").unwrap();

    let error = session.log_in().await.unwrap_err();
    assert!(error.is_invalid_credentials());
    assert!(!session.is_logged_in());
}

#[tokio::test]
async fn valid_cached_token_skips_the_refresh_call() {
    let server = MockServer::start().await;
    let mut session = online_session(&server);

    Mock::given(method("POST"))
        .and(path("/validate"))
        .and(body_partial_json(json!({ "accessToken": "CACHED" })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    session.load_from_storage(&stored_credentials(true));
    assert!(session.is_logged_in());
    assert!(!session.can_play_online());

    session.log_in().await.unwrap();

    // Token, profile and the rest of the state are untouched
    assert_eq!(session.access_token(), Some("CACHED"));
    assert_eq!(
        session.selected_profile().map(|p| p.id.as_str()),
        Some("p1")
    );
    assert!(session.can_play_online());
}

#[tokio::test]
async fn rejected_cached_token_falls_through_to_refresh() {
    let server = MockServer::start().await;
    let mut session = online_session(&server);
    let client_token = session.client().client_token().to_string();

    Mock::given(method("POST"))
        .and(path("/validate"))
        .respond_with(ResponseTemplate::new(403).set_body_json(invalid_credentials_body()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/refresh"))
        .and(body_partial_json(json!({
            "accessToken": "CACHED",
            "clientToken": client_token,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accessToken": "FRESH",
            "clientToken": client_token,
            "availableProfiles": [
                { "id": "p1", "name": "Alice", "legacy": false }
            ],
            "selectedProfile": { "id": "p1", "name": "Alice", "legacy": false }
        })))
        .expect(1)
        .mount(&server)
        .await;

    session.load_from_storage(&stored_credentials(false));
    session.log_in().await.unwrap();

    assert_eq!(session.access_token(), Some("FRESH"));
    assert!(session.can_play_online());
    assert_eq!(session.user_type(), UserType::Mojang);
}

#[tokio::test]
async fn failed_validate_is_not_an_error_state() {
    let server = MockServer::start().await;
    let mut session = online_session(&server);
    let client_token = session.client().client_token().to_string();

    // No /validate mock mounted: wiremock answers 404, which the
    // session treats the same as a rejection.
    Mock::given(method("POST"))
        .and(path("/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accessToken": "FRESH",
            "clientToken": client_token,
        })))
        .expect(1)
        .mount(&server)
        .await;

    session.load_from_storage(&stored_credentials(false));
    session.log_in().await.unwrap();

    assert_eq!(session.access_token(), Some("FRESH"));
}

#[tokio::test]
async fn selecting_a_profile_refreshes_and_pins_it() {
    let server = MockServer::start().await;
    let mut session = online_session(&server);
    let client_token = session.client().client_token().to_string();

    Mock::given(method("POST"))
        .and(path("/authenticate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accessToken": "AT1",
            "clientToken": client_token,
            "availableProfiles": [
                { "id": "p1", "name": "Alice", "legacy": false },
                { "id": "p2", "name": "AliceAlt", "legacy": false }
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/refresh"))
        .and(body_partial_json(json!({
            "accessToken": "AT1",
            "selectedProfile": { "id": "p2", "name": "AliceAlt" },
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accessToken": "AT2",
            "clientToken": client_token,
            "selectedProfile": { "id": "p2", "name": "AliceAlt", "legacy": false }
        })))
        .expect(1)
        .mount(&server)
        .await;

    session.set_username("alice").unwrap();
    session.set_password("secret").unwrap();
    session.log_in().await.unwrap();
    assert!(!session.can_play_online());

    let profile = session.available_profiles()[1].clone();
    session.select_game_profile(&profile).await.unwrap();

    assert_eq!(session.access_token(), Some("AT2"));
    assert_eq!(
        session.selected_profile().map(|p| p.id.as_str()),
        Some("p2")
    );
    assert!(session.can_play_online());

    // Selection is one-shot per session
    let other = GameProfile::new("p1", "Alice");
    let error = session.select_game_profile(&other).await.unwrap_err();
    assert!(matches!(error, AuthError::ProfileAlreadySelected));
}

#[tokio::test]
async fn invalidate_and_signout_hit_their_routes() {
    let server = MockServer::start().await;
    let client = mock_client(&server);
    let client_token = client.client_token().to_string();

    Mock::given(method("POST"))
        .and(path("/invalidate"))
        .and(body_partial_json(json!({
            "accessToken": "AT1",
            "clientToken": client_token,
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/signout"))
        .and(body_partial_json(json!({ "username": "alice" })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client.invalidate("AT1", "alice").await.unwrap();
    client.signout("alice", "secret", "alice").await.unwrap();
}
