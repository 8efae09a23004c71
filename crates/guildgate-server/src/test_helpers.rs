//! Shared fixtures for unit tests: platform config against a mock server,
//! an in-memory credential store, and common platform mocks.

#![allow(clippy::unwrap_used)]

use guildgate_core::config::PlatformConfig;
use guildgate_crypto::TokenCipher;
use serde_json::json;
use wiremock::matchers::{body_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::platform::PlatformClient;
use crate::storage::{CredentialStore, IdentityDatabase, NewIdentity};

pub const BOT_TOKEN: &str = "bot-token-test";

pub fn platform_config(base: &str) -> PlatformConfig {
    PlatformConfig {
        api_base: base.to_string(),
        authorize_url: format!("{base}/oauth2/authorize"),
        client_id: "client-123".to_string(),
        client_secret: "client-secret".to_string(),
        redirect_uri: "http://localhost:8080/callback".to_string(),
        bot_token: BOT_TOKEN.to_string(),
        request_timeout_ms: 500,
        ..PlatformConfig::default()
    }
}

pub fn platform_client(server: &MockServer) -> PlatformClient {
    PlatformClient::new(&platform_config(&server.uri())).unwrap()
}

pub async fn test_store() -> CredentialStore {
    let db = IdentityDatabase::open_in_memory().await.unwrap();
    CredentialStore::new(db, TokenCipher::from_secret(b"unit-tests").unwrap())
}

pub fn new_identity(id: &str, name: &str, token: &str, community: &str) -> NewIdentity {
    NewIdentity {
        identity_id: id.to_string(),
        display_name: name.to_string(),
        source_ip: "203.0.113.7".to_string(),
        access_token: token.to_string(),
        refresh_token: None,
        token_ttl_seconds: Some(604_800),
        granted_scopes: Some("identify guilds.join".to_string()),
        origin_community_id: community.to_string(),
    }
}

/// Mount a join endpoint for (identity, token, community) answering `status`.
pub async fn mount_join(server: &MockServer, identity: &str, token: &str, community: &str, status: u16) {
    Mock::given(method("PUT"))
        .and(path(format!("/guilds/{community}/members/{identity}")))
        .and(header("authorization", format!("Bot {BOT_TOKEN}").as_str()))
        .and(body_json(json!({ "access_token": token })))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Mount a role list containing the verified role with `role_id`.
pub async fn mount_existing_role(server: &MockServer, community: &str, role_id: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/guilds/{community}/roles")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "0", "name": "@everyone" },
            { "id": role_id, "name": "Verified" }
        ])))
        .mount(server)
        .await;
}

/// Mount role assignment for (identity, role, community) answering 204.
pub async fn mount_assign_role(server: &MockServer, identity: &str, role_id: &str, community: &str) {
    Mock::given(method("PUT"))
        .and(path(format!(
            "/guilds/{community}/members/{identity}/roles/{role_id}"
        )))
        .respond_with(ResponseTemplate::new(204))
        .mount(server)
        .await;
}

/// Count requests received with the given method and path.
pub async fn count_requests(server: &MockServer, verb: &str, request_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.method.as_str() == verb && r.url.path() == request_path)
        .count()
}

/// Mount a token endpoint accepting `code` and granting `access_token`.
pub async fn mount_token_exchange(server: &MockServer, code: &str, access_token: &str) {
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(body_string_contains(format!("code={code}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": access_token,
            "refresh_token": "refresh-secret",
            "expires_in": 604_800,
            "scope": "identify guilds.join",
            "token_type": "Bearer"
        })))
        .mount(server)
        .await;
}

/// Mount `GET /users/@me` for `access_token`.
pub async fn mount_current_user(server: &MockServer, access_token: &str, id: &str, username: &str) {
    Mock::given(method("GET"))
        .and(path("/users/@me"))
        .and(header("authorization", format!("Bearer {access_token}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": id,
            "username": username,
            "global_name": null
        })))
        .mount(server)
        .await;
}
