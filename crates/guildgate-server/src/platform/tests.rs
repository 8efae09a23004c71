//! Tests for the platform client against a mock server.

#![allow(clippy::unwrap_used, clippy::panic)]

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::client::{PlatformClient, PlatformError, announcement_payload};
use super::types::{Announcement, JoinResult};
use crate::test_helpers::{
    count_requests, mount_assign_role, mount_existing_role, mount_join, platform_client,
    platform_config,
};

// =============================================================================
// Construction
// =============================================================================

#[test]
fn empty_bot_token_is_config_error() {
    let mut config = platform_config("https://api.example");
    config.bot_token.clear();
    assert!(matches!(
        PlatformClient::new(&config),
        Err(PlatformError::Config(_))
    ));
}

#[test]
fn empty_api_base_is_config_error() {
    let config = platform_config("");
    assert!(matches!(
        PlatformClient::new(&config),
        Err(PlatformError::Config(_))
    ));
}

#[test]
fn api_url_encodes_segments() {
    let client = PlatformClient::new(&platform_config("https://api.example/api/v10/")).unwrap();
    assert_eq!(
        client.api_url(&["guilds", "G1", "members", "U1"]).as_str(),
        "https://api.example/api/v10/guilds/G1/members/U1"
    );
    let sneaky = client.api_url(&["guilds", "../channels/1", "roles"]);
    assert!(!sneaky.path().contains("/../"), "path: {}", sneaky.path());
}

#[test]
fn authorize_url_echoes_state() {
    let client = PlatformClient::new(&platform_config("https://api.example")).unwrap();
    let url = client.authorize_url("G1").unwrap();
    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    assert!(pairs.contains(&("state".into(), "G1".into())));
    assert!(pairs.contains(&("response_type".into(), "code".into())));
    assert!(pairs.contains(&("client_id".into(), "client-123".into())));
    assert!(pairs.contains(&("scope".into(), "identify guilds.join".into())));
}

// =============================================================================
// OAuth2
// =============================================================================

#[tokio::test]
async fn exchange_code_returns_grant() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(body_string_contains("code=abc"))
        .and(body_string_contains("grant_type=authorization_code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "T1",
            "refresh_token": "R1",
            "expires_in": 604_800,
            "scope": "identify guilds.join",
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let grant = platform_client(&server).exchange_code("abc").await.unwrap();
    assert_eq!(grant.access_token.as_deref(), Some("T1"));
    assert_eq!(grant.refresh_token.as_deref(), Some("R1"));
    assert_eq!(grant.expires_in, Some(604_800));
    assert_eq!(grant.scope.as_deref(), Some("identify guilds.join"));
}

#[tokio::test]
async fn rejected_code_is_auth_exchange_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid \"code\" in request."
        })))
        .mount(&server)
        .await;

    let err = platform_client(&server).exchange_code("used").await.unwrap_err();
    match err {
        PlatformError::AuthExchange { status, message } => {
            assert_eq!(status, 400);
            assert!(message.contains("invalid_grant"));
        }
        other => panic!("expected AuthExchange, got {other:?}"),
    }
}

#[tokio::test]
async fn grant_without_access_token_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "scope": "identify" })))
        .mount(&server)
        .await;

    let err = platform_client(&server).exchange_code("abc").await.unwrap_err();
    assert!(matches!(err, PlatformError::AuthExchange { .. }));
}

#[tokio::test]
async fn fetch_identity_uses_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/@me"))
        .and(header("authorization", "Bearer T1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "U1",
            "username": "alice",
            "global_name": "Alice",
            "avatar": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    let user = platform_client(&server).fetch_identity("T1").await.unwrap();
    assert_eq!(user.id, "U1");
    assert_eq!(user.username, "alice");
}

#[tokio::test]
async fn expired_token_is_identity_fetch_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/@me"))
        .respond_with(ResponseTemplate::new(401).set_body_string("401: Unauthorized"))
        .mount(&server)
        .await;

    let err = platform_client(&server).fetch_identity("stale").await.unwrap_err();
    assert!(matches!(err, PlatformError::IdentityFetch { status: 401, .. }));
}

// =============================================================================
// Join classification
// =============================================================================

#[tokio::test]
async fn join_status_classification() {
    let cases = [
        (201, JoinResult::Joined, true),
        (204, JoinResult::AlreadyMember, true),
        (403, JoinResult::Forbidden, false),
        (404, JoinResult::Unknown(404), false),
        (500, JoinResult::Unknown(500), false),
    ];

    for (status, expected, success) in cases {
        let server = MockServer::start().await;
        mount_join(&server, "U1", "T1", "G1", status).await;

        let result = platform_client(&server)
            .join_community("U1", "T1", "G1")
            .await
            .unwrap();
        assert_eq!(result, expected, "status {status}");
        assert_eq!(result.is_success(), success, "status {status}");
        assert_eq!(result.status(), status);
    }
}

#[tokio::test]
async fn join_timeout_is_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/guilds/G1/members/U1"))
        .respond_with(ResponseTemplate::new(201).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let err = platform_client(&server)
        .join_community("U1", "T1", "G1")
        .await
        .unwrap_err();
    assert!(matches!(err, PlatformError::Http(_)));
}

// =============================================================================
// Roles
// =============================================================================

#[tokio::test]
async fn ensure_role_finds_existing_role() {
    let server = MockServer::start().await;
    mount_existing_role(&server, "G1", "R9").await;

    let role = platform_client(&server).ensure_role("G1").await;
    assert_eq!(role.as_deref(), Some("R9"));
    assert_eq!(count_requests(&server, "POST", "/guilds/G1/roles").await, 0);
}

#[tokio::test]
async fn ensure_role_creates_inert_role_when_missing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/guilds/G1/roles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "0", "name": "@everyone" }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/guilds/G1/roles"))
        .and(wiremock::matchers::body_json(json!({
            "name": "Verified",
            "permissions": "0",
            "hoist": false,
            "mentionable": false
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "id": "R2", "name": "Verified" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let role = platform_client(&server).ensure_role("G1").await;
    assert_eq!(role.as_deref(), Some("R2"));
}

#[tokio::test]
async fn ensure_role_returns_none_when_denied() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/guilds/G1/roles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/guilds/G1/roles"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    assert!(platform_client(&server).ensure_role("G1").await.is_none());
}

#[tokio::test]
async fn ensure_role_returns_none_when_listing_denied() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/guilds/G1/roles"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    assert!(platform_client(&server).ensure_role("G1").await.is_none());
    assert_eq!(count_requests(&server, "POST", "/guilds/G1/roles").await, 0);
}

#[tokio::test]
async fn assign_role_reports_success_and_failure() {
    let server = MockServer::start().await;
    mount_assign_role(&server, "U1", "R1", "G1").await;
    Mock::given(method("PUT"))
        .and(path("/guilds/G1/members/U2/roles/R1"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = platform_client(&server);
    assert!(client.assign_role("U1", "R1", "G1").await);
    assert!(!client.assign_role("U2", "R1", "G1").await);
}

// =============================================================================
// Communities and messages
// =============================================================================

#[tokio::test]
async fn list_present_communities_single_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/@me/guilds"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "G1", "name": "One" },
            { "id": "G2", "name": "Two" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let ids = platform_client(&server).list_present_communities().await.unwrap();
    assert_eq!(ids, vec!["G1".to_string(), "G2".to_string()]);
}

#[tokio::test]
async fn list_present_communities_follows_pages() {
    let server = MockServer::start().await;
    let first_page: Vec<_> = (0..200).map(|i| json!({ "id": format!("{i:04}") })).collect();
    Mock::given(method("GET"))
        .and(path("/users/@me/guilds"))
        .and(query_param("after", "0199"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": "0200" }])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/@me/guilds"))
        .respond_with(ResponseTemplate::new(200).set_body_json(first_page))
        .mount(&server)
        .await;

    let ids = platform_client(&server).list_present_communities().await.unwrap();
    assert_eq!(ids.len(), 201);
    assert_eq!(ids.last().map(String::as_str), Some("0200"));
}

#[tokio::test]
async fn list_present_communities_rejected_credential_is_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/@me/guilds"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = platform_client(&server).list_present_communities().await.unwrap_err();
    assert!(matches!(err, PlatformError::Api { status: 401, .. }));
}

fn announcement() -> Announcement {
    Announcement {
        title: "Verify".to_string(),
        description: "Click below".to_string(),
        image_url: Some("https://img.example/banner.png".to_string()),
        link_url: "https://verify.example/auth?guild_id=G1".to_string(),
        link_label: "Verify now".to_string(),
    }
}

#[test]
fn announcement_payload_has_embed_and_link_button() {
    let payload = announcement_payload(&announcement());
    assert_eq!(payload["embeds"][0]["title"], "Verify");
    assert_eq!(payload["embeds"][0]["image"]["url"], "https://img.example/banner.png");
    let button = &payload["components"][0]["components"][0];
    assert_eq!(button["style"], 5);
    assert_eq!(button["url"], "https://verify.example/auth?guild_id=G1");
}

#[test]
fn announcement_payload_omits_blank_image() {
    let mut a = announcement();
    a.image_url = Some(String::new());
    let payload = announcement_payload(&a);
    assert!(payload["embeds"][0].get("image").is_none());
}

#[tokio::test]
async fn post_announcement_to_channel() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/channels/C1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "M1" })))
        .expect(1)
        .mount(&server)
        .await;

    platform_client(&server)
        .post_announcement("C1", &announcement())
        .await
        .unwrap();
}

#[tokio::test]
async fn post_announcement_missing_access_is_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/channels/C1/messages"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Missing Access"))
        .mount(&server)
        .await;

    let err = platform_client(&server)
        .post_announcement("C1", &announcement())
        .await
        .unwrap_err();
    assert!(matches!(err, PlatformError::Api { status: 403, .. }));
}
