//! Chat platform REST client.
//!
//! Two credentials are in play: a member's own OAuth access token (identity
//! lookup, proof of consent for joins) and the service's privileged bot token
//! (membership and role management). Every call has the configured timeout
//! and is attempted once.

use std::time::Duration;

use guildgate_core::config::PlatformConfig;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{StatusCode, Url};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

use super::types::{
    Announcement, CreateRole, JoinResult, PartialCommunity, PlatformUser, Role, TokenGrant,
};

/// Page size for listing the service's communities.
const COMMUNITY_PAGE_SIZE: usize = 200;

/// Platform API client errors.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// The token endpoint rejected the code (expired, reused, wrong redirect).
    #[error("Authorization code exchange failed ({status}): {message}")]
    AuthExchange { status: u16, message: String },

    /// The access token could not be used to read the current user.
    #[error("Identity fetch failed ({status}): {message}")]
    IdentityFetch { status: u16, message: String },

    /// Any other non-success response from a service call.
    #[error("Platform API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Network error, timeout, or undecodable body.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Client for the platform's OAuth2 and REST endpoints.
#[derive(Debug, Clone)]
pub struct PlatformClient {
    http: reqwest::Client,
    api_base: Url,
    authorize_url: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    scopes: String,
    bot_auth: HeaderValue,
    role_name: String,
}

impl PlatformClient {
    /// Create a client from the platform section of the configuration.
    pub fn new(config: &PlatformConfig) -> Result<Self, PlatformError> {
        if config.api_base.trim().is_empty() {
            return Err(PlatformError::Config("api_base is empty".into()));
        }
        if config.bot_token.is_empty() {
            return Err(PlatformError::Config("bot token is empty".into()));
        }

        let api_base = Url::parse(config.api_base.trim_end_matches('/'))
            .map_err(|e| PlatformError::Config(format!("invalid api_base: {e}")))?;
        if api_base.cannot_be_a_base() {
            return Err(PlatformError::Config("api_base cannot be a base URL".into()));
        }

        let mut bot_auth = HeaderValue::from_str(&format!("Bot {}", config.bot_token))
            .map_err(|_| PlatformError::Config("Invalid bot token format".into()))?;
        bot_auth.set_sensitive(true);

        // reqwest is built with rustls-no-provider; Err means already installed.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self {
            http,
            api_base,
            authorize_url: config.authorize_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: config.redirect_uri.clone(),
            scopes: config.scopes.clone(),
            bot_auth,
            role_name: config.verified_role_name.clone(),
        })
    }

    /// Build an API URL from raw path segments; each segment is
    /// percent-encoded so IDs cannot alter the path.
    pub(crate) fn api_url(&self, segments: &[&str]) -> Url {
        let mut url = self.api_base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Browser URL that starts authorization, echoing `state` back to the
    /// callback.
    pub fn authorize_url(&self, state: &str) -> Result<Url, PlatformError> {
        Url::parse_with_params(
            &self.authorize_url,
            &[
                ("client_id", self.client_id.as_str()),
                ("response_type", "code"),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("scope", self.scopes.as_str()),
                ("state", state),
            ],
        )
        .map_err(|e| PlatformError::Config(format!("invalid authorize_url: {e}")))
    }

    fn bearer(access_token: &str) -> Result<HeaderValue, PlatformError> {
        let mut value = HeaderValue::from_str(&format!("Bearer {access_token}"))
            .map_err(|_| PlatformError::Config("Invalid access token format".into()))?;
        value.set_sensitive(true);
        Ok(value)
    }

    fn bot_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, self.bot_auth.clone());
        headers
    }

    async fn error_message(resp: reqwest::Response) -> String {
        let status = resp.status();
        match resp.text().await {
            Ok(body) if !body.is_empty() => body.chars().take(300).collect(),
            _ => status.canonical_reason().unwrap_or("Unknown").to_string(),
        }
    }

    // =========================================================================
    // OAuth2
    // =========================================================================

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenGrant, PlatformError> {
        let url = self.api_url(&["oauth2", "token"]);
        let resp = self
            .http
            .post(url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(PlatformError::AuthExchange {
                status: status.as_u16(),
                message: Self::error_message(resp).await,
            });
        }

        let grant: TokenGrant = resp.json().await?;
        match grant.access_token.as_deref() {
            Some(token) if !token.is_empty() => Ok(grant),
            _ => Err(PlatformError::AuthExchange {
                status: status.as_u16(),
                message: "response carried no access token".into(),
            }),
        }
    }

    /// Read the account behind `access_token`.
    pub async fn fetch_identity(&self, access_token: &str) -> Result<PlatformUser, PlatformError> {
        let url = self.api_url(&["users", "@me"]);
        let resp = self
            .http
            .get(url)
            .header(AUTHORIZATION, Self::bearer(access_token)?)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(PlatformError::IdentityFetch {
                status: status.as_u16(),
                message: Self::error_message(resp).await,
            });
        }

        Ok(resp.json().await?)
    }

    // =========================================================================
    // Membership and roles
    // =========================================================================

    /// Add `identity_id` to `community_id` using the member's own token.
    ///
    /// Non-success statuses are classified, never raised; only a transport
    /// fault is an `Err`.
    pub async fn join_community(
        &self,
        identity_id: &str,
        access_token: &str,
        community_id: &str,
    ) -> Result<JoinResult, PlatformError> {
        let url = self.api_url(&["guilds", community_id, "members", identity_id]);
        let resp = self
            .http
            .put(url)
            .headers(self.bot_headers())
            .json(&json!({ "access_token": access_token }))
            .send()
            .await?;

        let result = JoinResult::from_status(resp.status().as_u16());
        debug!(identity_id, community_id, ?result, "Join attempted");
        Ok(result)
    }

    /// Find the verified role in `community_id`, creating it when absent.
    ///
    /// Returns `None` (and logs) when the role can be neither found nor
    /// created; never raises.
    pub async fn ensure_role(&self, community_id: &str) -> Option<String> {
        match self.find_role(community_id).await {
            Ok(Some(role)) => return Some(role.id),
            Ok(None) => {}
            Err(e) => {
                warn!(community_id, error = %e, "Listing roles failed");
                return None;
            }
        }

        match self.create_role(community_id).await {
            Ok(role) => {
                debug!(community_id, role_id = %role.id, "Verified role created");
                Some(role.id)
            }
            Err(e) => {
                warn!(community_id, error = %e, "Creating verified role failed");
                None
            }
        }
    }

    async fn find_role(&self, community_id: &str) -> Result<Option<Role>, PlatformError> {
        let url = self.api_url(&["guilds", community_id, "roles"]);
        let resp = self.http.get(url).headers(self.bot_headers()).send().await?;
        if !resp.status().is_success() {
            return Err(PlatformError::Api {
                status: resp.status().as_u16(),
                message: Self::error_message(resp).await,
            });
        }
        let roles: Vec<Role> = resp.json().await?;
        Ok(roles.into_iter().find(|r| r.name == self.role_name))
    }

    async fn create_role(&self, community_id: &str) -> Result<Role, PlatformError> {
        let url = self.api_url(&["guilds", community_id, "roles"]);
        let resp = self
            .http
            .post(url)
            .headers(self.bot_headers())
            .json(&CreateRole::inert(&self.role_name))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(PlatformError::Api {
                status: resp.status().as_u16(),
                message: Self::error_message(resp).await,
            });
        }
        Ok(resp.json().await?)
    }

    /// Give `identity_id` the role `role_id` in `community_id`. Best effort:
    /// any failure is logged and reported as `false`.
    pub async fn assign_role(&self, identity_id: &str, role_id: &str, community_id: &str) -> bool {
        let url = self.api_url(&["guilds", community_id, "members", identity_id, "roles", role_id]);
        match self.http.put(url).headers(self.bot_headers()).send().await {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                warn!(identity_id, community_id, status = resp.status().as_u16(), "Role assignment rejected");
                false
            }
            Err(e) => {
                warn!(identity_id, community_id, error = %e, "Role assignment request failed");
                false
            }
        }
    }

    /// Every community the service identity belongs to.
    pub async fn list_present_communities(&self) -> Result<Vec<String>, PlatformError> {
        let mut ids = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let mut url = self.api_url(&["users", "@me", "guilds"]);
            url.query_pairs_mut()
                .append_pair("limit", &COMMUNITY_PAGE_SIZE.to_string());
            if let Some(last) = &after {
                url.query_pairs_mut().append_pair("after", last);
            }

            let resp = self.http.get(url).headers(self.bot_headers()).send().await?;
            if !resp.status().is_success() {
                return Err(PlatformError::Api {
                    status: resp.status().as_u16(),
                    message: Self::error_message(resp).await,
                });
            }

            let page: Vec<PartialCommunity> = resp.json().await?;
            let full_page = page.len() == COMMUNITY_PAGE_SIZE;
            after = page.last().map(|c| c.id.clone());
            ids.extend(page.into_iter().map(|c| c.id));

            if !full_page || after.is_none() {
                break;
            }
        }

        Ok(ids)
    }

    // =========================================================================
    // Messages
    // =========================================================================

    /// Post `announcement` to `channel_id` as an embed with a link button.
    pub async fn post_announcement(
        &self,
        channel_id: &str,
        announcement: &Announcement,
    ) -> Result<(), PlatformError> {
        let url = self.api_url(&["channels", channel_id, "messages"]);
        let resp = self
            .http
            .post(url)
            .headers(self.bot_headers())
            .json(&announcement_payload(announcement))
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::OK || status == StatusCode::CREATED {
            return Ok(());
        }
        Err(PlatformError::Api {
            status: status.as_u16(),
            message: Self::error_message(resp).await,
        })
    }
}

/// Message body for an announcement: one embed plus one link button row.
pub(crate) fn announcement_payload(announcement: &Announcement) -> serde_json::Value {
    let mut embed = json!({
        "title": announcement.title,
        "description": announcement.description,
        "color": 0x0058_65F2,
    });
    if let Some(image) = announcement.image_url.as_deref().filter(|u| !u.is_empty()) {
        embed["image"] = json!({ "url": image });
    }

    json!({
        "embeds": [embed],
        "components": [{
            "type": 1,
            "components": [{
                "type": 2,
                "style": 5,
                "label": announcement.link_label,
                "url": announcement.link_url,
            }]
        }]
    })
}
