//! Chat platform API types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Response of the OAuth2 token endpoint.
#[derive(Clone, Deserialize)]
pub struct TokenGrant {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenGrant")
            .field("has_access_token", &self.access_token.is_some())
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .finish()
    }
}

/// The account behind an access token (`GET /users/@me`).
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformUser {
    pub id: String,
    pub username: String,
}

/// A community role.
#[derive(Debug, Clone, Deserialize)]
pub struct Role {
    pub id: String,
    pub name: String,
}

/// A community as listed for the service identity.
#[derive(Debug, Clone, Deserialize)]
pub struct PartialCommunity {
    pub id: String,
}

/// Body for creating the verified role: no permissions, not hoisted,
/// not mentionable.
#[derive(Debug, Serialize)]
pub struct CreateRole<'a> {
    pub name: &'a str,
    pub permissions: &'a str,
    pub hoist: bool,
    pub mentionable: bool,
}

impl<'a> CreateRole<'a> {
    pub const fn inert(name: &'a str) -> Self {
        Self {
            name,
            permissions: "0",
            hoist: false,
            mentionable: false,
        }
    }
}

/// Outcome of adding a member to a community with their own token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinResult {
    /// 201: the member was added.
    Joined,
    /// 204: the member was already present.
    AlreadyMember,
    /// 403: the service lacks permission in the community.
    Forbidden,
    /// Any other status.
    Unknown(u16),
}

impl JoinResult {
    pub const fn from_status(status: u16) -> Self {
        match status {
            201 => Self::Joined,
            204 => Self::AlreadyMember,
            403 => Self::Forbidden,
            other => Self::Unknown(other),
        }
    }

    pub const fn is_success(self) -> bool {
        matches!(self, Self::Joined | Self::AlreadyMember)
    }

    pub const fn status(self) -> u16 {
        match self {
            Self::Joined => 201,
            Self::AlreadyMember => 204,
            Self::Forbidden => 403,
            Self::Unknown(code) => code,
        }
    }
}

/// Operator announcement with a call-to-action link.
#[derive(Debug, Clone)]
pub struct Announcement {
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    /// Target of the link button (the `/auth` entry point).
    pub link_url: String,
    pub link_label: String,
}
