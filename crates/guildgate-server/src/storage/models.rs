//! Data models for identity storage.

use std::fmt;

/// One row of `verified_users`. Token columns hold sealed values.
#[derive(Clone, sqlx::FromRow)]
pub struct VerifiedIdentity {
    pub identity_id: String,
    pub display_name: String,
    pub source_ip: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_ttl_seconds: Option<i64>,
    pub granted_scopes: Option<String>,
    pub origin_community_id: String,
    /// Unix milliseconds of the last upsert.
    pub verified_at: i64,
}

impl fmt::Debug for VerifiedIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifiedIdentity")
            .field("identity_id", &self.identity_id)
            .field("display_name", &self.display_name)
            .field("source_ip", &self.source_ip)
            .field("token_ttl_seconds", &self.token_ttl_seconds)
            .field("granted_scopes", &self.granted_scopes)
            .field("origin_community_id", &self.origin_community_id)
            .field("verified_at", &self.verified_at)
            .finish_non_exhaustive()
    }
}

/// Identity captured by a callback, with plaintext tokens.
#[derive(Clone)]
pub struct NewIdentity {
    pub identity_id: String,
    pub display_name: String,
    pub source_ip: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_ttl_seconds: Option<i64>,
    pub granted_scopes: Option<String>,
    pub origin_community_id: String,
}

impl fmt::Debug for NewIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewIdentity")
            .field("identity_id", &self.identity_id)
            .field("display_name", &self.display_name)
            .field("origin_community_id", &self.origin_community_id)
            .finish_non_exhaustive()
    }
}

/// Projection used by the sweep: who, and the sealed token to replay.
#[derive(Clone, sqlx::FromRow)]
pub struct StoredCredential {
    pub identity_id: String,
    pub display_name: String,
    pub access_token: String,
}

impl fmt::Debug for StoredCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredCredential")
            .field("identity_id", &self.identity_id)
            .field("display_name", &self.display_name)
            .finish_non_exhaustive()
    }
}
