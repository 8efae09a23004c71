//! Database queries for the identity store.
//!
//! These take and return token columns exactly as stored; sealing happens in
//! [`super::CredentialStore`].

use guildgate_core::db::unix_timestamp_millis;

use super::db::IdentityDatabase;
use super::models::{StoredCredential, VerifiedIdentity};
use guildgate_core::db::DatabaseError;

/// Column values for an upsert, tokens already sealed.
pub(super) struct IdentityRow<'a> {
    pub identity_id: &'a str,
    pub display_name: &'a str,
    pub source_ip: &'a str,
    pub access_token: &'a str,
    pub refresh_token: Option<&'a str>,
    pub token_ttl_seconds: Option<i64>,
    pub granted_scopes: Option<&'a str>,
    pub origin_community_id: &'a str,
}

impl IdentityDatabase {
    /// Insert or overwrite the row for `row.identity_id` in one statement.
    ///
    /// `verified_at` never moves backwards and strictly increases on every
    /// overwrite, even when two upserts share a millisecond.
    pub(super) async fn upsert_identity(
        &self,
        row: &IdentityRow<'_>,
    ) -> Result<VerifiedIdentity, DatabaseError> {
        let now = unix_timestamp_millis();

        sqlx::query(
            "INSERT INTO verified_users (identity_id, display_name, source_ip, access_token, \
             refresh_token, token_ttl_seconds, granted_scopes, origin_community_id, verified_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(identity_id) DO UPDATE SET \
             display_name = excluded.display_name, \
             source_ip = excluded.source_ip, \
             access_token = excluded.access_token, \
             refresh_token = excluded.refresh_token, \
             token_ttl_seconds = excluded.token_ttl_seconds, \
             granted_scopes = excluded.granted_scopes, \
             origin_community_id = excluded.origin_community_id, \
             verified_at = MAX(excluded.verified_at, verified_users.verified_at + 1)",
        )
        .bind(row.identity_id)
        .bind(row.display_name)
        .bind(row.source_ip)
        .bind(row.access_token)
        .bind(row.refresh_token)
        .bind(row.token_ttl_seconds)
        .bind(row.granted_scopes)
        .bind(row.origin_community_id)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_identity(row.identity_id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Identity {}", row.identity_id)))
    }

    /// Get an identity by its platform ID.
    pub async fn get_identity(
        &self,
        identity_id: &str,
    ) -> Result<Option<VerifiedIdentity>, DatabaseError> {
        let identity = sqlx::query_as::<_, VerifiedIdentity>(
            "SELECT * FROM verified_users WHERE identity_id = ?",
        )
        .bind(identity_id)
        .fetch_optional(self.pool())
        .await?;

        Ok(identity)
    }

    /// Resolve an identifier that is either an identity ID or a display name.
    ///
    /// An ID match wins outright. Otherwise the display name must match
    /// exactly one row; several matches are reported as
    /// [`DatabaseError::Ambiguous`].
    pub async fn find_by_id_or_name(
        &self,
        identifier: &str,
    ) -> Result<Option<VerifiedIdentity>, DatabaseError> {
        if let Some(identity) = self.get_identity(identifier).await? {
            return Ok(Some(identity));
        }

        let mut by_name = sqlx::query_as::<_, VerifiedIdentity>(
            "SELECT * FROM verified_users WHERE display_name = ? ORDER BY verified_at DESC",
        )
        .bind(identifier)
        .fetch_all(self.pool())
        .await?;

        match by_name.len() {
            0 => Ok(None),
            1 => Ok(by_name.pop()),
            matches => Err(DatabaseError::Ambiguous {
                identifier: identifier.to_string(),
                matches,
            }),
        }
    }

    /// Up to `n` identities drawn at random without replacement.
    pub async fn sample_identities(&self, n: u32) -> Result<Vec<VerifiedIdentity>, DatabaseError> {
        let rows = sqlx::query_as::<_, VerifiedIdentity>(
            "SELECT * FROM verified_users ORDER BY RANDOM() LIMIT ?",
        )
        .bind(i64::from(n))
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }

    /// Every stored credential, oldest verification first.
    pub async fn all_credentials(&self) -> Result<Vec<StoredCredential>, DatabaseError> {
        let rows = sqlx::query_as::<_, StoredCredential>(
            "SELECT identity_id, display_name, access_token FROM verified_users \
             ORDER BY verified_at ASC",
        )
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }

    /// Number of stored identities.
    pub async fn count_identities(&self) -> Result<i64, DatabaseError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM verified_users")
            .fetch_one(self.pool())
            .await?;

        Ok(count)
    }
}
