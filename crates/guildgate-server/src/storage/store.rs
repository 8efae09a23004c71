//! Credential store: the identity database plus token sealing.

use guildgate_core::db::DatabaseError;
use guildgate_crypto::TokenCipher;
use tracing::debug;

use super::db::IdentityDatabase;
use super::models::{NewIdentity, StoredCredential, VerifiedIdentity};
use super::queries::IdentityRow;

/// Persistence for verified identities and their sealed tokens.
#[derive(Clone, Debug)]
pub struct CredentialStore {
    db: IdentityDatabase,
    cipher: TokenCipher,
}

impl CredentialStore {
    pub const fn new(db: IdentityDatabase, cipher: TokenCipher) -> Self {
        Self { db, cipher }
    }

    pub const fn database(&self) -> &IdentityDatabase {
        &self.db
    }

    /// Insert or overwrite `identity` (last write wins), sealing its tokens.
    pub async fn upsert(&self, identity: &NewIdentity) -> Result<VerifiedIdentity, DatabaseError> {
        let access_token = self.seal(&identity.access_token)?;
        let refresh_token = identity
            .refresh_token
            .as_deref()
            .map(|t| self.seal(t))
            .transpose()?;

        let stored = self
            .db
            .upsert_identity(&IdentityRow {
                identity_id: &identity.identity_id,
                display_name: &identity.display_name,
                source_ip: &identity.source_ip,
                access_token: &access_token,
                refresh_token: refresh_token.as_deref(),
                token_ttl_seconds: identity.token_ttl_seconds,
                granted_scopes: identity.granted_scopes.as_deref(),
                origin_community_id: &identity.origin_community_id,
            })
            .await?;

        debug!(identity_id = %stored.identity_id, verified_at = stored.verified_at, "Identity upserted");
        Ok(stored)
    }

    pub async fn find_by_id_or_name(
        &self,
        identifier: &str,
    ) -> Result<Option<VerifiedIdentity>, DatabaseError> {
        self.db.find_by_id_or_name(identifier).await
    }

    pub async fn sample(&self, n: u32) -> Result<Vec<VerifiedIdentity>, DatabaseError> {
        self.db.sample_identities(n).await
    }

    pub async fn all(&self) -> Result<Vec<StoredCredential>, DatabaseError> {
        self.db.all_credentials().await
    }

    pub async fn count(&self) -> Result<i64, DatabaseError> {
        self.db.count_identities().await
    }

    /// Open a sealed token column value.
    pub fn reveal(&self, sealed: &str) -> Result<String, DatabaseError> {
        self.cipher
            .open(sealed)
            .map_err(|e| DatabaseError::Corrupt(format!("sealed token: {e}")))
    }

    fn seal(&self, token: &str) -> Result<String, DatabaseError> {
        self.cipher
            .seal(token)
            .map_err(|e| DatabaseError::Corrupt(format!("sealing token: {e}")))
    }
}
