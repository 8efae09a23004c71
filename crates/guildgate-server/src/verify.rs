//! The verification callback pipeline.
//!
//! code -> token grant -> identity -> store -> notify -> join and role ->
//! optional sweep. Only the first two steps can fail the request; once the
//! identity is known every later problem is logged and the member still
//! sees success.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderMap;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::notify::{VerificationRecord, WebhookNotifier};
use crate::platform::PlatformError;
use crate::storage::NewIdentity;
use crate::sync::{FixedPacer, Pacer, SyncEngine};

/// Header set by reverse proxies with the originating client first.
const FORWARDED_FOR: &str = "x-forwarded-for";

/// Failures that abort a callback before anything is stored.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("Missing authorization code")]
    MissingCode,

    #[error("Missing target community")]
    MissingCommunity,

    #[error("Authorization failed: {0}")]
    Exchange(PlatformError),

    #[error("Could not read your account: {0}")]
    Identity(PlatformError),
}

/// Who was verified, for the success view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedMember {
    pub identity_id: String,
    pub display_name: String,
    pub community_id: String,
}

/// Runs the callback pipeline against the shared engine's store and client.
pub struct Verifier<P: Pacer = FixedPacer> {
    sync: Arc<SyncEngine<P>>,
    notifier: WebhookNotifier,
    sweep_on_verify: bool,
}

impl<P: Pacer> std::fmt::Debug for Verifier<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Verifier")
            .field("notifier_enabled", &self.notifier.is_enabled())
            .field("sweep_on_verify", &self.sweep_on_verify)
            .finish_non_exhaustive()
    }
}

impl<P: Pacer + 'static> Verifier<P> {
    pub const fn new(
        sync: Arc<SyncEngine<P>>,
        notifier: WebhookNotifier,
        sweep_on_verify: bool,
    ) -> Self {
        Self {
            sync,
            notifier,
            sweep_on_verify,
        }
    }

    #[instrument(skip(self, code))]
    pub async fn complete(
        &self,
        code: &str,
        community_id: &str,
        source_ip: &str,
    ) -> Result<VerifiedMember, VerifyError> {
        if code.is_empty() {
            return Err(VerifyError::MissingCode);
        }
        if community_id.is_empty() {
            return Err(VerifyError::MissingCommunity);
        }

        let platform = self.sync.platform();
        let grant = platform
            .exchange_code(code)
            .await
            .map_err(VerifyError::Exchange)?;
        let access_token = grant.access_token.clone().unwrap_or_default();
        let user = platform
            .fetch_identity(&access_token)
            .await
            .map_err(VerifyError::Identity)?;

        let identity = NewIdentity {
            identity_id: user.id.clone(),
            display_name: user.username.clone(),
            source_ip: source_ip.to_string(),
            access_token: access_token.clone(),
            refresh_token: grant.refresh_token.clone(),
            token_ttl_seconds: grant.expires_in,
            granted_scopes: grant.scope.clone(),
            origin_community_id: community_id.to_string(),
        };
        if let Err(e) = self.sync.store().upsert(&identity).await {
            warn!(identity_id = %user.id, error = %e, "Storing verified identity failed");
        }

        self.notifier.spawn_send(VerificationRecord {
            identity_id: user.id.clone(),
            display_name: user.username.clone(),
            source_ip: source_ip.to_string(),
            granted_scopes: grant.scope.clone(),
            community_id: community_id.to_string(),
        });

        self.join_target(&user.id, &access_token, community_id).await;

        if self.sweep_on_verify {
            self.spawn_sweep();
        }

        info!(identity_id = %user.id, "Verification completed");
        Ok(VerifiedMember {
            identity_id: user.id,
            display_name: user.username,
            community_id: community_id.to_string(),
        })
    }

    async fn join_target(&self, identity_id: &str, access_token: &str, community_id: &str) {
        let platform = self.sync.platform();
        match platform
            .join_community(identity_id, access_token, community_id)
            .await
        {
            Ok(result) if result.is_success() => {
                if let Some(role_id) = platform.ensure_role(community_id).await {
                    platform.assign_role(identity_id, &role_id, community_id).await;
                }
            }
            Ok(result) => {
                warn!(identity_id, community_id, status = result.status(), "Join rejected");
            }
            Err(e) => {
                warn!(identity_id, community_id, error = %e, "Join request failed");
            }
        }
    }

    /// Start a sweep in the background unless one is already running.
    fn spawn_sweep(&self) {
        let engine = Arc::clone(&self.sync);
        tokio::spawn(async move {
            match engine.sweep_exclusive().await {
                None => info!("Sweep already in progress, not starting another"),
                Some(Ok(report)) => info!(
                    succeeded = report.succeeded(),
                    total = report.total(),
                    "Background sweep finished"
                ),
                Some(Err(e)) => warn!(error = %e, "Background sweep failed"),
            }
        });
    }
}

/// Originating client address: first `X-Forwarded-For` entry, else the
/// peer address, else `unknown`.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get(FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    match (forwarded, peer) {
        (Some(ip), _) => ip.to_string(),
        (None, Some(addr)) => addr.ip().to_string(),
        (None, None) => "unknown".to_string(),
    }
}
