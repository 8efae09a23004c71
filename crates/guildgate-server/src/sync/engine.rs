//! Replay and sweep loops.
//!
//! Every identity is attempted exactly once, sequentially, with the pacer
//! waiting between consecutive attempts. A failing identity is recorded in
//! the report and the loop moves on; only setup failures (store unreachable,
//! community listing refused) abort a run.

use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use super::pacing::{FixedPacer, Pacer};
use super::report::{Failure, OutcomeResult, SyncOutcome, SyncReport};
use crate::platform::{PlatformClient, PlatformError};
use crate::storage::{CredentialStore, DatabaseError};

/// Failures that prevent a run from starting.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Storage error: {0}")]
    Store(DatabaseError),

    #[error("Identifier {identifier:?} matches {matches} identities")]
    Ambiguous { identifier: String, matches: usize },

    #[error("Listing communities failed: {0}")]
    Platform(#[from] PlatformError),
}

impl From<DatabaseError> for SyncError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::Ambiguous {
                identifier,
                matches,
            } => Self::Ambiguous {
                identifier,
                matches,
            },
            other => Self::Store(other),
        }
    }
}

/// Role lookup for a replay target, resolved on first successful join.
enum RoleSlot {
    Unresolved,
    Resolved(Option<String>),
}

/// Re-joins stored identities to communities.
pub struct SyncEngine<P: Pacer = FixedPacer> {
    store: CredentialStore,
    platform: PlatformClient,
    replay_pacer: P,
    sweep_pacer: P,
    assign_role_on_replay: bool,
    sweeping: AtomicBool,
}

impl<P: Pacer> std::fmt::Debug for SyncEngine<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("assign_role_on_replay", &self.assign_role_on_replay)
            .field("sweeping", &self.sweeping.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// Clears the single-flight flag when a sweep ends, including on panic.
struct SweepGuard<'a>(&'a AtomicBool);

impl Drop for SweepGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<P: Pacer> SyncEngine<P> {
    pub const fn new(
        store: CredentialStore,
        platform: PlatformClient,
        replay_pacer: P,
        sweep_pacer: P,
        assign_role_on_replay: bool,
    ) -> Self {
        Self {
            store,
            platform,
            replay_pacer,
            sweep_pacer,
            assign_role_on_replay,
            sweeping: AtomicBool::new(false),
        }
    }

    pub const fn store(&self) -> &CredentialStore {
        &self.store
    }

    pub const fn platform(&self) -> &PlatformClient {
        &self.platform
    }

    /// Re-join the identity matching `identifier` (id first, then display
    /// name) to `community_id`. An unknown identifier makes no platform call.
    #[instrument(skip(self))]
    pub async fn replay_one(
        &self,
        identifier: &str,
        community_id: &str,
    ) -> Result<SyncReport, SyncError> {
        let Some(identity) = self.store.find_by_id_or_name(identifier).await? else {
            info!(identifier, "Replay target not found");
            return Ok(SyncReport::not_found(identifier));
        };

        let mut role = RoleSlot::Unresolved;
        let mut report = SyncReport::default();
        report.push(
            self.replay_identity(
                &identity.identity_id,
                &identity.display_name,
                &identity.access_token,
                community_id,
                &mut role,
            )
            .await,
        );
        info!(succeeded = report.succeeded(), "Targeted replay finished");
        Ok(report)
    }

    /// Re-join up to `count` randomly chosen identities to `community_id`.
    #[instrument(skip(self))]
    pub async fn replay_many(
        &self,
        count: u32,
        community_id: &str,
    ) -> Result<SyncReport, SyncError> {
        let identities = self.store.sample(count).await?;
        let mut role = RoleSlot::Unresolved;
        let mut report = SyncReport::default();

        for (i, identity) in identities.iter().enumerate() {
            if i > 0 {
                self.replay_pacer.pause().await;
            }
            report.push(
                self.replay_identity(
                    &identity.identity_id,
                    &identity.display_name,
                    &identity.access_token,
                    community_id,
                    &mut role,
                )
                .await,
            );
        }

        info!(
            succeeded = report.succeeded(),
            total = report.total(),
            "Bulk replay finished"
        );
        Ok(report)
    }

    /// Re-join every stored identity to every community the service is in,
    /// assigning the verified role after each successful join.
    #[instrument(skip(self))]
    pub async fn sweep(&self) -> Result<SyncReport, SyncError> {
        let communities = self.platform.list_present_communities().await?;
        let credentials = self.store.all().await?;
        let mut report = SyncReport::default();
        let mut first = true;

        for community_id in &communities {
            let role_id = self.platform.ensure_role(community_id).await;
            if role_id.is_none() {
                warn!(community_id, "No verified role available, joining without it");
            }

            for credential in &credentials {
                if !first {
                    self.sweep_pacer.pause().await;
                }
                first = false;

                let mut outcome = self
                    .attempt(
                        &credential.identity_id,
                        &credential.display_name,
                        &credential.access_token,
                        community_id,
                    )
                    .await;
                if outcome.result.is_success()
                    && let Some(role_id) = role_id.as_deref()
                {
                    outcome.role_assigned = Some(
                        self.platform
                            .assign_role(&credential.identity_id, role_id, community_id)
                            .await,
                    );
                }
                report.push(outcome);
            }
        }

        info!(
            communities = communities.len(),
            identities = credentials.len(),
            succeeded = report.succeeded(),
            total = report.total(),
            "Sweep finished"
        );
        Ok(report)
    }

    /// Run [`sweep`](Self::sweep) unless one is already in flight.
    ///
    /// Returns `None` when skipped.
    pub async fn sweep_exclusive(&self) -> Option<Result<SyncReport, SyncError>> {
        if self
            .sweeping
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Sweep already running, skipping");
            return None;
        }
        let _guard = SweepGuard(&self.sweeping);
        Some(self.sweep().await)
    }

    async fn replay_identity(
        &self,
        identity_id: &str,
        display_name: &str,
        sealed_token: &str,
        community_id: &str,
        role: &mut RoleSlot,
    ) -> SyncOutcome {
        let mut outcome = self
            .attempt(identity_id, display_name, sealed_token, community_id)
            .await;
        if !self.assign_role_on_replay || !outcome.result.is_success() {
            return outcome;
        }

        if let RoleSlot::Unresolved = role {
            *role = RoleSlot::Resolved(self.platform.ensure_role(community_id).await);
        }
        if let RoleSlot::Resolved(Some(role_id)) = role {
            outcome.role_assigned = Some(
                self.platform
                    .assign_role(identity_id, role_id, community_id)
                    .await,
            );
        }
        outcome
    }

    /// One join attempt. Never fails: every problem becomes the outcome.
    async fn attempt(
        &self,
        identity_id: &str,
        display_name: &str,
        sealed_token: &str,
        community_id: &str,
    ) -> SyncOutcome {
        let result = match self.store.reveal(sealed_token) {
            Err(e) => {
                warn!(identity_id, error = %e, "Stored token unreadable");
                OutcomeResult::Failed(Failure::TokenUnreadable)
            }
            Ok(token) => match self
                .platform
                .join_community(identity_id, &token, community_id)
                .await
            {
                Ok(join) => OutcomeResult::from(join),
                Err(e) => {
                    warn!(identity_id, community_id, error = %e, "Join request failed");
                    OutcomeResult::Failed(Failure::Transport(e.to_string()))
                }
            },
        };

        SyncOutcome {
            identity_id: identity_id.to_string(),
            display_name: display_name.to_string(),
            target_community_id: community_id.to_string(),
            result,
            role_assigned: None,
        }
    }
}
