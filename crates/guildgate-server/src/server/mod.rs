//! HTTP surface: the public verification flow and the operator pages.

pub mod admin;
mod client_addr;
pub mod routes;
pub mod views;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::middleware;
use axum::routing::get;
use guildgate_core::Config;
use thiserror::Error;
use tower_http::trace::TraceLayer;

pub use admin::{OperatorAuth, hash_password, verify_password};
pub use client_addr::ClientAddr;

use crate::notify::{NotifyError, WebhookNotifier};
use crate::platform::{PlatformClient, PlatformError};
use crate::storage::CredentialStore;
use crate::sync::{FixedPacer, SyncEngine};
use crate::verify::Verifier;

/// Failures building the application state.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Platform client: {0}")]
    Platform(#[from] PlatformError),

    #[error("Notifier: {0}")]
    Notify(#[from] NotifyError),
}

/// Shared application state.
#[derive(Clone, Debug)]
pub struct AppState {
    sync: Arc<SyncEngine>,
    verifier: Arc<Verifier>,
    operator: OperatorAuth,
    public_url: Arc<str>,
}

impl AppState {
    /// Wire clients, engine and verifier from `config` around `store`.
    pub fn from_config(config: &Config, store: CredentialStore) -> Result<Self, StartupError> {
        let platform = PlatformClient::new(&config.platform)?;
        let notifier = WebhookNotifier::new(
            &config.notifications,
            Duration::from_millis(config.platform.request_timeout_ms),
        )?;

        let sync = Arc::new(SyncEngine::new(
            store,
            platform,
            FixedPacer::from_millis(config.sync.replay_delay_ms),
            FixedPacer::from_millis(config.sync.sweep_delay_ms),
            config.sync.assign_role_on_replay,
        ));
        let verifier = Arc::new(Verifier::new(
            Arc::clone(&sync),
            notifier,
            config.sync.sweep_on_verify,
        ));

        Ok(Self {
            sync,
            verifier,
            operator: OperatorAuth::new(
                &config.server.admin_username,
                config.server.admin_password_hash.as_deref(),
            ),
            public_url: Arc::from(config.server.public_url.as_str()),
        })
    }

    pub fn sync(&self) -> &SyncEngine {
        &self.sync
    }

    pub fn verifier(&self) -> &Verifier {
        &self.verifier
    }

    pub fn platform(&self) -> &PlatformClient {
        self.sync.platform()
    }

    pub const fn operator(&self) -> &OperatorAuth {
        &self.operator
    }

    pub fn public_url(&self) -> &str {
        &self.public_url
    }
}

/// All routes with request tracing.
pub fn build_router(state: AppState) -> Router {
    let operator = Router::new()
        .route("/painel", get(routes::panel_form).post(routes::post_panel))
        .route("/migrate", get(routes::migrate_form).post(routes::run_migration))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            admin::require_operator,
        ));

    Router::new()
        .route("/", get(routes::status))
        .route("/ping", get(routes::ping))
        .route("/auth", get(routes::auth))
        .route("/callback", get(routes::callback))
        .merge(operator)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
