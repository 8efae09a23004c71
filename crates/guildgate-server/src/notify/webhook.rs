//! Webhook sink for verification records.

use std::time::Duration;

use guildgate_core::config::NotificationConfig;
use reqwest::Url;
use serde_json::json;
use tracing::{debug, warn};

use super::NotifyError;

/// What a notification says about a verification. Carries no credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationRecord {
    pub identity_id: String,
    pub display_name: String,
    pub source_ip: String,
    pub granted_scopes: Option<String>,
    pub community_id: String,
}

/// Posts verification records to a webhook. Without a URL every send is a
/// no-op.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    http: reqwest::Client,
    url: Option<Url>,
}

impl WebhookNotifier {
    pub fn new(config: &NotificationConfig, timeout: Duration) -> Result<Self, NotifyError> {
        let url = match config.webhook_url.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(Url::parse(raw).map_err(|e| NotifyError::InvalidUrl(e.to_string()))?),
        };

        // Err means a provider is already installed.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, url })
    }

    /// A notifier that never sends.
    pub fn disabled() -> Self {
        Self {
            http: reqwest::Client::new(),
            url: None,
        }
    }

    pub const fn is_enabled(&self) -> bool {
        self.url.is_some()
    }

    /// Deliver `record` and wait for the webhook's answer.
    pub async fn send(&self, record: &VerificationRecord) -> Result<(), NotifyError> {
        let Some(url) = &self.url else {
            return Ok(());
        };

        let resp = self
            .http
            .post(url.clone())
            .json(&notification_payload(record))
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            debug!(identity_id = %record.identity_id, "Verification notification delivered");
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(NotifyError::Rejected {
            status: status.as_u16(),
            body: body.chars().take(300).collect(),
        })
    }

    /// Deliver `record` in the background; failures are only logged.
    pub fn spawn_send(&self, record: VerificationRecord) {
        if !self.is_enabled() {
            return;
        }
        let notifier = self.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.send(&record).await {
                warn!(identity_id = %record.identity_id, error = %e, "Verification notification failed");
            }
        });
    }
}

/// Webhook body: one embed with a field per record attribute.
pub(crate) fn notification_payload(record: &VerificationRecord) -> serde_json::Value {
    let scopes = record
        .granted_scopes
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or("-");

    json!({
        "embeds": [{
            "title": "New verification",
            "color": 0x0057_F287,
            "fields": [
                { "name": "User", "value": format!("{} ({})", record.display_name, record.identity_id), "inline": false },
                { "name": "Address", "value": record.source_ip, "inline": true },
                { "name": "Community", "value": record.community_id, "inline": true },
                { "name": "Scopes", "value": scopes, "inline": false },
            ]
        }]
    })
}
