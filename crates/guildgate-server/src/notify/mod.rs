//! Verification notifications to an external log channel.
//!
//! One record per completed callback, delivered to a chat webhook. Delivery
//! is fire-and-forget: failures are logged and never reach the user.

mod webhook;

pub use webhook::{VerificationRecord, WebhookNotifier};

/// Errors that can occur delivering a notification.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Invalid webhook URL: {0}")]
    InvalidUrl(String),

    #[error("Webhook request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Webhook rejected notification (status {status}): {body}")]
    Rejected { status: u16, body: String },
}
