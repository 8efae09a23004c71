use axum::Form;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use reqwest::Url;
use serde::Deserialize;
use tracing::{error, info, warn};

use super::AppState;
use super::client_addr::ClientAddr;
use super::views;
use crate::platform::{Announcement, PlatformError};
use crate::sync::SyncError;
use crate::verify::VerifyError;

fn plain(status: StatusCode, text: impl Into<String>) -> Response {
    let mut body = text.into();
    if !body.ends_with('\n') {
        body.push('\n');
    }
    (status, [("content-type", "text/plain; charset=utf-8")], body).into_response()
}

/// Trimmed, non-empty form or query value.
fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// `GET /`
pub async fn status() -> &'static str {
    views::STATUS_TEXT
}

/// `GET /ping`
pub async fn ping() -> &'static str {
    "pong"
}

#[derive(Debug, Deserialize)]
pub struct AuthParams {
    guild_id: Option<String>,
}

/// `GET /auth?guild_id=`: send the browser to the platform's consent page.
pub async fn auth(State(state): State<AppState>, Query(params): Query<AuthParams>) -> Response {
    let Some(guild_id) = present(params.guild_id.as_deref()) else {
        return plain(StatusCode::BAD_REQUEST, "Missing guild_id");
    };
    match state.platform().authorize_url(guild_id) {
        Ok(url) => Redirect::temporary(url.as_str()).into_response(),
        Err(e) => {
            error!(error = %e, "Building authorize URL failed");
            plain(StatusCode::INTERNAL_SERVER_ERROR, "Authorization is misconfigured")
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// `GET /callback?code=&state=`: complete a verification.
pub async fn callback(
    State(state): State<AppState>,
    ClientAddr(source_ip): ClientAddr,
    Query(params): Query<CallbackParams>,
) -> Response {
    if let Some(reason) = present(params.error.as_deref()) {
        info!(reason, "Authorization declined");
        return plain(StatusCode::BAD_REQUEST, "Authorization was cancelled");
    }

    let code = present(params.code.as_deref()).unwrap_or_default();
    let community = present(params.state.as_deref()).unwrap_or_default();
    match state.verifier().complete(code, community, &source_ip).await {
        Ok(member) => Html(views::success_page(&member)).into_response(),
        Err(e) => {
            warn!(error = %e, "Verification failed");
            plain(verify_status(&e), e.to_string())
        }
    }
}

const fn verify_status(e: &VerifyError) -> StatusCode {
    match e {
        VerifyError::MissingCode
        | VerifyError::MissingCommunity
        | VerifyError::Exchange(PlatformError::AuthExchange { .. }) => StatusCode::BAD_REQUEST,
        _ => StatusCode::BAD_GATEWAY,
    }
}

/// `GET /painel`
pub async fn panel_form() -> Html<String> {
    Html(views::panel_form())
}

#[derive(Debug, Deserialize)]
pub struct PanelForm {
    guild_id: Option<String>,
    channel_id: Option<String>,
    title: Option<String>,
    desc: Option<String>,
    image_url: Option<String>,
}

/// `POST /painel`: post the verification announcement to a channel.
pub async fn post_panel(State(state): State<AppState>, Form(form): Form<PanelForm>) -> Response {
    let (Some(guild_id), Some(channel_id), Some(title)) = (
        present(form.guild_id.as_deref()),
        present(form.channel_id.as_deref()),
        present(form.title.as_deref()),
    ) else {
        return plain(
            StatusCode::BAD_REQUEST,
            "guild_id, channel_id and title are required",
        );
    };

    let Some(link_url) = auth_link(state.public_url(), guild_id) else {
        error!(public_url = state.public_url(), "Building announcement link failed");
        return plain(StatusCode::INTERNAL_SERVER_ERROR, "Invalid public_url");
    };

    let announcement = Announcement {
        title: title.to_string(),
        description: form.desc.unwrap_or_default(),
        image_url: present(form.image_url.as_deref()).map(str::to_string),
        link_url,
        link_label: "Verify now".to_string(),
    };

    match state.platform().post_announcement(channel_id, &announcement).await {
        Ok(()) => {
            info!(guild_id, channel_id, "Announcement posted");
            plain(StatusCode::OK, "Announcement posted")
        }
        Err(e) => {
            warn!(guild_id, channel_id, error = %e, "Posting announcement failed");
            plain(StatusCode::BAD_GATEWAY, format!("Posting announcement failed: {e}"))
        }
    }
}

/// `{public_url}/auth?guild_id=<id>`
fn auth_link(public_url: &str, guild_id: &str) -> Option<String> {
    let base = format!("{}/auth", public_url.trim_end_matches('/'));
    Url::parse_with_params(&base, &[("guild_id", guild_id)])
        .ok()
        .map(String::from)
}

/// `GET /migrate`
pub async fn migrate_form(State(state): State<AppState>) -> Response {
    match state.sync().store().count().await {
        Ok(stored) => Html(views::migrate_form(stored)).into_response(),
        Err(e) => {
            error!(error = %e, "Counting identities failed");
            plain(StatusCode::INTERNAL_SERVER_ERROR, "Storage unavailable")
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MigrateForm {
    action_type: Option<String>,
    target_guild_id: Option<String>,
    identifier: Option<String>,
    amount: Option<String>,
}

/// `POST /migrate`: targeted or bulk replay, answered with a plain-text
/// report.
pub async fn run_migration(
    State(state): State<AppState>,
    Form(form): Form<MigrateForm>,
) -> Response {
    let Some(target) = present(form.target_guild_id.as_deref()) else {
        return plain(StatusCode::BAD_REQUEST, "target_guild_id is required");
    };

    let result = match present(form.action_type.as_deref()) {
        Some("single") => {
            let Some(identifier) = present(form.identifier.as_deref()) else {
                return plain(StatusCode::BAD_REQUEST, "identifier is required");
            };
            state.sync().replay_one(identifier, target).await
        }
        Some("mass") => {
            let amount = present(form.amount.as_deref()).and_then(|a| a.parse::<u32>().ok());
            let Some(amount) = amount.filter(|n| *n > 0) else {
                return plain(StatusCode::BAD_REQUEST, "amount must be a positive integer");
            };
            state.sync().replay_many(amount, target).await
        }
        _ => return plain(StatusCode::BAD_REQUEST, "action_type must be single or mass"),
    };

    match result {
        Ok(report) => plain(StatusCode::OK, report.render()),
        Err(e @ SyncError::Ambiguous { .. }) => plain(StatusCode::CONFLICT, e.to_string()),
        Err(e) => {
            error!(error = %e, "Replay could not start");
            plain(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn auth_link_encodes_guild() {
        assert_eq!(
            auth_link("https://verify.example.com/", "123").unwrap(),
            "https://verify.example.com/auth?guild_id=123"
        );
        assert_eq!(
            auth_link("https://verify.example.com", "a b&c").unwrap(),
            "https://verify.example.com/auth?guild_id=a+b%26c"
        );
        assert!(auth_link("not a url", "123").is_none());
    }

    #[test]
    fn blank_values_are_absent() {
        assert_eq!(present(Some("  ")), None);
        assert_eq!(present(Some(" x ")), Some("x"));
        assert_eq!(present(None), None);
    }

    #[test]
    fn rejected_code_is_a_client_error() {
        let e = VerifyError::Exchange(PlatformError::AuthExchange {
            status: 400,
            message: "invalid_grant".into(),
        });
        assert_eq!(verify_status(&e), StatusCode::BAD_REQUEST);
        let e = VerifyError::Identity(PlatformError::Api {
            status: 500,
            message: String::new(),
        });
        assert_eq!(verify_status(&e), StatusCode::BAD_GATEWAY);
    }
}
