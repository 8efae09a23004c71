//! Configuration resolution for guildgate.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Settings file (JSON, optional)
//! 3. Environment variables (`GUILDGATE_*`)
//! 4. CLI arguments (applied by the binary, highest priority)
//!
//! Secrets (client secret, bot token, token sealing key, operator password
//! hash) are never read from the settings file; they only come from the
//! environment.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Complete guildgate configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub platform: PlatformConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
}

/// HTTP server configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Externally reachable base URL, used for the call-to-action link in
    /// announcements (e.g. `https://verify.example.com`).
    pub public_url: String,
    pub database_path: Option<PathBuf>,
    pub log_json: bool,
    /// Username expected in operator Basic credentials.
    pub admin_username: String,
    /// argon2id PHC string for the operator password. Operator routes are
    /// disabled while this is unset.
    #[serde(skip)]
    pub admin_password_hash: Option<String>,
    /// Secret the token sealing key is derived from.
    #[serde(skip)]
    pub token_key: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            public_url: "http://localhost:8080".to_string(),
            database_path: None,
            log_json: false,
            admin_username: "admin".to_string(),
            admin_password_hash: None,
            token_key: String::new(),
        }
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("listen_addr", &self.listen_addr)
            .field("public_url", &self.public_url)
            .field("database_path", &self.database_path)
            .field("log_json", &self.log_json)
            .field("admin_username", &self.admin_username)
            .field("admin_password_hash", &redacted(self.admin_password_hash.as_deref()))
            .field("token_key", &redacted(Some(&self.token_key)))
            .finish()
    }
}

/// Chat platform (OAuth2 + REST) configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// REST API base, without trailing slash.
    pub api_base: String,
    /// Browser-facing OAuth2 authorize endpoint.
    pub authorize_url: String,
    pub client_id: String,
    pub redirect_uri: String,
    /// Space-delimited scopes requested at authorization.
    pub scopes: String,
    /// Per-request timeout for every platform call.
    pub request_timeout_ms: u64,
    /// Name of the role converged by callbacks and sweeps.
    pub verified_role_name: String,
    #[serde(skip)]
    pub client_secret: String,
    #[serde(skip)]
    pub bot_token: String,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            api_base: "https://discord.com/api/v10".to_string(),
            authorize_url: "https://discord.com/oauth2/authorize".to_string(),
            client_id: String::new(),
            redirect_uri: "http://localhost:8080/callback".to_string(),
            scopes: "identify guilds.join".to_string(),
            request_timeout_ms: 10_000,
            verified_role_name: "Verified".to_string(),
            client_secret: String::new(),
            bot_token: String::new(),
        }
    }
}

impl fmt::Debug for PlatformConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformConfig")
            .field("api_base", &self.api_base)
            .field("authorize_url", &self.authorize_url)
            .field("client_id", &self.client_id)
            .field("redirect_uri", &self.redirect_uri)
            .field("scopes", &self.scopes)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("verified_role_name", &self.verified_role_name)
            .field("client_secret", &redacted(Some(&self.client_secret)))
            .field("bot_token", &redacted(Some(&self.bot_token)))
            .finish()
    }
}

/// Replay and sweep pacing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Pause between identities during targeted and bulk replay.
    pub replay_delay_ms: u64,
    /// Pause between identities during the full sweep.
    pub sweep_delay_ms: u64,
    /// Start a full sweep after every successful verification.
    pub sweep_on_verify: bool,
    /// Converge the verified role after a successful replay join.
    pub assign_role_on_replay: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            replay_delay_ms: 500,
            sweep_delay_ms: 150,
            sweep_on_verify: true,
            assign_role_on_replay: true,
        }
    }
}

/// Operator notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct NotificationConfig {
    /// Webhook receiving one record per verification. Disabled when unset.
    pub webhook_url: Option<String>,
}

fn redacted(value: Option<&str>) -> &'static str {
    match value {
        Some(v) if !v.is_empty() => "<redacted>",
        _ => "<unset>",
    }
}

/// Load configuration: defaults, then `path` when given and present, then
/// environment overrides.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = match path {
        Some(p) if p.exists() => load_config_file(p)?,
        Some(p) => {
            return Err(Error::Config(format!(
                "Config file {} does not exist",
                p.display()
            )));
        }
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    config.validate()?;

    Ok(config)
}

/// Default database location: `~/.guildgate/guildgate.db`.
pub fn default_database_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".guildgate").join("guildgate.db"))
}

impl Config {
    /// Check values that would make the service misbehave at runtime.
    pub fn validate(&self) -> Result<()> {
        if self.platform.api_base.trim().is_empty() {
            return Err(Error::Config("platform.api_base is empty".into()));
        }
        if self.platform.request_timeout_ms == 0 {
            return Err(Error::Config(
                "platform.request_timeout_ms must be positive".into(),
            ));
        }
        if self.platform.verified_role_name.trim().is_empty() {
            return Err(Error::Config(
                "platform.verified_role_name is empty".into(),
            ));
        }
        Ok(())
    }
}

fn load_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

/// Apply `GUILDGATE_*` overrides using `lookup` to read variables.
fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(val) = lookup("GUILDGATE_LISTEN_ADDR") {
        config.server.listen_addr = val;
    }
    if let Some(val) = lookup("GUILDGATE_PUBLIC_URL") {
        config.server.public_url = val;
    }
    if let Some(val) = lookup("GUILDGATE_DB_PATH") {
        config.server.database_path = Some(PathBuf::from(val));
    }
    if let Some(val) = lookup("GUILDGATE_ADMIN_USER") {
        config.server.admin_username = val;
    }
    if let Some(val) = lookup("GUILDGATE_ADMIN_PASSWORD_HASH") {
        config.server.admin_password_hash = Some(val);
    }
    if let Some(val) = lookup("GUILDGATE_TOKEN_KEY") {
        config.server.token_key = val;
    }
    if let Some(val) = lookup("GUILDGATE_API_BASE") {
        config.platform.api_base = val;
    }
    if let Some(val) = lookup("GUILDGATE_CLIENT_ID") {
        config.platform.client_id = val;
    }
    if let Some(val) = lookup("GUILDGATE_CLIENT_SECRET") {
        config.platform.client_secret = val;
    }
    if let Some(val) = lookup("GUILDGATE_BOT_TOKEN") {
        config.platform.bot_token = val;
    }
    if let Some(val) = lookup("GUILDGATE_REDIRECT_URI") {
        config.platform.redirect_uri = val;
    }
    if let Some(val) = lookup("GUILDGATE_ROLE_NAME") {
        config.platform.verified_role_name = val;
    }
    if let Some(val) = lookup("GUILDGATE_WEBHOOK_URL") {
        config.notifications.webhook_url = Some(val);
    }
    if let Some(n) = lookup("GUILDGATE_REPLAY_DELAY_MS").and_then(|v| v.parse().ok()) {
        config.sync.replay_delay_ms = n;
    }
    if let Some(n) = lookup("GUILDGATE_SWEEP_DELAY_MS").and_then(|v| v.parse().ok()) {
        config.sync.sweep_delay_ms = n;
    }
    if let Some(b) = lookup("GUILDGATE_SWEEP_ON_VERIFY").and_then(|v| v.parse().ok()) {
        config.sync.sweep_on_verify = b;
    }
}
