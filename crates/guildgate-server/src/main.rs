//! guildgate server
//!
//! OAuth2 verification relay: serves the consent redirect and callback,
//! stores verified identities, and exposes operator replay tools.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use guildgate_core::config::{default_database_path, load_config};
use guildgate_core::tracing_init::init_tracing;
use guildgate_crypto::TokenCipher;
use guildgate_server::server::{AppState, build_router, hash_password};
use guildgate_server::storage::{CredentialStore, IdentityDatabase};

#[derive(Parser, Debug)]
#[command(name = "guildgate")]
#[command(version, about = "guildgate - OAuth2 verification relay and member replay")]
struct Args {
    /// JSON settings file.
    #[arg(long, env = "GUILDGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on (overrides the settings file).
    #[arg(long)]
    addr: Option<SocketAddr>,

    /// Path to SQLite database file.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print an argon2id hash for GUILDGATE_ADMIN_PASSWORD_HASH.
    HashPassword {
        /// Operator password to hash.
        password: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if let Some(Command::HashPassword { password }) = &args.command {
        let hash = hash_password(password).map_err(|e| anyhow::anyhow!("hashing failed: {e}"))?;
        print_line(&hash);
        return Ok(());
    }

    let mut config = load_config(args.config.as_deref())?;
    if let Some(addr) = args.addr {
        config.server.listen_addr = addr.to_string();
    }
    if let Some(path) = args.db_path {
        config.server.database_path = Some(path);
    }
    config.server.log_json |= args.log_json;

    init_tracing("guildgate_server=info", config.server.log_json);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.server.listen_addr,
        "Starting guildgate"
    );

    let db_path = match &config.server.database_path {
        Some(path) => path.clone(),
        None => default_database_path().context("Cannot determine home directory")?,
    };
    info!(path = %db_path.display(), "Opening identity database");
    let db = IdentityDatabase::open(&db_path).await?;

    let cipher = TokenCipher::from_secret(config.server.token_key.as_bytes())
        .context("GUILDGATE_TOKEN_KEY must be set to a non-empty secret")?;
    let store = CredentialStore::new(db, cipher);

    let state = AppState::from_config(&config, store)?;
    if !state.operator().is_enabled() {
        info!("No operator password hash configured; /painel and /migrate are disabled");
    }

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&config.server.listen_addr)
        .await
        .with_context(|| format!("Binding {}", config.server.listen_addr))?;
    info!(addr = %config.server.listen_addr, "Listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Received Ctrl+C, shutting down");
    })
    .await?;

    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_line(line: &str) {
    println!("{line}");
}
