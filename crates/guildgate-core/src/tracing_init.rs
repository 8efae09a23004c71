//! Tracing/logging initialization for the `guildgate` binary.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Filter directives appended to every default filter so request spans from
/// the HTTP layer show up alongside application events.
const HTTP_LAYER_DIRECTIVE: &str = "tower_http=info";

/// Build the env filter: `RUST_LOG` when set, otherwise `default_filter`
/// plus the HTTP layer directive.
pub fn build_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{default_filter},{HTTP_LAYER_DIRECTIVE}")))
}

/// Initialise the global tracing subscriber.
///
/// * `default_filter` -- filter used when `RUST_LOG` is not set
///   (e.g. `"guildgate_server=info"`).
/// * `log_json` -- emit flattened JSON lines for log aggregation instead of
///   the human-readable format.
///
/// Calling this twice is harmless; the second call is ignored.
pub fn init_tracing(default_filter: &str, log_json: bool) {
    let registry = tracing_subscriber::registry().with(build_filter(default_filter));
    let result = if log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json().flatten_event(true))
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .try_init()
    };
    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
