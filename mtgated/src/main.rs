//! MTGate Daemon
//!
//! HTTP gateway for a trading terminal.
//!
//! # Usage
//!
//! ```bash
//! # Start against the in-memory terminal
//! cargo run -p mtgated
//!
//! # Start against a terminal bridge
//! MTGATE_VENUE=bridge MTGATE_BRIDGE_URL=http://10.0.0.5:8228 cargo run -p mtgated
//! ```
//!
//! # Environment Variables
//!
//! - `MTGATE_ENV`: Environment (test, development, production)
//! - `MTGATE_API_HOST`: API host (default: 0.0.0.0)
//! - `MTGATE_API_PORT`: API port (default: 5000)
//! - `MTGATE_VENUE`: Venue adapter (stub, bridge)
//! - `MTGATE_BRIDGE_URL`: Bridge URL (default: http://127.0.0.1:8228)
//! - `MTGATE_BRIDGE_TOKEN`: Bridge shared secret
//! - `MTGATE_BRIDGE_TIMEOUT_SECS`: Bridge request timeout (default: 10)
//! - `MTGATE_STUB_SYMBOLS`: Stub quotes, `SYMBOL:bid:ask:point,...`
//! - `MTGATE_LOG_JSON`: Emit JSON logs when `1`

use mtgated::config::log_filter;
use mtgated::{Config, Daemon, VenueKind};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    let filter = log_filter(EnvFilter::from_default_env())?;
    if config.log_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        api_host = %config.api.host,
        api_port = config.api.port,
        venue = %config.venue.kind,
        "MTGate Daemon"
    );

    // Create and run daemon
    match config.venue.kind {
        VenueKind::Stub => Daemon::new_stub(config).run().await?,
        VenueKind::Bridge => Daemon::new_bridge(config)?.run().await?,
    }

    Ok(())
}
