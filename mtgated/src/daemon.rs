//! Daemon: Main runtime orchestrator.
//!
//! The Daemon ties together:
//! - Venue adapter (stub or terminal bridge)
//! - Session Manager (single process-wide session)
//! - API Server (HTTP endpoints)
//!
//! # Lifecycle
//!
//! 1. Load configuration
//! 2. Build the venue adapter and session
//! 3. Start API server
//! 4. Wait for SIGINT
//! 5. Graceful shutdown (release the terminal connection)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::{error, info};

use mtgate_connectors::BridgeClient;
use mtgate_exec::{SessionManager, StubVenue, VenuePort};

use crate::api::{create_router, ApiState};
use crate::config::{Config, VenueKind};
use crate::error::{DaemonError, DaemonResult};

// =============================================================================
// Daemon
// =============================================================================

/// The main MTGate daemon.
pub struct Daemon<V: VenuePort + 'static> {
    /// Configuration
    config: Config,
    /// Session over the venue
    session: Arc<SessionManager<V>>,
}

impl Daemon<StubVenue> {
    /// Create a new daemon over an in-memory terminal (for testing/development).
    pub fn new_stub(config: Config) -> Self {
        let venue = StubVenue::new();
        for quote in &config.venue.stub_symbols {
            venue.set_symbol(&quote.symbol, quote.bid, quote.ask, quote.point);
        }

        Self::new(config, Arc::new(venue))
    }
}

impl Daemon<BridgeClient> {
    /// Create a new daemon talking to a terminal bridge.
    pub fn new_bridge(config: Config) -> DaemonResult<Self> {
        if config.venue.kind != VenueKind::Bridge {
            return Err(DaemonError::Config(format!(
                "Bridge daemon requested with MTGATE_VENUE={}",
                config.venue.kind
            )));
        }

        let mut client = BridgeClient::new(&config.venue.bridge_url)
            .with_timeout(Duration::from_secs(config.venue.bridge_timeout_secs));
        if let Some(token) = &config.venue.bridge_token {
            client = client.with_token(token);
        }

        Ok(Self::new(config, Arc::new(client)))
    }
}

impl<V: VenuePort + 'static> Daemon<V> {
    /// Create a new daemon over a provided venue.
    pub fn new(config: Config, venue: Arc<V>) -> Self {
        Self {
            config,
            session: Arc::new(SessionManager::new(venue)),
        }
    }

    /// Shared session handle.
    pub fn session(&self) -> Arc<SessionManager<V>> {
        self.session.clone()
    }

    /// Run the daemon.
    ///
    /// This method blocks until shutdown is requested (SIGINT).
    pub async fn run(self) -> DaemonResult<()> {
        info!(
            version = env!("CARGO_PKG_VERSION"),
            environment = %self.config.environment,
            venue = %self.config.venue.kind,
            "Starting MTGate daemon"
        );

        let api_addr = self.start_api_server().await?;
        info!(%api_addr, "API server started");

        tokio::signal::ctrl_c().await?;
        info!("Received shutdown signal");

        self.shutdown().await;

        Ok(())
    }

    /// Start the API server.
    pub async fn start_api_server(&self) -> DaemonResult<SocketAddr> {
        let state = Arc::new(ApiState::new(self.session.clone()));

        let router = create_router(state);
        let addr = format!("{}:{}", self.config.api.host, self.config.api.port);

        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            DaemonError::Config(format!("Failed to bind to {}: {}", addr, e))
        })?;

        let local_addr = listener.local_addr()?;

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                error!(error = %e, "API server error");
            }
        });

        Ok(local_addr)
    }

    /// Graceful shutdown.
    async fn shutdown(&self) {
        info!("Initiating graceful shutdown");
        self.session.shutdown().await;
        info!("Shutdown complete");
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::HealthResponse;
    use crate::config::Environment;
    use serde_json::json;

    #[tokio::test]
    async fn test_daemon_stub_creation() {
        let daemon = Daemon::new_stub(Config::test());

        let status = daemon.session().status().await;
        assert!(!status.logged_in);
    }

    #[test]
    fn test_bridge_requires_bridge_venue() {
        let config = Config::test();

        assert!(matches!(
            Daemon::new_bridge(config),
            Err(DaemonError::Config(_))
        ));
    }

    #[test]
    fn test_bridge_creation() {
        let mut config = Config::test();
        config.venue.kind = VenueKind::Bridge;
        config.venue.bridge_token = Some("secret".to_string());
        config.environment = Environment::Production;

        assert!(Daemon::new_bridge(config).is_ok());
    }

    #[tokio::test]
    async fn test_daemon_api_server_start() {
        let daemon = Daemon::new_stub(Config::test());

        let addr = daemon.start_api_server().await.unwrap();

        // Server should be running on a port
        assert!(addr.port() > 0);

        let client = reqwest::Client::new();
        let response = client
            .get(format!("http://{}/health", addr))
            .send()
            .await
            .unwrap();

        assert!(response.status().is_success());
        let health: HealthResponse = response.json().await.unwrap();
        assert_eq!(health.status, "healthy");
    }

    #[tokio::test]
    async fn test_stub_symbols_are_tradable_over_http() {
        let daemon = Daemon::new_stub(Config::test());
        let addr = daemon.start_api_server().await.unwrap();
        let client = reqwest::Client::new();

        let login = client
            .post(format!("http://{}/login", addr))
            .json(&json!({"login": 1001, "password": "pw", "server": "Demo"}))
            .send()
            .await
            .unwrap();
        assert_eq!(login.status(), 200);

        let trade = client
            .post(format!("http://{}/open_trade", addr))
            .json(&json!({
                "symbol": "EURUSD",
                "volume": 0.1,
                "take_profit": 100,
                "stop_loss": 50,
                "type": "BUY"
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(trade.status(), 200);

        daemon.shutdown().await;
        assert!(!daemon.session().status().await.logged_in);
    }
}
