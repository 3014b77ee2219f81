//! MTGate Daemon Library
//!
//! HTTP gateway in front of a trading terminal.
//!
//! # Architecture
//!
//! ```text
//! Client → API Server → Session Manager → Order Gateway / Position Reader → Venue Port
//!                                                                   ↓
//!                                                      Stub venue | Terminal bridge
//! ```
//!
//! # Components
//!
//! - **Daemon**: Main runtime orchestrator
//! - **API**: HTTP endpoints (login, trading, logout, health)
//! - **Config**: Environment-based configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use mtgated::{Config, Daemon};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::from_env().expect("Failed to load config");
//!     let daemon = Daemon::new_stub(config);
//!     daemon.run().await.expect("Daemon error");
//! }
//! ```

#![warn(clippy::all)]

pub mod api;
pub mod config;
pub mod daemon;
pub mod error;

// Re-exports for convenience
pub use api::{create_router, ApiState};
pub use config::{ApiConfig, Config, Environment, VenueConfig, VenueKind};
pub use daemon::Daemon;
pub use error::{DaemonError, DaemonResult};
