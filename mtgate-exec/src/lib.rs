//! MTGate Execution Layer
//!
//! Session lifecycle and order orchestration against a trading terminal.
//!
//! # Architecture
//!
//! ```text
//! Request → Session Manager (auth gate) → [Trade Validator] → Venue Port → Result
//! ```
//!
//! # Components
//!
//! - **Ports**: `VenuePort` trait and the terminal wire types
//! - **Session**: single process-wide session, owner of the venue handle
//! - **Gateway**: open a trade, bulk-close all positions
//! - **Positions**: read open positions
//! - **Stub**: in-memory venue for tests and development
//!
//! # Example
//!
//! ```rust,ignore
//! use mtgate_exec::{OrderGateway, SessionManager, StubVenue};
//! use std::sync::Arc;
//!
//! let venue = Arc::new(StubVenue::new());
//! let session = Arc::new(SessionManager::new(venue));
//! session.login(login_request).await?;
//!
//! let gateway = OrderGateway::new(session.clone());
//! let receipt = gateway.open_trade(trade_request).await?;
//! ```

#![warn(clippy::all)]

pub mod error;
pub mod gateway;
pub mod ports;
pub mod positions;
pub mod session;
pub mod stub;

// Re-exports for convenience
pub use error::{ExecError, ExecResult};
pub use gateway::OrderGateway;
pub use ports::{
    OrderFilling, OrderRequest, OrderTime, SymbolInfo, Tick, TradeAction, TradeResult, VenueFault,
    VenuePort, VenuePosition,
};
pub use positions::PositionReader;
pub use session::{AuthenticatedSession, SessionManager, SessionStatus};
pub use stub::{StubOp, StubVenue};
