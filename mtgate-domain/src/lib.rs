//! MTGate Domain Layer
//!
//! Pure domain logic with zero I/O dependencies.
//! Contains value objects, requests, venue records and the pre-trade
//! validator.

#![warn(missing_docs)]
#![warn(clippy::all)]

// Public modules
pub mod entities;
pub mod credentials;
pub mod request;
pub mod validator;
pub mod value_objects;

// Re-export commonly used types
pub use credentials::{AccountId, Credential, LoginRequest};
pub use entities::{
    ComputedOrder, OpenPositions, OrderOutcome, OrderReceipt, OutcomeStatus, Position, PriceQuote,
    Ticket, TradeRequest,
};
pub use request::{LoginBody, OpenTradeBody};
pub use validator::compute_order;
pub use value_objects::{DomainError, OrderSide, Price, Symbol, Volume};
