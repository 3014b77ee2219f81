//! MTGate Venue Connectors
//!
//! Adapters implementing `VenuePort` against real terminals.
//! Normalizes transport-specific failures to terminal error pairs.

#![warn(clippy::all)]

// Public modules
pub mod mt5_bridge;

// Re-exports
pub use mt5_bridge::{BridgeClient, BridgeError};
