//! Domain Entities for MTGate
//!
//! Requests, quotes and venue-owned records that flow through the gateway.

use crate::value_objects::{OrderSide, Price, Symbol, Volume};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Venue-assigned ticket identifying an order or an open position
pub type Ticket = u64;

// =============================================================================
// Trade Request
// =============================================================================

/// A validated request to open a market position.
///
/// `stop_loss` and `take_profit` are distances in points from the entry
/// price, not absolute prices. They may be negative; the validator decides
/// whether the resulting levels are tradable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRequest {
    /// Instrument to trade
    pub symbol: Symbol,
    /// Lot size
    pub volume: Volume,
    /// Stop-loss distance in points; sign is kept as sent
    pub stop_loss: Decimal,
    /// Take-profit distance in points; sign is kept as sent
    pub take_profit: Decimal,
    /// Direction of the market order
    pub side: OrderSide,
}

// =============================================================================
// Price Quote
// =============================================================================

/// Tradable prices for a symbol at request time.
///
/// Fetched fresh for every operation and never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    /// Best ask
    pub ask: Decimal,
    /// Best bid
    pub bid: Decimal,
    /// Minimal price increment of the symbol
    pub point_size: Decimal,
}

impl PriceQuote {
    /// Build a quote from a tick and the symbol's point size.
    pub fn new(bid: Decimal, ask: Decimal, point_size: Decimal) -> Self {
        Self {
            ask,
            bid,
            point_size,
        }
    }

    /// Price an order on `side` fills at: ask for buys, bid for sells.
    pub fn entry_for(&self, side: OrderSide) -> Decimal {
        match side {
            OrderSide::Buy => self.ask,
            OrderSide::Sell => self.bid,
        }
    }
}

// =============================================================================
// Computed Order
// =============================================================================

/// Absolute order levels derived from a `TradeRequest` and a `PriceQuote`.
///
/// Only produced by [`crate::validator::compute_order`], so the stop levels
/// have already passed the pre-trade checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ComputedOrder {
    /// Direction of the order
    pub side: OrderSide,
    /// Ask for buys, bid for sells
    pub entry_price: Price,
    /// Absolute stop-loss level
    pub stop_loss: Price,
    /// Absolute take-profit level
    pub take_profit: Price,
}

// =============================================================================
// Order Receipt
// =============================================================================

/// Confirmation of an accepted market order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderReceipt {
    /// Venue order ticket
    pub order_id: Ticket,
}

// =============================================================================
// Position
// =============================================================================

/// An open position as reported by the venue.
///
/// Read-only to the gateway; the only mutation is closing it with an
/// opposite-side order that references `ticket`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Position ticket
    pub ticket: Ticket,
    /// Terminal symbol name
    pub symbol: String,
    /// Open volume in lots
    pub volume: Decimal,
    /// Fill price of the opening deal
    pub open_price: Decimal,
    /// Position direction
    pub side: OrderSide,
    /// Expert tag carried over to the closing order
    pub magic: u64,
}

/// Result of reading open positions.
///
/// Zero positions is a distinct, non-error answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenPositions {
    /// The account has no open positions
    None,
    /// At least one open position
    Some(Vec<Position>),
}

impl OpenPositions {
    /// `None` for an empty list.
    pub fn from_vec(positions: Vec<Position>) -> Self {
        if positions.is_empty() {
            OpenPositions::None
        } else {
            OpenPositions::Some(positions)
        }
    }

    /// Number of positions.
    pub fn len(&self) -> usize {
        match self {
            OpenPositions::None => 0,
            OpenPositions::Some(positions) => positions.len(),
        }
    }

    /// Whether there are no positions.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// Order Outcome
// =============================================================================

/// Per-position status of a bulk close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    /// Position closed
    Success,
    /// Position left open
    Failed,
}

/// Outcome of closing one position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderOutcome {
    /// Position ticket the close targeted
    pub ticket: Ticket,
    /// Whether the close went through
    pub status: OutcomeStatus,
    /// Failure reason; absent on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OrderOutcome {
    /// Outcome of a close that went through.
    pub fn success(ticket: Ticket) -> Self {
        Self {
            ticket,
            status: OutcomeStatus::Success,
            error: None,
        }
    }

    /// Outcome of a close that failed with `error`.
    pub fn failed(ticket: Ticket, error: impl Into<String>) -> Self {
        Self {
            ticket,
            status: OutcomeStatus::Failed,
            error: Some(error.into()),
        }
    }

    /// Whether the close went through.
    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }
}

// =============================================================================
// Tests
// =============================================================================
