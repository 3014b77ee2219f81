//! Venue port definitions.
//!
//! The port is the only contract the gateway has with the trading terminal.
//! Adapters implement it for specific transports (terminal bridge, stub).
//!
//! Terminal calls signal "nothing" with nulls and report the reason through
//! a separate last-error slot. Here both are explicit: absence is `None`,
//! failure is `Err(VenueFault)` carrying the terminal's error pair.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use mtgate_domain::{AccountId, Credential, OrderSide, PriceQuote, Ticket};

// =============================================================================
// Venue Port
// =============================================================================

/// Port for trading-terminal operations.
///
/// Implementations:
/// - `StubVenue` - In-memory terminal for tests and local development
/// - `BridgeClient` - REST bridge to a running terminal (mtgate-connectors)
#[async_trait]
pub trait VenuePort: Send + Sync {
    /// Open the terminal connection. Idempotent.
    async fn initialize(&self) -> Result<(), VenueFault>;

    /// Authenticate `account` on `server`.
    async fn login(
        &self,
        account: AccountId,
        credential: &Credential,
        server: &str,
    ) -> Result<(), VenueFault>;

    /// Close the terminal connection.
    async fn shutdown(&self) -> Result<(), VenueFault>;

    /// Latest tick for `symbol`, `None` if the terminal does not know it.
    async fn symbol_tick(&self, symbol: &str) -> Result<Option<Tick>, VenueFault>;

    /// Contract specification for `symbol`, `None` if unknown.
    async fn symbol_info(&self, symbol: &str) -> Result<Option<SymbolInfo>, VenueFault>;

    /// Submit a trade request.
    ///
    /// `None` means the terminal accepted the call but returned no result.
    async fn order_send(&self, request: &OrderRequest) -> Result<Option<TradeResult>, VenueFault>;

    /// All open positions on the account.
    async fn positions(&self) -> Result<Vec<VenuePosition>, VenueFault>;
}

// =============================================================================
// Venue Fault
// =============================================================================

/// Terminal error pair (`code`, `message`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("({code}, '{message}')")]
pub struct VenueFault {
    pub code: i32,
    pub message: String,
}

impl VenueFault {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

// =============================================================================
// Market Data
// =============================================================================

/// Latest prices for a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tick {
    pub bid: Decimal,
    pub ask: Decimal,
    /// Tick time, milliseconds since epoch
    #[serde(default)]
    pub time_msc: i64,
}

/// Symbol contract specification (subset used by the gateway).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolInfo {
    /// Minimal price increment
    pub point: Decimal,
    /// Digits after the decimal point
    #[serde(default)]
    pub digits: u32,
}

impl Tick {
    /// Combine with the symbol's point size into a quote.
    pub fn quote(&self, info: &SymbolInfo) -> PriceQuote {
        PriceQuote::new(self.bid, self.ask, info.point)
    }
}

// =============================================================================
// Trade Requests
// =============================================================================

/// Trade operation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeAction {
    /// Immediate market execution
    Deal,
}

/// Order time-in-force.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderTime {
    /// Good till cancelled
    Gtc,
}

/// Order fill policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderFilling {
    /// Immediate or cancel
    Ioc,
}

/// A request as passed to the terminal's order submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub action: TradeAction,
    pub symbol: String,
    pub volume: Decimal,
    #[serde(rename = "type")]
    pub side: OrderSide,
    pub price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sl: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tp: Option<Decimal>,
    /// Ticket of the position this order closes
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub position: Option<Ticket>,
    /// Maximum slippage in points
    pub deviation: u32,
    pub magic: u64,
    pub comment: String,
    pub type_time: OrderTime,
    pub type_filling: OrderFilling,
}

impl fmt::Display for OrderRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} @ {}", self.side, self.volume, self.symbol, self.price)?;
        if let Some(ticket) = self.position {
            write!(f, " closing #{}", ticket)?;
        }
        Ok(())
    }
}

/// Terminal reply to an order submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeResult {
    pub retcode: u32,
    #[serde(default)]
    pub order: Ticket,
    #[serde(default)]
    pub deal: Ticket,
    #[serde(default)]
    pub volume: Decimal,
    #[serde(default)]
    pub price: Decimal,
    #[serde(default)]
    pub comment: String,
}

impl TradeResult {
    /// Request completed.
    pub const RETCODE_DONE: u32 = 10009;
    /// Invalid request.
    pub const RETCODE_INVALID: u32 = 10013;
    /// Position with the given ticket is already closed.
    pub const RETCODE_POSITION_CLOSED: u32 = 10036;

    pub fn is_done(&self) -> bool {
        self.retcode == Self::RETCODE_DONE
    }
}

impl fmt::Display for TradeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "retcode={}, order={}, deal={}, volume={}, price={}, comment={}",
            self.retcode, self.order, self.deal, self.volume, self.price, self.comment
        )
    }
}

// =============================================================================
// Positions
// =============================================================================

/// Raw open-position record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VenuePosition {
    pub ticket: Ticket,
    pub symbol: String,
    pub volume: Decimal,
    pub price_open: Decimal,
    /// Position type code: 0 = buy, 1 = sell
    #[serde(rename = "type")]
    pub type_code: i32,
    #[serde(default)]
    pub magic: u64,
}

// =============================================================================
// Tests
// =============================================================================
