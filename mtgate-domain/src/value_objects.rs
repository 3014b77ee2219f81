//! Value Objects for the MTGate domain
//!
//! Immutable, validated domain primitives.
//! All value objects enforce invariants at construction time.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Domain errors for value object and request validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Request body is missing fields or a field does not parse
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// Computed stop-loss / take-profit levels are not tradable
    #[error("Invalid SL or TP values: {0}")]
    InvalidStops(String),

    /// Price must be positive
    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    /// Volume must be positive
    #[error("Invalid volume: {0}")]
    InvalidVolume(String),

    /// Symbol must be a non-empty terminal symbol name
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),
}

// =============================================================================
// Price
// =============================================================================

/// Price represents a positive decimal price
///
/// # Invariants
/// - Must be > 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Create a new Price with validation
    ///
    /// # Errors
    /// Returns `DomainError::InvalidPrice` if value <= 0
    pub fn new(value: Decimal) -> Result<Self, DomainError> {
        if value <= Decimal::ZERO {
            return Err(DomainError::InvalidPrice(format!("Price must be positive, got {}", value)));
        }
        Ok(Self(value))
    }

    /// Get the underlying Decimal value
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Volume
// =============================================================================

/// Volume represents a positive lot size
///
/// # Invariants
/// - Must be > 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Volume(Decimal);

impl Volume {
    /// Create a new Volume with validation
    ///
    /// # Errors
    /// Returns `DomainError::InvalidVolume` if value <= 0
    pub fn new(value: Decimal) -> Result<Self, DomainError> {
        if value <= Decimal::ZERO {
            return Err(DomainError::InvalidVolume(format!(
                "Volume must be positive, got {}",
                value
            )));
        }
        Ok(Self(value))
    }

    /// Get the underlying Decimal value
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Symbol
// =============================================================================

/// Symbol is a terminal instrument name (e.g., EURUSD, XAUUSD, US30.cash)
///
/// Terminal symbols carry broker-specific suffixes, so no base/quote split
/// is attempted.
///
/// # Invariants
/// - Non-empty after trimming
/// - No whitespace or path separators
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Create a Symbol with validation
    ///
    /// # Examples
    /// ```
    /// # use mtgate_domain::value_objects::Symbol;
    /// let symbol = Symbol::new("EURUSD").unwrap();
    /// assert_eq!(symbol.as_str(), "EURUSD");
    /// assert!(Symbol::new("  ").is_err());
    /// ```
    ///
    /// # Errors
    /// Returns `DomainError::InvalidSymbol` if the name is empty or contains
    /// whitespace or `/`
    pub fn new(name: impl AsRef<str>) -> Result<Self, DomainError> {
        let name = name.as_ref().trim();
        if name.is_empty() {
            return Err(DomainError::InvalidSymbol("Symbol must be non-empty".to_string()));
        }
        if name.chars().any(|c| c.is_whitespace() || c == '/') {
            return Err(DomainError::InvalidSymbol(format!("Illegal characters in symbol: {}", name)));
        }
        Ok(Self(name.to_string()))
    }

    /// Get the symbol name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Symbol {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// OrderSide
// =============================================================================

/// OrderSide represents the order direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    /// Buy order (fills at ask)
    Buy,
    /// Sell order (fills at bid)
    Sell,
}

impl OrderSide {
    /// Terminal order type code for a buy
    pub const BUY_CODE: i32 = 0;
    /// Terminal order type code for a sell
    pub const SELL_CODE: i32 = 1;

    /// Parse the wire representation ("BUY" / "SELL", exact case)
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value {
            "BUY" => Ok(OrderSide::Buy),
            "SELL" => Ok(OrderSide::Sell),
            other => Err(DomainError::MalformedRequest(format!(
                "Invalid trade type: {}. Expected: BUY or SELL",
                other
            ))),
        }
    }

    /// Map a terminal order/position type code.
    ///
    /// Returns `None` for codes other than buy (0) and sell (1).
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            Self::BUY_CODE => Some(OrderSide::Buy),
            Self::SELL_CODE => Some(OrderSide::Sell),
            _ => None,
        }
    }

    /// Terminal order type code
    pub fn code(&self) -> i32 {
        match self {
            OrderSide::Buy => Self::BUY_CODE,
            OrderSide::Sell => Self::SELL_CODE,
        }
    }

    /// The side of the order that offsets this one
    ///
    /// Buy → Sell, Sell → Buy
    pub fn opposite(&self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
