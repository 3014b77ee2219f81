//! Pre-trade validation.
//!
//! Converts stop distances (in points) into absolute levels and rejects
//! orders the venue would refuse. Pure: no I/O, no clock.
//!
//! # Checks
//!
//! ```text
//! BUY : sl = ask - stop_loss * point    tp = ask + take_profit * point
//!       reject if sl <= 0, tp <= 0, sl >= ask
//! SELL: sl = bid + stop_loss * point    tp = bid - take_profit * point
//!       reject if sl <= 0, tp <= 0, tp >= bid
//! ```
//!
//! The BUY take-profit and the SELL stop-loss are never compared against the
//! entry price. That asymmetry matches what the venue enforces and is kept
//! as-is until confirmed with the desk.

use rust_decimal::Decimal;

use crate::entities::{ComputedOrder, PriceQuote, TradeRequest};
use crate::value_objects::{DomainError, OrderSide, Price};

/// Compute absolute stop-loss / take-profit levels for `req` at `quote`.
///
/// # Errors
/// Returns `DomainError::InvalidStops` when a level is not tradable.
pub fn compute_order(quote: &PriceQuote, req: &TradeRequest) -> Result<ComputedOrder, DomainError> {
    let entry = quote.entry_for(req.side);
    let out_of_range = || DomainError::InvalidStops("level out of range".to_string());

    let sl_offset = req
        .stop_loss
        .checked_mul(quote.point_size)
        .ok_or_else(out_of_range)?;
    let tp_offset = req
        .take_profit
        .checked_mul(quote.point_size)
        .ok_or_else(out_of_range)?;

    let (sl, tp) = match req.side {
        OrderSide::Buy => (entry.checked_sub(sl_offset), entry.checked_add(tp_offset)),
        OrderSide::Sell => (entry.checked_add(sl_offset), entry.checked_sub(tp_offset)),
    };
    let sl = sl.ok_or_else(out_of_range)?;
    let tp = tp.ok_or_else(out_of_range)?;

    if sl <= Decimal::ZERO || tp <= Decimal::ZERO {
        return Err(DomainError::InvalidStops(format!(
            "levels must be positive (sl={}, tp={})",
            sl, tp
        )));
    }

    match req.side {
        OrderSide::Buy if sl >= entry => {
            return Err(DomainError::InvalidStops(format!(
                "BUY stop loss {} must be below entry {}",
                sl, entry
            )));
        }
        OrderSide::Sell if tp >= entry => {
            return Err(DomainError::InvalidStops(format!(
                "SELL take profit {} must be below entry {}",
                tp, entry
            )));
        }
        _ => {}
    }

    Ok(ComputedOrder {
        side: req.side,
        entry_price: Price::new(entry)?,
        stop_loss: Price::new(sl)?,
        take_profit: Price::new(tp)?,
    })
}

// =============================================================================
// Tests
// =============================================================================
