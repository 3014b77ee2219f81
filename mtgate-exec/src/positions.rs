//! Position Reader: open positions in the gateway's representation.

use std::sync::Arc;
use tracing::{debug, error};

use mtgate_domain::{OpenPositions, OrderSide, Position};

use crate::error::{ExecError, ExecResult};
use crate::ports::{VenuePort, VenuePosition};
use crate::session::SessionManager;

/// Reads and normalizes open positions.
pub struct PositionReader<V: VenuePort> {
    session: Arc<SessionManager<V>>,
}

impl<V: VenuePort> Clone for PositionReader<V> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
        }
    }
}

impl<V: VenuePort> PositionReader<V> {
    pub fn new(session: Arc<SessionManager<V>>) -> Self {
        Self { session }
    }

    /// List open positions.
    ///
    /// # Errors
    ///
    /// - `Unauthenticated` without an active session
    /// - `Retrieval` if the venue cannot list positions
    pub async fn list_open_positions(&self) -> ExecResult<OpenPositions> {
        let session = self.session.authenticated().await?;

        let raw = session.venue().positions().await.map_err(|fault| {
            error!(%fault, "Failed to retrieve trades");
            ExecError::Retrieval(fault)
        })?;

        debug!(count = raw.len(), "Open positions retrieved");
        Ok(OpenPositions::from_vec(raw.into_iter().map(to_position).collect()))
    }
}

/// Map a venue record. Type code 0 is a buy; every other code reads as a sell.
pub fn to_position(raw: VenuePosition) -> Position {
    let side = match raw.type_code {
        OrderSide::BUY_CODE => OrderSide::Buy,
        _ => OrderSide::Sell,
    };

    Position {
        ticket: raw.ticket,
        symbol: raw.symbol,
        volume: raw.volume,
        open_price: raw.price_open,
        side,
        magic: raw.magic,
    }
}

// =============================================================================
// Tests
// =============================================================================
