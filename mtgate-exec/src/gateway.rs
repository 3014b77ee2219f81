//! Order Gateway: open and bulk-close market positions.
//!
//! # Flow
//!
//! ```text
//! open_trade:        auth → tick + symbol info → validator → order_send → receipt
//! close_all_trades:  auth → positions → per position: tick → order_send → outcome
//! ```
//!
//! Bulk close is best-effort: each position yields exactly one outcome and a
//! failure never stops the remaining closes. Already closed positions are not
//! rolled back.

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{error, info, warn};

use mtgate_domain::{
    compute_order, OrderOutcome, OrderReceipt, OrderSide, PriceQuote, TradeRequest,
};

use crate::error::{ExecError, ExecResult};
use crate::ports::{OrderFilling, OrderRequest, OrderTime, TradeAction, VenuePort, VenuePosition};
use crate::session::SessionManager;

/// Maximum slippage accepted on every market order, in points.
pub const DEVIATION_POINTS: u32 = 10;
/// Magic tag stamped on orders opened by the gateway.
pub const GATEWAY_MAGIC: u64 = 0;
/// Comment attached to opening orders.
pub const OPEN_COMMENT: &str = "Trade via API";
/// Comment attached to closing orders.
pub const CLOSE_COMMENT: &str = "Close trade via API";

// =============================================================================
// Order Gateway
// =============================================================================

/// Orchestrates validation and venue submission of market orders.
pub struct OrderGateway<V: VenuePort> {
    session: Arc<SessionManager<V>>,
}

impl<V: VenuePort> Clone for OrderGateway<V> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
        }
    }
}

impl<V: VenuePort> OrderGateway<V> {
    pub fn new(session: Arc<SessionManager<V>>) -> Self {
        Self { session }
    }

    /// Open a market position.
    ///
    /// # Errors
    ///
    /// - `Unauthenticated` without an active session
    /// - `SymbolNotFound` if the venue has no tick or contract data
    /// - `InvalidStops` if the computed levels fail validation (nothing is sent)
    /// - `Submission` if the venue returns no result
    /// - `TradeRejected` if the venue returns a non-success code
    pub async fn open_trade(&self, req: TradeRequest) -> ExecResult<OrderReceipt> {
        let session = self.session.authenticated().await?;
        let venue = session.venue();
        let symbol = req.symbol.as_str();

        let quote = fetch_quote(venue, symbol).await?;
        let order = compute_order(&quote, &req)?;

        let request = OrderRequest {
            action: TradeAction::Deal,
            symbol: symbol.to_string(),
            volume: req.volume.as_decimal(),
            side: order.side,
            price: order.entry_price.as_decimal(),
            sl: Some(order.stop_loss.as_decimal()),
            tp: Some(order.take_profit.as_decimal()),
            position: None,
            deviation: DEVIATION_POINTS,
            magic: GATEWAY_MAGIC,
            comment: OPEN_COMMENT.to_string(),
            type_time: OrderTime::Gtc,
            type_filling: OrderFilling::Ioc,
        };

        info!(
            account = %session.account(),
            %request,
            sl = %order.stop_loss,
            tp = %order.take_profit,
            "Sending order"
        );

        let result = match venue.order_send(&request).await {
            Ok(Some(result)) => result,
            Ok(None) => {
                error!(%request, "Order send returned no result");
                return Err(ExecError::Submission(None));
            }
            Err(fault) => {
                error!(%request, %fault, "Order send failed");
                return Err(ExecError::Submission(Some(fault)));
            }
        };

        if !result.is_done() {
            warn!(%result, "Trade failed");
            return Err(ExecError::TradeRejected {
                code: result.retcode,
                comment: result.comment,
            });
        }

        info!(order_id = result.order, price = %result.price, "Order filled");
        Ok(OrderReceipt {
            order_id: result.order,
        })
    }

    /// Close every open position with an opposite market order.
    ///
    /// Returns one outcome per position, in venue order; an empty list means
    /// there was nothing to close.
    ///
    /// # Errors
    ///
    /// - `Unauthenticated` without an active session
    /// - `Retrieval` if the positions cannot be listed
    pub async fn close_all_trades(&self) -> ExecResult<Vec<OrderOutcome>> {
        let session = self.session.authenticated().await?;
        let venue = session.venue();

        let positions = venue.positions().await.map_err(|fault| {
            error!(%fault, "Failed to retrieve positions");
            ExecError::Retrieval(fault)
        })?;

        if positions.is_empty() {
            info!("No open trades to close");
            return Ok(Vec::new());
        }

        let mut outcomes = Vec::with_capacity(positions.len());
        for position in &positions {
            let outcome = match close_position(venue, position).await {
                Ok(()) => OrderOutcome::success(position.ticket),
                Err(reason) => {
                    warn!(ticket = position.ticket, symbol = %position.symbol, %reason, "Close failed");
                    OrderOutcome::failed(position.ticket, reason)
                }
            };
            outcomes.push(outcome);
        }

        let closed = outcomes.iter().filter(|o| o.is_success()).count();
        info!(
            total = outcomes.len(),
            closed,
            failed = outcomes.len() - closed,
            "Close all complete"
        );

        Ok(outcomes)
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Fetch a fresh quote (tick + point size) for `symbol`.
async fn fetch_quote<V: VenuePort>(venue: &V, symbol: &str) -> ExecResult<PriceQuote> {
    let not_found = |fault| ExecError::SymbolNotFound {
        symbol: symbol.to_string(),
        fault,
    };

    let tick = match venue.symbol_tick(symbol).await {
        Ok(Some(tick)) => tick,
        Ok(None) => return Err(not_found(None)),
        Err(fault) => return Err(not_found(Some(fault))),
    };

    let info = match venue.symbol_info(symbol).await {
        Ok(Some(info)) => info,
        Ok(None) => return Err(not_found(None)),
        Err(fault) => return Err(not_found(Some(fault))),
    };

    let quote = tick.quote(&info);
    if quote.bid <= Decimal::ZERO || quote.ask <= Decimal::ZERO || quote.point_size <= Decimal::ZERO {
        error!(symbol, bid = %quote.bid, ask = %quote.ask, point = %quote.point_size, "Unusable quote");
        return Err(ExecError::Unexpected(format!(
            "Venue returned an unusable quote for {} (bid={}, ask={}, point={})",
            symbol, quote.bid, quote.ask, quote.point_size
        )));
    }

    Ok(quote)
}

/// Submit the offsetting order for one position.
///
/// The error is the human-readable reason recorded in the outcome.
async fn close_position<V: VenuePort>(venue: &V, position: &VenuePosition) -> Result<(), String> {
    let side = OrderSide::from_code(position.type_code)
        .ok_or_else(|| "Unknown position type".to_string())?;
    let close_side = side.opposite();

    let tick = match venue.symbol_tick(&position.symbol).await {
        Ok(Some(tick)) => tick,
        Ok(None) => return Err(format!("Symbol {} not found", position.symbol)),
        Err(fault) => return Err(format!("Symbol {} not found: {}", position.symbol, fault)),
    };

    // Buys close at the bid, sells at the ask.
    let price: Decimal = match close_side {
        OrderSide::Sell => tick.bid,
        OrderSide::Buy => tick.ask,
    };

    let request = OrderRequest {
        action: TradeAction::Deal,
        symbol: position.symbol.clone(),
        volume: position.volume,
        side: close_side,
        price,
        sl: None,
        tp: None,
        position: Some(position.ticket),
        deviation: DEVIATION_POINTS,
        magic: position.magic,
        comment: CLOSE_COMMENT.to_string(),
        type_time: OrderTime::Gtc,
        type_filling: OrderFilling::Ioc,
    };

    info!(%request, "Close request");

    match venue.order_send(&request).await {
        Ok(Some(result)) if result.is_done() => Ok(()),
        Ok(Some(result)) => Err(format!(
            "Error Code: {}, Comment: {}",
            result.retcode, result.comment
        )),
        Ok(None) => Err("Order send failed, no result returned".to_string()),
        Err(fault) => Err(format!("Order send failed: {}", fault)),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::TradeResult;
    use crate::stub::{stub_position, StubOp, StubVenue};
    use mtgate_domain::{AccountId, Credential, LoginRequest, OutcomeStatus, Symbol, Volume};
    use rust_decimal_macros::dec;

    async fn logged_in() -> (Arc<StubVenue>, OrderGateway<StubVenue>) {
        let venue = Arc::new(StubVenue::new());
        venue.set_symbol("EURUSD", dec!(1.1048), dec!(1.1050), dec!(0.0001));
        venue.set_symbol("XAUUSD", dec!(2350.10), dec!(2350.40), dec!(0.01));

        let session = Arc::new(SessionManager::new(venue.clone()));
        session
            .login(LoginRequest {
                account: AccountId::new(1),
                credential: Credential::new("pw"),
                server: "Demo".to_string(),
            })
            .await
            .unwrap();

        (venue, OrderGateway::new(session))
    }

    fn buy_eurusd(stop_loss: Decimal, take_profit: Decimal) -> TradeRequest {
        TradeRequest {
            symbol: Symbol::new("EURUSD").unwrap(),
            volume: Volume::new(dec!(0.1)).unwrap(),
            stop_loss,
            take_profit,
            side: OrderSide::Buy,
        }
    }

    fn rejected(retcode: u32, comment: &str) -> TradeResult {
        TradeResult {
            retcode,
            order: 0,
            deal: 0,
            volume: Decimal::ZERO,
            price: Decimal::ZERO,
            comment: comment.to_string(),
        }
    }

    #[tokio::test]
    async fn test_open_trade_requires_session() {
        let venue = Arc::new(StubVenue::new());
        let gateway = OrderGateway::new(Arc::new(SessionManager::new(venue.clone())));

        let err = gateway.open_trade(buy_eurusd(dec!(50), dec!(100))).await.unwrap_err();

        assert!(matches!(err, ExecError::Unauthenticated));
        assert!(venue.calls().is_empty());
    }

    #[tokio::test]
    async fn test_open_trade_submits_computed_levels() {
        let (venue, gateway) = logged_in().await;

        let receipt = gateway.open_trade(buy_eurusd(dec!(50), dec!(100))).await.unwrap();

        let orders = venue.submitted_orders();
        assert_eq!(orders.len(), 1);
        let order = &orders[0];
        assert_eq!(order.price, dec!(1.1050));
        assert_eq!(order.sl, Some(dec!(1.1000)));
        assert_eq!(order.tp, Some(dec!(1.1150)));
        assert_eq!(order.deviation, 10);
        assert_eq!(order.magic, 0);
        assert_eq!(order.comment, "Trade via API");
        assert_eq!(order.type_time, OrderTime::Gtc);
        assert_eq!(order.type_filling, OrderFilling::Ioc);
        assert_eq!(order.position, None);

        let open = venue.open_positions();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].ticket, receipt.order_id);
    }

    #[tokio::test]
    async fn test_open_trade_invalid_stops_not_submitted() {
        let (venue, gateway) = logged_in().await;

        let err = gateway.open_trade(buy_eurusd(dec!(-10), dec!(100))).await.unwrap_err();

        assert!(matches!(err, ExecError::InvalidStops(_)));
        assert!(venue.submitted_orders().is_empty());
    }

    #[tokio::test]
    async fn test_open_trade_unknown_symbol() {
        let (venue, gateway) = logged_in().await;
        let mut req = buy_eurusd(dec!(50), dec!(100));
        req.symbol = Symbol::new("NOPE").unwrap();

        let err = gateway.open_trade(req).await.unwrap_err();

        assert!(matches!(err, ExecError::SymbolNotFound { ref symbol, .. } if symbol == "NOPE"));
        assert!(venue.submitted_orders().is_empty());
    }

    #[tokio::test]
    async fn test_open_trade_missing_tick() {
        let (venue, gateway) = logged_in().await;
        venue.remove_tick("EURUSD");

        let err = gateway.open_trade(buy_eurusd(dec!(50), dec!(100))).await.unwrap_err();

        assert!(matches!(err, ExecError::SymbolNotFound { ref symbol, fault: None } if symbol == "EURUSD"));
        assert!(!venue.calls().contains(&StubOp::SymbolInfo));
        assert!(venue.submitted_orders().is_empty());
    }

    #[tokio::test]
    async fn test_open_trade_unusable_quote() {
        let (venue, gateway) = logged_in().await;
        venue.set_symbol("EURUSD", dec!(0), dec!(0), dec!(0.0001));

        let err = gateway.open_trade(buy_eurusd(dec!(50), dec!(100))).await.unwrap_err();

        assert!(matches!(err, ExecError::Unexpected(_)));
        assert!(venue.submitted_orders().is_empty());
    }

    #[tokio::test]
    async fn test_open_trade_no_result() {
        let (venue, gateway) = logged_in().await;
        venue.script_order_result(None);

        let err = gateway.open_trade(buy_eurusd(dec!(50), dec!(100))).await.unwrap_err();

        assert!(matches!(err, ExecError::Submission(None)));
    }

    #[tokio::test]
    async fn test_open_trade_rejected_by_venue() {
        let (venue, gateway) = logged_in().await;
        venue.script_order_result(Some(rejected(10019, "No money")));

        let err = gateway.open_trade(buy_eurusd(dec!(50), dec!(100))).await.unwrap_err();

        match err {
            ExecError::TradeRejected { code, comment } => {
                assert_eq!(code, 10019);
                assert_eq!(comment, "No money");
            }
            other => panic!("expected TradeRejected, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_close_all_with_no_positions() {
        let (venue, gateway) = logged_in().await;

        let outcomes = gateway.close_all_trades().await.unwrap();

        assert!(outcomes.is_empty());
        assert!(venue.submitted_orders().is_empty());
    }

    #[tokio::test]
    async fn test_close_all_uses_opposite_side_and_price() {
        let (venue, gateway) = logged_in().await;
        venue.add_position(stub_position(1, "EURUSD", OrderSide::Buy, dec!(0.1), dec!(1.1000)));
        venue.add_position(stub_position(2, "XAUUSD", OrderSide::Sell, dec!(0.5), dec!(2360)));

        let outcomes = gateway.close_all_trades().await.unwrap();

        assert_eq!(outcomes, vec![OrderOutcome::success(1), OrderOutcome::success(2)]);

        let orders = venue.submitted_orders();
        assert_eq!(orders[0].side, OrderSide::Sell);
        assert_eq!(orders[0].price, dec!(1.1048));
        assert_eq!(orders[0].position, Some(1));
        assert_eq!(orders[0].volume, dec!(0.1));
        assert_eq!(orders[0].comment, "Close trade via API");
        assert_eq!(orders[1].side, OrderSide::Buy);
        assert_eq!(orders[1].price, dec!(2350.40));
        assert_eq!(orders[1].position, Some(2));
        assert!(venue.open_positions().is_empty());
    }

    #[tokio::test]
    async fn test_close_all_partial_failure_does_not_abort() {
        let (venue, gateway) = logged_in().await;
        for ticket in 1..=3 {
            venue.add_position(stub_position(ticket, "EURUSD", OrderSide::Buy, dec!(0.1), dec!(1.1)));
        }
        venue.script_order_result(Some(TradeResult {
            retcode: TradeResult::RETCODE_DONE,
            order: 90,
            deal: 90,
            volume: dec!(0.1),
            price: dec!(1.1048),
            comment: String::new(),
        }));
        venue.script_order_result(Some(rejected(10018, "Market closed")));

        let outcomes = gateway.close_all_trades().await.unwrap();

        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].status, OutcomeStatus::Success);
        assert_eq!(outcomes[1].status, OutcomeStatus::Failed);
        assert_eq!(
            outcomes[1].error.as_deref(),
            Some("Error Code: 10018, Comment: Market closed")
        );
        assert_eq!(outcomes[2].status, OutcomeStatus::Success);
        assert_eq!(venue.submitted_orders().len(), 3);
    }

    #[tokio::test]
    async fn test_close_all_records_per_position_errors() {
        let (venue, gateway) = logged_in().await;
        let mut unknown = stub_position(1, "EURUSD", OrderSide::Buy, dec!(0.1), dec!(1.1));
        unknown.type_code = 7;
        venue.add_position(unknown);
        venue.add_position(stub_position(2, "GONE", OrderSide::Sell, dec!(1), dec!(10)));
        venue.add_position(stub_position(3, "EURUSD", OrderSide::Sell, dec!(0.2), dec!(1.2)));
        venue.script_order_result(None);

        let outcomes = gateway.close_all_trades().await.unwrap();

        assert_eq!(outcomes[0], OrderOutcome::failed(1, "Unknown position type"));
        assert_eq!(outcomes[1], OrderOutcome::failed(2, "Symbol GONE not found"));
        assert_eq!(
            outcomes[2],
            OrderOutcome::failed(3, "Order send failed, no result returned")
        );
    }

    #[tokio::test]
    async fn test_close_all_retrieval_failure() {
        let (venue, gateway) = logged_in().await;
        venue.fail(StubOp::Positions);

        let err = gateway.close_all_trades().await.unwrap_err();

        assert!(matches!(err, ExecError::Retrieval(_)));
    }

    #[tokio::test]
    async fn test_close_all_keeps_position_magic() {
        let (venue, gateway) = logged_in().await;
        let mut tagged = stub_position(5, "EURUSD", OrderSide::Buy, dec!(0.1), dec!(1.1));
        tagged.magic = 4242;
        venue.add_position(tagged);

        gateway.close_all_trades().await.unwrap();

        assert_eq!(venue.submitted_orders()[0].magic, 4242);
    }
}
