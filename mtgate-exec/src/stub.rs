//! Stub venue for tests and local development.
//!
//! Simulates a trading terminal in memory: configurable quotes and accounts,
//! immediate fills, forced failures and scripted order results.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

use mtgate_domain::{AccountId, Credential, OrderSide, Ticket};

use crate::ports::{OrderRequest, SymbolInfo, Tick, TradeResult, VenueFault, VenuePort, VenuePosition};

/// Terminal code for calls made before `initialize`.
pub const NO_IPC_CONNECTION: i32 = -10004;
/// Terminal code for rejected credentials.
pub const AUTHORIZATION_FAILED: i32 = -6;

/// Operations a test can force to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StubOp {
    Initialize,
    Login,
    Shutdown,
    SymbolTick,
    SymbolInfo,
    OrderSend,
    Positions,
}

#[derive(Debug, Clone)]
struct StubAccount {
    password: String,
    server: String,
}

#[derive(Debug, Default)]
struct StubState {
    initialized: bool,
    logged_in: Option<AccountId>,
    accounts: HashMap<u64, StubAccount>,
    ticks: HashMap<String, Tick>,
    infos: HashMap<String, SymbolInfo>,
    positions: Vec<VenuePosition>,
    next_ticket: Ticket,
    submitted: Vec<OrderRequest>,
    scripted: VecDeque<Option<TradeResult>>,
    failing: HashSet<StubOp>,
    calls: Vec<StubOp>,
}

// =============================================================================
// Stub Venue
// =============================================================================

/// In-memory trading terminal.
///
/// With no accounts registered any credentials are accepted.
pub struct StubVenue {
    state: Mutex<StubState>,
}

impl StubVenue {
    /// Create an empty stub venue.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StubState {
                next_ticket: 1000,
                ..StubState::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StubState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register an account that `login` will accept.
    pub fn add_account(&self, login: u64, password: &str, server: &str) {
        self.lock().accounts.insert(
            login,
            StubAccount {
                password: password.to_string(),
                server: server.to_string(),
            },
        );
    }

    /// Set the quote and point size for a symbol.
    pub fn set_symbol(&self, symbol: &str, bid: Decimal, ask: Decimal, point: Decimal) {
        let mut state = self.lock();
        state.ticks.insert(symbol.to_string(), Tick { bid, ask, time_msc: 0 });
        state.infos.insert(
            symbol.to_string(),
            SymbolInfo {
                point,
                digits: point.scale(),
            },
        );
    }

    /// Remove only the tick of a symbol, keeping its contract info.
    pub fn remove_tick(&self, symbol: &str) {
        self.lock().ticks.remove(symbol);
    }

    /// Seed an open position.
    pub fn add_position(&self, position: VenuePosition) {
        self.lock().positions.push(position);
    }

    /// Force every call of `op` to fail until cleared.
    pub fn fail(&self, op: StubOp) {
        self.lock().failing.insert(op);
    }

    /// Stop forcing `op` to fail.
    pub fn clear_failure(&self, op: StubOp) {
        self.lock().failing.remove(&op);
    }

    /// Queue the reply for the next `order_send` (`None` = no result).
    pub fn script_order_result(&self, result: Option<TradeResult>) {
        self.lock().scripted.push_back(result);
    }

    /// Every order request received, in order.
    pub fn submitted_orders(&self) -> Vec<OrderRequest> {
        self.lock().submitted.clone()
    }

    /// Every port call received, in order.
    pub fn calls(&self) -> Vec<StubOp> {
        self.lock().calls.clone()
    }

    /// Currently open positions.
    pub fn open_positions(&self) -> Vec<VenuePosition> {
        self.lock().positions.clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.lock().initialized
    }

    pub fn logged_in_account(&self) -> Option<AccountId> {
        self.lock().logged_in
    }

    /// Record the call and return the forced fault for it, if any.
    fn enter(state: &mut StubState, op: StubOp) -> Result<(), VenueFault> {
        state.calls.push(op);
        if state.failing.contains(&op) {
            return Err(VenueFault::new(-1, format!("Simulated {:?} failure", op)));
        }
        Ok(())
    }

    fn require_connection(state: &StubState) -> Result<(), VenueFault> {
        if state.initialized {
            Ok(())
        } else {
            Err(VenueFault::new(NO_IPC_CONNECTION, "No IPC connection"))
        }
    }

    fn fill(state: &mut StubState, request: &OrderRequest) -> TradeResult {
        let rejected = |retcode: u32, comment: &str| TradeResult {
            retcode,
            order: 0,
            deal: 0,
            volume: Decimal::ZERO,
            price: Decimal::ZERO,
            comment: comment.to_string(),
        };

        if !state.ticks.contains_key(&request.symbol) {
            return rejected(TradeResult::RETCODE_INVALID, "Invalid request");
        }

        state.next_ticket += 1;
        let ticket = state.next_ticket;

        match request.position {
            Some(position_ticket) => {
                let Some(index) = state.positions.iter().position(|p| p.ticket == position_ticket) else {
                    return rejected(TradeResult::RETCODE_POSITION_CLOSED, "Position closed");
                };
                state.positions.remove(index);
            }
            None => state.positions.push(VenuePosition {
                ticket,
                symbol: request.symbol.clone(),
                volume: request.volume,
                price_open: request.price,
                type_code: request.side.code(),
                magic: request.magic,
            }),
        }

        TradeResult {
            retcode: TradeResult::RETCODE_DONE,
            order: ticket,
            deal: ticket,
            volume: request.volume,
            price: request.price,
            comment: "Request executed".to_string(),
        }
    }
}

impl Default for StubVenue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VenuePort for StubVenue {
    async fn initialize(&self) -> Result<(), VenueFault> {
        let mut state = self.lock();
        Self::enter(&mut state, StubOp::Initialize)?;
        state.initialized = true;
        Ok(())
    }

    async fn login(
        &self,
        account: AccountId,
        credential: &Credential,
        server: &str,
    ) -> Result<(), VenueFault> {
        let mut state = self.lock();
        Self::enter(&mut state, StubOp::Login)?;
        Self::require_connection(&state)?;

        let accepted = state.accounts.is_empty()
            || state
                .accounts
                .get(&account.as_u64())
                .map_or(false, |a| a.password == credential.expose() && a.server == server);

        if !accepted {
            return Err(VenueFault::new(AUTHORIZATION_FAILED, "Terminal: Authorization failed"));
        }

        state.logged_in = Some(account);
        tracing::debug!(%account, server, "Stub: account authorized");
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), VenueFault> {
        let mut state = self.lock();
        Self::enter(&mut state, StubOp::Shutdown)?;
        state.initialized = false;
        state.logged_in = None;
        Ok(())
    }

    async fn symbol_tick(&self, symbol: &str) -> Result<Option<Tick>, VenueFault> {
        let mut state = self.lock();
        Self::enter(&mut state, StubOp::SymbolTick)?;
        Self::require_connection(&state)?;
        Ok(state.ticks.get(symbol).copied())
    }

    async fn symbol_info(&self, symbol: &str) -> Result<Option<SymbolInfo>, VenueFault> {
        let mut state = self.lock();
        Self::enter(&mut state, StubOp::SymbolInfo)?;
        Self::require_connection(&state)?;
        Ok(state.infos.get(symbol).copied())
    }

    async fn order_send(&self, request: &OrderRequest) -> Result<Option<TradeResult>, VenueFault> {
        let mut state = self.lock();
        Self::enter(&mut state, StubOp::OrderSend)?;
        Self::require_connection(&state)?;
        state.submitted.push(request.clone());

        if let Some(scripted) = state.scripted.pop_front() {
            return Ok(scripted);
        }

        let result = Self::fill(&mut state, request);
        tracing::debug!(%request, retcode = result.retcode, "Stub: order processed");
        Ok(Some(result))
    }

    async fn positions(&self) -> Result<Vec<VenuePosition>, VenueFault> {
        let mut state = self.lock();
        Self::enter(&mut state, StubOp::Positions)?;
        Self::require_connection(&state)?;
        Ok(state.positions.clone())
    }
}

/// Build a buy/sell position record for seeding the stub.
pub fn stub_position(ticket: Ticket, symbol: &str, side: OrderSide, volume: Decimal, price_open: Decimal) -> VenuePosition {
    VenuePosition {
        ticket,
        symbol: symbol.to_string(),
        volume,
        price_open,
        type_code: side.code(),
        magic: 0,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{OrderFilling, OrderTime, TradeAction};
    use rust_decimal_macros::dec;

    fn market_buy(symbol: &str) -> OrderRequest {
        OrderRequest {
            action: TradeAction::Deal,
            symbol: symbol.to_string(),
            volume: dec!(0.1),
            side: OrderSide::Buy,
            price: dec!(1.1050),
            sl: Some(dec!(1.1000)),
            tp: Some(dec!(1.1150)),
            position: None,
            deviation: 10,
            magic: 0,
            comment: "test".to_string(),
            type_time: OrderTime::Gtc,
            type_filling: OrderFilling::Ioc,
        }
    }

    #[tokio::test]
    async fn test_calls_require_initialize() {
        let venue = StubVenue::new();

        let err = venue.positions().await.unwrap_err();
        assert_eq!(err.code, NO_IPC_CONNECTION);

        venue.initialize().await.unwrap();
        assert!(venue.positions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_login_with_registered_accounts() {
        let venue = StubVenue::new();
        venue.add_account(7, "pw", "Demo");
        venue.initialize().await.unwrap();

        let err = venue
            .login(AccountId::new(7), &Credential::new("wrong"), "Demo")
            .await
            .unwrap_err();
        assert_eq!(err.code, AUTHORIZATION_FAILED);

        venue
            .login(AccountId::new(7), &Credential::new("pw"), "Demo")
            .await
            .unwrap();
        assert_eq!(venue.logged_in_account(), Some(AccountId::new(7)));
    }

    #[tokio::test]
    async fn test_open_then_close_position() {
        let venue = StubVenue::new();
        venue.set_symbol("EURUSD", dec!(1.1048), dec!(1.1050), dec!(0.0001));
        venue.initialize().await.unwrap();

        let opened = venue.order_send(&market_buy("EURUSD")).await.unwrap().unwrap();
        assert!(opened.is_done());

        let positions = venue.positions().await.unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].ticket, opened.order);

        let mut close = market_buy("EURUSD");
        close.side = OrderSide::Sell;
        close.position = Some(opened.order);
        let closed = venue.order_send(&close).await.unwrap().unwrap();

        assert!(closed.is_done());
        assert!(venue.open_positions().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_symbol_rejected() {
        let venue = StubVenue::new();
        venue.initialize().await.unwrap();

        assert!(venue.symbol_tick("NOPE").await.unwrap().is_none());

        let result = venue.order_send(&market_buy("NOPE")).await.unwrap().unwrap();
        assert_eq!(result.retcode, TradeResult::RETCODE_INVALID);
    }

    #[tokio::test]
    async fn test_scripted_and_forced_failures() {
        let venue = StubVenue::new();
        venue.set_symbol("EURUSD", dec!(1.1048), dec!(1.1050), dec!(0.0001));
        venue.initialize().await.unwrap();

        venue.script_order_result(None);
        assert!(venue.order_send(&market_buy("EURUSD")).await.unwrap().is_none());

        venue.fail(StubOp::OrderSend);
        assert!(venue.order_send(&market_buy("EURUSD")).await.is_err());

        venue.clear_failure(StubOp::OrderSend);
        assert!(venue.order_send(&market_buy("EURUSD")).await.unwrap().is_some());
        assert_eq!(venue.submitted_orders().len(), 2);
    }

    #[test]
    fn test_set_symbol_digits_from_point() {
        let venue = StubVenue::new();
        venue.set_symbol("USDJPY", dec!(150.10), dec!(150.12), dec!(0.001));

        let state = venue.lock();
        assert_eq!(state.infos["USDJPY"].digits, 3);
    }
}
