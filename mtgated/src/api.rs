//! HTTP API for the MTGate daemon.
//!
//! Provides REST endpoints for:
//! - Login / logout of the terminal session
//! - Open a market order with point-based SL/TP
//! - List open positions
//! - Close all positions
//! - Health check and session status

use std::any::Any;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Request, State},
    http::{header, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, warn};

use mtgate_domain::{LoginBody, OpenPositions, OpenTradeBody, OrderOutcome, OrderSide, Position, Ticket};
use mtgate_exec::{ExecError, OrderGateway, PositionReader, SessionManager, SessionStatus, VenuePort};

// =============================================================================
// API State
// =============================================================================

/// Shared state for API handlers.
pub struct ApiState<V: VenuePort + 'static> {
    pub session: Arc<SessionManager<V>>,
    pub gateway: OrderGateway<V>,
    pub positions: PositionReader<V>,
}

impl<V: VenuePort + 'static> ApiState<V> {
    /// Wire the gateway and reader to one shared session.
    pub fn new(session: Arc<SessionManager<V>>) -> Self {
        Self {
            gateway: OrderGateway::new(session.clone()),
            positions: PositionReader::new(session.clone()),
            session,
        }
    }
}

// =============================================================================
// Request/Response Types
// =============================================================================

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Plain acknowledgement.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: &str) -> Json<Self> {
        Json(Self {
            message: message.to_string(),
        })
    }
}

/// Response after opening a trade.
#[derive(Debug, Serialize, Deserialize)]
pub struct OpenTradeResponse {
    pub order_id: Ticket,
}

/// One open position as rendered to clients.
#[derive(Debug, Serialize, Deserialize)]
pub struct TradeSummary {
    pub order_id: Ticket,
    pub symbol: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub volume: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(rename = "type")]
    pub side: OrderSide,
}

/// Per-ticket results of a bulk close.
#[derive(Debug, Serialize, Deserialize)]
pub struct CloseAllResponse {
    pub results: Vec<OrderOutcome>,
}

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

// =============================================================================
// Router
// =============================================================================

/// Create the API router.
pub fn create_router<V>(state: Arc<ApiState<V>>) -> Router
where
    V: VenuePort + 'static,
{
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_credentials(true)
        .allow_headers([header::CONTENT_TYPE])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ]);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler::<V>))
        .route("/login", post(login_handler::<V>))
        .route("/logout", post(logout_handler::<V>))
        .route("/open_trade", post(open_trade_handler::<V>))
        .route("/get_open_trades", get(get_open_trades_handler::<V>))
        .route("/close_all_trades", post(close_all_trades_handler::<V>))
        .with_state(state)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(middleware::from_fn(preflight))
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint.
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Current session state.
async fn status_handler<V: VenuePort + 'static>(
    State(state): State<Arc<ApiState<V>>>,
) -> Json<SessionStatus> {
    Json(state.session.status().await)
}

/// Authenticate against the terminal.
async fn login_handler<V: VenuePort + 'static>(
    State(state): State<Arc<ApiState<V>>>,
    body: Result<Json<LoginBody>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(body) = body.map_err(invalid_request)?;
    let request = body.parse().map_err(|e| to_error_response(e.into()))?;

    state.session.login(request).await.map_err(to_error_response)?;

    Ok(MessageResponse::new("Login successful"))
}

/// End the terminal session.
async fn logout_handler<V: VenuePort + 'static>(
    State(state): State<Arc<ApiState<V>>>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.session.logout().await.map_err(to_error_response)?;

    Ok(MessageResponse::new("Logged out successfully"))
}

/// Open a market order.
async fn open_trade_handler<V: VenuePort + 'static>(
    State(state): State<Arc<ApiState<V>>>,
    body: Result<Json<OpenTradeBody>, JsonRejection>,
) -> Result<Json<OpenTradeResponse>, ApiError> {
    // Auth is reported ahead of any body problem
    state
        .session
        .require_authenticated()
        .await
        .map_err(to_error_response)?;

    let Json(body) = body.map_err(invalid_request)?;
    let request = body.parse().map_err(|e| to_error_response(e.into()))?;

    let receipt = state
        .gateway
        .open_trade(request)
        .await
        .map_err(to_error_response)?;

    Ok(Json(OpenTradeResponse {
        order_id: receipt.order_id,
    }))
}

/// List open positions.
async fn get_open_trades_handler<V: VenuePort + 'static>(
    State(state): State<Arc<ApiState<V>>>,
) -> Result<Response, ApiError> {
    let positions = state
        .positions
        .list_open_positions()
        .await
        .map_err(|e| match e {
            ExecError::Retrieval(fault) => error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to retrieve trades",
                Some(fault.to_string()),
            ),
            other => to_error_response(other),
        })?;

    match positions {
        OpenPositions::None => Ok(MessageResponse::new("No open trades found").into_response()),
        OpenPositions::Some(positions) => {
            let trades: Vec<TradeSummary> = positions.into_iter().map(position_to_summary).collect();
            Ok(Json(trades).into_response())
        }
    }
}

/// Close every open position.
async fn close_all_trades_handler<V: VenuePort + 'static>(
    State(state): State<Arc<ApiState<V>>>,
) -> Result<Response, ApiError> {
    let results = state
        .gateway
        .close_all_trades()
        .await
        .map_err(to_error_response)?;

    if results.is_empty() {
        return Ok(MessageResponse::new("No open trades to close").into_response());
    }

    Ok(Json(CloseAllResponse { results }).into_response())
}

// =============================================================================
// Middleware
// =============================================================================

/// Answer every OPTIONS request with an empty 204, keeping CORS headers.
async fn preflight(request: Request, next: Next) -> Response {
    let is_options = request.method() == Method::OPTIONS;
    let mut response = next.run(request).await;

    if is_options {
        *response.status_mut() = StatusCode::NO_CONTENT;
        *response.body_mut() = Body::empty();
        let headers = response.headers_mut();
        headers.remove(header::CONTENT_LENGTH);
        headers.remove(header::CONTENT_TYPE);
        headers.remove(header::ALLOW);
    }

    response
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let details = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "handler panicked".to_string()
    };

    error!(%details, "Handler panicked");

    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error",
        Some(details),
    )
    .into_response()
}

// =============================================================================
// Helpers
// =============================================================================

fn error_response(status: StatusCode, error: &str, details: Option<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            details,
        }),
    )
}

fn invalid_request(rejection: JsonRejection) -> ApiError {
    warn!(reason = %rejection.body_text(), "Rejected request body");
    error_response(StatusCode::BAD_REQUEST, "Invalid request", None)
}

/// Render an execution error as `{error, details?}`.
pub fn to_error_response(error: ExecError) -> ApiError {
    let details = error.venue_detail();

    let (status, message, details) = match &error {
        ExecError::Connection(_) | ExecError::Auth(_) => {
            (StatusCode::UNAUTHORIZED, "Login failed".to_string(), details)
        }
        ExecError::NotLoggedIn => (StatusCode::BAD_REQUEST, error.to_string(), None),
        ExecError::Unauthenticated => (StatusCode::UNAUTHORIZED, error.to_string(), None),
        ExecError::MalformedRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
        ExecError::SymbolNotFound { .. } => (StatusCode::BAD_REQUEST, error.to_string(), details),
        ExecError::InvalidStops(reason) => (
            StatusCode::BAD_REQUEST,
            "Invalid SL or TP values".to_string(),
            Some(reason.clone()),
        ),
        ExecError::Submission(_) => (StatusCode::INTERNAL_SERVER_ERROR, error.to_string(), details),
        ExecError::TradeRejected { .. } => {
            (StatusCode::BAD_REQUEST, "Trade failed".to_string(), details)
        }
        ExecError::Retrieval(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to retrieve positions".to_string(),
            details,
        ),
        ExecError::Unexpected(msg) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
            Some(msg.clone()),
        ),
    };

    if status.is_server_error() {
        error!(%status, %error, "Request failed");
    } else {
        warn!(%status, %error, "Request rejected");
    }

    error_response(status, &message, details)
}

fn position_to_summary(position: Position) -> TradeSummary {
    TradeSummary {
        order_id: position.ticket,
        symbol: position.symbol,
        volume: position.volume,
        price: position.open_price,
        side: position.side,
    }
}

// =============================================================================
// Tests
// =============================================================================
