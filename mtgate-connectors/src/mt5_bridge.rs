//! Terminal Bridge REST Client
//!
//! The trading terminal only exposes an in-process API, so a small bridge
//! process runs next to it and republishes the calls over HTTP/JSON:
//!
//! | Call | Endpoint |
//! |---|---|
//! | initialize | `POST /initialize` |
//! | login | `POST /login` `{login, password, server}` |
//! | shutdown | `POST /shutdown` |
//! | tick | `GET /symbols/{symbol}/tick` |
//! | symbol info | `GET /symbols/{symbol}` |
//! | order send | `POST /orders` (body: `OrderRequest`) |
//! | positions | `GET /positions` |
//!
//! A `404` on the symbol endpoints or a `null` body means "no such thing".
//! Non-2xx responses carry the terminal's last error as `{code, message}`.

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tracing::debug;

use mtgate_domain::{AccountId, Credential};
use mtgate_exec::{OrderRequest, SymbolInfo, Tick, TradeResult, VenueFault, VenuePort, VenuePosition};

// =============================================================================
// Constants
// =============================================================================

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Header carrying the bridge shared secret
const TOKEN_HEADER: &str = "X-Bridge-Token";

/// Fault codes for failures that never reached the terminal
const TRANSPORT_FAULT: i32 = -1;
const TIMEOUT_FAULT: i32 = -2;
const PARSE_FAULT: i32 = -3;

// =============================================================================
// Errors
// =============================================================================

/// Errors that can occur in the bridge client.
#[derive(Debug, Clone, Error)]
pub enum BridgeError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    /// Bridge returned the terminal's error
    #[error("Terminal error: {code} - {message}")]
    ApiError { code: i32, message: String },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Request timed out
    #[error("Request timed out")]
    Timeout,
}

impl From<BridgeError> for VenueFault {
    fn from(error: BridgeError) -> Self {
        match error {
            BridgeError::ApiError { code, message } => VenueFault::new(code, message),
            BridgeError::Timeout => VenueFault::new(TIMEOUT_FAULT, "Bridge request timed out"),
            BridgeError::RequestFailed(msg) => VenueFault::new(TRANSPORT_FAULT, msg),
            BridgeError::ParseError(msg) => VenueFault::new(PARSE_FAULT, msg),
        }
    }
}

#[derive(Debug, Deserialize)]
struct BridgeErrorResponse {
    code: i32,
    message: String,
}

#[derive(Serialize)]
struct LoginPayload<'a> {
    login: u64,
    password: &'a str,
    server: &'a str,
}

// =============================================================================
// Bridge Client
// =============================================================================

/// REST client for the terminal bridge.
pub struct BridgeClient {
    /// HTTP client
    client: Client,
    /// Bridge base URL, without trailing slash
    base_url: String,
    /// Optional shared secret
    token: Option<String>,
    /// Per-request timeout
    request_timeout: Duration,
}

impl BridgeClient {
    /// Create a client for the bridge at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Authenticate to the bridge with a shared secret.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Override the per-request timeout.
    pub fn with_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Full URL for an endpoint path.
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Path for a symbol resource; the name is percent-encoded.
    fn symbol_path(symbol: &str, suffix: &str) -> String {
        let encoded: String = symbol
            .bytes()
            .map(|b| match b {
                b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                    (b as char).to_string()
                }
                _ => format!("%{:02X}", b),
            })
            .collect();
        format!("/symbols/{}{}", encoded, suffix)
    }

    /// Send a request and return the body, or `None` on 404.
    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Option<String>, BridgeError> {
        let mut request = self.client.request(method.clone(), self.url(path));
        if let Some(token) = &self.token {
            request = request.header(TOKEN_HEADER, token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        // The deadline covers the body read as well as the headers
        let exchange = async {
            let response = request
                .send()
                .await
                .map_err(|e| BridgeError::RequestFailed(e.to_string()))?;
            let status = response.status();
            let text = response
                .text()
                .await
                .map_err(|e| BridgeError::ParseError(e.to_string()))?;
            Ok::<_, BridgeError>((status, text))
        };

        let (status, text) = timeout(self.request_timeout, exchange)
            .await
            .map_err(|_| BridgeError::Timeout)??;
        debug!(%method, path, %status, "Bridge response");

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !status.is_success() {
            return Err(parse_error_body(status, &text));
        }

        Ok(Some(text))
    }

    /// GET/POST returning JSON; `None` on 404 or `null`.
    async fn fetch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Option<T>, BridgeError> {
        match self.send(method, path, body).await? {
            Some(text) => parse_optional(&text),
            None => Ok(None),
        }
    }

    /// POST expecting only a success status.
    async fn command<B: Serialize + ?Sized>(&self, path: &str, body: Option<&B>) -> Result<(), BridgeError> {
        match self.send(Method::POST, path, body).await? {
            Some(_) => Ok(()),
            None => Err(BridgeError::RequestFailed(format!("Endpoint not found: {}", path))),
        }
    }
}

/// Decode a non-2xx body into the terminal's error pair when possible.
fn parse_error_body(status: StatusCode, body: &str) -> BridgeError {
    match serde_json::from_str::<BridgeErrorResponse>(body) {
        Ok(err) => BridgeError::ApiError {
            code: err.code,
            message: err.message,
        },
        Err(_) => BridgeError::RequestFailed(format!("HTTP {}: {}", status, body)),
    }
}

/// Decode a JSON body where `null` (or an empty body) means absent.
fn parse_optional<T: DeserializeOwned>(body: &str) -> Result<Option<T>, BridgeError> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str::<Option<T>>(body).map_err(|e| BridgeError::ParseError(e.to_string()))
}

#[async_trait]
impl VenuePort for BridgeClient {
    async fn initialize(&self) -> Result<(), VenueFault> {
        Ok(self.command::<()>("/initialize", None).await?)
    }

    async fn login(
        &self,
        account: AccountId,
        credential: &Credential,
        server: &str,
    ) -> Result<(), VenueFault> {
        let payload = LoginPayload {
            login: account.as_u64(),
            password: credential.expose(),
            server,
        };
        Ok(self.command("/login", Some(&payload)).await?)
    }

    async fn shutdown(&self) -> Result<(), VenueFault> {
        Ok(self.command::<()>("/shutdown", None).await?)
    }

    async fn symbol_tick(&self, symbol: &str) -> Result<Option<Tick>, VenueFault> {
        let path = Self::symbol_path(symbol, "/tick");
        Ok(self.fetch::<Tick, ()>(Method::GET, &path, None).await?)
    }

    async fn symbol_info(&self, symbol: &str) -> Result<Option<SymbolInfo>, VenueFault> {
        let path = Self::symbol_path(symbol, "");
        Ok(self.fetch::<SymbolInfo, ()>(Method::GET, &path, None).await?)
    }

    async fn order_send(&self, request: &OrderRequest) -> Result<Option<TradeResult>, VenueFault> {
        Ok(self.fetch(Method::POST, "/orders", Some(request)).await?)
    }

    async fn positions(&self) -> Result<Vec<VenuePosition>, VenueFault> {
        match self.fetch::<Vec<VenuePosition>, ()>(Method::GET, "/positions", None).await? {
            Some(positions) => Ok(positions),
            None => Err(VenueFault::new(PARSE_FAULT, "Bridge returned no positions list")),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
