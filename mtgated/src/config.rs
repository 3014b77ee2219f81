//! Daemon configuration.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::error::{DaemonError, DaemonResult};
use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;
use tracing_subscriber::filter::{EnvFilter, ParseError};

// =============================================================================
// Configuration
// =============================================================================

/// Daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Venue adapter configuration
    pub venue: VenueConfig,

    /// Environment (test, development, production)
    pub environment: Environment,

    /// Emit JSON log lines instead of human-readable ones
    pub log_json: bool,
}

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
}

/// Venue adapter configuration.
#[derive(Debug, Clone)]
pub struct VenueConfig {
    /// Which adapter to run against
    pub kind: VenueKind,
    /// Terminal bridge base URL
    pub bridge_url: String,
    /// Terminal bridge shared secret
    pub bridge_token: Option<String>,
    /// Terminal bridge request timeout
    pub bridge_timeout_secs: u64,
    /// Symbols seeded into the stub venue
    pub stub_symbols: Vec<StubSymbol>,
}

/// Venue adapter selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VenueKind {
    /// In-memory terminal
    Stub,
    /// REST bridge to a running terminal
    Bridge,
}

/// Quote seeded into the stub venue (`SYMBOL:bid:ask:point`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubSymbol {
    pub symbol: String,
    pub bid: Decimal,
    pub ask: Decimal,
    pub point: Decimal,
}

/// Environment type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Test environment (uses stubs)
    Test,
    /// Development environment
    Development,
    /// Production environment
    Production,
}

const DEFAULT_BRIDGE_URL: &str = "http://127.0.0.1:8228";
const DEFAULT_STUB_SYMBOLS: &str = "EURUSD:1.1048:1.1050:0.0001,XAUUSD:2350.10:2350.40:0.01";

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> DaemonResult<Self> {
        // Load .env file if present (ignore errors)
        let _ = dotenvy::dotenv();

        let environment = Self::load_environment()?;
        let api = Self::load_api_config()?;
        let venue = Self::load_venue_config(environment)?;
        let log_json = matches!(
            env::var("MTGATE_LOG_JSON").as_deref(),
            Ok("1") | Ok("true")
        );

        Ok(Self {
            api,
            venue,
            environment,
            log_json,
        })
    }

    /// Create test configuration.
    pub fn test() -> Self {
        Self {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
            },
            venue: VenueConfig {
                kind: VenueKind::Stub,
                bridge_url: DEFAULT_BRIDGE_URL.to_string(),
                bridge_token: None,
                bridge_timeout_secs: 10,
                stub_symbols: parse_stub_symbols(DEFAULT_STUB_SYMBOLS).unwrap_or_default(),
            },
            environment: Environment::Test,
            log_json: false,
        }
    }

    fn load_environment() -> DaemonResult<Environment> {
        let env_str = env::var("MTGATE_ENV").unwrap_or_else(|_| "development".to_string());

        match env_str.to_lowercase().as_str() {
            "test" => Ok(Environment::Test),
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(DaemonError::Config(format!(
                "Invalid MTGATE_ENV: {}. Expected: test, development, production",
                other
            ))),
        }
    }

    fn load_api_config() -> DaemonResult<ApiConfig> {
        let host = env::var("MTGATE_API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port_str = env::var("MTGATE_API_PORT").unwrap_or_else(|_| "5000".to_string());

        let port = port_str
            .parse::<u16>()
            .map_err(|_| DaemonError::Config(format!("Invalid MTGATE_API_PORT: {}", port_str)))?;

        Ok(ApiConfig { host, port })
    }

    fn load_venue_config(environment: Environment) -> DaemonResult<VenueConfig> {
        let default_kind = match environment {
            Environment::Production => "bridge",
            _ => "stub",
        };
        let kind_str = env::var("MTGATE_VENUE").unwrap_or_else(|_| default_kind.to_string());
        let kind = match kind_str.to_lowercase().as_str() {
            "stub" => VenueKind::Stub,
            "bridge" => VenueKind::Bridge,
            other => {
                return Err(DaemonError::Config(format!(
                    "Invalid MTGATE_VENUE: {}. Expected: stub, bridge",
                    other
                )))
            }
        };

        if environment == Environment::Production && kind == VenueKind::Stub {
            return Err(DaemonError::Config(
                "MTGATE_VENUE=stub is not allowed in production".to_string(),
            ));
        }

        let bridge_url = env::var("MTGATE_BRIDGE_URL").unwrap_or_else(|_| DEFAULT_BRIDGE_URL.to_string());
        let bridge_token = env::var("MTGATE_BRIDGE_TOKEN").ok().filter(|t| !t.is_empty());

        let timeout_str = env::var("MTGATE_BRIDGE_TIMEOUT_SECS").unwrap_or_else(|_| "10".to_string());
        let bridge_timeout_secs = timeout_str
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or_else(|| {
                DaemonError::Config(format!("Invalid MTGATE_BRIDGE_TIMEOUT_SECS: {}", timeout_str))
            })?;

        let symbols_str =
            env::var("MTGATE_STUB_SYMBOLS").unwrap_or_else(|_| DEFAULT_STUB_SYMBOLS.to_string());
        let stub_symbols = parse_stub_symbols(&symbols_str)?;

        Ok(VenueConfig {
            kind,
            bridge_url,
            bridge_token,
            bridge_timeout_secs,
            stub_symbols,
        })
    }
}

/// Parse `SYMBOL:bid:ask:point[,SYMBOL:bid:ask:point...]`.
pub fn parse_stub_symbols(value: &str) -> DaemonResult<Vec<StubSymbol>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let invalid = || DaemonError::Config(format!("Invalid MTGATE_STUB_SYMBOLS entry: {}", entry));
            let parts: Vec<&str> = entry.split(':').collect();
            let [symbol, bid, ask, point] = parts.as_slice() else {
                return Err(invalid());
            };
            let decimal = |s: &str| Decimal::from_str(s.trim()).map_err(|_| invalid());

            Ok(StubSymbol {
                symbol: symbol.trim().to_string(),
                bid: decimal(bid)?,
                ask: decimal(ask)?,
                point: decimal(point)?,
            })
        })
        .collect()
}

/// Crates whose `info` events are kept when `RUST_LOG` does not mention them.
pub const LOG_TARGETS: &[&str] = &["mtgated", "mtgate_exec", "mtgate_connectors"];

/// Add an `info` directive for every workspace crate to `base`.
pub fn log_filter(base: EnvFilter) -> Result<EnvFilter, ParseError> {
    LOG_TARGETS.iter().try_fold(base, |filter, target| -> Result<EnvFilter, ParseError> {
        Ok(filter.add_directive(format!("{}=info", target).parse()?))
    })
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                host: "0.0.0.0".to_string(),
                port: 5000,
            },
            venue: VenueConfig {
                kind: VenueKind::Stub,
                bridge_url: DEFAULT_BRIDGE_URL.to_string(),
                bridge_token: None,
                bridge_timeout_secs: 10,
                stub_symbols: Vec::new(),
            },
            environment: Environment::Development,
            log_json: false,
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Test => write!(f, "test"),
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}

impl std::fmt::Display for VenueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VenueKind::Stub => write!(f, "stub"),
            VenueKind::Bridge => write!(f, "bridge"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
