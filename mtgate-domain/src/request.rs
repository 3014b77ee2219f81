//! Loosely-typed request bodies and their parsing into domain requests.
//!
//! Clients send numbers either as JSON numbers or as strings, and treat any
//! falsy value (`null`, `""`, `0`, `false`, empty array/object) as "not
//! provided". Bodies are therefore deserialized into `serde_json::Value`
//! fields first and converted here, independent of the HTTP layer.

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::str::FromStr;

use crate::credentials::{AccountId, Credential, LoginRequest};
use crate::entities::TradeRequest;
use crate::value_objects::{DomainError, OrderSide, Symbol, Volume};

/// Error message for a login body lacking any of its fields.
pub const MISSING_LOGIN_FIELDS: &str = "Missing login, password, or server information";
/// Error message for a trade body lacking any of its fields.
pub const MISSING_TRADE_FIELDS: &str = "Missing trade parameters";
/// Error message for unparsable numeric trade fields.
pub const INVALID_NUMBER_FORMAT: &str = "Invalid volume, take_profit, or stop_loss format";

// =============================================================================
// Login
// =============================================================================

/// Raw `POST /login` body.
#[derive(Debug, Default, Deserialize)]
pub struct LoginBody {
    /// Account number, as a JSON number or numeric string
    #[serde(default)]
    pub login: Value,
    /// Account password
    #[serde(default)]
    pub password: Value,
    /// Trade server name
    #[serde(default)]
    pub server: Value,
}

impl LoginBody {
    /// Validate presence and types of every field.
    ///
    /// # Errors
    /// Returns `DomainError::MalformedRequest` with [`MISSING_LOGIN_FIELDS`]
    /// when a field is falsy, or a field-specific message when it has the
    /// wrong type.
    pub fn parse(self) -> Result<LoginRequest, DomainError> {
        if is_falsy(&self.login) || is_falsy(&self.password) || is_falsy(&self.server) {
            return Err(DomainError::MalformedRequest(MISSING_LOGIN_FIELDS.to_string()));
        }

        let account = match &self.login {
            Value::Number(n) => n
                .as_u64()
                .map(AccountId::new)
                .ok_or_else(|| DomainError::MalformedRequest(format!("Invalid login: {}", n)))?,
            Value::String(s) => AccountId::parse(s)?,
            other => {
                return Err(DomainError::MalformedRequest(format!("Invalid login: {}", other)))
            }
        };

        let credential = match self.password {
            Value::String(s) => Credential::new(s),
            _ => {
                return Err(DomainError::MalformedRequest(
                    "Password must be a string".to_string(),
                ))
            }
        };

        let server = match self.server {
            Value::String(s) => s,
            _ => {
                return Err(DomainError::MalformedRequest(
                    "Server must be a string".to_string(),
                ))
            }
        };

        Ok(LoginRequest {
            account,
            credential,
            server,
        })
    }
}

// =============================================================================
// Open Trade
// =============================================================================

/// Raw `POST /open_trade` body.
#[derive(Debug, Default, Deserialize)]
pub struct OpenTradeBody {
    /// Terminal symbol name
    #[serde(default)]
    pub symbol: Value,
    /// Lot size
    #[serde(default)]
    pub volume: Value,
    /// Take-profit distance in points
    #[serde(default)]
    pub take_profit: Value,
    /// Stop-loss distance in points
    #[serde(default)]
    pub stop_loss: Value,
    /// `BUY` or `SELL`
    #[serde(default, rename = "type")]
    pub trade_type: Value,
}

impl OpenTradeBody {
    /// Validate presence, numeric format and side of the trade fields.
    ///
    /// Presence is checked for all fields before any is parsed, so a body
    /// with both a missing field and a bad number reports the missing field.
    ///
    /// # Errors
    /// Returns `DomainError::MalformedRequest`.
    pub fn parse(self) -> Result<TradeRequest, DomainError> {
        let fields = [
            &self.symbol,
            &self.volume,
            &self.take_profit,
            &self.stop_loss,
            &self.trade_type,
        ];
        if fields.iter().any(|v| is_falsy(v)) {
            return Err(DomainError::MalformedRequest(MISSING_TRADE_FIELDS.to_string()));
        }

        let invalid_number = || DomainError::MalformedRequest(INVALID_NUMBER_FORMAT.to_string());
        let volume = parse_decimal(&self.volume).ok_or_else(invalid_number)?;
        let take_profit = parse_decimal(&self.take_profit).ok_or_else(invalid_number)?;
        let stop_loss = parse_decimal(&self.stop_loss).ok_or_else(invalid_number)?;

        let symbol = match &self.symbol {
            Value::String(s) => Symbol::new(s)?,
            other => return Err(DomainError::InvalidSymbol(other.to_string())),
        };

        let side = match &self.trade_type {
            Value::String(s) => OrderSide::parse(s)?,
            other => OrderSide::parse(&other.to_string())?,
        };

        Ok(TradeRequest {
            symbol,
            volume: Volume::new(volume)?,
            stop_loss,
            take_profit,
            side,
        })
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Whether a JSON value counts as "not provided".
pub fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f == 0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// Parse a JSON number or numeric string into a `Decimal`.
///
/// Accepts plain (`"0.1"`) and scientific (`"1e-5"`) notation.
pub fn parse_decimal(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };

    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn trade_body(value: Value) -> OpenTradeBody {
        serde_json::from_value(value).unwrap()
    }

    fn login_body(value: Value) -> LoginBody {
        serde_json::from_value(value).unwrap()
    }

    fn malformed_message(err: DomainError) -> String {
        match err {
            DomainError::MalformedRequest(msg) => msg,
            other => panic!("expected MalformedRequest, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_trade_numbers_and_strings() {
        let req = trade_body(json!({
            "symbol": "EURUSD",
            "volume": 0.1,
            "stop_loss": "50",
            "take_profit": 100,
            "type": "BUY"
        }))
        .parse()
        .unwrap();

        assert_eq!(req.symbol.as_str(), "EURUSD");
        assert_eq!(req.volume.as_decimal(), dec!(0.1));
        assert_eq!(req.stop_loss, dec!(50));
        assert_eq!(req.take_profit, dec!(100));
        assert_eq!(req.side, OrderSide::Buy);
    }

    #[test]
    fn test_parse_trade_missing_field() {
        let err = trade_body(json!({
            "symbol": "EURUSD",
            "volume": 0.1,
            "take_profit": 100,
            "type": "SELL"
        }))
        .parse()
        .unwrap_err();

        assert_eq!(malformed_message(err), MISSING_TRADE_FIELDS);
    }

    #[test]
    fn test_parse_trade_zero_counts_as_missing() {
        let err = trade_body(json!({
            "symbol": "EURUSD",
            "volume": 0.1,
            "stop_loss": 0,
            "take_profit": 100,
            "type": "BUY"
        }))
        .parse()
        .unwrap_err();

        assert_eq!(malformed_message(err), MISSING_TRADE_FIELDS);
    }

    #[test]
    fn test_parse_trade_bad_number() {
        let err = trade_body(json!({
            "symbol": "EURUSD",
            "volume": "lots",
            "stop_loss": 50,
            "take_profit": 100,
            "type": "BUY"
        }))
        .parse()
        .unwrap_err();

        assert_eq!(malformed_message(err), INVALID_NUMBER_FORMAT);
    }

    #[test]
    fn test_parse_trade_negative_stop_distance_allowed() {
        let req = trade_body(json!({
            "symbol": "EURUSD",
            "volume": "0.5",
            "stop_loss": -10,
            "take_profit": 100,
            "type": "BUY"
        }))
        .parse()
        .unwrap();

        assert_eq!(req.stop_loss, dec!(-10));
    }

    #[test]
    fn test_parse_trade_negative_volume_rejected() {
        let err = trade_body(json!({
            "symbol": "EURUSD",
            "volume": -1,
            "stop_loss": 50,
            "take_profit": 100,
            "type": "BUY"
        }))
        .parse()
        .unwrap_err();

        assert!(matches!(err, DomainError::InvalidVolume(_)));
    }

    #[test]
    fn test_parse_trade_unknown_side() {
        let err = trade_body(json!({
            "symbol": "EURUSD",
            "volume": 1,
            "stop_loss": 50,
            "take_profit": 100,
            "type": "HOLD"
        }))
        .parse()
        .unwrap_err();

        assert!(malformed_message(err).contains("HOLD"));
    }

    #[test]
    fn test_parse_login() {
        let req = login_body(json!({
            "login": 5012345,
            "password": "pw",
            "server": "MetaQuotes-Demo"
        }))
        .parse()
        .unwrap();

        assert_eq!(req.account.as_u64(), 5012345);
        assert_eq!(req.credential.expose(), "pw");
        assert_eq!(req.server, "MetaQuotes-Demo");

        let req = login_body(json!({"login": "77", "password": "pw", "server": "S"}))
            .parse()
            .unwrap();
        assert_eq!(req.account.as_u64(), 77);
    }

    #[test]
    fn test_parse_login_missing_fields() {
        for body in [
            json!({"password": "pw", "server": "S"}),
            json!({"login": 1, "server": "S"}),
            json!({"login": 1, "password": "pw"}),
            json!({"login": 1, "password": "", "server": "S"}),
        ] {
            let err = login_body(body).parse().unwrap_err();
            assert_eq!(malformed_message(err), MISSING_LOGIN_FIELDS);
        }
    }

    #[test]
    fn test_parse_login_invalid_account() {
        let err = login_body(json!({"login": "abc", "password": "pw", "server": "S"}))
            .parse()
            .unwrap_err();

        assert!(malformed_message(err).starts_with("Invalid login"));
    }

    #[test]
    fn test_parse_decimal_forms() {
        assert_eq!(parse_decimal(&json!(0.1)), Some(dec!(0.1)));
        assert_eq!(parse_decimal(&json!(" 2.5 ")), Some(dec!(2.5)));
        assert_eq!(parse_decimal(&json!("1e-2")), Some(dec!(0.01)));
        assert_eq!(parse_decimal(&json!(true)), None);
        assert_eq!(parse_decimal(&json!("abc")), None);
    }

    #[test]
    fn test_is_falsy() {
        assert!(is_falsy(&Value::Null));
        assert!(is_falsy(&json!(0)));
        assert!(is_falsy(&json!(0.0)));
        assert!(is_falsy(&json!("")));
        assert!(!is_falsy(&json!("0")));
        assert!(!is_falsy(&json!(-1)));
    }
}
