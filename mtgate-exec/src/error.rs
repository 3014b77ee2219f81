//! Gateway error types.

use mtgate_domain::DomainError;
use thiserror::Error;

use crate::ports::VenueFault;

/// Errors that can occur during session and trading operations.
#[derive(Debug, Error)]
pub enum ExecError {
    /// Terminal connection could not be initialized
    #[error("Venue connection failed: {0}")]
    Connection(VenueFault),

    /// Terminal rejected the account credentials
    #[error("Login failed: {0}")]
    Auth(VenueFault),

    /// Logout requested without an active session
    #[error("No active session")]
    NotLoggedIn,

    /// Trading operation attempted without an active session
    #[error("Not logged in")]
    Unauthenticated,

    /// Request body is missing fields or a field does not parse
    #[error("{0}")]
    MalformedRequest(String),

    /// Terminal has no tick or contract data for the symbol
    #[error("Symbol {symbol} not found")]
    SymbolNotFound {
        symbol: String,
        fault: Option<VenueFault>,
    },

    /// Computed stop-loss / take-profit levels are not tradable
    #[error("Invalid SL or TP values: {0}")]
    InvalidStops(String),

    /// Terminal returned no result for an order submission
    #[error("Order send failed, no result returned")]
    Submission(Option<VenueFault>),

    /// Terminal returned a non-success code
    #[error("Trade failed: Error Code: {code}, Comment: {comment}")]
    TradeRejected { code: u32, comment: String },

    /// Open positions could not be listed
    #[error("Failed to retrieve positions: {0}")]
    Retrieval(VenueFault),

    /// Anything else
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl From<DomainError> for ExecError {
    fn from(error: DomainError) -> Self {
        match error {
            DomainError::MalformedRequest(msg) => ExecError::MalformedRequest(msg),
            DomainError::InvalidVolume(msg) | DomainError::InvalidSymbol(msg) => {
                ExecError::MalformedRequest(msg)
            }
            DomainError::InvalidStops(msg) | DomainError::InvalidPrice(msg) => {
                ExecError::InvalidStops(msg)
            }
        }
    }
}

impl ExecError {
    /// Venue-provided detail, if the error carries one.
    pub fn venue_detail(&self) -> Option<String> {
        match self {
            ExecError::Connection(fault) | ExecError::Auth(fault) | ExecError::Retrieval(fault) => {
                Some(fault.to_string())
            }
            ExecError::SymbolNotFound { fault, .. } | ExecError::Submission(fault) => {
                fault.as_ref().map(|f| f.to_string())
            }
            ExecError::TradeRejected { code, comment } => {
                Some(format!("Error Code: {}, Comment: {}", code, comment))
            }
            _ => None,
        }
    }
}

/// Result type for gateway operations.
pub type ExecResult<T> = Result<T, ExecError>;

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_map_to_gateway_kinds() {
        let err: ExecError = DomainError::MalformedRequest("Missing trade parameters".into()).into();
        assert!(matches!(err, ExecError::MalformedRequest(ref m) if m == "Missing trade parameters"));

        let err: ExecError = DomainError::InvalidVolume("Volume must be positive".into()).into();
        assert!(matches!(err, ExecError::MalformedRequest(_)));

        let err: ExecError = DomainError::InvalidStops("sl above entry".into()).into();
        assert!(matches!(err, ExecError::InvalidStops(_)));
    }

    #[test]
    fn test_venue_detail() {
        let err = ExecError::TradeRejected {
            code: 10019,
            comment: "No money".to_string(),
        };
        assert_eq!(err.venue_detail().unwrap(), "Error Code: 10019, Comment: No money");

        let err = ExecError::Auth(VenueFault::new(-6, "Authorization failed"));
        assert_eq!(err.venue_detail().unwrap(), "(-6, 'Authorization failed')");

        assert!(ExecError::Unauthenticated.venue_detail().is_none());
        assert!(ExecError::Submission(None).venue_detail().is_none());
    }
}
