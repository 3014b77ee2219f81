//! Terminal Account Credentials
//!
//! The gateway holds at most one set of credentials, and only for the
//! duration of a login call.
//!
//! # Security Model
//!
//! - Passwords live in `zeroize::Zeroizing` buffers, wiped on drop
//! - `Debug` output never contains the password
//! - Nothing here is serializable

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::value_objects::DomainError;

// =============================================================================
// Account Id
// =============================================================================

/// Terminal account login number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(u64);

impl AccountId {
    /// Wrap a raw account number.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Parse an account number from its decimal text form.
    ///
    /// # Errors
    /// Returns `DomainError::MalformedRequest` if the text is not an unsigned integer.
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        value
            .trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|_| DomainError::MalformedRequest(format!("Invalid login: {}", value)))
    }

    /// Get the raw account number.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Credential
// =============================================================================

/// Account password (in-memory only, never persisted).
///
/// Should never be logged. The buffer is zeroized when dropped.
pub struct Credential(zeroize::Zeroizing<String>);

impl Credential {
    /// Wrap a plaintext password.
    pub fn new(secret: impl Into<String>) -> Self {
        Self(zeroize::Zeroizing::new(secret.into()))
    }

    /// Expose the plaintext for the single call that needs it.
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

// =============================================================================
// Login Request
// =============================================================================

/// Validated login request.
#[derive(Debug)]
pub struct LoginRequest {
    /// Account to authenticate
    pub account: AccountId,
    /// Account password
    pub credential: Credential,
    /// Broker trade server name (e.g., "MetaQuotes-Demo")
    pub server: String,
}

// =============================================================================
// Tests
// =============================================================================
