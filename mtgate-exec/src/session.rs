//! Trading session management.
//!
//! One session per process. The session owns the venue handle; every
//! trading operation reaches the venue through an [`AuthenticatedSession`]
//! obtained from the manager.
//!
//! # Locking
//!
//! ```text
//! login / logout          → write lock (exclusive, flips the flag)
//! open / close / list     → read lock held for the whole operation
//! ```
//!
//! A logout therefore waits for in-flight trading calls to finish and can
//! never tear the connection down underneath one of them. Trading calls do
//! not block each other.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockReadGuard};
use tracing::{error, info, warn};

use mtgate_domain::{AccountId, LoginRequest};

use crate::error::{ExecError, ExecResult};
use crate::ports::VenuePort;

// =============================================================================
// Session State
// =============================================================================

#[derive(Debug, Clone)]
enum SessionState {
    LoggedOut,
    LoggedIn(ActiveSession),
}

#[derive(Debug, Clone)]
struct ActiveSession {
    account: AccountId,
    server: String,
    since: DateTime<Utc>,
}

/// Point-in-time view of the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub logged_in: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<AccountId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since: Option<DateTime<Utc>>,
}

// =============================================================================
// Session Manager
// =============================================================================

/// Owner of the process-wide trading session.
pub struct SessionManager<V: VenuePort> {
    venue: Arc<V>,
    state: RwLock<SessionState>,
}

impl<V: VenuePort> SessionManager<V> {
    /// Create a logged-out session over `venue`.
    pub fn new(venue: Arc<V>) -> Self {
        Self {
            venue,
            state: RwLock::new(SessionState::LoggedOut),
        }
    }

    /// Connect to the venue and authenticate.
    ///
    /// A login while already logged in re-authenticates, switching accounts.
    ///
    /// # Errors
    ///
    /// - `ExecError::Connection` if the venue connection cannot be initialized
    /// - `ExecError::Auth` if the venue rejects the credentials; the
    ///   connection is shut down again
    ///
    /// The session is logged out after either error.
    pub async fn login(&self, request: LoginRequest) -> ExecResult<()> {
        let mut state = self.state.write().await;
        let LoginRequest {
            account,
            credential,
            server,
        } = request;

        if let Err(fault) = self.venue.initialize().await {
            error!(%fault, "Venue initialize failed");
            *state = SessionState::LoggedOut;
            return Err(ExecError::Connection(fault));
        }

        if let Err(fault) = self.venue.login(account, &credential, &server).await {
            error!(%account, %server, %fault, "Failed to connect to account");
            if let Err(shutdown_fault) = self.venue.shutdown().await {
                warn!(fault = %shutdown_fault, "Venue shutdown after failed login also failed");
            }
            *state = SessionState::LoggedOut;
            return Err(ExecError::Auth(fault));
        }

        info!(%account, %server, "Logged in");
        *state = SessionState::LoggedIn(ActiveSession {
            account,
            server,
            since: Utc::now(),
        });
        Ok(())
    }

    /// Shut down the venue connection and end the session.
    ///
    /// # Errors
    ///
    /// `ExecError::NotLoggedIn` if there is no active session. No venue call
    /// is made in that case.
    pub async fn logout(&self) -> ExecResult<()> {
        let mut state = self.state.write().await;

        let SessionState::LoggedIn(active) = &*state else {
            return Err(ExecError::NotLoggedIn);
        };
        let account = active.account;

        if let Err(fault) = self.venue.shutdown().await {
            warn!(%account, %fault, "Venue shutdown failed during logout");
        }

        *state = SessionState::LoggedOut;
        info!(%account, "Logged out");
        Ok(())
    }

    /// Check that a session is active, without holding it.
    pub async fn require_authenticated(&self) -> ExecResult<()> {
        match &*self.state.read().await {
            SessionState::LoggedIn(_) => Ok(()),
            SessionState::LoggedOut => Err(ExecError::Unauthenticated),
        }
    }

    /// Acquire the active session for the duration of a trading operation.
    ///
    /// # Errors
    ///
    /// `ExecError::Unauthenticated` if logged out.
    pub async fn authenticated(&self) -> ExecResult<AuthenticatedSession<'_, V>> {
        let guard = self.state.read().await;
        let account = match &*guard {
            SessionState::LoggedIn(active) => active.account,
            SessionState::LoggedOut => return Err(ExecError::Unauthenticated),
        };

        Ok(AuthenticatedSession {
            _guard: guard,
            venue: self.venue.as_ref(),
            account,
        })
    }

    /// Current session snapshot.
    pub async fn status(&self) -> SessionStatus {
        match &*self.state.read().await {
            SessionState::LoggedOut => SessionStatus {
                logged_in: false,
                account: None,
                server: None,
                since: None,
            },
            SessionState::LoggedIn(active) => SessionStatus {
                logged_in: true,
                account: Some(active.account),
                server: Some(active.server.clone()),
                since: Some(active.since),
            },
        }
    }

    /// Process shutdown hook: end the session if one is active.
    pub async fn shutdown(&self) {
        match self.logout().await {
            Ok(()) => info!("Session closed on shutdown"),
            Err(ExecError::NotLoggedIn) => {}
            Err(e) => warn!(error = %e, "Session close on shutdown failed"),
        }
    }
}

// =============================================================================
// Authenticated Session
// =============================================================================

/// Proof of an active session, giving access to the venue.
///
/// Holds the session read lock; drop it as soon as the operation ends.
pub struct AuthenticatedSession<'a, V: VenuePort> {
    _guard: RwLockReadGuard<'a, SessionState>,
    venue: &'a V,
    account: AccountId,
}

impl<'a, V: VenuePort> AuthenticatedSession<'a, V> {
    /// Venue handle bound to this session.
    pub fn venue(&self) -> &'a V {
        self.venue
    }

    /// Logged-in account.
    pub fn account(&self) -> AccountId {
        self.account
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::{StubOp, StubVenue};
    use mtgate_domain::Credential;
    use std::time::Duration;

    fn login_request(login: u64, password: &str) -> LoginRequest {
        LoginRequest {
            account: AccountId::new(login),
            credential: Credential::new(password),
            server: "Demo".to_string(),
        }
    }

    fn manager() -> (Arc<StubVenue>, SessionManager<StubVenue>) {
        let venue = Arc::new(StubVenue::new());
        venue.add_account(7, "pw", "Demo");
        let manager = SessionManager::new(venue.clone());
        (venue, manager)
    }

    #[tokio::test]
    async fn test_starts_logged_out() {
        let (_, manager) = manager();

        assert!(matches!(
            manager.require_authenticated().await,
            Err(ExecError::Unauthenticated)
        ));
        assert!(!manager.status().await.logged_in);
    }

    #[tokio::test]
    async fn test_login_success() {
        let (venue, manager) = manager();

        manager.login(login_request(7, "pw")).await.unwrap();

        manager.require_authenticated().await.unwrap();
        let status = manager.status().await;
        assert!(status.logged_in);
        assert_eq!(status.account, Some(AccountId::new(7)));
        assert_eq!(status.server.as_deref(), Some("Demo"));
        assert_eq!(venue.calls(), vec![StubOp::Initialize, StubOp::Login]);
    }

    #[tokio::test]
    async fn test_initialize_failure_is_connection_error() {
        let (venue, manager) = manager();
        venue.fail(StubOp::Initialize);

        let err = manager.login(login_request(7, "pw")).await.unwrap_err();

        assert!(matches!(err, ExecError::Connection(_)));
        assert!(manager.require_authenticated().await.is_err());
        assert_eq!(venue.calls(), vec![StubOp::Initialize]);
    }

    #[tokio::test]
    async fn test_auth_failure_shuts_down_connection() {
        let (venue, manager) = manager();

        let err = manager.login(login_request(7, "bad")).await.unwrap_err();

        assert!(matches!(err, ExecError::Auth(_)));
        assert!(!venue.is_initialized());
        assert_eq!(
            venue.calls(),
            vec![StubOp::Initialize, StubOp::Login, StubOp::Shutdown]
        );
        assert!(manager.require_authenticated().await.is_err());
    }

    #[tokio::test]
    async fn test_failed_relogin_drops_existing_session() {
        let (_, manager) = manager();
        manager.login(login_request(7, "pw")).await.unwrap();

        assert!(manager.login(login_request(7, "bad")).await.is_err());
        assert!(!manager.status().await.logged_in);
    }

    #[tokio::test]
    async fn test_logout() {
        let (venue, manager) = manager();
        manager.login(login_request(7, "pw")).await.unwrap();

        manager.logout().await.unwrap();

        assert!(manager.require_authenticated().await.is_err());
        assert!(!venue.is_initialized());
    }

    #[tokio::test]
    async fn test_logout_when_logged_out_makes_no_venue_call() {
        let (venue, manager) = manager();

        let err = manager.logout().await.unwrap_err();

        assert!(matches!(err, ExecError::NotLoggedIn));
        assert!(venue.calls().is_empty());
    }

    #[tokio::test]
    async fn test_logout_waits_for_in_flight_operation() {
        let (venue, manager) = manager();
        let manager = Arc::new(manager);
        manager.login(login_request(7, "pw")).await.unwrap();

        let session = manager.authenticated().await.unwrap();
        let logout = tokio::spawn({
            let manager = manager.clone();
            async move { manager.logout().await }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!logout.is_finished());
        assert!(session.venue().is_initialized());

        drop(session);
        logout.await.unwrap().unwrap();
        assert!(!venue.is_initialized());
    }

    #[tokio::test]
    async fn test_shutdown_is_quiet_when_logged_out() {
        let (venue, manager) = manager();

        manager.shutdown().await;

        assert!(venue.calls().is_empty());
    }
}
