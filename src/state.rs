//! Session state management

use crate::display::mask_token;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::fmt;
use tokio::sync::watch;

/// Authenticated user session
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub authenticated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            authenticated_at: Utc::now(),
        }
    }
}

// Tokens end up in logs through `{:?}`, so only the masked form is printed.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &mask_token(&self.token))
            .field("authenticated_at", &self.authenticated_at)
            .finish()
    }
}

/// Coarse session status broadcast to observers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    LoggedOut,
    LoggedIn,
}

/// Holder of the single current session.
///
/// Shared behind an `Arc` by the client and anything that wants to watch
/// for logouts. Readers always see the latest token.
pub struct SessionState {
    current: RwLock<Option<Session>>,
    status_tx: watch::Sender<SessionStatus>,
}

impl SessionState {
    pub fn new() -> Self {
        let (status_tx, _) = watch::channel(SessionStatus::LoggedOut);
        Self {
            current: RwLock::new(None),
            status_tx,
        }
    }

    /// Check if a session is held
    pub fn is_authenticated(&self) -> bool {
        self.current.read().is_some()
    }

    pub fn status(&self) -> SessionStatus {
        if self.is_authenticated() {
            SessionStatus::LoggedIn
        } else {
            SessionStatus::LoggedOut
        }
    }

    /// Get current session
    pub fn current(&self) -> Option<Session> {
        self.current.read().clone()
    }

    /// Get current bearer token
    pub fn token(&self) -> Option<String> {
        self.current.read().as_ref().map(|s| s.token.clone())
    }

    /// Replace the held session
    pub fn begin(&self, session: Session) {
        *self.current.write() = Some(session);
        self.status_tx.send_replace(SessionStatus::LoggedIn);
    }

    /// Drop the held session, returns whether one was held
    pub fn end(&self) -> bool {
        let had_session = self.current.write().take().is_some();
        self.status_tx.send_replace(SessionStatus::LoggedOut);
        had_session
    }

    /// Drop the session only if it still carries `token`.
    ///
    /// A 401 for a request sent with an older token must not destroy a
    /// session created by a later login.
    pub fn end_if_current(&self, token: &str) -> bool {
        let mut current = self.current.write();
        match current.as_ref() {
            Some(session) if session.token == token => {
                *current = None;
                drop(current);
                self.status_tx.send_replace(SessionStatus::LoggedOut);
                true
            }
            _ => false,
        }
    }

    /// Watch session status transitions
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status_tx.subscribe()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
