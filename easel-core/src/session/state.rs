//! Session snapshot and the per-tab state machine

use std::fmt;

use serde::Serialize;

use super::{Identity, SessionKind};

/// Where a store is in its lifecycle
///
/// ```text
/// Unknown ──bootstrap──▶ Anonymous ◀──logout── AuthenticatedAdmin
///                          │   ▲                      ▲
///                          │   └──logout── AuthenticatedStudent
///                          ├──login──────────────────┘      ▲
///                          └──student_login─────────────────┘
/// ```
///
/// Storage changes from other tabs can move between any two of the
/// resolved states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Storage has not been read yet
    Unknown,
    Anonymous,
    AuthenticatedAdmin,
    AuthenticatedStudent,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Unknown => write!(f, "unknown"),
            SessionState::Anonymous => write!(f, "anonymous"),
            SessionState::AuthenticatedAdmin => write!(f, "authenticated (admin)"),
            SessionState::AuthenticatedStudent => write!(f, "authenticated (student)"),
        }
    }
}

/// Snapshot of the session as seen by route guards and UI
///
/// Only [`Session::signed_in`] can produce a session with an identity,
/// and it only accepts identities that passed validation, so
/// `authenticated()` implies a non-empty email.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Session {
    identity: Option<Identity>,
    kind: Option<SessionKind>,
    loading: bool,
    resolved: bool,
}

impl Session {
    /// Pre-bootstrap session
    pub fn unknown() -> Self {
        Self::default()
    }

    /// Resolved, nobody logged in
    pub fn anonymous() -> Self {
        Self {
            resolved: true,
            ..Self::default()
        }
    }

    /// Resolved with a validated identity; falls back to anonymous otherwise
    pub fn signed_in(kind: SessionKind, identity: Identity) -> Self {
        if !identity.is_valid() {
            return Self::anonymous();
        }
        Self {
            identity: Some(identity),
            kind: Some(kind),
            loading: false,
            resolved: true,
        }
    }

    pub(crate) fn with_loading(mut self, loading: bool) -> Self {
        self.loading = loading;
        self
    }

    pub(crate) fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn kind(&self) -> Option<SessionKind> {
        self.kind
    }

    pub fn authenticated(&self) -> bool {
        self.identity.is_some()
    }

    /// True while a remote login is in flight
    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn is_student(&self) -> bool {
        self.kind == Some(SessionKind::Student)
    }

    pub fn is_admin(&self) -> bool {
        self.kind == Some(SessionKind::Admin)
    }

    pub fn state(&self) -> SessionState {
        match (self.resolved, self.kind) {
            (false, _) => SessionState::Unknown,
            (true, None) => SessionState::Anonymous,
            (true, Some(SessionKind::Admin)) => SessionState::AuthenticatedAdmin,
            (true, Some(SessionKind::Student)) => SessionState::AuthenticatedStudent,
        }
    }
}
