//! Authentication error types

use thiserror::Error;

use crate::error::StorageError;
use crate::session::SessionKind;

/// Errors returned by the login operations
///
/// The `Display` text is the message shown to the user.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Email/password pair was not accepted
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Input failed local validation (missing or malformed field)
    #[error("{0}")]
    Validation(String),

    /// The login endpoint answered with a non-success status
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// The login endpoint could not be reached
    #[error("network error: {0}")]
    Network(String),

    /// The login endpoint answered with something we could not read
    #[error("malformed server response: {0}")]
    MalformedResponse(String),

    /// The application profile does not model this role
    #[error("{0} sessions are not supported by this application")]
    UnsupportedRole(SessionKind),

    /// The session could not be persisted
    #[error("failed to save session: {0}")]
    Storage(#[from] StorageError),
}

impl AuthError {
    pub(crate) fn email_required() -> Self {
        AuthError::Validation("Email is required".to_string())
    }
}
