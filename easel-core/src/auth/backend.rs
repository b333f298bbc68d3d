//! AuthBackend trait and the demo backend

use async_trait::async_trait;
use serde::Deserialize;

use super::AuthError;
use crate::config::AuthConfig;
use crate::session::Identity;

/// Email/password pair submitted by the login form
#[derive(Clone, Default, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Both fields must be present before any backend is asked
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.email.trim().is_empty() {
            return Err(AuthError::email_required());
        }
        if self.password.is_empty() {
            return Err(AuthError::Validation("Password is required".to_string()));
        }
        Ok(())
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

/// Result of a successful authentication
#[derive(Debug, Clone, PartialEq)]
pub struct LoginGrant {
    pub identity: Identity,
    /// Bearer token, when the backend issues one
    pub token: Option<String>,
}

/// Verifies admin credentials
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Check credentials and return the identity to store
    async fn authenticate(&self, credentials: &Credentials) -> Result<LoginGrant, AuthError>;
}

/// Checks credentials against a single configured pair; issues no token
#[derive(Debug, Clone)]
pub struct DemoAuthBackend {
    email: String,
    password: String,
}

impl DemoAuthBackend {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.demo_email.clone(), config.demo_password.clone())
    }
}

#[async_trait]
impl AuthBackend for DemoAuthBackend {
    async fn authenticate(&self, credentials: &Credentials) -> Result<LoginGrant, AuthError> {
        if credentials.email != self.email || credentials.password != self.password {
            return Err(AuthError::InvalidCredentials);
        }

        let identity = Identity::new(credentials.email.clone())
            .with_id("1")
            .with_role("admin");

        Ok(LoginGrant {
            identity,
            token: None,
        })
    }
}
