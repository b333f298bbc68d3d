//! Configuration for the session store and its remote collaborators

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ConfigError;
use crate::session::{AppProfile, SessionKind};

/// Default admin login for the demo backend
pub const DEFAULT_DEMO_EMAIL: &str = "admin@123gmail.com";

/// Default admin password for the demo backend
pub const DEFAULT_DEMO_PASSWORD: &str = "admin123";

/// Top-level session configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Which application this store serves
    #[serde(default)]
    pub profile: AppProfile,

    /// Storage key names
    #[serde(default)]
    pub keys: StorageKeys,

    /// Admin login backend
    #[serde(default)]
    pub auth: AuthConfig,

    /// One-time-password endpoints
    #[serde(default)]
    pub otp: OtpConfig,
}

impl SessionConfig {
    /// Parse from TOML
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Check that the enabled features have what they need
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.keys.validate()?;
        if self.auth.mode == AuthMode::Remote && self.auth.base_url.is_none() {
            return Err(ConfigError::Invalid(
                "auth.base_url is required when auth.mode = \"remote\"".to_string(),
            ));
        }
        if self.otp.enabled && self.otp_base_url().is_none() {
            return Err(ConfigError::Invalid(
                "otp.base_url or auth.base_url is required when otp is enabled".to_string(),
            ));
        }
        Ok(())
    }

    /// Check if the config is valid
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Base URL for OTP requests, falling back to the auth base URL
    pub fn otp_base_url(&self) -> Option<&Url> {
        self.otp.base_url.as_ref().or(self.auth.base_url.as_ref())
    }
}

/// Storage keys for the persisted session
///
/// The separation matters: route guards and the cross-tab listener match
/// on these exact names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageKeys {
    #[serde(default = "default_admin_key")]
    pub admin: String,

    #[serde(default = "default_student_key")]
    pub student: String,

    #[serde(default = "default_token_key")]
    pub token: String,
}

fn default_admin_key() -> String {
    "adminUser".to_string()
}

fn default_student_key() -> String {
    "studentUser".to_string()
}

fn default_token_key() -> String {
    "token".to_string()
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            admin: default_admin_key(),
            student: default_student_key(),
            token: default_token_key(),
        }
    }
}

impl StorageKeys {
    /// Identity key for a role
    pub fn identity_key(&self, kind: SessionKind) -> &str {
        match kind {
            SessionKind::Admin => &self.admin,
            SessionKind::Student => &self.student,
        }
    }

    /// Every key the session store owns
    pub fn all(&self) -> [&str; 3] {
        [&self.admin, &self.student, &self.token]
    }

    /// Returns true if the store owns `key`
    pub fn contains(&self, key: &str) -> bool {
        self.all().contains(&key)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let [admin, student, token] = self.all();
        if admin.is_empty() || student.is_empty() || token.is_empty() {
            return Err(ConfigError::Invalid("storage keys must not be empty".to_string()));
        }
        if admin == student || admin == token || student == token {
            return Err(ConfigError::Invalid("storage keys must be distinct".to_string()));
        }
        Ok(())
    }
}

/// How admin credentials are checked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// Compare against the configured demo pair
    #[default]
    Demo,
    /// POST to the remote login endpoint
    Remote,
}

/// Admin login configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub mode: AuthMode,

    /// Backend base URL (e.g. "https://api.academy.example")
    #[serde(default)]
    pub base_url: Option<Url>,

    #[serde(default = "default_login_path")]
    pub login_path: String,

    /// Entry in the response `roles` array that marks an administrator
    #[serde(default = "default_admin_role_marker")]
    pub admin_role_marker: String,

    #[serde(default = "default_demo_email")]
    pub demo_email: String,

    #[serde(default = "default_demo_password")]
    pub demo_password: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Clock skew leeway in seconds for token expiry checks
    #[serde(default = "default_token_leeway")]
    pub token_leeway_secs: u64,
}

fn default_login_path() -> String {
    "/api/auth/login".to_string()
}

fn default_admin_role_marker() -> String {
    "ROLE_ADMIN".to_string()
}

fn default_demo_email() -> String {
    DEFAULT_DEMO_EMAIL.to_string()
}

fn default_demo_password() -> String {
    DEFAULT_DEMO_PASSWORD.to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_token_leeway() -> u64 {
    60
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            mode: AuthMode::default(),
            base_url: None,
            login_path: default_login_path(),
            admin_role_marker: default_admin_role_marker(),
            demo_email: default_demo_email(),
            demo_password: default_demo_password(),
            request_timeout_secs: default_request_timeout(),
            token_leeway_secs: default_token_leeway(),
        }
    }
}

impl AuthConfig {
    /// Remote-mode config pointing at `base_url`
    pub fn remote(base_url: Url) -> Self {
        Self {
            mode: AuthMode::Remote,
            base_url: Some(base_url),
            ..Self::default()
        }
    }
}

/// OTP endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Overrides `auth.base_url` for OTP requests
    #[serde(default)]
    pub base_url: Option<Url>,

    #[serde(default = "default_request_path")]
    pub request_path: String,

    #[serde(default = "default_verify_path")]
    pub verify_path: String,

    #[serde(default = "default_reset_path")]
    pub reset_path: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_request_path() -> String {
    "/api/otp/request".to_string()
}

fn default_verify_path() -> String {
    "/api/otp/verify".to_string()
}

fn default_reset_path() -> String {
    "/api/otp/reset-password".to_string()
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: None,
            request_path: default_request_path(),
            verify_path: default_verify_path(),
            reset_path: default_reset_path(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}
