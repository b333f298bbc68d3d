//! Error types for easel-core

use thiserror::Error;

use crate::auth::AuthError;

/// Top-level error type for easel-core
#[derive(Error, Debug)]
pub enum EaselError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("OTP error: {0}")]
    Otp(#[from] OtpError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors raised by persisted key/value storage
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("storage quota exceeded while writing {0}")]
    QuotaExceeded(String),

    #[error("value for {key} was not persisted after {attempts} attempts")]
    NotPersisted { key: String, attempts: u32 },

    #[error("failed to watch storage: {0}")]
    Watch(#[from] notify::Error),
}

/// Errors from the one-time-password flows
#[derive(Error, Debug)]
pub enum OtpError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Rejected(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("malformed server response: {0}")]
    MalformedResponse(String),

    #[error("OTP service is not configured")]
    Unavailable,
}

/// Errors in session configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}
