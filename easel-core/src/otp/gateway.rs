//! OtpGateway trait and local input validation

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::OtpError;

/// Accepted OTP lengths
const OTP_DIGITS: std::ops::RangeInclusive<usize> = 4..=8;

/// Successful OTP reply
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct OtpReply {
    /// Optional message for the user ("OTP sent to ...")
    #[serde(default)]
    pub message: Option<String>,
}

/// Remote OTP operations
#[async_trait]
pub trait OtpGateway: Send + Sync {
    /// Ask the backend to send a code to `email`
    async fn request_otp(&self, email: &str) -> Result<OtpReply, OtpError>;

    /// Check a code the user typed
    async fn verify_otp(&self, email: &str, otp: &str) -> Result<OtpReply, OtpError>;

    /// Set a new password, authorized by a code
    async fn reset_password(
        &self,
        email: &str,
        otp: &str,
        new_password: &str,
    ) -> Result<OtpReply, OtpError>;
}

/// Reject obviously malformed email addresses before any request
pub fn validate_email(email: &str) -> Result<(), OtpError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(OtpError::Validation("Email is required".to_string()));
    }

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(OtpError::Validation("Please enter a valid email address".to_string()))
    }
}

/// OTPs are short numeric codes
pub fn validate_otp(otp: &str) -> Result<(), OtpError> {
    let otp = otp.trim();
    if OTP_DIGITS.contains(&otp.len()) && otp.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(OtpError::Validation(
            "OTP must be a 4 to 8 digit code".to_string(),
        ))
    }
}
