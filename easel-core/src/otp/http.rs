//! OTP gateway backed by the academy REST API

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use super::{OtpGateway, OtpReply, validate_email, validate_otp};
use crate::config::SessionConfig;
use crate::error::{ConfigError, OtpError};

/// `{success, message?}` envelope every OTP endpoint returns
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
}

/// HTTP implementation of [`OtpGateway`]
pub struct HttpOtpGateway {
    client: reqwest::Client,
    request_url: Url,
    verify_url: Url,
    reset_url: Url,
}

impl HttpOtpGateway {
    /// Build from config; requires `otp.base_url` or `auth.base_url`
    pub fn new(config: &SessionConfig) -> Result<Self, ConfigError> {
        let base = config
            .otp_base_url()
            .ok_or_else(|| ConfigError::Invalid("no base URL for OTP requests".to_string()))?;
        let join = |path: &str| {
            base.join(path)
                .map_err(|e| ConfigError::Invalid(format!("invalid OTP path {:?}: {}", path, e)))
        };
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.otp.request_timeout_secs))
            .build()
            .map_err(|e| ConfigError::Invalid(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            request_url: join(&config.otp.request_path)?,
            verify_url: join(&config.otp.verify_path)?,
            reset_url: join(&config.otp.reset_path)?,
        })
    }

    async fn post(&self, url: &Url, body: serde_json::Value) -> Result<OtpReply, OtpError> {
        tracing::debug!(url = %url, "sending OTP request");

        let response = self
            .client
            .post(url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| OtpError::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| OtpError::Network(e.to_string()))?;

        let envelope: Envelope = match serde_json::from_str(&text) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(OtpError::Rejected(format!(
                    "Request failed (HTTP {})",
                    status.as_u16()
                )));
            }
            Err(e) => return Err(OtpError::MalformedResponse(e.to_string())),
        };

        if status.is_success() && envelope.success {
            Ok(OtpReply {
                message: envelope.message,
            })
        } else {
            Err(OtpError::Rejected(envelope.message.unwrap_or_else(|| {
                format!("Request failed (HTTP {})", status.as_u16())
            })))
        }
    }
}

#[async_trait]
impl OtpGateway for HttpOtpGateway {
    async fn request_otp(&self, email: &str) -> Result<OtpReply, OtpError> {
        validate_email(email)?;
        self.post(&self.request_url, json!({ "email": email.trim() }))
            .await
    }

    async fn verify_otp(&self, email: &str, otp: &str) -> Result<OtpReply, OtpError> {
        validate_email(email)?;
        validate_otp(otp)?;
        self.post(
            &self.verify_url,
            json!({ "email": email.trim(), "otp": otp.trim() }),
        )
        .await
    }

    async fn reset_password(
        &self,
        email: &str,
        otp: &str,
        new_password: &str,
    ) -> Result<OtpReply, OtpError> {
        validate_email(email)?;
        validate_otp(otp)?;
        if new_password.is_empty() {
            return Err(OtpError::Validation("New password is required".to_string()));
        }
        self.post(
            &self.reset_url,
            json!({ "email": email.trim(), "otp": otp.trim(), "newPassword": new_password }),
        )
        .await
    }
}
