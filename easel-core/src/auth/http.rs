//! Remote login against the academy backend

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use super::{AuthBackend, AuthError, Credentials, LoginGrant};
use crate::config::AuthConfig;
use crate::error::ConfigError;
use crate::session::Identity;
use crate::session::identity::string_or_number;

/// Role label stored for users carrying the admin role marker
const ADMIN_ROLE: &str = "admin";

/// Role label stored for everyone else
const USER_ROLE: &str = "user";

/// Login response body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    #[serde(default, alias = "token", alias = "access_token")]
    access_token: Option<String>,
    #[serde(default, alias = "userId", deserialize_with = "string_or_number")]
    id: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    roles: Vec<String>,
}

/// Error body the backend sends with non-2xx responses
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// POSTs `{email, password}` to the configured login endpoint
pub struct HttpAuthBackend {
    client: reqwest::Client,
    login_url: Url,
    admin_role_marker: String,
}

impl HttpAuthBackend {
    /// Build from config; requires `auth.base_url`
    pub fn new(config: &AuthConfig) -> Result<Self, ConfigError> {
        let base = config
            .base_url
            .as_ref()
            .ok_or_else(|| ConfigError::Invalid("auth.base_url is required in remote mode".to_string()))?;
        let login_url = base
            .join(&config.login_path)
            .map_err(|e| ConfigError::Invalid(format!("invalid auth.login_path: {}", e)))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ConfigError::Invalid(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            login_url,
            admin_role_marker: config.admin_role_marker.clone(),
        })
    }

    /// The resolved login endpoint
    pub fn login_url(&self) -> &Url {
        &self.login_url
    }

    fn identity_from(&self, body: LoginResponse, credentials: &Credentials) -> Identity {
        let is_admin = body
            .roles
            .iter()
            .any(|role| role.eq_ignore_ascii_case(&self.admin_role_marker));

        let full_name = [body.first_name.as_deref(), body.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        let email = body
            .email
            .filter(|email| !email.trim().is_empty())
            .unwrap_or_else(|| credentials.email.clone());

        let mut identity = Identity::new(email);
        identity.id = body.id;
        identity.username = body.username.clone();
        identity.name = if full_name.is_empty() {
            body.username
        } else {
            Some(full_name)
        };
        identity.role = Some(if is_admin { ADMIN_ROLE } else { USER_ROLE }.to_string());
        identity.roles = body.roles;
        if let Some(first) = body.first_name {
            identity.extra.insert("firstName".to_string(), first.into());
        }
        if let Some(last) = body.last_name {
            identity.extra.insert("lastName".to_string(), last.into());
        }
        identity
    }
}

#[async_trait]
impl AuthBackend for HttpAuthBackend {
    async fn authenticate(&self, credentials: &Credentials) -> Result<LoginGrant, AuthError> {
        tracing::debug!(url = %self.login_url, email = %credentials.email, "sending login request");

        let response = self
            .client
            .post(self.login_url.clone())
            .json(&serde_json::json!({
                "email": credentials.email,
                "password": credentials.password,
            }))
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&text)
                .ok()
                .and_then(|body| body.message.or(body.error))
                .filter(|message| !message.trim().is_empty());

            return Err(match message {
                Some(message) => AuthError::Rejected {
                    status: status.as_u16(),
                    message,
                },
                None if status.as_u16() == 401 || status.as_u16() == 403 => {
                    AuthError::InvalidCredentials
                }
                None => AuthError::Rejected {
                    status: status.as_u16(),
                    message: format!("Login failed (HTTP {})", status.as_u16()),
                },
            });
        }

        let body: LoginResponse =
            serde_json::from_str(&text).map_err(|e| AuthError::MalformedResponse(e.to_string()))?;
        let token = body.access_token.clone().filter(|token| !token.is_empty());
        let identity = self.identity_from(body, credentials);

        Ok(LoginGrant { identity, token })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> HttpAuthBackend {
        let config = AuthConfig {
            base_url: Some(Url::parse("http://127.0.0.1:9").unwrap()),
            ..AuthConfig::default()
        };
        HttpAuthBackend::new(&config).unwrap()
    }

    #[test]
    fn test_requires_base_url() {
        let err = HttpAuthBackend::new(&AuthConfig::default()).err().unwrap();
        assert!(err.to_string().contains("auth.base_url"));
    }

    #[test]
    fn test_login_url_joins_path() {
        assert_eq!(
            backend().login_url().as_str(),
            "http://127.0.0.1:9/api/auth/login"
        );
    }

    #[test]
    fn test_response_aliases() {
        let body: LoginResponse =
            serde_json::from_str(r#"{"token":"t","userId":12,"roles":["ROLE_USER"]}"#).unwrap();
        assert_eq!(body.access_token.as_deref(), Some("t"));
        assert_eq!(body.id.as_deref(), Some("12"));
    }

    #[test]
    fn test_identity_maps_admin_marker() {
        let body: LoginResponse = serde_json::from_str(
            r#"{"accessToken":"t","id":"u1","username":"mona","firstName":"Mona","lastName":"Lisa","email":"mona@academy.org","roles":["ROLE_USER","ROLE_ADMIN"]}"#,
        )
        .unwrap();
        let identity = backend().identity_from(body, &Credentials::new("x@y.z", "pw"));

        assert_eq!(identity.email, "mona@academy.org");
        assert_eq!(identity.name.as_deref(), Some("Mona Lisa"));
        assert_eq!(identity.role.as_deref(), Some("admin"));
        assert_eq!(identity.extra.get("firstName"), Some(&serde_json::json!("Mona")));
    }

    #[test]
    fn test_identity_falls_back_to_credentials_email() {
        let body: LoginResponse =
            serde_json::from_str(r#"{"accessToken":"t","roles":["ROLE_USER"]}"#).unwrap();
        let identity = backend().identity_from(body, &Credentials::new("x@y.z", "pw"));

        assert_eq!(identity.email, "x@y.z");
        assert_eq!(identity.role.as_deref(), Some("user"));
        assert!(identity.name.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_network_error() {
        let err = backend()
            .authenticate(&Credentials::new("a@b.com", "pw"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Network(_)));
    }
}
