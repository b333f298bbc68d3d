//! Identity records as persisted in storage

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Why a persisted record was not accepted as a session
#[derive(Debug, Error)]
pub enum RecordError {
    /// Not valid JSON, or not shaped like an identity
    #[error("malformed identity record: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Parsed, but the email is empty
    #[error("identity record has no email")]
    MissingEmail,
}

/// Profile of a logged-in user
///
/// `email` is required. Known optional fields are typed; anything else is
/// kept in `extra` and written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub email: String,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "string_or_number"
    )]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,

    #[serde(rename = "loginTime", default, skip_serializing_if = "Option::is_none")]
    pub login_time: Option<DateTime<Utc>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Identity {
    /// Create an identity with only an email
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            id: None,
            name: None,
            username: None,
            role: None,
            roles: Vec::new(),
            login_time: None,
            extra: Map::new(),
        }
    }

    /// Set the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the role label
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Set the opaque user id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Parse and validate a persisted record
    pub fn from_record(raw: &str) -> Result<Self, RecordError> {
        let identity: Identity = serde_json::from_str(raw)?;
        identity.validate()?;
        Ok(identity)
    }

    /// Serialize for storage
    pub fn to_record(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Minimal validation: the email must be non-empty
    pub fn validate(&self) -> Result<(), RecordError> {
        if self.email.trim().is_empty() {
            return Err(RecordError::MissingEmail);
        }
        Ok(())
    }

    /// Returns true if the record passes [`validate`](Self::validate)
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// The part of the email before `@`
    pub fn email_local_part(&self) -> &str {
        self.email.split('@').next().unwrap_or_default()
    }

    /// Fill `name` and `username` from the email local part when absent
    pub fn with_default_names(mut self) -> Self {
        let local = self.email_local_part().to_string();
        if self.name.as_deref().is_none_or(str::is_empty) {
            self.name = Some(local.clone());
        }
        if self.username.as_deref().is_none_or(str::is_empty) {
            self.username = Some(local);
        }
        self
    }

    /// Shallow-merge `fields` over `base` (or over an empty record)
    ///
    /// Fields in `fields` replace whole top-level values; nothing is merged
    /// recursively. The result is not validated.
    pub fn merge(base: Option<&Identity>, fields: &Map<String, Value>) -> Result<Self, RecordError> {
        let mut object = match base {
            Some(identity) => match serde_json::to_value(identity)? {
                Value::Object(map) => map,
                _ => Map::new(),
            },
            None => Map::new(),
        };
        for (key, value) in fields {
            object.insert(key.clone(), value.clone());
        }
        if !object.contains_key("email") {
            object.insert("email".to_string(), Value::String(String::new()));
        }
        Ok(serde_json::from_value(Value::Object(object))?)
    }
}

/// Sign-in data accepted by [`SessionStore::student_login`](super::SessionStore::student_login)
///
/// `password` is accepted for parity with the login form but never persisted.
#[derive(Clone, Default)]
pub struct StudentSignIn {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
    pub fields: Map<String, Value>,
}

impl StudentSignIn {
    /// Sign-in data for the given email
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            ..Self::default()
        }
    }

    /// Set the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the password
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Add an extra profile field
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

impl std::fmt::Debug for StudentSignIn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StudentSignIn")
            .field("email", &self.email)
            .field("name", &self.name)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("fields", &self.fields)
            .finish()
    }
}

/// Accept ids sent as JSON strings or numbers
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}
