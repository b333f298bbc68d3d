//! Login backends and bearer token inspection

mod backend;
mod error;
mod http;
mod token;

pub use backend::{AuthBackend, Credentials, DemoAuthBackend, LoginGrant};
pub use error::AuthError;
pub use http::HttpAuthBackend;
pub use token::{TokenClaims, inspect_token};
