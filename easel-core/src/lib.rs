//! easel-core: session layer for the easel academy apps
//!
//! This crate provides the client-side authentication state shared by the
//! admin panel and the public site:
//!
//! - **Session store** - [`SessionStore`] bootstraps the logged-in identity
//!   from storage, runs admin and student logins, logout and profile updates
//! - **Storage** - the [`Storage`] trait with [`MemoryStorage`] (one handle
//!   per simulated tab) and [`FileStorage`] (shared between processes)
//! - **Auth backends** - [`DemoAuthBackend`] and [`HttpAuthBackend`]
//! - **OTP** - [`HttpOtpGateway`] for email verification and password reset
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use easel_core::{MemoryStorage, SessionConfig, SessionStore, StudentSignIn};
//!
//! let storage = Arc::new(MemoryStorage::new());
//! let store = SessionStore::from_config(storage, SessionConfig::default()).unwrap();
//! assert!(!store.is_authenticated());
//!
//! store.student_login(StudentSignIn::new("mia@academy.org")).unwrap();
//! assert!(store.is_student());
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌────────────── origin (browser storage / storage dir) ──────────────┐
//! │  adminUser   studentUser   token                                   │
//! └──────▲──────────────▲──────────────────────────▲───────────────────┘
//!        │ get/set       │ StorageEvent             │
//! ┌──────┴───────┐ ┌─────┴────────┐          ┌──────┴───────┐
//! │ SessionStore │ │ SessionStore │   ...    │ SessionStore │
//! │   (tab 1)    │ │   (tab 2)    │          │   (tab n)    │
//! └──────────────┘ └──────────────┘          └──────────────┘
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod otp;
pub mod session;
pub mod storage;

// Re-export key types for convenience
pub use auth::{AuthBackend, AuthError, Credentials, DemoAuthBackend, HttpAuthBackend, LoginGrant};
pub use config::{AuthConfig, AuthMode, OtpConfig, SessionConfig, StorageKeys};
pub use error::{ConfigError, EaselError, OtpError, StorageError};
pub use otp::{HttpOtpGateway, OtpGateway, OtpReply};
pub use session::{AppProfile, Identity, Session, SessionKind, SessionState, SessionStore, StudentSignIn};
pub use storage::{FileStorage, MemoryOrigin, MemoryStorage, Storage, StorageEvent};
