//! Session state for one running application instance
//!
//! [`SessionStore`] owns "who is logged in, as what role" and keeps it in
//! step with persisted storage and with other stores on the same origin.

pub(crate) mod identity;
mod kind;
mod state;
mod store;

pub use identity::{Identity, RecordError, StudentSignIn};
pub use kind::{AppProfile, SessionKind};
pub use state::{Session, SessionState};
pub use store::SessionStore;
