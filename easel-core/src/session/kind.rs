//! Session roles and application profiles

use std::fmt;

use serde::{Deserialize, Serialize};

/// The two mutually exclusive authenticated roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    Admin,
    Student,
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionKind::Admin => write!(f, "admin"),
            SessionKind::Student => write!(f, "student"),
        }
    }
}

/// Which application the store serves
///
/// The admin panel only knows admin sessions. The public site knows both,
/// and resolves a student record before an admin record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppProfile {
    AdminPanel,
    #[default]
    PublicSite,
}

impl AppProfile {
    /// Roles this profile models, in session resolution order
    pub fn kinds(&self) -> &'static [SessionKind] {
        match self {
            AppProfile::AdminPanel => &[SessionKind::Admin],
            AppProfile::PublicSite => &[SessionKind::Student, SessionKind::Admin],
        }
    }

    /// Returns true if the profile models the given role
    pub fn supports(&self, kind: SessionKind) -> bool {
        self.kinds().contains(&kind)
    }
}
